use std::{
    collections::BTreeMap,
    fmt::{Debug, Formatter},
    rc::Rc,
};

use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    guard::Guard,
    navigation::Location,
    route::Route,
    view::{ViewDef, DEFAULT_VIEW},
};

/// Where a route sends navigations that reach it.
#[derive(Clone)]
pub enum Redirect {
    /// A fixed location. A relative path is resolved against the parent route's path. Without
    /// their own query, fragment or params, redirects keep the ones of the original location.
    To(Location),

    /// A location computed from the route that was reached.
    Dynamic(Rc<dyn Fn(&Route) -> Location>),
}

impl Redirect {
    /// Create a [`Redirect::Dynamic`].
    pub fn dynamic(redirect: impl Fn(&Route) -> Location + 'static) -> Self {
        Self::Dynamic(Rc::new(redirect))
    }
}

impl From<Location> for Redirect {
    fn from(location: Location) -> Self {
        Self::To(location)
    }
}

impl From<&str> for Redirect {
    fn from(path: &str) -> Self {
        Self::To(Location::path(path))
    }
}

impl From<String> for Redirect {
    fn from(path: String) -> Self {
        Self::To(Location::path(path))
    }
}

impl Debug for Redirect {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::To(location) => f.debug_tuple("To").field(location).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic"),
        }
    }
}

/// The definition of a route, as supplied by the application.
///
/// This implements [`Default`] and follows the builder pattern:
/// ```rust
/// # use waymark_router::prelude::*;
/// let users = RouteConfig::new("/users")
///     .view(View::new("Users"))
///     .child(RouteConfig::new(":id").name("user").view(View::new("User")))
///     .alias("/people")
///     .meta("requires_auth", true);
/// # let _ = users;
/// ```
///
/// # Paths
/// A path starting with `/` is absolute. Other paths are relative to the parent route, or to the
/// root for top level routes. A trailing `/` is ignored. See the [module docs](super) for the dynamic
/// segments a path may contain.
#[derive(Clone, Default)]
pub struct RouteConfig {
    pub(crate) path: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) views: BTreeMap<String, ViewDef>,
    pub(crate) children: Vec<RouteConfig>,
    pub(crate) aliases: Vec<String>,
    pub(crate) redirect: Option<Redirect>,
    pub(crate) before_enter: Option<Guard>,
    pub(crate) meta: Map<String, Value>,
}

impl RouteConfig {
    /// Create a [`RouteConfig`] for `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Add a name, for navigation by name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if let Some(existing) = &self.name {
            warn!(r#"name already set: "{existing}" to "{name}", later prevails"#);
        }

        self.name = Some(name);
        self
    }

    /// Set the view of the [default slot](DEFAULT_VIEW).
    pub fn view(self, view: impl Into<ViewDef>) -> Self {
        self.named_view(DEFAULT_VIEW, view)
    }

    /// Set the view of `slot`.
    pub fn named_view(mut self, slot: impl Into<String>, view: impl Into<ViewDef>) -> Self {
        let slot = slot.into();
        if self.views.insert(slot.clone(), view.into()).is_some() {
            warn!(r#"view "{slot}" already set, later prevails"#);
        }
        self
    }

    /// Add a nested route.
    pub fn child(mut self, child: RouteConfig) -> Self {
        self.children.push(child);
        self
    }

    /// Add several nested routes.
    pub fn children(mut self, children: impl IntoIterator<Item = RouteConfig>) -> Self {
        self.children.extend(children);
        self
    }

    /// Add another path this route is reachable under.
    ///
    /// Navigating to an alias keeps the alias in the location, but activates this route.
    pub fn alias(mut self, path: impl Into<String>) -> Self {
        self.aliases.push(path.into());
        self
    }

    /// Send navigations reaching this route somewhere else.
    pub fn redirect(mut self, redirect: impl Into<Redirect>) -> Self {
        if self.redirect.is_some() {
            warn!("redirect already set, later prevails");
        }

        self.redirect = Some(redirect.into());
        self
    }

    /// Add a guard that runs when a navigation enters this route.
    pub fn before_enter(mut self, guard: Guard) -> Self {
        if self.before_enter.is_some() {
            warn!("before_enter guard already set, later prevails");
        }

        self.before_enter = Some(guard);
        self
    }

    /// Attach arbitrary data.
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}
