use std::{collections::BTreeMap, rc::Rc};

use futures_util::{
    future::{ready, FutureExt, LocalBoxFuture},
    task::LocalSpawnExt,
};
use tracing::{error, trace, warn};
use waymark_history::{History, Traversal};

use crate::{
    guard::{AfterHook, Guard},
    matcher::Matcher,
    navigation::Location,
    route::Route,
    route_definition::RouteTable,
    router_cfg::Mode,
    transition::{Action, NavigationOutcome, RouterInner},
    view::ViewDef,
};

/// The router.
///
/// A [`Router`] is a cheap handle, clones share the same state. Create one with
/// [`RouterConfig`](crate::router_cfg::RouterConfig).
///
/// A navigation starts when its method is called. The returned future runs its guards and
/// resolves once the navigation is done. Guards may take as long as they like; while they wait, a
/// newer navigation may start and take over. A navigation whose future is dropped stays pending
/// until the next one starts.
///
/// ```rust
/// # use waymark_router::prelude::*;
/// # use futures::executor::block_on;
/// let router = RouterConfig::default()
///     .routes([RouteConfig::new("/"), RouteConfig::new("/foo")])
///     .initial_path("/")
///     .build()
///     .unwrap();
///
/// block_on(router.start());
/// assert_eq!(router.current_route().path(), "/");
///
/// let outcome = block_on(router.push("/foo?tab=1"));
/// assert!(outcome.is_committed());
/// assert_eq!(router.current_route().full_path(), "/foo?tab=1");
/// ```
#[derive(Clone, Debug)]
pub struct Router {
    inner: Rc<RouterInner>,
}

impl Router {
    pub(crate) fn new(
        matcher: Matcher,
        history: Box<dyn History>,
        mode: Mode,
        base: String,
        spawner: Option<Rc<dyn futures_util::task::LocalSpawn>>,
    ) -> Self {
        Self {
            inner: Rc::new(RouterInner::new(matcher, history, mode, base, spawner)),
        }
    }

    /// Navigate to the location the history shows, and start following its changes.
    ///
    /// Host navigation (back and forward buttons, edits of the address bar) is only picked up
    /// after this was called. Starting a second time does nothing.
    pub fn start(&self) -> LocalBoxFuture<'static, NavigationOutcome> {
        if self.inner.started.replace(true) {
            warn!("router already started");
            return ready(NavigationOutcome::Duplicated).boxed_local();
        }

        if let Some(spawner) = self.inner.spawner.clone() {
            let weak = Rc::downgrade(&self.inner);
            self.inner
                .history
                .borrow_mut()
                .on_external_change(Rc::new(move || {
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    let location = inner.history.borrow().current_location();
                    trace!(r#"host navigated to "{location}""#);

                    let navigation =
                        inner.transition_to(Location::from(location), Action::External);
                    if let Err(e) = spawner.spawn_local(navigation.map(|_| ())) {
                        error!("failed to spawn host navigation: {e}");
                    }
                }));
        }

        let initial = self.inner.history.borrow().initial_location();
        match initial {
            Some(location) => self
                .inner
                .clone()
                .transition_to(Location::from(location), Action::External),
            None => ready(NavigationOutcome::Duplicated).boxed_local(),
        }
    }

    /// Resolve `location` against the current route, without navigating.
    pub fn resolve(&self, location: impl Into<Location>) -> Route {
        let current = self.inner.current.borrow().clone();
        self.inner.matcher.resolve(location, &current)
    }

    /// Navigate to `location`, adding an entry to the history.
    pub fn push(
        &self,
        location: impl Into<Location>,
    ) -> LocalBoxFuture<'static, NavigationOutcome> {
        self.inner.clone().transition_to(location.into(), Action::Push)
    }

    /// Navigate to `location`, replacing the current history entry.
    pub fn replace(
        &self,
        location: impl Into<Location>,
    ) -> LocalBoxFuture<'static, NavigationOutcome> {
        self.inner
            .clone()
            .transition_to(location.into(), Action::Replace)
    }

    /// Step `delta` entries through the history.
    ///
    /// In browser modes, the host performs the step and the navigation follows asynchronously;
    /// the returned future resolves to [`NavigationOutcome::Delegated`] right away. An in-memory
    /// history clamps the step to its entries.
    pub fn go(&self, delta: isize) -> LocalBoxFuture<'static, NavigationOutcome> {
        let traversal = self.inner.history.borrow_mut().go(delta);
        match traversal {
            Traversal::Delegated => ready(NavigationOutcome::Delegated).boxed_local(),
            Traversal::Stay => ready(NavigationOutcome::Duplicated).boxed_local(),
            Traversal::InMemory { index, location } => self
                .inner
                .clone()
                .transition_to(Location::from(location), Action::Settle(index)),
        }
    }

    /// Go back one entry.
    pub fn back(&self) -> LocalBoxFuture<'static, NavigationOutcome> {
        self.go(-1)
    }

    /// Go forward one entry.
    pub fn forward(&self) -> LocalBoxFuture<'static, NavigationOutcome> {
        self.go(1)
    }

    /// Add a guard that runs before every navigation, after the leave guards of the views that
    /// are left. Guards run in the order they were added.
    pub fn before_each(&self, guard: Guard) {
        self.inner.before_hooks.borrow_mut().push(guard);
    }

    /// Add a hook that runs after every committed navigation.
    pub fn after_each(&self, hook: AfterHook) {
        self.inner.after_hooks.borrow_mut().push(hook);
    }

    /// Set the callback notified of every committed navigation, replacing the previous one.
    pub fn listen(&self, listener: impl Fn(&Route) + 'static) {
        if self
            .inner
            .listener
            .replace(Some(Rc::new(listener)))
            .is_some()
        {
            trace!("replaced route listener");
        }
    }

    /// The route the router is at.
    #[must_use]
    pub fn current_route(&self) -> Route {
        self.inner.current.borrow().clone()
    }

    /// The target of the navigation in flight, if any.
    #[must_use]
    pub fn pending_route(&self) -> Option<Route> {
        self.inner.pending_route()
    }

    /// Build the `href` a link to `location` should carry.
    ///
    /// ```rust
    /// # use waymark_router::prelude::*;
    /// let router = RouterConfig::default()
    ///     .routes([RouteConfig::new("/users/:id").name("user")])
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(router.href(Location::named("user").param("id", "7")), "/users/7");
    /// ```
    #[must_use]
    pub fn href(&self, location: impl Into<Location>) -> String {
        let route = self.resolve(location);
        self.inner.history.borrow().href(route.full_path())
    }

    /// The views of the current route, from the outermost route to the innermost one.
    #[must_use]
    pub fn matched_views(&self) -> Vec<BTreeMap<String, ViewDef>> {
        self.inner
            .current
            .borrow()
            .matched()
            .iter()
            .map(|record| record.views())
            .collect()
    }

    /// The mode in use, after adjusting the requested one to the host.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.inner.mode
    }

    /// The normalized base path.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.inner.base
    }

    /// The routes.
    #[must_use]
    pub fn table(&self) -> &RouteTable {
        self.inner.matcher.table()
    }
}
