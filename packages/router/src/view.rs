//! What a route renders, as far as navigation is concerned.
//!
//! The router doesn't render anything. It only knows which [`View`]s a route has, which guards
//! those views contribute to a navigation, and which live instances the UI layer registered for
//! them.

use std::{
    any::Any,
    fmt::{Debug, Formatter},
    future::Future,
    rc::Rc,
};

use futures_util::future::{FutureExt, LocalBoxFuture};

use crate::{error::LoadError, guard::Guard};

/// The view slot used when a route doesn't name its view.
pub const DEFAULT_VIEW: &str = "default";

/// A live instance of a [`View`], as registered by the UI layer.
pub type Instance = Rc<dyn Any>;

/// Loads a [`View`] on first use.
pub type Loader = Rc<dyn Fn() -> LocalBoxFuture<'static, Result<View, LoadError>>>;

/// A view a route can show, together with its in-view guards.
///
/// ```rust
/// # use waymark_router::prelude::*;
/// let editor = View::new("Editor")
///     .leave_guard(sync_guard(|_, _| Next::Abort))
///     .enter_guard(sync_guard(|_, _| Next::with_instance(|_| {})));
/// assert_eq!(editor.name(), "Editor");
/// ```
#[derive(Clone, Default)]
pub struct View {
    name: String,
    leave_guards: Vec<Guard>,
    enter_guards: Vec<Guard>,
}

impl View {
    /// Create a [`View`] called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a guard that runs before a navigation leaves this view.
    pub fn leave_guard(mut self, guard: Guard) -> Self {
        self.leave_guards.push(guard);
        self
    }

    /// Add a guard that runs before a navigation enters this view.
    ///
    /// These run after all other guards and after lazy views were loaded. They are the only
    /// guards whose [`Next::WithInstance`](crate::guard::Next::WithInstance) callback is used.
    pub fn enter_guard(mut self, guard: Guard) -> Self {
        self.enter_guards.push(guard);
        self
    }

    /// The name of the view.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn leave_guards(&self) -> &[Guard] {
        &self.leave_guards
    }

    pub(crate) fn enter_guards(&self) -> &[Guard] {
        &self.enter_guards
    }
}

impl Debug for View {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("name", &self.name)
            .field("leave_guards", &self.leave_guards.len())
            .field("enter_guards", &self.enter_guards.len())
            .finish()
    }
}

/// A [`View`], or the means to load it.
#[derive(Clone)]
pub enum ViewDef {
    /// A view that is available right away.
    Ready(Rc<View>),

    /// A view that is loaded when a navigation first enters its route. A failed load aborts that
    /// navigation.
    Lazy(Loader),
}

impl ViewDef {
    /// Create a lazily loaded view.
    pub fn lazy<F, Fut>(loader: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<View, LoadError>> + 'static,
    {
        Self::Lazy(Rc::new(move || loader().boxed_local()))
    }

    /// The view, if it is loaded.
    pub fn as_ready(&self) -> Option<&Rc<View>> {
        match self {
            Self::Ready(view) => Some(view),
            Self::Lazy(_) => None,
        }
    }
}

impl From<View> for ViewDef {
    fn from(view: View) -> Self {
        Self::Ready(Rc::new(view))
    }
}

impl Debug for ViewDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(view) => f.debug_tuple("Ready").field(view).finish(),
            Self::Lazy(_) => f.write_str("Lazy"),
        }
    }
}
