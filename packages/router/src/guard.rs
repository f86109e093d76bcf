//! Navigation guards and hooks.

use std::{
    fmt::{Debug, Formatter},
    future::Future,
    rc::Rc,
};

use futures_util::future::{ready, FutureExt, LocalBoxFuture};

use crate::{navigation::Location, route::Route, view::Instance};

/// A guard decides how a navigation continues.
///
/// It receives the route the navigation goes to and the route it comes from. It may take as long
/// as it wants, the navigation waits. If a newer navigation starts in the meantime, the decision
/// is ignored.
pub type Guard = Rc<dyn Fn(Route, Route) -> LocalBoxFuture<'static, Next>>;

/// A hook called after a navigation committed, with the new and the previous route.
pub type AfterHook = Rc<dyn Fn(&Route, &Route)>;

/// The decision of a [`Guard`].
pub enum Next {
    /// Continue with the next guard.
    Proceed,

    /// Stop the navigation. The router stays at the current route and restores the location.
    Abort,

    /// Stop the navigation and start a new one (a push) to the location.
    Redirect(Location),

    /// Continue, and once the navigation committed, call the closure with the live instance of
    /// the view the guard belongs to.
    ///
    /// Only meaningful for [view enter guards](crate::view::View::enter_guard), other guards
    /// treat it like [`Next::Proceed`].
    WithInstance(Box<dyn FnOnce(Instance)>),
}

impl Next {
    /// Redirect to `to`.
    pub fn redirect(to: impl Into<Location>) -> Self {
        Self::Redirect(to.into())
    }

    /// Continue and receive the live view instance later.
    pub fn with_instance(callback: impl FnOnce(Instance) + 'static) -> Self {
        Self::WithInstance(Box::new(callback))
    }
}

impl From<bool> for Next {
    /// `true` proceeds, `false` aborts.
    fn from(proceed: bool) -> Self {
        match proceed {
            true => Self::Proceed,
            false => Self::Abort,
        }
    }
}

impl Debug for Next {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proceed => f.write_str("Proceed"),
            Self::Abort => f.write_str("Abort"),
            Self::Redirect(to) => f.debug_tuple("Redirect").field(to).finish(),
            Self::WithInstance(_) => f.write_str("WithInstance"),
        }
    }
}

/// Create a [`Guard`] from an async closure.
///
/// ```rust
/// # use waymark_router::prelude::*;
/// let auth = guard(|to: Route, _from: Route| async move {
///     match to.meta().get("requires_auth") {
///         Some(serde_json::Value::Bool(true)) => Next::redirect("/login"),
///         _ => Next::Proceed,
///     }
/// });
/// # let _ = auth;
/// ```
pub fn guard<F, Fut>(guard: F) -> Guard
where
    F: Fn(Route, Route) -> Fut + 'static,
    Fut: Future<Output = Next> + 'static,
{
    Rc::new(move |to, from| guard(to, from).boxed_local())
}

/// Create a [`Guard`] that decides right away.
pub fn sync_guard(guard: impl Fn(&Route, &Route) -> Next + 'static) -> Guard {
    Rc::new(move |to, from| ready(guard(&to, &from)).boxed_local())
}

/// Create an [`AfterHook`].
pub fn after_hook(hook: impl Fn(&Route, &Route) + 'static) -> AfterHook {
    Rc::new(hook)
}
