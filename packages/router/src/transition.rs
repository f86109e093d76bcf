//! The transition state machine.
//!
//! A navigation resolves its target, diffs the matched chains, runs the guard queue and finally
//! commits. Only the most recently started navigation may commit: every navigation holds a token,
//! and each step checks that its token is still the pending one before and after it runs.

use std::{
    cell::{Cell, RefCell},
    fmt::{Debug, Formatter},
    rc::{Rc, Weak},
};

use futures_util::{
    future::{ready, FutureExt, LocalBoxFuture},
    task::LocalSpawn,
};
use tracing::{debug, trace, warn};
use waymark_history::History;

use crate::{
    guard::{AfterHook, Guard, Next},
    matcher::Matcher,
    navigation::Location,
    queue::run_queue,
    route::Route,
    route_definition::RouteRecord,
    router_cfg::Mode,
    view::{Instance, Loader, View, ViewDef},
};

/// How a navigation ended.
#[derive(Clone, Debug)]
pub enum NavigationOutcome {
    /// The navigation committed this route.
    Committed(Route),

    /// The target is the current route. No guards ran, only the location was reconciled.
    Duplicated,

    /// A guard aborted the navigation, or a lazy view failed to load. The router stays at the
    /// current route.
    Aborted,

    /// A newer navigation started before this one could commit.
    Superseded,

    /// The host performs the navigation and reports it back later.
    Delegated,
}

impl NavigationOutcome {
    /// Whether the navigation committed.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }

    /// The committed route.
    pub fn route(&self) -> Option<&Route> {
        match self {
            Self::Committed(route) => Some(route),
            _ => None,
        }
    }
}

/// What a committed navigation does to the history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    Push,
    Replace,
    /// Move an in-memory history to the entry at the index.
    Settle(usize),
    /// The host already shows the location.
    External,
}

/// The records a navigation keeps, leaves and enters.
///
/// All three lists are ordered from the outermost record to the innermost one.
#[derive(Clone, Debug, Default)]
pub struct ChainDiff {
    /// Records active before and after the navigation.
    pub updated: Vec<Rc<RouteRecord>>,
    /// Records the navigation enters.
    pub activated: Vec<Rc<RouteRecord>>,
    /// Records the navigation leaves.
    pub deactivated: Vec<Rc<RouteRecord>>,
}

/// Split two matched chains at the first record they don't share.
///
/// Records are compared by identity, two records with the same path are still different records.
///
/// ```rust
/// # use waymark_router::prelude::*;
/// let router = RouterConfig::default()
///     .routes([RouteConfig::new("/foo"), RouteConfig::new("/bar")])
///     .build()
///     .unwrap();
///
/// let foo = router.resolve("/foo");
/// let bar = router.resolve("/bar");
/// let diff = resolve_queue(foo.matched(), bar.matched());
/// assert_eq!(diff.deactivated[0].path(), "/foo");
/// assert_eq!(diff.activated[0].path(), "/bar");
/// assert!(diff.updated.is_empty());
/// ```
pub fn resolve_queue(current: &[Rc<RouteRecord>], next: &[Rc<RouteRecord>]) -> ChainDiff {
    let split = current
        .iter()
        .zip(next)
        .position(|(a, b)| !Rc::ptr_eq(a, b))
        .unwrap_or_else(|| current.len().min(next.len()));

    ChainDiff {
        updated: next[..split].to_vec(),
        activated: next[split..].to_vec(),
        deactivated: current[split..].to_vec(),
    }
}

/// Why the guard queue stopped early.
enum Halt {
    Superseded,
    Abort,
    Redirect(Location),
}

enum Step {
    Guard(Guard),
    Load {
        record: Rc<RouteRecord>,
        slot: String,
        loader: Loader,
    },
}

type InstanceCallback = (Rc<RouteRecord>, String, Box<dyn FnOnce(Instance)>);

struct Pending {
    token: u64,
    route: Route,
}

/// The state shared by all handles of a [`Router`](crate::router::Router).
pub(crate) struct RouterInner {
    pub(crate) matcher: Matcher,
    pub(crate) history: RefCell<Box<dyn History>>,
    pub(crate) mode: Mode,
    pub(crate) base: String,
    pub(crate) spawner: Option<Rc<dyn LocalSpawn>>,
    pub(crate) current: RefCell<Route>,
    pending: RefCell<Option<Pending>>,
    next_token: Cell<u64>,
    committed: Cell<u64>,
    pub(crate) before_hooks: RefCell<Vec<Guard>>,
    pub(crate) after_hooks: RefCell<Vec<AfterHook>>,
    pub(crate) listener: RefCell<Option<Rc<dyn Fn(&Route)>>>,
    pub(crate) started: Cell<bool>,
}

impl RouterInner {
    pub(crate) fn new(
        matcher: Matcher,
        history: Box<dyn History>,
        mode: Mode,
        base: String,
        spawner: Option<Rc<dyn LocalSpawn>>,
    ) -> Self {
        Self {
            matcher,
            history: RefCell::new(history),
            mode,
            base,
            spawner,
            current: RefCell::new(Route::start()),
            pending: RefCell::new(None),
            next_token: Cell::new(0),
            committed: Cell::new(0),
            before_hooks: Default::default(),
            after_hooks: Default::default(),
            listener: RefCell::new(None),
            started: Cell::new(false),
        }
    }

    pub(crate) fn pending_route(&self) -> Option<Route> {
        self.pending.borrow().as_ref().map(|p| p.route.clone())
    }

    /// Navigate to `location`.
    ///
    /// The navigation is resolved and becomes the pending one right away, the returned future
    /// runs its guards.
    pub(crate) fn transition_to(
        self: Rc<Self>,
        location: Location,
        action: Action,
    ) -> LocalBoxFuture<'static, NavigationOutcome> {
        let from = self.current.borrow().clone();
        let route = self.matcher.resolve(location, &from);

        if route.is_same(&from) && route.same_records(&from) {
            debug!(r#"already at "{route}""#);
            let mut history = self.history.borrow_mut();
            if let Action::Settle(index) = action {
                history.settle(index);
            }
            history.ensure_location(from.full_path(), false);
            return ready(NavigationOutcome::Duplicated).boxed_local();
        }

        let token = self.begin(&route);
        debug!(r#"navigating from "{from}" to "{route}" ({action:?}, #{token})"#);

        async move {
            match self.confirm(token, &route, &from).await {
                Ok(callbacks) => self.commit(token, route, &from, action, callbacks),
                Err(Halt::Superseded) => {
                    debug!(r#"navigation to "{route}" superseded (#{token})"#);
                    NavigationOutcome::Superseded
                }
                Err(Halt::Abort) => {
                    debug!(r#"navigation to "{route}" aborted (#{token})"#);
                    self.finish(token);
                    let current = self.current.borrow().full_path().to_string();
                    self.history.borrow_mut().ensure_location(&current, true);
                    NavigationOutcome::Aborted
                }
                Err(Halt::Redirect(to)) => {
                    debug!(r#"navigation to "{route}" redirected to {to:?} (#{token})"#);
                    self.finish(token);
                    self.clone().transition_to(to, Action::Push).await
                }
            }
        }
        .boxed_local()
    }

    fn begin(&self, route: &Route) -> u64 {
        let token = self.next_token.get() + 1;
        self.next_token.set(token);
        *self.pending.borrow_mut() = Some(Pending {
            token,
            route: route.clone(),
        });
        token
    }

    fn check(&self, token: u64) -> Result<(), Halt> {
        match &*self.pending.borrow() {
            Some(pending) if pending.token == token => Ok(()),
            _ => Err(Halt::Superseded),
        }
    }

    fn finish(&self, token: u64) {
        let mut pending = self.pending.borrow_mut();
        if pending.as_ref().is_some_and(|p| p.token == token) {
            *pending = None;
        }
    }

    /// Run both guard queues.
    async fn confirm(
        &self,
        token: u64,
        route: &Route,
        from: &Route,
    ) -> Result<Vec<InstanceCallback>, Halt> {
        let ChainDiff {
            activated,
            deactivated,
            ..
        } = resolve_queue(from.matched(), route.matched());

        let leave = deactivated
            .iter()
            .flat_map(|record| ready_views(record))
            .flat_map(|view| view.leave_guards().to_vec())
            .collect::<Vec<_>>();
        let before = self.before_hooks.borrow().clone();

        let steps = leave
            .into_iter()
            .rev()
            .chain(before)
            .map(|guard| Some(Step::Guard(guard)))
            .chain(
                activated
                    .iter()
                    .map(|record| record.before_enter.clone().map(Step::Guard)),
            )
            .chain(activated.iter().flat_map(|record| {
                record
                    .views()
                    .into_iter()
                    .filter_map(|(slot, def)| match def {
                        ViewDef::Lazy(loader) => Some(Some(Step::Load {
                            record: record.clone(),
                            slot,
                            loader,
                        })),
                        ViewDef::Ready(_) => None,
                    })
                    .collect::<Vec<_>>()
            }))
            .collect::<Vec<_>>();

        run_queue(steps, |step| self.run_step(token, step, route, from)).await?;

        // lazy views are loaded by now
        let enter = activated
            .iter()
            .flat_map(|record| {
                record
                    .views()
                    .into_iter()
                    .filter_map(|(slot, def)| def.as_ready().cloned().map(|view| (slot, view)))
                    .flat_map(|(slot, view)| {
                        view.enter_guards()
                            .iter()
                            .map(|guard| Some((record.clone(), slot.clone(), guard.clone())))
                            .collect::<Vec<_>>()
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let callbacks = RefCell::new(Vec::new());
        run_queue(enter, |(record, slot, guard)| {
            let callbacks = &callbacks;
            async move {
                if let Next::WithInstance(callback) =
                    self.run_guard(token, guard, route, from).await?
                {
                    callbacks.borrow_mut().push((record, slot, callback));
                }
                Ok(())
            }
        })
        .await?;

        self.check(token)?;
        Ok(callbacks.into_inner())
    }

    async fn run_step(
        &self,
        token: u64,
        step: Step,
        route: &Route,
        from: &Route,
    ) -> Result<(), Halt> {
        match step {
            Step::Guard(guard) => self.run_guard(token, guard, route, from).await.map(|_| ()),
            Step::Load {
                record,
                slot,
                loader,
            } => {
                self.check(token)?;
                trace!(r#"loading view "{slot}" of "{}""#, record.path());
                match loader().await {
                    Ok(view) => record.resolve_view(&slot, view),
                    Err(e) => {
                        warn!(r#"failed to load view "{slot}" of "{}": {e}"#, record.path());
                        self.check(token)?;
                        return Err(Halt::Abort);
                    }
                }
                self.check(token)
            }
        }
    }

    async fn run_guard(
        &self,
        token: u64,
        guard: Guard,
        route: &Route,
        from: &Route,
    ) -> Result<Next, Halt> {
        self.check(token)?;
        let next = guard(route.clone(), from.clone()).await;
        self.check(token)?;

        match next {
            Next::Abort => Err(Halt::Abort),
            Next::Redirect(to) => Err(Halt::Redirect(to)),
            next => Ok(next),
        }
    }

    fn commit(
        self: &Rc<Self>,
        token: u64,
        route: Route,
        from: &Route,
        action: Action,
        callbacks: Vec<InstanceCallback>,
    ) -> NavigationOutcome {
        if self.check(token).is_err() {
            return NavigationOutcome::Superseded;
        }
        self.finish(token);
        self.committed.set(token);
        *self.current.borrow_mut() = route.clone();
        debug!(r#"committed "{route}" (#{token})"#);

        let listener = self.listener.borrow().clone();
        if let Some(listener) = listener {
            listener(&route);
        }
        let after = self.after_hooks.borrow().clone();
        for hook in after {
            hook(&route, from);
        }

        {
            let mut history = self.history.borrow_mut();
            match action {
                Action::Push => history.push(route.full_path()),
                Action::Replace => history.replace(route.full_path()),
                Action::Settle(index) => history.settle(index),
                Action::External => {}
            }
            history.ensure_location(route.full_path(), false);
        }

        for record in from.matched().iter().chain(route.matched()) {
            record.drop_waiting(token);
        }
        for (record, slot, callback) in callbacks {
            let inner = Rc::downgrade(self);
            record.when_instance(
                &slot,
                token,
                Box::new(move |instance| {
                    if still_current(&inner, token) {
                        callback(instance);
                    }
                }),
            );
        }

        NavigationOutcome::Committed(route)
    }
}

fn still_current(inner: &Weak<RouterInner>, token: u64) -> bool {
    inner
        .upgrade()
        .is_some_and(|inner| inner.committed.get() == token)
}

fn ready_views(record: &RouteRecord) -> Vec<Rc<View>> {
    record
        .views()
        .values()
        .filter_map(|def| def.as_ready().cloned())
        .collect()
}

impl Debug for RouterInner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterInner")
            .field("mode", &self.mode)
            .field("base", &self.base)
            .field("current", &*self.current.borrow())
            .field("pending", &self.pending_route())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{prelude::*, route_definition::RouteTable};

    fn table() -> RouteTable {
        RouteTable::build([
            RouteConfig::new("/a").child(RouteConfig::new("b").child(RouteConfig::new("c"))),
            RouteConfig::new("/a/x"),
        ])
        .unwrap()
    }

    fn chain(table: &RouteTable, path: &str) -> Vec<Rc<RouteRecord>> {
        table.chain(table.by_path(path).unwrap())
    }

    fn paths(records: &[Rc<RouteRecord>]) -> Vec<&str> {
        records.iter().map(|r| r.path()).collect()
    }

    #[test]
    fn identical_chains_have_empty_diff() {
        let table = table();
        let abc = chain(&table, "/a/b/c");
        let diff = resolve_queue(&abc, &abc);
        assert_eq!(paths(&diff.updated), ["/a", "/a/b", "/a/b/c"]);
        assert!(diff.activated.is_empty());
        assert!(diff.deactivated.is_empty());
    }

    #[test]
    fn diff_splits_at_first_different_record() {
        let table = table();
        let diff = resolve_queue(&chain(&table, "/a/b/c"), &chain(&table, "/a/b"));
        assert_eq!(paths(&diff.updated), ["/a", "/a/b"]);
        assert!(diff.activated.is_empty());
        assert_eq!(paths(&diff.deactivated), ["/a/b/c"]);

        let diff = resolve_queue(&chain(&table, "/a/b/c"), &chain(&table, "/a/x"));
        assert!(diff.updated.is_empty());
        assert_eq!(paths(&diff.activated), ["/a/x"]);
        assert_eq!(paths(&diff.deactivated), ["/a", "/a/b", "/a/b/c"]);
    }

    #[test]
    fn diff_from_nothing_activates_everything() {
        let table = table();
        let diff = resolve_queue(&[], &chain(&table, "/a/b"));
        assert_eq!(paths(&diff.activated), ["/a", "/a/b"]);
        assert!(diff.deactivated.is_empty());
    }

    #[test]
    fn outcome_accessors() {
        let route = Route::start();
        assert!(NavigationOutcome::Committed(route).is_committed());
        assert!(NavigationOutcome::Aborted.route().is_none());
        assert!(!NavigationOutcome::Duplicated.is_committed());
    }

    #[test]
    fn revisits_keep_one_waiting_callback() {
        use futures::executor::block_on;

        let router = RouterConfig::default()
            .routes([
                RouteConfig::new("/"),
                RouteConfig::new("/a").view(View::new("A").enter_guard(sync_guard(|_, _| {
                    Next::with_instance(|_| {})
                }))),
            ])
            .initial_path("/")
            .build()
            .unwrap();
        block_on(router.start());

        for _ in 0..50 {
            assert!(block_on(router.push("/a")).is_committed());
            assert!(block_on(router.push("/")).is_committed());
        }
        let record = router.table().by_path("/a").unwrap().clone();
        assert_eq!(record.waiting_len(), 0);

        assert!(block_on(router.push("/a")).is_committed());
        assert_eq!(record.waiting_len(), 1);
    }
}
