use std::{
    cell::RefCell,
    collections::BTreeMap,
    fmt::{Debug, Formatter},
    mem,
};

use serde_json::{Map, Value};
use tracing::trace;

use crate::{
    guard::Guard,
    view::{Instance, View, ViewDef},
};

use super::{Pattern, Redirect};

/// Identifies a [`RouteRecord`] within its [`RouteTable`](super::RouteTable).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(pub(crate) usize);

type InstanceCallback = Box<dyn FnOnce(Instance)>;

/// A callback waiting for the instance of `slot`, queued by the navigation `token` committed.
struct Waiting {
    slot: String,
    token: u64,
    callback: InstanceCallback,
}

/// A route, as it was registered in the [`RouteTable`](super::RouteTable).
///
/// Records are shared between all [`Route`](crate::route::Route)s that match them. Two routes
/// activate the same record exactly if they hold the same record (see [`RouteRecord::id`]).
pub struct RouteRecord {
    pub(crate) id: RecordId,
    pub(crate) path: String,
    pub(crate) pattern: Pattern,
    pub(crate) name: Option<String>,
    pub(crate) parent: Option<RecordId>,
    pub(crate) match_as: Option<RecordId>,
    pub(crate) views: RefCell<BTreeMap<String, ViewDef>>,
    pub(crate) redirect: Option<Redirect>,
    pub(crate) before_enter: Option<Guard>,
    pub(crate) meta: Map<String, Value>,
    instances: RefCell<BTreeMap<String, Instance>>,
    waiting: RefCell<Vec<Waiting>>,
}

impl RouteRecord {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: RecordId,
        path: String,
        pattern: Pattern,
        name: Option<String>,
        parent: Option<RecordId>,
        match_as: Option<RecordId>,
        views: BTreeMap<String, ViewDef>,
        redirect: Option<Redirect>,
        before_enter: Option<Guard>,
        meta: Map<String, Value>,
    ) -> Self {
        Self {
            id,
            path,
            pattern,
            name,
            parent,
            match_as,
            views: RefCell::new(views),
            redirect,
            before_enter,
            meta,
            instances: Default::default(),
            waiting: Default::default(),
        }
    }

    /// The identity of the record.
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// The normalized, absolute path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The name, if the route has one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The enclosing record.
    pub fn parent(&self) -> Option<RecordId> {
        self.parent
    }

    /// For records created from an alias, the record the alias stands for.
    pub fn match_as(&self) -> Option<RecordId> {
        self.match_as
    }

    /// The data attached to the route.
    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    /// The views, by slot.
    ///
    /// Lazy views are replaced by the loaded [`View`] once a navigation loaded them.
    pub fn views(&self) -> BTreeMap<String, ViewDef> {
        self.views.borrow().clone()
    }

    /// The view of `slot`.
    pub fn view(&self, slot: &str) -> Option<ViewDef> {
        self.views.borrow().get(slot).cloned()
    }

    pub(crate) fn resolve_view(&self, slot: &str, view: View) {
        self.views
            .borrow_mut()
            .insert(slot.to_string(), ViewDef::from(view));
    }

    /// Register the live instance of the view in `slot`.
    ///
    /// Called by the UI layer once the view is mounted. Callbacks from
    /// [`Next::WithInstance`](crate::guard::Next::WithInstance) waiting for this slot are called
    /// right away.
    pub fn register_instance(&self, slot: &str, instance: Instance) {
        self.instances
            .borrow_mut()
            .insert(slot.to_string(), instance.clone());

        let ready = {
            let mut waiting = self.waiting.borrow_mut();
            let (ready, rest): (Vec<_>, Vec<_>) =
                mem::take(&mut *waiting).into_iter().partition(|w| w.slot == slot);
            *waiting = rest;
            ready
        };

        for waiting in ready {
            (waiting.callback)(instance.clone());
        }
    }

    /// Remove the live instance of the view in `slot`, once the UI layer unmounted it.
    pub fn unregister_instance(&self, slot: &str) -> Option<Instance> {
        self.instances.borrow_mut().remove(slot)
    }

    /// The live instance of the view in `slot`.
    pub fn instance(&self, slot: &str) -> Option<Instance> {
        self.instances.borrow().get(slot).cloned()
    }

    /// Call `callback` with the instance of `slot`, now or once it is registered.
    ///
    /// `token` identifies the navigation that queued the callback, see
    /// [`RouteRecord::drop_waiting`].
    pub(crate) fn when_instance(&self, slot: &str, token: u64, callback: InstanceCallback) {
        match self.instance(slot) {
            Some(instance) => callback(instance),
            None => {
                trace!(r#"waiting for view "{slot}" of "{}""#, self.path);
                self.waiting.borrow_mut().push(Waiting {
                    slot: slot.to_string(),
                    token,
                    callback,
                });
            }
        }
    }

    /// Drop the waiting callbacks not queued by the navigation `token`.
    pub(crate) fn drop_waiting(&self, token: u64) {
        let mut waiting = self.waiting.borrow_mut();
        let before = waiting.len();
        waiting.retain(|w| w.token == token);
        if waiting.len() < before {
            trace!(
                r#"dropped {} stale instance callbacks of "{}""#,
                before - waiting.len(),
                self.path
            );
        }
    }

    #[cfg(test)]
    pub(crate) fn waiting_len(&self) -> usize {
        self.waiting.borrow().len()
    }
}

impl Debug for RouteRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteRecord")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("match_as", &self.match_as)
            .field("views", &*self.views.borrow())
            .field("redirect", &self.redirect)
            .finish_non_exhaustive()
    }
}
