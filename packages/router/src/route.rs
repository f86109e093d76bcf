//! The resolved [`Route`].

use std::{
    collections::BTreeMap,
    fmt::{Debug, Display, Formatter},
    rc::Rc,
};

use serde_json::{Map, Value};

use crate::{
    navigation::{Location, Query},
    route_definition::RouteRecord,
};

/// The result of resolving a [`Location`].
///
/// A [`Route`] is never changed after it was created; every navigation produces a new one. A route
/// without [matched records](Route::matched) means the location didn't resolve to any route
/// definition, which UIs can render as "not found".
#[derive(Clone)]
pub struct Route {
    name: Option<String>,
    path: String,
    query: Query,
    hash: String,
    params: BTreeMap<String, String>,
    full_path: String,
    meta: Map<String, Value>,
    matched: Vec<Rc<RouteRecord>>,
    redirected_from: Option<String>,
}

impl Route {
    /// The route the router is at before its first navigation committed.
    #[must_use]
    pub fn start() -> Self {
        Self::unmatched(&Location::path("/"), None)
    }

    /// Create a route for `location` activating `matched`, root first.
    pub(crate) fn new(
        matched: Vec<Rc<RouteRecord>>,
        location: &Location,
        redirected_from: Option<String>,
    ) -> Self {
        let leaf = matched.last();

        Self {
            name: leaf.and_then(|r| r.name.clone()),
            path: location.path.clone().unwrap_or_else(|| String::from("/")),
            query: location.query.clone(),
            hash: location.hash.clone(),
            params: location.params.clone(),
            full_path: location.full_path(),
            meta: leaf.map(|r| r.meta.clone()).unwrap_or_default(),
            matched,
            redirected_from,
        }
    }

    /// Create a route for `location` that activates nothing.
    pub(crate) fn unmatched(location: &Location, redirected_from: Option<String>) -> Self {
        Self::new(Vec::new(), location, redirected_from)
    }

    /// The name of the matched route.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The path, without query and fragment.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The query.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// The fragment, including its `#`, or an empty string.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// The parameters captured from (or filled into) the path.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// A single parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The path with query and fragment.
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    /// The data attached to the matched route.
    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    /// The matched records, from the outermost route to the innermost one.
    pub fn matched(&self) -> &[Rc<RouteRecord>] {
        &self.matched
    }

    /// Whether any route definition matched.
    pub fn is_matched(&self) -> bool {
        !self.matched.is_empty()
    }

    /// The full path of the location that was redirected to this route.
    pub fn redirected_from(&self) -> Option<&str> {
        self.redirected_from.as_deref()
    }

    /// Check whether `other` points at the same location.
    ///
    /// Paths are compared ignoring a trailing `/`, queries ignoring the order of their keys.
    /// Fragments must be identical.
    #[must_use]
    pub fn is_same(&self, other: &Route) -> bool {
        self.path.trim_end_matches('/') == other.path.trim_end_matches('/')
            && self.hash == other.hash
            && self.query == other.query
    }

    /// Check whether this route is at or below `target`.
    ///
    /// This is the inclusive "is this link active" test: the path must lie below the path of
    /// `target`, the query must contain the query of `target`, and if `target` has a fragment, it
    /// must be the same.
    ///
    /// ```rust
    /// # use waymark_router::prelude::*;
    /// let router = RouterConfig::default()
    ///     .routes([RouteConfig::new("/*")])
    ///     .build()
    ///     .unwrap();
    ///
    /// let current = router.resolve("/users/1?tab=posts");
    /// assert!(current.includes(&router.resolve("/users")));
    /// assert!(current.includes(&router.resolve("/users/1?tab=posts")));
    /// assert!(!current.includes(&router.resolve("/use")));
    /// assert!(!current.includes(&router.resolve("/users?tab=likes")));
    /// ```
    #[must_use]
    pub fn includes(&self, target: &Route) -> bool {
        with_trailing_slash(&self.path).starts_with(&with_trailing_slash(&target.path))
            && (target.hash.is_empty() || self.hash == target.hash)
            && self.query.includes(&target.query)
    }

    /// Check whether both routes activate the same records.
    pub(crate) fn same_records(&self, other: &Route) -> bool {
        self.matched.len() == other.matched.len()
            && self
                .matched
                .iter()
                .zip(&other.matched)
                .all(|(a, b)| Rc::ptr_eq(a, b))
    }
}

fn with_trailing_slash(path: &str) -> String {
    format!("{}/", path.trim_end_matches('/'))
}

impl Debug for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("full_path", &self.full_path)
            .field("params", &self.params)
            .field(
                "matched",
                &self.matched.iter().map(|r| r.path()).collect::<Vec<_>>(),
            )
            .field("redirected_from", &self.redirected_from)
            .finish()
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::normalize_location;

    fn route(raw: &str) -> Route {
        Route::unmatched(&normalize_location(Location::from(raw), None), None)
    }

    #[test]
    fn start_is_root_without_records() {
        let start = Route::start();
        assert_eq!(start.full_path(), "/");
        assert!(!start.is_matched());
        assert!(start.meta().is_empty());
    }

    #[test]
    fn same_ignores_trailing_slash_and_key_order() {
        assert!(route("/a/?x=1&y=2#h").is_same(&route("/a?y=2&x=1#h")));
        assert!(!route("/a#h").is_same(&route("/a")));
        assert!(!route("/a?x=1").is_same(&route("/a?x=2")));
        assert!(!route("/a").is_same(&route("/b")));
    }

    #[test]
    fn includes_respects_segment_boundaries() {
        let current = route("/users/1#bio");
        assert!(current.includes(&route("/")));
        assert!(current.includes(&route("/users/")));
        assert!(current.includes(&route("/users/1#bio")));
        assert!(!current.includes(&route("/users/1#other")));
        assert!(!current.includes(&route("/users/10")));
    }
}
