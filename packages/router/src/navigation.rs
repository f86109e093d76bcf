//! Locations and the utilities to normalize them.

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::warn;
use urlencoding::{decode, encode};

use crate::route::Route;

/// The query of a location.
///
/// The pairs keep the order they were written in, so a query survives parsing and printing
/// unchanged. A key may appear several times, and a key may appear without a value (`?flag`).
/// Comparing two queries ignores the order of _different_ keys, but not the order of the values
/// of one key.
///
/// ```rust
/// # use waymark_router::prelude::*;
/// let query = Query::parse("?b=2&a=1&flag");
/// assert_eq!(query.get("a"), Some("1"));
/// assert_eq!(query.get("flag"), Some(""));
/// assert_eq!(query.to_string(), "?b=2&a=1&flag");
/// assert_eq!(query, Query::parse("a=1&flag&b=2"));
/// ```
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Query {
    pairs: Vec<(String, Option<String>)>,
}

impl Query {
    /// Create an empty [`Query`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string, with or without its leading `?`.
    ///
    /// Keys and values are percent decoded. Undecodable parts are kept as they are.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);

        let pairs = query
            .split('&')
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once('=') {
                Some((key, value)) => (decode_part(key), Some(decode_part(value))),
                None => (decode_part(part), None),
            })
            .collect();

        Self { pairs }
    }

    /// Get the first value of `key`. A key without a value yields an empty string.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    /// Get all values of `key`, in order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    /// Check whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Add a value for `key`, keeping existing ones.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), Some(value.into())));
    }

    /// Add `key` without a value.
    pub fn append_flag(&mut self, key: impl Into<String>) {
        self.pairs.push((key.into(), None));
    }

    /// Set the only value of `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.remove(&key);
        self.pairs.push((key, Some(value.into())));
    }

    /// Remove every value of `key`.
    pub fn remove(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    /// Merge `other` into this query.
    ///
    /// Every key of `other` replaces all values of the same key here. A replaced key keeps its
    /// position, new keys are added at the end.
    pub fn merge(&mut self, other: &Query) {
        let mut done: Vec<&str> = Vec::new();

        for (key, _) in &other.pairs {
            if done.contains(&key.as_str()) {
                continue;
            }
            done.push(key);

            let values = other.pairs.iter().filter(|(k, _)| k == key).cloned();
            match self.pairs.iter().position(|(k, _)| k == key) {
                Some(at) => {
                    self.remove(key);
                    let at = at.min(self.pairs.len());
                    self.pairs.splice(at..at, values);
                }
                None => self.pairs.extend(values),
            }
        }
    }

    /// Check whether every key of `other` is present here with the same values.
    #[must_use]
    pub fn includes(&self, other: &Query) -> bool {
        let mine = self.grouped();
        other
            .grouped()
            .iter()
            .all(|(key, values)| mine.get(key) == Some(values))
    }

    /// Iterate over all pairs, in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// The number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether there are no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn grouped(&self) -> BTreeMap<&str, Vec<Option<&str>>> {
        let mut grouped: BTreeMap<&str, Vec<Option<&str>>> = BTreeMap::new();
        for (key, value) in &self.pairs {
            grouped.entry(key).or_default().push(value.as_deref());
        }
        grouped
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.grouped() == other.grouped()
    }
}

impl Eq for Query {}

impl Display for Query {
    /// Print the query with its leading `?`, or nothing if it is empty.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            f.write_str(if i == 0 { "?" } else { "&" })?;
            f.write_str(&encode(key))?;
            if let Some(value) = value {
                write!(f, "={}", encode(value))?;
            }
        }
        Ok(())
    }
}

impl From<&str> for Query {
    fn from(query: &str) -> Self {
        Self::parse(query)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Query {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        }
    }
}

fn decode_part(part: &str) -> String {
    match decode(part) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            warn!(r#"failed to decode query part "{part}": {e}"#);
            part.to_string()
        }
    }
}

/// A location to navigate to or to resolve.
///
/// A location either has a `path` (which may carry its own query and fragment, and may be relative
/// to the current route) or a `name` of a route together with the `params` its path needs.
///
/// ```rust
/// # use waymark_router::prelude::*;
/// let by_path = Location::from("/users/1?tab=posts#bio");
/// let by_name = Location::named("user")
///     .param("id", "1")
///     .query("tab", "posts")
///     .hash("bio");
/// # let _ = (by_path, by_name);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Location {
    /// The path, possibly relative and possibly including a query and a fragment.
    pub path: Option<String>,
    /// The name of the target route.
    pub name: Option<String>,
    /// Values for the dynamic segments of a named route.
    pub params: BTreeMap<String, String>,
    /// Query pairs, merged over the query within `path`.
    pub query: Query,
    /// The fragment, with or without its `#`.
    pub hash: String,
    /// Resolve a relative `path` below the current path instead of next to it.
    pub append: bool,
    #[cfg_attr(feature = "serde", serde(skip))]
    normalized: bool,
}

impl Location {
    /// Create a location for `path`.
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Create a location for the route called `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Set a path parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self.normalized = false;
        self
    }

    /// Set a query value, replacing earlier values of `key`.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.set(key, value);
        self.normalized = false;
        self
    }

    /// Replace the whole query.
    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self.normalized = false;
        self
    }

    /// Set the fragment.
    pub fn hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = hash.into();
        self.normalized = false;
        self
    }

    /// Resolve a relative path below the current path.
    pub fn append(mut self) -> Self {
        self.append = true;
        self.normalized = false;
        self
    }

    /// Whether this location went through [`normalize_location`] unchanged since.
    #[must_use]
    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    /// The path, query and fragment of a normalized path location.
    pub(crate) fn full_path(&self) -> String {
        format!(
            "{}{}{}",
            self.path.as_deref().unwrap_or("/"),
            self.query,
            self.hash
        )
    }
}

impl From<&str> for Location {
    fn from(path: &str) -> Self {
        Self::path(path)
    }
}

impl From<String> for Location {
    fn from(path: String) -> Self {
        Self::path(path)
    }
}

impl From<&String> for Location {
    fn from(path: &String) -> Self {
        Self::path(path.as_str())
    }
}

/// Split `path` into its path, query (without `?`) and fragment (with `#`).
///
/// ```rust
/// # use waymark_router::prelude::*;
/// assert_eq!(parse_path("/a?x=1#top"), ("/a", "x=1", "#top"));
/// assert_eq!(parse_path("/a#top?x=1"), ("/a", "", "#top?x=1"));
/// ```
#[must_use]
pub fn parse_path(path: &str) -> (&str, &str, &str) {
    let (rest, hash) = match path.find('#') {
        Some(i) => (&path[..i], &path[i..]),
        None => (path, ""),
    };

    match rest.find('?') {
        Some(i) => (&rest[..i], &rest[i + 1..], hash),
        None => (rest, "", hash),
    }
}

/// Resolve `relative` against the path `base`.
///
/// Absolute paths are returned as they are. Otherwise `relative` replaces the last segment of
/// `base`, or is added after it if `append` is set. `.` and `..` segments are resolved.
///
/// ```rust
/// # use waymark_router::prelude::*;
/// assert_eq!(resolve_path("bar", "/foo", false), "/bar");
/// assert_eq!(resolve_path("bar", "/foo", true), "/foo/bar");
/// assert_eq!(resolve_path("../baz", "/a/b/c", false), "/a/baz");
/// assert_eq!(resolve_path("/abs", "/a/b", false), "/abs");
/// ```
#[must_use]
pub fn resolve_path(relative: &str, base: &str, append: bool) -> String {
    if relative.starts_with('/') {
        return relative.to_string();
    }
    if relative.starts_with('?') || relative.starts_with('#') {
        return format!("{base}{relative}");
    }

    let mut stack: Vec<&str> = base.split('/').collect();

    // the last segment is a "file", unless appending or the base ends with a separator
    if !append || stack.last().is_some_and(|s| s.is_empty()) {
        stack.pop();
    }

    for segment in relative.split('/') {
        match segment {
            ".." => {
                stack.pop();
            }
            "." => {}
            segment => stack.push(segment),
        }
    }

    if stack.first() != Some(&"") {
        stack.insert(0, "");
    }

    match stack.join("/") {
        path if path.is_empty() => String::from("/"),
        path => path,
    }
}

/// Normalize `raw` against the `current` route.
///
/// A path location gets an absolute path, the query within its path merged with its `query`, and
/// a fragment starting with `#`. A named location only has its fragment fixed up, its path is
/// produced by the matcher.
///
/// Normalizing a normalized location returns it unchanged.
#[must_use]
pub fn normalize_location(raw: Location, current: Option<&Route>) -> Location {
    if raw.normalized {
        return raw;
    }

    let mut next = raw;
    next.normalized = true;

    if next.name.is_some() {
        next.hash = normalize_hash(&next.hash, "");
        return next;
    }

    let raw_path = next.path.take().unwrap_or_default();
    let (path, query, hash) = parse_path(&raw_path);
    let base = current.map(Route::path).unwrap_or("/");

    let path = match path {
        "" => base.to_string(),
        path => resolve_path(path, base, next.append),
    };

    let mut merged = Query::parse(query);
    merged.merge(&next.query);

    Location {
        path: Some(path),
        name: None,
        params: next.params,
        query: merged,
        hash: normalize_hash(&next.hash, hash),
        append: false,
        normalized: true,
    }
}

// an explicit hash wins over the one within the path
fn normalize_hash(explicit: &str, parsed: &str) -> String {
    let hash = if explicit.is_empty() { parsed } else { explicit };
    if hash.is_empty() || hash.starts_with('#') {
        hash.to_string()
    } else {
        format!("#{hash}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_path_splits_parts() {
        assert_eq!(parse_path(""), ("", "", ""));
        assert_eq!(parse_path("/a"), ("/a", "", ""));
        assert_eq!(parse_path("?x"), ("", "x", ""));
        assert_eq!(parse_path("#h"), ("", "", "#h"));
    }

    #[test]
    fn resolve_path_handles_dots_and_roots() {
        assert_eq!(resolve_path("./b", "/a/", false), "/a/b");
        assert_eq!(resolve_path("..", "/a", false), "/");
        assert_eq!(resolve_path("../../..", "/a/b", false), "/");
        assert_eq!(resolve_path("?x=1", "/a", false), "/a?x=1");
    }

    #[test]
    fn query_parse_decodes_and_keeps_flags() {
        let query = Query::parse("name=J%C3%BCrgen&empty=&flag");
        assert_eq!(query.get("name"), Some("Jürgen"));
        assert_eq!(
            query.iter().collect::<Vec<_>>(),
            vec![
                ("name", Some("Jürgen")),
                ("empty", Some("")),
                ("flag", None)
            ]
        );
        assert_eq!(query.to_string(), "?name=J%C3%BCrgen&empty=&flag");
    }

    #[test]
    fn query_equality_ignores_key_order_only() {
        assert_eq!(Query::parse("a=1&b=2"), Query::parse("b=2&a=1"));
        assert_ne!(Query::parse("a=1&a=2"), Query::parse("a=2&a=1"));
        assert_ne!(Query::parse("a"), Query::parse("a="));
    }

    #[test]
    fn query_merge_replaces_in_place() {
        let mut query = Query::parse("a=1&b=2&a=3");
        query.merge(&Query::parse("a=9&c=4"));
        assert_eq!(query.to_string(), "?a=9&b=2&c=4");

        let mut query = Query::parse("x=1&y=2");
        query.merge(&Query::parse("x=0"));
        assert_eq!(query.to_string(), "?x=0&y=2");
    }

    #[test]
    fn query_includes_compares_values() {
        let query = Query::parse("a=1&b=2");
        assert!(query.includes(&Query::parse("a=1")));
        assert!(query.includes(&Query::new()));
        assert!(!query.includes(&Query::parse("a=2")));
        assert!(!query.includes(&Query::parse("c")));
    }

    #[test]
    fn normalize_merges_query_and_marks_hash() {
        let location = normalize_location(Location::from("/a?x=1#top").query("y", "2"), None);
        assert_eq!(location.path.as_deref(), Some("/a"));
        assert_eq!(location.query.to_string(), "?x=1&y=2");
        assert_eq!(location.hash, "#top");
        assert!(location.is_normalized());

        let location = normalize_location(Location::from("/a#top").hash("other"), None);
        assert_eq!(location.hash, "#other");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in [
            Location::from("/a/b?x=1&x=2#h"),
            Location::from("relative?q"),
            Location::from(""),
            Location::named("user").param("id", "7").hash("bio"),
            Location::path("x").append().query("k", "v"),
        ] {
            let once = normalize_location(raw, None);
            let twice = normalize_location(once.clone(), None);
            assert_eq!(once, twice);

            // also when the location has to be normalized from scratch
            let mut fresh = once.clone();
            fresh.normalized = false;
            assert_eq!(normalize_location(fresh, None), once);
        }
    }

    #[test]
    fn empty_path_stays_on_base() {
        let location = normalize_location(Location::from("?page=2"), None);
        assert_eq!(location.full_path(), "/?page=2");
    }
}
