use std::{collections::BTreeMap, rc::Rc};

use tracing::{debug, warn};
use waymark_history::clean_path;

use crate::error::{ConfigurationError, ResolutionWarning};

use super::{Pattern, RecordId, RouteConfig, RouteRecord};

/// The flattened route definitions.
///
/// Every route (nested or not) and every alias becomes one [`RouteRecord`], reachable by its
/// normalized absolute path and, if it has one, by its name.
///
/// ```rust
/// # use waymark_router::prelude::*;
/// let table = RouteTable::build([
///     RouteConfig::new("/").name("home"),
///     RouteConfig::new("/users")
///         .child(RouteConfig::new(":id").name("user"))
///         .alias("/people"),
/// ])
/// .unwrap();
///
/// assert_eq!(
///     table.paths().collect::<Vec<_>>(),
///     vec!["/", "/users/:id", "/people", "/users"]
/// );
/// assert_eq!(table.by_name("user").unwrap().path(), "/users/:id");
/// ```
#[derive(Debug, Default)]
pub struct RouteTable {
    records: Vec<Rc<RouteRecord>>,
    by_path: BTreeMap<String, RecordId>,
    by_name: BTreeMap<String, RecordId>,
    ordered: Vec<RecordId>,
    warnings: Vec<ResolutionWarning>,
}

impl RouteTable {
    /// Build the table from route definitions.
    ///
    /// Definitions are registered depth first: a route's children, then its aliases, then the route
    /// itself. When two definitions produce the same path, or share a name, the first one wins
    /// and a warning is recorded.
    ///
    /// # Errors
    /// - [`ConfigurationError::MissingPath`] if a definition has no path.
    /// - [`ConfigurationError::InvalidPattern`] if a path can't be compiled.
    pub fn build(
        routes: impl IntoIterator<Item = RouteConfig>,
    ) -> Result<Self, ConfigurationError> {
        let mut table = Self::default();
        for route in routes {
            table.add(route, None, None)?;
        }

        debug!(
            "built route table with {} paths and {} names",
            table.by_path.len(),
            table.by_name.len()
        );
        Ok(table)
    }

    fn add(
        &mut self,
        route: RouteConfig,
        parent: Option<RecordId>,
        match_as: Option<RecordId>,
    ) -> Result<(), ConfigurationError> {
        let RouteConfig {
            path,
            name,
            views,
            children,
            aliases,
            redirect,
            before_enter,
            meta,
        } = route;

        let parent_path = parent.and_then(|p| self.get(p)).map(|p| p.path.clone());
        let Some(path) = path else {
            return Err(ConfigurationError::MissingPath {
                parent: parent_path.unwrap_or_else(|| String::from("/")),
            });
        };

        let path = normalize_route_path(&path, parent_path.as_deref());
        let pattern =
            Pattern::parse(&path).map_err(|source| ConfigurationError::InvalidPattern {
                path: path.clone(),
                source,
            })?;

        if let Some(name) = &name {
            let default_child = children
                .iter()
                .any(|c| matches!(c.path.as_deref(), Some("" | "/")));
            if default_child {
                self.warn(ResolutionWarning::AmbiguousDefaultChild { name: name.clone() });
            }
        }

        let id = RecordId(self.records.len());
        self.records.push(Rc::new(RouteRecord::new(
            id,
            path,
            pattern,
            name.clone(),
            parent,
            match_as,
            views,
            redirect,
            before_enter,
            meta,
        )));

        for child in children {
            self.add(child, Some(id), None)?;
        }

        for alias in aliases {
            let record_path = self.records[id.0].path.clone();
            let alias_path = normalize_route_path(&alias, parent_path.as_deref());
            if alias.trim().is_empty() || alias_path == record_path {
                self.warn(ResolutionWarning::MalformedAlias {
                    alias,
                    path: record_path,
                });
                continue;
            }
            self.add(RouteConfig::new(alias), parent, Some(id))?;
        }

        self.insert(id, name);
        Ok(())
    }

    fn insert(&mut self, id: RecordId, name: Option<String>) {
        let path = self.records[id.0].path.clone();

        if self.by_path.contains_key(&path) {
            debug!(r#"path "{path}" is already registered, first definition wins"#);
        } else {
            self.by_path.insert(path.clone(), id);
            self.ordered.push(id);
        }

        if let Some(name) = name {
            if self.by_name.contains_key(&name) {
                self.warn(ResolutionWarning::DuplicateName { name, path });
            } else {
                self.by_name.insert(name, id);
            }
        }
    }

    fn warn(&mut self, warning: ResolutionWarning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Get the record registered for the normalized `path`.
    ///
    /// This is an exact lookup, dynamic segments are not matched.
    #[must_use]
    pub fn by_path(&self, path: &str) -> Option<&Rc<RouteRecord>> {
        self.by_path.get(path).and_then(|id| self.get(*id))
    }

    /// Get the record registered for `name`.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Rc<RouteRecord>> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    /// Get a record by its identity.
    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<&Rc<RouteRecord>> {
        self.records.get(id.0)
    }

    /// All registered records, in registration order.
    pub fn records(&self) -> impl Iterator<Item = &Rc<RouteRecord>> {
        self.ordered.iter().filter_map(|id| self.get(*id))
    }

    /// All registered paths, in registration order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.records().map(|r| r.path())
    }

    /// All registered names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    /// The warnings recorded while building.
    pub fn warnings(&self) -> &[ResolutionWarning] {
        &self.warnings
    }

    /// The number of registered paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Whether no route was registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// The records with dynamic segments, in registration order.
    pub(crate) fn dynamic(&self) -> impl Iterator<Item = &Rc<RouteRecord>> {
        self.records().filter(|r| r.pattern.is_dynamic())
    }

    /// The chain of records from the root down to `record`.
    pub(crate) fn chain(&self, record: &Rc<RouteRecord>) -> Vec<Rc<RouteRecord>> {
        let mut chain = vec![record.clone()];
        let mut parent = record.parent;
        while let Some(p) = parent.and_then(|id| self.get(id)) {
            chain.push(p.clone());
            parent = p.parent;
        }
        chain.reverse();
        chain
    }
}

fn normalize_route_path(path: &str, parent: Option<&str>) -> String {
    let joined = match path.starts_with('/') {
        true => path.to_string(),
        false => format!("{}/{path}", parent.unwrap_or("")),
    };

    let mut path = clean_path(&joined);
    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::View;
    use pretty_assertions::assert_eq;

    #[test]
    fn paths_are_normalized() {
        assert_eq!(normalize_route_path("/", None), "/");
        assert_eq!(normalize_route_path("", None), "/");
        assert_eq!(normalize_route_path("foo", None), "/foo");
        assert_eq!(normalize_route_path("/foo/", None), "/foo");
        assert_eq!(normalize_route_path("", Some("/users")), "/users");
        assert_eq!(normalize_route_path("profile/", Some("/users/:id")), "/users/:id/profile");
        assert_eq!(normalize_route_path("/abs", Some("/users")), "/abs");
        assert_eq!(normalize_route_path("x", Some("/")), "/x");
    }

    #[test]
    fn missing_path_is_fatal() {
        let result = RouteTable::build([RouteConfig::new("/a").child(RouteConfig::default())]);
        match result {
            Err(ConfigurationError::MissingPath { parent }) => assert_eq!(parent, "/a"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn nested_records_point_to_parents() {
        let table = RouteTable::build([RouteConfig::new("/a")
            .child(RouteConfig::new("b").child(RouteConfig::new("c")))])
        .unwrap();

        let leaf = table.by_path("/a/b/c").unwrap();
        let chain: Vec<_> = table.chain(leaf).iter().map(|r| r.path.clone()).collect();
        assert_eq!(chain, vec!["/a", "/a/b", "/a/b/c"]);
    }

    #[test]
    fn first_definition_of_a_path_wins() {
        let table = RouteTable::build([
            RouteConfig::new("/dup").view(View::new("First")),
            RouteConfig::new("/dup/").view(View::new("Second")),
        ])
        .unwrap();

        assert_eq!(table.len(), 1);
        let view = table.by_path("/dup").unwrap().view("default").unwrap();
        assert_eq!(view.as_ready().unwrap().name(), "First");
    }

    #[test]
    fn duplicate_names_warn() {
        let table = RouteTable::build([
            RouteConfig::new("/a").name("same"),
            RouteConfig::new("/b").name("same"),
        ])
        .unwrap();

        assert_eq!(table.by_name("same").unwrap().path(), "/a");
        assert_eq!(
            table.warnings(),
            [ResolutionWarning::DuplicateName {
                name: String::from("same"),
                path: String::from("/b"),
            }]
        );
    }

    #[test]
    fn named_parent_with_default_child_warns() {
        let table = RouteTable::build([RouteConfig::new("/settings")
            .name("settings")
            .child(RouteConfig::new(""))])
        .unwrap();

        assert_eq!(
            table.warnings(),
            [ResolutionWarning::AmbiguousDefaultChild {
                name: String::from("settings")
            }]
        );
        // the default child was registered first, so it owns the path
        assert_eq!(
            table.by_path("/settings").unwrap().parent(),
            Some(table.by_name("settings").unwrap().id())
        );
    }

    #[test]
    fn alias_of_its_own_path_is_skipped() {
        let table = RouteTable::build([RouteConfig::new("/users")
            .child(RouteConfig::new("list").alias("").alias("/users/list/"))])
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.warnings().len(), 2);
        assert!(table.by_path("/users/list").unwrap().match_as().is_none());
    }

    #[test]
    fn aliases_are_siblings_pointing_at_the_route() {
        let table = RouteTable::build([RouteConfig::new("/users")
            .child(RouteConfig::new("list").alias("all").alias("/everyone"))])
        .unwrap();

        let canonical = table.by_path("/users/list").unwrap();
        for alias in ["/users/all", "/everyone"] {
            let record = table.by_path(alias).unwrap();
            assert_eq!(record.match_as(), Some(canonical.id()));
            assert_eq!(record.parent(), canonical.parent());
        }
    }
}
