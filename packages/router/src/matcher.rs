//! Resolution of locations to routes.

use std::rc::Rc;

use tracing::{trace, warn};

use crate::{
    error::ResolutionWarning,
    navigation::{normalize_location, parse_path, resolve_path, Location, Query},
    route::Route,
    route_definition::{Pattern, RecordId, Redirect, RouteRecord, RouteTable},
};

/// Resolves locations to [`Route`]s.
///
/// Resolution never fails. Problems are logged as [`ResolutionWarning`]s and produce a route
/// without matched records.
pub struct Matcher {
    table: RouteTable,
    redirect_limit: usize,
}

impl Matcher {
    /// Create a [`Matcher`] for `table`, following at most `redirect_limit` redirects per
    /// resolution.
    pub fn new(table: RouteTable, redirect_limit: usize) -> Self {
        Self {
            table,
            redirect_limit,
        }
    }

    /// The routes this matcher resolves against.
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Resolve `raw` relative to `current`.
    ///
    /// 1. The location is normalized against the path of `current`.
    /// 2. A named location is looked up by name and its params are filled into the path.
    /// 3. A path location is looked up by its exact path, then matched against the dynamic
    ///    routes in registration order.
    /// 4. Redirects are followed and aliases replaced by the routes they stand for.
    pub fn resolve(&self, raw: impl Into<Location>, current: &Route) -> Route {
        let location = normalize_location(raw.into(), Some(current));
        self.match_location(location, None, 0)
    }

    fn match_location(
        &self,
        mut location: Location,
        redirected_from: Option<String>,
        depth: usize,
    ) -> Route {
        if let Some(name) = location.name.clone() {
            let Some(record) = self.table.by_name(&name) else {
                return unmatched(
                    ResolutionWarning::UnknownName(name),
                    &location,
                    redirected_from,
                );
            };

            match record.pattern.fill(&location.params) {
                Ok(path) => location.path = Some(path),
                Err(param) => {
                    return unmatched(
                        ResolutionWarning::MissingParam { route: name, param },
                        &location,
                        redirected_from,
                    )
                }
            }

            return self.create_route(record, location, redirected_from, depth);
        }

        let path = location.path.clone().unwrap_or_else(|| String::from("/"));
        location.params.clear();

        if let Some(record) = self.lookup_exact(&path) {
            return self.create_route(record, location, redirected_from, depth);
        }

        for record in self.table.dynamic() {
            if let Some(params) = record.pattern.captures(&path) {
                location.params = params;
                return self.create_route(record, location, redirected_from, depth);
            }
        }

        unmatched(
            ResolutionWarning::Unmatched(path),
            &location,
            redirected_from,
        )
    }

    fn lookup_exact(&self, path: &str) -> Option<&Rc<RouteRecord>> {
        self.table.by_path(path).or_else(|| match path.strip_suffix('/') {
            Some(trimmed) if !trimmed.is_empty() => self.table.by_path(trimmed),
            _ => None,
        })
    }

    fn create_route(
        &self,
        record: &Rc<RouteRecord>,
        location: Location,
        redirected_from: Option<String>,
        depth: usize,
    ) -> Route {
        if let Some(redirect) = &record.redirect {
            return self.redirect(record, redirect, location, redirected_from, depth);
        }

        if let Some(canonical) = record.match_as {
            return self.alias(canonical, location, redirected_from, depth);
        }

        Route::new(self.table.chain(record), &location, redirected_from)
    }

    fn redirect(
        &self,
        record: &Rc<RouteRecord>,
        redirect: &Redirect,
        location: Location,
        redirected_from: Option<String>,
        depth: usize,
    ) -> Route {
        let from = redirected_from.unwrap_or_else(|| location.full_path());

        if depth >= self.redirect_limit {
            return unmatched(
                ResolutionWarning::RedirectLimit {
                    path: from.clone(),
                    limit: self.redirect_limit,
                },
                &location,
                Some(from),
            );
        }

        let target = match redirect {
            Redirect::To(target) => target.clone(),
            Redirect::Dynamic(redirect) => {
                redirect(&Route::new(self.table.chain(record), &location, None))
            }
        };
        trace!("redirecting {from} to {target:?}");

        let params = match target.params.is_empty() {
            true => location.params.clone(),
            false => target.params.clone(),
        };

        if let Some(name) = target.name {
            let mut next = Location::named(name)
                .with_query(inherit_query(target.query, &location))
                .hash(inherit_hash(target.hash, "", &location));
            next.params = params;
            return self.match_location(normalize_location(next, None), Some(from), depth + 1);
        }

        let Some(path) = target.path else {
            return unmatched(
                ResolutionWarning::InvalidRedirect(record.path.clone()),
                &location,
                Some(from),
            );
        };

        let (raw_path, raw_query, raw_hash) = parse_path(&path);
        let mut query = Query::parse(raw_query);
        query.merge(&target.query);

        let parent_path = record
            .parent
            .and_then(|p| self.table.get(p))
            .map(|p| p.path())
            .unwrap_or("/");
        let raw_path = resolve_path(raw_path, parent_path, true);

        let filled = match Pattern::parse(&raw_path) {
            Ok(pattern) => pattern.fill(&params),
            Err(_) => {
                return unmatched(
                    ResolutionWarning::InvalidRedirect(record.path.clone()),
                    &location,
                    Some(from),
                )
            }
        };
        let filled = match filled {
            Ok(filled) => filled,
            Err(param) => {
                return unmatched(
                    ResolutionWarning::MissingParam {
                        route: raw_path,
                        param,
                    },
                    &location,
                    Some(from),
                )
            }
        };

        let next = Location::path(filled)
            .with_query(inherit_query(query, &location))
            .hash(inherit_hash(target.hash, raw_hash, &location));
        self.match_location(normalize_location(next, None), Some(from), depth + 1)
    }

    fn alias(
        &self,
        canonical: RecordId,
        mut location: Location,
        redirected_from: Option<String>,
        depth: usize,
    ) -> Route {
        let Some(canonical) = self.table.get(canonical) else {
            let path = location.path.clone().unwrap_or_default();
            return unmatched(ResolutionWarning::Unmatched(path), &location, redirected_from);
        };

        let aliased_path = match canonical.pattern.fill(&location.params) {
            Ok(path) => path,
            Err(param) => {
                return unmatched(
                    ResolutionWarning::MissingParam {
                        route: canonical.path.clone(),
                        param,
                    },
                    &location,
                    redirected_from,
                )
            }
        };

        let aliased = self.match_location(
            normalize_location(Location::path(aliased_path), None),
            None,
            depth,
        );

        // the location keeps the alias path, but activates what the canonical path activates
        location.params = aliased.params().clone();
        Route::new(aliased.matched().to_vec(), &location, redirected_from)
    }
}

fn inherit_query(own: Query, location: &Location) -> Query {
    match own.is_empty() {
        true => location.query.clone(),
        false => own,
    }
}

fn inherit_hash(own: String, parsed: &str, location: &Location) -> String {
    match (own.is_empty(), parsed.is_empty()) {
        (false, _) => own,
        (true, false) => parsed.to_string(),
        (true, true) => location.hash.clone(),
    }
}

fn unmatched(
    warning: ResolutionWarning,
    location: &Location,
    redirected_from: Option<String>,
) -> Route {
    warn!("{warning}");
    Route::unmatched(location, redirected_from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{route_definition::RouteConfig, view::View};
    use pretty_assertions::assert_eq;

    fn matcher(routes: impl IntoIterator<Item = RouteConfig>) -> Matcher {
        Matcher::new(RouteTable::build(routes).unwrap(), 16)
    }

    fn paths(route: &Route) -> Vec<&str> {
        route.matched().iter().map(|r| r.path()).collect()
    }

    #[test]
    fn flat_routes() {
        let matcher = matcher([
            RouteConfig::new("/").view(View::new("Home")),
            RouteConfig::new("/foo").view(View::new("Foo")),
            RouteConfig::new("/bar").view(View::new("Bar")),
        ]);

        let route = matcher.resolve("/foo", &Route::start());
        assert_eq!(route.path(), "/foo");
        assert_eq!(paths(&route), vec!["/foo"]);
        assert!(route.query().is_empty());
        assert_eq!(route.hash(), "");
        assert_eq!(route.redirected_from(), None);
    }

    #[test]
    fn nested_chain_is_root_first() {
        let matcher = matcher([RouteConfig::new("/users")
            .child(RouteConfig::new(":id").child(RouteConfig::new("posts")))]);

        let route = matcher.resolve("/users/7/posts?page=2", &Route::start());
        assert_eq!(paths(&route), vec!["/users", "/users/:id", "/users/:id/posts"]);
        assert_eq!(route.param("id"), Some("7"));
        assert_eq!(route.full_path(), "/users/7/posts?page=2");
    }

    #[test]
    fn relative_locations_resolve_against_current() {
        let matcher = matcher([RouteConfig::new("/a/*")]);
        let current = matcher.resolve("/a/b", &Route::start());

        assert_eq!(matcher.resolve("c", &current).path(), "/a/c");
        assert_eq!(matcher.resolve(Location::path("c").append(), &current).path(), "/a/b/c");
        assert_eq!(matcher.resolve("?x=1", &current).full_path(), "/a/b?x=1");
    }

    #[test]
    fn exact_paths_win_over_dynamic_ones() {
        let matcher = matcher([
            RouteConfig::new("/users/:id").name("user"),
            RouteConfig::new("/users/new").name("new-user"),
        ]);

        assert_eq!(matcher.resolve("/users/new", &Route::start()).name(), Some("new-user"));
        assert_eq!(matcher.resolve("/users/new/", &Route::start()).name(), Some("new-user"));
        assert_eq!(matcher.resolve("/users/1", &Route::start()).name(), Some("user"));
    }

    #[test]
    fn named_locations_fill_params() {
        let matcher = matcher([RouteConfig::new("/users/:id").name("user")]);

        let route = matcher.resolve(
            Location::named("user").param("id", "a b").query("tab", "x").hash("bio"),
            &Route::start(),
        );
        assert_eq!(route.full_path(), "/users/a%20b?tab=x#bio");
        assert_eq!(route.param("id"), Some("a b"));
        assert_eq!(paths(&route), vec!["/users/:id"]);
    }

    #[test]
    fn named_resolution_fails_softly() {
        let matcher = matcher([RouteConfig::new("/users/:id").name("user")]);

        let unknown = matcher.resolve(Location::named("nobody"), &Route::start());
        assert!(!unknown.is_matched());
        assert_eq!(unknown.path(), "/");

        let missing = matcher.resolve(Location::named("user"), &Route::start());
        assert!(!missing.is_matched());
    }

    #[test]
    fn unmatched_paths_keep_the_location() {
        let matcher = matcher([RouteConfig::new("/")]);
        let route = matcher.resolve("/nope?x=1", &Route::start());
        assert!(!route.is_matched());
        assert_eq!(route.full_path(), "/nope?x=1");
    }

    #[test]
    fn aliases_activate_the_canonical_chain() {
        let matcher = matcher([RouteConfig::new("/users")
            .view(View::new("Users"))
            .child(RouteConfig::new(":id").view(View::new("User")).alias("/u/:id"))]);

        let canonical = matcher.resolve("/users/3", &Route::start());
        let aliased = matcher.resolve("/u/3", &Route::start());

        assert_eq!(aliased.path(), "/u/3");
        assert_eq!(aliased.param("id"), Some("3"));
        assert!(aliased.same_records(&canonical));
    }

    #[test]
    fn redirects_follow_and_remember_origin() {
        let matcher = matcher([
            RouteConfig::new("/old").redirect("/new"),
            RouteConfig::new("/new").name("new"),
        ]);

        let route = matcher.resolve("/old?keep=1#frag", &Route::start());
        assert_eq!(route.full_path(), "/new?keep=1#frag");
        assert_eq!(route.name(), Some("new"));
        assert_eq!(route.redirected_from(), Some("/old?keep=1#frag"));
    }

    #[test]
    fn redirects_by_name_relative_and_dynamic() {
        let matcher = matcher([
            RouteConfig::new("/users/:id").name("user"),
            RouteConfig::new("/profile/:id").redirect(Location::named("user")),
            RouteConfig::new("/team")
                .child(RouteConfig::new("lead").redirect("members?sort=age"))
                .child(RouteConfig::new("members")),
            RouteConfig::new("/search/:q").redirect(Redirect::dynamic(|to| {
                Location::path("/find").query("q", to.param("q").unwrap_or_default())
            })),
            RouteConfig::new("/find"),
        ]);

        let named = matcher.resolve("/profile/5", &Route::start());
        assert_eq!(named.full_path(), "/users/5");

        let relative = matcher.resolve("/team/lead", &Route::start());
        assert_eq!(relative.full_path(), "/team/members?sort=age");
        assert_eq!(paths(&relative), vec!["/team", "/team/members"]);

        let dynamic = matcher.resolve("/search/rust", &Route::start());
        assert_eq!(dynamic.full_path(), "/find?q=rust");
    }

    #[test]
    fn redirect_cycles_are_bounded() {
        let matcher = Matcher::new(
            RouteTable::build([
                RouteConfig::new("/ping").redirect("/pong"),
                RouteConfig::new("/pong").redirect("/ping"),
            ])
            .unwrap(),
            4,
        );

        let route = matcher.resolve("/ping", &Route::start());
        assert!(!route.is_matched());
        assert_eq!(route.redirected_from(), Some("/ping"));
    }

    #[test]
    fn redirect_without_target_is_invalid() {
        let matcher = matcher([RouteConfig::new("/broken").redirect(Location::default())]);
        assert!(!matcher.resolve("/broken", &Route::start()).is_matched());
    }
}
