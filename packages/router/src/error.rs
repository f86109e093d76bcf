//! Errors and warnings reported by the router.

use thiserror::Error;

/// A mistake in the router configuration.
///
/// These are reported when the configuration is built, never at navigation time.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A route definition has no path.
    #[error(r#"a route definition below "{parent}" has no path"#)]
    MissingPath {
        /// The path of the enclosing route, `/` at the top level.
        parent: String,
    },

    /// The requested history mode doesn't exist.
    #[error(r#"invalid history mode: "{0}""#)]
    InvalidMode(String),

    /// A route path could not be compiled into a matcher.
    #[error(r#"invalid route path "{path}": {source}"#)]
    InvalidPattern {
        /// The offending path.
        path: String,
        /// The underlying compilation error.
        source: regex::Error,
    },

    /// A browser backed mode needs a spawner to react to host navigation.
    #[error("the {mode} mode needs a spawner for host navigation events")]
    MissingSpawner {
        /// The mode that was requested.
        mode: crate::router_cfg::Mode,
    },
}

/// A problem found while building the route table or resolving a location.
///
/// Warnings never stop the router: it logs them and carries on with a best effort result, which
/// for resolution means a route without matched records.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolutionWarning {
    /// Two route definitions share a name. The first one keeps it.
    #[error(r#"duplicate route name "{name}" on "{path}", the first definition wins"#)]
    DuplicateName {
        /// The contested name.
        name: String,
        /// The path of the definition that lost.
        path: String,
    },

    /// A named route has a child matching its own path.
    #[error(
        r#"named route "{name}" has a default child; navigating by that name won't render the child, name the child instead"#
    )]
    AmbiguousDefaultChild {
        /// The name of the parent route.
        name: String,
    },

    /// No route has the requested name.
    #[error(r#"no route named "{0}""#)]
    UnknownName(String),

    /// A named navigation lacks a parameter its path requires.
    #[error(r#"missing parameter "{param}" for route "{route}""#)]
    MissingParam {
        /// The route name or path.
        route: String,
        /// The absent parameter.
        param: String,
    },

    /// No route matches the path.
    #[error(r#"no route matches "{0}""#)]
    Unmatched(String),

    /// Following redirects didn't settle within the configured limit.
    #[error(r#"redirect limit of {limit} reached while resolving "{path}""#)]
    RedirectLimit {
        /// The path that started the chain.
        path: String,
        /// The configured limit.
        limit: usize,
    },

    /// An alias is empty or repeats the path of its route. It is skipped.
    #[error(r#"malformed alias "{alias}" on "{path}""#)]
    MalformedAlias {
        /// The alias as written.
        alias: String,
        /// The path of the aliased route.
        path: String,
    },

    /// A redirect target has neither a path nor a name.
    #[error(r#"invalid redirect on "{0}""#)]
    InvalidRedirect(String),
}

/// A lazily loaded view failed to load.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct LoadError(pub String);

impl LoadError {
    /// Create a [`LoadError`] from anything printable.
    pub fn new(message: impl ToString) -> Self {
        Self(message.to_string())
    }
}
