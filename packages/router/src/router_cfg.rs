use std::{
    fmt::{Display, Formatter},
    rc::Rc,
    str::FromStr,
};

use futures_util::task::LocalSpawn;
use tracing::{debug, info};
use waymark_history::{
    normalize_base, BrowserHistory, HashHistory, History, MemoryHistory, Window,
};

use crate::{
    error::ConfigurationError,
    matcher::Matcher,
    route_definition::{RouteConfig, RouteTable},
    router::Router,
};

/// How the router stores the location.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// In the URL fragment: `https://example.com/#/users/1`.
    #[default]
    Hash,

    /// In the URL path, via the browser's history API: `https://example.com/users/1`.
    History,

    /// In memory, for hosts without a browser.
    Abstract,
}

impl FromStr for Mode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hash" => Ok(Self::Hash),
            "history" => Ok(Self::History),
            "abstract" => Ok(Self::Abstract),
            other => Err(ConfigurationError::InvalidMode(other.to_string())),
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Hash => "hash",
            Self::History => "history",
            Self::Abstract => "abstract",
        })
    }
}

/// Global configuration options for the router.
///
/// This implements [`Default`] and follows the builder pattern, so you can use it like this:
/// ```rust
/// # use waymark_router::prelude::*;
/// let router = RouterConfig::default()
///     .routes([
///         RouteConfig::new("/").view(View::new("Home")),
///         RouteConfig::new("/about").view(View::new("About")),
///     ])
///     .mode("abstract".parse().unwrap())
///     .build()
///     .unwrap();
/// assert_eq!(router.mode(), Mode::Abstract);
/// ```
///
/// # Mode selection
/// The requested [`Mode`] is adjusted to the host:
/// - [`Mode::History`] on a host without history API support becomes [`Mode::Hash`], and a plain
///   path in the address bar is redirected once into the fragment.
/// - Without any [`Window`], every mode becomes [`Mode::Abstract`].
pub struct RouterConfig {
    routes: Vec<RouteConfig>,
    mode: Mode,
    base: Option<String>,
    window: Option<Rc<dyn Window>>,
    spawner: Option<Rc<dyn LocalSpawn>>,
    initial_path: Option<String>,
    redirect_limit: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            mode: Mode::default(),
            base: None,
            window: None,
            spawner: None,
            initial_path: None,
            redirect_limit: 16,
        }
    }
}

impl RouterConfig {
    /// Add route definitions.
    pub fn routes(mut self, routes: impl IntoIterator<Item = RouteConfig>) -> Self {
        self.routes.extend(routes);
        self
    }

    /// Add a single route definition.
    pub fn route(mut self, route: RouteConfig) -> Self {
        self.routes.push(route);
        self
    }

    /// The requested mode.
    ///
    /// Defaults to [`Mode::Hash`].
    pub fn mode(self, mode: Mode) -> Self {
        Self { mode, ..self }
    }

    /// The path the application lives under.
    ///
    /// Defaults to the document's `<base href>`, or `/` if there is none.
    pub fn base(self, base: impl Into<String>) -> Self {
        Self {
            base: Some(base.into()),
            ..self
        }
    }

    /// The browser window the router reads and writes the location through.
    ///
    /// With the `web` feature, this defaults to the current browser window, if there is one.
    pub fn window(self, window: Rc<dyn Window>) -> Self {
        Self {
            window: Some(window),
            ..self
        }
    }

    /// The executor the router runs navigations on that the host initiates (back and forward
    /// buttons, edits of the address bar).
    ///
    /// With the `web` feature, this defaults to the browser's microtask queue.
    pub fn spawner(self, spawner: impl LocalSpawn + 'static) -> Self {
        Self {
            spawner: Some(Rc::new(spawner)),
            ..self
        }
    }

    /// The first location of the in-memory history, used in [`Mode::Abstract`].
    ///
    /// Without it, the abstract history starts empty and [`Router::start`] doesn't navigate.
    pub fn initial_path(self, path: impl Into<String>) -> Self {
        Self {
            initial_path: Some(path.into()),
            ..self
        }
    }

    /// How many redirects a single resolution may follow.
    ///
    /// Defaults to 16.
    pub fn redirect_limit(self, limit: usize) -> Self {
        Self {
            redirect_limit: limit,
            ..self
        }
    }

    /// Build the [`Router`].
    ///
    /// # Errors
    /// - [`ConfigurationError::MissingPath`] and [`ConfigurationError::InvalidPattern`] for
    ///   malformed route definitions.
    /// - [`ConfigurationError::MissingSpawner`] if the selected mode is backed by a browser, but
    ///   no spawner is available.
    pub fn build(self) -> Result<Router, ConfigurationError> {
        let table = RouteTable::build(self.routes)?;

        let window = self.window.or_else(default_window);
        let spawner = self.spawner.or_else(default_spawner);

        let fallback = self.mode == Mode::History
            && window.as_ref().is_some_and(|w| !w.supports_history());
        let mode = match (&window, fallback) {
            (None, _) => Mode::Abstract,
            (Some(_), true) => Mode::Hash,
            (Some(_), false) => self.mode,
        };
        if mode != self.mode {
            info!("requested {} mode, using {mode} mode", self.mode);
        }

        if mode != Mode::Abstract && spawner.is_none() {
            return Err(ConfigurationError::MissingSpawner { mode });
        }

        let base = normalize_base(self.base.as_deref(), window.as_deref());
        let history: Box<dyn History> = match (mode, window) {
            (Mode::Hash, Some(window)) => Box::new(HashHistory::new(window, &*base, fallback)),
            (Mode::History, Some(window)) => Box::new(BrowserHistory::new(window, &*base)),
            _ => match self.initial_path {
                Some(path) => Box::new(MemoryHistory::with_initial_path(path)),
                None => Box::new(MemoryHistory::default()),
            },
        };
        debug!(r#"router uses {mode} mode with base "{base}""#);

        Ok(Router::new(
            Matcher::new(table, self.redirect_limit),
            history,
            mode,
            base,
            spawner,
        ))
    }
}

#[cfg(feature = "web")]
fn default_window() -> Option<Rc<dyn Window>> {
    waymark_history::WebWindow::new().map(|w| w as Rc<dyn Window>)
}

#[cfg(not(feature = "web"))]
fn default_window() -> Option<Rc<dyn Window>> {
    None
}

#[cfg(feature = "web")]
fn default_spawner() -> Option<Rc<dyn LocalSpawn>> {
    Some(Rc::new(WasmSpawner))
}

#[cfg(not(feature = "web"))]
fn default_spawner() -> Option<Rc<dyn LocalSpawn>> {
    None
}

/// Runs futures on the browser's microtask queue.
#[cfg(feature = "web")]
struct WasmSpawner;

#[cfg(feature = "web")]
impl LocalSpawn for WasmSpawner {
    fn spawn_local_obj(
        &self,
        future: futures_util::task::LocalFutureObj<'static, ()>,
    ) -> Result<(), futures_util::task::SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::LocalPool;
    use waymark_history::FakeWindow;

    #[test]
    fn modes_parse() {
        assert_eq!("hash".parse::<Mode>().unwrap(), Mode::Hash);
        assert_eq!("history".parse::<Mode>().unwrap(), Mode::History);
        assert_eq!("abstract".parse::<Mode>().unwrap(), Mode::Abstract);
        assert!(matches!(
            "html5".parse::<Mode>(),
            Err(ConfigurationError::InvalidMode(m)) if m == "html5"
        ));
    }

    // the web feature provides a default window and spawner
    #[cfg(not(feature = "web"))]
    #[test]
    fn without_window_mode_is_abstract() {
        let router = RouterConfig::default()
            .mode(Mode::History)
            .build()
            .unwrap();
        assert_eq!(router.mode(), Mode::Abstract);
    }

    #[test]
    fn history_falls_back_to_hash() {
        let window = FakeWindow::new("/app/users");
        window.set_supports_history(false);
        let pool = LocalPool::new();

        let router = RouterConfig::default()
            .mode(Mode::History)
            .base("/app/")
            .window(window.clone())
            .spawner(pool.spawner())
            .build()
            .unwrap();

        assert_eq!(router.mode(), Mode::Hash);
        assert_eq!(router.base(), "/app");
        assert_eq!(window.location(), "/app/#/users");
    }

    #[cfg(not(feature = "web"))]
    #[test]
    fn browser_modes_need_a_spawner() {
        let result = RouterConfig::default()
            .window(FakeWindow::new("/"))
            .build();
        assert!(matches!(
            result,
            Err(ConfigurationError::MissingSpawner { mode: Mode::Hash })
        ));
    }

    #[test]
    fn base_defaults_to_base_tag() {
        let window = FakeWindow::new("/shop/");
        window.set_base_href(Some("https://example.test/shop/"));
        let pool = LocalPool::new();

        let router = RouterConfig::default()
            .mode(Mode::History)
            .window(window)
            .spawner(pool.spawner())
            .build()
            .unwrap();
        assert_eq!(router.base(), "/shop");
    }

    #[test]
    fn configuration_errors_surface() {
        let result = RouterConfig::default()
            .route(RouteConfig::default())
            .build();
        assert!(matches!(
            result,
            Err(ConfigurationError::MissingPath { .. })
        ));
    }
}
