use std::{cell::RefCell, rc::Rc};

use gloo::events::EventListener;
use tracing::error;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{DomException, History};

use crate::{Window, WindowError};

/// A [`Window`] backed by the browser's `window` object.
///
/// Event listeners registered through this window live as long as the [`WebWindow`] does.
pub struct WebWindow {
    window: web_sys::Window,
    history: History,
    listeners: RefCell<Vec<EventListener>>,
}

impl WebWindow {
    /// Create a [`WebWindow`] for the current browsing context.
    ///
    /// Returns [`None`] outside of a browser (e.g. in a worker), or if `history` is inaccessible.
    pub fn new() -> Option<Rc<Self>> {
        let window = web_sys::window()?;
        let history = window.history().ok()?;

        Some(Rc::new(Self {
            window,
            history,
            listeners: RefCell::new(Vec::new()),
        }))
    }

    fn location(&self) -> web_sys::Location {
        self.window.location()
    }

    fn listen(&self, event: &'static str, callback: Rc<dyn Fn()>) {
        let listener = EventListener::new(&self.window, event, move |_| callback());
        self.listeners.borrow_mut().push(listener);
    }
}

impl Window for WebWindow {
    fn href(&self) -> String {
        self.location().href().unwrap_or_default()
    }

    fn pathname(&self) -> String {
        self.location()
            .pathname()
            .unwrap_or_else(|_| String::from("/"))
    }

    fn search(&self) -> String {
        self.location().search().unwrap_or_default()
    }

    fn hash(&self) -> String {
        self.location().hash().unwrap_or_default()
    }

    fn base_href(&self) -> Option<String> {
        let document = self.window.document()?;
        let base = document.query_selector("base").ok()??;
        base.get_attribute("href")
    }

    fn supports_history(&self) -> bool {
        // feature detect `pushState`, some embedded browsers ship without it
        js_sys::Reflect::has(&self.history, &JsValue::from_str("pushState")).unwrap_or(false)
    }

    fn push_state(&self, key: &str, url: &str) -> Result<(), WindowError> {
        self.history
            .push_state_with_url(&state_of(key), "", Some(url))
            .map_err(window_error)
    }

    fn replace_state(&self, key: &str, url: &str) -> Result<(), WindowError> {
        self.history
            .replace_state_with_url(&state_of(key), "", Some(url))
            .map_err(window_error)
    }

    fn state_key(&self) -> Option<String> {
        let state = self.history.state().ok()?;
        if !state.is_object() {
            return None;
        }
        js_sys::Reflect::get(&state, &JsValue::from_str("key"))
            .ok()?
            .as_string()
    }

    fn assign(&self, url: &str) {
        if let Err(e) = self.location().assign(url) {
            error!("failed to navigate to {url}: {e:?}");
        }
    }

    fn replace(&self, url: &str) {
        if let Err(e) = self.location().replace(url) {
            error!("failed to replace the page with {url}: {e:?}");
        }
    }

    fn set_hash(&self, hash: &str) {
        if let Err(e) = self.location().set_hash(hash) {
            error!("failed to set the fragment to {hash}: {e:?}");
        }
    }

    fn go(&self, delta: isize) {
        if let Err(e) = self.history.go_with_delta(delta as i32) {
            error!("failed to traverse history by {delta}: {e:?}");
        }
    }

    fn now(&self) -> f64 {
        js_sys::Date::now()
    }

    fn on_pop_state(&self, callback: Rc<dyn Fn()>) {
        self.listen("popstate", callback);
    }

    fn on_hash_change(&self, callback: Rc<dyn Fn()>) {
        self.listen("hashchange", callback);
    }
}

fn state_of(key: &str) -> JsValue {
    let state = js_sys::Object::new();
    if let Err(e) = js_sys::Reflect::set(&state, &JsValue::from_str("key"), &JsValue::from_str(key))
    {
        error!("failed to build history state: {e:?}");
    }
    state.into()
}

fn window_error(value: JsValue) -> WindowError {
    match value.dyn_ref::<DomException>() {
        Some(e) if e.name() == "QuotaExceededError" => WindowError::QuotaExceeded,
        Some(e) => WindowError::Host(e.message()),
        None => WindowError::Host(format!("{value:?}")),
    }
}
