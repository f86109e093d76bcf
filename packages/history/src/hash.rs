use std::rc::Rc;

use tracing::{debug, info};

use crate::{clean_path, location_of, History, Traversal, Window};

/// A [`History`] store that keeps the location in the URL fragment.
///
/// The address bar looks like `https://example.com/app/#/users/1?tab=posts`. The fragment always
/// starts with `/`; a fragment that doesn't is corrected (by replacement, so no extra entry is
/// created) when the store is created and whenever the host reports a hash change.
///
/// # Fallback
/// When the history API was requested but the host can't provide it, the router uses this store
/// in _fallback_ mode. If the address bar then still shows a plain path, the store redirects once
/// into the fragment form (`/app/users` becomes `/app/#/users`).
pub struct HashHistory {
    window: Rc<dyn Window>,
    base: String,
    redirected: bool,
}

impl HashHistory {
    /// Create a new [`HashHistory`].
    ///
    /// `base` is expected to be normalized (see [`normalize_base`](crate::normalize_base)).
    pub fn new(window: Rc<dyn Window>, base: impl Into<String>, fallback: bool) -> Self {
        let mut history = Self {
            window,
            base: base.into(),
            redirected: false,
        };

        if fallback && history.check_fallback() {
            history.redirected = true;
        } else {
            ensure_slash(&*history.window);
        }

        history
    }

    /// Whether creating the store redirected a plain path into the fragment form.
    pub fn redirected(&self) -> bool {
        self.redirected
    }

    fn check_fallback(&self) -> bool {
        let location = location_of(&*self.window, &self.base);
        if location.starts_with("/#") {
            return false;
        }

        let target = clean_path(&format!("{}/#{}", self.base, location));
        info!("history api unavailable, redirecting to {target}");
        self.window.replace(&target);
        true
    }
}

impl History for HashHistory {
    fn current_location(&self) -> String {
        hash_of(&*self.window)
    }

    fn push(&mut self, location: &str) {
        self.window.set_hash(location);
    }

    fn replace(&mut self, location: &str) {
        replace_hash(&*self.window, location);
    }

    fn go(&mut self, delta: isize) -> Traversal {
        self.window.go(delta);
        Traversal::Delegated
    }

    fn href(&self, location: &str) -> String {
        clean_path(&format!("{}/#{}", self.base, location))
    }

    fn on_external_change(&mut self, callback: Rc<dyn Fn()>) {
        let window = self.window.clone();
        self.window.on_hash_change(Rc::new(move || {
            // a corrected fragment triggers another change, which is the one to act on
            if ensure_slash(&*window) {
                callback();
            }
        }));
    }
}

/// Get the fragment of `window` without its `#`.
///
/// This reads `href` rather than `location.hash`, because some browsers decode the latter.
#[must_use]
pub fn hash_of(window: &dyn Window) -> String {
    let href = window.href();
    match href.find('#') {
        Some(i) => href[i + 1..].to_string(),
        None => String::new(),
    }
}

fn ensure_slash(window: &dyn Window) -> bool {
    let path = hash_of(window);
    if path.starts_with('/') {
        return true;
    }

    debug!("fragment {path:?} doesn't start with a slash, correcting it");
    replace_hash(window, &format!("/{path}"));
    false
}

fn replace_hash(window: &dyn Window, path: &str) {
    let href = window.href();
    let without_fragment = match href.find('#') {
        Some(i) => &href[..i],
        None => &href[..],
    };
    window.replace(&format!("{without_fragment}#{path}"));
}
