use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use tracing::error;

use crate::{clean_path, location_of, History, Traversal, Window};

/// A [`History`] store that integrates with a browser via the [History API].
///
/// The location is the literal path, query and fragment of the address bar. Every entry this store
/// writes carries an opaque key as its history state. The key only serves to correlate scroll
/// bookkeeping with entries; no application data is stored in the history.
///
/// If the browser refuses to add more entries, the store falls back to a full page navigation.
///
/// # Base
/// The `base` is removed from the path when reading the location, and prepended when writing it.
///
/// [History API]: https://developer.mozilla.org/en-US/docs/Web/API/History_API
pub struct BrowserHistory {
    window: Rc<dyn Window>,
    base: String,
    key: Rc<RefCell<String>>,
    counter: Rc<Cell<u64>>,
}

impl BrowserHistory {
    /// Create a new [`BrowserHistory`].
    ///
    /// `base` is expected to be normalized (see [`normalize_base`](crate::normalize_base)).
    pub fn new(window: Rc<dyn Window>, base: impl Into<String>) -> Self {
        let counter = Rc::new(Cell::new(0));
        let key = Rc::new(RefCell::new(gen_key(&*window, &counter)));

        Self {
            window,
            base: base.into(),
            key,
            counter,
        }
    }

    /// The key attached to the entry the store currently shows.
    pub fn state_key(&self) -> String {
        self.key.borrow().clone()
    }

    /// The base this store lives under.
    pub fn base(&self) -> &str {
        &self.base
    }

    fn write(&self, location: &str, replace: bool) {
        let url = clean_path(&format!("{}{}", self.base, location));

        let result = if replace {
            // the replaced entry can't be reached anymore, so it keeps its key
            let key = self.key.borrow().clone();
            self.window.replace_state(&key, &url)
        } else {
            let key = gen_key(&*self.window, &self.counter);
            *self.key.borrow_mut() = key.clone();
            self.window.push_state(&key, &url)
        };

        if let Err(e) = result {
            error!("failed to write history state for {url}: {e}");
            if replace {
                self.window.replace(&url);
            } else {
                self.window.assign(&url);
            }
        }
    }
}

impl History for BrowserHistory {
    fn current_location(&self) -> String {
        location_of(&*self.window, &self.base)
    }

    fn push(&mut self, location: &str) {
        self.write(location, false);
    }

    fn replace(&mut self, location: &str) {
        self.write(location, true);
    }

    fn go(&mut self, delta: isize) -> Traversal {
        self.window.go(delta);
        Traversal::Delegated
    }

    fn href(&self, location: &str) -> String {
        clean_path(&format!("{}{}", self.base, location))
    }

    fn on_external_change(&mut self, callback: Rc<dyn Fn()>) {
        let window = self.window.clone();
        let key = self.key.clone();

        self.window.on_pop_state(Rc::new(move || {
            if let Some(current) = window.state_key() {
                *key.borrow_mut() = current;
            }
            callback();
        }));
    }
}

// keys only need to be unique within one session
fn gen_key(window: &dyn Window, counter: &Cell<u64>) -> String {
    let n = counter.get();
    counter.set(n + 1);
    format!("{}-{n}", window.now() as u64)
}
