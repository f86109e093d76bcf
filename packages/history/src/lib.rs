//! History Integration
//!
//! The router relies on so-called [`History`] stores to read the current location, to write new
//! locations (push or replace) and to step back and forth through the navigation history.
//!
//! Three stores ship with this crate:
//! - [`HashHistory`] keeps the location in the URL fragment (`/#/path`).
//! - [`BrowserHistory`] uses the browser's history API and the literal path.
//! - [`MemoryHistory`] keeps an explicit in-memory stack, for hosts without a browser.
//!
//! The two browser stores talk to their host through the [`Window`] port, so they can run against
//! a real browser (feature `web`) or against [`FakeWindow`] (feature `testing`).

#![deny(missing_docs)]

use std::rc::Rc;

mod browser;
pub use browser::*;

mod hash;
pub use hash::*;

mod memory;
pub use memory::*;

mod window;
pub use window::*;

#[cfg(feature = "web")]
mod web;
#[cfg(feature = "web")]
pub use web::*;

#[cfg(feature = "testing")]
mod fake;
#[cfg(feature = "testing")]
pub use fake::*;

/// What a [`History`] did when asked to step through its entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Traversal {
    /// The host performs the step and reports the new location through the callback registered
    /// with [`History::on_external_change`].
    Delegated,

    /// The step stays in process. The router should navigate to `location` and, once that
    /// navigation commits, confirm the move with [`History::settle`].
    InMemory {
        /// The entry the store would move to.
        index: usize,
        /// The location stored at that entry.
        location: String,
    },

    /// There is nowhere to go (the store is empty, or the clamped target is the current entry).
    Stay,
}

/// An integration with some kind of navigation history.
///
/// All locations exchanged with a [`History`] are full paths relative to the application base,
/// e.g. `/users/1?tab=posts#bio`. Stores that live under a base path are responsible for adding
/// and removing that base.
pub trait History {
    /// Get the location the store currently shows.
    ///
    /// **Must start** with `/`. **Must _not_ contain** the base.
    #[must_use]
    fn current_location(&self) -> String;

    /// Get the location the router should resolve when it starts.
    ///
    /// [`None`] means the store has nothing to offer yet and the router stays at its start route.
    #[must_use]
    fn initial_location(&self) -> Option<String> {
        Some(self.current_location())
    }

    /// Write a new entry, keeping the current one in the navigation history.
    fn push(&mut self, location: &str);

    /// Overwrite the current entry.
    fn replace(&mut self, location: &str);

    /// Step `delta` entries through the navigation history.
    fn go(&mut self, delta: isize) -> Traversal;

    /// Confirm an in-process traversal returned as [`Traversal::InMemory`].
    #[allow(unused_variables)]
    fn settle(&mut self, index: usize) {}

    /// Make the store show `location`, if it doesn't already.
    ///
    /// Used after a navigation was committed or aborted so that the visible location never
    /// disagrees with the router's current route.
    fn ensure_location(&mut self, location: &str, push: bool) {
        if self.current_location() != location {
            if push {
                self.push(location);
            } else {
                self.replace(location);
            }
        }
    }

    /// Build the `href` a link to `location` should carry.
    #[must_use]
    fn href(&self, location: &str) -> String {
        location.to_string()
    }

    /// Provide the store with a callback for location changes the router did not initiate.
    ///
    /// Stores that can't observe such changes ignore the callback.
    #[allow(unused_variables)]
    fn on_external_change(&mut self, callback: Rc<dyn Fn()>) {}
}

/// Collapse repeated `/` separators.
///
/// ```rust
/// # use waymark_history::clean_path;
/// assert_eq!(clean_path("/base//foo///bar"), "/base/foo/bar");
/// ```
#[must_use]
pub fn clean_path(path: &str) -> String {
    let mut cleaned = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && cleaned.ends_with('/') {
            continue;
        }
        cleaned.push(c);
    }
    cleaned
}

/// Normalize the base path an application is mounted under.
///
/// Without an explicit `base`, the `<base href>` of the host document is used, falling back to
/// `/`. The result starts with `/` and never ends with one, so the root base is the empty string.
///
/// ```rust
/// # use waymark_history::normalize_base;
/// assert_eq!(normalize_base(Some("app/"), None), "/app");
/// assert_eq!(normalize_base(None, None), "");
/// ```
#[must_use]
pub fn normalize_base(base: Option<&str>, window: Option<&dyn Window>) -> String {
    let mut base = match base {
        Some(base) if !base.is_empty() => base.to_string(),
        _ => window
            .and_then(|w| w.base_href())
            .map(|href| strip_origin(&href).to_string())
            .unwrap_or_else(|| String::from("/")),
    };

    if !base.starts_with('/') {
        base.insert(0, '/');
    }
    if base.ends_with('/') {
        base.pop();
    }
    base
}

// a `<base href>` may be absolute, only its path matters
fn strip_origin(href: &str) -> &str {
    match href.find("://") {
        Some(scheme_end) => {
            let rest = &href[scheme_end + 3..];
            rest.find('/').map(|i| &rest[i..]).unwrap_or("/")
        }
        None => href,
    }
}
