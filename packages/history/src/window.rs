use std::rc::Rc;

/// A failed call into the host's history API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    /// The host refuses to create more history entries (e.g. Safari's `pushState` limit).
    #[error("the history entry limit was reached")]
    QuotaExceeded,

    /// Any other rejection, carrying the host's description.
    #[error("the host rejected the call: {0}")]
    Host(String),
}

/// The parts of a browser window the browser-backed [`History`](crate::History) stores use.
///
/// Implementations should behave like the [Location API] and the [History API]. A `web-sys`
/// implementation is available with the `web` feature, a scriptable one with the `testing`
/// feature.
///
/// [Location API]: https://developer.mozilla.org/en-US/docs/Web/API/Location
/// [History API]: https://developer.mozilla.org/en-US/docs/Web/API/History_API
pub trait Window {
    /// The complete URL, like `location.href`.
    fn href(&self) -> String;

    /// The path, like `location.pathname`.
    fn pathname(&self) -> String;

    /// The query including its leading `?`, or an empty string.
    fn search(&self) -> String;

    /// The fragment including its leading `#`, or an empty string.
    fn hash(&self) -> String;

    /// The `href` of the document's `<base>` element, if there is one.
    fn base_href(&self) -> Option<String> {
        None
    }

    /// Whether `pushState` and `replaceState` are available.
    fn supports_history(&self) -> bool;

    /// Add a history entry for `url`, attaching `key` as opaque state.
    fn push_state(&self, key: &str, url: &str) -> Result<(), WindowError>;

    /// Overwrite the current history entry with `url`, attaching `key` as opaque state.
    fn replace_state(&self, key: &str, url: &str) -> Result<(), WindowError>;

    /// The key attached to the current history entry, if any.
    fn state_key(&self) -> Option<String>;

    /// Navigate to `url` with a full page load, like `location.assign`.
    fn assign(&self, url: &str);

    /// Replace the current page with `url`, like `location.replace`.
    fn replace(&self, url: &str);

    /// Set the fragment, like assigning `location.hash`. Creates a history entry.
    fn set_hash(&self, hash: &str);

    /// Step through the session history, like `history.go`.
    fn go(&self, delta: isize);

    /// A millisecond clock, like `Date.now`.
    fn now(&self) -> f64;

    /// Call `callback` whenever a `popstate` event fires.
    fn on_pop_state(&self, callback: Rc<dyn Fn()>);

    /// Call `callback` whenever a `hashchange` event fires.
    fn on_hash_change(&self, callback: Rc<dyn Fn()>);
}

/// Get the location of `window` relative to `base`, including query and fragment.
///
/// ```rust
/// # use waymark_history::{location_of, FakeWindow};
/// let window = FakeWindow::new("/app/users?page=2#top");
/// assert_eq!(location_of(&*window, "/app"), "/users?page=2#top");
/// assert_eq!(location_of(&*window, ""), "/app/users?page=2#top");
/// ```
#[must_use]
pub fn location_of(window: &dyn Window, base: &str) -> String {
    let pathname = window.pathname();
    // only whole segments: "/app" is no prefix of "/application"
    let mut path = match pathname.strip_prefix(base) {
        Some(rest) if !base.is_empty() && (rest.is_empty() || rest.starts_with('/')) => {
            rest.to_string()
        }
        _ => pathname,
    };
    if path.is_empty() {
        path.push('/');
    }
    path + &window.search() + &window.hash()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FakeWindow;
    use pretty_assertions::assert_eq;

    #[test]
    fn base_is_stripped_by_whole_segments() {
        assert_eq!(location_of(&*FakeWindow::new("/app"), "/app"), "/");
        assert_eq!(location_of(&*FakeWindow::new("/app/x?q=1"), "/app"), "/x?q=1");
        assert_eq!(
            location_of(&*FakeWindow::new("/application/x"), "/app"),
            "/application/x"
        );
    }
}
