use std::{
    cell::RefCell,
    collections::VecDeque,
    rc::Rc,
};

use tracing::error;
use url::{Position, Url};

use crate::{Window, WindowError};

const ORIGIN: &str = "https://example.test/";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FakeEvent {
    PopState,
    HashChange,
}

struct Entry {
    url: Url,
    key: Option<String>,
}

struct FakeState {
    entries: Vec<Entry>,
    index: usize,
    supports_history: bool,
    push_quota: Option<usize>,
    base_href: Option<String>,
    clock: f64,
    page_loads: Vec<String>,
    pop_listeners: Vec<Rc<dyn Fn()>>,
    hash_listeners: Vec<Rc<dyn Fn()>>,
    queue: VecDeque<FakeEvent>,
}

/// A scriptable [`Window`] that emulates a browser's session history.
///
/// Events are not delivered while the window is being changed. Like a browser, the window queues
/// `popstate` and `hashchange` events, and [`FakeWindow::dispatch`] delivers them, which stands in
/// for the host's event loop.
///
/// ```rust
/// # use waymark_history::{FakeWindow, Window};
/// let window = FakeWindow::new("/start");
/// window.push_state("k1", "/next?x=1").unwrap();
/// assert_eq!(window.location(), "/next?x=1");
/// assert_eq!(window.entries().len(), 2);
///
/// window.go(-1);
/// assert_eq!(window.location(), "/start");
/// assert_eq!(window.dispatch(), 1);
/// ```
pub struct FakeWindow {
    state: RefCell<FakeState>,
}

impl FakeWindow {
    /// Create a window showing `location` (a path with optional query and fragment).
    pub fn new(location: &str) -> Rc<Self> {
        let origin = Url::parse(ORIGIN).expect("the fake origin is a valid url");
        let url = resolve(&origin, location);

        Rc::new(Self {
            state: RefCell::new(FakeState {
                entries: vec![Entry { url, key: None }],
                index: 0,
                supports_history: true,
                push_quota: None,
                base_href: None,
                clock: 0.0,
                page_loads: Vec::new(),
                pop_listeners: Vec::new(),
                hash_listeners: Vec::new(),
                queue: VecDeque::new(),
            }),
        })
    }

    /// The current location as path, query and fragment.
    pub fn location(&self) -> String {
        let state = self.state.borrow();
        state.entries[state.index].url[Position::BeforePath..].to_string()
    }

    /// The locations of all session history entries, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.state
            .borrow()
            .entries
            .iter()
            .map(|e| e.url[Position::BeforePath..].to_string())
            .collect()
    }

    /// The index of the current entry.
    pub fn index(&self) -> usize {
        self.state.borrow().index
    }

    /// Every location that was loaded with a full page navigation.
    pub fn page_loads(&self) -> Vec<String> {
        self.state.borrow().page_loads.clone()
    }

    /// Control whether `pushState` and `replaceState` are available.
    pub fn set_supports_history(&self, supported: bool) {
        self.state.borrow_mut().supports_history = supported;
    }

    /// Limit how many more entries `pushState` may create. [`None`] means unlimited.
    pub fn set_push_quota(&self, quota: Option<usize>) {
        self.state.borrow_mut().push_quota = quota;
    }

    /// Set the `href` of the emulated `<base>` element.
    pub fn set_base_href(&self, href: Option<&str>) {
        self.state.borrow_mut().base_href = href.map(ToString::to_string);
    }

    /// Deliver all queued events, including those queued by listeners while dispatching.
    ///
    /// Returns how many events were delivered.
    pub fn dispatch(&self) -> usize {
        let mut delivered = 0;

        loop {
            let listeners = {
                let mut state = self.state.borrow_mut();
                match state.queue.pop_front() {
                    Some(FakeEvent::PopState) => state.pop_listeners.clone(),
                    Some(FakeEvent::HashChange) => state.hash_listeners.clone(),
                    None => break,
                }
            };

            for listener in listeners {
                listener();
            }
            delivered += 1;
        }

        delivered
    }

    fn current_url(&self) -> Url {
        let state = self.state.borrow();
        state.entries[state.index].url.clone()
    }

    fn add_entry(&self, url: Url, key: Option<String>) {
        let mut state = self.state.borrow_mut();
        let keep = state.index + 1;
        state.entries.truncate(keep);
        state.entries.push(Entry { url, key });
        state.index = keep;
    }

    fn overwrite_entry(&self, url: Url, key: Option<String>) {
        let mut state = self.state.borrow_mut();
        let index = state.index;
        state.entries[index] = Entry { url, key };
    }

    fn page_load(&self, url: &Url) {
        let mut state = self.state.borrow_mut();
        state
            .page_loads
            .push(url[Position::BeforePath..].to_string());
        // a new document drops the listeners of the old one
        state.queue.clear();
    }
}

impl Window for FakeWindow {
    fn href(&self) -> String {
        self.current_url().to_string()
    }

    fn pathname(&self) -> String {
        self.current_url().path().to_string()
    }

    fn search(&self) -> String {
        self.current_url()
            .query()
            .map(|q| format!("?{q}"))
            .unwrap_or_default()
    }

    fn hash(&self) -> String {
        self.current_url()
            .fragment()
            .map(|f| format!("#{f}"))
            .unwrap_or_default()
    }

    fn base_href(&self) -> Option<String> {
        self.state.borrow().base_href.clone()
    }

    fn supports_history(&self) -> bool {
        self.state.borrow().supports_history
    }

    fn push_state(&self, key: &str, url: &str) -> Result<(), WindowError> {
        {
            let mut state = self.state.borrow_mut();
            if !state.supports_history {
                return Err(WindowError::Host(String::from("pushState is not available")));
            }
            match &mut state.push_quota {
                Some(0) => return Err(WindowError::QuotaExceeded),
                Some(quota) => *quota -= 1,
                None => {}
            }
        }

        let url = resolve(&self.current_url(), url);
        self.add_entry(url, Some(key.to_string()));
        Ok(())
    }

    fn replace_state(&self, key: &str, url: &str) -> Result<(), WindowError> {
        if !self.state.borrow().supports_history {
            return Err(WindowError::Host(String::from(
                "replaceState is not available",
            )));
        }

        let url = resolve(&self.current_url(), url);
        self.overwrite_entry(url, Some(key.to_string()));
        Ok(())
    }

    fn state_key(&self) -> Option<String> {
        let state = self.state.borrow();
        state.entries[state.index].key.clone()
    }

    fn assign(&self, url: &str) {
        let current = self.current_url();
        let url = resolve(&current, url);
        if same_document(&current, &url) {
            let changed = current.fragment() != url.fragment();
            self.add_entry(url, None);
            if changed {
                self.state.borrow_mut().queue.push_back(FakeEvent::HashChange);
            }
        } else {
            self.add_entry(url.clone(), None);
            self.page_load(&url);
        }
    }

    fn replace(&self, url: &str) {
        let current = self.current_url();
        let url = resolve(&current, url);
        if same_document(&current, &url) {
            let changed = current.fragment() != url.fragment();
            self.overwrite_entry(url, None);
            if changed {
                self.state.borrow_mut().queue.push_back(FakeEvent::HashChange);
            }
        } else {
            self.overwrite_entry(url.clone(), None);
            self.page_load(&url);
        }
    }

    fn set_hash(&self, hash: &str) {
        let current = self.current_url();
        let mut url = current.clone();
        url.set_fragment(Some(hash.strip_prefix('#').unwrap_or(hash)));

        if url != current {
            self.add_entry(url, None);
            self.state.borrow_mut().queue.push_back(FakeEvent::HashChange);
        }
    }

    fn go(&self, delta: isize) {
        let mut state = self.state.borrow_mut();
        let target = state.index as isize + delta;
        if delta == 0 || target < 0 || target >= state.entries.len() as isize {
            return;
        }

        let previous = state.entries[state.index].url.fragment().map(ToString::to_string);
        state.index = target as usize;
        let hash_changed = state.entries[state.index].url.fragment() != previous.as_deref();

        state.queue.push_back(FakeEvent::PopState);
        if hash_changed {
            state.queue.push_back(FakeEvent::HashChange);
        }
    }

    fn now(&self) -> f64 {
        let mut state = self.state.borrow_mut();
        state.clock += 1.0;
        state.clock
    }

    fn on_pop_state(&self, callback: Rc<dyn Fn()>) {
        self.state.borrow_mut().pop_listeners.push(callback);
    }

    fn on_hash_change(&self, callback: Rc<dyn Fn()>) {
        self.state.borrow_mut().hash_listeners.push(callback);
    }
}

fn resolve(base: &Url, url: &str) -> Url {
    base.join(url).unwrap_or_else(|e| {
        error!("cannot resolve {url:?} against {base}: {e}");
        base.clone()
    })
}

fn same_document(a: &Url, b: &Url) -> bool {
    a[..Position::AfterQuery] == b[..Position::AfterQuery]
}
