use crate::{History, Traversal};

/// A [`History`] store that keeps all navigation information in memory.
///
/// This is the store for hosts without a browser. It holds an explicit stack of locations and an
/// index into it:
/// - [`push`](History::push) drops every entry after the index and appends,
/// - [`replace`](History::replace) overwrites the entry at the index,
/// - [`go`](History::go) clamps the target index to the stack and hands the target back to the
///   router, which moves the index with [`settle`](History::settle) once the navigation commits.
#[derive(Debug, Default, Clone)]
pub struct MemoryHistory {
    stack: Vec<String>,
    index: Option<usize>,
}

impl MemoryHistory {
    /// Create a [`MemoryHistory`] starting at `path`.
    ///
    /// ```rust
    /// # use waymark_history::{History, MemoryHistory};
    /// let history = MemoryHistory::with_initial_path("/start");
    /// assert_eq!(history.current_location(), "/start");
    /// assert_eq!(history.can_go_back(), false);
    /// ```
    pub fn with_initial_path(path: impl ToString) -> Self {
        Self {
            stack: vec![path.to_string()],
            index: Some(0),
        }
    }

    /// All stored locations, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.stack
    }

    /// The index of the current entry, [`None`] while the stack is empty.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Check whether there is a previous entry.
    pub fn can_go_back(&self) -> bool {
        matches!(self.index, Some(i) if i > 0)
    }

    /// Check whether there is a later entry.
    pub fn can_go_forward(&self) -> bool {
        matches!(self.index, Some(i) if i + 1 < self.stack.len())
    }
}

impl History for MemoryHistory {
    fn current_location(&self) -> String {
        self.index
            .and_then(|i| self.stack.get(i))
            .cloned()
            .unwrap_or_else(|| String::from("/"))
    }

    fn initial_location(&self) -> Option<String> {
        self.index.and_then(|i| self.stack.get(i)).cloned()
    }

    fn push(&mut self, location: &str) {
        let keep = self.index.map(|i| i + 1).unwrap_or(0);
        self.stack.truncate(keep);
        self.stack.push(location.to_string());
        self.index = Some(self.stack.len() - 1);
    }

    fn replace(&mut self, location: &str) {
        match self.index.and_then(|i| self.stack.get_mut(i)) {
            Some(entry) => *entry = location.to_string(),
            None => self.push(location),
        }
    }

    fn go(&mut self, delta: isize) -> Traversal {
        let Some(current) = self.index else {
            return Traversal::Stay;
        };

        let last = self.stack.len() as isize - 1;
        let target = (current as isize).saturating_add(delta).clamp(0, last) as usize;
        if target == current {
            return Traversal::Stay;
        }

        Traversal::InMemory {
            index: target,
            location: self.stack[target].clone(),
        }
    }

    fn settle(&mut self, index: usize) {
        if index < self.stack.len() {
            self.index = Some(index);
        }
    }
}
