use std::collections::{HashMap, VecDeque};

/// Bounded command history followed by one editable live slot.
///
/// The live slot is always the last element and holds whatever is being
/// typed at the prompt. `position` points at the entry currently shown in
/// the editor. Recalled entries may be edited while browsing; their original
/// text is kept in `staged` and put back when the line is submitted, so
/// edits to recalled commands never persist.
pub struct History {
    entries: VecDeque<String>,
    capacity: usize,
    position: usize,
    staged: HashMap<usize, String>,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        let mut entries = VecDeque::with_capacity(capacity + 1);
        entries.push_back(String::new());
        Self {
            entries,
            capacity: capacity.max(1),
            position: 0,
            staged: HashMap::new(),
        }
    }

    fn live_index(&self) -> usize {
        self.entries.len() - 1
    }

    /// Number of entries including the live slot.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn previous(&mut self) -> Option<&str> {
        if self.position == 0 {
            return None;
        }
        self.position -= 1;
        self.entries.get(self.position).map(String::as_str)
    }

    pub fn next(&mut self) -> Option<&str> {
        if self.position >= self.live_index() {
            return None;
        }
        self.position += 1;
        self.entries.get(self.position).map(String::as_str)
    }

    /// Records the editor's buffer into the slot currently shown.
    pub fn update_current(&mut self, buffer: &str) {
        let index = self.position;
        if index != self.live_index() && !self.staged.contains_key(&index) {
            self.staged.insert(index, self.entries[index].clone());
        }
        if let Some(slot) = self.entries.get_mut(index) {
            slot.clear();
            slot.push_str(buffer);
        }
    }

    /// Restores recalled entries, appends `command` if non-empty, and
    /// returns navigation to a fresh live slot.
    pub fn submit(&mut self, command: &str) {
        self.discard_edits();

        let live = self.live_index();
        self.entries[live].clear();

        if !command.trim().is_empty() {
            self.entries.insert(live, command.to_string());
            if self.entries.len() > self.capacity + 1 {
                self.entries.pop_front();
            }
        }

        self.position = self.live_index();
    }

    /// Drops in-progress edits (recalled or live) and rewinds to the live slot.
    pub fn discard_edits(&mut self) {
        for (index, original) in self.staged.drain() {
            if let Some(slot) = self.entries.get_mut(index) {
                *slot = original;
            }
        }
        let live = self.entries.len() - 1;
        self.entries[live].clear();
        self.position = live;
    }

    /// Retained commands, oldest first, excluding the live slot.
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .take(self.entries.len() - 1)
            .map(String::as_str)
    }

    pub fn list(&self) -> Vec<String> {
        self.commands()
            .enumerate()
            .map(|(i, cmd)| format!("{:>5}  {}", i + 1, cmd))
            .collect()
    }
}
