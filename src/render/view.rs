use std::collections::HashMap;

use crate::session::event::CycleDirection;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    nickname_index: HashMap<String, usize>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cycle_nickname(&mut self, id: &str, len: usize, direction: CycleDirection) -> usize {
        if len == 0 {
            self.nickname_index.remove(id);
            return 0;
        }
        let current = self.nickname_index.get(id).copied().unwrap_or(0) % len;
        let next = match direction {
            CycleDirection::Forward => (current + 1) % len,
            CycleDirection::Backward => (current + len - 1) % len,
        };
        self.nickname_index.insert(id.to_string(), next);
        next
    }

    pub fn nickname_index(&self, id: &str) -> usize {
        self.nickname_index.get(id).copied().unwrap_or(0)
    }

    pub fn current_nickname<'a>(&self, id: &str, nicknames: &'a [String]) -> Option<&'a str> {
        if nicknames.is_empty() {
            return None;
        }
        nicknames
            .get(self.nickname_index(id) % nicknames.len())
            .map(String::as_str)
    }

    pub fn forget(&mut self, id: &str) {
        self.nickname_index.remove(id);
    }

    pub fn retain_ids(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.nickname_index.retain(|id, _| keep(id));
    }
}
