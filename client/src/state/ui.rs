//! Local UI chrome state.
//!
//! DESIGN
//! ======
//! Keeps presentation preferences out of domain state so the front end can
//! evolve them independently of API data. Only `sidebar_collapsed` survives
//! restarts, through [`LocalStorage`].

#[cfg(test)]
#[path = "ui_test.rs"]
mod ui_test;

use crate::error::StorageError;
use crate::storage::{LocalStorage, SIDEBAR_COLLAPSED_KEY};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UiState {
    pub sidebar_collapsed: bool,
}

impl UiState {
    /// Restore persisted preferences; absent keys keep their defaults.
    #[must_use]
    pub fn load(storage: &LocalStorage) -> Self {
        Self {
            sidebar_collapsed: storage.get(SIDEBAR_COLLAPSED_KEY).unwrap_or_default(),
        }
    }

    /// Flip the sidebar and return the new value.
    pub fn toggle_sidebar(&mut self) -> bool {
        self.sidebar_collapsed = !self.sidebar_collapsed;
        self.sidebar_collapsed
    }

    /// # Errors
    ///
    /// Storage write failure.
    pub fn save(&self, storage: &mut LocalStorage) -> Result<(), StorageError> {
        storage.set(SIDEBAR_COLLAPSED_KEY, &self.sidebar_collapsed)
    }
}
