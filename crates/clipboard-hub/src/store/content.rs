//! Ordered clipboard entries with a protected default entry.

use crate::errors::HubError;
use crate::models::{ContentEntry, DEFAULT_CLIPBOARD_ID};

/// Message returned when a client tries to remove the default clipboard.
pub const DEFAULT_REMOVAL_MESSAGE: &str = "Cannot delete the default clipboard";

/// Clipboard entries in arrival order.
///
/// The entry with id [`DEFAULT_CLIPBOARD_ID`] is created at construction
/// and can never be removed.
#[derive(Debug, Clone)]
pub struct ContentStore {
    entries: Vec<ContentEntry>,
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore {
    /// Create a store holding only the default entry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: vec![ContentEntry::default_entry()],
        }
    }

    /// Insert or update an entry.
    ///
    /// An existing entry keeps its position; its name is only replaced when a
    /// non-empty name is supplied. A new entry is appended.
    pub fn upsert(&mut self, id: String, content: String, name: Option<String>) -> &[ContentEntry] {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.id == id) {
            existing.content = content;
            if let Some(name) = name.filter(|n| !n.is_empty()) {
                existing.name = Some(name);
            }
        } else {
            self.entries.push(ContentEntry { id, content, name });
        }

        &self.entries
    }

    /// Remove an entry by id.
    ///
    /// Removing an id that does not exist is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Forbidden`] for the default entry; nothing is changed.
    pub fn remove(&mut self, id: &str) -> Result<&[ContentEntry], HubError> {
        if id == DEFAULT_CLIPBOARD_ID {
            return Err(HubError::Forbidden(DEFAULT_REMOVAL_MESSAGE.to_string()));
        }

        self.entries.retain(|e| e.id != id);
        Ok(&self.entries)
    }

    /// Current entries in order.
    #[must_use]
    pub fn list(&self) -> &[ContentEntry] {
        &self.entries
    }

    /// Owned snapshot for broadcast.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ContentEntry> {
        self.entries.clone()
    }
}
