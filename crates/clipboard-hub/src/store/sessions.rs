//! Registry of connected devices.

use crate::models::{EndpointSession, Metadata};
use chrono::{DateTime, Utc};

/// Connected devices in registration order.
#[derive(Debug, Default, Clone)]
pub struct SessionRegistry {
    sessions: Vec<EndpointSession>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bare record for a channel that just passed admission.
    ///
    /// Registering an id twice replaces the earlier record in place.
    pub fn register(&mut self, session_id: &str, ip: &str, now: DateTime<Utc>) {
        let record = EndpointSession {
            session_id: session_id.to_string(),
            ip: ip.to_string(),
            metadata: Metadata::new(),
            connected_at: now,
        };

        match self.position(session_id) {
            Some(index) => {
                if let Some(slot) = self.sessions.get_mut(index) {
                    *slot = record;
                }
            }
            None => self.sessions.push(record),
        }
    }

    /// Store device metadata, creating the record if needed.
    ///
    /// Every call replaces the metadata wholesale and resets `connected_at`.
    pub fn attach_metadata(
        &mut self,
        session_id: &str,
        ip: &str,
        metadata: Metadata,
        now: DateTime<Utc>,
    ) {
        if let Some(existing) = self
            .sessions
            .iter_mut()
            .find(|s| s.session_id == session_id)
        {
            existing.ip = ip.to_string();
            existing.metadata = metadata;
            existing.connected_at = now;
        } else {
            self.sessions.push(EndpointSession {
                session_id: session_id.to_string(),
                ip: ip.to_string(),
                metadata,
                connected_at: now,
            });
        }
    }

    /// Remove a record. Returns whether one existed.
    pub fn unregister(&mut self, session_id: &str) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.session_id != session_id);
        self.sessions.len() != before
    }

    /// Look up one record.
    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<&EndpointSession> {
        self.sessions.iter().find(|s| s.session_id == session_id)
    }

    /// Ids of every session whose resolved address equals `ip`.
    #[must_use]
    pub fn ids_for_ip(&self, ip: &str) -> Vec<String> {
        self.sessions
            .iter()
            .filter(|s| s.ip == ip)
            .map(|s| s.session_id.clone())
            .collect()
    }

    #[must_use]
    pub fn list(&self) -> &[EndpointSession] {
        &self.sessions
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<EndpointSession> {
        self.sessions.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn position(&self, session_id: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.session_id == session_id)
    }
}
