//! IP denylist with lazy, time-based expiry.
//!
//! An entry is active while fewer than `duration_hours` have elapsed since
//! it took effect. Nothing sweeps expired entries: [`AccessGuard::is_blocked`]
//! evicts an inactive entry when it finds one, and [`AccessGuard::list_active`]
//! reports it (with zero hours remaining) without touching the table.

use crate::errors::HubError;
use crate::models::DenialView;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Shortest allowed ban, in hours.
pub const MIN_BAN_HOURS: f64 = 1.0;

/// Longest allowed ban, in hours (30 days).
pub const MAX_BAN_HOURS: f64 = 720.0;

/// Ban applied to the address of a kicked device.
pub const KICK_BAN_HOURS: f64 = 24.0;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// A time-bounded block on one address.
#[derive(Debug, Clone, PartialEq)]
pub struct DenialEntry {
    pub ip: String,
    pub effective_from: DateTime<Utc>,
    pub duration_hours: f64,
}

impl DenialEntry {
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        is_active(now, self.effective_from, self.duration_hours)
    }

    /// Hours left, rounded to one decimal and never negative.
    #[must_use]
    pub fn remaining_hours(&self, now: DateTime<Utc>) -> f64 {
        let remaining = self.duration_hours - elapsed_hours(now, self.effective_from);
        (remaining.max(0.0) * 10.0).round() / 10.0
    }
}

/// Hours elapsed between `effective_from` and `now`.
#[must_use]
#[allow(clippy::cast_precision_loss)] // millisecond counts stay far below 2^52
pub fn elapsed_hours(now: DateTime<Utc>, effective_from: DateTime<Utc>) -> f64 {
    (now - effective_from).num_milliseconds() as f64 / MILLIS_PER_HOUR
}

/// Whether a denial that took effect at `effective_from` still applies at `now`.
#[must_use]
pub fn is_active(now: DateTime<Utc>, effective_from: DateTime<Utc>, duration_hours: f64) -> bool {
    elapsed_hours(now, effective_from) < duration_hours
}

/// Validate a requested ban duration.
///
/// # Errors
///
/// Returns [`HubError::Validation`] unless `1 <= hours <= 720`.
pub fn validate_ban_hours(hours: f64) -> Result<f64, HubError> {
    if hours.is_finite() && (MIN_BAN_HOURS..=MAX_BAN_HOURS).contains(&hours) {
        Ok(hours)
    } else {
        Err(HubError::Validation(
            "Ban duration must be between 1 and 720 hours".to_string(),
        ))
    }
}

/// Address denylist keyed by IP.
#[derive(Debug, Default, Clone)]
pub struct AccessGuard {
    entries: BTreeMap<String, DenialEntry>,
}

impl AccessGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `ip` is currently denied.
    ///
    /// An entry found to be inactive is evicted.
    pub fn is_blocked(&mut self, ip: &str, now: DateTime<Utc>) -> bool {
        let Some(entry) = self.entries.get(ip) else {
            return false;
        };

        if entry.is_active(now) {
            true
        } else {
            self.entries.remove(ip);
            false
        }
    }

    /// Deny `ip` for `duration_hours`, starting at `now`.
    ///
    /// Overwrites any existing entry for the address.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] for a duration outside 1..=720 hours.
    pub fn ban(&mut self, ip: &str, duration_hours: f64, now: DateTime<Utc>) -> Result<(), HubError> {
        let duration_hours = validate_ban_hours(duration_hours)?;
        self.entries.insert(
            ip.to_string(),
            DenialEntry {
                ip: ip.to_string(),
                effective_from: now,
                duration_hours,
            },
        );
        Ok(())
    }

    /// Lift the denial on `ip`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] if the address has no entry.
    pub fn unban(&mut self, ip: &str) -> Result<(), HubError> {
        self.entries
            .remove(ip)
            .map(|_| ())
            .ok_or_else(|| HubError::NotFound("The specified IP is not in the blacklist".to_string()))
    }

    /// Every present entry with its remaining time. Never evicts.
    #[must_use]
    pub fn list_active(&self, now: DateTime<Utc>) -> Vec<DenialView> {
        self.entries
            .values()
            .map(|entry| DenialView {
                ip: entry.ip.clone(),
                effective_from: entry.effective_from,
                remaining_hours: entry.remaining_hours(now),
            })
            .collect()
    }

    #[must_use]
    pub fn get(&self, ip: &str) -> Option<&DenialEntry> {
        self.entries.get(ip)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
