use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

/// Validity window applied to issued nonces unless configured otherwise.
pub const DEFAULT_NONCE_MAX_AGE: Duration = Duration::from_millis(180_000);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NonceValidation {
    Valid,
    /// Known nonce that has outlived the validity window.
    Stale,
    /// Never issued to this session.
    Invalid,
}

#[derive(Clone, Debug)]
struct NonceRecord {
    value: String,
    issued_at: Instant,
}

/// Issues and validates digest nonces, scoped per session.
///
/// Records are kept until the owning session's list is dropped; expired
/// entries must stay visible so that a replayed nonce reports `Stale` rather
/// than `Invalid`. Sessions never contend on a common lock.
#[derive(Debug, Default)]
pub struct NonceManager {
    issued: DashMap<String, Vec<NonceRecord>>,
}

impl NonceManager {
    pub fn new() -> Self {
        NonceManager {
            issued: DashMap::new(),
        }
    }

    /// Issues a fresh unpredictable nonce and records it against the session.
    pub fn issue(&self, session_id: &str) -> String {
        let value = Uuid::new_v4().simple().to_string();

        self.issued
            .entry(session_id.to_string())
            .or_default()
            .push(NonceRecord {
                value: value.clone(),
                issued_at: Instant::now(),
            });

        value
    }

    pub fn validate(&self, session_id: &str, nonce: &str, max_age: Duration) -> NonceValidation {
        let Some(records) = self.issued.get(session_id) else {
            return NonceValidation::Invalid;
        };

        let Some(record) = records.iter().find(|record| record.value == nonce) else {
            return NonceValidation::Invalid;
        };

        if record.issued_at.elapsed() > max_age {
            NonceValidation::Stale
        } else {
            NonceValidation::Valid
        }
    }

    /// Drops every nonce issued to the session.
    pub fn forget_session(&self, session_id: &str) {
        self.issued.remove(session_id);
    }
}
