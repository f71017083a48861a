use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use super::{SessionStore, SessionValue};
use crate::error::Error;

/// In-memory session store keyed by session id.
///
/// Entries for independent sessions never contend on a common lock; the
/// backing map locks per shard only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: DashMap<String, HashMap<String, SessionValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            sessions: DashMap::new(),
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get_or_create(&self, requested: Option<&str>) -> Result<String, Error> {
        if let Some(session_id) = requested {
            if self.sessions.contains_key(session_id) {
                return Ok(session_id.to_string());
            }
        }

        let session_id = Uuid::new_v4().to_string();
        debug!(%session_id, "Created session");
        self.sessions.insert(session_id.clone(), HashMap::new());
        Ok(session_id)
    }

    async fn attribute(
        &self,
        session_id: &str,
        key: &str,
    ) -> Result<Option<SessionValue>, Error> {
        Ok(self
            .sessions
            .get(session_id)
            .and_then(|attributes| attributes.get(key).cloned()))
    }

    async fn set_attribute(
        &self,
        session_id: &str,
        key: &str,
        value: SessionValue,
    ) -> Result<(), Error> {
        match self.sessions.get_mut(session_id) {
            Some(mut attributes) => {
                attributes.insert(key.to_string(), value);
                Ok(())
            }
            None => Err(Error::SessionUnavailable(format!(
                "unknown session '{session_id}'"
            ))),
        }
    }

    async fn invalidate(&self, session_id: &str) -> Result<(), Error> {
        self.sessions.remove(session_id);
        Ok(())
    }
}
