//! In-process registry.
//!
//! Used when no remote registry is configured and as a stand-in in tests.
//! Behaves like a well-formed remote: assigns UUID registration ids and
//! refuses malformed records.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

use crate::discovery::error::DiscoveryError;
use crate::discovery::record::{RegistrationId, ServiceRecord};
use crate::discovery::registry::Registry;

#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    records: Mutex<HashMap<RegistrationId, ServiceRecord>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored, across all names.
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Registry for InMemoryRegistry {
    async fn publish(&self, record: &ServiceRecord) -> Result<RegistrationId, DiscoveryError> {
        if let Some(reason) = record.malformed_reason() {
            return Err(DiscoveryError::Rejected(reason.to_string()));
        }

        // A fresh v4 UUID is never empty.
        let id = RegistrationId::new(Uuid::new_v4().to_string())
            .ok_or_else(|| DiscoveryError::Rejected("failed to mint registration id".into()))?;

        let mut stored = record.clone();
        stored.registration = Some(id.clone());
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), stored);

        tracing::debug!(service = %record.name, registration = %id, "Record stored");
        Ok(id)
    }

    async fn unpublish(&self, registration: &RegistrationId) -> Result<(), DiscoveryError> {
        let removed = self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(registration);
        if removed.is_none() {
            tracing::debug!(registration = %registration, "Unpublish for unknown registration");
        }
        Ok(())
    }

    async fn lookup(&self, name: &str) -> Result<Vec<ServiceRecord>, DiscoveryError> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records
            .values()
            .filter(|record| record.name == name)
            .cloned()
            .collect())
    }
}
