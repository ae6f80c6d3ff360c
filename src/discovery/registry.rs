//! The registry seam.

use async_trait::async_trait;

use crate::discovery::error::DiscoveryError;
use crate::discovery::record::{RegistrationId, ServiceRecord};

/// Narrow contract of an external discovery registry.
///
/// Implementations do not retry and do not enforce deadlines; both are
/// handled by their callers.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Store a record and return the identifier it was stored under.
    async fn publish(&self, record: &ServiceRecord) -> Result<RegistrationId, DiscoveryError>;

    /// Remove a previously published record.
    async fn unpublish(&self, registration: &RegistrationId) -> Result<(), DiscoveryError>;

    /// Current members registered under `name`.
    async fn lookup(&self, name: &str) -> Result<Vec<ServiceRecord>, DiscoveryError>;
}

#[async_trait]
impl<R: Registry + ?Sized> Registry for std::sync::Arc<R> {
    async fn publish(&self, record: &ServiceRecord) -> Result<RegistrationId, DiscoveryError> {
        (**self).publish(record).await
    }

    async fn unpublish(&self, registration: &RegistrationId) -> Result<(), DiscoveryError> {
        (**self).unpublish(registration).await
    }

    async fn lookup(&self, name: &str) -> Result<Vec<ServiceRecord>, DiscoveryError> {
        (**self).lookup(name).await
    }
}
