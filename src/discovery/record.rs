//! Service record and registration identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ServiceIdentity;

/// Opaque token handed out by a registry on successful publish.
///
/// Never empty: the only way to hold one is through [`RegistrationId::new`],
/// which refuses blank input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegistrationId(String);

impl RegistrationId {
    /// Wrap a registry-issued identifier. Returns `None` for empty input.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RegistrationId {
    type Error = &'static str;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value).ok_or("registration id must not be empty")
    }
}

impl From<RegistrationId> for String {
    fn from(id: RegistrationId) -> Self {
        id.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reachability record for one running instance of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub base_path: String,
    #[serde(default)]
    pub ssl: bool,
    /// Present only while the record is published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<RegistrationId>,
}

impl ServiceRecord {
    /// An unpublished HTTP endpoint record.
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        base_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            base_path: base_path.into(),
            ssl: false,
            registration: None,
        }
    }

    pub fn from_identity(identity: &ServiceIdentity) -> Self {
        Self::new(
            identity.name.clone(),
            identity.host.clone(),
            identity.port,
            identity.base_path.clone(),
        )
    }

    pub fn is_published(&self) -> bool {
        self.registration.is_some()
    }

    /// The URL clients use to reach this instance.
    pub fn endpoint(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{}://{}:{}{}", scheme, self.host, self.port, self.base_path)
    }

    /// Why a registry would refuse this record, if it would.
    pub fn malformed_reason(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            Some("service name is empty")
        } else if self.host.trim().is_empty() {
            Some("host is empty")
        } else if self.port == 0 {
            Some("port is 0")
        } else if !self.base_path.starts_with('/') {
            Some("base path must start with '/'")
        } else {
            None
        }
    }
}
