//! Registration listing DTOs.

use serde::{Deserialize, Serialize};

use super::common_dto::{PaginationMeta, PaginationParams};
use crate::domain::{RegistrationEntry, Role, Topic};
use crate::error::RegistrarError;

/// Query string of `GET /api/v1/registrations`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationQuery {
    /// `publisher` or `subscriber`; both roles when absent.
    pub role: Option<String>,
    /// Topic query such as `market.*`; everything when absent.
    pub topic: Option<String>,
    /// Page number, 1-indexed.
    pub page: Option<u32>,
    /// Items per page.
    pub per_page: Option<u32>,
}

impl RegistrationQuery {
    /// Paging requested by the query, with defaults filled in.
    #[must_use]
    pub fn pagination(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }

    /// Parses the role filter. `None` means both roles.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::InvalidRequest`] for an unknown role.
    pub fn role_filter(&self) -> Result<Option<Role>, RegistrarError> {
        match self.role.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }

    /// Parses the topic filter. `None` means every topic.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::InvalidRequest`] for a malformed topic.
    pub fn topic_filter(&self) -> Result<Option<Topic>, RegistrarError> {
        match self.topic.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }
}

/// One registration as shown by the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationDto {
    /// Actor name.
    pub name: String,
    /// Topic in dotted form.
    pub topic: String,
    /// Actor host.
    pub host: String,
    /// Actor port.
    pub port: u16,
    /// Registered role.
    pub role: Role,
    /// Free-form description.
    pub description: String,
}

impl From<RegistrationEntry> for RegistrationDto {
    fn from(entry: RegistrationEntry) -> Self {
        Self {
            name: entry.name,
            topic: entry.topic.to_string(),
            host: entry.endpoint.host,
            port: entry.endpoint.port,
            role: entry.role,
            description: entry.description,
        }
    }
}

/// Response of `GET /api/v1/registrations`.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationListResponse {
    /// Matching registrations across all pages.
    pub count: usize,
    /// Registrations on this page.
    pub data: Vec<RegistrationDto>,
    /// Paging metadata.
    pub pagination: PaginationMeta,
}
