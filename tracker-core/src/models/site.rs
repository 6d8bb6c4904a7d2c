use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A fansub site: a source of manga chapter releases.
///
/// Sites are owned by a user and referenced by that user's mangas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FansubSite {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a new fansub site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSiteInput {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateSiteInput {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The site columns joined onto manga listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSummary {
    pub name: String,
}
