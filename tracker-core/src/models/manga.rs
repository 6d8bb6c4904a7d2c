use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::site::SiteSummary;

/// A tracked manga series.
///
/// Every manga references exactly one [`FansubSite`](super::FansubSite).
/// `is_active` records whether the user still follows new releases; it
/// defaults to `true` and is only ever flipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manga {
    pub id: Uuid,
    pub title: String,
    pub fansub_site_id: Uuid,
    pub is_active: bool,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for adding a manga to the tracked list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMangaInput {
    pub title: String,
    pub fansub_site_id: Uuid,
}

impl CreateMangaInput {
    pub fn new(title: impl Into<String>, fansub_site_id: Uuid) -> Self {
        Self {
            title: title.into(),
            fansub_site_id,
        }
    }
}

/// Body of the active-flag update.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SetMangaActiveInput {
    pub is_active: bool,
}

/// A manga with the name of its site, as returned by listings.
///
/// The manga fields are flattened into the JSON object and the site name sits
/// under the nested `fansub_sites` key. The join is absent when the site row
/// could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MangaWithSite {
    #[serde(flatten)]
    pub manga: Manga,
    #[serde(default)]
    pub fansub_sites: Option<SiteSummary>,
}

impl MangaWithSite {
    pub fn site_name(&self) -> Option<&str> {
        self.fansub_sites.as_ref().map(|s| s.name.as_str())
    }
}
