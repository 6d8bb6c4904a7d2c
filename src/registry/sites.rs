use std::sync::Arc;

use uuid::Uuid;

use super::{optional, required, store_failed, RegistryError};
use crate::models::{CreateSiteInput, FansubSite, User};
use crate::session::SessionHandle;
use crate::store::TrackerStore;

/// Cached fansub sites of the signed-in user.
pub struct SiteRegistry {
    store: Arc<dyn TrackerStore>,
    session: SessionHandle,
    sites: Vec<FansubSite>,
    /// The user the cache was last loaded for.
    scope: Option<Uuid>,
}

impl SiteRegistry {
    pub fn new(store: Arc<dyn TrackerStore>, session: SessionHandle) -> Self {
        Self {
            store,
            session,
            sites: Vec::new(),
            scope: None,
        }
    }

    pub fn sites(&self) -> &[FansubSite] {
        &self.sites
    }

    pub fn get(&self, id: Uuid) -> Option<&FansubSite> {
        self.sites.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// True when the cache was loaded for a different user than the one
    /// signed in now, or never loaded.
    pub fn needs_refresh(&self) -> bool {
        self.scope != self.session.current_user().map(|u| u.id)
    }

    /// Drop the cache.
    pub fn clear(&mut self) {
        self.sites.clear();
        self.scope = None;
    }

    /// Reload every site of the current user, newest first.
    pub async fn list(&mut self) -> Result<&[FansubSite], RegistryError> {
        let user = self.require_user()?;

        let sites = self
            .store
            .list_sites(user.id)
            .await
            .map_err(|e| store_failed("load sites", e))?;

        tracing::debug!(count = sites.len(), "Loaded fansub sites");
        self.sites = sites;
        self.scope = Some(user.id);
        Ok(&self.sites)
    }

    pub async fn create(&mut self, input: CreateSiteInput) -> Result<FansubSite, RegistryError> {
        let user = self.require_user()?;
        let input = CreateSiteInput {
            name: required(&input.name, "Name and URL are required")?,
            url: required(&input.url, "Name and URL are required")?,
            description: optional(input.description),
        };

        let site = self
            .store
            .insert_site(user.id, input)
            .await
            .map_err(|e| store_failed("add site", e))?;

        tracing::debug!(site_id = %site.id, name = %site.name, "Added fansub site");
        self.sites.insert(0, site.clone());
        Ok(site)
    }

    /// Delete a site.
    ///
    /// Mangas referencing the site are not touched here; see
    /// [`Tracker::remove_site`](super::Tracker::remove_site).
    pub async fn remove(&mut self, id: Uuid) -> Result<(), RegistryError> {
        let user = self.require_user()?;

        let existed = self
            .store
            .delete_site(user.id, id)
            .await
            .map_err(|e| store_failed("remove site", e))?;

        if !existed {
            tracing::debug!(site_id = %id, "Site was not in storage for this user");
        }
        self.sites.retain(|s| s.id != id);
        Ok(())
    }

    fn require_user(&self) -> Result<User, RegistryError> {
        self.session
            .current_user()
            .ok_or(RegistryError::Unauthenticated)
    }
}
