use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ChapterRegistry, MangaRegistry, RegistryError, SiteRegistry};
use crate::session::SessionHandle;
use crate::store::TrackerStore;

/// Dashboard counts over the cached collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerStats {
    pub sites: usize,
    pub active_mangas: usize,
    pub total_mangas: usize,
}

/// The user-scoped registries behind one session.
///
/// Deleting a site cascades to its mangas in storage; [`remove_site`]
/// mirrors that in the manga cache so the two registries stay consistent.
///
/// [`remove_site`]: Tracker::remove_site
pub struct Tracker {
    store: Arc<dyn TrackerStore>,
    session: SessionHandle,
    pub sites: SiteRegistry,
    pub mangas: MangaRegistry,
}

impl Tracker {
    pub fn new(store: Arc<dyn TrackerStore>, session: SessionHandle) -> Self {
        Self {
            sites: SiteRegistry::new(store.clone(), session.clone()),
            mangas: MangaRegistry::new(store.clone(), session.clone()),
            store,
            session,
        }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Bring both caches in line with the current session.
    ///
    /// Caches loaded for another user are reloaded. With nobody signed in
    /// both caches are cleared and `false` is returned.
    pub async fn sync(&mut self) -> Result<bool, RegistryError> {
        if !self.session.is_signed_in() {
            self.sites.clear();
            self.mangas.clear();
            return Ok(false);
        }

        if self.sites.needs_refresh() {
            self.sites.list().await?;
        }
        if self.mangas.needs_refresh() {
            self.mangas.list().await?;
        }
        Ok(true)
    }

    /// Reload both caches unconditionally.
    pub async fn refresh(&mut self) -> Result<(), RegistryError> {
        self.sites.list().await?;
        self.mangas.list().await?;
        Ok(())
    }

    /// Delete a site and drop its mangas from the manga cache.
    ///
    /// Returns the number of cached mangas that went with it.
    pub async fn remove_site(&mut self, id: Uuid) -> Result<usize, RegistryError> {
        self.sites.remove(id).await?;
        let evicted = self.mangas.evict_site(id);
        if evicted > 0 {
            tracing::debug!(site_id = %id, evicted, "Dropped mangas of deleted site");
        }
        Ok(evicted)
    }

    /// A chapter registry for one of the user's mangas, not yet loaded.
    pub fn chapters(&self, manga_id: Uuid) -> ChapterRegistry {
        ChapterRegistry::for_manga(self.store.clone(), manga_id)
    }

    pub fn stats(&self) -> TrackerStats {
        TrackerStats {
            sites: self.sites.len(),
            active_mangas: self.mangas.active_count(),
            total_mangas: self.mangas.len(),
        }
    }
}
