use std::sync::Arc;

use uuid::Uuid;

use super::{required, store_failed, RegistryError, ToggleOutcome};
use crate::models::{CreateMangaInput, MangaWithSite, User};
use crate::session::SessionHandle;
use crate::store::TrackerStore;

/// Cached mangas of the signed-in user, each with its site name.
pub struct MangaRegistry {
    store: Arc<dyn TrackerStore>,
    session: SessionHandle,
    mangas: Vec<MangaWithSite>,
    scope: Option<Uuid>,
}

impl MangaRegistry {
    pub fn new(store: Arc<dyn TrackerStore>, session: SessionHandle) -> Self {
        Self {
            store,
            session,
            mangas: Vec::new(),
            scope: None,
        }
    }

    pub fn mangas(&self) -> &[MangaWithSite] {
        &self.mangas
    }

    pub fn get(&self, id: Uuid) -> Option<&MangaWithSite> {
        self.mangas.iter().find(|m| m.manga.id == id)
    }

    pub fn len(&self) -> usize {
        self.mangas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mangas.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.mangas.iter().filter(|m| m.manga.is_active).count()
    }

    pub fn needs_refresh(&self) -> bool {
        self.scope != self.session.current_user().map(|u| u.id)
    }

    pub fn clear(&mut self) {
        self.mangas.clear();
        self.scope = None;
    }

    /// Reload every manga of the current user, newest first.
    pub async fn list(&mut self) -> Result<&[MangaWithSite], RegistryError> {
        let user = self.require_user()?;

        let mangas = self
            .store
            .list_mangas(user.id)
            .await
            .map_err(|e| store_failed("load mangas", e))?;

        tracing::debug!(count = mangas.len(), "Loaded mangas");
        self.mangas = mangas;
        self.scope = Some(user.id);
        Ok(&self.mangas)
    }

    /// Add a manga. It starts active.
    ///
    /// The site must exist in storage; the store rejects unknown sites.
    pub async fn create(
        &mut self,
        input: CreateMangaInput,
    ) -> Result<MangaWithSite, RegistryError> {
        let user = self.require_user()?;
        if input.fansub_site_id.is_nil() {
            return Err(RegistryError::Validation(
                "Title and site are required".to_string(),
            ));
        }
        let input = CreateMangaInput {
            title: required(&input.title, "Title and site are required")?,
            fansub_site_id: input.fansub_site_id,
        };

        let manga = self
            .store
            .insert_manga(user.id, input)
            .await
            .map_err(|e| store_failed("add manga", e))?;

        tracing::debug!(manga_id = %manga.manga.id, title = %manga.manga.title, "Added manga");
        self.mangas.insert(0, manga.clone());
        Ok(manga)
    }

    /// Flip `is_active` on a cached manga.
    pub async fn toggle_active(
        &mut self,
        id: Uuid,
    ) -> Result<ToggleOutcome<MangaWithSite>, RegistryError> {
        let Some(current) = self.get(id) else {
            tracing::debug!(manga_id = %id, "Toggle ignored, manga not in cache");
            return Ok(ToggleOutcome::NotFound);
        };
        let is_active = !current.manga.is_active;

        let updated = self
            .store
            .update_manga_active(id, is_active)
            .await
            .map_err(|e| store_failed("update manga status", e))?
            .ok_or_else(|| {
                tracing::warn!(manga_id = %id, "Manga vanished from storage");
                RegistryError::Storage("Manga no longer exists".to_string())
            })?;

        if let Some(slot) = self.mangas.iter_mut().find(|m| m.manga.id == id) {
            *slot = updated.clone();
        }
        Ok(ToggleOutcome::Updated(updated))
    }

    /// Delete a manga. Storage deletes its chapters with it.
    pub async fn remove(&mut self, id: Uuid) -> Result<(), RegistryError> {
        let user = self.require_user()?;

        self.store
            .delete_manga(user.id, id)
            .await
            .map_err(|e| store_failed("remove manga", e))?;

        self.mangas.retain(|m| m.manga.id != id);
        Ok(())
    }

    /// Drop the cached mangas of a site without contacting storage.
    ///
    /// Used after the site itself was deleted, which already removed these
    /// rows in storage. Returns how many were dropped.
    pub fn evict_site(&mut self, site_id: Uuid) -> usize {
        let before = self.mangas.len();
        self.mangas.retain(|m| m.manga.fansub_site_id != site_id);
        before - self.mangas.len()
    }

    fn require_user(&self) -> Result<User, RegistryError> {
        self.session
            .current_user()
            .ok_or(RegistryError::Unauthenticated)
    }
}
