use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::{optional, required, store_failed, RegistryError, ToggleOutcome};
use crate::models::{Chapter, CreateChapterInput};
use crate::store::TrackerStore;

/// Cached chapters of one manga.
///
/// The cache keeps the order the store returned (`chapter_number` descending,
/// compared as text) and prepends new chapters without re-sorting.
pub struct ChapterRegistry {
    store: Arc<dyn TrackerStore>,
    manga_id: Uuid,
    chapters: Vec<Chapter>,
    loaded: bool,
}

impl ChapterRegistry {
    pub fn for_manga(store: Arc<dyn TrackerStore>, manga_id: Uuid) -> Self {
        Self {
            store,
            manga_id,
            chapters: Vec::new(),
            loaded: false,
        }
    }

    pub fn manga_id(&self) -> Uuid {
        self.manga_id
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn get(&self, id: Uuid) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn read_count(&self) -> usize {
        self.chapters.iter().filter(|c| c.is_read).count()
    }

    pub fn unread_count(&self) -> usize {
        self.chapters.len() - self.read_count()
    }

    /// Point the registry at another manga. The cache is dropped if the
    /// manga changed; call [`list`](Self::list) to load the new one.
    pub fn rescope(&mut self, manga_id: Uuid) {
        if manga_id != self.manga_id {
            self.manga_id = manga_id;
            self.chapters.clear();
            self.loaded = false;
        }
    }

    /// Reload the chapters of the manga.
    pub async fn list(&mut self) -> Result<&[Chapter], RegistryError> {
        let chapters = self
            .store
            .list_chapters(self.manga_id)
            .await
            .map_err(|e| store_failed("load chapters", e))?;

        tracing::debug!(manga_id = %self.manga_id, count = chapters.len(), "Loaded chapters");
        self.chapters = chapters;
        self.loaded = true;
        Ok(&self.chapters)
    }

    /// Add an unread chapter at the head of the cache.
    pub async fn create(&mut self, input: CreateChapterInput) -> Result<Chapter, RegistryError> {
        let input = CreateChapterInput {
            chapter_number: required(&input.chapter_number, "Chapter number is required")?,
            chapter_title: optional(input.chapter_title),
            release_date: input.release_date,
        };

        let chapter = self
            .store
            .insert_chapter(self.manga_id, input)
            .await
            .map_err(|e| store_failed("add chapter", e))?;

        tracing::debug!(
            chapter_id = %chapter.id,
            number = %chapter.chapter_number,
            "Added chapter"
        );
        self.chapters.insert(0, chapter.clone());
        Ok(chapter)
    }

    /// Flip the read status of a cached chapter.
    ///
    /// `is_read` and `read_at` go to the store in one write: marking read
    /// stamps the current time, marking unread clears it.
    pub async fn toggle_read(&mut self, id: Uuid) -> Result<ToggleOutcome<Chapter>, RegistryError> {
        let Some(current) = self.get(id) else {
            tracing::debug!(chapter_id = %id, "Toggle ignored, chapter not in cache");
            return Ok(ToggleOutcome::NotFound);
        };
        let update = current.read_status().toggled().update_at(Utc::now());

        let updated = self
            .store
            .update_chapter_read(id, update)
            .await
            .map_err(|e| store_failed("update read status", e))?
            .ok_or_else(|| {
                tracing::warn!(chapter_id = %id, "Chapter vanished from storage");
                RegistryError::Storage("Chapter no longer exists".to_string())
            })?;

        if let Some(slot) = self.chapters.iter_mut().find(|c| c.id == id) {
            *slot = updated.clone();
        }
        Ok(ToggleOutcome::Updated(updated))
    }

    pub async fn remove(&mut self, id: Uuid) -> Result<(), RegistryError> {
        self.store
            .delete_chapter(id)
            .await
            .map_err(|e| store_failed("remove chapter", e))?;

        self.chapters.retain(|c| c.id != id);
        Ok(())
    }
}
