//! The storage boundary the registries talk to.
//!
//! A [`TrackerStore`] is a table-oriented store: each method is a single
//! select, insert, update or delete against one table. Failures come back as
//! an opaque [`anyhow::Error`] whose message is passed through to the user.
//!
//! Two implementations ship with the crate: [`Database`] for local use and
//! [`TrackerClient`](crate::client::TrackerClient) for a remote server.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::db::Database;
use crate::models::*;

#[async_trait]
pub trait TrackerStore: Send + Sync {
    /// Sites owned by `owner`, newest first.
    async fn list_sites(&self, owner: Uuid) -> Result<Vec<FansubSite>>;

    async fn insert_site(&self, owner: Uuid, input: CreateSiteInput) -> Result<FansubSite>;

    /// Delete one of `owner`'s sites. Returns `false` if `owner` has no such site.
    async fn delete_site(&self, owner: Uuid, id: Uuid) -> Result<bool>;

    /// Mangas owned by `owner` with their site name, newest first.
    async fn list_mangas(&self, owner: Uuid) -> Result<Vec<MangaWithSite>>;

    /// Fails if the site is not one of `owner`'s.
    async fn insert_manga(&self, owner: Uuid, input: CreateMangaInput) -> Result<MangaWithSite>;

    /// Returns `None` if the manga no longer exists.
    async fn update_manga_active(&self, id: Uuid, is_active: bool)
        -> Result<Option<MangaWithSite>>;

    /// Returns `false` if `owner` has no such manga.
    async fn delete_manga(&self, owner: Uuid, id: Uuid) -> Result<bool>;

    /// Chapters of a manga by `chapter_number`, descending as text.
    async fn list_chapters(&self, manga_id: Uuid) -> Result<Vec<Chapter>>;

    async fn insert_chapter(&self, manga_id: Uuid, input: CreateChapterInput) -> Result<Chapter>;

    /// Writes both read fields at once. Returns `None` if the chapter no longer exists.
    async fn update_chapter_read(
        &self,
        id: Uuid,
        input: SetChapterReadInput,
    ) -> Result<Option<Chapter>>;

    async fn delete_chapter(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
impl TrackerStore for Database {
    async fn list_sites(&self, owner: Uuid) -> Result<Vec<FansubSite>> {
        self.get_sites_by_user(owner)
    }

    async fn insert_site(&self, owner: Uuid, input: CreateSiteInput) -> Result<FansubSite> {
        self.create_site(owner, input)
    }

    async fn delete_site(&self, owner: Uuid, id: Uuid) -> Result<bool> {
        Database::delete_site(self, owner, id)
    }

    async fn list_mangas(&self, owner: Uuid) -> Result<Vec<MangaWithSite>> {
        self.get_mangas_by_user(owner)
    }

    async fn insert_manga(&self, owner: Uuid, input: CreateMangaInput) -> Result<MangaWithSite> {
        self.create_manga(owner, input)
    }

    async fn update_manga_active(
        &self,
        id: Uuid,
        is_active: bool,
    ) -> Result<Option<MangaWithSite>> {
        self.set_manga_active(id, is_active)
    }

    async fn delete_manga(&self, owner: Uuid, id: Uuid) -> Result<bool> {
        Database::delete_manga(self, owner, id)
    }

    async fn list_chapters(&self, manga_id: Uuid) -> Result<Vec<Chapter>> {
        self.get_chapters_by_manga(manga_id)
    }

    async fn insert_chapter(&self, manga_id: Uuid, input: CreateChapterInput) -> Result<Chapter> {
        self.create_chapter(manga_id, input)
    }

    async fn update_chapter_read(
        &self,
        id: Uuid,
        input: SetChapterReadInput,
    ) -> Result<Option<Chapter>> {
        self.set_chapter_read(id, input)
    }

    async fn delete_chapter(&self, id: Uuid) -> Result<bool> {
        Database::delete_chapter(self, id)
    }
}
