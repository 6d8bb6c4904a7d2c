mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::*;

const SITE_COLUMNS: &str = "id, name, url, description, user_id, created_at, updated_at";

const MANGA_SELECT: &str = "SELECT m.id, m.title, m.fansub_site_id, m.is_active, m.user_id,
        m.created_at, m.updated_at, s.name
     FROM mangas m LEFT JOIN fansub_sites s ON s.id = m.fansub_site_id";

const CHAPTER_COLUMNS: &str = "id, manga_id, chapter_number, chapter_title, release_date,
     is_read, read_at, created_at, updated_at";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite-backed storage for users, sites, mangas and chapters.
///
/// Foreign keys are enforced, and deletes cascade from sites to mangas and
/// from mangas to chapters.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "manga-tracker")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("tracker.db"))
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // User operations
    // ============================================================

    pub fn create_user(&self, email: &str, password_hash: &str) -> Result<User> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = now();
        let email = normalize_email(email);

        conn.execute(
            "INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
            (id.to_string(), &email, password_hash, format_timestamp(&now)),
        )?;

        Ok(User {
            id,
            email,
            created_at: now,
        })
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let user = conn
            .query_row(
                "SELECT id, email, created_at FROM users WHERE id = ?",
                [id.to_string()],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Look up a user and their stored password hash by email.
    pub fn find_user_credentials(&self, email: &str) -> Result<Option<(User, String)>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let found = conn
            .query_row(
                "SELECT id, email, created_at, password_hash FROM users WHERE email = ?",
                [normalize_email(email)],
                |row| Ok((user_from_row(row)?, row.get::<_, String>(3)?)),
            )
            .optional()?;
        Ok(found)
    }

    // ============================================================
    // Access token operations
    // ============================================================

    pub fn create_access_token(&self, user_id: Uuid, token: &str) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO access_tokens (token, user_id, created_at) VALUES (?, ?, ?)",
            (token, user_id.to_string(), format_timestamp(&now())),
        )?;
        Ok(())
    }

    /// Resolve a bearer token to the user it was issued for.
    pub fn user_for_token(&self, token: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let user = conn
            .query_row(
                "SELECT u.id, u.email, u.created_at
                 FROM access_tokens t JOIN users u ON u.id = t.user_id
                 WHERE t.token = ?",
                [token],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn revoke_access_token(&self, token: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM access_tokens WHERE token = ?", [token])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Fansub site operations
    // ============================================================

    /// All sites owned by `user_id`, newest first.
    pub fn get_sites_by_user(&self, user_id: Uuid) -> Result<Vec<FansubSite>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {SITE_COLUMNS} FROM fansub_sites
             WHERE user_id = ? ORDER BY created_at DESC, rowid DESC"
        ))?;

        let sites = stmt
            .query_map([user_id.to_string()], site_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sites)
    }

    pub fn get_site(&self, id: Uuid) -> Result<Option<FansubSite>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let site = conn
            .query_row(
                &format!("SELECT {SITE_COLUMNS} FROM fansub_sites WHERE id = ?"),
                [id.to_string()],
                site_from_row,
            )
            .optional()?;
        Ok(site)
    }

    pub fn create_site(&self, user_id: Uuid, input: CreateSiteInput) -> Result<FansubSite> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = now();

        conn.execute(
            "INSERT INTO fansub_sites (id, name, url, description, user_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.name,
                &input.url,
                &input.description,
                user_id.to_string(),
                format_timestamp(&now),
                format_timestamp(&now),
            ),
        )?;

        Ok(FansubSite {
            id,
            name: input.name,
            url: input.url,
            description: input.description,
            user_id,
            created_at: now,
            updated_at: now,
        })
    }

    /// Delete one of `user_id`'s sites. Its mangas, and their chapters, go
    /// with it. Sites of other users are left alone and reported as missing.
    pub fn delete_site(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "DELETE FROM fansub_sites WHERE id = ? AND user_id = ?",
            [id.to_string(), user_id.to_string()],
        )?;
        Ok(rows > 0)
    }

    // ============================================================
    // Manga operations
    // ============================================================

    /// All mangas owned by `user_id` joined with their site name, newest first.
    pub fn get_mangas_by_user(&self, user_id: Uuid) -> Result<Vec<MangaWithSite>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "{MANGA_SELECT} WHERE m.user_id = ? ORDER BY m.created_at DESC, m.rowid DESC"
        ))?;

        let mangas = stmt
            .query_map([user_id.to_string()], manga_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(mangas)
    }

    pub fn get_manga(&self, id: Uuid) -> Result<Option<MangaWithSite>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let manga = conn
            .query_row(
                &format!("{MANGA_SELECT} WHERE m.id = ?"),
                [id.to_string()],
                manga_from_row,
            )
            .optional()?;
        Ok(manga)
    }

    pub fn create_manga(&self, user_id: Uuid, input: CreateMangaInput) -> Result<MangaWithSite> {
        let site = self
            .get_site(input.fansub_site_id)?
            .filter(|s| s.user_id == user_id)
            .ok_or_else(|| anyhow::anyhow!("Fansub site not found"))?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = now();

        conn.execute(
            "INSERT INTO mangas
                 (id, title, fansub_site_id, is_active, user_id, created_at, updated_at)
             VALUES (?, ?, ?, 1, ?, ?, ?)",
            (
                id.to_string(),
                &input.title,
                site.id.to_string(),
                user_id.to_string(),
                format_timestamp(&now),
                format_timestamp(&now),
            ),
        )?;

        Ok(MangaWithSite {
            manga: Manga {
                id,
                title: input.title,
                fansub_site_id: site.id,
                is_active: true,
                user_id,
                created_at: now,
                updated_at: now,
            },
            fansub_sites: Some(SiteSummary { name: site.name }),
        })
    }

    /// Set the active flag. Returns `None` if the manga does not exist.
    pub fn set_manga_active(&self, id: Uuid, is_active: bool) -> Result<Option<MangaWithSite>> {
        let rows = {
            let conn = self.conn.lock().expect("database lock poisoned");
            conn.execute(
                "UPDATE mangas SET is_active = ?, updated_at = ? WHERE id = ?",
                (
                    if is_active { 1 } else { 0 },
                    format_timestamp(&now()),
                    id.to_string(),
                ),
            )?
        };

        if rows == 0 {
            return Ok(None);
        }
        self.get_manga(id)
    }

    /// Delete one of `user_id`'s mangas. Its chapters go with it.
    pub fn delete_manga(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "DELETE FROM mangas WHERE id = ? AND user_id = ?",
            [id.to_string(), user_id.to_string()],
        )?;
        Ok(rows > 0)
    }

    // ============================================================
    // Chapter operations
    // ============================================================

    /// Chapters of a manga, ordered by `chapter_number` descending.
    ///
    /// The comparison is byte-wise on the text, so "9" sorts before "10".
    pub fn get_chapters_by_manga(&self, manga_id: Uuid) -> Result<Vec<Chapter>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {CHAPTER_COLUMNS} FROM manga_chapters
             WHERE manga_id = ?
             ORDER BY chapter_number DESC, created_at DESC, rowid DESC"
        ))?;

        let chapters = stmt
            .query_map([manga_id.to_string()], chapter_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(chapters)
    }

    pub fn get_chapter(&self, id: Uuid) -> Result<Option<Chapter>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let chapter = conn
            .query_row(
                &format!("SELECT {CHAPTER_COLUMNS} FROM manga_chapters WHERE id = ?"),
                [id.to_string()],
                chapter_from_row,
            )
            .optional()?;
        Ok(chapter)
    }

    pub fn create_chapter(&self, manga_id: Uuid, input: CreateChapterInput) -> Result<Chapter> {
        self.get_manga(manga_id)?
            .ok_or_else(|| anyhow::anyhow!("Manga not found"))?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = now();

        conn.execute(
            "INSERT INTO manga_chapters (id, manga_id, chapter_number, chapter_title, release_date,
                is_read, read_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 0, NULL, ?, ?)",
            (
                id.to_string(),
                manga_id.to_string(),
                &input.chapter_number,
                &input.chapter_title,
                input.release_date.map(format_date),
                format_timestamp(&now),
                format_timestamp(&now),
            ),
        )?;

        Ok(Chapter {
            id,
            manga_id,
            chapter_number: input.chapter_number,
            chapter_title: input.chapter_title,
            release_date: input.release_date,
            is_read: false,
            read_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Write `is_read` and `read_at` in a single statement.
    ///
    /// Returns `None` if the chapter does not exist. A mismatched pair is
    /// rejected by the table constraint.
    pub fn set_chapter_read(
        &self,
        id: Uuid,
        input: SetChapterReadInput,
    ) -> Result<Option<Chapter>> {
        let rows = {
            let conn = self.conn.lock().expect("database lock poisoned");
            conn.execute(
                "UPDATE manga_chapters SET is_read = ?, read_at = ?, updated_at = ? WHERE id = ?",
                (
                    if input.is_read { 1 } else { 0 },
                    input.read_at.map(|at| format_timestamp(&at)),
                    format_timestamp(&now()),
                    id.to_string(),
                ),
            )?
        };

        if rows == 0 {
            return Ok(None);
        }
        self.get_chapter(id)
    }

    pub fn delete_chapter(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM manga_chapters WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }
}

/// Whether `err` came from a UNIQUE constraint, such as a second user
/// inserted with an email that is already registered.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_uuid(row.get::<_, String>(0)?),
        email: row.get(1)?,
        created_at: parse_datetime(row.get::<_, String>(2)?),
    })
}

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<FansubSite> {
    Ok(FansubSite {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        url: row.get(2)?,
        description: row.get(3)?,
        user_id: parse_uuid(row.get::<_, String>(4)?),
        created_at: parse_datetime(row.get::<_, String>(5)?),
        updated_at: parse_datetime(row.get::<_, String>(6)?),
    })
}

fn manga_from_row(row: &Row<'_>) -> rusqlite::Result<MangaWithSite> {
    Ok(MangaWithSite {
        manga: Manga {
            id: parse_uuid(row.get::<_, String>(0)?),
            title: row.get(1)?,
            fansub_site_id: parse_uuid(row.get::<_, String>(2)?),
            is_active: row.get::<_, i32>(3)? != 0,
            user_id: parse_uuid(row.get::<_, String>(4)?),
            created_at: parse_datetime(row.get::<_, String>(5)?),
            updated_at: parse_datetime(row.get::<_, String>(6)?),
        },
        fansub_sites: row
            .get::<_, Option<String>>(7)?
            .map(|name| SiteSummary { name }),
    })
}

fn chapter_from_row(row: &Row<'_>) -> rusqlite::Result<Chapter> {
    Ok(Chapter {
        id: parse_uuid(row.get::<_, String>(0)?),
        manga_id: parse_uuid(row.get::<_, String>(1)?),
        chapter_number: row.get(2)?,
        chapter_title: row.get(3)?,
        release_date: row.get::<_, Option<String>>(4)?.and_then(parse_date),
        is_read: row.get::<_, i32>(5)? != 0,
        read_at: row.get::<_, Option<String>>(6)?.map(parse_datetime),
        created_at: parse_datetime(row.get::<_, String>(7)?),
        updated_at: parse_datetime(row.get::<_, String>(8)?),
    })
}

/// Current time at the precision timestamps are stored with.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 so that text order matches time order.
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.trunc_subsecs(6)
        .to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_date(s: String) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&s, DATE_FORMAT).ok()
}
