use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single numbered installment of a manga.
///
/// Chapters belong exclusively to their manga and are deleted with it.
/// `chapter_number` is free text ("10", "10.5", "Extra") and is ordered as a
/// string, never numerically.
///
/// # Read status
/// `read_at` is present if and only if `is_read` is true. Both fields are
/// always written together, see [`ReadStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: Uuid,
    pub manga_id: Uuid,
    pub chapter_number: String,
    pub chapter_title: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chapter {
    pub fn read_status(&self) -> ReadStatus {
        if self.is_read {
            ReadStatus::Read
        } else {
            ReadStatus::Unread
        }
    }

    /// Whether `read_at` agrees with `is_read`.
    pub fn is_consistent(&self) -> bool {
        self.is_read == self.read_at.is_some()
    }
}

/// The two states of a chapter's read flag.
///
/// - `Unread` → `Read` sets `read_at` to the transition time
/// - `Read` → `Unread` clears `read_at`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReadStatus {
    Unread,
    Read,
}

impl ReadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unread => "unread",
            Self::Read => "read",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Unread => Self::Read,
            Self::Read => Self::Unread,
        }
    }

    /// The combined write that puts a chapter into this state at `now`.
    pub fn update_at(self, now: DateTime<Utc>) -> SetChapterReadInput {
        match self {
            Self::Read => SetChapterReadInput::read(now),
            Self::Unread => SetChapterReadInput::unread(),
        }
    }
}

/// Input for adding a chapter to a manga.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChapterInput {
    pub chapter_number: String,
    #[serde(default)]
    pub chapter_title: Option<String>,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
}

impl CreateChapterInput {
    pub fn new(chapter_number: impl Into<String>) -> Self {
        Self {
            chapter_number: chapter_number.into(),
            chapter_title: None,
            release_date: None,
        }
    }
}

/// The read-status write. Both fields travel together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetChapterReadInput {
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

impl SetChapterReadInput {
    pub fn read(at: DateTime<Utc>) -> Self {
        Self {
            is_read: true,
            read_at: Some(at),
        }
    }

    pub fn unread() -> Self {
        Self {
            is_read: false,
            read_at: None,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.is_read == self.read_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_twice_returns_to_the_start() {
        assert_eq!(ReadStatus::Unread.toggled().toggled(), ReadStatus::Unread);
        assert_eq!(ReadStatus::Read.toggled().toggled(), ReadStatus::Read);
    }

    #[test]
    fn read_update_carries_timestamp() {
        let now = Utc::now();
        let update = ReadStatus::Read.update_at(now);
        assert!(update.is_read);
        assert_eq!(update.read_at, Some(now));
        assert!(update.is_consistent());
    }

    #[test]
    fn unread_update_clears_timestamp() {
        let update = ReadStatus::Unread.update_at(Utc::now());
        assert!(!update.is_read);
        assert!(update.read_at.is_none());
        assert!(update.is_consistent());
    }

    #[test]
    fn flags_mismatched_read_input() {
        let update = SetChapterReadInput {
            is_read: true,
            read_at: None,
        };
        assert!(!update.is_consistent());
    }

    #[test]
    fn release_date_uses_iso_format() {
        let input: CreateChapterInput = serde_json::from_str(
            r#"{"chapter_number": "10", "release_date": "2024-03-01"}"#,
        )
        .unwrap();
        assert_eq!(
            input.release_date,
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert!(input.chapter_title.is_none());
    }
}
