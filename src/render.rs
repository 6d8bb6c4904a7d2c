//! Plain-text rendering of the tracked collections for the CLI.
//!
//! Rows are printed in the order given; sorting for display is the caller's
//! choice.

use crate::models::{Chapter, FansubSite, MangaWithSite};
use crate::registry::TrackerStats;

const ACTIVE: char = '●';
const PAUSED: char = '○';
const READ: char = '✓';
const UNREAD: char = '·';

fn active_symbol(is_active: bool) -> char {
    if is_active {
        ACTIVE
    } else {
        PAUSED
    }
}

fn read_symbol(is_read: bool) -> char {
    if is_read {
        READ
    } else {
        UNREAD
    }
}

/// Render fansub sites, one per line with the description indented below.
/// Each site shows how many of `mangas` are read on it.
///
/// Example output:
/// ```text
/// Alpha <https://a.example>  2 mangas  (7c9e6679-7425-40de-944b-e07fc1f90ae7)
///     Brazilian scanlation group
/// ```
pub fn render_sites(sites: &[FansubSite], mangas: &[MangaWithSite]) -> String {
    if sites.is_empty() {
        return "No fansub sites yet.\n".to_string();
    }

    let mut output = String::new();
    for site in sites {
        let count = mangas
            .iter()
            .filter(|m| m.manga.fansub_site_id == site.id)
            .count();
        let noun = if count == 1 { "manga" } else { "mangas" };
        output.push_str(&format!(
            "{} <{}>  {} {}  ({})\n",
            site.name, site.url, count, noun, site.id
        ));
        if let Some(description) = &site.description {
            output.push_str("    ");
            output.push_str(description);
            output.push('\n');
        }
    }
    output
}

/// Render mangas with their active marker and site name.
///
/// Example output:
/// ```text
/// ● One Piece [Alpha]  (16fd2706-8baf-433b-82eb-8c7fada847da)
/// ○ Attack on Titan [Beta]  (e1b8d1c4-3f1e-4c4b-9f0a-2b6f7f5d9a10)
/// ```
pub fn render_mangas(mangas: &[MangaWithSite]) -> String {
    if mangas.is_empty() {
        return "No mangas tracked yet.\n".to_string();
    }

    let mut output = String::new();
    for entry in mangas {
        let manga = &entry.manga;
        output.push(active_symbol(manga.is_active));
        output.push(' ');
        output.push_str(&manga.title);
        output.push_str(&format!(
            " [{}]  ({})\n",
            entry.site_name().unwrap_or("unknown site"),
            manga.id
        ));
    }
    output
}

pub fn render_chapters(chapters: &[Chapter]) -> String {
    if chapters.is_empty() {
        return "No chapters yet.\n".to_string();
    }

    let mut output = String::new();
    for chapter in chapters {
        output.push(read_symbol(chapter.is_read));
        output.push_str(" Cap. ");
        output.push_str(&chapter.chapter_number);
        if let Some(title) = &chapter.chapter_title {
            output.push_str(" - ");
            output.push_str(title);
        }
        if let Some(date) = chapter.release_date {
            output.push_str(&format!(" (released {})", date));
        }
        if let Some(read_at) = chapter.read_at {
            output.push_str(&format!(" read {}", read_at.format("%Y-%m-%d %H:%M")));
        }
        output.push_str(&format!("  ({})\n", chapter.id));
    }
    output
}

pub fn render_stats(stats: &TrackerStats) -> String {
    format!(
        "Sites: {}\nActive mangas: {}\nTotal mangas: {}\n",
        stats.sites, stats.active_mangas, stats.total_mangas
    )
}
