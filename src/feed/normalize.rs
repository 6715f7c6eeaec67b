use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use super::parser::RawEntry;
use crate::storage::NewArticle;

/// Format of `<pubDate>` in the derived feed, e.g. `Tue, 05 Mar 2024 14:30:00 +0100`.
pub const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

const UNTITLED: &str = "Untitled";

/// Which field supplied an article's publication time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    Published,
    Updated,
    Fallback,
}

/// Resolve the publication time of `entry` in the reference timezone.
///
/// Tried in order, first success wins:
/// 1. `published` (RSS `pubDate`, `dc:date`, Atom `published`)
/// 2. Atom `updated`
/// 3. `now`
///
/// A date the parser could not read leaves its field empty and falls
/// through to the next step.
pub fn resolve_published(entry: &RawEntry, now: DateTime<Utc>, tz: Tz) -> (DateTime<Tz>, DateSource) {
    if let Some(dt) = entry.published {
        return (dt.with_timezone(&tz), DateSource::Published);
    }
    if let Some(dt) = entry.updated {
        return (dt.with_timezone(&tz), DateSource::Updated);
    }
    (now.with_timezone(&tz), DateSource::Fallback)
}

/// Turn a parsed entry into an article ready for insertion.
///
/// Returns `None` when the entry has no usable link, since the link is the
/// article's identity. A missing title becomes "Untitled"; the summary is
/// taken from `summary`, then `description`, then left empty.
pub fn normalize(entry: RawEntry, now: DateTime<Utc>, tz: Tz) -> Option<NewArticle> {
    let link = entry
        .link
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())?
        .to_string();

    let (published, _) = resolve_published(&entry, now, tz);

    let title = entry
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(UNTITLED)
        .to_string();

    let summary = entry.summary.or(entry.description).unwrap_or_default();

    Some(NewArticle {
        title,
        link,
        published,
        summary,
    })
}
