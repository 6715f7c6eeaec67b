use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Link};
use feed_rs::parser::{self, ParseFeedError};
use thiserror::Error;

/// One `<item>` or `<entry>` as found in the document, before normalization.
///
/// Every field is optional; the normalizer decides what to do with gaps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    /// RSS `pubDate`, Dublin Core `dc:date` or Atom `published`.
    pub published: Option<DateTime<Utc>>,
    /// Atom `updated`.
    pub updated: Option<DateTime<Utc>>,
    /// RSS `description` or Atom `summary`.
    pub summary: Option<String>,
    /// `content:encoded` or Atom `content`.
    pub description: Option<String>,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Not a readable RSS/Atom feed: {0}")]
    Feed(#[from] ParseFeedError),
}

/// Parse a feed document into its entries, in document order.
///
/// A well-formed feed without entries yields an empty vector.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<RawEntry>, ParseError> {
    let feed = parser::parse(bytes)?;
    Ok(feed.entries.into_iter().map(raw_entry).collect())
}

fn raw_entry(entry: Entry) -> RawEntry {
    // A guid that is itself a URL stands in for a missing link
    let link = entry_link(&entry.links).or_else(|| {
        let id = entry.id.trim();
        (id.starts_with("http://") || id.starts_with("https://")).then(|| id.to_string())
    });

    RawEntry {
        title: entry.title.map(|t| t.content).and_then(non_empty),
        link,
        published: entry.published,
        updated: entry.updated,
        summary: entry.summary.map(|s| s.content).and_then(non_empty),
        description: entry.content.and_then(|c| c.body).and_then(non_empty),
    }
}

/// The entry's alternate link, else its first link.
fn entry_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
        .or_else(|| links.first())
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty())
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
