use anyhow::{Context, Result};
use chrono::DateTime;
use chrono_tz::Tz;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;
use std::io::Cursor;

use crate::feed::PUB_DATE_FORMAT;
use crate::storage::Article;

/// Channel-level metadata of the derived feed.
#[derive(Debug, Clone)]
pub struct Channel {
    pub title: String,
    pub link: String,
    pub description: String,
}

/// One `<item>` of the derived feed.
#[derive(Debug, Clone)]
pub struct FeedItem<'a> {
    pub title: &'a str,
    pub link: &'a str,
    pub description: &'a str,
    /// Rendered as an empty `<pubDate/>` when absent.
    pub pub_date: Option<DateTime<Tz>>,
}

impl<'a> FeedItem<'a> {
    pub fn from_article(article: &'a Article, tz: Tz) -> Self {
        Self {
            title: &article.title,
            link: &article.link,
            description: &article.summary,
            pub_date: Some(article.published_in(tz)),
        }
    }
}

/// Exports articles as an RSS 2.0 document.
///
/// Descriptions are wrapped in CDATA; the link doubles as the item's guid.
pub fn render_rss(channel: &Channel, items: &[FeedItem<'_>]) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .context("Failed to write XML declaration")?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    writer
        .write_event(Event::Start(rss))
        .context("Failed to write rss element")?;
    writer
        .write_event(Event::Start(BytesStart::new("channel")))
        .context("Failed to write channel element")?;

    write_text_element(&mut writer, "title", &channel.title)?;
    write_text_element(&mut writer, "link", &channel.link)?;
    write_text_element(&mut writer, "description", &channel.description)?;

    for item in items {
        write_item(&mut writer, item)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("channel")))
        .context("Failed to write channel end")?;
    writer
        .write_event(Event::End(BytesEnd::new("rss")))
        .context("Failed to write rss end")?;

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).context("Generated RSS contains invalid UTF-8")
}

fn write_item(writer: &mut Writer<Cursor<Vec<u8>>>, item: &FeedItem<'_>) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("item")))
        .context("Failed to write item element")?;

    write_text_element(writer, "title", item.title)?;
    write_text_element(writer, "link", item.link)?;

    writer
        .write_event(Event::Start(BytesStart::new("description")))
        .context("Failed to write description element")?;
    let description = xml_safe(item.description);
    for section in cdata_sections(&description) {
        writer
            .write_event(Event::CData(BytesCData::new(section)))
            .context("Failed to write description CDATA")?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("description")))
        .context("Failed to write description end")?;

    let pub_date = item
        .pub_date
        .map(|d| d.format(PUB_DATE_FORMAT).to_string())
        .unwrap_or_default();
    write_text_element(writer, "pubDate", &pub_date)?;
    write_text_element(writer, "guid", item.link)?;

    writer
        .write_event(Event::End(BytesEnd::new("item")))
        .context("Failed to write item end")?;
    Ok(())
}

fn write_text_element(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str, text: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .with_context(|| format!("Failed to write {} element", name))?;
    writer
        .write_event(Event::Text(BytesText::new(&xml_safe(text))))
        .with_context(|| format!("Failed to write {} text", name))?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .with_context(|| format!("Failed to write {} end", name))?;
    Ok(())
}

/// Drop characters XML 1.0 cannot carry, even escaped: C0 controls other
/// than tab, newline and carriage return, plus U+FFFE and U+FFFF.
pub(crate) fn xml_safe(text: &str) -> Cow<'_, str> {
    fn allowed(c: char) -> bool {
        matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}')
    }

    if text.chars().all(allowed) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| allowed(c)).collect())
    }
}

/// Split `text` so that no piece contains `]]>`; each piece becomes its own
/// CDATA section and the pieces concatenate back to `text`.
pub(crate) fn cdata_sections(text: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find("]]>") {
        sections.push(&rest[..pos + 2]);
        rest = &rest[pos + 2..];
    }
    sections.push(rest);
    sections
}
