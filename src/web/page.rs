use chrono::DateTime;
use chrono_tz::Tz;
use quick_xml::escape::escape;
use std::fmt::Write;

use crate::storage::Article;

/// Format of the last-pass time shown on the index page.
pub const LAST_PASS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ARTICLE_DATE_FORMAT: &str = "%d-%m-%Y %H:%M";

/// Render the index page: newest articles first, plus the time of the last
/// completed ingestion pass.
pub fn render_index(
    title: &str,
    articles: &[Article],
    last_pass: Option<DateTime<Tz>>,
    tz: Tz,
) -> String {
    let title = escape(title);
    let last_pass = last_pass
        .map(|t| t.format(LAST_PASS_FORMAT).to_string())
        .unwrap_or_else(|| "never".to_string());

    let mut html = String::with_capacity(1024 + articles.len() * 512);
    // Writing into a String cannot fail
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"nl\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n\
         <link rel=\"alternate\" type=\"application/rss+xml\" href=\"/rss\">\n\
         </head>\n<body>\n<h1>{title}</h1>\n\
         <p class=\"last-reload\">Last reload: {last_pass}</p>\n<ul>\n"
    );

    for article in articles {
        let published = article.published_in(tz).format(ARTICLE_DATE_FORMAT);
        let _ = write!(
            html,
            "<li>\n<a href=\"{}\">{}</a>\n<time>{}</time>\n<p>{}</p>\n</li>\n",
            escape(article.link.as_str()),
            escape(article.title.as_str()),
            published,
            escape(article.summary.as_str()),
        );
    }

    html.push_str("</ul>\n</body>\n</html>\n");
    html
}
