//! Feed acquisition: download, parse and normalize syndication feeds.
//!
//! - [`fetcher`] - HTTP GET with a browser user agent, bounded timeout and size limit
//! - [`parser`] - RSS/Atom parsing (feed-rs) into [`RawEntry`] records
//! - [`normalize`] - Date resolution and field defaults, producing storable articles

mod fetcher;
mod normalize;
mod parser;

pub use fetcher::{FetchError, Fetcher, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
pub use normalize::{normalize, resolve_published, DateSource, PUB_DATE_FORMAT};
pub use parser::{parse_feed, ParseError, RawEntry};
