//! Small shared helpers.

mod url_validator;

pub use url_validator::{validate_feed_url, UrlValidationError};
