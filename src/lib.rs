//! newsreel polls a fixed list of news feeds, stores every new article once,
//! and serves the collection as an HTML page and a searchable RSS feed.

pub mod config;
pub mod feed;
pub mod ingest;
pub mod storage;
pub mod util;
pub mod web;
