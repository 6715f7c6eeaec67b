//! HTTP presentation: the index page and the derived RSS feed.
//!
//! Handlers only read. They share the article store and the [`PassClock`]
//! with the ingestion task and nothing else.

mod error;
mod page;
mod rss;

pub use error::WebError;
pub use page::{render_index, LAST_PASS_FORMAT};
pub use rss::{render_rss, Channel, FeedItem};

use axum::{
    extract::{Query, State},
    http::header,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use chrono_tz::Tz;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::ingest::PassClock;
use crate::storage::Database;

pub const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

/// Display settings shared by all handlers.
#[derive(Debug, Clone)]
pub struct Presentation {
    pub tz: Tz,
    /// Articles on the index page
    pub page_size: usize,
    /// Items in the derived feed
    pub feed_size: usize,
    pub channel: Channel,
}

#[derive(Clone)]
pub struct AppState {
    db: Database,
    clock: PassClock,
    presentation: Arc<Presentation>,
}

impl AppState {
    pub fn new(db: Database, clock: PassClock, presentation: Presentation) -> Self {
        Self {
            db,
            clock,
            presentation: Arc::new(presentation),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/rss", get(rss_feed))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Serve `state` on `listener` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish before this returns.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "Serving articles");
    }
    let app = router(state);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
}

async fn index(State(state): State<AppState>) -> Result<Html<String>, WebError> {
    let settings = &state.presentation;
    let articles = state.db.recent_articles(settings.page_size).await?;
    let last_pass = state
        .clock
        .last_pass()
        .map(|t| t.with_timezone(&settings.tz));

    Ok(Html(render_index(
        &settings.channel.title,
        &articles,
        last_pass,
        settings.tz,
    )))
}

async fn rss_feed(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let settings = &state.presentation;
    let articles = match search_term(&params) {
        Some(term) => state.db.search_articles(term, settings.feed_size).await?,
        None => state.db.recent_articles(settings.feed_size).await?,
    };

    let items: Vec<FeedItem<'_>> = articles
        .iter()
        .map(|a| FeedItem::from_article(a, settings.tz))
        .collect();
    let body = render_rss(&settings.channel, &items).map_err(WebError::Render)?;

    Ok(([(header::CONTENT_TYPE, RSS_CONTENT_TYPE)], body).into_response())
}

/// First `q` parameter, trimmed; `None` when absent or blank.
fn search_term(params: &[(String, String)]) -> Option<&str> {
    params
        .iter()
        .find(|(key, _)| key == "q")
        .map(|(_, value)| value.trim())
        .filter(|term| !term.is_empty())
}

async fn healthz() -> &'static str {
    "ok"
}
