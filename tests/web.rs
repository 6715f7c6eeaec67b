//! End-to-end tests for the HTTP routes.
//!
//! Each test binds a real server on an ephemeral port and queries it with
//! reqwest, backed by its own in-memory database.

use chrono::TimeZone;
use chrono_tz::Europe::Amsterdam;
use newsreel::ingest::PassClock;
use newsreel::storage::{Database, NewArticle};
use newsreel::web::{self, AppState, Channel, Presentation, RSS_CONTENT_TYPE};
use pretty_assertions::assert_eq;
use quick_xml::events::Event;
use quick_xml::Reader;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

struct TestServer {
    base: String,
    stop: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    async fn start(db: Database, clock: PassClock) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let presentation = Presentation {
            tz: Amsterdam,
            page_size: 25,
            feed_size: 10,
            channel: Channel {
                title: "newsreel".to_string(),
                link: format!("{}/rss", base),
                description: "Test feed".to_string(),
            },
        };
        let state = AppState::new(db, clock, presentation);

        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(web::serve(listener, state, async move {
            let _ = stopped.await;
        }));

        Self {
            base,
            stop: Some(stop),
            task,
        }
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        reqwest::get(format!("{}{}", self.base, path)).await.unwrap()
    }

    async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.task.await.unwrap().unwrap();
    }
}

fn article(title: &str, link: &str, summary: &str, day: u32) -> NewArticle {
    NewArticle {
        title: title.to_string(),
        link: link.to_string(),
        published: Amsterdam.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap(),
        summary: summary.to_string(),
    }
}

/// Links of every `<item>` in an RSS document, in order.
fn item_links(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut links = Vec::new();
    let mut in_item = false;
    let mut in_link = false;

    loop {
        match reader.read_event().unwrap() {
            Event::Start(e) if e.name().as_ref() == b"item" => in_item = true,
            Event::End(e) if e.name().as_ref() == b"item" => in_item = false,
            Event::Start(e) if in_item && e.name().as_ref() == b"link" => in_link = true,
            Event::End(e) if e.name().as_ref() == b"link" => in_link = false,
            Event::Text(t) if in_link => links.push(t.unescape().unwrap().into_owned()),
            Event::Eof => break,
            _ => {}
        }
    }
    links
}

#[tokio::test]
async fn test_rss_search_round_trip() {
    let db = Database::open(":memory:").await.unwrap();
    db.insert_if_absent(&article(
        "Storm warning issued",
        "http://x/1",
        "Heavy rain expected",
        5,
    ))
    .await
    .unwrap();
    db.insert_if_absent(&article("Markets rally", "http://x/2", "Stocks up", 6))
        .await
        .unwrap();

    let server = TestServer::start(db, PassClock::new()).await;

    let response = server.get("/rss?q=storm").await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        RSS_CONTENT_TYPE
    );
    let body = response.text().await.unwrap();
    assert_eq!(item_links(&body), vec!["http://x/1"]);
    assert!(body.contains("<![CDATA[Heavy rain expected]]>"));
    assert!(body.contains("<pubDate>Tue, 05 Mar 2024 09:00:00 +0100</pubDate>"));

    server.stop().await;
}

#[tokio::test]
async fn test_repeated_query_uses_first_term() {
    let db = Database::open(":memory:").await.unwrap();
    db.insert_if_absent(&article("Storm warning issued", "http://x/1", "", 5))
        .await
        .unwrap();
    db.insert_if_absent(&article("Markets rally", "http://x/2", "", 6))
        .await
        .unwrap();

    let server = TestServer::start(db, PassClock::new()).await;

    let response = server.get("/rss?q=storm&q=markets").await;
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert_eq!(item_links(&body), vec!["http://x/1"]);

    server.stop().await;
}

#[tokio::test]
async fn test_rss_without_query_lists_recent() {
    let db = Database::open(":memory:").await.unwrap();
    for day in 1..=12 {
        db.insert_if_absent(&article(
            &format!("Day {}", day),
            &format!("http://x/{}", day),
            "",
            day,
        ))
        .await
        .unwrap();
    }

    let server = TestServer::start(db, PassClock::new()).await;

    let links = item_links(&server.get("/rss").await.text().await.unwrap());
    assert_eq!(links.len(), 10);
    assert_eq!(links[0], "http://x/12");
    assert_eq!(links[9], "http://x/3");

    // A blank term behaves like no term
    let blank = item_links(&server.get("/rss?q=%20").await.text().await.unwrap());
    assert_eq!(blank, links);

    server.stop().await;
}

#[tokio::test]
async fn test_empty_store_yields_well_formed_feed() {
    let db = Database::open(":memory:").await.unwrap();
    let server = TestServer::start(db, PassClock::new()).await;

    let response = server.get("/rss?q=anything").await;
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("<rss version=\"2.0\">"));
    assert!(item_links(&body).is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_index_before_first_pass() {
    let db = Database::open(":memory:").await.unwrap();
    let server = TestServer::start(db, PassClock::new()).await;

    let response = server.get("/").await;
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("Last reload: never"));
    assert!(!body.contains("<li>"));

    server.stop().await;
}

#[tokio::test]
async fn test_index_lists_articles_and_last_pass() {
    let db = Database::open(":memory:").await.unwrap();
    db.insert_if_absent(&article("Kabinet valt", "https://example.com/k", "", 4))
        .await
        .unwrap();
    let clock = PassClock::new();
    clock.record(chrono::Utc.with_ymd_and_hms(2024, 7, 1, 10, 0, 0).unwrap());

    let server = TestServer::start(db, clock).await;

    let body = server.get("/").await.text().await.unwrap();
    assert!(body.contains("Kabinet valt"));
    assert!(body.contains("Last reload: 2024-07-01 12:00:00"));

    server.stop().await;
}

#[tokio::test]
async fn test_store_failure_returns_500() {
    let db = Database::open(":memory:").await.unwrap();
    let server = TestServer::start(db.clone(), PassClock::new()).await;
    db.close().await;

    assert_eq!(server.get("/").await.status(), 500);
    assert_eq!(server.get("/rss").await.status(), 500);

    server.stop().await;
}

#[tokio::test]
async fn test_healthz() {
    let db = Database::open(":memory:").await.unwrap();
    let server = TestServer::start(db, PassClock::new()).await;

    let response = server.get("/healthz").await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");

    server.stop().await;
}
