use std::{sync::Arc, time::Duration};

use chrono::Utc;
use goalline_core::{
  feed::{
    FeedItemQuery, FeedSource, FetchStatus, HealthStatus, NewFeedItem,
    NewFeedSource, SourceKind,
  },
  store::FeedStore,
};
use goalline_feeds::{Error, FeedFetcher, FeedsConfig, spawn_scheduler};
use goalline_store_sqlite::SqliteStore;
use wiremock::{
  Mock, MockServer, ResponseTemplate,
  matchers::{method, path},
};

fn rss(items: &[(&str, &str)]) -> String {
  let body: String = items
    .iter()
    .map(|(guid, date)| {
      format!(
        "<item><title>Story {guid}</title><link>https://example.com/{guid}</link>\
         <guid>{guid}</guid><pubDate>{date}</pubDate>\
         <description>&lt;p&gt;About {guid}&lt;/p&gt;</description></item>"
      )
    })
    .collect();
  format!(
    r#"<?xml version="1.0"?><rss version="2.0"><channel><title>T</title><link>https://example.com</link><description>D</description>{body}</channel></rss>"#
  )
}

const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom</title>
  <id>urn:feed</id>
  <updated>2024-10-21T07:28:00Z</updated>
  <entry>
    <title>First</title>
    <id>urn:entry:1</id>
    <link href="https://example.com/1"/>
    <updated>2024-10-21T07:28:00Z</updated>
  </entry>
  <entry>
    <title>Second</title>
    <id>urn:entry:2</id>
    <link href="https://example.com/2"/>
    <updated>2024-10-21T08:28:00Z</updated>
  </entry>
</feed>"#;

async fn mount(server: &MockServer, status: u16, content_type: &str, body: String) {
  Mock::given(method("GET"))
    .and(path("/feed"))
    .respond_with(
      ResponseTemplate::new(status)
        .insert_header("content-type", content_type)
        .set_body_string(body),
    )
    .mount(server)
    .await;
}

async fn setup(server: &MockServer) -> (FeedFetcher<SqliteStore>, FeedSource) {
  let store = Arc::new(SqliteStore::open_in_memory().await.expect("store"));
  let source = store
    .ensure_source(NewFeedSource {
      name:     "Mock".into(),
      kind:     SourceKind::Guardian,
      feed_url: format!("{}/feed", server.uri()),
      active:   true,
    })
    .await
    .unwrap();
  let fetcher = FeedFetcher::new(store, FeedsConfig::default()).expect("client");
  (fetcher, source)
}

fn now_rfc2822() -> String { Utc::now().to_rfc2822() }

#[tokio::test]
async fn known_guids_make_a_partial_fetch() {
  let server = MockServer::start().await;
  let date = now_rfc2822();
  let guids: Vec<String> = (0..10).map(|i| format!("g{i}")).collect();
  let items: Vec<(&str, &str)> = guids.iter().map(|g| (g.as_str(), date.as_str())).collect();
  mount(&server, 200, "application/rss+xml", rss(&items)).await;

  let (fetcher, source) = setup(&server).await;
  for guid in &guids[..3] {
    fetcher
      .store()
      .insert_feed_item(NewFeedItem {
        source_id:    source.source_id,
        title:        "seen".into(),
        description:  String::new(),
        content:      String::new(),
        link:         String::new(),
        author:       String::new(),
        category:     String::new(),
        guid:         guid.clone(),
        published_at: Utc::now(),
      })
      .await
      .unwrap();
  }

  let outcome = fetcher.fetch_kind(SourceKind::Guardian).await.unwrap().unwrap();
  assert_eq!(outcome.items_fetched, 10);
  assert_eq!(outcome.items_new, 7);
  assert_eq!(outcome.status, FetchStatus::Partial);

  let again = fetcher.fetch_kind(SourceKind::Guardian).await.unwrap().unwrap();
  assert_eq!(again.items_new, 0);

  let logs = fetcher.store().recent_fetch_logs(10).await.unwrap();
  assert_eq!(logs.len(), 2);

  let stored = fetcher
    .store()
    .list_feed_items(&FeedItemQuery::default())
    .await
    .unwrap();
  assert_eq!(stored.len(), 10);
  let g9 = stored.iter().find(|i| i.guid == "g9").unwrap();
  assert_eq!(g9.description, "About g9");

  let touched = fetcher.store().get_source(SourceKind::Guardian).await.unwrap().unwrap();
  assert!(touched.last_fetched.is_some());
}

#[tokio::test]
async fn http_errors_become_error_logs() {
  let server = MockServer::start().await;
  mount(&server, 503, "text/plain", "unavailable".into()).await;
  let (fetcher, _) = setup(&server).await;

  let summary = fetcher.fetch_all_active().await.unwrap();
  assert_eq!(summary.sources_processed, 1);
  assert_eq!(summary.sources_successful, 0);
  assert_eq!(summary.results[0].status, FetchStatus::Error);
  assert!(summary.results[0].error.as_deref().unwrap().contains("503"));

  let logs = fetcher.store().recent_fetch_logs(10).await.unwrap();
  assert_eq!(logs[0].status, FetchStatus::Error);
  assert!(logs[0].error_message.is_some());

  let source = fetcher.store().get_source(SourceKind::Guardian).await.unwrap().unwrap();
  assert!(source.last_fetched.is_none());
}

#[tokio::test]
async fn malformed_bodies_become_error_logs() {
  let server = MockServer::start().await;
  mount(&server, 200, "text/html", "<html><body>nope</body></html>".into()).await;
  let (fetcher, _) = setup(&server).await;

  let outcome = fetcher.fetch_kind(SourceKind::Guardian).await.unwrap().unwrap();
  assert_eq!(outcome.status, FetchStatus::Error);
}

#[tokio::test]
async fn atom_feeds_are_ingested() {
  let server = MockServer::start().await;
  mount(&server, 200, "application/atom+xml", ATOM.into()).await;
  let (fetcher, _) = setup(&server).await;

  let outcome = fetcher.fetch_kind(SourceKind::Guardian).await.unwrap().unwrap();
  assert_eq!(outcome.status, FetchStatus::Success);
  assert_eq!(outcome.items_new, 2);

  let items = fetcher
    .store()
    .list_feed_items(&FeedItemQuery::default())
    .await
    .unwrap();
  assert_eq!(items[0].guid, "urn:entry:2");
}

#[tokio::test]
async fn unknown_and_inactive_sources_are_rejected() {
  let server = MockServer::start().await;
  let (fetcher, _) = setup(&server).await;

  assert!(matches!(
    fetcher.fetch_kind(SourceKind::BbcSport).await,
    Err(Error::UnknownSource(SourceKind::BbcSport))
  ));

  fetcher
    .store()
    .set_source_active(SourceKind::Guardian, false)
    .await
    .unwrap();
  assert!(matches!(
    fetcher.fetch_kind(SourceKind::Guardian).await,
    Err(Error::InactiveSource(SourceKind::Guardian))
  ));
}

#[tokio::test]
async fn init_sources_creates_every_kind_and_force_resets() {
  let server = MockServer::start().await;
  let (fetcher, _) = setup(&server).await;

  let sources = fetcher.init_sources(false).await.unwrap();
  assert_eq!(sources.len(), 4);
  let guardian = sources.iter().find(|s| s.kind == SourceKind::Guardian).unwrap();
  assert!(guardian.feed_url.starts_with(&server.uri()));

  let sources = fetcher.init_sources(true).await.unwrap();
  let guardian = sources.iter().find(|s| s.kind == SourceKind::Guardian).unwrap();
  assert_eq!(guardian.feed_url, SourceKind::Guardian.default_url());
}

#[tokio::test]
async fn health_and_retention_after_a_fetch() {
  let server = MockServer::start().await;
  let now = now_rfc2822();
  mount(
    &server,
    200,
    "application/rss+xml",
    rss(&[("fresh", now.as_str()), ("ancient", "Mon, 06 Jan 2020 12:00:00 GMT")]),
  )
  .await;
  let (fetcher, _) = setup(&server).await;

  let before = fetcher.health().await.unwrap();
  assert_eq!(before.status, HealthStatus::Warning);

  fetcher.fetch_all_active().await.unwrap();
  let after = fetcher.health().await.unwrap();
  assert_eq!(after.status, HealthStatus::Healthy);
  assert_eq!(after.recent_items_24h, 2);

  let report = fetcher.cleanup().await.unwrap();
  assert_eq!(report.archived, 1);
  assert_eq!(report.deleted, 1);

  let stats = fetcher.stats(5).await.unwrap();
  assert_eq!(stats.counts.total_items, 1);
  assert_eq!(stats.recent_logs.len(), 1);
}

#[tokio::test]
async fn scheduler_fetches_on_start_and_stops() {
  let server = MockServer::start().await;
  mount(&server, 200, "application/rss+xml", rss(&[("s1", "2024-10-21")])).await;
  let (fetcher, _) = setup(&server).await;
  let fetcher = Arc::new(fetcher);

  let handle = spawn_scheduler(Arc::clone(&fetcher));
  let logs = tokio::time::timeout(Duration::from_secs(5), async {
    loop {
      let logs = fetcher.store().recent_fetch_logs(1).await.unwrap();
      if !logs.is_empty() {
        return logs;
      }
      tokio::time::sleep(Duration::from_millis(20)).await;
    }
  })
  .await
  .expect("scheduler never fetched");

  assert_eq!(logs[0].status, FetchStatus::Success);
  handle.stop().await.expect("stop scheduler");
}
