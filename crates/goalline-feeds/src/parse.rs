//! Turning a downloaded body into [`ParsedEntry`] values.
//!
//! RSS 2.0 is tried first; anything the `rss` crate rejects is retried as
//! Atom. Field extraction stays raw here: cleaning happens in
//! [`ParsedEntry::into_new_item`].

use chrono::{DateTime, Utc};
use goalline_core::feed::NewFeedItem;
use uuid::Uuid;

use crate::{
  Error, Result,
  normalize::{clean_text, parse_date},
};

/// One entry as it appeared in the feed, before normalisation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedEntry {
  /// Atom `<id>`.
  pub id:          Option<String>,
  /// RSS `<guid>`.
  pub guid:        Option<String>,
  pub link:        Option<String>,
  pub title:       String,
  pub description: String,
  pub content:     String,
  pub author:      String,
  pub category:    String,
  pub published:   Option<String>,
}

/// Whitespace-only values count as missing; anything else is kept verbatim.
fn non_empty(value: Option<&str>) -> Option<&str> {
  value.filter(|v| !v.trim().is_empty())
}

impl ParsedEntry {
  /// The deduplication key: `id`, then `guid`, then `link`. Blank values
  /// count as missing. The chosen value is stored exactly as the feed sent
  /// it, surrounding whitespace included.
  pub fn derive_guid(&self) -> Option<String> {
    non_empty(self.id.as_deref())
      .or_else(|| non_empty(self.guid.as_deref()))
      .or_else(|| non_empty(self.link.as_deref()))
      .map(str::to_owned)
  }

  /// Normalise into an insertable item. Returns `None` when no GUID can be
  /// derived. An unparseable or missing date becomes `now`.
  pub fn into_new_item(self, source_id: Uuid, now: DateTime<Utc>) -> Option<NewFeedItem> {
    let guid = self.derive_guid()?;
    let published_at = self
      .published
      .as_deref()
      .and_then(parse_date)
      .unwrap_or(now);
    Some(NewFeedItem {
      source_id,
      title: clean_text(&self.title),
      description: clean_text(&self.description),
      content: clean_text(&self.content),
      link: self.link.unwrap_or_default().trim().to_owned(),
      author: clean_text(&self.author),
      category: clean_text(&self.category),
      guid,
      published_at,
    })
  }

  fn from_rss_item(item: &rss::Item) -> Self {
    let dublin_core = item.dublin_core_ext();
    let author = item
      .author()
      .map(str::to_owned)
      .or_else(|| dublin_core.and_then(|dc| dc.creators().first().cloned()))
      .unwrap_or_default();
    let category = item
      .categories()
      .first()
      .map(|c| c.name().to_owned())
      .or_else(|| dublin_core.and_then(|dc| dc.subjects().first().cloned()))
      .unwrap_or_default();
    let published = item
      .pub_date()
      .map(str::to_owned)
      .or_else(|| dublin_core.and_then(|dc| dc.dates().first().cloned()));

    Self {
      id: None,
      guid: item.guid().map(|g| g.value().to_owned()),
      link: item.link().map(str::to_owned),
      title: item.title().unwrap_or_default().to_owned(),
      description: item.description().unwrap_or_default().to_owned(),
      content: item.content().unwrap_or_default().to_owned(),
      author,
      category,
      published,
    }
  }

  fn from_atom_entry(entry: &atom_syndication::Entry) -> Self {
    let link = entry
      .links()
      .iter()
      .find(|l| l.rel() == "alternate")
      .or_else(|| entry.links().first())
      .map(|l| l.href().to_owned());
    let published = entry.published().unwrap_or(entry.updated()).to_rfc3339();

    Self {
      id: Some(entry.id().to_owned()),
      guid: None,
      link,
      title: entry.title().value.clone(),
      description: entry
        .summary()
        .map(|s| s.value.clone())
        .unwrap_or_default(),
      content: entry
        .content()
        .and_then(|c| c.value())
        .unwrap_or_default()
        .to_owned(),
      author: entry
        .authors()
        .first()
        .map(|p| p.name().to_owned())
        .unwrap_or_default(),
      category: entry
        .categories()
        .first()
        .map(|c| c.label().unwrap_or(c.term()).to_owned())
        .unwrap_or_default(),
      published: Some(published),
    }
  }
}

/// Parse `body` as RSS 2.0, falling back to Atom.
pub fn parse_document(body: &[u8]) -> Result<Vec<ParsedEntry>> {
  match rss::Channel::read_from(body) {
    Ok(channel) => Ok(channel.items().iter().map(ParsedEntry::from_rss_item).collect()),
    Err(rss_err) => match atom_syndication::Feed::read_from(body) {
      Ok(feed) => Ok(feed.entries().iter().map(ParsedEntry::from_atom_entry).collect()),
      Err(atom_err) => Err(Error::Parse {
        rss:  rss_err.to_string(),
        atom: atom_err.to_string(),
      }),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Football</title>
    <link>https://example.com/</link>
    <description>News</description>
    <item>
      <title>Late winner</title>
      <link>https://example.com/a</link>
      <guid isPermaLink="false">guid-a</guid>
      <pubDate>Mon, 21 Oct 2024 07:28:00 GMT</pubDate>
      <description>&lt;p&gt;Drama at the death&lt;/p&gt;</description>
      <category>Premier League</category>
      <dc:creator>Staff Reporter</dc:creator>
    </item>
    <item>
      <title>Link only</title>
      <link>https://example.com/b</link>
    </item>
    <item>
      <title>Nothing to key on</title>
    </item>
  </channel>
</rss>"#;

  const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom football</title>
  <id>urn:feed</id>
  <updated>2024-10-21T07:28:00Z</updated>
  <entry>
    <title>Atom story</title>
    <id>urn:entry:1</id>
    <link href="https://example.com/atom/1"/>
    <updated>2024-10-21T07:28:00Z</updated>
    <summary>Summary text</summary>
    <author><name>Atom Writer</name></author>
  </entry>
</feed>"#;

  #[test]
  fn rss_entries_keep_guid_precedence() {
    let entries = parse_document(RSS.as_bytes()).unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].derive_guid().as_deref(), Some("guid-a"));
    assert_eq!(entries[0].author, "Staff Reporter");
    assert_eq!(entries[0].category, "Premier League");
    assert_eq!(entries[1].derive_guid().as_deref(), Some("https://example.com/b"));
    assert_eq!(entries[2].derive_guid(), None);
  }

  #[test]
  fn atom_is_the_fallback() {
    let entries = parse_document(ATOM.as_bytes()).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].derive_guid().as_deref(), Some("urn:entry:1"));
    assert_eq!(entries[0].link.as_deref(), Some("https://example.com/atom/1"));
    assert_eq!(entries[0].author, "Atom Writer");
  }

  #[test]
  fn id_beats_guid_and_blank_values_are_skipped() {
    let entry = ParsedEntry {
      id: Some("  ".into()),
      guid: Some("g".into()),
      link: Some("l".into()),
      ..Default::default()
    };
    assert_eq!(entry.derive_guid().as_deref(), Some("g"));

    let entry = ParsedEntry {
      id: Some("i".into()),
      guid: Some("g".into()),
      ..Default::default()
    };
    assert_eq!(entry.derive_guid().as_deref(), Some("i"));
  }

  #[test]
  fn guid_is_kept_verbatim() {
    let entry = ParsedEntry {
      guid: Some(" g ".into()),
      link: Some("l".into()),
      ..Default::default()
    };
    assert_eq!(entry.derive_guid().as_deref(), Some(" g "));

    let entry = ParsedEntry {
      guid: Some("\n\t".into()),
      link: Some(" l".into()),
      ..Default::default()
    };
    assert_eq!(entry.derive_guid().as_deref(), Some(" l"));
  }

  #[test]
  fn into_new_item_cleans_text_and_defaults_the_date() {
    let now = Utc::now();
    let entries = parse_document(RSS.as_bytes()).unwrap();
    let source_id = Uuid::new_v4();

    let item = entries[0].clone().into_new_item(source_id, now).unwrap();
    assert_eq!(item.description, "Drama at the death");
    assert_eq!(item.source_id, source_id);
    assert_ne!(item.published_at, now);

    let undated = entries[1].clone().into_new_item(source_id, now).unwrap();
    assert_eq!(undated.published_at, now);

    assert!(entries[2].clone().into_new_item(source_id, now).is_none());
  }

  #[test]
  fn garbage_is_a_parse_error() {
    assert!(matches!(
      parse_document(b"<html><body>not a feed</body></html>"),
      Err(Error::Parse { .. })
    ));
  }
}
