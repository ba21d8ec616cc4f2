//! Text and date clean-up applied to every ingested entry.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use quick_xml::escape::resolve_html5_entity;
use regex::{Captures, Regex};

static TAG: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag pattern"));
static WHITESPACE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);")
    .expect("valid entity pattern")
});

/// Decode one entity body (the part between `&` and `;`).
fn decode_entity(name: &str) -> Option<String> {
  let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
    u32::from_str_radix(hex, 16).ok()
  } else if let Some(dec) = name.strip_prefix('#') {
    dec.parse().ok()
  } else {
    return resolve_html5_entity(name).map(str::to_owned);
  };
  code.and_then(char::from_u32).map(String::from)
}

/// Unescape HTML entities, strip tags, collapse whitespace and trim.
///
/// Entities are decoded one at a time. A bare `&` or an unknown entity is
/// kept as written and does not stop its neighbours from being decoded.
pub fn clean_text(raw: &str) -> String {
  if raw.is_empty() {
    return String::new();
  }
  let unescaped = ENTITY.replace_all(raw, |caps: &Captures<'_>| {
    decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_owned())
  });
  let stripped = TAG.replace_all(&unescaped, "");
  WHITESPACE.replace_all(&stripped, " ").trim().to_owned()
}

const ZONED_FORMATS: &[&str] = &[
  "%Y-%m-%d %H:%M:%S %z",
  "%Y-%m-%dT%H:%M:%S%z",
  "%a, %d %b %Y %H:%M %z",
  "%d %b %Y %H:%M:%S %z",
];

const NAIVE_FORMATS: &[&str] = &[
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%dT%H:%M:%S%.f",
  "%a, %d %b %Y %H:%M:%S",
  "%d %b %Y %H:%M:%S",
];

/// Parse a feed timestamp: RFC 2822 first, then RFC 3339, then a handful of
/// formats seen in the wild. Zone-less values are taken as UTC.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
  let s = raw.trim();
  if s.is_empty() {
    return None;
  }
  if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
    return Some(dt.with_timezone(&Utc));
  }
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  for fmt in ZONED_FORMATS {
    if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
      return Some(dt.with_timezone(&Utc));
    }
  }
  // Feeds commonly end naive timestamps with a zone name chrono can't read.
  let bare = s
    .strip_suffix(" GMT")
    .or_else(|| s.strip_suffix(" UTC"))
    .unwrap_or(s);
  for fmt in NAIVE_FORMATS {
    if let Ok(dt) = NaiveDateTime::parse_from_str(bare, fmt) {
      return Some(dt.and_utc());
    }
  }
  NaiveDate::parse_from_str(bare, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn clean_text_unescapes_strips_and_collapses() {
    assert_eq!(
      clean_text("<p>Salah&nbsp;scores &amp; City   <b>win</b></p>\n\n"),
      "Salah scores & City win"
    );
    assert_eq!(clean_text("&lt;b&gt;bold&lt;/b&gt; claim"), "bold claim");
    assert_eq!(clean_text(""), "");
  }

  #[test]
  fn clean_text_survives_bare_ampersands() {
    assert_eq!(clean_text("Q&A <i>with</i> the boss"), "Q&A with the boss");
  }

  #[test]
  fn entities_beside_a_bare_ampersand_are_still_decoded() {
    assert_eq!(
      clean_text("Q&A: Spurs &amp; Arsenal &#8211; live"),
      "Q&A: Spurs & Arsenal \u{2013} live"
    );
    assert_eq!(clean_text("R&D &#x2019;s &bogus; &#xZZ;"), "R&D \u{2019}s &bogus; &#xZZ;");
  }

  #[test]
  fn rfc2822_is_preferred() {
    let dt = parse_date("Mon, 21 Oct 2024 07:28:00 GMT").unwrap();
    assert_eq!(dt, Utc.with_ymd_and_hms(2024, 10, 21, 7, 28, 0).unwrap());
  }

  #[test]
  fn rfc3339_and_naive_fallbacks() {
    let expected = Utc.with_ymd_and_hms(2024, 10, 21, 7, 28, 0).unwrap();
    assert_eq!(parse_date("2024-10-21T09:28:00+02:00"), Some(expected));
    assert_eq!(parse_date("2024-10-21 07:28:00"), Some(expected));
    assert_eq!(
      parse_date("2024-10-21"),
      Some(Utc.with_ymd_and_hms(2024, 10, 21, 0, 0, 0).unwrap())
    );
  }

  #[test]
  fn garbage_dates_are_none() {
    assert_eq!(parse_date("yesterday-ish"), None);
    assert_eq!(parse_date("   "), None);
  }
}
