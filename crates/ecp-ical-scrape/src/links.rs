//! Event link extraction from listing pages.

use std::sync::LazyLock;

use indexmap::IndexMap;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::config::SiteConfig;

/// Anchors with a title and an href; the href prefix is checked afterwards.
static EVENT_ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[title][href]").expect("static selector is valid"));

/// Metadata attached to an event link on a listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkAttrs {
    /// Tags from the link's `data-tags` attribute.
    pub tags: Vec<String>,
}

/// Event page URL to link metadata, in listing order.
pub type LinkMap = IndexMap<String, LinkAttrs>;

/// Extracts event links from a listing page.
///
/// Only anchors with a `title` attribute whose `href` starts with the
/// configured event prefix are kept. The query string is stripped from the
/// key. A link without usable `data-tags` gets the configured default tag.
pub fn extract_links(html: &[u8], config: &SiteConfig) -> LinkMap {
    let document = Html::parse_document(&String::from_utf8_lossy(html));
    let prefix = config.event_prefix_str();

    let mut links = LinkMap::new();
    for anchor in document.select(&EVENT_ANCHOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !href.starts_with(prefix) {
            continue;
        }
        let key = href.split('?').next().unwrap_or(href).to_string();
        let tags = parse_tags(anchor.value().attr("data-tags"), &config.default_tag);
        links.insert(key, LinkAttrs { tags });
    }
    links
}

/// Merges `page` into `links`.
///
/// A link seen again takes the newer attributes but keeps its first position.
pub fn merge_links(links: &mut LinkMap, page: LinkMap) {
    for (href, attrs) in page {
        links.insert(href, attrs);
    }
}

fn parse_tags(raw: Option<&str>, default_tag: &str) -> Vec<String> {
    let tags: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect();
    if tags.is_empty() {
        vec![default_tag.to_string()]
    } else {
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> LinkMap {
        extract_links(html.as_bytes(), &SiteConfig::default())
    }

    #[test]
    fn listing_page() {
        let html = r#"
            <html><body>
              <div class="eventList">
                <a title="Spring Hike" href="https://pittecp.org/event-5012?CalendarViewType=0&SelectedDate=1/1/2030" data-tags="outdoor, social">Spring Hike</a>
                <a title="Board Meeting" href="https://pittecp.org/event-5013">Board Meeting</a>
                <a href="https://pittecp.org/event-5014">No title attribute</a>
                <a title="Elsewhere" href="https://example.com/event-1">Off site</a>
                <a title="Sponsors" href="https://pittecp.org/Sponsors">Sponsors</a>
              </div>
            </body></html>
        "#;

        insta::assert_json_snapshot!(extract(html), @r#"
        {
          "https://pittecp.org/event-5012": {
            "tags": [
              "outdoor",
              "social"
            ]
          },
          "https://pittecp.org/event-5013": {
            "tags": [
              "ecp club event"
            ]
          }
        }
        "#);
    }

    #[test]
    fn blank_data_tags_fall_back_to_default() {
        let html = r#"<a title="x" href="https://pittecp.org/event-1" data-tags=" , ">x</a>"#;
        let links = extract(html);
        assert_eq!(links["https://pittecp.org/event-1"].tags, ["ecp club event"]);
    }

    #[test]
    fn empty_tags_are_dropped() {
        let html = r#"<a title="x" href="https://pittecp.org/event-1" data-tags="a,,b,">x</a>"#;
        let links = extract(html);
        assert_eq!(links["https://pittecp.org/event-1"].tags, ["a", "b"]);
    }

    #[test]
    fn duplicate_links_keep_first_position() {
        let html = r#"
            <a title="one" href="https://pittecp.org/event-1" data-tags="a">1</a>
            <a title="two" href="https://pittecp.org/event-2" data-tags="b">2</a>
            <a title="one again" href="https://pittecp.org/event-1?x=y" data-tags="c">1</a>
        "#;
        let links = extract(html);
        let order: Vec<&str> = links.keys().map(String::as_str).collect();
        assert_eq!(
            order,
            ["https://pittecp.org/event-1", "https://pittecp.org/event-2"]
        );
        assert_eq!(links["https://pittecp.org/event-1"].tags, ["c"]);
    }

    #[test]
    fn page_without_events() {
        assert!(extract("<html><body><p>Nothing scheduled</p></body></html>").is_empty());
    }

    #[test]
    fn merge_keeps_first_seen_order() {
        let mut links = extract(
            r#"<a title="1" href="https://pittecp.org/event-1" data-tags="old">1</a>
               <a title="2" href="https://pittecp.org/event-2">2</a>"#,
        );
        let next_year = extract(
            r#"<a title="3" href="https://pittecp.org/event-3">3</a>
               <a title="1" href="https://pittecp.org/event-1" data-tags="new">1</a>"#,
        );

        merge_links(&mut links, next_year);

        let order: Vec<&str> = links.keys().map(String::as_str).collect();
        assert_eq!(
            order,
            [
                "https://pittecp.org/event-1",
                "https://pittecp.org/event-2",
                "https://pittecp.org/event-3"
            ]
        );
        assert_eq!(links["https://pittecp.org/event-1"].tags, ["new"]);
    }
}
