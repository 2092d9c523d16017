//! Sitemap parsing.
//!
//! Turns raw sitemap text into an ordered list of URLs. Structured XML
//! parsing is attempted first; if it yields nothing (malformed XML,
//! namespace oddities), a textual fallback extracts `<loc>...</loc>`
//! contents directly.

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};

/// Parse raw sitemap text into an ordered list of URLs.
///
/// Leading non-XML garbage (copy-pasted browser chrome, headers) is
/// discarded by locating the first XML declaration. Duplicates are
/// preserved in document order; deduplication is the queue's job.
///
/// An empty result is not an error: callers must treat it as "nothing
/// to do".
pub fn parse_sitemap(raw: &str) -> Vec<String> {
    let text = strip_preamble(raw);

    let urls = parse_structured(text);
    if !urls.is_empty() {
        debug!(count = urls.len(), "sitemap parsed via XML reader");
        return urls;
    }

    let urls = parse_fallback(text);
    if urls.is_empty() {
        warn!("sitemap yielded no URLs from either parser");
    } else {
        debug!(count = urls.len(), "sitemap parsed via textual fallback");
    }
    urls
}

/// Discard anything before the first XML declaration, if one exists.
fn strip_preamble(raw: &str) -> &str {
    match raw.find("<?xml") {
        Some(idx) => &raw[idx..],
        None => raw,
    }
}

/// Collect every `<loc>` element's trimmed text content, in document order.
fn parse_structured(text: &str) -> Vec<String> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut in_loc = false;
    let mut urls = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"loc" => in_loc = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"loc" => in_loc = false,
            Ok(Event::Text(t)) if in_loc => {
                if let Ok(content) = t.unescape() {
                    let url = content.trim();
                    if !url.is_empty() {
                        urls.push(url.to_string());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(error = %e, "XML parse error, will fall back to textual extraction");
                return Vec::new();
            }
            _ => {}
        }
    }

    urls
}

/// Extract `<loc>...</loc>` contents straight from the raw text.
fn parse_fallback(text: &str) -> Vec<String> {
    let pattern = regex::Regex::new(r"(?s)<loc[^>]*>(.*?)</loc>").expect("static regex");

    pattern
        .captures_iter(text)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|url| !url.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITEMAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.org/</loc></url>
  <url>
    <loc>https://example.org/about</loc>
  </url>
  <url>
    <loc>
      https://example.org/blog/1
    </loc>
  </url>
</urlset>"#;

    #[test]
    fn test_parse_basic_sitemap() {
        let urls = parse_sitemap(SITEMAP);
        assert_eq!(
            urls,
            vec![
                "https://example.org/",
                "https://example.org/about",
                "https://example.org/blog/1",
            ]
        );
    }

    #[test]
    fn test_parse_discards_preamble() {
        let pasted = format!("Sitemap — Mozilla Firefox\nhttps://example.org/sitemap.xml\n{SITEMAP}");
        let urls = parse_sitemap(&pasted);
        assert_eq!(urls.len(), 3);
        assert_eq!(urls[0], "https://example.org/");
    }

    #[test]
    fn test_parse_preserves_duplicates_and_order() {
        let xml = r#"<?xml version="1.0"?>
<urlset>
  <url><loc>https://example.org/b</loc></url>
  <url><loc>https://example.org/a</loc></url>
  <url><loc>https://example.org/b</loc></url>
</urlset>"#;
        let urls = parse_sitemap(xml);
        assert_eq!(
            urls,
            vec![
                "https://example.org/b",
                "https://example.org/a",
                "https://example.org/b",
            ]
        );
    }

    #[test]
    fn test_fallback_on_malformed_xml() {
        // Unclosed <urlset> plus stray ampersand breaks the XML reader,
        // but the <loc> pairs are still textually present.
        let broken = "<?xml version=\"1.0\"?><urlset><url><loc>https://example.org/x?a=1&b=2</loc></url>";
        let urls = parse_sitemap(broken);
        assert_eq!(urls, vec!["https://example.org/x?a=1&b=2"]);
    }

    #[test]
    fn test_fallback_without_xml_declaration() {
        let text = "random text <loc>https://example.org/one</loc> noise <loc> https://example.org/two </loc>";
        let urls = parse_sitemap(text);
        assert_eq!(urls, vec!["https://example.org/one", "https://example.org/two"]);
    }

    #[test]
    fn test_empty_input_yields_empty() {
        assert!(parse_sitemap("").is_empty());
    }

    #[test]
    fn test_no_locs_yields_empty() {
        assert!(parse_sitemap("no locs here").is_empty());
    }
}
