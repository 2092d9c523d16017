//! Markup cleanup: strip non-content elements and normalize text.

use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::Html;

use crate::error::{FetchError, FetchResult};

/// Maximum cleaned-text length, bounding downstream payload size.
pub const MAX_CONTENT_CHARS: usize = 30_000;

/// Element names that never carry page content.
const NON_CONTENT_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "form", "iframe",
    "frame", "noscript", "svg", "button", "select", "input", "textarea",
    "template",
];

/// ARIA roles marking chrome rather than content.
const NON_CONTENT_ROLES: &[&str] = &["navigation", "banner", "contentinfo"];

/// Parse raw markup, drop non-content elements, and normalize whitespace.
///
/// Fails with `ParseFailed` when nothing textual survives cleanup; the
/// content was fetched, only interpretation failed, so retrieval strategies
/// must not be retried.
pub fn clean_html(url: &str, html: &str) -> FetchResult<String> {
    let document = Html::parse_document(html);

    let mut out = String::new();
    collect_text(document.tree.root(), &mut out);

    let collapsed = out.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return Err(FetchError::ParseFailed {
            url: url.to_string(),
        });
    }

    Ok(truncate_chars(&collapsed, MAX_CONTENT_CHARS))
}

/// Depth-first text collection, skipping non-content subtrees.
fn collect_text(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => {
            out.push_str(text);
            out.push(' ');
        }
        Node::Element(element) => {
            if NON_CONTENT_TAGS.contains(&element.name()) {
                return;
            }
            if element
                .attr("role")
                .is_some_and(|role| NON_CONTENT_ROLES.contains(&role))
            {
                return;
            }
            for child in node.children() {
                collect_text(child, out);
            }
        }
        _ => {
            for child in node.children() {
                collect_text(child, out);
            }
        }
    }
}

/// Truncate on a character boundary.
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
