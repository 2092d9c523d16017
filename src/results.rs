//! Exporting and importing the accumulated results collection.
//!
//! Results are a JSON array of [`ClassifiedPage`] records. Import is
//! all-or-nothing: every element must carry a non-empty url and title and
//! a tags object, otherwise the whole import is rejected before any queue
//! execution begins.

use serde_json::Value;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::types::ClassifiedPage;

/// Serialize a results collection to a JSON array.
pub fn export_results(pages: &[ClassifiedPage]) -> Result<String> {
    Ok(serde_json::to_string_pretty(pages)?)
}

/// Parse and validate a previously exported results collection.
pub fn import_results(json: &str) -> Result<Vec<ClassifiedPage>> {
    let raw: Value = serde_json::from_str(json)?;

    let Value::Array(items) = &raw else {
        return Err(PipelineError::InvalidImport {
            reason: "expected a JSON array of classified pages".to_string(),
        });
    };

    for (idx, item) in items.iter().enumerate() {
        validate_entry(idx, item)?;
    }

    let pages: Vec<ClassifiedPage> = serde_json::from_value(raw)?;
    debug!(count = pages.len(), "imported results collection");
    Ok(pages)
}

fn validate_entry(idx: usize, item: &Value) -> Result<()> {
    let invalid = |reason: String| PipelineError::InvalidImport { reason };

    let Value::Object(obj) = item else {
        return Err(invalid(format!("entry {idx} is not an object")));
    };

    for field in ["url", "title"] {
        let ok = obj
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty());
        if !ok {
            return Err(invalid(format!("entry {idx} is missing a non-empty {field}")));
        }
    }

    if !obj.get("tags").is_some_and(Value::is_object) {
        return Err(invalid(format!("entry {idx} is missing tags")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TagSet;

    fn page(url: &str) -> ClassifiedPage {
        ClassifiedPage {
            url: url.to_string(),
            title: "Title".to_string(),
            summary: "Summary.".to_string(),
            tags: TagSet {
                personas: vec!["personas:patient".to_string()],
                ..TagSet::default()
            },
        }
    }

    #[test]
    fn test_round_trip() {
        let pages = vec![page("https://example.com/a"), page("https://example.com/b")];
        let json = export_results(&pages).unwrap();
        let restored = import_results(&json).unwrap();
        assert_eq!(restored, pages);
    }

    #[test]
    fn test_import_rejects_non_array() {
        let err = import_results(r#"{"url":"x"}"#).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidImport { .. }));
    }

    #[test]
    fn test_import_rejects_missing_title() {
        let json = r#"[{"url":"https://example.com","title":"","summary":"s","tags":{}}]"#;
        let err = import_results(json).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidImport { .. }));
    }

    #[test]
    fn test_import_rejects_missing_tags() {
        let json = r#"[{"url":"https://example.com","title":"t","summary":"s"}]"#;
        let err = import_results(json).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidImport { .. }));
    }

    #[test]
    fn test_import_rejects_whole_collection_on_one_bad_entry() {
        let json = r#"[
            {"url":"https://example.com/good","title":"t","summary":"s","tags":{}},
            {"url":"","title":"t","summary":"s","tags":{}}
        ]"#;
        let err = import_results(json).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidImport { .. }));
    }

    #[test]
    fn test_import_accepts_unknown_tag_values() {
        let json = r#"[{"url":"https://example.com","title":"t","summary":"s",
            "tags":{"personas":["personas:unheard_of"],"types":[],"stages":[],"topics":[]}}]"#;
        let pages = import_results(json).unwrap();
        assert_eq!(pages[0].tags.personas, vec!["personas:unheard_of"]);
    }
}
