//! Core data types produced by the classification pipeline.

use serde::{Deserialize, Serialize};

/// Taxonomy tags for a classified page.
///
/// Each value is a `"category:value"` string drawn from a fixed vocabulary,
/// but parsing is permissive: unknown tags are accepted as-is, and any
/// category may be empty. The classification backend is trusted to follow
/// the taxonomy; the pipeline never rejects what it returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet {
    /// Audience tags (e.g. "personas:patient", "personas:caregiver")
    #[serde(default)]
    pub personas: Vec<String>,

    /// Condition-type tags (e.g. "types:autoimmune"), plus free-form subtypes
    #[serde(default)]
    pub types: Vec<String>,

    /// Journey-stage tags (e.g. "stages:acute_hospital")
    #[serde(default)]
    pub stages: Vec<String>,

    /// Topic tags (e.g. "topics:memory", "topics:legal")
    #[serde(default)]
    pub topics: Vec<String>,
}

impl TagSet {
    /// Check whether every category is empty.
    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
            && self.types.is_empty()
            && self.stages.is_empty()
            && self.topics.is_empty()
    }

    /// Total number of tags across all categories.
    pub fn len(&self) -> usize {
        self.personas.len() + self.types.len() + self.stages.len() + self.topics.len()
    }
}

/// A page that has been fetched, cleaned, and classified.
///
/// Produced exactly once per URL by a classification backend and immutable
/// afterwards. The caller is the long-term owner: these accumulate into a
/// results collection that survives across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedPage {
    /// The page URL, as listed in the sitemap
    pub url: String,

    /// Page title as determined by the backend
    pub title: String,

    /// Short content summary
    pub summary: String,

    /// Taxonomy tags
    #[serde(default)]
    pub tags: TagSet,
}

impl ClassifiedPage {
    /// Create a classified page by merging the caller's URL with a parsed
    /// backend response.
    ///
    /// A blank title falls back to the first sentence of the summary so
    /// downstream display never shows an unnamed entry.
    pub fn from_parts(url: impl Into<String>, title: String, summary: String, tags: TagSet) -> Self {
        let title = if title.trim().is_empty() {
            summary
                .split(['.', '!', '?'])
                .next()
                .unwrap_or("")
                .trim()
                .to_string()
        } else {
            title.trim().to_string()
        };

        Self {
            url: url.into(),
            title,
            summary,
            tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagset_default_is_empty() {
        let tags = TagSet::default();
        assert!(tags.is_empty());
        assert_eq!(tags.len(), 0);
    }

    #[test]
    fn test_tagset_accepts_unknown_values() {
        let json = r#"{"personas":["personas:alien"],"types":[],"stages":[],"topics":["topics:made_up"]}"#;
        let tags: TagSet = serde_json::from_str(json).unwrap();
        assert_eq!(tags.personas, vec!["personas:alien"]);
        assert_eq!(tags.topics, vec!["topics:made_up"]);
    }

    #[test]
    fn test_tagset_missing_categories_default() {
        let json = r#"{"personas":["personas:patient"]}"#;
        let tags: TagSet = serde_json::from_str(json).unwrap();
        assert_eq!(tags.personas.len(), 1);
        assert!(tags.types.is_empty());
    }

    #[test]
    fn test_blank_title_falls_back_to_first_sentence() {
        let page = ClassifiedPage::from_parts(
            "https://example.com/a",
            "  ".to_string(),
            "Covers memory problems after illness. More detail follows.".to_string(),
            TagSet::default(),
        );
        assert_eq!(page.title, "Covers memory problems after illness");
    }

    #[test]
    fn test_title_is_trimmed() {
        let page = ClassifiedPage::from_parts(
            "https://example.com/a",
            "  A Title  ".to_string(),
            "Summary.".to_string(),
            TagSet::default(),
        );
        assert_eq!(page.title, "A Title");
    }
}
