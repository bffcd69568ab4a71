use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SiteData;

// =============================================================================
// Documents
// =============================================================================

/// Whether a document is a dated post or a standalone page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Post,
    Page,
}

/// A document flowing through the build pipeline.
///
/// Documents progress through stages:
/// 1. Parsed: metadata defaulted, body converted to HTML, excerpt derived
/// 2. Transformed: layout chosen, URLs normalized, display metadata attached
/// 3. Rendered: consumed by the renderer to produce the final page
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    /// Front matter plus derived metadata (available in templates as `page`)
    pub metadata: Metadata,
    /// The HTML produced from the markdown body
    pub rendered_body: String,
    /// Plain-text summary of the body
    pub excerpt: String,
    /// The markdown body without the front matter block
    pub raw_body: String,
}

/// Metadata for a single document.
///
/// The fixed fields are always present after parsing; the `Option` fields
/// are filled in by the transform pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub title: String,
    /// Normalized timestamp, serialized as RFC 3339
    pub date: DateTime<Utc>,
    /// Site-root-relative URL (e.g. "/posts/hello.html")
    pub url: String,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    /// File stem of the source (e.g. "2024-01-01-hello")
    pub identifier: String,
    pub draft: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_date: Option<String>,
    /// Estimated minutes to read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<SiteData>,
    /// Author-supplied keys, passed through verbatim (e.g. `page.tags`)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Keys with a dedicated `Metadata` field; never stored in `extra`.
const FIELD_KEYS: &[&str] = &[
    "title",
    "date",
    "url",
    "type",
    "identifier",
    "draft",
    "layout",
    "formatted_date",
    "reading_time",
    "site",
];

impl Metadata {
    /// Insert an extra key unless the document already has a value for it.
    ///
    /// Returns whether the value was inserted.
    pub fn insert_default(&mut self, key: &str, value: serde_yaml::Value) -> bool {
        if FIELD_KEYS.contains(&key) || self.extra.contains_key(key) {
            return false;
        }
        self.extra.insert(key.to_string(), value);
        true
    }
}

impl Document {
    /// The document's stable identifier.
    pub fn identifier(&self) -> &str {
        &self.metadata.identifier
    }

    pub fn is_post(&self) -> bool {
        self.metadata.kind == DocumentKind::Post
    }
}

// =============================================================================
// Front matter
// =============================================================================

/// Front matter metadata parsed from the document header.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrontMatter {
    /// Page title (can override filename-derived title)
    pub title: Option<String>,
    /// Publication date as written by the author
    pub date: Option<String>,
    /// Exclude from the build
    #[serde(default)]
    pub draft: bool,
    /// Layout override
    pub layout: Option<String>,
    /// Additional arbitrary metadata (available in templates at top level, e.g., `page.author`)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Result of parsing front matter from markdown content.
#[derive(Debug)]
pub struct ParsedContent {
    /// The parsed front matter (empty if none found)
    pub front_matter: FrontMatter,
    /// The markdown content without the front matter block
    pub content: String,
}

/// Parse front matter from markdown content.
///
/// Front matter is a YAML block delimited by `---` at the start of the file:
///
/// ```markdown
/// ---
/// title: My Page
/// date: 2024-01-01
/// custom_field: custom value
/// ---
///
/// # Content starts here
/// ```
///
/// Returns the parsed front matter and the remaining content. A header that
/// is present but not valid YAML is an error.
pub fn parse_front_matter(content: &str) -> Result<ParsedContent, serde_yaml::Error> {
    let trimmed = content.trim_start_matches('\u{feff}');

    // Check if content starts with front matter delimiter
    let Some(after_opening) = trimmed
        .strip_prefix("---\n")
        .or_else(|| trimmed.strip_prefix("---\r\n"))
        .or_else(|| (trimmed.trim_end() == "---").then_some(""))
    else {
        return Ok(ParsedContent {
            front_matter: FrontMatter::default(),
            content: trimmed.to_string(),
        });
    };

    // Find the closing delimiter, which may directly follow the opening one
    let (yaml_content, rest) = if let Some(rest) = after_opening.strip_prefix("---") {
        ("", rest)
    } else if let Some(pos) = after_opening.find("\n---") {
        (&after_opening[..pos], &after_opening[pos + 4..])
    } else {
        // No closing delimiter found, treat entire content as markdown
        return Ok(ParsedContent {
            front_matter: FrontMatter::default(),
            content: trimmed.to_string(),
        });
    };

    // Skip the remainder of the closing delimiter line
    let markdown_content = match rest.find('\n') {
        Some(pos) => rest[pos + 1..].trim_start_matches(['\n', '\r']),
        None => "",
    };

    let front_matter = if yaml_content.trim().is_empty() {
        FrontMatter::default()
    } else {
        serde_yaml::from_str(yaml_content)?
    };

    Ok(ParsedContent {
        front_matter,
        content: markdown_content.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_front_matter_basic() {
        let content = r#"---
title: My Page
date: 2024-03-05
---

# Hello World
"#;
        let parsed = parse_front_matter(content).unwrap();
        assert_eq!(parsed.front_matter.title, Some("My Page".to_string()));
        assert_eq!(parsed.front_matter.date, Some("2024-03-05".to_string()));
        assert!(!parsed.front_matter.draft);
        assert_eq!(parsed.content.trim(), "# Hello World");
    }

    #[test]
    fn test_parse_front_matter_with_custom_fields() {
        let content = r#"---
title: Custom Page
author: Jo Doe
draft: true
tags:
  - rust
  - blogging
---

Content here
"#;
        let parsed = parse_front_matter(content).unwrap();
        assert_eq!(parsed.front_matter.title, Some("Custom Page".to_string()));
        assert!(parsed.front_matter.draft);
        assert!(parsed.front_matter.extra.contains_key("author"));
        assert!(parsed.front_matter.extra.contains_key("tags"));
        assert!(!parsed.front_matter.extra.contains_key("draft"));
    }

    #[test]
    fn test_parse_front_matter_no_front_matter() {
        let content = "# Just Markdown\n\nNo front matter here.";
        let parsed = parse_front_matter(content).unwrap();
        assert_eq!(parsed.front_matter.title, None);
        assert!(parsed.content.starts_with("# Just Markdown"));
    }

    #[test]
    fn test_parse_front_matter_empty_front_matter() {
        let content = "---\n---\n\n# Content";
        let parsed = parse_front_matter(content).unwrap();
        assert_eq!(parsed.front_matter.title, None);
        assert!(parsed.content.starts_with("# Content"));
    }

    #[test]
    fn test_parse_front_matter_malformed() {
        let content = "---\ntitle: [unclosed\n---\nbody";
        assert!(parse_front_matter(content).is_err());
    }

    #[test]
    fn test_horizontal_rule_in_body_is_not_front_matter() {
        let content = "Intro\n\n---\n\nMore";
        let parsed = parse_front_matter(content).unwrap();
        assert_eq!(parsed.content, content);
    }
}
