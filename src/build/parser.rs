//! Content parser: one source file in, one `Document` out.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use tracing::debug;

use super::document::{Document, DocumentKind, Metadata, parse_front_matter};
use super::markdown::render_markdown;
use super::paths::{is_post_path, source_path_to_url};
use crate::config::SiteConfig;
use crate::util::title_case;

/// Appended to an excerpt that was cut short.
pub const ELLIPSIS: &str = "...";

/// Metadata keys the parser and transform steps own; author values for these are dropped.
const RESERVED_KEYS: &[&str] = &[
    "url",
    "type",
    "identifier",
    "formatted_date",
    "reading_time",
    "site",
];

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed front matter in {path}: {message}")]
    MalformedHeader { path: PathBuf, message: String },
}

/// Reads source documents relative to the configured source root.
pub struct ContentParser {
    source_root: PathBuf,
    output_extension: String,
    excerpt_length: usize,
}

impl ContentParser {
    pub fn new(config: &SiteConfig) -> Self {
        Self {
            source_root: config.source_path(),
            output_extension: config.output_extension.clone(),
            excerpt_length: config.excerpt_length,
        }
    }

    /// Parse a single source file.
    pub fn parse(&self, source_path: &Path) -> Result<Document, ParseError> {
        let raw = std::fs::read_to_string(source_path).map_err(|source| ParseError::Read {
            path: source_path.to_path_buf(),
            source,
        })?;

        let parsed = parse_front_matter(&raw).map_err(|e| ParseError::MalformedHeader {
            path: source_path.to_path_buf(),
            message: e.to_string(),
        })?;
        let front_matter = parsed.front_matter;
        let body = parsed.content;

        let relative = source_path
            .strip_prefix(&self.source_root)
            .unwrap_or(source_path);

        let kind = if is_post_path(relative) {
            DocumentKind::Post
        } else {
            DocumentKind::Page
        };

        let url = source_path_to_url(relative, &self.output_extension);

        let date = match front_matter.date.as_deref() {
            Some(value) => parse_date(value).ok_or_else(|| ParseError::MalformedHeader {
                path: source_path.to_path_buf(),
                message: format!("unrecognized date '{}'", value),
            })?,
            None => file_date(source_path)?,
        };

        let identifier = source_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let title = front_matter
            .title
            .clone()
            .unwrap_or_else(|| title_case(&identifier));

        let mut extra = front_matter.extra;
        for key in RESERVED_KEYS {
            extra.remove(*key);
        }

        debug!("parsed {} as {:?} at {}", relative.display(), kind, url);

        Ok(Document {
            metadata: Metadata {
                title,
                date,
                url,
                kind,
                identifier,
                draft: front_matter.draft,
                layout: front_matter.layout,
                formatted_date: None,
                reading_time: None,
                site: None,
                extra,
            },
            rendered_body: render_markdown(&body),
            excerpt: generate_excerpt(&body, self.excerpt_length),
            raw_body: body,
        })
    }
}

/// Parse an author-supplied date.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and bare
/// `YYYY-MM-DD` (midnight UTC).
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Creation time of a file, or its modification time where the platform
/// does not record creation.
fn file_date(path: &Path) -> Result<DateTime<Utc>, ParseError> {
    let read_error = |source| ParseError::Read {
        path: path.to_path_buf(),
        source,
    };
    let meta = std::fs::metadata(path).map_err(read_error)?;
    let time = meta
        .created()
        .or_else(|_| meta.modified())
        .map_err(read_error)?;
    Ok(DateTime::<Utc>::from(time))
}

static IMAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[.*?\]\(.*?\)").unwrap());
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());
static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#{1,6}\s+").unwrap());
static BOLD_STARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static BOLD_UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"__(.*?)__").unwrap());
static ITALIC_STAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.*?)\*").unwrap());
static ITALIC_UNDERSCORE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_(.*?)_").unwrap());
static CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)`{1,3}(.*?)`{1,3}").unwrap());
static BLOCKQUOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*>+[ \t]*").unwrap());
static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[-+*][ \t]+").unwrap());
static NUMBERED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\d+\.[ \t]+").unwrap());
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{2,}").unwrap());

/// Produce a plain-text excerpt of a markdown body.
///
/// Markup is stripped in a fixed order, then the text is cut to `length`
/// characters. [`ELLIPSIS`] is appended only when something was cut.
pub fn generate_excerpt(markdown: &str, length: usize) -> String {
    let text = markdown.replace("\r\n", "\n");
    let text = IMAGE.replace_all(&text, "");
    let text = LINK.replace_all(&text, "$1");
    let text = HEADING.replace_all(&text, "");
    let text = BOLD_STARS.replace_all(&text, "$1");
    let text = BOLD_UNDERSCORES.replace_all(&text, "$1");
    let text = ITALIC_STAR.replace_all(&text, "$1");
    let text = ITALIC_UNDERSCORE.replace_all(&text, "$1");
    let text = CODE.replace_all(&text, "$1");
    let text = BLOCKQUOTE.replace_all(&text, "");
    let text = BULLET.replace_all(&text, "");
    let text = NUMBERED.replace_all(&text, "");
    let text = BLANK_LINES.replace_all(&text, "\n");
    let text = text.trim();

    if text.chars().count() > length {
        let cut: String = text.chars().take(length).collect();
        format!("{}{}", cut, ELLIPSIS)
    } else {
        text.to_string()
    }
}
