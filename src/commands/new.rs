use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::{NewArgs, NewKind, config::SiteConfig, util::slugify};

const PLACEHOLDER_BODY: &str = "Write your content here...";

#[derive(Serialize)]
struct NewFrontMatter<'a> {
    title: &'a str,
    date: String,
    draft: bool,
}

pub fn run(args: &NewArgs) -> Result<(), anyhow::Error> {
    let config = SiteConfig::load_from_arg(args.config_file.as_deref())?;
    let path = create_document(&config, args.kind, &args.title, Utc::now())?;

    println!("Created {}", path.display());
    Ok(())
}

/// Write a new source document with a front matter header and placeholder body.
///
/// Posts go to `posts/<date>-<slug>.md`, pages to `pages/<slug>.md`. An
/// existing file is never overwritten.
fn create_document(
    config: &SiteConfig,
    kind: NewKind,
    title: &str,
    now: DateTime<Utc>,
) -> Result<PathBuf, anyhow::Error> {
    let slug = slugify(title);
    if slug.is_empty() {
        anyhow::bail!("title '{}' has no characters usable in a file name", title);
    }

    let ext = &config.content_extension;
    let relative = match kind {
        NewKind::Post => PathBuf::from("posts").join(format!(
            "{}-{}.{}",
            now.format("%Y-%m-%d"),
            slug,
            ext
        )),
        NewKind::Page => PathBuf::from("pages").join(format!("{}.{}", slug, ext)),
    };
    let path = config.source_path().join(relative);

    let header = serde_yaml::to_string(&NewFrontMatter {
        title,
        date: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        draft: false,
    })?;
    let contents = format!("---\n{}---\n\n{}\n", header, PLACEHOLDER_BODY);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => {
                anyhow::anyhow!("{} already exists", path.display())
            }
            _ => e.into(),
        })?;
    file.write_all(contents.as_bytes())?;

    Ok(path)
}
