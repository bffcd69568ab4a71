//! Extensions described in YAML instead of code.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;

use super::Extension;
use crate::build::document::Document;
use crate::build::pipeline::{StepError, TransformStep};
use crate::config::{ExtensionSpec, SiteConfig};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z0-9_-]+)\}").unwrap());

/// Build an extension from its declarative description.
///
/// Settings for `name` are read from the config once, at load time.
pub fn declarative_extension(name: &str, spec: &ExtensionSpec, config: &SiteConfig) -> Extension {
    let mut extension = Extension::new(name);

    if !spec.defaults.is_empty() {
        extension = extension.with_transform(DefaultsStep {
            name: name.to_string(),
            defaults: spec.defaults.clone(),
        });
    }

    if let Some(snippet) = &spec.snippet {
        extension = extension.with_render(Snippet {
            template: snippet.clone(),
            settings: scalar_settings(config.settings_for(name)),
        });
    }

    extension
}

/// Fills metadata keys a document does not set.
struct DefaultsStep {
    name: String,
    defaults: BTreeMap<String, serde_yaml::Value>,
}

impl TransformStep for DefaultsStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, mut doc: Document, _config: &SiteConfig) -> Result<Document, StepError> {
        for (key, value) in &self.defaults {
            doc.metadata.insert_default(key, value.clone());
        }
        Ok(doc)
    }
}

/// Returns a markup snippet with `{key}` placeholders filled in.
///
/// Call arguments are HTML-escaped; configured settings are inserted as
/// written.
struct Snippet {
    template: String,
    settings: BTreeMap<String, String>,
}

impl tera::Function for Snippet {
    fn call(&self, args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
        let filled = PLACEHOLDER.replace_all(&self.template, |caps: &regex::Captures| {
            let key = &caps[1];
            match args.get(key) {
                Some(tera::Value::String(s)) => tera::escape_html(s),
                Some(other) => tera::escape_html(&other.to_string()),
                None => self
                    .settings
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string()),
            }
        });
        Ok(tera::Value::String(filled.into_owned()))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// Flatten the scalar entries of an extension's settings mapping to strings.
fn scalar_settings(settings: Option<&serde_yaml::Value>) -> BTreeMap<String, String> {
    let Some(serde_yaml::Value::Mapping(map)) = settings else {
        return BTreeMap::new();
    };

    map.iter()
        .filter_map(|(key, value)| {
            let key = key.as_str()?;
            let value = match value {
                serde_yaml::Value::String(s) => s.clone(),
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key.to_string(), value))
        })
        .collect()
}
