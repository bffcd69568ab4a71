use std::collections::BTreeSet;

use serde::Serialize;
use tera::{Context, Tera};
use tracing::warn;

use super::document::Document;
use super::helpers;
use super::pipeline::DEFAULT_LAYOUT;
use crate::config::SiteData;
use crate::theme::{LayoutSource, ThemeError};

/// Layout tried first for the home page.
pub const HOME_LAYOUT: &str = "home";

/// URL of the generated home page.
pub const HOME_URL: &str = "/index.html";

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("layout not found: {0}")]
    LayoutNotFound(String),

    #[error(transparent)]
    Theme(#[from] ThemeError),
}

/// The template renderer, wrapping Tera.
///
/// Every layout is compiled up front, keyed by its name. Autoescaping is on
/// for all layouts, so templates must mark rendered HTML with `| safe`.
pub struct Renderer {
    tera: Tera,
    layouts: BTreeSet<String>,
    site: SiteData,
}

impl Renderer {
    /// Compile every layout from the source and register the built-in helpers.
    pub fn new(source: &dyn LayoutSource, site: SiteData) -> Result<Self, RenderError> {
        let layouts = source.load_layouts()?;

        let mut tera = Tera::default();
        tera.autoescape_on(vec![""]);
        helpers::register_builtins(&mut tera);
        tera.add_raw_templates(
            layouts
                .iter()
                .map(|layout| (layout.name.as_str(), layout.source.as_str())),
        )?;

        Ok(Self {
            tera,
            layouts: layouts.into_iter().map(|layout| layout.name).collect(),
            site,
        })
    }

    /// Register a template function, typically an extension's render hook.
    ///
    /// A function registered under an existing name replaces it.
    pub fn register_helper<F>(&mut self, name: &str, function: F)
    where
        F: tera::Function + 'static,
    {
        self.tera.register_function(name, function);
    }

    /// Render a document with its layout.
    ///
    /// An unknown layout falls back to `default` with a warning.
    pub fn render(&self, doc: &Document) -> Result<String, RenderError> {
        let requested = doc.metadata.layout.as_deref().unwrap_or(DEFAULT_LAYOUT);
        let layout = self.resolve_layout(requested, DEFAULT_LAYOUT)?;

        let mut context = Context::new();
        context.insert("page", &doc.metadata);
        context.insert("content", &doc.rendered_body);
        context.insert("site", &self.site);

        Ok(self.tera.render(layout, &context)?)
    }

    /// Render the home page with every post and page, in the given order.
    pub fn render_home(&self, docs: &[Document]) -> Result<String, RenderError> {
        let layout = self.resolve_layout(HOME_LAYOUT, DEFAULT_LAYOUT)?;

        let page = HomePage {
            title: &self.site.title,
            description: self.site.description.replace('\n', "<br>"),
            url: HOME_URL,
        };
        let posts: Vec<&Document> = docs.iter().filter(|doc| doc.is_post()).collect();
        let pages: Vec<&Document> = docs.iter().filter(|doc| !doc.is_post()).collect();

        let mut context = Context::new();
        context.insert("page", &page);
        context.insert("posts", &posts);
        context.insert("pages", &pages);
        context.insert("site", &self.site);

        Ok(self.tera.render(layout, &context)?)
    }

    fn resolve_layout<'a>(
        &'a self,
        requested: &'a str,
        fallback: &'a str,
    ) -> Result<&'a str, RenderError> {
        if self.layouts.contains(requested) {
            return Ok(requested);
        }
        if requested != fallback && self.layouts.contains(fallback) {
            if requested != HOME_LAYOUT {
                warn!("layout '{}' not found, using '{}'", requested, fallback);
            }
            return Ok(fallback);
        }
        Err(RenderError::LayoutNotFound(requested.to_string()))
    }
}

/// Page metadata exposed to the home layout.
#[derive(Debug, Serialize)]
struct HomePage<'a> {
    title: &'a str,
    description: String,
    url: &'a str,
}
