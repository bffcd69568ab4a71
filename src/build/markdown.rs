//! Markdown rendering with the site's code block and list item rules.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd, html};

/// Render markdown to HTML using pulldown-cmark.
///
/// Two rules differ from the stock HTML writer:
/// - code blocks become `<pre><code class="language-{tag}">`, with the tag taken
///   from the fence info string
/// - list items never wrap their text in `<p>`, even in loose lists
pub fn render_markdown(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_SMART_PUNCTUATION;

    let parser = Parser::new_ext(markdown, options);

    // Process events, intercepting code blocks
    let mut in_code_block = false;
    let mut code_language = String::new();
    let mut code_content = String::new();

    // Open container tags; a paragraph whose parent is an item gets unwrapped
    let mut open_tags: Vec<bool> = Vec::new();

    let events: Vec<Event> = parser
        .flat_map(|event| match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                in_code_block = true;
                code_language = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().unwrap_or_default().to_string()
                    }
                    CodeBlockKind::Indented => String::new(),
                };
                code_content.clear();
                vec![] // Don't emit the start tag yet
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                vec![Event::Html(code_block(&code_content, &code_language).into())]
            }
            Event::Text(text) if in_code_block => {
                code_content.push_str(&text);
                vec![]
            }
            Event::Start(Tag::Item) => {
                open_tags.push(true);
                vec![event]
            }
            Event::Start(Tag::Paragraph) => {
                let in_item = open_tags.last().copied().unwrap_or(false);
                open_tags.push(false);
                if in_item {
                    vec![]
                } else {
                    vec![event]
                }
            }
            Event::End(TagEnd::Paragraph) => {
                open_tags.pop();
                if open_tags.last().copied().unwrap_or(false) {
                    // Keep separate paragraphs of one item apart
                    vec![Event::SoftBreak]
                } else {
                    vec![event]
                }
            }
            Event::Start(ref tag) if is_container(tag) => {
                open_tags.push(false);
                vec![event]
            }
            Event::End(ref tag) if is_container_end(tag) => {
                open_tags.pop();
                vec![event]
            }
            _ => vec![event],
        })
        .collect();

    let mut html_output = String::new();
    html::push_html(&mut html_output, events.into_iter());

    html_output
}

/// Block-level tags that can sit between an item and a paragraph.
fn is_container(tag: &Tag) -> bool {
    matches!(
        tag,
        Tag::BlockQuote(_) | Tag::List(_) | Tag::FootnoteDefinition(_) | Tag::TableCell
    )
}

fn is_container_end(tag: &TagEnd) -> bool {
    matches!(
        tag,
        TagEnd::Item
            | TagEnd::BlockQuote(_)
            | TagEnd::List(_)
            | TagEnd::FootnoteDefinition
            | TagEnd::TableCell
    )
}

fn code_block(code: &str, language: &str) -> String {
    let escaped = html_escape(code);
    if language.is_empty() {
        format!("<pre><code>{}</code></pre>\n", escaped)
    } else {
        format!(
            "<pre><code class=\"language-{}\">{}</code></pre>\n",
            html_escape(language),
            escaped
        )
    }
}

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic_markdown() {
        let html = render_markdown("# Hello\n\nWorld");
        assert!(html.contains("<h1>Hello</h1>"));
        assert!(html.contains("<p>World</p>"));
    }

    #[test]
    fn test_code_block_carries_language_class() {
        let html = render_markdown("```rust\nlet x = 1 < 2;\n```");
        assert!(html.contains("<pre><code class=\"language-rust\">let x = 1 &lt; 2;\n</code></pre>"));
    }

    #[test]
    fn test_code_block_without_language() {
        let html = render_markdown("    indented code\n");
        assert!(html.contains("<pre><code>indented code\n</code></pre>"));
    }

    #[test]
    fn test_loose_list_items_have_no_paragraphs() {
        let html = render_markdown("- one\n\n- two\n");
        assert!(html.contains("<li>one"));
        assert!(html.contains("<li>two"));
        assert!(!html.contains("<p>"));
    }

    #[test]
    fn test_paragraph_after_list_is_kept() {
        let html = render_markdown("- one\n- two\n\nAfter the list.\n");
        assert!(html.contains("<p>After the list.</p>"));
    }

    #[test]
    fn test_blockquote_inside_item_keeps_paragraph() {
        let html = render_markdown("- item\n\n  > quoted\n");
        assert!(html.contains("<blockquote>\n<p>quoted</p>"));
    }
}
