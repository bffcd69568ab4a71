//! Shared utility functions.

/// Convert a slug to title case.
///
/// Splits on `-` and `_`, capitalizes each word.
/// "hello-world" -> "Hello World"
/// "about_me" -> "About Me"
pub fn title_case(s: &str) -> String {
    s.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turn a free-form title into a file name slug.
///
/// Lowercases, drops everything that is not a word character, whitespace or
/// `-`, then joins the words separated by whitespace, `_` or `-` with a
/// single `-`.
/// "Hello, World!" -> "hello-world"
/// "Rust-lang tips" -> "rust-lang-tips"
pub fn slugify(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '_' | '-'))
        .collect::<String>()
        .split(|c: char| c.is_whitespace() || matches!(c, '_' | '-'))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
