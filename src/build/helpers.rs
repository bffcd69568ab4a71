//! Built-in template helpers.
//!
//! | name          | kind     | usage                                               |
//! |---------------|----------|-----------------------------------------------------|
//! | `format_date` | filter   | `{{ page.date \| format_date(format="YYYY-MM-DD") }}` |
//! | `limit`       | filter   | `{% for p in posts \| limit(n=5) %}`                 |
//! | `sort_by`     | filter   | `posts \| sort_by(field="metadata.date", direction="desc")` |
//! | `breaklines`  | filter   | `{{ site.description \| breaklines }}`               |
//! | `eq` / `ne`   | test     | `{% if page.type is eq("post") %}`                   |
//! | `now`         | function | `{{ now() }}`                                        |
//! | `debug`       | function | `{{ debug(value=page) }}`                            |

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::Utc;
use tera::{Filter, Result, Tera, Value};
use tracing::debug;

use super::parser::parse_date;

/// Register every built-in helper on a template engine.
pub fn register_builtins(tera: &mut Tera) {
    tera.register_filter("format_date", format_date);
    tera.register_filter("limit", limit);
    tera.register_filter("sort_by", sort_by);
    tera.register_filter("breaklines", BreakLines);
    tera.register_tester("eq", eq);
    tera.register_tester("ne", ne);
    tera.register_function("now", now);
    tera.register_function("debug", debug_value);
}

/// Date patterns understood by `format_date`, mapped to chrono formats.
fn date_pattern(name: &str) -> &'static str {
    match name {
        "YYYY-MM-DD" => "%Y-%m-%d",
        "DD/MM/YYYY" => "%d/%m/%Y",
        "MMM DD, YYYY" => "%b %-d, %Y",
        _ => "%B %-d, %Y",
    }
}

fn format_date(value: &Value, args: &HashMap<String, Value>) -> Result<Value> {
    let raw = match value {
        Value::Null => return Ok(Value::String(String::new())),
        Value::String(s) if s.is_empty() => return Ok(Value::String(String::new())),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    let date = parse_date(&raw)
        .ok_or_else(|| tera::Error::msg(format!("format_date: not a date: {}", raw)))?;
    let pattern = args
        .get("format")
        .and_then(Value::as_str)
        .map(date_pattern)
        .unwrap_or_else(|| date_pattern(""));

    Ok(Value::String(date.format(pattern).to_string()))
}

fn limit(value: &Value, args: &HashMap<String, Value>) -> Result<Value> {
    let Some(items) = value.as_array() else {
        return Ok(Value::Array(Vec::new()));
    };
    let n = args
        .get("n")
        .and_then(Value::as_u64)
        .ok_or_else(|| tera::Error::msg("limit: expected a non-negative `n` argument"))?;

    Ok(Value::Array(
        items.iter().take(n as usize).cloned().collect(),
    ))
}

fn sort_by(value: &Value, args: &HashMap<String, Value>) -> Result<Value> {
    let Some(items) = value.as_array() else {
        return Ok(Value::Array(Vec::new()));
    };
    let field = args
        .get("field")
        .and_then(Value::as_str)
        .ok_or_else(|| tera::Error::msg("sort_by: expected a `field` argument"))?;
    let descending = args
        .get("direction")
        .and_then(Value::as_str)
        .is_some_and(|d| d.eq_ignore_ascii_case("desc"));

    let mut sorted = items.clone();
    sorted.sort_by(|a, b| {
        let ordering = compare(lookup(a, field), lookup(b, field));
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });

    Ok(Value::Array(sorted))
}

/// Follow a dotted path (`metadata.date`, `tags.0`) into a value.
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Missing and null sort first; mixed types order by kind.
fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => x.len().cmp(&y.len()),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn eq(value: Option<&Value>, args: &[Value]) -> Result<bool> {
    let other = args
        .first()
        .ok_or_else(|| tera::Error::msg("eq: expected one argument"))?;
    Ok(value.unwrap_or(&Value::Null) == other)
}

fn ne(value: Option<&Value>, args: &[Value]) -> Result<bool> {
    eq(value, args).map(|equal| !equal)
}

fn now(args: &HashMap<String, Value>) -> Result<Value> {
    let now = Utc::now();
    let formatted = match args.get("format").and_then(Value::as_str) {
        Some(format) => now.format(format).to_string(),
        None => now.to_rfc3339(),
    };
    Ok(Value::String(formatted))
}

fn debug_value(args: &HashMap<String, Value>) -> Result<Value> {
    let value = args.get("value").unwrap_or(&Value::Null);
    debug!("template debug: {:?}", value);
    Ok(Value::String(String::new()))
}

/// Escape text, then turn its line breaks into `<br>`.
struct BreakLines;

impl Filter for BreakLines {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> Result<Value> {
        let text = match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let escaped = tera::escape_html(&text);
        let broken = escaped
            .replace("\r\n", "<br>")
            .replace(['\n', '\r'], "<br>");
        Ok(Value::String(broken))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tera::Context;

    fn render(template: &str, context: &Context) -> String {
        let mut tera = Tera::default();
        register_builtins(&mut tera);
        tera.add_raw_template("t", template).unwrap();
        tera.render("t", context).unwrap()
    }

    fn args(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_format_date_patterns() {
        let date = json!("2024-03-05T10:00:00Z");
        let fmt = |f: &str| format_date(&date, &args(&[("format", json!(f))])).unwrap();

        assert_eq!(fmt("YYYY-MM-DD"), json!("2024-03-05"));
        assert_eq!(fmt("DD/MM/YYYY"), json!("05/03/2024"));
        assert_eq!(fmt("MMM DD, YYYY"), json!("Mar 5, 2024"));
        assert_eq!(fmt("MMMM DD, YYYY"), json!("March 5, 2024"));
        assert_eq!(fmt("nonsense"), json!("March 5, 2024"));
        assert_eq!(
            format_date(&date, &HashMap::new()).unwrap(),
            json!("March 5, 2024")
        );
    }

    #[test]
    fn test_format_date_empty() {
        assert_eq!(format_date(&Value::Null, &HashMap::new()).unwrap(), json!(""));
        assert!(format_date(&json!("not a date"), &HashMap::new()).is_err());
    }

    #[test]
    fn test_limit() {
        let items = json!([1, 2, 3, 4]);
        assert_eq!(limit(&items, &args(&[("n", json!(2))])).unwrap(), json!([1, 2]));
        assert_eq!(limit(&items, &args(&[("n", json!(10))])).unwrap(), items);
        assert_eq!(limit(&json!("x"), &args(&[("n", json!(1))])).unwrap(), json!([]));
    }

    #[test]
    fn test_sort_by_is_stable_both_ways() {
        let items = json!([
            {"id": "a", "meta": {"rank": 2}},
            {"id": "b", "meta": {"rank": 1}},
            {"id": "c", "meta": {"rank": 2}},
        ]);

        let asc = sort_by(&items, &args(&[("field", json!("meta.rank"))])).unwrap();
        let ids: Vec<_> = asc.as_array().unwrap().iter().map(|v| v["id"].clone()).collect();
        assert_eq!(ids, vec![json!("b"), json!("a"), json!("c")]);

        let desc = sort_by(
            &items,
            &args(&[("field", json!("meta.rank")), ("direction", json!("DESC"))]),
        )
        .unwrap();
        let ids: Vec<_> = desc.as_array().unwrap().iter().map(|v| v["id"].clone()).collect();
        assert_eq!(ids, vec![json!("a"), json!("c"), json!("b")]);
    }

    #[test]
    fn test_sort_by_dates() {
        let items = json!([
            {"d": "2024-02-01T00:00:00Z"},
            {"d": "2023-12-31T00:00:00Z"},
        ]);
        let sorted = sort_by(&items, &args(&[("field", json!("d"))])).unwrap();
        assert_eq!(sorted[0]["d"], json!("2023-12-31T00:00:00Z"));
    }

    #[test]
    fn test_eq_and_ne_branching() {
        let mut context = Context::new();
        context.insert("kind", "post");
        assert_eq!(
            render(r#"{% if kind is eq("post") %}yes{% else %}no{% endif %}"#, &context),
            "yes"
        );
        assert_eq!(
            render(r#"{% if kind is ne("post") %}yes{% else %}no{% endif %}"#, &context),
            "no"
        );
    }

    #[test]
    fn test_breaklines_escapes_first() {
        let mut context = Context::new();
        context.insert("text", "a <b>\nc\r\nd");
        assert_eq!(
            render("{{ text | breaklines }}", &context),
            "a &lt;b&gt;<br>c<br>d"
        );
    }

    #[test]
    fn test_debug_renders_nothing() {
        let mut context = Context::new();
        context.insert("page", &json!({"title": "Hello"}));
        assert_eq!(render("[{{ debug(value=page) }}][{{ debug() }}]", &context), "[][]");
    }

    #[test]
    fn test_now_is_a_timestamp() {
        let value = now(&HashMap::new()).unwrap();
        assert!(parse_date(value.as_str().unwrap()).is_some());
    }
}
