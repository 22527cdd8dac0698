// 🔤 Literals - dict/list values typed on the command line, and the
// Python-style rendering used by `show` and `all`.

use serde_json::{Map, Value};

// ============================================================================
// PARSING
// ============================================================================

/// Parse a `{...}` literal into a JSON object.
///
/// Accepts plain JSON plus single-quoted strings and `True`/`False`/`None`.
pub fn parse_dict(src: &str) -> Result<Map<String, Value>, serde_json::Error> {
    serde_json::from_str(&normalize(src))
}

/// Parse a `[...]` literal into a list of values
pub fn parse_list(src: &str) -> Result<Vec<Value>, serde_json::Error> {
    serde_json::from_str(&normalize(src))
}

/// Rewrite Python-style literal syntax into JSON text
fn normalize(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                out.push('"');
                while let Some(c) = chars.next() {
                    out.push(c);
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                out.push(escaped);
                            }
                        }
                        '"' => break,
                        _ => {}
                    }
                }
            }
            '\'' => {
                out.push('"');
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some('\'') => out.push('\''),
                            Some(escaped) => {
                                out.push('\\');
                                out.push(escaped);
                            }
                            None => out.push_str("\\\\"),
                        },
                        '"' => out.push_str("\\\""),
                        '\'' => break,
                        _ => out.push(c),
                    }
                }
                out.push('"');
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match word.as_str() {
                    "True" => out.push_str("true"),
                    "False" => out.push_str("false"),
                    "None" => out.push_str("null"),
                    _ => out.push_str(&word),
                }
            }
            _ => out.push(c),
        }
    }

    out
}

// ============================================================================
// RENDERING
// ============================================================================

/// Render a value the way `show` prints attributes: `'text'`, `4`, `0.0`,
/// `True`, `None`, `['a', 'b']`, `{'k': 1}`
pub fn render(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(render).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", quote(k), render(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}
