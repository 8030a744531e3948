//! `{placeholder}` substitution for local version labels and generated files.
//!
//! Placeholders are `{name}` or `{name:spec}`. Time values accept a
//! strftime `spec`; other values take none. `{{` and `}}` produce literal
//! braces.

use crate::error::{Result, ScmverError};
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDateTime;

/// Value bound to a placeholder name
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Time(NaiveDateTime),
}

impl Value {
    fn format(&self, name: &str, spec: Option<&str>) -> Result<String> {
        match (self, spec) {
            (Value::Text(text), None) => Ok(text.clone()),
            (Value::Text(_), Some(spec)) => Err(ScmverError::template(format!(
                "format spec '{}' is not supported for '{}'",
                spec, name
            ))),
            (Value::Time(time), None) => Ok(time.format("%Y-%m-%d %H:%M:%S%.6f").to_string()),
            (Value::Time(time), Some(spec)) => {
                let items: Vec<Item<'_>> = StrftimeItems::new(spec).collect();
                if items.iter().any(|item| matches!(item, Item::Error)) {
                    return Err(ScmverError::template(format!(
                        "invalid time format '{}' for '{}'",
                        spec, name
                    )));
                }
                Ok(time.format_with_items(items.into_iter()).to_string())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Option<&str>> for Value {
    fn from(s: Option<&str>) -> Self {
        Value::Text(s.unwrap_or_default().to_string())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Text(n.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Text(if b { "True" } else { "False" }.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(t: NaiveDateTime) -> Self {
        Value::Time(t)
    }
}

/// Renders `template`, resolving placeholder names against `vars`.
///
/// Unknown placeholders and unbalanced braces are template errors.
pub fn render(template: &str, vars: &[(&str, Value)]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                out.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                out.push('}');
            }
            '}' => {
                return Err(ScmverError::template(format!(
                    "single '}}' encountered at offset {}",
                    i
                )))
            }
            '{' => {
                let start = i + 1;
                let end = loop {
                    match chars.next() {
                        Some((j, '}')) => break j,
                        Some((_, '{')) | None => {
                            return Err(ScmverError::template(format!(
                                "unterminated placeholder at offset {}",
                                i
                            )))
                        }
                        Some(_) => {}
                    }
                };
                let field = &template[start..end];
                let (name, spec) = match field.split_once(':') {
                    Some((name, spec)) => (name, Some(spec)),
                    None => (field, None),
                };
                let value = vars
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| value)
                    .ok_or_else(|| {
                        ScmverError::template(format!("unknown placeholder '{{{}}}'", name))
                    })?;
                out.push_str(&value.format(name, spec)?);
            }
            c => out.push(c),
        }
    }

    Ok(out)
}

/// Decodes the `\n`, `\r\n` and `\t` escapes accepted on the command line.
///
/// `\r\n` collapses to a plain newline.
pub fn decode_escapes(text: &str) -> String {
    text.replace("\\r\\n", "\n")
        .replace("\\n", "\n")
        .replace("\\t", "\t")
}
