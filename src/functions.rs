//! Tag function registry and built-ins
//!
//! A tag function receives the resolved tag value plus the literal
//! arguments written in the template, and returns the transformed value.
//! Each engine owns its registry; registration is last-write-wins, so
//! built-ins can be overridden per engine without affecting any other.

use crate::safe::{SafeContext, SafeString};
use crate::value::Value;
use miette::Result;
use std::collections::HashMap;
use std::fmt;

pub type TagFn = Box<dyn Fn(Value, &[Value]) -> Result<Value> + Send + Sync>;

pub struct FunctionRegistry {
    entries: HashMap<String, TagFn>,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionRegistry({} functions)", self.entries.len())
    }
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("html", |value, _| Ok(html(value)));
        registry.register("raw", |value, _| Ok(raw(value)));
        registry.register("url", |value, _| Ok(url(value)));
        registry.register("items", |value, _| Ok(items(value)));
        registry.register("values", |value, _| Ok(values(value)));
        registry.register("sorted", |value, _| Ok(sorted(value)));
        registry.register("len", |value, _| Ok(length(value)));
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Box::new(f));
    }

    pub fn get(&self, name: &str) -> Option<&TagFn> {
        self.entries.get(name)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Escape into the html context; values already html-safe pass through.
fn html(value: Value) -> Value {
    match value {
        Value::Safe(s) if s.context() == SafeContext::Html => Value::Safe(s),
        Value::Safe(s) => Value::Safe(SafeString::escape(SafeContext::Html, s.as_str())),
        other => Value::Safe(SafeString::escape(SafeContext::Html, &other.to_text())),
    }
}

/// Mark the value's text as html-safe without escaping.
fn raw(value: Value) -> Value {
    match value {
        Value::Safe(s) if s.context() == SafeContext::Html => Value::Safe(s),
        other => Value::Safe(SafeString::from_safe(SafeContext::Html, other.to_text())),
    }
}

/// Form-urlencode, producing a url-context safe value.
fn url(value: Value) -> Value {
    Value::Safe(SafeString::escape(SafeContext::Url, &value.to_text()))
}

/// Mapping → list of `[key, value]` pairs. Other values pass through.
fn items(value: Value) -> Value {
    match value {
        Value::Map(map) => Value::List(
            map.into_iter()
                .map(|(k, v)| Value::List(vec![Value::Str(k), v]))
                .collect(),
        ),
        other => other,
    }
}

/// Mapping → list of values. Other values pass through.
fn values(value: Value) -> Value {
    match value {
        Value::Map(map) => Value::List(map.into_values().collect()),
        other => other,
    }
}

/// Sort a list; incomparable elements keep their relative order.
fn sorted(value: Value) -> Value {
    match value {
        Value::List(mut list) => {
            list.sort_by(|a, b| a.compare(b).unwrap_or(std::cmp::Ordering::Equal));
            Value::List(list)
        }
        other => other,
    }
}

fn length(value: Value) -> Value {
    Value::Int(value.length().unwrap_or(0) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escapes_once() {
        let once = html(Value::from("\"ham\" & eggs"));
        assert_eq!(once.to_text(), "&quot;ham&quot; &amp; eggs");
        // already safe: applying again must not double escape
        let twice = html(once);
        assert_eq!(twice.to_text(), "&quot;ham&quot; &amp; eggs");
    }

    #[test]
    fn test_raw_passes_markup_through() {
        let value = raw(Value::from("<b>\"nothing\"</b>"));
        let Value::Safe(s) = value else {
            panic!("raw must produce a safe value")
        };
        assert_eq!(s.context(), SafeContext::Html);
        assert_eq!(s, "<b>\"nothing\"</b>");
    }

    #[test]
    fn test_url_encodes() {
        let value = url(Value::from("\"ham & eggs\""));
        let Value::Safe(s) = value else {
            panic!("url must produce a safe value")
        };
        assert_eq!(s.context(), SafeContext::Url);
        assert_eq!(s, "%22ham+%26+eggs%22");
    }

    #[test]
    fn test_items_and_sorted() {
        let mut map = HashMap::new();
        map.insert("spam", 1i64);
        map.insert("eggs", 2i64);
        let listed = sorted(items(Value::from(map)));
        assert_eq!(listed.to_text(), "[['eggs', 2], ['spam', 1]]");
    }

    #[test]
    fn test_values_and_len() {
        let mut map = HashMap::new();
        map.insert("a", 1i64);
        map.insert("b", 2i64);
        let vals = sorted(values(Value::from(map)));
        assert_eq!(vals.to_text(), "[1, 2]");
        assert_eq!(length(Value::from("hello")), Value::Int(5));
        assert_eq!(length(Value::Int(7)), Value::Int(0));
    }

    #[test]
    fn test_registration_is_last_write_wins() {
        let mut registry = FunctionRegistry::with_builtins();
        registry.register("len", |_, _| Ok(Value::from("overridden")));
        let f = registry.get("len").unwrap();
        assert_eq!(f(Value::from("abc"), &[]).unwrap(), Value::from("overridden"));
    }

    #[test]
    fn test_unregistered_name_is_absent() {
        let registry = FunctionRegistry::with_builtins();
        assert!(registry.get("zoink").is_none());
    }
}
