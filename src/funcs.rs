//! Template helper functions.
//!
//! A [`FuncMap`] maps a name to a [`TemplateFn`]. Every render starts from
//! [`FuncMap::with_builtins`] and then overlays the caller's map, so a caller
//! entry with a built-in's name replaces the built-in.
//!
//! Built-ins:
//!
//! | name      | result                                                   |
//! |-----------|----------------------------------------------------------|
//! | `now`     | current local time, RFC 3339                             |
//! | `inc`     | integer argument plus one                                |
//! | `strip`   | text with HTML tags removed, then `&nbsp;` removed       |
//! | `marshal` | first argument as JSON, indented by three spaces         |
//! | `slice`   | all arguments as an array                                |

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use thiserror::Error;

use crate::strip::strip_tags;

/// Error raised by a template helper. Surfaces as a template execution error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct FuncError(pub String);

impl FuncError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

pub type FuncResult = std::result::Result<Value, FuncError>;

/// A callable exposed to templates. Receives its positional arguments.
pub trait TemplateFn: Send + Sync {
    fn call(&self, args: &[Value]) -> FuncResult;
}

impl<F> TemplateFn for F
where
    F: Fn(&[Value]) -> FuncResult + Send + Sync,
{
    fn call(&self, args: &[Value]) -> FuncResult {
        self(args)
    }
}

/// Name → helper table. Inserting an existing name replaces the old entry.
#[derive(Clone, Default)]
pub struct FuncMap {
    entries: BTreeMap<String, Arc<dyn TemplateFn>>,
}

impl FuncMap {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding the five built-in helpers.
    pub fn with_builtins() -> Self {
        let mut map = Self::new();
        map.insert("now", now);
        map.insert("inc", inc);
        map.insert("strip", strip);
        map.insert("marshal", marshal);
        map.insert("slice", slice);
        map
    }

    /// Add or replace a helper.
    pub fn insert(&mut self, name: impl Into<String>, f: impl TemplateFn + 'static) -> &mut Self {
        self.entries.insert(name.into(), Arc::new(f));
        self
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, f: impl TemplateFn + 'static) -> Self {
        self.insert(name, f);
        self
    }

    /// Overlay every entry of `other`; its entries win on name collision.
    pub fn extend(&mut self, other: &FuncMap) {
        for (name, f) in &other.entries {
            self.entries.insert(name.clone(), Arc::clone(f));
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TemplateFn>> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn TemplateFn>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for FuncMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

// ---------------------------------------------------------------------------
// Built-ins
// ---------------------------------------------------------------------------

fn now(_args: &[Value]) -> FuncResult {
    Ok(Value::String(chrono::Local::now().to_rfc3339()))
}

fn inc(args: &[Value]) -> FuncResult {
    let n = match args.first() {
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| FuncError::new(format!("inc: {n} is not an integer")))?,
        // XML-derived values arrive as strings.
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| FuncError::new(format!("inc: {s:?} is not an integer")))?,
        Some(other) => return Err(FuncError::new(format!("inc: {other} is not an integer"))),
        None => return Err(FuncError::new("inc: missing argument")),
    };
    n.checked_add(1)
        .map(Value::from)
        .ok_or_else(|| FuncError::new("inc: integer overflow"))
}

fn strip(args: &[Value]) -> FuncResult {
    match args.first() {
        Some(Value::String(html)) => Ok(Value::String(
            strip_tags(html).replace("&nbsp;", ""),
        )),
        Some(other) => Err(FuncError::new(format!("strip: {other} is not a string"))),
        None => Err(FuncError::new("strip: missing argument")),
    }
}

fn marshal(args: &[Value]) -> FuncResult {
    let first = args
        .first()
        .ok_or_else(|| FuncError::new("marshal: missing argument"))?;
    Ok(Value::String(to_indented_json(first).unwrap_or_default()))
}

fn slice(args: &[Value]) -> FuncResult {
    Ok(Value::Array(args.to_vec()))
}

/// JSON text indented by three spaces per level.
pub fn to_indented_json<T: Serialize + ?Sized>(value: &T) -> Option<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"   ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser).ok()?;
    String::from_utf8(buf).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str, args: &[Value]) -> FuncResult {
        FuncMap::with_builtins().get(name).unwrap().call(args)
    }

    #[test]
    fn builtins_are_registered() {
        let map = FuncMap::with_builtins();
        let names: Vec<&str> = map.names().collect();
        assert_eq!(names, vec!["inc", "marshal", "now", "slice", "strip"]);
    }

    #[test]
    fn inc_adds_one() {
        assert_eq!(call("inc", &[json!(41)]).unwrap(), json!(42));
        assert_eq!(call("inc", &[json!(-1)]).unwrap(), json!(0));
        assert_eq!(call("inc", &[json!(-10)]).unwrap(), json!(-9));
        assert_eq!(call("inc", &[json!(" 7 ")]).unwrap(), json!(8));
    }

    #[test]
    fn inc_rejects_non_integers() {
        assert!(call("inc", &[json!(1.5)]).is_err());
        assert!(call("inc", &[json!("abc")]).is_err());
        assert!(call("inc", &[json!(null)]).is_err());
        assert!(call("inc", &[]).is_err());
        assert!(call("inc", &[json!(i64::MAX)]).is_err());
    }

    #[test]
    fn strip_removes_tags_then_nbsp() {
        assert_eq!(
            call("strip", &[json!("<b>Hi&nbsp;there</b>")]).unwrap(),
            json!("Hithere")
        );
        assert_eq!(
            call("strip", &[json!("<p>a <i>b</i></p>")]).unwrap(),
            json!("a b")
        );
        assert!(call("strip", &[json!(3)]).is_err());
    }

    #[test]
    fn marshal_indents_by_three_spaces() {
        assert_eq!(
            call("marshal", &[json!({"a": 1})]).unwrap(),
            json!("{\n   \"a\": 1\n}")
        );
        assert_eq!(
            call("marshal", &[json!({"a": [1]}), json!("ignored")]).unwrap(),
            json!("{\n   \"a\": [\n      1\n   ]\n}")
        );
    }

    #[test]
    fn marshal_without_arguments_fails() {
        assert_eq!(
            call("marshal", &[]).unwrap_err(),
            FuncError::new("marshal: missing argument")
        );
    }

    #[test]
    fn slice_collects_arguments() {
        assert_eq!(
            call("slice", &[json!(1), json!("two"), json!(null)]).unwrap(),
            json!([1, "two", null])
        );
        assert_eq!(call("slice", &[]).unwrap(), json!([]));
    }

    #[test]
    fn now_is_rfc3339() {
        let value = call("now", &[]).unwrap();
        let text = value.as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(text).is_ok(), "{text}");
    }

    #[test]
    fn later_inserts_win() {
        let mut map = FuncMap::with_builtins();
        let overrides =
            FuncMap::new().with("inc", |_: &[Value]| -> FuncResult { Ok(json!("custom")) });
        map.extend(&overrides);
        assert_eq!(map.len(), 5);
        assert!(map.contains("inc"));
        assert!(!map.contains("shout"));
        assert_eq!(map.get("inc").unwrap().call(&[json!(1)]).unwrap(), json!("custom"));
    }
}
