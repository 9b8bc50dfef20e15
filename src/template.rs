//! Template renderer – JSON text + template file → rendered text.
//!
//! Templates use Tera syntax and see the decoded JSON under `data`:
//!
//! ```text
//! <h1>{{ data.root.title }}</h1>
//! {% for line in data.root.line %}<li>{{ line | strip }}</li>{% endfor %}
//! ```
//!
//! Every helper of the function table is available in two forms:
//!
//! - as a function, `name(a=…, b=…)`: positional arguments are the keyword
//!   arguments ordered by keyword name;
//! - as a filter, `value | name(a=…)`: the piped value comes first, then the
//!   keyword arguments ordered by keyword name.
//!
//! Keyword names compare by their non-numeric stem and then by the value of a
//! trailing number, so `x2` sorts before `x10`.
//!
//! Autoescaping follows Tera's rules, i.e. it is on for templates named
//! `*.html`, `*.htm` and `*.xml`.
//!
//! Helpers are registered over Tera's built-ins of the same name. The `slice`
//! filter and the `now()` function therefore behave as the helpers do:
//! `arr | slice(start=1)` yields `[arr, 1]` rather than a sub-array, and
//! `now()` returns an RFC 3339 string that takes no `timestamp`/`utc`
//! arguments.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use tera::{Context, Tera};

use crate::error::Result;
use crate::funcs::{FuncMap, TemplateFn};

/// Render `template_path` against `json_data` using only the built-in helpers.
pub fn render_template(template_path: impl AsRef<Path>, json_data: &str) -> Result<String> {
    render(template_path, json_data, None)
}

/// Render `template_path` against `json_data`.
///
/// `extra` helpers are laid over the built-ins; an entry with a built-in's
/// name replaces it.
pub fn render(
    template_path: impl AsRef<Path>,
    json_data: &str,
    extra: Option<&FuncMap>,
) -> Result<String> {
    let path = template_path.as_ref();
    let name = template_name(path);

    let mut funcs = FuncMap::with_builtins();
    if let Some(extra) = extra {
        funcs.extend(extra);
    }

    let mut tera = Tera::default();
    register_funcs(&mut tera, &funcs);
    tera.add_template_file(path, Some(&name))?;

    let context = Context::from_value(wrap_data(json_data)?)?;
    let rendered = tera.render(&name, &context)?;
    log::debug!(
        "rendered template '{}' ({} bytes)",
        path.display(),
        rendered.len()
    );
    Ok(rendered)
}

/// Decode `json_data` and root it under the `data` key.
pub fn wrap_data(json_data: &str) -> Result<Value> {
    let payload: Value = serde_json::from_str(json_data)?;
    let mut root = Map::new();
    root.insert("data".to_string(), payload);
    Ok(Value::Object(root))
}

fn template_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "template".to_string())
}

fn register_funcs(tera: &mut Tera, funcs: &FuncMap) {
    for (name, f) in funcs.iter() {
        tera.register_function(name, AsFunction(Arc::clone(f)));
        tera.register_filter(name, AsFilter(Arc::clone(f)));
    }
}

// ---------------------------------------------------------------------------
// Tera adapters
// ---------------------------------------------------------------------------

struct AsFunction(Arc<dyn TemplateFn>);

impl tera::Function for AsFunction {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        self.0
            .call(&positional(None, args))
            .map_err(|e| tera::Error::msg(e.to_string()))
    }
}

struct AsFilter(Arc<dyn TemplateFn>);

impl tera::Filter for AsFilter {
    fn filter(&self, value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        self.0
            .call(&positional(Some(value), args))
            .map_err(|e| tera::Error::msg(e.to_string()))
    }
}

fn positional(piped: Option<&Value>, args: &HashMap<String, Value>) -> Vec<Value> {
    let mut named: Vec<(&String, &Value)> = args.iter().collect();
    named.sort_by(|a, b| keyword_order(a.0, b.0));
    piped
        .into_iter()
        .chain(named.into_iter().map(|(_, v)| v))
        .cloned()
        .collect()
}

fn keyword_order(a: &str, b: &str) -> Ordering {
    fn split(name: &str) -> (&str, Option<u64>) {
        let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
        (stem, name[stem.len()..].parse().ok())
    }
    split(a).cmp(&split(b)).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForgeError;
    use crate::funcs::FuncResult;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn template(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn substitutes_fields() {
        let dir = TempDir::new().unwrap();
        let tpl = template(&dir, "t.html", "<p>{{ data.Field }}</p>");
        assert_eq!(render_template(&tpl, r#"{"Field":"X"}"#).unwrap(), "<p>X</p>");
    }

    #[test]
    fn loops_and_conditionals() {
        let dir = TempDir::new().unwrap();
        let tpl = template(
            &dir,
            "t.txt",
            "{% for i in data.items %}{% if i.on %}{{ i.name }};{% endif %}{% endfor %}",
        );
        let data = r#"{"items":[{"name":"a","on":true},{"name":"b","on":false},{"name":"c","on":true}]}"#;
        assert_eq!(render_template(&tpl, data).unwrap(), "a;c;");
    }

    #[test]
    fn html_templates_are_escaped() {
        let dir = TempDir::new().unwrap();
        let tpl = template(&dir, "t.html", "{{ data.name }}");
        assert_eq!(
            render_template(&tpl, r#"{"name":"<b>"}"#).unwrap(),
            "&lt;b&gt;"
        );
    }

    #[test]
    fn builtins_as_filters_and_functions() {
        let dir = TempDir::new().unwrap();
        let tpl = template(
            &dir,
            "t.txt",
            "{{ data.count | inc }}|{{ inc(n=data.neg) }}|{{ data.body | strip }}|\
             {% for v in slice(a=1, b=\"x\", c=true) %}{{ v }};{% endfor %}",
        );
        let data = r#"{"count":"1","neg":-5,"body":"<b>Hi&nbsp;there</b>"}"#;
        assert_eq!(render_template(&tpl, data).unwrap(), "2|-4|Hithere|1;x;true;");
    }

    #[test]
    fn marshal_pretty_prints() {
        let dir = TempDir::new().unwrap();
        let tpl = template(&dir, "t.txt", "{{ data | marshal }}");
        assert_eq!(
            render_template(&tpl, r#"{"a":1}"#).unwrap(),
            "{\n   \"a\": 1\n}"
        );
    }

    #[test]
    fn marshal_without_arguments_is_an_error() {
        let dir = TempDir::new().unwrap();
        let tpl = template(&dir, "t.txt", "{{ marshal() }}");
        let err = render_template(&tpl, "{}").unwrap_err();
        assert!(matches!(err, ForgeError::Template(_)));
    }

    #[test]
    fn now_renders_a_timestamp() {
        let dir = TempDir::new().unwrap();
        let tpl = template(&dir, "t.txt", "{{ now() | date(format=\"%Y\") }}");
        let year = chrono::Local::now().format("%Y").to_string();
        assert_eq!(render_template(&tpl, "{}").unwrap(), year);
    }

    #[test]
    fn caller_functions_extend_and_override() {
        let dir = TempDir::new().unwrap();
        let tpl = template(&dir, "t.txt", "{{ data.n | inc }} {{ data.s | shout }}");
        let extra = FuncMap::new()
            .with("inc", |_: &[Value]| -> FuncResult { Ok(json!("overridden")) })
            .with("shout", |args: &[Value]| -> FuncResult {
                Ok(json!(args[0].as_str().unwrap_or_default().to_uppercase()))
            });
        let out = render(&tpl, r#"{"n":1,"s":"hey"}"#, Some(&extra)).unwrap();
        assert_eq!(out, "overridden HEY");
    }

    #[test]
    fn undefined_field_is_an_error() {
        let dir = TempDir::new().unwrap();
        let tpl = template(&dir, "t.html", "{{ data.missing.deeper }}");
        let err = render_template(&tpl, r#"{"present":1}"#).unwrap_err();
        assert!(matches!(err, ForgeError::Template(_)));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let tpl = template(&dir, "t.html", "{{ data }}");
        let err = render_template(&tpl, "{oops").unwrap_err();
        assert!(matches!(err, ForgeError::Json(_)));
    }

    #[test]
    fn missing_template_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = render_template(dir.path().join("nope.html"), "{}").unwrap_err();
        assert!(matches!(err, ForgeError::Template(_)));
    }

    #[test]
    fn template_syntax_error_is_an_error() {
        let dir = TempDir::new().unwrap();
        let tpl = template(&dir, "t.html", "{{ data.x ");
        let err = render_template(&tpl, "{}").unwrap_err();
        assert!(matches!(err, ForgeError::Template(_)));
    }

    #[test]
    fn payload_cannot_escape_the_data_key() {
        let dir = TempDir::new().unwrap();
        let tpl = template(&dir, "t.html", "{{ data }}");
        assert!(render_template(&tpl, r#"1, "other": 2"#).is_err());
    }

    #[test]
    fn positional_orders_by_keyword() {
        let mut args = HashMap::new();
        args.insert("b".to_string(), json!(2));
        args.insert("a".to_string(), json!(1));
        assert_eq!(positional(Some(&json!(0)), &args), vec![json!(0), json!(1), json!(2)]);
    }

    #[test]
    fn numbered_keywords_sort_by_number() {
        let mut args = HashMap::new();
        for (name, v) in [("x10", 10), ("x2", 2), ("x1", 1), ("x", 0), ("y1", 99)] {
            args.insert(name.to_string(), json!(v));
        }
        assert_eq!(
            positional(None, &args),
            vec![json!(0), json!(1), json!(2), json!(10), json!(99)]
        );
    }

    #[test]
    fn helpers_replace_tera_slice_and_now() {
        let dir = TempDir::new().unwrap();
        let tpl = template(
            &dir,
            "t.txt",
            "{{ data.arr | slice(start=1) | length }}|{{ now() | truncate(length=4, end=\"\") }}",
        );
        let year = chrono::Local::now().format("%Y").to_string();
        assert_eq!(
            render_template(&tpl, r#"{"arr":[1,2,3]}"#).unwrap(),
            format!("2|{year}")
        );
    }
}
