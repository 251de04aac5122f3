//! Compiled templates and the renderer
//!
//! A [`Template`] pairs a parsed body with its source text. Rendering
//! walks the node tree against a [`Scope`] and produces an html-context
//! [`SafeString`]: literal text is safe by construction, resolved tag
//! values are escaped on output unless a function chain already made them
//! safe. Rendering is all-or-nothing; no partial output escapes on error.

use crate::ast::{InlineNode, InlineRef, LoopNode, Node, Span};
use crate::engine::Engine;
use crate::error::{TemplateNameError, TemplateSource, TemplateValueError};
use crate::eval::{Evaluator, Resolved, Scope};
use crate::functions::FunctionRegistry;
use crate::safe::{SafeContext, SafeString, html_escape};
use crate::value::Value;
use miette::Result;
use std::sync::Arc;

/// A compiled template. Equality is structural: two templates compiled
/// from identical text are equal regardless of name or origin.
#[derive(Debug, Clone)]
pub struct Template {
    body: Vec<Node>,
    source: TemplateSource,
}

impl PartialEq for Template {
    fn eq(&self, other: &Self) -> bool {
        self.body == other.body
    }
}

impl Template {
    /// Compile an anonymous template
    pub fn new(source: impl Into<String>) -> Result<Self> {
        Self::parse("<string>", source)
    }

    /// Compile a named template
    pub fn parse(name: impl Into<String>, source: impl Into<String>) -> Result<Self> {
        let ts = TemplateSource::new(name, source);
        let body = crate::parser::parse(&ts)?;
        Ok(Self { body, source: ts })
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn source_text(&self) -> &str {
        self.source.text()
    }

    /// Render with the built-in functions only. Without an engine behind
    /// it, `{{ inline name }}` cannot resolve stored templates.
    pub fn render(&self, scope: &Scope) -> Result<SafeString> {
        let functions = FunctionRegistry::with_builtins();
        self.render_impl(scope, &functions, None, false)
    }

    /// Render with ad-hoc replacements
    pub fn render_with<I, K, V>(&self, vars: I) -> Result<SafeString>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let scope: Scope = vars.into_iter().collect();
        self.render(&scope)
    }

    pub(crate) fn render_impl(
        &self,
        scope: &Scope,
        functions: &FunctionRegistry,
        store: Option<&Engine>,
        no_parse: bool,
    ) -> Result<SafeString> {
        let mut renderer = Renderer {
            scope: scope.clone(),
            functions,
            store,
            ts: &self.source,
            no_parse,
            output: String::new(),
        };
        renderer.render_nodes(&self.body)?;
        Ok(SafeString::from_safe(SafeContext::Html, renderer.output))
    }
}

struct Renderer<'a> {
    scope: Scope,
    functions: &'a FunctionRegistry,
    store: Option<&'a Engine>,
    ts: &'a TemplateSource,
    no_parse: bool,
    /// Accumulated output; every fragment pushed here is already html-safe
    output: String,
}

impl Renderer<'_> {
    fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(&self.scope, self.functions, self.ts, self.no_parse)
    }

    fn value_error(&self, message: String, span: Span) -> TemplateValueError {
        TemplateValueError {
            message,
            span,
            src: self.ts.named_source(),
        }
    }

    fn render_nodes(&mut self, nodes: &[Node]) -> Result<()> {
        for node in nodes {
            self.render_node(node)?;
        }
        Ok(())
    }

    fn render_node(&mut self, node: &Node) -> Result<()> {
        match node {
            Node::Literal(lit) => self.output.push_str(&lit.text),
            Node::Tag(tag) => {
                let resolved = self.evaluator().resolve_tag(tag)?;
                match resolved {
                    Resolved::Verbatim => self.output.push_str(&tag.raw),
                    Resolved::Value(value) => self.emit_value(value)?,
                }
            }
            Node::Cond(cond) => {
                for branch in &cond.branches {
                    let hit = self.evaluator().test(&branch.test)?;
                    if hit {
                        return self.render_nodes(&branch.body);
                    }
                }
                if let Some(body) = &cond.else_body {
                    return self.render_nodes(body);
                }
            }
            Node::Loop(l) => self.render_loop(l)?,
            Node::Inline(inline) => self.render_inline(inline)?,
        }
        Ok(())
    }

    /// Emit a resolved value: safe values for our context go out verbatim,
    /// foreign-context safe values and plain values are escaped.
    fn emit_value(&mut self, value: Value) -> Result<()> {
        match value {
            Value::Template(template) => {
                let out =
                    template.render_impl(&self.scope, self.functions, self.store, self.no_parse)?;
                self.output.push_str(out.as_str());
            }
            Value::Safe(s) if s.context() == SafeContext::Html => {
                self.output.push_str(s.as_str());
            }
            Value::Safe(s) => self.output.push_str(&html_escape(s.as_str())),
            other => {
                let text = other.to_text();
                if self.no_parse {
                    self.output.push_str(&text);
                } else {
                    self.output.push_str(&html_escape(&text));
                }
            }
        }
        Ok(())
    }

    fn render_loop(&mut self, l: &LoopNode) -> Result<()> {
        let Some(source) = self.evaluator().loop_source(&l.source)? else {
            // present head, unresolvable index: zero iterations
            return Ok(());
        };
        let items: Vec<Value> = match source {
            Value::List(items) => items,
            Value::Str(s) => chars(&s),
            Value::Safe(s) => chars(s.as_str()),
            Value::Map(map) => map.into_keys().map(Value::Str).collect(),
            other => {
                return Err(self
                    .value_error(
                        format!("cannot loop over {}", other.type_name()),
                        l.source.span,
                    )
                    .into());
            }
        };
        for item in items {
            self.scope.push_scope();
            let result = self
                .bind_targets(&l.targets, item, l.span)
                .and_then(|()| self.render_nodes(&l.body));
            self.scope.pop_scope();
            result?;
        }
        Ok(())
    }

    fn bind_targets(&mut self, targets: &[String], item: Value, span: Span) -> Result<()> {
        if targets.len() == 1 {
            self.scope.set(&targets[0], item);
            return Ok(());
        }
        let parts: Vec<Value> = match item {
            Value::List(parts) => parts,
            Value::Str(s) => chars(&s),
            Value::Safe(s) => chars(s.as_str()),
            other => {
                return Err(self
                    .value_error(
                        format!(
                            "cannot unpack {} into {} names",
                            other.type_name(),
                            targets.len()
                        ),
                        span,
                    )
                    .into());
            }
        };
        if parts.len() != targets.len() {
            return Err(self
                .value_error(
                    format!(
                        "cannot unpack {} values into {} names",
                        parts.len(),
                        targets.len()
                    ),
                    span,
                )
                .into());
        }
        for (name, part) in targets.iter().zip(parts) {
            self.scope.set(name, part);
        }
        Ok(())
    }

    fn render_inline(&mut self, inline: &InlineNode) -> Result<()> {
        let template = match &inline.target {
            InlineRef::Name(name) => self.stored_template(name, inline.span)?,
            InlineRef::Tag(tag) => {
                let value = self.evaluator().expr_tag(tag)?;
                match value {
                    Value::Template(t) => t,
                    Value::Str(_) | Value::Safe(_) => {
                        let name = value.to_text();
                        self.stored_template(&name, inline.span)?
                    }
                    other => {
                        return Err(self
                            .value_error(
                                format!("cannot inline a {} value", other.type_name()),
                                inline.span,
                            )
                            .into());
                    }
                }
            }
        };
        let out = template.render_impl(&self.scope, self.functions, self.store, self.no_parse)?;
        self.output.push_str(out.as_str());
        Ok(())
    }

    /// Literal inline names read the engine cache directly, loading on
    /// first use but never re-checking file freshness.
    fn stored_template(&self, name: &str, span: Span) -> Result<Arc<Template>> {
        let Some(store) = self.store else {
            return Err(TemplateNameError {
                name: name.to_string(),
                span,
                src: self.ts.named_source(),
            }
            .into());
        };
        store.cached(name)
    }
}

fn chars(s: &str) -> Vec<Value> {
    s.chars().map(|c| Value::Str(c.to_string())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TemplateFunctionError;
    use std::collections::HashMap;

    fn render(source: &str, vars: Vec<(&str, Value)>) -> String {
        Template::new(source)
            .unwrap()
            .render_with(vars)
            .unwrap()
            .into_string()
    }

    #[test]
    fn test_plain_text_renders_to_itself() {
        assert_eq!(render("hello world", vec![]), "hello world");
    }

    #[test]
    fn test_simple_substitution() {
        assert_eq!(
            render("Hello [name]!", vec![("name", "World".into())]),
            "Hello World!"
        );
    }

    #[test]
    fn test_absent_tag_renders_verbatim() {
        assert_eq!(
            render("keep [missing] intact", vec![]),
            "keep [missing] intact"
        );
    }

    #[test]
    fn test_absent_index_renders_verbatim() {
        let mut map = HashMap::new();
        map.insert("present", "x");
        assert_eq!(
            render("[tag:absent]", vec![("tag", Value::from(map))]),
            "[tag:absent]"
        );
    }

    #[test]
    fn test_index_chains() {
        let mut inner = HashMap::new();
        inner.insert("name", Value::from("John"));
        let bundle = Value::List(vec![
            Value::from("zero"),
            Value::Map(inner.into_iter().map(|(k, v)| (k.to_string(), v)).collect()),
        ]);
        assert_eq!(
            render("[bundle:1:name] and [bundle:0]", vec![("bundle", bundle)]),
            "John and zero"
        );
        assert_eq!(render("[word:2]", vec![("word", "abc".into())]), "c");
    }

    #[test]
    fn test_private_index_stops_the_walk() {
        let mut map = HashMap::new();
        map.insert("key", "value");
        assert_eq!(
            render("[tag:_private_|raw]", vec![("tag", Value::from(map))]),
            "{'key': 'value'}"
        );
    }

    #[test]
    fn test_default_output_is_html_escaped() {
        assert_eq!(
            render(
                "[evil]",
                vec![("evil", "<script>alert('x')</script>".into())]
            ),
            "&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_explicit_html_equals_default() {
        let vars = vec![("v", Value::from("a & b"))];
        assert_eq!(render("[v|html]", vars.clone()), render("[v]", vars));
    }

    #[test]
    fn test_raw_skips_escaping() {
        assert_eq!(
            render("[none|raw]", vec![("none", "\"nothing\"".into())]),
            "\"nothing\""
        );
    }

    #[test]
    fn test_url_value_survives_html_output() {
        assert_eq!(
            render("[q|url]", vec![("q", "\"ham & eggs\"".into())]),
            "%22ham+%26+eggs%22"
        );
    }

    #[test]
    fn test_none_renders_empty() {
        assert_eq!(render("a[v]b", vec![("v", Value::None)]), "ab");
    }

    #[test]
    fn test_unknown_function_on_absent_tag_is_verbatim() {
        assert_eq!(
            render("This tag function is missing [num|zoink].", vec![]),
            "This tag function is missing [num|zoink]."
        );
    }

    #[test]
    fn test_unknown_function_on_present_tag_errors() {
        let err = Template::new("[num|zoink]")
            .unwrap()
            .render_with(vec![("num", 1i64)])
            .unwrap_err();
        assert!(err.downcast_ref::<TemplateFunctionError>().is_some());
    }

    #[test]
    fn test_custom_function_chain() {
        let mut functions = FunctionRegistry::with_builtins();
        functions.register("strlimit", |value, args| {
            let limit = args.first().and_then(Value::as_int).unwrap_or(80) as usize;
            let tail = args
                .get(1)
                .and_then(Value::as_str)
                .unwrap_or("...")
                .to_string();
            let text = value.to_text();
            if text.chars().count() > limit {
                let cut: String = text.chars().take(limit).collect();
                Ok(Value::Str(cut + &tail))
            } else {
                Ok(Value::Str(text))
            }
        });
        let template = Template::new("[tag|strlimit(20, \"TOOLONG\")]").unwrap();
        let scope: Scope = [("tag", "x".repeat(120))].into_iter().collect();
        let out = template
            .render_impl(&scope, &functions, None, false)
            .unwrap();
        assert_eq!(out.as_str().len(), 27);
        assert!(out.as_str().ends_with("TOOLONG"));
    }

    #[test]
    fn test_conditional_branches() {
        let template = "{{ if [v] == 5 }}five{{ elif [v] == 6 }}six{{ else }}other{{ endif }}";
        assert_eq!(render(template, vec![("v", 5i64.into())]), "five");
        assert_eq!(render(template, vec![("v", 6i64.into())]), "six");
        assert_eq!(render(template, vec![("v", 12i64.into())]), "other");
    }

    #[test]
    fn test_conditional_without_match_renders_nothing() {
        assert_eq!(
            render(
                "a{{ if [v] == 5 }}five{{ endif }}b",
                vec![("v", 1i64.into())]
            ),
            "ab"
        );
    }

    #[test]
    fn test_presence_blocks() {
        let template = "{{ ifpresent [tag] }}yes{{ else }}no{{ endif }}";
        assert_eq!(render(template, vec![("tag", "x".into())]), "yes");
        assert_eq!(render(template, vec![]), "no");

        let template = "{{ ifnotpresent [tag] }}gone{{ endif }}";
        assert_eq!(render(template, vec![]), "gone");
        assert_eq!(render(template, vec![("tag", "x".into())]), "");
    }

    #[test]
    fn test_loop_repeats_body() {
        assert_eq!(
            render(
                "{{ for v in [values] }}x{{ endfor }}",
                vec![("values", Value::from((0..5).collect::<Vec<i64>>()))]
            ),
            "xxxxx"
        );
    }

    #[test]
    fn test_loop_binds_targets() {
        assert_eq!(
            render(
                "{{ for n in [names] }}[n], {{ endfor }}",
                vec![("names", vec!["a", "b"].into())]
            ),
            "a, b, "
        );
    }

    #[test]
    fn test_loop_unpacks_pairs() {
        let pairs = Value::List(vec![
            Value::List(vec![Value::from("a"), Value::from(1i64)]),
            Value::List(vec![Value::from("b"), Value::from(2i64)]),
        ]);
        assert_eq!(
            render(
                "{{ for k, v in [pairs] }}[k]=[v];{{ endfor }}",
                vec![("pairs", pairs)]
            ),
            "a=1;b=2;"
        );
    }

    #[test]
    fn test_loop_unpacks_string_characters() {
        assert_eq!(
            render(
                "{{ for a, b, c in [items] }}[a][b][c]{{ endfor }}",
                vec![("items", vec!["xyz"].into())]
            ),
            "xyz"
        );
    }

    #[test]
    fn test_loop_unpack_mismatch_is_value_error() {
        let err = Template::new("{{ for a, b, c in [items] }}[a]{{ endfor }}")
            .unwrap()
            .render_with(vec![("items", vec!["eggs"])])
            .unwrap_err();
        assert!(err.downcast_ref::<TemplateValueError>().is_some());

        let err = Template::new("{{ for a, b in [items] }}[a]{{ endfor }}")
            .unwrap()
            .render_with(vec![("items", (0..10).collect::<Vec<i64>>())])
            .unwrap_err();
        assert!(err.downcast_ref::<TemplateValueError>().is_some());
    }

    #[test]
    fn test_loop_over_absent_head_is_name_error() {
        let err = Template::new("{{ for v in [missing] }}x{{ endfor }}")
            .unwrap()
            .render(&Scope::new())
            .unwrap_err();
        assert!(err.downcast_ref::<TemplateNameError>().is_some());
    }

    #[test]
    fn test_loop_over_absent_index_renders_nothing() {
        let mut map = HashMap::new();
        map.insert("present", "x");
        assert_eq!(
            render(
                "a{{ for v in [tag:absent] }}x{{ endfor }}b",
                vec![("tag", Value::from(map))]
            ),
            "ab"
        );
    }

    #[test]
    fn test_loop_over_non_iterable_is_value_error() {
        let err = Template::new("{{ for v in [num] }}x{{ endfor }}")
            .unwrap()
            .render_with(vec![("num", 5i64)])
            .unwrap_err();
        assert!(err.downcast_ref::<TemplateValueError>().is_some());
    }

    #[test]
    fn test_loop_source_function_chain() {
        let mut map = HashMap::new();
        map.insert("spam", 1i64);
        map.insert("eggs", 2i64);
        assert_eq!(
            render(
                "{{ for item in [mapping|items|sorted] }}[item:0]=[item:1] {{ endfor }}",
                vec![("mapping", Value::from(map))]
            ),
            "eggs=2 spam=1 "
        );
    }

    #[test]
    fn test_loop_scope_is_restored() {
        assert_eq!(
            render(
                "[v]{{ for v in [items] }}[v]{{ endfor }}[v]",
                vec![("v", "outer".into()), ("items", vec!["a"].into())]
            ),
            "outeraouter"
        );
        // a binding that did not exist before the loop is absent after it
        assert_eq!(
            render(
                "{{ for n in [items] }}[n]{{ endfor }}[n]",
                vec![("items", vec!["a"].into())]
            ),
            "a[n]"
        );
    }

    #[test]
    fn test_template_value_renders_against_current_scope() {
        let inner = Template::new("Hello [name]").unwrap();
        assert_eq!(
            render(
                "[greeting]!",
                vec![("greeting", inner.into()), ("name", "John".into())]
            ),
            "Hello John!"
        );
    }

    #[test]
    fn test_inline_without_store_is_name_error() {
        let err = Template::new("{{ inline other.html }}")
            .unwrap()
            .render(&Scope::new())
            .unwrap_err();
        assert!(err.downcast_ref::<TemplateNameError>().is_some());
    }

    #[test]
    fn test_no_parse_skips_functions_and_escaping() {
        let template = Template::new("[v|raw] & [w]").unwrap();
        let scope: Scope = [("v", "<b>"), ("w", "<i>")].into_iter().collect();
        let functions = FunctionRegistry::with_builtins();
        let out = template.render_impl(&scope, &functions, None, true).unwrap();
        assert_eq!(out, "<b> & <i>");
        let out = template
            .render_impl(&scope, &functions, None, false)
            .unwrap();
        assert_eq!(out, "<b> & &lt;i&gt;");
    }

    #[test]
    fn test_structural_equality() {
        let a = Template::parse("a.html", "x [y]").unwrap();
        let b = Template::parse("b.html", "x [y]").unwrap();
        let c = Template::parse("c.html", "x [z]").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
