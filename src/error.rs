//! Error types for template compilation and rendering
//!
//! Every diagnostic carries the template's name, its full source text and a
//! labeled span, so errors render with the offending construct underlined.

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::sync::Arc;
use thiserror::Error;

/// A template's name and raw source text, shared between the compiled
/// template and every diagnostic produced from it.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    name: Arc<str>,
    text: Arc<str>,
}

impl TemplateSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into().into(),
            text: text.into().into(),
        }
    }

    /// The template's name (file name, or `<string>` for anonymous templates)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw source text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Build the [`NamedSource`] attached to diagnostics
    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(&*self.name, self.text.to_string())
    }
}

/// Malformed template structure: bad function arguments, unmatched or
/// misplaced block statements, malformed statement contents.
#[derive(Debug, Error, Diagnostic)]
#[error("template syntax error: {message}")]
#[diagnostic(code(safran::syntax_error))]
pub struct TemplateSyntaxError {
    pub message: String,
    #[label("here")]
    pub span: SourceSpan,
    #[source_code]
    pub src: NamedSource<String>,
}

/// A tag or index that must resolve did not: loop sources, conditional
/// expressions, inline references.
#[derive(Debug, Error, Diagnostic)]
#[error("no value named `{name}` in scope")]
#[diagnostic(code(safran::name_error))]
pub struct TemplateNameError {
    pub name: String,
    #[label("unresolved here")]
    pub span: SourceSpan,
    #[source_code]
    pub src: NamedSource<String>,
}

/// A value of the wrong shape: non-iterable loop source, unpacking
/// mismatch, invalid arithmetic operand.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(safran::value_error))]
pub struct TemplateValueError {
    pub message: String,
    #[label("here")]
    pub span: SourceSpan,
    #[source_code]
    pub src: NamedSource<String>,
}

/// A function chain named a function the registry does not know.
#[derive(Debug, Error, Diagnostic)]
#[error("no template function named `{name}` is registered")]
#[diagnostic(code(safran::function_error))]
pub struct TemplateFunctionError {
    pub name: String,
    #[label("unknown function")]
    pub span: SourceSpan,
    #[source_code]
    pub src: NamedSource<String>,
}

/// A conditional expression tried to call anything other than the
/// whitelisted predicates.
#[derive(Debug, Error, Diagnostic)]
#[error("call to `{name}` is not permitted in template expressions")]
#[diagnostic(
    code(safran::evaluation_error),
    help("only `len(...)` and `isinstance(...)` may be called")
)]
pub struct TemplateEvaluationError {
    pub name: String,
    #[label("forbidden call")]
    pub span: SourceSpan,
    #[source_code]
    pub src: NamedSource<String>,
}

/// Initial load of a named template failed. Only ever raised on first
/// access; reload failures fall back to the cached template instead.
#[derive(Debug, Error, Diagnostic)]
#[error("failed to load template `{name}`")]
#[diagnostic(code(safran::load_error))]
pub struct TemplateLoadError {
    pub name: String,
    #[source]
    pub source: std::io::Error,
}
