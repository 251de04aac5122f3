//! safran — an HTML template engine with square-bracket tags
//!
//! Templates mix literal text with `[tag]` substitutions and `{{ ... }}`
//! statements:
//!
//! ```text
//! <h1>[title|html]</h1>
//! {{ if [count] > 1 }} [count] results {{ else }} one result {{ endif }}
//! {{ for name in [members] }} <li>[name]</li> {{ endfor }}
//! {{ inline footer.html }}
//! ```
//!
//! Tags drill into nested data with `:` (`[user:address:city]`) and pipe
//! through functions (`[title|html]`, `[text|strlimit(80)]`). Anything
//! that does not parse as a tag or a known statement stays in the output
//! as literal text, so stray brackets never break a page.
//!
//! Output is HTML-escaped by default. Values that have already been
//! escaped carry a [`SafeString`] marker and pass through untouched, so
//! nothing gets escaped twice; `|raw` opts markup out of escaping
//! entirely.
//!
//! The [`Engine`] loads templates from a directory, caches the compiled
//! form and recompiles when the file on disk changes. One-off strings
//! render through [`Template::new`] without an engine:
//!
//! ```
//! use safran::{Scope, Template};
//!
//! let template = Template::new("hello [name]")?;
//! let scope: Scope = [("name", "world")].into_iter().collect();
//! assert_eq!(template.render(&scope)?, "hello world");
//! # Ok::<(), miette::Report>(())
//! ```

mod ast;
mod engine;
mod error;
mod eval;
mod functions;
mod lexer;
mod parser;
mod render;
mod safe;
mod value;

pub use engine::{Engine, Freshness};
pub use error::{
    TemplateEvaluationError, TemplateFunctionError, TemplateLoadError, TemplateNameError,
    TemplateSyntaxError, TemplateValueError,
};
pub use eval::Scope;
pub use functions::{FunctionRegistry, TagFn};
pub use render::Template;
pub use safe::{SafeContext, SafeString};
pub use value::Value;
