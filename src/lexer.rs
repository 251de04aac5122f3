//! Lexer for the template language
//!
//! Splits raw source into literal runs, `[...]` substitution tags and
//! `{{ ... }}` block statements. Bracket content that does not fit the tag
//! grammar is literal text, never an error: the innermost complete bracket
//! pair wins, unmatched outer brackets fall through verbatim. A `{{ ... }}`
//! whose first word is not a known keyword stays literal too. The only
//! lexing errors are malformed function argument lists inside an otherwise
//! well-formed tag.

use crate::ast::{Arg, Span, TagFunction, TagNode, span};
use crate::error::{TemplateSource, TemplateSyntaxError};
use miette::Result;

/// A lexed token
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// Literal text, passed through unchanged
    Text(String, Span),
    /// A well-formed substitution tag
    Tag(TagNode),
    /// A recognized `{{ keyword ... }}` statement
    Stmt(Stmt),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Stmt {
    pub keyword: Keyword,
    /// Statement content after the keyword, trimmed
    pub rest: String,
    /// Byte offset of `rest` in the source, for sub-parsing spans
    pub rest_offset: usize,
    /// Span of the whole `{{ ... }}` block
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keyword {
    If,
    Elif,
    Else,
    Endif,
    IfPresent,
    IfNotPresent,
    For,
    EndFor,
    Inline,
}

impl Keyword {
    fn from_word(word: &str) -> Option<Keyword> {
        match word {
            "if" => Some(Keyword::If),
            "elif" => Some(Keyword::Elif),
            "else" => Some(Keyword::Else),
            "endif" => Some(Keyword::Endif),
            "ifpresent" => Some(Keyword::IfPresent),
            "ifnotpresent" => Some(Keyword::IfNotPresent),
            "for" => Some(Keyword::For),
            "endfor" => Some(Keyword::EndFor),
            "inline" => Some(Keyword::Inline),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::If => "if",
            Keyword::Elif => "elif",
            Keyword::Else => "else",
            Keyword::Endif => "endif",
            Keyword::IfPresent => "ifpresent",
            Keyword::IfNotPresent => "ifnotpresent",
            Keyword::For => "for",
            Keyword::EndFor => "endfor",
            Keyword::Inline => "inline",
        }
    }
}

pub(crate) struct Lexer<'a> {
    ts: &'a TemplateSource,
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(ts: &'a TemplateSource) -> Self {
        Self {
            ts,
            src: ts.text(),
            pos: 0,
        }
    }

    pub fn tokens(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut text = String::new();
        let mut text_start = 0;

        macro_rules! flush_text {
            () => {
                if !text.is_empty() {
                    let len = self.pos - text_start;
                    tokens.push(Token::Text(
                        std::mem::take(&mut text),
                        span(text_start, len),
                    ));
                }
            };
        }
        macro_rules! push_text {
            ($s:expr) => {{
                if text.is_empty() {
                    text_start = self.pos;
                }
                text.push_str($s);
            }};
        }

        while self.pos < self.src.len() {
            if self.src[self.pos..].starts_with("{{") {
                match self.src[self.pos + 2..].find("}}") {
                    None => {
                        // unterminated statement: literal braces
                        push_text!("{{");
                        self.pos += 2;
                    }
                    Some(rel) => {
                        let close = self.pos + 2 + rel;
                        let end = close + 2;
                        match self.classify_stmt(self.pos, close) {
                            Some(stmt) => {
                                flush_text!();
                                tokens.push(Token::Stmt(stmt));
                            }
                            None => push_text!(&self.src[self.pos..end]),
                        }
                        self.pos = end;
                    }
                }
            } else if self.src.as_bytes()[self.pos] == b'[' {
                match scan_tag(self.src, self.pos, self.ts)? {
                    Some((tag, end)) => {
                        flush_text!();
                        tokens.push(Token::Tag(tag));
                        self.pos = end;
                    }
                    None => {
                        push_text!("[");
                        self.pos += 1;
                    }
                }
            } else {
                let rest = &self.src[self.pos..];
                // run of plain text up to the next interesting byte
                let stop = rest
                    .find(|c| c == '[' || c == '{')
                    .unwrap_or(rest.len())
                    .max(1);
                push_text!(&rest[..stop]);
                self.pos += stop;
            }
        }
        flush_text!();
        Ok(tokens)
    }

    /// Classify `{{ ... }}` content. `None` means "not a statement":
    /// the caller keeps the whole block as literal text.
    fn classify_stmt(&self, open: usize, close: usize) -> Option<Stmt> {
        let bytes = self.src.as_bytes();
        let inner = &self.src[open + 2..close];
        let word_start = open + 2 + (inner.len() - inner.trim_start().len());
        let mut word_end = word_start;
        while word_end < close && bytes[word_end].is_ascii_alphabetic() {
            word_end += 1;
        }
        let keyword = Keyword::from_word(&self.src[word_start..word_end])?;
        if word_end < close && !bytes[word_end].is_ascii_whitespace() {
            return None;
        }
        let rest_slice = &self.src[word_end..close];
        let lead = rest_slice.len() - rest_slice.trim_start().len();
        Some(Stmt {
            keyword,
            rest: rest_slice.trim().to_string(),
            rest_offset: word_end + lead,
            span: span(open, close + 2 - open),
        })
    }
}

/// Scan one `[...]` tag starting at the opening bracket.
///
/// `Ok(None)` means the content does not fit the tag grammar and the
/// bracket is literal. `Err` is reserved for structurally valid argument
/// lists with invalid arguments (keyword args, trailing commas, names,
/// nested calls).
pub(crate) fn scan_tag(
    src: &str,
    open: usize,
    ts: &TemplateSource,
) -> Result<Option<(TagNode, usize)>> {
    let bytes = src.as_bytes();
    let mut pos = open + 1;
    let name = take_word(src, &mut pos);
    if name.is_empty() {
        return Ok(None);
    }
    let mut indices = Vec::new();
    let mut functions = Vec::new();
    loop {
        match bytes.get(pos) {
            Some(&b']') => {
                pos += 1;
                break;
            }
            // indices come before any function
            Some(&b':') if functions.is_empty() => {
                pos += 1;
                let index = take_word(src, &mut pos);
                if index.is_empty() {
                    return Ok(None);
                }
                indices.push(index);
            }
            Some(&b'|') => {
                pos += 1;
                let func = take_word(src, &mut pos);
                if func.is_empty() {
                    return Ok(None);
                }
                let args = if bytes.get(pos) == Some(&b'(') {
                    pos += 1;
                    match scan_args(src, &mut pos, ts)? {
                        Some(args) => args,
                        None => return Ok(None),
                    }
                } else {
                    Vec::new()
                };
                functions.push(TagFunction { name: func, args });
            }
            _ => return Ok(None),
        }
    }
    let tag = TagNode {
        raw: src[open..pos].to_string(),
        name,
        indices,
        functions,
        span: span(open, pos - open),
    };
    Ok(Some((tag, pos)))
}

/// Scan a function argument list, cursor just past the opening paren.
/// `Ok(None)` means structurally broken (the tag falls back to literal).
fn scan_args(src: &str, pos: &mut usize, ts: &TemplateSource) -> Result<Option<Vec<Arg>>> {
    let bytes = src.as_bytes();
    let mut args = Vec::new();
    skip_ws(src, pos);
    if bytes.get(*pos) == Some(&b')') {
        *pos += 1;
        return Ok(Some(args));
    }
    loop {
        skip_ws(src, pos);
        let Some(&b) = bytes.get(*pos) else {
            return Ok(None);
        };
        match b {
            b'"' | b'\'' => match scan_quoted(src, pos) {
                Some(value) => args.push(Arg::Str(value)),
                None => return Ok(None),
            },
            b'0'..=b'9' | b'-' => match scan_arith(src, pos) {
                Some(value) => args.push(Arg::Int(value)),
                None => return Ok(None),
            },
            b if b.is_ascii_alphabetic() || b == b'_' => {
                let word_start = *pos;
                let word = take_word(src, pos);
                skip_ws(src, pos);
                let message = match bytes.get(*pos) {
                    Some(&b'=') => format!("keyword argument `{word}=` is not allowed"),
                    Some(&b'(') => {
                        format!("nested call `{word}(...)` is not allowed in arguments")
                    }
                    _ => format!("argument `{word}` must be a literal, not a name"),
                };
                Err(TemplateSyntaxError {
                    message,
                    span: span(word_start, *pos - word_start),
                    src: ts.named_source(),
                })?
            }
            _ => return Ok(None),
        }
        skip_ws(src, pos);
        match bytes.get(*pos) {
            Some(&b',') => {
                *pos += 1;
                skip_ws(src, pos);
                if bytes.get(*pos) == Some(&b')') {
                    Err(TemplateSyntaxError {
                        message: "trailing comma in argument list".to_string(),
                        span: span(*pos - 1, 1),
                        src: ts.named_source(),
                    })?
                }
            }
            Some(&b')') => {
                *pos += 1;
                return Ok(Some(args));
            }
            _ => return Ok(None),
        }
    }
}

/// Take a run of word characters (alphanumeric, `_`, `-`)
fn take_word(src: &str, pos: &mut usize) -> String {
    let bytes = src.as_bytes();
    let start = *pos;
    while *pos < bytes.len() {
        let b = bytes[*pos];
        if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' {
            *pos += 1;
        } else {
            break;
        }
    }
    src[start..*pos].to_string()
}

fn skip_ws(src: &str, pos: &mut usize) {
    let bytes = src.as_bytes();
    while *pos < bytes.len() && bytes[*pos].is_ascii_whitespace() {
        *pos += 1;
    }
}

/// Scan a quoted string with escape sequences. `None` on unclosed quote.
pub(crate) fn scan_quoted(src: &str, pos: &mut usize) -> Option<String> {
    let quote = src[*pos..].chars().next()?;
    *pos += quote.len_utf8();
    let mut value = String::new();
    loop {
        let c = src[*pos..].chars().next()?;
        *pos += c.len_utf8();
        if c == quote {
            return Some(value);
        }
        if c == '\\' {
            let e = src[*pos..].chars().next()?;
            *pos += e.len_utf8();
            match e {
                'n' => value.push('\n'),
                't' => value.push('\t'),
                'r' => value.push('\r'),
                '\\' => value.push('\\'),
                e if e == quote => value.push(e),
                e => {
                    value.push('\\');
                    value.push(e);
                }
            }
        } else {
            value.push(c);
        }
    }
}

/// Fold integer arithmetic in an argument (`5*4-3`). `None` if it is not
/// a valid integer expression (overflow and division by zero included).
fn scan_arith(src: &str, pos: &mut usize) -> Option<i64> {
    let mut acc = scan_arith_term(src, pos)?;
    loop {
        let save = *pos;
        skip_ws(src, pos);
        let op = src.as_bytes().get(*pos).copied();
        match op {
            Some(b'+') | Some(b'-') => {
                *pos += 1;
                skip_ws(src, pos);
                let rhs = scan_arith_term(src, pos)?;
                acc = if op == Some(b'+') {
                    acc.checked_add(rhs)?
                } else {
                    acc.checked_sub(rhs)?
                };
            }
            _ => {
                *pos = save;
                return Some(acc);
            }
        }
    }
}

fn scan_arith_term(src: &str, pos: &mut usize) -> Option<i64> {
    let mut acc = scan_int(src, pos)?;
    loop {
        let save = *pos;
        skip_ws(src, pos);
        let op = src.as_bytes().get(*pos).copied();
        match op {
            Some(b'*') | Some(b'/') | Some(b'%') => {
                *pos += 1;
                skip_ws(src, pos);
                let rhs = scan_int(src, pos)?;
                acc = match op {
                    Some(b'*') => acc.checked_mul(rhs)?,
                    Some(b'/') => acc.checked_div(rhs)?,
                    _ => acc.checked_rem(rhs)?,
                };
            }
            _ => {
                *pos = save;
                return Some(acc);
            }
        }
    }
}

fn scan_int(src: &str, pos: &mut usize) -> Option<i64> {
    let bytes = src.as_bytes();
    let start = *pos;
    let mut p = *pos;
    if bytes.get(p) == Some(&b'-') {
        p += 1;
    }
    let digit_start = p;
    while p < bytes.len() && bytes[p].is_ascii_digit() {
        p += 1;
    }
    if p == digit_start {
        return None;
    }
    let value = src[start..p].parse().ok()?;
    *pos = p;
    Some(value)
}

// ============================================================================
// Expression tokens (conditional statement contents)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExprToken {
    pub kind: ExprTokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ExprTokenKind {
    Int(i64),
    Float(f64),
    Str(String),
    Tag(TagNode),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    Comma,
}

/// Tokenize a conditional expression in `src[start..end]`. Spans are
/// absolute so diagnostics point into the full template.
pub(crate) fn tokenize_expr(
    src: &str,
    start: usize,
    end: usize,
    ts: &TemplateSource,
) -> Result<Vec<ExprToken>> {
    let bytes = src.as_bytes();
    let mut pos = start;
    let mut tokens = Vec::new();
    while pos < end {
        let b = bytes[pos];
        if b.is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        let tok_start = pos;
        let kind = match b {
            b'[' => match scan_tag(src, pos, ts)? {
                Some((tag, new_pos)) => {
                    pos = new_pos;
                    ExprTokenKind::Tag(tag)
                }
                None => Err(TemplateSyntaxError {
                    message: "malformed tag in expression".to_string(),
                    span: span(pos, 1),
                    src: ts.named_source(),
                })?,
            },
            b'"' | b'\'' => match scan_quoted(src, &mut pos) {
                Some(value) => ExprTokenKind::Str(value),
                None => Err(TemplateSyntaxError {
                    message: "unterminated string literal".to_string(),
                    span: span(tok_start, 1),
                    src: ts.named_source(),
                })?,
            },
            b'0'..=b'9' => {
                let mut p = pos;
                while p < end && bytes[p].is_ascii_digit() {
                    p += 1;
                }
                let mut is_float = false;
                if p + 1 < end && bytes[p] == b'.' && bytes[p + 1].is_ascii_digit() {
                    is_float = true;
                    p += 1;
                    while p < end && bytes[p].is_ascii_digit() {
                        p += 1;
                    }
                }
                let text = &src[pos..p];
                pos = p;
                if is_float {
                    ExprTokenKind::Float(text.parse().unwrap_or(0.0))
                } else {
                    ExprTokenKind::Int(text.parse().unwrap_or(0))
                }
            }
            b'=' if bytes.get(pos + 1) == Some(&b'=') => {
                pos += 2;
                ExprTokenKind::Eq
            }
            b'!' if bytes.get(pos + 1) == Some(&b'=') => {
                pos += 2;
                ExprTokenKind::Ne
            }
            b'<' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    pos += 2;
                    ExprTokenKind::Le
                } else {
                    pos += 1;
                    ExprTokenKind::Lt
                }
            }
            b'>' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    pos += 2;
                    ExprTokenKind::Ge
                } else {
                    pos += 1;
                    ExprTokenKind::Gt
                }
            }
            b'+' => {
                pos += 1;
                ExprTokenKind::Plus
            }
            b'-' => {
                pos += 1;
                ExprTokenKind::Minus
            }
            b'*' => {
                pos += 1;
                ExprTokenKind::Star
            }
            b'/' => {
                pos += 1;
                ExprTokenKind::Slash
            }
            b'%' => {
                pos += 1;
                ExprTokenKind::Percent
            }
            b'(' => {
                pos += 1;
                ExprTokenKind::LParen
            }
            b')' => {
                pos += 1;
                ExprTokenKind::RParen
            }
            b',' => {
                pos += 1;
                ExprTokenKind::Comma
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                ExprTokenKind::Ident(take_word(src, &mut pos))
            }
            _ => Err(TemplateSyntaxError {
                message: format!("unexpected character `{}` in expression", b as char),
                span: span(pos, 1),
                src: ts.named_source(),
            })?,
        };
        tokens.push(ExprToken {
            kind,
            span: span(tok_start, pos - tok_start),
        });
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(s: &str) -> Vec<Token> {
        let ts = TemplateSource::new("<test>", s);
        Lexer::new(&ts).tokens().unwrap()
    }

    fn lex_err(s: &str) -> miette::Report {
        let ts = TemplateSource::new("<test>", s);
        Lexer::new(&ts).tokens().unwrap_err()
    }

    fn text(t: &Token) -> &str {
        match t {
            Token::Text(s, _) => s,
            other => panic!("expected text, got {other:?}"),
        }
    }

    fn tag(t: &Token) -> &TagNode {
        match t {
            Token::Tag(tag) => tag,
            other => panic!("expected tag, got {other:?}"),
        }
    }

    #[test]
    fn test_text_only() {
        let tokens = lex("hello world");
        assert_eq!(tokens.len(), 1);
        assert_eq!(text(&tokens[0]), "hello world");
    }

    #[test]
    fn test_simple_tag() {
        let tokens = lex("hello [name]!");
        assert_eq!(tokens.len(), 3);
        assert_eq!(text(&tokens[0]), "hello ");
        assert_eq!(tag(&tokens[1]).name, "name");
        assert_eq!(tag(&tokens[1]).raw, "[name]");
        assert_eq!(text(&tokens[2]), "!");
    }

    #[test]
    fn test_tag_with_indices_and_functions() {
        let tokens = lex("[bundle:1:name|raw|strlimit(20, \"...\")]");
        let t = tag(&tokens[0]);
        assert_eq!(t.name, "bundle");
        assert_eq!(t.indices, vec!["1", "name"]);
        assert_eq!(t.functions.len(), 2);
        assert_eq!(t.functions[0].name, "raw");
        assert!(t.functions[0].args.is_empty());
        assert_eq!(t.functions[1].name, "strlimit");
        assert_eq!(
            t.functions[1].args,
            vec![Arg::Int(20), Arg::Str("...".to_string())]
        );
    }

    #[test]
    fn test_bad_tags_are_literal() {
        for bad in ["[ spam]", "[spam ]", "[!spam]", "[]", "[a b]", "[a:]"] {
            let tokens = lex(bad);
            assert_eq!(tokens.len(), 1, "{bad} should be one literal run");
            assert_eq!(text(&tokens[0]), bad);
        }
    }

    #[test]
    fn test_innermost_bracket_pair_wins() {
        let tokens = lex("may not contain [[spam][eggs]].");
        assert_eq!(text(&tokens[0]), "may not contain [");
        assert_eq!(tag(&tokens[1]).name, "spam");
        assert_eq!(tag(&tokens[2]).name, "eggs");
        assert_eq!(text(&tokens[3]), "].");
    }

    #[test]
    fn test_unclosed_bracket_is_literal() {
        let tokens = lex("half [open tag");
        assert_eq!(tokens.len(), 1);
        assert_eq!(text(&tokens[0]), "half [open tag");
    }

    #[test]
    fn test_string_arg_may_contain_anything() {
        let tokens = lex("[tag|strlimit(20, \"`-=./<>?`!@#$%^&*_+[]\\{}|;\\':\")|raw]");
        let t = tag(&tokens[0]);
        assert_eq!(t.functions[0].args[0], Arg::Int(20));
        assert_eq!(
            t.functions[0].args[1],
            Arg::Str("`-=./<>?`!@#$%^&*_+[]\\{}|;\\':".to_string())
        );
        assert_eq!(t.functions[1].name, "raw");
    }

    #[test]
    fn test_string_arg_with_commas() {
        let tokens = lex("[tag|join(\", \")]");
        assert_eq!(
            tag(&tokens[0]).functions[0].args,
            vec![Arg::Str(", ".to_string())]
        );
    }

    #[test]
    fn test_arithmetic_args_fold() {
        let tokens = lex("[tag|limit(5*4)]");
        assert_eq!(tag(&tokens[0]).functions[0].args, vec![Arg::Int(20)]);
        let tokens = lex("[tag|limit(2+3*4-1)]");
        assert_eq!(tag(&tokens[0]).functions[0].args, vec![Arg::Int(13)]);
        let tokens = lex("[tag|limit(-7)]");
        assert_eq!(tag(&tokens[0]).functions[0].args, vec![Arg::Int(-7)]);
    }

    #[test]
    fn test_empty_args() {
        let tokens = lex("[tag|items()]");
        let t = tag(&tokens[0]);
        assert_eq!(t.functions[0].name, "items");
        assert!(t.functions[0].args.is_empty());
    }

    #[test]
    fn test_keyword_argument_is_syntax_error() {
        let err = lex_err("[tag|limit(length=20)]");
        assert!(err.downcast_ref::<TemplateSyntaxError>().is_some());
    }

    #[test]
    fn test_trailing_comma_is_syntax_error() {
        let err = lex_err("[tag|limit(20,)]");
        assert!(err.downcast_ref::<TemplateSyntaxError>().is_some());
    }

    #[test]
    fn test_bare_name_argument_is_syntax_error() {
        let err = lex_err("[tag|limit(twenty)]");
        assert!(err.downcast_ref::<TemplateSyntaxError>().is_some());
    }

    #[test]
    fn test_nested_call_is_syntax_error() {
        let err = lex_err("[tag|limit(abs(-20))]");
        assert!(err.downcast_ref::<TemplateSyntaxError>().is_some());
    }

    #[test]
    fn test_statement_recognized() {
        let tokens = lex("a{{ if [x] == 5 }}b{{ endif }}c");
        assert_eq!(tokens.len(), 5);
        match &tokens[1] {
            Token::Stmt(stmt) => {
                assert_eq!(stmt.keyword, Keyword::If);
                assert_eq!(stmt.rest, "[x] == 5");
            }
            other => panic!("expected stmt, got {other:?}"),
        }
        match &tokens[3] {
            Token::Stmt(stmt) => {
                assert_eq!(stmt.keyword, Keyword::Endif);
                assert_eq!(stmt.rest, "");
            }
            other => panic!("expected stmt, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_keyword_stays_literal() {
        let tokens = lex("{{ frobnicate [x] }}");
        assert_eq!(tokens.len(), 1);
        assert_eq!(text(&tokens[0]), "{{ frobnicate [x] }}");
    }

    #[test]
    fn test_keyword_prefix_is_not_a_statement() {
        let tokens = lex("{{ iffy }}");
        assert_eq!(tokens.len(), 1);
        assert_eq!(text(&tokens[0]), "{{ iffy }}");
    }

    #[test]
    fn test_unterminated_statement_is_literal() {
        let tokens = lex("{{ if [x]");
        assert_eq!(text(&tokens[0]), "{{ if ");
        assert_eq!(tag(&tokens[1]).name, "x");
    }

    #[test]
    fn test_utf8_text() {
        let tokens = lex("We ♥ templates [name]");
        assert_eq!(text(&tokens[0]), "We ♥ templates ");
        assert_eq!(tag(&tokens[1]).name, "name");
    }

    #[test]
    fn test_expr_tokens() {
        let ts = TemplateSource::new("<test>", "[x] == 5 and not [y]");
        let tokens = tokenize_expr(ts.text(), 0, ts.text().len(), &ts).unwrap();
        let kinds: Vec<_> = tokens.into_iter().map(|t| t.kind).collect();
        assert_eq!(kinds.len(), 6);
        assert!(matches!(&kinds[0], ExprTokenKind::Tag(t) if t.name == "x"));
        assert_eq!(kinds[1], ExprTokenKind::Eq);
        assert_eq!(kinds[2], ExprTokenKind::Int(5));
        assert_eq!(kinds[3], ExprTokenKind::Ident("and".to_string()));
        assert_eq!(kinds[4], ExprTokenKind::Ident("not".to_string()));
        assert!(matches!(&kinds[5], ExprTokenKind::Tag(t) if t.name == "y"));
    }
}
