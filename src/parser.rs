//! Parser for the template language
//!
//! Turns the token stream into an AST. Block statements are matched
//! recursively (the recursion is the control stack): each block parser
//! consumes nodes until its terminator statement arrives, and clause
//! keywords that show up with no matching open block are syntax errors.
//! Conditional contents are compiled here into the restricted expression
//! AST with the usual precedence climbing.

use crate::ast::{
    BinaryExpr, BinaryOp, CallExpr, CondBranch, CondNode, CondTest, Expr, FloatLit, Ident,
    InlineNode, InlineRef, IntLit, LiteralNode, LoopNode, Node, Span, StringLit, TagNode,
    UnaryExpr, UnaryOp, span,
};
use crate::error::{TemplateSource, TemplateSyntaxError};
use crate::lexer::{ExprToken, ExprTokenKind, Keyword, Lexer, Stmt, Token, scan_tag, tokenize_expr};
use miette::Result;

/// Parse a full template body
pub(crate) fn parse(ts: &TemplateSource) -> Result<Vec<Node>> {
    let tokens = Lexer::new(ts).tokens()?;
    let mut parser = Parser {
        tokens: tokens.into_iter(),
        ts,
    };
    let (nodes, _) = parser.parse_nodes(BlockKind::Top)?;
    Ok(nodes)
}

/// What kind of block the parser is currently inside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Top,
    If,
    For,
}

/// Which test the branches of a conditional carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IfFlavor {
    Expr,
    Present,
    Absent,
}

struct Parser<'a> {
    tokens: std::vec::IntoIter<Token>,
    ts: &'a TemplateSource,
}

impl Parser<'_> {
    fn syntax(&self, message: impl Into<String>, span: Span) -> TemplateSyntaxError {
        TemplateSyntaxError {
            message: message.into(),
            span,
            src: self.ts.named_source(),
        }
    }

    /// Consume nodes until this block's terminator (returned to the
    /// caller) or end of input (`None`, only legal at top level).
    fn parse_nodes(&mut self, block: BlockKind) -> Result<(Vec<Node>, Option<Stmt>)> {
        let mut nodes = Vec::new();
        while let Some(token) = self.tokens.next() {
            match token {
                Token::Text(text, span) => nodes.push(Node::Literal(LiteralNode { text, span })),
                Token::Tag(tag) => nodes.push(Node::Tag(tag)),
                Token::Stmt(stmt) => match stmt.keyword {
                    Keyword::If => nodes.push(self.parse_if(stmt, IfFlavor::Expr)?),
                    Keyword::IfPresent => nodes.push(self.parse_if(stmt, IfFlavor::Present)?),
                    Keyword::IfNotPresent => nodes.push(self.parse_if(stmt, IfFlavor::Absent)?),
                    Keyword::For => nodes.push(self.parse_for(stmt)?),
                    Keyword::Inline => nodes.push(self.parse_inline(stmt)?),
                    Keyword::Elif | Keyword::Else | Keyword::Endif => match block {
                        BlockKind::If => return Ok((nodes, Some(stmt))),
                        BlockKind::Top => Err(self.syntax(
                            format!(
                                "`{}` without an open conditional block",
                                stmt.keyword.as_str()
                            ),
                            stmt.span,
                        ))?,
                        BlockKind::For => {
                            Err(self.syntax("missing `{{ endfor }}`", stmt.span))?
                        }
                    },
                    Keyword::EndFor => match block {
                        BlockKind::For => return Ok((nodes, Some(stmt))),
                        _ => Err(self.syntax("`endfor` without an open loop", stmt.span))?,
                    },
                },
            }
        }
        Ok((nodes, None))
    }

    fn parse_if(&mut self, opening: Stmt, flavor: IfFlavor) -> Result<Node> {
        let start = opening.span;
        let mut branches = Vec::new();
        let mut current = opening;
        let (else_body, end_span) = loop {
            let test = self.parse_test(&current, flavor)?;
            let (body, term) = self.parse_nodes(BlockKind::If)?;
            branches.push(CondBranch {
                test,
                body,
                span: current.span,
            });
            let Some(term) = term else {
                return Err(self.syntax("missing `{{ endif }}`", start).into());
            };
            match term.keyword {
                Keyword::Elif => current = term,
                Keyword::Endif => break (None, term.span),
                Keyword::Else => {
                    let (body, term) = self.parse_nodes(BlockKind::If)?;
                    let Some(term) = term else {
                        return Err(self.syntax("missing `{{ endif }}`", start).into());
                    };
                    match term.keyword {
                        Keyword::Endif => break (Some(body), term.span),
                        Keyword::Elif => {
                            Err(self.syntax("`elif` after `else`", term.span))?
                        }
                        _ => Err(self.syntax("second `else` in conditional", term.span))?,
                    }
                }
                _ => unreachable!("conditional terminated by {:?}", term.keyword),
            }
        };
        Ok(Node::Cond(CondNode {
            branches,
            else_body,
            span: join(start, end_span),
        }))
    }

    fn parse_test(&self, stmt: &Stmt, flavor: IfFlavor) -> Result<CondTest> {
        match flavor {
            IfFlavor::Expr => Ok(CondTest::Expr(self.parse_stmt_expr(stmt)?)),
            IfFlavor::Present => Ok(CondTest::Present(self.parse_tag_list(stmt)?)),
            IfFlavor::Absent => Ok(CondTest::Absent(self.parse_tag_list(stmt)?)),
        }
    }

    fn parse_for(&mut self, opening: Stmt) -> Result<Node> {
        let src = self.ts.text();
        let rest = &opening.rest;
        let Some(split) = rest.find(" in ") else {
            return Err(self.syntax("expected `for NAMES in [tag]`", opening.span).into());
        };
        let targets: Vec<String> = rest[..split]
            .split(',')
            .map(|t| t.trim().to_string())
            .collect();
        if targets.iter().any(|t| !is_word(t)) {
            Err(self.syntax("loop names must be identifiers", opening.span))?
        }
        let after = &rest[split + 4..];
        let lead = after.len() - after.trim_start().len();
        let src_pos = opening.rest_offset + split + 4 + lead;
        let end = opening.rest_offset + rest.len();
        if src.as_bytes().get(src_pos) != Some(&b'[') {
            Err(self.syntax("loop source must be a bracketed tag", opening.span))?
        }
        let Some((source, new_pos)) = scan_tag(src, src_pos, self.ts)? else {
            return Err(self.syntax("malformed loop source tag", span(src_pos, 1)).into());
        };
        if new_pos < end && !src[new_pos..end].trim().is_empty() {
            Err(self.syntax("unexpected content after loop source", span(new_pos, end - new_pos)))?
        }
        let (body, term) = self.parse_nodes(BlockKind::For)?;
        let Some(term) = term else {
            return Err(self.syntax("missing `{{ endfor }}`", opening.span).into());
        };
        Ok(Node::Loop(LoopNode {
            targets,
            source,
            body,
            span: join(opening.span, term.span),
        }))
    }

    fn parse_inline(&self, stmt: Stmt) -> Result<Node> {
        if stmt.rest.is_empty() {
            Err(self.syntax("`inline` needs a template name", stmt.span))?
        }
        let end = stmt.rest_offset + stmt.rest.len();
        let target = if stmt.rest.starts_with('[') {
            match scan_tag(self.ts.text(), stmt.rest_offset, self.ts)? {
                Some((tag, new_pos)) if new_pos == end => InlineRef::Tag(tag),
                _ => Err(self.syntax("malformed `inline` tag reference", stmt.span))?,
            }
        } else {
            if stmt.rest.contains(char::is_whitespace)
                || stmt.rest.contains('[')
                || stmt.rest.contains(']')
            {
                Err(self.syntax("`inline` takes a single template name", stmt.span))?
            }
            InlineRef::Name(stmt.rest.clone())
        };
        Ok(Node::Inline(InlineNode {
            target,
            span: stmt.span,
        }))
    }

    /// Presence checks: one or more bracketed tags, nothing else.
    fn parse_tag_list(&self, stmt: &Stmt) -> Result<Vec<TagNode>> {
        let src = self.ts.text();
        let bytes = src.as_bytes();
        let end = stmt.rest_offset + stmt.rest.len();
        let mut pos = stmt.rest_offset;
        let mut tags = Vec::new();
        while pos < end {
            if bytes[pos].is_ascii_whitespace() {
                pos += 1;
                continue;
            }
            if bytes[pos] != b'[' {
                Err(self.syntax(
                    "presence checks take bracketed tags only",
                    span(pos, 1),
                ))?
            }
            match scan_tag(src, pos, self.ts)? {
                Some((tag, new_pos)) => {
                    tags.push(tag);
                    pos = new_pos;
                }
                None => Err(self.syntax("malformed tag in presence check", span(pos, 1)))?,
            }
        }
        if tags.is_empty() {
            Err(self.syntax("presence check needs at least one tag", stmt.span))?
        }
        Ok(tags)
    }

    fn parse_stmt_expr(&self, stmt: &Stmt) -> Result<Expr> {
        let end = stmt.rest_offset + stmt.rest.len();
        let tokens = tokenize_expr(self.ts.text(), stmt.rest_offset, end, self.ts)?;
        if tokens.is_empty() {
            Err(self.syntax("empty condition", stmt.span))?
        }
        let mut parser = ExprParser {
            tokens,
            pos: 0,
            ts: self.ts,
            stmt_span: stmt.span,
        };
        let expr = parser.parse_expr()?;
        if let Some(extra) = parser.tokens.get(parser.pos) {
            Err(self.syntax("unexpected trailing tokens in condition", extra.span))?
        }
        Ok(expr)
    }
}

fn is_word(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn join(a: Span, b: Span) -> Span {
    let start = a.offset();
    let end = b.offset() + b.len();
    span(start, end - start)
}

// ============================================================================
// Conditional expressions
// ============================================================================

struct ExprParser<'a> {
    tokens: Vec<ExprToken>,
    pos: usize,
    ts: &'a TemplateSource,
    stmt_span: Span,
}

impl ExprParser<'_> {
    fn syntax(&self, message: impl Into<String>, span: Span) -> TemplateSyntaxError {
        TemplateSyntaxError {
            message: message.into(),
            span,
            src: self.ts.named_source(),
        }
    }

    fn peek(&self) -> Option<&ExprTokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<ExprToken> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Consume the given word if it is next, returning its span.
    fn eat_word(&mut self, word: &str) -> Option<Span> {
        match self.tokens.get(self.pos) {
            Some(t) if matches!(&t.kind, ExprTokenKind::Ident(w) if w == word) => {
                let span = t.span;
                self.pos += 1;
                Some(span)
            }
            _ => None,
        }
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.eat_word("or").is_some() {
            let right = self.parse_and()?;
            left = binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.eat_word("and").is_some() {
            let right = self.parse_not()?;
            left = binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if let Some(not_span) = self.eat_word("not") {
            let expr = self.parse_not()?;
            let span = join(not_span, expr.span());
            return Ok(Expr::Unary(UnaryExpr {
                op: UnaryOp::Not,
                expr: Box::new(expr),
                span,
            }));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut left = self.parse_add()?;
        loop {
            let op = match self.peek() {
                Some(ExprTokenKind::Eq) => BinaryOp::Eq,
                Some(ExprTokenKind::Ne) => BinaryOp::Ne,
                Some(ExprTokenKind::Lt) => BinaryOp::Lt,
                Some(ExprTokenKind::Le) => BinaryOp::Le,
                Some(ExprTokenKind::Gt) => BinaryOp::Gt,
                Some(ExprTokenKind::Ge) => BinaryOp::Ge,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_add()?;
            left = binary(left, op, right);
        }
    }

    fn parse_add(&mut self) -> Result<Expr> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek() {
                Some(ExprTokenKind::Plus) => BinaryOp::Add,
                Some(ExprTokenKind::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_mul()?;
            left = binary(left, op, right);
        }
    }

    fn parse_mul(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(ExprTokenKind::Star) => BinaryOp::Mul,
                Some(ExprTokenKind::Slash) => BinaryOp::Div,
                Some(ExprTokenKind::Percent) => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if let Some(ExprTokenKind::Minus) = self.peek() {
            let minus_span = self.tokens[self.pos].span;
            self.pos += 1;
            let expr = self.parse_unary()?;
            let span = join(minus_span, expr.span());
            return Ok(Expr::Unary(UnaryExpr {
                op: UnaryOp::Neg,
                expr: Box::new(expr),
                span,
            }));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let Some(token) = self.advance() else {
            return Err(self.syntax("unexpected end of condition", self.stmt_span).into());
        };
        match token.kind {
            ExprTokenKind::Int(value) => Ok(Expr::Int(IntLit {
                value,
                span: token.span,
            })),
            ExprTokenKind::Float(value) => Ok(Expr::Float(FloatLit {
                value,
                span: token.span,
            })),
            ExprTokenKind::Str(value) => Ok(Expr::Str(StringLit {
                value,
                span: token.span,
            })),
            ExprTokenKind::Tag(tag) => Ok(Expr::Tag(tag)),
            ExprTokenKind::Ident(name) => {
                if self.peek() == Some(&ExprTokenKind::LParen) {
                    self.pos += 1;
                    self.parse_call(name, token.span)
                } else {
                    Ok(Expr::Name(Ident {
                        name,
                        span: token.span,
                    }))
                }
            }
            ExprTokenKind::LParen => {
                let expr = self.parse_expr()?;
                match self.advance() {
                    Some(t) if t.kind == ExprTokenKind::RParen => Ok(expr),
                    _ => Err(self.syntax("missing closing parenthesis", expr.span()))?,
                }
            }
            _ => Err(self.syntax("unexpected token in condition", token.span))?,
        }
    }

    fn parse_call(&mut self, name: String, name_span: Span) -> Result<Expr> {
        let mut args = Vec::new();
        if self.peek() != Some(&ExprTokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                match self.peek() {
                    Some(ExprTokenKind::Comma) => {
                        self.pos += 1;
                    }
                    _ => break,
                }
            }
        }
        match self.advance() {
            Some(t) if t.kind == ExprTokenKind::RParen => Ok(Expr::Call(CallExpr {
                name: Ident {
                    name,
                    span: name_span,
                },
                args,
                span: join(name_span, t.span),
            })),
            _ => Err(self.syntax("missing closing parenthesis in call", name_span))?,
        }
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    let span = join(left.span(), right.span());
    Expr::Binary(BinaryExpr {
        left: Box::new(left),
        op,
        right: Box::new(right),
        span,
    })
}
