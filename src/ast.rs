//! AST nodes for the template language
//!
//! Every node carries a [`Span`] for precise error reporting. Trees are
//! parsed once, shared behind `Arc` and evaluated many times; `PartialEq`
//! derives give structural equality (used by the cache and its tests).

use crate::value::Value;
use miette::SourceSpan;

/// A span in the source (re-export from miette)
pub type Span = SourceSpan;

/// Create a span from offset and length
pub fn span(offset: usize, len: usize) -> Span {
    SourceSpan::new(offset.into(), len)
}

/// A node in the template AST
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Raw text (passed through unchanged)
    Literal(LiteralNode),
    /// Substitution tag: `[name:index|func(args)]`
    Tag(TagNode),
    /// Conditional: `{{ if }}`/`{{ ifpresent }}`/`{{ ifnotpresent }}` with
    /// `elif`/`else` branches
    Cond(CondNode),
    /// Loop: `{{ for a, b in [tag] }}...{{ endfor }}`
    Loop(LoopNode),
    /// Inline expansion of another template: `{{ inline name }}`
    Inline(InlineNode),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Literal(n) => n.span,
            Node::Tag(n) => n.span,
            Node::Cond(n) => n.span,
            Node::Loop(n) => n.span,
            Node::Inline(n) => n.span,
        }
    }
}

/// Raw text node
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralNode {
    pub text: String,
    pub span: Span,
}

/// A substitution tag: head, index chain, function chain
#[derive(Debug, Clone, PartialEq)]
pub struct TagNode {
    /// Verbatim source text including brackets, emitted when the tag
    /// does not resolve
    pub raw: String,
    pub name: String,
    pub indices: Vec<String>,
    pub functions: Vec<TagFunction>,
    pub span: Span,
}

/// One step in a tag's function chain
#[derive(Debug, Clone, PartialEq)]
pub struct TagFunction {
    pub name: String,
    pub args: Vec<Arg>,
}

/// A literal function argument. Integer arithmetic is folded at compile
/// time, so only literals remain.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Int(i64),
    Str(String),
}

impl Arg {
    pub fn to_value(&self) -> Value {
        match self {
            Arg::Int(i) => Value::Int(*i),
            Arg::Str(s) => Value::Str(s.clone()),
        }
    }
}

/// Conditional with ordered branches and an optional else body
#[derive(Debug, Clone, PartialEq)]
pub struct CondNode {
    pub branches: Vec<CondBranch>,
    pub else_body: Option<Vec<Node>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CondBranch {
    pub test: CondTest,
    pub body: Vec<Node>,
    pub span: Span,
}

/// How a conditional branch is decided
#[derive(Debug, Clone, PartialEq)]
pub enum CondTest {
    /// `{{ if EXPR }}` - expression truthiness
    Expr(Expr),
    /// `{{ ifpresent [a] [b] }}` - all listed tags resolve
    Present(Vec<TagNode>),
    /// `{{ ifnotpresent [a] [b] }}` - none of the listed tags resolve
    Absent(Vec<TagNode>),
}

/// Loop over a tag's value
#[derive(Debug, Clone, PartialEq)]
pub struct LoopNode {
    /// Names bound each iteration; more than one unpacks the item
    pub targets: Vec<String>,
    pub source: TagNode,
    pub body: Vec<Node>,
    pub span: Span,
}

/// Inline expansion target
#[derive(Debug, Clone, PartialEq)]
pub enum InlineRef {
    /// Literal template name, resolved against the engine cache
    Name(String),
    /// Tag reference, resolved through the scope first
    Tag(TagNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineNode {
    pub target: InlineRef,
    pub span: Span,
}

// ============================================================================
// Expressions (restricted: conditionals only)
// ============================================================================

/// A conditional expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(IntLit),
    Float(FloatLit),
    Str(StringLit),
    /// Bracketed tag reference: `[name:index|func]`
    Tag(TagNode),
    /// Bare identifier; evaluating one is a name error
    Name(Ident),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    /// Whitelisted predicate call: `len(...)`, `isinstance(...)`
    Call(CallExpr),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Int(l) => l.span,
            Expr::Float(l) => l.span,
            Expr::Str(l) => l.span,
            Expr::Tag(t) => t.span,
            Expr::Name(i) => i.span,
            Expr::Unary(u) => u.span,
            Expr::Binary(b) => b.span,
            Expr::Call(c) => c.span,
        }
    }
}

/// Integer literal
#[derive(Debug, Clone, PartialEq)]
pub struct IntLit {
    pub value: i64,
    pub span: Span,
}

/// Float literal
#[derive(Debug, Clone, PartialEq)]
pub struct FloatLit {
    pub value: f64,
    pub span: Span,
}

/// String literal
#[derive(Debug, Clone, PartialEq)]
pub struct StringLit {
    pub value: String,
    pub span: Span,
}

/// An identifier
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// Unary expression
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub expr: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// Binary expression
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub op: BinaryOp,
    pub right: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical (short-circuit)
    And,
    Or,
}

/// Predicate call; the whitelist is enforced at evaluation time so the
/// error carries the rendered template's scope context
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub name: Ident,
    pub args: Vec<Expr>,
    pub span: Span,
}
