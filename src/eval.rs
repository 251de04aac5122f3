//! Scope stack and the tag/expression evaluator
//!
//! A [`Scope`] is a stack of name→value maps: loop iterations push a child
//! map binding only the loop targets and pop it afterwards, so prior
//! bindings (including absence) are restored. The [`Evaluator`] resolves
//! tags against a scope and evaluates conditional expressions; operand
//! resolution is lazy across `and`/`or`, so a tag the outcome never needs
//! is never touched.

use crate::ast::{BinaryExpr, BinaryOp, CallExpr, CondTest, Expr, Span, TagNode, UnaryOp};
use crate::error::{
    TemplateEvaluationError, TemplateFunctionError, TemplateNameError, TemplateSource,
    TemplateValueError,
};
use crate::functions::FunctionRegistry;
use crate::value::Value;
use miette::Result;
use std::collections::HashMap;

/// Replacement values for rendering, innermost map last.
#[derive(Debug, Clone)]
pub struct Scope {
    scopes: Vec<HashMap<String, Value>>,
}

impl Scope {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    /// Bind a name in the innermost scope
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        if let Some(top) = self.scopes.last_mut() {
            top.insert(name.into(), value.into());
        }
    }

    /// Look a name up, innermost scope first
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub(crate) fn pop_scope(&mut self) {
        // the root scope always stays
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Scope {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut scope = Scope::new();
        for (name, value) in iter {
            scope.set(name, value);
        }
        scope
    }
}

/// Outcome of resolving an output tag
#[derive(Debug)]
pub(crate) enum Resolved {
    Value(Value),
    /// The tag did not resolve: emit its raw source text
    Verbatim,
}

pub(crate) struct Evaluator<'a> {
    scope: &'a Scope,
    functions: &'a FunctionRegistry,
    ts: &'a TemplateSource,
    no_parse: bool,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        scope: &'a Scope,
        functions: &'a FunctionRegistry,
        ts: &'a TemplateSource,
        no_parse: bool,
    ) -> Self {
        Self {
            scope,
            functions,
            ts,
            no_parse,
        }
    }

    fn name_error(&self, name: impl Into<String>, span: Span) -> TemplateNameError {
        TemplateNameError {
            name: name.into(),
            span,
            src: self.ts.named_source(),
        }
    }

    fn value_error(&self, message: impl Into<String>, span: Span) -> TemplateValueError {
        TemplateValueError {
            message: message.into(),
            span,
            src: self.ts.named_source(),
        }
    }

    /// Resolve a tag for output. An absent head or index falls back to the
    /// verbatim tag text without consulting the registry; a private index
    /// stops the index walk and uses the value resolved so far.
    pub fn resolve_tag(&self, tag: &TagNode) -> Result<Resolved> {
        let Some(base) = self.scope.get(&tag.name) else {
            return Ok(Resolved::Verbatim);
        };
        let mut value = base.clone();
        for index in &tag.indices {
            if is_private(index) {
                break;
            }
            match value.index(index) {
                Some(v) => value = v,
                None => return Ok(Resolved::Verbatim),
            }
        }
        if self.no_parse {
            return Ok(Resolved::Value(value));
        }
        Ok(Resolved::Value(self.apply_functions(tag, value)?))
    }

    /// Resolve a loop source. An absent head is a name error; a present
    /// head with an unresolvable index yields `None` (zero iterations).
    pub fn loop_source(&self, tag: &TagNode) -> Result<Option<Value>> {
        let Some(base) = self.scope.get(&tag.name) else {
            return Err(self.name_error(&tag.name, tag.span).into());
        };
        let mut value = base.clone();
        for index in &tag.indices {
            if is_private(index) {
                return Ok(None);
            }
            match value.index(index) {
                Some(v) => value = v,
                None => return Ok(None),
            }
        }
        Ok(Some(self.apply_functions(tag, value)?))
    }

    /// Presence: the head and every index resolve. Functions are not
    /// consulted, private indices never resolve.
    pub fn is_present(&self, tag: &TagNode) -> bool {
        let Some(base) = self.scope.get(&tag.name) else {
            return false;
        };
        let mut value = base.clone();
        for index in &tag.indices {
            if is_private(index) {
                return false;
            }
            match value.index(index) {
                Some(v) => value = v,
                None => return false,
            }
        }
        true
    }

    /// Decide a conditional branch
    pub fn test(&self, test: &CondTest) -> Result<bool> {
        match test {
            CondTest::Expr(expr) => Ok(self.eval_expr(expr)?.is_truthy()),
            CondTest::Present(tags) => Ok(tags.iter().all(|t| self.is_present(t))),
            CondTest::Absent(tags) => Ok(tags.iter().all(|t| !self.is_present(t))),
        }
    }

    /// Run a tag's function chain over a resolved value
    pub fn apply_functions(&self, tag: &TagNode, mut value: Value) -> Result<Value> {
        for func in &tag.functions {
            let Some(f) = self.functions.get(&func.name) else {
                return Err(TemplateFunctionError {
                    name: func.name.clone(),
                    span: tag.span,
                    src: self.ts.named_source(),
                }
                .into());
            };
            let args: Vec<Value> = func.args.iter().map(|a| a.to_value()).collect();
            value = f(value, &args)?;
        }
        Ok(value)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    pub fn eval_expr(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Int(l) => Ok(Value::Int(l.value)),
            Expr::Float(l) => Ok(Value::Float(l.value)),
            Expr::Str(l) => Ok(Value::Str(l.value.clone())),
            Expr::Tag(tag) => self.expr_tag(tag),
            Expr::Name(ident) => Err(self.name_error(&ident.name, ident.span).into()),
            Expr::Unary(u) => match u.op {
                UnaryOp::Not => Ok(Value::Bool(!self.eval_expr(&u.expr)?.is_truthy())),
                UnaryOp::Neg => match self.eval_expr(&u.expr)? {
                    Value::Int(i) => Ok(Value::Int(-i)),
                    Value::Float(f) => Ok(Value::Float(-f)),
                    other => Err(self
                        .value_error(format!("cannot negate {}", other.type_name()), u.span)
                        .into()),
                },
            },
            Expr::Binary(b) => self.eval_binary(b),
            Expr::Call(c) => self.eval_call(c),
        }
    }

    /// Tags in expressions must resolve fully; anything absent (private
    /// indices included) is a name error.
    pub fn expr_tag(&self, tag: &TagNode) -> Result<Value> {
        let Some(base) = self.scope.get(&tag.name) else {
            return Err(self.name_error(&tag.name, tag.span).into());
        };
        let mut value = base.clone();
        for index in &tag.indices {
            let next = if is_private(index) {
                None
            } else {
                value.index(index)
            };
            match next {
                Some(v) => value = v,
                None => {
                    let path = format!("{}:{}", tag.name, index);
                    return Err(self.name_error(path, tag.span).into());
                }
            }
        }
        self.apply_functions(tag, value)
    }

    fn eval_binary(&self, b: &BinaryExpr) -> Result<Value> {
        // and/or short-circuit: the right operand is only touched when the
        // left side does not decide the outcome
        match b.op {
            BinaryOp::And => {
                let left = self.eval_expr(&b.left)?;
                if !left.is_truthy() {
                    return Ok(left);
                }
                return self.eval_expr(&b.right);
            }
            BinaryOp::Or => {
                let left = self.eval_expr(&b.left)?;
                if left.is_truthy() {
                    return Ok(left);
                }
                return self.eval_expr(&b.right);
            }
            _ => {}
        }
        let left = self.eval_expr(&b.left)?;
        let right = self.eval_expr(&b.right)?;
        match b.op {
            BinaryOp::Eq => Ok(Value::Bool(left.loosely_equals(&right))),
            BinaryOp::Ne => Ok(Value::Bool(!left.loosely_equals(&right))),
            BinaryOp::Lt => Ok(Value::Bool(matches!(
                left.compare(&right),
                Some(std::cmp::Ordering::Less)
            ))),
            BinaryOp::Le => Ok(Value::Bool(matches!(
                left.compare(&right),
                Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
            ))),
            BinaryOp::Gt => Ok(Value::Bool(matches!(
                left.compare(&right),
                Some(std::cmp::Ordering::Greater)
            ))),
            BinaryOp::Ge => Ok(Value::Bool(matches!(
                left.compare(&right),
                Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
            ))),
            op => self.arith(op, left, right, b.span),
        }
    }

    fn arith(&self, op: BinaryOp, left: Value, right: Value, span: Span) -> Result<Value> {
        if op == BinaryOp::Add
            && let (Some(a), Some(b)) = (left.as_str(), right.as_str())
        {
            return Ok(Value::Str(format!("{a}{b}")));
        }
        let result = match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => match op {
                BinaryOp::Add => a.checked_add(*b).map(Value::Int),
                BinaryOp::Sub => a.checked_sub(*b).map(Value::Int),
                BinaryOp::Mul => a.checked_mul(*b).map(Value::Int),
                BinaryOp::Div => (*b != 0).then(|| Value::Float(*a as f64 / *b as f64)),
                BinaryOp::Mod => (*b != 0).then(|| Value::Int(a.rem_euclid(*b))),
                _ => None,
            },
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                let a = match left {
                    Value::Int(i) => i as f64,
                    Value::Float(f) => f,
                    _ => unreachable!(),
                };
                let b = match right {
                    Value::Int(i) => i as f64,
                    Value::Float(f) => f,
                    _ => unreachable!(),
                };
                match op {
                    BinaryOp::Add => Some(Value::Float(a + b)),
                    BinaryOp::Sub => Some(Value::Float(a - b)),
                    BinaryOp::Mul => Some(Value::Float(a * b)),
                    BinaryOp::Div => (b != 0.0).then(|| Value::Float(a / b)),
                    BinaryOp::Mod => (b != 0.0).then(|| Value::Float(a.rem_euclid(b))),
                    _ => None,
                }
            }
            _ => None,
        };
        result.ok_or_else(|| {
            self.value_error(
                format!(
                    "cannot apply arithmetic to {} and {}",
                    left.type_name(),
                    right.type_name()
                ),
                span,
            )
            .into()
        })
    }

    /// Only the whitelisted predicates may be called; the check runs
    /// before any operand is resolved.
    fn eval_call(&self, call: &CallExpr) -> Result<Value> {
        match call.name.name.as_str() {
            "len" => {
                if call.args.len() != 1 {
                    Err(self.value_error("len() takes exactly one argument", call.span))?
                }
                let value = self.eval_expr(&call.args[0])?;
                Ok(Value::Int(value.length().unwrap_or(0) as i64))
            }
            "isinstance" => {
                if call.args.len() != 2 {
                    Err(self.value_error("isinstance() takes exactly two arguments", call.span))?
                }
                let Expr::Name(type_name) = &call.args[1] else {
                    return Err(self
                        .value_error(
                            "second argument to isinstance() must be a type name",
                            call.args[1].span(),
                        )
                        .into());
                };
                let value = self.eval_expr(&call.args[0])?;
                let hit = match type_name.name.as_str() {
                    "int" => matches!(value, Value::Int(_)),
                    "float" => matches!(value, Value::Float(_)),
                    "str" => matches!(value, Value::Str(_) | Value::Safe(_)),
                    "list" => matches!(value, Value::List(_)),
                    "dict" => matches!(value, Value::Map(_)),
                    "bool" => matches!(value, Value::Bool(_)),
                    other => Err(self.value_error(
                        format!("unknown type `{other}` in isinstance()"),
                        type_name.span,
                    ))?,
                };
                Ok(Value::Bool(hit))
            }
            name => Err(TemplateEvaluationError {
                name: name.to_string(),
                span: call.span,
                src: self.ts.named_source(),
            }
            .into()),
        }
    }
}

/// An index that starts and ends with an underscore never resolves.
pub(crate) fn is_private(index: &str) -> bool {
    index.starts_with('_') && index.ends_with('_')
}
