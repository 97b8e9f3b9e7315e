//! Expression syntax tree.
//!
//! Every node owns its children through `Box`/`Vec`, so a parsed tree is a
//! plain immutable value: it can be cached, cloned, shared behind a
//! reference, and evaluated against any number of environments.
//!
//! # Wire Form
//!
//! The tree serializes as nested `{"kind": {"type": <variant>, "value": ...}, "span": ...}`
//! objects. `span` may be omitted when a host hands over a tree it built
//! itself; such nodes get [`Span::DUMMY`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{BinaryOp, LogicalOp, Span, UnaryOp};

/// Literal constant as written in the source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    String(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(n) => write!(f, "{n}"),
            Literal::Uint(n) => write!(f, "{n}u"),
            // Debug keeps a decimal point or exponent so the text re-lexes as a double.
            Literal::Double(d) => write!(f, "{d:?}"),
            Literal::String(s) => write_quoted(f, s),
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            '\0' => f.write_str("\\0")?,
            c if c.is_control() => write!(f, "\\u{:04x}", u32::from(c))?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

/// A `key: value` pair inside a map literal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub key: Expr,
    pub value: Expr,
}

/// Expression node kinds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ExprKind {
    /// `42`, `7u`, `1.5`, `"text"`, `true`, `null`
    Literal(Literal),
    /// A bare name: `user`
    Ident(String),
    /// `target.field`
    Member { target: Box<Expr>, field: String },
    /// `target[index]`
    Index { target: Box<Expr>, index: Box<Expr> },
    /// `callee(args...)`; the callee is usually an `Ident` or a `Member`.
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// `!x`, `-x`
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Eagerly evaluated binary operator.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `&&` / `||`; the right operand runs only when the left does not decide.
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `( inner )`
    Grouping(Box<Expr>),
    /// `condition ? then_branch : else_branch`
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    /// `[a, b, c]`
    List(Vec<Expr>),
    /// `{"k": v}`
    Map(Vec<MapEntry>),
}

/// An expression node with its source location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    #[serde(default)]
    pub span: Span,
}

impl Expr {
    #[inline]
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }

    pub fn literal(lit: Literal, span: Span) -> Self {
        Expr::new(ExprKind::Literal(lit), span)
    }

    pub fn ident(name: impl Into<String>, span: Span) -> Self {
        Expr::new(ExprKind::Ident(name.into()), span)
    }

    /// Segments of a pure `a.b.c` chain, root first; `None` for anything else.
    pub fn member_path(&self) -> Option<Vec<&str>> {
        let mut path = Vec::new();
        let mut node = self;
        loop {
            match &node.kind {
                ExprKind::Ident(name) => {
                    path.push(name.as_str());
                    path.reverse();
                    return Some(path);
                }
                ExprKind::Member { target, field } => {
                    path.push(field.as_str());
                    node = target;
                }
                _ => return None,
            }
        }
    }

    /// If this node is `root.field` with `root` a bare identifier, returns
    /// `(root, field)`.
    pub fn as_rooted_member(&self) -> Option<(&str, &str)> {
        match &self.kind {
            ExprKind::Member { target, field } => match &target.kind {
                ExprKind::Ident(root) => Some((root.as_str(), field.as_str())),
                _ => None,
            },
            _ => None,
        }
    }

    /// Calls `f` on each direct child, left to right.
    pub fn for_each_child<'a>(&'a self, mut f: impl FnMut(&'a Expr)) {
        match &self.kind {
            ExprKind::Literal(_) | ExprKind::Ident(_) => {}
            ExprKind::Member { target, .. } => f(target),
            ExprKind::Index { target, index } => {
                f(target);
                f(index);
            }
            ExprKind::Call { callee, args } => {
                f(callee);
                args.iter().for_each(f);
            }
            ExprKind::Unary { operand, .. } => f(operand),
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                f(left);
                f(right);
            }
            ExprKind::Grouping(inner) => f(inner),
            ExprKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                f(condition);
                f(then_branch);
                f(else_branch);
            }
            ExprKind::List(items) => items.iter().for_each(f),
            ExprKind::Map(entries) => {
                for entry in entries {
                    f(&entry.key);
                    f(&entry.value);
                }
            }
        }
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            node.for_each_child(|child| stack.push(child));
        }
        count
    }

    /// Nodes on the longest root-to-leaf path; a leaf has height 1.
    ///
    /// Walks with an explicit stack, so arbitrarily deep trees are safe.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, depth)) = stack.pop() {
            height = height.max(depth);
            node.for_each_child(|child| stack.push((child, depth + 1)));
        }
        height
    }
}

/// Prints the expression back as source text.
///
/// Parenthesization follows `Grouping` nodes only, so trees built by the
/// parser print back to text that parses to the same tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(lit) => write!(f, "{lit}"),
            ExprKind::Ident(name) => f.write_str(name),
            ExprKind::Member { target, field } => write!(f, "{target}.{field}"),
            ExprKind::Index { target, index } => write!(f, "{target}[{index}]"),
            ExprKind::Call { callee, args } => {
                write!(f, "{callee}(")?;
                write_comma_separated(f, args)?;
                f.write_str(")")
            }
            ExprKind::Unary { op, operand } => write!(f, "{op}{operand}"),
            ExprKind::Binary { op, left, right } => write!(f, "{left} {op} {right}"),
            ExprKind::Logical { op, left, right } => write!(f, "{left} {op} {right}"),
            ExprKind::Grouping(inner) => write!(f, "({inner})"),
            ExprKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => write!(f, "{condition} ? {then_branch} : {else_branch}"),
            ExprKind::List(items) => {
                f.write_str("[")?;
                write_comma_separated(f, items)?;
                f.write_str("]")
            }
            ExprKind::Map(entries) => {
                f.write_str("{")?;
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", entry.key, entry.value)?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_comma_separated(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}
