//! Condition and array-size expressions.
//!
//! Schema fields carry small infix expressions such as
//! `(Num Vertices > 0) && (Has Normals != 0)` or `Num Triangles * 3`.
//! [`Expr::parse`] turns them into a binary tree; [`Expr::evaluate`] walks the
//! tree, asking a [`Resolver`] for the value of every identifier.
//!
//! The parser splits at the leftmost operator rather than by precedence, and
//! single `&`/`|` match before their doubled forms, so `a == 1 && b` means
//! `a == (1 & b)`. Schema authors parenthesise to get anything else;
//! [`precedence`] can report where the two readings differ.

mod parse;
pub mod precedence;

use std::fmt;

use crate::util::Result;

/// Expression operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Not,
    NotEq,
    Eq,
    Gte,
    Lte,
    Gt,
    Lt,
    BitAnd,
    BitOr,
    Add,
    Sub,
    Div,
    Mul,
    BoolAnd,
    BoolOr,
    /// Leaf: evaluates to its left operand.
    Nop,
}

impl Op {
    /// Operator for its source token; `Nop` for anything else.
    pub fn from_token(s: &str) -> Self {
        match s {
            "!" => Self::Not,
            "!=" => Self::NotEq,
            "==" => Self::Eq,
            ">=" => Self::Gte,
            "<=" => Self::Lte,
            ">" => Self::Gt,
            "<" => Self::Lt,
            "&" => Self::BitAnd,
            "|" => Self::BitOr,
            "+" => Self::Add,
            "-" => Self::Sub,
            "/" => Self::Div,
            "*" => Self::Mul,
            "&&" => Self::BoolAnd,
            "||" => Self::BoolOr,
            _ => Self::Nop,
        }
    }

    pub const fn token(self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::NotEq => "!=",
            Self::Eq => "==",
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Div => "/",
            Self::Mul => "*",
            Self::BoolAnd => "&&",
            Self::BoolOr => "||",
            Self::Nop => "",
        }
    }
}

/// One side of an [`Expr`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Operand {
    #[default]
    Null,
    /// Hex or version literal.
    UInt(u32),
    /// Decimal literal.
    Int(i64),
    /// Field name, `ARG`, or block type name; resolved at evaluation time.
    Ident(String),
    Expr(Box<Expr>),
}

/// Result of evaluating an expression or resolving an identifier.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ExprValue {
    #[default]
    Null,
    Bool(bool),
    UInt(u32),
    Int(i64),
    Str(String),
}

impl ExprValue {
    /// Unsigned view used by arithmetic, bitwise and ordering operators.
    pub fn to_u32(&self) -> u32 {
        match self {
            Self::Null => 0,
            Self::Bool(b) => *b as u32,
            Self::UInt(v) => *v,
            Self::Int(v) => *v as u32,
            Self::Str(s) => s.trim().parse::<i64>().map_or(0, |v| v as u32),
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::UInt(v) => *v != 0,
            Self::Int(v) => *v != 0,
            Self::Str(s) => !(s.is_empty() || s == "0" || s == "false"),
        }
    }

    /// Equality after bringing both sides to a common type.
    pub fn loose_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Null, _) | (_, Self::Null) => false,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Bool(a), s @ Self::Str(_)) | (s @ Self::Str(_), Self::Bool(a)) => {
                *a == s.truthy()
            }
            (a, b) => a.to_u32() == b.to_u32(),
        }
    }
}

/// Turns identifiers into values during evaluation.
pub trait Resolver {
    fn resolve(&self, ident: &str) -> ExprValue;
}

impl<F> Resolver for F
where
    F: Fn(&str) -> ExprValue,
{
    fn resolve(&self, ident: &str) -> ExprValue {
        self(ident)
    }
}

/// Parsed expression tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub op: Op,
    pub lhs: Operand,
    pub rhs: Operand,
}

impl Default for Expr {
    fn default() -> Self {
        Self { op: Op::Nop, lhs: Operand::Null, rhs: Operand::Null }
    }
}

impl Expr {
    /// Parse with the leftmost-operator split.
    pub fn parse(text: &str) -> Result<Self> {
        parse::parse(text)
    }

    /// Binary node; no-op children collapse into their operand.
    pub(crate) fn binary(op: Op, lhs: Expr, rhs: Expr) -> Self {
        Self { op, lhs: lhs.into_operand(), rhs: rhs.into_operand() }
    }

    pub(crate) fn leaf(operand: Operand) -> Self {
        Self { op: Op::Nop, lhs: operand, rhs: Operand::Null }
    }

    pub(crate) fn into_operand(self) -> Operand {
        if self.op == Op::Nop {
            self.lhs
        } else {
            Operand::Expr(Box::new(self))
        }
    }

    #[inline]
    pub fn is_nop(&self) -> bool {
        self.op == Op::Nop
    }

    /// True for the empty expression.
    pub fn is_empty(&self) -> bool {
        self.op == Op::Nop && self.lhs == Operand::Null
    }

    fn operand_value<R: Resolver + ?Sized>(o: &Operand, resolver: &R) -> ExprValue {
        match o {
            Operand::Null => ExprValue::Null,
            Operand::UInt(v) => ExprValue::UInt(*v),
            Operand::Int(v) => ExprValue::Int(*v),
            Operand::Ident(name) => resolver.resolve(name),
            Operand::Expr(e) => e.evaluate(resolver),
        }
    }

    /// Evaluate post-order.
    pub fn evaluate<R: Resolver + ?Sized>(&self, resolver: &R) -> ExprValue {
        let l = Self::operand_value(&self.lhs, resolver);
        let r = Self::operand_value(&self.rhs, resolver);
        match self.op {
            Op::Not => ExprValue::Bool(!r.truthy()),
            Op::NotEq => ExprValue::Bool(!l.loose_eq(&r)),
            Op::Eq => ExprValue::Bool(l.loose_eq(&r)),
            Op::Gte => ExprValue::Bool(l.to_u32() >= r.to_u32()),
            Op::Lte => ExprValue::Bool(l.to_u32() <= r.to_u32()),
            Op::Gt => ExprValue::Bool(l.to_u32() > r.to_u32()),
            Op::Lt => ExprValue::Bool(l.to_u32() < r.to_u32()),
            Op::BitAnd => ExprValue::UInt(l.to_u32() & r.to_u32()),
            Op::BitOr => ExprValue::UInt(l.to_u32() | r.to_u32()),
            Op::Add => ExprValue::UInt(l.to_u32().wrapping_add(r.to_u32())),
            Op::Sub => ExprValue::UInt(l.to_u32().wrapping_sub(r.to_u32())),
            Op::Mul => ExprValue::UInt(l.to_u32().wrapping_mul(r.to_u32())),
            Op::Div => ExprValue::UInt(l.to_u32().checked_div(r.to_u32()).unwrap_or(0)),
            Op::BoolAnd => ExprValue::Bool(l.truthy() && r.truthy()),
            Op::BoolOr => ExprValue::Bool(l.truthy() || r.truthy()),
            Op::Nop => l,
        }
    }

    pub fn evaluate_bool<R: Resolver + ?Sized>(&self, resolver: &R) -> bool {
        self.evaluate(resolver).truthy()
    }

    pub fn evaluate_u32<R: Resolver + ?Sized>(&self, resolver: &R) -> u32 {
        self.evaluate(resolver).to_u32()
    }

    /// Every identifier in the tree, left to right.
    pub fn identifiers(&self) -> Vec<&str> {
        fn walk<'a>(o: &'a Operand, out: &mut Vec<&'a str>) {
            match o {
                Operand::Ident(s) => out.push(s),
                Operand::Expr(e) => {
                    walk(&e.lhs, out);
                    walk(&e.rhs, out);
                }
                _ => {}
            }
        }
        let mut out = Vec::new();
        walk(&self.lhs, &mut out);
        walk(&self.rhs, &mut out);
        out
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Ident(s) => f.write_str(s),
            Self::Expr(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for Expr {
    /// Fully parenthesised form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            Op::Nop => write!(f, "{}", self.lhs),
            Op::Not => write!(f, "!{}", self.rhs),
            op => write!(f, "({} {} {})", self.lhs, op.token(), self.rhs),
        }
    }
}
