//! Conventional-precedence reading of expressions, used to audit schemas.
//!
//! [`Expr::parse`](super::Expr::parse) splits at the leftmost operator. This
//! module parses the same text with C-like precedence so schema loading can
//! flag conditions whose meaning depends on which reading is used.

use std::sync::OnceLock;

use regex::Regex;

use super::parse::leaf;
use super::{Expr, Op, Operand};
use crate::util::{Error, Result};

/// Longest-match operator tokens.
fn tokens() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"!=|==|>=|<=|&&|\|\||>|<|&|\||\+|-|/|\*").expect("token regex")
    })
}

#[derive(Clone, Debug, PartialEq)]
enum Token<'a> {
    Open,
    Close,
    Bang,
    Op(Op),
    Text(&'a str),
}

fn flush<'a>(out: &mut Vec<Token<'a>>, run: &'a str) {
    let t = run.trim();
    if !t.is_empty() {
        out.push(Token::Text(t));
    }
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while let Some(c) = text[i..].chars().next() {
        if let Some(m) = tokens().find_at(text, i).filter(|m| m.start() == i) {
            flush(&mut out, &text[start..i]);
            out.push(Token::Op(Op::from_token(m.as_str())));
            i = m.end();
            start = i;
            continue;
        }
        let tok = match c {
            '(' => Some(Token::Open),
            ')' => Some(Token::Close),
            '!' => Some(Token::Bang),
            _ => None,
        };
        if let Some(tok) = tok {
            flush(&mut out, &text[start..i]);
            out.push(tok);
            start = i + 1;
        }
        i += c.len_utf8();
    }
    flush(&mut out, &text[start..]);
    out
}

/// Binding strength; higher binds tighter.
const fn precedence(op: Op) -> u8 {
    match op {
        Op::BoolOr => 1,
        Op::BoolAnd => 2,
        Op::BitOr => 3,
        Op::BitAnd => 4,
        Op::Eq | Op::NotEq => 5,
        Op::Gt | Op::Lt | Op::Gte | Op::Lte => 6,
        Op::Add | Op::Sub => 7,
        Op::Mul | Op::Div => 8,
        Op::Not | Op::Nop => 0,
    }
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.peek().cloned() {
            Some(Token::Bang) => {
                self.pos += 1;
                let inner = self.primary()?;
                Ok(Expr { op: Op::Not, lhs: Operand::Null, rhs: inner.into_operand() })
            }
            Some(Token::Open) => {
                self.pos += 1;
                let e = self.expr(1)?;
                match self.peek() {
                    Some(Token::Close) => {
                        self.pos += 1;
                        Ok(e)
                    }
                    _ => Err(Error::Condition("missing ')'".into())),
                }
            }
            Some(Token::Text(t)) => {
                self.pos += 1;
                Ok(Expr::leaf(leaf(t)))
            }
            // Missing operand, as in a leading `-`.
            Some(Token::Op(_)) | None => Ok(Expr::default()),
            Some(Token::Close) => Err(Error::Condition("unexpected ')'".into())),
        }
    }

    fn expr(&mut self, min: u8) -> Result<Expr> {
        let mut lhs = self.primary()?;
        while let Some(Token::Op(op)) = self.peek().cloned() {
            let p = precedence(op);
            if p < min {
                break;
            }
            self.pos += 1;
            let rhs = self.expr(p + 1)?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }
}

/// Parse with conventional operator precedence.
pub fn parse_conventional(text: &str) -> Result<Expr> {
    let mut p = Parser { tokens: tokenize(text), pos: 0 };
    let e = p.expr(1)?;
    match p.peek() {
        None => Ok(e),
        Some(t) => Err(Error::Condition(format!("unexpected {t:?} in {text:?}"))),
    }
}

/// An expression whose two readings disagree.
#[derive(Clone, Debug, PartialEq)]
pub struct PrecedenceWarning {
    /// Where the expression came from, e.g. `NiNode/Children cond`.
    pub location: String,
    pub text: String,
    /// Parenthesised leftmost-split reading (the one used at run time).
    pub leftmost: String,
    /// Parenthesised conventional reading.
    pub conventional: String,
}

fn is_boolean(o: &Operand) -> bool {
    matches!(o, Operand::Expr(e) if matches!(
        e.op,
        Op::Eq | Op::NotEq | Op::Gt | Op::Lt | Op::Gte | Op::Lte | Op::Not | Op::BoolAnd | Op::BoolOr
    ))
}

/// `&` and `|` over two comparisons behave as `&&` and `||`.
fn normalize(e: &Expr) -> Expr {
    let side = |o: &Operand| match o {
        Operand::Expr(x) => Operand::Expr(Box::new(normalize(x))),
        other => other.clone(),
    };
    let (lhs, rhs) = (side(&e.lhs), side(&e.rhs));
    let both = is_boolean(&lhs) && is_boolean(&rhs);
    let op = match e.op {
        Op::BitAnd if both => Op::BoolAnd,
        Op::BitOr if both => Op::BoolOr,
        op => op,
    };
    Expr { op, lhs, rhs }
}

/// Compare both readings of `text`; `None` when they agree or either fails.
pub fn audit(location: &str, text: &str) -> Option<PrecedenceWarning> {
    let flat = Expr::parse(text).ok()?;
    let conv = parse_conventional(text).ok()?;
    (normalize(&flat) != normalize(&conv)).then(|| PrecedenceWarning {
        location: location.to_owned(),
        text: text.to_owned(),
        leftmost: flat.to_string(),
        conventional: conv.to_string(),
    })
}
