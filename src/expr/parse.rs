//! Leftmost-operator expression splitter.

use std::sync::OnceLock;

use regex::Regex;

use super::{Expr, Op, Operand};
use crate::util::{version_to_number, Error, Result};

/// Operator alternatives in match order. `&` and `|` come before `&&` and
/// `||`, so a doubled operator splits as its single form.
pub(crate) const OPERATOR_PATTERN: &str = r"!=|==|>=|<=|>|<|&|\||\+|-|/|\*|&&|\|\|";

pub(crate) fn operators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(OPERATOR_PATTERN).expect("operator regex"))
}

fn unary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*!(.*)$").expect("unary regex"))
}

fn leaf_patterns() -> &'static [Regex; 3] {
    static RE: OnceLock<[Regex; 3]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            Regex::new(r"^0[xX][0-9a-fA-F]+$").expect("hex regex"),
            Regex::new(r"^[-+]?[0-9]+$").expect("int regex"),
            Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+\.[0-9]+$").expect("version regex"),
        ]
    })
}

/// Classify a token without operators.
pub(crate) fn leaf(token: &str) -> Operand {
    if token.is_empty() {
        return Operand::Null;
    }
    let [hex, int, version] = leaf_patterns();
    if hex.is_match(token) {
        // Too many digits saturate rather than fail.
        u32::from_str_radix(&token[2..], 16).map_or(Operand::UInt(u32::MAX), Operand::UInt)
    } else if int.is_match(token) {
        token.parse::<i64>().map_or(Operand::Int(0), Operand::Int)
    } else if version.is_match(token) {
        Operand::UInt(version_to_number(token))
    } else {
        Operand::Ident(token.to_owned())
    }
}

/// Byte range of the first balanced `( … )` group at or after `from`.
///
/// `None` when there is no group; an error when brackets do not match.
fn match_group(text: &str, from: usize) -> Result<Option<(usize, usize)>> {
    let mut depth = 0usize;
    let mut start = None;
    for (i, c) in text[from..].char_indices() {
        let i = i + from;
        match c {
            '(' => {
                start.get_or_insert(i);
                depth += 1;
            }
            ')' => {
                if depth == 0 {
                    return Err(Error::Condition(format!("unbalanced ')' in {text:?}")));
                }
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start {
                        return Ok(Some((s, i)));
                    }
                }
            }
            _ => {}
        }
    }
    match start {
        Some(_) => Err(Error::Condition(format!("non-matching brackets in {text:?}"))),
        None => Ok(None),
    }
}

pub(crate) fn parse(text: &str) -> Result<Expr> {
    if text.is_empty() {
        return Ok(Expr::default());
    }

    if let Some(caps) = unary().captures(text) {
        let inner = caps.get(1).map_or("", |m| m.as_str()).trim();
        return Ok(Expr { op: Op::Not, lhs: Operand::Null, rhs: parse(inner)?.into_operand() });
    }

    let (lhs, op, rest) = if text.trim_start().starts_with('(') {
        let Some((open, close)) = match_group(text, 0)? else {
            return Err(Error::Condition(format!("non-matching brackets in {text:?}")));
        };
        let group = &text[open + 1..close];
        match operators().find(&text[close + 1..]) {
            Some(m) => (group, m.as_str(), &text[close + 1 + m.end()..]),
            None => return parse(group.trim()),
        }
    } else {
        match operators().find(text) {
            Some(m) => (&text[..m.start()], m.as_str(), &text[m.end()..]),
            None => return Ok(Expr::leaf(leaf(text.trim()))),
        }
    };

    // The right operand starts one character past the operator.
    let rest = rest.char_indices().nth(1).map_or("", |(i, _)| &rest[i..]);
    let lhs = parse(lhs.trim())?;
    let rhs = parse(rest.trim())?;
    Ok(Expr::binary(Op::from_token(op), lhs, rhs))
}
