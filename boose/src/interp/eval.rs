//! Expression evaluator
//!
//! Expressions are plain strings. They are classified by looking at the text,
//! first matching rule wins:
//!
//! 1. anything containing a `"` is a concatenation
//! 2. `&&`, `||` or a leading `!` make it a logical expression
//! 3. `<= >= == != < >` make it a comparison
//! 4. everything else is arithmetic, parsed by recursive descent over
//!    [`crate::lexer::Token`]s with identifiers replaced by their current value
//!
//! Failures of any kind surface as [`BooseError::Expression`] carrying the
//! original text.

use super::scope::Scope;
use super::value::Value;
use crate::error::{BooseError, Result};
use crate::lexer::{Token, tokenize};

const COMPARISON_OPS: [&str; 6] = ["<=", ">=", "==", "!=", "<", ">"];
const LOGICAL_OPS: [&str; 2] = ["&&", "||"];

/// Evaluate an expression against a scope
pub fn evaluate(expression: &str, scope: &Scope) -> Result<Value> {
    eval_inner(expression, scope).map_err(|err| wrap(expression, err))
}

/// Evaluate an expression and coerce the result to a boolean
pub fn evaluate_condition(expression: &str, scope: &Scope) -> Result<bool> {
    eval_inner(expression, scope)
        .and_then(|value| value.is_truthy())
        .map_err(|err| wrap(expression, err))
}

fn wrap(expression: &str, err: BooseError) -> BooseError {
    match err {
        BooseError::Expression { cause, .. } => BooseError::expression(expression.trim(), cause),
        other => BooseError::expression(expression.trim(), other),
    }
}

fn eval_inner(expression: &str, scope: &Scope) -> Result<Value> {
    let expr = strip_outer_parens(expression);
    if expr.is_empty() {
        return Err(BooseError::expression(expression.trim(), "empty expression"));
    }

    if expr.contains('"') {
        return eval_concat(expr, scope);
    }

    if let Some((pos, op)) = find_top_level(expr, &LOGICAL_OPS) {
        // both sides are always evaluated
        let left = eval_inner(&expr[..pos], scope)?.is_truthy()?;
        let right = eval_inner(&expr[pos + op.len()..], scope)?.is_truthy()?;
        return Ok(Value::Bool(if op == "&&" { left && right } else { left || right }));
    }

    if let Some(rest) = expr.strip_prefix('!')
        && !rest.starts_with('=')
    {
        return Ok(Value::Bool(!eval_inner(rest, scope)?.is_truthy()?));
    }

    if let Some((pos, op)) = find_top_level(expr, &COMPARISON_OPS) {
        let left = eval_arithmetic(&expr[..pos], scope)?;
        let right = eval_arithmetic(&expr[pos + op.len()..], scope)?;
        return compare(op, &left, &right).map(Value::Bool);
    }

    eval_arithmetic(expr, scope)
}

/// Strip parentheses that enclose the whole expression
fn strip_outer_parens(expression: &str) -> &str {
    let mut expr = expression.trim();
    while expr.starts_with('(') && matching_paren(expr, 0) == Some(expr.len() - 1) {
        expr = expr[1..expr.len() - 1].trim();
    }
    expr
}

fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_quote = false;
    for (i, c) in text.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '"' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Find the first occurrence of any operator outside quotes and parentheses.
/// At a given position earlier entries in `ops` win, so list longer
/// operators first.
fn find_top_level<'o>(text: &str, ops: &[&'o str]) -> Option<(usize, &'o str)> {
    let mut depth = 0i32;
    let mut in_quote = false;
    for (i, c) in text.char_indices() {
        match c {
            '"' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => depth -= 1,
            _ if !in_quote && depth == 0 => {
                if let Some(op) = ops.iter().find(|op| text[i..].starts_with(**op)) {
                    return Some((i, *op));
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on a separator that sits outside quotes and parentheses
pub fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '"' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => depth -= 1,
            c if c == separator && !in_quote && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// `"..."` with no other quote inside
fn quoted_literal(segment: &str) -> Option<&str> {
    let inner = segment.strip_prefix('"')?.strip_suffix('"')?;
    (!inner.contains('"')).then_some(inner)
}

fn eval_concat(expr: &str, scope: &Scope) -> Result<Value> {
    let mut values = Vec::new();
    for segment in split_top_level(expr, '+') {
        let segment = segment.trim();
        if segment.is_empty() {
            return Err(BooseError::expression(expr, "missing operand around '+'"));
        }
        if let Some(text) = quoted_literal(segment) {
            values.push(Value::Str(text.to_string()));
        } else if segment.contains('"') {
            return Err(BooseError::expression(expr, format!("malformed string literal {segment}")));
        } else {
            values.push(eval_inner(segment, scope)?);
        }
    }

    if values.iter().all(Value::is_numeric) {
        let mut iter = values.into_iter();
        let first = iter.next().unwrap_or(Value::Int(0));
        return iter.try_fold(first, |acc, v| binary(BinOp::Add, acc, v));
    }

    Ok(Value::Str(values.iter().map(Value::to_string).collect()))
}

fn compare(op: &str, left: &Value, right: &Value) -> Result<bool> {
    match op {
        "==" | "!=" => {
            let equal = match (left, right) {
                (Value::Bool(a), Value::Bool(b)) => a == b,
                (Value::Str(a), Value::Str(b)) => a == b,
                (l, r) if l.is_numeric() && r.is_numeric() => l == r,
                (l, r) => {
                    return Err(BooseError::type_mismatch(l.type_name(), r.type_name()));
                }
            };
            Ok(if op == "==" { equal } else { !equal })
        }
        _ => {
            let ordering = match (left, right) {
                (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
                (l, r) => l.to_real()?.partial_cmp(&r.to_real()?),
            };
            let ordering = ordering.ok_or_else(|| BooseError::argument("cannot order NaN"))?;
            Ok(match op {
                "<" => ordering.is_lt(),
                "<=" => ordering.is_le(),
                ">" => ordering.is_gt(),
                _ => ordering.is_ge(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    fn symbol(self) -> char {
        match self {
            BinOp::Add => '+',
            BinOp::Sub => '-',
            BinOp::Mul => '*',
            BinOp::Div => '/',
            BinOp::Rem => '%',
        }
    }
}

fn overflow(op: BinOp) -> BooseError {
    BooseError::argument(format!("integer overflow in '{}'", op.symbol()))
}

fn binary(op: BinOp, left: Value, right: Value) -> Result<Value> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => {
            let (a, b) = (*a, *b);
            let result = match op {
                BinOp::Add => a.checked_add(b).ok_or_else(|| overflow(op))?,
                BinOp::Sub => a.checked_sub(b).ok_or_else(|| overflow(op))?,
                BinOp::Mul => a.checked_mul(b).ok_or_else(|| overflow(op))?,
                BinOp::Div => {
                    if b == 0 {
                        return Err(BooseError::argument("division by zero"));
                    }
                    if a.checked_rem(b) != Some(0) {
                        return Ok(Value::Real(a as f64 / b as f64));
                    }
                    a.checked_div(b).ok_or_else(|| overflow(op))?
                }
                BinOp::Rem => {
                    if b == 0 {
                        return Err(BooseError::argument("division by zero"));
                    }
                    a.checked_rem(b).ok_or_else(|| overflow(op))?
                }
            };
            Ok(Value::Int(result))
        }
        (l, r) if l.is_numeric() && r.is_numeric() => {
            let (a, b) = (l.to_real()?, r.to_real()?);
            if matches!(op, BinOp::Div | BinOp::Rem) && b == 0.0 {
                return Err(BooseError::argument("division by zero"));
            }
            let result = match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => a / b,
                BinOp::Rem => a % b,
            };
            if !result.is_finite() {
                return Err(BooseError::argument(format!("'{}' produced a non-finite number", op.symbol())));
            }
            Ok(Value::Real(result))
        }
        (l, r) => {
            let culprit = if l.is_numeric() { r } else { l };
            Err(BooseError::type_mismatch("number", culprit.type_name()))
        }
    }
}

fn eval_arithmetic(text: &str, scope: &Scope) -> Result<Value> {
    let tokens = tokenize(text.trim())?;
    if tokens.is_empty() {
        return Err(BooseError::expression(text.trim(), "empty expression"));
    }
    let mut parser = ArithParser {
        tokens,
        pos: 0,
        scope,
    };
    let value = parser.expr()?;
    match parser.peek() {
        None => Ok(value),
        Some(token) => Err(BooseError::argument(format!("unexpected `{token}`"))),
    }
}

/// Recursive-descent parser that evaluates as it goes
struct ArithParser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    scope: &'a Scope,
}

impl ArithParser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Value> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = binary(op, lhs, rhs)?;
        }
    }

    // term := unary (('*' | '/' | '%') unary)*
    fn term(&mut self) -> Result<Value> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Rem,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs)?;
        }
    }

    fn unary(&mut self) -> Result<Value> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                match self.unary()? {
                    Value::Int(n) => n.checked_neg().map(Value::Int).ok_or_else(|| overflow(BinOp::Sub)),
                    Value::Real(x) => Ok(Value::Real(-x)),
                    other => Err(BooseError::type_mismatch("number", other.type_name())),
                }
            }
            Some(Token::Plus) => {
                self.pos += 1;
                let value = self.unary()?;
                if value.is_numeric() {
                    Ok(value)
                } else {
                    Err(BooseError::type_mismatch("number", value.type_name()))
                }
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Value> {
        match self.advance() {
            Some(Token::IntLit(n)) => Ok(Value::Int(n)),
            Some(Token::RealLit(x)) => Ok(Value::Real(x)),
            Some(Token::True) => Ok(Value::Bool(true)),
            Some(Token::False) => Ok(Value::Bool(false)),
            Some(Token::Ident(name)) => self
                .scope
                .get(&name)
                .cloned()
                .ok_or_else(|| BooseError::undefined_variable(name)),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(BooseError::argument("missing ')'")),
                }
            }
            Some(token) => Err(BooseError::argument(format!("unexpected `{token}`"))),
            None => Err(BooseError::argument("unexpected end of expression")),
        }
    }
}
