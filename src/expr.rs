//! Numeric array expressions.
//!
//! Expressions are parsed into a small AST by a hand-written lexer and Pratt
//! parser, then evaluated over [`Value`]s. The only things an expression can
//! reach are the variables bound in [`Bindings`], the constants `pi`, `inf`
//! and `nan`, and the allow-listed functions in [`crate::functions`].
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! or  ->  and  ->  not  ->  < <= > >= == !=  ->  + -  ->  * / %  ->  unary + -  ->  **
//! ```
//!
//! `**` is right-associative and binds tighter than unary minus, so
//! `-2**2 == -4`. Comparisons do not chain: `a < b < c` is rejected rather
//! than read as `(a < b) < c`; write `a < b and b < c` instead.
//!
//! Trees deeper than [`MAX_DEPTH`] are rejected while parsing, which keeps
//! both the parser and the evaluator off the end of the stack.

use std::{borrow::Cow, collections::HashMap, fmt};

use rand::rngs::StdRng;

use crate::{
    error::ThreshError,
    functions::{self, FunctionError},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Array(Vec<f64>),
}

impl Value {
    pub fn array_len(&self) -> Option<usize> {
        match self {
            Value::Scalar(_) => None,
            Value::Array(values) => Some(values.len()),
        }
    }

    pub fn as_slice(&self) -> Cow<'_, [f64]> {
        match self {
            Value::Scalar(v) => Cow::Owned(vec![*v]),
            Value::Array(values) => Cow::Borrowed(values),
        }
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Value {
        match self {
            Value::Scalar(v) => Value::Scalar(f(*v)),
            Value::Array(values) => Value::Array(values.iter().map(|v| f(*v)).collect()),
        }
    }

    /// Scalars are truthy when non-zero; arrays when non-empty and every
    /// element is non-zero.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Scalar(v) => *v != 0.0,
            Value::Array(values) => !values.is_empty() && values.iter().all(|v| *v != 0.0),
        }
    }

    /// Turns the result into a column, broadcasting scalars to `rows`.
    pub fn into_column(self, rows: Option<usize>) -> Vec<f64> {
        match self {
            Value::Array(values) => values,
            Value::Scalar(v) => vec![v; rows.unwrap_or(1)],
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(v) => write!(f, "{v}"),
            Value::Array(values) if values.len() <= 6 => {
                let items = values.iter().map(|v| v.to_string()).collect::<Vec<_>>();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Array(values) => write!(f, "array of {} value(s)", values.len()),
        }
    }
}

/// Variables visible to an expression.
#[derive(Debug, Clone, Default)]
pub struct Bindings<'a> {
    values: HashMap<String, &'a [f64]>,
    ambiguous: HashMap<String, String>,
}

impl<'a> Bindings<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name`, replacing any earlier binding of the same name.
    pub fn bind(&mut self, name: impl Into<String>, values: &'a [f64]) {
        let name = name.into();
        self.ambiguous.remove(&name);
        self.values.insert(name, values);
    }

    /// Records a name that cannot be bound because it means more than one
    /// column, so that referencing it reports the ambiguity.
    pub fn mark_ambiguous(&mut self, name: impl Into<String>, detail: impl Into<String>) {
        let name = name.into();
        if !self.values.contains_key(&name) {
            self.ambiguous.insert(name, detail.into());
        }
    }

    pub fn get(&self, name: &str) -> Option<&'a [f64]> {
        self.values.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    NotEq,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Every variable the expression reads, in first-use order.
    pub fn variables(&self) -> Vec<&str> {
        let mut found = Vec::new();
        self.collect_variables(&mut found);
        found
    }

    fn collect_variables<'e>(&'e self, found: &mut Vec<&'e str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Variable(name) => {
                if !found.contains(&name.as_str()) {
                    found.push(name);
                }
            }
            Expr::Unary { operand, .. } => operand.collect_variables(found),
            Expr::Binary { left, right, .. } => {
                left.collect_variables(found);
                right.collect_variables(found);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_variables(found);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    LParen,
    RParen,
    Comma,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    And,
    Or,
    Not,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Number(n) => return write!(f, "{n}"),
            Token::Ident(name) => return write!(f, "{name}"),
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::StarStar => "**",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Comma => ",",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::And => "and",
            Token::Or => "or",
            Token::Not => "not",
        };
        f.write_str(text)
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let chars = source.chars().collect::<Vec<_>>();
    let mut tokens = Vec::new();
    let mut idx = 0;
    while idx < chars.len() {
        let ch = chars[idx];
        let next = chars.get(idx + 1).copied();
        match ch {
            c if c.is_whitespace() => {
                idx += 1;
            }
            c if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let start = idx;
                while idx < chars.len() && (chars[idx].is_ascii_digit() || chars[idx] == '.') {
                    idx += 1;
                }
                if idx < chars.len() && matches!(chars[idx], 'e' | 'E') {
                    let sign = chars.get(idx + 1).copied();
                    let digit_at = if matches!(sign, Some('+' | '-')) {
                        idx + 2
                    } else {
                        idx + 1
                    };
                    if chars.get(digit_at).is_some_and(|d| d.is_ascii_digit()) {
                        idx = digit_at;
                        while idx < chars.len() && chars[idx].is_ascii_digit() {
                            idx += 1;
                        }
                    }
                }
                let text = chars[start..idx].iter().collect::<String>();
                let number = text
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number '{text}'"))?;
                tokens.push(Token::Number(number));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = idx;
                while idx < chars.len() && (chars[idx].is_ascii_alphanumeric() || chars[idx] == '_')
                {
                    idx += 1;
                }
                let word = chars[start..idx].iter().collect::<String>();
                tokens.push(match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Ident(word),
                });
            }
            _ => {
                let (token, width) = match (ch, next) {
                    ('*', Some('*')) => (Token::StarStar, 2),
                    ('<', Some('=')) => (Token::Le, 2),
                    ('>', Some('=')) => (Token::Ge, 2),
                    ('=', Some('=')) => (Token::EqEq, 2),
                    ('!', Some('=')) => (Token::NotEq, 2),
                    ('+', _) => (Token::Plus, 1),
                    ('-', _) => (Token::Minus, 1),
                    ('*', _) => (Token::Star, 1),
                    ('/', _) => (Token::Slash, 1),
                    ('%', _) => (Token::Percent, 1),
                    ('(', _) => (Token::LParen, 1),
                    (')', _) => (Token::RParen, 1),
                    (',', _) => (Token::Comma, 1),
                    ('<', _) => (Token::Lt, 1),
                    ('>', _) => (Token::Gt, 1),
                    ('!', _) => (Token::Not, 1),
                    ('=', _) => return Err("assignment is not allowed inside an expression".into()),
                    (other, _) => return Err(format!("unexpected character '{other}'")),
                };
                tokens.push(token);
                idx += width;
            }
        }
    }
    Ok(tokens)
}

const PREFIX_NOT_BP: u8 = 6;
const PREFIX_SIGN_BP: u8 = 14;

/// Deepest expression tree the parser will build.
pub const MAX_DEPTH: usize = 256;

fn infix_binding(token: &Token) -> Option<(BinaryOp, u8, u8)> {
    let entry = match token {
        Token::Or => (BinaryOp::Or, 2, 3),
        Token::And => (BinaryOp::And, 4, 5),
        Token::Lt => (BinaryOp::Lt, 8, 9),
        Token::Le => (BinaryOp::Le, 8, 9),
        Token::Gt => (BinaryOp::Gt, 8, 9),
        Token::Ge => (BinaryOp::Ge, 8, 9),
        Token::EqEq => (BinaryOp::Eq, 8, 9),
        Token::NotEq => (BinaryOp::NotEq, 8, 9),
        Token::Plus => (BinaryOp::Add, 10, 11),
        Token::Minus => (BinaryOp::Sub, 10, 11),
        Token::Star => (BinaryOp::Mul, 12, 13),
        Token::Slash => (BinaryOp::Div, 12, 13),
        Token::Percent => (BinaryOp::Mod, 12, 13),
        Token::StarStar => (BinaryOp::Pow, 16, 15),
        _ => return None,
    };
    Some(entry)
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::NotEq
        )
    }
}

/// A subexpression together with the height of its tree.
type Parsed = (Expr, usize);

fn too_deep() -> String {
    format!("expression nested too deeply (limit {MAX_DEPTH})")
}

fn checked(expr: Expr, height: usize) -> Result<Parsed, String> {
    if height > MAX_DEPTH {
        return Err(too_deep());
    }
    Ok((expr, height))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), String> {
        match self.advance() {
            Some(ref token) if token == expected => Ok(()),
            Some(token) => Err(format!("expected '{expected}' but found '{token}'")),
            None => Err(format!("expected '{expected}' but the expression ended")),
        }
    }

    // `depth` bounds the recursion; the returned height bounds the tree,
    // which left-associative chains grow without recursing.
    fn parse_expr(&mut self, min_bp: u8) -> Result<Parsed, String> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(too_deep());
        }
        let (mut lhs, mut height) = self.parse_prefix()?;
        let mut compared = false;
        while let Some((op, left_bp, right_bp)) = self.peek().and_then(infix_binding) {
            if left_bp < min_bp {
                break;
            }
            if op.is_comparison() {
                if compared {
                    return Err(
                        "chained comparisons are not supported; combine them with 'and'"
                            .to_string(),
                    );
                }
                compared = true;
            }
            self.advance();
            let (rhs, rhs_height) = self.parse_expr(right_bp)?;
            (lhs, height) = checked(
                Expr::Binary {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
                1 + height.max(rhs_height),
            )?;
        }
        self.depth -= 1;
        Ok((lhs, height))
    }

    fn parse_prefix(&mut self) -> Result<Parsed, String> {
        match self.advance() {
            Some(Token::Number(n)) => Ok((Expr::Number(n), 1)),
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.advance();
                    let (args, height) = self.parse_arguments()?;
                    checked(Expr::Call { name, args }, height + 1)
                } else {
                    Ok((Expr::Variable(name), 1))
                }
            }
            Some(Token::LParen) => {
                let inner = self.parse_expr(0)?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Minus) => self.parse_unary(UnaryOp::Neg, PREFIX_SIGN_BP),
            Some(Token::Plus) => self.parse_unary(UnaryOp::Plus, PREFIX_SIGN_BP),
            Some(Token::Not) => self.parse_unary(UnaryOp::Not, PREFIX_NOT_BP),
            Some(token) => Err(format!("unexpected '{token}'")),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn parse_unary(&mut self, op: UnaryOp, bp: u8) -> Result<Parsed, String> {
        let (operand, height) = self.parse_expr(bp)?;
        checked(
            Expr::Unary {
                op,
                operand: Box::new(operand),
            },
            height + 1,
        )
    }

    /// Arguments of a call, with the height of the tallest one.
    fn parse_arguments(&mut self) -> Result<(Vec<Expr>, usize), String> {
        let mut args = Vec::new();
        let mut height = 0;
        if self.peek() == Some(&Token::RParen) {
            self.advance();
            return Ok((args, height));
        }
        loop {
            let (arg, arg_height) = self.parse_expr(0)?;
            args.push(arg);
            height = height.max(arg_height);
            match self.advance() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok((args, height)),
                Some(token) => return Err(format!("expected ',' or ')' but found '{token}'")),
                None => return Err("unclosed '(' in function call".to_string()),
            }
        }
    }
}

/// Parses an expression without evaluating it.
pub fn parse(expression: &str) -> Result<Expr, ThreshError> {
    let tokens = tokenize(expression).map_err(|msg| ThreshError::evaluation(expression, msg))?;
    if tokens.is_empty() {
        return Err(ThreshError::evaluation(expression, "empty expression"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let (expr, _) = parser
        .parse_expr(0)
        .map_err(|msg| ThreshError::evaluation(expression, msg))?;
    if let Some(token) = parser.peek() {
        return Err(ThreshError::evaluation(
            expression,
            format!("unexpected '{token}' after end of expression"),
        ));
    }
    Ok(expr)
}

/// Parses and evaluates `expression` in one step.
pub fn evaluate(
    expression: &str,
    bindings: &Bindings<'_>,
    rng: &mut StdRng,
) -> Result<Value, ThreshError> {
    let expr = parse(expression)?;
    evaluate_parsed(&expr, expression, bindings, rng)
}

/// Evaluates an already parsed expression. `source` is only used for error
/// messages.
pub fn evaluate_parsed(
    expr: &Expr,
    source: &str,
    bindings: &Bindings<'_>,
    rng: &mut StdRng,
) -> Result<Value, ThreshError> {
    let mut evaluator = Evaluator {
        source,
        bindings,
        rng,
    };
    evaluator.eval(expr)
}

struct Evaluator<'s, 'b, 'a, 'r> {
    source: &'s str,
    bindings: &'b Bindings<'a>,
    rng: &'r mut StdRng,
}

impl Evaluator<'_, '_, '_, '_> {
    fn fail(&self, message: impl Into<String>) -> ThreshError {
        ThreshError::evaluation(self.source, message)
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, ThreshError> {
        match expr {
            Expr::Number(n) => Ok(Value::Scalar(*n)),
            Expr::Variable(name) => self.lookup(name),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Neg => value.map(|v| -v),
                    UnaryOp::Plus => value,
                    UnaryOp::Not => value.map(|v| bool_to_f64(v == 0.0)),
                })
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                apply_binary(*op, &left, &right).map_err(|msg| self.fail(msg))
            }
            Expr::Call { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                match functions::call(name, &values, self.rng) {
                    Ok(value) => Ok(value),
                    Err(FunctionError::Unknown) => Err(ThreshError::UnknownIdentifier {
                        name: name.clone(),
                        expression: self.source.to_string(),
                    }),
                    Err(FunctionError::Invalid(msg)) => Err(self.fail(format!("{name}: {msg}"))),
                }
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<Value, ThreshError> {
        if let Some(values) = self.bindings.get(name) {
            return Ok(Value::Array(values.to_vec()));
        }
        if let Some(constant) = constant(name) {
            return Ok(Value::Scalar(constant));
        }
        if let Some(detail) = self.bindings.ambiguous.get(name) {
            return Err(ThreshError::AmbiguousColumn {
                name: name.to_string(),
                detail: detail.clone(),
            });
        }
        if functions::is_function(name) {
            return Err(self.fail(format!("'{name}' is a function; call it as {name}(...)")));
        }
        Err(ThreshError::UnknownIdentifier {
            name: name.to_string(),
            expression: self.source.to_string(),
        })
    }
}

fn constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "inf" => Some(f64::INFINITY),
        "nan" => Some(f64::NAN),
        _ => None,
    }
}

fn bool_to_f64(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}

/// Applies `f` elementwise, broadcasting scalars against arrays.
pub(crate) fn broadcast(
    left: &Value,
    right: &Value,
    f: impl Fn(f64, f64) -> f64,
) -> Result<Value, String> {
    match (left, right) {
        (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::Scalar(f(*a, *b))),
        (Value::Scalar(a), Value::Array(bs)) => {
            Ok(Value::Array(bs.iter().map(|b| f(*a, *b)).collect()))
        }
        (Value::Array(avs), Value::Scalar(b)) => {
            Ok(Value::Array(avs.iter().map(|a| f(*a, *b)).collect()))
        }
        (Value::Array(avs), Value::Array(bs)) => {
            if avs.len() != bs.len() {
                return Err(format!(
                    "shape mismatch: operands have lengths {} and {}",
                    avs.len(),
                    bs.len()
                ));
            }
            Ok(Value::Array(
                avs.iter().zip(bs.iter()).map(|(a, b)| f(*a, *b)).collect(),
            ))
        }
    }
}

fn has_zero(value: &Value) -> bool {
    value.as_slice().iter().any(|v| *v == 0.0)
}

fn introduced_nan(inputs: &[&Value], output: &Value) -> bool {
    let out = output.as_slice();
    out.iter().enumerate().any(|(idx, v)| {
        v.is_nan()
            && !inputs.iter().any(|input| match input {
                Value::Scalar(s) => s.is_nan(),
                Value::Array(values) => values.get(idx).is_some_and(|x| x.is_nan()),
            })
    })
}

pub(crate) fn floor_mod(a: f64, b: f64) -> f64 {
    a - b * (a / b).floor()
}

fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, String> {
    match op {
        BinaryOp::Add => broadcast(left, right, |a, b| a + b),
        BinaryOp::Sub => broadcast(left, right, |a, b| a - b),
        BinaryOp::Mul => broadcast(left, right, |a, b| a * b),
        BinaryOp::Div => {
            if has_zero(right) {
                return Err("division by zero".to_string());
            }
            broadcast(left, right, |a, b| a / b)
        }
        BinaryOp::Mod => {
            if has_zero(right) {
                return Err("modulo by zero".to_string());
            }
            broadcast(left, right, floor_mod)
        }
        BinaryOp::Pow => {
            let result = broadcast(left, right, f64::powf)?;
            if introduced_nan(&[left, right], &result) {
                return Err("math domain error in '**'".to_string());
            }
            Ok(result)
        }
        BinaryOp::Lt => broadcast(left, right, |a, b| bool_to_f64(a < b)),
        BinaryOp::Le => broadcast(left, right, |a, b| bool_to_f64(a <= b)),
        BinaryOp::Gt => broadcast(left, right, |a, b| bool_to_f64(a > b)),
        BinaryOp::Ge => broadcast(left, right, |a, b| bool_to_f64(a >= b)),
        BinaryOp::Eq => broadcast(left, right, |a, b| bool_to_f64(a == b)),
        BinaryOp::NotEq => broadcast(left, right, |a, b| bool_to_f64(a != b)),
        BinaryOp::And => broadcast(left, right, |a, b| bool_to_f64(a != 0.0 && b != 0.0)),
        BinaryOp::Or => broadcast(left, right, |a, b| bool_to_f64(a != 0.0 || b != 0.0)),
    }
}
