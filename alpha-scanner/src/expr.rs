//! Numeric row predicates
//!
//! A small expression language over column names:
//! `close >= high20`, `abs(low10 - low20) / low20 < 0.005`.
//!
//! Arithmetic: `+ - * /`, unary minus, parentheses, `abs(x)`, `min(a, b)`,
//! `max(a, b)`. Comparators: `>= > <= < == !=`.

use std::fmt;

use crate::error::{Result, ScanError};
use crate::types::{Row, normalize_column};

/// Arithmetic expression over row columns
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(String),
    Const(f64),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Abs(Box<Expr>),
    Min(Box<Expr>, Box<Expr>),
    Max(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Evaluate against a row. `None` when a referenced value is blank,
    /// non-numeric or absent, or when the result is not finite.
    pub fn eval(&self, row: &Row) -> Option<f64> {
        let value = match self {
            Expr::Column(name) => row.number(name)?,
            Expr::Const(v) => *v,
            Expr::Neg(e) => -e.eval(row)?,
            Expr::Add(a, b) => a.eval(row)? + b.eval(row)?,
            Expr::Sub(a, b) => a.eval(row)? - b.eval(row)?,
            Expr::Mul(a, b) => a.eval(row)? * b.eval(row)?,
            Expr::Div(a, b) => a.eval(row)? / b.eval(row)?,
            Expr::Abs(e) => e.eval(row)?.abs(),
            Expr::Min(a, b) => a.eval(row)?.min(b.eval(row)?),
            Expr::Max(a, b) => a.eval(row)?.max(b.eval(row)?),
        };
        value.is_finite().then_some(value)
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Column(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expr::Const(_) => {}
            Expr::Neg(e) | Expr::Abs(e) => e.collect_columns(out),
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Min(a, b)
            | Expr::Max(a, b) => {
                a.collect_columns(out);
                b.collect_columns(out);
            }
        }
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Ge,
    Gt,
    Le,
    Lt,
    Eq,
    Ne,
}

impl Comparison {
    fn apply(self, lhs: f64, rhs: f64) -> bool {
        let close = (lhs - rhs).abs() <= f64::EPSILON * lhs.abs().max(rhs.abs()).max(1.0);
        match self {
            Comparison::Ge => lhs >= rhs,
            Comparison::Gt => lhs > rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Lt => lhs < rhs,
            Comparison::Eq => close,
            Comparison::Ne => !close,
        }
    }
}

/// Boolean comparison of two expressions
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub lhs: Expr,
    pub op: Comparison,
    pub rhs: Expr,
    source: String,
}

impl Predicate {
    /// Parse `lhs <op> rhs`
    pub fn parse(text: &str) -> Result<Self> {
        let tokens = tokenize(text)?;
        let mut parser = Parser { tokens, pos: 0 };

        let lhs = parser.expr()?;
        let op = match parser.advance() {
            Some(Token::Cmp(op)) => op,
            Some(other) => {
                return Err(ScanError::Rule(format!(
                    "expected a comparison in '{text}', found {other}"
                )));
            }
            None => {
                return Err(ScanError::Rule(format!("'{text}' has no comparison")));
            }
        };
        let rhs = parser.expr()?;
        if let Some(extra) = parser.advance() {
            return Err(ScanError::Rule(format!("unexpected {extra} in '{text}'")));
        }

        Ok(Self {
            lhs,
            op,
            rhs,
            source: text.trim().to_string(),
        })
    }

    /// Whether the row satisfies the predicate. Rows with unusable values never do.
    pub fn matches(&self, row: &Row) -> bool {
        match (self.lhs.eval(row), self.rhs.eval(row)) {
            (Some(l), Some(r)) => self.op.apply(l, r),
            _ => false,
        }
    }

    /// Columns referenced, in first-use order
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.lhs.collect_columns(&mut out);
        self.rhs.collect_columns(&mut out);
        out
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

// ============================================================================
// Tokenizer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
    Cmp(Comparison),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Num(n) => write!(f, "number {n}"),
            Token::Ident(name) => write!(f, "'{name}'"),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::Slash => write!(f, "'/'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::Comma => write!(f, "','"),
            Token::Cmp(op) => write!(f, "comparison {op:?}"),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '>' | '<' | '=' | '!' => {
                let two = chars.get(i + 1) == Some(&'=');
                let op = match (c, two) {
                    ('>', true) => Comparison::Ge,
                    ('>', false) => Comparison::Gt,
                    ('<', true) => Comparison::Le,
                    ('<', false) => Comparison::Lt,
                    ('=', true) => Comparison::Eq,
                    ('!', true) => Comparison::Ne,
                    _ => {
                        return Err(ScanError::Rule(format!(
                            "unexpected '{c}' in '{text}' (use ==, !=, >=, <=)"
                        )));
                    }
                };
                tokens.push(Token::Cmp(op));
                i += if two { 2 } else { 1 };
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let raw: String = chars[start..i].iter().collect();
                let value = raw
                    .parse::<f64>()
                    .map_err(|_| ScanError::Rule(format!("bad number '{raw}' in '{text}'")))?;
                tokens.push(Token::Num(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => {
                return Err(ScanError::Rule(format!("unexpected '{other}' in '{text}'")));
            }
        }
    }

    Ok(tokens)
}

// ============================================================================
// Parser (recursive descent)
// ============================================================================

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
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

    fn expect(&mut self, wanted: &Token) -> Result<()> {
        match self.advance() {
            Some(ref t) if t == wanted => Ok(()),
            Some(t) => Err(ScanError::Rule(format!("expected {wanted}, found {t}"))),
            None => Err(ScanError::Rule(format!("expected {wanted}, found end of input"))),
        }
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    lhs = Expr::Add(Box::new(lhs), Box::new(self.term()?));
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    lhs = Expr::Sub(Box::new(lhs), Box::new(self.term()?));
                }
                _ => return Ok(lhs),
            }
        }
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    lhs = Expr::Mul(Box::new(lhs), Box::new(self.unary()?));
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    lhs = Expr::Div(Box::new(lhs), Box::new(self.unary()?));
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::Num(v)) => Ok(Expr::Const(v)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    self.call(&name)
                } else {
                    Ok(Expr::Column(normalize_column(&name)))
                }
            }
            Some(other) => Err(ScanError::Rule(format!("unexpected {other}"))),
            None => Err(ScanError::Rule("expression ends too early".into())),
        }
    }

    fn call(&mut self, func: &str) -> Result<Expr> {
        let first = self.expr()?;
        match func.to_ascii_lowercase().as_str() {
            "abs" => {
                self.expect(&Token::RParen)?;
                Ok(Expr::Abs(Box::new(first)))
            }
            "min" | "max" => {
                self.expect(&Token::Comma)?;
                let second = self.expr()?;
                self.expect(&Token::RParen)?;
                if func.eq_ignore_ascii_case("min") {
                    Ok(Expr::Min(Box::new(first), Box::new(second)))
                } else {
                    Ok(Expr::Max(Box::new(first), Box::new(second)))
                }
            }
            other => Err(ScanError::Rule(format!("unknown function '{other}'"))),
        }
    }
}
