//! Restricted expression language for user-typed scalar fields.
//!
//! Expressions are parsed into a small AST and evaluated by walking the tree
//! against a [`Scope`] that binds a fixed set of variable names. Only the
//! whitelisted functions and constants below are resolvable; any other name is
//! rejected before evaluation.

use std::f64::consts::{E, PI};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("malformed number '{0}'")]
    BadNumber(String),
    #[error("unexpected {found} at position {pos}")]
    UnexpectedToken { found: String, pos: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("expected ')' at position {pos}")]
    UnclosedParen { pos: usize },
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("name '{0}' is not defined")]
    UnknownName(String),
    #[error("expression nested deeper than {limit} levels")]
    TooDeep { limit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Exp,
    Sqrt,
}

impl Function {
    /// Resolves a function name, accepting an optional `np.` qualifier.
    pub fn lookup(name: &str) -> Option<Self> {
        let bare = name.strip_prefix("np.").unwrap_or(name);
        match bare {
            "sin" => Some(Function::Sin),
            "cos" => Some(Function::Cos),
            "tan" => Some(Function::Tan),
            "exp" => Some(Function::Exp),
            "sqrt" => Some(Function::Sqrt),
            _ => None,
        }
    }

    fn apply(self, x: f64) -> f64 {
        match self {
            Function::Sin => x.sin(),
            Function::Cos => x.cos(),
            Function::Tan => x.tan(),
            Function::Exp => x.exp(),
            Function::Sqrt => x.sqrt(),
        }
    }
}

/// Abstract Syntax Tree nodes for expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(f64),
    Var(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Call(Function, Box<Expr>),
}

/// Variable bindings visible to an expression.
#[derive(Debug, Clone, Default)]
pub struct Scope<'a> {
    bindings: Vec<(&'a str, f64)>,
}

impl<'a> Scope<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: &'a str, value: f64) {
        match self.bindings.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.bindings.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.bindings
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }
}

impl Expr {
    /// Checks that every variable is one of `allowed`.
    pub fn check_names(&self, allowed: &[&str]) -> Result<(), ExprError> {
        match self {
            Expr::Const(_) => Ok(()),
            Expr::Var(name) => {
                if allowed.contains(&name.as_str()) {
                    Ok(())
                } else {
                    Err(ExprError::UnknownName(name.clone()))
                }
            }
            Expr::Unary(_, operand) | Expr::Call(_, operand) => operand.check_names(allowed),
            Expr::Binary(left, _, right) => {
                left.check_names(allowed)?;
                right.check_names(allowed)
            }
        }
    }

    /// Evaluates the tree. Arithmetic follows IEEE semantics, so a division by
    /// zero yields an infinity rather than an error.
    pub fn eval(&self, scope: &Scope) -> Result<f64, ExprError> {
        match self {
            Expr::Const(value) => Ok(*value),
            Expr::Var(name) => scope
                .get(name)
                .ok_or_else(|| ExprError::UnknownName(name.clone())),
            Expr::Unary(op, operand) => {
                let v = operand.eval(scope)?;
                Ok(match op {
                    UnaryOp::Neg => -v,
                    UnaryOp::Plus => v,
                })
            }
            Expr::Binary(left, op, right) => {
                let a = left.eval(scope)?;
                let b = right.eval(scope)?;
                Ok(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Pow => a.powf(b),
                })
            }
            Expr::Call(func, arg) => Ok(func.apply(arg.eval(scope)?)),
        }
    }
}

// --- Tokenizer ---

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {n}"),
            Token::Identifier(name) => format!("name '{name}'"),
            Token::Plus => "'+'".into(),
            Token::Minus => "'-'".into(),
            Token::Star => "'*'".into(),
            Token::Slash => "'/'".into(),
            Token::Caret => "power operator".into(),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, ExprError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() || c == '.' {
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            // Exponent part, only when a digit actually follows.
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let text: String = chars[start..i].iter().collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| ExprError::BadNumber(text.clone()))?;
            tokens.push((Token::Number(value), start));
        } else if c.is_alphabetic() || c == '_' {
            while i < chars.len()
                && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
            {
                i += 1;
            }
            let ident: String = chars[start..i].iter().collect();
            tokens.push((Token::Identifier(ident), start));
        } else {
            let token = match c {
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' if chars.get(i + 1) == Some(&'*') => {
                    i += 1;
                    Token::Caret
                }
                '*' => Token::Star,
                '/' => Token::Slash,
                '^' => Token::Caret,
                '(' => Token::LParen,
                ')' => Token::RParen,
                _ => return Err(ExprError::UnexpectedChar { ch: c, pos: start }),
            };
            tokens.push((token, start));
            i += 1;
        }
    }
    Ok(tokens)
}

// --- Parser ---

/// Deepest nesting accepted, counting both parser recursion and AST height.
/// Evaluation and drop walk the tree recursively, so this also bounds them.
pub const MAX_DEPTH: usize = 256;

/// Parses a string expression into an AST.
///
/// Grammar, loosest binding first:
/// `sum := product (('+' | '-') product)*`,
/// `product := unary (('*' | '/') unary)*`,
/// `unary := ('-' | '+') unary | power`,
/// `power := primary (('^' | '**') unary)?` (right associative).
pub fn parse(input: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let (expr, _) = parser.parse_sum()?;
    if let Some((token, pos)) = parser.tokens.get(parser.pos) {
        return Err(ExprError::UnexpectedToken {
            found: token.describe(),
            pos: *pos,
        });
    }
    Ok(expr)
}

/// A subtree together with its height.
type Parsed = Result<(Expr, usize), ExprError>;

fn checked_height(height: usize) -> Result<usize, ExprError> {
    if height > MAX_DEPTH {
        Err(ExprError::TooDeep { limit: MAX_DEPTH })
    } else {
        Ok(height)
    }
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn consume(&mut self) -> Option<(Token, usize)> {
        let next = self.tokens.get(self.pos).cloned();
        if next.is_some() {
            self.pos += 1;
        }
        next
    }

    fn end_position(&self) -> usize {
        self.tokens
            .last()
            .map(|(_, pos)| pos + 1)
            .unwrap_or_default()
    }

    fn parse_sum(&mut self) -> Parsed {
        let (mut left, mut height) = self.parse_product()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.consume();
            let (right, right_height) = self.parse_product()?;
            height = checked_height(height.max(right_height) + 1)?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok((left, height))
    }

    fn parse_product(&mut self) -> Parsed {
        let (mut left, mut height) = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.consume();
            let (right, right_height) = self.parse_unary()?;
            height = checked_height(height.max(right_height) + 1)?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok((left, height))
    }

    // Every nested construct (sign, exponent, parenthesis, call) re-enters
    // here, so this is where recursion depth is counted.
    fn parse_unary(&mut self) -> Parsed {
        self.depth += 1;
        let parsed = if self.depth > MAX_DEPTH {
            Err(ExprError::TooDeep { limit: MAX_DEPTH })
        } else {
            self.parse_signed()
        };
        self.depth -= 1;
        parsed
    }

    fn parse_signed(&mut self) -> Parsed {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            _ => return self.parse_power(),
        };
        self.consume();
        let (operand, height) = self.parse_unary()?;
        Ok((Expr::Unary(op, Box::new(operand)), checked_height(height + 1)?))
    }

    fn parse_power(&mut self) -> Parsed {
        let (base, base_height) = self.parse_primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.consume();
            // -X**2 is -(X**2) but X**-2 is X**(-2).
            let (exponent, exp_height) = self.parse_unary()?;
            let height = checked_height(base_height.max(exp_height) + 1)?;
            return Ok((
                Expr::Binary(Box::new(base), BinaryOp::Pow, Box::new(exponent)),
                height,
            ));
        }
        Ok((base, base_height))
    }

    fn parse_primary(&mut self) -> Parsed {
        match self.consume() {
            Some((Token::Number(n), _)) => Ok((Expr::Const(n), 1)),
            Some((Token::Identifier(name), _)) => {
                if let Some(Token::LParen) = self.peek() {
                    let func = Function::lookup(&name)
                        .ok_or_else(|| ExprError::UnknownFunction(name.clone()))?;
                    self.consume();
                    let (arg, height) = self.parse_sum()?;
                    self.expect_rparen()?;
                    return Ok((Expr::Call(func, Box::new(arg)), checked_height(height + 1)?));
                }
                let leaf = match name.strip_prefix("np.").unwrap_or(&name) {
                    "pi" => Expr::Const(PI),
                    "e" => Expr::Const(E),
                    _ => Expr::Var(name),
                };
                Ok((leaf, 1))
            }
            Some((Token::LParen, _)) => {
                let parsed = self.parse_sum()?;
                self.expect_rparen()?;
                Ok(parsed)
            }
            Some((token, pos)) => Err(ExprError::UnexpectedToken {
                found: token.describe(),
                pos,
            }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), ExprError> {
        match self.consume() {
            Some((Token::RParen, _)) => Ok(()),
            Some((_, pos)) => Err(ExprError::UnclosedParen { pos }),
            None => Err(ExprError::UnclosedParen {
                pos: self.end_position(),
            }),
        }
    }
}
