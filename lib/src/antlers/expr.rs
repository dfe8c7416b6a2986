use std::cmp::Ordering;
use std::sync::Arc;

use crate::antlers::Context;
use crate::error::{SyntaxError, SyntaxErrorKind};
use crate::value::Value;

/// A condition, as found in `{{ if ... }}` and `{{ elseif ... }}`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// A dotted path into the context.
    Path(Arc<str>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, CompareOp, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Expr {
    /// Parses a condition. `offset` is where `source` starts in the template.
    pub fn parse(source: &str, offset: usize) -> Result<Expr, SyntaxError> {
        let tokens = tokenize(source, offset)?;
        let mut parser = ExprParser { tokens, pos: 0, offset, source };
        let expr = parser.or()?;
        match parser.tokens.get(parser.pos) {
            None => Ok(expr),
            Some(token) => Err(parser.error(format!("unexpected `{}`", token.text()))),
        }
    }

    /// Evaluates `self` against `context`. Missing paths are `null`.
    pub fn eval(&self, context: &Context<'_>) -> Value {
        match self {
            Expr::Literal(value) => value.clone(),
            Expr::Path(path) => context.get(path).unwrap_or_default(),
            Expr::Not(expr) => Value::Bool(!expr.is_true(context)),
            Expr::And(a, b) => Value::Bool(a.is_true(context) && b.is_true(context)),
            Expr::Or(a, b) => Value::Bool(a.is_true(context) || b.is_true(context)),
            Expr::Compare(a, op, b) => {
                let (a, b) = (a.eval(context), b.eval(context));
                Value::Bool(op.test(&a, &b))
            }
        }
    }

    #[inline]
    pub fn is_true(&self, context: &Context<'_>) -> bool {
        self.eval(context).is_truthy()
    }
}

impl CompareOp {
    pub fn test(self, a: &Value, b: &Value) -> bool {
        match self {
            CompareOp::Eq => loose_eq(a, b),
            CompareOp::Ne => !loose_eq(a, b),
            CompareOp::Lt => compare(a, b) == Some(Ordering::Less),
            CompareOp::Le => matches!(compare(a, b), Some(Ordering::Less | Ordering::Equal)),
            CompareOp::Gt => compare(a, b) == Some(Ordering::Greater),
            CompareOp::Ge => matches!(compare(a, b), Some(Ordering::Greater | Ordering::Equal)),
        }
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(_), _) | (_, Value::Bool(_)) => a.is_truthy() == b.is_truthy(),
        (Value::Array(_) | Value::Dict(_), _) | (_, Value::Array(_) | Value::Dict(_)) => a == b,
        _ => match (a.to_f64(), b.to_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a.render() == b.render(),
        }
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if a.is_null() || b.is_null() {
        return None;
    }

    match (a.to_f64(), b.to_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => Some(a.render().cmp(&b.render())),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(Arc<str>),
    Str(Arc<str>),
    Num(f64),
    Op(&'static str),
}

impl Token {
    fn text(&self) -> String {
        match self {
            Token::Ident(s) | Token::Str(s) => s.to_string(),
            Token::Num(n) => n.to_string(),
            Token::Op(op) => op.to_string(),
        }
    }
}

// Longest first so that `<=` wins over `<`.
const OPERATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "<", ">", "!", "(", ")",
];

fn tokenize(source: &str, offset: usize) -> Result<Vec<Token>, SyntaxError> {
    let malformed = |message: String| {
        SyntaxError::new(SyntaxErrorKind::MalformedExpression(message), offset)
    };

    let mut tokens = vec![];
    let mut rest = source.trim_start();
    while !rest.is_empty() {
        let c = rest.chars().next().unwrap_or_default();
        if c == '"' || c == '\'' {
            let end = rest[1..].find(c)
                .ok_or_else(|| malformed(format!("unterminated string in `{source}`")))?;

            tokens.push(Token::Str(rest[1..1 + end].into()));
            rest = &rest[end + 2..];
        } else if c.is_ascii_digit() || (c == '-' && rest[1..].starts_with(|c: char| c.is_ascii_digit())) {
            let end = rest[1..].find(|c: char| !c.is_ascii_digit() && c != '.').map_or(rest.len(), |i| i + 1);
            let number = rest[..end].parse()
                .map_err(|_| malformed(format!("invalid number `{}`", &rest[..end])))?;

            tokens.push(Token::Num(number));
            rest = &rest[end..];
        } else if c.is_alphabetic() || c == '_' {
            let end = rest.find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | ':')))
                .unwrap_or(rest.len());

            tokens.push(Token::Ident(rest[..end].into()));
            rest = &rest[end..];
        } else if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            tokens.push(Token::Op(op));
            rest = &rest[op.len()..];
        } else {
            return Err(malformed(format!("unexpected `{c}` in `{source}`")));
        }

        rest = rest.trim_start();
    }

    Ok(tokens)
}

struct ExprParser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    offset: usize,
    source: &'a str,
}

impl ExprParser<'_> {
    fn error(&self, message: String) -> SyntaxError {
        let message = format!("{message} in `{}`", self.source.trim());
        SyntaxError::new(SyntaxErrorKind::MalformedExpression(message), self.offset)
    }

    fn peek_is(&self, ops: &[&str]) -> bool {
        match self.tokens.get(self.pos) {
            Some(Token::Op(op)) => ops.contains(op),
            Some(Token::Ident(word)) => ops.contains(&&**word),
            _ => false,
        }
    }

    fn or(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.and()?;
        while self.peek_is(&["||", "or"]) {
            self.pos += 1;
            expr = Expr::Or(Box::new(expr), Box::new(self.and()?));
        }

        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.not()?;
        while self.peek_is(&["&&", "and"]) {
            self.pos += 1;
            expr = Expr::And(Box::new(expr), Box::new(self.not()?));
        }

        Ok(expr)
    }

    fn not(&mut self) -> Result<Expr, SyntaxError> {
        if self.peek_is(&["!", "not"]) {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.not()?)));
        }

        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, SyntaxError> {
        let left = self.primary()?;
        let op = match self.tokens.get(self.pos) {
            Some(Token::Op("==" | "===")) => CompareOp::Eq,
            Some(Token::Op("!=" | "!==")) => CompareOp::Ne,
            Some(Token::Op("<")) => CompareOp::Lt,
            Some(Token::Op("<=")) => CompareOp::Le,
            Some(Token::Op(">")) => CompareOp::Gt,
            Some(Token::Op(">=")) => CompareOp::Ge,
            _ => return Ok(left),
        };

        self.pos += 1;
        let right = self.primary()?;
        Ok(Expr::Compare(Box::new(left), op, Box::new(right)))
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.tokens.get(self.pos).cloned()
            .ok_or_else(|| self.error("expression ends unexpectedly".into()))?;

        self.pos += 1;
        let expr = match token {
            Token::Str(s) => Expr::Literal(Value::String(s)),
            Token::Num(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                Expr::Literal(Value::from(n as i64))
            }
            Token::Num(n) => Expr::Literal(Value::from(n)),
            Token::Ident(word) => match &*word {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" => Expr::Literal(Value::Null),
                "and" | "or" | "not" => return Err(self.error(format!("unexpected `{word}`"))),
                _ => Expr::Path(word),
            },
            Token::Op("(") => {
                let inner = self.or()?;
                match self.tokens.get(self.pos) {
                    Some(Token::Op(")")) => self.pos += 1,
                    _ => return Err(self.error("missing `)`".into())),
                }

                inner
            }
            Token::Op(op) => return Err(self.error(format!("unexpected `{op}`"))),
        };

        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict;

    fn truth(source: &str, context: &Context<'_>) -> bool {
        Expr::parse(source, 0).unwrap().is_true(context)
    }

    #[test]
    fn parses_precedence() {
        let expr = Expr::parse("a or b and not c", 0).unwrap();
        let path = |p: &str| Box::new(Expr::Path(p.into()));
        assert_eq!(expr, Expr::Or(
            path("a"),
            Box::new(Expr::And(path("b"), Box::new(Expr::Not(path("c"))))),
        ));
    }

    #[test]
    fn evaluates_conditions() {
        let context = Context::new(dict! {
            "title" => "Hello",
            "count" => 3,
            "price" => "4.50",
            "empty" => "",
            "author" => dict! { "name" => "Ann", "admin" => true },
        });

        assert!(truth("title", &context));
        assert!(!truth("missing", &context));
        assert!(!truth("empty", &context));
        assert!(truth("title == 'Hello'", &context));
        assert!(truth("count > 2 && count <= 3", &context));
        assert!(truth("price < 5", &context));
        assert!(truth("count == '3'", &context));
        assert!(truth("author.admin and author.name != \"Bob\"", &context));
        assert!(truth("!(missing || empty)", &context));
        assert!(truth("missing == null", &context));
        assert!(!truth("missing > 0", &context));
        assert!(truth("title > 'Apple'", &context));
    }

    #[test]
    fn rejects_malformed_conditions() {
        for source in ["", "a ==", "(a", "a b", "'open", "a # b", "and"] {
            let err = Expr::parse(source, 7).unwrap_err();
            assert_eq!(err.offset, 7, "{source}");
            assert!(matches!(err.kind, SyntaxErrorKind::MalformedExpression(_)));
        }
    }
}
