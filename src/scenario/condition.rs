//! Edge conditions for scenario graphs.
//!
//! Conditions are small boolean expressions over the extracted data store:
//!
//! ```text
//! exists(name) and age >= 18
//! plan in ["basic", "pro"] or lower(answer) == "yes"
//! not missing(email) && len(email) > 3
//! ```
//!
//! Missing fields read as `null`. Evaluation never fails; type mismatches in
//! ordering comparisons are simply false.

use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

const MAX_NESTING_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("condition parse error at offset {offset}: {reason}")]
pub struct ConditionError {
    pub offset: usize,
    pub reason: String,
}

impl ConditionError {
    fn new(offset: usize, reason: impl Into<String>) -> Self {
        Self {
            offset,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Exists,
    Missing,
    Len,
    Lower,
    Contains,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "exists" => Some(Self::Exists),
            "missing" => Some(Self::Missing),
            "len" => Some(Self::Len),
            "lower" => Some(Self::Lower),
            "contains" => Some(Self::Contains),
            _ => None,
        }
    }

    fn arity(self) -> usize {
        match self {
            Self::Contains => 2,
            _ => 1,
        }
    }

    fn takes_field(self) -> bool {
        matches!(self, Self::Exists | Self::Missing)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    List(Vec<Expr>),
    Field(Vec<String>),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

/// A parsed condition together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    source: String,
    expr: Expr,
}

impl Condition {
    pub fn parse(source: &str) -> Result<Self, ConditionError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            end: source.len(),
            depth: 0,
        };
        let expr = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(ConditionError::new(
                token.offset,
                format!("unexpected {}", token.kind.describe()),
            ));
        }
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn evaluate(&self, data: &Map<String, Value>) -> bool {
        truthy(&eval(&self.expr, data))
    }

    /// Top-level field names this condition reads, in first-use order.
    pub fn referenced_fields(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_fields(&self.expr, &mut out);
        out
    }
}

fn collect_fields(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Field(path) => {
            if let Some(first) = path.first() {
                if !out.contains(first) {
                    out.push(first.clone());
                }
            }
        }
        Expr::Literal(_) => {}
        Expr::List(items) | Expr::And(items) | Expr::Or(items) => {
            items.iter().for_each(|item| collect_fields(item, out))
        }
        Expr::Not(inner) => collect_fields(inner, out),
        Expr::Compare { lhs, rhs, .. } => {
            collect_fields(lhs, out);
            collect_fields(rhs, out);
        }
        Expr::Call { args, .. } => args.iter().for_each(|arg| collect_fields(arg, out)),
    }
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn lookup_field<'a>(data: &'a Map<String, Value>, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = data.get(first)?;
    for segment in rest {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn eval(expr: &Expr, data: &Map<String, Value>) -> Value {
    match expr {
        Expr::Literal(value) => value.clone(),
        Expr::List(items) => Value::Array(items.iter().map(|item| eval(item, data)).collect()),
        Expr::Field(path) => lookup_field(data, path).cloned().unwrap_or(Value::Null),
        Expr::Not(inner) => Value::Bool(!truthy(&eval(inner, data))),
        Expr::And(terms) => Value::Bool(terms.iter().all(|term| truthy(&eval(term, data)))),
        Expr::Or(terms) => Value::Bool(terms.iter().any(|term| truthy(&eval(term, data)))),
        Expr::Compare { op, lhs, rhs } => {
            let lhs = eval(lhs, data);
            let rhs = eval(rhs, data);
            Value::Bool(compare(*op, &lhs, &rhs))
        }
        Expr::Call { function, args } => call(*function, args, data),
    }
}

fn call(function: Function, args: &[Expr], data: &Map<String, Value>) -> Value {
    match function {
        Function::Exists | Function::Missing => {
            let present = match args.first() {
                Some(Expr::Field(path)) => {
                    matches!(lookup_field(data, path), Some(value) if !value.is_null())
                }
                _ => false,
            };
            Value::Bool(if function == Function::Exists {
                present
            } else {
                !present
            })
        }
        Function::Len => match args.first().map(|arg| eval(arg, data)) {
            Some(Value::String(s)) => Value::from(s.chars().count()),
            Some(Value::Array(items)) => Value::from(items.len()),
            Some(Value::Object(map)) => Value::from(map.len()),
            Some(Value::Null) | None => Value::from(0),
            Some(_) => Value::Null,
        },
        Function::Lower => match args.first().map(|arg| eval(arg, data)) {
            Some(Value::String(s)) => Value::String(s.to_lowercase()),
            Some(other) => other,
            None => Value::Null,
        },
        Function::Contains => {
            let (Some(haystack), Some(needle)) = (args.first(), args.get(1)) else {
                return Value::Bool(false);
            };
            Value::Bool(contains(&eval(haystack, data), &eval(needle, data)))
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(_), Value::Number(_))
        | (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_)) => match (as_number(lhs), as_number(rhs)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        _ => lhs == rhs,
    }
}

fn ordering(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            as_number(lhs)?.partial_cmp(&as_number(rhs)?)
        }
        _ => None,
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::String(h), Value::String(n)) => h.contains(n.as_str()),
        (Value::Array(items), _) => items.iter().any(|item| values_equal(item, needle)),
        (Value::Object(map), Value::String(key)) => map.contains_key(key),
        _ => false,
    }
}

fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> bool {
    match op {
        CompareOp::Eq => values_equal(lhs, rhs),
        CompareOp::Ne => !values_equal(lhs, rhs),
        CompareOp::Lt => ordering(lhs, rhs) == Some(Ordering::Less),
        CompareOp::Le => matches!(ordering(lhs, rhs), Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Gt => ordering(lhs, rhs) == Some(Ordering::Greater),
        CompareOp::Ge => matches!(
            ordering(lhs, rhs),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOp::In => contains(rhs, lhs),
        CompareOp::NotIn => !contains(rhs, lhs),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Ident(String),
    Str(String),
    Num(f64),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    In,
    Is,
    Op(CompareOp),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("identifier `{name}`"),
            Self::Str(_) => "string literal".to_string(),
            Self::Num(_) => "number".to_string(),
            Self::True | Self::False => "boolean literal".to_string(),
            Self::Null => "`null`".to_string(),
            Self::And => "`and`".to_string(),
            Self::Or => "`or`".to_string(),
            Self::Not => "`not`".to_string(),
            Self::In => "`in`".to_string(),
            Self::Is => "`is`".to_string(),
            Self::Op(_) => "comparison operator".to_string(),
            Self::LParen => "`(`".to_string(),
            Self::RParen => "`)`".to_string(),
            Self::LBracket => "`[`".to_string(),
            Self::RBracket => "`]`".to_string(),
            Self::Comma => "`,`".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn tokenize(source: &str) -> Result<Vec<Token>, ConditionError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let ch = bytes[i];
        let start = i;
        if ch.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let two = source.get(i..i + 2).unwrap_or("");
        let kind = match two {
            "==" => Some(TokenKind::Op(CompareOp::Eq)),
            "!=" => Some(TokenKind::Op(CompareOp::Ne)),
            "<=" => Some(TokenKind::Op(CompareOp::Le)),
            ">=" => Some(TokenKind::Op(CompareOp::Ge)),
            "&&" => Some(TokenKind::And),
            "||" => Some(TokenKind::Or),
            _ => None,
        };
        if let Some(kind) = kind {
            tokens.push(Token {
                kind,
                offset: start,
            });
            i += 2;
            continue;
        }

        let single = match ch {
            b'<' => Some(TokenKind::Op(CompareOp::Lt)),
            b'>' => Some(TokenKind::Op(CompareOp::Gt)),
            b'!' => Some(TokenKind::Not),
            b'(' => Some(TokenKind::LParen),
            b')' => Some(TokenKind::RParen),
            b'[' => Some(TokenKind::LBracket),
            b']' => Some(TokenKind::RBracket),
            b',' => Some(TokenKind::Comma),
            _ => None,
        };
        if let Some(kind) = single {
            tokens.push(Token {
                kind,
                offset: start,
            });
            i += 1;
            continue;
        }

        if ch == b'=' {
            return Err(ConditionError::new(start, "use `==` for equality"));
        }

        if ch == b'"' || ch == b'\'' {
            let (text, next) = lex_string(source, start)?;
            tokens.push(Token {
                kind: TokenKind::Str(text),
                offset: start,
            });
            i = next;
            continue;
        }

        if ch.is_ascii_digit()
            || (ch == b'-' && bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit()))
        {
            i += 1;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            let raw = &source[start..i];
            let value = raw
                .parse::<f64>()
                .map_err(|_| ConditionError::new(start, format!("invalid number `{raw}`")))?;
            tokens.push(Token {
                kind: TokenKind::Num(value),
                offset: start,
            });
            continue;
        }

        let first = source[start..].chars().next().unwrap_or('\0');
        if is_ident_start(first) {
            i = source[start..]
                .char_indices()
                .find(|(_, c)| !is_ident_continue(*c) && *c != '.')
                .map(|(idx, _)| start + idx)
                .unwrap_or(source.len());
            let word = &source[start..i];
            let kind = match word {
                "and" => TokenKind::And,
                "or" => TokenKind::Or,
                "not" => TokenKind::Not,
                "in" => TokenKind::In,
                "is" => TokenKind::Is,
                "true" | "True" => TokenKind::True,
                "false" | "False" => TokenKind::False,
                "null" | "None" => TokenKind::Null,
                _ => {
                    if word.split('.').any(str::is_empty) {
                        return Err(ConditionError::new(
                            start,
                            format!("invalid field path `{word}`"),
                        ));
                    }
                    TokenKind::Ident(word.to_string())
                }
            };
            tokens.push(Token {
                kind,
                offset: start,
            });
            continue;
        }

        return Err(ConditionError::new(
            start,
            format!("unexpected character `{first}`"),
        ));
    }

    Ok(tokens)
}

fn lex_string(source: &str, start: usize) -> Result<(String, usize), ConditionError> {
    let mut chars = source[start..].char_indices();
    let Some((_, quote)) = chars.next() else {
        return Err(ConditionError::new(start, "expected string"));
    };
    let mut out = String::new();
    while let Some((idx, ch)) = chars.next() {
        if ch == quote {
            return Ok((out, start + idx + ch.len_utf8()));
        }
        if ch == '\\' {
            let Some((_, escaped)) = chars.next() else {
                break;
            };
            out.push(match escaped {
                'n' => '\n',
                't' => '\t',
                other => other,
            });
            continue;
        }
        out.push(ch);
    }
    Err(ConditionError::new(start, "unterminated string literal"))
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_keyword(word: &str) -> bool {
    matches!(
        word,
        "and" | "or" | "not" | "in" | "is" | "true" | "True" | "false" | "False" | "null" | "None"
    )
}

/// Whether `name` can be written as a field in a condition.
pub fn is_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_ident_start)
        && chars.all(is_ident_continue)
        && !is_keyword(name)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|token| &token.kind)
    }

    fn peek_kind_at(&self, ahead: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + ahead).map(|token| &token.kind)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn offset(&self) -> usize {
        self.peek().map(|token| token.offset).unwrap_or(self.end)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), ConditionError> {
        match self.next() {
            Some(token) if token.kind == kind => Ok(()),
            Some(token) => Err(ConditionError::new(
                token.offset,
                format!("expected {what}, found {}", token.kind.describe()),
            )),
            None => Err(ConditionError::new(
                self.end,
                format!("expected {what}, found end of input"),
            )),
        }
    }

    /// Runs `parse` one nesting level deeper, refusing to go past the limit.
    fn nested<T>(
        &mut self,
        offset: usize,
        parse: impl FnOnce(&mut Self) -> Result<T, ConditionError>,
    ) -> Result<T, ConditionError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ConditionError::new(offset, "expression nested too deeply"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_or(&mut self) -> Result<Expr, ConditionError> {
        let mut terms = vec![self.parse_and()?];
        while self.peek_kind() == Some(&TokenKind::Or) {
            self.pos += 1;
            terms.push(self.parse_and()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::Or(terms)
        })
    }

    fn parse_and(&mut self) -> Result<Expr, ConditionError> {
        let mut terms = vec![self.parse_not()?];
        while self.peek_kind() == Some(&TokenKind::And) {
            self.pos += 1;
            terms.push(self.parse_not()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::And(terms)
        })
    }

    fn parse_not(&mut self) -> Result<Expr, ConditionError> {
        if self.peek_kind() == Some(&TokenKind::Not) {
            let offset = self.offset();
            self.pos += 1;
            let inner = self.nested(offset, Self::parse_not)?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ConditionError> {
        let lhs = self.parse_primary()?;
        let op = match self.peek_kind() {
            Some(TokenKind::Op(op)) => {
                let op = *op;
                self.pos += 1;
                op
            }
            Some(TokenKind::In) => {
                self.pos += 1;
                CompareOp::In
            }
            Some(TokenKind::Not) if self.peek_kind_at(1) == Some(&TokenKind::In) => {
                self.pos += 2;
                CompareOp::NotIn
            }
            Some(TokenKind::Is) => {
                self.pos += 1;
                if self.peek_kind() == Some(&TokenKind::Not) {
                    self.pos += 1;
                    CompareOp::Ne
                } else {
                    CompareOp::Eq
                }
            }
            _ => return Ok(lhs),
        };
        let rhs = self.parse_primary()?;
        Ok(Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, ConditionError> {
        let offset = self.offset();
        let Some(token) = self.next() else {
            return Err(ConditionError::new(offset, "unexpected end of input"));
        };
        match token.kind {
            TokenKind::True => Ok(Expr::Literal(Value::Bool(true))),
            TokenKind::False => Ok(Expr::Literal(Value::Bool(false))),
            TokenKind::Null => Ok(Expr::Literal(Value::Null)),
            TokenKind::Str(text) => Ok(Expr::Literal(Value::String(text))),
            TokenKind::Num(value) => Ok(Expr::Literal(number_value(value))),
            TokenKind::LParen => self.nested(token.offset, |parser| {
                let inner = parser.parse_or()?;
                parser.expect(TokenKind::RParen, "`)`")?;
                Ok(inner)
            }),
            TokenKind::LBracket => self.nested(token.offset, Self::parse_list),
            TokenKind::Ident(name) => {
                if self.peek_kind() == Some(&TokenKind::LParen) {
                    self.pos += 1;
                    return self.nested(token.offset, |parser| {
                        parser.parse_call(&name, token.offset)
                    });
                }
                Ok(Expr::Field(name.split('.').map(str::to_string).collect()))
            }
            other => Err(ConditionError::new(
                token.offset,
                format!("unexpected {}", other.describe()),
            )),
        }
    }

    fn parse_list(&mut self) -> Result<Expr, ConditionError> {
        let mut items = Vec::new();
        if self.peek_kind() == Some(&TokenKind::RBracket) {
            self.pos += 1;
            return Ok(Expr::List(items));
        }
        loop {
            items.push(self.parse_primary()?);
            match self.peek_kind() {
                Some(TokenKind::Comma) => self.pos += 1,
                _ => break,
            }
        }
        self.expect(TokenKind::RBracket, "`]`")?;
        Ok(Expr::List(items))
    }

    fn parse_call(&mut self, name: &str, offset: usize) -> Result<Expr, ConditionError> {
        let function = Function::lookup(name)
            .ok_or_else(|| ConditionError::new(offset, format!("unknown function `{name}`")))?;
        let mut args = Vec::new();
        if self.peek_kind() != Some(&TokenKind::RParen) {
            loop {
                args.push(self.parse_or()?);
                match self.peek_kind() {
                    Some(TokenKind::Comma) => self.pos += 1,
                    _ => break,
                }
            }
        }
        self.expect(TokenKind::RParen, "`)`")?;

        if args.len() != function.arity() {
            return Err(ConditionError::new(
                offset,
                format!(
                    "`{name}` takes {} argument(s), found {}",
                    function.arity(),
                    args.len()
                ),
            ));
        }
        if function.takes_field() && !matches!(args.first(), Some(Expr::Field(_))) {
            return Err(ConditionError::new(
                offset,
                format!("`{name}` expects a field name"),
            ));
        }
        Ok(Expr::Call { function, args })
    }
}

fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::Number(Number::from(value as i64))
    } else {
        Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    fn check(source: &str, store: &Map<String, Value>) -> bool {
        Condition::parse(source).expect("parse").evaluate(store)
    }

    #[test]
    fn existence_checks_treat_null_as_unset() {
        let store = data(json!({"name": "Dana", "age": null}));
        assert!(check("exists(name)", &store));
        assert!(!check("exists(age)", &store));
        assert!(check("missing(age) and missing(email)", &store));
        assert!(check("name is not null", &store));
        assert!(check("age is None", &store));
    }

    #[test]
    fn comparisons_coerce_numeric_strings() {
        let store = data(json!({"age": "21", "score": 7.5}));
        assert!(check("age >= 18", &store));
        assert!(check("age == 21", &store));
        assert!(check("score < 8 && score > 7", &store));
        assert!(!check("age < \"abc\"", &store));
        assert!(!check("missing_field > 3", &store));
    }

    #[test]
    fn membership_and_functions() {
        let store = data(json!({
            "plan": "Pro",
            "tags": ["vip", "beta"],
            "address": {"city": "Haifa"}
        }));
        assert!(check("lower(plan) in ['basic', 'pro']", &store));
        assert!(check("'vip' in tags", &store));
        assert!(check("'gold' not in tags", &store));
        assert!(check("contains(address.city, 'ai')", &store));
        assert!(check("len(tags) == 2", &store));
        assert!(check("address.city == \"Haifa\"", &store));
        assert!(!check("address.zip", &store));
    }

    #[test]
    fn precedence_is_not_then_and_then_or() {
        let store = data(json!({"a": true, "b": false, "c": false}));
        assert!(check("a or b and c", &store));
        assert!(!check("(a or b) and c", &store));
        assert!(check("not b and a", &store));
        assert!(check("!(b || c)", &store));
    }

    #[test]
    fn truthiness_follows_empty_values() {
        let store = data(json!({"empty": "", "zero": 0, "list": [], "text": "x"}));
        assert!(!check("empty", &store));
        assert!(!check("zero", &store));
        assert!(!check("list", &store));
        assert!(check("text", &store));
    }

    #[test]
    fn parse_errors_carry_offsets() {
        let err = Condition::parse("name = 'x'").expect_err("single equals");
        assert_eq!(err.offset, 5);

        let err = Condition::parse("exists(name").expect_err("unclosed call");
        assert_eq!(err.offset, 11);

        let err = Condition::parse("eval(name)").expect_err("unknown fn");
        assert!(err.reason.contains("unknown function `eval`"));

        let err = Condition::parse("exists('name')").expect_err("field arg");
        assert!(err.reason.contains("expects a field name"));

        let err = Condition::parse("a b").expect_err("trailing");
        assert_eq!(err.offset, 2);

        assert!(Condition::parse("'open").is_err());
        assert!(Condition::parse("a..b").is_err());
        assert!(Condition::parse("__import__('os')").is_err());
    }

    #[test]
    fn referenced_fields_are_unique_and_ordered() {
        let condition = Condition::parse("exists(name) and (age > 3 or name == 'x') and order.size")
            .expect("parse");
        assert_eq!(
            condition.referenced_fields(),
            vec!["name".to_string(), "age".to_string(), "order".to_string()]
        );
    }

    #[test]
    fn deep_nesting_is_a_parse_error() {
        let deep = format!("{}true{}", "(".repeat(200_000), ")".repeat(200_000));
        let err = Condition::parse(&deep).expect_err("too deep");
        assert_eq!(err.reason, "expression nested too deeply");
        assert_eq!(err.offset, MAX_NESTING_DEPTH);

        let nots = format!("{}true", "not ".repeat(10_000));
        assert!(Condition::parse(&nots).is_err());
        let lists = format!("x in {}1{}", "[".repeat(10_000), "]".repeat(10_000));
        assert!(Condition::parse(&lists).is_err());

        let shallow = format!("{}true{}", "(".repeat(20), ")".repeat(20));
        assert!(check(&shallow, &Map::new()));
    }

    #[test]
    fn long_flat_chains_evaluate() {
        let chain = vec!["exists(a)"; 20_000].join(" and ");
        assert!(check(&chain, &data(json!({"a": 1}))));
        let chain = vec!["missing(a)"; 20_000].join(" or ");
        assert!(!check(&chain, &data(json!({"a": 1}))));
    }

    #[test]
    fn unicode_field_names_are_identifiers() {
        let store = data(json!({"שם": "דנה", "prénom": "Zoé"}));
        assert!(check("exists(שם) and prénom == 'Zoé'", &store));
        assert_eq!(
            Condition::parse("שם != null").expect("parse").referenced_fields(),
            vec!["שם".to_string()]
        );
        assert!(is_field_name("phone_number"));
        assert!(is_field_name("שם"));
        assert!(!is_field_name("phone number"));
        assert!(!is_field_name("order.size"));
        assert!(!is_field_name("2fa"));
        assert!(!is_field_name("not"));
        assert!(!is_field_name(""));
    }
}
