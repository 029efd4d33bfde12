//! Sandboxed expression language for gate nodes
//!
//! Expressions are parsed into an AST once and evaluated against the
//! incoming payload and the shared context. There is no way to call
//! functions or touch anything outside those two sources.
//!
//! ```text
//! payload.status == 200 && (retries < 3 or not payload.cached)
//! ```
//!
//! The root identifier `payload` names the incoming payload. Any other root
//! names a context field; dotted paths are matched against the longest
//! context key that exists, so `n1.meta.gate` reads the key of that name
//! while `settings.limit` reads field `limit` of key `settings`.

use std::collections::HashMap;
use std::fmt;

use serde_json::{Number, Value};

use crate::context::ExecutionContext;
use crate::error::ExpressionError;
use crate::types::Payload;

type ExprResult<T> = std::result::Result<T, ExpressionError>;

/// Values resolved from the context, keyed by context key
pub type Scope = HashMap<String, Value>;

const PAYLOAD_ROOT: &str = "payload";

/// Nesting limit for parentheses and prefix operators
const MAX_DEPTH: usize = 64;
/// Operator limit; bounds the depth of left-associative chains
const MAX_OPERATORS: usize = 256;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
    End,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::Ident(s) => f.write_str(s),
            Token::Punct(p) => f.write_str(p),
            Token::End => f.write_str("end of input"),
        }
    }
}

// Longest operators first so "<=" wins over "<"
const PUNCTUATION: &[&str] = &[
    "==", "!=", "<=", ">=", "&&", "||", "<", ">", "!", "+", "-", "*", "/", "%", "(", ")", "[",
    "]", ".",
];

fn tokenize(source: &str) -> ExprResult<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    'outer: while i < chars.len() {
        let ch = chars[i];
        if ch.is_whitespace() {
            i += 1;
            continue;
        }

        if ch.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let n = text
                .parse::<f64>()
                .map_err(|_| ExpressionError::UnexpectedChar { ch, pos: start })?;
            tokens.push(Token::Number(n));
            continue;
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }

        if ch == '"' || ch == '\'' {
            let start = i;
            let mut text = String::new();
            i += 1;
            while i < chars.len() {
                match chars[i] {
                    c if c == ch => {
                        tokens.push(Token::Str(text));
                        i += 1;
                        continue 'outer;
                    }
                    '\\' if i + 1 < chars.len() => {
                        text.push(match chars[i + 1] {
                            'n' => '\n',
                            't' => '\t',
                            other => other,
                        });
                        i += 2;
                    }
                    c => {
                        text.push(c);
                        i += 1;
                    }
                }
            }
            return Err(ExpressionError::UnterminatedString(start));
        }

        for punct in PUNCTUATION {
            let len = punct.len();
            if i + len <= chars.len() && chars[i..i + len].iter().copied().eq(punct.chars()) {
                tokens.push(Token::Punct(punct));
                i += len;
                continue 'outer;
            }
        }

        return Err(ExpressionError::UnexpectedChar { ch, pos: i });
    }

    tokens.push(Token::End);
    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Field(String),
    Index(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Path { root: String, segments: Vec<Segment> },
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    operators: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            operators: 0,
        }
    }

    /// Run `parse` one nesting level deeper
    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> ExprResult<Expr>) -> ExprResult<Expr> {
        if self.depth >= MAX_DEPTH {
            return Err(ExpressionError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Count one operator node
    fn operator(&mut self) -> ExprResult<()> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(ExpressionError::TooLong(MAX_OPERATORS));
        }
        Ok(())
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::End)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if matches!(self.peek(), Token::Punct(p) if *p == punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Token::Ident(s) if s == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &'static str) -> ExprResult<()> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", punct)))
        }
    }

    fn unexpected(&self, expected: &str) -> ExpressionError {
        ExpressionError::UnexpectedToken {
            found: self.peek().to_string(),
            expected: expected.to_string(),
        }
    }

    fn parse_or(&mut self) -> ExprResult<Expr> {
        let mut left = self.parse_and()?;
        while self.eat_punct("||") || self.eat_keyword("or") {
            self.operator()?;
            let right = self.parse_and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ExprResult<Expr> {
        let mut left = self.parse_not()?;
        while self.eat_punct("&&") || self.eat_keyword("and") {
            self.operator()?;
            let right = self.parse_not()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> ExprResult<Expr> {
        if self.eat_punct("!") || self.eat_keyword("not") {
            self.operator()?;
            let inner = self.nested(Self::parse_not)?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> ExprResult<Expr> {
        let left = self.parse_additive()?;
        let op = match self.peek() {
            Token::Punct("==") => BinaryOp::Eq,
            Token::Punct("!=") => BinaryOp::Ne,
            Token::Punct("<") => BinaryOp::Lt,
            Token::Punct("<=") => BinaryOp::Le,
            Token::Punct(">") => BinaryOp::Gt,
            Token::Punct(">=") => BinaryOp::Ge,
            _ => return Ok(left),
        };
        self.advance();
        self.operator()?;
        let right = self.parse_additive()?;
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn parse_additive(&mut self) -> ExprResult<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Token::Punct("+") => BinaryOp::Add,
                Token::Punct("-") => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            self.operator()?;
            let right = self.parse_term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_term(&mut self) -> ExprResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Punct("*") => BinaryOp::Mul,
                Token::Punct("/") => BinaryOp::Div,
                Token::Punct("%") => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.advance();
            self.operator()?;
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> ExprResult<Expr> {
        if self.eat_punct("-") {
            self.operator()?;
            let inner = self.nested(Self::parse_unary)?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ExprResult<Expr> {
        match self.advance() {
            Token::Number(n) => Ok(Expr::Literal(number(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" => Ok(Expr::Literal(Value::Null)),
                _ => self.parse_path(name),
            },
            Token::Punct("(") => {
                let inner = self.nested(Self::parse_or)?;
                self.expect_punct(")")?;
                Ok(inner)
            }
            other => Err(ExpressionError::UnexpectedToken {
                found: other.to_string(),
                expected: "value".to_string(),
            }),
        }
    }

    fn parse_path(&mut self, root: String) -> ExprResult<Expr> {
        let mut segments = Vec::new();
        loop {
            if self.eat_punct(".") {
                match self.advance() {
                    Token::Ident(field) => segments.push(Segment::Field(field)),
                    other => {
                        return Err(ExpressionError::UnexpectedToken {
                            found: other.to_string(),
                            expected: "field name".to_string(),
                        })
                    }
                }
            } else if self.eat_punct("[") {
                match self.advance() {
                    Token::Number(n) if n >= 0.0 && n.fract() == 0.0 => {
                        segments.push(Segment::Index(n as usize))
                    }
                    other => {
                        return Err(ExpressionError::UnexpectedToken {
                            found: other.to_string(),
                            expected: "array index".to_string(),
                        })
                    }
                }
                self.expect_punct("]")?;
            } else {
                return Ok(Expr::Path { root, segments });
            }
        }
    }
}

/// A parsed gate expression
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    /// Parse an expression
    pub fn parse(source: &str) -> ExprResult<Self> {
        let mut parser = Parser::new(tokenize(source)?);
        let ast = parser.parse_or()?;
        if *parser.peek() != Token::End {
            return Err(parser.unexpected("end of input"));
        }
        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    /// The text this expression was parsed from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Context keys this expression may read, longest candidates first
    pub fn context_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        collect_keys(&self.ast, &mut keys);
        keys
    }

    /// Fetch every context value this expression may read
    pub async fn resolve_scope(&self, context: &ExecutionContext) -> Scope {
        let mut scope = Scope::new();
        for key in self.context_keys() {
            if scope.contains_key(&key) {
                continue;
            }
            if let Some(value) = context.get_value(&key).await {
                scope.insert(key, value);
            }
        }
        scope
    }

    /// Evaluate against a payload and a pre-resolved scope
    pub fn evaluate_with(&self, payload: &Payload, scope: &Scope) -> ExprResult<Value> {
        eval(&self.ast, payload, scope)
    }

    /// Evaluate against a payload and the shared context
    pub async fn evaluate(&self, payload: &Payload, context: &ExecutionContext) -> ExprResult<Value> {
        let scope = self.resolve_scope(context).await;
        self.evaluate_with(payload, &scope)
    }

    /// Evaluate and reduce the result to a boolean
    pub async fn test(&self, payload: &Payload, context: &ExecutionContext) -> ExprResult<bool> {
        Ok(is_truthy(&self.evaluate(payload, context).await?))
    }
}

/// Truthiness: `null`, `false`, `0`, `""` and empty arrays/objects are false
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Candidate context keys for a path: `root.a.b`, `root.a`, `root`
fn candidate_keys(root: &str, segments: &[Segment]) -> Vec<(String, usize)> {
    let fields = segments
        .iter()
        .take_while(|s| matches!(s, Segment::Field(_)))
        .count();

    let mut candidates = Vec::with_capacity(fields + 1);
    let mut key = root.to_string();
    candidates.push((key.clone(), 0));
    for (i, segment) in segments.iter().take(fields).enumerate() {
        if let Segment::Field(name) = segment {
            key.push('.');
            key.push_str(name);
            candidates.push((key.clone(), i + 1));
        }
    }
    candidates.reverse();
    candidates
}

fn collect_keys(expr: &Expr, keys: &mut Vec<String>) {
    match expr {
        Expr::Literal(_) => {}
        Expr::Path { root, segments } => {
            if root != PAYLOAD_ROOT {
                keys.extend(candidate_keys(root, segments).into_iter().map(|(k, _)| k));
            }
        }
        Expr::Not(inner) | Expr::Neg(inner) => collect_keys(inner, keys),
        Expr::Binary(_, left, right) => {
            collect_keys(left, keys);
            collect_keys(right, keys);
        }
    }
}

fn walk(mut value: &Value, segments: &[Segment]) -> Value {
    for segment in segments {
        let next = match (segment, value) {
            (Segment::Field(name), Value::Object(map)) => map.get(name),
            (Segment::Index(i), Value::Array(items)) => items.get(*i),
            _ => None,
        };
        match next {
            Some(v) => value = v,
            None => return Value::Null,
        }
    }
    value.clone()
}

fn lookup(root: &str, segments: &[Segment], payload: &Payload, scope: &Scope) -> Value {
    if root == PAYLOAD_ROOT {
        return walk(payload, segments);
    }
    candidate_keys(root, segments)
        .into_iter()
        .find_map(|(key, consumed)| scope.get(&key).map(|v| walk(v, &segments[consumed..])))
        .unwrap_or(Value::Null)
}

fn eval(expr: &Expr, payload: &Payload, scope: &Scope) -> ExprResult<Value> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Path { root, segments } => Ok(lookup(root, segments, payload, scope)),
        Expr::Not(inner) => Ok(Value::Bool(!is_truthy(&eval(inner, payload, scope)?))),
        Expr::Neg(inner) => {
            let value = eval(inner, payload, scope)?;
            match value.as_f64() {
                Some(n) => Ok(number(-n)),
                None => Err(ExpressionError::TypeMismatch {
                    op: "-".to_string(),
                    left: "nothing".to_string(),
                    right: type_name(&value).to_string(),
                }),
            }
        }
        Expr::Binary(BinaryOp::Or, left, right) => {
            if is_truthy(&eval(left, payload, scope)?) {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(is_truthy(&eval(right, payload, scope)?)))
        }
        Expr::Binary(BinaryOp::And, left, right) => {
            if !is_truthy(&eval(left, payload, scope)?) {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(is_truthy(&eval(right, payload, scope)?)))
        }
        Expr::Binary(op, left, right) => {
            let left = eval(left, payload, scope)?;
            let right = eval(right, payload, scope)?;
            apply(*op, &left, &right)
        }
    }
}

fn apply(op: BinaryOp, left: &Value, right: &Value) -> ExprResult<Value> {
    let mismatch = || ExpressionError::TypeMismatch {
        op: op.symbol().to_string(),
        left: type_name(left).to_string(),
        right: type_name(right).to_string(),
    };

    match op {
        BinaryOp::Eq => Ok(Value::Bool(loose_eq(left, right))),
        BinaryOp::Ne => Ok(Value::Bool(!loose_eq(left, right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (left, right) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => match (left.as_f64(), right.as_f64()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    _ => return Err(mismatch()),
                },
            };
            let Some(ordering) = ordering else {
                return Ok(Value::Bool(false));
            };
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinaryOp::Add if left.is_string() || right.is_string() => {
            Ok(Value::String(format!("{}{}", as_text(left), as_text(right))))
        }
        _ => {
            let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
                return Err(mismatch());
            };
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div | BinaryOp::Rem if b == 0.0 => {
                    return Err(ExpressionError::DivisionByZero)
                }
                BinaryOp::Div => a / b,
                BinaryOp::Rem => a % b,
                _ => return Err(mismatch()),
            };
            Ok(number(result))
        }
    }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => left == right,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Integral results stay integers so `1 + 1` serializes as `2`
fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}
