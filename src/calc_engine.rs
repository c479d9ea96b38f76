use std::fmt;

#[derive(Debug, PartialEq)]
pub enum Token {
    Number(Value),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    DoubleStar,
    DoubleSlash,
    LParen,
    RParen,
    Ident(String),
}

/// A numeric result. Integer literals stay `Int`; any float operand, true
/// division, a negative or fractional exponent, or integer overflow promotes
/// to `Float`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    FloorDiv,
    Pow,
}

/// The restricted syntax tree. These three shapes are the whole grammar:
/// anything else the parser sees fails closed.
#[derive(Debug, PartialEq)]
pub enum Expr {
    Number(Value),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, PartialEq)]
pub enum EvalError {
    Syntax(String),
    Unsupported(String),
    DivisionByZero,
    Arithmetic(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Syntax(msg) => write!(f, "Syntax error: {}", msg),
            EvalError::Unsupported(what) => write!(f, "Unsupported expression: {}", what),
            EvalError::DivisionByZero => write!(f, "Division by zero"),
            EvalError::Arithmetic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for EvalError {}

pub fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            '+' => {
                tokens.push(Token::Plus);
                chars.next();
            }
            '-' => {
                tokens.push(Token::Minus);
                chars.next();
            }
            '%' => {
                tokens.push(Token::Percent);
                chars.next();
            }
            '*' => {
                chars.next();
                if chars.peek() == Some(&'*') {
                    chars.next();
                    tokens.push(Token::DoubleStar);
                } else {
                    tokens.push(Token::Star);
                }
            }
            '/' => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    tokens.push(Token::DoubleSlash);
                } else {
                    tokens.push(Token::Slash);
                }
            }
            '0'..='9' | '.' => {
                let mut num_str = String::new();
                let mut has_dot = false;
                let mut has_exp = false;

                while let Some(&ch) = chars.peek() {
                    match ch {
                        '.' if has_dot => break,
                        '.' => {
                            has_dot = true;
                            num_str.push(ch);
                            chars.next();
                        }
                        'e' | 'E' if !has_exp => {
                            has_exp = true;
                            num_str.push(ch);
                            chars.next();

                            if let Some(&next_ch) = chars.peek() {
                                if next_ch == '+' || next_ch == '-' {
                                    num_str.push(next_ch);
                                    chars.next();
                                }
                            }
                        }
                        '0'..='9' => {
                            num_str.push(ch);
                            chars.next();
                        }
                        _ => break,
                    }
                }

                tokens.push(Token::Number(parse_number(&num_str, has_dot || has_exp)?));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            _ => return Err(EvalError::Syntax(format!("Unknown character: '{}'", c))),
        }
    }
    Ok(tokens)
}

fn parse_number(num_str: &str, fractional: bool) -> Result<Value, EvalError> {
    if !fractional {
        if let Ok(n) = num_str.parse::<i64>() {
            return Ok(Value::Int(n));
        }
        // Integer literals too large for i64 are read as floats.
    }
    num_str
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| EvalError::Syntax(format!("Invalid number: '{}'", num_str)))
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, current: 0 }
    }

    pub fn parse(&mut self) -> Result<Expr, EvalError> {
        let expr = self.expr()?;
        if self.current < self.tokens.len() {
            return Err(EvalError::Syntax(
                "Unexpected tokens at end of expression".to_string(),
            ));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn expr(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.term()?;

        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.current += 1;
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.unary()?;

        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Mod,
                Some(Token::DoubleSlash) => BinOp::FloorDiv,
                _ => break,
            };
            self.current += 1;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    // `**` binds tighter than unary minus, so -2**2 is -(2**2), while the
    // exponent itself may carry a sign: 2**-3.
    fn unary(&mut self) -> Result<Expr, EvalError> {
        match self.peek() {
            Some(Token::Plus) => {
                self.current += 1;
                self.unary()
            }
            Some(Token::Minus) => {
                self.current += 1;
                let operand = self.unary()?;
                Ok(Expr::Unary(UnaryOp::Negate, Box::new(operand)))
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, EvalError> {
        let base = self.primary()?;

        if self.peek() == Some(&Token::DoubleStar) {
            self.current += 1;
            // Right-associative: the exponent re-enters unary.
            let exponent = self.unary()?;
            Ok(Expr::Binary(
                BinOp::Pow,
                Box::new(base),
                Box::new(exponent),
            ))
        } else {
            Ok(base)
        }
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        match self.tokens.get(self.current) {
            None => Err(EvalError::Syntax(
                "Unexpected end of expression".to_string(),
            )),
            Some(Token::Number(v)) => {
                let v = *v;
                self.current += 1;
                Ok(Expr::Number(v))
            }
            Some(Token::LParen) => {
                self.current += 1;
                let expr = self.expr()?;
                if self.peek() == Some(&Token::RParen) {
                    self.current += 1;
                    Ok(expr)
                } else {
                    Err(EvalError::Syntax("Missing closing parenthesis".to_string()))
                }
            }
            Some(Token::Ident(name)) => Err(EvalError::Unsupported(format!("'{}'", name))),
            Some(_) => Err(EvalError::Syntax("Unexpected token".to_string())),
        }
    }
}

/// Reduces a syntax tree bottom-up. The match is closed over the three node
/// shapes and the fixed operator set; no operator outside these arms is
/// reachable.
pub fn reduce(node: &Expr) -> Result<Value, EvalError> {
    match node {
        Expr::Number(v) => Ok(*v),
        Expr::Unary(UnaryOp::Negate, operand) => Ok(reduce(operand)?.negate()),
        Expr::Binary(op, left, right) => {
            let l = reduce(left)?;
            let r = reduce(right)?;
            match op {
                BinOp::Add => Ok(l.add(r)),
                BinOp::Sub => Ok(l.sub(r)),
                BinOp::Mul => Ok(l.mul(r)),
                BinOp::Div => l.div(r),
                BinOp::Mod => l.modulo(r),
                BinOp::FloorDiv => l.floor_div(r),
                BinOp::Pow => l.pow(r),
            }
        }
    }
}

/// Evaluates one expression string: tokenize, parse, reduce. Pure; every call
/// builds and discards its own tree.
pub fn evaluate(input: &str) -> Result<Value, EvalError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(EvalError::Syntax("Empty expression".to_string()));
    }
    let tree = Parser::new(tokens).parse()?;
    reduce(&tree)
}

impl Value {
    fn as_f64(self) -> f64 {
        match self {
            Value::Int(n) => n as f64,
            Value::Float(x) => x,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Value::Int(n) => n == 0,
            Value::Float(x) => x == 0.0,
        }
    }

    fn negate(self) -> Value {
        match self {
            Value::Int(n) => n
                .checked_neg()
                .map(Value::Int)
                .unwrap_or(Value::Float(-(n as f64))),
            Value::Float(x) => Value::Float(-x),
        }
    }

    fn add(self, rhs: Value) -> Value {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(b)
                .map(Value::Int)
                .unwrap_or(Value::Float(a as f64 + b as f64)),
            (l, r) => Value::Float(l.as_f64() + r.as_f64()),
        }
    }

    fn sub(self, rhs: Value) -> Value {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_sub(b)
                .map(Value::Int)
                .unwrap_or(Value::Float(a as f64 - b as f64)),
            (l, r) => Value::Float(l.as_f64() - r.as_f64()),
        }
    }

    fn mul(self, rhs: Value) -> Value {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_mul(b)
                .map(Value::Int)
                .unwrap_or(Value::Float(a as f64 * b as f64)),
            (l, r) => Value::Float(l.as_f64() * r.as_f64()),
        }
    }

    // True division always yields a fractional-capable result.
    fn div(self, rhs: Value) -> Result<Value, EvalError> {
        if rhs.is_zero() {
            return Err(EvalError::DivisionByZero);
        }
        Ok(Value::Float(self.as_f64() / rhs.as_f64()))
    }

    // Floor division truncates toward negative infinity: -7 // 2 == -4.
    fn floor_div(self, rhs: Value) -> Result<Value, EvalError> {
        if rhs.is_zero() {
            return Err(EvalError::DivisionByZero);
        }
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => match a.checked_div(b) {
                Some(mut q) => {
                    if a % b != 0 && (a < 0) != (b < 0) {
                        q -= 1;
                    }
                    Ok(Value::Int(q))
                }
                // i64::MIN // -1 overflows.
                None => Ok(Value::Float(-(i64::MIN as f64))),
            },
            (l, r) => Ok(Value::Float((l.as_f64() / r.as_f64()).floor())),
        }
    }

    // Modulo takes the sign of the divisor: 7 % -2 == -1, -7 % 2 == 1.
    fn modulo(self, rhs: Value) -> Result<Value, EvalError> {
        if rhs.is_zero() {
            return Err(EvalError::DivisionByZero);
        }
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => match a.checked_rem(b) {
                Some(mut r) => {
                    if r != 0 && (r < 0) != (b < 0) {
                        r += b;
                    }
                    Ok(Value::Int(r))
                }
                // i64::MIN % -1 overflows checked_rem; the remainder is 0.
                None => Ok(Value::Int(0)),
            },
            (l, r) => {
                let (a, b) = (l.as_f64(), r.as_f64());
                Ok(Value::Float(a - b * (a / b).floor()))
            }
        }
    }

    fn pow(self, rhs: Value) -> Result<Value, EvalError> {
        let exponent_negative = match rhs {
            Value::Int(n) => n < 0,
            Value::Float(x) => x < 0.0,
        };
        if self.is_zero() && exponent_negative {
            return Err(EvalError::Arithmetic(
                "Zero cannot be raised to a negative power".to_string(),
            ));
        }

        if let (Value::Int(a), Value::Int(b)) = (self, rhs) {
            if b >= 0 {
                if let Ok(e) = u32::try_from(b) {
                    if let Some(n) = a.checked_pow(e) {
                        return Ok(Value::Int(n));
                    }
                }
                // Overflow promotes to float.
            }
        }

        let result = self.as_f64().powf(rhs.as_f64());
        if result.is_nan() && !self.as_f64().is_nan() && !rhs.as_f64().is_nan() {
            return Err(EvalError::Arithmetic(
                "Negative number cannot be raised to a fractional power".to_string(),
            ));
        }
        Ok(Value::Float(result))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
        }
    }
}
