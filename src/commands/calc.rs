//! `.calc` arithmetic: a character whitelist in front of a small
//! recursive-descent parser. Nothing here ever evaluates code.

/// Parenthesis nesting deeper than this is rejected as malformed.
const MAX_DEPTH: usize = 64;

#[derive(Debug, PartialEq)]
pub(super) enum CalcError {
    /// Characters outside the whitelist (or nothing at all).
    InvalidCharacters,
    /// Unbalanced parentheses, dangling operators, bad numbers.
    Malformed,
    /// Division by zero and overflow.
    NonFinite,
}

/// Digits, whitespace, `+ - * / ( )` and the decimal point.
pub(super) fn is_allowed(expr: &str) -> bool {
    !expr.trim().is_empty()
        && expr
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || "+-*/().".contains(c))
}

/// Whitelist-check, parse and evaluate `expr`.
pub(super) fn evaluate(expr: &str) -> Result<f64, CalcError> {
    if !is_allowed(expr) {
        return Err(CalcError::InvalidCharacters);
    }
    let tokens = tokenize(expr)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos != tokens.len() {
        return Err(CalcError::Malformed);
    }
    if !value.is_finite() {
        return Err(CalcError::NonFinite);
    }
    // Avoid replying "-0".
    Ok(if value == 0.0 { 0.0 } else { value })
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Open,
    Close,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let mut chars = expr.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        let token = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '0'..='9' | '.' => {
                let mut end = start;
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        end = i + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = &expr[start..end];
                let value = literal.parse().map_err(|_| CalcError::Malformed)?;
                tokens.push(Token::Num(value));
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::Open,
            ')' => Token::Close,
            _ => return Err(CalcError::InvalidCharacters),
        };
        tokens.push(token);
        chars.next();
    }

    Ok(tokens)
}

/// expr   := term (('+' | '-') term)*
/// term   := factor (('*' | '/') factor)*
/// factor := ('+' | '-') factor | number | '(' expr ')'
struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn descend(&mut self) -> Result<(), CalcError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CalcError::Malformed);
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == Token::Plus {
                value + rhs
            } else {
                value - rhs
            };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.factor()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            value = if op == Token::Star {
                value * rhs
            } else {
                value / rhs
            };
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, CalcError> {
        self.descend()?;
        let value = match self.bump() {
            Some(Token::Num(n)) => n,
            Some(Token::Minus) => -self.factor()?,
            Some(Token::Plus) => self.factor()?,
            Some(Token::Open) => {
                let inner = self.expr()?;
                match self.bump() {
                    Some(Token::Close) => inner,
                    _ => return Err(CalcError::Malformed),
                }
            }
            _ => return Err(CalcError::Malformed),
        };
        self.depth -= 1;
        Ok(value)
    }
}
