//! Lexical analysis of `let`/`try` expressions.

use thiserror::Error;

/// A token of an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    /// String literal with quotes removed and escapes resolved.
    Str(String),
    /// Identifier or keyword (`and`, `or`, `not`, `true`, ...).
    Ident(String),
    Plus,
    Minus,
    Star,
    /// `**`
    Power,
    Slash,
    /// `//`
    FloorDiv,
    Percent,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `!`
    Bang,
    LParen,
    RParen,
}

/// Errors that can occur during tokenization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexingError {
    #[error("unterminated string literal")]
    UnfinishedQuote,
    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingNumber,
    ReadingIdent,
    ReadingString(char),
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
        }
    }

    fn make_tokens(&mut self) -> Result<Vec<Token>, LexingError> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch, &mut out)?,
                LexingState::ReadingNumber => self.handle_number(ch, &mut out)?,
                LexingState::ReadingIdent => self.handle_ident(ch, &mut out)?,
                LexingState::ReadingString(quote) => self.handle_string(ch, quote, &mut out)?,
            }
        }

        match self.state {
            LexingState::ReadingString(_) => return Err(LexingError::UnfinishedQuote),
            LexingState::ReadingNumber => out.push(self.finish_number()?),
            LexingState::ReadingIdent => out.push(Token::Ident(std::mem::take(&mut self.buffer))),
            LexingState::Start => {}
        }

        Ok(out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    /// Consume the next char if it equals `expected`.
    fn eat(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn handle_start(&mut self, ch: char, out: &mut Vec<Token>) -> Result<(), LexingError> {
        let token = match ch {
            c if c.is_whitespace() => return Ok(()),
            c if c.is_ascii_digit() || (c == '.' && self.peek_is_digit()) => {
                self.buffer.push(c);
                self.state = LexingState::ReadingNumber;
                return Ok(());
            }
            c if c.is_alphabetic() || c == '_' => {
                self.buffer.push(c);
                self.state = LexingState::ReadingIdent;
                return Ok(());
            }
            '"' | '\'' => {
                self.state = LexingState::ReadingString(ch);
                return Ok(());
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' if self.eat('*') => Token::Power,
            '*' => Token::Star,
            '/' if self.eat('/') => Token::FloorDiv,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '=' if self.eat('=') => Token::Eq,
            '!' if self.eat('=') => Token::NotEq,
            '!' => Token::Bang,
            '<' if self.eat('=') => Token::LessEq,
            '<' => Token::Less,
            '>' if self.eat('=') => Token::GreaterEq,
            '>' => Token::Greater,
            '&' if self.eat('&') => Token::AndAnd,
            '|' if self.eat('|') => Token::OrOr,
            c => return Err(LexingError::UnexpectedChar(c)),
        };
        out.push(token);
        Ok(())
    }

    fn peek_is_digit(&self) -> bool {
        self.peek_char().is_some_and(|c| c.is_ascii_digit())
    }

    fn handle_number(&mut self, ch: char, out: &mut Vec<Token>) -> Result<(), LexingError> {
        let exponent_sign = matches!(ch, '+' | '-') && self.buffer.ends_with(['e', 'E']);
        if ch.is_ascii_alphanumeric() || ch == '.' || ch == '_' || exponent_sign {
            self.buffer.push(ch);
            return Ok(());
        }
        out.push(self.finish_number()?);
        self.state = LexingState::Start;
        self.handle_start(ch, out)
    }

    fn finish_number(&mut self) -> Result<Token, LexingError> {
        let text = std::mem::take(&mut self.buffer);
        let digits = text.replace('_', "");
        if let Ok(n) = digits.parse::<i64>() {
            return Ok(Token::Int(n));
        }
        let looks_float = digits.contains(['.', 'e', 'E']);
        match digits.parse::<f64>() {
            Ok(f) if f.is_finite() && (looks_float || digits.chars().all(|c| c.is_ascii_digit())) => {
                Ok(Token::Float(f))
            }
            _ => Err(LexingError::InvalidNumber(text)),
        }
    }

    fn handle_ident(&mut self, ch: char, out: &mut Vec<Token>) -> Result<(), LexingError> {
        if ch.is_alphanumeric() || ch == '_' {
            self.buffer.push(ch);
            return Ok(());
        }
        out.push(Token::Ident(std::mem::take(&mut self.buffer)));
        self.state = LexingState::Start;
        self.handle_start(ch, out)
    }

    fn handle_string(&mut self, ch: char, quote: char, out: &mut Vec<Token>) -> Result<(), LexingError> {
        match ch {
            c if c == quote => {
                out.push(Token::Str(std::mem::take(&mut self.buffer)));
                self.state = LexingState::Start;
            }
            '\\' => match self.read_char() {
                Some('n') => self.buffer.push('\n'),
                Some('t') => self.buffer.push('\t'),
                Some(escaped) => self.buffer.push(escaped),
                None => return Err(LexingError::UnfinishedQuote),
            },
            c => self.buffer.push(c),
        }
        Ok(())
    }
}

/// Tokenize an expression.
///
/// Integer literals too large for `i64` become floats.
pub fn split_into_tokens(line: &str) -> Result<Vec<Token>, LexingError> {
    LexingFSM::new(line).make_tokens()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(s: &str) -> Token {
        Token::Ident(s.to_string())
    }

    #[test]
    fn test_arithmetic_without_spaces() {
        let tokens = split_into_tokens("x+1*(y-2)").unwrap();
        assert_eq!(
            tokens,
            vec![
                ident("x"),
                Token::Plus,
                Token::Int(1),
                Token::Star,
                Token::LParen,
                ident("y"),
                Token::Minus,
                Token::Int(2),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_two_char_operators() {
        let tokens = split_into_tokens("a ** b // c <= d >= e == f != g && h || !i").unwrap();
        let ops: Vec<Token> = tokens
            .into_iter()
            .filter(|t| !matches!(t, Token::Ident(_)))
            .collect();
        assert_eq!(
            ops,
            vec![
                Token::Power,
                Token::FloorDiv,
                Token::LessEq,
                Token::GreaterEq,
                Token::Eq,
                Token::NotEq,
                Token::AndAnd,
                Token::OrOr,
                Token::Bang,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(split_into_tokens("42").unwrap(), vec![Token::Int(42)]);
        assert_eq!(split_into_tokens("1_000").unwrap(), vec![Token::Int(1000)]);
        assert_eq!(split_into_tokens("2.5").unwrap(), vec![Token::Float(2.5)]);
        assert_eq!(split_into_tokens(".5").unwrap(), vec![Token::Float(0.5)]);
        assert_eq!(split_into_tokens("1e3").unwrap(), vec![Token::Float(1000.0)]);
        assert_eq!(split_into_tokens("1e-2").unwrap(), vec![Token::Float(0.01)]);
        assert_eq!(
            split_into_tokens("1e+2-1").unwrap(),
            vec![Token::Float(100.0), Token::Minus, Token::Int(1)]
        );
    }

    #[test]
    fn test_bad_number() {
        assert_eq!(
            split_into_tokens("12abc"),
            Err(LexingError::InvalidNumber("12abc".to_string()))
        );
        assert_eq!(
            split_into_tokens("1e999"),
            Err(LexingError::InvalidNumber("1e999".to_string()))
        );
        let huge = "9".repeat(400);
        assert_eq!(split_into_tokens(&huge), Err(LexingError::InvalidNumber(huge.clone())));
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(
            split_into_tokens(r#""hello" + 'world'"#).unwrap(),
            vec![
                Token::Str("hello".to_string()),
                Token::Plus,
                Token::Str("world".to_string())
            ]
        );
        assert_eq!(
            split_into_tokens(r#""say \"hi\"""#).unwrap(),
            vec![Token::Str("say \"hi\"".to_string())]
        );
    }

    #[test]
    fn test_unfinished_quote() {
        assert_eq!(split_into_tokens("'abc"), Err(LexingError::UnfinishedQuote));
    }

    #[test]
    fn test_unexpected_char() {
        assert_eq!(split_into_tokens("1 ; 2"), Err(LexingError::UnexpectedChar(';')));
        assert_eq!(split_into_tokens("a = b"), Err(LexingError::UnexpectedChar('=')));
    }
}
