use crate::lexer::Token;
use thiserror::Error;

/// Binary operators, in no particular precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEq => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEq => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

/// AST node for an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    /// A variable reference, resolved at evaluation time.
    Var(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Short-circuit `and`; yields the deciding operand.
    And(Box<Expr>, Box<Expr>),
    /// Short-circuit `or`; yields the deciding operand.
    Or(Box<Expr>, Box<Expr>),
}

/// Errors that can occur while building the expression tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParsingError {
    #[error("unexpected token {0:?}")]
    UnexpectedToken(Token),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("empty expression")]
    Empty,
    #[error("expression nested too deeply")]
    TooDeep,
}

/// Bound on the depth of the expression tree.
///
/// Both nesting (`((..))`, `--x`, `not not x`) and operator chains (`1 + 1 + ..`)
/// count towards it, so evaluating and dropping the tree stays within the stack.
const MAX_DEPTH: usize = 200;

struct AstBuilder {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl AstBuilder {
    fn from(tokens: Vec<Token>) -> Self {
        AstBuilder {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Go one level deeper, failing once the depth budget is spent.
    fn descend(&mut self) -> Result<(), ParsingError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParsingError::TooDeep);
        }
        Ok(())
    }

    fn build_ast(mut self) -> Result<Expr, ParsingError> {
        if self.tokens.is_empty() {
            return Err(ParsingError::Empty);
        }
        let ast = self.parse_or()?;

        // Ensure we consumed all tokens
        if let Some(token) = self.consume() {
            return Err(ParsingError::UnexpectedToken(token));
        }

        Ok(ast)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParsingError> {
        match self.consume() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(ParsingError::UnexpectedToken(token)),
            None => Err(ParsingError::UnexpectedEnd),
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(word)) if word == keyword)
    }

    /// or: and (('or' | '||') and)*
    fn parse_or(&mut self) -> Result<Expr, ParsingError> {
        let start = self.depth;
        let mut lhs = self.parse_and()?;
        while self.peek_keyword("or") || self.peek() == Some(&Token::OrOr) {
            self.consume();
            self.descend()?;
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        self.depth = start;
        Ok(lhs)
    }

    /// and: not (('and' | '&&') not)*
    fn parse_and(&mut self) -> Result<Expr, ParsingError> {
        let start = self.depth;
        let mut lhs = self.parse_not()?;
        while self.peek_keyword("and") || self.peek() == Some(&Token::AndAnd) {
            self.consume();
            self.descend()?;
            let rhs = self.parse_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        self.depth = start;
        Ok(lhs)
    }

    /// not: ('not' | '!') not | comparison
    fn parse_not(&mut self) -> Result<Expr, ParsingError> {
        if self.peek_keyword("not") || self.peek() == Some(&Token::Bang) {
            self.consume();
            self.descend()?;
            let operand = self.parse_not()?;
            self.depth -= 1;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.parse_comparison()
    }

    /// comparison: additive (cmp_op additive)?
    fn parse_comparison(&mut self) -> Result<Expr, ParsingError> {
        let lhs = self.parse_additive()?;
        let op = match self.peek() {
            Some(Token::Eq) => BinaryOp::Eq,
            Some(Token::NotEq) => BinaryOp::NotEq,
            Some(Token::Less) => BinaryOp::Less,
            Some(Token::LessEq) => BinaryOp::LessEq,
            Some(Token::Greater) => BinaryOp::Greater,
            Some(Token::GreaterEq) => BinaryOp::GreaterEq,
            _ => return Ok(lhs),
        };
        self.consume();
        let rhs = self.parse_additive()?;
        Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    /// additive: term (('+' | '-') term)*
    fn parse_additive(&mut self) -> Result<Expr, ParsingError> {
        let start = self.depth;
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.consume();
            self.descend()?;
            let rhs = self.parse_term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        self.depth = start;
        Ok(lhs)
    }

    /// term: unary (('*' | '/' | '//' | '%') unary)*
    fn parse_term(&mut self) -> Result<Expr, ParsingError> {
        let start = self.depth;
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::FloorDiv) => BinaryOp::FloorDiv,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.consume();
            self.descend()?;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        self.depth = start;
        Ok(lhs)
    }

    /// unary: ('-' | '+') unary | power
    fn parse_unary(&mut self) -> Result<Expr, ParsingError> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            _ => return self.parse_power(),
        };
        self.consume();
        self.descend()?;
        let operand = self.parse_unary()?;
        self.depth -= 1;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    /// power: primary ('**' unary)?
    ///
    /// Right-associative, and binds tighter than a unary minus on its left:
    /// `-2 ** 2` is `-(2 ** 2)`.
    fn parse_power(&mut self) -> Result<Expr, ParsingError> {
        let base = self.parse_primary()?;
        if self.peek() == Some(&Token::Power) {
            self.consume();
            self.descend()?;
            let exponent = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParsingError> {
        match self.consume() {
            Some(Token::Int(n)) => Ok(Expr::Int(n)),
            Some(Token::Float(f)) => Ok(Expr::Float(f)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" | "True" => Ok(Expr::Bool(true)),
                "false" | "False" => Ok(Expr::Bool(false)),
                "and" | "or" | "not" => Err(ParsingError::UnexpectedToken(Token::Ident(name))),
                _ => Ok(Expr::Var(name)),
            },
            Some(Token::LParen) => {
                self.descend()?;
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                self.depth -= 1;
                Ok(inner)
            }
            Some(token) => Err(ParsingError::UnexpectedToken(token)),
            None => Err(ParsingError::UnexpectedEnd),
        }
    }
}

/// Constructs an expression tree from a vector of tokens.
///
/// The whole token stream must form exactly one expression.
pub fn construct_ast(tokens: Vec<Token>) -> Result<Expr, ParsingError> {
    let builder = AstBuilder::from(tokens);
    builder.build_ast()
}
