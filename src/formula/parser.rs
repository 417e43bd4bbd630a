// Formula parser - converts expression strings into an AST.
// Supports: f64 literals, cell refs (A1), unary +/-, binary + - * /, parens.
// The leading '=' is stripped by the cell layer before parsing.

use thiserror::Error;

use crate::position::{ParsePositionError, Position};

/// Expression AST. References are resolved to positions at parse time, so a
/// formula that names an out-of-bounds cell fails to parse.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    CellRef(Position),
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    BinaryOp {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

/// Syntactic failure. Returned before any cell state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty formula")]
    Empty,
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("malformed number '{0}'")]
    BadNumber(String),
    #[error("{0}")]
    BadReference(#[from] ParsePositionError),
    #[error("unexpected token in formula")]
    UnexpectedToken,
    #[error("unexpected end of formula")]
    UnexpectedEnd,
    #[error("unbalanced parentheses")]
    UnbalancedParens,
    #[error("trailing input after expression")]
    TrailingInput,
}

/// Parse an expression string into an AST.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut parser = Parser { tokens: &tokens, pos: 0 };
    let expr = parser.expr()?;
    if parser.pos != tokens.len() {
        return Err(ParseError::TrailingInput);
    }
    Ok(expr)
}

#[derive(Debug, Clone)]
enum Token {
    Number(f64),
    CellRef(Position),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => { chars.next(); }
            '+' => { tokens.push(Token::Plus); chars.next(); }
            '-' => { tokens.push(Token::Minus); chars.next(); }
            '*' => { tokens.push(Token::Star); chars.next(); }
            '/' => { tokens.push(Token::Slash); chars.next(); }
            '(' => { tokens.push(Token::LParen); chars.next(); }
            ')' => { tokens.push(Token::RParen); chars.next(); }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_digit() || ch == '.' {
                        literal.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                // Optional exponent: e or E, optional sign, digits.
                if matches!(chars.peek(), Some('e') | Some('E')) {
                    let mut lookahead = chars.clone();
                    let e = lookahead.next().unwrap();
                    let mut exp = String::from(e);
                    if matches!(lookahead.peek(), Some('+') | Some('-')) {
                        exp.push(lookahead.next().unwrap());
                    }
                    if matches!(lookahead.peek(), Some(d) if d.is_ascii_digit()) {
                        while matches!(lookahead.peek(), Some(d) if d.is_ascii_digit()) {
                            exp.push(lookahead.next().unwrap());
                        }
                        literal.push_str(&exp);
                        chars = lookahead;
                    }
                }
                let value: f64 = literal
                    .parse()
                    .map_err(|_| ParseError::BadNumber(literal.clone()))?;
                tokens.push(Token::Number(value));
            }
            'A'..='Z' | 'a'..='z' => {
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let pos: Position = ident.parse()?;
                tokens.push(Token::CellRef(pos));
            }
            other => return Err(ParseError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

/// Recursive-descent parser with the usual precedence ladder:
/// expr -> term (('+'|'-') term)*, term -> factor (('*'|'/') factor)*,
/// factor -> ('+'|'-') factor | number | ref | '(' expr ')'.
struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.term()?;
        while let Some(op) = match self.peek() {
            Some(Token::Plus) => Some(Op::Add),
            Some(Token::Minus) => Some(Op::Sub),
            _ => None,
        } {
            self.pos += 1;
            let right = self.term()?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.factor()?;
        while let Some(op) = match self.peek() {
            Some(Token::Star) => Some(Op::Mul),
            Some(Token::Slash) => Some(Op::Div),
            _ => None,
        } {
            self.pos += 1;
            let right = self.factor()?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                Ok(Expr::UnaryOp {
                    op: UnaryOp::Plus,
                    operand: Box::new(self.factor()?),
                })
            }
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::UnaryOp {
                    op: UnaryOp::Minus,
                    operand: Box::new(self.factor()?),
                })
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.bump() {
            Some(Token::Number(n)) => Ok(Expr::Number(*n)),
            Some(Token::CellRef(pos)) => Ok(Expr::CellRef(*pos)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(ParseError::UnbalancedParens),
                }
            }
            Some(_) => Err(ParseError::UnexpectedToken),
            None => Err(ParseError::UnexpectedEnd),
        }
    }
}
