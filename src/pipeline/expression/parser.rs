//! Recursive-descent parser producing an expression tree
//!
//! Precedence, lowest first: `||`, `&&`, `== !=`, `< <= > >=`, `+ -`,
//! `* / %`, unary `- !`, primary.

use std::collections::BTreeSet;

use super::lexer::{tokenize, Token};
use super::{ExpressionError, Scalar};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Whitelisted pure math functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Abs,
    Sqrt,
    Exp,
    Ln,
    Log10,
    Pow,
    Min,
    Max,
    Round,
    Floor,
    Ceil,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        let f = match name {
            "abs" => Function::Abs,
            "sqrt" => Function::Sqrt,
            "exp" => Function::Exp,
            "ln" | "log" => Function::Ln,
            "log10" => Function::Log10,
            "pow" => Function::Pow,
            "min" => Function::Min,
            "max" => Function::Max,
            "round" => Function::Round,
            "floor" => Function::Floor,
            "ceil" => Function::Ceil,
            _ => return None,
        };
        Some(f)
    }

    /// Accepted argument counts (min, max)
    fn arity(self) -> (usize, usize) {
        match self {
            Function::Pow => (2, 2),
            Function::Min | Function::Max => (1, usize::MAX),
            _ => (1, 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Scalar),
    Variable(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

impl Expr {
    /// Names of every referenced variable
    pub fn variables(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables(&self, names: &mut BTreeSet<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Variable(name) => {
                names.insert(name.clone());
            }
            Expr::Unary(_, inner) => inner.collect_variables(names),
            Expr::Binary(_, lhs, rhs) => {
                lhs.collect_variables(names);
                rhs.collect_variables(names);
            }
            Expr::Call(_, args) => args.iter().for_each(|a| a.collect_variables(names)),
        }
    }
}

/// Deepest tree the parser will build.
///
/// Nesting through parentheses, calls, unary operators and operator chains
/// all count, which keeps both parsing and evaluation off the stack limit.
pub const MAX_DEPTH: usize = 256;

/// Parse an expression string
pub fn parse(input: &str) -> Result<Expr, ExpressionError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExpressionError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_or()?;
    if let Some(token) = parser.peek() {
        return Err(ExpressionError::UnexpectedToken {
            found: format!("{:?}", token),
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

type Level = fn(&mut Parser) -> Result<Expr, ExpressionError>;

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ExpressionError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(match self.peek() {
                Some(found) => ExpressionError::UnexpectedToken {
                    found: format!("{:?}", found),
                },
                None => ExpressionError::UnexpectedEnd,
            })
        }
    }

    fn descend(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::TooDeep { limit: MAX_DEPTH });
        }
        Ok(())
    }

    fn ascend(&mut self, levels: usize) {
        self.depth -= levels;
    }

    /// Left-associative chain of one precedence level.
    ///
    /// Every operator in the chain nests the tree one level deeper.
    fn parse_chain(
        &mut self,
        operand: Level,
        operator: fn(&Token) -> Option<BinaryOp>,
    ) -> Result<Expr, ExpressionError> {
        let mut lhs = operand(self)?;
        let mut levels = 0;
        while let Some(op) = self.peek().and_then(operator) {
            self.pos += 1;
            self.descend()?;
            levels += 1;
            let rhs = operand(self)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        self.ascend(levels);
        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        self.parse_chain(Parser::parse_and, |token| match token {
            Token::OrOr => Some(BinaryOp::Or),
            _ => None,
        })
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        self.parse_chain(Parser::parse_equality, |token| match token {
            Token::AndAnd => Some(BinaryOp::And),
            _ => None,
        })
    }

    fn parse_equality(&mut self) -> Result<Expr, ExpressionError> {
        self.parse_chain(Parser::parse_comparison, |token| match token {
            Token::EqEq => Some(BinaryOp::Eq),
            Token::NotEq => Some(BinaryOp::NotEq),
            _ => None,
        })
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExpressionError> {
        self.parse_chain(Parser::parse_additive, |token| match token {
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, ExpressionError> {
        self.parse_chain(Parser::parse_multiplicative, |token| match token {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExpressionError> {
        self.parse_chain(Parser::parse_unary, |token| match token {
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            Token::Percent => Some(BinaryOp::Rem),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        let op = if self.eat(&Token::Minus) {
            Some(UnaryOp::Neg)
        } else if self.eat(&Token::Bang) {
            Some(UnaryOp::Not)
        } else if self.eat(&Token::Plus) {
            None
        } else {
            return self.parse_primary();
        };

        self.descend()?;
        let inner = self.parse_unary()?;
        self.ascend(1);
        Ok(match op {
            Some(op) => Expr::Unary(op, Box::new(inner)),
            None => inner,
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Literal(Scalar::Number(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Scalar::Text(s))),
            Some(Token::Variable(name)) => Ok(Expr::Variable(name)),
            Some(Token::LParen) => {
                self.descend()?;
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                self.ascend(1);
                Ok(inner)
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Expr::Literal(Scalar::Bool(true))),
                "false" => Ok(Expr::Literal(Scalar::Bool(false))),
                _ => {
                    self.descend()?;
                    let call = self.parse_call(name)?;
                    self.ascend(1);
                    Ok(call)
                }
            },
            Some(token) => Err(ExpressionError::UnexpectedToken {
                found: format!("{:?}", token),
            }),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }

    fn parse_call(&mut self, name: String) -> Result<Expr, ExpressionError> {
        let function =
            Function::lookup(&name).ok_or(ExpressionError::UnknownIdentifier { name: name.clone() })?;
        self.expect(&Token::LParen)?;

        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.parse_or()?);
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(&Token::Comma)?;
            }
        }

        let (min, max) = function.arity();
        if args.len() < min || args.len() > max {
            return Err(ExpressionError::Arity {
                function: name,
                given: args.len(),
            });
        }
        Ok(Expr::Call(function, args))
    }
}
