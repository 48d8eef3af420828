//! Recursive-descent parser over the token stream
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! sum     := product (('+' | '-') product)*
//! product := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | power
//! power   := primary (('^' | '**') unary)?
//! primary := number | variable | constant | name '(' args ')' | '(' sum ')'
//! ```

use super::ast::{builtin, BinaryOp, Builtin, Expr, Function2, Variable};
use super::lexer::{Spanned, Token};
use crate::error::ParseError;

pub(crate) struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    bound: &'a [Variable],
}

impl<'a> Parser<'a> {
    pub(crate) fn new(tokens: &'a [Spanned], bound: &'a [Variable]) -> Self {
        Self {
            tokens,
            pos: 0,
            bound,
        }
    }

    /// Parse the whole token stream as one expression
    pub(crate) fn parse(mut self) -> Result<Expr, ParseError> {
        if self.tokens.is_empty() {
            return Err(ParseError::Empty);
        }
        let expr = self.parse_sum()?;
        match self.peek() {
            None => Ok(expr),
            Some(extra) => Err(unexpected(extra, "an operator or end of formula")),
        }
    }

    fn peek(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Spanned> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek().map(|s| &s.token) == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, expected: &'static str) -> Result<(), ParseError> {
        match self.next() {
            Some(s) if &s.token == token => Ok(()),
            Some(s) => Err(unexpected(s, expected)),
            None => Err(ParseError::UnexpectedEnd { expected }),
        }
    }

    fn parse_sum(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_product()?;
        loop {
            let op = if self.eat(&Token::Plus) {
                BinaryOp::Add
            } else if self.eat(&Token::Minus) {
                BinaryOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_product()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_product(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = if self.eat(&Token::Star) {
                BinaryOp::Mul
            } else if self.eat(&Token::Slash) {
                BinaryOp::Div
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::Neg(Box::new(self.parse_unary()?)));
        }
        if self.eat(&Token::Plus) {
            return self.parse_unary();
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_primary()?;
        if self.eat(&Token::Caret) || self.eat(&Token::StarStar) {
            // right-associative: 2^3^2 = 2^(3^2), and 2^-1 is allowed
            let exponent = self.parse_unary()?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let expected = "a number, variable, function or '('";
        let spanned = self
            .next()
            .ok_or(ParseError::UnexpectedEnd { expected })?;

        match &spanned.token {
            Token::Number(v) => Ok(Expr::Number(*v)),
            Token::LParen => {
                let inner = self.parse_sum()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::Ident(name) => self.parse_identifier(name, spanned.position),
            _ => Err(unexpected(spanned, expected)),
        }
    }

    fn parse_identifier(&mut self, name: &str, position: usize) -> Result<Expr, ParseError> {
        if let Some(var) = Variable::from_name(name) {
            if self.bound.contains(&var) {
                return Ok(Expr::Var(var));
            }
            return Err(ParseError::UnknownSymbol {
                name: name.to_owned(),
                position,
            });
        }

        let Some(found) = builtin(name) else {
            return Err(ParseError::UnknownSymbol {
                name: name.to_owned(),
                position,
            });
        };

        let function_name = match found {
            Builtin::Constant(value) => return Ok(Expr::Number(value)),
            Builtin::Unary(f) => f.name(),
            Builtin::Binary(f) => f.name(),
            Builtin::Sign => "sign",
        };

        self.expect(&Token::LParen, "'(' after function name")?;
        let mut args = self.parse_arguments()?;

        match (found, args.len()) {
            (Builtin::Unary(f), 1) => Ok(Expr::Call(f, Box::new(args.remove(0)))),
            (Builtin::Sign, 1) => Ok(Expr::Call(
                super::ast::Function::Sgn,
                Box::new(args.remove(0)),
            )),
            (Builtin::Binary(f), 2) => {
                let b = args.remove(1);
                let a = args.remove(0);
                Ok(Expr::Call2(f, Box::new(a), Box::new(b)))
            }
            (Builtin::Sign, 2) => {
                let b = args.remove(1);
                let a = args.remove(0);
                Ok(Expr::Call2(Function2::Sign, Box::new(a), Box::new(b)))
            }
            (found, n) => Err(ParseError::WrongArity {
                function: function_name,
                expected: match found {
                    Builtin::Binary(_) => "2",
                    Builtin::Sign => "1 or 2",
                    _ => "1",
                },
                found: n,
            }),
        }
    }

    /// Comma-separated arguments up to and including the closing ')'
    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_sum()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RParen, "',' or ')'")?;
            return Ok(args);
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn unexpected(spanned: &Spanned, expected: &'static str) -> ParseError {
    ParseError::UnexpectedToken {
        found: spanned.token.to_string(),
        expected,
        position: spanned.position,
    }
}
