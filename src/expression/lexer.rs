//! Formula tokenizer
//!
//! Tokens come from `logos`; implicit multiplication (`2x`, `(a)(b)`,
//! `(a)x`, `(a)2`) is inserted as explicit `*` tokens afterwards.

use std::fmt;

use logos::{Lexer, Logos};

use crate::error::ParseError;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    #[regex(r"[0-9]+\.?[0-9]*", number)]
    #[regex(r"\.[0-9]+", number)]
    Number(f64),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_owned())]
    Ident(String),

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,
    #[token("**")]
    StarStar,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
}

/// Consume an optional `e[+-]digits` exponent after the mantissa.
///
/// The exponent is only taken when at least one digit follows, so `2e`
/// stays the number 2 followed by the identifier `e`.
fn number(lex: &mut Lexer<Token>) -> Option<f64> {
    let rest = lex.remainder().as_bytes();
    if matches!(rest.first(), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(rest.get(1), Some(b'+' | b'-')));
        let digits = rest[1 + sign..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits > 0 {
            lex.bump(1 + sign + digits);
        }
    }
    lex.slice().parse().ok()
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(v) => write!(f, "{}", v),
            Token::Ident(name) => write!(f, "{}", name),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Caret => write!(f, "^"),
            Token::StarStar => write!(f, "**"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
        }
    }
}

/// A token and its byte offset in the formula
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

/// Split a formula into tokens, then apply the implicit multiplication rules
pub fn tokenize(formula: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut lexer = Token::lexer(formula);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let position = lexer.span().start;
        match result {
            Ok(token) => tokens.push(Spanned { token, position }),
            Err(()) => {
                return Err(ParseError::UnexpectedCharacter {
                    found: lexer.slice().to_owned(),
                    position,
                })
            }
        }
    }

    Ok(insert_implicit_multiplication(tokens))
}

fn insert_implicit_multiplication(tokens: Vec<Spanned>) -> Vec<Spanned> {
    let mut out: Vec<Spanned> = Vec::with_capacity(tokens.len());

    for spanned in tokens {
        let implicit = match (out.last().map(|s| &s.token), &spanned.token) {
            (Some(Token::Number(_)), Token::Ident(_)) => true,
            (Some(Token::RParen), Token::Number(_) | Token::Ident(_) | Token::LParen) => true,
            _ => false,
        };
        if implicit {
            out.push(Spanned {
                token: Token::Star,
                position: spanned.position,
            });
        }
        out.push(spanned);
    }

    out
}
