//! Precedence parser.
//!
//! Binding strength, high to low: parentheses and function calls, unary
//! minus, `^`, `* / %`, `+ -`. All binary operators are left-associative,
//! so `2^3^2` is `(2^3)^2` and `-x^2` is `(-x)^2`.

use crate::element::{BinaryOp, Element, Function, Symbol};
use crate::error::{ExprError, ExprResult};
use crate::lexer::{Lexeme, Token, tokenize};

pub(crate) fn parse(text: &str) -> ExprResult<Element> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(ExprError::parse("empty expression"));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let root = parser.sum()?;
    if let Some(extra) = parser.peek() {
        return Err(ExprError::parse(format!(
            "more than one root token; unexpected {} at position {}",
            extra.token.describe(),
            extra.position
        )));
    }
    Ok(root)
}

struct Parser {
    tokens: Vec<Lexeme>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Lexeme> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|l| &l.token)
    }

    fn next(&mut self) -> Option<Lexeme> {
        let lexeme = self.tokens.get(self.pos).cloned();
        if lexeme.is_some() {
            self.pos += 1;
        }
        lexeme
    }

    fn sum(&mut self) -> ExprResult<Element> {
        let mut lhs = self.product()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subt,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.product()?;
            lhs = Element::binary(op, lhs, rhs);
        }
    }

    fn product(&mut self) -> ExprResult<Element> {
        let mut lhs = self.power()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Mult) => BinaryOp::Mult,
                Some(Token::Div) => BinaryOp::Div,
                Some(Token::Mod) => BinaryOp::Mod,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.power()?;
            lhs = Element::binary(op, lhs, rhs);
        }
    }

    fn power(&mut self) -> ExprResult<Element> {
        let mut lhs = self.unary()?;
        while let Some(Token::Pow) = self.peek_token() {
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Element::binary(BinaryOp::Pow, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> ExprResult<Element> {
        if let Some(Token::Minus) = self.peek_token() {
            self.pos += 1;
            let operand = self.unary()?;
            return Ok(match operand {
                Element::Number(v) => Element::Number(-v),
                other => Element::Neg(Box::new(other)),
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> ExprResult<Element> {
        let Some(Lexeme { token, position }) = self.next() else {
            return Err(ExprError::parse("unexpected end of expression"));
        };
        match token {
            Token::Number(v) => Ok(Element::Number(v)),
            Token::Name(name) => self.name(name, position),
            Token::OpenParen => self.group(position),
            Token::CloseParen => Err(ExprError::parse(format!(
                "unmatched close parenthesis at position {position}"
            ))),
            other => Err(ExprError::parse(format!(
                "operator {} at position {position} is missing an operand",
                other.describe()
            ))),
        }
    }

    fn name(&mut self, name: String, position: usize) -> ExprResult<Element> {
        let followed_by_paren = matches!(self.peek_token(), Some(Token::OpenParen));
        match Function::from_name(&name) {
            Some(function) => {
                if !followed_by_paren {
                    return Err(ExprError::parse(format!(
                        "reserved function name used as symbol: \"{name}\" at position {position}"
                    )));
                }
                let open = self.pos;
                self.pos += 1;
                if let Some(Token::CloseParen) = self.peek_token() {
                    return Err(ExprError::parse(format!(
                        "function \"{name}\" called without an argument"
                    )));
                }
                let arg = self.group(self.tokens[open].position)?;
                Ok(Element::func(function, arg))
            }
            None if followed_by_paren => Err(ExprError::UnknownSymbol { name }),
            None => Ok(Element::Symbol(Symbol::new(name))),
        }
    }

    /// Parses the body of a parenthesised group whose '(' was consumed.
    fn group(&mut self, open_position: usize) -> ExprResult<Element> {
        if let Some(Token::CloseParen) = self.peek_token() {
            return Err(ExprError::parse(format!(
                "empty parentheses at position {open_position}"
            )));
        }
        let inner = self.sum()?;
        match self.next() {
            Some(Lexeme {
                token: Token::CloseParen,
                ..
            }) => Ok(inner),
            Some(other) => Err(ExprError::parse(format!(
                "expected ')' but found {} at position {}",
                other.token.describe(),
                other.position
            ))),
            None => Err(ExprError::parse(format!(
                "unmatched open parenthesis at position {open_position}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: f64) -> Element {
        Element::Number(v)
    }

    fn sym(n: &str) -> Element {
        Element::symbol(n)
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(
            parse("a + b * c").unwrap(),
            Element::binary(
                BinaryOp::Add,
                sym("a"),
                Element::binary(BinaryOp::Mult, sym("b"), sym("c"))
            )
        );
        assert_eq!(
            parse("a - b - c").unwrap(),
            Element::binary(
                BinaryOp::Subt,
                Element::binary(BinaryOp::Subt, sym("a"), sym("b")),
                sym("c")
            )
        );
        assert_eq!(
            parse("2^3^2").unwrap(),
            Element::binary(
                BinaryOp::Pow,
                Element::binary(BinaryOp::Pow, num(2.0), num(3.0)),
                num(2.0)
            )
        );
    }

    #[test]
    fn unary_minus_binds_tighter_than_power() {
        assert_eq!(
            parse("-x^2").unwrap(),
            Element::binary(
                BinaryOp::Pow,
                Element::Neg(Box::new(sym("x"))),
                num(2.0)
            )
        );
        assert_eq!(parse("-3").unwrap(), num(-3.0));
        assert_eq!(
            parse("a*-b").unwrap(),
            Element::binary(BinaryOp::Mult, sym("a"), Element::Neg(Box::new(sym("b"))))
        );
    }

    #[test]
    fn function_calls() {
        assert_eq!(
            parse("exp(-k * t)").unwrap(),
            Element::func(
                Function::Exp,
                Element::binary(BinaryOp::Mult, Element::Neg(Box::new(sym("k"))), sym("t"))
            )
        );
    }

    #[test]
    fn bare_function_name_is_rejected() {
        let err = parse("exp + 1").unwrap_err();
        assert!(err.to_string().contains("reserved function name"));
    }

    #[test]
    fn unknown_function_is_rejected() {
        assert_eq!(
            parse("foo(2)").unwrap_err(),
            ExprError::UnknownSymbol {
                name: "foo".to_string()
            }
        );
    }

    #[test]
    fn mismatched_parentheses() {
        assert!(parse("(a + b").unwrap_err().to_string().contains("unmatched open"));
        assert!(parse("a + b)").unwrap_err().to_string().contains("root token"));
        assert!(parse(")").unwrap_err().to_string().contains("unmatched close"));
        assert!(parse("()").unwrap_err().to_string().contains("empty parentheses"));
        assert!(parse("sin()").unwrap_err().to_string().contains("without an argument"));
    }

    #[test]
    fn multiple_roots_are_rejected() {
        assert!(parse("a b").unwrap_err().to_string().contains("root token"));
        assert!(parse("").is_err());
        assert!(parse("a +").is_err());
        assert!(parse("* a").is_err());
    }
}
