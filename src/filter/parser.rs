// cio - CLI for the Customer.io App API
// Copyright (C) 2024 The cio contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Recursive-descent parser for filter expressions
//!
//! Precedence, loosest first: `|`, `,`, `//`, `or`, `and`, comparisons,
//! `+ -`, `* / %`, unary minus, postfix terms.

use serde_json::Value;

use super::FilterError;
use super::ast::{BinaryOp, Builtin, Expr, ObjectKey, TemplatePart};
use super::lexer::{Spanned, StrPiece, Token, tokenize};
use super::number;

/// Parse a filter expression into an AST
pub fn parse(input: &str) -> Result<Expr, FilterError> {
    parse_at(input, 0)
}

fn parse_at(input: &str, base: usize) -> Result<Expr, FilterError> {
    let tokens = tokenize(input, base)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: base + input.len(),
    };
    if parser.tokens.is_empty() {
        return Err(FilterError::syntax("empty expression", base));
    }
    let expr = parser.pipe()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(parser.unexpected(token)),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|s| &s.token)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|s| s.offset)
            .unwrap_or(self.end)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
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

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(name)) if name == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), FilterError> {
        if self.eat(&expected) {
            return Ok(());
        }
        Err(match self.peek() {
            Some(found) => FilterError::syntax(
                format!("expected {}, found {}", expected.describe(), found.describe()),
                self.offset(),
            ),
            None => FilterError::syntax(
                format!("expected {}, found end of input", expected.describe()),
                self.end,
            ),
        })
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), FilterError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(FilterError::syntax(
                format!("expected '{keyword}'"),
                self.offset(),
            ))
        }
    }

    fn unexpected(&self, token: &Token) -> FilterError {
        FilterError::syntax(
            format!("unexpected {}", token.describe()),
            self.offset(),
        )
    }

    fn pipe(&mut self) -> Result<Expr, FilterError> {
        let lhs = self.comma()?;
        if self.eat(&Token::Pipe) {
            let rhs = self.pipe()?;
            return Ok(Expr::Pipe(lhs.boxed(), rhs.boxed()));
        }
        Ok(lhs)
    }

    fn comma(&mut self) -> Result<Expr, FilterError> {
        let mut lhs = self.alternative()?;
        while self.eat(&Token::Comma) {
            let rhs = self.alternative()?;
            lhs = Expr::Comma(lhs.boxed(), rhs.boxed());
        }
        Ok(lhs)
    }

    fn alternative(&mut self) -> Result<Expr, FilterError> {
        let lhs = self.or()?;
        if self.eat(&Token::Alt) {
            let rhs = self.alternative()?;
            return Ok(Expr::Alternative(lhs.boxed(), rhs.boxed()));
        }
        Ok(lhs)
    }

    fn or(&mut self) -> Result<Expr, FilterError> {
        let mut lhs = self.and()?;
        while self.eat_keyword("or") {
            let rhs = self.and()?;
            lhs = Expr::Or(lhs.boxed(), rhs.boxed());
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, FilterError> {
        let mut lhs = self.comparison()?;
        while self.eat_keyword("and") {
            let rhs = self.comparison()?;
            lhs = Expr::And(lhs.boxed(), rhs.boxed());
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> Result<Expr, FilterError> {
        let lhs = self.additive()?;
        let op = match self.peek() {
            Some(Token::Eq) => BinaryOp::Eq,
            Some(Token::Ne) => BinaryOp::Ne,
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::Le) => BinaryOp::Le,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::Ge) => BinaryOp::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.additive()?;
        if let Some(
            token @ (Token::Eq | Token::Ne | Token::Lt | Token::Le | Token::Gt | Token::Ge),
        ) = self.peek()
        {
            return Err(FilterError::syntax(
                format!("comparison operators do not chain; found {}", token.describe()),
                self.offset(),
            ));
        }
        Ok(Expr::Binary(op, lhs.boxed(), rhs.boxed()))
    }

    fn additive(&mut self) -> Result<Expr, FilterError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary(op, lhs.boxed(), rhs.boxed());
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, FilterError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, lhs.boxed(), rhs.boxed());
        }
    }

    fn unary(&mut self) -> Result<Expr, FilterError> {
        if self.eat(&Token::Minus) {
            let operand = self.unary()?;
            return Ok(Expr::Neg(operand.boxed()));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, FilterError> {
        let mut expr = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Field(name)) => {
                    let name = name.clone();
                    self.pos += 1;
                    expr = Expr::Index {
                        target: expr.boxed(),
                        index: Expr::Literal(Value::String(name)).boxed(),
                    };
                }
                Some(Token::Dot) if matches!(self.peek_at(1), Some(Token::Str(_))) => {
                    self.pos += 1;
                    let key = self.string_term()?;
                    expr = Expr::Index {
                        target: expr.boxed(),
                        index: key.boxed(),
                    };
                }
                Some(Token::Dot) if self.peek_at(1) == Some(&Token::LBracket) => {
                    self.pos += 1;
                    expr = self.bracket_suffix(expr)?;
                }
                Some(Token::LBracket) => {
                    expr = self.bracket_suffix(expr)?;
                }
                Some(Token::Question) => {
                    self.pos += 1;
                    expr = Expr::Try(expr.boxed());
                }
                _ => return Ok(expr),
            }
        }
    }

    /// `[]`, `[expr]`, `[from:to]`, `[:to]`, `[from:]`
    fn bracket_suffix(&mut self, target: Expr) -> Result<Expr, FilterError> {
        self.expect(Token::LBracket)?;
        if self.eat(&Token::RBracket) {
            return Ok(Expr::Iterate(target.boxed()));
        }
        if self.eat(&Token::Colon) {
            let to = self.pipe()?;
            self.expect(Token::RBracket)?;
            return Ok(Expr::Slice {
                target: target.boxed(),
                from: None,
                to: Some(to.boxed()),
            });
        }
        let first = self.pipe()?;
        if self.eat(&Token::Colon) {
            let to = if self.peek() == Some(&Token::RBracket) {
                None
            } else {
                Some(self.pipe()?.boxed())
            };
            self.expect(Token::RBracket)?;
            return Ok(Expr::Slice {
                target: target.boxed(),
                from: Some(first.boxed()),
                to,
            });
        }
        self.expect(Token::RBracket)?;
        Ok(Expr::Index {
            target: target.boxed(),
            index: first.boxed(),
        })
    }

    fn term(&mut self) -> Result<Expr, FilterError> {
        let offset = self.offset();
        let Some(token) = self.peek().cloned() else {
            return Err(FilterError::syntax("unexpected end of input", self.end));
        };
        match token {
            Token::Dot => {
                self.pos += 1;
                if matches!(self.peek(), Some(Token::Str(_))) {
                    let key = self.string_term()?;
                    return Ok(Expr::Index {
                        target: Expr::Identity.boxed(),
                        index: key.boxed(),
                    });
                }
                Ok(Expr::Identity)
            }
            Token::DotDot => {
                self.pos += 1;
                Ok(Expr::Recurse)
            }
            Token::Field(name) => {
                self.pos += 1;
                Ok(Expr::field(name))
            }
            Token::Num(n) => {
                self.pos += 1;
                Ok(Expr::Literal(number(n)))
            }
            Token::Str(_) => self.string_term(),
            Token::LParen => {
                self.pos += 1;
                let inner = self.pipe()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => {
                self.pos += 1;
                if self.eat(&Token::RBracket) {
                    return Ok(Expr::Array(None));
                }
                let inner = self.pipe()?;
                self.expect(Token::RBracket)?;
                Ok(Expr::Array(Some(inner.boxed())))
            }
            Token::LBrace => self.object(),
            Token::Ident(name) => self.ident_term(name, offset),
            other => Err(self.unexpected(&other)),
        }
    }

    fn ident_term(&mut self, name: String, offset: usize) -> Result<Expr, FilterError> {
        self.pos += 1;
        match name.as_str() {
            "true" => return Ok(Expr::Literal(Value::Bool(true))),
            "false" => return Ok(Expr::Literal(Value::Bool(false))),
            "null" => return Ok(Expr::Literal(Value::Null)),
            "if" => return self.if_rest(),
            "and" | "or" | "then" | "elif" | "else" | "end" => {
                return Err(FilterError::syntax(
                    format!("unexpected keyword '{name}'"),
                    offset,
                ));
            }
            _ => {}
        }

        let mut args = Vec::new();
        if self.eat(&Token::LParen) {
            loop {
                args.push(self.pipe()?);
                if self.eat(&Token::Semicolon) {
                    continue;
                }
                self.expect(Token::RParen)?;
                break;
            }
        }

        let builtin = Builtin::lookup(&name, args.len()).ok_or_else(|| {
            FilterError::syntax(format!("{name}/{} is not defined", args.len()), offset)
        })?;
        Ok(Expr::Call(builtin, args))
    }

    /// Everything after the `if` keyword.
    fn if_rest(&mut self) -> Result<Expr, FilterError> {
        let mut branches = Vec::new();
        loop {
            let cond = self.pipe()?;
            self.expect_keyword("then")?;
            let body = self.pipe()?;
            branches.push((cond, body));
            if !self.eat_keyword("elif") {
                break;
            }
        }
        let otherwise = if self.eat_keyword("else") {
            Some(self.pipe()?.boxed())
        } else {
            None
        };
        self.expect_keyword("end")?;
        Ok(Expr::If {
            branches,
            otherwise,
        })
    }

    fn string_term(&mut self) -> Result<Expr, FilterError> {
        let offset = self.offset();
        let Some(Token::Str(pieces)) = self.next() else {
            return Err(FilterError::syntax("expected string", offset));
        };
        string_expr(pieces)
    }

    fn object(&mut self) -> Result<Expr, FilterError> {
        self.expect(Token::LBrace)?;
        let mut entries = Vec::new();
        if self.eat(&Token::RBrace) {
            return Ok(Expr::Object(entries));
        }
        loop {
            let offset = self.offset();
            let entry = match self.next() {
                Some(Token::Ident(name)) => {
                    if self.eat(&Token::Colon) {
                        (ObjectKey::Name(name), self.object_value()?)
                    } else {
                        let value = Expr::field(name.clone());
                        (ObjectKey::Name(name), value)
                    }
                }
                Some(Token::Str(pieces)) => {
                    let key = match string_expr(pieces)? {
                        Expr::Literal(Value::String(s)) => ObjectKey::Name(s),
                        computed => ObjectKey::Computed(computed),
                    };
                    if self.eat(&Token::Colon) {
                        (key, self.object_value()?)
                    } else {
                        match key {
                            ObjectKey::Name(name) => {
                                let value = Expr::field(name.clone());
                                (ObjectKey::Name(name), value)
                            }
                            ObjectKey::Computed(_) => {
                                return Err(FilterError::syntax(
                                    "interpolated object key needs a value",
                                    offset,
                                ));
                            }
                        }
                    }
                }
                Some(Token::LParen) => {
                    let key = self.pipe()?;
                    self.expect(Token::RParen)?;
                    self.expect(Token::Colon)?;
                    (ObjectKey::Computed(key), self.object_value()?)
                }
                Some(other) => {
                    return Err(FilterError::syntax(
                        format!("unexpected {} in object key", other.describe()),
                        offset,
                    ));
                }
                None => return Err(FilterError::syntax("unterminated object", self.end)),
            };
            entries.push(entry);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(Token::RBrace)?;
            break;
        }
        Ok(Expr::Object(entries))
    }

    /// Object values bind tighter than `,` so entries can be separated.
    fn object_value(&mut self) -> Result<Expr, FilterError> {
        self.alternative()
    }
}

fn string_expr(pieces: Vec<StrPiece>) -> Result<Expr, FilterError> {
    if let [StrPiece::Text(text)] = pieces.as_slice() {
        return Ok(Expr::Literal(Value::String(text.clone())));
    }
    let mut parts = Vec::with_capacity(pieces.len());
    for piece in pieces {
        match piece {
            StrPiece::Text(text) => parts.push(TemplatePart::Text(text)),
            StrPiece::Interp { source, offset } => {
                parts.push(TemplatePart::Interpolate(parse_at(&source, offset)?));
            }
        }
    }
    Ok(Expr::Template(parts))
}
