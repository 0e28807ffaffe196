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

//! Tokenizer for filter expressions

use super::FilterError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Dot,
    DotDot,
    /// `.name` lexed as a single token
    Field(String),
    Ident(String),
    Num(f64),
    Str(Vec<StrPiece>),
    LBracket,
    RBracket,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Pipe,
    Comma,
    Colon,
    Semicolon,
    Question,
    Alt,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::Dot => "'.'".into(),
            Token::DotDot => "'..'".into(),
            Token::Field(name) => format!("'.{name}'"),
            Token::Ident(name) => format!("'{name}'"),
            Token::Num(n) => format!("number {n}"),
            Token::Str(_) => "string".into(),
            Token::LBracket => "'['".into(),
            Token::RBracket => "']'".into(),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            Token::LBrace => "'{'".into(),
            Token::RBrace => "'}'".into(),
            Token::Pipe => "'|'".into(),
            Token::Comma => "','".into(),
            Token::Colon => "':'".into(),
            Token::Semicolon => "';'".into(),
            Token::Question => "'?'".into(),
            Token::Alt => "'//'".into(),
            Token::Eq => "'=='".into(),
            Token::Ne => "'!='".into(),
            Token::Lt => "'<'".into(),
            Token::Le => "'<='".into(),
            Token::Gt => "'>'".into(),
            Token::Ge => "'>='".into(),
            Token::Plus => "'+'".into(),
            Token::Minus => "'-'".into(),
            Token::Star => "'*'".into(),
            Token::Slash => "'/'".into(),
            Token::Percent => "'%'".into(),
        }
    }
}

/// Piece of a string literal. Interpolations keep their raw source so the
/// parser can parse them as nested expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum StrPiece {
    Text(String),
    Interp { source: String, offset: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

/// Split `input` into tokens. `base` is added to every reported offset so that
/// errors inside string interpolations point into the full expression.
pub fn tokenize(input: &str, base: usize) -> Result<Vec<Spanned>, FilterError> {
    let mut lexer = Lexer {
        input,
        pos: 0,
        base,
    };
    let mut tokens = Vec::new();
    while let Some(spanned) = lexer.next_token()? {
        tokens.push(spanned);
    }
    Ok(tokens)
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    base: usize,
}

impl<'a> Lexer<'a> {
    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.remaining().chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, message: impl Into<String>, at: usize) -> FilterError {
        FilterError::syntax(message, self.base + at)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Spanned>, FilterError> {
        self.skip_trivia();
        let start = self.pos;
        let Some(c) = self.bump() else {
            return Ok(None);
        };

        let token = match c {
            '.' => match self.peek() {
                Some('.') => {
                    self.bump();
                    Token::DotDot
                }
                Some(n) if is_ident_start(n) => Token::Field(self.ident_tail(String::new())),
                _ => Token::Dot,
            },
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '|' => Token::Pipe,
            ',' => Token::Comma,
            ':' => Token::Colon,
            ';' => Token::Semicolon,
            '?' => Token::Question,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '%' => Token::Percent,
            '/' => {
                if self.peek() == Some('/') {
                    self.bump();
                    Token::Alt
                } else {
                    Token::Slash
                }
            }
            '=' => {
                if self.peek() == Some('=') {
                    self.bump();
                    Token::Eq
                } else {
                    return Err(self.error("assignment is not supported", start));
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.bump();
                    Token::Ne
                } else {
                    return Err(self.error("unexpected character '!'", start));
                }
            }
            '<' => {
                if self.peek() == Some('=') {
                    self.bump();
                    Token::Le
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.bump();
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '"' => Token::Str(self.string(start)?),
            c if c.is_ascii_digit() => self.number(start)?,
            c if is_ident_start(c) => {
                let mut name = String::new();
                name.push(c);
                Token::Ident(self.ident_tail(name))
            }
            other => {
                return Err(self.error(format!("unexpected character '{other}'"), start));
            }
        };

        Ok(Some(Spanned {
            token,
            offset: self.base + start,
        }))
    }

    fn ident_tail(&mut self, mut name: String) -> String {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        name
    }

    fn number(&mut self, start: usize) -> Result<Token, FilterError> {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let checkpoint = self.pos;
            self.bump();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.bump();
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            } else {
                self.pos = checkpoint;
            }
        }
        let text = &self.input[start..self.pos];
        text.parse::<f64>()
            .map(Token::Num)
            .map_err(|_| self.error(format!("invalid number '{text}'"), start))
    }

    fn string(&mut self, start: usize) -> Result<Vec<StrPiece>, FilterError> {
        let mut pieces = Vec::new();
        let mut text = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(self.error("unterminated string", start));
            };
            match c {
                '"' => break,
                '\\' => {
                    let escape_at = self.pos - 1;
                    match self.bump() {
                        Some('"') => text.push('"'),
                        Some('\\') => text.push('\\'),
                        Some('/') => text.push('/'),
                        Some('b') => text.push('\u{0008}'),
                        Some('f') => text.push('\u{000C}'),
                        Some('n') => text.push('\n'),
                        Some('r') => text.push('\r'),
                        Some('t') => text.push('\t'),
                        Some('u') => text.push(self.unicode_escape(escape_at)?),
                        Some('(') => {
                            if !text.is_empty() {
                                pieces.push(StrPiece::Text(std::mem::take(&mut text)));
                            }
                            let inner_start = self.pos;
                            let inner_end = self.interpolation_end(escape_at)?;
                            pieces.push(StrPiece::Interp {
                                source: self.input[inner_start..inner_end].to_string(),
                                offset: self.base + inner_start,
                            });
                            // consume the closing paren
                            self.pos = inner_end + 1;
                        }
                        Some(other) => {
                            return Err(
                                self.error(format!("invalid escape '\\{other}'"), escape_at)
                            );
                        }
                        None => return Err(self.error("unterminated string", start)),
                    }
                }
                other => text.push(other),
            }
        }
        if !text.is_empty() || pieces.is_empty() {
            pieces.push(StrPiece::Text(text));
        }
        Ok(pieces)
    }

    fn hex4(&mut self, at: usize) -> Result<u32, FilterError> {
        let digits = self.remaining().get(..4).unwrap_or("");
        if digits.len() != 4 {
            return Err(self.error("truncated unicode escape", at));
        }
        // from_str_radix alone would accept a leading sign.
        let value = digits
            .bytes()
            .all(|b| b.is_ascii_hexdigit())
            .then(|| u32::from_str_radix(digits, 16).ok())
            .flatten()
            .ok_or_else(|| self.error(format!("invalid unicode escape '{digits}'"), at))?;
        self.pos += 4;
        Ok(value)
    }

    fn unicode_escape(&mut self, at: usize) -> Result<char, FilterError> {
        let high = self.hex4(at)?;
        let code = if (0xD800..0xDC00).contains(&high) {
            if !self.remaining().starts_with("\\u") {
                return Err(self.error("unpaired surrogate in unicode escape", at));
            }
            self.pos += 2;
            let low = self.hex4(at)?;
            if !(0xDC00..0xE000).contains(&low) {
                return Err(self.error("unpaired surrogate in unicode escape", at));
            }
            0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
        } else {
            high
        };
        char::from_u32(code).ok_or_else(|| self.error("invalid unicode escape", at))
    }

    /// Find the `)` closing an interpolation that starts at the current
    /// position. Does not move the cursor.
    fn interpolation_end(&self, at: usize) -> Result<usize, FilterError> {
        let bytes = self.input.as_bytes();
        let mut depth = 1usize;
        let mut i = self.pos;
        while i < bytes.len() {
            match bytes[i] {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                b'"' => i = skip_string(bytes, i + 1).ok_or_else(|| self.error("unterminated string", i))?,
                _ => {}
            }
            i += 1;
        }
        Err(self.error("unterminated string interpolation", at))
    }
}

/// Returns the index of the closing quote of a string whose body starts at
/// `i`, stepping over escapes and nested interpolations.
fn skip_string(bytes: &[u8], mut i: usize) -> Option<usize> {
    while i < bytes.len() {
        match bytes[i] {
            b'"' => return Some(i),
            b'\\' => {
                if bytes.get(i + 1) == Some(&b'(') {
                    let mut depth = 1usize;
                    i += 2;
                    while depth > 0 {
                        match *bytes.get(i)? {
                            b'(' => depth += 1,
                            b')' => depth -= 1,
                            b'"' => i = skip_string(bytes, i + 1)?,
                            _ => {}
                        }
                        i += 1;
                    }
                    continue;
                }
                i += 2;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}
