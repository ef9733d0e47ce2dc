//! Tokenizer for the expression grammar subset of spec.md §4.8.

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Ident(String),
    Int(String),
    Float(String),
    Str(String),
    Char(char),
    // Punctuation and operators.
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Comma,
    Colon,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Shl,
    Shr,
}

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    src: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            chars: src.char_indices().peekable(),
            src,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(&(start, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
                continue;
            }
            if c.is_ascii_digit() {
                tokens.push(self.read_number(start));
                continue;
            }
            if c == '_' || c.is_alphabetic() {
                tokens.push(self.read_ident(start));
                continue;
            }
            if c == '"' {
                tokens.push(self.read_string()?);
                continue;
            }
            if c == '\'' {
                tokens.push(self.read_char()?);
                continue;
            }
            tokens.push(self.read_operator()?);
        }
        Ok(tokens)
    }

    fn read_ident(&mut self, start: usize) -> Token {
        let mut end = start;
        while let Some(&(i, c)) = self.chars.peek() {
            if c == '_' || c.is_alphanumeric() {
                end = i + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        Token::Ident(self.src[start..end].to_string())
    }

    fn read_number(&mut self, start: usize) -> Token {
        let mut end = start;
        let mut is_float = false;
        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                end = i + 1;
                self.chars.next();
            } else if c == '.' && !is_float {
                is_float = true;
                end = i + 1;
                self.chars.next();
            } else {
                break;
            }
        }
        let text = self.src[start..end].to_string();
        if is_float {
            Token::Float(text)
        } else {
            Token::Int(text)
        }
    }

    fn read_string(&mut self) -> Result<Token> {
        self.chars.next(); // opening quote
        let mut s = String::new();
        loop {
            match self.chars.next() {
                Some((_, '"')) => return Ok(Token::Str(s)),
                Some((_, '\\')) => {
                    let (_, escaped) = self
                        .chars
                        .next()
                        .ok_or_else(|| Error::Unsupported("unterminated string literal".into()))?;
                    s.push(unescape(escaped));
                }
                Some((_, c)) => s.push(c),
                None => return Err(Error::Unsupported("unterminated string literal".into())),
            }
        }
    }

    fn read_char(&mut self) -> Result<Token> {
        self.chars.next(); // opening quote
        let (_, c) = self
            .chars
            .next()
            .ok_or_else(|| Error::Unsupported("unterminated character literal".into()))?;
        let c = if c == '\\' {
            let (_, escaped) = self
                .chars
                .next()
                .ok_or_else(|| Error::Unsupported("unterminated character literal".into()))?;
            unescape(escaped)
        } else {
            c
        };
        match self.chars.next() {
            Some((_, '\'')) => Ok(Token::Char(c)),
            _ => Err(Error::Unsupported(
                "character literal must contain exactly one character".into(),
            )),
        }
    }

    fn read_operator(&mut self) -> Result<Token> {
        let (_, c) = self.chars.next().unwrap();
        let peek = self.chars.peek().map(|&(_, c)| c);
        match (c, peek) {
            ('(', _) => Ok(Token::LParen),
            (')', _) => Ok(Token::RParen),
            ('[', _) => Ok(Token::LBracket),
            (']', _) => Ok(Token::RBracket),
            ('.', _) => Ok(Token::Dot),
            (',', _) => Ok(Token::Comma),
            (':', _) => Ok(Token::Colon),
            ('+', _) => Ok(Token::Plus),
            ('-', _) => Ok(Token::Minus),
            ('*', _) => Ok(Token::Star),
            ('/', _) => Ok(Token::Slash),
            ('%', _) => Ok(Token::Percent),
            ('&', _) => Ok(Token::Amp),
            ('=', Some('=')) => {
                self.chars.next();
                Ok(Token::Eq)
            }
            ('!', Some('=')) => {
                self.chars.next();
                Ok(Token::Ne)
            }
            ('<', Some('=')) => {
                self.chars.next();
                Ok(Token::Le)
            }
            ('<', Some('<')) => {
                self.chars.next();
                Ok(Token::Shl)
            }
            ('<', _) => Ok(Token::Lt),
            ('>', Some('=')) => {
                self.chars.next();
                Ok(Token::Ge)
            }
            ('>', Some('>')) => {
                self.chars.next();
                Ok(Token::Shr)
            }
            ('>', _) => Ok(Token::Gt),
            (other, _) => Err(Error::Unsupported(format!("unexpected character '{}'", other))),
        }
    }
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}
