use thiserror::Error;

use crate::ast::{Token, TokenKind};

pub use crate::ast::Position;

const WHITESPACE_CHARS: [char; 5] = [' ', '\n', '\t', '\r', '\u{a0}'];
const DELIM_CHARS: &str = "()[]{}%*-+~/#,:|.<>=!";
const COMPLEX_OPS: [&str; 6] = ["==", "!=", "<=", ">=", "=~", "!=~"];

/// Errors raised while splitting formula text into tokens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("[{}, {}] Unterminated string: missing closing quote", .line + 1, .col + 1)]
    UnterminatedString { line: usize, col: usize },

    #[error("[{}, {}] Unexpected character {ch:?}", .line + 1, .col + 1)]
    UnexpectedCharacter { ch: char, line: usize, col: usize },
}

impl LexError {
    pub fn pos(&self) -> Position {
        match self {
            LexError::UnterminatedString { line, col }
            | LexError::UnexpectedCharacter { line, col, .. } => Position::new(*line, *col),
        }
    }
}

/// Token stream over one cell's source text.
///
/// The first token request decides the mode of the whole input: if the first
/// non-whitespace character is `=`, it is consumed and the rest is lexed as a
/// formula. Otherwise the remaining input is returned as a single
/// [`TokenKind::String`] token and nothing else is lexed, so plain text
/// stays usable as a static cell value.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    col: usize,
    checked_mode: bool,
}

/// Start lexing `source`.
pub fn tokenize(source: &str) -> Lexer {
    Lexer::new(source)
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 0,
            col: 0,
            checked_mode: false,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            if ch == '\n' {
                self.line += 1;
                self.col = 0;
            } else {
                self.col += 1;
            }
            self.position += 1;
        }
    }

    /// True once no further tokens can be produced.
    ///
    /// Before the mode check, input made only of whitespace counts as
    /// finished.
    pub fn is_finished(&self) -> bool {
        if !self.checked_mode {
            return self.input[self.position..]
                .iter()
                .all(|ch| is_whitespace(*ch));
        }
        self.position >= self.input.len()
    }

    fn check_mode(&mut self) -> Option<Token> {
        self.checked_mode = true;
        while self.current_char().is_some_and(is_whitespace) {
            self.advance();
        }

        match self.current_char() {
            None => None,
            Some('=') => {
                self.advance();
                None
            }
            Some(_) => {
                let (line, col) = (self.line, self.col);
                let rest: String = self.input[self.position..].iter().collect();
                while self.current_char().is_some() {
                    self.advance();
                }
                Some(Token::new(TokenKind::String, rest, line, col))
            }
        }
    }

    fn extract_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if pred(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let (line, col) = (self.line, self.col);
        let mut result = String::new();
        self.advance(); // Consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance(); // Consume backslash
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some(other) => result.push(other),
                        None => break,
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::UnterminatedString { line, col })
    }

    fn read_operator(&mut self) -> Token {
        let (line, col) = (self.line, self.col);

        for len in [3, 2] {
            let candidate: String = (0..len).filter_map(|i| self.peek_char(i)).collect();
            if candidate.chars().count() == len && COMPLEX_OPS.contains(&candidate.as_str()) {
                for _ in 0..len {
                    self.advance();
                }
                return Token::new(TokenKind::Operator, candidate, line, col);
            }
        }

        let ch = self.current_char().unwrap_or_default();
        self.advance();
        let kind = match ch {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            '{' => TokenKind::LeftCurly,
            '}' => TokenKind::RightCurly,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '!' => TokenKind::Exclaim,
            _ => TokenKind::Operator,
        };
        Token::new(kind, ch.to_string(), line, col)
    }

    fn read_word(&mut self) -> Result<Token, LexError> {
        let (line, col) = (self.line, self.col);
        let word = self.extract_while(|ch| !is_whitespace(ch) && !is_delim(ch) && !ch.is_control());

        if word.is_empty() {
            let ch = self.current_char().unwrap_or_default();
            return Err(LexError::UnexpectedCharacter { ch, line, col });
        }

        if word.chars().all(|ch| ch.is_ascii_digit()) {
            if self.current_char() == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
                let fraction = self.extract_while(|ch| ch.is_ascii_digit());
                return Ok(Token::new(TokenKind::Float, format!("{word}.{fraction}"), line, col));
            }
            return Ok(Token::new(TokenKind::Int, word, line, col));
        }

        let kind = match word.as_str() {
            "true" | "false" => TokenKind::Boolean,
            "and" | "or" | "not" => TokenKind::Operator,
            _ => TokenKind::Symbol,
        };
        Ok(Token::new(kind, word, line, col))
    }

    /// Next token, whitespace included. `Ok(None)` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        if !self.checked_mode
            && let Some(token) = self.check_mode()
        {
            return Ok(Some(token));
        }

        let Some(ch) = self.current_char() else {
            return Ok(None);
        };

        if is_whitespace(ch) {
            let (line, col) = (self.line, self.col);
            let ws = self.extract_while(is_whitespace);
            return Ok(Some(Token::new(TokenKind::Whitespace, ws, line, col)));
        }

        match ch {
            '"' | '\'' => {
                let (line, col) = (self.line, self.col);
                let s = self.read_string(ch)?;
                Ok(Some(Token::new(TokenKind::String, s, line, col)))
            }
            c if is_delim(c) => Ok(Some(self.read_operator())),
            _ => self.read_word().map(Some),
        }
    }
}

fn is_whitespace(ch: char) -> bool {
    WHITESPACE_CHARS.contains(&ch)
}

fn is_delim(ch: char) -> bool {
    DELIM_CHARS.contains(ch)
}

#[cfg(test)]
fn kinds(src: &str) -> Vec<(TokenKind, String)> {
    let mut lexer = Lexer::new(src);
    let mut out = vec![];
    while let Some(tok) = lexer.next_token().unwrap() {
        if tok.kind != TokenKind::Whitespace {
            out.push((tok.kind, tok.value));
        }
    }
    out
}

#[test]
fn test_keywords() {
    let toks = kinds("=true false and or not");
    assert_eq!(toks[0], (TokenKind::Boolean, "true".to_string()));
    assert_eq!(toks[1], (TokenKind::Boolean, "false".to_string()));
    assert_eq!(toks[2], (TokenKind::Operator, "and".to_string()));
    assert_eq!(toks[3], (TokenKind::Operator, "or".to_string()));
    assert_eq!(toks[4], (TokenKind::Operator, "not".to_string()));
}

#[test]
fn test_sheet_reference() {
    let toks = kinds("=budget!total != 3");
    assert_eq!(toks[0], (TokenKind::Symbol, "budget".to_string()));
    assert_eq!(toks[1], (TokenKind::Exclaim, "!".to_string()));
    assert_eq!(toks[2], (TokenKind::Symbol, "total".to_string()));
    assert_eq!(toks[3], (TokenKind::Operator, "!=".to_string()));
    assert_eq!(toks[4], (TokenKind::Int, "3".to_string()));
}
