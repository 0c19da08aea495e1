//! Tokenizer for Orc source text.
//!
//! The tokenizer is a small state machine driven by [`LexState`]. Most tokens are
//! recognized in the [`Normal`](LexState::Normal) state, but strings and block
//! comments that are not closed by the end of a line leave the tokenizer in a
//! state that continues the construct on the next line. That state is what a
//! [`Checkpoint`](crate::parser::Checkpoint) captures.
//!
//! Whitespace and line breaks are always emitted as tokens of their own and never
//! merged with adjacent text, which keeps indentation tracking exact.
//!
//! Malformed input never fails: an unterminated string simply ends its token at
//! the end of the line.

use crate::stream::Stream;
use crate::token::{Kind, Style, Token};

/// The lexical state that determines how the next token is read.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum LexState {
    #[default]
    Normal,

    /// Inside a string literal left open at the end of a prior line.
    InString,

    /// Inside a `{- .. -}` comment left open at the end of a prior line.
    InComment,
}

/// Readers selected by the symbol tables.
#[derive(Copy, Clone)]
enum Reader {
    Operator,
    Combinator,
    String,
    BlockComment,
    LineComment,
}

const LITERALS: [&str; 3] = ["true", "false", "null"];

const KEYWORDS: [&str; 13] = [
    "as", "def", "else", "if", "import", "include", "lambda", "signal", "stop", "then", "type",
    "val", "_",
];

/// A tokenizer pulling characters from a [`Stream`].
///
/// Tokens are delivered through the [`Iterator`] implementation, which returns
/// `None` once the stream is exhausted.
pub struct Lexer<S> {
    stream: S,
    state: LexState,
}

impl<S: Stream> Lexer<S> {
    pub fn new(stream: S, state: LexState) -> Lexer<S> {
        Lexer { stream, state }
    }

    /// Returns the state that will be used to read the next token.
    pub fn state(&self) -> LexState {
        self.state
    }

    fn emit(&mut self, kind: Kind, style: Style) -> Token {
        Token::new(kind, style, self.stream.get())
    }

    /// Reads one token in the [`Normal`](LexState::Normal) state, where `c` is the
    /// character already consumed.
    fn read_token(&mut self, c: char) -> Token {
        // Try 2-character symbols, then 1-character symbols, then numbers and
        // finally words.
        let reader = match self.stream.peek().and_then(|c2| symbol2(c, c2)) {
            Some(reader) => {
                self.stream.next();
                Some(reader)
            }
            None => symbol1(c),
        };
        match reader {
            Some(Reader::Operator) => self.emit(Kind::Operator, Style::Operator),
            Some(Reader::Combinator) => self.emit(Kind::Combinator, Style::Combinator),
            Some(Reader::String) => self.read_string(),
            Some(Reader::BlockComment) => self.read_comment(),
            Some(Reader::LineComment) => self.read_line_comment(),
            None if is_digit(c) => self.read_number(),
            None => self.read_word(),
        }
    }

    fn read_number(&mut self) -> Token {
        self.stream.next_while(is_digit);
        if self.stream.peek() == Some('.') {
            self.stream.next();
            self.stream.next_while(is_digit);
        }
        if matches!(self.stream.peek(), Some('e' | 'E')) {
            self.stream.next();
            if matches!(self.stream.peek(), Some('-' | '+')) {
                self.stream.next();
            }
            self.stream.next_while(is_digit);
        }
        self.emit(Kind::Literal, Style::Literal)
    }

    fn read_word(&mut self) -> Token {
        self.stream.next_while(is_word);
        let word = self.stream.get();
        let (kind, style) = if LITERALS.contains(&word.as_str()) {
            (Kind::Literal, Style::Literal)
        } else if KEYWORDS.contains(&word.as_str()) {
            (Kind::Keyword, Style::Keyword)
        } else {
            (Kind::Variable, Style::Variable)
        };
        Token::new(kind, style, word)
    }

    /// Reads the remainder of a string up to the closing quote or the end of the
    /// line, whichever comes first.
    fn read_string(&mut self) -> Token {
        self.state = LexState::InString;
        while !self.stream.end_of_line() {
            match self.stream.next() {
                Some('"') => {
                    self.state = LexState::Normal;
                    break;
                }
                Some('\\') if !self.stream.end_of_line() => {
                    self.stream.next();
                }
                _ => {}
            }
        }
        self.emit(Kind::String, Style::Literal)
    }

    /// Reads the remainder of a block comment up to the first `-}` or the end of
    /// the line. Comments do not nest.
    fn read_comment(&mut self) -> Token {
        self.state = LexState::InComment;
        while !self.stream.end_of_line() {
            if self.stream.next() == Some('-') && self.stream.peek() == Some('}') {
                self.stream.next();
                self.state = LexState::Normal;
                break;
            }
        }
        self.emit(Kind::Comment, Style::Comment)
    }

    fn read_line_comment(&mut self) -> Token {
        while !self.stream.end_of_line() {
            self.stream.next();
        }
        self.emit(Kind::Comment, Style::Comment)
    }
}

impl<S: Stream> Iterator for Lexer<S> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let c = self.stream.peek()?;
        let token = if c == '\n' {
            self.stream.next();
            self.emit(Kind::Newline, Style::Whitespace)
        } else if is_space(c) {
            self.stream.next_while(is_space);
            self.emit(Kind::Whitespace, Style::Whitespace)
        } else {
            match self.state {
                LexState::Normal => {
                    self.stream.next();
                    self.read_token(c)
                }
                LexState::InString => self.read_string(),
                LexState::InComment => self.read_comment(),
            }
        };
        Some(token)
    }
}

fn symbol2(c1: char, c2: char) -> Option<Reader> {
    match (c1, c2) {
        ('{', '-') => Some(Reader::BlockComment),
        ('-', '-') => Some(Reader::LineComment),
        ('<', ':')
        | (':', '=')
        | (':', '>')
        | ('<', '=')
        | ('>', '=')
        | ('|', '|')
        | ('&', '&')
        | ('/', '=')
        | ('{', '.')
        | ('.', '}') => Some(Reader::Operator),
        _ => None,
    }
}

fn symbol1(c: char) -> Option<Reader> {
    match c {
        '<' | '>' | '|' | ';' => Some(Reader::Combinator),
        '"' => Some(Reader::String),
        '{' | '}' | ':' | '&' | '-' | '/' | ',' | '!' | '=' | '(' | ')' | '.' | '[' | ']' | '~'
        | '+' | '*' | '%' | '@' | '?' => Some(Reader::Operator),
        _ => None,
    }
}

/// Whitespace other than a line break, including the non-breaking space.
pub fn is_space(c: char) -> bool {
    c != '\n' && (c.is_whitespace() || c == '\u{a0}')
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '\''
}
