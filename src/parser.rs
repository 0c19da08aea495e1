//! A shallow parser layered on top of the tokenizer.
//!
//! The actual parsing is very shallow. Tokens pass through mostly untouched,
//! except that:
//!
//! * a variable followed by `(` or `[`, ignoring whitespace and line breaks, is
//!   restyled as a [`Site`](Style::Site),
//! * every newline token carries the indentation of the line it terminates.
//!
//! A parser can be [checkpointed](Parser::checkpoint) at any line break. The
//! [`Checkpoint`] is a plain value which later reconstructs an equivalent parser
//! over a new stream positioned at the start of the following line, so a
//! document can be re-tokenized from any line without rescanning what precedes
//! it.

use crate::lexer::{LexState, Lexer};
use crate::stream::Stream;
use crate::token::{Kind, Style, Token};
use std::collections::VecDeque;

/// A parser delivering styled tokens.
pub struct Parser<S> {
    lexer: Lexer<S>,

    /// The lexical state following the last token delivered by [`next`](Self::next),
    /// which may lag behind the state of [`lexer`](Self::lexer) when tokens are
    /// buffered in [`lookahead`](Self::lookahead).
    state: LexState,

    /// Tokens read ahead of the current token, each paired with the lexical state
    /// that followed it.
    lookahead: VecDeque<(Token, LexState)>,

    /// The tab stop of the current line, or `None` until its first token is seen.
    tabstop: Option<usize>,
}

/// A snapshot of parser state taken at a line break.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct Checkpoint {
    state: LexState,
}

impl Checkpoint {
    pub fn state(&self) -> LexState {
        self.state
    }

    /// Returns a parser that reads `stream` as if it were the text following the
    /// line break where this checkpoint was taken.
    pub fn restore<S: Stream>(self, stream: S) -> Parser<S> {
        Parser::with_state(stream, self.state)
    }
}

impl<S: Stream> Parser<S> {
    /// Creates a parser at the start of a document.
    pub fn new(stream: S) -> Parser<S> {
        Parser::with_state(stream, LexState::Normal)
    }

    fn with_state(stream: S, state: LexState) -> Parser<S> {
        Parser {
            lexer: Lexer::new(stream, state),
            state,
            lookahead: VecDeque::new(),
            tabstop: None,
        }
    }

    /// Captures the state needed to resume parsing after the last delivered token.
    ///
    /// This is only meaningful immediately after a newline token, since all state
    /// within a line is discarded upon [restoring](Checkpoint::restore).
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint { state: self.state }
    }

    /// Moves to the next token for real, consuming buffered lookahead first.
    fn next_token(&mut self) -> Option<Token> {
        if let Some((token, state)) = self.lookahead.pop_front() {
            self.state = state;
            Some(token)
        } else {
            let token = self.lexer.next()?;
            self.state = self.lexer.state();
            Some(token)
        }
    }

    /// Returns the token `index` positions past the current token without
    /// consuming anything.
    fn look(&mut self, index: usize) -> Option<&Token> {
        while self.lookahead.len() <= index {
            let token = self.lexer.next()?;
            self.lookahead.push_back((token, self.lexer.state()));
        }
        self.lookahead.get(index).map(|(token, _)| token)
    }

    /// Returns `true` if the next non-blank token opens a call.
    fn in_call_position(&mut self) -> bool {
        let mut index = 0;
        while let Some(token) = self.look(index) {
            if token.opens_call() {
                return true;
            } else if !token.is_blank() {
                return false;
            }
            index += 1;
        }
        false
    }
}

impl<S: Stream> Iterator for Parser<S> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let mut token = self.next_token()?;
        if token.is_newline() {
            token.indentation = Some(self.tabstop.take().unwrap_or(0));
        } else {
            if token.kind == Kind::Variable && self.in_call_position() {
                token.style = Style::Site;
            }

            // Tab stop is the length of leading whitespace, if any.
            if self.tabstop.is_none() {
                self.tabstop = Some(if token.kind == Kind::Whitespace {
                    token.len()
                } else {
                    0
                });
            }
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{ChunkStream, StringStream};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn parse(text: &str) -> Vec<Token> {
        Parser::new(StringStream::new(text)).collect()
    }

    fn style_of(tokens: &[Token], text: &str) -> Style {
        tokens
            .iter()
            .find(|t| t.text == text)
            .map(|t| t.style)
            .unwrap_or_else(|| panic!("{text}: token not found"))
    }

    /// Tokenizes `text` by restarting from a checkpoint after every line break.
    fn parse_restarting(text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut consumed = 0;
        let mut parser = Parser::new(StringStream::new(text));
        loop {
            let mut restarted = false;
            while let Some(token) = parser.next() {
                consumed += token.len();
                let newline = token.is_newline();
                tokens.push(token);
                if newline {
                    let rest = text.chars().skip(consumed).collect::<String>();
                    parser = parser.checkpoint().restore(StringStream::new(&rest));
                    restarted = true;
                    break;
                }
            }
            if !restarted {
                break;
            }
        }
        tokens
    }

    #[test]
    fn site_when_followed_by_paren() {
        let tokens = parse("f (x)");
        assert_eq!(style_of(&tokens, "f"), Style::Site);
        assert_eq!(style_of(&tokens, "x"), Style::Variable);
    }

    #[test]
    fn variable_when_not_in_call_position() {
        let tokens = parse("f + x");
        assert_eq!(style_of(&tokens, "f"), Style::Variable);
    }

    #[test]
    fn site_when_followed_by_bracket_across_lines() {
        let tokens = parse("xs\n  [0]");
        assert_eq!(style_of(&tokens, "xs"), Style::Site);
    }

    #[test]
    fn keywords_are_never_sites() {
        let tokens = parse("if (b)");
        assert_eq!(style_of(&tokens, "if"), Style::Keyword);
    }

    #[test]
    fn lookahead_does_not_leak_state() {
        // Reading ahead of `f` enters the string, but the checkpoint after the
        // first line must reflect only what was delivered.
        let mut parser = Parser::new(StringStream::new("f\n\"open\nmore"));
        let f = parser.next().unwrap();
        assert_eq!(f.style, Style::Variable);
        let nl = parser.next().unwrap();
        assert!(nl.is_newline());
        assert_eq!(parser.checkpoint().state(), LexState::Normal);
    }

    #[test]
    fn indentation_of_lines() {
        let indents = parse("a\n    b\n\n\tc\n")
            .into_iter()
            .filter_map(|t| t.indentation)
            .collect::<Vec<_>>();
        assert_eq!(indents, vec![0, 4, 0, 1]);
    }

    #[test]
    fn checkpoint_inside_comment() {
        let mut parser = Parser::new(StringStream::new("{- open\nstill -} x"));
        parser.next();
        parser.next();
        let checkpoint = parser.checkpoint();
        assert_eq!(checkpoint.state(), LexState::InComment);

        let tokens = checkpoint
            .restore(StringStream::new("still -} x"))
            .collect::<Vec<_>>();
        assert_eq!(tokens[0].kind, Kind::Comment);
        assert_eq!(tokens[0].text, "still -}");
    }

    #[test]
    fn restore_over_chunks() {
        let checkpoint = Parser::new(StringStream::new("")).checkpoint();
        let chunks = vec!["de", "f g", "(", ")"];
        let tokens = checkpoint
            .restore(ChunkStream::new(chunks.into_iter()))
            .map(|t| (t.text, t.style))
            .collect::<Vec<_>>();
        assert_eq!(
            tokens,
            vec![
                ("def".to_string(), Style::Keyword),
                (" ".to_string(), Style::Whitespace),
                ("g".to_string(), Style::Site),
                ("(".to_string(), Style::Operator),
                (")".to_string(), Style::Operator),
            ]
        );
    }

    #[test]
    fn restarting_matches_single_pass() {
        let text = "def f(x) = \"a\n  b\" | {- c\n d -} g [1]\n-- end\n";
        assert_eq!(parse_restarting(text), parse(text));
    }

    fn fragment() -> impl Strategy<Value = &'static str> {
        prop_oneof![
            Just("f"),
            Just("x'"),
            Just(" "),
            Just("  "),
            Just("\t"),
            Just("\u{a0}"),
            Just("("),
            Just(")"),
            Just("["),
            Just("\n"),
            Just("\""),
            Just("\\"),
            Just("{-"),
            Just("-}"),
            Just("--"),
            Just("1.5e-3"),
            Just("def"),
            Just("|"),
            Just("<:"),
            Just(">"),
        ]
    }

    proptest! {
        #[test]
        fn checkpoint_restart_is_transparent(
            fragments in proptest::collection::vec(fragment(), 0..64)
        ) {
            let text = fragments.concat();
            prop_assert_eq!(parse_restarting(&text), parse(&text));
        }

        #[test]
        fn tokens_cover_text(fragments in proptest::collection::vec(fragment(), 0..64)) {
            let text = fragments.concat();
            let joined = parse(&text).into_iter().map(|t| t.text).collect::<String>();
            prop_assert_eq!(joined, text);
        }
    }
}
