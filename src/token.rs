//! Tokens produced by the tokenizer and the styles used to render them.

use std::fmt::{self, Display, Formatter};

/// The lexical category of a token.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Kind {
    Operator,
    Combinator,
    Keyword,
    /// Numbers and the literal words `true`, `false` and `null`.
    Literal,
    Variable,
    String,
    Comment,
    /// A run of whitespace on a single line.
    Whitespace,
    /// A single line break, always a token of its own.
    Newline,
}

/// The style tag attached to a token and, later, to the span rendering it.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Style {
    Operator,
    Combinator,
    Keyword,
    Literal,
    Variable,
    /// A variable in call position, i.e. followed by `(` or `[`.
    Site,
    Comment,
    Whitespace,
}

impl Style {
    pub const ALL: [Style; 8] = [
        Style::Operator,
        Style::Combinator,
        Style::Keyword,
        Style::Literal,
        Style::Variable,
        Style::Site,
        Style::Comment,
        Style::Whitespace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Operator => "operator",
            Style::Combinator => "combinator",
            Style::Keyword => "keyword",
            Style::Literal => "literal",
            Style::Variable => "variable",
            Style::Site => "site",
            Style::Comment => "comment",
            Style::Whitespace => "whitespace",
        }
    }

    /// Returns the style whose tag is `name`, if any.
    pub fn from_name(name: &str) -> Option<Style> {
        Style::ALL.into_iter().find(|style| style.as_str() == name)
    }
}

impl Display for Style {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A token is a slice of source text classified by [`Kind`] and decorated with
/// a [`Style`].
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Token {
    pub kind: Kind,

    /// The exact source text of this token.
    pub text: String,

    pub style: Style,

    /// The tab stop of the line that this token terminates, only present on
    /// [`Kind::Newline`] tokens delivered by the parser.
    pub indentation: Option<usize>,
}

impl Token {
    pub fn new(kind: Kind, style: Style, text: String) -> Token {
        Token {
            kind,
            text,
            style,
            indentation: None,
        }
    }

    /// Returns the length of the token in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_newline(&self) -> bool {
        self.kind == Kind::Newline
    }

    /// Returns `true` for whitespace of any sort, including line breaks.
    pub fn is_blank(&self) -> bool {
        matches!(self.kind, Kind::Whitespace | Kind::Newline)
    }

    /// Returns `true` if this token opens an argument list or an index.
    pub fn opens_call(&self) -> bool {
        self.kind == Kind::Operator && (self.text == "(" || self.text == "[")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_names_round_trip() {
        for style in Style::ALL {
            assert_eq!(Style::from_name(style.as_str()), Some(style));
        }
        assert_eq!(Style::from_name("pattern"), None);
    }

    #[test]
    fn token_len_counts_chars() {
        let token = Token::new(Kind::String, Style::Literal, "\"λx\"".to_string());
        assert_eq!(token.len(), 4);
        assert!(!token.is_blank());
    }

    #[test]
    fn opens_call() {
        let paren = Token::new(Kind::Operator, Style::Operator, "(".to_string());
        let brace = Token::new(Kind::Operator, Style::Operator, "{".to_string());
        assert!(paren.opens_call());
        assert!(!brace.opens_call());
    }
}
