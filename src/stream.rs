//! Character streams that feed the tokenizer.
//!
//! A stream hands out one character at a time with a single character of
//! lookahead, and remembers every character consumed since the last call to
//! [`Stream::get`] so that a reader can collect the text of a token after it
//! has decided where the token ends.

/// A source of characters with single-character lookahead.
pub trait Stream {
    /// Returns the next character without consuming it, or `None` at the end.
    fn peek(&mut self) -> Option<char>;

    /// Consumes and returns the next character, or `None` at the end.
    ///
    /// Reaching the end while consumed characters are still waiting to be
    /// collected with [`get`](Self::get) means a reader lost track of its token,
    /// which is a correctness problem and panics.
    fn next(&mut self) -> Option<char>;

    /// Returns all characters consumed since the previous call and clears them.
    fn get(&mut self) -> String;

    fn more(&mut self) -> bool {
        self.peek().is_some()
    }

    /// Returns `true` if the next character exists and satisfies `pred`.
    fn applies<F>(&mut self, pred: F) -> bool
    where
        F: Fn(char) -> bool,
        Self: Sized,
    {
        self.peek().is_some_and(|c| pred(c))
    }

    /// Consumes characters for as long as they satisfy `pred`.
    fn next_while<F>(&mut self, pred: F)
    where
        F: Fn(char) -> bool,
        Self: Sized,
    {
        while self.applies(&pred) {
            self.next();
        }
    }

    /// Returns `true` at a line break or at the end of the stream.
    fn end_of_line(&mut self) -> bool {
        matches!(self.peek(), None | Some('\n'))
    }
}

/// A stream over a single string.
pub struct StringStream {
    chars: Vec<char>,
    pos: usize,
    start: usize,
}

impl StringStream {
    pub fn new(text: &str) -> StringStream {
        StringStream {
            chars: text.chars().collect(),
            pos: 0,
            start: 0,
        }
    }
}

impl Stream for StringStream {
    fn peek(&mut self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        if self.pos < self.chars.len() {
            let c = self.chars[self.pos];
            self.pos += 1;
            Some(c)
        } else if self.start < self.pos {
            panic!("end of stream reached without emptying buffer");
        } else {
            None
        }
    }

    fn get(&mut self) -> String {
        let s = self.chars[self.start..self.pos].iter().collect();
        self.start = self.pos;
        s
    }
}

/// A stream over a lazy sequence of string chunks.
///
/// Chunks are pulled only when the characters of the previous chunk have been
/// exhausted, so a tokenizer can run across many spans of a document without
/// first copying the whole document into one string. Empty chunks are skipped.
pub struct ChunkStream<I> {
    chunks: I,
    chunk: Vec<char>,
    pos: usize,
    consumed: String,
}

impl<I> ChunkStream<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    pub fn new(chunks: I) -> ChunkStream<I> {
        ChunkStream {
            chunks,
            chunk: Vec::new(),
            pos: 0,
            consumed: String::new(),
        }
    }

    /// Ensures that the current chunk has at least one unread character, pulling
    /// new chunks as needed, and returns that character.
    fn fill(&mut self) -> Option<char> {
        while self.pos == self.chunk.len() {
            let chunk = self.chunks.next()?;
            self.chunk = chunk.as_ref().chars().collect();
            self.pos = 0;
        }
        Some(self.chunk[self.pos])
    }
}

impl<I> Stream for ChunkStream<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    fn peek(&mut self) -> Option<char> {
        self.fill()
    }

    fn next(&mut self) -> Option<char> {
        match self.fill() {
            Some(c) => {
                self.pos += 1;
                self.consumed.push(c);
                Some(c)
            }
            None if self.consumed.len() > 0 => panic!(
                "end of stream reached without emptying buffer ('{}')",
                self.consumed
            ),
            None => None,
        }
    }

    fn get(&mut self) -> String {
        std::mem::take(&mut self.consumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_stream_peek_and_next() {
        let mut s = StringStream::new("ab");
        assert_eq!(s.peek(), Some('a'));
        assert_eq!(s.peek(), Some('a'));
        assert_eq!(s.next(), Some('a'));
        assert_eq!(s.next(), Some('b'));
        assert_eq!(s.peek(), None);
        assert_eq!(s.get(), "ab");
        assert_eq!(s.next(), None);
    }

    #[test]
    fn string_stream_get_clears_buffer() {
        let mut s = StringStream::new("foo bar");
        s.next_while(|c| c != ' ');
        assert_eq!(s.get(), "foo");
        assert_eq!(s.get(), "");
        s.next();
        assert_eq!(s.get(), " ");
    }

    #[test]
    #[should_panic(expected = "without emptying buffer")]
    fn string_stream_exhausted_with_buffer() {
        let mut s = StringStream::new("x");
        s.next();
        s.next();
    }

    #[test]
    fn chunk_stream_spans_chunks() {
        let mut s = ChunkStream::new(vec!["fo", "", "o", "\n", "bar"].into_iter());
        s.next_while(|c| c.is_alphabetic());
        assert_eq!(s.get(), "foo");
        assert!(s.end_of_line());
        assert_eq!(s.next(), Some('\n'));
        assert_eq!(s.get(), "\n");
        s.next_while(|c| c.is_alphabetic());
        assert_eq!(s.get(), "bar");
        assert!(!s.more());
        assert_eq!(s.next(), None);
    }

    #[test]
    fn chunk_stream_peek_does_not_consume() {
        let mut s = ChunkStream::new(vec![String::from("a"), String::from("b")].into_iter());
        s.next();
        assert_eq!(s.peek(), Some('b'));
        assert_eq!(s.get(), "a");
        assert!(s.applies(|c| c == 'b'));
        assert!(!s.applies(|c| c == 'a'));
    }

    #[test]
    #[should_panic(expected = "without emptying buffer")]
    fn chunk_stream_exhausted_with_buffer() {
        let mut s = ChunkStream::new(vec!["x"].into_iter());
        s.next();
        s.next();
    }

    #[test]
    fn empty_chunk_stream() {
        let mut s = ChunkStream::new(Vec::<String>::new().into_iter());
        assert_eq!(s.peek(), None);
        assert!(s.end_of_line());
        assert_eq!(s.next(), None);
        assert_eq!(s.get(), "");
    }
}
