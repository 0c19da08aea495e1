//! Search.
//!
//! A [`SearchCursor`] finds occurrences of a query in the committed text of an
//! [`Editor`], one at a time. A query containing line breaks matches across lines:
//! its first part must end a line, its inner parts must be whole lines, and its last
//! part must start a line.

use crate::document::LinePos;
use crate::editor::Editor;
use crate::etc;
use crate::history::History;

pub struct SearchCursor {
    query: String,

    /// Where the next search resumes, or `None` once the end has been reached.
    next: Option<LinePos>,

    /// The range of the most recent match.
    at: Option<(LinePos, LinePos)>,
}

impl SearchCursor {
    pub fn new(query: &str, start: LinePos) -> SearchCursor {
        SearchCursor {
            query: query.to_string(),
            next: (query.len() > 0).then_some(start),
            at: None,
        }
    }

    /// Returns the range of the most recent match.
    pub fn at(&self) -> Option<(LinePos, LinePos)> {
        self.at
    }

    /// Advances to the next occurrence of the query.
    ///
    /// Returns `false` once no further occurrences exist.
    pub fn find_next(&mut self, editor: &mut Editor) -> bool {
        editor.commit();
        self.at = None;
        let Some(mut pos) = self.next else {
            return false;
        };
        if pos.line.is_some_and(|id| !editor.doc().is_attached(id)) {
            pos = LinePos::start();
        }

        let history = editor.history();
        loop {
            if let Some((from, to)) = self.matches(history, pos) {
                self.at = Some((from, to));
                self.next = if from.offset < etc::char_len(history.text_after(from.line)) {
                    Some(LinePos::new(from.line, from.offset + 1))
                } else {
                    history
                        .node_after(from.line)
                        .map(|id| LinePos::new(Some(id), 0))
                };
                return true;
            }
            match history.node_after(pos.line) {
                Some(id) => pos = LinePos::new(Some(id), 0),
                None => {
                    self.next = None;
                    return false;
                }
            }
        }
    }

    /// Selects the most recent match in `editor`.
    pub fn select(&self, editor: &mut Editor) -> bool {
        match self.at {
            Some((from, to)) => {
                editor.select(from, to);
                true
            }
            None => false,
        }
    }

    /// Replaces the most recent match with `text`. The search resumes after the
    /// replacement.
    pub fn replace(&mut self, editor: &mut Editor, text: &str) -> bool {
        match self.at.take() {
            Some((from, to)) => {
                let end = editor.replace_range(from, to, text);
                if self.next.is_some() {
                    self.next = Some(end);
                }
                true
            }
            None => false,
        }
    }

    /// Returns the first match starting at or after `pos` on the line of `pos`.
    fn matches(&self, history: &History, pos: LinePos) -> Option<(LinePos, LinePos)> {
        let text = etc::clean_text(history.text_after(pos.line));
        let rest = etc::slice_pos(&text, pos.offset, usize::MAX);
        let parts = self.query.split('\n').collect::<Vec<_>>();

        if let [part] = parts.as_slice() {
            let i = rest.find(part)?;
            let from = pos.offset + etc::char_len(&rest[..i]);
            let to = from + etc::char_len(part);
            return Some((LinePos::new(pos.line, from), LinePos::new(pos.line, to)));
        }

        let (first, last) = (parts[0], parts[parts.len() - 1]);
        if !rest.ends_with(first) {
            return None;
        }
        let from = pos.offset + etc::char_len(rest) - etc::char_len(first);
        let mut line = history.node_after(pos.line);
        for part in &parts[1..parts.len() - 1] {
            let id = line?;
            if etc::clean_text(history.text_after(Some(id))) != *part {
                return None;
            }
            line = history.node_after(Some(id));
        }
        let id = line?;
        if etc::clean_text(history.text_after(Some(id))).starts_with(last) {
            Some((
                LinePos::new(pos.line, from),
                LinePos::new(Some(id), etc::char_len(last)),
            ))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use pretty_assertions::assert_eq;

    fn build_editor(text: &str) -> Editor {
        let mut editor = Editor::new(Settings::default());
        editor.import(text);
        editor
    }

    fn find_all(editor: &mut Editor, query: &str) -> Vec<(usize, usize, usize)> {
        let mut cursor = editor.search(query, false);
        let mut found = Vec::new();
        while cursor.find_next(editor) {
            if let Some((from, to)) = cursor.at() {
                let line = editor.doc().line_number(from.line);
                found.push((line, from.offset, to.offset));
            }
        }
        found
    }

    #[test]
    fn find_on_single_lines() {
        let mut editor = build_editor("foo bar\nbaz foo foo");
        assert_eq!(
            find_all(&mut editor, "foo"),
            vec![(1, 0, 3), (2, 4, 7), (2, 8, 11)]
        );
        assert_eq!(find_all(&mut editor, "qux"), vec![]);
    }

    #[test]
    fn find_across_lines() {
        let mut editor = build_editor("ab\ncd\nef");
        let mut cursor = editor.search("b\ncd\ne", false);
        assert!(cursor.find_next(&mut editor));
        let (from, to) = cursor.at().unwrap();
        assert_eq!(from, LinePos::new(None, 1));
        assert_eq!(editor.doc().line_number(to.line), 3);
        assert_eq!(to.offset, 1);
        assert!(!cursor.find_next(&mut editor));
    }

    #[test]
    fn empty_query_finds_nothing() {
        let mut editor = build_editor("abc");
        let mut cursor = editor.search("", false);
        assert!(!cursor.find_next(&mut editor));
    }

    #[test]
    fn find_from_cursor() {
        let mut editor = build_editor("x\nx\nx");
        editor.jump_to_line(2);
        assert_eq!(find_all(&mut editor, "x").len(), 3);
        let mut cursor = editor.search("x", true);
        assert!(cursor.find_next(&mut editor));
        let (from, _) = cursor.at().unwrap();
        assert_eq!(editor.doc().line_number(from.line), 2);
    }

    #[test]
    fn nbsp_matches_space() {
        let mut editor = build_editor("a\u{a0}b");
        assert_eq!(find_all(&mut editor, "a b"), vec![(1, 0, 3)]);
    }

    #[test]
    fn replace_each_match() {
        let mut editor = build_editor("foo bar\nbaz foo");
        let mut cursor = editor.search("foo", false);
        while cursor.find_next(&mut editor) {
            assert!(cursor.replace(&mut editor, "foofoo"));
        }
        assert_eq!(editor.code(), "foofoo bar\nbaz foofoo");
        assert!(!cursor.replace(&mut editor, "x"));

        assert!(editor.undo());
        assert_eq!(editor.code(), "foofoo bar\nbaz foo");
    }

    #[test]
    fn select_match() {
        let mut editor = build_editor("one two");
        let mut cursor = editor.search("two", false);
        assert!(cursor.find_next(&mut editor));
        assert!(cursor.select(&mut editor));
        assert_eq!(editor.selected_text(), "two");
    }
}
