//! Editor.
//!
//! An [`Editor`] owns a document together with the highlighter and the edit
//! history that keep it styled and undoable. Raw edits touch the document
//! directly and queue the edited span for highlighting, which happens later in
//! passes driven by [`Editor::run_due`]. Every line a pass reaches is touched in
//! the history, and touched lines are committed as an undo level once editing
//! pauses.
//!
//! Positions are [line positions](LinePos), so a caret stays put while lines
//! above it change.

use crate::config::Settings;
use crate::document::{Document, DocumentRef, LinePos, Node, NodeId, Span};
use crate::etc;
use crate::highlight::Highlighter;
use crate::history::{Applied, History};
use crate::search::SearchCursor;
use crate::timer::{Task, Timers};
use crate::token::Style;
use regex_lite::Regex;
use std::cell::{Ref, RefMut};
use std::sync::LazyLock;
use std::time::Instant;
use tracing::debug;

static LINE_ENDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\r\n?").unwrap_or_else(|e| panic!("{e}: invalid line ending pattern"))
});

pub struct Editor {
    settings: Settings,
    doc: DocumentRef,
    highlighter: Highlighter,
    history: History,
    timers: Timers,

    /// Position where text is inserted.
    caret: LinePos,

    /// Selected range, whose end always coincides with the caret.
    selection: Option<(LinePos, LinePos)>,
}

impl Editor {
    pub fn new(settings: Settings) -> Editor {
        let doc = Document::new().to_ref();
        doc.borrow_mut().insert_before(Node::Span(Span::new("")), None);
        let mut editor = Editor {
            highlighter: Highlighter::new(doc.clone(), settings.lines_per_pass),
            history: History::new(settings.undo_depth),
            doc,
            timers: Timers::new(),
            caret: LinePos::start(),
            selection: None,
            settings,
        };
        editor.schedule_scan(Instant::now());
        editor
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replaces the settings, which take effect with the next pass or commit.
    pub fn set_settings(&mut self, settings: Settings) {
        self.highlighter.set_lines_per_pass(settings.lines_per_pass);
        self.history.set_max_depth(settings.undo_depth);
        self.settings = settings;
        self.timers.cancel(Task::Scan);
        self.schedule_scan(Instant::now());
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn doc(&self) -> Ref<'_, Document> {
        self.doc.borrow()
    }

    fn doc_mut(&self) -> RefMut<'_, Document> {
        self.doc.borrow_mut()
    }

    pub fn caret(&self) -> LinePos {
        self.caret
    }

    pub fn set_caret(&mut self, pos: LinePos) {
        self.caret = pos;
        self.selection = None;
    }

    pub fn selection(&self) -> Option<(LinePos, LinePos)> {
        self.selection
    }

    /// Replaces the entire contents of the document with `text`, which becomes the
    /// new baseline of the edit history.
    pub fn import(&mut self, text: &str) {
        self.commit();
        let lines = as_lines(text);
        debug!(lines = lines.len(), "import");
        let applied = self
            .history
            .push(&mut self.doc.borrow_mut(), None, None, &lines, None);
        for from in applied.dirty {
            self.highlighter.add_dirty(from);
        }
        self.commit();
        self.history.reset();
        self.history.purge(&mut self.doc.borrow_mut());
        self.caret = LinePos::start();
        self.selection = None;
    }

    /// Returns the text of the document with non-breaking spaces read as ordinary
    /// spaces.
    pub fn code(&self) -> String {
        etc::clean_text(&self.doc().text())
    }

    /// Returns every node of the document as a style and text, where line breaks
    /// appear as unstyled `"\n"`.
    pub fn spans(&self) -> Vec<(Option<Style>, String)> {
        self.doc()
            .iter()
            .map(|(_, node)| match node {
                Node::Span(span) => (span.style, span.text.clone()),
                Node::Break(_) => (None, "\n".to_string()),
            })
            .collect()
    }

    /// Inserts `text` at the caret and moves the caret past it.
    pub fn insert(&mut self, text: &str) {
        let text = as_lines(text).join("\n");
        let (end, span) = self.doc_mut().insert_text(self.caret, &text);
        self.caret = end;
        self.selection = None;
        self.mark_dirty(Some(span));
    }

    /// Removes up to `n` characters preceding the caret.
    pub fn delete_backward(&mut self, n: usize) {
        let (start, span) = {
            let mut doc = self.doc_mut();
            let offset = doc.offset_of(self.caret);
            let start = doc.pos_of(offset.saturating_sub(n));
            let span = doc.delete_text(start, n.min(offset));
            (start, span)
        };
        self.caret = start;
        self.selection = None;
        self.mark_dirty(Some(span));
    }

    /// Removes up to `n` characters following the caret.
    pub fn delete_forward(&mut self, n: usize) {
        let span = self.doc_mut().delete_text(self.caret, n);
        self.selection = None;
        self.mark_dirty(Some(span));
    }

    /// Selects the range between `from` and `to`, leaving the caret at `to`.
    pub fn select(&mut self, from: LinePos, to: LinePos) {
        let (start, end) = {
            let doc = self.doc();
            if doc.offset_of(from) <= doc.offset_of(to) {
                (from, to)
            } else {
                (to, from)
            }
        };
        self.selection = Some((start, end));
        self.caret = to;
    }

    /// Returns the selected text, or an empty string if nothing is selected.
    pub fn selected_text(&mut self) -> String {
        self.commit();
        let Some((from, to)) = self.selection else {
            return String::new();
        };
        let history = &self.history;
        let text = if from.line == to.line {
            etc::slice_pos(history.text_after(from.line), from.offset, to.offset).to_string()
        } else {
            let mut parts =
                vec![etc::slice_pos(history.text_after(from.line), from.offset, usize::MAX)];
            let mut line = history.node_after(from.line);
            while line != to.line {
                let Some(id) = line else {
                    break;
                };
                parts.push(history.text_after(Some(id)));
                line = history.node_after(Some(id));
            }
            parts.push(etc::slice_pos(history.text_after(to.line), 0, to.offset));
            parts.join("\n")
        };
        etc::clean_text(&text)
    }

    /// Replaces the selected text with `text`, which becomes the new selection.
    ///
    /// Returns `false` if nothing is selected.
    pub fn replace_selection(&mut self, text: &str) -> bool {
        let Some((from, to)) = self.selection else {
            return false;
        };
        let end = self.replace_range(from, to, text);
        self.selection = Some((from, end));
        self.caret = end;
        true
    }

    /// Replaces the text between `from` and `to` with `text` as a single undo level.
    ///
    /// Returns the position following the inserted text.
    pub fn replace_range(&mut self, from: LinePos, to: LinePos, text: &str) -> LinePos {
        self.commit();
        let mut lines = as_lines(text);
        let (head, tail, end) = {
            let history = &self.history;
            let head = etc::slice_pos(history.text_after(from.line), 0, from.offset);
            let tail = etc::slice_pos(history.text_after(to.line), to.offset, usize::MAX);
            (head.to_string(), tail.to_string(), history.node_after(to.line))
        };
        lines[0].insert_str(0, &head);
        let last = lines.len() - 1;
        let offset = etc::char_len(&lines[last]);
        lines[last].push_str(&tail);

        let applied =
            self.history
                .push(&mut self.doc.borrow_mut(), from.line, end, &lines, Some(self.caret));
        self.apply(applied);
        LinePos::new(self.history.node_before(end), offset)
    }

    /// Moves the caret to the start of the `1`-based line `n`, or the last line if
    /// `n` is out of range.
    pub fn jump_to_line(&mut self, n: usize) {
        let line = self.doc().nth_line(n);
        self.set_caret(LinePos::new(line, 0));
    }

    /// Returns the `1`-based number of the line containing the caret.
    pub fn current_line(&self) -> usize {
        self.doc().line_number(self.caret.line)
    }

    /// Sets the leading whitespace of the line following `line` to the indentation
    /// recorded by the break `line`, or removes it on the first line.
    ///
    /// Returns the previous and the new width of the leading whitespace.
    pub fn indent_line_after(&mut self, line: Option<NodeId>) -> (usize, usize) {
        let (node, prev, width) = {
            let mut doc = self.doc_mut();
            let first = doc.line_first(line);
            let ws = first.filter(|id| {
                doc.span(*id)
                    .is_some_and(|span| span.style == Some(Style::Whitespace))
            });
            let prev = ws.and_then(|id| doc.span(id)).map(Span::len).unwrap_or(0);
            let width = line
                .and_then(|id| doc.line_break(id))
                .and_then(|brk| brk.indentation)
                .unwrap_or(0);
            if width == prev {
                return (prev, width);
            }

            match ws {
                Some(id) if width == 0 => doc.remove(id),
                Some(id) => {
                    if let Some(span) = doc.span_mut(id) {
                        span.text = " ".repeat(width);
                        span.dirty = true;
                    }
                }
                None => {
                    let span = Span {
                        text: " ".repeat(width),
                        style: Some(Style::Whitespace),
                        dirty: true,
                        reduced: false,
                    };
                    doc.insert_before(Node::Span(span), first);
                }
            }

            // The following line must wait for this one to be highlighted again.
            let (_, next) = doc.line_text(line);
            if let Some(brk) = next {
                if let Some(node) = doc.get_mut(brk) {
                    node.set_dirty(true);
                }
            }
            (doc.line_first(line).or(line), prev, width)
        };
        debug!(?line, prev, width, "indent");
        self.mark_dirty(node);
        (prev, width)
    }

    /// Indents the line containing the caret, keeping the caret at the same place
    /// relative to the text that follows the indentation.
    pub fn indent_at_cursor(&mut self) {
        let line = self.caret.line;
        self.highlighter.highlight_at(&mut self.history, line);
        let (prev, width) = self.indent_line_after(line);
        let offset = if self.caret.offset <= prev {
            width
        } else {
            self.caret.offset + width - prev
        };
        self.set_caret(LinePos::new(line, offset));
    }

    /// Indents every line of the document.
    pub fn reindent(&mut self) {
        let breaks = self
            .doc()
            .iter()
            .filter(|(_, node)| node.is_break())
            .map(|(id, _)| id)
            .collect::<Vec<_>>();
        self.indent_line_after(None);
        for id in breaks {
            if self.doc().is_attached(id) {
                self.highlighter.highlight_at(&mut self.history, Some(id));
                self.indent_line_after(Some(id));
            }
        }
        let caret = self.caret;
        self.set_caret(LinePos::new(caret.line, 0));
    }

    /// Queues the line containing the caret for highlighting.
    pub fn mark_cursor_dirty(&mut self) {
        let node = {
            let doc = self.doc();
            doc.line_first(self.caret.line).or(self.caret.line)
        };
        self.mark_dirty(node);
    }

    /// Discards all highlighting and queues the whole document.
    pub fn reparse(&mut self) {
        self.highlighter.reparse();
        self.schedule_highlight(Instant::now());
    }

    /// Highlights the document up to the break `line`, which makes its indentation
    /// available.
    pub fn highlight_at(&mut self, line: Option<NodeId>) {
        self.highlighter.highlight_at(&mut self.history, line);
    }

    /// Reverts the most recent undo level.
    ///
    /// Returns `false` if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.commit();
        let applied = self
            .history
            .undo(&mut self.doc.borrow_mut(), Some(self.caret));
        match applied {
            Some(applied) => {
                self.apply(applied);
                true
            }
            None => false,
        }
    }

    /// Reapplies the most recently undone level.
    ///
    /// Returns `false` if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        self.commit();
        let applied = self
            .history
            .redo(&mut self.doc.borrow_mut(), Some(self.caret));
        match applied {
            Some(applied) => {
                self.apply(applied);
                true
            }
            None => false,
        }
    }

    /// Returns a cursor over occurrences of `query`, starting at the caret if
    /// `from_cursor` is `true` and at the start of the document otherwise.
    pub fn search(&mut self, query: &str, from_cursor: bool) -> SearchCursor {
        self.commit();
        let start = if from_cursor {
            self.caret
        } else {
            LinePos::start()
        };
        SearchCursor::new(query, start)
    }

    /// Highlights everything queued and commits touched lines to the history.
    pub fn commit(&mut self) {
        self.timers.cancel(Task::Commit);
        self.highlighter.highlight_dirty(&mut self.history, true);
        let mut doc = self.doc.borrow_mut();
        self.history.commit(&doc);
        self.history.purge(&mut doc);
    }

    /// Performs all pending work, leaving the document fully highlighted and every
    /// change committed.
    pub fn settle(&mut self) {
        self.timers.cancel(Task::Highlight);
        self.commit();
    }

    /// Returns the time at which the next task is due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Performs the tasks that are due at `now`.
    pub fn run_due(&mut self, now: Instant) {
        for task in self.timers.due(now) {
            match task {
                Task::Highlight => {
                    if self.highlighter.highlight_dirty(&mut self.history, false) {
                        self.schedule_highlight(now);
                    }
                    self.schedule_commit(now);
                }
                Task::Commit => self.commit(),
                Task::Scan => {
                    self.highlighter.scan_step(&mut self.history);
                    self.schedule_commit(now);
                    self.schedule_scan(now);
                }
            }
        }
    }

    fn apply(&mut self, applied: Applied) {
        if let Some(caret) = applied.caret {
            self.caret = caret;
        }
        self.selection = None;
        for from in applied.dirty {
            self.highlighter.add_dirty(from);
        }
        self.schedule_highlight(Instant::now());
    }

    fn mark_dirty(&mut self, node: Option<NodeId>) {
        self.highlighter.add_dirty(node);
        let now = Instant::now();
        self.schedule_highlight(now);
        if self.timers.is_pending(Task::Scan) {
            self.schedule_scan(now);
        }
    }

    fn schedule_highlight(&mut self, now: Instant) {
        self.timers
            .schedule(Task::Highlight, now, self.settings.pass_delay());
    }

    fn schedule_commit(&mut self, now: Instant) {
        if self.history.has_touched() {
            self.timers
                .schedule(Task::Commit, now, self.settings.commit_delay());
        }
    }

    fn schedule_scan(&mut self, now: Instant) {
        if let Some(delay) = self.settings.scan_delay() {
            self.timers.schedule(Task::Scan, now, delay);
        }
    }
}

/// Splits `text` into lines, accepting `\r\n` and `\r` as line endings.
fn as_lines(text: &str) -> Vec<String> {
    LINE_ENDING
        .replace_all(text, "\n")
        .split('\n')
        .map(|line| line.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn build_editor(text: &str) -> Editor {
        let mut editor = Editor::new(Settings::default());
        editor.import(text);
        editor
    }

    fn is_dirty(editor: &Editor) -> bool {
        editor.doc().iter().any(|(_, node)| node.is_dirty())
    }

    fn later() -> Instant {
        Instant::now() + Duration::from_secs(3600)
    }

    #[test]
    fn import_normalizes_line_endings() {
        let mut editor = build_editor("a\r\nb\rc");
        assert_eq!(editor.code(), "a\nb\nc");
        assert_eq!(editor.doc().line_count(), 3);
        assert!(!editor.undo());
    }

    #[test]
    fn import_highlights_everything() {
        let editor = build_editor("f (x)");
        let spans = editor.spans();
        assert!(spans.iter().all(|(style, _)| style.is_some()));
        assert_eq!(spans[0], (Some(Style::Site), "f".to_string()));
    }

    #[test]
    fn empty_editor() {
        let mut editor = Editor::new(Settings::default());
        assert_eq!(editor.code(), "");
        assert_eq!(editor.current_line(), 1);
        editor.insert("1 + 2");
        editor.settle();
        assert_eq!(editor.code(), "1 + 2");
        assert!(editor.undo());
        assert_eq!(editor.code(), "");
    }

    #[test]
    fn insert_then_undo_and_redo() {
        let mut editor = build_editor("x");
        editor.set_caret(LinePos::new(None, 1));
        editor.insert(" + y");
        assert_eq!(editor.caret(), LinePos::new(None, 5));
        editor.settle();
        assert_eq!(editor.code(), "x + y");
        assert!(editor.undo());
        assert_eq!(editor.code(), "x");
        assert!(editor.redo());
        assert_eq!(editor.code(), "x + y");
        assert!(!editor.redo());
    }

    #[test]
    fn timers_drive_highlighting_and_commit() {
        let mut editor = build_editor("x");
        editor.set_caret(LinePos::new(None, 1));
        editor.insert("1");
        assert!(editor.next_deadline().is_some());
        assert!(is_dirty(&editor));

        editor.run_due(later());
        assert!(!is_dirty(&editor));
        assert_eq!(editor.history().undo_depth(), 0);
        assert!(editor.history().has_touched());

        editor.run_due(later() + Duration::from_secs(1));
        assert_eq!(editor.history().undo_depth(), 1);
        assert_eq!(editor.next_deadline(), None);
    }

    #[test]
    fn typing_in_bursts_forms_levels() {
        let mut editor = build_editor("");
        editor.insert("a");
        editor.settle();
        editor.insert("b");
        editor.settle();
        assert_eq!(editor.history().undo_depth(), 2);
        editor.undo();
        assert_eq!(editor.code(), "a");
    }

    #[test]
    fn delete_backward_joins_lines() {
        let mut editor = build_editor("ab\ncd");
        editor.jump_to_line(2);
        editor.delete_backward(1);
        assert_eq!(editor.code(), "abcd");
        assert_eq!(editor.caret(), LinePos::new(None, 2));
        editor.settle();
        assert!(editor.undo());
        assert_eq!(editor.code(), "ab\ncd");
    }

    #[test]
    fn delete_forward_at_end_of_line() {
        let mut editor = build_editor("ab\ncd");
        editor.set_caret(LinePos::new(None, 2));
        editor.delete_forward(2);
        assert_eq!(editor.code(), "abd");
        editor.delete_backward(10);
        assert_eq!(editor.code(), "d");
        assert_eq!(editor.caret(), LinePos::start());
    }

    #[test]
    fn insert_line_breaks() {
        let mut editor = build_editor("ab");
        editor.set_caret(LinePos::new(None, 1));
        editor.insert("1\r\n2\n3");
        assert_eq!(editor.code(), "a1\n2\n3b");
        assert_eq!(editor.current_line(), 3);
        assert_eq!(editor.caret().offset, 1);
        editor.settle();
        assert!(!is_dirty(&editor));
        assert!(
            editor
                .spans()
                .iter()
                .all(|(style, text)| style.is_some() || text == "\n")
        );
    }

    #[test]
    fn selection_text_and_replacement() {
        let mut editor = build_editor("hello\nworld");
        let line2 = editor.doc().nth_line(2);
        editor.select(LinePos::new(None, 1), LinePos::new(line2, 2));
        assert_eq!(editor.selected_text(), "ello\nwo");

        assert!(editor.replace_selection("EY"));
        assert_eq!(editor.code(), "hEYrld");
        assert_eq!(editor.caret(), LinePos::new(None, 3));
        assert_eq!(
            editor.selection(),
            Some((LinePos::new(None, 1), LinePos::new(None, 3)))
        );

        assert!(editor.undo());
        assert_eq!(editor.code(), "hello\nworld");
    }

    #[test]
    fn reversed_selection() {
        let mut editor = build_editor("abcdef");
        editor.select(LinePos::new(None, 4), LinePos::new(None, 1));
        assert_eq!(editor.selected_text(), "bcd");
        assert_eq!(editor.caret(), LinePos::new(None, 1));
    }

    #[test]
    fn nothing_selected() {
        let mut editor = build_editor("abc");
        assert_eq!(editor.selected_text(), "");
        assert!(!editor.replace_selection("x"));
    }

    #[test]
    fn replace_range_with_lines() {
        let mut editor = build_editor("a\nb\nc");
        let line2 = editor.doc().nth_line(2);
        let end = editor.replace_range(LinePos::new(line2, 0), LinePos::new(line2, 1), "x\ny");
        assert_eq!(editor.code(), "a\nx\ny\nc");
        assert_eq!(end.offset, 1);
        assert_eq!(editor.doc().line_number(end.line), 3);
        editor.settle();
        assert!(editor.undo());
        assert_eq!(editor.code(), "a\nb\nc");
    }

    #[test]
    fn jump_to_line_clamps() {
        let mut editor = build_editor("a\nb\nc");
        editor.jump_to_line(3);
        assert_eq!(editor.current_line(), 3);
        editor.jump_to_line(99);
        assert_eq!(editor.current_line(), 3);
        editor.jump_to_line(1);
        assert_eq!(editor.caret(), LinePos::start());
    }

    #[test]
    fn indent_after_line_break() {
        let mut editor = build_editor("  a");
        editor.set_caret(LinePos::new(None, 3));
        editor.insert("\n");
        editor.indent_at_cursor();
        assert_eq!(editor.code(), "  a\n  ");
        assert_eq!(editor.caret().offset, 2);
        editor.insert("b");
        editor.settle();
        assert_eq!(editor.code(), "  a\n  b");
    }

    #[test]
    fn indent_first_line_removes_whitespace() {
        let mut editor = build_editor("   x");
        editor.set_caret(LinePos::new(None, 4));
        editor.indent_at_cursor();
        assert_eq!(editor.code(), "x");
        assert_eq!(editor.caret(), LinePos::new(None, 1));
    }

    #[test]
    fn reindent_document() {
        let mut editor = build_editor("  a\n    b\n c");
        editor.reindent();
        editor.settle();
        assert_eq!(editor.code(), "a\nb\nc");
        assert!(editor.undo());
        assert_eq!(editor.code(), "  a\n    b\n c");
    }

    #[test]
    fn reparse_restyles() {
        let mut editor = build_editor("1 + x");
        editor.reparse();
        editor.settle();
        assert_eq!(editor.code(), "1 + x");
        assert!(editor.spans().iter().all(|(style, _)| style.is_some()));
        assert_eq!(editor.history().undo_depth(), 0);
    }

    #[test]
    fn mark_cursor_dirty_is_not_an_edit() {
        let mut editor = build_editor("a\nb");
        editor.jump_to_line(2);
        editor.mark_cursor_dirty();
        editor.settle();
        assert!(!editor.undo());
    }

    #[test]
    fn changed_settings_apply() {
        let mut editor = build_editor("");
        for c in ["a", "b", "c"] {
            editor.insert(c);
            editor.settle();
        }
        assert_eq!(editor.history().undo_depth(), 3);

        editor.set_settings(Settings {
            lines_per_pass: 1,
            undo_depth: 2,
            continuous_scan: 100,
            ..Settings::default()
        });
        assert_eq!(editor.history().undo_depth(), 2);
        assert_eq!(editor.settings().lines_per_pass, 1);
        assert!(editor.next_deadline().is_some());

        editor.import("a\nb\nc");
        editor.jump_to_line(1);
        editor.insert("x");
        editor.run_due(later());
        assert!(editor.next_deadline().is_some());
        editor.set_settings(Settings::default());
        editor.settle();
        assert!(!is_dirty(&editor));
        assert_eq!(editor.next_deadline(), None);
    }

    #[test]
    fn continuous_scan_is_scheduled() {
        let settings = Settings {
            continuous_scan: 50,
            ..Settings::default()
        };
        let mut editor = Editor::new(settings);
        editor.import("a\nb");
        assert!(editor.next_deadline().is_some());
        editor.run_due(later());
        assert!(editor.next_deadline().is_some());
        assert_eq!(editor.code(), "a\nb");
    }
}
