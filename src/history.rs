//! Edit history.
//!
//! The history keeps a committed record of every line in the document, indexed by
//! the line break that precedes it and by the line break that follows it. Lines
//! touched by the highlighter are compared against those records when the history
//! is [committed](History::commit), and runs of adjacent changed lines are gathered
//! into *chains*. Replacing a chain with the records it supersedes, the *shadow*
//! chain, is what undoing amounts to.
//!
//! Line records always cover the whole document. A record whose `from` is `None`
//! is the first line and one whose `to` is `None` is the last line.

use crate::document::{Document, LinePos, Node, NodeId, Span};
use crate::etc;
use indexmap::IndexSet;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use tracing::debug;

/// A committed line of text.
#[derive(Debug, PartialEq, Eq)]
pub struct Line {
    /// The break preceding the line.
    pub from: Option<NodeId>,

    /// The break following the line.
    pub to: Option<NodeId>,

    pub text: String,
}

pub type LineRef = Rc<Line>;

/// A run of adjacent lines.
type Chain = Vec<LineRef>;

/// All chains changed by a single commit.
type Level = Vec<Chain>;

/// The outcome of replacing lines of the document.
#[derive(Debug, PartialEq, Eq)]
pub struct Applied {
    /// Nodes after which lines were replaced, which need highlighting.
    pub dirty: Vec<Option<NodeId>>,

    /// The caret adjusted to the replacement, if one was given.
    pub caret: Option<LinePos>,
}

pub struct History {
    /// Maximum number of undo levels retained.
    max_depth: usize,

    /// Line records indexed by the break preceding each line.
    after: HashMap<Option<NodeId>, LineRef>,

    /// Line records indexed by the break following each line.
    before: HashMap<Option<NodeId>, LineRef>,

    /// Breaks whose lines may have changed since the last commit.
    touched: IndexSet<NodeId>,

    /// Indicates that the first line may have changed since the last commit.
    first_touched: bool,

    undo: VecDeque<Level>,
    redo: Vec<Level>,
}

impl Line {
    pub fn new(from: Option<NodeId>, to: Option<NodeId>, text: &str) -> Line {
        Line {
            from,
            to,
            text: text.to_string(),
        }
    }

    pub fn to_ref(self) -> LineRef {
        Rc::new(self)
    }
}

impl History {
    pub fn new(max_depth: usize) -> History {
        let empty = Line::new(None, None, "").to_ref();
        History {
            max_depth,
            after: HashMap::from([(None, empty.clone())]),
            before: HashMap::from([(None, empty)]),
            touched: IndexSet::new(),
            first_touched: false,
            undo: VecDeque::new(),
            redo: Vec::new(),
        }
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
        while self.undo.len() > max_depth {
            self.undo.pop_front();
        }
    }

    /// Records that the line following `node`, or the first line if `None`, may
    /// have changed.
    pub fn touch(&mut self, node: Option<NodeId>) {
        match node {
            Some(id) => {
                self.touched.insert(id);
            }
            None => self.first_touched = true,
        }
    }

    /// Returns the touched lines in the order they will be committed.
    pub fn touched(&self) -> Vec<Option<NodeId>> {
        self.first_touched
            .then_some(None)
            .into_iter()
            .chain(self.touched.iter().map(|id| Some(*id)))
            .collect()
    }

    pub fn has_touched(&self) -> bool {
        self.first_touched || self.touched.len() > 0
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Returns the committed text of the line following `line`.
    pub fn text_after(&self, line: Option<NodeId>) -> &str {
        &self.after_line(line).text
    }

    /// Returns the break terminating the line following `line`.
    pub fn node_after(&self, line: Option<NodeId>) -> Option<NodeId> {
        self.after_line(line).to
    }

    /// Returns the break preceding the line terminated by `line`.
    pub fn node_before(&self, line: Option<NodeId>) -> Option<NodeId> {
        self.before_line(line).from
    }

    /// Gathers touched lines that differ from their records into chains, and
    /// records them as a new undo level.
    ///
    /// Returns `true` if an undo level was added.
    pub fn commit(&mut self, doc: &Document) -> bool {
        let chains = self.touched_chains(doc);
        if chains.len() > 0 {
            debug!(chains = chains.len(), "commit");
            let level = chains
                .into_iter()
                .map(|chain| {
                    let shadow = self.shadow_chain(&chain);
                    self.link_chain(&chain);
                    shadow
                })
                .collect();
            self.add_undo_level(level);
            self.redo.clear();
            true
        } else {
            false
        }
    }

    /// Reverts the most recent undo level, returning `None` if there is none.
    pub fn undo(&mut self, doc: &mut Document, caret: Option<LinePos>) -> Option<Applied> {
        let level = self.undo.pop_back()?;
        debug!(depth = self.undo.len(), "undo");
        let (shadow, applied) = self.apply_level(doc, &level, caret);
        self.redo.push(shadow);
        Some(applied)
    }

    /// Reapplies the most recently undone level, returning `None` if there is none.
    pub fn redo(&mut self, doc: &mut Document, caret: Option<LinePos>) -> Option<Applied> {
        let level = self.redo.pop()?;
        debug!(depth = self.redo.len(), "redo");
        let (shadow, applied) = self.apply_level(doc, &level, caret);
        self.add_undo_level(shadow);
        Some(applied)
    }

    /// Replaces the lines between the breaks `from` and `to` with `lines`, recording
    /// the replacement as an undo level.
    ///
    /// The caller is expected to have committed pending changes beforehand.
    pub fn push(
        &mut self,
        doc: &mut Document,
        from: Option<NodeId>,
        to: Option<NodeId>,
        lines: &[String],
        caret: Option<LinePos>,
    ) -> Applied {
        assert!(lines.len() > 0, "at least one line expected");
        let mut chain = Vec::new();
        let mut start = from;
        for (i, text) in lines.iter().enumerate() {
            let end = if i == lines.len() - 1 {
                to
            } else {
                Some(doc.create_break())
            };
            chain.push(Line::new(start, end, text).to_ref());
            start = end;
        }
        let (shadow, applied) = self.apply_level(doc, &[chain], caret);
        self.add_undo_level(shadow);
        self.redo.clear();
        applied
    }

    /// Forgets all undo and redo levels.
    pub fn reset(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// Releases detached breaks of `doc` that are no longer referenced by any line
    /// record.
    pub fn purge(&mut self, doc: &mut Document) {
        let mut live = HashSet::new();
        let levels = self.undo.iter().chain(self.redo.iter());
        for line in levels.flatten().flatten() {
            live.extend(line.from);
            live.extend(line.to);
        }
        for (key, line) in &self.after {
            if key.is_none_or(|id| doc.is_attached(id)) {
                live.extend(line.from);
                live.extend(line.to);
            }
        }
        for id in doc.detached() {
            if !live.contains(&id) {
                doc.release(id);
                self.after.remove(&Some(id));
                self.before.remove(&Some(id));
            }
        }
    }

    fn after_line(&self, line: Option<NodeId>) -> &LineRef {
        self.after
            .get(&line)
            .unwrap_or_else(|| panic!("{line:?}: missing line record"))
    }

    fn before_line(&self, line: Option<NodeId>) -> &LineRef {
        self.before
            .get(&line)
            .unwrap_or_else(|| panic!("{line:?}: missing line record"))
    }

    fn add_undo_level(&mut self, level: Level) {
        self.undo.push_back(level);
        if self.undo.len() > self.max_depth {
            self.undo.pop_front();
        }
    }

    fn touched_chains(&mut self, doc: &Document) -> Vec<Chain> {
        let mut nodes = self.touched.drain(..).map(Some).collect::<Vec<_>>();
        if self.first_touched {
            nodes.push(None);
            self.first_touched = false;
        }

        // Changed lines, also indexed by their preceding break.
        let mut changed = Vec::new();
        let mut temp = HashMap::new();
        for node in nodes {
            if node.is_some_and(|id| !doc.is_attached(id)) {
                continue;
            }
            let (text, to) = doc.line_text(node);
            let line = Line::new(node, to, &text).to_ref();
            let same = self
                .after
                .get(&node)
                .is_some_and(|prev| etc::same_text(&prev.text, &line.text) && prev.to == line.to);
            if !same {
                temp.insert(node, line.clone());
                changed.push(line);
            }
        }

        let mut chains = Vec::new();
        for line in changed {
            if !temp.contains_key(&line.from) {
                continue;
            }
            let mut chain = VecDeque::new();
            let mut cur = line.from;
            while let Some(prev) = temp.remove(&cur) {
                chain.push_front(prev);
                match cur {
                    Some(id) => cur = doc.prev_break(id),
                    None => break,
                }
            }
            let mut cur = line.to;
            while let Some(id) = cur {
                match temp.remove(&cur) {
                    Some(next) => chain.push_back(next),
                    None => break,
                }
                cur = doc.next_break(id);
            }

            let chain = Vec::from(chain);
            let known = match (chain.first(), chain.last()) {
                (Some(first), Some(last)) => {
                    self.after.contains_key(&first.from) && self.before.contains_key(&last.to)
                }
                _ => false,
            };
            if known {
                chains.push(chain);
            } else {
                for line in chain {
                    self.touch(line.from);
                }
            }
        }
        chains
    }

    /// Returns the records currently covering the lines spanned by `chain`.
    fn shadow_chain(&self, chain: &[LineRef]) -> Chain {
        let end = chain.last().and_then(|line| line.to);
        let mut shadow = Vec::new();
        let mut next = self.after_line(chain.first().and_then(|line| line.from));
        loop {
            shadow.push(next.clone());
            match next.to {
                Some(to) if Some(to) != end => next = self.after_line(Some(to)),
                _ => break,
            }
        }
        shadow
    }

    fn link_chain(&mut self, chain: &[LineRef]) {
        for line in chain {
            self.after.insert(line.from, line.clone());
            self.before.insert(line.to, line.clone());
        }
    }

    fn apply_level(
        &mut self,
        doc: &mut Document,
        level: &[Chain],
        caret: Option<LinePos>,
    ) -> (Level, Applied) {
        let mut shadow = Vec::new();
        let mut applied = Applied {
            dirty: Vec::new(),
            caret,
        };
        for chain in level {
            shadow.push(self.shadow_chain(chain));
            let (from, caret) = self.apply_chain(doc, chain, applied.caret);
            applied.dirty.push(from);
            applied.caret = caret;
        }
        (shadow, applied)
    }

    /// Replaces the nodes between the endpoints of `chain` with its lines.
    ///
    /// Returns the break preceding the chain and the caret, adjusted to the new text.
    fn apply_chain(
        &mut self,
        doc: &mut Document,
        chain: &[LineRef],
        caret: Option<LinePos>,
    ) -> (Option<NodeId>, Option<LinePos>) {
        let from = chain.first().and_then(|line| line.from);
        let end = chain.last().and_then(|line| line.to);

        let mut cur = doc.line_first(from);
        while let Some(id) = cur {
            if Some(id) == end {
                break;
            }
            cur = doc.next(id);
            doc.remove(id);
        }

        let mut caret = caret;
        let last = chain.len() - 1;
        for (i, line) in chain.iter().enumerate() {
            if i > 0 {
                if let Some(brk) = line.from {
                    doc.remove(brk);
                    doc.attach_before(brk, end);
                    if let Some(brk) = doc.line_break_mut(brk) {
                        brk.dirty = true;
                    }
                }
            }
            doc.insert_before(Node::Span(Span::new(&line.text)), end);
            caret = caret.map(|pos| self.caret_hint(doc, pos, line, i == last));
        }
        self.link_chain(chain);
        (from, caret)
    }

    /// Moves a caret sitting on `line` so that it keeps its place relative to the
    /// text that follows it.
    fn caret_hint(&self, doc: &Document, pos: LinePos, line: &Line, last: bool) -> LinePos {
        let len = etc::char_len(&line.text);
        if pos.line == line.from {
            let mut offset = pos.offset;
            if last {
                if let Some(prev) = self.after.get(&line.from) {
                    let common = line
                        .text
                        .chars()
                        .zip(prev.text.chars())
                        .take(pos.offset)
                        .take_while(|(a, b)| a == b)
                        .count();
                    if pos.offset > common {
                        offset = (offset + len).saturating_sub(etc::char_len(&prev.text));
                    }
                }
            }
            LinePos::new(line.from, offset.min(len))
        } else if last && pos.line.is_some_and(|id| !doc.is_attached(id)) {
            LinePos::new(line.from, len)
        } else {
            pos
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn build_history(lines: &[&str], max_depth: usize) -> (History, Document) {
        let mut doc = Document::new();
        let mut history = History::new(max_depth);
        let lines = lines.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        history.push(&mut doc, None, None, &lines, None);
        history.reset();
        (history, doc)
    }

    #[test]
    fn push_replaces_document() {
        let (history, doc) = build_history(&["ab", "cd"], 10);
        assert_eq!(doc.text(), "ab\ncd");
        assert_eq!(history.text_after(None), "ab");
        let line2 = history.node_after(None);
        assert_eq!(line2, doc.nth_line(2));
        assert_eq!(history.text_after(line2), "cd");
        assert_eq!(history.node_after(line2), None);
        assert_eq!(history.node_before(None), line2);
        assert_eq!(history.undo_depth(), 0);
    }

    #[test]
    fn unchanged_lines_commit_nothing() {
        let (mut history, doc) = build_history(&["ab", "cd"], 10);
        history.touch(None);
        history.touch(doc.nth_line(2));
        assert!(!history.commit(&doc));
        assert!(!history.has_touched());
    }

    #[test]
    fn commit_and_undo_single_line() {
        let (mut history, mut doc) = build_history(&["ab", "cd"], 10);
        doc.insert_text(LinePos::new(None, 2), "!");
        history.touch(None);
        assert!(history.commit(&doc));
        assert_eq!(history.text_after(None), "ab!");

        let applied = history.undo(&mut doc, None).unwrap();
        assert_eq!(doc.text(), "ab\ncd");
        assert_eq!(applied.dirty, vec![None]);
        assert_eq!(history.redo_depth(), 1);

        history.redo(&mut doc, None).unwrap();
        assert_eq!(doc.text(), "ab!\ncd");
        assert_eq!(history.undo_depth(), 1);
        assert_eq!(history.redo_depth(), 0);
    }

    #[test]
    fn split_line_is_one_chain() {
        let (mut history, mut doc) = build_history(&["ab", "cd"], 10);
        let (end, _) = doc.insert_text(LinePos::new(None, 1), "\n");
        history.touch(None);
        history.touch(end.line);
        assert!(history.commit(&doc));

        let applied = history.undo(&mut doc, Some(end)).unwrap();
        assert_eq!(doc.text(), "ab\ncd");
        assert!(!doc.is_attached(end.line.unwrap()));
        assert_eq!(applied.caret, Some(LinePos::new(None, 2)));

        history.redo(&mut doc, None).unwrap();
        assert_eq!(doc.text(), "a\nb\ncd");
        assert!(doc.is_attached(end.line.unwrap()));
    }

    #[test]
    fn separate_lines_form_separate_chains() {
        let (mut history, mut doc) = build_history(&["a", "b", "c"], 10);
        let line3 = doc.nth_line(3);
        doc.insert_text(LinePos::new(None, 1), "1");
        doc.insert_text(LinePos::new(line3, 1), "3");
        history.touch(None);
        history.touch(line3);
        assert!(history.commit(&doc));

        let applied = history.undo(&mut doc, None).unwrap();
        assert_eq!(applied.dirty.len(), 2);
        assert_eq!(doc.text(), "a\nb\nc");
    }

    #[test]
    fn caret_follows_text_after_it() {
        let (mut history, mut doc) = build_history(&["ab"], 10);
        doc.insert_text(LinePos::new(None, 2), "!");
        history.touch(None);
        history.commit(&doc);
        let applied = history.undo(&mut doc, Some(LinePos::new(None, 3))).unwrap();
        assert_eq!(applied.caret, Some(LinePos::new(None, 2)));

        // A caret within the common prefix stays put.
        let applied = history.redo(&mut doc, Some(LinePos::new(None, 1))).unwrap();
        assert_eq!(applied.caret, Some(LinePos::new(None, 1)));
    }

    #[test]
    fn undo_depth_is_bounded() {
        let (mut history, mut doc) = build_history(&["x"], 2);
        for c in ["a", "b", "c"] {
            doc.insert_text(LinePos::new(None, 0), c);
            history.touch(None);
            history.commit(&doc);
        }
        assert_eq!(history.undo_depth(), 2);
        assert!(history.undo(&mut doc, None).is_some());
        assert!(history.undo(&mut doc, None).is_some());
        assert!(history.undo(&mut doc, None).is_none());
        assert_eq!(doc.text(), "ax");
    }

    #[test]
    fn commit_clears_redo() {
        let (mut history, mut doc) = build_history(&["x"], 10);
        doc.insert_text(LinePos::new(None, 1), "y");
        history.touch(None);
        history.commit(&doc);
        history.undo(&mut doc, None);
        assert_eq!(history.redo_depth(), 1);

        doc.insert_text(LinePos::new(None, 1), "z");
        history.touch(None);
        history.commit(&doc);
        assert_eq!(history.redo_depth(), 0);
        assert!(history.redo(&mut doc, None).is_none());
    }

    #[test]
    fn detached_touched_breaks_are_ignored() {
        let (mut history, mut doc) = build_history(&["a", "b"], 10);
        let line2 = doc.nth_line(2);
        doc.delete_text(LinePos::new(None, 1), 1);
        history.touch(line2);
        assert!(!history.commit(&doc));
    }

    #[test]
    fn purge_keeps_breaks_needed_for_undo() {
        let (mut history, mut doc) = build_history(&["a", "b"], 10);
        let line2 = doc.nth_line(2).unwrap();
        doc.delete_text(LinePos::new(None, 1), 1);
        history.touch(None);
        history.commit(&doc);
        history.purge(&mut doc);
        assert!(doc.get(line2).is_some());

        history.undo(&mut doc, None);
        assert_eq!(doc.text(), "a\nb");
        assert!(doc.is_attached(line2));
    }

    #[test]
    fn purge_releases_forgotten_breaks() {
        let (mut history, mut doc) = build_history(&["a", "b"], 0);
        let line2 = doc.nth_line(2).unwrap();
        doc.delete_text(LinePos::new(None, 1), 1);
        history.touch(None);
        history.commit(&doc);
        history.purge(&mut doc);
        assert!(doc.get(line2).is_none());
        assert!(doc.detached().is_empty());
    }

    #[test]
    #[should_panic(expected = "missing line record")]
    fn missing_record_panics() {
        let (history, mut doc) = build_history(&["a"], 10);
        let brk = doc.create_break();
        history.text_after(Some(brk));
    }
}
