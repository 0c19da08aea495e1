//! Incremental highlighting.
//!
//! The highlighter reconciles the spans of a [`Document`] with the tokens that the
//! [`Parser`] produces for the same text. Tokenization restarts from the nearest
//! line break holding a clean [`Checkpoint`](crate::parser::Checkpoint), so an edit
//! only costs the lines that are actually affected by it.
//!
//! Work is bounded by a budget of lines per pass. Nodes in need of highlighting are
//! queued with [`Highlighter::add_dirty`] and processed by
//! [`Highlighter::highlight_dirty`], which reports whether work remains so that the
//! caller can schedule another pass.

use crate::document::{Document, DocumentRef, Node, NodeId, Span};
use crate::etc;
use crate::history::History;
use crate::parser::Parser;
use crate::stream::ChunkStream;
use crate::token::Token;
use std::cell::{Ref, RefMut};
use tracing::{debug, trace};

/// The outcome of a single [`Highlighter::highlight`] pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Progress {
    /// The remaining budget, which is `None` if the pass was unbounded.
    pub left: Option<usize>,

    /// The first node following the line break where the pass stopped, or `None` if
    /// the pass reached the end of the document.
    pub node: Option<NodeId>,

    /// Indicates that the last line processed needed changes.
    pub dirty: bool,
}

pub struct Highlighter {
    doc: DocumentRef,

    /// Nodes queued for highlighting, most recent last.
    dirty: Vec<NodeId>,

    lines_per_pass: usize,

    /// Where the next step of the continuous scan resumes.
    scan_pos: Option<NodeId>,
}

/// An iterator over the text of nodes, which feeds the parser.
///
/// The id of the following node is captured as each node is yielded. This is safe
/// while the document is being reconciled, since reconciliation only ever modifies
/// nodes whose text the parser has already consumed.
struct Chunks {
    doc: DocumentRef,
    next: Option<NodeId>,
}

/// The position of reconciliation, which trails the parser.
struct Cursor {
    node: Option<NodeId>,
}

impl Iterator for Chunks {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let id = self.next?;
        let doc = self.doc.borrow();
        let text = doc.get(id)?.text().to_string();
        self.next = doc.next(id);
        Some(text)
    }
}

impl Cursor {
    fn get(&self) -> Option<NodeId> {
        self.node
    }

    fn advance(&mut self, doc: &Document) {
        self.node = self.node.and_then(|id| doc.next(id));
    }

    fn remove(&mut self, doc: &mut Document) {
        if let Some(id) = self.node {
            self.node = doc.next(id);
            doc.remove(id);
        }
    }

    /// Returns the current node after pruning empty spans, though an empty span that
    /// is the only content of its line is kept and marked clean.
    fn get_non_empty(&mut self, doc: &mut Document) -> Option<NodeId> {
        while let Some(id) = self.node {
            match doc.span(id) {
                Some(span) if span.text.len() == 0 => (),
                _ => break,
            }
            let alone = doc.prev(id).is_none_or(|prev| doc.is_break(prev))
                && doc.next(id).is_none_or(|next| doc.is_break(next));
            if alone {
                if let Some(span) = doc.span_mut(id) {
                    span.dirty = false;
                }
                self.advance(doc);
            } else {
                self.remove(doc);
            }
        }
        self.node
    }
}

impl Highlighter {
    pub fn new(doc: DocumentRef, lines_per_pass: usize) -> Highlighter {
        Highlighter {
            doc,
            dirty: Vec::new(),
            lines_per_pass,
            scan_pos: None,
        }
    }

    pub fn set_lines_per_pass(&mut self, lines_per_pass: usize) {
        self.lines_per_pass = lines_per_pass;
    }

    /// Queues `id`, or the first node of the document if `None`, for highlighting
    /// and marks it dirty.
    pub fn add_dirty(&mut self, id: Option<NodeId>) {
        let mut doc = self.doc.borrow_mut();
        if let Some(id) = id.or_else(|| doc.first()) {
            if !self.dirty.contains(&id) {
                if let Some(node) = doc.get_mut(id) {
                    node.set_dirty(true);
                }
                self.dirty.push(id);
            }
        }
    }

    /// Returns `true` if a queued node is still waiting to be highlighted.
    pub fn has_dirty(&self) -> bool {
        let doc = self.doc();
        self.dirty.iter().any(|id| is_pending(&doc, *id))
    }

    /// Marks every node dirty and queues the whole document.
    pub fn reparse(&mut self) {
        {
            let mut doc = self.doc_mut();
            let ids = doc.iter().map(|(id, _)| id).collect::<Vec<_>>();
            for id in ids {
                if let Some(node) = doc.get_mut(id) {
                    node.set_dirty(true);
                }
            }
        }
        debug!("reparse");
        self.add_dirty(None);
    }

    /// Highlights queued nodes for at most one pass worth of lines, or without limit
    /// if `all` is `true`.
    ///
    /// Returns `true` if the budget ran out while work remains.
    pub fn highlight_dirty(&mut self, history: &mut History, all: bool) -> bool {
        let mut left = if all { None } else { Some(self.lines_per_pass) };
        while left != Some(0) {
            let Some(id) = self.next_dirty() else {
                break;
            };
            if let Some(progress) = self.highlight(history, Some(id), left, false) {
                left = progress.left;
                if let Some(next) = progress.node {
                    // Resume after the checkpoint just stored, not at the line before it.
                    if progress.left == Some(0) || progress.dirty {
                        self.add_dirty(Some(next));
                    }
                }
            }
        }
        left == Some(0) && self.has_dirty()
    }

    /// Advances the continuous scan by one pass, wrapping around to the start of the
    /// document once the end has been reached.
    pub fn scan_step(&mut self, history: &mut History) -> Option<Progress> {
        if let Some(id) = self.scan_pos {
            if !self.doc().is_attached(id) {
                self.scan_pos = None;
            }
        }
        let progress = self.highlight(history, self.scan_pos, Some(self.lines_per_pass), true);
        self.scan_pos = progress.and_then(|progress| progress.node);
        progress
    }

    /// Highlights one line at a time until the break `line` is clean, which makes its
    /// indentation available.
    pub fn highlight_at(&mut self, history: &mut History, line: Option<NodeId>) {
        let Some(line) = line else {
            return;
        };
        loop {
            let ready = match self.doc().line_break(line) {
                Some(brk) => !brk.dirty && brk.indentation.is_some(),
                None => true,
            };
            if ready || !self.doc().is_attached(line) {
                break;
            }
            match self.highlight(history, Some(line), Some(1), true) {
                Some(Progress { node: Some(_), .. }) => (),
                _ => break,
            }
        }
    }

    /// Runs a single highlighting pass starting at the nearest clean checkpoint at or
    /// before `from`.
    ///
    /// Every line break reached is touched in `history`. The pass stops when `budget`
    /// lines have been processed, at the end of the document, or, unless `scan` is
    /// `true`, once two consecutive lines needed no change.
    ///
    /// Returns `None` if there is nothing to highlight.
    pub fn highlight(
        &mut self,
        history: &mut History,
        from: Option<NodeId>,
        budget: Option<usize>,
        scan: bool,
    ) -> Option<Progress> {
        let (start, first, checkpoint) = {
            let doc = self.doc();
            if doc.is_empty() {
                return None;
            }
            let mut start = from;
            while let Some(id) = start {
                match doc.line_break(id) {
                    Some(brk) if !brk.dirty && brk.checkpoint.is_some() => break,
                    _ => start = doc.prev(id),
                }
            }
            let first = doc.line_first(start);
            if start.is_some() && first.is_none() {
                return None;
            }
            let checkpoint = start
                .and_then(|id| doc.line_break(id))
                .and_then(|brk| brk.checkpoint);
            (start, first, checkpoint)
        };
        debug!(?start, ?budget, scan, "highlight pass");

        history.touch(start);
        let stream = ChunkStream::new(Chunks {
            doc: self.doc.clone(),
            next: first,
        });
        let mut parser = match checkpoint {
            Some(checkpoint) => checkpoint.restore(stream),
            None => Parser::new(stream),
        };
        let mut cursor = Cursor { node: first };
        let mut left = budget;

        // Whether the current line needed changes, whether it has any tokens, and
        // whether the previous line needed changes.
        let mut changed = false;
        let mut tokens = false;
        let mut prev_changed = true;

        while let Some(token) = parser.next() {
            let mut doc = self.doc_mut();
            let node = cursor.get_non_empty(&mut doc);
            if token.is_newline() {
                let brk = match node {
                    Some(id) => doc.line_break_mut(id),
                    None => None,
                };
                match brk {
                    Some(brk) => {
                        // Same tokens can still leave the lexer in a different state.
                        let checkpoint = parser.checkpoint();
                        if brk.dirty
                            || brk.indentation.is_none()
                            || brk.checkpoint != Some(checkpoint)
                        {
                            changed = true;
                        }
                        brk.checkpoint = Some(checkpoint);
                        brk.indentation = token.indentation;
                        brk.dirty = false;
                    }
                    None => panic!("parser out of sync: expected line break"),
                }
                history.touch(node);
                left = left.map(|n| n.saturating_sub(1));
                cursor.advance(&doc);
                if left == Some(0) || (!scan && !changed && tokens && !prev_changed) {
                    trace!(?node, ?left, "highlight stopped");
                    return Some(Progress {
                        left,
                        node: cursor.get(),
                        dirty: changed,
                    });
                }
                prev_changed = changed;
                changed = false;
                tokens = false;
            } else {
                let span = match node {
                    Some(id) => doc.span_mut(id),
                    None => None,
                };
                let span = match span {
                    Some(span) => span,
                    None => panic!("parser out of sync: expected span"),
                };
                if span.dirty {
                    changed = true;
                }
                tokens = true;
                if !span.reduced && span.text == token.text && span.style == Some(token.style) {
                    span.dirty = false;
                    cursor.advance(&doc);
                } else {
                    changed = true;
                    replace_span(&mut doc, &mut cursor, &token);
                }
            }
        }
        cursor.get_non_empty(&mut self.doc_mut());
        Some(Progress {
            left,
            node: None,
            dirty: changed,
        })
    }

    /// Pops queued nodes until one is found that still needs highlighting.
    fn next_dirty(&mut self) -> Option<NodeId> {
        let doc = self.doc.borrow();
        while let Some(id) = self.dirty.pop() {
            if is_pending(&doc, id) {
                return Some(id);
            }
        }
        None
    }

    fn doc(&self) -> Ref<'_, Document> {
        self.doc.borrow()
    }

    fn doc_mut(&self) -> RefMut<'_, Document> {
        self.doc.borrow_mut()
    }
}

fn is_pending(doc: &Document, id: NodeId) -> bool {
    doc.is_attached(id) && doc.get(id).is_some_and(Node::is_dirty)
}

/// Inserts a span rendering `token` at the cursor and consumes as many characters
/// as the token holds from the spans that follow.
fn replace_span(doc: &mut Document, cursor: &mut Cursor, token: &Token) {
    doc.insert_before(
        Node::Span(Span::styled(&token.text, token.style)),
        cursor.get(),
    );
    let mut n = token.len();
    while n > 0 {
        let Some(id) = cursor.get() else {
            break;
        };
        let len = match doc.span(id) {
            Some(span) => span.len(),
            None => panic!("parser out of sync: expected span"),
        };
        if len > n {
            if let Some(span) = doc.span_mut(id) {
                span.text = etc::slice_pos(&span.text, n, usize::MAX).to_string();
                span.reduced = true;
            }
            n = 0;
        } else {
            n -= len;
            cursor.remove(doc);
        }
    }
    trace!(text = token.text, style = %token.style, "replaced span");
}
