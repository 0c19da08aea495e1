//! Documents as a sequence of styled spans and line breaks.
//!
//! A document is an ordered, doubly-linked sequence of [nodes](Node) stored in an
//! [`Arena`]. A *line* consists of the spans between two line breaks, or between a
//! line break and either end of the document. Lines are identified by the break
//! that precedes them, where `None` stands for the first line.
//!
//! Removing a span frees it. Removing a line break merely detaches it, since the
//! edit history may put the very same break back into the document when an edit
//! is undone. Detached breaks are [released](Document::release) once nothing
//! refers to them anymore.

use crate::arena::{Arena, Id};
use crate::etc;
use crate::parser::Checkpoint;
use crate::token::Style;
use std::cell::RefCell;
use std::cmp;
use std::rc::Rc;

/// A handle to a node in a [`Document`].
pub type NodeId = Id<Slot>;

pub type DocumentRef = Rc<RefCell<Document>>;

pub enum Node {
    Span(Span),
    Break(Break),
}

/// A run of text rendered with a single style.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    /// The text currently displayed by this span.
    pub text: String,

    /// The style of this span or `None` if the text has not been highlighted yet.
    pub style: Option<Style>,

    /// Indicates that the text changed since the span was last highlighted.
    pub dirty: bool,

    /// Indicates that the highlighter consumed a prefix of this span, which means
    /// it no longer corresponds to a single token.
    pub reduced: bool,
}

/// A line break, which is where the highlighter caches parser state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Break {
    pub dirty: bool,

    /// Parser state for tokenizing the line that follows this break.
    pub checkpoint: Option<Checkpoint>,

    /// Indentation of the line that precedes this break.
    pub indentation: Option<usize>,
}

/// A node together with its links.
pub struct Slot {
    node: Node,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    attached: bool,
}

/// A position expressed as a line and a character offset within that line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LinePos {
    /// The break preceding the line, or `None` for the first line.
    pub line: Option<NodeId>,
    pub offset: usize,
}

pub struct Document {
    nodes: Arena<Slot>,
    first: Option<NodeId>,
    last: Option<NodeId>,
}

pub struct Iter<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Span {
    /// Returns an unstyled span in need of highlighting.
    pub fn new(text: &str) -> Span {
        Span {
            text: text.to_string(),
            style: None,
            dirty: true,
            reduced: false,
        }
    }

    pub fn styled(text: &str, style: Style) -> Span {
        Span {
            text: text.to_string(),
            style: Some(style),
            dirty: false,
            reduced: false,
        }
    }

    pub fn len(&self) -> usize {
        etc::char_len(&self.text)
    }
}

impl Break {
    /// Returns a new break, which is dirty and lacks a checkpoint.
    pub fn new() -> Break {
        Break {
            dirty: true,
            checkpoint: None,
            indentation: None,
        }
    }
}

impl Default for Break {
    fn default() -> Break {
        Break::new()
    }
}

impl Node {
    pub fn is_break(&self) -> bool {
        matches!(self, Node::Break(_))
    }

    /// Returns the text contributed by this node, which is `"\n"` for a break.
    pub fn text(&self) -> &str {
        match self {
            Node::Span(span) => &span.text,
            Node::Break(_) => "\n",
        }
    }

    pub fn is_dirty(&self) -> bool {
        match self {
            Node::Span(span) => span.dirty,
            Node::Break(brk) => brk.dirty,
        }
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        match self {
            Node::Span(span) => span.dirty = dirty,
            Node::Break(brk) => brk.dirty = dirty,
        }
    }
}

impl LinePos {
    pub fn new(line: Option<NodeId>, offset: usize) -> LinePos {
        LinePos { line, offset }
    }

    /// Returns the position at the start of the document.
    pub fn start() -> LinePos {
        LinePos::new(None, 0)
    }
}

impl Document {
    pub fn new() -> Document {
        Document {
            nodes: Arena::new(),
            first: None,
            last: None,
        }
    }

    /// Returns a document containing `text`, with one unstyled span per line.
    pub fn from_text(text: &str) -> Document {
        let mut doc = Document::new();
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                doc.insert_before(Node::Break(Break::new()), None);
            }
            doc.insert_before(Node::Span(Span::new(line)), None);
        }
        doc
    }

    pub fn to_ref(self) -> DocumentRef {
        Rc::new(RefCell::new(self))
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    pub fn first(&self) -> Option<NodeId> {
        self.first
    }

    pub fn last(&self) -> Option<NodeId> {
        self.last
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).and_then(|slot| slot.next)
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).and_then(|slot| slot.prev)
    }

    /// Returns the first node of the line following `line`.
    pub fn line_first(&self, line: Option<NodeId>) -> Option<NodeId> {
        match line {
            Some(id) => self.next(id),
            None => self.first,
        }
    }

    /// Returns `true` if `id` refers to a node that is part of the document.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.slot(id).is_some_and(|slot| slot.attached)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slot(id).map(|slot| &slot.node)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id).map(|slot| &mut slot.node)
    }

    pub fn span(&self, id: NodeId) -> Option<&Span> {
        match self.get(id) {
            Some(Node::Span(span)) => Some(span),
            _ => None,
        }
    }

    pub fn span_mut(&mut self, id: NodeId) -> Option<&mut Span> {
        match self.get_mut(id) {
            Some(Node::Span(span)) => Some(span),
            _ => None,
        }
    }

    pub fn line_break(&self, id: NodeId) -> Option<&Break> {
        match self.get(id) {
            Some(Node::Break(brk)) => Some(brk),
            _ => None,
        }
    }

    pub fn line_break_mut(&mut self, id: NodeId) -> Option<&mut Break> {
        match self.get_mut(id) {
            Some(Node::Break(brk)) => Some(brk),
            _ => None,
        }
    }

    pub fn is_break(&self, id: NodeId) -> bool {
        self.line_break(id).is_some()
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            doc: self,
            next: self.first,
        }
    }

    /// Inserts `node` before `before`, or at the end if `before` is `None`.
    pub fn insert_before(&mut self, node: Node, before: Option<NodeId>) -> NodeId {
        let id = self.nodes.insert(Slot {
            node,
            prev: None,
            next: None,
            attached: false,
        });
        self.link(id, before);
        id
    }

    /// Returns a new break that is not yet part of the document.
    pub fn create_break(&mut self) -> NodeId {
        self.nodes.insert(Slot {
            node: Node::Break(Break::new()),
            prev: None,
            next: None,
            attached: false,
        })
    }

    /// Puts a detached break back into the document before `before`, or at the end
    /// if `before` is `None`.
    ///
    /// This function panics if `id` does not refer to a detached node.
    pub fn attach_before(&mut self, id: NodeId, before: Option<NodeId>) {
        match self.slot(id) {
            Some(slot) if !slot.attached => self.link(id, before),
            _ => panic!("{id:?}: detached node expected"),
        }
    }

    /// Removes `id` from the document. Spans are freed whereas breaks are only
    /// detached.
    pub fn remove(&mut self, id: NodeId) {
        if !self.is_attached(id) {
            return;
        }
        self.unlink(id);
        if !self.is_break(id) {
            self.nodes.remove(id);
        }
    }

    /// Frees a detached break.
    pub fn release(&mut self, id: NodeId) {
        if self.slot(id).is_some_and(|slot| !slot.attached) {
            self.nodes.remove(id);
        }
    }

    /// Returns all breaks that are detached but not yet released.
    pub fn detached(&self) -> Vec<NodeId> {
        self.nodes
            .ids()
            .into_iter()
            .filter(|id| !self.is_attached(*id))
            .collect()
    }

    /// Returns the complete text of the document.
    pub fn text(&self) -> String {
        self.iter().map(|(_, node)| node.text()).collect()
    }

    /// Returns the text of the line following `line` and the break terminating it,
    /// or `None` if the line extends to the end of the document.
    pub fn line_text(&self, line: Option<NodeId>) -> (String, Option<NodeId>) {
        let mut text = String::new();
        let mut cur = self.line_first(line);
        while let Some(id) = cur {
            match self.get(id) {
                Some(Node::Span(span)) => text.push_str(&span.text),
                _ => break,
            }
            cur = self.next(id);
        }
        (text, cur)
    }

    /// Returns the nearest break preceding `id`, or `None` if `id` is on the first
    /// line.
    pub fn prev_break(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.prev(id);
        while let Some(p) = cur {
            if self.is_break(p) {
                return Some(p);
            }
            cur = self.prev(p);
        }
        None
    }

    /// Returns the nearest break following `id`, or `None` if `id` is on the last
    /// line.
    pub fn next_break(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.next(id);
        while let Some(n) = cur {
            if self.is_break(n) {
                return Some(n);
            }
            cur = self.next(n);
        }
        None
    }

    /// Returns the line containing `id`, which is `id` itself if it is a break.
    pub fn line_of(&self, id: NodeId) -> Option<NodeId> {
        if self.is_break(id) {
            Some(id)
        } else {
            self.prev_break(id)
        }
    }

    /// Returns the number of lines in the document.
    pub fn line_count(&self) -> usize {
        1 + self.iter().filter(|(_, node)| node.is_break()).count()
    }

    /// Returns the `1`-based number of `line`.
    pub fn line_number(&self, line: Option<NodeId>) -> usize {
        let mut n = 1;
        let mut cur = line;
        while let Some(id) = cur {
            n += 1;
            cur = self.prev_break(id);
        }
        n
    }

    /// Returns the line whose `1`-based number is `n`, or the last line if `n` is
    /// beyond the end of the document.
    pub fn nth_line(&self, n: usize) -> Option<NodeId> {
        let mut line = None;
        let mut cur = self.first;
        let mut n = n;
        while n > 1 {
            match self.next_break_from(cur) {
                Some(id) => {
                    line = Some(id);
                    cur = self.next(id);
                    n -= 1;
                }
                None => break,
            }
        }
        line
    }

    /// Converts a character offset into a line position, clamped to the end of the
    /// document.
    pub fn pos_of(&self, offset: usize) -> LinePos {
        let mut line = None;
        let mut line_start = 0;
        let mut pos = 0;
        for (id, node) in self.iter() {
            if pos >= offset {
                break;
            }
            match node {
                Node::Span(span) => pos += cmp::min(span.len(), offset - pos),
                Node::Break(_) => {
                    pos += 1;
                    line = Some(id);
                    line_start = pos;
                }
            }
        }
        LinePos::new(line, pos - line_start)
    }

    /// Converts a line position into a character offset.
    pub fn offset_of(&self, pos: LinePos) -> usize {
        let mut offset = 0;
        if let Some(line) = pos.line {
            for (id, node) in self.iter() {
                offset += etc::char_len(node.text());
                if id == line {
                    break;
                }
            }
        }
        let (text, _) = self.line_text(pos.line);
        offset + cmp::min(pos.offset, etc::char_len(&text))
    }

    /// Inserts `text` at `pos`, splitting the line wherever `text` contains a line
    /// break.
    ///
    /// Returns the position following the inserted text and the span that was
    /// edited, which the caller is expected to hand to the highlighter.
    pub fn insert_text(&mut self, pos: LinePos, text: &str) -> (LinePos, NodeId) {
        let (span_id, at) = self.locate(pos);
        let segments = text.split('\n').collect::<Vec<_>>();
        let (head, tail) = {
            let span = self.span(span_id).map(|span| span.text.as_str()).unwrap_or("");
            let (head, tail) = etc::split_at_pos(span, at);
            (head.to_string(), tail.to_string())
        };

        let end = if let [segment] = segments.as_slice() {
            self.set_span_text(span_id, format!("{head}{segment}{tail}"));
            LinePos::new(pos.line, pos.offset + etc::char_len(segment))
        } else {
            self.set_span_text(span_id, format!("{head}{}", segments[0]));
            let before = self.next(span_id);
            let mut line = pos.line;
            let last = segments.len() - 1;
            for (i, segment) in segments.iter().enumerate().skip(1) {
                line = Some(self.insert_before(Node::Break(Break::new()), before));
                let text = if i == last {
                    format!("{segment}{tail}")
                } else {
                    segment.to_string()
                };
                self.insert_before(Node::Span(Span::new(&text)), before);
            }
            LinePos::new(line, etc::char_len(segments[last]))
        };
        (end, span_id)
    }

    /// Removes up to `count` characters following `pos`, where a line break counts
    /// as one character.
    ///
    /// Returns the span that was edited.
    pub fn delete_text(&mut self, pos: LinePos, count: usize) -> NodeId {
        let (span_id, at) = self.locate(pos);
        let mut remaining = count;
        if let Some(span) = self.span(span_id) {
            let n = cmp::min(remaining, span.len() - at);
            let text = format!(
                "{}{}",
                etc::slice_pos(&span.text, 0, at),
                etc::slice_pos(&span.text, at + n, usize::MAX)
            );
            self.set_span_text(span_id, text);
            remaining -= n;
        }

        let mut cur = self.next(span_id);
        while let Some(id) = cur {
            if remaining == 0 {
                break;
            }
            cur = self.next(id);
            match self.get(id) {
                Some(Node::Break(_)) => {
                    self.remove(id);
                    remaining -= 1;
                }
                Some(Node::Span(span)) => {
                    let n = cmp::min(remaining, span.len());
                    let text = etc::slice_pos(&span.text, n, usize::MAX).to_string();
                    remaining -= n;
                    if text.len() > 0 {
                        self.set_span_text(id, text);
                    } else {
                        self.remove(id);
                    }
                }
                None => break,
            }
        }
        span_id
    }

    /// Finds the span containing `pos` and the offset within that span, creating an
    /// empty span if the line has none.
    fn locate(&mut self, pos: LinePos) -> (NodeId, usize) {
        let mut remaining = pos.offset;
        let mut last = None;
        let mut cur = self.line_first(pos.line);
        while let Some(id) = cur {
            match self.span(id) {
                Some(span) => {
                    let len = span.len();
                    if remaining <= len {
                        return (id, remaining);
                    }
                    remaining -= len;
                    last = Some((id, len));
                }
                None => break,
            }
            cur = self.next(id);
        }
        match last {
            Some(found) => found,
            None => (self.insert_before(Node::Span(Span::new("")), cur), 0),
        }
    }

    fn set_span_text(&mut self, id: NodeId, text: String) {
        if let Some(span) = self.span_mut(id) {
            span.text = text;
            span.dirty = true;
        }
    }

    fn next_break_from(&self, from: Option<NodeId>) -> Option<NodeId> {
        let mut cur = from;
        while let Some(id) = cur {
            if self.is_break(id) {
                return Some(id);
            }
            cur = self.next(id);
        }
        None
    }

    fn slot(&self, id: NodeId) -> Option<&Slot> {
        self.nodes.get(id)
    }

    fn link(&mut self, id: NodeId, before: Option<NodeId>) {
        let prev = match before {
            Some(b) => self.prev(b),
            None => self.last,
        };
        if let Some(slot) = self.nodes.get_mut(id) {
            slot.prev = prev;
            slot.next = before;
            slot.attached = true;
        }
        match prev {
            Some(p) => self.set_next(p, Some(id)),
            None => self.first = Some(id),
        }
        match before {
            Some(b) => self.set_prev(b, Some(id)),
            None => self.last = Some(id),
        }
    }

    fn unlink(&mut self, id: NodeId) {
        let (prev, next) = match self.nodes.get_mut(id) {
            Some(slot) => {
                slot.attached = false;
                (slot.prev.take(), slot.next.take())
            }
            None => return,
        };
        match prev {
            Some(p) => self.set_next(p, next),
            None => self.first = next,
        }
        match next {
            Some(n) => self.set_prev(n, prev),
            None => self.last = prev,
        }
    }

    fn set_next(&mut self, id: NodeId, next: Option<NodeId>) {
        if let Some(slot) = self.nodes.get_mut(id) {
            slot.next = next;
        }
    }

    fn set_prev(&mut self, id: NodeId, prev: Option<NodeId>) {
        if let Some(slot) = self.nodes.get_mut(id) {
            slot.prev = prev;
        }
    }
}

impl Default for Document {
    fn default() -> Document {
        Document::new()
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let slot = self.doc.slot(id)?;
        self.next = slot.next;
        Some((id, &slot.node))
    }
}
