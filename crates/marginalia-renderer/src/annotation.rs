//! Annotation handles, boundary events and the offset-indexed event map.
//!
//! Annotations are computed upstream of rendering. By the time they reach
//! this crate they are nothing more than START/END boundaries at plain-text
//! offsets, grouped per offset in an [`EventMap`] and consumed front to back
//! by an [`EventCursor`].

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::btree_map;
use std::hash::{Hash, Hasher};
use std::iter::Peekable;
use std::ops::Range;

use smol_str::SmolStr;

use crate::error::EventMapError;

/// Immutable handle to an annotation.
///
/// Identity is the id alone: two handles with the same id are the same
/// annotation, whatever metadata they carry.
#[derive(Debug, Clone, Eq)]
pub struct Annotation {
    id: SmolStr,
    metadata: Vec<(SmolStr, SmolStr)>,
}

impl Annotation {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self {
            id: id.into(),
            metadata: Vec::new(),
        }
    }

    /// Attach an opaque key/value pair, passed through to the markup.
    pub fn with_metadata(mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn metadata(&self) -> &[(SmolStr, SmolStr)] {
        &self.metadata
    }
}

impl PartialEq for Annotation {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Hash for Annotation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl From<&str> for Annotation {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationEventKind {
    Start,
    End,
    /// A zero-length range: starts and ends at the same offset.
    Point,
}

/// An annotation boundary at a plain-text offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationEvent {
    pub offset: usize,
    pub kind: AnnotationEventKind,
    pub annotation: Annotation,
}

impl AnnotationEvent {
    pub fn start(offset: usize, annotation: Annotation) -> Self {
        Self {
            offset,
            kind: AnnotationEventKind::Start,
            annotation,
        }
    }

    pub fn end(offset: usize, annotation: Annotation) -> Self {
        Self {
            offset,
            kind: AnnotationEventKind::End,
            annotation,
        }
    }

    pub fn point(offset: usize, annotation: Annotation) -> Self {
        Self {
            offset,
            kind: AnnotationEventKind::Point,
            annotation,
        }
    }

    pub fn is_start(&self) -> bool {
        self.kind == AnnotationEventKind::Start
    }

    pub fn is_end(&self) -> bool {
        self.kind == AnnotationEventKind::End
    }
}

/// Ordered mapping from offset to the events occurring there.
///
/// At any offset every END precedes every zero-length POINT, which precedes
/// every START, whatever order the events were inserted in. A zero-gap
/// handoff between two annotations therefore never grows the open marker
/// stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventMap {
    events: BTreeMap<usize, Vec<AnnotationEvent>>,
}

impl EventMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the map from annotation ranges.
    ///
    /// Ranges of one annotation id may touch (`0..5` then `5..9`) but not
    /// overlap, since a handle can only be open once at a time.
    pub fn from_ranges<I>(ranges: I) -> Result<Self, EventMapError>
    where
        I: IntoIterator<Item = (Annotation, Range<usize>)>,
    {
        let mut by_id: HashMap<SmolStr, Vec<Range<usize>>> = HashMap::new();
        let mut map = Self::new();

        for (annotation, range) in ranges {
            if range.start > range.end {
                return Err(EventMapError::InvertedRange {
                    id: annotation.id.clone(),
                    start: range.start,
                    end: range.end,
                });
            }
            by_id
                .entry(annotation.id.clone())
                .or_default()
                .push(range.clone());
            if range.is_empty() {
                map.insert(AnnotationEvent::point(range.start, annotation));
            } else {
                map.insert(AnnotationEvent::start(range.start, annotation.clone()));
                map.insert(AnnotationEvent::end(range.end, annotation));
            }
        }

        for (id, mut ranges) in by_id {
            ranges.sort_by_key(|r| (r.start, r.end));
            for pair in ranges.windows(2) {
                if pair[0].end > pair[1].start {
                    return Err(EventMapError::SelfOverlap {
                        id,
                        first: pair[0].clone(),
                        second: pair[1].clone(),
                    });
                }
            }
        }

        Ok(map)
    }

    /// Insert one event, keeping ENDs ahead of POINTs ahead of STARTs at its
    /// offset. Insertion order is kept within each kind.
    pub fn insert(&mut self, event: AnnotationEvent) {
        let at_offset = self.events.entry(event.offset).or_default();
        let idx = match event.kind {
            AnnotationEventKind::Start => at_offset.len(),
            AnnotationEventKind::Point => at_offset
                .iter()
                .position(AnnotationEvent::is_start)
                .unwrap_or(at_offset.len()),
            AnnotationEventKind::End => at_offset
                .iter()
                .position(|e| !e.is_end())
                .unwrap_or(at_offset.len()),
        };
        at_offset.insert(idx, event);
    }

    pub fn at(&self, offset: usize) -> &[AnnotationEvent] {
        self.events.get(&offset).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct offsets carrying events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[AnnotationEvent])> {
        self.events.iter().map(|(o, evs)| (*o, evs.as_slice()))
    }

    pub fn cursor(&self) -> EventCursor<'_> {
        EventCursor {
            inner: self.events.iter().peekable(),
        }
    }
}

/// Single forward scan over an [`EventMap`]. Never rewinds.
#[derive(Debug)]
pub struct EventCursor<'m> {
    inner: Peekable<btree_map::Iter<'m, usize, Vec<AnnotationEvent>>>,
}

impl<'m> EventCursor<'m> {
    /// Offset of the next unconsumed batch.
    pub fn peek_offset(&mut self) -> Option<usize> {
        self.inner.peek().map(|(o, _)| **o)
    }

    /// Consume the next batch if its offset is `<= limit`.
    pub fn next_through(&mut self, limit: usize) -> Option<(usize, &'m [AnnotationEvent])> {
        match self.peek_offset() {
            Some(offset) if offset <= limit => self.next_batch(),
            _ => None,
        }
    }

    /// Consume the next batch if its offset is `< limit`.
    pub fn next_before(&mut self, limit: usize) -> Option<(usize, &'m [AnnotationEvent])> {
        match self.peek_offset() {
            Some(offset) if offset < limit => self.next_batch(),
            _ => None,
        }
    }

    pub fn next_batch(&mut self) -> Option<(usize, &'m [AnnotationEvent])> {
        self.inner.next().map(|(o, evs)| (*o, evs.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(events: &[AnnotationEvent]) -> Vec<(AnnotationEventKind, &str)> {
        events.iter().map(|e| (e.kind, e.annotation.id())).collect()
    }

    #[test]
    fn test_identity_is_id_only() {
        let a = Annotation::new("a1").with_metadata("author", "alice");
        let b = Annotation::new("a1");
        assert_eq!(a, b);
        assert_ne!(a, Annotation::new("a2"));
    }

    #[test]
    fn test_ends_sort_before_starts() {
        let mut map = EventMap::new();
        map.insert(AnnotationEvent::start(5, "b".into()));
        map.insert(AnnotationEvent::end(5, "a".into()));
        map.insert(AnnotationEvent::start(5, "c".into()));
        map.insert(AnnotationEvent::end(5, "d".into()));

        use AnnotationEventKind::*;
        assert_eq!(
            kinds(map.at(5)),
            vec![(End, "a"), (End, "d"), (Start, "b"), (Start, "c")]
        );
    }

    #[test]
    fn test_from_ranges_adjacent_same_id() {
        let map = EventMap::from_ranges([
            (Annotation::new("a"), 0..5),
            (Annotation::new("a"), 5..11),
        ])
        .unwrap();

        use AnnotationEventKind::*;
        assert_eq!(map.len(), 3);
        assert_eq!(kinds(map.at(5)), vec![(End, "a"), (Start, "a")]);
    }

    #[test]
    fn test_from_ranges_rejects_inverted() {
        let err = EventMap::from_ranges([(Annotation::new("x"), 7..3)]).unwrap_err();
        assert_eq!(
            err,
            EventMapError::InvertedRange {
                id: "x".into(),
                start: 7,
                end: 3
            }
        );
    }

    #[test]
    fn test_from_ranges_rejects_self_overlap() {
        let err = EventMap::from_ranges([
            (Annotation::new("x"), 4..9),
            (Annotation::new("x"), 0..5),
        ])
        .unwrap_err();
        assert!(matches!(err, EventMapError::SelfOverlap { ref id, .. } if id == "x"));
    }

    #[test]
    fn test_zero_length_range_is_a_single_point() {
        let map = EventMap::from_ranges([(Annotation::new("z"), 3..3)]).unwrap();
        use AnnotationEventKind::*;
        assert_eq!(kinds(map.at(3)), vec![(Point, "z")]);
    }

    #[test]
    fn test_points_sort_between_ends_and_starts() {
        let mut map = EventMap::new();
        map.insert(AnnotationEvent::start(2, "s".into()));
        map.insert(AnnotationEvent::point(2, "p".into()));
        map.insert(AnnotationEvent::end(2, "e".into()));
        map.insert(AnnotationEvent::point(2, "q".into()));

        use AnnotationEventKind::*;
        assert_eq!(
            kinds(map.at(2)),
            vec![(End, "e"), (Point, "p"), (Point, "q"), (Start, "s")]
        );
    }

    #[test]
    fn test_cursor_is_monotonic() {
        let map = EventMap::from_ranges([
            (Annotation::new("a"), 0..4),
            (Annotation::new("b"), 2..8),
        ])
        .unwrap();
        let mut cursor = map.cursor();

        assert_eq!(cursor.next_through(0).map(|(o, _)| o), Some(0));
        assert!(cursor.next_through(1).is_none());
        assert!(cursor.next_before(2).is_none());
        assert_eq!(cursor.next_before(3).map(|(o, _)| o), Some(2));
        assert_eq!(cursor.peek_offset(), Some(4));
        assert_eq!(cursor.next_through(100).map(|(o, _)| o), Some(4));
        assert_eq!(cursor.next_through(100).map(|(o, _)| o), Some(8));
        assert!(cursor.next_batch().is_none());
    }
}
