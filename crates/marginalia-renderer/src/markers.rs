//! The stack of currently open annotation markers, and the per-type
//! counter that mints their sequence ids.

use std::collections::HashMap;

use crate::annotation::Annotation;
use crate::events::EventType;

/// Per-event-type counters, scoped to a single render pass.
#[derive(Debug, Clone, Default)]
pub struct EventCounter {
    counts: HashMap<EventType, u32>,
}

impl EventCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count for `ty`, then increment it.
    pub fn get_and_increment(&mut self, ty: EventType) -> u32 {
        let count = self.counts.entry(ty).or_insert(0);
        let current = *count;
        *count += 1;
        current
    }

    pub fn count(&self, ty: EventType) -> u32 {
        self.counts.get(&ty).copied().unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.counts.clear();
    }
}

/// One emitted marker fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub annotation: Annotation,
    pub sequence_id: u32,
}

/// Open marker fragments, bottom first. The top is the next to close.
#[derive(Debug, Clone, Default)]
pub struct MarkerStack {
    entries: Vec<Marker>,
}

impl MarkerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a marker for `annotation` with a fresh sequence id.
    ///
    /// The annotation must not already be on the stack.
    pub fn push(&mut self, annotation: Annotation, counter: &mut EventCounter) -> u32 {
        debug_assert!(
            !self.contains(&annotation),
            "annotation {} is already open",
            annotation.id()
        );
        let sequence_id = counter.get_and_increment(EventType::AnnotationMarker);
        self.entries.push(Marker {
            annotation,
            sequence_id,
        });
        sequence_id
    }

    pub fn pop(&mut self) -> Option<Marker> {
        self.entries.pop()
    }

    pub fn top(&self) -> Option<&Marker> {
        self.entries.last()
    }

    pub fn contains(&self, annotation: &Annotation) -> bool {
        self.position(annotation).is_some()
    }

    /// Depth of `annotation` counted from the bottom.
    pub fn position(&self, annotation: &Annotation) -> Option<usize> {
        self.entries.iter().position(|m| &m.annotation == annotation)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.entries.iter()
    }

    pub fn snapshot(&self) -> Vec<Marker> {
        self.entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_is_per_type() {
        let mut counter = EventCounter::new();
        assert_eq!(counter.get_and_increment(EventType::AnnotationMarker), 0);
        assert_eq!(counter.get_and_increment(EventType::AnnotationMarker), 1);
        assert_eq!(counter.get_and_increment(EventType::Paragraph), 0);
        assert_eq!(counter.count(EventType::AnnotationMarker), 2);

        counter.reset();
        assert_eq!(counter.count(EventType::AnnotationMarker), 0);
    }

    #[test]
    fn test_push_pop_lifo() {
        let mut counter = EventCounter::new();
        let mut stack = MarkerStack::new();

        assert_eq!(stack.push(Annotation::new("a"), &mut counter), 0);
        assert_eq!(stack.push(Annotation::new("b"), &mut counter), 1);
        assert!(stack.contains(&Annotation::new("a")));
        assert_eq!(stack.position(&Annotation::new("b")), Some(1));
        assert_eq!(stack.top().map(|m| m.annotation.id()), Some("b"));

        let popped = stack.pop().unwrap();
        assert_eq!(popped.annotation.id(), "b");
        assert_eq!(popped.sequence_id, 1);

        // reopening mints a new sequence id
        assert_eq!(stack.push(Annotation::new("b"), &mut counter), 2);
        let ids: Vec<_> = stack.snapshot().into_iter().map(|m| m.sequence_id).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn test_pop_empty() {
        let mut stack = MarkerStack::new();
        assert!(stack.pop().is_none());
        assert!(stack.is_empty());
    }
}
