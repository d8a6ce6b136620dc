use std::ops::Range;

use crate::events::RenderEvent;

/// Attaches plain-text offset ranges to a host event stream that doesn't
/// track them itself.
///
/// Text-bearing events advance the offset by their length in chars;
/// everything else gets an empty range at the current offset.
#[derive(Debug, Clone)]
pub struct PlainTextOffsets<'a, I: Iterator<Item = RenderEvent<'a>>> {
    pub offset: usize,
    pub iter: I,
}

impl<'a, I: Iterator<Item = RenderEvent<'a>>> PlainTextOffsets<'a, I> {
    pub fn new(iter: I) -> Self {
        Self { offset: 0, iter }
    }
}

impl<'a, I: Iterator<Item = RenderEvent<'a>>> Iterator for PlainTextOffsets<'a, I> {
    type Item = (RenderEvent<'a>, Range<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        let event = self.iter.next()?;
        let start = self.offset;
        self.offset += event.text_len();
        Some((event, start..self.offset))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}
