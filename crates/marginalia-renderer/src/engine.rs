//! The nesting engine: decides, per emitted text chunk, which annotation
//! markers to close, reopen and open so crossing ranges come out as
//! properly nested fragments.
//!
//! Two pieces of state are kept apart:
//! - `active`: annotations that have started and not yet ended, in the
//!   order they started.
//! - `stack`: the marker fragments actually open in the output.
//!
//! The stack is always a prefix of `active`. Ending an annotation closes
//! every fragment above it plus its own; the survivors stay active and are
//! reopened, with fresh sequence ids, right before the next text chunk. A
//! structural boundary closes the whole stack and relies on the same lazy
//! reopening.

use std::collections::BTreeMap;

use smol_str::{SmolStr, ToSmolStr, format_smolstr};

use crate::annotation::{Annotation, AnnotationEvent, AnnotationEventKind, EventCursor, EventMap};
use crate::config::OverlayConfig;
use crate::events::EventType;
use crate::markers::{EventCounter, MarkerStack};
use crate::printer::MarkupPrinter;

/// What a render pass did with its annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayReport {
    /// Marker fragments emitted per annotation id.
    pub fragments: BTreeMap<SmolStr, usize>,
    /// END events for annotations that were not open.
    pub inconsistent_ends: usize,
    /// Structural events that had to close open markers.
    pub forced_closures: usize,
    /// Structural writes: begin and end events, standalone elements, inline
    /// markup, and the opening and closing wrapper of each verbatim region.
    /// Raw text blocks are not counted.
    pub structural_events: usize,
    pub text_units: usize,
}

impl OverlayReport {
    pub fn fragments_of(&self, id: &str) -> usize {
        self.fragments.get(id).copied().unwrap_or(0)
    }

    pub fn total_fragments(&self) -> usize {
        self.fragments.values().sum()
    }
}

pub struct NestingEngine<'m> {
    cursor: EventCursor<'m>,
    stack: MarkerStack,
    active: Vec<Annotation>,
    config: OverlayConfig,
    report: OverlayReport,
}

impl<'m> NestingEngine<'m> {
    pub fn new(events: &'m EventMap, config: OverlayConfig) -> Self {
        Self {
            cursor: events.cursor(),
            stack: MarkerStack::new(),
            active: Vec::new(),
            config,
            report: OverlayReport::default(),
        }
    }

    pub fn stack(&self) -> &MarkerStack {
        &self.stack
    }

    /// Annotations started and not yet ended, in start order.
    pub fn active(&self) -> &[Annotation] {
        &self.active
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn report(&self) -> &OverlayReport {
        &self.report
    }

    /// Emit one text unit starting at plain-text `offset`.
    ///
    /// Events at or before `offset` apply first. Events strictly inside the
    /// unit split it; events at its end offset wait for the next unit.
    pub fn advance_and_emit<P: MarkupPrinter>(
        &mut self,
        out: &mut P,
        counter: &mut EventCounter,
        offset: usize,
        text: &str,
    ) -> Result<(), P::Error> {
        let end = offset + text.chars().count();
        let mut degenerate = self.drain_through(out, offset)?;
        let mut rest = text;
        let mut pos = offset;

        loop {
            let split = self.cursor.peek_offset().filter(|&o| o < end);
            let until = split.unwrap_or(end);
            let (chunk, tail) = split_at_char(rest, until - pos);
            self.flush_chunk(out, counter, &degenerate, chunk)?;
            rest = tail;
            pos = until;

            match self.cursor.next_before(end) {
                Some((at, batch)) => degenerate = self.apply_batch(out, at, batch)?,
                None => break,
            }
        }

        self.report.text_units += 1;
        Ok(())
    }

    /// Emit content that cannot be split, such as raw markup.
    ///
    /// Annotations starting inside the block open before it, annotations
    /// ending inside it close after it. Zero-length annotations inside it
    /// become empty fragments in front of it. An annotation that ends and
    /// restarts inside the block covers the whole block.
    pub fn emit_atomic<P: MarkupPrinter>(
        &mut self,
        out: &mut P,
        counter: &mut EventCounter,
        offset: usize,
        raw: &str,
    ) -> Result<(), P::Error> {
        let end = offset + raw.chars().count();
        let mut degenerate = self.drain_through(out, offset)?;

        let mut deferred_ends: Vec<(usize, &'m Annotation)> = Vec::new();
        while let Some((at, batch)) = self.cursor.next_before(end) {
            for event in batch {
                let annotation = &event.annotation;
                let deferred = deferred_ends.iter().position(|(_, a)| *a == annotation);
                match event.kind {
                    AnnotationEventKind::End
                        if deferred.is_none() && self.active.contains(annotation) =>
                    {
                        deferred_ends.push((at, annotation));
                    }
                    AnnotationEventKind::End => self.inconsistent_end(annotation, at),
                    AnnotationEventKind::Point => degenerate.push(annotation.clone()),
                    AnnotationEventKind::Start => match deferred {
                        Some(idx) => {
                            deferred_ends.remove(idx);
                        }
                        None => self.activate(annotation, at),
                    },
                }
            }
        }

        if !raw.is_empty() {
            self.open_due(out, counter)?;
        }
        for annotation in &degenerate {
            self.empty_marker(out, counter, annotation)?;
        }
        if !raw.is_empty() {
            out.write_raw(raw)?;
        }

        for (at, annotation) in deferred_ends {
            if !self.end_annotation(out, annotation, at)? {
                self.inconsistent_end(annotation, at);
            }
        }

        self.report.text_units += 1;
        Ok(())
    }

    /// Reopen every active annotation that has no open fragment.
    /// A no-op when the stack already matches.
    pub fn open_due<P: MarkupPrinter>(
        &mut self,
        out: &mut P,
        counter: &mut EventCounter,
    ) -> Result<(), P::Error> {
        self.debug_check_prefix();
        while self.stack.len() < self.active.len() {
            let next = self.active[self.stack.len()].clone();
            let sequence_id = self.stack.push(next.clone(), counter);
            self.write_open(out, &next, sequence_id)?;
        }
        Ok(())
    }

    /// Close every open fragment, top first. Returns how many were closed.
    pub fn close_all<P: MarkupPrinter>(&mut self, out: &mut P) -> Result<usize, P::Error> {
        let mut closed = 0;
        while self.close_top(out)? {
            closed += 1;
        }
        Ok(closed)
    }

    /// Consume whatever is left of the event map and hand back the report.
    /// The output must already be closed.
    pub fn finish(mut self) -> OverlayReport {
        debug_assert!(self.stack.is_empty(), "markers left open at end of pass");
        while let Some((at, batch)) = self.cursor.next_batch() {
            for event in batch {
                let annotation = &event.annotation;
                match event.kind {
                    AnnotationEventKind::End => {
                        match self.active.iter().position(|a| a == annotation) {
                            Some(idx) => {
                                self.active.remove(idx);
                            }
                            None => self.inconsistent_end(annotation, at),
                        }
                    }
                    AnnotationEventKind::Start => {
                        tracing::trace!(
                            annotation = %annotation.id(),
                            offset = at,
                            "annotation starts past the last text unit"
                        );
                        self.activate(annotation, at);
                    }
                    AnnotationEventKind::Point => {
                        tracing::trace!(
                            annotation = %annotation.id(),
                            offset = at,
                            "zero-length annotation past the last text unit"
                        );
                    }
                }
            }
        }
        self.report
    }

    fn flush_chunk<P: MarkupPrinter>(
        &mut self,
        out: &mut P,
        counter: &mut EventCounter,
        degenerate: &[Annotation],
        chunk: &str,
    ) -> Result<(), P::Error> {
        if !chunk.is_empty() {
            self.open_due(out, counter)?;
        }
        for annotation in degenerate {
            self.empty_marker(out, counter, annotation)?;
        }
        if !chunk.is_empty() {
            out.write_escaped_text(chunk)?;
        }
        Ok(())
    }

    fn drain_through<P: MarkupPrinter>(
        &mut self,
        out: &mut P,
        offset: usize,
    ) -> Result<Vec<Annotation>, P::Error> {
        let mut degenerate = Vec::new();
        while let Some((at, batch)) = self.cursor.next_through(offset) {
            degenerate.extend(self.apply_batch(out, at, batch)?);
        }
        Ok(degenerate)
    }

    /// Apply one offset's events. ENDs come first in the batch; STARTs are
    /// only recorded as active here and open lazily before the next chunk.
    /// An END for an annotation that is not open changes nothing.
    ///
    /// Returns zero-length annotations found in the batch.
    fn apply_batch<P: MarkupPrinter>(
        &mut self,
        out: &mut P,
        offset: usize,
        batch: &'m [AnnotationEvent],
    ) -> Result<Vec<Annotation>, P::Error> {
        let mut degenerate = Vec::new();
        for event in batch {
            match event.kind {
                AnnotationEventKind::End => {
                    if !self.end_annotation(out, &event.annotation, offset)? {
                        self.inconsistent_end(&event.annotation, offset);
                    }
                }
                AnnotationEventKind::Point => degenerate.push(event.annotation.clone()),
                AnnotationEventKind::Start => self.activate(&event.annotation, offset),
            }
        }
        Ok(degenerate)
    }

    fn activate(&mut self, annotation: &Annotation, offset: usize) {
        if self.active.contains(annotation) {
            tracing::warn!(
                annotation = %annotation.id(),
                offset,
                "annotation started while already open, ignoring"
            );
            return;
        }
        self.active.push(annotation.clone());
    }

    /// End `annotation`. Returns false when it was not active.
    fn end_annotation<P: MarkupPrinter>(
        &mut self,
        out: &mut P,
        annotation: &Annotation,
        offset: usize,
    ) -> Result<bool, P::Error> {
        let Some(idx) = self.active.iter().position(|a| a == annotation) else {
            return Ok(false);
        };
        self.active.remove(idx);

        if let Some(depth) = self.stack.position(annotation) {
            let above = self.stack.len() - depth - 1;
            if above > 0 {
                tracing::trace!(
                    annotation = %annotation.id(),
                    offset,
                    above,
                    "closing overlapped markers to end annotation"
                );
            }
            while self.stack.len() > depth {
                self.close_top(out)?;
            }
        }
        Ok(true)
    }

    fn inconsistent_end(&mut self, annotation: &Annotation, offset: usize) {
        self.report.inconsistent_ends += 1;
        tracing::debug!(
            annotation = %annotation.id(),
            offset,
            "end event for an annotation that is not open, ignoring"
        );
    }

    fn close_top<P: MarkupPrinter>(&mut self, out: &mut P) -> Result<bool, P::Error> {
        if self.stack.pop().is_none() {
            return Ok(false);
        }
        out.close_element(&self.config.marker_element)?;
        Ok(true)
    }

    fn empty_marker<P: MarkupPrinter>(
        &mut self,
        out: &mut P,
        counter: &mut EventCounter,
        annotation: &Annotation,
    ) -> Result<(), P::Error> {
        // never pushed: the same id may also be active at this offset
        let sequence_id = counter.get_and_increment(EventType::AnnotationMarker);
        self.write_open(out, annotation, sequence_id)?;
        out.close_element(&self.config.marker_element)
    }

    fn write_open<P: MarkupPrinter>(
        &mut self,
        out: &mut P,
        annotation: &Annotation,
        sequence_id: u32,
    ) -> Result<(), P::Error> {
        *self
            .report
            .fragments
            .entry(SmolStr::new(annotation.id()))
            .or_insert(0) += 1;

        let config = &self.config;
        let sequence = sequence_id.to_smolstr();
        let metadata: Vec<(SmolStr, &str)> = if config.emit_metadata {
            annotation
                .metadata()
                .iter()
                .filter_map(|(key, value)| {
                    let name = metadata_attribute(key);
                    if name.is_none() {
                        tracing::warn!(
                            annotation = %annotation.id(),
                            key = %key,
                            "metadata key is not a valid attribute name, dropping"
                        );
                    }
                    Some((name?, value.as_str()))
                })
                .collect()
        } else {
            Vec::new()
        };

        let mut attributes: Vec<(&str, &str)> = Vec::with_capacity(3 + metadata.len());
        attributes.push((config.id_attribute.as_str(), annotation.id()));
        attributes.push((config.sequence_attribute.as_str(), sequence.as_str()));
        if let Some(class) = &config.marker_class {
            attributes.push(("class", class.as_str()));
        }
        for (name, value) in &metadata {
            attributes.push((name.as_str(), *value));
        }

        out.open_element(&config.marker_element, &attributes)
    }

    fn debug_check_prefix(&self) {
        debug_assert!(
            self.stack.len() <= self.active.len()
                && self
                    .stack
                    .iter()
                    .zip(&self.active)
                    .all(|(marker, active)| &marker.annotation == active),
            "open markers diverged from active annotations"
        );
    }
}

/// `data-{key}`, or `None` when `key` can't be part of an attribute name.
fn metadata_attribute(key: &str) -> Option<SmolStr> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    valid.then(|| format_smolstr!("data-{}", key))
}

/// Split after `n` chars.
fn split_at_char(s: &str, n: usize) -> (&str, &str) {
    match s.char_indices().nth(n) {
        Some((idx, _)) => s.split_at(idx),
        None => (s, ""),
    }
}
