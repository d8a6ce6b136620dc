//! AnnotatedWriter - renders a host event stream to markup with annotation
//! markers overlaid.
//!
//! Structural events go through the [`BoundaryGuard`], literal content goes
//! through the [`NestingEngine`]. The writer owns the per-pass event
//! counter and is the only piece that knows the host event catalogue.


use std::marker::PhantomData;
use std::ops::Range;

use smol_str::{SmolStr, format_smolstr};

use crate::annotation::EventMap;
use crate::config::OverlayConfig;
use crate::engine::{NestingEngine, OverlayReport};
use crate::events::{Block, EventType, RenderEvent};
use crate::guard::BoundaryGuard;
use crate::markers::EventCounter;
use crate::printer::MarkupPrinter;

/// Where the writer is relative to runs of literal content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayState {
    /// Between structural events. No markers are open.
    #[default]
    Structural,
    /// Inside a run of literal content. Markers may be open.
    TextRun,
}

pub struct AnnotatedWriter<'a, 'm, I, P>
where
    I: Iterator<Item = (RenderEvent<'a>, Range<usize>)>,
    P: MarkupPrinter,
{
    events: I,
    printer: P,
    event_map: &'m EventMap,
    engine: NestingEngine<'m>,
    guard: BoundaryGuard,
    counter: EventCounter,
    state: OverlayState,
    _phantom: PhantomData<&'a ()>,
}

impl<'a, 'm, I, P> AnnotatedWriter<'a, 'm, I, P>
where
    I: Iterator<Item = (RenderEvent<'a>, Range<usize>)>,
    P: MarkupPrinter,
{
    /// Create a writer over events already carrying plain-text offsets.
    /// See [`PlainTextOffsets`](crate::PlainTextOffsets) for hosts that
    /// don't track them.
    pub fn new(events: I, event_map: &'m EventMap, printer: P) -> Self {
        Self {
            events,
            printer,
            event_map,
            engine: NestingEngine::new(event_map, OverlayConfig::default()),
            guard: BoundaryGuard::new(),
            counter: EventCounter::new(),
            state: OverlayState::Structural,
            _phantom: PhantomData,
        }
    }

    pub fn with_config(mut self, config: OverlayConfig) -> Self {
        self.engine = NestingEngine::new(self.event_map, config);
        self
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    /// How many events of `ty` this pass has seen so far.
    pub fn event_count(&self, ty: EventType) -> u32 {
        self.counter.count(ty)
    }

    pub fn engine(&self) -> &NestingEngine<'m> {
        &self.engine
    }

    /// Consume the whole event stream.
    pub fn run(mut self) -> Result<OverlayReport, P::Error> {
        let span = tracing::debug_span!("annotated_render", offsets = self.event_map.len());
        let _entered = span.enter();

        self.counter.reset();
        while let Some((event, range)) = self.events.next() {
            self.process_event(event, range)?;
        }
        self.finish()
    }

    /// Close anything still open and produce the pass report.
    pub fn finish(mut self) -> Result<OverlayReport, P::Error> {
        let closed = self.engine.close_all(&mut self.printer)?;
        if closed > 0 {
            tracing::debug!(closed, "closed markers at end of stream");
        }
        self.state = OverlayState::Structural;

        let mut report = self.engine.finish();
        report.structural_events = self.guard.crossings;
        report.forced_closures = self.guard.forced_closures;
        tracing::debug!(
            fragments = report.total_fragments(),
            inconsistent_ends = report.inconsistent_ends,
            "render pass finished"
        );
        Ok(report)
    }

    pub fn process_event(
        &mut self,
        event: RenderEvent<'a>,
        range: Range<usize>,
    ) -> Result<(), P::Error> {
        self.counter.get_and_increment(event.event_type());

        match event {
            RenderEvent::Begin(block) => self.cross(|out| begin_block(out, &block)),
            RenderEvent::End(block) => self.cross(|out| end_block(out, &block)),
            RenderEvent::Word(text) | RenderEvent::Space(text) => self.text(range.start, &text),
            RenderEvent::SpecialSymbol(symbol) => {
                let mut buf = [0u8; 4];
                self.text(range.start, symbol.encode_utf8(&mut buf))
            }
            RenderEvent::Verbatim {
                text,
                inline,
                language,
            } => self.verbatim(range.start, &text, inline, language.as_deref()),
            RenderEvent::RawText { text, syntax } => {
                tracing::trace!(syntax = %syntax, "raw text block");
                self.seal()?;
                self.state = OverlayState::TextRun;
                self.engine
                    .emit_atomic(&mut self.printer, &mut self.counter, range.start, &text)?;
                self.seal()
            }
            RenderEvent::InlineMarkup(markup) => self.cross(|out| out.write_raw(&markup)),
            RenderEvent::NewLine => self.cross(|out| out.empty_element("br", &[])),
            RenderEvent::HorizontalLine => self.cross(|out| out.empty_element("hr", &[])),
            RenderEvent::EmptyLines(count) => self.cross(|out| {
                for _ in 0..count {
                    out.open_element("div", &[("class", "wikimodel-emptyline")])?;
                    out.close_element("div")?;
                }
                Ok(())
            }),
            RenderEvent::Image { reference, alt } => self.cross(|out| {
                out.empty_element("img", &[("src", &*reference), ("alt", &*alt)])
            }),
            RenderEvent::Id(name) => self.cross(|out| {
                out.open_element("span", &[("id", &*name)])?;
                out.close_element("span")
            }),
        }
    }

    fn cross<F>(&mut self, render: F) -> Result<(), P::Error>
    where
        F: FnOnce(&mut P) -> Result<(), P::Error>,
    {
        self.state = OverlayState::Structural;
        self.guard.cross(&mut self.engine, &mut self.printer, render)
    }

    fn seal(&mut self) -> Result<(), P::Error> {
        self.state = OverlayState::Structural;
        self.guard.seal(&mut self.engine, &mut self.printer)?;
        Ok(())
    }

    fn text(&mut self, offset: usize, text: &str) -> Result<(), P::Error> {
        self.state = OverlayState::TextRun;
        self.engine
            .advance_and_emit(&mut self.printer, &mut self.counter, offset, text)
    }

    fn verbatim(
        &mut self,
        offset: usize,
        text: &str,
        inline: bool,
        language: Option<&str>,
    ) -> Result<(), P::Error> {
        let element = if inline { "tt" } else { "pre" };
        let class = if inline {
            Some(SmolStr::new_static("wikimodel-verbatim"))
        } else {
            language.map(|lang| format_smolstr!("language-{}", lang))
        };

        self.cross(|out| match &class {
            Some(class) => out.open_element(element, &[("class", class.as_str())]),
            None => out.open_element(element, &[]),
        })?;
        self.text(offset, text)?;
        self.cross(|out| out.close_element(element))
    }
}

fn header_element(level: u8) -> &'static str {
    match level {
        0 | 1 => "h1",
        2 => "h2",
        3 => "h3",
        4 => "h4",
        5 => "h5",
        _ => "h6",
    }
}

/// Element for blocks that map onto one element with no attributes.
fn plain_element(block: &Block<'_>) -> Option<&'static str> {
    Some(match block {
        Block::Paragraph => "p",
        Block::List { ordered: true } => "ol",
        Block::List { ordered: false } => "ul",
        Block::ListItem => "li",
        Block::Table => "table",
        Block::TableRow => "tr",
        Block::TableCell => "td",
        Block::TableHeadCell => "th",
        Block::DefinitionList => "dl",
        Block::DefinitionTerm => "dt",
        Block::DefinitionDescription => "dd",
        Block::Quotation => "blockquote",
        Block::Group => "div",
        Block::Section => "section",
        Block::Format(format) => format.element(),
        Block::Header { level, .. } => header_element(*level),
        Block::Link { .. } => "a",
        Block::Document | Block::QuotationLine => return None,
    })
}

fn begin_block<P: MarkupPrinter>(out: &mut P, block: &Block<'_>) -> Result<(), P::Error> {
    match block {
        Block::Header {
            level,
            id: Some(id),
        } => out.open_element(header_element(*level), &[("id", &**id)]),
        Block::Link {
            reference,
            freestanding,
        } => {
            out.open_element("a", &[("href", &**reference)])?;
            if *freestanding {
                out.write_escaped_text(reference)?;
            }
            Ok(())
        }
        _ => match plain_element(block) {
            Some(element) => out.open_element(element, &[]),
            None => Ok(()),
        },
    }
}

fn end_block<P: MarkupPrinter>(out: &mut P, block: &Block<'_>) -> Result<(), P::Error> {
    match plain_element(block) {
        Some(element) => out.close_element(element),
        None => Ok(()),
    }
}
