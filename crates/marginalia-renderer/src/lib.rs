//! Annotation overlay rendering.
//!
//! Renders a host document event stream to markup while wrapping the text
//! covered by annotations in marker elements. Annotations may overlap
//! arbitrarily; the output stays well-formed by splitting an annotation
//! into several marker fragments wherever another annotation ends inside it
//! or a structural boundary interrupts it.
//!
//! ```
//! use marginalia_renderer::{Annotation, OverlayConfig, render_markdown_with_annotations};
//!
//! let (html, report) = render_markdown_with_annotations(
//!     "Hello World",
//!     [(Annotation::new("A"), 0..7), (Annotation::new("B"), 4..11)],
//!     OverlayConfig::default().with_marker_element("m"),
//! )
//! .unwrap();
//!
//! assert_eq!(report.fragments_of("B"), 2);
//! assert!(html.starts_with("<p><m "));
//! ```

pub mod annotation;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod guard;
pub mod markers;
#[cfg(feature = "markdown")]
pub mod markdown;
pub mod offsets;
pub mod printer;
pub mod writer;

use std::ops::Range;

use pulldown_cmark_escape::{FmtWriter, IoWriter};

pub use annotation::{Annotation, AnnotationEvent, AnnotationEventKind, EventCursor, EventMap};
pub use config::OverlayConfig;
pub use engine::{NestingEngine, OverlayReport};
pub use error::{EventMapError, RenderError};
pub use events::{Block, EventType, Format, RenderEvent, text_units};
pub use guard::BoundaryGuard;
pub use markers::{EventCounter, Marker, MarkerStack};
#[cfg(feature = "markdown")]
pub use markdown::MarkdownEvents;
pub use offsets::PlainTextOffsets;
pub use printer::{HtmlPrinter, MarkupPrinter};
pub use writer::{AnnotatedWriter, OverlayState};

/// Render offset-tagged host events to an HTML string.
pub fn render_annotated_html<'a, I>(
    events: I,
    event_map: &EventMap,
    config: OverlayConfig,
) -> Result<(String, OverlayReport), RenderError>
where
    I: IntoIterator<Item = (RenderEvent<'a>, Range<usize>)>,
{
    let mut printer = HtmlPrinter::new(FmtWriter(String::new()));
    let report = AnnotatedWriter::new(events.into_iter(), event_map, &mut printer)
        .with_config(config)
        .run()?;
    Ok((printer.into_inner().0, report))
}

/// Render offset-tagged host events as HTML into an [`std::io::Write`].
pub fn write_annotated_html<'a, I, W>(
    events: I,
    event_map: &EventMap,
    config: OverlayConfig,
    writer: W,
) -> Result<OverlayReport, RenderError>
where
    I: IntoIterator<Item = (RenderEvent<'a>, Range<usize>)>,
    W: std::io::Write,
{
    let printer = HtmlPrinter::new(IoWriter(writer));
    let report = AnnotatedWriter::new(events.into_iter(), event_map, printer)
        .with_config(config)
        .run()?;
    Ok(report)
}

/// Parse `source` as markdown and render it with `annotations` overlaid.
/// Ranges are plain-text char offsets.
#[cfg(feature = "markdown")]
pub fn render_markdown_with_annotations<A>(
    source: &str,
    annotations: A,
    config: OverlayConfig,
) -> Result<(String, OverlayReport), RenderError>
where
    A: IntoIterator<Item = (Annotation, Range<usize>)>,
{
    let event_map = EventMap::from_ranges(annotations)?;
    let events = PlainTextOffsets::new(MarkdownEvents::parse(source));
    render_annotated_html(events, &event_map, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_annotated_html() {
        let events = PlainTextOffsets::new(
            [
                RenderEvent::Begin(Block::Paragraph),
                RenderEvent::word("Hello"),
                RenderEvent::End(Block::Paragraph),
            ]
            .into_iter(),
        );
        let map = EventMap::from_ranges([(Annotation::new("X"), 0..5)]).unwrap();
        let (html, report) = render_annotated_html(events, &map, OverlayConfig::default()).unwrap();

        assert_eq!(
            html,
            r#"<p><annotation-marker data-annotation-id="X" data-sequence="0">Hello</annotation-marker></p>"#
        );
        assert_eq!(report.total_fragments(), 1);
    }

    #[test]
    fn test_write_annotated_html_to_io() {
        let events = PlainTextOffsets::new([RenderEvent::word("hi")].into_iter());
        let map = EventMap::from_ranges([(Annotation::new("X"), 0..1)]).unwrap();
        let mut out = Vec::new();
        write_annotated_html(
            events,
            &map,
            OverlayConfig::default().with_marker_element("m"),
            &mut out,
        )
        .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<m data-annotation-id="X" data-sequence="0">h</m>i"#
        );
    }

    #[cfg(feature = "markdown")]
    #[test]
    fn test_markdown_rejects_self_overlap() {
        let err = render_markdown_with_annotations(
            "text",
            [(Annotation::new("a"), 0..3), (Annotation::new("a"), 2..4)],
            OverlayConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RenderError::EventMap(EventMapError::SelfOverlap { .. })
        ));
    }
}
