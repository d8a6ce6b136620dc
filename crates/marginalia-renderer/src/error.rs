use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum EventMapError {
    #[error("annotation {id} has an inverted range {start}..{end}")]
    #[diagnostic(code(marginalia::event_map::inverted_range))]
    InvertedRange { id: SmolStr, start: usize, end: usize },

    #[error("annotation {id} overlaps itself: {first:?} and {second:?}")]
    #[diagnostic(
        code(marginalia::event_map::self_overlap),
        help("ranges sharing an annotation id may touch but must not overlap")
    )]
    SelfOverlap {
        id: SmolStr,
        first: std::ops::Range<usize>,
        second: std::ops::Range<usize>,
    },
}

#[derive(Debug, Error, Diagnostic)]
pub enum RenderError {
    #[error("failed to write markup")]
    #[diagnostic(code(marginalia::render::write))]
    Write(#[from] std::fmt::Error),

    #[error("io error: {0}")]
    #[diagnostic(code(marginalia::render::io))]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    EventMap(#[from] EventMapError),
}
