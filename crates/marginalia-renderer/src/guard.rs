//! Structural boundary guard.
//!
//! Marker fragments only ever live inside runs of literal content. Every
//! structural begin or end closes whatever is open before the structural
//! markup is written; nothing is reopened here.

use crate::engine::NestingEngine;
use crate::printer::MarkupPrinter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundaryGuard {
    /// Structural events passed through the guard.
    pub crossings: usize,
    /// Crossings that found markers open and had to close them.
    pub forced_closures: usize,
}

impl BoundaryGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close all open markers, then run `render` to write the structural
    /// markup.
    pub fn cross<P, F>(
        &mut self,
        engine: &mut NestingEngine<'_>,
        out: &mut P,
        render: F,
    ) -> Result<(), P::Error>
    where
        P: MarkupPrinter,
        F: FnOnce(&mut P) -> Result<(), P::Error>,
    {
        self.crossings += 1;
        let closed = engine.close_all(out)?;
        if closed > 0 {
            self.forced_closures += 1;
            tracing::trace!(closed, "closed markers at structural boundary");
        }
        debug_assert!(engine.stack().is_empty());
        render(out)
    }

    /// Close all open markers around content that is not itself
    /// structural, such as an atomic raw block. Not counted as a crossing.
    pub fn seal<P: MarkupPrinter>(
        &mut self,
        engine: &mut NestingEngine<'_>,
        out: &mut P,
    ) -> Result<usize, P::Error> {
        let closed = engine.close_all(out)?;
        debug_assert!(engine.stack().is_empty());
        Ok(closed)
    }
}
