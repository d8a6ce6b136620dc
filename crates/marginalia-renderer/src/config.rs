//! Marker element configuration.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// How annotation wrapper elements are spelled in the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlayConfig {
    /// Element name used for every marker fragment.
    pub marker_element: SmolStr,
    /// Attribute carrying the annotation id.
    pub id_attribute: SmolStr,
    /// Attribute carrying the fragment's sequence id.
    pub sequence_attribute: SmolStr,
    /// Optional `class` attribute added to every fragment.
    pub marker_class: Option<SmolStr>,
    /// Emit annotation metadata as `data-*` attributes.
    pub emit_metadata: bool,
}

impl OverlayConfig {
    pub const DEFAULT_MARKER_ELEMENT: &'static str = "annotation-marker";
    pub const DEFAULT_ID_ATTRIBUTE: &'static str = "data-annotation-id";
    pub const DEFAULT_SEQUENCE_ATTRIBUTE: &'static str = "data-sequence";

    pub fn with_marker_element(mut self, name: &str) -> Self {
        self.marker_element = SmolStr::new(name);
        self
    }

    pub fn with_id_attribute(mut self, name: &str) -> Self {
        self.id_attribute = SmolStr::new(name);
        self
    }

    pub fn with_sequence_attribute(mut self, name: &str) -> Self {
        self.sequence_attribute = SmolStr::new(name);
        self
    }

    pub fn with_marker_class(mut self, class: &str) -> Self {
        self.marker_class = Some(SmolStr::new(class));
        self
    }

    pub fn with_metadata(mut self, emit: bool) -> Self {
        self.emit_metadata = emit;
        self
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            marker_element: SmolStr::new_static(Self::DEFAULT_MARKER_ELEMENT),
            id_attribute: SmolStr::new_static(Self::DEFAULT_ID_ATTRIBUTE),
            sequence_attribute: SmolStr::new_static(Self::DEFAULT_SEQUENCE_ATTRIBUTE),
            marker_class: None,
            emit_metadata: true,
        }
    }
}
