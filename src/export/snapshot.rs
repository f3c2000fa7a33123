use std::sync::Arc;

use crate::assets::decode::PreparedImage;
use crate::foundation::core::Canvas;
use crate::model::adjustments::Adjustments;
use crate::model::annotation::TextAnnotation;
use crate::render::compositor::FrameInputs;

/// Frozen copy of the editing state taken when an export starts.
///
/// Later edits to the session never reach an export that already holds a snapshot.
#[derive(Clone, Debug, Default)]
pub struct ExportSnapshot {
    pub canvas: Canvas,
    /// Department display name, used for the artifact file name.
    pub department: Option<String>,
    pub adjustments: Adjustments,
    pub annotations: Vec<TextAnnotation>,
    pub template: Option<Arc<PreparedImage>>,
}

impl ExportSnapshot {
    /// Compositor inputs for one exported frame. Exports never carry a selection outline.
    pub fn frame_inputs<'a>(&'a self, background: Option<&'a PreparedImage>) -> FrameInputs<'a> {
        FrameInputs {
            canvas: self.canvas,
            background,
            adjustments: &self.adjustments,
            template: self.template.as_deref(),
            annotations: &self.annotations,
            selected: None,
        }
    }

    pub fn department_name(&self) -> Option<&str> {
        self.department.as_deref()
    }
}
