//! Charting collaborator seam.

use sqlbook_error::Result;

use crate::frame::ColumnarFrame;

/// Turns chart-config tokens plus a populated frame into a chart-spec
/// payload. The payload is opaque to the dispatch core.
pub trait ChartRenderer {
    fn render_chart(
        &self,
        config_tokens: &[String],
        frame: &ColumnarFrame,
    ) -> Result<serde_json::Value>;
}

/// Minimal built-in renderer: emits the frame as vega-lite-shaped record
/// data with the raw config tokens attached. A full grammar-of-graphics
/// collaborator replaces this wholesale; the kernel only guarantees what
/// it feeds in.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameDataRenderer;

impl ChartRenderer for FrameDataRenderer {
    fn render_chart(
        &self,
        config_tokens: &[String],
        frame: &ColumnarFrame,
    ) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "data": { "values": frame.row_objects() },
            "usermeta": { "config": config_tokens },
        }))
    }
}
