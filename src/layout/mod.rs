//! The layout pipeline.
//!
//! Five passes per measure, strictly ordered: horizontal alignment builds
//! the per-measure time-slices, spacing turns them into X positions, the
//! vertical pass assigns staff locations, then the collision, accidental
//! and ligature/neume passes nudge elements apart. Later passes read the
//! alignments the first pass created, so a measure is always processed
//! front to back.

pub mod accid_space;
pub mod adjust;
pub mod horizontal;
pub mod neumes;
pub mod vertical;

use log::info;
use serde::Serialize;

use crate::metrics::{GlyphMetrics, LayoutOptions};
use crate::model::Document;

/// Run the full layout pipeline over every measure of the document and
/// memoize the resulting drawing coordinates.
pub fn layout_document(doc: &mut Document, options: &LayoutOptions, metrics: &dyn GlyphMetrics) {
    // Stale coordinates from a previous cycle must never leak into the
    // spacing math.
    doc.reset_drawing();

    for measure in 0..doc.measures.len() {
        horizontal::run_horizontal(doc, measure);
        horizontal::space_alignments(doc, measure, options, metrics);
    }

    // Measures sit side by side once their widths are known.
    let mut x = 0.0;
    for m in &mut doc.measures {
        m.x = x;
        x += m.width;
    }

    for measure in 0..doc.measures.len() {
        vertical::run_vertical(doc, measure, options);
        adjust::run_adjust_layers(doc, measure, options, metrics);
        accid_space::run_accid_space(doc, measure, options, metrics);
        neumes::run_neume_positions(doc, measure, options, metrics);
    }

    cache_positions(doc, options);
    info!("layout complete: {} measures", doc.measures.len());
}

/// Memoize every element's absolute coordinates. Must run last: the
/// derivation walks alignments and ancestors, the cache makes repeated
/// renderer reads cheap.
fn cache_positions(doc: &mut Document, options: &LayoutOptions) {
    let ids: Vec<_> = doc.ids().collect();
    for id in ids {
        let x = doc.derive_x(id);
        let y = doc.derive_y(id, options);
        let layout = doc.layout_mut(id);
        layout.cached_x = Some(x);
        layout.cached_y = Some(y);
    }
}

/// One element's computed position, for export.
#[derive(Debug, Serialize)]
pub struct ElementPosition {
    pub id: usize,
    pub kind: &'static str,
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc: Option<i32>,
    #[serde(skip_serializing_if = "is_zero")]
    pub lig_shape: u8,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub glyphs: Vec<u32>,
}

fn is_zero(v: &u8) -> bool {
    *v == 0
}

/// Snapshot of all computed positions as JSON, for renderer and tooling
/// consumers.
pub fn layout_to_json(doc: &Document, options: &LayoutOptions) -> serde_json::Result<String> {
    let positions: Vec<ElementPosition> = doc
        .ids()
        .map(|id| ElementPosition {
            id: id.index(),
            kind: doc.kind(id).name(),
            x: doc.drawing_x(id),
            y: doc.drawing_y(id, options),
            loc: doc.layout(id).drawing_loc,
            lig_shape: doc.layout(id).lig_shape,
            glyphs: doc.layout(id).nc_glyphs.clone(),
        })
        .collect();
    serde_json::to_string_pretty(&positions)
}
