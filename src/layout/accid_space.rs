//! Accidental space resolution.
//!
//! Every time-slice carries the accidentals registered against it. They
//! are laid out right to left: sorted top-down (ties broken by layer
//! number), each accidental starts just left of its note and slides
//! further left past every already-placed accidental it would touch.

use log::debug;

use crate::metrics::{self, GlyphMetrics, LayoutOptions};
use crate::model::{Document, ElementId, ElementKind};
use crate::pitch::AccidKind;

/// SMuFL glyph for a written accidental.
pub fn accid_glyph(kind: AccidKind) -> u32 {
    match kind {
        AccidKind::Sharp => metrics::ACCID_SHARP,
        AccidKind::Flat => metrics::ACCID_FLAT,
        AccidKind::Natural => metrics::ACCID_NATURAL,
        AccidKind::DoubleSharp => metrics::ACCID_DOUBLE_SHARP,
        AccidKind::DoubleFlat => metrics::ACCID_DOUBLE_FLAT,
    }
}

struct Placed {
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
}

fn accid_box(
    doc: &Document,
    id: ElementId,
    options: &LayoutOptions,
    metrics_provider: &dyn GlyphMetrics,
) -> Option<(f64, f64)> {
    let (kind, enclosed) = match doc.kind(id) {
        ElementKind::Accid(a) => (a.kind, a.enclosed),
        _ => return None,
    };
    let size = if doc.is_grace(id) { options.grace_factor } else { 1.0 };
    let mut width = metrics_provider.glyph_width(accid_glyph(kind), size);
    if enclosed {
        width += metrics_provider.glyph_width(metrics::ACCID_PARENS_LEFT, size)
            + metrics_provider.glyph_width(metrics::ACCID_PARENS_RIGHT, size);
    }
    let height = metrics_provider.glyph_height(accid_glyph(kind), size);
    Some((width, height))
}

/// Lay out one accidental column. `ids` is the accid space of a single
/// alignment or grace cluster; x offsets are written into each
/// accidental's `x_rel`, measured leftward from its parent note.
fn resolve_column(
    doc: &mut Document,
    ids: &[ElementId],
    options: &LayoutOptions,
    metrics_provider: &dyn GlyphMetrics,
) {
    // Top accidental first; on equal staff positions the lower-numbered
    // layer wins the rightmost column.
    let mut order: Vec<ElementId> = ids.to_vec();
    order.sort_by(|&a, &b| {
        let la = doc.layout(a).drawing_loc.unwrap_or(0);
        let lb = doc.layout(b).drawing_loc.unwrap_or(0);
        lb.cmp(&la).then(doc.layout(a).layer_n.cmp(&doc.layout(b).layer_n))
    });

    let mut placed: Vec<Placed> = Vec::new();
    for id in order {
        let (width, height) = match accid_box(doc, id, options, metrics_provider) {
            Some(b) => b,
            None => {
                debug!("non-accidental in accidental space, skipped");
                continue;
            }
        };
        let note = match doc.first_ancestor(id, |k| matches!(k, ElementKind::Note(_))) {
            Some(n) => n,
            None => continue,
        };
        let note_radius = doc.drawing_radius(note, options, metrics_provider, false);
        let note_x = doc.derive_x(note);
        let y = doc.derive_y(id, options);
        let top = y - height / 2.0;
        let bottom = y + height / 2.0;

        // Rightmost admissible position, then slide left past any placed
        // accidental sharing vertical space.
        let mut right = note_x - note_radius - options.accid_note_gap;
        let margin = options.accid_margin;
        loop {
            let blocker = placed.iter().find(|p| {
                top < p.bottom + margin
                    && bottom > p.top - margin
                    && right - width < p.right + margin
                    && right > p.left - margin
            });
            match blocker {
                Some(p) => right = p.left - margin,
                None => break,
            }
        }

        placed.push(Placed { left: right - width, right, top, bottom });
        // x_rel is relative to the parent note.
        let layout = doc.layout_mut(id);
        layout.x_rel = (right - width / 2.0) - note_x;
        layout.cached_x = None;
    }
}

/// Resolve accidental space for every alignment of a measure, including
/// the grace clusters hanging off them.
pub fn run_accid_space(
    doc: &mut Document,
    measure: usize,
    options: &LayoutOptions,
    metrics_provider: &dyn GlyphMetrics,
) {
    let slot_count = doc.measures[measure].aligner.len();
    for slot in 0..slot_count {
        let ids = doc.measures[measure].aligner.alignment(slot).accid_space.clone();
        if !ids.is_empty() {
            resolve_column(doc, &ids, options, metrics_provider);
        }
        let staff_keys: Vec<usize> = doc.measures[measure]
            .aligner
            .alignment(slot)
            .grace
            .keys()
            .copied()
            .collect();
        for staff_n in staff_keys {
            let grace_ids = doc.measures[measure].aligner.alignment(slot).grace[&staff_n]
                .accid_space
                .clone();
            if !grace_ids.is_empty() {
                resolve_column(doc, &grace_ids, options, metrics_provider);
            }
        }
    }
}
