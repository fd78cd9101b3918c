//! Ligature and neume positioning.
//!
//! Mensural ligatures get a per-note drawing shape (box, stems, oblique,
//! stacked) from a pairwise case table over duration classes and pitch
//! direction, then packed X offsets. Neumes get a SMuFL glyph per
//! component and glyph-width advances. Both are recomputed every layout
//! pass and never persisted.

use log::debug;

use crate::duration::DurClass;
use crate::metrics::{self, GlyphMetrics, LayoutOptions};
use crate::model::{lig_shape, Document, ElementId, ElementKind, LigForm, NcCurve, Tilt};
use crate::pitch::Pitch;

// ── Ligatures ───────────────────────────────────────────────────────

struct LigNote {
    id: ElementId,
    diatonic: i32,
    class: DurClass,
    maxima: bool,
    explicit_lig: Option<LigForm>,
}

fn ligature_notes(doc: &Document, ligature: ElementId) -> Vec<LigNote> {
    doc.children(ligature)
        .iter()
        .filter_map(|&id| match doc.kind(id) {
            ElementKind::Note(n) => Some(LigNote {
                id,
                diatonic: n.pitch.diatonic(),
                class: n.duration.dur.unwrap_or(crate::duration::Dur::Breve).lig_class(),
                maxima: n.duration.dur == Some(crate::duration::Dur::Maxima),
                explicit_lig: n.lig,
            }),
            _ => None,
        })
        .collect()
}

/// Pairwise drawing shapes for the notes of one ligature.
///
/// Shape flags are written onto the first note of each pair except for
/// stacking, which marks the second. An explicit `@lig` on the second
/// note overrides the automatic oblique and clears any oblique already
/// set on the previous pair.
fn calc_ligature_shapes(notes: &[LigNote]) -> Vec<u8> {
    let mut shapes = vec![lig_shape::DEFAULT; notes.len()];
    let last_pair = notes.len().saturating_sub(2);

    for i in 0..notes.len().saturating_sub(1) {
        let cur = &notes[i];
        let next = &notes[i + 1];
        let up = next.diatonic > cur.diatonic;
        let interval = next.diatonic - cur.diatonic;

        match (cur.class, next.class, up) {
            // Breve rising to a long keeps the square form with a right
            // stem down on the first note.
            (DurClass::Breve, DurClass::Long, true) => {
                shapes[i] |= lig_shape::STEM_RIGHT_DOWN;
            }
            // Descending pairs opening or closing the ligature with breve
            // values draw obliquely, unless a maxima is involved.
            (DurClass::Breve, DurClass::Breve, false)
            | (DurClass::Breve, DurClass::Long, false)
                if (i == 0 || i == last_pair) && !cur.maxima && !next.maxima =>
            {
                shapes[i] |= lig_shape::OBLIQUE;
            }
            // Breve descending: propriety stem on the left, down.
            (DurClass::Breve, _, false) => {
                shapes[i] |= lig_shape::STEM_LEFT_DOWN;
            }
            // Long ascending keeps its left stem down.
            (DurClass::Long, _, true) => {
                shapes[i] |= lig_shape::STEM_LEFT_DOWN;
            }
            // Semibreve pairs share an upward left stem (cum opposita
            // proprietate).
            (DurClass::Semibreve, DurClass::Semibreve, _) => {
                shapes[i] |= lig_shape::STEM_LEFT_UP;
            }
            // Unrecognized pair: no change.
            _ => {}
        }

        // Ascending step-wise square pairs stack the second note above
        // the first instead of advancing.
        if up && interval == 1 && shapes[i] & lig_shape::OBLIQUE == 0 {
            shapes[i + 1] |= lig_shape::STACKED;
        }

        // Explicit encoding wins over the automatic rules.
        match next.explicit_lig {
            Some(LigForm::Obliqua) => {
                shapes[i] |= lig_shape::OBLIQUE;
                if i > 0 {
                    shapes[i - 1] &= !lig_shape::OBLIQUE;
                }
            }
            Some(LigForm::Recta) => {
                shapes[i] &= !lig_shape::OBLIQUE;
            }
            None => {}
        }
    }

    shapes
}

fn position_ligature(
    doc: &mut Document,
    ligature: ElementId,
    options: &LayoutOptions,
    metrics_provider: &dyn GlyphMetrics,
) {
    let notes = ligature_notes(doc, ligature);
    if notes.len() < 2 {
        debug!("ligature with fewer than two notes, left unshaped");
        return;
    }
    let shapes = calc_ligature_shapes(&notes);

    let first_x = doc.derive_x(notes[0].id);
    let mut offset = 0.0;
    for i in 0..notes.len() {
        doc.layout_mut(notes[i].id).lig_shape = shapes[i];
        if i > 0 {
            let radius = doc.drawing_radius(notes[i - 1].id, options, metrics_provider, true);
            let width = 2.0 * radius;
            let mut advance = width - options.stem_width;
            if shapes[i] & lig_shape::STACKED != 0 {
                advance -= width;
            }
            if shapes[i - 1] & lig_shape::OBLIQUE != 0 {
                let interval = (notes[i].diatonic - notes[i - 1].diatonic).abs();
                if interval > 2 {
                    // Limit the slant angle of wide obliques.
                    advance += (interval - 2) as f64 * width * 2.0 / 3.0;
                }
            }
            offset += advance;
            let target = first_x + offset;
            let shift = target - doc.derive_x(notes[i].id);
            doc.layout_mut(notes[i].id).x_rel += shift;
        }
    }
}

// ── Neumes ──────────────────────────────────────────────────────────

struct NeumeNc {
    id: ElementId,
    pitch: Pitch,
    tilt: Option<Tilt>,
    curve: Option<NcCurve>,
    ligated: bool,
    liquescent: bool,
    oriscus: bool,
    quilisma: bool,
}

fn neume_ncs(doc: &Document, neume: ElementId) -> Vec<NeumeNc> {
    doc.children(neume)
        .iter()
        .filter_map(|&id| match doc.kind(id) {
            ElementKind::Nc(nc) => Some(NeumeNc {
                id,
                pitch: nc.pitch,
                tilt: nc.tilt,
                curve: nc.curve,
                ligated: nc.ligated,
                liquescent: nc.liquescent,
                oriscus: nc.oriscus,
                quilisma: nc.quilisma,
            }),
            _ => None,
        })
        .collect()
}

/// Standalone glyph for a neume component.
fn nc_glyph(nc: &NeumeNc) -> u32 {
    if nc.quilisma {
        return metrics::CHANT_QUILISMA;
    }
    if nc.oriscus {
        return metrics::CHANT_ORISCUS;
    }
    if nc.liquescent {
        return match nc.curve {
            Some(NcCurve::Anticlockwise) => metrics::CHANT_AUCTUM_ASC,
            Some(NcCurve::Clockwise) | None => metrics::CHANT_AUCTUM_DESC,
        };
    }
    match nc.tilt {
        Some(Tilt::South) => metrics::CHANT_PUNCTUM_INCLINATUM,
        Some(Tilt::North) => metrics::CHANT_PUNCTUM_VIRGA,
        None => metrics::CHANT_PUNCTUM,
    }
}

/// Paired glyphs for a two-component ligature inside a neume, keyed by
/// the signed pitch difference (descending seconds through fifths).
fn ligated_pair_glyphs(diff: i32) -> Option<(u32, u32)> {
    match diff {
        -1 => Some((metrics::CHANT_ENTRY_LINE_2ND, metrics::CHANT_LIGATURA_DESC_2ND)),
        -2 => Some((metrics::CHANT_ENTRY_LINE_3RD, metrics::CHANT_LIGATURA_DESC_3RD)),
        -3 => Some((metrics::CHANT_ENTRY_LINE_4TH, metrics::CHANT_LIGATURA_DESC_4TH)),
        -4 => Some((metrics::CHANT_ENTRY_LINE_5TH, metrics::CHANT_LIGATURA_DESC_5TH)),
        _ => None,
    }
}

fn position_neume(doc: &mut Document, neume: ElementId, metrics_provider: &dyn GlyphMetrics) {
    let ncs = neume_ncs(doc, neume);
    if ncs.is_empty() {
        return;
    }

    let size = 1.0;
    let first_x = doc.derive_x(ncs[0].id);
    let mut offset = 0.0;
    let mut i = 0;
    while i < ncs.len() {
        // Ligated pairs draw as a single two-glyph unit with no advance
        // between the members.
        let pair = if ncs[i].ligated && i + 1 < ncs.len() && ncs[i + 1].ligated {
            ligated_pair_glyphs(ncs[i + 1].pitch.diatonic() - ncs[i].pitch.diatonic())
        } else {
            None
        };

        if let Some((entry, body)) = pair {
            doc.layout_mut(ncs[i].id).nc_glyphs = vec![entry];
            doc.layout_mut(ncs[i + 1].id).nc_glyphs = vec![body];
            for &id in &[ncs[i].id, ncs[i + 1].id] {
                let shift = first_x + offset - doc.derive_x(id);
                doc.layout_mut(id).x_rel += shift;
            }
            offset += metrics_provider.glyph_width(body, size);
            i += 2;
            continue;
        }

        let glyph = nc_glyph(&ncs[i]);
        if i > 0 && ncs[i].pitch.diatonic() == ncs[i - 1].pitch.diatonic() {
            // Repercussive components at the same pitch tuck under the
            // connecting line of the previous glyph.
            offset -= metrics_provider.glyph_width(metrics::CHANT_CONNECTING_LINE, size);
        }
        doc.layout_mut(ncs[i].id).nc_glyphs = vec![glyph];
        let shift = first_x + offset - doc.derive_x(ncs[i].id);
        doc.layout_mut(ncs[i].id).x_rel += shift;
        offset += metrics_provider.glyph_width(glyph, size);
        i += 1;
    }
}

/// Run the ligature/neume positioning pass over one measure.
pub fn run_neume_positions(
    doc: &mut Document,
    measure: usize,
    options: &LayoutOptions,
    metrics_provider: &dyn GlyphMetrics,
) {
    let ids = super::horizontal::measure_elements(doc, measure);
    for id in ids {
        match doc.kind(id) {
            ElementKind::Ligature => position_ligature(doc, id, options, metrics_provider),
            ElementKind::Neume => position_neume(doc, id, metrics_provider),
            _ => {}
        }
    }
}
