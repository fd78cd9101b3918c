//! Vertical / pitch positioning pass.
//!
//! Computes `drawing_loc` (staff-line location, 0 = middle line) and the
//! staff-relative Y for every positioned element, tracking clef changes as
//! it walks each layer. Cross-staff elements resolve against the clef of
//! the staff they are drawn on. Accidentals attached to notes are not
//! positioned here — they are registered into the accidental space of the
//! note's alignment and placed by the accidental resolver.

use crate::functor::{walk_elements, VisitAction, Visitor};
use crate::metrics::LayoutOptions;
use crate::model::{Document, ElementId, ElementKind};
use crate::pitch::{pitch_loc, Clef};

struct CalcVertically<'a> {
    measure: usize,
    staff_idx: usize,
    options: &'a LayoutOptions,
    /// Clef in effect at the cursor, updated by clef elements.
    clef: Clef,
}

impl<'a> CalcVertically<'a> {
    /// Clef the element is read against: the referenced staff's clef for
    /// cross-staff elements, the running layer clef otherwise.
    fn effective_clef(&self, doc: &Document, id: ElementId) -> Clef {
        let layout = doc.layout(id);
        if let Some(n) = layout.cross_staff {
            let own_n = doc.measures[self.measure].staves[self.staff_idx].n;
            if n == own_n {
                log::warn!("element claims a cross-staff reference to its own staff, ignored");
            } else if let Some(idx) = doc.staff_index_by_n(self.measure, n) {
                return doc.measures[self.measure].staves[idx].clef;
            } else {
                log::warn!("cross-staff reference to unknown staff {n}, ignored");
            }
        }
        self.clef
    }

    fn set_loc(&self, doc: &mut Document, id: ElementId, loc: i32) {
        let unit = self.options.unit();
        let layout = doc.layout_mut(id);
        layout.drawing_loc = Some(loc);
        layout.y_rel = loc as f64 * unit;
    }

    /// Chord location is the top note's location.
    fn chord_loc(&self, doc: &Document, id: ElementId) -> i32 {
        doc.children(id)
            .iter()
            .filter_map(|&c| {
                doc.pitch_of(c)
                    .map(|p| pitch_loc(&p, &self.effective_clef(doc, c)))
            })
            .max()
            .unwrap_or(0)
    }

    fn chord_extremes(&self, doc: &Document, id: ElementId) -> Option<(i32, i32)> {
        let locs: Vec<i32> = doc
            .children(id)
            .iter()
            .filter_map(|&c| {
                doc.pitch_of(c)
                    .map(|p| pitch_loc(&p, &self.effective_clef(doc, c)))
            })
            .collect();
        match (locs.iter().min(), locs.iter().max()) {
            (Some(&lo), Some(&hi)) => Some((lo, hi)),
            _ => None,
        }
    }

    /// Automatic rest placement (spec: mid-staff, multi-layer shift,
    /// in-beam neighbor averaging, stem-line offsets, parity, nudge).
    fn rest_auto_loc(&self, doc: &Document, id: ElementId) -> i32 {
        let staff = &doc.measures[self.measure].staves[self.staff_idx];
        let mut loc = 0;

        if staff.layers.len() > 1 {
            let topmost = staff
                .layers
                .iter()
                .map(|l| l.n)
                .min()
                .map_or(true, |min_n| doc.layout(id).layer_n == min_n);
            loc = if topmost { 2 } else { -2 };
        }

        if let Some(beam) = doc.first_ancestor(id, |k| matches!(k, ElementKind::Beam)) {
            if let Some(avg) = self.beam_neighbor_average(doc, beam, id) {
                // Near-centered rests keep the naive guess to avoid
                // needless jitter.
                if (avg - loc).abs() > 3 {
                    loc = self.apply_stem_line_offset(doc, id, avg);
                }
            }
        }

        // Rests outside the staff get nudged one step back toward it.
        if loc > 4 {
            loc -= 1;
        } else if loc < -4 {
            loc += 1;
        }

        self.fix_parity(doc, id, loc)
    }

    /// Average of the nearest preceding and following note/chord
    /// locations inside the same beam (chords count as their top/bottom
    /// midpoint).
    fn beam_neighbor_average(
        &self,
        doc: &Document,
        beam: ElementId,
        rest: ElementId,
    ) -> Option<i32> {
        let mut order: Vec<ElementId> = Vec::new();
        collect_beam_content(doc, beam, &mut order);
        let at = order.iter().position(|&e| e == rest)?;

        let loc_of = |e: ElementId| -> Option<i32> {
            match doc.kind(e) {
                ElementKind::Note(_) => doc
                    .pitch_of(e)
                    .map(|p| pitch_loc(&p, &self.effective_clef(doc, e))),
                ElementKind::Chord(_) => {
                    self.chord_extremes(doc, e).map(|(lo, hi)| (lo + hi) / 2)
                }
                _ => None,
            }
        };

        let before = order[..at].iter().rev().find_map(|&e| loc_of(e));
        let after = order[at + 1..].iter().find_map(|&e| loc_of(e));
        match (before, after) {
            (Some(b), Some(a)) => Some(div_round(b + a, 2)),
            (Some(b), None) => Some(b),
            (None, Some(a)) => Some(a),
            (None, None) => None,
        }
    }

    /// Offsets aligning a beamed rest to the stem line, per duration.
    /// 64th and smaller durations have no offset tier and take the plain
    /// average (known incompleteness carried over from the source).
    fn apply_stem_line_offset(&self, doc: &Document, id: ElementId, avg: i32) -> i32 {
        let beams = doc
            .duration_of(id)
            .and_then(|d| d.dur)
            .map_or(0, |d| d.beam_count());
        let (top, bottom) = match beams {
            1 => (1, -1),
            2 => (1, -2),
            3 => (2, -2),
            _ => (0, 0),
        };
        if avg > 0 {
            avg + top
        } else {
            avg + bottom
        }
    }

    /// Undotted rests sit on lines (even locations), dotted rests in
    /// spaces so the dot clears the staff line. Correction moves one step
    /// toward the staff middle.
    fn fix_parity(&self, doc: &Document, id: ElementId, loc: i32) -> i32 {
        let dotted = doc
            .duration_of(id)
            .map_or(false, |d| d.dots > 0)
            || doc
                .children(id)
                .iter()
                .any(|&c| matches!(doc.kind(c), ElementKind::Dot));
        let wants_odd = dotted;
        if (loc.rem_euclid(2) == 1) == wants_odd {
            return loc;
        }
        if loc > 0 {
            loc - 1
        } else {
            loc + 1
        }
    }
}

fn div_round(a: i32, b: i32) -> i32 {
    // Round half away from zero.
    let q = a as f64 / b as f64;
    q.round() as i32
}

fn collect_beam_content(doc: &Document, id: ElementId, out: &mut Vec<ElementId>) {
    for &c in doc.children(id) {
        match doc.kind(c) {
            ElementKind::Note(_) | ElementKind::Chord(_) | ElementKind::Rest(_) => out.push(c),
            ElementKind::Tuplet(_) | ElementKind::Beam => collect_beam_content(doc, c, out),
            _ => {}
        }
    }
}

impl Visitor for CalcVertically<'_> {
    fn element(&mut self, doc: &mut Document, id: ElementId) -> VisitAction {
        match doc.kind(id).clone() {
            ElementKind::Clef(clef) => {
                // Track the change, then place the glyph on its line.
                if doc.layout(id).cross_staff.is_none() {
                    self.clef = clef;
                }
                self.set_loc(doc, id, clef.glyph_loc());
                VisitAction::Continue
            }
            ElementKind::Chord(_) => {
                let loc = self.chord_loc(doc, id);
                self.set_loc(doc, id, loc);
                VisitAction::Continue
            }
            ElementKind::Note(n) => {
                let clef = self.effective_clef(doc, id);
                let loc = pitch_loc(&n.pitch, &clef);
                self.set_loc(doc, id, loc);
                VisitAction::Continue
            }
            ElementKind::Accid(_) => {
                // An accidental attached to a note goes into the
                // accidental space of the note's alignment (or grace
                // aligner) instead of being positioned directly.
                let parent = doc.parent(id).filter(|&p| {
                    matches!(doc.kind(p), ElementKind::Note(_))
                });
                match parent {
                    Some(note) => {
                        let note_loc = doc.layout(note).drawing_loc.unwrap_or(0);
                        self.set_loc(doc, id, note_loc);
                        let grace = doc.layout(note).grace_alignment;
                        let alignment = doc.layout(note).alignment;
                        if let Some(g) = grace {
                            if let Some(ga) = doc.measures[g.measure]
                                .aligner
                                .alignment_mut(g.alignment)
                                .grace
                                .get_mut(&g.staff_n)
                            {
                                ga.accid_space.push(id);
                            }
                        } else if let Some(a) = alignment {
                            doc.measures[a.measure]
                                .aligner
                                .alignment_mut(a.index)
                                .accid_space
                                .push(id);
                        } else {
                            log::warn!("accidental's note has no alignment, skipped");
                        }
                    }
                    None => {
                        log::warn!("accidental without a parent note, placed at mid-staff");
                        self.set_loc(doc, id, 0);
                    }
                }
                VisitAction::Continue
            }
            ElementKind::Rest(r) => {
                let loc = match r.loc {
                    Some(explicit) => {
                        let fixed = self.fix_parity(doc, id, explicit);
                        if fixed != explicit {
                            log::warn!(
                                "rest @loc {explicit} has wrong parity, corrected to {fixed}"
                            );
                        }
                        fixed
                    }
                    None => self.rest_auto_loc(doc, id),
                };
                self.set_loc(doc, id, loc);
                VisitAction::Continue
            }
            ElementKind::MRest => {
                let loc = self.rest_auto_loc(doc, id);
                self.set_loc(doc, id, loc);
                VisitAction::Continue
            }
            ElementKind::Dot => {
                // Dots sit in the space above their parent's line.
                let loc = doc
                    .parent(id)
                    .and_then(|p| doc.layout(p).drawing_loc)
                    .unwrap_or(0);
                let loc = if loc.rem_euclid(2) == 0 { loc + 1 } else { loc };
                self.set_loc(doc, id, loc);
                VisitAction::Continue
            }
            ElementKind::Custos(c) => {
                let loc = c
                    .pitch
                    .map(|p| pitch_loc(&p, &self.effective_clef(doc, id)))
                    .unwrap_or(0);
                self.set_loc(doc, id, loc);
                VisitAction::Continue
            }
            ElementKind::Nc(nc) => {
                let loc = pitch_loc(&nc.pitch, &self.effective_clef(doc, id));
                self.set_loc(doc, id, loc);
                VisitAction::Continue
            }
            ElementKind::Neume => {
                // Anchored at its first component.
                let loc = doc
                    .children(id)
                    .first()
                    .and_then(|&c| doc.pitch_of(c))
                    .map(|p| pitch_loc(&p, &self.effective_clef(doc, id)))
                    .unwrap_or(0);
                self.set_loc(doc, id, loc);
                VisitAction::Continue
            }
            _ => VisitAction::Continue,
        }
    }

}

/// Run the vertical positioning pass over one measure.
pub fn run_vertical(doc: &mut Document, measure: usize, options: &LayoutOptions) {
    let staff_count = doc.measures[measure].staves.len();
    for staff_idx in 0..staff_count {
        let base_clef = doc.measures[measure].staves[staff_idx].clef;
        let layer_count = doc.measures[measure].staves[staff_idx].layers.len();
        for layer_idx in 0..layer_count {
            let ids = doc.measures[measure].staves[staff_idx].layers[layer_idx]
                .elements
                .clone();
            let mut pass = CalcVertically {
                measure,
                staff_idx,
                options,
                clef: base_clef,
            };
            walk_elements(doc, &ids, &mut pass);
        }
    }
}
