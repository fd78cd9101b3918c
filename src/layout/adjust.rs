//! Cross-layer collision adjustment.
//!
//! Processes the notes and dots of a staff layer by layer, in alignment
//! order. Elements of layers already processed form the "previous" list;
//! each incoming element is tested against it and, on overlap, its owning
//! chord (or the note itself) is pushed to the right. Already-placed
//! elements never move, so the pass converges in a single sweep per layer.

use crate::duration::Dur;
use crate::functor::{walk_elements, VisitAction, Visitor};
use crate::metrics::{GlyphMetrics, LayoutOptions};
use crate::model::{Document, ElementId, ElementKind, StemDir};
use crate::pitch::Pitch;

#[derive(Debug, Clone)]
struct Entry {
    owner: ElementId,
    is_dots: bool,
    loc: i32,
    pitch: Option<Pitch>,
    dur: Option<Dur>,
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
}

struct AdjustLayers<'a> {
    options: &'a LayoutOptions,
    metrics: &'a dyn GlyphMetrics,
    previous: Vec<Entry>,
    current: Vec<Entry>,
}

impl<'a> AdjustLayers<'a> {
    fn entry(&self, doc: &Document, id: ElementId, is_dots: bool) -> Entry {
        let x = doc.derive_x(id);
        let y = doc.derive_y(id, self.options);
        let half = if is_dots {
            0.3 * self.options.unit()
        } else {
            doc.drawing_radius(id, self.options, self.metrics, false)
        };
        let half_height = if is_dots {
            0.3 * self.options.unit()
        } else {
            self.options.unit()
        };
        // The owning chord takes the shift when there is one.
        let owner = doc
            .first_ancestor(id, |k| matches!(k, ElementKind::Chord(_)))
            .unwrap_or(id);
        Entry {
            owner,
            is_dots,
            loc: doc.layout(id).drawing_loc.unwrap_or(0),
            pitch: doc.pitch_of(id),
            dur: doc.duration_of(id).and_then(|d| d.dur),
            left: x - half,
            right: x + half,
            top: y - half_height,
            bottom: y + half_height,
        }
    }

    /// Required rightward shift to clear `prev`, or None when the pair is
    /// allowed to stand.
    fn required_shift(&self, prev: &Entry, cur: &Entry) -> Option<f64> {
        // Dots never collide with dots.
        if prev.is_dots && cur.is_dots {
            return None;
        }

        let mut h_margin = self.options.stem_width * self.options.horizontal_margin_factor;

        match (&prev.pitch, &cur.pitch) {
            (Some(p), Some(c)) if p.is_unison_with(c) => {
                let long_enough = |d: Option<Dur>| d.map_or(false, |d| d <= Dur::Half);
                // Half notes and longer in unison keep their diverging
                // stems; no shift.
                if long_enough(prev.dur) && long_enough(cur.dur) {
                    return None;
                }
                // Whole-note unisons may share the head outline exactly.
                if prev.dur == Some(Dur::Whole) && cur.dur == Some(Dur::Whole) {
                    h_margin = 0.0;
                }
            }
            (Some(_), Some(_)) if (prev.loc - cur.loc).abs() > 1 => {
                // Too far apart vertically to interlock.
                return None;
            }
            _ => {}
        }

        let v_margin = self.options.vertical_margin * self.options.unit();
        let vertical_overlap =
            cur.top < prev.bottom + v_margin && cur.bottom > prev.top - v_margin;
        if !vertical_overlap {
            return None;
        }

        let overlap = prev.right + h_margin - cur.left;
        if overlap > 0.0 {
            Some(overlap)
        } else {
            None
        }
    }

    fn process(&mut self, doc: &mut Document, id: ElementId, is_dots: bool) -> VisitAction {
        let mut entry = self.entry(doc, id, is_dots);
        for prev in &self.previous {
            // Bounded search window around the incoming element.
            if entry.left - prev.right > self.options.search_window {
                continue;
            }
            if !prev.is_dots
                && !entry.is_dots
                && chords_share_noteheads(doc, prev.owner, entry.owner)
            {
                continue;
            }
            if let Some(shift) = self.required_shift(prev, &entry) {
                doc.layout_mut(entry.owner).x_rel += shift;
                entry.left += shift;
                entry.right += shift;
            }
        }
        self.current.push(entry);
        VisitAction::Continue
    }

    fn flush_layer(&mut self) {
        self.previous.append(&mut self.current);
        self.previous
            .sort_by(|a, b| a.left.partial_cmp(&b.left).unwrap_or(std::cmp::Ordering::Equal));
    }
}

impl Visitor for AdjustLayers<'_> {
    fn element(&mut self, doc: &mut Document, id: ElementId) -> VisitAction {
        match doc.kind(id) {
            ElementKind::Note(_) => self.process(doc, id, false),
            ElementKind::Dot => self.process(doc, id, true),
            _ => VisitAction::Continue,
        }
    }
}

/// Run the cross-layer collision pass over one measure. Staves with a
/// single layer are left untouched.
pub fn run_adjust_layers(
    doc: &mut Document,
    measure: usize,
    options: &LayoutOptions,
    metrics: &dyn GlyphMetrics,
) {
    let staff_count = doc.measures[measure].staves.len();
    for staff_idx in 0..staff_count {
        if doc.measures[measure].staves[staff_idx].layers.len() < 2 {
            continue;
        }
        // Layers in number order: lower-numbered (upper) voices place
        // first and are never moved afterwards.
        let mut layer_order: Vec<usize> =
            (0..doc.measures[measure].staves[staff_idx].layers.len()).collect();
        layer_order.sort_by_key(|&i| doc.measures[measure].staves[staff_idx].layers[i].n);

        let mut pass = AdjustLayers {
            options,
            metrics,
            previous: Vec::new(),
            current: Vec::new(),
        };
        for layer_idx in layer_order {
            let ids = doc.measures[measure].staves[staff_idx].layers[layer_idx]
                .elements
                .clone();
            walk_elements(doc, &ids, &mut pass);
            pass.flush_layer();
        }
    }
}

/// Two distinct chords meeting at one alignment may overlay their unison
/// noteheads instead of being offset.
fn chords_share_noteheads(doc: &Document, a: ElementId, b: ElementId) -> bool {
    if a == b
        || !matches!(doc.kind(a), ElementKind::Chord(_))
        || !matches!(doc.kind(b), ElementKind::Chord(_))
    {
        return false;
    }
    let locs = |chord: ElementId| -> Vec<i32> {
        doc.children(chord)
            .iter()
            .filter_map(|&c| doc.layout(c).drawing_loc)
            .collect()
    };
    count_elements_in_unison(&locs(a), &locs(b), doc.stem_dir(b)) > 0
}

/// Count how many notes of two chords meeting at one alignment can share
/// noteheads. Returns 0 when the chords must be offset instead: a
/// non-shared note adjacent (one step) to any note of the other chord
/// would collide, and non-shared notes must extend beyond the shared run
/// on the stem side only.
pub fn count_elements_in_unison(
    locs_a: &[i32],
    locs_b: &[i32],
    stem_dir: StemDir,
) -> usize {
    let shared: Vec<i32> = locs_a
        .iter()
        .copied()
        .filter(|l| locs_b.contains(l))
        .collect();
    if shared.is_empty() {
        return 0;
    }

    let only_a: Vec<i32> = locs_a
        .iter()
        .copied()
        .filter(|l| !locs_b.contains(l))
        .collect();
    let only_b: Vec<i32> = locs_b
        .iter()
        .copied()
        .filter(|l| !locs_a.contains(l))
        .collect();

    let adjacent = |extras: &[i32], others: &[i32]| {
        extras
            .iter()
            .any(|&e| others.iter().any(|&o| (e - o).abs() == 1))
    };
    if adjacent(&only_a, locs_b) || adjacent(&only_b, locs_a) {
        return 0;
    }

    let shared_min = shared.iter().copied().min().unwrap_or(0);
    let shared_max = shared.iter().copied().max().unwrap_or(0);
    let beyond = |extras: &[i32]| match stem_dir {
        StemDir::Up => extras.iter().all(|&e| e > shared_max),
        StemDir::Down => extras.iter().all(|&e| e < shared_min),
    };
    if !beyond(&only_a) || !beyond(&only_b) {
        return 0;
    }

    shared.len()
}
