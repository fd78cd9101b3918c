//! Horizontal alignment pass.
//!
//! Walks each layer in document order with a running time cursor and
//! assigns every element to a shared [`Alignment`] — one per distinct
//! (time, kind) pair per measure, shared across all staves and layers.
//! A second step, [`space_alignments`], turns the aligned time points into
//! relative X positions: fixed widths for the scoreDef prelude, spacing
//! proportional to elapsed time for content, with per-pair minimums.

use std::collections::BTreeMap;

use num_rational::Ratio;

use crate::duration::{Meter, MusicalTime, NotationType, DUR_MAX};
use crate::functor::{walk_elements, VisitAction, Visitor};
use crate::metrics::{GlyphMetrics, LayoutOptions};
use crate::model::{AlignmentRef, Document, ElementId, ElementKind, GraceRef};

/// What a horizontal time-slice anchors. The order of the variants is the
/// order alignments take within one time value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlignmentKind {
    MeasureStart,
    Clef,
    KeySig,
    MeterSig,
    /// Grace-note cluster preceding the content at the same time.
    Grace,
    Default,
    FullMeasure,
    BarLine,
    MeasureEnd,
}

/// Grace notes of one staff at one alignment, packed left to right in
/// encounter order (the last grace note ends up closest to its host).
#[derive(Debug, Clone, Default)]
pub struct GraceAligner {
    pub entries: Vec<ElementId>,
    /// Accidental space local to this grace cluster.
    pub accid_space: Vec<ElementId>,
    /// Total width, set when alignments are spaced.
    pub width: f64,
}

/// One horizontal time-slice shared by all staves in a measure.
#[derive(Debug, Clone)]
pub struct Alignment {
    pub time: MusicalTime,
    pub kind: AlignmentKind,
    /// X relative to the measure's left edge, set by `space_alignments`.
    pub x_rel: f64,
    /// Per-staff grace aligners (keyed by staff number).
    pub grace: BTreeMap<usize, GraceAligner>,
    /// Accidental space of this time-slice.
    pub accid_space: Vec<ElementId>,
    /// Layer numbers that contributed an element here.
    pub layers: Vec<usize>,
}

impl Alignment {
    fn new(time: MusicalTime, kind: AlignmentKind) -> Self {
        Alignment {
            time,
            kind,
            x_rel: 0.0,
            grace: BTreeMap::new(),
            accid_space: Vec::new(),
            layers: Vec::new(),
        }
    }

    /// More than one layer placed an element at this time-slice.
    pub fn has_multiple_layers(&self) -> bool {
        self.layers.len() > 1
    }

    fn add_layer(&mut self, layer_n: usize) {
        if !self.layers.contains(&layer_n) {
            self.layers.push(layer_n);
        }
    }
}

/// Owns the alignments of one measure. Slots are stable: alignments are
/// only appended while a layout cycle runs, and cleared wholesale when the
/// measure is re-aligned.
#[derive(Debug, Clone, Default)]
pub struct MeasureAligner {
    alignments: Vec<Alignment>,
}

impl MeasureAligner {
    pub fn new() -> Self {
        MeasureAligner::default()
    }

    /// Drop all alignments (measure re-alignment).
    pub fn clear(&mut self) {
        self.alignments.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.alignments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.alignments.len()
    }

    pub fn alignment(&self, index: usize) -> &Alignment {
        &self.alignments[index]
    }

    pub fn alignment_mut(&mut self, index: usize) -> &mut Alignment {
        &mut self.alignments[index]
    }

    pub fn x_rel(&self, index: usize) -> f64 {
        self.alignments[index].x_rel
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alignment> {
        self.alignments.iter()
    }

    /// The alignment for (time, kind), created on demand. Equal time and
    /// kind always resolve to the same slot regardless of which staff or
    /// layer asks — this is the alignment-sharing invariant.
    pub fn get_or_create(&mut self, time: MusicalTime, kind: AlignmentKind) -> usize {
        if let Some(i) = self
            .alignments
            .iter()
            .position(|a| a.time == time && a.kind == kind)
        {
            return i;
        }
        self.alignments.push(Alignment::new(time, kind));
        self.alignments.len() - 1
    }

    /// Slot indices in drawing order: by time, then by kind rank.
    pub fn ordered(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.alignments.len()).collect();
        order.sort_by(|&a, &b| {
            let (aa, ab) = (&self.alignments[a], &self.alignments[b]);
            aa.time.cmp(&ab.time).then(aa.kind.cmp(&ab.kind))
        });
        order
    }

    /// Largest aligned time value.
    pub fn max_time(&self) -> MusicalTime {
        self.alignments
            .iter()
            .map(|a| a.time)
            .max()
            .unwrap_or_else(|| Ratio::from_integer(0))
    }
}

// ── The pass ────────────────────────────────────────────────────────

/// Per-layer horizontal alignment visitor.
struct AlignHorizontally {
    measure: usize,
    staff_n: usize,
    notation: NotationType,
    meter: Meter,
    /// Running time cursor.
    cursor: MusicalTime,
    /// Largest committed alignment time; timestamps may never rewind
    /// behind this.
    committed: MusicalTime,
    /// A content element has been aligned; clefs/keysigs seen after this
    /// are changes, not part of the scoreDef prelude.
    content_seen: bool,
}

impl AlignHorizontally {
    fn new(measure: usize, staff_n: usize, notation: NotationType, meter: Meter) -> Self {
        AlignHorizontally {
            measure,
            staff_n,
            notation,
            meter,
            cursor: Ratio::from_integer(0),
            committed: Ratio::from_integer(0),
            content_seen: false,
        }
    }

    fn align(&mut self, doc: &mut Document, id: ElementId, kind: AlignmentKind) -> usize {
        let layer_n = doc.layout(id).layer_n;
        let aligner = &mut doc.measures[self.measure].aligner;
        let slot = aligner.get_or_create(self.cursor, kind);
        aligner.alignment_mut(slot).add_layer(layer_n);
        doc.layout_mut(id).alignment = Some(AlignmentRef { measure: self.measure, index: slot });
        slot
    }

    fn advance(&mut self, duration: MusicalTime) {
        self.cursor += duration;
        if self.cursor > self.committed {
            self.committed = self.cursor;
        }
    }

    /// Defer a grace note/chord to the grace aligner of the upcoming
    /// time-slice instead of the main timeline.
    fn align_grace(&mut self, doc: &mut Document, id: ElementId) {
        let layer_n = doc.layout(id).layer_n;
        let measure = self.measure;
        let staff_n = self.staff_n;
        let aligner = &mut doc.measures[measure].aligner;
        let slot = aligner.get_or_create(self.cursor, AlignmentKind::Grace);
        let alignment = aligner.alignment_mut(slot);
        alignment.add_layer(layer_n);
        let grace = alignment.grace.entry(staff_n).or_default();
        grace.entries.push(id);
        let grace_slot = grace.entries.len() - 1;
        let layout = doc.layout_mut(id);
        layout.alignment = Some(AlignmentRef { measure, index: slot });
        layout.grace_alignment = Some(GraceRef {
            measure,
            alignment: slot,
            staff_n,
            slot: grace_slot,
        });
    }
}

impl Visitor for AlignHorizontally {
    fn element(&mut self, doc: &mut Document, id: ElementId) -> VisitAction {
        // Children of a chord (and attachments of a note) share the
        // parent's alignment rather than creating their own.
        if let Some(parent) = doc.parent(id) {
            let share_parent = match doc.kind(id) {
                ElementKind::Note(_) => {
                    matches!(doc.kind(parent), ElementKind::Chord(_))
                }
                ElementKind::Accid(_)
                | ElementKind::Dot
                | ElementKind::Verse
                | ElementKind::Artic => true,
                _ => false,
            };
            if share_parent {
                let inherited = doc.layout(parent).alignment;
                let grace = doc.layout(parent).grace_alignment;
                let layout = doc.layout_mut(id);
                layout.alignment = inherited;
                layout.grace_alignment = grace;
                return VisitAction::Continue;
            }
        }

        match doc.kind(id).clone() {
            kind if kind.is_container() => VisitAction::Continue,
            ElementKind::Clef(_) => {
                doc.layout_mut(id).scoredef_role = !self.content_seen;
                self.align(doc, id, AlignmentKind::Clef);
                VisitAction::Continue
            }
            ElementKind::KeySig { .. } => {
                doc.layout_mut(id).scoredef_role = !self.content_seen;
                self.align(doc, id, AlignmentKind::KeySig);
                VisitAction::Continue
            }
            ElementKind::MeterSig(_) => {
                doc.layout_mut(id).scoredef_role = !self.content_seen;
                self.align(doc, id, AlignmentKind::MeterSig);
                VisitAction::Continue
            }
            ElementKind::BarLine => {
                self.align(doc, id, AlignmentKind::BarLine);
                VisitAction::Continue
            }
            ElementKind::Timestamp(ts) => {
                // Timestamp elements set the cursor; they never rewind it
                // behind an already committed alignment.
                let beat = self.meter.beat_time();
                let target = (ts.beat - Ratio::from_integer(1)) * beat;
                let target = if target < Ratio::from_integer(0) {
                    log::warn!("timestamp before beat 1, clamped to the measure start");
                    Ratio::from_integer(0)
                } else {
                    target
                };
                if target < self.committed {
                    log::warn!("timestamp rewinds behind committed time, clamped");
                    self.cursor = self.committed;
                } else {
                    self.cursor = target;
                }
                self.content_seen = true;
                self.align(doc, id, AlignmentKind::Default);
                VisitAction::Continue
            }
            kind if kind.is_full_measure() => {
                self.content_seen = true;
                let duration = doc.alignment_duration(id, &self.meter, self.notation);
                self.align(doc, id, AlignmentKind::FullMeasure);
                self.advance(duration);
                VisitAction::Continue
            }
            ElementKind::Note(_) | ElementKind::Chord(_) => {
                self.content_seen = true;
                if doc.is_grace(id) {
                    self.align_grace(doc, id);
                    // Chord children still need the shared anchor.
                    return VisitAction::Continue;
                }
                let duration = doc.alignment_duration(id, &self.meter, self.notation);
                self.align(doc, id, AlignmentKind::Default);
                self.advance(duration);
                VisitAction::Continue
            }
            ElementKind::Rest(_)
            | ElementKind::Space(_)
            | ElementKind::Nc(_) => {
                self.content_seen = true;
                let duration = doc.alignment_duration(id, &self.meter, self.notation);
                self.align(doc, id, AlignmentKind::Default);
                self.advance(duration);
                VisitAction::Continue
            }
            ElementKind::Custos(_) => {
                self.content_seen = true;
                self.align(doc, id, AlignmentKind::Default);
                VisitAction::Continue
            }
            _ => VisitAction::Continue,
        }
    }
}

/// Run the horizontal alignment pass over one measure. Any previous
/// alignment state of the measure is discarded first, so re-running on an
/// unchanged graph reproduces identical assignments.
pub fn run_horizontal(doc: &mut Document, measure: usize) {
    reset_horizontal(doc, measure);

    let meter = doc.measures[measure].meter;
    let mut end_time = Ratio::from_integer(0);
    let staff_count = doc.measures[measure].staves.len();
    for staff_idx in 0..staff_count {
        let staff_n = doc.measures[measure].staves[staff_idx].n;
        let notation = doc.measures[measure].staves[staff_idx].notation;
        let layer_count = doc.measures[measure].staves[staff_idx].layers.len();
        for layer_idx in 0..layer_count {
            let ids = doc.measures[measure].staves[staff_idx].layers[layer_idx]
                .elements
                .clone();
            let mut pass = AlignHorizontally::new(measure, staff_n, notation, meter);
            walk_elements(doc, &ids, &mut pass);
            end_time = end_time.max(pass.cursor);
        }
    }

    // Every measure carries start and end anchors. The end sits at the
    // latest layer cursor, so a lone full-measure rest still spans the
    // whole measure.
    let end_time = end_time.max(doc.measures[measure].aligner.max_time());
    let aligner = &mut doc.measures[measure].aligner;
    aligner.get_or_create(Ratio::from_integer(0), AlignmentKind::MeasureStart);
    aligner.get_or_create(end_time, AlignmentKind::MeasureEnd);
}

/// Collect every element reachable from the measure's layers.
pub(crate) fn measure_elements(doc: &Document, measure: usize) -> Vec<ElementId> {
    fn collect(doc: &Document, id: ElementId, out: &mut Vec<ElementId>) {
        out.push(id);
        for &c in doc.children(id) {
            collect(doc, c, out);
        }
    }
    let mut out = Vec::new();
    for staff in &doc.measures[measure].staves {
        for layer in &staff.layers {
            for &id in &layer.elements {
                collect(doc, id, &mut out);
            }
        }
    }
    out
}

/// Drop the measure's alignments and clear per-element horizontal state.
pub fn reset_horizontal(doc: &mut Document, measure: usize) {
    doc.measures[measure].aligner.clear();
    for id in measure_elements(doc, measure) {
        let layout = doc.layout_mut(id);
        layout.alignment = None;
        layout.grace_alignment = None;
        layout.x_rel = 0.0;
        layout.cached_x = None;
    }
}

// ── Spacing ─────────────────────────────────────────────────────────

fn quarters(t: MusicalTime) -> f64 {
    let q = t / Ratio::from_integer(DUR_MAX / 4);
    *q.numer() as f64 / *q.denom() as f64
}

/// Fixed width of non-content alignment kinds.
fn prelude_width(kind: AlignmentKind, options: &LayoutOptions) -> f64 {
    match kind {
        AlignmentKind::MeasureStart => options.measure_left_pad,
        AlignmentKind::Clef => options.clef_space,
        AlignmentKind::KeySig => 2.0 * options.keysig_accid_space,
        AlignmentKind::MeterSig => options.metersig_space,
        AlignmentKind::BarLine => options.barline_space,
        _ => 0.0,
    }
}

/// Assign `x_rel` to every alignment of a measure, left to right, and set
/// the measure width. Content alignments are spaced proportionally to
/// elapsed time with a per-pair minimum; grace clusters reserve their
/// packed width just before the time-slice they precede.
pub fn space_alignments(
    doc: &mut Document,
    measure: usize,
    options: &LayoutOptions,
    metrics: &dyn GlyphMetrics,
) {
    let order = doc.measures[measure].aligner.ordered();

    // Pack grace aligners first: entries run left to right, each advancing
    // by its scaled notehead width plus a small gap.
    for &slot in &order {
        let grace_staves: Vec<usize> = doc.measures[measure].aligner.alignment(slot)
            .grace
            .keys()
            .copied()
            .collect();
        for staff_n in grace_staves {
            let entries = doc.measures[measure].aligner.alignment(slot).grace[&staff_n]
                .entries
                .clone();
            let mut x = 0.0;
            for &id in &entries {
                let radius = doc.drawing_radius(id, options, metrics, false);
                doc.layout_mut(id).x_rel = x + radius;
                x += 2.0 * radius + options.stem_width;
            }
            let aligner = &mut doc.measures[measure].aligner;
            if let Some(g) = aligner.alignment_mut(slot).grace.get_mut(&staff_n) {
                g.width = x;
            }
        }
    }

    let mut x = 0.0;
    let mut prev_content_time: Option<MusicalTime> = None;
    for &slot in &order {
        let (kind, time, grace_width) = {
            let a = doc.measures[measure].aligner.alignment(slot);
            let gw = a
                .grace
                .values()
                .map(|g| g.width)
                .fold(0.0f64, f64::max);
            (a.kind, a.time, gw)
        };
        match kind {
            AlignmentKind::Default | AlignmentKind::FullMeasure => {
                if let Some(prev) = prev_content_time {
                    let dt = quarters(time - prev);
                    let step = (dt * options.spacing_per_quarter).max(options.min_note_spacing);
                    x += step;
                }
                prev_content_time = Some(time);
            }
            AlignmentKind::Grace => {
                // The cluster sits just before its host time-slice; the
                // host pair minimum below still applies from here.
                x += options.min_note_spacing / 2.0;
            }
            AlignmentKind::MeasureEnd => {
                x += options.measure_right_pad;
            }
            other => {
                x += prelude_width(other, options);
            }
        }
        doc.measures[measure].aligner.alignment_mut(slot).x_rel = x;
        if kind == AlignmentKind::Grace {
            x += grace_width;
        }
    }

    doc.measures[measure].width = x;
}
