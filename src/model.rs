//! Element graph for a laid-out score.
//!
//! The graph is arena-based: every layer element lives in a central table
//! owned by [`Document`] and is referred to by [`ElementId`] handles.
//! Cross-staff and grace relationships are stored as indices, never as
//! pointers into sibling subtrees, so rebuilding a measure between layout
//! passes cannot leave dangling references.
//!
//! Hierarchy: Document → Measure → Staff → Layer → layer elements.
//! Container elements (chord, beam, tuplet, ligature, neume, …) own child
//! element ids; a layer lists only top-level ids.

use crate::duration::{nc_duration, DurationLog, Meter, MusicalTime, NotationType};
use crate::error::GraphError;
use crate::layout::horizontal::MeasureAligner;
use crate::metrics::{self, GlyphMetrics, LayoutOptions};
use crate::pitch::{AccidKind, Clef, Pitch};
use num_rational::Ratio;

/// Handle into the document's element table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) usize);

impl ElementId {
    /// Raw arena index, stable for the lifetime of the document.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to an alignment: measure index plus slot in that measure's
/// aligner. Slots are stable — the aligner never removes alignments while
/// a layout cycle is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentRef {
    pub measure: usize,
    pub index: usize,
}

/// Membership of a grace note in a grace aligner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraceRef {
    pub measure: usize,
    pub alignment: usize,
    pub staff_n: usize,
    pub slot: usize,
}

/// Stem direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StemDir {
    Up,
    Down,
}

/// Grace note kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraceKind {
    Unaccented,
    Accented,
}

/// Explicit ligature form on a note (`@lig`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LigForm {
    Recta,
    Obliqua,
}

/// Tilt of a neume component (`@tilt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tilt {
    North,
    South,
}

/// Curve of a liquescent neume component (`@curve`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NcCurve {
    Anticlockwise,
    Clockwise,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub pitch: Pitch,
    pub duration: DurationLog,
    pub grace: Option<GraceKind>,
    pub stem_dir: Option<StemDir>,
    /// Explicit ligature form; wins over the automatic shape rules.
    pub lig: Option<LigForm>,
}

impl Note {
    pub fn new(pitch: Pitch, duration: DurationLog) -> Self {
        Note { pitch, duration, grace: None, stem_dir: None, lig: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rest {
    pub duration: DurationLog,
    /// Explicit staff location override (`@loc`).
    pub loc: Option<i32>,
}

impl Rest {
    pub fn new(duration: DurationLog) -> Self {
        Rest { duration, loc: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chord {
    pub duration: DurationLog,
    pub grace: Option<GraceKind>,
    pub stem_dir: Option<StemDir>,
}

impl Chord {
    pub fn new(duration: DurationLog) -> Self {
        Chord { duration, grace: None, stem_dir: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accid {
    pub kind: AccidKind,
    /// Drawn inside parentheses (editorial/cautionary).
    pub enclosed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuplet {
    pub num: i64,
    pub numbase: i64,
}

/// Measured tremolo — the written duration of its content is halved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FTrem {
    pub beams: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Custos {
    pub pitch: Option<Pitch>,
}

/// Neume component.
#[derive(Debug, Clone, PartialEq)]
pub struct Nc {
    pub pitch: Pitch,
    pub tilt: Option<Tilt>,
    pub curve: Option<NcCurve>,
    pub ligated: bool,
    pub liquescent: bool,
    pub oriscus: bool,
    pub quilisma: bool,
}

impl Nc {
    pub fn new(pitch: Pitch) -> Self {
        Nc {
            pitch,
            tilt: None,
            curve: None,
            ligated: false,
            liquescent: false,
            oriscus: false,
            quilisma: false,
        }
    }
}

/// Timestamp-positioned element: sets the layer cursor to an encoded beat
/// position (1-based, in meter beat units) instead of advancing it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timestamp {
    pub beat: MusicalTime,
}

/// The concrete kinds a layer element can take. Capabilities (duration,
/// pitch, position) are resolved by matching on this tag — no RTTI.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Note(Note),
    Rest(Rest),
    /// Whole-measure rest.
    MRest,
    /// Whole-measure repeat.
    MRpt,
    /// Half-measure repeat.
    MRpt2,
    Chord(Chord),
    Accid(Accid),
    Clef(Clef),
    KeySig { fifths: i32 },
    MeterSig(Meter),
    Dot,
    Custos(Custos),
    Space(DurationLog),
    Beam,
    Tuplet(Tuplet),
    FTrem(FTrem),
    Ligature,
    Neume,
    Nc(Nc),
    Verse,
    Artic,
    BarLine,
    Timestamp(Timestamp),
}

impl ElementKind {
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Note(_) => "note",
            ElementKind::Rest(_) => "rest",
            ElementKind::MRest => "mRest",
            ElementKind::MRpt => "mRpt",
            ElementKind::MRpt2 => "mRpt2",
            ElementKind::Chord(_) => "chord",
            ElementKind::Accid(_) => "accid",
            ElementKind::Clef(_) => "clef",
            ElementKind::KeySig { .. } => "keySig",
            ElementKind::MeterSig(_) => "meterSig",
            ElementKind::Dot => "dot",
            ElementKind::Custos(_) => "custos",
            ElementKind::Space(_) => "space",
            ElementKind::Beam => "beam",
            ElementKind::Tuplet(_) => "tuplet",
            ElementKind::FTrem(_) => "fTrem",
            ElementKind::Ligature => "ligature",
            ElementKind::Neume => "neume",
            ElementKind::Nc(_) => "nc",
            ElementKind::Verse => "verse",
            ElementKind::Artic => "artic",
            ElementKind::BarLine => "barLine",
            ElementKind::Timestamp(_) => "timestamp",
        }
    }

    /// Kinds that group other elements rather than occupying time
    /// themselves.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ElementKind::Beam
                | ElementKind::Tuplet(_)
                | ElementKind::FTrem(_)
                | ElementKind::Ligature
                | ElementKind::Neume
        )
    }

    /// Kinds occupying the whole (or half the) measure regardless of any
    /// nominal duration.
    pub fn is_full_measure(&self) -> bool {
        matches!(self, ElementKind::MRest | ElementKind::MRpt | ElementKind::MRpt2)
    }
}

// ── Ligature drawing shapes ─────────────────────────────────────────

/// Bit flags describing how a note inside a mensural ligature is drawn.
/// Recomputed every layout pass; never persisted.
pub mod lig_shape {
    pub const DEFAULT: u8 = 0;
    pub const STEM_LEFT_UP: u8 = 1;
    pub const STEM_LEFT_DOWN: u8 = 1 << 1;
    pub const STEM_RIGHT_UP: u8 = 1 << 2;
    pub const STEM_RIGHT_DOWN: u8 = 1 << 3;
    pub const OBLIQUE: u8 = 1 << 4;
    pub const STACKED: u8 = 1 << 5;
}

// ── Per-element layout state ────────────────────────────────────────

/// Mutable layout state carried by every element. All "not computed yet"
/// states are explicit `Option`s, not sentinel integers.
#[derive(Debug, Clone, Default)]
pub struct LayoutState {
    /// Alignment anchoring the horizontal position.
    pub alignment: Option<AlignmentRef>,
    /// Grace-aligner membership, for grace notes and their attachments.
    pub grace_alignment: Option<GraceRef>,
    /// Absolute X from a transcription facsimile; overrides derivation.
    pub x_abs: Option<f64>,
    /// X relative to the alignment.
    pub x_rel: f64,
    /// Y relative to the staff middle line (positive up).
    pub y_rel: f64,
    /// Staff-line location (0 = middle line); meaningful only after the
    /// vertical pass has run.
    pub drawing_loc: Option<i32>,
    /// Staff number this element is drawn on when it differs from its own.
    pub cross_staff: Option<usize>,
    /// Layer number, used for cross-staff sorting and accidental ties.
    pub layer_n: usize,
    /// Element belongs to the measure's scoreDef prelude (clef, key
    /// signature, meter signature at the front of the measure).
    pub scoredef_role: bool,
    /// Memoized absolute coordinates; cleared by the invalidation pass.
    pub cached_x: Option<f64>,
    pub cached_y: Option<f64>,
    /// Ligature drawing shape flags (notes inside a ligature only).
    pub lig_shape: u8,
    /// Chosen SMuFL glyphs for a neume component.
    pub nc_glyphs: Vec<u32>,
}

/// One element in the arena.
#[derive(Debug, Clone)]
pub struct Element {
    pub kind: ElementKind,
    pub children: Vec<ElementId>,
    pub parent: Option<ElementId>,
    pub layout: LayoutState,
}

// ── Tree containers ─────────────────────────────────────────────────

/// One voice within a staff.
#[derive(Debug, Clone)]
pub struct Layer {
    pub n: usize,
    pub elements: Vec<ElementId>,
}

/// One staff of a measure.
#[derive(Debug, Clone)]
pub struct Staff {
    /// Staff number (1-based, unique within the measure).
    pub n: usize,
    pub clef: Clef,
    pub notation: NotationType,
    /// Scale factor (1.0 = full size).
    pub size: f64,
    pub layers: Vec<Layer>,
}

/// One measure: staves plus the per-measure aligner.
#[derive(Debug, Clone)]
pub struct Measure {
    pub meter: Meter,
    pub staves: Vec<Staff>,
    pub aligner: MeasureAligner,
    /// Left edge of the measure, set when positions are cached.
    pub x: f64,
    /// Total width, derived from the spaced alignments.
    pub width: f64,
}

/// The whole element graph.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub measures: Vec<Measure>,
    elements: Vec<Element>,
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    // ── Builder API ─────────────────────────────────────────────────

    pub fn add_measure(&mut self, meter: Meter) -> usize {
        self.measures.push(Measure {
            meter,
            staves: Vec::new(),
            aligner: MeasureAligner::new(),
            x: 0.0,
            width: 0.0,
        });
        self.measures.len() - 1
    }

    pub fn add_staff(&mut self, measure: usize, n: usize, clef: Clef) -> Result<usize, GraphError> {
        let m = self
            .measures
            .get_mut(measure)
            .ok_or(GraphError::NoSuchMeasure(measure))?;
        m.staves.push(Staff {
            n,
            clef,
            notation: NotationType::Cmn,
            size: 1.0,
            layers: Vec::new(),
        });
        Ok(m.staves.len() - 1)
    }

    pub fn add_layer(
        &mut self,
        measure: usize,
        staff: usize,
        n: usize,
    ) -> Result<usize, GraphError> {
        let m = self
            .measures
            .get_mut(measure)
            .ok_or(GraphError::NoSuchMeasure(measure))?;
        let s = m
            .staves
            .get_mut(staff)
            .ok_or(GraphError::NoSuchStaff { measure, staff })?;
        s.layers.push(Layer { n, elements: Vec::new() });
        Ok(s.layers.len() - 1)
    }

    fn new_element(&mut self, kind: ElementKind, layer_n: usize) -> ElementId {
        self.elements.push(Element {
            kind,
            children: Vec::new(),
            parent: None,
            layout: LayoutState { layer_n, ..LayoutState::default() },
        });
        ElementId(self.elements.len() - 1)
    }

    /// Append a top-level element to a layer.
    pub fn insert(
        &mut self,
        measure: usize,
        staff: usize,
        layer: usize,
        kind: ElementKind,
    ) -> Result<ElementId, GraphError> {
        let layer_n = {
            let m = self
                .measures
                .get(measure)
                .ok_or(GraphError::NoSuchMeasure(measure))?;
            let s = m
                .staves
                .get(staff)
                .ok_or(GraphError::NoSuchStaff { measure, staff })?;
            let l = s
                .layers
                .get(layer)
                .ok_or(GraphError::NoSuchLayer { measure, staff, layer })?;
            l.n
        };
        let id = self.new_element(kind, layer_n);
        self.measures[measure].staves[staff].layers[layer]
            .elements
            .push(id);
        Ok(id)
    }

    /// Append a child element to a container (chord note, beam content,
    /// accidental or dot on a note, …).
    pub fn append_child(
        &mut self,
        parent: ElementId,
        kind: ElementKind,
    ) -> Result<ElementId, GraphError> {
        let parent_el = &self.elements[parent.0];
        if !child_allowed(&parent_el.kind, &kind) {
            return Err(GraphError::InvalidChild {
                parent: parent_el.kind.name(),
                child: kind.name(),
            });
        }
        let layer_n = parent_el.layout.layer_n;
        let id = self.new_element(kind, layer_n);
        self.elements[id.0].parent = Some(parent);
        self.elements[parent.0].children.push(id);
        Ok(id)
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn element(&self, id: ElementId) -> &Element {
        &self.elements[id.0]
    }

    pub fn element_mut(&mut self, id: ElementId) -> &mut Element {
        &mut self.elements[id.0]
    }

    pub fn kind(&self, id: ElementId) -> &ElementKind {
        &self.elements[id.0].kind
    }

    pub fn layout(&self, id: ElementId) -> &LayoutState {
        &self.elements[id.0].layout
    }

    pub fn layout_mut(&mut self, id: ElementId) -> &mut LayoutState {
        &mut self.elements[id.0].layout
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        &self.elements[id.0].children
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.elements[id.0].parent
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// All element ids, in creation order.
    pub fn ids(&self) -> impl Iterator<Item = ElementId> {
        (0..self.elements.len()).map(ElementId)
    }

    /// Walk the parent chain, nearest first.
    pub fn ancestors(&self, id: ElementId) -> AncestorIter<'_> {
        AncestorIter { doc: self, next: self.elements[id.0].parent }
    }

    pub fn first_ancestor<F>(&self, id: ElementId, pred: F) -> Option<ElementId>
    where
        F: Fn(&ElementKind) -> bool,
    {
        self.ancestors(id).find(|&a| pred(&self.elements[a.0].kind))
    }

    // ── Capability accessors ────────────────────────────────────────

    /// Written duration, if this kind carries one.
    pub fn duration_of(&self, id: ElementId) -> Option<DurationLog> {
        match &self.elements[id.0].kind {
            ElementKind::Note(n) => Some(n.duration),
            ElementKind::Rest(r) => Some(r.duration),
            ElementKind::Chord(c) => Some(c.duration),
            ElementKind::Space(d) => Some(*d),
            _ => None,
        }
    }

    /// Pitch, if this kind carries one.
    pub fn pitch_of(&self, id: ElementId) -> Option<Pitch> {
        match &self.elements[id.0].kind {
            ElementKind::Note(n) => Some(n.pitch),
            ElementKind::Nc(nc) => Some(nc.pitch),
            ElementKind::Custos(c) => c.pitch,
            _ => None,
        }
    }

    /// Whether the vertical pass assigns this kind a staff location.
    pub fn has_position(&self, id: ElementId) -> bool {
        matches!(
            self.elements[id.0].kind,
            ElementKind::Note(_)
                | ElementKind::Rest(_)
                | ElementKind::MRest
                | ElementKind::Chord(_)
                | ElementKind::Accid(_)
                | ElementKind::Clef(_)
                | ElementKind::Dot
                | ElementKind::Custos(_)
                | ElementKind::Nc(_)
                | ElementKind::Neume
        )
    }

    /// An element is grace-sized if it, or any ancestor note or chord,
    /// carries the grace flag. Attachments (accidentals, dots) inherit it
    /// from their host.
    pub fn is_grace(&self, id: ElementId) -> bool {
        let grace_flag = |kind: &ElementKind| match kind {
            ElementKind::Note(n) => n.grace.is_some(),
            ElementKind::Chord(c) => c.grace.is_some(),
            _ => false,
        };
        if grace_flag(&self.elements[id.0].kind) {
            return true;
        }
        self.ancestors(id).any(|a| grace_flag(&self.elements[a.0].kind))
    }

    /// Product of all ancestor tuplet ratios as (num, numbase).
    pub fn tuplet_ratio(&self, id: ElementId) -> (i64, i64) {
        let mut num = 1i64;
        let mut numbase = 1i64;
        for a in self.ancestors(id) {
            if let ElementKind::Tuplet(t) = &self.elements[a.0].kind {
                num *= if t.num == 0 { 1 } else { t.num };
                numbase *= if t.numbase == 0 { 1 } else { t.numbase };
            }
        }
        (num, numbase)
    }

    fn in_ftrem(&self, id: ElementId) -> bool {
        self.ancestors(id)
            .any(|a| matches!(self.elements[a.0].kind, ElementKind::FTrem(_)))
    }

    /// Duration the horizontal pass charges to the time cursor for this
    /// element.
    pub fn alignment_duration(
        &self,
        id: ElementId,
        meter: &Meter,
        notation: NotationType,
    ) -> MusicalTime {
        match &self.elements[id.0].kind {
            ElementKind::MRest | ElementKind::MRpt => meter.measure_time(),
            ElementKind::MRpt2 => meter.measure_time() / Ratio::from_integer(2),
            ElementKind::Nc(_) => {
                let last = self
                    .parent(id)
                    .and_then(|p| self.children(p).last().copied())
                    .map_or(true, |l| l == id);
                nc_duration(last)
            }
            ElementKind::Note(_)
            | ElementKind::Rest(_)
            | ElementKind::Chord(_)
            | ElementKind::Space(_) => {
                let nominal = self
                    .duration_of(id)
                    .unwrap_or_default()
                    .nominal(notation);
                let halved = if self.in_ftrem(id) {
                    nominal / Ratio::from_integer(2)
                } else {
                    nominal
                };
                let (num, numbase) = self.tuplet_ratio(id);
                crate::duration::apply_tuplet(halved, num, numbase)
            }
            _ => Ratio::from_integer(0),
        }
    }

    // ── Drawing coordinates (renderer-facing) ───────────────────────

    /// Absolute X. Derived from measure position + alignment + element
    /// offset unless a transcription facsimile supplies an absolute X.
    /// Returns the memoized value when the cache pass has run.
    pub fn drawing_x(&self, id: ElementId) -> f64 {
        let layout = &self.elements[id.0].layout;
        if let Some(x) = layout.x_abs {
            return x;
        }
        if let Some(x) = layout.cached_x {
            return x;
        }
        self.derive_x(id)
    }

    pub(crate) fn derive_x(&self, id: ElementId) -> f64 {
        let layout = &self.elements[id.0].layout;
        let align_x = layout
            .alignment
            .map(|r| {
                self.measures[r.measure].x + self.measures[r.measure].aligner.x_rel(r.index)
            })
            .or_else(|| {
                // Attachments without their own alignment anchor on the
                // nearest aligned ancestor.
                self.ancestors(id).find_map(|a| {
                    self.elements[a.0].layout.alignment.map(|r| {
                        self.measures[r.measure].x
                            + self.measures[r.measure].aligner.x_rel(r.index)
                    })
                })
            })
            .unwrap_or(0.0);
        // Container offsets (chord shifts, ligature packing) carry down to
        // their members.
        let ancestor_x: f64 = self
            .ancestors(id)
            .map(|a| self.elements[a.0].layout.x_rel)
            .sum();
        align_x + ancestor_x + layout.x_rel
    }

    /// Absolute Y (positive down, page coordinates). Staves are stacked
    /// top to bottom in staff order.
    pub fn drawing_y(&self, id: ElementId, options: &LayoutOptions) -> f64 {
        let layout = &self.elements[id.0].layout;
        if let Some(y) = layout.cached_y {
            return y;
        }
        self.derive_y(id, options)
    }

    pub(crate) fn derive_y(&self, id: ElementId, options: &LayoutOptions) -> f64 {
        let layout = &self.elements[id.0].layout;
        let (measure, staff_idx) = match self.home_staff(id) {
            Some(pair) => pair,
            None => return -layout.y_rel,
        };
        let staff_idx = layout
            .cross_staff
            .and_then(|n| self.staff_index_by_n(measure, n))
            .unwrap_or(staff_idx);
        let middle = self.staff_middle_y(staff_idx, options);
        middle - layout.y_rel
    }

    /// Page Y of a staff's middle line.
    pub fn staff_middle_y(&self, staff_idx: usize, options: &LayoutOptions) -> f64 {
        let staff_height = 4.0 * options.staff_space;
        staff_idx as f64 * (staff_height + options.staff_gap) + staff_height / 2.0
    }

    /// (measure index, staff index) owning this element.
    pub fn home_staff(&self, id: ElementId) -> Option<(usize, usize)> {
        let mut top = id;
        while let Some(p) = self.elements[top.0].parent {
            top = p;
        }
        for (mi, m) in self.measures.iter().enumerate() {
            for (si, s) in m.staves.iter().enumerate() {
                for l in &s.layers {
                    if l.elements.contains(&top) {
                        return Some((mi, si));
                    }
                }
            }
        }
        None
    }

    pub fn staff_index_by_n(&self, measure: usize, n: usize) -> Option<usize> {
        self.measures
            .get(measure)?
            .staves
            .iter()
            .position(|s| s.n == n)
    }

    /// Notehead half-width. Ligature members use the square breve glyph.
    pub fn drawing_radius(
        &self,
        id: ElementId,
        options: &LayoutOptions,
        metrics: &dyn GlyphMetrics,
        in_ligature: bool,
    ) -> f64 {
        let dur = self.duration_of(id).and_then(|d| d.dur);
        let glyph = if in_ligature {
            metrics::NOTEHEAD_BREVE_SQUARE
        } else {
            match dur {
                Some(crate::duration::Dur::Maxima) | Some(crate::duration::Dur::Long) => {
                    metrics::NOTEHEAD_DOUBLE_WHOLE
                }
                Some(crate::duration::Dur::Breve) => metrics::NOTEHEAD_BREVE_SQUARE,
                Some(crate::duration::Dur::Whole) => metrics::NOTEHEAD_WHOLE,
                Some(crate::duration::Dur::Half) => metrics::NOTEHEAD_HALF,
                _ => metrics::NOTEHEAD_BLACK,
            }
        };
        let size = if self.is_grace(id) { options.grace_factor } else { 1.0 };
        metrics.glyph_width(glyph, size) / 2.0
    }

    /// Resolved stem direction for a note or chord.
    pub fn stem_dir(&self, id: ElementId) -> StemDir {
        let explicit = match &self.elements[id.0].kind {
            ElementKind::Note(n) => n.stem_dir,
            ElementKind::Chord(c) => c.stem_dir,
            _ => None,
        };
        if let Some(d) = explicit {
            return d;
        }
        // Notes on or above the middle line stem down.
        let loc = self.elements[id.0].layout.drawing_loc.unwrap_or(0);
        if loc >= 0 {
            StemDir::Down
        } else {
            StemDir::Up
        }
    }

    /// Top extent in page coordinates, including the stem and optionally
    /// articulations.
    pub fn drawing_top(&self, id: ElementId, options: &LayoutOptions, with_artic: bool) -> f64 {
        let y = self.drawing_y(id, options);
        let stem_len = 3.0 * options.staff_space;
        let mut top = match self.stem_dir(id) {
            StemDir::Up => y - stem_len,
            StemDir::Down => y - options.unit(),
        };
        if with_artic && self.has_artic(id) {
            top -= 1.5 * options.unit();
        }
        top
    }

    /// Bottom extent in page coordinates.
    pub fn drawing_bottom(&self, id: ElementId, options: &LayoutOptions, with_artic: bool) -> f64 {
        let y = self.drawing_y(id, options);
        let stem_len = 3.0 * options.staff_space;
        let mut bottom = match self.stem_dir(id) {
            StemDir::Up => y + options.unit(),
            StemDir::Down => y + stem_len,
        };
        if with_artic && self.has_artic(id) {
            bottom += 1.5 * options.unit();
        }
        bottom
    }

    fn has_artic(&self, id: ElementId) -> bool {
        self.elements[id.0]
            .children
            .iter()
            .any(|&c| matches!(self.elements[c.0].kind, ElementKind::Artic))
    }

    /// Clear all memoized drawing coordinates. Runs once per layout cycle
    /// before the passes; stale caches are impossible by construction.
    pub fn reset_drawing(&mut self) {
        for el in &mut self.elements {
            el.layout.cached_x = None;
            el.layout.cached_y = None;
        }
    }
}

pub struct AncestorIter<'a> {
    doc: &'a Document,
    next: Option<ElementId>,
}

impl Iterator for AncestorIter<'_> {
    type Item = ElementId;

    fn next(&mut self) -> Option<ElementId> {
        let current = self.next?;
        self.next = self.doc.elements[current.0].parent;
        Some(current)
    }
}

/// Parent/child legality table for the builder.
fn child_allowed(parent: &ElementKind, child: &ElementKind) -> bool {
    match parent {
        ElementKind::Note(_) => matches!(
            child,
            ElementKind::Accid(_) | ElementKind::Dot | ElementKind::Verse | ElementKind::Artic
        ),
        ElementKind::Rest(_) => matches!(child, ElementKind::Dot),
        ElementKind::Chord(_) => matches!(
            child,
            ElementKind::Note(_) | ElementKind::Artic | ElementKind::Verse
        ),
        ElementKind::Beam => matches!(
            child,
            ElementKind::Note(_)
                | ElementKind::Chord(_)
                | ElementKind::Rest(_)
                | ElementKind::Tuplet(_)
                | ElementKind::Space(_)
                | ElementKind::Clef(_)
        ),
        ElementKind::Tuplet(_) => matches!(
            child,
            ElementKind::Note(_)
                | ElementKind::Chord(_)
                | ElementKind::Rest(_)
                | ElementKind::Beam
                | ElementKind::Space(_)
        ),
        ElementKind::FTrem(_) => {
            matches!(child, ElementKind::Note(_) | ElementKind::Chord(_))
        }
        ElementKind::Ligature => matches!(child, ElementKind::Note(_)),
        ElementKind::Neume => matches!(child, ElementKind::Nc(_)),
        _ => false,
    }
}
