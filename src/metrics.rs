//! Glyph metrics and layout options (all distances in SVG user units).
//!
//! The engine never computes glyph geometry itself: it asks a
//! [`GlyphMetrics`] provider for widths and heights by SMuFL code. The
//! built-in [`StaffMetrics`] table is good enough for spacing math and for
//! tests; an embedder with a real font can supply its own provider.

// ── SMuFL codes used by the engine ──────────────────────────────────

pub const NOTEHEAD_DOUBLE_WHOLE: u32 = 0xE0A0;
pub const NOTEHEAD_BREVE_SQUARE: u32 = 0xE0A1;
pub const NOTEHEAD_WHOLE: u32 = 0xE0A2;
pub const NOTEHEAD_HALF: u32 = 0xE0A3;
pub const NOTEHEAD_BLACK: u32 = 0xE0A4;

pub const ACCID_FLAT: u32 = 0xE260;
pub const ACCID_NATURAL: u32 = 0xE261;
pub const ACCID_SHARP: u32 = 0xE262;
pub const ACCID_DOUBLE_SHARP: u32 = 0xE263;
pub const ACCID_DOUBLE_FLAT: u32 = 0xE264;
pub const ACCID_PARENS_LEFT: u32 = 0xE26A;
pub const ACCID_PARENS_RIGHT: u32 = 0xE26B;

// Chant (neume) glyphs.
pub const CHANT_PUNCTUM: u32 = 0xE990;
pub const CHANT_PUNCTUM_INCLINATUM: u32 = 0xE991;
pub const CHANT_AUCTUM_ASC: u32 = 0xE994;
pub const CHANT_AUCTUM_DESC: u32 = 0xE995;
pub const CHANT_PUNCTUM_VIRGA: u32 = 0xE996;
pub const CHANT_QUILISMA: u32 = 0xE99B;
pub const CHANT_ORISCUS: u32 = 0xE99C;
// Two-component sub-ligature entry glyphs, by descending interval.
pub const CHANT_ENTRY_LINE_2ND: u32 = 0xE9B4;
pub const CHANT_ENTRY_LINE_3RD: u32 = 0xE9B5;
pub const CHANT_ENTRY_LINE_4TH: u32 = 0xE9B6;
pub const CHANT_ENTRY_LINE_5TH: u32 = 0xE9B7;
pub const CHANT_LIGATURA_DESC_2ND: u32 = 0xE9B9;
pub const CHANT_LIGATURA_DESC_3RD: u32 = 0xE9BA;
pub const CHANT_LIGATURA_DESC_4TH: u32 = 0xE9BB;
pub const CHANT_LIGATURA_DESC_5TH: u32 = 0xE9BC;
pub const CHANT_CONNECTING_LINE: u32 = 0xE9BD;

// ── Metrics provider ────────────────────────────────────────────────

/// Opaque glyph geometry provider. `staff_size` is a scale factor
/// (1.0 = full-size staff, grace staves pass a reduced factor).
pub trait GlyphMetrics {
    fn glyph_width(&self, code: u32, staff_size: f64) -> f64;
    fn glyph_height(&self, code: u32, staff_size: f64) -> f64;
}

/// Table-driven metrics in staff-space units, scaled by the configured
/// staff space. Dimensions approximate the Bravura reference font.
pub struct StaffMetrics {
    staff_space: f64,
}

impl StaffMetrics {
    pub fn new(staff_space: f64) -> Self {
        StaffMetrics { staff_space }
    }

    /// (width, height) in staff-space units.
    fn dimensions(code: u32) -> (f64, f64) {
        match code {
            NOTEHEAD_DOUBLE_WHOLE => (2.0, 1.0),
            NOTEHEAD_BREVE_SQUARE => (1.8, 1.0),
            NOTEHEAD_WHOLE => (1.7, 1.0),
            NOTEHEAD_HALF => (1.18, 1.0),
            NOTEHEAD_BLACK => (1.18, 1.0),
            ACCID_FLAT => (0.9, 2.4),
            ACCID_NATURAL => (0.67, 2.7),
            ACCID_SHARP => (1.0, 2.8),
            ACCID_DOUBLE_SHARP => (1.0, 1.0),
            ACCID_DOUBLE_FLAT => (1.65, 2.4),
            ACCID_PARENS_LEFT | ACCID_PARENS_RIGHT => (0.33, 2.0),
            CHANT_PUNCTUM => (1.0, 1.0),
            CHANT_PUNCTUM_INCLINATUM => (1.0, 1.0),
            CHANT_AUCTUM_ASC | CHANT_AUCTUM_DESC => (1.0, 1.3),
            CHANT_PUNCTUM_VIRGA => (1.0, 2.2),
            CHANT_QUILISMA => (1.1, 1.0),
            CHANT_ORISCUS => (1.1, 1.0),
            CHANT_ENTRY_LINE_2ND | CHANT_LIGATURA_DESC_2ND => (1.0, 2.0),
            CHANT_ENTRY_LINE_3RD | CHANT_LIGATURA_DESC_3RD => (1.0, 3.0),
            CHANT_ENTRY_LINE_4TH | CHANT_LIGATURA_DESC_4TH => (1.0, 4.0),
            CHANT_ENTRY_LINE_5TH | CHANT_LIGATURA_DESC_5TH => (1.0, 5.0),
            CHANT_CONNECTING_LINE => (0.2, 1.0),
            _ => (1.0, 1.0),
        }
    }
}

impl GlyphMetrics for StaffMetrics {
    fn glyph_width(&self, code: u32, staff_size: f64) -> f64 {
        Self::dimensions(code).0 * self.staff_space * staff_size
    }

    fn glyph_height(&self, code: u32, staff_size: f64) -> f64 {
        Self::dimensions(code).1 * self.staff_space * staff_size
    }
}

// ── Layout options ──────────────────────────────────────────────────

/// Tunable layout distances and factors.
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    /// Distance between adjacent staff lines.
    pub staff_space: f64,
    /// Vertical gap between stacked staves.
    pub staff_gap: f64,
    /// Stem thickness.
    pub stem_width: f64,
    /// Scale factor applied to grace notes.
    pub grace_factor: f64,
    /// Extra vertical slack when testing cross-layer collisions, in
    /// drawing units (half staff spaces).
    pub vertical_margin: f64,
    /// Horizontal collision margin as a multiple of the stem width.
    pub horizontal_margin_factor: f64,
    /// Gap between neighboring accidentals in an accidental space.
    pub accid_margin: f64,
    /// Gap between an accidental column and the notehead it precedes.
    pub accid_note_gap: f64,
    /// Minimum distance between consecutive content alignments.
    pub min_note_spacing: f64,
    /// Width allotted to each time unit when spacing content alignments.
    pub spacing_per_quarter: f64,
    /// Fixed widths for scoreDef alignments at the front of a measure.
    pub clef_space: f64,
    pub keysig_accid_space: f64,
    pub metersig_space: f64,
    pub barline_space: f64,
    /// Padding inside the measure before the first and after the last
    /// content alignment.
    pub measure_left_pad: f64,
    pub measure_right_pad: f64,
    /// Horizontal window beyond which the collision scan stops early.
    pub search_window: f64,
}

impl LayoutOptions {
    /// One drawing unit: half a staff space, the distance of one
    /// staff-line location step.
    pub fn unit(&self) -> f64 {
        self.staff_space / 2.0
    }
}

impl Default for LayoutOptions {
    fn default() -> Self {
        LayoutOptions {
            staff_space: 10.0,
            staff_gap: 60.0,
            stem_width: 1.2,
            grace_factor: 0.66,
            vertical_margin: 0.5,
            horizontal_margin_factor: 1.0,
            accid_margin: 1.5,
            accid_note_gap: 3.0,
            min_note_spacing: 14.0,
            spacing_per_quarter: 55.0,
            clef_space: 32.0,
            keysig_accid_space: 10.0,
            metersig_space: 24.0,
            barline_space: 8.0,
            measure_left_pad: 14.0,
            measure_right_pad: 14.0,
            search_window: 120.0,
        }
    }
}
