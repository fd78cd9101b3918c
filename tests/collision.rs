//! Cross-layer collision tests: unison handling, push-right adjustment,
//! and the unison-sharing count helper.

use engravelib::duration::{Dur, DurationLog, Meter};
use engravelib::layout::adjust::count_elements_in_unison;
use engravelib::layout::layout_document;
use engravelib::metrics::{LayoutOptions, StaffMetrics};
use engravelib::model::{Chord, Document, ElementId, ElementKind, Note, StemDir};
use engravelib::pitch::{Clef, Pitch, PitchName};

fn note(name: PitchName, octave: i32, dur: Dur) -> ElementKind {
    ElementKind::Note(Note::new(Pitch::new(name, octave), DurationLog::new(dur)))
}

fn two_layer_measure() -> Document {
    let mut doc = Document::new();
    let m = doc.add_measure(Meter::new(4, 4));
    let s = doc.add_staff(m, 1, Clef::treble()).unwrap();
    doc.add_layer(m, s, 1).unwrap();
    doc.add_layer(m, s, 2).unwrap();
    doc
}

fn layout(doc: &mut Document) -> LayoutOptions {
    let options = LayoutOptions::default();
    let metrics = StaffMetrics::new(options.staff_space);
    layout_document(doc, &options, &metrics);
    options
}

fn x(doc: &Document, id: ElementId) -> f64 {
    doc.drawing_x(id)
}

#[test]
fn colliding_unison_quarters_are_pushed_apart() {
    let mut doc = two_layer_measure();
    let first = doc.insert(0, 0, 0, note(PitchName::B, 4, Dur::Quarter)).unwrap();
    let second = doc.insert(0, 0, 1, note(PitchName::B, 4, Dur::Quarter)).unwrap();

    let options = layout(&mut doc);

    let metrics = StaffMetrics::new(options.staff_space);
    let radius = doc.drawing_radius(first, &options, &metrics, false);
    assert!(
        x(&doc, second) - x(&doc, first) >= 2.0 * radius,
        "unison quarter noteheads must not overlap: {} vs {}",
        x(&doc, first),
        x(&doc, second)
    );
    assert_eq!(doc.layout(first).x_rel, 0.0, "already-placed layer never moves");
}

#[test]
fn unison_halves_share_their_position() {
    let mut doc = two_layer_measure();
    let first = doc.insert(0, 0, 0, note(PitchName::B, 4, Dur::Half)).unwrap();
    let second = doc.insert(0, 0, 1, note(PitchName::B, 4, Dur::Half)).unwrap();

    layout(&mut doc);

    assert_eq!(
        x(&doc, first),
        x(&doc, second),
        "half-note unisons keep diverging stems on one head position"
    );
}

#[test]
fn distant_pitches_at_one_onset_are_not_shifted() {
    // Two layers in 4/4: C4+C4 against E4+E4. The pairs align but sit
    // more than one step apart, so no collision adjustment applies.
    let mut doc = two_layer_measure();
    let c1 = doc.insert(0, 0, 0, note(PitchName::C, 4, Dur::Quarter)).unwrap();
    let c2 = doc.insert(0, 0, 0, note(PitchName::C, 4, Dur::Quarter)).unwrap();
    let e1 = doc.insert(0, 0, 1, note(PitchName::E, 4, Dur::Quarter)).unwrap();
    let e2 = doc.insert(0, 0, 1, note(PitchName::E, 4, Dur::Quarter)).unwrap();

    layout(&mut doc);

    assert_eq!(doc.layout(c1).alignment, doc.layout(e1).alignment);
    assert_eq!(doc.layout(c2).alignment, doc.layout(e2).alignment);
    for id in [c1, c2, e1, e2] {
        assert_eq!(doc.layout(id).x_rel, 0.0, "no shift expected for distant pitches");
    }
}

#[test]
fn adjacent_pitches_with_overlap_are_pushed_right() {
    let mut doc = two_layer_measure();
    let upper = doc.insert(0, 0, 0, note(PitchName::B, 4, Dur::Quarter)).unwrap();
    let lower = doc.insert(0, 0, 1, note(PitchName::A, 4, Dur::Quarter)).unwrap();

    layout(&mut doc);

    assert!(
        x(&doc, lower) > x(&doc, upper),
        "seconds between layers shift the later layer right"
    );
}

#[test]
fn single_layer_staff_is_untouched() {
    let mut doc = Document::new();
    let m = doc.add_measure(Meter::new(4, 4));
    let s = doc.add_staff(m, 1, Clef::treble()).unwrap();
    doc.add_layer(m, s, 1).unwrap();
    let a = doc.insert(0, 0, 0, note(PitchName::B, 4, Dur::Quarter)).unwrap();
    let b = doc.insert(0, 0, 0, note(PitchName::B, 4, Dur::Quarter)).unwrap();

    layout(&mut doc);

    assert_eq!(doc.layout(a).x_rel, 0.0);
    assert_eq!(doc.layout(b).x_rel, 0.0);
}

fn chord_of(doc: &mut Document, layer: usize, names: &[PitchName]) -> ElementId {
    let chord = doc
        .insert(0, 0, layer, ElementKind::Chord(Chord::new(DurationLog::new(Dur::Quarter))))
        .unwrap();
    for &name in names {
        doc.append_child(chord, note(name, 4, Dur::Quarter))
            .unwrap();
    }
    chord
}

#[test]
fn identical_chords_in_two_layers_overlay_their_noteheads() {
    let mut doc = two_layer_measure();
    let triad = [PitchName::C, PitchName::E, PitchName::G];
    let first = chord_of(&mut doc, 0, &triad);
    let second = chord_of(&mut doc, 1, &triad);

    layout(&mut doc);

    assert_eq!(
        doc.layout(second).x_rel,
        0.0,
        "full-unison chords share every notehead, no offset"
    );
    assert_eq!(x(&doc, first), x(&doc, second));
}

#[test]
fn chord_with_an_adjacent_extra_is_still_pushed_right() {
    // The F4 sits one step above the other chord's E4, so the heads
    // cannot be shared.
    let mut doc = two_layer_measure();
    let first = chord_of(&mut doc, 0, &[PitchName::C, PitchName::E, PitchName::F]);
    let second = chord_of(&mut doc, 1, &[PitchName::C, PitchName::E]);

    layout(&mut doc);

    assert_eq!(doc.layout(first).x_rel, 0.0);
    assert!(
        doc.layout(second).x_rel > 0.0,
        "an adjacent non-shared note forces an offset"
    );
}

// ── count_elements_in_unison ────────────────────────────────────────

#[test]
fn full_unison_chords_share_all_heads() {
    assert_eq!(count_elements_in_unison(&[0, 2, 4], &[0, 2, 4], StemDir::Up), 3);
}

#[test]
fn extras_beyond_the_shared_run_on_the_stem_side_are_allowed() {
    // Up-stem: extras must extend above the shared run.
    assert_eq!(count_elements_in_unison(&[0, 2, 6], &[0, 2], StemDir::Up), 2);
    // The same extras are on the wrong side for a down-stem.
    assert_eq!(count_elements_in_unison(&[0, 2, 6], &[0, 2], StemDir::Down), 0);
}

#[test]
fn adjacent_extras_forbid_sharing() {
    // The extra at 3 sits one step from the other chord's 2.
    assert_eq!(count_elements_in_unison(&[0, 2, 3], &[0, 2], StemDir::Up), 0);
}

#[test]
fn disjoint_chords_share_nothing() {
    assert_eq!(count_elements_in_unison(&[0, 2], &[5, 7], StemDir::Up), 0);
}
