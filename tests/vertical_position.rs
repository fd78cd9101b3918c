//! Vertical positioning tests: pitch-to-location mapping, clef tracking,
//! rest placement, dots, and chords.

use engravelib::duration::{Dur, DurationLog, Meter};
use engravelib::layout::horizontal::run_horizontal;
use engravelib::layout::vertical::run_vertical;
use engravelib::metrics::LayoutOptions;
use engravelib::model::{Chord, Document, ElementId, ElementKind, Note, Rest};
use engravelib::pitch::{pitch_loc, Clef, Pitch, PitchName};

fn note(name: PitchName, octave: i32, dur: Dur) -> ElementKind {
    ElementKind::Note(Note::new(Pitch::new(name, octave), DurationLog::new(dur)))
}

fn one_measure(layers: usize) -> Document {
    let mut doc = Document::new();
    let m = doc.add_measure(Meter::new(4, 4));
    let s = doc.add_staff(m, 1, Clef::treble()).unwrap();
    for n in 1..=layers {
        doc.add_layer(m, s, n).unwrap();
    }
    doc
}

fn layout_measure(doc: &mut Document) {
    let options = LayoutOptions::default();
    run_horizontal(doc, 0);
    run_vertical(doc, 0, &options);
}

fn loc(doc: &Document, id: ElementId) -> i32 {
    doc.layout(id).drawing_loc.expect("location should be set")
}

#[test]
fn pitch_loc_maps_the_standard_clefs() {
    // B4 sits on the middle line of the treble staff.
    assert_eq!(pitch_loc(&Pitch::new(PitchName::B, 4), &Clef::treble()), 0);
    assert_eq!(pitch_loc(&Pitch::new(PitchName::G, 4), &Clef::treble()), -2);
    assert_eq!(pitch_loc(&Pitch::new(PitchName::C, 4), &Clef::treble()), -6);
    // D3 sits on the middle line of the bass staff.
    assert_eq!(pitch_loc(&Pitch::new(PitchName::D, 3), &Clef::bass()), 0);
    // C4 sits on the middle line of the alto staff.
    assert_eq!(pitch_loc(&Pitch::new(PitchName::C, 4), &Clef::alto()), 0);
}

#[test]
fn notes_get_their_clef_relative_location() {
    let mut doc = one_measure(1);
    let b4 = doc.insert(0, 0, 0, note(PitchName::B, 4, Dur::Quarter)).unwrap();
    let c4 = doc.insert(0, 0, 0, note(PitchName::C, 4, Dur::Quarter)).unwrap();

    layout_measure(&mut doc);

    assert_eq!(loc(&doc, b4), 0);
    assert_eq!(loc(&doc, c4), -6);
    // One location step is half a staff space, positive up.
    let options = LayoutOptions::default();
    assert_eq!(doc.layout(c4).y_rel, -6.0 * options.unit());
}

#[test]
fn mid_layer_clef_change_applies_to_following_notes() {
    let mut doc = one_measure(1);
    let before = doc.insert(0, 0, 0, note(PitchName::C, 4, Dur::Quarter)).unwrap();
    doc.insert(0, 0, 0, ElementKind::Clef(Clef::bass())).unwrap();
    let after = doc.insert(0, 0, 0, note(PitchName::C, 4, Dur::Quarter)).unwrap();

    layout_measure(&mut doc);

    assert_eq!(loc(&doc, before), -6, "treble C4 below the staff");
    assert_eq!(loc(&doc, after), 6, "bass C4 above the staff");
}

#[test]
fn lone_rest_sits_mid_staff() {
    let mut doc = one_measure(1);
    let rest = doc
        .insert(0, 0, 0, ElementKind::Rest(Rest::new(DurationLog::new(Dur::Quarter))))
        .unwrap();

    layout_measure(&mut doc);

    assert_eq!(loc(&doc, rest), 0);
}

#[test]
fn rests_in_two_layers_split_around_the_middle() {
    let mut doc = one_measure(2);
    let upper = doc
        .insert(0, 0, 0, ElementKind::Rest(Rest::new(DurationLog::new(Dur::Quarter))))
        .unwrap();
    let lower = doc
        .insert(0, 0, 1, ElementKind::Rest(Rest::new(DurationLog::new(Dur::Quarter))))
        .unwrap();

    layout_measure(&mut doc);

    assert_eq!(loc(&doc, upper), 2, "topmost layer rest shifts up");
    assert_eq!(loc(&doc, lower), -2, "other layer rest shifts down");
}

#[test]
fn dotted_rest_lands_in_a_space() {
    let mut doc = one_measure(2);
    let rest = doc
        .insert(
            0,
            0,
            0,
            ElementKind::Rest(Rest::new(DurationLog::dotted(Dur::Quarter, 1))),
        )
        .unwrap();
    doc.insert(0, 0, 1, ElementKind::Rest(Rest::new(DurationLog::new(Dur::Quarter))))
        .unwrap();

    layout_measure(&mut doc);

    assert_eq!(loc(&doc, rest).rem_euclid(2), 1, "dotted rests take odd locations");
}

#[test]
fn explicit_rest_loc_with_wrong_parity_is_corrected() {
    let mut doc = one_measure(1);
    let mut rest = Rest::new(DurationLog::new(Dur::Quarter));
    rest.loc = Some(3);
    let id = doc.insert(0, 0, 0, ElementKind::Rest(rest)).unwrap();

    layout_measure(&mut doc);

    // Undotted rests belong on lines; 3 corrects one step toward the
    // middle.
    assert_eq!(loc(&doc, id), 2);
}

#[test]
fn beamed_rest_follows_its_neighbors() {
    let mut doc = one_measure(1);
    let beam = doc.insert(0, 0, 0, ElementKind::Beam).unwrap();
    doc.append_child(beam, note(PitchName::C, 6, Dur::Eighth)).unwrap();
    let rest = doc
        .append_child(beam, ElementKind::Rest(Rest::new(DurationLog::new(Dur::Eighth))))
        .unwrap();
    doc.append_child(beam, note(PitchName::C, 6, Dur::Eighth)).unwrap();

    layout_measure(&mut doc);

    // Neighbors sit at +8; the rest follows them up instead of staying at
    // mid-staff, with the eighth-rest stem-line offset and parity applied.
    let l = loc(&doc, rest);
    assert!(l >= 6, "rest should be pulled toward high beam neighbors, got {l}");
    assert_eq!(l.rem_euclid(2), 0, "undotted rest must land on a line");
}

#[test]
fn chord_anchors_at_its_top_note() {
    let mut doc = one_measure(1);
    let chord = doc
        .insert(0, 0, 0, ElementKind::Chord(Chord::new(DurationLog::new(Dur::Quarter))))
        .unwrap();
    let top = doc.append_child(chord, note(PitchName::E, 5, Dur::Quarter)).unwrap();
    let bottom = doc.append_child(chord, note(PitchName::C, 5, Dur::Quarter)).unwrap();

    layout_measure(&mut doc);

    let options = LayoutOptions::default();
    assert_eq!(loc(&doc, chord), 3, "chord location is the top note's");
    assert_eq!(loc(&doc, top), 3);
    assert_eq!(loc(&doc, bottom), 1);
    assert_eq!(doc.layout(top).y_rel, 3.0 * options.unit());
    assert_eq!(doc.layout(bottom).y_rel, 1.0 * options.unit());
}

#[test]
fn stems_point_away_from_the_middle_line() {
    let mut doc = one_measure(1);
    let high = doc.insert(0, 0, 0, note(PitchName::C, 5, Dur::Quarter)).unwrap();
    let low = doc.insert(0, 0, 0, note(PitchName::A, 4, Dur::Quarter)).unwrap();

    layout_measure(&mut doc);

    use engravelib::model::StemDir;
    assert_eq!(doc.stem_dir(high), StemDir::Down);
    assert_eq!(doc.stem_dir(low), StemDir::Up);

    // An explicit direction on the note wins over the location rule.
    if let ElementKind::Note(n) = &mut doc.element_mut(high).kind {
        n.stem_dir = Some(StemDir::Up);
    }
    assert_eq!(doc.stem_dir(high), StemDir::Up);

    let options = LayoutOptions::default();
    // An up-stem extends the top well past the notehead.
    let head_top = doc.drawing_y(low, &options) - options.unit();
    assert!(doc.drawing_top(low, &options, false) < head_top);
    assert_eq!(doc.drawing_bottom(low, &options, false), doc.drawing_y(low, &options) + options.unit());
}

#[test]
fn dot_moves_off_the_line() {
    let mut doc = one_measure(1);
    let on_line = doc.insert(0, 0, 0, note(PitchName::B, 4, Dur::Quarter)).unwrap();
    let dot_line = doc.append_child(on_line, ElementKind::Dot).unwrap();
    let in_space = doc.insert(0, 0, 0, note(PitchName::C, 5, Dur::Quarter)).unwrap();
    let dot_space = doc.append_child(in_space, ElementKind::Dot).unwrap();

    layout_measure(&mut doc);

    assert_eq!(loc(&doc, dot_line), 1, "dot of a line note moves into the space above");
    assert_eq!(loc(&doc, dot_space), 1, "dot of a space note stays in the space");
}
