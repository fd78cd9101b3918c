//! Horizontal alignment pass tests: alignment sharing, cursor
//! monotonicity, duration math, and spacing.

use num_rational::Ratio;

use engravelib::duration::{Dur, DurationLog, Meter, DUR_MAX};
use engravelib::layout::horizontal::{
    run_horizontal, space_alignments, AlignmentKind,
};
use engravelib::metrics::{LayoutOptions, StaffMetrics};
use engravelib::model::{Chord, Document, ElementId, ElementKind, FTrem, GraceKind, Note, Tuplet};
use engravelib::pitch::{Clef, Pitch, PitchName};

fn note(name: PitchName, octave: i32, dur: Dur) -> ElementKind {
    ElementKind::Note(Note::new(Pitch::new(name, octave), DurationLog::new(dur)))
}

/// Document with one 4/4 measure, one treble staff, `layers` empty layers.
fn one_measure(layers: usize) -> Document {
    let mut doc = Document::new();
    let m = doc.add_measure(Meter::new(4, 4));
    let s = doc.add_staff(m, 1, Clef::treble()).unwrap();
    for n in 1..=layers {
        doc.add_layer(m, s, n).unwrap();
    }
    doc
}

fn alignment_time(doc: &Document, id: ElementId) -> Ratio<i64> {
    let a = doc.layout(id).alignment.expect("element should be aligned");
    doc.measures[a.measure].aligner.alignment(a.index).time
}

#[test]
fn layers_share_alignments_at_equal_times() {
    let mut doc = one_measure(2);
    let a1 = doc.insert(0, 0, 0, note(PitchName::C, 4, Dur::Quarter)).unwrap();
    let a2 = doc.insert(0, 0, 0, note(PitchName::C, 4, Dur::Quarter)).unwrap();
    let b1 = doc.insert(0, 0, 1, note(PitchName::E, 4, Dur::Quarter)).unwrap();
    let b2 = doc.insert(0, 0, 1, note(PitchName::E, 4, Dur::Quarter)).unwrap();

    run_horizontal(&mut doc, 0);

    assert_eq!(
        doc.layout(a1).alignment,
        doc.layout(b1).alignment,
        "simultaneous notes in different layers must share an alignment"
    );
    assert_eq!(doc.layout(a2).alignment, doc.layout(b2).alignment);
    assert_ne!(doc.layout(a1).alignment, doc.layout(a2).alignment);
    assert_eq!(alignment_time(&doc, a2), Ratio::from_integer(DUR_MAX / 4));

    let shared = doc.layout(a1).alignment.unwrap();
    assert!(doc.measures[0].aligner.alignment(shared.index).has_multiple_layers());
}

#[test]
fn cursor_never_rewinds_within_a_layer() {
    let mut doc = one_measure(1);
    let ids: Vec<ElementId> = [
        note(PitchName::C, 4, Dur::Eighth),
        note(PitchName::D, 4, Dur::Quarter),
        note(PitchName::E, 4, Dur::Eighth),
        note(PitchName::F, 4, Dur::Half),
    ]
    .into_iter()
    .map(|k| doc.insert(0, 0, 0, k).unwrap())
    .collect();

    run_horizontal(&mut doc, 0);

    let times: Vec<Ratio<i64>> = ids.iter().map(|&id| alignment_time(&doc, id)).collect();
    for w in times.windows(2) {
        assert!(w[0] <= w[1], "alignment times must be nondecreasing: {times:?}");
    }
}

#[test]
fn tuplet_scales_member_durations() {
    let mut doc = one_measure(1);
    let tuplet = doc
        .insert(0, 0, 0, ElementKind::Tuplet(Tuplet { num: 3, numbase: 2 }))
        .unwrap();
    let n1 = doc.append_child(tuplet, note(PitchName::C, 4, Dur::Quarter)).unwrap();
    let n2 = doc.append_child(tuplet, note(PitchName::D, 4, Dur::Quarter)).unwrap();
    doc.append_child(tuplet, note(PitchName::E, 4, Dur::Quarter)).unwrap();

    run_horizontal(&mut doc, 0);

    // A quarter inside a 3:2 tuplet takes 2/3 of its nominal time.
    let expected = Ratio::new(2 * (DUR_MAX / 4), 3);
    assert_eq!(alignment_time(&doc, n2) - alignment_time(&doc, n1), expected);
}

#[test]
fn measured_tremolo_halves_member_durations() {
    let mut doc = one_measure(1);
    let ftrem = doc
        .insert(0, 0, 0, ElementKind::FTrem(FTrem { beams: 2 }))
        .unwrap();
    let n1 = doc.append_child(ftrem, note(PitchName::C, 4, Dur::Half)).unwrap();
    let n2 = doc.append_child(ftrem, note(PitchName::E, 4, Dur::Half)).unwrap();

    run_horizontal(&mut doc, 0);

    // Two written halves alternate within the time of one: each member
    // charges half its nominal value.
    assert_eq!(
        alignment_time(&doc, n2) - alignment_time(&doc, n1),
        Ratio::from_integer(DUR_MAX / 4)
    );
}

#[test]
fn mrest_spans_the_whole_measure() {
    let mut doc = one_measure(1);
    let mrest = doc.insert(0, 0, 0, ElementKind::MRest).unwrap();

    run_horizontal(&mut doc, 0);

    let a = doc.layout(mrest).alignment.unwrap();
    assert_eq!(
        doc.measures[0].aligner.alignment(a.index).kind,
        AlignmentKind::FullMeasure
    );
    assert_eq!(
        doc.alignment_duration(mrest, &Meter::new(4, 4), engravelib::duration::NotationType::Cmn),
        Ratio::from_integer(DUR_MAX)
    );
    // The measure-end anchor sits a full measure in.
    let end_time = doc
        .measures[0]
        .aligner
        .iter()
        .find(|a| a.kind == AlignmentKind::MeasureEnd)
        .map(|a| a.time)
        .unwrap();
    assert_eq!(end_time, Ratio::from_integer(DUR_MAX));
}

#[test]
fn rerunning_reproduces_identical_assignments() {
    let mut doc = one_measure(2);
    let mut ids = Vec::new();
    for (layer, name) in [(0, PitchName::C), (1, PitchName::G)] {
        ids.push(doc.insert(0, 0, layer, note(name, 4, Dur::Quarter)).unwrap());
        ids.push(doc.insert(0, 0, layer, note(name, 4, Dur::Half)).unwrap());
        ids.push(doc.insert(0, 0, layer, note(name, 4, Dur::Quarter)).unwrap());
    }

    run_horizontal(&mut doc, 0);
    let first: Vec<_> = ids.iter().map(|&id| doc.layout(id).alignment).collect();
    let count = doc.measures[0].aligner.len();

    run_horizontal(&mut doc, 0);
    let second: Vec<_> = ids.iter().map(|&id| doc.layout(id).alignment).collect();

    assert_eq!(first, second, "re-aligning an unchanged graph must be stable");
    assert_eq!(doc.measures[0].aligner.len(), count);
    for &id in &ids {
        assert_eq!(doc.layout(id).x_rel, 0.0, "x_rel must be reset before realignment");
    }
}

#[test]
fn chord_members_share_the_chord_alignment() {
    let mut doc = one_measure(1);
    let chord = doc
        .insert(0, 0, 0, ElementKind::Chord(Chord::new(DurationLog::new(Dur::Quarter))))
        .unwrap();
    let top = doc.append_child(chord, note(PitchName::E, 5, Dur::Quarter)).unwrap();
    let bottom = doc.append_child(chord, note(PitchName::C, 5, Dur::Quarter)).unwrap();

    run_horizontal(&mut doc, 0);

    assert!(doc.layout(chord).alignment.is_some());
    assert_eq!(doc.layout(top).alignment, doc.layout(chord).alignment);
    assert_eq!(doc.layout(bottom).alignment, doc.layout(chord).alignment);
}

#[test]
fn leading_clef_is_scoredef_role_mid_measure_clef_is_not() {
    let mut doc = one_measure(1);
    let leading = doc.insert(0, 0, 0, ElementKind::Clef(Clef::treble())).unwrap();
    doc.insert(0, 0, 0, note(PitchName::C, 4, Dur::Half)).unwrap();
    let change = doc.insert(0, 0, 0, ElementKind::Clef(Clef::bass())).unwrap();
    doc.insert(0, 0, 0, note(PitchName::C, 3, Dur::Half)).unwrap();

    run_horizontal(&mut doc, 0);

    assert!(doc.layout(leading).scoredef_role);
    assert!(!doc.layout(change).scoredef_role);
}

#[test]
fn grace_notes_do_not_consume_time() {
    let mut doc = one_measure(1);
    doc.insert(0, 0, 0, note(PitchName::C, 4, Dur::Quarter)).unwrap();
    let mut grace_note = Note::new(
        Pitch::new(PitchName::F, 4),
        DurationLog::new(Dur::Eighth),
    );
    grace_note.grace = Some(GraceKind::Unaccented);
    let grace = doc.insert(0, 0, 0, ElementKind::Note(grace_note)).unwrap();
    let host = doc.insert(0, 0, 0, note(PitchName::G, 4, Dur::Quarter)).unwrap();

    run_horizontal(&mut doc, 0);

    assert!(doc.layout(grace).grace_alignment.is_some());
    // The host still lands exactly one quarter in.
    assert_eq!(alignment_time(&doc, host), Ratio::from_integer(DUR_MAX / 4));
    let g = doc.layout(grace).grace_alignment.unwrap();
    assert_eq!(
        doc.measures[0].aligner.alignment(g.alignment).kind,
        AlignmentKind::Grace
    );
    assert_eq!(g.slot, 0, "first grace note of its cluster");
}

#[test]
fn spacing_runs_left_to_right_with_minimums() {
    let mut doc = one_measure(1);
    doc.insert(0, 0, 0, ElementKind::Clef(Clef::treble())).unwrap();
    doc.insert(0, 0, 0, note(PitchName::C, 4, Dur::Quarter)).unwrap();
    doc.insert(0, 0, 0, note(PitchName::D, 4, Dur::D32)).unwrap();
    doc.insert(0, 0, 0, note(PitchName::E, 4, Dur::Half)).unwrap();

    let options = LayoutOptions::default();
    let metrics = StaffMetrics::new(options.staff_space);
    run_horizontal(&mut doc, 0);
    space_alignments(&mut doc, 0, &options, &metrics);

    let order = doc.measures[0].aligner.ordered();
    let xs: Vec<f64> = order
        .iter()
        .map(|&i| doc.measures[0].aligner.x_rel(i))
        .collect();
    for w in xs.windows(2) {
        assert!(w[0] <= w[1], "x_rel must be nondecreasing in drawing order: {xs:?}");
    }
    assert!(doc.measures[0].width > 0.0);

    // The 32nd-to-half pair is squeezed to the minimum, never below it.
    let after_32nd = xs[4] - xs[3];
    assert_eq!(
        after_32nd, options.min_note_spacing,
        "a 32nd gap must clamp to the minimum spacing"
    );
}

#[test]
fn barline_takes_its_configured_width() {
    let mut doc = one_measure(1);
    let before = doc.insert(0, 0, 0, note(PitchName::C, 4, Dur::Quarter)).unwrap();
    let bar = doc.insert(0, 0, 0, ElementKind::BarLine).unwrap();
    doc.insert(0, 0, 0, note(PitchName::D, 4, Dur::Quarter)).unwrap();

    let options = LayoutOptions::default();
    let metrics = StaffMetrics::new(options.staff_space);
    run_horizontal(&mut doc, 0);
    space_alignments(&mut doc, 0, &options, &metrics);

    // The barline sorts after the content slot at its time and advances
    // the running x by its configured width.
    let bar_slot = doc.layout(bar).alignment.unwrap().index;
    let note_slot = doc.layout(before).alignment.unwrap().index;
    assert_eq!(
        alignment_time(&doc, bar),
        Ratio::from_integer(DUR_MAX / 4),
        "barline aligns where the cursor stood"
    );
    assert!(doc.measures[0].aligner.x_rel(bar_slot) > doc.measures[0].aligner.x_rel(note_slot));
    let second_slot = doc
        .measures[0]
        .aligner
        .ordered()
        .into_iter()
        .find(|&i| {
            let a = doc.measures[0].aligner.alignment(i);
            a.kind == AlignmentKind::Default && a.time == Ratio::from_integer(DUR_MAX / 4)
        })
        .unwrap();
    assert_eq!(
        doc.measures[0].aligner.x_rel(bar_slot) - doc.measures[0].aligner.x_rel(second_slot),
        options.barline_space
    );
}

#[test]
fn timestamp_jumps_forward_but_never_behind_committed_time() {
    let mut doc = one_measure(1);
    doc.insert(0, 0, 0, note(PitchName::C, 4, Dur::Half)).unwrap();
    // Beat 2 is behind the committed half-note cursor; the element must
    // clamp to the committed time instead of rewinding.
    let ts = doc
        .insert(
            0,
            0,
            0,
            ElementKind::Timestamp(engravelib::model::Timestamp {
                beat: Ratio::from_integer(2),
            }),
        )
        .unwrap();

    run_horizontal(&mut doc, 0);

    assert_eq!(alignment_time(&doc, ts), Ratio::from_integer(DUR_MAX / 2));
}
