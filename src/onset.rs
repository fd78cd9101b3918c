//! Score-time and real-time onsets for every aligned element.  This is
//! the bridge between the alignment engine and MIDI/timemap consumers —
//! it answers "when does each note start?" both in quarter-note units
//! and in wall-clock seconds.

use num_rational::Ratio;

use crate::duration::{MusicalTime, DUR_MAX};
use crate::model::{Document, ElementId};

/// Timing of one element in the laid-out score.
#[derive(Debug, Clone)]
pub struct OnsetEntry {
    pub id: ElementId,
    /// Measure index the element belongs to.
    pub measure: usize,
    /// Onset from the start of the score, in quarter-note units.
    pub onset_quarters: f64,
    /// Offset (onset + duration) in quarter-note units.
    pub offset_quarters: f64,
    /// Onset in seconds at the given tempo.
    pub onset_seconds: f64,
    /// Offset in seconds at the given tempo.
    pub offset_seconds: f64,
}

/// Default tempo if the caller does not supply one.
pub const DEFAULT_TEMPO_QPM: f64 = 120.0;

fn to_quarters(t: MusicalTime) -> f64 {
    let quarter = Ratio::from_integer(DUR_MAX / 4);
    let q = t / quarter;
    *q.numer() as f64 / *q.denom() as f64
}

/// Compute onset/offset times for every element carrying an alignment.
///
/// The horizontal alignment pass must have run: onsets are read straight
/// from the alignment times, so un-aligned elements (attachments sharing
/// a parent's alignment excepted) produce no entry.  `tempo_qpm` is in
/// quarter notes per minute.
pub fn calc_onset_offsets(doc: &Document, tempo_qpm: f64) -> Vec<OnsetEntry> {
    let tempo_qpm = if tempo_qpm > 0.0 {
        tempo_qpm
    } else {
        log::warn!("non-positive tempo, defaulting to {DEFAULT_TEMPO_QPM} qpm");
        DEFAULT_TEMPO_QPM
    };
    let seconds_per_quarter = 60.0 / tempo_qpm;
    let mut entries = Vec::new();

    // Cumulative measure start times in score-time units.
    let mut measure_start = Vec::with_capacity(doc.measures.len());
    let mut acc = Ratio::from_integer(0);
    for m in &doc.measures {
        measure_start.push(acc);
        acc += m.meter.measure_time();
    }

    for id in doc.ids() {
        let layout = doc.layout(id);
        let align = match layout.alignment {
            Some(a) => a,
            None => continue,
        };
        let (measure, staff_idx) = match doc.home_staff(id) {
            Some(pair) => pair,
            None => continue,
        };
        let time = doc.measures[align.measure].aligner.alignment(align.index).time;
        let onset = measure_start[measure] + time;

        let meter = doc.measures[measure].meter;
        let notation = doc.measures[measure].staves[staff_idx].notation;
        let duration = if doc.is_grace(id) {
            Ratio::from_integer(0)
        } else {
            doc.alignment_duration(id, &meter, notation)
        };
        let offset = onset + duration;

        let onset_quarters = to_quarters(onset);
        let offset_quarters = to_quarters(offset);
        entries.push(OnsetEntry {
            id,
            measure,
            onset_quarters,
            offset_quarters,
            onset_seconds: onset_quarters * seconds_per_quarter,
            offset_seconds: offset_quarters * seconds_per_quarter,
        });
    }

    entries
}

/// Total duration of the score in seconds, from the latest offset.
pub fn total_duration_seconds(entries: &[OnsetEntry]) -> f64 {
    entries
        .iter()
        .map(|e| e.offset_seconds)
        .fold(0.0, f64::max)
}
