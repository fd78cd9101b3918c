//! Musical duration model — nominal duration values, meters, and the
//! arithmetic rules used by the horizontal alignment pass.
//!
//! All durations are exact rationals in DUR_MAX units: one 4/4 measure is
//! `DUR_MAX` (1024), a quarter note is 256. Using `Ratio<i64>` instead of
//! floats makes alignment-key equality exact, so two layers that arrive at
//! the same onset always hit the same key.

use num_rational::Ratio;
use serde::{Deserialize, Serialize};

/// Musical time / duration in DUR_MAX units.
pub type MusicalTime = Ratio<i64>;

/// Numeric value of one whole measure of 4/4 (and of a CMN whole note × 1).
pub const DUR_MAX: i64 = 1024;

/// Shorthand for an exact time value.
pub fn time(num: i64, den: i64) -> MusicalTime {
    Ratio::new(num, den)
}

/// Notation family — selects the duration-to-numeric-value mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotationType {
    /// Common (Western) music notation.
    Cmn,
    /// Mensural notation (white/black).
    Mensural,
    /// Chant notation — durations are not time-proportional.
    Neume,
}

/// Written duration of a note, rest, or chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dur {
    Maxima,
    Long,
    Breve,
    Whole,
    Half,
    Quarter,
    Eighth,
    D16,
    D32,
    D64,
    D128,
    D256,
}

/// Duration class used by the ligature shape rules — maxima is folded into
/// the long class for shape purposes (it is tracked separately to suppress
/// oblique drawing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurClass {
    Long,
    Breve,
    Semibreve,
}

impl Dur {
    /// Nominal numeric value in DUR_MAX units for CMN.
    pub fn cmn_value(self) -> MusicalTime {
        match self {
            Dur::Maxima => Ratio::from_integer(8 * DUR_MAX),
            Dur::Long => Ratio::from_integer(4 * DUR_MAX),
            Dur::Breve => Ratio::from_integer(2 * DUR_MAX),
            Dur::Whole => Ratio::from_integer(DUR_MAX),
            Dur::Half => time(DUR_MAX, 2),
            Dur::Quarter => time(DUR_MAX, 4),
            Dur::Eighth => time(DUR_MAX, 8),
            Dur::D16 => time(DUR_MAX, 16),
            Dur::D32 => time(DUR_MAX, 32),
            Dur::D64 => time(DUR_MAX, 64),
            Dur::D128 => time(DUR_MAX, 128),
            Dur::D256 => time(DUR_MAX, 256),
        }
    }

    /// Nominal numeric value in DUR_MAX units for mensural notation.
    ///
    /// The brevis is anchored at DUR_MAX so that full-measure math stays
    /// meaningful under mensural meters: maxima and longa double upward,
    /// semibrevis and shorter halve downward.
    pub fn mensural_value(self) -> MusicalTime {
        match self {
            Dur::Maxima => Ratio::from_integer(4 * DUR_MAX),
            Dur::Long => Ratio::from_integer(2 * DUR_MAX),
            Dur::Breve => Ratio::from_integer(DUR_MAX),
            Dur::Whole => time(DUR_MAX, 2),
            Dur::Half => time(DUR_MAX, 4),
            Dur::Quarter => time(DUR_MAX, 8),
            Dur::Eighth => time(DUR_MAX, 16),
            Dur::D16 => time(DUR_MAX, 32),
            // Shorter values do not occur in mensural sources; treat them
            // like their CMN neighbors so layout can proceed.
            other => other.cmn_value() / Ratio::from_integer(2),
        }
    }

    pub fn value(self, notation: NotationType) -> MusicalTime {
        match notation {
            NotationType::Mensural => self.mensural_value(),
            _ => self.cmn_value(),
        }
    }

    /// Duration class for ligature shape rules.
    pub fn lig_class(self) -> DurClass {
        match self {
            Dur::Maxima | Dur::Long => DurClass::Long,
            Dur::Breve => DurClass::Breve,
            _ => DurClass::Semibreve,
        }
    }

    /// Number of flags/beams carried by this duration (0 for quarter and
    /// longer). Used by rest stem-line alignment in beams.
    pub fn beam_count(self) -> u8 {
        match self {
            Dur::Eighth => 1,
            Dur::D16 => 2,
            Dur::D32 => 3,
            Dur::D64 => 4,
            Dur::D128 => 5,
            Dur::D256 => 6,
            _ => 0,
        }
    }
}

/// Written duration plus augmentation dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DurationLog {
    /// Written duration; None when the encoding omits it.
    pub dur: Option<Dur>,
    /// Augmentation dots.
    pub dots: u8,
}

impl DurationLog {
    pub fn new(dur: Dur) -> Self {
        DurationLog { dur: Some(dur), dots: 0 }
    }

    pub fn dotted(dur: Dur, dots: u8) -> Self {
        DurationLog { dur: Some(dur), dots }
    }

    /// Nominal duration including dots. A missing written duration is a
    /// recoverable encoding anomaly: warn and default to a quarter so
    /// layout can proceed.
    pub fn nominal(&self, notation: NotationType) -> MusicalTime {
        let dur = match self.dur {
            Some(d) => d,
            None => {
                log::warn!("element has no written duration, defaulting to a quarter");
                Dur::Quarter
            }
        };
        apply_dots(dur.value(notation), self.dots)
    }
}

/// Augmentation dots multiply a duration by (2^(n+1) - 1) / 2^n.
pub fn apply_dots(base: MusicalTime, dots: u8) -> MusicalTime {
    if dots == 0 {
        return base;
    }
    let pow = 1i64 << dots.min(8);
    base * Ratio::new(2 * pow - 1, pow)
}

/// Tuplet scaling: nominal × numbase / num. Zero values are a recoverable
/// encoding anomaly and are treated as 1 to avoid division by zero.
pub fn apply_tuplet(base: MusicalTime, num: i64, numbase: i64) -> MusicalTime {
    let num = if num == 0 {
        log::warn!("tuplet @num of 0 treated as 1");
        1
    } else {
        num
    };
    let numbase = if numbase == 0 {
        log::warn!("tuplet @numbase of 0 treated as 1");
        1
    } else {
        numbase
    };
    base * Ratio::new(numbase, num)
}

/// Meter (time signature) of a measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meter {
    /// Beats per measure (e.g. 3 in 3/4).
    pub count: i64,
    /// Beat unit (e.g. 4 in 3/4).
    pub unit: i64,
}

impl Meter {
    pub fn new(count: i64, unit: i64) -> Self {
        Meter { count, unit }
    }

    /// Duration of one full measure in DUR_MAX units. Full-measure elements
    /// (mRest, mRpt) occupy exactly this much time regardless of any
    /// nominal duration they carry.
    pub fn measure_time(&self) -> MusicalTime {
        let unit = if self.unit == 0 {
            log::warn!("meter unit of 0 treated as 4");
            4
        } else {
            self.unit
        };
        Ratio::new(DUR_MAX, unit) * Ratio::from_integer(self.count)
    }

    /// Time value of one beat.
    pub fn beat_time(&self) -> MusicalTime {
        let unit = if self.unit == 0 { 4 } else { self.unit };
        Ratio::new(DUR_MAX, unit)
    }
}

impl Default for Meter {
    fn default() -> Self {
        Meter::new(4, 4)
    }
}

/// Sentinel duration for a neume component: neume-internal spacing is not
/// time-proportional, so components advance the cursor by a fixed amount —
/// larger for the last component of its neume so the next neume clears it.
pub fn nc_duration(is_last_in_neume: bool) -> MusicalTime {
    if is_last_in_neume {
        Ratio::from_integer(128)
    } else {
        Ratio::from_integer(16)
    }
}
