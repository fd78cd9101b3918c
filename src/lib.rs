//! engravelib — music notation alignment and spacing engine.
//!
//! Takes a tree of musical layer elements (notes, rests, accidentals,
//! clefs, …) organized into measures/staves/layers, assigns each a
//! rhythmic alignment position, computes drawing X/Y positions, and
//! resolves cross-voice collisions (accidental stacking, layer overlap,
//! grace-note packing, ligature/neume positioning). The resulting pixel
//! coordinates are what a renderer consumes.
//!
//! # Example
//! ```
//! use engravelib::duration::{DurationLog, Dur, Meter};
//! use engravelib::metrics::{LayoutOptions, StaffMetrics};
//! use engravelib::model::{Document, ElementKind, Note, Rest};
//! use engravelib::pitch::{Clef, Pitch, PitchName};
//!
//! let mut doc = Document::new();
//! let m = doc.add_measure(Meter::new(4, 4));
//! let s = doc.add_staff(m, 1, Clef::treble()).unwrap();
//! let l = doc.add_layer(m, s, 1).unwrap();
//! let quarter = DurationLog::new(Dur::Quarter);
//! let note = Note::new(Pitch::new(PitchName::C, 4), quarter);
//! doc.insert(m, s, l, ElementKind::Note(note)).unwrap();
//! doc.insert(m, s, l, ElementKind::Rest(Rest::new(quarter))).unwrap();
//!
//! let options = LayoutOptions::default();
//! let metrics = StaffMetrics::new(options.staff_space);
//! engravelib::layout::layout_document(&mut doc, &options, &metrics);
//! ```

pub mod duration;
pub mod error;
pub mod functor;
pub mod layout;
pub mod metrics;
pub mod model;
pub mod onset;
pub mod pitch;

pub use error::GraphError;
pub use layout::{layout_document, layout_to_json};
pub use model::{Document, ElementId, ElementKind};
