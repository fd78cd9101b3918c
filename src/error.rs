//! Error types for the graph builder API.
//!
//! The layout passes themselves never fail: encoding anomalies are logged
//! and defaulted so a whole-document layout is never aborted because of one
//! malformed element. Errors exist only where an embedder can hand us a
//! structurally impossible graph.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("a {child} cannot be a child of a {parent}")]
    InvalidChild {
        parent: &'static str,
        child: &'static str,
    },

    #[error("no measure at index {0}")]
    NoSuchMeasure(usize),

    #[error("no staff at index {staff} in measure {measure}")]
    NoSuchStaff { measure: usize, staff: usize },

    #[error("no layer at index {layer} in measure {measure}, staff {staff}")]
    NoSuchLayer {
        measure: usize,
        staff: usize,
        layer: usize,
    },
}
