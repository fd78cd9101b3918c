//! Generic depth-first traversal over the element graph.
//!
//! Every layout pass is driven by a [`Visitor`] returning a tri-state
//! control code: continue into children, skip them, or stop the whole
//! traversal (used to bound horizontal searches).

use crate::model::{Document, ElementId};

/// Traversal control returned by a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitAction {
    /// Descend into the element's children.
    Continue,
    /// Skip the children, continue with the next sibling.
    SkipChildren,
    /// Abort the entire traversal.
    Stop,
}

/// One layout pass over a subtree. `element_end` fires after an element's
/// children have been visited (unless the children were skipped).
pub trait Visitor {
    fn element(&mut self, doc: &mut Document, id: ElementId) -> VisitAction;

    fn element_end(&mut self, _doc: &mut Document, _id: ElementId) {}
}

/// Depth-first walk of one element and its subtree.
pub fn walk(doc: &mut Document, id: ElementId, visitor: &mut dyn Visitor) -> VisitAction {
    match visitor.element(doc, id) {
        VisitAction::Stop => VisitAction::Stop,
        VisitAction::SkipChildren => VisitAction::Continue,
        VisitAction::Continue => {
            let children = doc.children(id).to_vec();
            for child in children {
                if walk(doc, child, visitor) == VisitAction::Stop {
                    return VisitAction::Stop;
                }
            }
            visitor.element_end(doc, id);
            VisitAction::Continue
        }
    }
}

/// Walk a sequence of sibling elements (a layer's top level).
pub fn walk_elements(
    doc: &mut Document,
    ids: &[ElementId],
    visitor: &mut dyn Visitor,
) -> VisitAction {
    for &id in ids {
        if walk(doc, id, visitor) == VisitAction::Stop {
            return VisitAction::Stop;
        }
    }
    VisitAction::Continue
}
