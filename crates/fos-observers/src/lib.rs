//! fOS Observers
//!
//! Reactive views of an element for behaviour primitives:
//! - Node resolution: follow a reassignable node reference across commits
//! - Rect observation: live bounding client rect, one tracker per element
//! - Size observation: live border-box size over one shared ResizeObserver

pub mod node_ref;
pub mod rect;
pub mod size;

pub use node_ref::{NodeRef, NodeResolver, ResolverSubscription};
pub use rect::{RectObserver, RectSubscription, TrackedRect};
pub use size::{SizeObservation, SizeObserver, SizeSubscription, TrackedSize};

use fos_dom::NodeId;

/// Observer registration error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObserveError {
    #[error("Cannot observe unknown node {0}")]
    UnknownNode(NodeId),

    #[error("Cannot observe {0}: not an element")]
    NotAnElement(NodeId),
}

pub type ObserveResult<T> = Result<T, ObserveError>;

pub(crate) fn check_observable(window: &fos_dom::Window, node: NodeId) -> ObserveResult<()> {
    window.with_document(|doc| {
        match doc.tree().get(node) {
            None => Err(ObserveError::UnknownNode(node)),
            Some(n) if !n.is_element() => Err(ObserveError::NotAnElement(node)),
            Some(_) => Ok(()),
        }
    })
}
