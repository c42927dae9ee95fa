//! fOS DOM - Document Object Model
//!
//! Arena-based DOM tree plus the window services that behaviour
//! primitives run on: focus, event dispatch, layout geometry,
//! mutation and resize observation, and a single-threaded event loop.

mod config;
mod document;
mod events;
mod focus;
mod geometry;
mod node;
mod observer;
mod tree;
mod window;

pub use config::{BoxSizeReporting, WindowConfig};
pub use document::Document;
pub use events::{Event, EventDetail, EventType, Key, KeyModifiers, KeyboardEvent, ListenerId};
pub use focus::{TabIndex, focusable_ancestor, is_focusable, is_tabbable, tab_index, tab_order};
pub use geometry::{DOMRect, Insets, LayoutBox, Size};
pub use node::{Attribute, ElementData, Node, NodeData, TextData};
pub use observer::{
    BoxSizes, MutationRecord, MutationType, ResizeObserver, ResizeObserverBoxOptions,
    ResizeObserverEntry, ResizeObserverSize,
};
pub use tree::DomTree;
pub use window::{TaskId, WeakWindow, Window};

use std::fmt;

/// Node identifier (index into arena)
///
/// Nodes are never freed, only detached, so an id stays valid for the
/// lifetime of its document and doubles as a weak reference: check
/// [`Document::is_connected`] before acting on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root (document) node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NotFound(NodeId),

    #[error("Hierarchy request error: {child} cannot be inserted into {parent}")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    #[error("Invalid node type for {0}")]
    InvalidNodeType(NodeId),

    #[error("{child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
}
