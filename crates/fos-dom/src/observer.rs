//! DOM Observers
//!
//! Mutation records and the ResizeObserver primitive.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::geometry::DOMRect;
use crate::{NodeId, Size, WeakWindow, Window};

/// Mutation record
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord {
    pub mutation_type: MutationType,
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub attribute_name: Option<String>,
    pub old_value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    Attributes,
    ChildList,
}

impl MutationRecord {
    pub(crate) fn child_added(parent: NodeId, child: NodeId) -> Self {
        Self {
            mutation_type: MutationType::ChildList,
            target: parent,
            added_nodes: vec![child],
            removed_nodes: Vec::new(),
            attribute_name: None,
            old_value: None,
        }
    }

    pub(crate) fn child_removed(parent: NodeId, child: NodeId) -> Self {
        Self {
            mutation_type: MutationType::ChildList,
            target: parent,
            added_nodes: Vec::new(),
            removed_nodes: vec![child],
            attribute_name: None,
            old_value: None,
        }
    }

    pub(crate) fn attribute(target: NodeId, name: &str, old_value: Option<String>) -> Self {
        Self {
            mutation_type: MutationType::Attributes,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            attribute_name: Some(name.to_string()),
            old_value,
        }
    }
}

/// Which box a resize observation measures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResizeObserverBoxOptions {
    #[default]
    ContentBox,
    BorderBox,
}

/// Observed element size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeObserverSize {
    pub inline_size: f64,
    pub block_size: f64,
}

impl From<Size> for ResizeObserverSize {
    fn from(size: Size) -> Self {
        Self {
            inline_size: size.width,
            block_size: size.height,
        }
    }
}

/// Box sizes as the host reports them
#[derive(Debug, Clone, PartialEq)]
pub enum BoxSizes {
    /// One record per fragment
    Sequence(Vec<ResizeObserverSize>),
    /// Legacy single record
    Single(ResizeObserverSize),
}

impl BoxSizes {
    /// First fragment's size
    pub fn first(&self) -> Option<ResizeObserverSize> {
        match self {
            Self::Sequence(list) => list.first().copied(),
            Self::Single(size) => Some(*size),
        }
    }
}

/// Resize observer entry
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeObserverEntry {
    pub target: NodeId,
    pub content_rect: DOMRect,
    /// `None` on hosts without border-box reporting
    pub border_box_size: Option<BoxSizes>,
    pub content_box_size: Option<BoxSizes>,
}

pub(crate) type ResizeCallback = Rc<dyn Fn(&[ResizeObserverEntry])>;

#[derive(Debug)]
pub(crate) struct ObservationTarget {
    pub(crate) node: NodeId,
    pub(crate) options: ResizeObserverBoxOptions,
    pub(crate) last_size: Option<Size>,
}

pub(crate) struct ObserverSlot {
    pub(crate) callback: ResizeCallback,
    pub(crate) targets: Vec<ObservationTarget>,
}

/// Window-side bookkeeping for every live ResizeObserver
#[derive(Default)]
pub(crate) struct ResizeObserverRegistry {
    pub(crate) slots: BTreeMap<u64, ObserverSlot>,
}

impl ResizeObserverRegistry {
    pub(crate) fn observe(&mut self, observer: u64, node: NodeId, options: ResizeObserverBoxOptions) {
        let Some(slot) = self.slots.get_mut(&observer) else {
            return;
        };
        // Re-observing replaces options and forces a fresh first delivery.
        slot.targets.retain(|t| t.node != node);
        slot.targets.push(ObservationTarget {
            node,
            options,
            last_size: None,
        });
    }

    pub(crate) fn unobserve(&mut self, observer: u64, node: NodeId) {
        if let Some(slot) = self.slots.get_mut(&observer) {
            slot.targets.retain(|t| t.node != node);
        }
    }

    pub(crate) fn observation_count(&self, node: NodeId) -> usize {
        self.slots
            .values()
            .flat_map(|s| s.targets.iter())
            .filter(|t| t.node == node)
            .count()
    }
}

/// ResizeObserver - notifies when observed element boxes change size
///
/// Entries are delivered during the window's rendering update. The first
/// update after `observe` always delivers an entry for the target.
/// Dropping the observer disconnects it.
pub struct ResizeObserver {
    id: u64,
    window: WeakWindow,
}

impl ResizeObserver {
    pub fn new(window: &Window, callback: impl Fn(&[ResizeObserverEntry]) + 'static) -> Self {
        let id = window.register_resize_observer(Rc::new(callback));
        Self {
            id,
            window: window.downgrade(),
        }
    }

    /// Observe an element
    pub fn observe(&self, target: NodeId, options: ResizeObserverBoxOptions) {
        if let Some(window) = self.window.upgrade() {
            window.resize_registry_mut().observe(self.id, target, options);
            window.invalidate_layout();
        }
    }

    /// Stop observing an element
    pub fn unobserve(&self, target: NodeId) {
        if let Some(window) = self.window.upgrade() {
            window.resize_registry_mut().unobserve(self.id, target);
        }
    }

    /// Stop observing every element
    pub fn disconnect(&self) {
        if let Some(window) = self.window.upgrade() {
            if let Some(slot) = window.resize_registry_mut().slots.get_mut(&self.id) {
                slot.targets.clear();
            }
        }
    }
}

impl Drop for ResizeObserver {
    fn drop(&mut self) {
        if let Some(window) = self.window.upgrade() {
            window.resize_registry_mut().slots.remove(&self.id);
        }
    }
}

impl std::fmt::Debug for ResizeObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResizeObserver").field("id", &self.id).finish()
    }
}
