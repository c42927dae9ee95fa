//! fOS Accessibility
//!
//! Focus containment for accessible widgets.
//!
//! Features:
//! - Focus scopes: trap Tab/Shift+Tab, pointer and programmatic focus
//!   inside a container, restore focus on teardown
//! - Per-document scope stack with pause/resume for nested scopes
//! - Binding that drives a scope from a renderer's commit cycle

pub mod binding;
pub mod scope;

pub use binding::FocusScopeBinding;
pub use scope::{FocusScope, FocusScopeRegistry};

use fos_dom::NodeId;

/// Dispatched on the container before auto-focusing on creation
pub const AUTOFOCUS_ON_CREATE: &str = "focusScope.autoFocusOnCreate";

/// Dispatched on the container before restoring focus on destruction
pub const AUTOFOCUS_ON_DESTROY: &str = "focusScope.autoFocusOnDestroy";

/// Focus scope error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("Focus scope container {0} is not attached to a document")]
    ContainerDetached(NodeId),

    #[error("Focus scope container {0} is not an element")]
    NotAnElement(NodeId),

    #[error("Focus scope on {0} was already destroyed")]
    AlreadyDestroyed(NodeId),
}

pub type ScopeResult<T> = Result<T, ScopeError>;
