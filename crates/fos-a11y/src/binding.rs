//! Focus Scope Binding
//!
//! Drives a [`FocusScope`] from a renderer's commit cycle. The renderer
//! assigns the container through [`FocusScopeBinding::node_ref`], sets the
//! `trapped` flag and the auto-focus callbacks, and calls
//! [`FocusScopeBinding::commit`] after each render.
//!
//! Two effects run on commit:
//! - container: on a new container, listen for the lifecycle events and
//!   create the scope. When the container goes away the create listener is
//!   removed at once; destroying the scope and removing the destroy
//!   listener are deferred to the next turn of the event loop, in that
//!   order, so the destroy event still reaches the callback.
//! - trapped: keyed on the scope and the flag, traps the scope and untraps
//!   it on cleanup. Toggling never re-runs creation or destruction.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fos_dom::{Event, EventType, ListenerId, NodeId, Window};
use fos_observers::NodeRef;

use crate::{AUTOFOCUS_ON_CREATE, AUTOFOCUS_ON_DESTROY, FocusScope, FocusScopeRegistry};

type AutoFocusHandler = Rc<RefCell<Option<Box<dyn FnMut(&mut Event)>>>>;

struct Mounted {
    container: NodeId,
    scope: Option<FocusScope>,
    create_listener: ListenerId,
    destroy_listener: ListenerId,
}

/// Renderer-facing wrapper around a focus scope
pub struct FocusScopeBinding {
    registry: FocusScopeRegistry,
    window: Window,
    node_ref: NodeRef,
    trapped: Cell<bool>,
    on_mount_auto_focus: AutoFocusHandler,
    on_unmount_auto_focus: AutoFocusHandler,
    mounted: RefCell<Option<Mounted>>,
    trap_effect: RefCell<Option<FocusScope>>,
    unmounted: Cell<bool>,
}

// Forward a lifecycle event to whatever callback is current.
fn forward(handler: &AutoFocusHandler) -> impl Fn(&mut Event) + 'static {
    let handler = handler.clone();
    move |event: &mut Event| match handler.try_borrow_mut() {
        Ok(mut slot) => {
            if let Some(callback) = slot.as_mut() {
                callback(event);
            }
        }
        Err(_) => tracing::warn!("Re-entrant {} handler skipped", event.event_type.name()),
    }
}

impl FocusScopeBinding {
    pub fn new(registry: &FocusScopeRegistry) -> Self {
        Self {
            registry: registry.clone(),
            window: registry.window().clone(),
            node_ref: NodeRef::new(),
            trapped: Cell::new(false),
            on_mount_auto_focus: Rc::new(RefCell::new(None)),
            on_unmount_auto_focus: Rc::new(RefCell::new(None)),
            mounted: RefCell::new(None),
            trap_effect: RefCell::new(None),
            unmounted: Cell::new(false),
        }
    }

    /// Reference the renderer assigns the container element to
    pub fn node_ref(&self) -> &NodeRef {
        &self.node_ref
    }

    pub fn set_container(&self, container: Option<NodeId>) {
        self.node_ref.set(container);
    }

    pub fn set_trapped(&self, trapped: bool) {
        self.trapped.set(trapped);
    }

    /// Called before auto-focusing on creation; may cancel it
    pub fn set_on_mount_auto_focus(&self, callback: impl FnMut(&mut Event) + 'static) {
        self.replace_handler(&self.on_mount_auto_focus, Some(Box::new(callback)));
    }

    /// Called before restoring focus on destruction; may cancel it
    pub fn set_on_unmount_auto_focus(&self, callback: impl FnMut(&mut Event) + 'static) {
        self.replace_handler(&self.on_unmount_auto_focus, Some(Box::new(callback)));
    }

    pub fn clear_auto_focus_handlers(&self) {
        self.replace_handler(&self.on_mount_auto_focus, None);
        self.replace_handler(&self.on_unmount_auto_focus, None);
    }

    fn replace_handler(
        &self,
        handler: &AutoFocusHandler,
        callback: Option<Box<dyn FnMut(&mut Event)>>,
    ) {
        match handler.try_borrow_mut() {
            Ok(mut slot) => *slot = callback,
            Err(_) => tracing::warn!("Cannot replace an auto-focus handler while it runs"),
        }
    }

    /// Scope created for the current container
    pub fn scope(&self) -> Option<FocusScope> {
        self.mounted.borrow().as_ref().and_then(|m| m.scope.clone())
    }

    pub fn container(&self) -> Option<NodeId> {
        self.mounted.borrow().as_ref().map(|m| m.container)
    }

    /// Run effects after a render
    pub fn commit(&self) {
        self.sync_container();
        self.sync_trapped();
    }

    /// Run cleanups as the component leaves the tree
    pub fn unmount(&self) {
        if self.unmounted.replace(true) {
            return;
        }
        self.commit();
    }

    fn sync_container(&self) {
        let desired = if self.unmounted.get() {
            None
        } else {
            self.node_ref.get()
        };
        if self.container() == desired {
            return;
        }

        let previous = self.mounted.borrow_mut().take();
        if let Some(previous) = previous {
            self.release(previous);
        }
        if let Some(container) = desired {
            let mounted = self.mount(container);
            *self.mounted.borrow_mut() = Some(mounted);
        }
    }

    fn mount(&self, container: NodeId) -> Mounted {
        let create_listener = self.window.add_event_listener(
            container,
            EventType::custom(AUTOFOCUS_ON_CREATE),
            forward(&self.on_mount_auto_focus),
        );
        let destroy_listener = self.window.add_event_listener(
            container,
            EventType::custom(AUTOFOCUS_ON_DESTROY),
            forward(&self.on_unmount_auto_focus),
        );

        let scope = match self.registry.create_scope(container) {
            Ok(scope) => Some(scope),
            Err(err) => {
                tracing::warn!("Focus scope not created: {}", err);
                None
            }
        };
        tracing::debug!("Mounted focus scope binding on {}", container);
        Mounted {
            container,
            scope,
            create_listener,
            destroy_listener,
        }
    }

    fn release(&self, mounted: Mounted) {
        let Mounted {
            container,
            scope,
            create_listener,
            destroy_listener,
        } = mounted;
        self.window.remove_event_listener(create_listener);

        self.window.set_timeout(move || {
            if let Some(scope) = scope {
                if let Err(err) = scope.destroy() {
                    tracing::warn!("Deferred destroy failed: {}", err);
                }
            }
        });
        let window = self.window.downgrade();
        self.window.set_timeout(move || {
            if let Some(window) = window.upgrade() {
                window.remove_event_listener(destroy_listener);
            }
        });
        tracing::debug!("Unmounted focus scope binding from {}", container);
    }

    fn sync_trapped(&self) {
        let desired = self.scope().filter(|_| self.trapped.get());
        if *self.trap_effect.borrow() == desired {
            return;
        }

        let previous = self.trap_effect.borrow_mut().take();
        if let Some(previous) = previous {
            if let Err(err) = previous.untrap() {
                tracing::debug!("Untrap skipped: {}", err);
            }
        }
        if let Some(scope) = &desired {
            if let Err(err) = scope.trap() {
                tracing::warn!("Trap failed: {}", err);
            }
        }
        *self.trap_effect.borrow_mut() = desired;
    }
}

impl Drop for FocusScopeBinding {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl std::fmt::Debug for FocusScopeBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusScopeBinding")
            .field("container", &self.container())
            .field("trapped", &self.trapped.get())
            .finish_non_exhaustive()
    }
}
