//! Focus Scopes
//!
//! A focus scope keeps keyboard, pointer and programmatic focus inside a
//! container while it is trapped and active, and hands focus back to where
//! it came from when destroyed.
//!
//! Scopes live on a per-document stack. The most recently created scope is
//! the active one unless it is paused; scopes below it are implicitly
//! paused until the ones above them go away.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use fos_dom::{Event, EventType, ListenerId, MutationRecord, NodeId, Window};

use crate::{AUTOFOCUS_ON_CREATE, AUTOFOCUS_ON_DESTROY, ScopeError, ScopeResult};

struct StackInner {
    window: Window,
    stack: RefCell<Vec<Rc<ScopeState>>>,
}

impl StackInner {
    fn top(&self) -> Option<Rc<ScopeState>> {
        self.stack.borrow().last().cloned()
    }

    fn remove(&self, scope: &Rc<ScopeState>) {
        self.stack.borrow_mut().retain(|s| !Rc::ptr_eq(s, scope));
    }
}

/// Per-document stack of focus scopes
///
/// Clones share the same stack.
#[derive(Clone)]
pub struct FocusScopeRegistry {
    inner: Rc<StackInner>,
}

impl FocusScopeRegistry {
    pub fn new(window: &Window) -> Self {
        Self {
            inner: Rc::new(StackInner {
                window: window.clone(),
                stack: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn window(&self) -> &Window {
        &self.inner.window
    }

    /// Create a scope on `container` and auto-focus into it
    ///
    /// Focus before the call is remembered for restoration. The scope is
    /// pushed on the stack, then [`AUTOFOCUS_ON_CREATE`] is dispatched on
    /// the container; unless a listener cancels it, focus moves to the
    /// first tabbable descendant, or to the container itself when it can
    /// take focus.
    pub fn create_scope(&self, container: NodeId) -> ScopeResult<FocusScope> {
        let window = &self.inner.window;
        if !window.is_connected(container) {
            return Err(ScopeError::ContainerDetached(container));
        }
        if !window.is_element(container) {
            return Err(ScopeError::NotAnElement(container));
        }

        let state = Rc::new(ScopeState {
            container,
            window: window.clone(),
            registry: Rc::downgrade(&self.inner),
            trapped: Cell::new(false),
            paused: Cell::new(false),
            destroyed: Cell::new(false),
            pre_trap_focus: Cell::new(window.focused_element()),
            last_focused: Cell::new(None),
            listeners: RefCell::new(Vec::new()),
            mutation_listener: Cell::new(None),
        });
        self.inner.stack.borrow_mut().push(state.clone());
        tracing::debug!(
            "Created focus scope on {} (stack depth {})",
            container,
            self.len()
        );

        let mut event = Event::custom(AUTOFOCUS_ON_CREATE, true, true);
        if window.dispatch_event(container, &mut event) {
            state.focus_first();
        } else {
            tracing::debug!("Auto-focus on create canceled for {}", container);
        }
        if let Some(focused) = window.focused_element() {
            if window.contains(container, focused) {
                state.last_focused.set(Some(focused));
            }
        }

        Ok(FocusScope { state })
    }

    /// The scope currently enforcing its trap, if any
    pub fn active_scope(&self) -> Option<FocusScope> {
        self.inner
            .top()
            .filter(|s| !s.paused.get())
            .map(|state| FocusScope { state })
    }

    /// Number of live scopes on the stack
    pub fn len(&self) -> usize {
        self.inner.stack.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for FocusScopeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusScopeRegistry")
            .field("depth", &self.len())
            .finish()
    }
}

struct ScopeState {
    container: NodeId,
    window: Window,
    registry: Weak<StackInner>,
    trapped: Cell<bool>,
    paused: Cell<bool>,
    destroyed: Cell<bool>,
    pre_trap_focus: Cell<Option<NodeId>>,
    last_focused: Cell<Option<NodeId>>,
    listeners: RefCell<Vec<ListenerId>>,
    mutation_listener: Cell<Option<ListenerId>>,
}

impl ScopeState {
    fn is_active(self: &Rc<Self>) -> bool {
        if self.destroyed.get() || self.paused.get() {
            return false;
        }
        self.registry
            .upgrade()
            .and_then(|r| r.top())
            .is_some_and(|top| Rc::ptr_eq(&top, self))
    }

    fn tabbables(&self) -> Vec<NodeId> {
        self.window.tab_order(self.container)
    }

    fn focus_first(&self) {
        if let Some(&first) = self.tabbables().first() {
            self.window.focus(first);
        } else if self.window.is_focusable(self.container) {
            self.window.focus(self.container);
        }
    }

    fn on_key_down(self: &Rc<Self>, event: &mut Event) {
        if !self.is_active() {
            return;
        }
        let Some(key) = event.key() else {
            return;
        };
        if !key.is_sequential_navigation() {
            return;
        }
        let backwards = key.modifiers.shift;

        let tabbables = self.tabbables();
        let (Some(&first), Some(&last)) = (tabbables.first(), tabbables.last()) else {
            // Nothing to move to: keep focus where it is.
            event.prevent_default();
            return;
        };

        let focused = self.window.focused_element();
        let inside = focused.is_some_and(|f| self.window.contains(self.container, f));
        let target = match focused {
            _ if !inside => Some(if backwards { last } else { first }),
            Some(f) if backwards && (f == first || f == self.container) => Some(last),
            Some(f) if !backwards && f == last => Some(first),
            _ => None,
        };

        if let Some(target) = target {
            tracing::trace!("Wrapping focus in scope {} to {}", self.container, target);
            event.prevent_default();
            self.window.focus(target);
        }
    }

    fn on_focus_in(self: &Rc<Self>, event: &mut Event) {
        let target = event.target;
        if self.window.contains(self.container, target) {
            self.last_focused.set(Some(target));
            return;
        }
        if !self.is_active() {
            return;
        }

        let last = self
            .last_focused
            .get()
            .filter(|&n| self.window.contains(self.container, n) && self.window.is_focusable(n));
        let fallback = last
            .or_else(|| self.tabbables().first().copied())
            .or_else(|| {
                self.window
                    .is_focusable(self.container)
                    .then_some(self.container)
            });
        if let Some(node) = fallback {
            tracing::trace!("Focus escaped scope {} to {}, pulling back", self.container, target);
            self.window.focus(node);
        }
    }

    fn on_mouse_down(self: &Rc<Self>, event: &mut Event) {
        if self.is_active() && !self.window.contains(self.container, event.target) {
            tracing::trace!("Blocking pointer focus outside scope {}", self.container);
            event.prevent_default();
        }
    }

    // Focus fixup sends focus to the body when the focused element is
    // removed or disabled; bring it back inside.
    fn on_mutations(self: &Rc<Self>, records: &[MutationRecord]) {
        if !self.is_active() || self.window.focused_element().is_some() {
            return;
        }
        let lost = self
            .last_focused
            .get()
            .is_some_and(|n| !self.window.contains(self.container, n) || !self.window.is_focusable(n));
        if !lost || records.is_empty() {
            return;
        }
        tracing::trace!("Focused element left scope {}, refocusing", self.container);
        self.last_focused.set(None);
        if self.window.is_focusable(self.container) {
            self.window.focus(self.container);
        } else if let Some(&first) = self.tabbables().first() {
            self.window.focus(first);
        }
    }

    fn attach(self: &Rc<Self>) {
        let document = self.window.document_node();
        let mut listeners = self.listeners.borrow_mut();

        let weak = Rc::downgrade(self);
        listeners.push(self.window.add_event_listener(document, EventType::KeyDown, move |e| {
            if let Some(state) = weak.upgrade() {
                state.on_key_down(e);
            }
        }));
        let weak = Rc::downgrade(self);
        listeners.push(self.window.add_event_listener(document, EventType::FocusIn, move |e| {
            if let Some(state) = weak.upgrade() {
                state.on_focus_in(e);
            }
        }));
        let weak = Rc::downgrade(self);
        listeners.push(self.window.add_event_listener(document, EventType::MouseDown, move |e| {
            if let Some(state) = weak.upgrade() {
                state.on_mouse_down(e);
            }
        }));

        let weak = Rc::downgrade(self);
        let mutations = self.window.add_mutation_listener(move |records| {
            if let Some(state) = weak.upgrade() {
                state.on_mutations(records);
            }
        });
        self.mutation_listener.set(Some(mutations));
    }

    fn detach(&self) {
        for id in self.listeners.borrow_mut().drain(..) {
            self.window.remove_event_listener(id);
        }
        if let Some(id) = self.mutation_listener.take() {
            self.window.remove_mutation_listener(id);
        }
    }

    fn ensure_live(&self) -> ScopeResult<()> {
        if self.destroyed.get() {
            Err(ScopeError::AlreadyDestroyed(self.container))
        } else {
            Ok(())
        }
    }
}

/// Handle to a focus scope
///
/// Clones refer to the same scope. Dropping handles does not destroy the
/// scope; call [`FocusScope::destroy`].
#[derive(Clone)]
pub struct FocusScope {
    state: Rc<ScopeState>,
}

impl FocusScope {
    pub fn container(&self) -> NodeId {
        self.state.container
    }

    /// Element focused before the scope was created (`None`: the body)
    pub fn pre_trap_focus(&self) -> Option<NodeId> {
        self.state.pre_trap_focus.get()
    }

    pub fn is_trapped(&self) -> bool {
        self.state.trapped.get()
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.destroyed.get()
    }

    /// Top of the stack and not paused
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Start containing focus. No-op when already trapped.
    pub fn trap(&self) -> ScopeResult<()> {
        self.state.ensure_live()?;
        if self.state.trapped.replace(true) {
            return Ok(());
        }
        self.state.attach();
        tracing::debug!("Trapped focus in {}", self.state.container);
        Ok(())
    }

    /// Stop containing focus. No-op when not trapped.
    pub fn untrap(&self) -> ScopeResult<()> {
        self.state.ensure_live()?;
        if !self.state.trapped.replace(false) {
            return Ok(());
        }
        self.state.detach();
        tracing::debug!("Released focus trap in {}", self.state.container);
        Ok(())
    }

    pub fn pause(&self) -> ScopeResult<()> {
        self.state.ensure_live()?;
        if !self.state.paused.replace(true) {
            tracing::debug!("Paused focus scope {}", self.state.container);
        }
        Ok(())
    }

    pub fn resume(&self) -> ScopeResult<()> {
        self.state.ensure_live()?;
        if self.state.paused.replace(false) {
            tracing::debug!("Resumed focus scope {}", self.state.container);
        }
        Ok(())
    }

    /// Tear the scope down and restore focus
    ///
    /// [`AUTOFOCUS_ON_DESTROY`] is dispatched on the container first. Unless
    /// it is canceled, focus goes back to the element focused before the
    /// scope was created if it is still connected and focusable, else to
    /// the body. A paused scope leaves focus alone while another scope is
    /// active.
    pub fn destroy(&self) -> ScopeResult<()> {
        let state = &self.state;
        if state.destroyed.replace(true) {
            return Err(ScopeError::AlreadyDestroyed(state.container));
        }
        let window = &state.window;

        let mut event = Event::custom(AUTOFOCUS_ON_DESTROY, true, true);
        let restore = window.dispatch_event(state.container, &mut event);

        state.detach();
        state.trapped.set(false);

        let registry = state.registry.upgrade();
        let other_active = registry
            .as_ref()
            .and_then(|r| r.top())
            .is_some_and(|top| !Rc::ptr_eq(&top, state) && !top.paused.get());
        if let Some(registry) = &registry {
            registry.remove(state);
        }

        if !restore {
            tracing::debug!("Focus restoration canceled for {}", state.container);
        } else if other_active {
            tracing::debug!(
                "Skipping focus restoration for paused scope {}",
                state.container
            );
        } else {
            match state
                .pre_trap_focus
                .get()
                .filter(|&n| window.is_focusable(n))
            {
                Some(previous) => {
                    window.focus(previous);
                }
                None => window.blur(),
            }
        }

        tracing::debug!("Destroyed focus scope on {}", state.container);
        Ok(())
    }
}

impl PartialEq for FocusScope {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl std::fmt::Debug for FocusScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusScope")
            .field("container", &self.state.container)
            .field("trapped", &self.state.trapped.get())
            .field("paused", &self.state.paused.get())
            .field("destroyed", &self.state.destroyed.get())
            .finish()
    }
}
