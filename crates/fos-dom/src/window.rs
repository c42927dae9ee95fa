//! Window
//!
//! The browsing context a document lives in: focus, event dispatch,
//! keyboard/pointer default actions, layout geometry, observer delivery,
//! the commit hook and a single-threaded task queue.
//!
//! `Window` is a cheap `Rc` handle. Listeners and hooks are invoked with no
//! interior borrow held, so they may call back into the window freely.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

use crate::events::{Event, EventType, KeyboardEvent, ListenerId};
use crate::focus;
use crate::observer::{
    BoxSizes, MutationRecord, ObserverSlot, ResizeCallback, ResizeObserverBoxOptions,
    ResizeObserverEntry, ResizeObserverRegistry, ResizeObserverSize,
};
use crate::{BoxSizeReporting, DOMRect, DomResult, Document, LayoutBox, NodeId, Size, WindowConfig};

/// Identifier of a queued task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

type Listener = Rc<dyn Fn(&mut Event)>;
type Hook = Rc<dyn Fn()>;
type MutationListener = Rc<dyn Fn(&[MutationRecord])>;
type Task = Box<dyn FnOnce()>;

// Upper bound on turns `run_until_idle` spins before giving up.
const MAX_IDLE_TURNS: usize = 10_000;

struct EventListenerEntry {
    id: ListenerId,
    target: NodeId,
    event_type: EventType,
    callback: Listener,
}

struct WindowInner {
    config: WindowConfig,
    document: RefCell<Document>,
    focused: Cell<Option<NodeId>>,
    scroll: Cell<(f64, f64)>,
    viewport: Cell<Size>,
    layout: RefCell<HashMap<NodeId, LayoutBox>>,
    layout_dirty: Cell<bool>,
    listeners: RefCell<Vec<EventListenerEntry>>,
    layout_listeners: RefCell<Vec<(ListenerId, Hook)>>,
    mutation_listeners: RefCell<Vec<(ListenerId, MutationListener)>>,
    commit_hooks: RefCell<Vec<(ListenerId, Hook)>>,
    pending_mutations: RefCell<Vec<MutationRecord>>,
    tasks: RefCell<VecDeque<(TaskId, Task)>>,
    resize_observers: RefCell<ResizeObserverRegistry>,
    next_id: Cell<u64>,
}

/// Shared handle to a window and its document
#[derive(Clone)]
pub struct Window {
    inner: Rc<WindowInner>,
}

/// Non-owning window handle
#[derive(Clone)]
pub struct WeakWindow {
    inner: Weak<WindowInner>,
}

impl WeakWindow {
    pub fn upgrade(&self) -> Option<Window> {
        self.inner.upgrade().map(|inner| Window { inner })
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::new(WindowConfig::default())
    }
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("url", &self.inner.config.url)
            .field("focused", &self.inner.focused.get())
            .finish_non_exhaustive()
    }
}

impl Window {
    /// Create a window with a fresh html/head/body document
    pub fn new(config: WindowConfig) -> Self {
        let document = Document::new(&config.url);
        let viewport = config.viewport;
        tracing::debug!("Created window for {}", config.url);
        Self {
            inner: Rc::new(WindowInner {
                config,
                document: RefCell::new(document),
                focused: Cell::new(None),
                scroll: Cell::new((0.0, 0.0)),
                viewport: Cell::new(viewport),
                layout: RefCell::new(HashMap::new()),
                layout_dirty: Cell::new(false),
                listeners: RefCell::new(Vec::new()),
                layout_listeners: RefCell::new(Vec::new()),
                mutation_listeners: RefCell::new(Vec::new()),
                commit_hooks: RefCell::new(Vec::new()),
                pending_mutations: RefCell::new(Vec::new()),
                tasks: RefCell::new(VecDeque::new()),
                resize_observers: RefCell::new(ResizeObserverRegistry::default()),
                next_id: Cell::new(1),
            }),
        }
    }

    pub fn config(&self) -> &WindowConfig {
        &self.inner.config
    }

    pub fn downgrade(&self) -> WeakWindow {
        WeakWindow {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Same underlying window?
    pub fn ptr_eq(&self, other: &Window) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn next_id(&self) -> u64 {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        id
    }

    // ------------------------------------------------------------------
    // Document access
    // ------------------------------------------------------------------

    /// Read the document. The borrow must not be held across calls that
    /// mutate the tree.
    pub fn with_document<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.inner.document.borrow())
    }

    fn document(&self) -> Ref<'_, Document> {
        self.inner.document.borrow()
    }

    /// The document node (target for document-level listeners)
    pub fn document_node(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn body(&self) -> NodeId {
        self.document().body()
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.document().get_element_by_id(id)
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.document().is_connected(node)
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.document().is_element(node)
    }

    /// Inclusive containment
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.document().tree().contains(ancestor, node)
    }

    pub fn is_focusable(&self, node: NodeId) -> bool {
        focus::is_focusable(&self.document(), node)
    }

    /// Tabbable descendants of `root` in native order, computed now
    pub fn tab_order(&self, root: NodeId) -> Vec<NodeId> {
        focus::tab_order(&self.document(), root)
    }

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.document()
            .element(node)
            .and_then(|el| el.get_attr(name))
            .map(str::to_string)
    }

    // ------------------------------------------------------------------
    // Tree mutation
    // ------------------------------------------------------------------

    pub fn create_element(&self, tag: &str) -> NodeId {
        self.inner.document.borrow_mut().tree_mut().create_element(tag)
    }

    pub fn create_text(&self, content: &str) -> NodeId {
        self.inner.document.borrow_mut().tree_mut().create_text(content)
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    pub fn insert_before(
        &self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        let old_parent = self.document().tree().parent(child);
        self.inner
            .document
            .borrow_mut()
            .tree_mut()
            .insert_before(parent, child, reference)?;
        if let Some(old) = old_parent {
            self.queue_mutation(MutationRecord::child_removed(old, child));
        }
        self.queue_mutation(MutationRecord::child_added(parent, child));
        self.after_mutation();
        Ok(())
    }

    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.inner
            .document
            .borrow_mut()
            .tree_mut()
            .remove_child(parent, child)?;
        self.queue_mutation(MutationRecord::child_removed(parent, child));
        self.after_mutation();
        Ok(())
    }

    /// Detach a node from wherever it is; no-op when already detached
    pub fn remove(&self, node: NodeId) -> DomResult<()> {
        let parent = self.document().tree().parent(node);
        match parent {
            Some(parent) => self.remove_child(parent, node),
            None => Ok(()),
        }
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> DomResult<()> {
        let old = {
            let mut doc = self.inner.document.borrow_mut();
            let el = doc
                .tree_mut()
                .get_mut(node)
                .and_then(|n| n.as_element_mut())
                .ok_or(crate::DomError::InvalidNodeType(node))?;
            el.set_attr(name, value)
        };
        self.queue_mutation(MutationRecord::attribute(node, name, old));
        self.after_mutation();
        Ok(())
    }

    pub fn remove_attribute(&self, node: NodeId, name: &str) -> DomResult<()> {
        let old = {
            let mut doc = self.inner.document.borrow_mut();
            let el = doc
                .tree_mut()
                .get_mut(node)
                .and_then(|n| n.as_element_mut())
                .ok_or(crate::DomError::InvalidNodeType(node))?;
            el.remove_attr(name)
        };
        if old.is_some() {
            self.queue_mutation(MutationRecord::attribute(node, name, old));
            self.after_mutation();
        }
        Ok(())
    }

    fn queue_mutation(&self, record: MutationRecord) {
        self.inner.pending_mutations.borrow_mut().push(record);
    }

    fn after_mutation(&self) {
        self.invalidate_layout();
        self.fixup_focus();
    }

    // Focus fixup: a focused element that stops being focusable (removed,
    // disabled, hidden) silently hands focus back to the body.
    fn fixup_focus(&self) {
        if let Some(focused) = self.inner.focused.get() {
            if !self.is_focusable(focused) {
                tracing::trace!("Focus fixup: {} no longer focusable", focused);
                self.inner.focused.set(None);
            }
        }
    }

    // ------------------------------------------------------------------
    // Focus
    // ------------------------------------------------------------------

    /// Currently focused element, `None` when focus is on the body
    pub fn focused_element(&self) -> Option<NodeId> {
        self.inner.focused.get()
    }

    /// `document.activeElement`: the focused element or the body
    pub fn active_element(&self) -> NodeId {
        self.inner.focused.get().unwrap_or_else(|| self.body())
    }

    /// Focus an element. Returns `false` (and leaves focus alone) when the
    /// element cannot take focus.
    pub fn focus(&self, node: NodeId) -> bool {
        if !self.is_focusable(node) {
            tracing::trace!("Ignoring focus() on unfocusable {}", node);
            return false;
        }
        let previous = self.inner.focused.get();
        if previous == Some(node) {
            return true;
        }
        self.inner.focused.set(Some(node));
        tracing::trace!("Focus {:?} -> {}", previous, node);
        if let Some(prev) = previous {
            self.dispatch_event(prev, &mut Event::focus_out(Some(node)));
        }
        self.dispatch_event(node, &mut Event::focus_in(previous));
        true
    }

    /// Move focus to the body
    pub fn blur(&self) {
        if let Some(prev) = self.inner.focused.take() {
            tracing::trace!("Blur {}", prev);
            self.dispatch_event(prev, &mut Event::focus_out(None));
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn add_event_listener(
        &self,
        target: NodeId,
        event_type: EventType,
        listener: impl Fn(&mut Event) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id());
        self.inner.listeners.borrow_mut().push(EventListenerEntry {
            id,
            target,
            event_type,
            callback: Rc::new(listener),
        });
        id
    }

    /// Remove a listener; `false` if it was not registered
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    pub fn has_event_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.borrow().iter().any(|l| l.id == id)
    }

    /// Number of listeners registered on `target` for `event_type`
    pub fn listener_count(&self, target: NodeId, event_type: &EventType) -> usize {
        self.inner
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.target == target && &l.event_type == event_type)
            .count()
    }

    /// Dispatch an event at `target`, bubbling to the document node when
    /// the event bubbles. Returns `false` if a listener canceled it.
    pub fn dispatch_event(&self, target: NodeId, event: &mut Event) -> bool {
        event.target = target;
        let path: Vec<NodeId> = if event.bubbles {
            let doc = self.document();
            std::iter::once(target).chain(doc.tree().ancestors(target)).collect()
        } else {
            vec![target]
        };

        for node in path {
            event.current_target = Some(node);
            let matching: Vec<(ListenerId, Listener)> = self
                .inner
                .listeners
                .borrow()
                .iter()
                .filter(|l| l.target == node && l.event_type == event.event_type)
                .map(|l| (l.id, l.callback.clone()))
                .collect();
            for (id, callback) in matching {
                // Listeners removed by an earlier listener are skipped.
                if self.has_event_listener(id) {
                    callback(event);
                }
            }
            if event.is_propagation_stopped() {
                break;
            }
        }
        event.current_target = None;
        !event.is_default_prevented()
    }

    /// Deliver a key press to the focused element (or body) and run the
    /// default action: sequential focus navigation on Tab/Shift+Tab.
    pub fn key_down(&self, key: KeyboardEvent) -> bool {
        let target = self.active_element();
        let navigate = key.is_sequential_navigation();
        let forward = !key.modifiers.shift;
        let mut event = Event::key_down(key);
        let proceed = self.dispatch_event(target, &mut event);
        if proceed && navigate {
            self.navigate_sequential(forward);
        }
        proceed
    }

    /// Press on `target`; unless canceled, focuses the nearest focusable
    /// ancestor or blurs to the body.
    pub fn mouse_down(&self, target: NodeId) -> bool {
        let proceed = self.dispatch_event(target, &mut Event::mouse_down());
        if proceed {
            let focus_target = focus::focusable_ancestor(&self.document(), target);
            match focus_target {
                Some(node) => {
                    self.focus(node);
                }
                None => self.blur(),
            }
        }
        proceed
    }

    fn navigate_sequential(&self, forward: bool) {
        let next = {
            let doc = self.document();
            let order = focus::tab_order(&doc, doc.root());
            let current = self.inner.focused.get();
            let position = current.and_then(|c| order.iter().position(|&n| n == c));
            let candidate = match (current, position) {
                (_, Some(i)) if forward => order.get(i + 1).copied(),
                (_, Some(i)) => i.checked_sub(1).and_then(|j| order.get(j)).copied(),
                (None, None) if forward => order.first().copied(),
                (None, None) => order.last().copied(),
                // Starting from an element outside the tab order: continue
                // from its place in the tree.
                (Some(c), None) => {
                    let tree_order = doc.tree().descendants(doc.root());
                    let index_of = |n: NodeId| tree_order.iter().position(|&t| t == n);
                    let here = index_of(c);
                    if forward {
                        order.iter().copied().find(|&n| index_of(n) > here)
                    } else {
                        order.iter().rev().copied().find(|&n| index_of(n) < here)
                    }
                }
            };
            match candidate {
                None if self.inner.config.wrap_sequential_navigation => {
                    if forward { order.first().copied() } else { order.last().copied() }
                }
                other => other,
            }
        };
        match next {
            Some(node) => {
                self.focus(node);
            }
            // Focus leaves the document.
            None => self.blur(),
        }
    }

    // ------------------------------------------------------------------
    // Layout geometry
    // ------------------------------------------------------------------

    /// Record the layout engine's result for an element
    pub fn set_layout(&self, node: NodeId, layout: LayoutBox) {
        self.inner.layout.borrow_mut().insert(node, layout);
        self.invalidate_layout();
    }

    pub fn layout_box(&self, node: NodeId) -> Option<LayoutBox> {
        self.inner.layout.borrow().get(&node).copied()
    }

    /// `getBoundingClientRect()`: border box relative to the viewport,
    /// zero-sized when never laid out, `None` when detached
    pub fn bounding_client_rect(&self, node: NodeId) -> Option<DOMRect> {
        if !self.is_connected(node) {
            return None;
        }
        let (sx, sy) = self.inner.scroll.get();
        let border_box = self.layout_box(node).map(|l| l.border_box).unwrap_or_default();
        Some(border_box.translate(-sx, -sy))
    }

    pub fn scroll_to(&self, x: f64, y: f64) {
        self.inner.scroll.set((x.max(0.0), y.max(0.0)));
        self.invalidate_layout();
    }

    pub fn scroll_position(&self) -> (f64, f64) {
        self.inner.scroll.get()
    }

    pub fn resize_viewport(&self, size: Size) {
        self.inner.viewport.set(size);
        self.invalidate_layout();
    }

    pub fn viewport(&self) -> Size {
        self.inner.viewport.get()
    }

    /// Mark geometry as changed; observers run on the next rendering update
    pub fn invalidate_layout(&self) {
        self.inner.layout_dirty.set(true);
    }

    /// Register for resize/scroll/mutation geometry signals
    pub fn add_layout_listener(&self, listener: impl Fn() + 'static) -> ListenerId {
        let id = ListenerId(self.next_id());
        self.inner
            .layout_listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        id
    }

    pub fn remove_layout_listener(&self, id: ListenerId) -> bool {
        remove_by_id(&self.inner.layout_listeners, id)
    }

    pub fn layout_listener_count(&self) -> usize {
        self.inner.layout_listeners.borrow().len()
    }

    /// Run observers if geometry changed since the last update
    pub fn update_rendering(&self) {
        if !self.inner.layout_dirty.replace(false) {
            return;
        }
        let listeners: Vec<(ListenerId, Hook)> = self.inner.layout_listeners.borrow().clone();
        for (id, listener) in listeners {
            let live = self
                .inner
                .layout_listeners
                .borrow()
                .iter()
                .any(|(l, _)| *l == id);
            if live {
                listener();
            }
        }
        self.deliver_resize_observations();
    }

    // ------------------------------------------------------------------
    // Mutation observation
    // ------------------------------------------------------------------

    /// Receive batches of mutation records at the next checkpoint
    pub fn add_mutation_listener(
        &self,
        listener: impl Fn(&[MutationRecord]) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id());
        self.inner
            .mutation_listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        id
    }

    pub fn remove_mutation_listener(&self, id: ListenerId) -> bool {
        remove_by_id(&self.inner.mutation_listeners, id)
    }

    fn flush_mutations(&self) {
        let records = std::mem::take(&mut *self.inner.pending_mutations.borrow_mut());
        if records.is_empty() {
            return;
        }
        let listeners: Vec<(ListenerId, MutationListener)> =
            self.inner.mutation_listeners.borrow().clone();
        for (id, listener) in listeners {
            let live = self
                .inner
                .mutation_listeners
                .borrow()
                .iter()
                .any(|(l, _)| *l == id);
            if live {
                listener(&records);
            }
        }
    }

    // ------------------------------------------------------------------
    // Resize observation
    // ------------------------------------------------------------------

    pub(crate) fn register_resize_observer(&self, callback: ResizeCallback) -> u64 {
        let id = self.next_id();
        self.inner.resize_observers.borrow_mut().slots.insert(
            id,
            ObserverSlot {
                callback,
                targets: Vec::new(),
            },
        );
        id
    }

    pub(crate) fn resize_registry_mut(&self) -> RefMut<'_, ResizeObserverRegistry> {
        self.inner.resize_observers.borrow_mut()
    }

    /// Physical resize observations registered on `node` across observers
    pub fn resize_observation_count(&self, node: NodeId) -> usize {
        self.inner.resize_observers.borrow().observation_count(node)
    }

    fn box_sizes(&self, size: Size) -> Option<BoxSizes> {
        let size = ResizeObserverSize::from(size);
        match self.inner.config.border_box_reporting {
            BoxSizeReporting::Sequence => Some(BoxSizes::Sequence(vec![size])),
            BoxSizeReporting::Single => Some(BoxSizes::Single(size)),
            BoxSizeReporting::Unsupported => None,
        }
    }

    fn deliver_resize_observations(&self) {
        let mut batches: Vec<(ResizeCallback, Vec<ResizeObserverEntry>)> = Vec::new();
        {
            let doc = self.document();
            let layout = self.inner.layout.borrow();
            let mut registry = self.inner.resize_observers.borrow_mut();
            for slot in registry.slots.values_mut() {
                let mut entries = Vec::new();
                for target in slot.targets.iter_mut() {
                    if !doc.is_connected(target.node) {
                        continue;
                    }
                    let layout_box = layout.get(&target.node).copied().unwrap_or_default();
                    let observed = match target.options {
                        ResizeObserverBoxOptions::BorderBox => layout_box.border_box_size(),
                        ResizeObserverBoxOptions::ContentBox => layout_box.content_box_size(),
                    };
                    if target.last_size == Some(observed) {
                        continue;
                    }
                    target.last_size = Some(observed);
                    entries.push(ResizeObserverEntry {
                        target: target.node,
                        content_rect: layout_box.content_rect(),
                        border_box_size: self.box_sizes(layout_box.border_box_size()),
                        content_box_size: self.box_sizes(layout_box.content_box_size()),
                    });
                }
                if !entries.is_empty() {
                    batches.push((slot.callback.clone(), entries));
                }
            }
        }
        for (callback, entries) in batches {
            callback(&entries);
        }
    }

    // ------------------------------------------------------------------
    // Commit hook
    // ------------------------------------------------------------------

    /// Run `hook` after every DOM commit of the host renderer
    pub fn on_commit(&self, hook: impl Fn() + 'static) -> ListenerId {
        let id = ListenerId(self.next_id());
        self.inner.commit_hooks.borrow_mut().push((id, Rc::new(hook)));
        id
    }

    pub fn remove_commit_hook(&self, id: ListenerId) -> bool {
        remove_by_id(&self.inner.commit_hooks, id)
    }

    /// Signal that the host renderer committed its DOM changes
    pub fn commit(&self) {
        let hooks: Vec<(ListenerId, Hook)> = self.inner.commit_hooks.borrow().clone();
        for (id, hook) in hooks {
            let live = self.inner.commit_hooks.borrow().iter().any(|(h, _)| *h == id);
            if live {
                hook();
            }
        }
    }

    // ------------------------------------------------------------------
    // Event loop
    // ------------------------------------------------------------------

    /// Queue a task for a later turn of the event loop
    pub fn set_timeout(&self, task: impl FnOnce() + 'static) -> TaskId {
        let id = TaskId(self.next_id());
        self.inner.tasks.borrow_mut().push_back((id, Box::new(task)));
        id
    }

    /// Cancel a queued task; `false` if it already ran or never existed
    pub fn clear_timeout(&self, id: TaskId) -> bool {
        let mut tasks = self.inner.tasks.borrow_mut();
        let before = tasks.len();
        tasks.retain(|(t, _)| *t != id);
        tasks.len() != before
    }

    pub fn pending_tasks(&self) -> usize {
        self.inner.tasks.borrow().len()
    }

    /// One turn: deliver mutation records, run the tasks queued before the
    /// turn started (tasks they queue wait for the next turn), then the
    /// rendering update.
    pub fn tick(&self) {
        self.flush_mutations();
        let due: Vec<TaskId> = self.inner.tasks.borrow().iter().map(|(id, _)| *id).collect();
        for id in due {
            let task = {
                let mut tasks = self.inner.tasks.borrow_mut();
                tasks
                    .iter()
                    .position(|(t, _)| *t == id)
                    .and_then(|pos| tasks.remove(pos))
            };
            if let Some((_, task)) = task {
                task();
                self.flush_mutations();
            }
        }
        self.update_rendering();
    }

    /// Turn the event loop until nothing is pending
    pub fn run_until_idle(&self) {
        for _ in 0..MAX_IDLE_TURNS {
            let idle = self.inner.tasks.borrow().is_empty()
                && self.inner.pending_mutations.borrow().is_empty()
                && !self.inner.layout_dirty.get();
            if idle {
                return;
            }
            self.tick();
        }
        tracing::warn!("Event loop still busy after {} turns", MAX_IDLE_TURNS);
    }
}

fn remove_by_id<T>(list: &RefCell<Vec<(ListenerId, T)>>, id: ListenerId) -> bool {
    let mut list = list.borrow_mut();
    let before = list.len();
    list.retain(|(l, _)| *l != id);
    list.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResizeObserver;

    fn button(window: &Window, parent: NodeId) -> NodeId {
        let id = window.create_element("button");
        window.append_child(parent, id).unwrap();
        id
    }

    #[test]
    fn test_focus_dispatches_focusin_and_focusout() {
        let window = Window::default();
        let body = window.body();
        let a = button(&window, body);
        let b = button(&window, body);
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = log.clone();
        window.add_event_listener(window.document_node(), EventType::FocusIn, move |e| {
            l.borrow_mut().push(("in", e.target, e.related_target));
        });
        let l = log.clone();
        window.add_event_listener(window.document_node(), EventType::FocusOut, move |e| {
            l.borrow_mut().push(("out", e.target, e.related_target));
        });

        assert!(window.focus(a));
        assert!(window.focus(b));
        assert_eq!(
            *log.borrow(),
            vec![("in", a, None), ("out", a, Some(b)), ("in", b, Some(a))]
        );
        assert_eq!(window.active_element(), b);
    }

    #[test]
    fn test_focus_rejects_unfocusable() {
        let window = Window::default();
        let div = window.create_element("div");
        window.append_child(window.body(), div).unwrap();
        assert!(!window.focus(div));
        assert_eq!(window.active_element(), window.body());
    }

    #[test]
    fn test_dispatch_bubbles_and_cancels() {
        let window = Window::default();
        let body = window.body();
        let outer = window.create_element("div");
        window.append_child(body, outer).unwrap();
        let inner = button(&window, outer);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let s = seen.clone();
        window.add_event_listener(outer, EventType::custom("ping"), move |e| {
            s.borrow_mut().push(e.current_target);
            e.prevent_default();
        });
        let mut event = Event::custom("ping", true, true);
        assert!(!window.dispatch_event(inner, &mut event));
        assert_eq!(*seen.borrow(), vec![Some(outer)]);
    }

    #[test]
    fn test_stop_propagation() {
        let window = Window::default();
        let body = window.body();
        let inner = button(&window, body);
        let reached = Rc::new(Cell::new(false));

        window.add_event_listener(inner, EventType::custom("x"), |e| e.stop_propagation());
        let r = reached.clone();
        window.add_event_listener(body, EventType::custom("x"), move |_| r.set(true));
        window.dispatch_event(inner, &mut Event::custom("x", true, false));
        assert!(!reached.get());
    }

    #[test]
    fn test_tab_navigation_default_action() {
        let window = Window::default();
        let body = window.body();
        let a = button(&window, body);
        let b = button(&window, body);

        window.key_down(KeyboardEvent::tab());
        assert_eq!(window.focused_element(), Some(a));
        window.key_down(KeyboardEvent::tab());
        assert_eq!(window.focused_element(), Some(b));
        window.key_down(KeyboardEvent::shift_tab());
        assert_eq!(window.focused_element(), Some(a));
        window.key_down(KeyboardEvent::shift_tab());
        assert_eq!(window.focused_element(), None);
    }

    #[test]
    fn test_canceled_tab_keeps_focus() {
        let window = Window::default();
        let body = window.body();
        let a = button(&window, body);
        let _b = button(&window, body);
        window.add_event_listener(window.document_node(), EventType::KeyDown, |e| {
            e.prevent_default()
        });
        window.focus(a);
        assert!(!window.key_down(KeyboardEvent::tab()));
        assert_eq!(window.focused_element(), Some(a));
    }

    #[test]
    fn test_removing_focused_node_resets_focus() {
        let window = Window::default();
        let body = window.body();
        let a = button(&window, body);
        window.focus(a);
        window.remove(a).unwrap();
        assert_eq!(window.focused_element(), None);
        assert_eq!(window.active_element(), body);
    }

    #[test]
    fn test_mouse_down_focuses_ancestor_or_blurs() {
        let window = Window::default();
        let body = window.body();
        let a = button(&window, body);
        let label = window.create_element("span");
        window.append_child(a, label).unwrap();
        let para = window.create_element("p");
        window.append_child(body, para).unwrap();

        window.mouse_down(label);
        assert_eq!(window.focused_element(), Some(a));
        window.mouse_down(para);
        assert_eq!(window.focused_element(), None);
    }

    #[test]
    fn test_tasks_run_in_order_across_turns() {
        let window = Window::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        let w = window.clone();
        window.set_timeout(move || {
            l.borrow_mut().push(1);
            let l2 = l.clone();
            w.set_timeout(move || l2.borrow_mut().push(3));
        });
        let l = log.clone();
        window.set_timeout(move || l.borrow_mut().push(2));

        window.tick();
        assert_eq!(*log.borrow(), vec![1, 2]);
        window.tick();
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_clear_timeout() {
        let window = Window::default();
        let ran = Rc::new(Cell::new(false));
        let r = ran.clone();
        let id = window.set_timeout(move || r.set(true));
        assert!(window.clear_timeout(id));
        window.run_until_idle();
        assert!(!ran.get());
        assert!(!window.clear_timeout(id));
    }

    #[test]
    fn test_layout_listener_runs_once_per_update() {
        let window = Window::default();
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        window.add_layout_listener(move || c.set(c.get() + 1));

        window.scroll_to(0.0, 10.0);
        window.resize_viewport(Size::new(800.0, 600.0));
        window.update_rendering();
        window.update_rendering();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_bounding_client_rect_tracks_scroll() {
        let window = Window::default();
        let a = button(&window, window.body());
        window.set_layout(a, LayoutBox::from_rect(DOMRect::from_xywh(10.0, 100.0, 50.0, 20.0)));
        window.scroll_to(0.0, 40.0);
        assert_eq!(
            window.bounding_client_rect(a),
            Some(DOMRect::from_xywh(10.0, 60.0, 50.0, 20.0))
        );
        window.remove(a).unwrap();
        assert_eq!(window.bounding_client_rect(a), None);
    }

    #[test]
    fn test_remove_detaches_attached_node() {
        let window = Window::default();
        let a = button(&window, window.body());
        window.remove(a).unwrap();
        assert!(!window.is_connected(a));
        window.remove(a).unwrap();
    }

    #[test]
    fn test_scroll_and_viewport_state() {
        let window = Window::default();
        assert_eq!(window.viewport(), window.config().viewport);
        window.scroll_to(-5.0, 30.0);
        assert_eq!(window.scroll_position(), (0.0, 30.0));
        window.resize_viewport(Size::new(320.0, 480.0));
        assert_eq!(window.viewport(), Size::new(320.0, 480.0));
    }

    #[test]
    fn test_clones_share_one_window() {
        let window = Window::default();
        let clone = window.clone();
        assert!(window.ptr_eq(&clone));
        assert!(!window.ptr_eq(&Window::default()));
        let weak = window.downgrade();
        assert!(weak.upgrade().is_some_and(|w| w.ptr_eq(&window)));
        drop(window);
        drop(clone);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_mutation_records_delivered_next_turn() {
        let window = Window::default();
        let records = Rc::new(RefCell::new(Vec::new()));
        let r = records.clone();
        window.add_mutation_listener(move |batch| r.borrow_mut().extend_from_slice(batch));

        let a = button(&window, window.body());
        window.set_attribute(a, "disabled", "").unwrap();
        assert!(records.borrow().is_empty());
        window.tick();
        let records = records.borrow();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].added_nodes, vec![a]);
        assert_eq!(records[1].attribute_name.as_deref(), Some("disabled"));
    }

    #[test]
    fn test_commit_hooks() {
        let window = Window::default();
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let id = window.on_commit(move || c.set(c.get() + 1));
        window.commit();
        assert!(window.remove_commit_hook(id));
        window.commit();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_resize_observer_delivery() {
        let window = Window::new(WindowConfig {
            border_box_reporting: BoxSizeReporting::Single,
            ..WindowConfig::default()
        });
        let a = button(&window, window.body());
        window.set_layout(a, LayoutBox::from_rect(DOMRect::from_xywh(0.0, 0.0, 30.0, 10.0)));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let observer = ResizeObserver::new(&window, move |entries| {
            s.borrow_mut().extend(entries.iter().cloned())
        });
        observer.observe(a, ResizeObserverBoxOptions::BorderBox);
        assert_eq!(window.resize_observation_count(a), 1);

        window.run_until_idle();
        window.scroll_to(0.0, 5.0);
        window.run_until_idle();
        window.set_layout(a, LayoutBox::from_rect(DOMRect::from_xywh(0.0, 0.0, 40.0, 10.0)));
        window.run_until_idle();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[1].border_box_size,
            Some(BoxSizes::Single(ResizeObserverSize {
                inline_size: 40.0,
                block_size: 10.0
            }))
        );
        drop(observer);
        assert_eq!(window.resize_observation_count(a), 0);
    }

    #[test]
    fn test_resize_observer_disconnect() {
        let window = Window::default();
        let a = button(&window, window.body());
        let b = button(&window, window.body());
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let observer = ResizeObserver::new(&window, move |_| c.set(c.get() + 1));
        observer.observe(a, ResizeObserverBoxOptions::BorderBox);
        observer.observe(b, ResizeObserverBoxOptions::ContentBox);

        observer.disconnect();
        assert_eq!(window.resize_observation_count(a), 0);
        assert_eq!(window.resize_observation_count(b), 0);
        window.run_until_idle();
        assert_eq!(calls.get(), 0);

        observer.observe(a, ResizeObserverBoxOptions::BorderBox);
        window.run_until_idle();
        assert_eq!(calls.get(), 1);
    }
}
