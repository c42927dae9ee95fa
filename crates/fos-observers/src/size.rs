//! Size Observation
//!
//! Border-box size of elements, observed through one shared
//! [`ResizeObserver`]. The physical observer watches an element exactly
//! while at least one [`SizeObservation`] of it is alive.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use fos_dom::{
    BoxSizes, NodeId, ResizeObserver, ResizeObserverBoxOptions, ResizeObserverEntry, Size, Window,
};

use crate::node_ref::{NodeResolver, ResolverSubscription};
use crate::{ObserveResult, check_observable};

type SizeCallback = Rc<dyn Fn(Option<Size>)>;

struct ObservationState {
    node: NodeId,
    current: Cell<Option<Size>>,
    subscribers: RefCell<Vec<(u64, SizeCallback)>>,
    next_id: Cell<u64>,
}

impl ObservationState {
    fn update(&self, size: Option<Size>) {
        if self.current.replace(size) == size {
            return;
        }
        let subscribers: Vec<(u64, SizeCallback)> = self.subscribers.borrow().clone();
        for (id, callback) in subscribers {
            if self.subscribers.borrow().iter().any(|(s, _)| *s == id) {
                callback(size);
            }
        }
    }
}

#[derive(Default)]
struct ElementEntry {
    size: Option<Size>,
    observations: Vec<(u64, Weak<ObservationState>)>,
}

struct SizeInner {
    window: Window,
    physical: ResizeObserver,
    elements: RefCell<HashMap<NodeId, ElementEntry>>,
    next_id: Cell<u64>,
}

impl SizeInner {
    // Prefer the reported border box (sequence or legacy single record),
    // else measure the bounding rect.
    fn entry_size(&self, entry: &ResizeObserverEntry) -> Option<Size> {
        match entry.border_box_size.as_ref().and_then(BoxSizes::first) {
            Some(border) => Some(Size::new(border.inline_size, border.block_size)),
            None => self
                .window
                .bounding_client_rect(entry.target)
                .map(|rect| rect.size()),
        }
    }

    fn on_resize(&self, entries: &[ResizeObserverEntry]) {
        for entry in entries {
            let Some(size) = self.entry_size(entry) else {
                continue;
            };
            let observations: Vec<Weak<ObservationState>> = {
                let mut elements = self.elements.borrow_mut();
                let Some(element) = elements.get_mut(&entry.target) else {
                    continue;
                };
                element.size = Some(size);
                element.observations.iter().map(|(_, o)| o.clone()).collect()
            };
            tracing::trace!("Size of {} is {:?}", entry.target, size);
            for observation in observations.iter().filter_map(Weak::upgrade) {
                observation.update(Some(size));
            }
        }
    }

    fn release(&self, node: NodeId, id: u64) {
        let last = {
            let mut elements = self.elements.borrow_mut();
            let Some(element) = elements.get_mut(&node) else {
                return;
            };
            element.observations.retain(|(o, _)| *o != id);
            let last = element.observations.is_empty();
            if last {
                elements.remove(&node);
            }
            last
        };
        if last {
            self.physical.unobserve(node);
            tracing::debug!("Stopped observing size of {}", node);
        }
    }
}

/// Per-window size observation registry
///
/// Clones share the physical observer and the per-element table.
#[derive(Clone)]
pub struct SizeObserver {
    inner: Rc<SizeInner>,
}

impl SizeObserver {
    pub fn new(window: &Window) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<SizeInner>| {
            let weak = weak.clone();
            let physical = ResizeObserver::new(window, move |entries| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_resize(entries);
                }
            });
            SizeInner {
                window: window.clone(),
                physical,
                elements: RefCell::new(HashMap::new()),
                next_id: Cell::new(0),
            }
        });
        Self { inner }
    }

    /// Observe `node`, logging and returning an inert observation on failure
    pub fn observe(&self, node: NodeId) -> SizeObservation {
        self.try_observe(node).unwrap_or_else(|err| {
            tracing::warn!("Size observation failed: {}", err);
            SizeObservation::inert(node)
        })
    }

    pub fn try_observe(&self, node: NodeId) -> ObserveResult<SizeObservation> {
        let inner = &self.inner;
        check_observable(&inner.window, node)?;

        let id = inner.next_id.get();
        inner.next_id.set(id + 1);

        let (first, cached) = {
            let mut elements = inner.elements.borrow_mut();
            let first = !elements.contains_key(&node);
            let element = elements.entry(node).or_default();
            (first, element.size)
        };
        let state = Rc::new(ObservationState {
            node,
            current: Cell::new(None),
            subscribers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        });
        if let Some(element) = inner.elements.borrow_mut().get_mut(&node) {
            element.observations.push((id, Rc::downgrade(&state)));
        }
        if first {
            inner.physical.observe(node, ResizeObserverBoxOptions::BorderBox);
            tracing::debug!("Observing size of {}", node);
        }
        // A cached size arrives on the next turn, like a fresh measurement.
        if let Some(size) = cached {
            let weak = Rc::downgrade(&state);
            inner.window.set_timeout(move || {
                if let Some(state) = weak.upgrade() {
                    if state.current.get().is_none() {
                        state.update(Some(size));
                    }
                }
            });
        }

        Ok(SizeObservation {
            state,
            owner: Rc::downgrade(inner),
            id,
            stopped: false,
        })
    }

    /// Follow whatever element `resolver` points at
    pub fn track(&self, resolver: &NodeResolver) -> TrackedSize {
        TrackedSize::new(self.clone(), resolver)
    }

    /// Live observations of `node`
    pub fn observation_count(&self, node: NodeId) -> usize {
        self.inner
            .elements
            .borrow()
            .get(&node)
            .map_or(0, |e| e.observations.len())
    }
}

impl std::fmt::Debug for SizeObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SizeObserver")
            .field("elements", &self.inner.elements.borrow().len())
            .finish()
    }
}

/// A stream of border-box sizes for one element
///
/// `None` means "no measurement yet" and is also emitted when the
/// observation stops. Dropping the observation stops it.
pub struct SizeObservation {
    state: Rc<ObservationState>,
    owner: Weak<SizeInner>,
    id: u64,
    stopped: bool,
}

impl SizeObservation {
    fn inert(node: NodeId) -> Self {
        Self {
            state: Rc::new(ObservationState {
                node,
                current: Cell::new(None),
                subscribers: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
            owner: Weak::new(),
            id: u64::MAX,
            stopped: true,
        }
    }

    pub fn node(&self) -> NodeId {
        self.state.node
    }

    pub fn current(&self) -> Option<Size> {
        self.state.current.get()
    }

    /// Receive the current value now and every change after
    pub fn subscribe(&self, callback: impl Fn(Option<Size>) + 'static) -> SizeSubscription {
        let id = self.state.next_id.get();
        self.state.next_id.set(id + 1);
        let callback: SizeCallback = Rc::new(callback);
        self.state
            .subscribers
            .borrow_mut()
            .push((id, callback.clone()));
        callback(self.current());
        SizeSubscription {
            state: Rc::downgrade(&self.state),
            id,
        }
    }

    pub fn stop(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if std::mem::replace(&mut self.stopped, true) {
            return;
        }
        self.state.update(None);
        if let Some(owner) = self.owner.upgrade() {
            owner.release(self.state.node, self.id);
        }
    }
}

impl Drop for SizeObservation {
    fn drop(&mut self) {
        self.release();
    }
}

/// Subscriber handle; dropping it unsubscribes
pub struct SizeSubscription {
    state: Weak<ObservationState>,
    id: u64,
}

impl SizeSubscription {
    pub fn unsubscribe(self) {}
}

impl Drop for SizeSubscription {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            state.subscribers.borrow_mut().retain(|(s, _)| *s != self.id);
        }
    }
}

struct TrackedInner {
    observer: SizeObserver,
    size: Cell<Option<Size>>,
    observation: RefCell<Option<(SizeSubscription, SizeObservation)>>,
}

impl TrackedInner {
    fn follow(self: &Rc<Self>, node: Option<NodeId>) {
        let previous = self.observation.borrow_mut().take();
        drop(previous);
        self.size.set(None);

        if let Some(node) = node {
            let observation = self.observer.observe(node);
            let weak = Rc::downgrade(self);
            let subscription = observation.subscribe(move |size| {
                if let Some(inner) = weak.upgrade() {
                    inner.size.set(size);
                }
            });
            *self.observation.borrow_mut() = Some((subscription, observation));
        }
    }
}

/// Latest border-box size of the element behind a [`NodeResolver`]
pub struct TrackedSize {
    inner: Rc<TrackedInner>,
    _resolution: ResolverSubscription,
}

impl TrackedSize {
    fn new(observer: SizeObserver, resolver: &NodeResolver) -> Self {
        let inner = Rc::new(TrackedInner {
            observer,
            size: Cell::new(None),
            observation: RefCell::new(None),
        });
        inner.follow(resolver.current());

        let weak = Rc::downgrade(&inner);
        let resolution = resolver.subscribe(move |node| {
            if let Some(inner) = weak.upgrade() {
                inner.follow(node);
            }
        });
        Self {
            inner,
            _resolution: resolution,
        }
    }

    pub fn current(&self) -> Option<Size> {
        self.inner.size.get()
    }
}
