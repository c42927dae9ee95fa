//! Rect Observation
//!
//! Pushes an element's bounding client rect to subscribers whenever it
//! changes. Each observed element gets one tracker holding one window
//! layout listener, shared by every subscription on that element.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use fos_dom::{DOMRect, ListenerId, NodeId, Window};

use crate::node_ref::{NodeResolver, ResolverSubscription};
use crate::{ObserveResult, check_observable};

type RectCallback = Rc<dyn Fn(DOMRect)>;

struct Tracker {
    rect: Option<DOMRect>,
    subscribers: Vec<(u64, RectCallback)>,
    listener: ListenerId,
}

struct RegistryInner {
    window: Window,
    trackers: RefCell<HashMap<NodeId, Tracker>>,
    next_id: Cell<u64>,
}

impl RegistryInner {
    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    // Recompute after a layout signal; detached elements stay silent.
    fn refresh(&self, node: NodeId) {
        let Some(rect) = self.window.bounding_client_rect(node) else {
            return;
        };
        let subscribers = {
            let mut trackers = self.trackers.borrow_mut();
            let Some(tracker) = trackers.get_mut(&node) else {
                return;
            };
            if tracker.rect == Some(rect) {
                return;
            }
            tracker.rect = Some(rect);
            tracker.subscribers.clone()
        };
        tracing::trace!("Rect of {} changed: {:?}", node, rect);
        for (id, callback) in subscribers {
            if self.is_subscribed(node, id) {
                callback(rect);
            }
        }
    }

    fn is_subscribed(&self, node: NodeId, id: u64) -> bool {
        self.trackers
            .borrow()
            .get(&node)
            .is_some_and(|t| t.subscribers.iter().any(|(s, _)| *s == id))
    }

    fn release(&self, node: NodeId, id: u64) {
        let listener = {
            let mut trackers = self.trackers.borrow_mut();
            let Some(tracker) = trackers.get_mut(&node) else {
                return;
            };
            tracker.subscribers.retain(|(s, _)| *s != id);
            if !tracker.subscribers.is_empty() {
                return;
            }
            trackers.remove(&node).map(|t| t.listener)
        };
        if let Some(listener) = listener {
            self.window.remove_layout_listener(listener);
            tracing::debug!("Stopped tracking rect of {}", node);
        }
    }
}

/// Per-window rect observation registry
///
/// Clones share the same trackers.
#[derive(Clone)]
pub struct RectObserver {
    inner: Rc<RegistryInner>,
}

impl RectObserver {
    pub fn new(window: &Window) -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                window: window.clone(),
                trackers: RefCell::new(HashMap::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Observe `node`, logging and returning an inert subscription on failure
    pub fn observe(&self, node: NodeId, callback: impl Fn(DOMRect) + 'static) -> RectSubscription {
        self.try_observe(node, callback).unwrap_or_else(|err| {
            tracing::warn!("Rect observation failed: {}", err);
            RectSubscription::inert(node)
        })
    }

    /// Observe `node`. When connected, `callback` receives the current rect
    /// right away, then every changed rect.
    pub fn try_observe(
        &self,
        node: NodeId,
        callback: impl Fn(DOMRect) + 'static,
    ) -> ObserveResult<RectSubscription> {
        let inner = &self.inner;
        check_observable(&inner.window, node)?;

        let id = inner.next_id();
        let callback: RectCallback = Rc::new(callback);
        let current = inner.window.bounding_client_rect(node);

        let existing = inner.trackers.borrow().contains_key(&node);
        if existing {
            if let Some(tracker) = inner.trackers.borrow_mut().get_mut(&node) {
                tracker.subscribers.push((id, callback.clone()));
            }
        } else {
            let weak: Weak<RegistryInner> = Rc::downgrade(inner);
            let listener = inner.window.add_layout_listener(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.refresh(node);
                }
            });
            inner.trackers.borrow_mut().insert(
                node,
                Tracker {
                    rect: current,
                    subscribers: vec![(id, callback.clone())],
                    listener,
                },
            );
            tracing::debug!("Tracking rect of {}", node);
        }

        if let Some(rect) = current {
            callback(rect);
        }

        Ok(RectSubscription {
            registry: Rc::downgrade(inner),
            node,
            id,
        })
    }

    /// Follow whatever element `resolver` points at
    pub fn track(&self, resolver: &NodeResolver) -> TrackedRect {
        TrackedRect::new(self.clone(), resolver)
    }

    /// Number of elements currently tracked
    pub fn tracker_count(&self) -> usize {
        self.inner.trackers.borrow().len()
    }

    /// Number of live subscriptions on `node`
    pub fn subscriber_count(&self, node: NodeId) -> usize {
        self.inner
            .trackers
            .borrow()
            .get(&node)
            .map_or(0, |t| t.subscribers.len())
    }
}

impl std::fmt::Debug for RectObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RectObserver")
            .field("trackers", &self.tracker_count())
            .finish()
    }
}

/// One consumer's interest in an element's rect; dropping it stops delivery
pub struct RectSubscription {
    registry: Weak<RegistryInner>,
    node: NodeId,
    id: u64,
}

impl RectSubscription {
    fn inert(node: NodeId) -> Self {
        Self {
            registry: Weak::new(),
            node,
            id: u64::MAX,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Still receiving rects?
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|r| r.is_subscribed(self.node, self.id))
    }

    pub fn stop(self) {}
}

impl Drop for RectSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.release(self.node, self.id);
        }
    }
}

struct TrackedInner {
    observer: RectObserver,
    rect: Cell<Option<DOMRect>>,
    subscription: RefCell<Option<RectSubscription>>,
}

impl TrackedInner {
    fn follow(self: &Rc<Self>, node: Option<NodeId>) {
        let previous = self.subscription.borrow_mut().take();
        drop(previous);
        self.rect.set(None);

        if let Some(node) = node {
            let weak = Rc::downgrade(self);
            let subscription = self.observer.observe(node, move |rect| {
                if let Some(inner) = weak.upgrade() {
                    inner.rect.set(Some(rect));
                }
            });
            *self.subscription.borrow_mut() = Some(subscription);
        }
    }
}

/// Latest rect of the element behind a [`NodeResolver`]
///
/// Resets to `None` whenever the resolved element changes.
pub struct TrackedRect {
    inner: Rc<TrackedInner>,
    _resolution: ResolverSubscription,
}

impl TrackedRect {
    fn new(observer: RectObserver, resolver: &NodeResolver) -> Self {
        let inner = Rc::new(TrackedInner {
            observer,
            rect: Cell::new(None),
            subscription: RefCell::new(None),
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

    pub fn current(&self) -> Option<DOMRect> {
        self.inner.rect.get()
    }
}
