//! Node Resolution
//!
//! A [`NodeRef`] is a slot the host renderer reassigns as it mounts,
//! swaps or unmounts elements. A [`NodeResolver`] re-reads it after every
//! commit and turns it into a value consumers can react to.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use fos_dom::{ListenerId, NodeId, WeakWindow, Window};

/// Reassignable reference to an element
#[derive(Debug, Clone, Default)]
pub struct NodeRef(Rc<Cell<Option<NodeId>>>);

impl NodeRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, node: Option<NodeId>) {
        self.0.set(node);
    }

    pub fn get(&self) -> Option<NodeId> {
        self.0.get()
    }

    pub fn clear(&self) {
        self.0.set(None);
    }
}

type ResolveCallback = Rc<dyn Fn(Option<NodeId>)>;

struct ResolverInner {
    node_ref: NodeRef,
    current: Cell<Option<NodeId>>,
    subscribers: RefCell<Vec<(u64, ResolveCallback)>>,
    next_id: Cell<u64>,
    window: WeakWindow,
    hook: Cell<Option<ListenerId>>,
}

impl ResolverInner {
    fn resolve(&self) {
        let node = self.node_ref.get();
        if node == self.current.replace(node) {
            return;
        }
        tracing::trace!("Node reference resolved to {:?}", node);
        let subscribers: Vec<(u64, ResolveCallback)> = self.subscribers.borrow().clone();
        for (id, callback) in subscribers {
            if self.subscribers.borrow().iter().any(|(s, _)| *s == id) {
                callback(node);
            }
        }
    }

    fn unsubscribe(&self, id: u64) {
        self.subscribers.borrow_mut().retain(|(s, _)| *s != id);
    }
}

impl Drop for ResolverInner {
    fn drop(&mut self) {
        if let (Some(window), Some(hook)) = (self.window.upgrade(), self.hook.take()) {
            window.remove_commit_hook(hook);
        }
    }
}

/// Up-to-date element behind a [`NodeRef`]
///
/// Starts unresolved (`None`) and picks the reference up at the first
/// commit, like any value derived after render. Subscribers only hear about
/// actual changes. Clones share the same resolution; the commit hook is
/// removed when the last clone is dropped.
#[derive(Clone)]
pub struct NodeResolver {
    inner: Rc<ResolverInner>,
}

impl NodeResolver {
    pub fn new(window: &Window, node_ref: NodeRef) -> Self {
        let inner = Rc::new(ResolverInner {
            node_ref,
            current: Cell::new(None),
            subscribers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            window: window.downgrade(),
            hook: Cell::new(None),
        });
        let weak: Weak<ResolverInner> = Rc::downgrade(&inner);
        let hook = window.on_commit(move || {
            if let Some(inner) = weak.upgrade() {
                inner.resolve();
            }
        });
        inner.hook.set(Some(hook));
        Self { inner }
    }

    /// Element resolved at the last commit
    pub fn current(&self) -> Option<NodeId> {
        self.inner.current.get()
    }

    pub fn node_ref(&self) -> &NodeRef {
        &self.inner.node_ref
    }

    /// Hear about every change of the resolved element
    pub fn subscribe(&self, callback: impl Fn(Option<NodeId>) + 'static) -> ResolverSubscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .subscribers
            .borrow_mut()
            .push((id, Rc::new(callback)));
        ResolverSubscription {
            id,
            resolver: Rc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }
}

impl std::fmt::Debug for NodeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeResolver")
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}

/// Handle to a resolver subscription; dropping it unsubscribes
pub struct ResolverSubscription {
    id: u64,
    resolver: Weak<ResolverInner>,
}

impl ResolverSubscription {
    pub fn unsubscribe(self) {}
}

impl Drop for ResolverSubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.resolver.upgrade() {
            inner.unsubscribe(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(window: &Window) -> NodeId {
        let node = window.create_element("div");
        window.append_child(window.body(), node).unwrap();
        node
    }

    #[test]
    fn test_resolves_after_commit() {
        let window = Window::default();
        let node_ref = NodeRef::new();
        let resolver = NodeResolver::new(&window, node_ref.clone());
        let a = element(&window);

        node_ref.set(Some(a));
        assert_eq!(resolver.current(), None);
        window.commit();
        assert_eq!(resolver.current(), Some(a));
    }

    #[test]
    fn test_notifies_only_on_change() {
        let window = Window::default();
        let node_ref = NodeRef::new();
        let resolver = NodeResolver::new(&window, node_ref.clone());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let _sub = resolver.subscribe(move |node| s.borrow_mut().push(node));

        let a = element(&window);
        let b = element(&window);
        window.commit();
        node_ref.set(Some(a));
        window.commit();
        window.commit();
        node_ref.set(Some(b));
        window.commit();
        node_ref.clear();
        window.commit();

        assert_eq!(*seen.borrow(), vec![Some(a), Some(b), None]);
    }

    #[test]
    fn test_drop_removes_commit_hook() {
        let window = Window::default();
        let node_ref = NodeRef::new();
        let resolver = NodeResolver::new(&window, node_ref.clone());
        let seen = Rc::new(Cell::new(0));
        let s = seen.clone();
        let sub = resolver.subscribe(move |_| s.set(s.get() + 1));
        drop(resolver);

        node_ref.set(Some(element(&window)));
        window.commit();
        assert_eq!(seen.get(), 0);
        sub.unsubscribe();
    }

    #[test]
    fn test_unsubscribe() {
        let window = Window::default();
        let node_ref = NodeRef::new();
        let resolver = NodeResolver::new(&window, node_ref.clone());
        let sub = resolver.subscribe(|_| {});
        assert_eq!(resolver.subscriber_count(), 1);
        sub.unsubscribe();
        assert_eq!(resolver.subscriber_count(), 0);
    }
}
