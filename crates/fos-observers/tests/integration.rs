//! Integration tests for fos-observers
//!
//! Observers driven through a live window: layout changes, scrolling,
//! detaching, ref reassignment and legacy resize observer hosts.

use std::cell::RefCell;
use std::rc::Rc;

use fos_dom::{
    BoxSizeReporting, DOMRect, Insets, LayoutBox, NodeId, Size, Window, WindowConfig,
};
use fos_observers::{NodeRef, NodeResolver, ObserveError, RectObserver, SizeObserver};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn laid_out(window: &Window, rect: DOMRect) -> NodeId {
    let node = window.create_element("div");
    window.append_child(window.body(), node).unwrap();
    window.set_layout(node, LayoutBox::from_rect(rect));
    node
}

// ============================================================================
// RECT OBSERVER
// ============================================================================

#[test]
fn test_two_subscriptions_share_one_registration() {
    init_tracing();
    let window = Window::default();
    let node = laid_out(&window, DOMRect::from_xywh(0.0, 0.0, 100.0, 40.0));
    let rects = RectObserver::new(&window);

    let a_seen = Rc::new(RefCell::new(Vec::new()));
    let b_seen = Rc::new(RefCell::new(Vec::new()));
    let a = {
        let seen = a_seen.clone();
        rects.observe(node, move |r| seen.borrow_mut().push(r))
    };
    let b = {
        let seen = b_seen.clone();
        rects.observe(node, move |r| seen.borrow_mut().push(r))
    };
    assert_eq!(window.layout_listener_count(), 1);

    a.stop();
    window.set_layout(node, LayoutBox::from_rect(DOMRect::from_xywh(0.0, 0.0, 120.0, 40.0)));
    window.run_until_idle();
    assert_eq!(a_seen.borrow().len(), 1);
    assert_eq!(b_seen.borrow().last().map(|r| r.width), Some(120.0));

    b.stop();
    assert_eq!(window.layout_listener_count(), 0);
    assert_eq!(rects.tracker_count(), 0);
}

#[test]
fn test_scroll_moves_rect() {
    init_tracing();
    let window = Window::default();
    let node = laid_out(&window, DOMRect::from_xywh(0.0, 300.0, 100.0, 40.0));
    let rects = RectObserver::new(&window);
    let last = Rc::new(RefCell::new(None));
    let l = last.clone();
    let _sub = rects.observe(node, move |r| *l.borrow_mut() = Some(r));

    window.scroll_to(0.0, 100.0);
    window.run_until_idle();
    let rect = last.borrow().unwrap();
    assert_eq!(rect.top(), 200.0);
    assert_eq!(rect.bottom(), 240.0);
}

#[test]
fn test_detached_element_is_silent_until_reattached() {
    init_tracing();
    let window = Window::default();
    let node = laid_out(&window, DOMRect::from_xywh(0.0, 0.0, 10.0, 10.0));
    let rects = RectObserver::new(&window);
    let count = Rc::new(RefCell::new(0));
    let c = count.clone();
    let _sub = rects.observe(node, move |_| *c.borrow_mut() += 1);
    assert_eq!(*count.borrow(), 1);

    window.remove(node).unwrap();
    window.set_layout(node, LayoutBox::from_rect(DOMRect::from_xywh(0.0, 0.0, 30.0, 10.0)));
    window.run_until_idle();
    assert_eq!(*count.borrow(), 1);

    window.append_child(window.body(), node).unwrap();
    window.run_until_idle();
    assert_eq!(*count.borrow(), 2);
}

#[test]
fn test_unknown_node_fails_only_that_subscription() {
    init_tracing();
    let window = Window::default();
    let node = laid_out(&window, DOMRect::from_xywh(0.0, 0.0, 10.0, 10.0));
    let rects = RectObserver::new(&window);
    let good = rects.observe(node, |_| {});

    assert_eq!(
        rects.try_observe(NodeId::NONE, |_| {}).err(),
        Some(ObserveError::UnknownNode(NodeId::NONE))
    );
    assert!(good.is_active());
}

#[test]
fn test_tracked_rect_follows_resolver() {
    init_tracing();
    let window = Window::default();
    let a = laid_out(&window, DOMRect::from_xywh(0.0, 0.0, 10.0, 10.0));
    let b = laid_out(&window, DOMRect::from_xywh(0.0, 10.0, 20.0, 20.0));
    let node_ref = NodeRef::new();
    let resolver = NodeResolver::new(&window, node_ref.clone());
    let rects = RectObserver::new(&window);
    let tracked = rects.track(&resolver);
    assert_eq!(tracked.current(), None);

    node_ref.set(Some(a));
    window.commit();
    assert_eq!(tracked.current().map(|r| r.width), Some(10.0));

    node_ref.set(Some(b));
    window.commit();
    assert_eq!(tracked.current().map(|r| r.width), Some(20.0));
    assert_eq!(rects.subscriber_count(a), 0);

    node_ref.clear();
    window.commit();
    assert_eq!(tracked.current(), None);
    assert_eq!(rects.tracker_count(), 0);
}

// ============================================================================
// SIZE OBSERVER
// ============================================================================

#[test]
fn test_size_uses_border_box() {
    init_tracing();
    let window = Window::default();
    let node = window.create_element("div");
    window.append_child(window.body(), node).unwrap();
    window.set_layout(
        node,
        LayoutBox::from_rect(DOMRect::from_xywh(0.0, 0.0, 100.0, 50.0))
            .with_padding(Insets::uniform(5.0))
            .with_border(Insets::uniform(1.0)),
    );
    let sizes = SizeObserver::new(&window);
    let observation = sizes.observe(node);
    window.run_until_idle();
    assert_eq!(observation.current(), Some(Size::new(100.0, 50.0)));
}

#[test]
fn test_legacy_hosts_normalize_to_same_size() {
    init_tracing();
    for reporting in [
        BoxSizeReporting::Sequence,
        BoxSizeReporting::Single,
        BoxSizeReporting::Unsupported,
    ] {
        let window = Window::new(WindowConfig {
            border_box_reporting: reporting,
            ..WindowConfig::default()
        });
        let node = laid_out(&window, DOMRect::from_xywh(5.0, 5.0, 64.0, 32.0));
        let sizes = SizeObserver::new(&window);
        let observation = sizes.observe(node);
        window.run_until_idle();
        assert_eq!(
            observation.current(),
            Some(Size::new(64.0, 32.0)),
            "{:?}",
            reporting
        );
    }
}

#[test]
fn test_zero_size_is_a_measurement() {
    init_tracing();
    let window = Window::default();
    let node = laid_out(&window, DOMRect::from_xywh(0.0, 0.0, 0.0, 0.0));
    let sizes = SizeObserver::new(&window);
    let observation = sizes.observe(node);
    assert_eq!(observation.current(), None);
    window.run_until_idle();
    assert_eq!(observation.current(), Some(Size::new(0.0, 0.0)));
}

#[test]
fn test_size_changes_are_pushed() {
    init_tracing();
    let window = Window::default();
    let node = laid_out(&window, DOMRect::from_xywh(0.0, 0.0, 10.0, 10.0));
    let sizes = SizeObserver::new(&window);
    let observation = sizes.observe(node);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    let _sub = observation.subscribe(move |size| s.borrow_mut().push(size));

    window.run_until_idle();
    window.set_layout(node, LayoutBox::from_rect(DOMRect::from_xywh(0.0, 0.0, 10.0, 25.0)));
    window.run_until_idle();
    // Moving without resizing is not a size change.
    window.set_layout(node, LayoutBox::from_rect(DOMRect::from_xywh(9.0, 9.0, 10.0, 25.0)));
    window.run_until_idle();

    assert_eq!(
        *seen.borrow(),
        vec![None, Some(Size::new(10.0, 10.0)), Some(Size::new(10.0, 25.0))]
    );
}

#[test]
fn test_tracked_size_resets_on_ref_change() {
    init_tracing();
    let window = Window::default();
    let a = laid_out(&window, DOMRect::from_xywh(0.0, 0.0, 10.0, 10.0));
    let b = laid_out(&window, DOMRect::from_xywh(0.0, 0.0, 30.0, 30.0));
    let node_ref = NodeRef::new();
    let resolver = NodeResolver::new(&window, node_ref.clone());
    let sizes = SizeObserver::new(&window);
    let tracked = sizes.track(&resolver);

    node_ref.set(Some(a));
    window.commit();
    assert_eq!(tracked.current(), None);
    window.run_until_idle();
    assert_eq!(tracked.current(), Some(Size::new(10.0, 10.0)));

    node_ref.set(Some(b));
    window.commit();
    assert_eq!(tracked.current(), None);
    assert_eq!(window.resize_observation_count(a), 0);
    window.run_until_idle();
    assert_eq!(tracked.current(), Some(Size::new(30.0, 30.0)));
}
