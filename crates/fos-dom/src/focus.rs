//! Focus Management
//!
//! Focusability rules and native sequential navigation (tab) order.

use crate::{Document, ElementData, NodeId};

/// Tab index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabIndex {
    /// Focusable by script or pointer, skipped by Tab (negative tabindex)
    ProgrammaticOnly,
    /// Reachable by Tab (`tabindex="0"`, positive, or natively focusable)
    Sequential(i32),
}

impl TabIndex {
    /// Parse a `tabindex` attribute; invalid values are ignored like the
    /// attribute was absent
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().parse::<i32>() {
            Ok(n) if n < 0 => Some(Self::ProgrammaticOnly),
            Ok(n) => Some(Self::Sequential(n)),
            Err(_) => None,
        }
    }

    pub fn is_sequential(&self) -> bool {
        matches!(self, Self::Sequential(_))
    }

    // Positive indices come first in ascending order, then zero in tree order.
    fn order_key(&self) -> (u8, i32) {
        match *self {
            Self::Sequential(n) if n > 0 => (0, n),
            _ => (1, 0),
        }
    }
}

fn natively_focusable(el: &ElementData) -> bool {
    match el.tag_name() {
        "a" | "area" => el.has_attr("href"),
        "input" => !el
            .get_attr("type")
            .is_some_and(|t| t.eq_ignore_ascii_case("hidden")),
        "button" | "select" | "textarea" | "iframe" | "summary" => true,
        _ => el
            .get_attr("contenteditable")
            .is_some_and(|v| !v.eq_ignore_ascii_case("false")),
    }
}

fn is_disabled(el: &ElementData) -> bool {
    matches!(
        el.tag_name(),
        "button" | "input" | "select" | "textarea" | "optgroup" | "option" | "fieldset"
    ) && el.has_attr("disabled")
}

// `hidden` and `inert` remove a whole subtree from focus navigation.
fn is_rendered(doc: &Document, node: NodeId) -> bool {
    let tree = doc.tree();
    std::iter::once(node)
        .chain(tree.ancestors(node))
        .filter_map(|id| tree.element(id))
        .all(|el| !el.has_attr("hidden") && !el.has_attr("inert"))
}

/// Effective tab index of an element, `None` when it cannot take focus at all
pub fn tab_index(doc: &Document, node: NodeId) -> Option<TabIndex> {
    let el = doc.element(node)?;
    match el.get_attr("tabindex").and_then(TabIndex::parse) {
        Some(explicit) => Some(explicit),
        None if natively_focusable(el) => Some(TabIndex::Sequential(0)),
        None => None,
    }
}

/// Can the element receive focus (by script, pointer or keyboard)?
pub fn is_focusable(doc: &Document, node: NodeId) -> bool {
    let Some(el) = doc.element(node) else {
        return false;
    };
    doc.is_connected(node)
        && !is_disabled(el)
        && is_rendered(doc, node)
        && tab_index(doc, node).is_some()
}

/// Is the element part of sequential (Tab) navigation?
pub fn is_tabbable(doc: &Document, node: NodeId) -> bool {
    is_focusable(doc, node) && tab_index(doc, node).is_some_and(|t| t.is_sequential())
}

/// Tabbable descendants of `root` (excluding `root`) in native tab order
///
/// Computed fresh on every call.
pub fn tab_order(doc: &Document, root: NodeId) -> Vec<NodeId> {
    let mut tabbable: Vec<(NodeId, TabIndex)> = doc
        .tree()
        .descendants(root)
        .into_iter()
        .filter(|&id| is_tabbable(doc, id))
        .filter_map(|id| tab_index(doc, id).map(|t| (id, t)))
        .collect();
    // Stable sort keeps tree order within each bucket.
    tabbable.sort_by_key(|(_, t)| t.order_key());
    tabbable.into_iter().map(|(id, _)| id).collect()
}

/// Nearest inclusive ancestor that can take focus (pointer focus target)
pub fn focusable_ancestor(doc: &Document, node: NodeId) -> Option<NodeId> {
    std::iter::once(node)
        .chain(doc.tree().ancestors(node))
        .find(|&id| is_focusable(doc, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(doc: &mut Document, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = doc.tree_mut().create_element(tag);
        if let Some(el) = doc.tree_mut().get_mut(id).and_then(|n| n.as_element_mut()) {
            for (k, v) in attrs {
                el.set_attr(k, v);
            }
        }
        doc.tree_mut().append_child(parent, id).unwrap();
        id
    }

    #[test]
    fn test_tab_index() {
        assert_eq!(TabIndex::parse("-1"), Some(TabIndex::ProgrammaticOnly));
        assert_eq!(TabIndex::parse("0"), Some(TabIndex::Sequential(0)));
        assert_eq!(TabIndex::parse(" 5 "), Some(TabIndex::Sequential(5)));
        assert_eq!(TabIndex::parse("abc"), None);
    }

    #[test]
    fn test_native_focusability() {
        let mut doc = Document::default();
        let body = doc.body();
        let link = add(&mut doc, body, "a", &[("href", "#")]);
        let anchor = add(&mut doc, body, "a", &[]);
        let hidden_input = add(&mut doc, body, "input", &[("type", "hidden")]);
        let disabled = add(&mut doc, body, "button", &[("disabled", "")]);
        let editable = add(&mut doc, body, "div", &[("contenteditable", "true")]);
        let programmatic = add(&mut doc, body, "div", &[("tabindex", "-1")]);

        assert!(is_tabbable(&doc, link));
        assert!(!is_focusable(&doc, anchor));
        assert!(!is_focusable(&doc, hidden_input));
        assert!(!is_focusable(&doc, disabled));
        assert!(is_tabbable(&doc, editable));
        assert!(is_focusable(&doc, programmatic));
        assert!(!is_tabbable(&doc, programmatic));
    }

    #[test]
    fn test_hidden_subtree_excluded() {
        let mut doc = Document::default();
        let body = doc.body();
        let section = add(&mut doc, body, "section", &[("hidden", "")]);
        let inner = add(&mut doc, section, "button", &[]);
        let inert = add(&mut doc, body, "div", &[("inert", "")]);
        let inert_inner = add(&mut doc, inert, "input", &[]);

        assert!(!is_focusable(&doc, inner));
        assert!(!is_focusable(&doc, inert_inner));
        assert!(tab_order(&doc, body).is_empty());
    }

    #[test]
    fn test_tab_order_positive_first() {
        let mut doc = Document::default();
        let body = doc.body();
        let a = add(&mut doc, body, "button", &[]);
        let b = add(&mut doc, body, "button", &[("tabindex", "2")]);
        let c = add(&mut doc, body, "button", &[]);
        let d = add(&mut doc, body, "button", &[("tabindex", "1")]);
        let _skip = add(&mut doc, body, "button", &[("tabindex", "-1")]);

        assert_eq!(tab_order(&doc, body), vec![d, b, a, c]);
    }

    #[test]
    fn test_detached_not_focusable() {
        let mut doc = Document::default();
        let button = doc.tree_mut().create_element("button");
        assert!(!is_focusable(&doc, button));
    }

    #[test]
    fn test_focusable_ancestor() {
        let mut doc = Document::default();
        let body = doc.body();
        let button = add(&mut doc, body, "button", &[]);
        let span = add(&mut doc, button, "span", &[]);
        let plain = add(&mut doc, body, "p", &[]);

        assert_eq!(focusable_ancestor(&doc, span), Some(button));
        assert_eq!(focusable_ancestor(&doc, plain), None);
    }
}
