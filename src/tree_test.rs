use super::*;
use std::cell::RefCell;

use crate::test_helpers::capture;

fn order_log(tree: &Tree, node: NodeId, kind: EventKind, label: &'static str, log: &Rc<RefCell<Vec<&'static str>>>) {
    let log = Rc::clone(log);
    tree.listen(node, kind, move |_| log.borrow_mut().push(label)).unwrap();
}

// =============================================================
// Structure
// =============================================================

#[test]
fn new_tree_has_only_root() {
    let tree = Tree::new();
    assert!(tree.contains(tree.root()));
    assert!(tree.children(tree.root()).is_empty());
    assert_eq!(tree.tag(tree.root()).as_deref(), Some("root"));
}

#[test]
fn element_appends_in_order() {
    let tree = Tree::new();
    let a = tree.element(tree.root(), "section").unwrap();
    let b = tree.element(tree.root(), "section").unwrap();
    assert_eq!(tree.children(tree.root()), vec![a, b]);
    assert_eq!(tree.parent(a), Some(tree.root()));
}

#[test]
fn element_under_missing_parent_fails() {
    let tree = Tree::new();
    let a = tree.element(tree.root(), "section").unwrap();
    tree.remove(a).unwrap();
    assert_eq!(tree.element(a, "section"), Err(TreeError::Detached(a)));
}

#[test]
fn descendants_are_in_document_order() {
    let tree = Tree::new();
    let a = tree.element(tree.root(), "a").unwrap();
    let a1 = tree.element(a, "a1").unwrap();
    let a2 = tree.element(a, "a2").unwrap();
    let b = tree.element(tree.root(), "b").unwrap();
    let a1x = tree.element(a1, "a1x").unwrap();
    assert_eq!(tree.descendants(tree.root()), vec![a, a1, a1x, a2, b]);
    assert_eq!(tree.descendants(a), vec![a1, a1x, a2]);
}

#[test]
fn duplicate_element_ids_are_rejected() {
    let tree = Tree::new();
    tree.insert(tree.root(), "x", Some("books"), Role::Container).unwrap();
    let err = tree.insert(tree.root(), "x", Some("books"), Role::Container).unwrap_err();
    assert_eq!(err, TreeError::DuplicateId("books".into()));
}

#[test]
fn remove_releases_element_ids_of_whole_subtree() {
    let tree = Tree::new();
    let group = tree.element(tree.root(), "group").unwrap();
    tree.insert(group, "x", Some("inner"), Role::Container).unwrap();
    tree.remove(group).unwrap();
    assert!(tree.lookup("inner").is_none());
    assert!(tree.insert(tree.root(), "x", Some("inner"), Role::Container).is_ok());
}

#[test]
fn root_cannot_be_removed() {
    let tree = Tree::new();
    assert!(tree.remove(tree.root()).is_err());
}

#[test]
fn data_source_accessor_ignores_other_roles() {
    let tree = Tree::new();
    tree.insert(tree.root(), "x", Some("plain"), Role::Container).unwrap();
    assert!(tree.data_source("plain").is_none());
    assert!(tree.data_source("missing").is_none());
}

// =============================================================
// Dispatch
// =============================================================

#[test]
fn bubbling_event_visits_target_then_ancestors() {
    let tree = Tree::new();
    let outer = tree.element(tree.root(), "outer").unwrap();
    let inner = tree.element(outer, "inner").unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    order_log(&tree, tree.root(), EventKind::Trigger, "root", &log);
    order_log(&tree, outer, EventKind::Trigger, "outer", &log);
    order_log(&tree, inner, EventKind::Trigger, "inner", &log);

    tree.dispatch(inner, EventKind::Trigger, Payload::None);
    assert_eq!(*log.borrow(), vec!["inner", "outer", "root"]);
}

#[test]
fn records_changed_does_not_bubble() {
    let tree = Tree::new();
    let source = tree.element(tree.root(), "source").unwrap();
    let at_root = capture(&tree, tree.root(), EventKind::RecordsChanged);
    let at_source = capture(&tree, source, EventKind::RecordsChanged);

    tree.dispatch(source, EventKind::RecordsChanged, Payload::None);
    assert_eq!(at_source.borrow().len(), 1);
    assert!(at_root.borrow().is_empty());
}

#[test]
fn stop_propagation_finishes_current_node_only() {
    let tree = Tree::new();
    let inner = tree.element(tree.root(), "inner").unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    tree.listen(inner, EventKind::Trigger, |e| e.stop_propagation()).unwrap();
    order_log(&tree, inner, EventKind::Trigger, "inner-second", &log);
    order_log(&tree, tree.root(), EventKind::Trigger, "root", &log);

    let event = tree.dispatch(inner, EventKind::Trigger, Payload::None);
    assert!(event.is_propagation_stopped());
    assert_eq!(*log.borrow(), vec!["inner-second"]);
}

#[test]
fn listeners_only_see_their_kind() {
    let tree = Tree::new();
    let submits = capture(&tree, tree.root(), EventKind::Submit);
    tree.dispatch(tree.root(), EventKind::Error, Payload::Message("x".into()));
    assert!(submits.borrow().is_empty());
}

#[test]
fn listener_may_mutate_tree_during_dispatch() {
    let tree = Tree::new();
    let node = tree.element(tree.root(), "host").unwrap();
    let weak = tree.downgrade();
    tree.listen(node, EventKind::Trigger, move |e| {
        let tree = weak.upgrade().unwrap();
        tree.element(e.current(), "spawned").unwrap();
        tree.dispatch(e.current(), EventKind::Submit, Payload::None);
    })
    .unwrap();
    let submits = capture(&tree, tree.root(), EventKind::Submit);

    tree.dispatch(node, EventKind::Trigger, Payload::None);
    assert_eq!(tree.children(node).len(), 1);
    assert_eq!(submits.borrow().len(), 1);
}

#[test]
fn unlisten_stops_delivery() {
    let tree = Tree::new();
    let seen = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&seen);
    let id = tree
        .listen(tree.root(), EventKind::Trigger, move |_| *counter.borrow_mut() += 1)
        .unwrap();
    tree.dispatch(tree.root(), EventKind::Trigger, Payload::None);
    assert!(tree.unlisten(tree.root(), id));
    assert!(!tree.unlisten(tree.root(), id));
    tree.dispatch(tree.root(), EventKind::Trigger, Payload::None);
    assert_eq!(*seen.borrow(), 1);
}

#[test]
fn failed_listen_does_not_consume_an_id() {
    let tree = Tree::new();
    let gone = tree.element(tree.root(), "gone").unwrap();
    tree.remove(gone).unwrap();

    let first = tree.listen(tree.root(), EventKind::Trigger, |_| {}).unwrap();
    assert!(matches!(tree.listen(gone, EventKind::Trigger, |_| {}), Err(TreeError::Detached(n)) if n == gone));
    let second = tree.listen(tree.root(), EventKind::Trigger, |_| {}).unwrap();
    assert_eq!(second.0, first.0 + 1);
}

// =============================================================
// Subscription
// =============================================================

#[test]
fn dropping_subscription_unregisters_listener() {
    let tree = Tree::new();
    let node = tree.element(tree.root(), "source").unwrap();
    let sub = tree.subscribe(node, EventKind::RecordsChanged, |_| {}).unwrap();
    assert_eq!(tree.listener_count(node, EventKind::RecordsChanged), 1);
    drop(sub);
    assert_eq!(tree.listener_count(node, EventKind::RecordsChanged), 0);
}

#[test]
fn subscription_outliving_its_node_drops_quietly() {
    let tree = Tree::new();
    let node = tree.element(tree.root(), "source").unwrap();
    let sub = tree.subscribe(node, EventKind::RecordsChanged, |_| {}).unwrap();
    tree.remove(node).unwrap();
    drop(sub);
    assert!(!tree.contains(node));
}

#[test]
fn subscription_outliving_its_tree_drops_quietly() {
    let tree = Tree::new();
    let node = tree.element(tree.root(), "source").unwrap();
    let sub = tree.subscribe(node, EventKind::RecordsChanged, |_| {}).unwrap();
    drop(tree);
    assert_eq!(sub.node(), node);
    drop(sub);
}
