use kstring::KString;
use sexptree::coerce;
use sexptree::node::{
    GroupNode, Key, MergePolicy, Node, Scalar, Slot, Value, ValueMap,
};

fn named(key: &str, v: i64) -> Node {
    Node::new(key, v)
}

fn exported(node: &Node) -> String {
    let mut out = Vec::new();
    sexptree::export::export(&mut out, node).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn int_beats_float_beats_string() {
    assert_eq!(coerce::scalar("1"), Scalar::Int(1.into()));
    assert_eq!(coerce::scalar("-17"), Scalar::Int((-17).into()));
    assert_eq!(coerce::scalar("1.0"), Scalar::Float(1.0));
    assert_eq!(coerce::scalar("-8.89"), Scalar::Float(-8.89));
    assert_eq!(
        coerce::scalar("thru_hole"),
        Scalar::Str(KString::from_ref("thru_hole"))
    );
    // quoted text never parses as a number
    assert_eq!(
        coerce::scalar("\"1\""),
        Scalar::Str(KString::from_ref("\"1\""))
    );
}

#[test]
fn huge_integers_stay_integers() {
    match coerce::scalar("99999999999999999999999999") {
        Scalar::Int(_) => {}
        other => panic!("expected an int, got {other:?}"),
    }
}

#[test]
fn boolean_literals() {
    assert_eq!(coerce::boolean("yes"), Some(true));
    assert_eq!(coerce::boolean("True"), Some(true));
    assert_eq!(coerce::boolean("False"), Some(false));
    assert_eq!(coerce::boolean("no"), Some(false));
    assert_eq!(coerce::boolean("maybe"), None);
    assert_eq!(coerce::boolean("YES"), None);
    assert_eq!(coerce::toggle_spelling("Yes"), Some("No"));
    assert_eq!(coerce::toggle_spelling("false"), Some("true"));
    assert_eq!(coerce::toggle_spelling("maybe"), None);
}

#[test]
fn integral_floats_keep_their_point() {
    assert_eq!(Scalar::Float(0.0).to_string(), "0.0");
    assert_eq!(Scalar::Float(7.4).to_string(), "7.4");
    assert_eq!(Scalar::Float(-6.35).to_string(), "-6.35");
    assert_eq!(Scalar::Int(1.into()).to_string(), "1");
}

#[test]
fn overwrite_replaces_silently() {
    let mut map = ValueMap::new();
    map.insert(named("k", 1), MergePolicy::Overwrite).unwrap();
    map.insert(named("k", 2), MergePolicy::Overwrite).unwrap();
    assert_eq!(map.len(), 1);
    let node = map.get(&Key::from("k")).unwrap().as_node().unwrap();
    assert_eq!(node.value(), &Value::from(2i64));
}

#[test]
fn unique_or_error_keeps_the_first() {
    let mut map = ValueMap::new();
    map.insert(named("k", 1), MergePolicy::UniqueOrError).unwrap();
    let err = map
        .insert(named("k", 2), MergePolicy::UniqueOrError)
        .unwrap_err();
    assert!(err.to_string().contains("duplicate key k"));
    let node = map.get(&Key::from("k")).unwrap().as_node().unwrap();
    assert_eq!(node.value(), &Value::from(1i64));
}

#[test]
fn always_group_wraps_even_a_single_node() {
    let mut map = ValueMap::new();
    map.insert(named("k", 1), MergePolicy::AlwaysGroup).unwrap();
    let group = map.get(&Key::from("k")).unwrap().as_group().unwrap();
    assert_eq!(group.len(), 1);
}

#[test]
fn dynamic_group_promotes_on_the_second() {
    let mut map = ValueMap::new();
    map.insert(named("k", 1), MergePolicy::DynamicGroup).unwrap();
    assert!(map.get(&Key::from("k")).unwrap().as_node().is_some());
    map.insert(named("k", 2), MergePolicy::DynamicGroup).unwrap();
    map.insert(named("k", 3), MergePolicy::DynamicGroup).unwrap();
    let group = map.get(&Key::from("k")).unwrap().as_group().unwrap();
    assert_eq!(group.len(), 3);
    assert_eq!(group.get(0).unwrap().value(), &Value::from(1i64));
    assert_eq!(group.get(2).unwrap().value(), &Value::from(3i64));
}

#[test]
fn anonymous_nodes_get_stable_positions() {
    let mut map = ValueMap::new();
    map.insert(Node::anon("a"), MergePolicy::DynamicGroup).unwrap();
    map.insert(Node::anon("b"), MergePolicy::DynamicGroup).unwrap();
    map.insert(named("k", 1), MergePolicy::DynamicGroup).unwrap();
    map.insert(Node::anon("c"), MergePolicy::DynamicGroup).unwrap();
    let keys: Vec<Key> = map.keys().cloned().collect();
    assert_eq!(
        keys,
        vec![Key::Index(0), Key::Index(1), Key::from("k"), Key::Index(2)]
    );
}

#[test]
fn removal_keeps_the_remaining_order() {
    let mut map = ValueMap::new();
    map.insert(named("a", 1), MergePolicy::DynamicGroup).unwrap();
    map.insert(named("b", 2), MergePolicy::DynamicGroup).unwrap();
    map.insert(named("c", 3), MergePolicy::DynamicGroup).unwrap();
    assert!(map.remove(&Key::from("b")).is_some());
    let keys: Vec<Key> = map.keys().cloned().collect();
    assert_eq!(keys, vec![Key::from("a"), Key::from("c")]);
}

#[test]
fn group_rejects_foreign_keys() {
    let mut group = GroupNode::new("pad");
    group.push(Node::new("pad", 1i64)).unwrap();
    assert!(group.push(Node::new("via", 2i64)).is_err());
    assert!(group.push(Node::anon(3i64)).is_err());
    assert_eq!(group.len(), 1);
}

#[test]
fn pushing_a_group_splices_its_members() {
    let mut a = GroupNode::new("k");
    a.push(named("k", 1)).unwrap();
    a.push(named("k", 2)).unwrap();
    let mut b = GroupNode::new("k");
    b.push(named("k", 3)).unwrap();
    b.push_slot(Slot::Group(a)).unwrap();
    assert_eq!(b.len(), 3);
}

#[test]
fn attribute_style_access() {
    let mut node = Node::new("module", ValueMap::new());
    node.set("layer", "F.Cu").unwrap();
    assert_eq!(
        node.scalar("layer").and_then(Scalar::as_str),
        Some("F.Cu")
    );
    // a second set under the same key promotes to a group
    node.set("layer", "B.Cu").unwrap();
    assert_eq!(node.group("layer").unwrap().len(), 2);
    assert!(node.remove("layer").is_some());
    assert!(node.get("layer").is_none());

    let mut leaf = Node::new("x", 1i64);
    assert!(leaf.set("y", 2i64).is_err());
}

#[test]
fn set_node_checks_the_key() {
    let mut node = Node::new("m", ValueMap::new());
    assert!(node.set_node("a", Node::new("b", 1i64)).is_err());
    assert!(node.set_node("a", Node::new("a", 1i64)).is_ok());
}

#[test]
fn boolean_nodes_keep_their_spelling() {
    let mut node = Node::new("hide", Value::Bool(KString::from_static("Yes")));
    assert_eq!(node.as_bool(), Some(true));
    node.set_bool(false).unwrap();
    match node.value() {
        Value::Bool(text) => assert_eq!(text.as_str(), "No"),
        other => panic!("expected a bool value, got {other:?}"),
    }
    node.set_bool(false).unwrap();
    assert_eq!(node.as_bool(), Some(false));
    node.set_bool(true).unwrap();
    assert_eq!(node.as_bool(), Some(true));

    let mut scalar = Node::new("x", 1i64);
    assert!(scalar.set_bool(true).is_err());
}

#[test]
fn export_shapes() {
    let mut node = Node::new("pad", ValueMap::new());
    node.insert(Node::flag("locked", true), MergePolicy::UniqueOrError)
        .unwrap();
    assert_eq!(exported(&node), "\n(pad locked)");

    let mut node = Node::new("pad", ValueMap::new());
    node.insert(Node::flag("locked", false), MergePolicy::UniqueOrError)
        .unwrap();
    assert_eq!(exported(&node), "\n(pad)");

    let mut node = Node::new("pad", ValueMap::new());
    node.insert(
        Node::new("hide", Value::Bool(KString::from_static("yes"))),
        MergePolicy::UniqueOrError,
    )
    .unwrap();
    assert_eq!(exported(&node), "\n(pad\n  (hide yes))");

    let node = Node::new(
        "at",
        vec![Scalar::Float(-8.89), Scalar::Float(-6.35)],
    );
    assert_eq!(exported(&node), "\n(at -8.89 -6.35)");
}

#[test]
fn groups_export_as_repeated_siblings() {
    let mut node = Node::new("m", ValueMap::new());
    node.insert(named("pad", 1), MergePolicy::AlwaysGroup).unwrap();
    node.insert(named("pad", 2), MergePolicy::AlwaysGroup).unwrap();
    assert_eq!(exported(&node), "\n(m\n  (pad 1)\n  (pad 2))");
}

#[test]
fn positional_children_export_bare() {
    let mut node = Node::new("pad", ValueMap::new());
    node.insert(Node::anon(1i64), MergePolicy::DynamicGroup).unwrap();
    node.insert(Node::anon("thru_hole"), MergePolicy::DynamicGroup)
        .unwrap();
    assert_eq!(exported(&node), "\n(pad 1 thru_hole)");
}
