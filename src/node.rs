// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Runtime data types representing a parsed tree.

//! A [Node] is one key/value pair; children live in a [ValueMap], an
//! insertion-ordered multimap whose merge behavior is chosen per
//! insertion via [MergePolicy]. Repeated keys collect into a
//! [GroupNode], which acts as a single map slot but exports as
//! repeated siblings.

use crate::coerce;
use crate::schema::BuildError;
use indexmap::map::Entry;
use indexmap::IndexMap;
use kstring::KString;
use num::{BigInt, ToPrimitive};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("duplicate key {0}")]
    DuplicateKey(Key),
    #[error("expecting key {0}")]
    ExpectingKey(Key),
    #[error("scalar value has no children")]
    NotComposite,
    #[error("not a boolean node")]
    NotBoolean,
}

/// How a child is addressed: by name, or by the position it was
/// inserted at when it carried no name of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Name(KString),
    Index(usize),
}

impl Key {
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Key::Name(s) => Some(s),
            Key::Index(_) => None,
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
           -> Result<(), std::fmt::Error> {
        match self {
            Key::Name(s) => f.write_str(s),
            Key::Index(i) => f.write_fmt(format_args!("{}", i)),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Key {
        Key::Name(KString::from_ref(s))
    }
}

impl From<KString> for Key {
    fn from(s: KString) -> Key {
        Key::Name(s)
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Key {
        Key::Index(i)
    }
}

/// An atomic value. Integers are arbitrary precision so any atom
/// representable as an integer stays one.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(BigInt),
    Float(f64),
    Str(KString),
}

impl Scalar {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(n) => n.to_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(n) => n.to_f64(),
            Scalar::Float(x) => Some(*x),
            Scalar::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
           -> Result<(), std::fmt::Error> {
        match self {
            Scalar::Int(n) => n.fmt(f),
            Scalar::Float(x) => {
                // Keep the decimal point on integral floats so a
                // coerced "0.0" exports as "0.0", not "0".
                if x.is_finite() && x.fract() == 0.0 {
                    f.write_fmt(format_args!("{:.1}", x))
                } else {
                    f.write_fmt(format_args!("{}", x))
                }
            }
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

/// What one node holds. Scalar-ish values and child maps are
/// mutually exclusive; there is no variant combining them.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Flag-only: the bare key is the whole content.
    None,
    Scalar(Scalar),
    /// A fixed run of atoms such as `(at -8.89 -6.35)`.
    Scalars(Vec<Scalar>),
    /// A boolean literal, spelling retained for export; truth is
    /// computed on demand, never by implicit conversion.
    Bool(KString),
    /// Presence-implies-true: exports as the bare key when true and
    /// as nothing when false.
    Flag(bool),
    Map(ValueMap),
}

impl Value {
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut ValueMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Value {
        Value::Scalar(s)
    }
}

impl From<Vec<Scalar>> for Value {
    fn from(v: Vec<Scalar>) -> Value {
        Value::Scalars(v)
    }
}

impl From<ValueMap> for Value {
    fn from(m: ValueMap) -> Value {
        Value::Map(m)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Scalar(Scalar::Int(BigInt::from(n)))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Value {
        Value::Scalar(Scalar::Float(x))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Scalar(Scalar::Str(KString::from_ref(s)))
    }
}

impl From<KString> for Value {
    fn from(s: KString) -> Value {
        Value::Scalar(Scalar::Str(s))
    }
}

/// What happens when a second child arrives under an already-used
/// key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Replace silently.
    Overwrite,
    /// A second occurrence is a duplicate-key error; the first stays.
    UniqueOrError,
    /// Collect into a [GroupNode] even for the first occurrence.
    AlwaysGroup,
    /// Plain node first, promoted to a group by the second
    /// occurrence.
    DynamicGroup,
}

/// One parsed key/value pair. Errors recorded while building this
/// node stay local to it; [Node::all_errors] aggregates over the
/// subtree on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    key: Option<Key>,
    value: Value,
    errors: Vec<BuildError>,
}

impl Node {
    pub fn new(key: impl Into<Key>, value: impl Into<Value>) -> Node {
        Node {
            key: Some(key.into()),
            value: value.into(),
            errors: Vec::new(),
        }
    }

    /// An un-named node; the map it lands in assigns a positional
    /// key.
    pub fn anon(value: impl Into<Value>) -> Node {
        Node {
            key: None,
            value: value.into(),
            errors: Vec::new(),
        }
    }

    pub fn flag(key: impl Into<Key>, set: bool) -> Node {
        Node::new(key, Value::Flag(set))
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    /// The key when it is a name; positional keys have none.
    pub fn name(&self) -> Option<&str> {
        self.key.as_ref().and_then(Key::as_name)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    /// Child count; zero for anything that is not a map or a scalar
    /// run.
    pub fn len(&self) -> usize {
        match &self.value {
            Value::Map(map) => map.len(),
            Value::Scalars(row) => row.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: impl Into<Key>) -> Option<&Slot> {
        self.value.as_map()?.get(&key.into())
    }

    pub fn node(&self, key: impl Into<Key>) -> Option<&Node> {
        self.get(key)?.as_node()
    }

    pub fn group(&self, key: impl Into<Key>) -> Option<&GroupNode> {
        self.get(key)?.as_group()
    }

    /// The child's scalar, when the child is a plain leaf.
    pub fn scalar(&self, key: impl Into<Key>) -> Option<&Scalar> {
        match self.node(key)?.value() {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// The child's boolean value, for `Bool` and `Flag` children.
    pub fn get_bool(&self, key: impl Into<Key>) -> Option<bool> {
        self.node(key)?.as_bool()
    }

    /// Wrap a raw value into a fresh child node and insert it under
    /// [MergePolicy::DynamicGroup].
    pub fn set(&mut self, key: impl Into<Key>, value: impl Into<Value>)
               -> Result<(), ModelError> {
        self.insert(Node::new(key, value), MergePolicy::DynamicGroup)
    }

    /// Insert an already-built child; its key must match `key`.
    pub fn set_node(&mut self, key: impl Into<Key>, node: Node)
                    -> Result<(), ModelError> {
        let key = key.into();
        match node.key() {
            Some(k) if *k == key =>
                self.insert(node, MergePolicy::DynamicGroup),
            _ => Err(ModelError::ExpectingKey(key)),
        }
    }

    pub fn insert(&mut self, node: Node, policy: MergePolicy)
                  -> Result<(), ModelError> {
        match self.value.as_map_mut() {
            Some(map) => map.insert(node, policy),
            None => Err(ModelError::NotComposite),
        }
    }

    pub fn remove(&mut self, key: impl Into<Key>) -> Option<Slot> {
        self.value.as_map_mut()?.remove(&key.into())
    }

    /// Children in map order; empty for non-composite nodes.
    pub fn children(&self) -> impl Iterator<Item = &Slot> {
        self.value.as_map().into_iter().flat_map(|map| map.values())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &self.value {
            Value::Bool(text) => coerce::boolean(text),
            Value::Flag(set) => Some(*set),
            _ => None,
        }
    }

    /// Set a boolean node's value. A literal-backed node keeps its
    /// case variant: `Yes` turns into `No`, not `no`.
    pub fn set_bool(&mut self, set: bool) -> Result<(), ModelError> {
        match &mut self.value {
            Value::Flag(current) => {
                *current = set;
                Ok(())
            }
            Value::Bool(text) => {
                let current =
                    coerce::boolean(text).ok_or(ModelError::NotBoolean)?;
                if current != set {
                    let flipped = coerce::toggle_spelling(text)
                        .ok_or(ModelError::NotBoolean)?;
                    *text = KString::from_static(flipped);
                }
                Ok(())
            }
            _ => Err(ModelError::NotBoolean),
        }
    }

    /// Errors recorded against this node only.
    pub fn errors(&self) -> &[BuildError] {
        &self.errors
    }

    pub(crate) fn set_errors(&mut self, errors: Vec<BuildError>) {
        self.errors = errors;
    }

    /// This node's errors plus every descendant's, gathered on
    /// demand.
    pub fn all_errors(&self) -> Vec<&BuildError> {
        let mut out = Vec::new();
        self.collect_errors(&mut out);
        out
    }

    fn collect_errors<'n>(&'n self, out: &mut Vec<&'n BuildError>) {
        out.extend(self.errors.iter());
        if let Value::Map(map) = &self.value {
            for slot in map.values() {
                match slot {
                    Slot::Node(node) => node.collect_errors(out),
                    Slot::Group(group) => {
                        for node in group.iter() {
                            node.collect_errors(out);
                        }
                    }
                }
            }
        }
    }
}

/// A same-key run of nodes. Occupies a single map slot; exports each
/// member independently at the same nesting level. Groups never
/// nest: storage is a flat member list and [GroupNode::push_slot]
/// splices incoming groups.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    key: Key,
    nodes: Vec<Node>,
}

impl GroupNode {
    pub fn new(key: impl Into<Key>) -> GroupNode {
        GroupNode {
            key: key.into(),
            nodes: Vec::new(),
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn push(&mut self, node: Node) -> Result<(), ModelError> {
        match node.key() {
            Some(k) if *k == self.key => {
                self.nodes.push(node);
                Ok(())
            }
            _ => Err(ModelError::ExpectingKey(self.key.clone())),
        }
    }

    /// Append a slot, splicing group members in one by one.
    pub fn push_slot(&mut self, slot: Slot) -> Result<(), ModelError> {
        match slot {
            Slot::Node(node) => self.push(node),
            Slot::Group(group) => {
                for node in group.nodes {
                    self.push(node)?;
                }
                Ok(())
            }
        }
    }
}

/// What one map key resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Node(Node),
    Group(GroupNode),
}

impl Slot {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Slot::Node(n) => Some(n),
            Slot::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupNode> {
        match self {
            Slot::Node(_) => None,
            Slot::Group(g) => Some(g),
        }
    }

    pub fn key(&self) -> Option<&Key> {
        match self {
            Slot::Node(n) => n.key(),
            Slot::Group(g) => Some(g.key()),
        }
    }
}

impl From<Node> for Slot {
    fn from(n: Node) -> Slot {
        Slot::Node(n)
    }
}

impl From<GroupNode> for Slot {
    fn from(g: GroupNode) -> Slot {
        Slot::Group(g)
    }
}

/// Insertion-ordered key -> slot map. Un-named nodes are assigned
/// `Key::Index` values from a counter that only ever counts up, so
/// positional identity is stable across later removals.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueMap {
    slots: IndexMap<Key, Slot>,
    next_index: usize,
}

impl ValueMap {
    pub fn new() -> ValueMap {
        ValueMap::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.slots.contains_key(key)
    }

    pub fn get(&self, key: &Key) -> Option<&Slot> {
        self.slots.get(key)
    }

    pub fn get_mut(&mut self, key: &Key) -> Option<&mut Slot> {
        self.slots.get_mut(key)
    }

    /// Remove a slot, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &Key) -> Option<Slot> {
        self.slots.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.slots.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Slot> {
        self.slots.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Slot)> {
        self.slots.iter()
    }

    fn claim_key(&mut self, node: &mut Node) -> Key {
        match node.key.clone() {
            Some(key) => key,
            None => {
                let key = Key::Index(self.next_index);
                self.next_index += 1;
                node.key = Some(key.clone());
                key
            }
        }
    }

    pub fn insert(&mut self, mut node: Node, policy: MergePolicy)
                  -> Result<(), ModelError> {
        let key = self.claim_key(&mut node);
        if policy == MergePolicy::Overwrite {
            self.slots.insert(key, Slot::Node(node));
            return Ok(());
        }
        match self.slots.entry(key.clone()) {
            Entry::Vacant(entry) => {
                if policy == MergePolicy::AlwaysGroup {
                    let mut group = GroupNode::new(key);
                    group.push(node)?;
                    entry.insert(Slot::Group(group));
                } else {
                    entry.insert(Slot::Node(node));
                }
                Ok(())
            }
            Entry::Occupied(mut entry) => match policy {
                MergePolicy::UniqueOrError =>
                    Err(ModelError::DuplicateKey(key)),
                _ => {
                    let slot = entry.get_mut();
                    match slot {
                        Slot::Group(group) => group.push(node),
                        Slot::Node(_) => {
                            let prev = std::mem::replace(
                                slot,
                                Slot::Group(GroupNode::new(key.clone())));
                            let mut group = GroupNode::new(key);
                            if let Slot::Node(prev) = prev {
                                group.push(prev)?;
                            }
                            group.push(node)?;
                            *slot = Slot::Group(group);
                            Ok(())
                        }
                    }
                }
            },
        }
    }

    /// Insert a handler-produced slot. Groups land as-is under a
    /// fresh key and merge member-wise into an occupied one.
    pub fn insert_slot(&mut self, slot: Slot, policy: MergePolicy)
                       -> Result<(), ModelError> {
        let group = match slot {
            Slot::Node(node) => return self.insert(node, policy),
            Slot::Group(group) => group,
        };
        let key = group.key().clone();
        if policy == MergePolicy::Overwrite {
            self.slots.insert(key, Slot::Group(group));
            return Ok(());
        }
        match self.slots.entry(key.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(Slot::Group(group));
                Ok(())
            }
            Entry::Occupied(mut entry) => match policy {
                MergePolicy::UniqueOrError =>
                    Err(ModelError::DuplicateKey(key)),
                _ => {
                    let slot = entry.get_mut();
                    match slot {
                        Slot::Group(existing) =>
                            existing.push_slot(Slot::Group(group)),
                        Slot::Node(_) => {
                            let prev = std::mem::replace(
                                slot,
                                Slot::Group(GroupNode::new(key.clone())));
                            let mut merged = GroupNode::new(key);
                            if let Slot::Node(prev) = prev {
                                merged.push(prev)?;
                            }
                            merged.push_slot(Slot::Group(group))?;
                            *slot = Slot::Group(merged);
                            Ok(())
                        }
                    }
                }
            },
        }
    }
}
