//! The element model: a small typed configuration tree.
//!
//! An [`Element`] is a scalar, an ordered list, or a string-keyed node
//! (insertion-order-preserving map). Lists and nodes are jointly called
//! *containers*. Containers are cheap-clone handles over shared backing
//! storage, so the same sub-element may appear in several places and a
//! container may (transitively) contain itself — every traversal in this
//! crate is written to survive that.
//!
//! Containers carry one of three capability modes, fixed at construction:
//!
//! - **mutable** — supports insert/remove through interior mutability
//! - **frozen** (immutable-deep) — the whole subtree is permanently
//!   read-only and the structural hash may be cached
//! - **view** (immutable-view) — a read-only wrapper over a live, possibly
//!   mutable backing container; contents track the backing store, but the
//!   wrapper itself rejects mutation
//!
//! Node backing is `Vec<(String, Element)>` rather than a map type: key sets
//! are small in configuration data and insertion order must be preserved.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use crate::error::{Result, TreeError};
use crate::structural;

/// The three element variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Scalar,
    List,
    Node,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ElementKind::Scalar => "scalar",
            ElementKind::List => "list",
            ElementKind::Node => "node",
        })
    }
}

/// A numeric scalar. The declared width/subtype is retained verbatim; reads
/// never widen or narrow, and equality is subtype-sensitive (`I32(1)` is not
/// equal to `I64(1)`).
#[derive(Debug, Clone, Copy)]
pub enum Number {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl PartialEq for Number {
    /// Floats compare by bit pattern so that equality agrees with hashing
    /// (and NaN is equal to itself).
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::I8(a), Number::I8(b)) => a == b,
            (Number::I16(a), Number::I16(b)) => a == b,
            (Number::I32(a), Number::I32(b)) => a == b,
            (Number::I64(a), Number::I64(b)) => a == b,
            (Number::F32(a), Number::F32(b)) => a.to_bits() == b.to_bits(),
            (Number::F64(a), Number::F64(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for Number {}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::I8(v) => write!(f, "{v}"),
            Number::I16(v) => write!(f, "{v}"),
            Number::I32(v) => write!(f, "{v}"),
            Number::I64(v) => write!(f, "{v}"),
            Number::F32(v) => write!(f, "{v}"),
            Number::F64(v) => write!(f, "{v}"),
        }
    }
}

/// A leaf value. There is no representation of "no value" other than
/// [`Scalar::Null`] — an absent reference is never modelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Char(char),
    String(String),
    Number(Number),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// String view of this scalar: strings view as themselves, characters as
    /// one-character strings. Other variants have no string view.
    pub fn as_string_view(&self) -> Option<Cow<'_, str>> {
        match self {
            Scalar::String(s) => Some(Cow::Borrowed(s.as_str())),
            Scalar::Char(c) => Some(Cow::Owned(c.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Char(c) => write!(f, "{c}"),
            Scalar::String(s) => f.write_str(s),
            Scalar::Number(n) => write!(f, "{n}"),
        }
    }
}

/// One entry of a container's entry view.
///
/// `key` is `Some` iff the owning container is a [`Node`]; list entries never
/// carry a key.
#[derive(Debug, Clone)]
pub struct Entry {
    pub key: Option<String>,
    pub value: Element,
}

/// One segment of an access path: a node key or a list index.
#[derive(Debug, Clone, Copy)]
pub enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

impl<'a> From<&'a str> for Segment<'a> {
    fn from(key: &'a str) -> Self {
        Segment::Key(key)
    }
}

impl From<usize> for Segment<'_> {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

// ============================================================================
// List
// ============================================================================

/// An ordered sequence of elements. Cheap-clone handle; clones share backing
/// storage and identity.
#[derive(Debug, Clone)]
pub struct List {
    repr: Rc<ListRepr>,
}

#[derive(Debug)]
enum ListRepr {
    Items {
        items: RefCell<Vec<Element>>,
        /// Set at construction; frozen backing is only ever written through
        /// the crate-private raw-fill path while the snapshot that owns it
        /// is still being assembled.
        frozen: bool,
        /// Cached structural hash, meaningful only when frozen.
        hash: Cell<Option<u64>>,
    },
    View {
        backing: List,
        family: ViewFamily,
    },
}

/// Wrapper registry shared by every view derived from the same root view:
/// backing identity → its (unique) wrapper, held weakly. Sharing the
/// registry keeps wrapper identities stable while the wrappers are alive and
/// closes cycles — a backing container that reaches itself wraps back to the
/// existing wrapper instead of spawning a fresh one per read. Weak handles
/// keep the registry from pinning the views themselves: a wrapper with no
/// outside holder is reclaimed normally and simply rebuilt on the next read.
type ViewFamily = Rc<RefCell<HashMap<usize, WeakContainer>>>;

#[derive(Debug)]
enum WeakContainer {
    List(Weak<ListRepr>),
    Node(Weak<NodeRepr>),
}

impl WeakContainer {
    fn upgrade(&self) -> Option<Element> {
        match self {
            WeakContainer::List(weak) => weak.upgrade().map(|repr| Element::List(List { repr })),
            WeakContainer::Node(weak) => weak.upgrade().map(|repr| Element::Node(Node { repr })),
        }
    }
}

/// Wrap a container child read through a view. Mutable containers get the
/// family's wrapper (created and registered on first sight, rebuilt if the
/// registered one has been dropped); scalars, frozen containers, and foreign
/// views pass through untouched.
fn wrap_in_family(family: &ViewFamily, child: Element) -> Element {
    match &child {
        Element::Scalar(_) => child,
        Element::List(list) => {
            if list.is_frozen() || list.is_view() {
                return child;
            }
            let id = list.id();
            let existing = family.borrow().get(&id).and_then(WeakContainer::upgrade);
            if let Some(existing) = existing {
                return existing;
            }
            Element::List(List::new_view_in(list.clone(), family.clone()))
        }
        Element::Node(node) => {
            if node.is_frozen() || node.is_view() {
                return child;
            }
            let id = node.id();
            let existing = family.borrow().get(&id).and_then(WeakContainer::upgrade);
            if let Some(existing) = existing {
                return existing;
            }
            Element::Node(Node::new_view_in(node.clone(), family.clone()))
        }
    }
}

thread_local! {
    static EMPTY_FROZEN_LIST: List = List {
        repr: Rc::new(ListRepr::Items {
            items: RefCell::new(Vec::new()),
            frozen: true,
            hash: Cell::new(None),
        }),
    };
    static EMPTY_FROZEN_NODE: Node = Node {
        repr: Rc::new(NodeRepr::Items {
            entries: RefCell::new(Vec::new()),
            frozen: true,
            hash: Cell::new(None),
        }),
    };
}

impl List {
    /// New empty mutable list.
    pub fn new() -> List {
        List::with_items(Vec::new())
    }

    /// New mutable list seeded with `items`.
    pub fn with_items(items: Vec<Element>) -> List {
        List {
            repr: Rc::new(ListRepr::Items {
                items: RefCell::new(items),
                frozen: false,
                hash: Cell::new(None),
            }),
        }
    }

    /// The shared empty frozen list for the current thread.
    pub fn empty_frozen() -> List {
        EMPTY_FROZEN_LIST.with(List::clone)
    }

    pub(crate) fn frozen_with_capacity(capacity: usize) -> List {
        List {
            repr: Rc::new(ListRepr::Items {
                items: RefCell::new(Vec::with_capacity(capacity)),
                frozen: true,
                hash: Cell::new(None),
            }),
        }
    }

    pub(crate) fn new_view(backing: List) -> List {
        List::new_view_in(backing, Rc::new(RefCell::new(HashMap::new())))
    }

    /// Build a view inside an existing family and register it there, so any
    /// path through the family that reaches the same backing reuses it.
    fn new_view_in(backing: List, family: ViewFamily) -> List {
        let backing_id = backing.id();
        let view = List {
            repr: Rc::new(ListRepr::View {
                backing,
                family: family.clone(),
            }),
        };
        family
            .borrow_mut()
            .insert(backing_id, WeakContainer::List(Rc::downgrade(&view.repr)));
        view
    }

    /// Identity of this container handle. Two handles are the same container
    /// iff their ids are equal; structurally equal but distinct containers
    /// have distinct ids.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.repr) as usize
    }

    /// Whether this container is immutable-deep (its whole subtree frozen).
    pub fn is_frozen(&self) -> bool {
        matches!(&*self.repr, ListRepr::Items { frozen: true, .. })
    }

    /// Whether this container is a read-only view over a backing list.
    pub fn is_view(&self) -> bool {
        matches!(&*self.repr, ListRepr::View { .. })
    }

    pub fn is_mutable(&self) -> bool {
        matches!(&*self.repr, ListRepr::Items { frozen: false, .. })
    }

    pub fn len(&self) -> usize {
        match &*self.repr {
            ListRepr::Items { items, .. } => items.borrow().len(),
            ListRepr::View { backing, .. } => backing.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ordered entry view. Each call re-reads the live backing state (a
    /// frozen list simply never changes). List entries carry no key.
    pub fn entries(&self) -> Vec<Entry> {
        match &*self.repr {
            ListRepr::Items { items, .. } => items
                .borrow()
                .iter()
                .map(|value| Entry {
                    key: None,
                    value: value.clone(),
                })
                .collect(),
            ListRepr::View { backing, .. } => backing
                .entries()
                .into_iter()
                .map(|entry| Entry {
                    key: None,
                    value: self.wrap_child(entry.value),
                })
                .collect(),
        }
    }

    /// The element at `index`, or `None` when out of range.
    pub fn get(&self, index: usize) -> Option<Element> {
        match &*self.repr {
            ListRepr::Items { items, .. } => items.borrow().get(index).cloned(),
            ListRepr::View { backing, .. } => {
                backing.get(index).map(|child| self.wrap_child(child))
            }
        }
    }

    /// Append an element. Fails on frozen lists and views.
    pub fn push(&self, value: Element) -> Result<()> {
        self.writable()?.borrow_mut().push(value);
        Ok(())
    }

    /// Insert an element at `index`, shifting later elements right.
    pub fn insert(&self, index: usize, value: Element) -> Result<()> {
        let items = self.writable()?;
        let len = items.borrow().len();
        if index > len {
            return Err(TreeError::IndexOutOfBounds { index, len });
        }
        items.borrow_mut().insert(index, value);
        Ok(())
    }

    /// Replace the element at `index`, returning the previous one.
    pub fn set(&self, index: usize, value: Element) -> Result<Element> {
        let items = self.writable()?;
        let mut items = items.borrow_mut();
        let len = items.len();
        match items.get_mut(index) {
            Some(slot) => Ok(std::mem::replace(slot, value)),
            None => Err(TreeError::IndexOutOfBounds { index, len }),
        }
    }

    /// Remove and return the element at `index`.
    pub fn remove(&self, index: usize) -> Result<Element> {
        let items = self.writable()?;
        let len = items.borrow().len();
        if index >= len {
            return Err(TreeError::IndexOutOfBounds { index, len });
        }
        Ok(items.borrow_mut().remove(index))
    }

    fn writable(&self) -> Result<&RefCell<Vec<Element>>> {
        match &*self.repr {
            ListRepr::Items {
                items,
                frozen: false,
                ..
            } => Ok(items),
            _ => Err(TreeError::ImmutableMutation),
        }
    }

    /// Construction-time fill that bypasses the frozen check. Only the
    /// conversion library uses this, while the container is not yet shared.
    pub(crate) fn push_raw(&self, value: Element) {
        if let ListRepr::Items { items, .. } = &*self.repr {
            items.borrow_mut().push(value);
        }
    }

    pub(crate) fn cached_hash(&self) -> Option<u64> {
        match &*self.repr {
            ListRepr::Items { frozen: true, hash, .. } => hash.get(),
            _ => None,
        }
    }

    pub(crate) fn store_hash(&self, value: u64) {
        if let ListRepr::Items { frozen: true, hash, .. } = &*self.repr {
            hash.set(Some(value));
        }
    }

    fn wrap_child(&self, child: Element) -> Element {
        let ListRepr::View { family, .. } = &*self.repr else {
            return child;
        };
        wrap_in_family(family, child)
    }
}

impl Default for List {
    fn default() -> Self {
        List::new()
    }
}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        structural::structural_eq(
            &Element::List(self.clone()),
            &Element::List(other.clone()),
        )
    }
}

// ============================================================================
// Node
// ============================================================================

/// A string-keyed, insertion-order-preserving map of elements. Cheap-clone
/// handle; clones share backing storage and identity.
#[derive(Debug, Clone)]
pub struct Node {
    repr: Rc<NodeRepr>,
}

#[derive(Debug)]
enum NodeRepr {
    Items {
        entries: RefCell<Vec<(String, Element)>>,
        frozen: bool,
        hash: Cell<Option<u64>>,
    },
    View {
        backing: Node,
        family: ViewFamily,
    },
}

impl Node {
    /// New empty mutable node.
    pub fn new() -> Node {
        Node::with_entries(Vec::new())
    }

    /// New mutable node seeded with `entries` (keys assumed distinct).
    pub fn with_entries(entries: Vec<(String, Element)>) -> Node {
        Node {
            repr: Rc::new(NodeRepr::Items {
                entries: RefCell::new(entries),
                frozen: false,
                hash: Cell::new(None),
            }),
        }
    }

    /// The shared empty frozen node for the current thread.
    pub fn empty_frozen() -> Node {
        EMPTY_FROZEN_NODE.with(Node::clone)
    }

    pub(crate) fn frozen_with_capacity(capacity: usize) -> Node {
        Node {
            repr: Rc::new(NodeRepr::Items {
                entries: RefCell::new(Vec::with_capacity(capacity)),
                frozen: true,
                hash: Cell::new(None),
            }),
        }
    }

    pub(crate) fn new_view(backing: Node) -> Node {
        Node::new_view_in(backing, Rc::new(RefCell::new(HashMap::new())))
    }

    fn new_view_in(backing: Node, family: ViewFamily) -> Node {
        let backing_id = backing.id();
        let view = Node {
            repr: Rc::new(NodeRepr::View {
                backing,
                family: family.clone(),
            }),
        };
        family
            .borrow_mut()
            .insert(backing_id, WeakContainer::Node(Rc::downgrade(&view.repr)));
        view
    }

    /// Identity of this container handle (see [`List::id`]).
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.repr) as usize
    }

    pub fn is_frozen(&self) -> bool {
        matches!(&*self.repr, NodeRepr::Items { frozen: true, .. })
    }

    pub fn is_view(&self) -> bool {
        matches!(&*self.repr, NodeRepr::View { .. })
    }

    pub fn is_mutable(&self) -> bool {
        matches!(&*self.repr, NodeRepr::Items { frozen: false, .. })
    }

    pub fn len(&self) -> usize {
        match &*self.repr {
            NodeRepr::Items { entries, .. } => entries.borrow().len(),
            NodeRepr::View { backing, .. } => backing.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ordered entry view (insertion order). Each call re-reads the live
    /// backing state. Node entries always carry a key.
    pub fn entries(&self) -> Vec<Entry> {
        match &*self.repr {
            NodeRepr::Items { entries, .. } => entries
                .borrow()
                .iter()
                .map(|(key, value)| Entry {
                    key: Some(key.clone()),
                    value: value.clone(),
                })
                .collect(),
            NodeRepr::View { backing, .. } => backing
                .entries()
                .into_iter()
                .map(|entry| Entry {
                    key: entry.key,
                    value: self.wrap_child(entry.value),
                })
                .collect(),
        }
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        match &*self.repr {
            NodeRepr::Items { entries, .. } => {
                entries.borrow().iter().map(|(key, _)| key.clone()).collect()
            }
            NodeRepr::View { backing, .. } => backing.keys(),
        }
    }

    /// The value under `key`, or `None` when absent.
    pub fn get(&self, key: &str) -> Option<Element> {
        match &*self.repr {
            NodeRepr::Items { entries, .. } => entries
                .borrow()
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, value)| value.clone()),
            NodeRepr::View { backing, .. } => {
                backing.get(key).map(|child| self.wrap_child(child))
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert a value under `key`. An existing entry is replaced in place
    /// (its position in the insertion order is preserved); a new key is
    /// appended. Returns the previous value, if any.
    pub fn insert(&self, key: impl Into<String>, value: Element) -> Result<Option<Element>> {
        let key = key.into();
        let entries = self.writable()?;
        let mut entries = entries.borrow_mut();
        for (existing, slot) in entries.iter_mut() {
            if *existing == key {
                return Ok(Some(std::mem::replace(slot, value)));
            }
        }
        entries.push((key, value));
        Ok(None)
    }

    /// Remove the entry under `key`, returning its value if it was present.
    pub fn remove(&self, key: &str) -> Result<Option<Element>> {
        let entries = self.writable()?;
        let mut entries = entries.borrow_mut();
        match entries.iter().position(|(k, _)| k == key) {
            Some(index) => Ok(Some(entries.remove(index).1)),
            None => Ok(None),
        }
    }

    fn writable(&self) -> Result<&RefCell<Vec<(String, Element)>>> {
        match &*self.repr {
            NodeRepr::Items {
                entries,
                frozen: false,
                ..
            } => Ok(entries),
            _ => Err(TreeError::ImmutableMutation),
        }
    }

    /// Construction-time fill that bypasses the frozen check (see
    /// [`List::push_raw`]). The source node guarantees key uniqueness.
    pub(crate) fn insert_raw(&self, key: String, value: Element) {
        if let NodeRepr::Items { entries, .. } = &*self.repr {
            entries.borrow_mut().push((key, value));
        }
    }

    pub(crate) fn cached_hash(&self) -> Option<u64> {
        match &*self.repr {
            NodeRepr::Items { frozen: true, hash, .. } => hash.get(),
            _ => None,
        }
    }

    pub(crate) fn store_hash(&self, value: u64) {
        if let NodeRepr::Items { frozen: true, hash, .. } = &*self.repr {
            hash.set(Some(value));
        }
    }

    fn wrap_child(&self, child: Element) -> Element {
        let NodeRepr::View { family, .. } = &*self.repr else {
            return child;
        };
        wrap_in_family(family, child)
    }
}

impl Default for Node {
    fn default() -> Self {
        Node::new()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        structural::structural_eq(
            &Element::Node(self.clone()),
            &Element::Node(other.clone()),
        )
    }
}

// ============================================================================
// Iterative teardown
// ============================================================================

// Default drop glue would recurse once per nesting level, overflowing the
// stack on the same deep trees every traversal here is careful about. When a
// container's backing storage is dropped, its children are drained into an
// explicit worklist instead; a child container whose handle is the last one
// alive gets its own children stolen before it drops with empty storage.
// (Rc cycles keep their reference counts above zero and are not reclaimed —
// that is inherent to cyclic shared trees, not a teardown bug.)

fn drain_dropped_children(mut queue: Vec<Element>) {
    while let Some(element) = queue.pop() {
        match element {
            Element::Scalar(_) => {}
            Element::List(list) => {
                if Rc::strong_count(&list.repr) == 1 {
                    if let ListRepr::Items { items, .. } = &*list.repr {
                        queue.append(&mut items.borrow_mut());
                    }
                }
            }
            Element::Node(node) => {
                if Rc::strong_count(&node.repr) == 1 {
                    if let NodeRepr::Items { entries, .. } = &*node.repr {
                        queue.extend(entries.borrow_mut().drain(..).map(|(_, value)| value));
                    }
                }
            }
        }
    }
}

impl Drop for ListRepr {
    fn drop(&mut self) {
        if let ListRepr::Items { items, .. } = self {
            let children = std::mem::take(items.get_mut());
            if !children.is_empty() {
                drain_dropped_children(children);
            }
        }
    }
}

impl Drop for NodeRepr {
    fn drop(&mut self) {
        if let NodeRepr::Items { entries, .. } = self {
            let children: Vec<Element> = entries
                .get_mut()
                .drain(..)
                .map(|(_, value)| value)
                .collect();
            if !children.is_empty() {
                drain_dropped_children(children);
            }
        }
    }
}

// ============================================================================
// Element
// ============================================================================

/// A configuration tree value: scalar leaf, ordered list, or keyed node.
#[derive(Debug, Clone)]
pub enum Element {
    Scalar(Scalar),
    List(List),
    Node(Node),
}

impl Element {
    /// The null scalar.
    pub fn null() -> Element {
        Element::Scalar(Scalar::Null)
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Scalar(_) => ElementKind::Scalar,
            Element::List(_) => ElementKind::List,
            Element::Node(_) => ElementKind::Node,
        }
    }

    /// Whether this element is a container (list or node).
    pub fn is_container(&self) -> bool {
        !matches!(self, Element::Scalar(_))
    }

    /// Narrow to a scalar, or fail with a type mismatch.
    pub fn as_scalar(&self) -> Result<&Scalar> {
        match self {
            Element::Scalar(scalar) => Ok(scalar),
            other => Err(TreeError::TypeMismatch {
                expected: ElementKind::Scalar,
                actual: other.kind(),
            }),
        }
    }

    /// Narrow to a list handle, or fail with a type mismatch.
    pub fn as_list(&self) -> Result<List> {
        match self {
            Element::List(list) => Ok(list.clone()),
            other => Err(TreeError::TypeMismatch {
                expected: ElementKind::List,
                actual: other.kind(),
            }),
        }
    }

    /// Narrow to a node handle, or fail with a type mismatch.
    pub fn as_node(&self) -> Result<Node> {
        match self {
            Element::Node(node) => Ok(node.clone()),
            other => Err(TreeError::TypeMismatch {
                expected: ElementKind::Node,
                actual: other.kind(),
            }),
        }
    }

    /// Entry view for containers; `None` for scalars.
    pub fn entries(&self) -> Option<Vec<Entry>> {
        match self {
            Element::Scalar(_) => None,
            Element::List(list) => Some(list.entries()),
            Element::Node(node) => Some(node.entries()),
        }
    }

    /// A new empty mutable container of the same kind; `None` for scalars.
    pub fn empty_like(&self) -> Option<Element> {
        match self {
            Element::Scalar(_) => None,
            Element::List(_) => Some(Element::List(List::new())),
            Element::Node(_) => Some(Element::Node(Node::new())),
        }
    }

    /// Container identity, `None` for scalars.
    pub fn container_id(&self) -> Option<usize> {
        match self {
            Element::Scalar(_) => None,
            Element::List(list) => Some(list.id()),
            Element::Node(node) => Some(node.id()),
        }
    }

    /// Walk `path` from this element. An empty path yields `self`. A missing
    /// key, out-of-range index, or kind-mismatched segment yields `None` —
    /// lookup failure is not an error.
    pub fn get_element(&self, path: &[Segment<'_>]) -> Option<Element> {
        let mut current = self.clone();
        for segment in path {
            current = match (segment, &current) {
                (Segment::Key(key), Element::Node(node)) => node.get(key)?,
                (Segment::Index(index), Element::List(list)) => list.get(*index)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Single-segment key lookup; `None` unless this is a node with `key`.
    pub fn get_key(&self, key: &str) -> Option<Element> {
        self.get_element(&[Segment::Key(key)])
    }

    /// Single-segment index lookup; `None` unless this is a list with `index`.
    pub fn get_index(&self, index: usize) -> Option<Element> {
        self.get_element(&[Segment::Index(index)])
    }
}

impl PartialEq for Element {
    /// Structural, cycle-safe equality (see [`crate::structural::structural_eq`]).
    fn eq(&self, other: &Self) -> bool {
        structural::structural_eq(self, other)
    }
}

impl Eq for Element {}

impl Hash for Element {
    /// Structural, cycle-safe hash (see [`crate::structural::hash_code`]).
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(structural::hash_code(self));
    }
}

impl fmt::Display for Element {
    /// Structural, cycle-safe rendering (see [`crate::structural::render`]).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&structural::render(self))
    }
}

// Conversions from host scalar types.

impl From<Scalar> for Element {
    fn from(scalar: Scalar) -> Self {
        Element::Scalar(scalar)
    }
}

impl From<Number> for Element {
    fn from(number: Number) -> Self {
        Element::Scalar(Scalar::Number(number))
    }
}

impl From<bool> for Element {
    fn from(value: bool) -> Self {
        Element::Scalar(Scalar::Bool(value))
    }
}

impl From<char> for Element {
    fn from(value: char) -> Self {
        Element::Scalar(Scalar::Char(value))
    }
}

impl From<&str> for Element {
    fn from(value: &str) -> Self {
        Element::Scalar(Scalar::String(value.to_string()))
    }
}

impl From<String> for Element {
    fn from(value: String) -> Self {
        Element::Scalar(Scalar::String(value))
    }
}

macro_rules! element_from_int {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for Element {
            fn from(value: $ty) -> Self {
                Element::Scalar(Scalar::Number(Number::$variant(value)))
            }
        })*
    };
}

element_from_int! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
}

impl From<List> for Element {
    fn from(list: List) -> Self {
        Element::List(list)
    }
}

impl From<Node> for Element {
    fn from(node: Node) -> Self {
        Element::Node(node)
    }
}
