//! Container conversions: deep copy, immutable snapshot, immutable view,
//! mutable copy.
//!
//! Deep copy, snapshot, and mutable copy are thin instantiations of the
//! graph engine — each pairs a different container factory/accumulator with
//! the same walk, with reference tracking on so cycles and sharing survive
//! the copy. The immutable view is a constant-time wrapper instead: its
//! contents delegate to the live backing container, so there is no tree to
//! build up front.

use crate::element::{Element, ElementKind, List, Node};
use crate::error::{Result, TreeError};
use crate::transform::{transform, Accumulator, Expansion, Output, Transformer, TransformOptions};

/// Deep copy of a tree. Every mutable container is replaced with a fresh
/// mutable container of the same kind; scalars clone through; frozen
/// containers and views are returned as-is, never copied. Cycles and shared
/// references are preserved in the copy's topology.
pub fn deep_copy(element: &Element) -> Result<Element> {
    convert(element, CopyMode::Deep)
}

/// Immutable-deep snapshot of a tree. Containers are rebuilt as frozen,
/// pre-sized storage (filled during construction, permanently read-only
/// afterwards); empty containers map to the shared empty-frozen singletons;
/// already-frozen containers short-circuit as-is, so snapshotting a snapshot
/// returns the same instance. Views are copied through — their current
/// contents materialize into the snapshot.
pub fn immutable_snapshot(element: &Element) -> Result<Element> {
    convert(element, CopyMode::Snapshot)
}

/// Fully mutable deep copy. Unlike [`deep_copy`], this copies *through*
/// frozen containers and views, producing a tree that is mutable at every
/// level.
pub fn mutable_copy(element: &Element) -> Result<Element> {
    convert(element, CopyMode::Mutable)
}

/// Read-only view over a container. Reads delegate live to the backing
/// store — mutations of the backing container remain visible through the
/// view — while the view itself rejects mutation. Container children are
/// wrapped on read and memoized weakly by backing identity: reads hand back
/// the same wrapper while it is held anywhere, and rebuild it otherwise.
/// Scalars, frozen containers, and existing views are returned as-is.
pub fn immutable_view(element: &Element) -> Element {
    match element {
        Element::Scalar(_) => element.clone(),
        Element::List(list) => {
            if list.is_frozen() || list.is_view() {
                element.clone()
            } else {
                Element::List(List::new_view(list.clone()))
            }
        }
        Element::Node(node) => {
            if node.is_frozen() || node.is_view() {
                element.clone()
            } else {
                Element::Node(Node::new_view(node.clone()))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CopyMode {
    Deep,
    Snapshot,
    Mutable,
}

fn convert(element: &Element, mode: CopyMode) -> Result<Element> {
    let mut transformer = CopyTransformer { mode };
    transform(element.clone(), &mut transformer, TransformOptions::tracking())
}

struct CopyTransformer {
    mode: CopyMode,
}

impl CopyTransformer {
    /// Whether a container with these capability tags is rebuilt (true) or
    /// passed through the leaf map untouched (false).
    fn copies(&self, frozen: bool, view: bool) -> bool {
        match self.mode {
            CopyMode::Deep => !frozen && !view,
            CopyMode::Snapshot => !frozen,
            CopyMode::Mutable => true,
        }
    }
}

impl Transformer<Element> for CopyTransformer {
    type Data = Element;

    fn identity(&self, input: &Element) -> usize {
        input.container_id().unwrap_or(0)
    }

    fn is_container(&self, input: &Element) -> bool {
        match input {
            Element::Scalar(_) => false,
            Element::List(list) => self.copies(list.is_frozen(), list.is_view()),
            Element::Node(node) => self.copies(node.is_frozen(), node.is_view()),
        }
    }

    fn expand(&mut self, input: &Element) -> Result<Expansion<Element, Element>> {
        let entries = input
            .entries()
            .ok_or_else(|| TreeError::InvalidShape("cannot expand a scalar".to_string()))?;
        let children: Vec<(Option<String>, Element)> = entries
            .into_iter()
            .map(|entry| (entry.key, entry.value))
            .collect();

        let output = match (input.kind(), self.mode) {
            (ElementKind::List, CopyMode::Snapshot) => {
                let list = if children.is_empty() {
                    List::empty_frozen()
                } else {
                    List::frozen_with_capacity(children.len())
                };
                list_output(list)
            }
            (ElementKind::List, _) => list_output(List::new()),
            (ElementKind::Node, CopyMode::Snapshot) => {
                let node = if children.is_empty() {
                    Node::empty_frozen()
                } else {
                    Node::frozen_with_capacity(children.len())
                };
                node_output(node)
            }
            (ElementKind::Node, _) => node_output(Node::new()),
            (ElementKind::Scalar, _) => {
                return Err(TreeError::InvalidShape(
                    "cannot expand a scalar".to_string(),
                ))
            }
        };
        Ok(Expansion { output, children })
    }

    fn map_leaf(&mut self, input: &Element) -> Result<Element> {
        // Scalars, plus whichever containers this mode passes through.
        Ok(input.clone())
    }
}

fn list_output(list: List) -> Output<Element> {
    let data = Element::List(list.clone());
    let accumulator: Accumulator<Element> =
        Box::new(move |_key, value, _was_circular| list.push_raw(value));
    Output { data, accumulator }
}

fn node_output(node: Node) -> Output<Element> {
    let data = Element::Node(node.clone());
    let accumulator: Accumulator<Element> = Box::new(move |key, value, _was_circular| {
        if let Some(key) = key {
            node.insert_raw(key.to_string(), value);
        }
    });
    Output { data, accumulator }
}
