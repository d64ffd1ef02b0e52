//! Engine behavior tests over a purpose-built input graph type, so leaf
//! identities are stable and sharing/cycles can be constructed directly.

use std::cell::RefCell;
use std::rc::Rc;

use conifer_core::{
    transform, Accumulator, Element, Expansion, List, Output, Scalar, Transformer,
    TransformOptions, TreeError, Traversal,
};

/// Test input graph: a leaf string or a sequence, both behind `Rc` so the
/// same object can appear in several positions (or inside itself).
#[derive(Clone)]
enum In {
    Leaf(Rc<String>),
    Seq(Rc<RefCell<Vec<In>>>),
}

impl In {
    fn leaf(text: &str) -> In {
        In::Leaf(Rc::new(text.to_string()))
    }

    fn seq(children: Vec<In>) -> In {
        In::Seq(Rc::new(RefCell::new(children)))
    }
}

/// One recorded engine callback or accumulation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Expand(String),
    Leaf(String),
    /// (container label, child rendering, was_circular)
    Acc(String, String, bool),
}

/// Maps the `In` graph onto an `Element` tree (leaves become string scalars,
/// sequences become lists) while logging every callback.
struct LoggingTransformer {
    log: Rc<RefCell<Vec<Event>>>,
}

fn label(input: &In) -> String {
    match input {
        In::Leaf(text) => text.to_string(),
        In::Seq(items) => format!("seq{}", items.borrow().len()),
    }
}

impl Transformer<In> for LoggingTransformer {
    type Data = Element;

    fn identity(&self, input: &In) -> usize {
        match input {
            In::Leaf(text) => Rc::as_ptr(text) as usize,
            In::Seq(items) => Rc::as_ptr(items) as usize,
        }
    }

    fn is_container(&self, input: &In) -> bool {
        matches!(input, In::Seq(_))
    }

    fn expand(&mut self, input: &In) -> conifer_core::Result<Expansion<In, Element>> {
        let In::Seq(items) = input else {
            return Err(TreeError::InvalidShape("leaf expanded".to_string()));
        };
        self.log.borrow_mut().push(Event::Expand(label(input)));
        let list = List::new();
        let data = Element::List(list.clone());
        let log = self.log.clone();
        let name = label(input);
        let accumulator: Accumulator<Element> = Box::new(move |_key, value, was_circular| {
            let rendered = match &value {
                Element::Scalar(Scalar::String(s)) => s.clone(),
                other => format!("list#{}", other.container_id().unwrap_or(0) % 97),
            };
            log.borrow_mut()
                .push(Event::Acc(name.clone(), rendered, was_circular));
            list.push(value).unwrap();
        });
        let children = items.borrow().iter().map(|c| (None, c.clone())).collect();
        Ok(Expansion {
            output: Output { data, accumulator },
            children,
        })
    }

    fn map_leaf(&mut self, input: &In) -> conifer_core::Result<Element> {
        self.log.borrow_mut().push(Event::Leaf(label(input)));
        let In::Leaf(text) = input else {
            return Err(TreeError::InvalidShape("container mapped as leaf".to_string()));
        };
        Ok(Element::Scalar(Scalar::String(text.to_string())))
    }
}

fn run(root: In, options: TransformOptions) -> (Element, Vec<Event>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut transformer = LoggingTransformer { log: log.clone() };
    let output = transform(root, &mut transformer, options).expect("transform failed");
    let events = log.borrow().clone();
    (output, events)
}

fn callbacks_only(events: &[Event]) -> Vec<Event> {
    events
        .iter()
        .filter(|e| !matches!(e, Event::Acc(..)))
        .cloned()
        .collect()
}

// ============================================================================
// Basics
// ============================================================================

#[test]
fn leaf_root_maps_directly() {
    let (output, events) = run(In::leaf("hello"), TransformOptions::default());
    assert_eq!(output, "hello".into());
    assert_eq!(events, vec![Event::Leaf("hello".to_string())]);
}

#[test]
fn empty_root_returns_without_walking() {
    let (output, events) = run(In::seq(vec![]), TransformOptions::default());
    let list = output.as_list().unwrap();
    assert!(list.is_empty());
    assert_eq!(events, vec![Event::Expand("seq0".to_string())]);
}

#[test]
fn flat_sequence_maps_shape() {
    let root = In::seq(vec![In::leaf("a"), In::leaf("b")]);
    let (output, _) = run(root, TransformOptions::default());
    let list = output.as_list().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list.get(0).unwrap(), "a".into());
    assert_eq!(list.get(1).unwrap(), "b".into());
}

#[test]
fn nested_empty_container_accumulates_without_push() {
    let root = In::seq(vec![In::seq(vec![]), In::leaf("tail")]);
    let (output, events) = run(root, TransformOptions::default());
    let list = output.as_list().unwrap();
    assert_eq!(list.len(), 2);
    assert!(list.get(0).unwrap().as_list().unwrap().is_empty());
    // The empty child is expanded, accumulated, and never revisited.
    assert_eq!(
        callbacks_only(&events),
        vec![
            Event::Expand("seq2".to_string()),
            Event::Expand("seq0".to_string()),
            Event::Leaf("tail".to_string()),
        ]
    );
}

// ============================================================================
// Traversal order
// ============================================================================

fn order_fixture() -> In {
    // seq[ seq[x, y], z ]
    In::seq(vec![In::seq(vec![In::leaf("x"), In::leaf("y")]), In::leaf("z")])
}

#[test]
fn depth_first_descends_before_siblings() {
    let options = TransformOptions {
        traversal: Traversal::DepthFirst,
        ..TransformOptions::default()
    };
    let (_, events) = run(order_fixture(), options);
    assert_eq!(
        callbacks_only(&events),
        vec![
            Event::Expand("seq2".to_string()),
            Event::Expand("seq2".to_string()),
            Event::Leaf("x".to_string()),
            Event::Leaf("y".to_string()),
            Event::Leaf("z".to_string()),
        ]
    );
}

#[test]
fn breadth_first_drains_siblings_before_descending() {
    let options = TransformOptions {
        traversal: Traversal::BreadthFirst,
        ..TransformOptions::default()
    };
    let (output, events) = run(order_fixture(), options);
    // Same output shape as depth-first; only the visit order changes.
    assert_eq!(output.as_list().unwrap().len(), 2);
    assert_eq!(
        callbacks_only(&events),
        vec![
            Event::Expand("seq2".to_string()),
            Event::Expand("seq2".to_string()),
            Event::Leaf("z".to_string()),
            Event::Leaf("x".to_string()),
            Event::Leaf("y".to_string()),
        ]
    );
}

// ============================================================================
// Lazy accumulation
// ============================================================================

#[test]
fn eager_accumulation_registers_child_on_discovery() {
    let (_, events) = run(order_fixture(), TransformOptions::default());
    // The inner container reaches the root accumulator before its leaves.
    let acc_positions: Vec<&Event> =
        events.iter().filter(|e| matches!(e, Event::Acc(..))).collect();
    assert!(matches!(acc_positions[0], Event::Acc(name, _, false) if name == "seq2"));
    let inner_acc_index = events
        .iter()
        .position(|e| matches!(e, Event::Acc(_, child, _) if child.starts_with("list#")))
        .unwrap();
    let first_leaf_index = events
        .iter()
        .position(|e| matches!(e, Event::Leaf(l) if l == "x"))
        .unwrap();
    assert!(inner_acc_index < first_leaf_index);
}

#[test]
fn lazy_accumulation_registers_child_after_drain() {
    let options = TransformOptions {
        lazy_accumulation: true,
        ..TransformOptions::default()
    };
    let (output, events) = run(order_fixture(), options);
    assert_eq!(output.as_list().unwrap().len(), 2);
    let inner_acc_index = events
        .iter()
        .position(|e| matches!(e, Event::Acc(_, child, _) if child.starts_with("list#")))
        .unwrap();
    let last_leaf_index = events
        .iter()
        .position(|e| matches!(e, Event::Leaf(l) if l == "y"))
        .unwrap();
    // Post-order: the inner container registers only after its last leaf.
    assert!(inner_acc_index > last_leaf_index);
}

#[test]
fn lazy_accumulation_preserves_sibling_order_children() {
    let options = TransformOptions {
        lazy_accumulation: true,
        ..TransformOptions::default()
    };
    let (output, _) = run(order_fixture(), options);
    let root = output.as_list().unwrap();
    // Lazy mode changes when children register, never which children exist.
    // The inner list lands after the trailing leaf in file order here, since
    // its registration was deferred past "z".
    assert_eq!(root.len(), 2);
    assert!(root.entries().iter().any(|e| e.value.kind() == conifer_core::ElementKind::List));
    assert!(root.entries().iter().any(|e| e.value == "z".into()));
}

// ============================================================================
// Reference tracking
// ============================================================================

#[test]
fn tracking_reuses_shared_containers() {
    let shared = In::seq(vec![In::leaf("s")]);
    let root = In::seq(vec![shared.clone(), shared]);
    let (output, events) = run(root, TransformOptions::tracking());
    let list = output.as_list().unwrap();
    assert_eq!(list.len(), 2);
    // Both positions hold the same output container.
    assert_eq!(
        list.get(0).unwrap().container_id(),
        list.get(1).unwrap().container_id()
    );
    // Expanded once; the second occurrence accumulates as circular.
    let expands = events
        .iter()
        .filter(|e| matches!(e, Event::Expand(l) if l == "seq1"))
        .count();
    assert_eq!(expands, 1);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::Acc(_, _, true))));
}

#[test]
fn tracking_ties_cyclic_input_to_ancestor() {
    let inner = Rc::new(RefCell::new(Vec::new()));
    let root = In::Seq(inner.clone());
    inner.borrow_mut().push(In::Seq(inner.clone()));

    let (output, events) = run(root, TransformOptions::tracking());
    let list = output.as_list().unwrap();
    assert_eq!(list.len(), 1);
    // The output contains itself: the knot was tied through the visited map.
    assert_eq!(list.get(0).unwrap().container_id(), Some(list.id()));
    assert!(events.iter().any(|e| matches!(e, Event::Acc(_, _, true))));
}

#[test]
fn scalar_tracking_reuses_shared_leaves() {
    let shared = In::leaf("once");
    let root = In::seq(vec![shared.clone(), shared]);

    let options = TransformOptions {
        track_references: true,
        track_scalar_references: true,
        ..TransformOptions::default()
    };
    let (output, events) = run(root, options);
    assert_eq!(output.as_list().unwrap().len(), 2);
    let leaf_maps = events
        .iter()
        .filter(|e| matches!(e, Event::Leaf(l) if l == "once"))
        .count();
    assert_eq!(leaf_maps, 1);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::Acc(_, child, true) if child == "once")));
}

#[test]
fn without_scalar_tracking_shared_leaves_map_twice() {
    let shared = In::leaf("twice");
    let root = In::seq(vec![shared.clone(), shared]);
    let (_, events) = run(root, TransformOptions::tracking());
    let leaf_maps = events
        .iter()
        .filter(|e| matches!(e, Event::Leaf(l) if l == "twice"))
        .count();
    assert_eq!(leaf_maps, 2);
}

// ============================================================================
// Errors
// ============================================================================

/// A transformer whose container test approves everything but whose expand
/// recognizes nothing.
struct BrokenTransformer;

impl Transformer<In> for BrokenTransformer {
    type Data = Element;

    fn identity(&self, _input: &In) -> usize {
        0
    }

    fn is_container(&self, _input: &In) -> bool {
        true
    }

    fn expand(&mut self, _input: &In) -> conifer_core::Result<Expansion<In, Element>> {
        Err(TreeError::InvalidShape("no recognizable shape".to_string()))
    }

    fn map_leaf(&mut self, _input: &In) -> conifer_core::Result<Element> {
        Ok(Element::null())
    }
}

#[test]
fn invalid_shape_propagates() {
    let mut transformer = BrokenTransformer;
    let err = transform(In::leaf("x"), &mut transformer, TransformOptions::default())
        .unwrap_err();
    assert!(matches!(err, TreeError::InvalidShape(_)));
}

#[test]
fn nested_expand_error_propagates() {
    // Valid root, error surfaced while expanding a child.
    struct FailsOnChild;
    impl Transformer<In> for FailsOnChild {
        type Data = Element;
        fn identity(&self, _input: &In) -> usize {
            0
        }
        fn is_container(&self, input: &In) -> bool {
            matches!(input, In::Seq(_))
        }
        fn expand(&mut self, input: &In) -> conifer_core::Result<Expansion<In, Element>> {
            let In::Seq(items) = input else {
                return Err(TreeError::InvalidShape("leaf".to_string()));
            };
            if items.borrow().len() == 1 {
                return Err(TreeError::InvalidShape("inner container".to_string()));
            }
            let list = List::new();
            let data = Element::List(list.clone());
            let accumulator: Accumulator<Element> =
                Box::new(move |_key, value, _c| list.push(value).unwrap());
            let children = items.borrow().iter().map(|c| (None, c.clone())).collect();
            Ok(Expansion {
                output: Output { data, accumulator },
                children,
            })
        }
        fn map_leaf(&mut self, _input: &In) -> conifer_core::Result<Element> {
            Ok(Element::null())
        }
    }

    let root = In::seq(vec![In::seq(vec![In::leaf("x")]), In::leaf("y")]);
    let mut transformer = FailsOnChild;
    let err = transform(root, &mut transformer, TransformOptions::default()).unwrap_err();
    assert!(matches!(err, TreeError::InvalidShape(message) if message == "inner container"));
}
