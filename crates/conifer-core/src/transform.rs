//! The graph engine: topology-preserving transformation of object graphs.
//!
//! [`transform`] maps an input graph onto an output graph of the same shape,
//! driven by three caller-supplied callbacks (container test, expansion, leaf
//! map) bundled into a [`Transformer`]. The walk is fully iterative — input
//! graphs may be arbitrarily deep or cyclic, so recursion is unsafe — and
//! keeps all traversal state (frame stack, visited map) local to one call.
//!
//! # Cycle handling ("tie the knot")
//!
//! With reference tracking enabled, the engine keeps an identity-keyed map
//! from *input* identity to the corresponding (possibly still-incomplete)
//! *output* data. A container's output is allocated and registered **before**
//! its children are visited, so a cyclic child finds its ancestor's output in
//! the map and wires itself to it instead of descending forever. The visited
//! map is keyed on reference identity, never structural equality: two
//! structurally equal but distinct containers must not be conflated.
//!
//! Reference tracking is opt-in (it costs a map). Omitting it on cyclic
//! input is unsupported: the walk will loop or grow without bound. For
//! provably acyclic input it is a performance trade-off only.
//!
//! # Accumulation order
//!
//! Lazy accumulation (depth-first only) changes *when* a completed child is
//! registered with its parent — after its subtree is fully drained
//! (post-order) instead of immediately on discovery (pre-order) — never
//! which children exist. A zero-child container always shortcuts to its
//! empty output regardless of mode.

use std::collections::HashMap;

use crate::error::Result;

/// Traversal strategy for [`transform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Traversal {
    /// Resume the most recently discovered container first.
    #[default]
    DepthFirst,
    /// Drain a container's whole child sequence before descending into any
    /// of the containers it revealed.
    BreadthFirst,
}

/// Options controlling a single [`transform`] invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformOptions {
    pub traversal: Traversal,
    /// Maintain the identity-keyed input-to-output map. Mandatory for
    /// cyclic or sharing-preserving input; optional cost otherwise.
    pub track_references: bool,
    /// Also track leaf identities (meaningful only with `track_references`):
    /// a leaf identity seen before reuses its prior output.
    pub track_scalar_references: bool,
    /// Register completed children with their parent post-order
    /// (meaningful only with depth-first traversal).
    pub lazy_accumulation: bool,
}

impl TransformOptions {
    /// Options with reference tracking enabled — the safe default for any
    /// input that may contain cycles or shared containers.
    pub fn tracking() -> TransformOptions {
        TransformOptions {
            track_references: true,
            ..TransformOptions::default()
        }
    }
}

/// Sink for one output container: the child value under `key` (node children
/// only), plus whether the child was resolved through the visited map rather
/// than freshly built.
pub type Accumulator<D> = Box<dyn FnMut(Option<&str>, D, bool)>;

/// The output side of an expanded container: the data handle registered in
/// the visited map (and eventually returned), and the accumulator its
/// children are fed into. `data` must be a cheap-clone handle — with cycles
/// it is shared before it is complete.
pub struct Output<D> {
    pub data: D,
    pub accumulator: Accumulator<D>,
}

/// An expanded container: its output plus the child sequence `(key, input)`.
/// Keys are `Some` for map-like containers and `None` for sequences.
pub struct Expansion<I, D> {
    pub output: Output<D>,
    pub children: Vec<(Option<String>, I)>,
}

/// The three callbacks driving a transform, plus the identity key used for
/// the visited map. Implementations decide what counts as a container, how
/// one expands into an output and children, and how leaves map across.
pub trait Transformer<I> {
    /// Output data handle. Cloned freely: once per visited-map registration
    /// and once per accumulation.
    type Data: Clone;

    /// Reference identity of `input`. Must be stable for the duration of the
    /// transform and unique per live object; structurally equal but distinct
    /// inputs must yield distinct keys.
    fn identity(&self, input: &I) -> usize;

    /// Whether `input` is a container (expanded) or a leaf (mapped).
    fn is_container(&self, input: &I) -> bool;

    /// Expand a container into its output and child sequence. Should fail
    /// with [`crate::TreeError::InvalidShape`] when handed input that passed
    /// the container test but has no recognizable shape.
    fn expand(&mut self, input: &I) -> Result<Expansion<I, Self::Data>>;

    /// Map a leaf input to its output.
    fn map_leaf(&mut self, input: &I) -> Result<Self::Data>;
}

/// One in-progress container on the explicit stack. `cursor` remembers how
/// far the child sequence has been drained so depth-first traversal can
/// pause a container and resume it after a child completes.
struct Frame<I, D> {
    output: Output<D>,
    children: Vec<(Option<String>, I)>,
    cursor: usize,
    /// Lazy mode only: this container's own `(key, data)` registration with
    /// its parent, flushed when the frame pops.
    pending: Option<(Option<String>, D)>,
}

/// Classification of one child during the walk.
enum Visit<I, D> {
    /// A leaf (or reused leaf identity): accumulate immediately.
    Leaf(D, bool),
    /// A container already in the visited map: accumulate its (possibly
    /// incomplete) registered output, do not descend again.
    Known(D),
    /// A new container with no children: accumulate its empty output, do
    /// not push.
    Empty(D),
    /// A new non-empty container: push its frame.
    Descend(Frame<I, D>, D),
}

/// Map `root`'s graph onto a topologically equivalent output graph.
///
/// Leaves pass through `map_leaf`; containers are expanded once each and
/// their children fed to the expansion's accumulator. The return value is
/// the root's output data (the leaf mapping when the root is not a
/// container). Callback errors propagate unchanged; on error the partially
/// populated output must be discarded by the caller.
pub fn transform<I, T>(root: I, transformer: &mut T, options: TransformOptions) -> Result<T::Data>
where
    I: Clone,
    T: Transformer<I>,
{
    if !transformer.is_container(&root) {
        return transformer.map_leaf(&root);
    }

    let root_id = transformer.identity(&root);
    let expansion = transformer.expand(&root)?;
    let root_data = expansion.output.data.clone();
    if expansion.children.is_empty() {
        return Ok(root_data);
    }

    let mut seen: HashMap<usize, T::Data> = HashMap::new();
    if options.track_references {
        seen.insert(root_id, root_data.clone());
    }

    let mut stack = vec![Frame {
        output: expansion.output,
        children: expansion.children,
        cursor: 0,
        pending: None,
    }];

    match options.traversal {
        Traversal::DepthFirst => {
            let lazy = options.lazy_accumulation;
            while !stack.is_empty() {
                let top = stack.len() - 1;
                if stack[top].cursor >= stack[top].children.len() {
                    // Drained: pop, and in lazy mode register this container
                    // with its own parent now that it is complete.
                    if let Some(finished) = stack.pop() {
                        if let Some((key, data)) = finished.pending {
                            if let Some(parent) = stack.last_mut() {
                                (parent.output.accumulator)(key.as_deref(), data, false);
                            }
                        }
                    }
                    continue;
                }
                let index = stack[top].cursor;
                stack[top].cursor += 1;
                let (key, child) = stack[top].children[index].clone();
                let visit = classify(transformer, &mut seen, &options, &child)?;
                let Some(current) = stack.last_mut() else { break };
                match visit {
                    Visit::Leaf(data, was_circular) => {
                        (current.output.accumulator)(key.as_deref(), data, was_circular);
                    }
                    Visit::Known(data) => {
                        (current.output.accumulator)(key.as_deref(), data, true);
                    }
                    Visit::Empty(data) => {
                        (current.output.accumulator)(key.as_deref(), data, false);
                    }
                    Visit::Descend(mut frame, data) => {
                        if lazy {
                            frame.pending = Some((key, data));
                        } else {
                            (current.output.accumulator)(key.as_deref(), data, false);
                        }
                        // Stop iterating the current container; the walk
                        // resumes with the newly pushed child.
                        stack.push(frame);
                    }
                }
            }
        }
        Traversal::BreadthFirst => {
            while let Some(mut frame) = stack.pop() {
                while frame.cursor < frame.children.len() {
                    let (key, child) = frame.children[frame.cursor].clone();
                    frame.cursor += 1;
                    let visit = classify(transformer, &mut seen, &options, &child)?;
                    match visit {
                        Visit::Leaf(data, was_circular) => {
                            (frame.output.accumulator)(key.as_deref(), data, was_circular);
                        }
                        Visit::Known(data) => {
                            (frame.output.accumulator)(key.as_deref(), data, true);
                        }
                        Visit::Empty(data) => {
                            (frame.output.accumulator)(key.as_deref(), data, false);
                        }
                        Visit::Descend(child_frame, data) => {
                            (frame.output.accumulator)(key.as_deref(), data, false);
                            stack.push(child_frame);
                        }
                    }
                }
            }
        }
    }

    Ok(root_data)
}

/// Classify one child: leaf, known container, empty container, or a new
/// container to descend into. New containers are registered in the visited
/// map *before* their frame is pushed — this is what ties cyclic references
/// back to the in-progress output.
fn classify<I, T>(
    transformer: &mut T,
    seen: &mut HashMap<usize, T::Data>,
    options: &TransformOptions,
    child: &I,
) -> Result<Visit<I, T::Data>>
where
    T: Transformer<I>,
{
    if !transformer.is_container(child) {
        if options.track_references && options.track_scalar_references {
            let id = transformer.identity(child);
            if let Some(prior) = seen.get(&id) {
                return Ok(Visit::Leaf(prior.clone(), true));
            }
            let data = transformer.map_leaf(child)?;
            seen.insert(id, data.clone());
            return Ok(Visit::Leaf(data, false));
        }
        return Ok(Visit::Leaf(transformer.map_leaf(child)?, false));
    }

    if options.track_references {
        let id = transformer.identity(child);
        if let Some(prior) = seen.get(&id) {
            return Ok(Visit::Known(prior.clone()));
        }
        let expansion = transformer.expand(child)?;
        let data = expansion.output.data.clone();
        seen.insert(id, data.clone());
        if expansion.children.is_empty() {
            return Ok(Visit::Empty(data));
        }
        return Ok(Visit::Descend(
            Frame {
                output: expansion.output,
                children: expansion.children,
                cursor: 0,
                pending: None,
            },
            data,
        ));
    }

    let expansion = transformer.expand(child)?;
    let data = expansion.output.data.clone();
    if expansion.children.is_empty() {
        return Ok(Visit::Empty(data));
    }
    Ok(Visit::Descend(
        Frame {
            output: expansion.output,
            children: expansion.children,
            cursor: 0,
            pending: None,
        },
        data,
    ))
}
