//! Cycle-safe structural algorithms: hash, equality, rendering, cycle test.
//!
//! Every traversal here is iterative with an explicit stack and an
//! identity-keyed visited set — the same technique as the graph engine, with
//! bespoke accumulation per algorithm. None of them can overflow the call
//! stack or loop on cyclic input.
//!
//! - [`hash_code`] — post-order hash; lists combine order-sensitively,
//!   nodes order-insensitively
//! - [`structural_eq`] — kind-wise comparison; lists positional, nodes by
//!   key membership
//! - [`render`] — `{k=v, ...}` / `[v, ...]` text with `$N` back-reference
//!   tags for shared and cyclic containers
//! - [`is_cyclic`] — whether any container transitively contains itself

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::Hasher;

use crate::element::{Element, ElementKind, Entry, Number, Scalar};

// ============================================================================
// hash_code
// ============================================================================

/// Structural hash of an element, safe on cyclic and deeply nested trees.
///
/// Lists combine child hashes order-sensitively (`h = h*31 + child`, seed 1);
/// nodes combine order-insensitively (`h = Σ(key_hash ^ child_hash)`, seed 0),
/// so reordering node entries does not change the hash but reordering list
/// elements does. Each container is traversed once: a repeated reference
/// contributes its registered hash (provisionally 0 while the container is
/// still on the stack). Frozen containers cache their computed hash.
pub fn hash_code(element: &Element) -> u64 {
    match element {
        Element::Scalar(scalar) => scalar_hash(scalar),
        Element::List(_) | Element::Node(_) => container_hash(element),
    }
}

struct HashFrame {
    element: Element,
    id: usize,
    entries: Vec<Entry>,
    cursor: usize,
    acc: u64,
}

fn container_hash(root: &Element) -> u64 {
    if let Some(cached) = cached_hash_of(root) {
        return cached;
    }
    let mut visited: HashMap<usize, u64> = HashMap::new();
    let mut stack: Vec<HashFrame> = Vec::new();
    push_hash_frame(root, &mut visited, &mut stack);

    let mut result = 0u64;
    while !stack.is_empty() {
        let top = stack.len() - 1;
        if stack[top].cursor < stack[top].entries.len() {
            let index = stack[top].cursor;
            stack[top].cursor += 1;
            let entry = stack[top].entries[index].clone();

            let known = match &entry.value {
                Element::Scalar(scalar) => Some(scalar_hash(scalar)),
                child => match child.container_id() {
                    Some(id) => visited.get(&id).copied().or_else(|| cached_hash_of(child)),
                    None => None,
                },
            };
            match known {
                Some(child_hash) => {
                    let kind = stack[top].element.kind();
                    stack[top].acc =
                        combine(kind, stack[top].acc, entry.key.as_deref(), child_hash);
                }
                None => push_hash_frame(&entry.value, &mut visited, &mut stack),
            }
            continue;
        }

        // Post-order: finalize, register, cache, and fold into the parent.
        if let Some(finished) = stack.pop() {
            let hash = finished.acc;
            visited.insert(finished.id, hash);
            store_cached_hash(&finished.element, hash);
            match stack.last_mut() {
                Some(parent) => {
                    let key = parent
                        .entries
                        .get(parent.cursor - 1)
                        .and_then(|entry| entry.key.as_deref());
                    parent.acc = combine(parent.element.kind(), parent.acc, key, hash);
                }
                None => result = hash,
            }
        }
    }
    result
}

/// Register a container as in-progress (provisional hash 0) and push its
/// frame. Registration must happen before its children are visited so a
/// cyclic reference folds in the provisional value instead of re-descending.
fn push_hash_frame(element: &Element, visited: &mut HashMap<usize, u64>, stack: &mut Vec<HashFrame>) {
    let (id, entries, seed) = match element {
        Element::List(list) => (list.id(), list.entries(), 1u64),
        Element::Node(node) => (node.id(), node.entries(), 0u64),
        Element::Scalar(_) => return,
    };
    visited.insert(id, 0);
    stack.push(HashFrame {
        element: element.clone(),
        id,
        entries,
        cursor: 0,
        acc: seed,
    });
}

fn combine(kind: ElementKind, acc: u64, key: Option<&str>, child_hash: u64) -> u64 {
    match kind {
        ElementKind::List => acc.wrapping_mul(31).wrapping_add(child_hash),
        ElementKind::Node => {
            let key_hash = key.map(str_hash).unwrap_or(0);
            acc.wrapping_add(key_hash ^ child_hash)
        }
        ElementKind::Scalar => acc,
    }
}

fn cached_hash_of(element: &Element) -> Option<u64> {
    match element {
        Element::List(list) => list.cached_hash(),
        Element::Node(node) => node.cached_hash(),
        Element::Scalar(_) => None,
    }
}

fn store_cached_hash(element: &Element, hash: u64) {
    match element {
        Element::List(list) => list.store_hash(hash),
        Element::Node(node) => node.store_hash(hash),
        Element::Scalar(_) => {}
    }
}

fn scalar_hash(scalar: &Scalar) -> u64 {
    let mut hasher = DefaultHasher::new();
    match scalar {
        Scalar::Null => hasher.write_u8(0),
        Scalar::Bool(value) => {
            hasher.write_u8(1);
            hasher.write_u8(*value as u8);
        }
        Scalar::Char(value) => {
            hasher.write_u8(2);
            hasher.write_u32(*value as u32);
        }
        Scalar::String(value) => {
            hasher.write_u8(3);
            hasher.write(value.as_bytes());
        }
        Scalar::Number(number) => {
            hasher.write_u8(4);
            // Subtype-sensitive, floats by bit pattern — agrees with Eq.
            match number {
                Number::I8(v) => {
                    hasher.write_u8(0);
                    hasher.write_i8(*v);
                }
                Number::I16(v) => {
                    hasher.write_u8(1);
                    hasher.write_i16(*v);
                }
                Number::I32(v) => {
                    hasher.write_u8(2);
                    hasher.write_i32(*v);
                }
                Number::I64(v) => {
                    hasher.write_u8(3);
                    hasher.write_i64(*v);
                }
                Number::F32(v) => {
                    hasher.write_u8(4);
                    hasher.write_u32(v.to_bits());
                }
                Number::F64(v) => {
                    hasher.write_u8(5);
                    hasher.write_u64(v.to_bits());
                }
            }
        }
    }
    hasher.finish()
}

fn str_hash(value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    hasher.write(value.as_bytes());
    hasher.finish()
}

// ============================================================================
// structural_eq
// ============================================================================

enum EqStep {
    Compare(Element, Element),
    Exit(usize),
}

/// Structural equality, safe on cyclic and deeply nested trees.
///
/// Both operands must share container kind at every position. Lists compare
/// positionally; nodes compare by key membership (order-insensitive, sizes
/// equal). Cycles are broken with an identity set over the first operand's
/// containers *on the current comparison path* (enter/exit coloring):
/// re-encountering one short-circuits to "equal so far". The id is dropped
/// when its pair completes, so a shared acyclic sub-container is compared at
/// every occurrence — only genuine back-edges take the shortcut. The
/// shortcut assumes both sides cycle in lockstep; mismatched cyclic shapes
/// that share a common prefix can compare equal.
pub fn structural_eq(a: &Element, b: &Element) -> bool {
    let mut on_path: HashSet<usize> = HashSet::new();
    // View wrappers are memoized weakly; pinning each container entered
    // keeps its identity stable for the rest of the comparison.
    let mut pinned: Vec<Element> = Vec::new();
    let mut work: Vec<EqStep> = vec![EqStep::Compare(a.clone(), b.clone())];

    while let Some(step) = work.pop() {
        let (left, right) = match step {
            EqStep::Exit(id) => {
                on_path.remove(&id);
                continue;
            }
            EqStep::Compare(left, right) => (left, right),
        };
        match (&left, &right) {
            (Element::Scalar(s), Element::Scalar(t)) => {
                if s != t {
                    return false;
                }
            }
            (Element::List(l), Element::List(r)) => {
                if l.id() == r.id() {
                    continue;
                }
                if !on_path.insert(l.id()) {
                    continue;
                }
                pinned.push(left.clone());
                work.push(EqStep::Exit(l.id()));
                let left_entries = l.entries();
                let right_entries = r.entries();
                if left_entries.len() != right_entries.len() {
                    return false;
                }
                for (le, re) in left_entries.into_iter().zip(right_entries) {
                    work.push(EqStep::Compare(le.value, re.value));
                }
            }
            (Element::Node(l), Element::Node(r)) => {
                if l.id() == r.id() {
                    continue;
                }
                if !on_path.insert(l.id()) {
                    continue;
                }
                pinned.push(left.clone());
                work.push(EqStep::Exit(l.id()));
                let left_entries = l.entries();
                if left_entries.len() != r.len() {
                    return false;
                }
                for entry in left_entries {
                    let Some(key) = entry.key else { return false };
                    match r.get(&key) {
                        Some(value) => work.push(EqStep::Compare(entry.value, value)),
                        None => return false,
                    }
                }
            }
            _ => return false,
        }
    }
    true
}

// ============================================================================
// render
// ============================================================================

/// Render an element as text: `{k=v, ...}` for nodes, `[v, ...]` for lists,
/// bare values for scalars.
///
/// Shared and cyclic containers are handled in two passes: the first pass
/// counts identity occurrences, the second renders, prefixing the first
/// occurrence of each multiply-referenced container with a `$N` tag and
/// emitting just `$N` for every later occurrence. A self-containing list
/// renders as `$1[$1]`, never as unbounded repetition.
pub fn render(element: &Element) -> String {
    // The pin roster keeps every counted container (view wrappers included)
    // alive through the second pass, so both passes see the same identities.
    let (shared, _pinned) = shared_containers(element);
    let mut tags: HashMap<usize, usize> = HashMap::new();
    let mut next_tag = 1usize;
    let mut out = String::new();
    let mut stack: Vec<RenderFrame> = Vec::new();

    emit_element(element, &shared, &mut tags, &mut next_tag, &mut out, &mut stack);

    while !stack.is_empty() {
        let top = stack.len() - 1;
        if stack[top].cursor < stack[top].entries.len() {
            let index = stack[top].cursor;
            stack[top].cursor += 1;
            let entry = stack[top].entries[index].clone();
            let kind = stack[top].kind;
            if index > 0 {
                out.push_str(", ");
            }
            if kind == ElementKind::Node {
                if let Some(key) = &entry.key {
                    out.push_str(key);
                }
                out.push('=');
            }
            emit_element(
                &entry.value,
                &shared,
                &mut tags,
                &mut next_tag,
                &mut out,
                &mut stack,
            );
        } else {
            let kind = stack[top].kind;
            out.push(if kind == ElementKind::Node { '}' } else { ']' });
            stack.pop();
        }
    }
    out
}

struct RenderFrame {
    kind: ElementKind,
    entries: Vec<Entry>,
    cursor: usize,
}

/// Emit one element: scalars render inline; containers open a frame unless
/// they were already rendered, in which case only their `$N` tag appears.
fn emit_element(
    element: &Element,
    shared: &HashSet<usize>,
    tags: &mut HashMap<usize, usize>,
    next_tag: &mut usize,
    out: &mut String,
    stack: &mut Vec<RenderFrame>,
) {
    let (id, entries, kind) = match element {
        Element::Scalar(scalar) => {
            out.push_str(&scalar.to_string());
            return;
        }
        Element::List(list) => (list.id(), list.entries(), ElementKind::List),
        Element::Node(node) => (node.id(), node.entries(), ElementKind::Node),
    };

    if let Some(tag) = tags.get(&id) {
        out.push_str(&format!("${tag}"));
        return;
    }
    if shared.contains(&id) {
        tags.insert(id, *next_tag);
        out.push_str(&format!("${next_tag}"));
        *next_tag += 1;
    }
    out.push(if kind == ElementKind::Node { '{' } else { '[' });
    stack.push(RenderFrame {
        kind,
        entries,
        cursor: 0,
    });
}

/// First render pass: identities of containers referenced more than once
/// (including self/ancestor references), plus a pin roster of every container
/// seen — first encounters are pinned so later occurrences (and the second
/// pass) resolve to the same identity. Each container's children are
/// expanded only on its first encounter.
fn shared_containers(root: &Element) -> (HashSet<usize>, Vec<Element>) {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    let mut pinned: Vec<Element> = Vec::new();
    let mut stack: Vec<Element> = vec![root.clone()];
    while let Some(element) = stack.pop() {
        let Some(id) = element.container_id() else { continue };
        let count = counts.entry(id).or_insert(0);
        *count += 1;
        if *count > 1 {
            continue;
        }
        if let Some(entries) = element.entries() {
            for entry in entries {
                stack.push(entry.value);
            }
        }
        pinned.push(element);
    }
    let shared = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(id, _)| id)
        .collect();
    (shared, pinned)
}

// ============================================================================
// is_cyclic
// ============================================================================

enum Walk {
    Enter(Element),
    Exit(usize),
}

/// Whether any container in `root` transitively contains itself.
///
/// Shared acyclic sub-containers (diamonds) are not cycles; only a container
/// reachable from itself counts.
pub fn is_cyclic(root: &Element) -> bool {
    let mut on_path: HashSet<usize> = HashSet::new();
    let mut finished: HashSet<usize> = HashSet::new();
    // Stable identities for weakly memoized view wrappers, as in the other
    // traversals here.
    let mut pinned: Vec<Element> = Vec::new();
    let mut work: Vec<Walk> = vec![Walk::Enter(root.clone())];

    while let Some(step) = work.pop() {
        match step {
            Walk::Enter(element) => {
                let Some(id) = element.container_id() else { continue };
                if on_path.contains(&id) {
                    return true;
                }
                if finished.contains(&id) {
                    continue;
                }
                on_path.insert(id);
                work.push(Walk::Exit(id));
                if let Some(entries) = element.entries() {
                    for entry in entries {
                        work.push(Walk::Enter(entry.value));
                    }
                }
                pinned.push(element);
            }
            Walk::Exit(id) => {
                on_path.remove(&id);
                finished.insert(id);
            }
        }
    }
    false
}
