//! # conifer-core
//!
//! A format-agnostic configuration-tree library. Configuration data is a
//! small typed tree — scalar, ordered list, or string-keyed node — with deep
//! copy, immutable snapshots, read-through views, and structural
//! equality/hash/rendering. Every operation is iterative and identity-aware:
//! it works on trees that contain cycles and never exhausts the call stack
//! on deeply nested input.
//!
//! ## Quick start
//!
//! ```rust
//! use conifer_core::{deep_copy, from_json, render, Element, Node};
//!
//! let root = Node::new();
//! root.insert("name", "demo".into()).unwrap();
//! root.insert("retries", 3i32.into()).unwrap();
//! let tree = Element::Node(root);
//! assert_eq!(render(&tree), "{name=demo, retries=3}");
//!
//! let copy = deep_copy(&tree).unwrap();
//! assert_eq!(copy, tree);
//!
//! // Host-native object graphs bridge through serde_json::Value.
//! let value = serde_json::json!({"x": [1, 2]});
//! let imported = from_json(&value).unwrap();
//! assert_eq!(render(&imported), "{x=[1, 2]}");
//! ```
//!
//! ## Modules
//!
//! - [`element`] — the `Element` model: scalars, lists, nodes, capability
//!   modes, path access
//! - [`transform`] — the graph engine: topology-preserving transformation
//!   with opt-in cycle tracking
//! - [`structural`] — cycle-safe hash, equality, rendering, cycle test
//! - [`convert`] — deep copy, immutable snapshot, immutable view, mutable copy
//! - [`json`] — bridge to/from host-native `serde_json::Value` graphs
//! - [`error`] — error types shared across the crate

pub mod convert;
pub mod element;
pub mod error;
pub mod json;
pub mod structural;
pub mod transform;

pub use convert::{deep_copy, immutable_snapshot, immutable_view, mutable_copy};
pub use element::{Element, ElementKind, Entry, List, Node, Number, Scalar, Segment};
pub use error::{Result, TreeError};
pub use json::{from_json, to_json};
pub use structural::{hash_code, is_cyclic, render, structural_eq};
pub use transform::{
    transform, Accumulator, Expansion, Output, TransformOptions, Transformer, Traversal,
};
