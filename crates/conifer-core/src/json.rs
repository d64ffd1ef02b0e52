//! Bridge between element trees and the host-native object graph
//! (`serde_json::Value`).
//!
//! External codecs never see element internals: they hand a generic value
//! graph to [`from_json`] and get one back from [`to_json`]. Both directions
//! are instantiations of the graph engine, so deeply nested input cannot
//! overflow the call stack.
//!
//! Insertion order of object keys is preserved end to end (serde_json's
//! `preserve_order` feature keeps maps insertion-ordered).

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::element::{Element, List, Node, Number, Scalar};
use crate::error::{Result, TreeError};
use crate::structural::is_cyclic;
use crate::transform::{
    transform, Accumulator, Expansion, Output, Transformer, TransformOptions, Traversal,
};

/// Build an element tree from a host-native JSON value.
///
/// Objects become nodes (insertion order preserved), arrays become lists,
/// and primitives become scalars. Integers map to [`Number::I64`]; all other
/// numerics map to [`Number::F64`]. JSON values are acyclic by construction,
/// so the walk runs without reference tracking.
pub fn from_json(value: &Value) -> Result<Element> {
    let mut importer = JsonImporter;
    transform(value, &mut importer, TransformOptions::default())
}

/// Encode an element tree as a host-native JSON value.
///
/// Cyclic trees cannot be represented and fail with
/// [`TreeError::InvalidShape`]; shared acyclic subtrees materialize as
/// duplicates. Character scalars encode as one-character strings; non-finite
/// floats encode as JSON null.
pub fn to_json(element: &Element) -> Result<Value> {
    if is_cyclic(element) {
        return Err(TreeError::InvalidShape(
            "cyclic tree cannot be encoded as JSON".to_string(),
        ));
    }
    let mut exporter = JsonExporter;
    // Lazy accumulation: a child's value is moved into its parent only once
    // the child's subtree is complete.
    let options = TransformOptions {
        traversal: Traversal::DepthFirst,
        lazy_accumulation: true,
        ..TransformOptions::default()
    };
    let cell = transform(element.clone(), &mut exporter, options)?;
    let value = cell.borrow_mut().take();
    Ok(value)
}

// ============================================================================
// JSON → Element
// ============================================================================

struct JsonImporter;

impl<'a> Transformer<&'a Value> for JsonImporter {
    type Data = Element;

    fn identity(&self, input: &&'a Value) -> usize {
        *input as *const Value as usize
    }

    fn is_container(&self, input: &&'a Value) -> bool {
        input.is_object() || input.is_array()
    }

    fn expand(&mut self, input: &&'a Value) -> Result<Expansion<&'a Value, Element>> {
        match input {
            Value::Array(items) => {
                let list = List::new();
                let data = Element::List(list.clone());
                let accumulator: Accumulator<Element> =
                    Box::new(move |_key, value, _was_circular| list.push_raw(value));
                let children = items.iter().map(|item| (None, item)).collect();
                Ok(Expansion {
                    output: Output { data, accumulator },
                    children,
                })
            }
            Value::Object(map) => {
                let node = Node::new();
                let data = Element::Node(node.clone());
                let accumulator: Accumulator<Element> =
                    Box::new(move |key, value, _was_circular| {
                        if let Some(key) = key {
                            node.insert_raw(key.to_string(), value);
                        }
                    });
                let children = map
                    .iter()
                    .map(|(key, value)| (Some(key.clone()), value))
                    .collect();
                Ok(Expansion {
                    output: Output { data, accumulator },
                    children,
                })
            }
            _ => Err(TreeError::InvalidShape(
                "expected a JSON object or array".to_string(),
            )),
        }
    }

    fn map_leaf(&mut self, input: &&'a Value) -> Result<Element> {
        Ok(match input {
            Value::Null => Element::null(),
            Value::Bool(value) => (*value).into(),
            Value::Number(number) => {
                if let Some(i) = number.as_i64() {
                    Number::I64(i).into()
                } else if let Some(f) = number.as_f64() {
                    Number::F64(f).into()
                } else {
                    Element::null()
                }
            }
            Value::String(value) => value.as_str().into(),
            Value::Array(_) | Value::Object(_) => {
                return Err(TreeError::InvalidShape(
                    "containers do not map as leaves".to_string(),
                ))
            }
        })
    }
}

// ============================================================================
// Element → JSON
// ============================================================================

/// Output handle while a JSON value is under construction. Shared between
/// the engine's bookkeeping and the parent's accumulator; the parent takes
/// the finished value out when the child completes.
type JsonCell = Rc<RefCell<Value>>;

struct JsonExporter;

impl Transformer<Element> for JsonExporter {
    type Data = JsonCell;

    fn identity(&self, input: &Element) -> usize {
        input.container_id().unwrap_or(0)
    }

    fn is_container(&self, input: &Element) -> bool {
        input.is_container()
    }

    fn expand(&mut self, input: &Element) -> Result<Expansion<Element, JsonCell>> {
        let entries = input
            .entries()
            .ok_or_else(|| TreeError::InvalidShape("cannot expand a scalar".to_string()))?;
        let children: Vec<(Option<String>, Element)> = entries
            .into_iter()
            .map(|entry| (entry.key, entry.value))
            .collect();

        let (cell, accumulator) = match input {
            Element::List(_) => {
                let cell = Rc::new(RefCell::new(Value::Array(Vec::with_capacity(
                    children.len(),
                ))));
                let sink = cell.clone();
                let accumulator: Accumulator<JsonCell> =
                    Box::new(move |_key, child: JsonCell, _was_circular| {
                        let value = child.borrow_mut().take();
                        if let Value::Array(items) = &mut *sink.borrow_mut() {
                            items.push(value);
                        }
                    });
                (cell, accumulator)
            }
            Element::Node(_) => {
                let cell = Rc::new(RefCell::new(Value::Object(Map::new())));
                let sink = cell.clone();
                let accumulator: Accumulator<JsonCell> =
                    Box::new(move |key, child: JsonCell, _was_circular| {
                        let value = child.borrow_mut().take();
                        if let (Some(key), Value::Object(map)) =
                            (key, &mut *sink.borrow_mut())
                        {
                            map.insert(key.to_string(), value);
                        }
                    });
                (cell, accumulator)
            }
            Element::Scalar(_) => {
                return Err(TreeError::InvalidShape(
                    "cannot expand a scalar".to_string(),
                ))
            }
        };
        Ok(Expansion {
            output: Output {
                data: cell,
                accumulator,
            },
            children,
        })
    }

    fn map_leaf(&mut self, input: &Element) -> Result<JsonCell> {
        let scalar = input.as_scalar()?;
        let value = match scalar {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Char(c) => Value::String(c.to_string()),
            Scalar::String(s) => Value::String(s.clone()),
            Scalar::Number(number) => number_to_json(number),
        };
        Ok(Rc::new(RefCell::new(value)))
    }
}

fn number_to_json(number: &Number) -> Value {
    match number {
        Number::I8(v) => Value::from(*v as i64),
        Number::I16(v) => Value::from(*v as i64),
        Number::I32(v) => Value::from(*v as i64),
        Number::I64(v) => Value::from(*v),
        Number::F32(v) => float_to_json(*v as f64),
        Number::F64(v) => float_to_json(*v),
    }
}

/// Non-finite floats have no JSON representation and encode as null.
fn float_to_json(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
