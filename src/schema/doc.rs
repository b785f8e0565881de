//! JSON schema documents.
//!
//! A document is either a bare node or `{ "definitions": {...}, "root": node }`.
//! Nodes are tagged by `type`:
//!
//! ```json
//! {
//!   "definitions": {
//!     "Category": {
//!       "type": "object",
//!       "shape": {
//!         "name": { "type": "string", "min": 1 },
//!         "children": { "type": "array", "element": { "type": "lazy", "ref": "Category" } }
//!       }
//!     }
//!   },
//!   "root": { "type": "lazy", "ref": "Category" }
//! }
//! ```
//!
//! `lazy` nodes resolve by name when the validator or the introspector asks
//! for them, so definitions may refer to themselves or to each other.

use std::cell::RefCell;
use std::path::Path;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::{Schema, SchemaDef, StringDef, NumberDef, ObjectDef, ArrayDef, TupleDef};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("at JSON path {path} → {message}")]
    Parse { path: String, message: String },
    #[error("lazy reference to unknown definition `{name}`")]
    UnknownReference { name: String },
    #[error("invalid pattern /{pattern}/: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Parsed, not yet compiled, document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    #[serde(default)]
    pub definitions: IndexMap<String, NodeDoc>,
    pub root: NodeDoc,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub enum NodeDoc {
    String {
        description: Option<String>,
        min: Option<usize>,
        max: Option<usize>,
        length: Option<usize>,
        pattern: Option<String>,
    },
    Number {
        description: Option<String>,
        min: Option<f64>,
        max: Option<f64>,
        #[serde(default)]
        int: bool,
    },
    Bigint { description: Option<String> },
    Boolean { description: Option<String> },
    Date { description: Option<String> },
    Enum {
        description: Option<String>,
        values: Vec<String>,
    },
    Literal {
        description: Option<String>,
        value: Value,
    },
    Null { description: Option<String> },
    Undefined { description: Option<String> },
    Any { description: Option<String> },
    Unknown { description: Option<String> },
    Never { description: Option<String> },
    Object {
        description: Option<String>,
        #[serde(default)]
        shape: IndexMap<String, NodeDoc>,
        #[serde(default)]
        strict: bool,
    },
    Array {
        description: Option<String>,
        element: Box<NodeDoc>,
        min: Option<usize>,
        max: Option<usize>,
    },
    Tuple {
        description: Option<String>,
        items: Vec<NodeDoc>,
        rest: Option<Box<NodeDoc>>,
    },
    /// `key` defaults to an unconstrained string.
    Record {
        description: Option<String>,
        key: Option<Box<NodeDoc>>,
        value: Box<NodeDoc>,
    },
    Union {
        description: Option<String>,
        options: Vec<NodeDoc>,
    },
    Intersection {
        description: Option<String>,
        left: Box<NodeDoc>,
        right: Box<NodeDoc>,
    },
    Optional {
        description: Option<String>,
        inner: Box<NodeDoc>,
    },
    Nullable {
        description: Option<String>,
        inner: Box<NodeDoc>,
    },
    Default {
        description: Option<String>,
        inner: Box<NodeDoc>,
        value: Value,
    },
    Catch {
        description: Option<String>,
        inner: Box<NodeDoc>,
        value: Value,
    },
    Lazy {
        description: Option<String>,
        #[serde(rename = "ref")]
        reference: String,
    },
    Pipeline {
        description: Option<String>,
        input: Box<NodeDoc>,
        output: Box<NodeDoc>,
    },
    Brand {
        description: Option<String>,
        inner: Box<NodeDoc>,
        brand: String,
    },
}

/// A document turned into live [`Schema`] nodes. Keeps the definition table
/// alive for the lazy nodes that point into it.
pub struct CompiledSchema {
    root: Schema,
    definitions: Rc<Definitions>,
}

#[derive(Default)]
struct Definitions {
    nodes: RefCell<IndexMap<String, Schema>>,
}

// ————————————————————————————————————————————————————————————————————————————
// LOADING
// ————————————————————————————————————————————————————————————————————————————

impl SchemaDocument {
    pub fn from_json_str(src: &str) -> Result<Self, DocumentError> {
        let value = crate::path_de::from_str_with_path::<Value>(src)?;
        Self::from_value(value)
    }

    /// Accepts both the `{definitions, root}` form and a bare node.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        if value.get("root").is_some() {
            return crate::path_de::from_value_with_path(value);
        }
        let root = crate::path_de::from_value_with_path::<NodeDoc>(value)?;
        Ok(SchemaDocument { definitions: IndexMap::new(), root })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&src)
    }

    /// Build live nodes. Every `lazy` reference must name a definition.
    pub fn compile(&self) -> Result<CompiledSchema, DocumentError> {
        let mut refs = Vec::new();
        collect_refs(&self.root, &mut refs);
        self.definitions.values().for_each(|d| collect_refs(d, &mut refs));
        if let Some(name) = refs.into_iter().find(|r| !self.definitions.contains_key(*r)) {
            return Err(DocumentError::UnknownReference { name: name.to_owned() });
        }

        let definitions = Rc::new(Definitions::default());
        let weak = Rc::downgrade(&definitions);
        for (name, node) in &self.definitions {
            let schema = build(node, &weak)?;
            definitions.nodes.borrow_mut().insert(name.clone(), schema);
        }
        let root = build(&self.root, &weak)?;
        tracing::debug!(definitions = self.definitions.len(), "compiled schema document");
        Ok(CompiledSchema { root, definitions })
    }
}

impl NodeDoc {
    pub fn description(&self) -> Option<&str> {
        let description = match self {
            NodeDoc::String { description, .. }
            | NodeDoc::Number { description, .. }
            | NodeDoc::Bigint { description }
            | NodeDoc::Boolean { description }
            | NodeDoc::Date { description }
            | NodeDoc::Enum { description, .. }
            | NodeDoc::Literal { description, .. }
            | NodeDoc::Null { description }
            | NodeDoc::Undefined { description }
            | NodeDoc::Any { description }
            | NodeDoc::Unknown { description }
            | NodeDoc::Never { description }
            | NodeDoc::Object { description, .. }
            | NodeDoc::Array { description, .. }
            | NodeDoc::Tuple { description, .. }
            | NodeDoc::Record { description, .. }
            | NodeDoc::Union { description, .. }
            | NodeDoc::Intersection { description, .. }
            | NodeDoc::Optional { description, .. }
            | NodeDoc::Nullable { description, .. }
            | NodeDoc::Default { description, .. }
            | NodeDoc::Catch { description, .. }
            | NodeDoc::Lazy { description, .. }
            | NodeDoc::Pipeline { description, .. }
            | NodeDoc::Brand { description, .. } => description,
        };
        description.as_deref()
    }
}

impl CompiledSchema {
    pub fn root(&self) -> &Schema {
        &self.root
    }

    pub fn definition(&self, name: &str) -> Option<Schema> {
        self.definitions.get(name)
    }
}

impl Definitions {
    fn get(&self, name: &str) -> Option<Schema> {
        self.nodes.borrow().get(name).cloned()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn collect_refs<'a>(node: &'a NodeDoc, out: &mut Vec<&'a str>) {
    match node {
        NodeDoc::Lazy { reference, .. } => out.push(reference),
        NodeDoc::Object { shape, .. } => shape.values().for_each(|n| collect_refs(n, out)),
        NodeDoc::Array { element, .. } => collect_refs(element, out),
        NodeDoc::Tuple { items, rest, .. } => {
            items.iter().for_each(|n| collect_refs(n, out));
            if let Some(rest) = rest {
                collect_refs(rest, out);
            }
        }
        NodeDoc::Record { key, value, .. } => {
            if let Some(key) = key {
                collect_refs(key, out);
            }
            collect_refs(value, out);
        }
        NodeDoc::Union { options, .. } => options.iter().for_each(|n| collect_refs(n, out)),
        NodeDoc::Intersection { left, right, .. } | NodeDoc::Pipeline { input: left, output: right, .. } => {
            collect_refs(left, out);
            collect_refs(right, out);
        }
        NodeDoc::Optional { inner, .. }
        | NodeDoc::Nullable { inner, .. }
        | NodeDoc::Default { inner, .. }
        | NodeDoc::Catch { inner, .. }
        | NodeDoc::Brand { inner, .. } => collect_refs(inner, out),
        _ => {}
    }
}

fn build(node: &NodeDoc, defs: &Weak<Definitions>) -> Result<Schema, DocumentError> {
    let def = match node {
        NodeDoc::String { min, max, length, pattern, .. } => {
            let pattern = match pattern {
                Some(p) => Some(regex::Regex::new(p).map_err(|source| DocumentError::InvalidPattern {
                    pattern: p.clone(),
                    source,
                })?),
                None => None,
            };
            SchemaDef::String(StringDef {
                min: length.or(*min),
                max: length.or(*max),
                pattern,
            })
        }
        NodeDoc::Number { min, max, int, .. } => SchemaDef::Number(NumberDef { min: *min, max: *max, int: *int }),
        NodeDoc::Bigint { .. } => SchemaDef::BigInt,
        NodeDoc::Boolean { .. } => SchemaDef::Boolean,
        NodeDoc::Date { .. } => SchemaDef::Date,
        NodeDoc::Enum { values, .. } => SchemaDef::Enum(values.clone()),
        NodeDoc::Literal { value, .. } => SchemaDef::Literal(value.clone()),
        NodeDoc::Null { .. } => SchemaDef::Null,
        NodeDoc::Undefined { .. } => SchemaDef::Undefined,
        NodeDoc::Any { .. } => SchemaDef::Any,
        NodeDoc::Unknown { .. } => SchemaDef::Unknown,
        NodeDoc::Never { .. } => SchemaDef::Never,
        NodeDoc::Object { shape, strict, .. } => {
            let mut fields = IndexMap::with_capacity(shape.len());
            for (name, field) in shape {
                fields.insert(name.clone(), build(field, defs)?);
            }
            SchemaDef::Object(ObjectDef { shape: fields, strict: *strict })
        }
        NodeDoc::Array { element, min, max, .. } => SchemaDef::Array(ArrayDef {
            element: build(element, defs)?,
            min: *min,
            max: *max,
        }),
        NodeDoc::Tuple { items, rest, .. } => SchemaDef::Tuple(TupleDef {
            items: items.iter().map(|n| build(n, defs)).collect::<Result<_, _>>()?,
            rest: rest.as_deref().map(|n| build(n, defs)).transpose()?,
        }),
        NodeDoc::Record { key, value, .. } => SchemaDef::Record {
            key: match key {
                Some(key) => build(key, defs)?,
                None => Schema::string(),
            },
            value: build(value, defs)?,
        },
        NodeDoc::Union { options, .. } => {
            SchemaDef::Union(options.iter().map(|n| build(n, defs)).collect::<Result<_, _>>()?)
        }
        NodeDoc::Intersection { left, right, .. } => SchemaDef::Intersection {
            left: build(left, defs)?,
            right: build(right, defs)?,
        },
        NodeDoc::Optional { inner, .. } => SchemaDef::Optional(build(inner, defs)?),
        NodeDoc::Nullable { inner, .. } => SchemaDef::Nullable(build(inner, defs)?),
        NodeDoc::Default { inner, value, .. } => SchemaDef::Default { inner: build(inner, defs)?, value: value.clone() },
        NodeDoc::Catch { inner, value, .. } => SchemaDef::Catch { inner: build(inner, defs)?, fallback: value.clone() },
        NodeDoc::Lazy { reference, .. } => {
            let defs = defs.clone();
            let name = reference.clone();
            // dropped table resolves to `never`
            SchemaDef::Lazy(Rc::new(move || {
                defs.upgrade()
                    .and_then(|d| d.get(&name))
                    .unwrap_or_else(Schema::never)
            }))
        }
        NodeDoc::Pipeline { input, output, .. } => SchemaDef::Pipeline {
            input: build(input, defs)?,
            output: build(output, defs)?,
        },
        NodeDoc::Brand { inner, brand, .. } => SchemaDef::Branded { inner: build(inner, defs)?, brand: brand.clone() },
    };
    let schema = Schema::new(def);
    Ok(match node.description() {
        Some(text) => schema.describe(text),
        None => schema,
    })
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
