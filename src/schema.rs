//! Schema node model.
//!
//! Immutable, `Rc`-shared validation nodes built with a fluent API:
//!
//! ```ignore
//! let user = Schema::object([
//!     ("name", Schema::string().min(1)),
//!     ("nickname", Schema::string().optional()),
//!     ("tags", Schema::array(Schema::string())),
//! ]);
//! assert!(user.accepts(Some(&json!({ "name": "ada", "tags": [] }))));
//! ```
//!
//! Values are `serde_json::Value`; an *absent* value (no key, nothing
//! supplied) is `None`, which is distinct from `Some(&Value::Null)`.
//! Builders never mutate a node: every constraint call returns a new node.
pub mod check;
pub mod doc;

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

pub use check::Issue;
pub use doc::{DocumentError, SchemaDocument};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Handle to a shared, immutable schema node. The description rides on the
/// handle, so describing a node keeps its identity.
#[derive(Clone)]
pub struct Schema {
    def: Rc<SchemaDef>,
    description: Option<Rc<str>>,
}

/// Resolver behind a lazy node. Called on every resolution; may build a fresh
/// tree each time or hand back a node that refers to itself.
pub type Resolver = Rc<dyn Fn() -> Schema>;

/// User-supplied refinement. `Ok(false)` rejects with the refinement's
/// message; `Err` means the check itself failed, which is also a rejection.
pub type Refinement = Rc<dyn Fn(Option<&Value>) -> Result<bool, CheckError>>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("refinement failed to run: {0}")]
pub struct CheckError(pub String);

pub enum SchemaDef {
    String(StringDef),
    Number(NumberDef),
    BigInt,
    Boolean,
    Date,
    Enum(Vec<String>),
    Literal(Value),
    Null,
    Undefined,
    Any,
    Unknown,
    Never,
    Object(ObjectDef),
    Array(ArrayDef),
    Tuple(TupleDef),
    Record { key: Schema, value: Schema },
    Union(Vec<Schema>),
    Intersection { left: Schema, right: Schema },
    Optional(Schema),
    Nullable(Schema),
    Default { inner: Schema, value: Value },
    Catch { inner: Schema, fallback: Value },
    Lazy(Resolver),
    Effects { input: Schema, effect: Effect },
    Pipeline { input: Schema, output: Schema },
    Branded { inner: Schema, brand: String },
}

#[derive(Debug, Clone, Default)]
pub struct StringDef {
    pub min: Option<usize>,
    pub max: Option<usize>,
    pub pattern: Option<Regex>,
}

#[derive(Debug, Clone, Default)]
pub struct NumberDef {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub int: bool,
}

#[derive(Clone)]
pub struct ObjectDef {
    pub shape: IndexMap<String, Schema>,
    /// reject keys missing from `shape`
    pub strict: bool,
}

#[derive(Clone)]
pub struct ArrayDef {
    pub element: Schema,
    pub min: Option<usize>,
    pub max: Option<usize>,
}

#[derive(Clone)]
pub struct TupleDef {
    pub items: Vec<Schema>,
    pub rest: Option<Schema>,
}

#[derive(Clone)]
pub enum Effect {
    Refine { check: Refinement, message: String },
    /// Value mapping; not modelled during validation.
    Transform,
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTORS
// ————————————————————————————————————————————————————————————————————————————

impl Schema {
    pub fn new(def: SchemaDef) -> Self {
        Schema { def: Rc::new(def), description: None }
    }

    pub fn def(&self) -> &SchemaDef {
        &self.def
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Same node, annotated.
    pub fn describe(&self, text: impl Into<String>) -> Self {
        let text: String = text.into();
        Schema { def: self.def.clone(), description: Some(Rc::from(text)) }
    }

    /// Node identity; two handles are the same node iff their ids match.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.def) as usize
    }

    pub fn ptr_eq(&self, other: &Schema) -> bool {
        Rc::ptr_eq(&self.def, &other.def)
    }

    pub fn string() -> Self { Self::new(SchemaDef::String(StringDef::default())) }
    pub fn number() -> Self { Self::new(SchemaDef::Number(NumberDef::default())) }
    pub fn int() -> Self { Self::new(SchemaDef::Number(NumberDef { int: true, ..Default::default() })) }
    pub fn bigint() -> Self { Self::new(SchemaDef::BigInt) }
    pub fn boolean() -> Self { Self::new(SchemaDef::Boolean) }
    pub fn date() -> Self { Self::new(SchemaDef::Date) }
    pub fn null() -> Self { Self::new(SchemaDef::Null) }
    pub fn undefined() -> Self { Self::new(SchemaDef::Undefined) }
    pub fn any() -> Self { Self::new(SchemaDef::Any) }
    pub fn unknown() -> Self { Self::new(SchemaDef::Unknown) }
    pub fn never() -> Self { Self::new(SchemaDef::Never) }

    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(SchemaDef::Enum(values.into_iter().map(Into::into).collect()))
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::new(SchemaDef::Literal(value.into()))
    }

    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        let shape = fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::new(SchemaDef::Object(ObjectDef { shape, strict: false }))
    }

    pub fn array(element: Schema) -> Self {
        Self::new(SchemaDef::Array(ArrayDef { element, min: None, max: None }))
    }

    pub fn tuple(items: impl IntoIterator<Item = Schema>) -> Self {
        Self::new(SchemaDef::Tuple(TupleDef { items: items.into_iter().collect(), rest: None }))
    }

    pub fn record(key: Schema, value: Schema) -> Self {
        Self::new(SchemaDef::Record { key, value })
    }

    pub fn union(options: impl IntoIterator<Item = Schema>) -> Self {
        Self::new(SchemaDef::Union(options.into_iter().collect()))
    }

    pub fn intersection(left: Schema, right: Schema) -> Self {
        Self::new(SchemaDef::Intersection { left, right })
    }

    pub fn lazy(resolver: impl Fn() -> Schema + 'static) -> Self {
        Self::new(SchemaDef::Lazy(Rc::new(resolver)))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// MODIFIERS & CONSTRAINTS
// ————————————————————————————————————————————————————————————————————————————

impl Schema {
    pub fn optional(&self) -> Self { Self::new(SchemaDef::Optional(self.clone())) }
    pub fn nullable(&self) -> Self { Self::new(SchemaDef::Nullable(self.clone())) }

    /// `optional().nullable()`
    pub fn nullish(&self) -> Self { self.optional().nullable() }

    pub fn default_value(&self, value: impl Into<Value>) -> Self {
        Self::new(SchemaDef::Default { inner: self.clone(), value: value.into() })
    }

    pub fn catch(&self, fallback: impl Into<Value>) -> Self {
        Self::new(SchemaDef::Catch { inner: self.clone(), fallback: fallback.into() })
    }

    pub fn brand(&self, brand: impl Into<String>) -> Self {
        Self::new(SchemaDef::Branded { inner: self.clone(), brand: brand.into() })
    }

    pub fn and(&self, other: &Schema) -> Self {
        Self::intersection(self.clone(), other.clone())
    }

    pub fn or(&self, other: &Schema) -> Self {
        Self::union([self.clone(), other.clone()])
    }

    pub fn pipe(&self, output: &Schema) -> Self {
        Self::new(SchemaDef::Pipeline { input: self.clone(), output: output.clone() })
    }

    pub fn transform(&self) -> Self {
        Self::new(SchemaDef::Effects { input: self.clone(), effect: Effect::Transform })
    }

    pub fn refine(&self, check: impl Fn(Option<&Value>) -> bool + 'static, message: impl Into<String>) -> Self {
        self.try_refine(move |v| Ok(check(v)), message)
    }

    pub fn try_refine(
        &self,
        check: impl Fn(Option<&Value>) -> Result<bool, CheckError> + 'static,
        message: impl Into<String>,
    ) -> Self {
        let effect = Effect::Refine { check: Rc::new(check), message: message.into() };
        Self::new(SchemaDef::Effects { input: self.clone(), effect })
    }

    /// Lower bound on string length (chars) or array length. No-op on other
    /// kinds.
    pub fn min(&self, n: usize) -> Self {
        self.with_bounds(Some(n), None)
    }

    /// Upper bound on string length (chars) or array length.
    pub fn max(&self, n: usize) -> Self {
        self.with_bounds(None, Some(n))
    }

    pub fn length(&self, n: usize) -> Self {
        self.with_bounds(Some(n), Some(n))
    }

    pub fn nonempty(&self) -> Self {
        self.min(1)
    }

    /// Regex a string must match.
    pub fn regex(&self, pattern: Regex) -> Self {
        match self.def() {
            SchemaDef::String(s) => Self::new(SchemaDef::String(StringDef { pattern: Some(pattern), ..s.clone() })),
            _ => self.clone(),
        }
    }

    pub fn try_regex(&self, pattern: &str) -> Result<Self, regex::Error> {
        Ok(self.regex(Regex::new(pattern)?))
    }

    pub fn gte(&self, n: f64) -> Self {
        match self.def() {
            SchemaDef::Number(d) => Self::new(SchemaDef::Number(NumberDef { min: Some(n), ..d.clone() })),
            _ => self.clone(),
        }
    }

    pub fn lte(&self, n: f64) -> Self {
        match self.def() {
            SchemaDef::Number(d) => Self::new(SchemaDef::Number(NumberDef { max: Some(n), ..d.clone() })),
            _ => self.clone(),
        }
    }

    /// Element schema for values past the fixed tuple items.
    pub fn rest(&self, rest: Schema) -> Self {
        match self.def() {
            SchemaDef::Tuple(t) => Self::new(SchemaDef::Tuple(TupleDef { items: t.items.clone(), rest: Some(rest) })),
            _ => self.clone(),
        }
    }

    pub fn strict(&self) -> Self {
        match self.def() {
            SchemaDef::Object(o) => Self::new(SchemaDef::Object(ObjectDef { shape: o.shape.clone(), strict: true })),
            _ => self.clone(),
        }
    }

    /// Object with `other`'s fields layered over this one's.
    pub fn extend(&self, other: &Schema) -> Self {
        match (self.def(), other.def()) {
            (SchemaDef::Object(a), SchemaDef::Object(b)) => {
                let mut shape = a.shape.clone();
                for (k, v) in &b.shape {
                    shape.insert(k.clone(), v.clone());
                }
                Self::new(SchemaDef::Object(ObjectDef { shape, strict: a.strict }))
            }
            _ => self.clone(),
        }
    }

    fn with_bounds(&self, min: Option<usize>, max: Option<usize>) -> Self {
        match self.def() {
            SchemaDef::String(s) => Self::new(SchemaDef::String(StringDef {
                min: min.or(s.min),
                max: max.or(s.max),
                pattern: s.pattern.clone(),
            })),
            SchemaDef::Array(a) => Self::new(SchemaDef::Array(ArrayDef {
                element: a.element.clone(),
                min: min.or(a.min),
                max: max.or(a.max),
            })),
            _ => self.clone(),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// VALIDATION ENTRY POINTS
// ————————————————————————————————————————————————————————————————————————————

impl Schema {
    /// Validate `value` (`None` = absent).
    pub fn safe_parse(&self, value: Option<&Value>) -> Result<(), Issue> {
        check::check(self, value, 0)
    }

    pub fn accepts(&self, value: Option<&Value>) -> bool {
        self.safe_parse(value).is_ok()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DEBUG
// ————————————————————————————————————————————————————————————————————————————

impl SchemaDef {
    pub fn type_name(&self) -> &'static str {
        match self {
            SchemaDef::String(_) => "string",
            SchemaDef::Number(_) => "number",
            SchemaDef::BigInt => "bigint",
            SchemaDef::Boolean => "boolean",
            SchemaDef::Date => "date",
            SchemaDef::Enum(_) => "enum",
            SchemaDef::Literal(_) => "literal",
            SchemaDef::Null => "null",
            SchemaDef::Undefined => "undefined",
            SchemaDef::Any => "any",
            SchemaDef::Unknown => "unknown",
            SchemaDef::Never => "never",
            SchemaDef::Object(_) => "object",
            SchemaDef::Array(_) => "array",
            SchemaDef::Tuple(_) => "tuple",
            SchemaDef::Record { .. } => "record",
            SchemaDef::Union(_) => "union",
            SchemaDef::Intersection { .. } => "intersection",
            SchemaDef::Optional(_) => "optional",
            SchemaDef::Nullable(_) => "nullable",
            SchemaDef::Default { .. } => "default",
            SchemaDef::Catch { .. } => "catch",
            SchemaDef::Lazy(_) => "lazy",
            SchemaDef::Effects { .. } => "effects",
            SchemaDef::Pipeline { .. } => "pipeline",
            SchemaDef::Branded { .. } => "branded",
        }
    }
}

// Shallow on purpose: lazy nodes may be cyclic.
impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.def() {
            SchemaDef::Object(o) => f
                .debug_struct("Object")
                .field("fields", &o.shape.keys().collect::<Vec<_>>())
                .finish(),
            other => f.write_str(other.type_name()),
        }
    }
}

impl fmt::Debug for ObjectDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectDef")
            .field("shape", &self.shape)
            .field("strict", &self.strict)
            .finish()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builders_return_new_nodes() {
        let base = Schema::string();
        let min = base.min(3);
        assert!(!base.ptr_eq(&min));
        assert!(base.accepts(Some(&json!(""))));
        assert!(!min.accepts(Some(&json!("ab"))));
    }

    #[test]
    fn bounds_compose() {
        let s = Schema::string().min(2).max(4);
        assert!(s.accepts(Some(&json!("abc"))));
        assert!(!s.accepts(Some(&json!("a"))));
        assert!(!s.accepts(Some(&json!("abcde"))));
        let exact = Schema::array(Schema::number()).length(2);
        assert!(exact.accepts(Some(&json!([1, 2]))));
        assert!(!exact.accepts(Some(&json!([1]))));
    }

    #[test]
    fn constraints_ignore_foreign_kinds() {
        let n = Schema::number();
        assert!(n.min(3).accepts(Some(&json!(1))));
        assert!(n.strict().accepts(Some(&json!(1))));
        assert!(Schema::string().gte(5.0).accepts(Some(&json!(""))));
    }

    #[test]
    fn extend_overrides_fields() {
        let a = Schema::object([("x", Schema::string()), ("y", Schema::number())]);
        let b = Schema::object([("y", Schema::string())]);
        let merged = a.extend(&b);
        assert!(merged.accepts(Some(&json!({ "x": "", "y": "str" }))));
        assert!(!merged.accepts(Some(&json!({ "x": "", "y": 1 }))));
    }

    #[test]
    fn try_regex_reports_bad_patterns() {
        assert!(Schema::string().try_regex("(").is_err());
        let s = Schema::string().try_regex("^[a-z]+$").unwrap();
        assert!(s.accepts(Some(&json!("abc"))));
        assert!(!s.accepts(Some(&json!("ABC"))));
    }

    #[test]
    fn describe_keeps_identity() {
        let base = Schema::string().min(1);
        let described = base.describe("login name");
        assert!(described.ptr_eq(&base));
        assert_eq!(described.description(), Some("login name"));
        assert_eq!(base.description(), None);
        assert!(!described.accepts(Some(&json!(""))));
    }

    #[test]
    fn debug_is_shallow() {
        let s = Schema::object([("a", Schema::string()), ("b", Schema::lazy(Schema::number))]);
        assert_eq!(format!("{s:?}"), r#"Object { fields: ["a", "b"] }"#);
    }
}
