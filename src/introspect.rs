//! Introspection boundary between the evaluator and a schema library.
//!
//! The evaluator never matches on library types directly. It asks an
//! [`Introspect`] implementation for a closed [`Kind`], for children, and for
//! a validation verdict. [`Schema`] is adapted here; another node model only
//! needs its own `impl Introspect`.

use std::collections::HashSet;
use std::hash::Hash;

use serde_json::{Map, Value};

use crate::schema::{Schema, SchemaDef};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Composite kinds the evaluator can descend into, plus wrappers it can see
/// through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Object,
    Array,
    Tuple,
    KeyedMap,
    Intersection,
    Modifier(Modifier),
    /// Primitives, unions, anything without addressable children.
    Other,
}

/// Non-structural wrappers. Requiredness is judged on what they wrap (the
/// input side for pipelines and effects).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Optional,
    Nullable,
    Default,
    Lazy,
    Catch,
    Pipeline,
    Branded,
}

/// Coarse category used to pick a minimal probe value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleShape {
    String,
    Array,
    Object,
    /// Scalars, enums, dates, unknown: no length to probe.
    Absent,
}

pub trait Introspect: Clone {
    type Id: Eq + Hash;

    /// Identity used to detect unwrap cycles.
    fn id(&self) -> Self::Id;
    fn kind(&self) -> Kind;
    /// Strip one modifier layer. `None` when the node is not a modifier or
    /// its inner node is missing.
    fn unwrap_modifier(&self) -> Option<Self>;
    fn field(&self, name: &str) -> Option<Self>;
    fn element(&self) -> Option<Self>;
    /// Fixed item at `index`, else the rest element.
    fn tuple_item(&self, index: usize) -> Option<Self>;
    fn map_value(&self) -> Option<Self>;
    fn branches(&self) -> Option<(Self, Self)>;
    /// Validation verdict; `None` is an absent value. Internal failures are
    /// rejections.
    fn accepts(&self, value: Option<&Value>) -> bool;
    fn sample_shape(&self) -> SampleShape;

    /// Field names in declaration order; empty for non-objects.
    fn field_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Number of fixed tuple items; zero for non-tuples.
    fn tuple_len(&self) -> usize {
        0
    }

    /// Human-readable note attached to this node, if any.
    fn description(&self) -> Option<String> {
        None
    }
}

// ————————————————————————————————————————————————————————————————————————————
// GENERIC HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Strip modifiers until a structural node is reached. A node seen twice in
/// this call ends the loop where it stands, so the result can still be a
/// modifier when the chain is cyclic.
pub fn unwrap_modifiers<N: Introspect>(node: &N) -> N {
    modifier_layers(node).pop().unwrap_or_else(|| node.clone())
}

/// First description found on `node` or on any modifier it wraps.
pub fn description_of<N: Introspect>(node: &N) -> Option<String> {
    modifier_layers(node).iter().find_map(|layer| layer.description())
}

// Every layer stays in `layers` until the walk ends: ids may be addresses,
// and a freed layer's address can come back from the next resolver call.
fn modifier_layers<N: Introspect>(node: &N) -> Vec<N> {
    let mut layers = vec![node.clone()];
    let mut seen = HashSet::from([node.id()]);
    while let Some(current) = layers.last() {
        if !matches!(current.kind(), Kind::Modifier(_)) {
            break;
        }
        let Some(inner) = current.unwrap_modifier() else {
            break;
        };
        if !seen.insert(inner.id()) {
            break;
        }
        layers.push(inner);
    }
    layers
}

/// Minimal representative for the unwrapped node's category.
pub fn sample_for<N: Introspect>(node: &N) -> Option<Value> {
    match unwrap_modifiers(node).sample_shape() {
        SampleShape::String => Some(Value::String(String::new())),
        SampleShape::Array => Some(Value::Array(Vec::new())),
        SampleShape::Object => Some(Value::Object(Map::new())),
        SampleShape::Absent => None,
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ADAPTER: schema::Schema
// ————————————————————————————————————————————————————————————————————————————

type Extractor = fn(&SchemaDef) -> Option<Schema>;

/// Unwrap rules, tried in order.
const UNWRAP_RULES: [(Modifier, Extractor); 7] = [
    (Modifier::Optional, |d| match d {
        SchemaDef::Optional(inner) => Some(inner.clone()),
        _ => None,
    }),
    (Modifier::Nullable, |d| match d {
        SchemaDef::Nullable(inner) => Some(inner.clone()),
        _ => None,
    }),
    (Modifier::Default, |d| match d {
        SchemaDef::Default { inner, .. } => Some(inner.clone()),
        _ => None,
    }),
    (Modifier::Lazy, |d| match d {
        SchemaDef::Lazy(resolve) => Some(resolve()),
        _ => None,
    }),
    (Modifier::Catch, |d| match d {
        SchemaDef::Catch { inner, .. } => Some(inner.clone()),
        _ => None,
    }),
    (Modifier::Pipeline, |d| match d {
        SchemaDef::Pipeline { input, .. } | SchemaDef::Effects { input, .. } => Some(input.clone()),
        _ => None,
    }),
    (Modifier::Branded, |d| match d {
        SchemaDef::Branded { inner, .. } => Some(inner.clone()),
        _ => None,
    }),
];

impl Introspect for Schema {
    type Id = usize;

    fn id(&self) -> usize {
        Schema::id(self)
    }

    fn kind(&self) -> Kind {
        match self.def() {
            SchemaDef::Object(_) => Kind::Object,
            SchemaDef::Array(_) => Kind::Array,
            SchemaDef::Tuple(_) => Kind::Tuple,
            SchemaDef::Record { .. } => Kind::KeyedMap,
            SchemaDef::Intersection { .. } => Kind::Intersection,
            SchemaDef::Optional(_) => Kind::Modifier(Modifier::Optional),
            SchemaDef::Nullable(_) => Kind::Modifier(Modifier::Nullable),
            SchemaDef::Default { .. } => Kind::Modifier(Modifier::Default),
            SchemaDef::Lazy(_) => Kind::Modifier(Modifier::Lazy),
            SchemaDef::Catch { .. } => Kind::Modifier(Modifier::Catch),
            SchemaDef::Pipeline { .. } | SchemaDef::Effects { .. } => Kind::Modifier(Modifier::Pipeline),
            SchemaDef::Branded { .. } => Kind::Modifier(Modifier::Branded),
            _ => Kind::Other,
        }
    }

    fn unwrap_modifier(&self) -> Option<Schema> {
        let Kind::Modifier(modifier) = self.kind() else {
            return None;
        };
        UNWRAP_RULES
            .iter()
            .filter(|(m, _)| *m == modifier)
            .find_map(|(_, extract)| extract(self.def()))
    }

    fn field(&self, name: &str) -> Option<Schema> {
        match self.def() {
            SchemaDef::Object(o) => o.shape.get(name).cloned(),
            _ => None,
        }
    }

    fn element(&self) -> Option<Schema> {
        match self.def() {
            SchemaDef::Array(a) => Some(a.element.clone()),
            _ => None,
        }
    }

    fn tuple_item(&self, index: usize) -> Option<Schema> {
        match self.def() {
            SchemaDef::Tuple(t) => t.items.get(index).or(t.rest.as_ref()).cloned(),
            _ => None,
        }
    }

    fn map_value(&self) -> Option<Schema> {
        match self.def() {
            SchemaDef::Record { value, .. } => Some(value.clone()),
            _ => None,
        }
    }

    fn branches(&self) -> Option<(Schema, Schema)> {
        match self.def() {
            SchemaDef::Intersection { left, right } => Some((left.clone(), right.clone())),
            _ => None,
        }
    }

    fn accepts(&self, value: Option<&Value>) -> bool {
        match self.safe_parse(value) {
            Ok(()) => true,
            Err(issue) => {
                tracing::trace!(kind = self.def().type_name(), %issue, "probe rejected");
                false
            }
        }
    }

    fn sample_shape(&self) -> SampleShape {
        match self.def() {
            SchemaDef::String(_) => SampleShape::String,
            SchemaDef::Array(_) => SampleShape::Array,
            SchemaDef::Object(_) => SampleShape::Object,
            _ => SampleShape::Absent,
        }
    }

    fn field_names(&self) -> Vec<String> {
        match self.def() {
            SchemaDef::Object(o) => o.shape.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    fn tuple_len(&self) -> usize {
        match self.def() {
            SchemaDef::Tuple(t) => t.items.len(),
            _ => 0,
        }
    }

    fn description(&self) -> Option<String> {
        Schema::description(self).map(str::to_owned)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::OnceCell;
    use std::rc::Rc;

    #[test]
    fn kinds() {
        assert_eq!(Schema::object([("a", Schema::string())]).kind(), Kind::Object);
        assert_eq!(Schema::array(Schema::string()).kind(), Kind::Array);
        assert_eq!(Schema::tuple([Schema::string()]).kind(), Kind::Tuple);
        assert_eq!(Schema::record(Schema::string(), Schema::number()).kind(), Kind::KeyedMap);
        assert_eq!(Schema::string().and(&Schema::number()).kind(), Kind::Intersection);
        assert_eq!(Schema::string().optional().kind(), Kind::Modifier(Modifier::Optional));
        assert_eq!(Schema::string().refine(|_| true, "x").kind(), Kind::Modifier(Modifier::Pipeline));
        assert_eq!(Schema::string().or(&Schema::number()).kind(), Kind::Other);
        assert_eq!(Schema::date().kind(), Kind::Other);
    }

    #[test]
    fn unwraps_every_modifier() {
        let base = Schema::object([("a", Schema::string())]);
        let wrapped = base
            .optional()
            .nullable()
            .default_value(json!({ "a": "" }))
            .catch(json!({}))
            .brand("Thing")
            .transform()
            .pipe(&Schema::any());
        let inner = base.clone();
        let lazy = Schema::lazy(move || wrapped.clone());
        assert!(unwrap_modifiers(&lazy).ptr_eq(&inner));
    }

    #[test]
    fn unwrap_stops_on_structural_nodes() {
        let s = Schema::string();
        assert!(unwrap_modifiers(&s).ptr_eq(&s));
        let i = Schema::string().optional().and(&Schema::number());
        assert!(unwrap_modifiers(&i).ptr_eq(&i));
    }

    #[test]
    fn unwrap_breaks_self_referencing_lazy() {
        let slot: Rc<OnceCell<Schema>> = Rc::default();
        let inner = slot.clone();
        let lazy = Schema::lazy(move || inner.get().cloned().unwrap_or_else(Schema::never));
        assert!(slot.set(lazy.clone()).is_ok());
        let out = unwrap_modifiers(&lazy);
        assert!(out.ptr_eq(&lazy));
        assert_eq!(out.kind(), Kind::Modifier(Modifier::Lazy));
    }

    fn fresh_layers(depth: usize, bottom: fn() -> Schema) -> Schema {
        if depth == 0 {
            return bottom();
        }
        Schema::lazy(move || fresh_layers(depth - 1, bottom))
    }

    #[test]
    fn unwrap_survives_resolvers_that_build_fresh_nodes() {
        for depth in 1..=8 {
            let out = unwrap_modifiers(&fresh_layers(depth, Schema::string));
            assert_eq!(out.kind(), Kind::Other, "depth {depth}");
            assert_eq!(sample_for(&fresh_layers(depth, Schema::string)), Some(json!("")), "depth {depth}");
        }
    }

    #[test]
    fn descriptions_are_found_through_modifiers() {
        let inner = Schema::string().describe("display name");
        assert_eq!(description_of(&inner.optional()), Some("display name".to_owned()));
        assert_eq!(description_of(&inner.optional().describe("outer")), Some("outer".to_owned()));
        assert_eq!(description_of(&Schema::string().optional()), None);
    }

    #[test]
    fn samples_follow_unwrapped_category() {
        assert_eq!(sample_for(&Schema::string().min(3).optional()), Some(json!("")));
        assert_eq!(sample_for(&Schema::array(Schema::number())), Some(json!([])));
        assert_eq!(sample_for(&Schema::object([("a", Schema::number())]).nullable()), Some(json!({})));
        assert_eq!(sample_for(&Schema::number()), None);
        assert_eq!(sample_for(&Schema::enumeration(["A"])), None);
        assert_eq!(sample_for(&Schema::tuple([Schema::string()])), None);
    }

    #[test]
    fn tuple_items_fall_back_to_rest() {
        let t = Schema::tuple([Schema::number(), Schema::string()]);
        assert!(t.tuple_item(2).is_none());
        let with_rest = t.rest(Schema::boolean());
        assert_eq!(with_rest.tuple_item(5).map(|s| s.def().type_name()), Some("boolean"));
        assert_eq!(with_rest.tuple_item(1).map(|s| s.def().type_name()), Some("string"));
        assert_eq!(with_rest.tuple_len(), 2);
    }

    #[test]
    fn children_only_on_matching_kinds() {
        let s = Schema::string();
        assert!(s.field("a").is_none());
        assert!(s.element().is_none());
        assert!(s.map_value().is_none());
        assert!(s.branches().is_none());
        assert!(s.unwrap_modifier().is_none());
        assert!(s.field_names().is_empty());
    }
}
