//! Validation predicate for [`Schema`] nodes.
//!
//! `check` is total over well-formed input: it returns the first [`Issue`]
//! found and never panics. Lazy resolution is the only place the walk can
//! re-enter a node without consuming input, so it is depth-limited.

use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use thiserror::Error;

use super::{Effect, Schema, SchemaDef};

/// Nested lazy resolutions allowed inside a single `safe_parse`.
pub const MAX_LAZY_DEPTH: usize = 64;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Issue {
    #[error("required")]
    Required,
    #[error("expected {expected}")]
    InvalidType { expected: &'static str },
    #[error("too small: expected at least {minimum}")]
    TooSmall { minimum: f64 },
    #[error("too big: expected at most {maximum}")]
    TooBig { maximum: f64 },
    #[error("expected an integer")]
    NotInteger,
    #[error("does not match /{pattern}/")]
    Pattern { pattern: String },
    #[error("expected one of {options:?}")]
    InvalidEnum { options: Vec<String> },
    #[error("expected literal {expected}")]
    InvalidLiteral { expected: Value },
    #[error("unrecognized key `{key}`")]
    UnrecognizedKey { key: String },
    #[error("no union member matched")]
    InvalidUnion,
    #[error("{message}")]
    Custom { message: String },
    #[error(transparent)]
    Check(#[from] super::CheckError),
    #[error("lazy schema nested deeper than {} levels", MAX_LAZY_DEPTH)]
    DepthExceeded,
    #[error("at `{path}`: {issue}")]
    At { path: String, issue: Box<Issue> },
}

impl Issue {
    fn at(self, segment: impl std::fmt::Display) -> Self {
        match self {
            Issue::At { path, issue } => Issue::At { path: format!("{segment}.{path}"), issue },
            issue => Issue::At { path: segment.to_string(), issue: Box::new(issue) },
        }
    }
}

fn present<'a>(value: Option<&'a Value>) -> Result<&'a Value, Issue> {
    value.ok_or(Issue::Required)
}

fn check_len(len: usize, min: Option<usize>, max: Option<usize>) -> Result<(), Issue> {
    if let Some(min) = min {
        if len < min {
            return Err(Issue::TooSmall { minimum: min as f64 });
        }
    }
    if let Some(max) = max {
        if len > max {
            return Err(Issue::TooBig { maximum: max as f64 });
        }
    }
    Ok(())
}

fn is_date(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok() || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

pub(crate) fn check(schema: &Schema, value: Option<&Value>, depth: usize) -> Result<(), Issue> {
    match schema.def() {
        SchemaDef::String(def) => {
            let Value::String(s) = present(value)? else {
                return Err(Issue::InvalidType { expected: "string" });
            };
            check_len(s.chars().count(), def.min, def.max)?;
            if let Some(rx) = &def.pattern {
                if !rx.is_match(s) {
                    return Err(Issue::Pattern { pattern: rx.as_str().to_owned() });
                }
            }
            Ok(())
        }
        SchemaDef::Number(def) => {
            let n = present(value)?
                .as_f64()
                .ok_or(Issue::InvalidType { expected: "number" })?;
            if def.int && n.fract() != 0.0 {
                return Err(Issue::NotInteger);
            }
            if let Some(min) = def.min {
                if n < min {
                    return Err(Issue::TooSmall { minimum: min });
                }
            }
            if let Some(max) = def.max {
                if n > max {
                    return Err(Issue::TooBig { maximum: max });
                }
            }
            Ok(())
        }
        SchemaDef::BigInt => match present(value)? {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(()),
            _ => Err(Issue::InvalidType { expected: "bigint" }),
        },
        SchemaDef::Boolean => match present(value)? {
            Value::Bool(_) => Ok(()),
            _ => Err(Issue::InvalidType { expected: "boolean" }),
        },
        SchemaDef::Date => match present(value)? {
            Value::String(s) if is_date(s) => Ok(()),
            _ => Err(Issue::InvalidType { expected: "date" }),
        },
        SchemaDef::Enum(options) => match present(value)? {
            Value::String(s) if options.contains(s) => Ok(()),
            _ => Err(Issue::InvalidEnum { options: options.clone() }),
        },
        SchemaDef::Literal(expected) => {
            if present(value)? == expected {
                Ok(())
            } else {
                Err(Issue::InvalidLiteral { expected: expected.clone() })
            }
        }
        SchemaDef::Null => match present(value)? {
            Value::Null => Ok(()),
            _ => Err(Issue::InvalidType { expected: "null" }),
        },
        SchemaDef::Undefined => match value {
            None => Ok(()),
            Some(_) => Err(Issue::InvalidType { expected: "undefined" }),
        },
        SchemaDef::Any | SchemaDef::Unknown => Ok(()),
        SchemaDef::Never => Err(Issue::InvalidType { expected: "never" }),
        SchemaDef::Object(def) => {
            let Value::Object(map) = present(value)? else {
                return Err(Issue::InvalidType { expected: "object" });
            };
            for (key, field) in &def.shape {
                check(field, map.get(key), depth).map_err(|e| e.at(key))?;
            }
            if def.strict {
                if let Some(key) = map.keys().find(|k| !def.shape.contains_key(*k)) {
                    return Err(Issue::UnrecognizedKey { key: key.clone() });
                }
            }
            Ok(())
        }
        SchemaDef::Array(def) => {
            let Value::Array(xs) = present(value)? else {
                return Err(Issue::InvalidType { expected: "array" });
            };
            check_len(xs.len(), def.min, def.max)?;
            for (i, x) in xs.iter().enumerate() {
                check(&def.element, Some(x), depth).map_err(|e| e.at(i))?;
            }
            Ok(())
        }
        SchemaDef::Tuple(def) => {
            let Value::Array(xs) = present(value)? else {
                return Err(Issue::InvalidType { expected: "tuple" });
            };
            // trailing slots may be missing when their schema accepts absence
            for (i, item) in def.items.iter().enumerate() {
                check(item, xs.get(i), depth).map_err(|e| e.at(i))?;
            }
            let extra = xs.iter().enumerate().skip(def.items.len());
            match &def.rest {
                Some(rest) => {
                    for (i, x) in extra {
                        check(rest, Some(x), depth).map_err(|e| e.at(i))?;
                    }
                }
                None if xs.len() > def.items.len() => {
                    return Err(Issue::TooBig { maximum: def.items.len() as f64 });
                }
                None => {}
            }
            Ok(())
        }
        SchemaDef::Record { key, value: val } => {
            let Value::Object(map) = present(value)? else {
                return Err(Issue::InvalidType { expected: "record" });
            };
            for (k, v) in map {
                check(key, Some(&Value::String(k.clone())), depth).map_err(|e| e.at(k))?;
                check(val, Some(v), depth).map_err(|e| e.at(k))?;
            }
            Ok(())
        }
        SchemaDef::Union(options) => {
            for option in options {
                match check(option, value, depth) {
                    Ok(()) => return Ok(()),
                    // inside a lazy resolution, siblings would only hit the same limit
                    Err(Issue::DepthExceeded) if depth > 0 => return Err(Issue::DepthExceeded),
                    Err(_) => {}
                }
            }
            Err(Issue::InvalidUnion)
        }
        SchemaDef::Intersection { left, right } => {
            check(left, value, depth)?;
            check(right, value, depth)
        }
        SchemaDef::Optional(inner) => match value {
            None => Ok(()),
            Some(_) => check(inner, value, depth),
        },
        SchemaDef::Nullable(inner) => match value {
            Some(Value::Null) => Ok(()),
            _ => check(inner, value, depth),
        },
        SchemaDef::Default { inner, value: fallback } => match value {
            None => check(inner, Some(fallback), depth),
            Some(_) => check(inner, value, depth),
        },
        // a failing inner parse yields the fallback
        SchemaDef::Catch { .. } => Ok(()),
        SchemaDef::Lazy(resolve) => {
            if depth >= MAX_LAZY_DEPTH {
                return Err(Issue::DepthExceeded);
            }
            check(&resolve(), value, depth + 1)
        }
        SchemaDef::Effects { input, effect } => {
            check(input, value, depth)?;
            match effect {
                Effect::Refine { check: refine, message } => {
                    if refine(value)? {
                        Ok(())
                    } else {
                        Err(Issue::Custom { message: message.clone() })
                    }
                }
                Effect::Transform => Ok(()),
            }
        }
        SchemaDef::Pipeline { input, output } => {
            check(input, value, depth)?;
            check(output, value, depth)
        }
        SchemaDef::Branded { inner, .. } => check(inner, value, depth),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CheckError;
    use serde_json::json;

    fn parse(s: &Schema, v: Value) -> Result<(), Issue> {
        s.safe_parse(Some(&v))
    }

    #[test]
    fn absence_is_not_null() {
        assert_eq!(Schema::string().safe_parse(None), Err(Issue::Required));
        assert!(Schema::string().nullable().safe_parse(None).is_err());
        assert!(Schema::string().nullable().accepts(Some(&Value::Null)));
        assert!(Schema::string().optional().accepts(None));
        assert!(!Schema::string().optional().accepts(Some(&Value::Null)));
    }

    #[test]
    fn scalars() {
        assert!(parse(&Schema::number(), json!(1.5)).is_ok());
        assert_eq!(parse(&Schema::int(), json!(1.5)), Err(Issue::NotInteger));
        assert!(parse(&Schema::bigint(), json!(12)).is_ok());
        assert!(parse(&Schema::bigint(), json!(1.2)).is_err());
        assert!(parse(&Schema::boolean(), json!(false)).is_ok());
        assert!(parse(&Schema::date(), json!("2024-02-29")).is_ok());
        assert!(parse(&Schema::date(), json!("2024-02-29T10:00:00Z")).is_ok());
        assert!(parse(&Schema::date(), json!("yesterday")).is_err());
        assert!(parse(&Schema::enumeration(["A", "B"]), json!("A")).is_ok());
        assert!(parse(&Schema::enumeration(["A", "B"]), json!("C")).is_err());
        assert!(parse(&Schema::literal("x"), json!("x")).is_ok());
        assert!(parse(&Schema::number().gte(1.0).lte(2.0), json!(3)).is_err());
    }

    #[test]
    fn any_and_unknown_accept_absence() {
        assert!(Schema::any().accepts(None));
        assert!(Schema::unknown().accepts(None));
        assert!(Schema::undefined().accepts(None));
        assert!(!Schema::undefined().accepts(Some(&Value::Null)));
        assert!(!Schema::never().accepts(None));
    }

    #[test]
    fn object_fields_see_missing_keys_as_absent() {
        let s = Schema::object([("a", Schema::string()), ("b", Schema::number().optional())]);
        assert!(parse(&s, json!({ "a": "" })).is_ok());
        let err = parse(&s, json!({ "b": 1 })).unwrap_err();
        assert_eq!(err.to_string(), "at `a`: required");
        assert!(parse(&s, json!({ "a": "", "zzz": 1 })).is_ok());
        assert!(matches!(parse(&s.strict(), json!({ "a": "", "zzz": 1 })), Err(Issue::UnrecognizedKey { .. })));
    }

    #[test]
    fn nested_issue_paths() {
        let s = Schema::object([("list", Schema::array(Schema::object([("n", Schema::number())])))]);
        let err = parse(&s, json!({ "list": [{ "n": 1 }, {}] })).unwrap_err();
        assert_eq!(err.to_string(), "at `list.1.n`: required");
    }

    #[test]
    fn tuples_and_rest() {
        let t = Schema::tuple([Schema::number(), Schema::string().optional()]);
        assert!(parse(&t, json!([1, "a"])).is_ok());
        assert!(parse(&t, json!([1])).is_ok());
        assert!(parse(&t, json!([])).is_err());
        assert!(parse(&t, json!([1, "a", true])).is_err());
        let with_rest = t.rest(Schema::boolean());
        assert!(parse(&with_rest, json!([1, "a", true, false])).is_ok());
        assert!(parse(&with_rest, json!([1, "a", 3])).is_err());
    }

    #[test]
    fn records_check_keys_and_values() {
        let r = Schema::record(Schema::string().min(2), Schema::number());
        assert!(parse(&r, json!({ "ab": 1 })).is_ok());
        assert!(parse(&r, json!({ "a": 1 })).is_err());
        assert!(parse(&r, json!({ "ab": "x" })).is_err());
        assert!(parse(&r, json!({})).is_ok());
    }

    #[test]
    fn wrappers() {
        let d = Schema::string().min(1).default_value("x");
        assert!(d.accepts(None));
        assert!(!d.accepts(Some(&json!(""))));
        assert!(!Schema::string().default_value(3).accepts(None));
        assert!(Schema::string().catch("x").accepts(Some(&json!(1))));
        assert!(Schema::string().brand("Id").accepts(Some(&json!("a"))));
        assert!(!Schema::string().brand("Id").accepts(None));
        let u = Schema::string().or(&Schema::undefined());
        assert!(u.accepts(None));
        assert_eq!(Schema::string().or(&Schema::number()).safe_parse(None), Err(Issue::InvalidUnion));
    }

    #[test]
    fn intersections_need_both_sides() {
        let i = Schema::object([("x", Schema::string())]).and(&Schema::object([("y", Schema::number())]));
        assert!(parse(&i, json!({ "x": "", "y": 1 })).is_ok());
        assert!(parse(&i, json!({ "x": "" })).is_err());
    }

    #[test]
    fn refinements_and_pipelines() {
        let non_blank = Schema::string().refine(|v| v.and_then(Value::as_str).is_some_and(|s| !s.trim().is_empty()), "blank");
        assert!(parse(&non_blank, json!("a")).is_ok());
        assert_eq!(parse(&non_blank, json!("  ")), Err(Issue::Custom { message: "blank".into() }));

        let broken = Schema::string().try_refine(|_| Err(CheckError("boom".into())), "unused");
        assert_eq!(parse(&broken, json!("a")), Err(Issue::Check(CheckError("boom".into()))));

        let piped = Schema::string().transform().pipe(&Schema::string().min(2));
        assert!(parse(&piped, json!("ab")).is_ok());
        assert!(parse(&piped, json!("a")).is_err());
    }

    #[test]
    fn recursive_lazy_schemas_validate_finite_values() {
        fn tree() -> Schema {
            Schema::object([("children", Schema::array(Schema::lazy(tree)))])
        }
        let t = tree();
        assert!(parse(&t, json!({ "children": [{ "children": [] }] })).is_ok());
        assert!(parse(&t, json!({ "children": [{}] })).is_err());
    }

    #[test]
    fn branching_lazy_unions_stop_at_the_depth_limit() {
        fn either() -> Schema {
            Schema::union([Schema::lazy(either), Schema::lazy(either)])
        }
        assert_eq!(either().safe_parse(None), Err(Issue::InvalidUnion));
        let with_fallback = either().or(&Schema::string());
        assert!(with_fallback.accepts(Some(&json!("x"))));
        assert!(!with_fallback.accepts(Some(&json!(1))));
    }

    #[test]
    fn self_resolving_lazy_hits_depth_limit() {
        use std::cell::OnceCell;
        use std::rc::Rc;

        let slot: Rc<OnceCell<Schema>> = Rc::default();
        let inner = slot.clone();
        let lazy = Schema::lazy(move || inner.get().cloned().unwrap_or_else(Schema::never));
        assert!(slot.set(lazy.clone()).is_ok());
        assert_eq!(lazy.safe_parse(Some(&json!(1))), Err(Issue::DepthExceeded));
    }
}
