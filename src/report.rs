//! Field report: every path reachable through a schema, with its evaluation.
//!
//! Paths are enumerated depth-first in declaration order. Arrays and keyed
//! maps contribute a `*` segment, tuples one segment per fixed slot.
//! Recursion stops at `max_depth` segments, which keeps recursive (lazy)
//! schemas finite.

use indexmap::IndexMap;
use serde::Serialize;

use crate::evaluate::{Evaluation, Evaluator, MAX_INTERSECTION_VISITS};
use crate::introspect::{description_of, unwrap_modifiers, Introspect, Kind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldReport {
    pub path: String,
    #[serde(flatten)]
    pub evaluation: Evaluation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Dotted paths reachable from `schema`, at most `max_depth` segments long.
pub fn field_paths<N: Introspect>(schema: &N, max_depth: usize) -> Vec<String> {
    walk(schema, max_depth).into_keys().collect()
}

/// [`field_paths`] paired with `evaluator`'s verdict and the field's
/// description, if it carries one.
pub fn report<N: Introspect>(schema: &N, max_depth: usize, evaluator: &Evaluator) -> Vec<FieldReport> {
    walk(schema, max_depth)
        .into_iter()
        .map(|(path, description)| {
            let evaluation = evaluator.evaluate(schema, path.as_str());
            FieldReport { path, evaluation, description }
        })
        .collect()
}

type Found = IndexMap<String, Option<String>>;

fn walk<N: Introspect>(schema: &N, max_depth: usize) -> Found {
    let mut out = Found::new();
    // one intersection budget per depth, shared by every branch reaching it
    let mut budget = Vec::new();
    collect(schema, &mut Vec::new(), max_depth, &mut budget, &mut out);
    out
}

fn collect<N: Introspect>(
    node: &N,
    prefix: &mut Vec<String>,
    max_depth: usize,
    budget: &mut Vec<usize>,
    out: &mut Found,
) {
    let depth = prefix.len();
    if depth >= max_depth {
        return;
    }
    let base = unwrap_modifiers(node);
    match base.kind() {
        Kind::Object => {
            for name in base.field_names() {
                if let Some(child) = base.field(&name) {
                    visit(&child, name, prefix, max_depth, budget, out);
                }
            }
        }
        Kind::Array => {
            if let Some(child) = base.element() {
                visit(&child, "*".to_owned(), prefix, max_depth, budget, out);
            }
        }
        Kind::Tuple => {
            for i in 0..base.tuple_len() {
                if let Some(child) = base.tuple_item(i) {
                    visit(&child, i.to_string(), prefix, max_depth, budget, out);
                }
            }
        }
        Kind::KeyedMap => {
            if let Some(child) = base.map_value() {
                visit(&child, "*".to_owned(), prefix, max_depth, budget, out);
            }
        }
        Kind::Intersection => {
            if budget.len() <= depth {
                budget.resize(depth + 1, MAX_INTERSECTION_VISITS);
            }
            if budget[depth] == 0 {
                return;
            }
            budget[depth] -= 1;
            if let Some((left, right)) = base.branches() {
                collect(&left, prefix, max_depth, budget, out);
                collect(&right, prefix, max_depth, budget, out);
            }
        }
        _ => {}
    }
}

fn visit<N: Introspect>(
    child: &N,
    segment: String,
    prefix: &mut Vec<String>,
    max_depth: usize,
    budget: &mut Vec<usize>,
    out: &mut Found,
) {
    prefix.push(segment);
    let description = description_of(child);
    match out.entry(prefix.join(".")) {
        indexmap::map::Entry::Occupied(mut seen) => {
            if seen.get().is_none() {
                seen.insert(description);
            }
        }
        indexmap::map::Entry::Vacant(slot) => {
            slot.insert(description);
        }
    }
    collect(child, prefix, max_depth, budget, out);
    prefix.pop();
}
