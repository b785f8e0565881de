//! Requirement evaluation.
//!
//! Walks a schema along a normalized path and decides whether the addressed
//! value must be present (and, under the default policy, non-trivially
//! constrained) in every accepted input.
//!
//! Recursion only happens after consuming a segment, or on an intersection
//! branch at the same segment. Each segment gets [`MAX_INTERSECTION_VISITS`]
//! intersection visits for the whole walk, shared by every branch that
//! reaches it, so the number of steps is bounded by the path length even when
//! a lazy node keeps producing fresh intersections. Branches past the budget
//! are unmatched. Modifier chains are unwrapped by [`unwrap_modifiers`],
//! which carries its own cycle guard.

use serde::{Deserialize, Serialize};

use crate::introspect::{sample_for, unwrap_modifiers, Introspect, Kind};
use crate::path::{normalize, ArrayIndex, FieldPath};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Intersections a single path segment may visit before giving up.
pub const MAX_INTERSECTION_VISITS: usize = 64;

/// Outcome of resolving a path. `matched == false` always carries
/// `required == false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Evaluation {
    pub matched: bool,
    pub required: bool,
}

/// How the terminal segment is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    /// Must reject absence *and* reject the type's minimal sample (`""`,
    /// `[]`, `{}`). A bare string field is therefore not required, a
    /// `min(1)` string is. Scalars have no sample, so rejecting absence is
    /// enough.
    #[default]
    Constrained,
    /// Rejecting absence is enough.
    Presence,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    policy: Policy,
}

// ————————————————————————————————————————————————————————————————————————————
// PUBLIC API
// ————————————————————————————————————————————————————————————————————————————

/// `true` iff `path` resolves in `schema` and every accepted value supplies a
/// non-absent value there. Unknown paths, shape mismatches and empty paths
/// are all `false`.
pub fn is_required_field<N: Introspect>(schema: &N, path: impl Into<FieldPath>) -> bool {
    Evaluator::new().is_required(schema, path)
}

/// Like [`is_required_field`] but keeps the match status.
pub fn evaluate_path<N: Introspect>(schema: &N, path: impl Into<FieldPath>) -> Evaluation {
    Evaluator::new().evaluate(schema, path)
}

impl Evaluation {
    const UNMATCHED: Evaluation = Evaluation { matched: false, required: false };

    fn matched(required: bool) -> Self {
        Evaluation { matched: true, required }
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: Policy) -> Self {
        Evaluator { policy }
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn is_required<N: Introspect>(&self, schema: &N, path: impl Into<FieldPath>) -> bool {
        self.evaluate(schema, path).required
    }

    pub fn evaluate<N: Introspect>(&self, schema: &N, path: impl Into<FieldPath>) -> Evaluation {
        let segments = normalize(&path.into());
        if segments.is_empty() {
            tracing::debug!("empty path");
            return Evaluation::UNMATCHED;
        }
        let mut budget = vec![MAX_INTERSECTION_VISITS; segments.len()];
        let result = self.step(Some(schema), &segments, 0, &mut budget);
        tracing::debug!(path = %segments.join("."), matched = result.matched, required = result.required, "evaluated");
        if result.matched { result } else { Evaluation::UNMATCHED }
    }

    /// Terminal decision for `node` as received (modifiers included).
    pub fn is_effectively_required<N: Introspect>(&self, node: &N) -> bool {
        match self.policy {
            Policy::Constrained => is_sample_rejected(node),
            Policy::Presence => requires_presence(node),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PROBES
// ————————————————————————————————————————————————————————————————————————————

/// The node rejects an absent value.
pub fn requires_presence<N: Introspect>(node: &N) -> bool {
    !node.accepts(None)
}

/// The node rejects absence and also rejects the minimal value of its own
/// category. For categories without a sample the second probe is another
/// absence check, so this collapses to [`requires_presence`].
pub fn is_sample_rejected<N: Introspect>(node: &N) -> bool {
    if !requires_presence(node) {
        return false;
    }
    let sample = sample_for(node);
    !node.accepts(sample.as_ref())
}

// ————————————————————————————————————————————————————————————————————————————
// WALK
// ————————————————————————————————————————————————————————————————————————————

impl Evaluator {
    fn step<N: Introspect>(&self, node: Option<&N>, segments: &[String], index: usize, budget: &mut [usize]) -> Evaluation {
        let Some(node) = node else {
            return Evaluation::UNMATCHED;
        };
        let base = unwrap_modifiers(node);
        let kind = base.kind();
        tracing::trace!(index, ?kind, "step");

        // cyclic or dangling modifier chain
        if matches!(kind, Kind::Modifier(_)) {
            return Evaluation::UNMATCHED;
        }

        if index >= segments.len() {
            return Evaluation::matched(self.is_effectively_required(node));
        }

        let segment = segments[index].as_str();
        let is_final = index + 1 == segments.len();

        match kind {
            Kind::Intersection => {
                if budget[index] == 0 {
                    tracing::debug!(index, "intersection budget exhausted");
                    return Evaluation::UNMATCHED;
                }
                budget[index] -= 1;
                let Some((left, right)) = base.branches() else {
                    return Evaluation::UNMATCHED;
                };
                let l = self.step(Some(&left), segments, index, budget);
                let r = self.step(Some(&right), segments, index, budget);
                if !l.matched && !r.matched {
                    return Evaluation::UNMATCHED;
                }
                Evaluation::matched((l.matched && l.required) || (r.matched && r.required))
            }
            Kind::Object => self.descend_keyed(base.field(segment), segments, index, is_final, budget),
            Kind::KeyedMap => self.descend_keyed(base.map_value(), segments, index, is_final, budget),
            Kind::Array => {
                if ArrayIndex::parse(segment).is_none() {
                    return Evaluation::UNMATCHED;
                }
                self.descend(base.element(), segments, index, is_final, budget)
            }
            Kind::Tuple => {
                let Some(at) = ArrayIndex::parse(segment) else {
                    return Evaluation::UNMATCHED;
                };
                self.descend(base.tuple_item(at.slot()), segments, index, is_final, budget)
            }
            Kind::Modifier(_) | Kind::Other => {
                tracing::trace!(segment, "no children to descend into");
                Evaluation::UNMATCHED
            }
        }
    }

    /// Object fields and map values: an intermediate child that may be absent
    /// guarantees nothing beneath it.
    fn descend_keyed<N: Introspect>(
        &self,
        child: Option<N>,
        segments: &[String],
        index: usize,
        is_final: bool,
        budget: &mut [usize],
    ) -> Evaluation {
        let Some(child) = child else {
            tracing::trace!(segment = %segments[index], "unknown key");
            return Evaluation::UNMATCHED;
        };
        if is_final {
            return Evaluation::matched(self.is_effectively_required(&child));
        }
        if !requires_presence(&child) {
            return Evaluation::matched(false);
        }
        self.step(Some(&child), segments, index + 1, budget)
    }

    fn descend<N: Introspect>(
        &self,
        child: Option<N>,
        segments: &[String],
        index: usize,
        is_final: bool,
        budget: &mut [usize],
    ) -> Evaluation {
        let Some(child) = child else {
            return Evaluation::UNMATCHED;
        };
        if is_final {
            return Evaluation::matched(self.is_effectively_required(&child));
        }
        self.step(Some(&child), segments, index + 1, budget)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
