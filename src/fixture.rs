//! Requiredness fixtures: a schema document plus expected verdicts.
//!
//! ```json
//! {
//!   "name": "primitives",
//!   "schema": { "type": "object", "shape": { "id": { "type": "number" } } },
//!   "cases": [
//!     { "path": "id", "required": true },
//!     { "path": ["id", "x"], "required": false, "matched": false, "policy": "presence" }
//!   ]
//! }
//! ```
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::evaluate::{Evaluation, Evaluator, Policy};
use crate::path::FieldPath;
use crate::schema::{DocumentError, SchemaDocument};

#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub name: Option<String>,
    /// Schema document, bare node or `{definitions, root}`.
    pub schema: Value,
    pub cases: Vec<Case>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Case {
    pub path: FieldPath,
    pub required: bool,
    /// Checked only when given.
    #[serde(default)]
    pub matched: Option<bool>,
    #[serde(default)]
    pub policy: Policy,
}

#[derive(Debug, Clone)]
pub struct Outcome<'a> {
    pub case: &'a Case,
    pub got: Evaluation,
}

impl Fixture {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        crate::path_de::from_str_with_path(&src)
    }

    /// Compile the schema and evaluate every case, in file order.
    pub fn run(&self) -> Result<Vec<Outcome<'_>>, DocumentError> {
        let compiled = SchemaDocument::from_value(self.schema.clone())?.compile()?;
        let outcomes = self
            .cases
            .iter()
            .map(|case| Outcome {
                case,
                got: Evaluator::with_policy(case.policy).evaluate(compiled.root(), &case.path),
            })
            .collect();
        Ok(outcomes)
    }
}

impl Outcome<'_> {
    pub fn passed(&self) -> bool {
        self.got.required == self.case.required && self.case.matched.is_none_or(|m| m == self.got.matched)
    }
}
