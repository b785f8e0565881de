//! Decide whether a field path into a validation schema is *required*: present
//! and non-absent in every value the schema accepts.
//!
//! ```ignore
//! use schema_required::{is_required_field, Schema};
//!
//! let schema = Schema::object([
//!     ("name", Schema::string().min(1)),
//!     ("bio", Schema::string().optional()),
//!     ("tags", Schema::array(Schema::string().min(1)).min(1)),
//! ]);
//! assert!(is_required_field(&schema, "name"));
//! assert!(!is_required_field(&schema, "bio"));
//! assert!(is_required_field(&schema, "tags.*"));
//! ```
pub mod cli;
pub mod evaluate;
pub mod fixture;
pub mod introspect;
pub mod path;
pub mod path_de;
pub mod report;
pub mod schema;

pub use evaluate::{evaluate_path, is_required_field, Evaluation, Evaluator, Policy};
pub use introspect::{Introspect, Kind, Modifier};
pub use path::{normalize, FieldPath, PathToken};
pub use report::{field_paths, report, FieldReport};
pub use schema::{Schema, SchemaDocument};
