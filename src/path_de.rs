use serde::de::DeserializeOwned;

use crate::schema::DocumentError;

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, DocumentError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(into_document_error)
}

/// Same as [`from_str_with_path`] for an already parsed tree.
pub fn from_value_with_path<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, DocumentError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(into_document_error)
}

fn into_document_error(err: serde_path_to_error::Error<serde_json::Error>) -> DocumentError {
    let path = err.path().to_string();
    DocumentError::Parse { path, message: err.into_inner().to_string() }
}
