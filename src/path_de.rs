use serde::de::DeserializeOwned;

use crate::error::ModelError;

/// Deserialize with JSON-path context in error messages.
pub(crate) fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, ModelError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(parse_error)
}

pub(crate) fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ModelError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(parse_error)
}

fn parse_error(err: serde_path_to_error::Error<serde_json::Error>) -> ModelError {
    let path = err.path().to_string();
    ModelError::Parse { path, message: err.into_inner().to_string() }
}
