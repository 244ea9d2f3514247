use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("filter request is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
