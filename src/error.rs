//! Error type shared by the renderers, the scene and the file helpers.

#[derive(thiserror::Error, Debug)]
pub enum VizError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid geometry for correspondence {index}: {reason}")]
    InvalidGeometry { index: usize, reason: String },
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to load YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<tempfile::PathPersistError> for VizError {
    fn from(err: tempfile::PathPersistError) -> Self {
        VizError::Io(err.error)
    }
}
