use std::path::PathBuf;

use crate::catalog::EpisodeCode;

/// Fatal pipeline errors. Advisory conditions (missing titles, per-file
/// failures, filename collisions) are carried in the run report instead.
#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    /// The title file for the primary language does not exist. Nothing is
    /// written when this fires; the composite tables cannot be built without it.
    #[error("primary title file not found: {}", .path.display())]
    PrimaryTitlesMissing { path: PathBuf },

    /// A title exists in the primary language but the matching screenshot
    /// folder is absent. Publication must not proceed with holes in the set.
    #[error("missing screenshot folders: {}", codes_list(.0))]
    MissingFolders(Vec<EpisodeCode>),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, AssembleError>;

fn codes_list(codes: &[EpisodeCode]) -> String {
    codes
        .iter()
        .map(EpisodeCode::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
