/// Per-slot failures while fetching or decoding an audio clip.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("GET {url} failed with status {status}")]
    Fetch { url: String, status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to decode audio: {0}")]
    Decode(String),

    #[error("request aborted")]
    Aborted,

    #[error("audio graph error: {0}")]
    Graph(String),
}

/// Startup asset failures (points cloud, heightmap).
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("points asset is not a JSON number array: {0}")]
    Points(#[from] serde_json::Error),

    #[error("points asset has {0} values, not a multiple of 3")]
    PartialTriplet(usize),

    #[error("failed to decode heightmap: {0}")]
    Heightmap(#[from] image::ImageError),
}
