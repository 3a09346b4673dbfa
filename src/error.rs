use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("corrupt label state: {0}")]
    CorruptState(String),

    #[error("unexpected model output: {0}")]
    Model(String),

    #[error("unable to open video {0}")]
    VideoOpen(String),

    #[error("OpenCV Error: {0}")]
    OpenCv(#[from] opencv::Error),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}
