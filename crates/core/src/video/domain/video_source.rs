use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("could not open video stream {url}: {reason}")]
    Open { url: String, reason: String },
    #[error("frame read failed: {0}")]
    Read(String),
    #[error("seek to start failed: {0}")]
    Seek(String),
}

/// A seekable, frame-producing camera feed owned by one stream worker.
///
/// Implementations handle codec and container details; workers only see
/// [`Frame`]s. Dropping a source releases it.
pub trait VideoSource: Send {
    fn metadata(&self) -> &VideoMetadata;

    /// Next frame in decode order, or `Ok(None)` at end of stream.
    fn read_frame(&mut self) -> Result<Option<Frame>, SourceError>;

    /// Repositions at the first frame.
    fn rewind(&mut self) -> Result<(), SourceError>;
}

/// Opens [`VideoSource`]s by URL. Shared by every worker.
pub trait VideoSourceOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<Box<dyn VideoSource>, SourceError>;
}
