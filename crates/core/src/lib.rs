pub mod control;
pub mod detection;
pub mod pipeline;
pub mod recognition;
pub mod shared;
pub mod streaming;
pub mod video;

#[cfg(test)]
pub(crate) mod testing;
