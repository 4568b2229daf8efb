pub mod frame_analyzer;
pub mod stream_worker;
pub mod worker_stats;
