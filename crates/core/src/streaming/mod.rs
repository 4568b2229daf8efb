pub mod cancellation;
pub mod clock;
pub mod notification;
pub mod notification_hub;
pub mod stream_registry;
pub mod worker_launcher;
