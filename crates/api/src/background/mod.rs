//! Background tasks run alongside the HTTP server.
//!
//! Each task is spawned via `tokio::spawn` and stops when its
//! [`CancellationToken`](tokio_util::sync::CancellationToken) fires.

pub mod log_retention;
