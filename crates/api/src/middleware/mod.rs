//! Request extractors shared by the admin handlers.

pub mod auth;
