//! Well-known role names. Must match the `users.role` default in the
//! migrations.

pub const ROLE_ADMIN: &str = "admin";
