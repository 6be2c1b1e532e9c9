//! External delivery channels for add-on log events.

pub mod webhook;
