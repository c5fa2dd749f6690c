//! Core types shared by every launcher component.
//!
//! At the moment this is the error taxonomy; see [`error`] for the split
//! between library errors and CLI presentation.

pub mod error;

pub use error::{ErrorContext, LauncherError, user_friendly_error};
