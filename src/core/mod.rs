//! Core types shared by every addonpack subsystem.
//!
//! This module holds the error taxonomy ([`AddonError`], [`ErrorKind`]), the
//! build stage names used to attribute pipeline failures ([`BuildStage`]), and the
//! user-facing error presentation ([`ErrorContext`], [`user_friendly_error`]).

pub mod error;

pub use error::{
    AddonError, BuildStage, ErrorContext, ErrorKind, create_error_context, user_friendly_error,
};
