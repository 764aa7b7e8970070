//! Find a mounted filesystem's superblock by backing device name and clear
//! its in-memory read-only flag.
//!
//! The pieces, in request order:
//!
//! - [`control::ControlSurface`] decodes a written device identifier and keeps
//!   the last one for reading back.
//! - [`scanner::find_mount`] walks a [`registry::MountRegistry`] and returns a
//!   pinned [`models::mount::MountRef`] for the first match.
//! - [`controller::clear_if_readonly`] clears the read-only bit on that handle.
//!
//! Clearing the flag does not check journal or error state. A filesystem that
//! went read-only because of corruption can be made writable while still
//! corrupt.

pub mod collectors;
pub mod config;
pub mod control;
pub mod controller;
pub mod error;
pub mod models;
pub mod registry;
pub mod scanner;
pub mod util;
