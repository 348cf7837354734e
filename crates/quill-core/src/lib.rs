//! # quill-core
//!
//! Foundation types and utilities shared by the Quill crates.
//!
//! - **Session IDs**: [`ids::SessionId`], the opaque handle returned with a
//!   pending clarification question
//! - **Text**: [`text::tokenize`] and friends, used by both the descriptor
//!   parser and the trigger matcher so they agree on what a "word" is
//! - **Logging**: [`logging::init_subscriber`] for binaries
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other quill crates.

#![deny(unsafe_code)]

pub mod ids;
pub mod logging;
pub mod text;
