//! CloudSaver - mirror a local folder with a Google Drive folder.
//!
//! This crate provides the core functionality for the `cloudsaver` CLI tool.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (remote and local entries, the sync root)
//! - [`remote`] - Remote store trait, Drive client and in-memory store
//! - [`local`] - Local filesystem accessor
//! - [`sync`] - Pull/push engine, filtering, staleness and progress tracking
//! - [`config`] - Configuration management
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod local;
pub mod model;
pub mod remote;
pub mod sync;

pub use error::{Error, Result};
