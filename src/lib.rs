//! memos-sync - mirror Memos entries into SiYuan
//!
//! This crate provides the sync engine behind the `memos-sync` CLI.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (MemoRecord, ResourceRef, NormalizedMemo, ChangeSet)
//! - [`memos`] - Memos REST client
//! - [`siyuan`] - SiYuan kernel client
//! - [`sync`] - Change detection, normalization and reconciliation
//! - [`config`] - Configuration management
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod memos;
pub mod model;
pub mod siyuan;
pub mod sync;

pub use error::{Error, Result};
