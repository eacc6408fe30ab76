//! SiYuan target store.
//!
//! - [`SiyuanApi`] - kernel operations the writer consumes
//! - [`SiyuanClient`] - reqwest implementation

pub mod api;
pub mod client;

pub use api::{ChildBlock, Notebook, SiyuanApi};
pub use client::SiyuanClient;
