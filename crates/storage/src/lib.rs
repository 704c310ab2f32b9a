//! Formcheck Storage
//!
//! Durable outputs of an analysis run:
//!
//! - **Frames:** Evidence frames attached to error events, saved into an
//!   images directory under `<video stem>_<event index>.<ext>`
//! - **Traces:** Per-frame analysis results in append-only JSONL
//! - **Reports:** The end-of-video report as pretty-printed JSON

pub mod frames;
pub mod writer;

pub use frames::DirectoryFrameStore;
pub use writer::{write_report, TraceWriter};
