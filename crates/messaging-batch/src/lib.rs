//! A single-shot or reusable [`Writer`](messaging_contracts::Writer): open a
//! [`messaging_contracts::CommitWriter`], write, commit, and optionally
//! close, grounded on the upstream `batch` package.

mod config;
mod writer;

pub use config::BatchWriterConfig;
pub use writer::BatchWriter;
