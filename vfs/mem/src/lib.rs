//! In-memory provider for bridgevfs.
//!
//! Besides holding file bytes, [`MemProvider`] can log every call it receives
//! and inject faults into chosen calls, which makes it the workhorse of the
//! test suites in the other crates.

mod calls;
mod config;
mod fs;
mod handle;

pub use calls::{FaultAction, ProviderCall};
pub use config::MemConfig;
pub use fs::MemProvider;
pub use handle::MemIo;
