//! Host filesystem provider for bridgevfs.
//!
//! Paths handed to [`HostProvider`] are resolved below a configured root
//! directory; a leading `/` is relative to that root and `..` is rejected.

mod config;
mod handle;
mod provider;

pub use config::HostFsConfig;
pub use handle::HostIo;
pub use provider::HostProvider;
