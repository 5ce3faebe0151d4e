//! Host runtime: the phase-sequenced bootstrap and the ready host.

mod bootstrap;

pub use bootstrap::{BootstrapCtx, Host, HostBootstrap, HostError, Phase};
