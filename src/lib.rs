//! Sakura Cloud provider core
//!
//! The pieces every resource handler of the Sakura Cloud provider relies
//! on, independent of any single resource type.
//!
//! # Overview
//!
//! - **Configuration**: merge explicit settings, `SAKURACLOUD_*` variables,
//!   a stored `usacloud` profile and built-in defaults into one validated
//!   [`ResolvedConfig`]
//! - **Clients**: build one shared option object and a client per backend
//!   service into a [`ClientBundle`]
//! - **Waiters**: poll freshly created resources until they are ready,
//!   within a deadline
//! - **Error classification**: tell "not visible yet" from "gone" from
//!   "broken"
//! - **Keyed locks**: serialize read-modify-write on shared parents
//! - **Logging**: `tracing` setup that honours the configured trace mode
//!
//! # Quick Start
//!
//! ```no_run
//! use sakura_provider_core::{
//!     init_logging, wait_ready, ClientFactory, ConfigFragment, Environment, HostTool, Resolver,
//!     ServiceId, WaitOptions,
//! };
//!
//! # async fn read_queue(_: &dyn sakura_provider_core::ServiceClient) -> sakura_provider_core::error::Result<()> { Ok(()) }
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let env = Environment::capture();
//!     let config = Resolver::new().resolve_from_environment(&ConfigFragment::default(), &env)?;
//!     let clients = ClientFactory::new(HostTool::terraform("1.9.0")).build(&config, &env)?;
//!
//!     let queue = clients.client(ServiceId::SimpleMq)?;
//!     wait_ready("SimpleMQ[example]", &WaitOptions::short(), || read_queue(queue.as_ref())).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod lock;
pub mod logging;
pub mod profile;
pub mod testing;
pub mod types;
pub mod waiter;

// Re-export main types at crate root
pub use client::{ClientBundle, ClientFactory, HostTool, ServiceClient};
pub use config::{ConfigFragment, Credentials, Environment, ResolvedConfig, Resolver};
pub use error::{classify, is_not_found, is_terminal, ErrorClass, ProviderError};
pub use lock::KeyedLock;
pub use logging::{init_logging, init_logging_with_default, try_init_logging, try_init_logging_for};
pub use profile::ProfileStore;
pub use types::{ServiceId, TraceMode};
pub use waiter::{wait_deleted, wait_for, wait_ready, wait_ready_when, ReadyCheck, WaitOptions};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use tracing;
