// Library exports for testing and potential library use
//
// # Locking Policy
//
// The dependency cache is the only state shared between workers. It is a
// `parking_lot::Mutex` around a plain map and follows two rules:
//
//   - Hold the lock only for a single map lookup or insert. Discovery, file
//     I/O and toolchain processes always run with the lock released.
//
//   - Never hand out references into the map. Readers receive clones, so a
//     caller mutating its set cannot affect the cache or other workers.
//
// Run configuration is not global: it travels in an `Arc<BuildContext>`
// shared read-only by every worker.

/// Application version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod command;
pub mod config;
pub mod debug;
pub mod dep_cache;
pub mod error;
pub mod layout;
pub mod orchestrator;
pub mod staleness;
pub mod toolchain;

pub use command::{BuildCommand, OutputArtifactSet, Variant, parse_command_list};
pub use config::{BuildSettings, ConfigError, ShadergenConfig};
pub use dep_cache::{CacheKey, DependencyCache};
pub use error::{BuildError, CommandFailure, Result};
pub use orchestrator::{BuildContext, BuildOrchestrator, BuildReport, CommandOutcome};
pub use staleness::out_of_date;
pub use toolchain::{Toolchain, ToolchainStage};
