//! Native extension build pipeline.
//!
//! Resolves extension declarations into build units, plans compiler
//! invocations for them, and runs the plan.

pub mod context;
pub mod events;
pub mod exports;
pub mod fingerprint;
pub mod inplace;
pub mod native;
pub mod orchestrator;
pub mod plan;
pub mod resolver;
pub mod script;
pub mod toolchain;
pub mod unit;
pub mod util;

pub use context::{BuildContext, CompilerIdentity};
pub use events::{BuildEvent, EventSink};
pub use orchestrator::{BuildReport, Orchestrator, OrchestratorOptions, UnitStatus};
pub use plan::BuildPlan;
pub use resolver::{resolve, ResolveError, ResolveOptions};
pub use toolchain::{detect_toolchain, CommandSpec, CompilerFamily, Toolchain};
pub use unit::{BuildUnit, UnitKind};
