//! Sequential multi-year capacity-expansion runs.
//!
//! Each investment year goes through a fixed sequence of stages:
//!
//! ```text
//! PENDING ─▶ TEMPLATE_READY ─▶ INSTANCE_BUILT ─▶ [CLUSTER_SOLVED] ─▶ FULL_SOLVED ─▶ PERSISTED
//!    │            │                                                                   │
//!    │   reads gen_cap_op<prev>.json                               writes gen_cap_op<year>.json
//!    │                                                              and <year>.json
//! ```
//!
//! Year *i* cannot start before year *i-1* is persisted because its
//! template loads the previous year's carry-forward artifact. Once every
//! year is persisted the per-year results are folded into one report.
//!
//! The model builder, the clustering decomposer and the solver are
//! external; they plug in through the traits in [`backend`]. The
//! [`process`] module provides an implementation that talks to a solver
//! plugin executable over stdin/stdout.

pub mod backend;
pub mod carry;
pub mod cluster;
pub mod error;
pub mod process;
pub mod report;
pub mod runner;
pub mod store;
pub mod template;

#[cfg(test)]
mod fixtures;

pub use backend::{
    BuildRequest, CapacityEntry, CapacitySolution, CapacityVariable, Decomposer, ModelBuilder,
    NoDecomposer, ProblemInstance, SolvedInstance, Solver,
};
pub use carry::{CarryForwardState, Indexed};
pub use cluster::{capacity_decisions, roundup, NegativeCapacity};
pub use error::MultiError;
pub use process::SolverPlugin;
pub use report::{aggregate, default_report_path, write_report, FinalReport, ReportMeta, YearResult};
pub use runner::{Orchestrator, RunOptions, RunSummary, YearRecord, YearStage};
pub use store::ArtifactStore;
pub use template::{PriorState, TemplateGenerator, TemplateOptions, YearTemplate};
