//! Seams to the external model builder, clustering decomposer and solver.
//!
//! The orchestrator only sequences these calls. What an instance is, how it
//! is solved and how its results are flattened stays on the other side of
//! the traits, which is what lets the year loop run against in-memory fakes.

use anyhow::Result;
use cem_core::{TechCategory, TechId, ZoneId};
use cem_scenarios::ModelOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::carry::CarryForwardState;

/// Everything a model builder needs for one investment year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub year: u32,
    pub options: ModelOptions,
    pub template: PathBuf,
}

/// Capacity decision variables settled by the clustering pre-solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityVariable {
    GenCapNew,
    StorCapNew,
    HybCapNew,
    GenCapRet,
}

impl CapacityVariable {
    pub const ALL: [CapacityVariable; 4] = [
        CapacityVariable::GenCapNew,
        CapacityVariable::StorCapNew,
        CapacityVariable::HybCapNew,
        CapacityVariable::GenCapRet,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CapacityVariable::GenCapNew => "gen_cap_new",
            CapacityVariable::StorCapNew => "stor_cap_new",
            CapacityVariable::HybCapNew => "hyb_cap_new",
            CapacityVariable::GenCapRet => "gen_cap_ret",
        }
    }

    /// Technologies this variable is indexed over within a zone.
    pub fn category(self) -> TechCategory {
        match self {
            CapacityVariable::GenCapNew => TechCategory::Generation,
            CapacityVariable::StorCapNew => TechCategory::Storage,
            CapacityVariable::HybCapNew => TechCategory::Hybrid,
            CapacityVariable::GenCapRet => TechCategory::Retire,
        }
    }
}

impl fmt::Display for CapacityVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityEntry {
    pub variable: CapacityVariable,
    pub zone: ZoneId,
    pub tech: TechId,
    pub value: f64,
}

/// Capacity-only solution returned by a decomposer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapacitySolution {
    entries: Vec<CapacityEntry>,
}

impl CapacitySolution {
    pub fn new(entries: Vec<CapacityEntry>) -> Self {
        Self { entries }
    }

    pub fn insert(&mut self, variable: CapacityVariable, zone: ZoneId, tech: TechId, value: f64) {
        self.entries.push(CapacityEntry {
            variable,
            zone,
            tech,
            value,
        });
    }

    /// Last value recorded for `variable[zone, tech]`.
    pub fn get(&self, variable: CapacityVariable, zone: ZoneId, tech: TechId) -> Option<f64> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.variable == variable && e.zone == zone && e.tech == tech)
            .map(|e| e.value)
    }

    pub fn entries(&self) -> &[CapacityEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds an unsolved instance from a persisted year template.
pub trait ModelBuilder {
    type Instance: ProblemInstance;

    fn build(&self, request: &BuildRequest) -> Result<Self::Instance>;
}

pub trait ProblemInstance {
    /// Set the given capacity variables and hold them fixed for the next solve.
    fn fix_capacity(&mut self, decisions: &CapacitySolution) -> Result<()>;
}

/// Reduced representative-period solve of an instance's capacity decisions.
pub trait Decomposer<I> {
    fn decompose(
        &self,
        instance: &I,
        request: &BuildRequest,
        clusters: u32,
    ) -> Result<CapacitySolution>;
}

/// Full-year solve. Takes the instance by value; the solved handle replaces it.
pub trait Solver<I> {
    type Solved: SolvedInstance;

    /// Label recorded in the report metadata.
    fn name(&self) -> &str;

    fn solve(&self, instance: I) -> Result<Self::Solved>;
}

pub trait SolvedInstance {
    fn carry_forward(&self) -> Result<CarryForwardState>;

    /// Flattened `sets`/`params`/`vars`/`duals`/`objective_value` document.
    fn year_result(&self) -> Result<serde_json::Value>;

    fn objective_value(&self) -> Option<f64>;
}

/// Decomposer for runs without clustering. Any call is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDecomposer;

impl<I> Decomposer<I> for NoDecomposer {
    fn decompose(&self, _: &I, request: &BuildRequest, _: u32) -> Result<CapacitySolution> {
        anyhow::bail!(
            "clustering requested for {} but no decomposer is configured",
            request.year
        )
    }
}
