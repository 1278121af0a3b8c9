use cem_scenarios::ScenarioConfig;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::backend::{
    BuildRequest, Decomposer, ModelBuilder, ProblemInstance, SolvedInstance, Solver,
};
use crate::cluster::capacity_decisions;
use crate::error::MultiError;
use crate::report::{aggregate, default_report_path, write_report, FinalReport, YearResult};
use crate::store::ArtifactStore;
use crate::template::{TemplateGenerator, TemplateOptions};

/// Per-year progress, in the only order a year may pass through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum YearStage {
    Pending,
    TemplateReady,
    InstanceBuilt,
    ClusterSolved,
    FullSolved,
    Persisted,
}

impl YearStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            YearStage::Pending => "PENDING",
            YearStage::TemplateReady => "TEMPLATE_READY",
            YearStage::InstanceBuilt => "INSTANCE_BUILT",
            YearStage::ClusterSolved => "CLUSTER_SOLVED",
            YearStage::FullSolved => "FULL_SOLVED",
            YearStage::Persisted => "PERSISTED",
        }
    }
}

impl fmt::Display for YearStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one investment year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearRecord {
    pub year: u32,
    /// Stages reached, starting with `Pending`.
    pub stages: Vec<YearStage>,
    pub objective: Option<f64>,
    pub template: Option<PathBuf>,
    pub carry_forward: Option<PathBuf>,
    pub result: Option<PathBuf>,
}

impl YearRecord {
    fn new(year: u32) -> Self {
        Self {
            year,
            stages: vec![YearStage::Pending],
            objective: None,
            template: None,
            carry_forward: None,
            result: None,
        }
    }

    pub fn stage(&self) -> YearStage {
        self.stages.last().copied().unwrap_or(YearStage::Pending)
    }

    fn advance(&mut self, next: YearStage) {
        debug_assert!(next > self.stage(), "{next} cannot follow {}", self.stage());
        debug!(year = self.year, from = %self.stage(), to = %next, "year stage");
        self.stages.push(next);
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub template: TemplateOptions,
    /// Where to write the final report; defaults to the scenario file
    /// name with a `.json` extension.
    pub report_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub records: Vec<YearRecord>,
    pub report: FinalReport,
    pub report_path: PathBuf,
}

/// Drives the years of a scenario through template generation, model
/// build, optional cluster pre-solve and full solve, one year at a time.
pub struct Orchestrator<'a, B, D, S> {
    config: &'a ScenarioConfig,
    store: ArtifactStore,
    builder: B,
    decomposer: D,
    solver: S,
    options: RunOptions,
}

impl<'a, B, D, S> Orchestrator<'a, B, D, S>
where
    B: ModelBuilder,
    D: Decomposer<B::Instance>,
    S: Solver<B::Instance>,
{
    pub fn new(
        config: &'a ScenarioConfig,
        store: ArtifactStore,
        builder: B,
        decomposer: D,
        solver: S,
        options: RunOptions,
    ) -> Self {
        Self {
            config,
            store,
            builder,
            decomposer,
            solver,
            options,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Run every configured year in ascending order, then aggregate. The
    /// first failure stops the run; artifacts of finished years stay on disk.
    pub fn run(&self) -> Result<RunSummary, MultiError> {
        let generator = TemplateGenerator::new(self.config, self.options.template)?;
        info!(
            scenario = %self.config.name,
            years = ?self.config.years,
            workdir = %self.store.root().display(),
            "starting multi-year simulation"
        );

        let mut records = Vec::with_capacity(self.config.years.len());
        for &year in &self.config.years {
            records.push(self.run_year(&generator, year)?);
        }

        let report = aggregate(self.config, &self.store, self.solver.name())?;
        let report_path = self
            .options
            .report_path
            .clone()
            .unwrap_or_else(|| default_report_path(self.config));
        write_report(&report_path, &report)?;
        Ok(RunSummary {
            records,
            report,
            report_path,
        })
    }

    fn run_year(
        &self,
        generator: &TemplateGenerator<'_>,
        year: u32,
    ) -> Result<YearRecord, MultiError> {
        info!(year, "starting simulation year");
        let mut record = YearRecord::new(year);

        let prior = match self.config.previous_year(year) {
            Some(previous) => Some(self.store.prior_state(previous)?),
            None => None,
        };
        let template = generator.generate(year, prior.as_ref())?;
        let template_path = self.store.write_template(&template)?;
        record.template = Some(template_path.clone());
        record.advance(YearStage::TemplateReady);

        let request = BuildRequest {
            year,
            options: self.config.model_options(),
            template: template_path,
        };
        let mut instance = self
            .builder
            .build(&request)
            .map_err(|source| MultiError::Build { year, source })?;
        record.advance(YearStage::InstanceBuilt);

        if self.config.cluster {
            let clusters = self.config.cluster_sets.ok_or_else(|| MultiError::Cluster {
                year,
                source: anyhow::anyhow!("clustering enabled without a cluster count"),
            })?;
            info!(year, clusters, "solving clustered capacity");
            let solution = self
                .decomposer
                .decompose(&instance, &request, clusters)
                .map_err(|source| MultiError::Cluster { year, source })?;
            let decisions = capacity_decisions(self.config, year, &solution)?;
            instance
                .fix_capacity(&decisions)
                .map_err(|source| MultiError::Cluster { year, source })?;
            debug!(year, fixed = decisions.len(), "capacity decisions fixed");
            record.advance(YearStage::ClusterSolved);
        }

        info!(year, solver = self.solver.name(), "solving full year dispatch");
        let solved = self
            .solver
            .solve(instance)
            .map_err(|source| MultiError::Solve { year, source })?;
        record.objective = solved.objective_value();
        record.advance(YearStage::FullSolved);

        if self.config.is_last_year(year) {
            debug!(year, "last year, no carry-forward written");
        } else {
            let state = solved
                .carry_forward()
                .map_err(|source| MultiError::Solve { year, source })?;
            let path = self.store.write_carry_forward(year, &state)?;
            debug!(year, path = %path.display(), "carry-forward persisted");
            record.carry_forward = Some(path);
        }

        let value = solved
            .year_result()
            .map_err(|source| MultiError::Solve { year, source })?;
        let result = YearResult::from_value(value)
            .map_err(|message| MultiError::MalformedResult { year, message })?;
        record.result = Some(self.store.write_result(year, &result)?);
        drop(solved);
        record.advance(YearStage::Persisted);

        info!(year, objective = ?record.objective, "year persisted");
        Ok(record)
    }
}
