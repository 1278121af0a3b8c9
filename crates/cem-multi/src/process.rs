//! Solver plugin backend.
//!
//! The model builder, decomposer and solver all live in one external
//! executable. Each call spawns it once, writes a JSON request to stdin and
//! reads a JSON response from stdout:
//!
//! ```text
//! request:  {"action": "build" | "decompose" | "solve", "year": 2020,
//!            "template": "/tmp/cem-.../Sim2020.dat", "options": {...},
//!            "clusters": 6, "fixed_capacity": [...]}
//! response: {"status": "ok" | "optimal" | "infeasible" | ..., "message": "...",
//!            "capacity": [...], "objective_value": 1.0e9,
//!            "carry_forward": {...}, "result": {...}}
//! ```
//!
//! Exit codes follow the solver plugin convention: 0 success, 1 invalid
//! input, 2 solver error, 3 timeout, 139 crash.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Instant;
use tracing::debug;

use crate::backend::{
    BuildRequest, CapacitySolution, Decomposer, ModelBuilder, ProblemInstance, SolvedInstance,
    Solver,
};
use crate::carry::CarryForwardState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    InvalidInput,
    SolverError,
    Timeout,
    Crash,
}

impl ExitCode {
    pub fn from_raw(code: i32) -> Self {
        match code {
            0 => ExitCode::Success,
            1 => ExitCode::InvalidInput,
            3 => ExitCode::Timeout,
            139 => ExitCode::Crash,
            _ => ExitCode::SolverError,
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ExitCode::Success => "success",
            ExitCode::InvalidInput => "invalid input",
            ExitCode::SolverError => "solver error",
            ExitCode::Timeout => "timeout",
            ExitCode::Crash => "crashed",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Build,
    Decompose,
    Solve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginStatus {
    Ok,
    Optimal,
    Infeasible,
    Unbounded,
    Error,
}

#[derive(Debug, Serialize)]
struct PluginRequest<'a> {
    action: Action,
    #[serde(flatten)]
    build: &'a BuildRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    clusters: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fixed_capacity: Option<&'a CapacitySolution>,
}

#[derive(Debug, Deserialize)]
struct PluginResponse {
    status: PluginStatus,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    capacity: Option<CapacitySolution>,
    #[serde(default)]
    objective_value: Option<f64>,
    #[serde(default)]
    carry_forward: Option<CarryForwardState>,
    #[serde(default)]
    result: Option<serde_json::Value>,
}

/// External executable acting as model builder, decomposer and solver.
#[derive(Debug, Clone)]
pub struct SolverPlugin {
    program: PathBuf,
    args: Vec<String>,
    label: String,
}

impl SolverPlugin {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let label = program
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());
        Self {
            program,
            args: Vec::new(),
            label,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }

    /// Name recorded as the solver in the report.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    fn call(&self, request: &PluginRequest<'_>) -> Result<PluginResponse> {
        let payload = serde_json::to_vec(request).context("encoding plugin request")?;
        let start = Instant::now();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("starting solver plugin '{}'", self.program.display()))?;

        {
            let stdin = child
                .stdin
                .as_mut()
                .ok_or_else(|| anyhow!("solver plugin stdin unavailable"))?;
            stdin
                .write_all(&payload)
                .context("writing request to solver plugin")?;
        }
        drop(child.stdin.take());

        let output = child
            .wait_with_output()
            .context("waiting for solver plugin")?;
        debug!(
            action = ?request.action,
            year = request.build.year,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "solver plugin returned"
        );

        let exit = ExitCode::from_raw(output.status.code().unwrap_or(-1));
        if exit != ExitCode::Success {
            bail!(
                "solver plugin exited with {exit}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        if output.stdout.is_empty() {
            bail!("solver plugin produced no response");
        }
        let response: PluginResponse =
            serde_json::from_slice(&output.stdout).context("decoding solver plugin response")?;
        match response.status {
            PluginStatus::Ok | PluginStatus::Optimal => Ok(response),
            status => bail!(
                "solver plugin reported {status:?}: {}",
                response.message.as_deref().unwrap_or("no message")
            ),
        }
    }
}

/// Instance handle: the request plus any capacity fixed before the solve.
#[derive(Debug, Clone)]
pub struct PluginInstance {
    request: BuildRequest,
    fixed: Option<CapacitySolution>,
}

impl ProblemInstance for PluginInstance {
    fn fix_capacity(&mut self, decisions: &CapacitySolution) -> Result<()> {
        self.fixed = Some(decisions.clone());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PluginSolution {
    objective: Option<f64>,
    carry_forward: Option<CarryForwardState>,
    result: Option<serde_json::Value>,
}

impl SolvedInstance for PluginSolution {
    fn carry_forward(&self) -> Result<CarryForwardState> {
        self.carry_forward
            .clone()
            .ok_or_else(|| anyhow!("solver plugin returned no carry_forward state"))
    }

    fn year_result(&self) -> Result<serde_json::Value> {
        self.result
            .clone()
            .ok_or_else(|| anyhow!("solver plugin returned no result"))
    }

    fn objective_value(&self) -> Option<f64> {
        self.objective.or_else(|| {
            self.result
                .as_ref()
                .and_then(|r| r.get("objective_value"))
                .and_then(serde_json::Value::as_f64)
        })
    }
}

impl ModelBuilder for SolverPlugin {
    type Instance = PluginInstance;

    fn build(&self, request: &BuildRequest) -> Result<PluginInstance> {
        self.call(&PluginRequest {
            action: Action::Build,
            build: request,
            clusters: None,
            fixed_capacity: None,
        })?;
        Ok(PluginInstance {
            request: request.clone(),
            fixed: None,
        })
    }
}

impl Decomposer<PluginInstance> for SolverPlugin {
    fn decompose(
        &self,
        instance: &PluginInstance,
        request: &BuildRequest,
        clusters: u32,
    ) -> Result<CapacitySolution> {
        debug_assert_eq!(instance.request.year, request.year);
        let response = self.call(&PluginRequest {
            action: Action::Decompose,
            build: request,
            clusters: Some(clusters),
            fixed_capacity: None,
        })?;
        response
            .capacity
            .ok_or_else(|| anyhow!("solver plugin returned no capacity solution"))
    }
}

impl Solver<PluginInstance> for SolverPlugin {
    type Solved = PluginSolution;

    fn name(&self) -> &str {
        &self.label
    }

    fn solve(&self, instance: PluginInstance) -> Result<PluginSolution> {
        let response = self.call(&PluginRequest {
            action: Action::Solve,
            build: &instance.request,
            clusters: None,
            fixed_capacity: instance.fixed.as_ref(),
        })?;
        Ok(PluginSolution {
            objective: response.objective_value,
            carry_forward: response.carry_forward,
            result: response.result,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use cem_scenarios::ModelOptions;
    use std::fs;
    use tempfile::TempDir;

    // Run scripts through sh so the freshly written file is never exec'd
    // directly while another test thread may still hold it open.
    fn plugin(script: &str) -> (TempDir, SolverPlugin) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake-solver.sh");
        fs::write(&path, script).unwrap();
        let plugin = SolverPlugin::new("/bin/sh")
            .with_args([path.display().to_string()])
            .with_label("fake-solver");
        (dir, plugin)
    }

    fn request() -> BuildRequest {
        BuildRequest {
            year: 2020,
            options: ModelOptions::default(),
            template: PathBuf::from("Sim2020.dat"),
        }
    }

    #[test]
    fn label_defaults_to_program_name() {
        let plugin = SolverPlugin::new("/opt/solvers/cbc-plugin");
        assert_eq!(Solver::<PluginInstance>::name(&plugin), "cbc-plugin");
        let plugin = plugin.with_label("cbc");
        assert_eq!(Solver::<PluginInstance>::name(&plugin), "cbc");
    }

    #[test]
    fn solve_returns_result_and_carry_forward() {
        let (_dir, plugin) = plugin(
            r#"cat > /dev/null
echo '{"status":"optimal","objective_value":42.5,"carry_forward":{"gen_cap_initial":[{"index":[1,2],"value":5.0}]},"result":{"sets":{},"params":{},"vars":{},"duals":{},"objective_value":42.5}}'"#,
        );
        let instance = plugin.build(&request()).unwrap();
        let solved = plugin.solve(instance).unwrap();
        assert_eq!(solved.objective_value(), Some(42.5));
        let state = solved.carry_forward().unwrap();
        assert_eq!(state.gen_cap_initial.len(), 1);
        assert_eq!(state.gen_cap_initial[0].value, 5.0);
        assert!(solved.year_result().unwrap().get("duals").is_some());
    }

    #[test]
    fn request_carries_action_and_year() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("request.json");
        let script = dir.path().join("fake-solver.sh");
        fs::write(
            &script,
            format!(
                "cat > '{}'\necho '{{\"status\":\"ok\",\"capacity\":[]}}'\n",
                log.display()
            ),
        )
        .unwrap();
        let plugin = SolverPlugin::new("/bin/sh").with_args([script.display().to_string()]);

        let instance = plugin.build(&request()).unwrap();
        let solution = plugin.decompose(&instance, &request(), 6).unwrap();
        assert!(solution.is_empty());

        let sent: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&log).unwrap()).unwrap();
        assert_eq!(sent["action"], "decompose");
        assert_eq!(sent["year"], 2020);
        assert_eq!(sent["clusters"], 6);
        assert!(sent.get("fixed_capacity").is_none());
    }

    #[test]
    fn non_optimal_status_is_an_error() {
        let (_dir, plugin) = plugin(
            r#"cat > /dev/null
echo '{"status":"infeasible","message":"demand cannot be met"}'"#,
        );
        let instance = PluginInstance {
            request: request(),
            fixed: None,
        };
        let err = plugin.solve(instance).unwrap_err();
        assert!(format!("{err:#}").contains("demand cannot be met"));
    }

    #[test]
    fn non_zero_exit_reports_stderr() {
        let (_dir, plugin) = plugin("cat > /dev/null\necho 'license expired' >&2\nexit 2");
        let err = plugin.build(&request()).unwrap_err();
        let text = format!("{err:#}");
        assert!(text.contains("solver error"));
        assert!(text.contains("license expired"));
    }
}
