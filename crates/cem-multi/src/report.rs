//! Folding persisted per-year results into the final report.

use cem_scenarios::ScenarioConfig;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::MultiError;
use crate::store::{write_json, ArtifactStore};

/// Top-level keys every marshalled year result carries.
pub const RESULT_KEYS: [&str; 5] = ["sets", "params", "vars", "duals", "objective_value"];

/// One year's solved-instance document. Opaque apart from its top-level keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct YearResult(Map<String, Value>);

impl YearResult {
    pub fn from_value(value: Value) -> Result<Self, String> {
        let Value::Object(map) = value else {
            return Err("expected a JSON object".to_string());
        };
        let missing: Vec<&str> = RESULT_KEYS
            .iter()
            .copied()
            .filter(|key| !map.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(format!("missing keys: {}", missing.join(", ")));
        }
        Ok(Self(map))
    }

    pub fn objective_value(&self) -> Option<f64> {
        self.0.get("objective_value").and_then(Value::as_f64)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// Scenario description embedded in the report under `meta`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMeta {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Years")]
    pub years: Vec<u32>,
    #[serde(rename = "Template")]
    pub template: String,
    #[serde(rename = "Clustering")]
    pub clustering: bool,
    /// Cluster count, or `"N/A"` when clustering is off.
    #[serde(rename = "Cluster_number")]
    pub cluster_number: Value,
    #[serde(rename = "Solver")]
    pub solver: String,
    #[serde(rename = "Discount_rate")]
    pub discount_rate: f64,
    #[serde(rename = "Emission_cost")]
    pub emission_cost: Option<Vec<f64>>,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "NEM wide RET as ratio")]
    pub nem_ret_ratio: Option<Vec<f64>>,
    #[serde(rename = "NEM wide RET as GWh")]
    pub nem_ret_gwh: Option<Vec<f64>>,
    #[serde(rename = "Regional based RET")]
    pub region_ret_ratio: Option<BTreeMap<String, Vec<f64>>>,
    #[serde(rename = "System emission limit")]
    pub emit_limit: Option<Vec<f64>>,
    #[serde(rename = "Dispatchable generation ratio")]
    pub nem_disp_ratio: Option<Vec<f64>>,
    #[serde(rename = "Renewable Dispatchable generation ratio")]
    pub nem_re_disp_ratio: Option<Vec<f64>>,
    #[serde(rename = "Custom costs")]
    pub custom_costs: Option<Vec<Value>>,
    #[serde(rename = "Exogenous Capacity decisions")]
    pub exogenous_capacity: Option<Vec<Value>>,
}

impl ReportMeta {
    pub fn from_config(config: &ScenarioConfig, solver: &str) -> Self {
        let p = &config.policies;
        Self {
            name: config.name.clone(),
            years: config.years.clone(),
            template: config.template.display().to_string(),
            clustering: config.cluster,
            cluster_number: match (config.cluster, config.cluster_sets) {
                (true, Some(k)) => Value::from(k),
                _ => Value::from("N/A"),
            },
            solver: solver.to_string(),
            discount_rate: config.discount_rate,
            emission_cost: p.cost_emit.clone(),
            description: config.description.clone(),
            nem_ret_ratio: p.nem_ret_ratio.clone(),
            nem_ret_gwh: p.nem_ret_gwh.clone(),
            region_ret_ratio: p.region_ret_ratio.as_ref().map(|regions| {
                regions
                    .iter()
                    .map(|(region, values)| (region.to_string(), values.clone()))
                    .collect()
            }),
            emit_limit: p.emit_limit.clone(),
            nem_disp_ratio: p.nem_disp_ratio.clone(),
            nem_re_disp_ratio: p.nem_re_disp_ratio.clone(),
            custom_costs: config.custom_costs.as_ref().map(|t| t.to_records()),
            exogenous_capacity: config.exogenous_capacity.as_ref().map(|t| t.to_records()),
        }
    }
}

/// `{"meta": ..., "<year>": <result>, ...}`
#[derive(Debug, Clone, PartialEq)]
pub struct FinalReport {
    pub meta: ReportMeta,
    pub years: BTreeMap<u32, YearResult>,
}

impl Serialize for FinalReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.years.len() + 1))?;
        map.serialize_entry("meta", &self.meta)?;
        for (year, result) in &self.years {
            map.serialize_entry(&year.to_string(), result)?;
        }
        map.end()
    }
}

/// Read every configured year's persisted result. Any missing year fails the
/// whole aggregation.
pub fn aggregate(
    config: &ScenarioConfig,
    store: &ArtifactStore,
    solver: &str,
) -> Result<FinalReport, MultiError> {
    let mut years = BTreeMap::new();
    for &year in &config.years {
        years.insert(year, store.read_result(year)?);
    }
    Ok(FinalReport {
        meta: ReportMeta::from_config(config, solver),
        years,
    })
}

/// Report file named after the scenario file: `base.toml` -> `base.json`.
pub fn default_report_path(config: &ScenarioConfig) -> PathBuf {
    config.source_path.with_extension("json")
}

pub fn write_report(path: &Path, report: &FinalReport) -> Result<(), MultiError> {
    write_json(path, report)?;
    info!(path = %path.display(), years = report.years.len(), "final report written");
    Ok(())
}
