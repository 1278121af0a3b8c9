use cem_core::tech::{default_regions, default_techs, default_zones, tech_name};
use cem_core::{RegionId, TechCategory, TechId, ZoneId, MAX_YEAR, MIN_YEAR};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;
use crate::overrides::{CustomCostTable, ExogenousCapacityTable};

/// Data source clause used to bootstrap operating capacity in the first year.
pub const DEFAULT_CAPACITY_SOURCE: &str =
    "\"localhost\" database=opencem_input user=select using=pymysql";

/// Scenario file as written on disk, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawScenarioFile {
    #[serde(rename = "Scenario")]
    pub scenario: Option<RawScenario>,
    #[serde(rename = "Advanced", default)]
    pub advanced: RawAdvanced,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawScenario {
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Years")]
    pub years: Option<Vec<i64>>,
    pub discountrate: Option<f64>,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "Template")]
    pub template: Option<String>,
    pub cost_emit: Option<Vec<f64>>,
    pub nem_ret_ratio: Option<Vec<f64>>,
    pub nem_ret_gwh: Option<Vec<f64>>,
    pub region_ret_ratio: Option<BTreeMap<String, Vec<f64>>>,
    pub emitlimit: Option<Vec<f64>>,
    pub nem_disp_ratio: Option<Vec<f64>>,
    pub nem_re_disp_ratio: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAdvanced {
    #[serde(rename = "Template")]
    pub template: Option<String>,
    #[serde(default)]
    pub cluster: bool,
    pub cluster_sets: Option<i64>,
    pub regions: Option<Vec<u32>>,
    pub zones: Option<Vec<u32>>,
    pub all_tech: Option<Vec<u32>>,
    pub all_tech_per_zone: Option<BTreeMap<String, Vec<u32>>>,
    pub custom_costs: Option<String>,
    pub exogenous_capacity: Option<String>,
    pub capacity_source: Option<String>,
}

/// Optional per-year policy series. Each present series holds exactly one
/// value per configured year, matched to years by position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PolicySeries {
    pub cost_emit: Option<Vec<f64>>,
    pub nem_ret_ratio: Option<Vec<f64>>,
    pub nem_ret_gwh: Option<Vec<f64>>,
    pub region_ret_ratio: Option<BTreeMap<RegionId, Vec<f64>>>,
    pub emit_limit: Option<Vec<f64>>,
    pub nem_disp_ratio: Option<Vec<f64>>,
    pub nem_re_disp_ratio: Option<Vec<f64>>,
}

/// Which optional policy constraints the model builder must include.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOptions {
    pub nem_ret_ratio: bool,
    pub nem_ret_gwh: bool,
    pub region_ret_ratio: bool,
    pub emitlimit: bool,
    pub nem_disp_ratio: bool,
    pub nem_re_disp_ratio: bool,
}

/// Validated, immutable scenario definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioConfig {
    /// File the scenario was loaded from; names the final report.
    pub source_path: PathBuf,
    pub name: String,
    pub description: Option<String>,
    /// Ascending; duplicates are kept.
    pub years: Vec<u32>,
    pub discount_rate: f64,
    pub template: PathBuf,
    pub policies: PolicySeries,
    pub custom_costs: Option<CustomCostTable>,
    pub exogenous_capacity: Option<ExogenousCapacityTable>,
    pub cluster: bool,
    pub cluster_sets: Option<u32>,
    pub regions: Vec<RegionId>,
    pub zones: Vec<ZoneId>,
    pub all_tech: Vec<TechId>,
    pub all_tech_per_zone: BTreeMap<ZoneId, Vec<TechId>>,
    pub capacity_source: String,
}

impl ScenarioConfig {
    pub fn model_options(&self) -> ModelOptions {
        let p = &self.policies;
        ModelOptions {
            nem_ret_ratio: p.nem_ret_ratio.is_some(),
            nem_ret_gwh: p.nem_ret_gwh.is_some(),
            region_ret_ratio: p.region_ret_ratio.is_some(),
            emitlimit: p.emit_limit.is_some(),
            nem_disp_ratio: p.nem_disp_ratio.is_some(),
            nem_re_disp_ratio: p.nem_re_disp_ratio.is_some(),
        }
    }

    /// Position of `year` in the sorted years list (first occurrence).
    pub fn year_index(&self, year: u32) -> Option<usize> {
        self.years.iter().position(|y| *y == year)
    }

    /// The investment period before `year`, or `None` for the first one.
    pub fn previous_year(&self, year: u32) -> Option<u32> {
        match self.year_index(year) {
            Some(idx) if idx > 0 => Some(self.years[idx - 1]),
            _ => None,
        }
    }

    pub fn is_last_year(&self, year: u32) -> bool {
        self.years.last() == Some(&year)
    }

    /// Per-zone technologies restricted to one catalogue category.
    pub fn techs_per_zone(&self, category: TechCategory) -> BTreeMap<ZoneId, Vec<TechId>> {
        self.all_tech_per_zone
            .iter()
            .map(|(zone, techs)| {
                let members = techs
                    .iter()
                    .copied()
                    .filter(|t| category.contains(*t))
                    .collect();
                (*zone, members)
            })
            .collect()
    }
}

pub fn load_config_from_path(path: &Path) -> Result<ScenarioConfig, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound {
            what: "scenario config file",
            path: path.to_path_buf(),
        });
    }
    let data = fs::read_to_string(path).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    let raw: RawScenarioFile = toml::from_str(&data).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    let config = validate(raw, path)?;
    debug!(
        scenario = %config.name,
        years = ?config.years,
        "scenario configuration loaded"
    );
    Ok(config)
}

/// Check every invariant of a raw scenario and build the immutable config.
///
/// Checks run in a fixed order and the first violation is returned.
/// `source` locates the file for resolving relative paths.
pub fn validate(raw: RawScenarioFile, source: &Path) -> Result<ScenarioConfig, ConfigError> {
    let base_dir = source
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let resolve = |value: &str| {
        let p = PathBuf::from(value);
        if p.is_absolute() {
            p
        } else {
            base_dir.join(p)
        }
    };

    let scenario = raw.scenario.ok_or(ConfigError::MissingKey {
        section: "Scenario",
        key: "Name",
    })?;
    let advanced = raw.advanced;

    let name = scenario.name.ok_or(ConfigError::MissingKey {
        section: "Scenario",
        key: "Name",
    })?;

    let years = validate_years(scenario.years.ok_or(ConfigError::MissingKey {
        section: "Scenario",
        key: "Years",
    })?)?;

    let discount_rate = scenario.discountrate.ok_or(ConfigError::MissingKey {
        section: "Scenario",
        key: "discountrate",
    })?;
    if !(0.0..=1.0).contains(&discount_rate) {
        return Err(ConfigError::Range {
            field: "discountrate".into(),
            message: "value must be between 0 and 1".into(),
        });
    }

    let n = years.len();
    let policies = PolicySeries {
        cost_emit: check_series("cost_emit", scenario.cost_emit, n, Bound::NonNegative)?,
        nem_ret_ratio: check_series("nem_ret_ratio", scenario.nem_ret_ratio, n, Bound::Ratio)?,
        nem_ret_gwh: check_series("nem_ret_gwh", scenario.nem_ret_gwh, n, Bound::NonNegative)?,
        region_ret_ratio: check_region_series(scenario.region_ret_ratio, n)?,
        emit_limit: check_series("emitlimit", scenario.emitlimit, n, Bound::NonNegative)?,
        nem_disp_ratio: check_series("nem_disp_ratio", scenario.nem_disp_ratio, n, Bound::Ratio)?,
        nem_re_disp_ratio: check_series(
            "nem_re_disp_ratio",
            scenario.nem_re_disp_ratio,
            n,
            Bound::Ratio,
        )?,
    };

    let template = advanced
        .template
        .or(scenario.template)
        .ok_or(ConfigError::MissingKey {
            section: "Advanced",
            key: "Template",
        })?;
    let template = resolve(&template);
    if !template.is_file() {
        return Err(ConfigError::NotFound {
            what: "template file",
            path: template,
        });
    }

    let custom_costs = advanced
        .custom_costs
        .as_deref()
        .map(|p| CustomCostTable::load(&resolve(p)))
        .transpose()?;
    let exogenous_capacity = advanced
        .exogenous_capacity
        .as_deref()
        .map(|p| ExogenousCapacityTable::load(&resolve(p)))
        .transpose()?;

    let cluster_sets = match advanced.cluster_sets {
        Some(k) if k < 1 || k > i64::from(u32::MAX) => {
            return Err(ConfigError::Range {
                field: "cluster_sets".into(),
                message: format!("{k} is not a positive cluster count"),
            })
        }
        Some(k) => Some(k as u32),
        None if advanced.cluster => {
            return Err(ConfigError::MissingKey {
                section: "Advanced",
                key: "cluster_sets",
            })
        }
        None => None,
    };

    let regions = id_list(advanced.regions, "regions", RegionId::new, default_regions)?;
    let zones = id_list(advanced.zones, "zones", ZoneId::new, default_zones)?;
    let all_tech = id_list(advanced.all_tech, "all_tech", TechId::new, default_techs)?;
    if let Some(tech) = all_tech.iter().find(|t| tech_name(**t).is_none()) {
        return Err(ConfigError::Range {
            field: "all_tech".into(),
            message: format!("{tech} is not in the technology catalogue"),
        });
    }
    let all_tech_per_zone = match advanced.all_tech_per_zone {
        Some(map) => parse_zone_techs(map, &zones, &all_tech)?,
        None => zones.iter().map(|z| (*z, all_tech.clone())).collect(),
    };

    Ok(ScenarioConfig {
        source_path: source.to_path_buf(),
        name,
        description: scenario.description,
        years,
        discount_rate,
        template,
        policies,
        custom_costs,
        exogenous_capacity,
        cluster: advanced.cluster,
        cluster_sets,
        regions,
        zones,
        all_tech,
        all_tech_per_zone,
        capacity_source: advanced
            .capacity_source
            .unwrap_or_else(|| DEFAULT_CAPACITY_SOURCE.to_string()),
    })
}

fn validate_years(raw: Vec<i64>) -> Result<Vec<u32>, ConfigError> {
    if raw.is_empty() {
        return Err(ConfigError::Empty { field: "Years" });
    }
    let mut years = Vec::with_capacity(raw.len());
    for year in raw {
        if year > i64::from(MAX_YEAR) {
            return Err(ConfigError::Range {
                field: "Years".into(),
                message: format!("{year}: last full year of data is {MAX_YEAR}"),
            });
        }
        if year < i64::from(MIN_YEAR) {
            return Err(ConfigError::Range {
                field: "Years".into(),
                message: format!("{year}: no historical data before {MIN_YEAR}"),
            });
        }
        years.push(year as u32);
    }
    years.sort_unstable();
    Ok(years)
}

#[derive(Clone, Copy)]
enum Bound {
    Ratio,
    NonNegative,
}

impl Bound {
    fn admits(self, value: f64) -> bool {
        match self {
            Bound::Ratio => (0.0..=1.0).contains(&value),
            Bound::NonNegative => value >= 0.0,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Bound::Ratio => "element(s) outside range [0,1]",
            Bound::NonNegative => "element(s) must not be negative",
        }
    }
}

fn check_series(
    field: &str,
    series: Option<Vec<f64>>,
    expected: usize,
    bound: Bound,
) -> Result<Option<Vec<f64>>, ConfigError> {
    let Some(values) = series else {
        return Ok(None);
    };
    if values.len() != expected {
        return Err(ConfigError::LengthMismatch {
            field: field.to_string(),
            expected,
            found: values.len(),
        });
    }
    if !values.iter().all(|v| bound.admits(*v)) {
        return Err(ConfigError::Range {
            field: field.to_string(),
            message: bound.describe().into(),
        });
    }
    Ok(Some(values))
}

fn check_region_series(
    series: Option<BTreeMap<String, Vec<f64>>>,
    expected: usize,
) -> Result<Option<BTreeMap<RegionId, Vec<f64>>>, ConfigError> {
    let Some(map) = series else {
        return Ok(None);
    };
    let mut out = BTreeMap::new();
    for (key, values) in map {
        let region: RegionId = key.parse().map_err(|_| ConfigError::Range {
            field: "region_ret_ratio".into(),
            message: format!("'{key}' is not a region id"),
        })?;
        let field = format!("region_ret_ratio[{key}]");
        if let Some(values) = check_series(&field, Some(values), expected, Bound::Ratio)? {
            out.insert(region, values);
        }
    }
    Ok(Some(out))
}

fn id_list<T>(
    raw: Option<Vec<u32>>,
    field: &'static str,
    wrap: fn(u32) -> T,
    default: fn() -> Vec<T>,
) -> Result<Vec<T>, ConfigError> {
    match raw {
        Some(ids) if ids.is_empty() => Err(ConfigError::Empty { field }),
        Some(ids) => Ok(ids.into_iter().map(wrap).collect()),
        None => Ok(default()),
    }
}

/// Per-zone technology lists; every zone must be configured and every
/// technology listed in `all_tech`.
fn parse_zone_techs(
    map: BTreeMap<String, Vec<u32>>,
    zones: &[ZoneId],
    all_tech: &[TechId],
) -> Result<BTreeMap<ZoneId, Vec<TechId>>, ConfigError> {
    let invalid = |message: String| ConfigError::Range {
        field: "all_tech_per_zone".into(),
        message,
    };
    let mut out = BTreeMap::new();
    for (key, techs) in map {
        let zone: ZoneId = key
            .parse()
            .map_err(|_| invalid(format!("'{key}' is not a zone id")))?;
        if !zones.contains(&zone) {
            return Err(invalid(format!("zone {zone} is not listed in zones")));
        }
        let techs: Vec<TechId> = techs.into_iter().map(TechId::new).collect();
        if let Some(tech) = techs.iter().find(|t| !all_tech.contains(t)) {
            let message = format!("zone {zone}: tech {tech} is not listed in all_tech");
            return Err(invalid(message));
        }
        out.insert(zone, techs);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn scenario_dir(scenario_extra: &str, advanced_extra: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("template.dat"), "set zones := [zones];\n").unwrap();
        let cfg = dir.path().join("scenario.toml");
        fs::write(
            &cfg,
            format!(
                "[Scenario]\nName = \"test\"\nYears = [2030, 2020]\ndiscountrate = 0.06\n\
                 {scenario_extra}\n[Advanced]\nTemplate = \"template.dat\"\n{advanced_extra}\n"
            ),
        )
        .unwrap();
        (dir, cfg)
    }

    #[test]
    fn loads_minimal_scenario_with_defaults() {
        let (_dir, path) = scenario_dir("", "");
        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.name, "test");
        assert_eq!(config.years, vec![2020, 2030]);
        assert_eq!(config.zones.len(), 16);
        assert!(!config.cluster);
        assert!(config.template.ends_with("template.dat"));
        assert_eq!(config.all_tech_per_zone.len(), 16);
        assert_eq!(config.model_options(), ModelOptions::default());
    }

    #[test]
    fn duplicate_years_are_kept() {
        let (_dir, path) = scenario_dir("", "");
        let text = fs::read_to_string(&path)
            .unwrap()
            .replace("[2030, 2020]", "[2025, 2020, 2025]");
        fs::write(&path, text).unwrap();
        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.years, vec![2020, 2025, 2025]);
    }

    #[test]
    fn years_out_of_range_fail() {
        for years in ["[2017, 2020]", "[2020, 2051]", "[]"] {
            let (_dir, path) = scenario_dir("", "");
            let text = fs::read_to_string(&path)
                .unwrap()
                .replace("[2030, 2020]", years);
            fs::write(&path, text).unwrap();
            let err = load_config_from_path(&path).unwrap_err();
            assert!(
                matches!(err, ConfigError::Range { .. } | ConfigError::Empty { .. }),
                "{years}: {err}"
            );
        }
    }

    #[test]
    fn every_series_length_is_checked() {
        let series = [
            "cost_emit = [1.0]",
            "nem_ret_ratio = [0.1, 0.2, 0.3]",
            "nem_ret_gwh = [10.0]",
            "region_ret_ratio = { 1 = [0.5] }",
            "emitlimit = [1, 2, 3]",
            "nem_disp_ratio = [0.2]",
            "nem_re_disp_ratio = [0.2]",
        ];
        for line in series {
            let (_dir, path) = scenario_dir(line, "");
            let err = load_config_from_path(&path).unwrap_err();
            assert!(
                matches!(err, ConfigError::LengthMismatch { .. }),
                "{line}: {err}"
            );
        }
    }

    #[test]
    fn series_ranges_are_checked() {
        for line in [
            "nem_ret_ratio = [0.1, 1.5]",
            "cost_emit = [-1, 2]",
            "region_ret_ratio = { 2 = [0.1, -0.1] }",
            "nem_re_disp_ratio = [0.1, nan]",
        ] {
            let (_dir, path) = scenario_dir(line, "");
            let err = load_config_from_path(&path).unwrap_err();
            assert!(matches!(err, ConfigError::Range { .. }), "{line}: {err}");
        }
    }

    #[test]
    fn policies_enable_model_options() {
        let (_dir, path) = scenario_dir(
            "nem_ret_ratio = [0.1, 0.5]\nregion_ret_ratio = { 3 = [0.2, 0.4] }",
            "",
        );
        let config = load_config_from_path(&path).unwrap();
        let options = config.model_options();
        assert!(options.nem_ret_ratio);
        assert!(options.region_ret_ratio);
        assert!(!options.emitlimit);
        let regional = config.policies.region_ret_ratio.unwrap();
        assert_eq!(regional[&RegionId::new(3)], vec![0.2, 0.4]);
    }

    #[test]
    fn discount_rate_must_be_a_ratio() {
        let (_dir, path) = scenario_dir("", "");
        let text = fs::read_to_string(&path)
            .unwrap()
            .replace("discountrate = 0.06", "discountrate = 1.2");
        fs::write(&path, text).unwrap();
        assert!(matches!(
            load_config_from_path(&path),
            Err(ConfigError::Range { .. })
        ));
    }

    #[test]
    fn missing_files_are_reported() {
        let (_dir, path) = scenario_dir("", "custom_costs = \"nope.csv\"");
        let err = load_config_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { what, .. } if what == "custom costs file"));

        let (dir, path) = scenario_dir("", "");
        fs::remove_file(dir.path().join("template.dat")).unwrap();
        let err = load_config_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { what, .. } if what == "template file"));

        let err = load_config_from_path(Path::new("/nonexistent/scenario.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn clustering_requires_a_count() {
        let (_dir, path) = scenario_dir("", "cluster = true");
        let err = load_config_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { key: "cluster_sets", .. }));

        let (_dir, path) = scenario_dir("", "cluster = true\ncluster_sets = 0");
        assert!(matches!(
            load_config_from_path(&path),
            Err(ConfigError::Range { .. })
        ));
    }

    #[test]
    fn zone_technology_overrides_and_categories() {
        let (_dir, path) = scenario_dir(
            "",
            "zones = [1, 5]\nall_tech = [2, 14, 17]\nall_tech_per_zone = { 1 = [2, 17], 5 = [14] }",
        );
        let config = load_config_from_path(&path).unwrap();
        let storage = config.techs_per_zone(TechCategory::Storage);
        assert_eq!(storage[&ZoneId::new(1)], vec![TechId::new(17)]);
        assert!(storage[&ZoneId::new(5)].is_empty());
        assert_eq!(config.previous_year(2030), Some(2020));
        assert_eq!(config.previous_year(2020), None);
        assert!(config.is_last_year(2030));
    }

    #[test]
    fn technologies_must_be_known_and_listed() {
        let cases = [
            ("all_tech = [2, 99]", "all_tech"),
            ("zones = [1]\nall_tech_per_zone = { 5 = [2] }", "all_tech_per_zone"),
            ("all_tech = [2, 14]\nall_tech_per_zone = { 1 = [2, 17] }", "all_tech_per_zone"),
            ("all_tech_per_zone = { north = [2] }", "all_tech_per_zone"),
        ];
        for (advanced, expected) in cases {
            let (_dir, path) = scenario_dir("", advanced);
            let err = load_config_from_path(&path).unwrap_err();
            assert!(
                matches!(&err, ConfigError::Range { field, .. } if field == expected),
                "{advanced}: {err}"
            );
        }
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[Scenario\nName = ").unwrap();
        assert!(matches!(
            load_config_from_path(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
