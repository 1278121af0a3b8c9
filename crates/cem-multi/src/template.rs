//! Per-year data command files.
//!
//! A scenario template is a data command file with placeholder tokens.
//! For each investment year the tokens are expanded from the scenario
//! configuration and the previous year's carry-forward artifact, and the
//! year-specific parameter blocks are appended after the body. Output is a
//! pure function of its inputs so that regenerating a year reproduces the
//! same bytes.

use cem_core::{format_param, TechCategory, TechId, ZoneId, FIRST_YEAR_BASELINE};
use cem_scenarios::{
    CostShape, ScenarioConfig, CUSTOM_COST_CATEGORIES, EXOGENOUS_CAPACITY_CATEGORIES,
};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::carry::{COST_CAP_CARRY_FORWARD, GEN_CAP_INITIAL, HYB_CAP_INITIAL, STOR_CAP_INITIAL};
use crate::error::MultiError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplateOptions {
    /// Restrict the time window to the first three days of the year.
    pub truncated_window: bool,
}

/// Reference to the carry-forward artifact persisted for the previous year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorState {
    pub year: u32,
    pub artifact: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearTemplate {
    pub year: u32,
    pub text: String,
}

pub struct TemplateGenerator<'a> {
    config: &'a ScenarioConfig,
    body: String,
    options: TemplateOptions,
}

impl<'a> TemplateGenerator<'a> {
    /// Read the scenario's template file once for every year of the run.
    pub fn new(config: &'a ScenarioConfig, options: TemplateOptions) -> Result<Self, MultiError> {
        let body = fs::read_to_string(&config.template).map_err(|source| MultiError::Artifact {
            action: "reading template",
            path: config.template.clone(),
            source,
        })?;
        Ok(Self::with_body(config, body, options))
    }

    pub fn with_body(
        config: &'a ScenarioConfig,
        body: impl Into<String>,
        options: TemplateOptions,
    ) -> Self {
        Self {
            config,
            body: body.into(),
            options,
        }
    }

    pub fn generate(
        &self,
        year: u32,
        prior: Option<&PriorState>,
    ) -> Result<YearTemplate, MultiError> {
        let index = self
            .config
            .year_index(year)
            .ok_or(MultiError::UnknownYear { year })?;
        let previous = prior.map_or(FIRST_YEAR_BASELINE, |p| p.year);

        let tokens = self.token_table(year, previous, prior)?;
        let mut text = substitute(&self.body, &tokens);

        text.push_str(&self.custom_costs(year));
        text.push_str(&self.exogenous_capacity(previous, year));
        let _ = write!(
            text,
            "\n#Discount rate for project\nparam all_tech_discount_rate := {};\n",
            format_param(self.config.discount_rate)
        );
        self.policy_params(index, prior, &mut text);

        Ok(YearTemplate { year, text })
    }

    fn token_table(
        &self,
        year: u32,
        previous: u32,
        prior: Option<&PriorState>,
    ) -> Result<Vec<(&'static str, String)>, MultiError> {
        let cfg = self.config;
        let per_zone = |category| cfg.techs_per_zone(category);
        let gen = per_zone(TechCategory::Generation);
        let stor = per_zone(TechCategory::Storage);
        let hyb = per_zone(TechCategory::Hybrid);
        let retire = per_zone(TechCategory::Retire);
        let fuel = per_zone(TechCategory::Fuel);

        let present = |category: TechCategory| {
            category
                .members()
                .iter()
                .filter(|t| cfg.all_tech.contains(t))
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        let catalogue = |category: TechCategory| join(category.members(), " ");
        let zone_list = |category| data_list(&per_zone(category));

        let carry_clause = match prior {
            Some(prior) => format!(
                "load '{}' : [zones,all_tech] {GEN_CAP_INITIAL} {STOR_CAP_INITIAL} \
                 {HYB_CAP_INITIAL};",
                prior.artifact.display()
            ),
            None => bootstrap_clause(&cfg.capacity_source, &gen, &stor, &hyb),
        };

        let mut tokens = vec![
            ("[regions]", join(&cfg.regions, " ")),
            ("[zones]", join(&cfg.zones, " ")),
            ("[alltech]", join(&cfg.all_tech, " ")),
            ("XXXX", year.to_string()),
            ("WWWW", previous.to_string()),
            ("[gentech]", data_list(&gen)),
            ("[gentechdb]", db_list(&gen)),
            ("[gentechlist]", present(TechCategory::Generation)),
            ("[stortech]", data_list(&stor)),
            ("[stortechdb]", db_list(&stor)),
            ("[stortechlist]", present(TechCategory::Storage)),
            ("[hybtech]", data_list(&hyb)),
            ("[hybtechdb]", db_list(&hyb)),
            ("[hybtechlist]", present(TechCategory::Hybrid)),
            ("[retiretech]", data_list(&retire)),
            ("[retiretechdb]", db_list(&retire)),
            ("[retiretechset]", catalogue(TechCategory::Retire)),
            ("[fueltech]", data_list(&fuel)),
            ("[fueltechdb]", db_list(&fuel)),
            ("[fueltechset]", catalogue(TechCategory::Fuel)),
            ("[committech]", zone_list(TechCategory::Commit)),
            ("[regentech]", zone_list(TechCategory::RenewableGen)),
            ("[dispgentech]", zone_list(TechCategory::DispatchableGen)),
            (
                "[redispgentech]",
                zone_list(TechCategory::RenewableDispatchableGen),
            ),
            ("[stortechset]", catalogue(TechCategory::Storage)),
            ("[hybtechset]", catalogue(TechCategory::Hybrid)),
            ("[nobuildset]", catalogue(TechCategory::NoBuild)),
            ("[carryforwardcap]", carry_clause),
            ("[timerange]", self.time_range(year)?),
        ];
        // longest first so no token can shadow a longer one sharing its prefix
        tokens.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(b.0)));
        Ok(tokens)
    }

    /// `BETWEEN '<start>' AND '<end>'` for the financial year ending in `year`.
    pub fn time_range(&self, year: u32) -> Result<String, MultiError> {
        let (start, end) = time_window(year, self.options.truncated_window)
            .ok_or(MultiError::UnknownYear { year })?;
        Ok(format!(
            "BETWEEN '{}' AND '{}'",
            start.format(TIMESTAMP_FORMAT),
            end.format(TIMESTAMP_FORMAT)
        ))
    }

    fn custom_costs(&self, year: u32) -> String {
        let mut out = String::from("\n");
        let Some(table) = &self.config.custom_costs else {
            return out;
        };
        let (techs, zones) = (&self.config.all_tech, &self.config.zones);
        for (category, shape) in CUSTOM_COST_CATEGORIES {
            let entries = table.entries(category, year, techs, zones);
            if entries.is_empty() {
                continue;
            }
            let rows = entries
                .iter()
                .map(|(row, value)| {
                    let value = format!("{value:10.2}");
                    match shape {
                        CostShape::Tech => vec![row.tech.to_string(), value],
                        CostShape::ZoneTech => {
                            vec![row.zone.to_string(), row.tech.to_string(), value]
                        }
                    }
                })
                .collect::<Vec<_>>();
            let _ = write!(
                out,
                "#Custom cost entry for {category}\nparam {category}:=\n{}\n;\n",
                align_rows(&rows)
            );
        }
        out
    }

    fn exogenous_capacity(&self, previous: u32, year: u32) -> String {
        let mut out = String::from("\n");
        let Some(table) = &self.config.exogenous_capacity else {
            return out;
        };
        let (techs, zones) = (&self.config.all_tech, &self.config.zones);
        for category in EXOGENOUS_CAPACITY_CATEGORIES {
            let entries = table.entries(category, previous, year, techs, zones);
            if entries.is_empty() {
                continue;
            }
            let rows = entries
                .iter()
                .map(|row| {
                    vec![
                        row.zone.to_string(),
                        row.tech.to_string(),
                        format_param(row.value),
                    ]
                })
                .collect::<Vec<_>>();
            let _ = write!(
                out,
                "#Exogenous capacity entry {category}\nparam {category}:=\n{}\n;\n",
                align_rows(&rows)
            );
        }
        out
    }

    /// Policy parameters for the year at `index`, selected by position.
    fn policy_params(&self, index: usize, prior: Option<&PriorState>, out: &mut String) {
        let policies = &self.config.policies;
        let at = |series: &Option<Vec<f64>>| {
            series
                .as_ref()
                .and_then(|values| values.get(index))
                .map(|v| format_param(*v))
        };

        if let Some(v) = at(&policies.cost_emit) {
            let _ = write!(out, "#Cost of emissions $/Mhw\nparam cost_emit:= {v};\n");
        }
        if let Some(prior) = prior {
            let _ = write!(
                out,
                "#Carry forward annualised capital costs\nload '{}' : {COST_CAP_CARRY_FORWARD};\n",
                prior.artifact.display()
            );
        }
        if let Some(v) = at(&policies.nem_ret_ratio) {
            let _ = write!(out, "\n # NEM wide RET\nparam nem_ret_ratio :={v};\n");
        }
        if let Some(v) = at(&policies.nem_ret_gwh) {
            let _ = write!(out, "\n # NEM wide RET\nparam nem_ret_gwh :={v};\n");
        }
        if let Some(regions) = &policies.region_ret_ratio {
            let pairs = regions
                .iter()
                .filter_map(|(region, values)| {
                    values
                        .get(index)
                        .map(|v| format!("{region} {}", format_param(*v)))
                })
                .collect::<Vec<_>>()
                .join(" ");
            let _ = write!(
                out,
                "\n #Regional based RET\nparam region_ret_ratio := {pairs};\n"
            );
        }
        if let Some(v) = at(&policies.emit_limit) {
            let _ = write!(
                out,
                "\n #NEM wide emission limit (in GT)\nparam nem_year_emit_limit := {v};\n"
            );
        }
        if let Some(v) = at(&policies.nem_disp_ratio) {
            let _ = write!(
                out,
                "\n #NEM wide minimum generation ratio from dispatchable tech\n\
                 param nem_disp_ratio := {v};\n"
            );
        }
        if let Some(v) = at(&policies.nem_re_disp_ratio) {
            let _ = write!(
                out,
                "\n #NEM wide minimum generation ratio from dispatchable tech\n\
                 param nem_re_disp_ratio := {v};\n"
            );
        }
    }
}

impl YearTemplate {
    pub fn write_to(&self, path: &Path) -> Result<(), MultiError> {
        fs::write(path, &self.text).map_err(|source| MultiError::Artifact {
            action: "writing template",
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Start and end of the dispatch window for the financial year ending in `year`.
pub fn time_window(year: u32, truncated: bool) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let year = i32::try_from(year).ok()?;
    let start = NaiveDate::from_ymd_opt(year - 1, 7, 1)?.and_hms_opt(0, 0, 0)?;
    let end = if truncated {
        NaiveDate::from_ymd_opt(year - 1, 7, 3)?
    } else {
        NaiveDate::from_ymd_opt(year, 6, 30)?
    }
    .and_hms_opt(23, 0, 0)?;
    Some((start, end))
}

/// Replace every token occurrence in one left-to-right pass. Expanded values
/// are copied to the output and never scanned again; unknown text is kept.
pub fn substitute(text: &str, tokens: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    'scan: while !rest.is_empty() {
        for (token, value) in tokens {
            if !token.is_empty() && rest.starts_with(token) {
                out.push_str(value);
                rest = &rest[token.len()..];
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(ch) = chars.next() {
            out.push(ch);
        }
        rest = chars.as_str();
    }
    out
}

fn join<T: ToString>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(sep)
}

/// One `zone tech` line per membership, for data command set blocks.
fn data_list(per_zone: &BTreeMap<ZoneId, Vec<TechId>>) -> String {
    let mut out = String::new();
    for (zone, techs) in per_zone {
        for tech in techs {
            let _ = writeln!(out, "{zone} {tech}");
        }
    }
    out
}

/// `((z, t), (z, t))` for SQL `IN` clauses. An empty membership becomes a
/// placeholder pair so the query stays syntactically valid.
fn db_list(per_zone: &BTreeMap<ZoneId, Vec<TechId>>) -> String {
    let pairs = per_zone
        .iter()
        .flat_map(|(zone, techs)| techs.iter().map(move |tech| format!("({zone}, {tech})")))
        .collect::<Vec<_>>();
    if pairs.is_empty() {
        return "((99, 99))".to_string();
    }
    format!("({})", pairs.join(", "))
}

fn bootstrap_clause(
    source: &str,
    gen: &BTreeMap<ZoneId, Vec<TechId>>,
    stor: &BTreeMap<ZoneId, Vec<TechId>>,
    hyb: &BTreeMap<ZoneId, Vec<TechId>>,
) -> String {
    let mut out = String::new();
    for (param, members) in [
        (GEN_CAP_INITIAL, gen),
        (STOR_CAP_INITIAL, stor),
        (HYB_CAP_INITIAL, hyb),
    ] {
        let _ = write!(
            out,
            "# operating capacity for all technologies and regions\n\
             load {source}\n\
             query=\"select ntndp_zone_id as zones, technology_type_id as all_tech, \
             sum(reg_cap) as {param}\n\
             from capacity\n\
             where (ntndp_zone_id,technology_type_id) in\n\
             {}\n\
             and commissioning_year is NULL\n\
             group by zones,all_tech;\" : [zones,all_tech] {param};\n\n",
            db_list(members)
        );
    }
    out
}

/// Right-align each column to its widest cell, one space between columns.
fn align_rows(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths = (0..columns)
        .map(|c| {
            rows.iter()
                .filter_map(|row| row.get(c))
                .map(String::len)
                .max()
                .unwrap_or(0)
        })
        .collect::<Vec<_>>();
    rows.iter()
        .map(|row| {
            row.iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:>width$}"))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
