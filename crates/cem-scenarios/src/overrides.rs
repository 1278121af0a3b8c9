//! Custom-cost and exogenous-capacity override tables.
//!
//! Both tables are plain CSV with a header row. They are read once while
//! the scenario is loaded; template generation then filters the parsed
//! rows per year, and the final report embeds them verbatim.
//!
//! ```text
//! name,tech,zone,2020,2025          name,tech,zone,year,value
//! cost_gen_build,14,5,1800,1650     gen_cap_exo,14,5,2021,300
//! cost_gen_fom,2,1,12.5,            ret_gen_cap_exo,4,6,2022,660
//! ```
//!
//! A blank cell in a custom-cost year column means "no override for that
//! year" and the row is skipped for it. Row names must be one of the known
//! categories below.

use cem_core::{TechId, ZoneId};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Row shape of a custom-cost parameter in the data command file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostShape {
    /// `tech value`
    Tech,
    /// `zone tech value`
    ZoneTech,
}

/// Custom-cost parameters that may be overridden, in emission order.
pub const CUSTOM_COST_CATEGORIES: &[(&str, CostShape)] = &[
    ("cost_gen_build", CostShape::ZoneTech),
    ("cost_hyb_build", CostShape::ZoneTech),
    ("cost_stor_build", CostShape::ZoneTech),
    ("cost_fuel", CostShape::ZoneTech),
    ("cost_gen_fom", CostShape::Tech),
    ("cost_gen_vom", CostShape::Tech),
    ("cost_hyb_fom", CostShape::Tech),
    ("cost_hyb_vom", CostShape::Tech),
    ("cost_stor_fom", CostShape::Tech),
    ("cost_stor_vom", CostShape::Tech),
];

/// Exogenous capacity parameters, in emission order. All are zone,tech keyed.
pub const EXOGENOUS_CAPACITY_CATEGORIES: &[&str] = &[
    "gen_cap_exo",
    "stor_cap_exo",
    "hyb_cap_exo",
    "ret_gen_cap_exo",
];

#[derive(Debug, Clone, PartialEq)]
pub struct CustomCostRow {
    pub name: String,
    pub tech: TechId,
    pub zone: ZoneId,
    /// Year column header -> value (`None` for a blank cell).
    pub values: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomCostTable {
    pub path: PathBuf,
    /// Year column headers in file order.
    pub year_columns: Vec<String>,
    pub rows: Vec<CustomCostRow>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExogenousCapacityRow {
    pub name: String,
    pub tech: TechId,
    pub zone: ZoneId,
    pub year: u32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExogenousCapacityTable {
    pub path: PathBuf,
    pub rows: Vec<ExogenousCapacityRow>,
}

fn table_error(path: &Path, message: impl Into<String>) -> ConfigError {
    ConfigError::Table {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn open_table(path: &Path, what: &'static str) -> Result<csv::Reader<std::fs::File>, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound {
            what,
            path: path.to_path_buf(),
        });
    }
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|err| table_error(path, err.to_string()))
}

impl CustomCostTable {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut reader = open_table(path, "custom costs file")?;
        let headers = reader
            .headers()
            .map_err(|err| table_error(path, format!("reading header: {err}")))?
            .clone();

        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| table_error(path, format!("missing column '{name}'")))
        };
        let name_col = column("name")?;
        let tech_col = column("tech")?;
        let zone_col = column("zone")?;

        let mut year_columns = Vec::new();
        for (idx, header) in headers.iter().enumerate() {
            if idx == name_col || idx == tech_col || idx == zone_col {
                continue;
            }
            if header.parse::<u32>().is_err() {
                return Err(table_error(
                    path,
                    format!("unexpected column '{header}'; expected a year"),
                ));
            }
            year_columns.push((idx, header.to_string()));
        }

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|err| table_error(path, err.to_string()))?;
            // header is line 1
            let line = line + 2;
            let field = |idx: usize| record.get(idx).unwrap_or("");
            let name = field(name_col);
            if !CUSTOM_COST_CATEGORIES.iter().any(|(known, _)| *known == name) {
                let message = format!("line {line}: unknown cost category '{name}'");
                return Err(table_error(path, message));
            }
            let tech = field(tech_col)
                .parse::<TechId>()
                .map_err(|err| table_error(path, format!("line {line}: tech: {err}")))?;
            let zone = field(zone_col)
                .parse::<ZoneId>()
                .map_err(|err| table_error(path, format!("line {line}: zone: {err}")))?;
            let mut values = BTreeMap::new();
            for (idx, header) in &year_columns {
                let raw = field(*idx);
                let value = if raw.is_empty() {
                    None
                } else {
                    Some(raw.parse::<f64>().map_err(|err| {
                        table_error(path, format!("line {line}: column {header}: {err}"))
                    })?)
                };
                values.insert(header.clone(), value);
            }
            rows.push(CustomCostRow {
                name: name.to_string(),
                tech,
                zone,
                values,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            year_columns: year_columns.into_iter().map(|(_, h)| h).collect(),
            rows,
        })
    }

    /// Rows of `category` with a value for `year` whose tech and zone are active.
    pub fn entries<'a>(
        &'a self,
        category: &str,
        year: u32,
        techs: &[TechId],
        zones: &[ZoneId],
    ) -> Vec<(&'a CustomCostRow, f64)> {
        let key = year.to_string();
        self.rows
            .iter()
            .filter(|row| {
                row.name == category && techs.contains(&row.tech) && zones.contains(&row.zone)
            })
            .filter_map(|row| row.values.get(&key).copied().flatten().map(|v| (row, v)))
            .collect()
    }

    /// One JSON object per row: `name`, `tech`, `zone`, then every year column.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut record = Map::new();
                record.insert("name".into(), Value::from(row.name.clone()));
                record.insert("tech".into(), Value::from(row.tech.value()));
                record.insert("zone".into(), Value::from(row.zone.value()));
                for column in &self.year_columns {
                    let value = row
                        .values
                        .get(column)
                        .copied()
                        .flatten()
                        .map(Value::from)
                        .unwrap_or(Value::Null);
                    record.insert(column.clone(), value);
                }
                Value::Object(record)
            })
            .collect()
    }
}

impl ExogenousCapacityTable {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut reader = open_table(path, "exogenous capacity file")?;
        let mut rows = Vec::new();
        for (idx, row) in reader.deserialize::<ExogenousCapacityRow>().enumerate() {
            let line = idx + 2;
            let row = row.map_err(|err| table_error(path, format!("line {line}: {err}")))?;
            if !EXOGENOUS_CAPACITY_CATEGORIES.contains(&row.name.as_str()) {
                let message = format!("line {line}: unknown capacity category '{}'", row.name);
                return Err(table_error(path, message));
            }
            rows.push(row);
        }
        Ok(Self {
            path: path.to_path_buf(),
            rows,
        })
    }

    /// Rows of `category` with `after < year <= up_to` whose tech and zone are active.
    pub fn entries<'a>(
        &'a self,
        category: &str,
        after: u32,
        up_to: u32,
        techs: &[TechId],
        zones: &[ZoneId],
    ) -> Vec<&'a ExogenousCapacityRow> {
        self.rows
            .iter()
            .filter(|row| {
                row.name == category
                    && row.year > after
                    && row.year <= up_to
                    && techs.contains(&row.tech)
                    && zones.contains(&row.zone)
            })
            .collect()
    }

    /// One JSON object per row, keyed by the table's columns.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut record = Map::new();
                record.insert("name".into(), Value::from(row.name.clone()));
                record.insert("tech".into(), Value::from(row.tech.value()));
                record.insert("zone".into(), Value::from(row.zone.value()));
                record.insert("year".into(), Value::from(row.year));
                record.insert("value".into(), Value::from(row.value));
                Value::Object(record)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn custom_costs_skip_blank_cells_and_inactive_ids() {
        let file = write_csv(
            "name, tech, zone, 2020, 2025\n\
             cost_gen_build, 14, 5, 1800, 1650\n\
             cost_gen_build, 2, 5, , 900\n\
             cost_gen_build, 14, 9, 1700, 1600\n",
        );
        let table = CustomCostTable::load(file.path()).unwrap();
        assert_eq!(table.year_columns, vec!["2020", "2025"]);

        let techs = [TechId::new(2), TechId::new(14)];
        let zones = [ZoneId::new(5)];
        let rows = table.entries("cost_gen_build", 2020, &techs, &zones);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1, 1800.0);
        assert_eq!(
            table.entries("cost_gen_build", 2025, &techs, &zones).len(),
            2
        );
        assert!(table.entries("cost_fuel", 2020, &techs, &zones).is_empty());
    }

    #[test]
    fn custom_costs_reject_bad_columns() {
        let file = write_csv("name,tech,zone,notes\ncost_fuel,2,1,x\n");
        let err = CustomCostTable::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Table { .. }));
        assert!(err.to_string().contains("notes"));

        let file = write_csv("name,tech,2020\ncost_fuel,2,1\n");
        let err = CustomCostTable::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("zone"));
    }

    #[test]
    fn custom_costs_reject_unknown_categories() {
        let file = write_csv("name,tech,zone,2020\ncost_fuel,2,1,3.5\ncost_gen_biuld,2,1,900\n");
        let err = CustomCostTable::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Table { .. }));
        let text = err.to_string();
        assert!(text.contains("line 3"));
        assert!(text.contains("cost_gen_biuld"));
    }

    #[test]
    fn custom_cost_records_keep_nulls() {
        let file = write_csv("name,tech,zone,2020\ncost_gen_fom,8,1,\n");
        let table = CustomCostTable::load(file.path()).unwrap();
        let records = table.to_records();
        assert_eq!(records[0]["tech"], 8);
        assert!(records[0]["2020"].is_null());
    }

    #[test]
    fn exogenous_window_is_half_open() {
        let file = write_csv(
            "name,tech,zone,year,value\n\
             gen_cap_exo,14,5,2020,100\n\
             gen_cap_exo,14,5,2021,200\n\
             gen_cap_exo,14,5,2022,300\n\
             stor_cap_exo,17,5,2022,50\n",
        );
        let table = ExogenousCapacityTable::load(file.path()).unwrap();
        let techs = [TechId::new(14), TechId::new(17)];
        let zones = [ZoneId::new(5)];
        let rows = table.entries("gen_cap_exo", 2020, 2022, &techs, &zones);
        let years: Vec<u32> = rows.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2021, 2022]);
    }

    #[test]
    fn exogenous_records_keep_every_row() {
        let file = write_csv(
            "name,tech,zone,year,value\n\
             gen_cap_exo,14,5,2021,300\n\
             ret_gen_cap_exo,4,6,2022,NaN\n",
        );
        let table = ExogenousCapacityTable::load(file.path()).unwrap();
        let records = table.to_records();
        assert_eq!(records.len(), 2);
        let first = serde_json::json!({
            "name": "gen_cap_exo", "tech": 14, "zone": 5, "year": 2021, "value": 300.0
        });
        assert_eq!(records[0], first);
        assert_eq!(records[1]["name"], "ret_gen_cap_exo");
        assert_eq!(records[1]["year"], 2022);
        assert!(records[1]["value"].is_null());
    }

    #[test]
    fn exogenous_rejects_unknown_categories() {
        let file = write_csv("name,tech,zone,year,value\ngen_cap_new,14,5,2021,300\n");
        let err = ExogenousCapacityTable::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(err.to_string().contains("gen_cap_new"));
    }

    #[test]
    fn exogenous_rejects_non_numeric_values() {
        let file = write_csv("name,tech,zone,year,value\ngen_cap_exo,14,5,2021,lots\n");
        let err = ExogenousCapacityTable::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn missing_table_is_not_found() {
        let err = ExogenousCapacityTable::load(Path::new("/nonexistent/exo.csv")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }
}
