//! Working directory shared by the steps of a run.
//!
//! Every artifact is keyed by year and written once:
//!
//! | artifact            | file                    |
//! |---------------------|-------------------------|
//! | year template       | `Sim<year>.dat`         |
//! | carry-forward state | `gen_cap_op<year>.json` |
//! | year result         | `<year>.json`           |

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::carry::CarryForwardState;
use crate::error::MultiError;
use crate::report::YearResult;
use crate::template::{PriorState, YearTemplate};

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Use `root` as the working directory, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, MultiError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| MultiError::Artifact {
            action: "creating working directory",
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    /// Fresh uniquely named directory under the system temp dir.
    pub fn temporary() -> Result<Self, MultiError> {
        Self::open(std::env::temp_dir().join(format!("cem-{}", Uuid::new_v4())))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn template_path(&self, year: u32) -> PathBuf {
        self.root.join(format!("Sim{year}.dat"))
    }

    pub fn carry_forward_path(&self, year: u32) -> PathBuf {
        self.root.join(format!("gen_cap_op{year}.json"))
    }

    pub fn result_path(&self, year: u32) -> PathBuf {
        self.root.join(format!("{year}.json"))
    }

    /// Reference to the carry-forward artifact of `year`, which must exist.
    pub fn prior_state(&self, year: u32) -> Result<PriorState, MultiError> {
        let artifact = self.carry_forward_path(year);
        if !artifact.is_file() {
            return Err(MultiError::Artifact {
                action: "locating carry-forward",
                path: artifact,
                source: std::io::ErrorKind::NotFound.into(),
            });
        }
        Ok(PriorState { year, artifact })
    }

    pub fn write_template(&self, template: &YearTemplate) -> Result<PathBuf, MultiError> {
        let path = self.template_path(template.year);
        template.write_to(&path)?;
        Ok(path)
    }

    pub fn write_carry_forward(
        &self,
        year: u32,
        state: &CarryForwardState,
    ) -> Result<PathBuf, MultiError> {
        let path = self.carry_forward_path(year);
        write_json(&path, state)?;
        Ok(path)
    }

    pub fn write_result(&self, year: u32, result: &YearResult) -> Result<PathBuf, MultiError> {
        let path = self.result_path(year);
        write_json(&path, result)?;
        Ok(path)
    }

    pub fn read_result(&self, year: u32) -> Result<YearResult, MultiError> {
        let path = self.result_path(year);
        if !path.is_file() {
            return Err(MultiError::MissingResult { year, path });
        }
        let value: serde_json::Value = read_json(&path)?;
        YearResult::from_value(value)
            .map_err(|message| MultiError::MalformedResult { year, message })
    }
}

pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), MultiError> {
    let file = fs::File::create(path).map_err(|source| MultiError::Artifact {
        action: "creating",
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value).map_err(|source| MultiError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(|source| MultiError::Artifact {
        action: "writing",
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, MultiError> {
    let text = fs::read_to_string(path).map_err(|source| MultiError::Artifact {
        action: "reading",
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| MultiError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carry::Indexed;
    use cem_core::{TechId, ZoneId};
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn artifact_names_are_keyed_by_year() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        assert_eq!(store.template_path(2020), dir.path().join("Sim2020.dat"));
        assert_eq!(
            store.carry_forward_path(2020),
            dir.path().join("gen_cap_op2020.json")
        );
        assert_eq!(store.result_path(2020), dir.path().join("2020.json"));
    }

    #[test]
    fn carry_forward_survives_disk() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path().join("work")).unwrap();
        assert!(store.prior_state(2020).is_err());

        let state = CarryForwardState {
            gen_cap_initial: vec![Indexed::new((ZoneId::new(2), TechId::new(8)), 725.0)],
            cost_cap_carry_forward: vec![Indexed::new(ZoneId::new(2), 3.2e7)],
            ..CarryForwardState::default()
        };
        store.write_carry_forward(2020, &state).unwrap();
        let stored: CarryForwardState = read_json(&store.carry_forward_path(2020)).unwrap();
        assert_eq!(stored, state);
        assert_eq!(
            store.prior_state(2020).unwrap().artifact,
            store.carry_forward_path(2020)
        );
    }

    #[test]
    fn results_must_exist_and_be_well_formed() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.read_result(2030),
            Err(MultiError::MissingResult { year: 2030, .. })
        ));

        fs::write(store.result_path(2030), json!({"sets": {}}).to_string()).unwrap();
        assert!(matches!(
            store.read_result(2030),
            Err(MultiError::MalformedResult { year: 2030, .. })
        ));
    }

    #[test]
    fn temporary_dirs_are_distinct() {
        let a = ArtifactStore::temporary().unwrap();
        let b = ArtifactStore::temporary().unwrap();
        assert_ne!(a.root(), b.root());
        fs::remove_dir_all(a.root()).unwrap();
        fs::remove_dir_all(b.root()).unwrap();
    }
}
