use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use dealsim_core::deal::inputs::InvestmentInputs;
use dealsim_core::storage::{validate_scenario_id, ScenarioStore};
use dealsim_core::{DealSimError, DealSimResult};

/// Scenarios stored as pretty-printed `<id>.json` files in one directory.
pub struct FileScenarioStore {
    root: PathBuf,
}

impl FileScenarioStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, id: &str) -> DealSimResult<PathBuf> {
        validate_scenario_id(id)?;
        Ok(self.root.join(format!("{id}.json")))
    }
}

fn storage_error(context: &str, e: std::io::Error) -> DealSimError {
    DealSimError::Storage(format!("{context}: {e}"))
}

impl ScenarioStore for FileScenarioStore {
    fn save(&mut self, id: &str, inputs: &InvestmentInputs) -> DealSimResult<()> {
        let path = self.path_for(id)?;
        fs::create_dir_all(&self.root)
            .map_err(|e| storage_error(&format!("create {}", self.root.display()), e))?;
        let body = serde_json::to_string_pretty(inputs)?;
        fs::write(&path, body).map_err(|e| storage_error(&format!("write {}", path.display()), e))?;
        tracing::debug!(id, path = %path.display(), "scenario saved");
        Ok(())
    }

    fn load(&self, id: &str) -> DealSimResult<InvestmentInputs> {
        let path = self.path_for(id)?;
        let body = match fs::read_to_string(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DealSimError::ScenarioNotFound(id.to_string()))
            }
            Err(e) => return Err(storage_error(&format!("read {}", path.display()), e)),
        };
        Ok(serde_json::from_str(&body)?)
    }

    fn delete(&mut self, id: &str) -> DealSimResult<()> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(DealSimError::ScenarioNotFound(id.to_string()))
            }
            Err(e) => Err(storage_error(&format!("delete {}", path.display()), e)),
        }
    }

    fn list(&self) -> DealSimResult<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_error(&format!("list {}", self.root.display()), e)),
        };

        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .filter(|id| validate_scenario_id(id).is_ok())
            .collect();
        ids.sort();
        Ok(ids)
    }
}
