use std::collections::BTreeMap;

use crate::deal::inputs::InvestmentInputs;
use crate::error::DealSimError;
use crate::DealSimResult;

/// Persistence port for saved deal inputs, keyed by scenario id.
///
/// The engine never calls this itself; front ends inject an implementation.
pub trait ScenarioStore {
    fn save(&mut self, id: &str, inputs: &InvestmentInputs) -> DealSimResult<()>;
    fn load(&self, id: &str) -> DealSimResult<InvestmentInputs>;
    fn delete(&mut self, id: &str) -> DealSimResult<()>;
    /// Stored ids in ascending order.
    fn list(&self) -> DealSimResult<Vec<String>>;
}

/// Ids are 1-64 ASCII letters, digits, `-` or `_`.
pub fn validate_scenario_id(id: &str) -> DealSimResult<()> {
    let valid = !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(DealSimError::InvalidInput {
            field: "scenario_id".into(),
            reason: format!("'{id}' must be 1-64 characters of [A-Za-z0-9_-]"),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryScenarioStore {
    scenarios: BTreeMap<String, InvestmentInputs>,
}

impl InMemoryScenarioStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScenarioStore for InMemoryScenarioStore {
    fn save(&mut self, id: &str, inputs: &InvestmentInputs) -> DealSimResult<()> {
        validate_scenario_id(id)?;
        self.scenarios.insert(id.to_string(), inputs.clone());
        Ok(())
    }

    fn load(&self, id: &str) -> DealSimResult<InvestmentInputs> {
        self.scenarios
            .get(id)
            .cloned()
            .ok_or_else(|| DealSimError::ScenarioNotFound(id.to_string()))
    }

    fn delete(&mut self, id: &str) -> DealSimResult<()> {
        self.scenarios
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DealSimError::ScenarioNotFound(id.to_string()))
    }

    fn list(&self) -> DealSimResult<Vec<String>> {
        Ok(self.scenarios.keys().cloned().collect())
    }
}
