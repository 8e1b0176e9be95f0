use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use dealsim_core::scenarios::sensitivity::{sensitivity_report, SensitivityAxis};
use dealsim_core::settings::EngineSettings;
use dealsim_core::storage::ScenarioStore;

use super::{checked_deal_inputs, read_deal_inputs, reshape_envelope};
use crate::store::FileScenarioStore;

/// Arguments for sensitivity analysis
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to deal inputs (JSON or YAML); stdin when omitted
    #[arg(long)]
    pub input: Option<String>,

    /// Relative perturbations (comma-separated, e.g. "-0.1,-0.05,0,0.05,0.1")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub steps: Option<Vec<Decimal>>,

    /// Emit one table only: rent, exit_cap_rate or renovation_budget
    #[arg(long)]
    pub table: Option<String>,

    /// Run scenarios on the current thread
    #[arg(long)]
    pub sequential: bool,
}

fn parse_axis(s: &str) -> Result<SensitivityAxis, Box<dyn std::error::Error>> {
    serde_json::from_value(Value::String(s.to_string())).map_err(|_| {
        format!(
            "Unknown sensitivity table '{}'; expected rent, exit_cap_rate or renovation_budget",
            s
        )
        .into()
    })
}

pub fn run_sensitivity(args: SensitivityArgs, settings: &EngineSettings) -> Result<Value, Box<dyn std::error::Error>> {
    let (inputs, validation_warnings) = checked_deal_inputs(args.input.as_deref(), settings)?;

    let mut sensitivity = settings.sensitivity.clone();
    if let Some(steps) = args.steps {
        sensitivity.steps = steps;
    }
    if args.sequential {
        sensitivity.parallel = false;
    }

    let output = sensitivity_report(&inputs, &sensitivity)?;
    let result = match args.table.as_deref() {
        Some(name) => {
            let axis = parse_axis(name)?;
            let table = output
                .result
                .tables
                .iter()
                .find(|t| t.axis == axis)
                .ok_or_else(|| format!("No {} table in the report", axis.name()))?;
            serde_json::to_value(&table.rows)?
        }
        None => serde_json::to_value(&output.result)?,
    };

    Ok(reshape_envelope(
        serde_json::to_value(&output)?,
        result,
        validation_warnings,
    ))
}

/// Arguments for the scenario store
#[derive(Args)]
pub struct ScenarioArgs {
    #[command(subcommand)]
    pub command: ScenarioCommand,

    /// Directory holding saved scenarios
    #[arg(long, default_value = ".dealsim/scenarios", global = true)]
    pub store_dir: String,
}

#[derive(Subcommand)]
pub enum ScenarioCommand {
    /// Save deal inputs under an id (overwrites)
    Save {
        id: String,
        /// Path to deal inputs (JSON or YAML); stdin when omitted
        #[arg(long)]
        input: Option<String>,
    },
    /// Print the saved inputs for an id
    Load { id: String },
    /// Remove a saved scenario
    Delete { id: String },
    /// List saved scenario ids
    List,
}

pub fn run_scenario(args: ScenarioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut store = FileScenarioStore::new(&args.store_dir);
    execute(&mut store, args.command)
}

fn execute(store: &mut impl ScenarioStore, command: ScenarioCommand) -> Result<Value, Box<dyn std::error::Error>> {
    match command {
        ScenarioCommand::Save { id, input } => {
            let inputs = read_deal_inputs(input.as_deref())?;
            store.save(&id, &inputs)?;
            Ok(json!({ "saved": id }))
        }
        ScenarioCommand::Load { id } => Ok(serde_json::to_value(store.load(&id)?)?),
        ScenarioCommand::Delete { id } => {
            store.delete(&id)?;
            Ok(json!({ "deleted": id }))
        }
        ScenarioCommand::List => Ok(json!({ "scenarios": store.list()? })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealsim_core::storage::InMemoryScenarioStore;

    #[test]
    fn test_axis_names() {
        assert_eq!(parse_axis("exit_cap_rate").unwrap(), SensitivityAxis::ExitCapRate);
        assert!(parse_axis("taxes").is_err());
    }

    #[test]
    fn test_list_and_delete_through_the_port() {
        let mut store = InMemoryScenarioStore::new();
        let listed = execute(&mut store, ScenarioCommand::List).unwrap();
        assert_eq!(listed, json!({ "scenarios": [] }));

        let missing = execute(&mut store, ScenarioCommand::Delete { id: "ghost".into() });
        assert!(missing.unwrap_err().to_string().contains("ghost"));
    }
}
