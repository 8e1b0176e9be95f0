use dealsim_core::settings::EngineSettings;

use super::file;

/// Engine settings from `--config`, defaults when absent.
///
/// Missing keys fall back to their defaults, so a config file only needs the
/// values it overrides.
pub fn load_settings(path: Option<&str>) -> Result<EngineSettings, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let settings: EngineSettings = file::read_document(path)?;
            tracing::debug!(path, steps = settings.sensitivity.steps.len(), "loaded settings");
            Ok(settings)
        }
        None => Ok(EngineSettings::default()),
    }
}
