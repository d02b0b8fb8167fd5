//! Loading of the `--config` document.

use formulate::FormulateConfig;
use std::path::Path;

use super::{CliError, CliResult};

/// Read the configuration file, or the defaults when none is given.
///
/// Missing fields keep their default values.
pub fn load(path: Option<&Path>) -> CliResult<FormulateConfig> {
    let Some(path) = path else {
        return Ok(FormulateConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::Input(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&text)
        .map_err(|e| CliError::Input(format!("{}: invalid configuration: {}", path.display(), e)))
}
