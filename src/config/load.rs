use super::{default_global_config_path, ConfigError, Settings};
use std::path::Path;

pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
    let settings = match explicit {
        Some(path) => Settings::from_path(path)?,
        None => {
            let path = default_global_config_path()?;
            if path.exists() {
                Settings::from_path(&path)?
            } else {
                Settings::default()
            }
        }
    };
    settings.validate()?;
    Ok(settings)
}
