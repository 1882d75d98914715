//! Configuration validation.

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, SkilletConfig};
use skillet_framework::SkillOptions;

/// Validates the entire configuration.
pub fn validate_config(config: &SkilletConfig) -> ConfigResult<()> {
    validate_skill(&config.skill)?;
    validate_logging(&config.logging)?;
    Ok(())
}

/// An absent skill id is allowed here; the mediator rejects every request in
/// that case. A present but blank id is almost certainly a mistake.
fn validate_skill(skill: &SkillOptions) -> ConfigResult<()> {
    if let Some(skill_id) = &skill.skill_id
        && skill_id.trim().is_empty()
    {
        return Err(ConfigError::validation("skill.skill_id must not be blank"));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File {
        let Some(path) = &logging.file_path else {
            return Err(ConfigError::missing_field("logging.file_path"));
        };
        if path.file_name().is_none() {
            return Err(ConfigError::validation(format!(
                "logging.file_path must name a file: {}",
                path.display()
            )));
        }
    }

    for module in logging.filters.keys() {
        if module.trim().is_empty() {
            return Err(ConfigError::validation(
                "logging.filters keys must not be blank",
            ));
        }
    }

    Ok(())
}
