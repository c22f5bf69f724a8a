use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};

/// Top-level botflow configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

/// Execution engine limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum synchronous passes through the same node between user inputs.
    #[serde(default = "default_cycle_limit")]
    pub cycle_limit: usize,
    /// Timeout for actions that call external collaborators (AI, records).
    #[serde(default = "default_action_timeout")]
    pub action_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cycle_limit: default_cycle_limit(),
            action_timeout_secs: default_action_timeout(),
        }
    }
}

/// Input and label vocabularies for branch routing.
///
/// Inputs are matched against the normalized (trimmed, lowercased) user text;
/// markers are matched as substrings of target node labels. Defaults cover
/// the Spanish/English yes-no patterns the flow editor produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default = "default_affirmative_inputs")]
    pub affirmative_inputs: Vec<String>,
    #[serde(default = "default_negative_inputs")]
    pub negative_inputs: Vec<String>,
    #[serde(default = "default_affirmative_markers")]
    pub affirmative_markers: Vec<String>,
    #[serde(default = "default_negative_markers")]
    pub negative_markers: Vec<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            affirmative_inputs: default_affirmative_inputs(),
            negative_inputs: default_negative_inputs(),
            affirmative_markers: default_affirmative_markers(),
            negative_markers: default_negative_markers(),
        }
    }
}

/// Fixed transcript strings used by the simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_greeting")]
    pub greeting: String,
    #[serde(default = "default_completion_message")]
    pub completion_message: String,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            completion_message: default_completion_message(),
        }
    }
}

fn default_cycle_limit() -> usize {
    3
}

fn default_action_timeout() -> u64 {
    30
}

fn default_affirmative_inputs() -> Vec<String> {
    vec!["sí".into(), "si".into(), "yes".into(), "1".into()]
}

fn default_negative_inputs() -> Vec<String> {
    vec!["no".into(), "2".into()]
}

fn default_affirmative_markers() -> Vec<String> {
    vec!["sí".into(), "yes".into(), "positivo".into()]
}

fn default_negative_markers() -> Vec<String> {
    vec!["no".into(), "negativo".into()]
}

fn default_greeting() -> String {
    "¡Hola! Soy tu asistente virtual. ¿En qué puedo ayudarte?".to_string()
}

fn default_completion_message() -> String {
    "Flujo completado. ¡Gracias por usar el bot!".to_string()
}

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| FlowError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        toml::from_str(&expanded).map_err(|e| FlowError::Config(e.to_string()))
    }

    /// Load config from a file if it exists, otherwise use defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("TEST_BOTFLOW_VAR", "hello");
        let result = expand_env_vars("key = \"${TEST_BOTFLOW_VAR}\"");
        assert_eq!(result, "key = \"hello\"");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("key = \"${NONEXISTENT_BOTFLOW_VAR}\"");
        assert_eq!(result, "key = \"${NONEXISTENT_BOTFLOW_VAR}\"");
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.engine.cycle_limit, 3);
        assert_eq!(config.engine.action_timeout_secs, 30);
        assert!(config.routing.affirmative_inputs.contains(&"sí".to_string()));
        assert!(config.routing.negative_markers.contains(&"negativo".to_string()));
        assert!(config.simulator.greeting.contains("asistente virtual"));
    }

    #[test]
    fn test_partial_toml() {
        let toml_str = r#"
[engine]
cycle_limit = 5
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.cycle_limit, 5);
        assert_eq!(config.engine.action_timeout_secs, 30);
        assert!(!config.simulator.completion_message.is_empty());
    }

    #[test]
    fn test_routing_overrides() {
        let toml_str = r#"
[routing]
affirmative_inputs = ["ok"]
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.routing.affirmative_inputs, vec!["ok"]);
        // Untouched sections keep their defaults
        assert_eq!(config.routing.negative_inputs, vec!["no", "2"]);
    }
}
