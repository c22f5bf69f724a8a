use std::io::Write;

use botflow_core::config::AppConfig;

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[engine]
cycle_limit = 5
action_timeout_secs = 10

[routing]
affirmative_inputs = ["sí", "si", "claro"]
negative_inputs = ["no", "nunca"]
affirmative_markers = ["sí"]
negative_markers = ["no"]

[simulator]
greeting = "Bienvenido al bot de pruebas"
completion_message = "Hasta pronto"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.engine.cycle_limit, 5);
    assert_eq!(config.engine.action_timeout_secs, 10);
    assert_eq!(config.routing.affirmative_inputs, vec!["sí", "si", "claro"]);
    assert_eq!(config.routing.negative_inputs, vec!["no", "nunca"]);
    assert_eq!(config.simulator.greeting, "Bienvenido al bot de pruebas");
    assert_eq!(config.simulator.completion_message, "Hasta pronto");
}

#[test]
fn test_env_var_expansion_in_config() {
    std::env::set_var("BOTFLOW_TEST_GREETING", "Hola desde el entorno");

    let toml_content = r#"
[simulator]
greeting = "${BOTFLOW_TEST_GREETING}"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.simulator.greeting, "Hola desde el entorno");

    std::env::remove_var("BOTFLOW_TEST_GREETING");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let toml_content = r#"
[engine]
cycle_limit = 2
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.engine.cycle_limit, 2);
    // Everything else falls back to defaults
    assert_eq!(config.engine.action_timeout_secs, 30);
    assert!(config
        .routing
        .affirmative_inputs
        .contains(&"sí".to_string()));
    assert!(config.simulator.greeting.contains("asistente virtual"));
    assert!(config
        .simulator
        .completion_message
        .contains("Flujo completado"));
}

#[test]
fn test_missing_file_is_an_error() {
    let err = AppConfig::load(std::path::Path::new("/nonexistent/botflow.toml")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/botflow.toml"));
}

#[test]
fn test_load_or_default_without_file() {
    let config = AppConfig::load_or_default(std::path::Path::new("/nonexistent/botflow.toml"))
        .expect("defaults");
    assert_eq!(config.engine.cycle_limit, 3);
}
