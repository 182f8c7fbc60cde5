// Integration tests for configuration loading and validation

use match_analysis::{AnalysisConfig, ConfigError, JobOptions, JobSpec};
use std::fs;
use tempfile::TempDir;

fn create_test_config() -> AnalysisConfig {
    let mut config = AnalysisConfig::default();
    config.analysis.trim_outliers = true;
    config.jobs.push(JobSpec {
        base: "wbtc".to_string(),
        quote: "weth".to_string(),
        options: vec![JobOptions::continuous().with_min_delta(0.001)],
    });
    config
}

#[test]
fn test_config_serialization_deserialization() {
    let config = create_test_config();

    let toml_string = toml::to_string(&config).expect("Failed to serialize config");
    assert!(toml_string.contains("reference_tolerance_secs"));
    assert!(toml_string.contains("wbtc"));

    let deserialized: AnalysisConfig = toml::from_str(&toml_string).expect("Failed to deserialize config");
    assert_eq!(deserialized, config);
}

#[test]
fn test_config_file_loading() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("analysis.toml");

    fs::write(
        &config_path,
        r#"
[analysis]
chain = "arbitrum"
reference_tolerance_secs = 600

[logging]
level = "debug"

[[jobs]]
base = "arb"
quote = "usdc"
options = [{ time_limit = 300 }, { time_limit = 300, batch_duration = 12 }]
"#,
    )
    .expect("Failed to write config file");

    let loaded = AnalysisConfig::from_file(&config_path).expect("Failed to load config");
    assert_eq!(loaded.analysis.reference_tolerance_secs, 600);
    assert_eq!(loaded.analysis.epsilon, 1e-9);
    assert!(!loaded.analysis.trim_outliers);
    assert_eq!(loaded.jobs[0].options.len(), 2);
    assert_eq!(loaded.jobs[0].options[1].batch_duration, 12);
    assert_eq!(loaded.jobs[0].options[0].min_delta, None);

    let registry = loaded.registry().unwrap();
    let (base, _) = loaded.jobs[0].resolve(registry.as_ref()).unwrap();
    assert_eq!(base, "0x912ce59144191c1204e64559fe8253a0e49e6548");
}

#[test]
fn test_load_or_create_writes_default() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("new.toml");
    assert!(!config_path.exists());

    let created = AnalysisConfig::load_or_create(&config_path).expect("Failed to create config");
    assert!(config_path.exists());

    let reloaded = AnalysisConfig::load_or_create(&config_path).expect("Failed to reload config");
    assert_eq!(created, reloaded);
}

#[test]
fn test_invalid_config_rejected_on_load() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("bad.toml");

    fs::write(
        &config_path,
        "[analysis]\n\n[[jobs]]\nbase = \"weth\"\nquote = \"usdc\"\noptions = []\n",
    )
    .unwrap();
    assert!(matches!(
        AnalysisConfig::from_file(&config_path),
        Err(ConfigError::Validation(_))
    ));

    fs::write(&config_path, "[analysis\n").unwrap();
    assert!(matches!(
        AnalysisConfig::from_file(&config_path),
        Err(ConfigError::Parse(_))
    ));

    assert!(matches!(
        AnalysisConfig::from_file(temp_dir.path().join("missing.toml")),
        Err(ConfigError::FileRead(_))
    ));
}

#[test]
fn test_unknown_chain_surfaces_on_registry() {
    let mut config = AnalysisConfig::default();
    config.analysis.chain = Some("solana".to_string());
    assert!(config.validate().is_ok());
    assert!(config.registry().is_err());
}
