use pcbmill_core::{ParamSet, ToolDbRecord, ToolTarget, ToolsDatabase, Units};
use pcbmill_settings::{Config, SettingsError};
use tempfile::TempDir;

fn custom_config() -> Config {
    let mut config = Config::new();
    config.generation.units = Units::In;
    config.generation.coord_decimals = 5;
    config.generation.workers = 4;
    config.defaults.cut_z = -0.08;
    config.defaults.preprocessor = "grbl_11".to_string();
    config
}

#[test]
fn test_toml_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    let config = custom_config();
    config.save_to_file(&path).unwrap();

    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_json_round_trip_creates_parent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.json");
    let config = custom_config();
    config.save_to_file(&path).unwrap();
    assert_eq!(Config::load_from_file(&path).unwrap(), config);
}

#[test]
fn test_partial_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[generation]\nfeed_decimals = 1\n").unwrap();

    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded.generation.feed_decimals, 1);
    assert_eq!(loaded.generation.coord_decimals, 4);
    assert_eq!(loaded.defaults, ParamSet::default());
}

#[test]
fn test_invalid_file_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"generation": {"steps_per_circle": 2}}"#).unwrap();
    assert!(matches!(
        Config::load_from_file(&path),
        Err(SettingsError::InvalidSetting { .. })
    ));

    std::fs::write(&path, "not json").unwrap();
    assert!(matches!(
        Config::load_from_file(&path),
        Err(SettingsError::JsonError(_))
    ));
}

#[test]
fn test_load_or_default_without_file() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_or_default(&dir.path().join("missing.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_tools_db_from_config() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("tools.json");
    let mut db = ToolsDatabase::new();
    db.add(ToolDbRecord {
        name: "V 30".to_string(),
        diameter: 0.2,
        tolerance: 0.01,
        tool_target: ToolTarget::Isolation,
        params: ParamSet::default(),
    });
    db.save_to_file(&db_path).unwrap();

    let mut config = Config::new();
    assert!(config.load_tools_db().unwrap().is_none());

    config.tools_db = Some(db_path);
    let loaded = config.load_tools_db().unwrap().unwrap();
    assert_eq!(loaded.len(), 1);

    config.tools_db = Some(dir.path().join("absent.json"));
    assert!(matches!(
        config.load_tools_db(),
        Err(SettingsError::ToolsDatabase(_))
    ));
}
