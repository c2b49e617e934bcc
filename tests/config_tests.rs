use std::env;

use gaji_core::Config;
use serial_test::serial;

const CONFIG_VARS: [&str; 3] = ["DATABASE_URL", "ENVIRONMENT", "DEFAULT_TIMEZONE"];

fn snapshot_env() -> Vec<(&'static str, Option<String>)> {
    CONFIG_VARS
        .iter()
        .map(|key| (*key, env::var(key).ok()))
        .collect()
}

fn restore_env(saved: Vec<(&'static str, Option<String>)>) {
    for (key, value) in saved {
        unsafe {
            match value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

#[test]
#[serial]
fn test_config_defaults() {
    let saved = snapshot_env();
    for key in CONFIG_VARS {
        unsafe {
            env::remove_var(key);
        }
    }

    let config = Config::from_env_only().unwrap();

    assert_eq!(config.database_url, "sqlite:./gaji.db");
    assert_eq!(config.environment, "development");
    assert_eq!(config.default_timezone, "Asia/Kuala_Lumpur");
    assert!(config.is_development());
    assert!(!config.is_production());

    restore_env(saved);
}

#[test]
#[serial]
fn test_config_custom_values() {
    let saved = snapshot_env();
    unsafe {
        env::set_var("DATABASE_URL", "sqlite:./custom.db");
        env::set_var("ENVIRONMENT", "production");
        env::set_var("DEFAULT_TIMEZONE", "Asia/Singapore");
    }

    let config = Config::from_env_only().unwrap();

    assert_eq!(config.database_url, "sqlite:./custom.db");
    assert_eq!(config.environment, "production");
    assert_eq!(config.default_timezone, "Asia/Singapore");
    assert!(config.is_production());

    restore_env(saved);
}
