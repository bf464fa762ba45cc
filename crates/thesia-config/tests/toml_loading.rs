//! Integration tests for TOML configuration loading.
//!
//! Uses figment::Jail for safe, sandboxed env var manipulation.

use figment::{
    Figment, Jail,
    providers::{Env, Format, Serialized, Toml},
};
use pretty_assertions::assert_eq;
use thesia_config::ThesiaConfig;

#[test]
fn loads_database_config_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[database]
path = "/var/lib/thesia/thesia.db"
"#,
        )?;

        let config: ThesiaConfig = Figment::from(Serialized::defaults(ThesiaConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.database.path, "/var/lib/thesia/thesia.db");
        assert!(!config.database.is_memory());
        Ok(())
    });
}

#[test]
fn loads_full_config_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[database]
path = ":memory:"

[general]
default_limit = 50
"#,
        )?;

        let config: ThesiaConfig = Figment::from(Serialized::defaults(ThesiaConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert!(config.database.is_memory());
        assert_eq!(config.general.default_limit, 50);
        Ok(())
    });
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[general]
default_limit = 5
"#,
        )?;

        let config: ThesiaConfig = Figment::from(Serialized::defaults(ThesiaConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.database.path, ".thesia/thesia.db");
        assert_eq!(config.general.default_limit, 5);
        Ok(())
    });
}

#[test]
fn env_var_overrides_toml() {
    Jail::expect_with(|jail| {
        jail.set_env("THESIA_DATABASE__PATH", "/from-env.db");

        jail.create_file(
            "config.toml",
            r#"
[database]
path = "/from-toml.db"

[general]
default_limit = 7
"#,
        )?;

        let config: ThesiaConfig = Figment::from(Serialized::defaults(ThesiaConfig::default()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("THESIA_").split("__"))
            .extract()?;

        // Env should win over TOML
        assert_eq!(config.database.path, "/from-env.db");
        // TOML value not overridden by env should remain
        assert_eq!(config.general.default_limit, 7);
        Ok(())
    });
}

#[test]
fn env_var_overrides_default() {
    Jail::expect_with(|jail| {
        jail.set_env("THESIA_GENERAL__DEFAULT_LIMIT", "42");

        // No TOML file -- just defaults + env
        let config: ThesiaConfig = Figment::from(Serialized::defaults(ThesiaConfig::default()))
            .merge(Env::prefixed("THESIA_").split("__"))
            .extract()?;

        assert_eq!(config.general.default_limit, 42);
        Ok(())
    });
}

/// Documents the figment gotcha: typo'd env var keys are silently ignored.
/// The value stays at its default because figment doesn't know "pathh"
/// should be "path".
#[test]
fn typo_env_var_silently_ignored() {
    Jail::expect_with(|jail| {
        jail.set_env("THESIA_DATABASE__PATHH", "/typo.db");

        let config: ThesiaConfig = Figment::from(Serialized::defaults(ThesiaConfig::default()))
            .merge(Env::prefixed("THESIA_").split("__"))
            .extract()?;

        assert_eq!(
            config.database.path, ".thesia/thesia.db",
            "typo'd env var should be silently ignored by figment"
        );
        Ok(())
    });
}
