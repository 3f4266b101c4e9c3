use config::{Config, ConfigError, Environment, File};
use quadrant_node::RetrieverConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    pub share_size: usize,
    #[serde(with = "humantime_serde")]
    pub deadline: Duration,
    pub max_concurrent_rows: usize,
    pub verify_digests: bool,
    pub cache_capacity: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            share_size: quadrant_codec::SHARE_SIZE,
            deadline: Duration::from_secs(30),
            max_concurrent_rows: 8,
            verify_digests: true,
            cache_capacity: 4096,
        }
    }
}

impl CliConfig {
    /// Layers defaults, an optional TOML file and `QUADRANT_*` variables.
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("data_dir", defaults.data_dir.display().to_string())?
            .set_default("share_size", defaults.share_size as u64)?
            .set_default("deadline", "30s")?
            .set_default("max_concurrent_rows", defaults.max_concurrent_rows as u64)?
            .set_default("verify_digests", defaults.verify_digests)?
            .set_default("cache_capacity", defaults.cache_capacity as u64)?;

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(Environment::with_prefix("QUADRANT").try_parsing(true));

        builder.build()?.try_deserialize()
    }

    pub fn retriever_config(&self) -> RetrieverConfig {
        RetrieverConfig {
            deadline: Some(self.deadline),
            max_concurrent_rows: self.max_concurrent_rows,
            verify_digests: self.verify_digests,
        }
    }

    /// Default configuration rendered as TOML.
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn with_env<F>(vars: &[(&str, &str)], test: F)
    where
        F: FnOnce(),
    {
        let mut old = Vec::new();
        for (k, v) in vars {
            old.push((k.to_string(), env::var(k).ok()));
            env::set_var(k, v);
        }

        test();

        for (k, maybe_old) in old {
            match maybe_old {
                Some(val) => env::set_var(k, val),
                None => env::remove_var(k),
            }
        }
    }

    #[test]
    fn defaults_are_applied() {
        let cfg = CliConfig::new(None).expect("failed to build config");
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
        assert_eq!(cfg.share_size, 256);
        assert_eq!(cfg.deadline, Duration::from_secs(30));
        assert_eq!(cfg.cache_capacity, 4096);
        assert!(cfg.verify_digests);
    }

    #[test]
    fn env_vars_override_defaults() {
        with_env(
            &[
                ("QUADRANT_MAX_CONCURRENT_ROWS", "3"),
                ("QUADRANT_VERIFY_DIGESTS", "false"),
            ],
            || {
                let cfg = CliConfig::new(None).expect("failed to build config");
                assert_eq!(cfg.max_concurrent_rows, 3);
                assert!(!cfg.verify_digests);
                let retriever = cfg.retriever_config();
                assert_eq!(retriever.max_concurrent_rows, 3);
                assert_eq!(retriever.deadline, Some(Duration::from_secs(30)));
            },
        );
    }

    #[test]
    fn file_overrides_take_precedence_over_defaults() {
        use std::io::Write;

        let mut tmp = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(
            tmp,
            r#"
share_size = 128
deadline = "1m 30s"
"#
        )
        .expect("write to temp file");

        let cfg = CliConfig::new(Some(PathBuf::from(tmp.path()))).expect("load config");
        assert_eq!(cfg.share_size, 128);
        assert_eq!(cfg.deadline, Duration::from_secs(90));
    }

    #[test]
    fn default_toml_parses_back() {
        let rendered = CliConfig::default_toml().expect("render defaults");
        let parsed: CliConfig = toml::from_str(&rendered).expect("parse defaults");
        assert_eq!(parsed, CliConfig::default());
    }
}
