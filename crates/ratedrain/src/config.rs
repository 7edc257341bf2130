//! Reloadable configuration source.
//!
//! The only reloadable setting is `RATELIMIT`, the admissions per second.
//! It is read from a dotenv-style `KEY=VALUE` file layered over the process
//! environment (the file wins). Parsing is dotenvy's, so quoted values,
//! `export` prefixes, and `#` comments all work as in any `.env` file.

use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Key holding the admissions-per-second rate.
pub const RATE_LIMIT_KEY: &str = "RATELIMIT";

/// A key-value configuration store that can be re-read at any time.
pub trait ConfigSource: Send + Sync + 'static {
    /// Looks up `key`, returning `Ok(None)` if no layer defines it.
    fn lookup(&self, key: &str) -> Result<Option<String>, ConfigError>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// Reads and validates the rate from `source`.
pub fn load_rate<S: ConfigSource + ?Sized>(source: &S) -> Result<u32, ConfigError> {
    let raw = source
        .lookup(RATE_LIMIT_KEY)?
        .ok_or_else(|| ConfigError::Missing {
            key: RATE_LIMIT_KEY.to_string(),
        })?;
    parse_rate(&raw)
}

/// Parses a rate value. Must be a positive integer that fits in `u32`.
pub fn parse_rate(raw: &str) -> Result<u32, ConfigError> {
    let trimmed = raw.trim();
    let value: i64 = trimmed.parse().map_err(|e| ConfigError::Invalid {
        key: RATE_LIMIT_KEY.to_string(),
        value: trimmed.to_string(),
        reason: format!("{e}"),
    })?;

    if value <= 0 {
        return Err(ConfigError::NonPositive { value });
    }

    u32::try_from(value).map_err(|_| ConfigError::Invalid {
        key: RATE_LIMIT_KEY.to_string(),
        value: trimmed.to_string(),
        reason: format!("exceeds maximum of {}", u32::MAX),
    })
}

/// Dotenv-style file layered over the process environment.
#[derive(Debug, Clone)]
pub struct EnvFileSource {
    path: PathBuf,
    process_env: bool,
}

impl EnvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            process_env: true,
        }
    }

    /// Whether keys missing from the file fall back to the process environment.
    pub fn with_process_env(mut self, enabled: bool) -> Self {
        self.process_env = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file fresh. A missing file yields no entries.
    fn read_file(&self) -> Result<HashMap<String, String>, ConfigError> {
        let entries = match dotenvy::from_path_iter(self.path()) {
            Ok(entries) => entries,
            Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %self.path().display(), "config file not found, using process environment");
                return Ok(HashMap::new());
            }
            Err(e) => return Err(self.file_error(e)),
        };

        // Later lines override earlier ones, as when a shell sources the file.
        let mut values = HashMap::new();
        for entry in entries {
            let (key, value) = entry.map_err(|e| self.file_error(e))?;
            values.insert(key, value);
        }
        Ok(values)
    }

    fn file_error(&self, err: dotenvy::Error) -> ConfigError {
        match err {
            dotenvy::Error::Io(source) => ConfigError::Read {
                path: self.path.clone(),
                source,
            },
            other => ConfigError::Parse {
                path: self.path.clone(),
                message: other.to_string(),
            },
        }
    }
}

impl ConfigSource for EnvFileSource {
    fn lookup(&self, key: &str) -> Result<Option<String>, ConfigError> {
        if let Some(value) = self.read_file()?.remove(key) {
            return Ok(Some(value));
        }

        if self.process_env {
            return Ok(std::env::var(key).ok());
        }
        Ok(None)
    }

    fn describe(&self) -> String {
        format!("env file {}", self.path().display())
    }
}

/// In-memory source, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    values: HashMap<String, String>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// A source holding just `RATELIMIT=rate`.
    pub fn rate(rate: impl ToString) -> Self {
        Self::new().with(RATE_LIMIT_KEY, rate.to_string())
    }
}

impl ConfigSource for StaticSource {
    fn lookup(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.values.get(key).cloned())
    }

    fn describe(&self) -> String {
        "static values".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn env_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{contents}").unwrap();
        file
    }

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("5").unwrap(), 5);
        assert_eq!(parse_rate(" 42 \n").unwrap(), 42);
        assert!(matches!(parse_rate("0"), Err(ConfigError::NonPositive { value: 0 })));
        assert!(matches!(parse_rate("-3"), Err(ConfigError::NonPositive { value: -3 })));
        assert!(matches!(parse_rate("fast"), Err(ConfigError::Invalid { .. })));
        assert!(matches!(parse_rate("1.5"), Err(ConfigError::Invalid { .. })));
        assert!(matches!(parse_rate("99999999999"), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_env_file_integer_and_string_values() {
        let file = env_file("# pacing\nRATELIMIT=25\nOTHER=\"x\"");
        let source = EnvFileSource::new(file.path()).with_process_env(false);
        assert_eq!(load_rate(&source).unwrap(), 25);

        let file = env_file("RATELIMIT='7'");
        let source = EnvFileSource::new(file.path()).with_process_env(false);
        assert_eq!(load_rate(&source).unwrap(), 7);
    }

    #[test]
    fn test_env_file_with_ordinary_neighbours() {
        let file = env_file("APP_NAME=ratedrain\nURL=http://x\nexport RATELIMIT=5");
        let source = EnvFileSource::new(file.path()).with_process_env(false);
        assert_eq!(load_rate(&source).unwrap(), 5);
        assert_eq!(source.lookup("URL").unwrap().as_deref(), Some("http://x"));
        assert!(source.describe().ends_with(&file.path().display().to_string()));
    }

    #[test]
    fn test_later_line_wins() {
        let file = env_file("RATELIMIT=2\nRATELIMIT=8");
        let source = EnvFileSource::new(file.path()).with_process_env(false);
        assert_eq!(load_rate(&source).unwrap(), 8);
    }

    #[test]
    fn test_env_file_is_reread_on_every_lookup() {
        let mut file = env_file("RATELIMIT=3");
        let source = EnvFileSource::new(file.path()).with_process_env(false);
        assert_eq!(load_rate(&source).unwrap(), 3);

        file.as_file_mut().set_len(0).unwrap();
        std::fs::write(file.path(), "RATELIMIT=9\n").unwrap();
        assert_eq!(load_rate(&source).unwrap(), 9);
    }

    #[test]
    fn test_missing_key() {
        let file = env_file("OTHER=1");
        let source = EnvFileSource::new(file.path()).with_process_env(false);
        assert!(matches!(load_rate(&source), Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let source = EnvFileSource::new("/nonexistent/ratedrain/.env").with_process_env(false);
        assert!(matches!(load_rate(&source), Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_invalid_syntax() {
        let file = env_file("APP_NAME=ratedrain\nRATELIMIT 5");
        let source = EnvFileSource::new(file.path()).with_process_env(false);
        let err = load_rate(&source).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("parse config file"));
    }

    #[test]
    fn test_non_positive_in_file() {
        let file = env_file("RATELIMIT=0");
        let source = EnvFileSource::new(file.path()).with_process_env(false);
        assert!(matches!(load_rate(&source), Err(ConfigError::NonPositive { value: 0 })));
    }

    #[test]
    fn test_static_source() {
        assert_eq!(load_rate(&StaticSource::rate(12)).unwrap(), 12);
        assert!(matches!(
            load_rate(&StaticSource::new()),
            Err(ConfigError::Missing { .. })
        ));
    }
}
