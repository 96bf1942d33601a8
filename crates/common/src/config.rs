//! Shared TOML-file + environment-override config loading.
//!
//! Every service loads a struct from an optional TOML file for the
//! mostly-static fields (paths, listen addresses) and then lets specific
//! environment variables override individual numeric/string knobs, with a
//! hard-coded default when neither the file nor the environment sets a
//! value. This mirrors the original system's `os.environ.get(NAME, default)`
//! pattern, just split across a file layer and an env layer.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

/// Parse a TOML file into `T`, or fall back to `T::default()` if the file
/// does not exist. A present-but-invalid file is still a hard error.
pub fn load_toml<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(toml::from_str(&raw)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(Error::Io(e)),
    }
}

/// Read `name` from the environment and parse it, falling back to `default`
/// when unset. An env var that is set but fails to parse is a config error.
pub fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(raw) => raw.parse::<T>().map_err(|e| Error::Env {
            name: name.to_string(),
            value: format!("{raw} ({e})"),
        }),
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(std::env::VarError::NotUnicode(_)) => Err(Error::Env {
            name: name.to_string(),
            value: "<non-unicode>".to_string(),
        }),
    }
}

/// Same as [`env_or`] but for an `Option<T>` default (no value means unset).
pub fn env_opt<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Env {
                name: name.to_string(),
                value: format!("{raw} ({e})"),
            }),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(Error::Env {
            name: name.to_string(),
            value: "<non-unicode>".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_to_default_when_unset() {
        assert_eq!(env_or::<u64>("COMMON_TEST_NOT_SET_XYZ", 42).unwrap(), 42);
    }

    #[test]
    fn env_or_parses_set_value() {
        unsafe {
            std::env::set_var("COMMON_TEST_SET_ABC", "7");
        }
        assert_eq!(env_or::<u64>("COMMON_TEST_SET_ABC", 42).unwrap(), 7);
        unsafe {
            std::env::remove_var("COMMON_TEST_SET_ABC");
        }
    }

    #[test]
    fn env_or_rejects_unparseable_value() {
        unsafe {
            std::env::set_var("COMMON_TEST_BAD_DEF", "not-a-number");
        }
        assert!(env_or::<u64>("COMMON_TEST_BAD_DEF", 1).is_err());
        unsafe {
            std::env::remove_var("COMMON_TEST_BAD_DEF");
        }
    }

    #[test]
    fn load_toml_defaults_when_file_missing() {
        #[derive(Default, serde::Deserialize)]
        struct Cfg {
            #[serde(default)]
            name: String,
        }
        let cfg: Cfg = load_toml(Path::new("/nonexistent/path/does-not-exist.toml")).unwrap();
        assert_eq!(cfg.name, "");
    }
}
