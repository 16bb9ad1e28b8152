//! Config path resolution

use std::path::PathBuf;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "TYPEMETA_CONFIG";

/// File name used when no override is set
pub const CONFIG_FILE: &str = "typemeta.toml";

/// Returns the config file path.
///
/// `$TYPEMETA_CONFIG` if set and non-empty, otherwise `typemeta.toml` in
/// the working directory.
pub fn config_path() -> PathBuf {
    resolve(std::env::var_os(CONFIG_ENV).map(PathBuf::from))
}

fn resolve(overridden: Option<PathBuf>) -> PathBuf {
    match overridden {
        Some(path) if !path.as_os_str().is_empty() => path,
        _ => PathBuf::from(CONFIG_FILE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_location() {
        assert_eq!(resolve(None), PathBuf::from("typemeta.toml"));
        assert_eq!(resolve(Some(PathBuf::new())), PathBuf::from("typemeta.toml"));
    }

    #[test]
    fn test_override() {
        let custom = PathBuf::from("/etc/typemeta/custom.toml");
        assert_eq!(resolve(Some(custom.clone())), custom);
    }
}
