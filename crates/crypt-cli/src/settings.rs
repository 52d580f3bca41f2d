use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Operator defaults, read from an optional JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CliSettings {
    /// Prefix for `gensalt` and setting-less `hash`; `None` means the
    /// library's preferred method.
    pub default_prefix: Option<String>,
    /// Cost passed to gensalt when `--count` is absent. Zero is the
    /// method's own default.
    pub default_count: u64,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            default_prefix: None,
            default_count: 0,
            log_filter: "warn".to_string(),
        }
    }
}

/// Load settings from `path`. No path, or a path that does not exist, gives
/// the defaults; a file that exists but does not parse is an error.
pub fn load_settings(path: Option<&Path>) -> Result<CliSettings> {
    let Some(path) = path else {
        return Ok(CliSettings::default());
    };
    if !path.exists() {
        return Ok(CliSettings::default());
    }
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let settings = serde_json::from_reader(file).with_context(|| format!("parsing {}", path.display()))?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let s: CliSettings = serde_json::from_str(r#"{"default_count": 7}"#).unwrap();
        assert_eq!(s.default_count, 7);
        assert_eq!(s.default_prefix, None);
        assert_eq!(s.log_filter, "warn");
    }

    #[test]
    fn absent_file_is_not_an_error() {
        let s = load_settings(Some(Path::new("/nonexistent/crypt-tool.json"))).unwrap();
        assert_eq!(s, CliSettings::default());
    }
}
