//! Configuration file loading
//!
//! Parse JSON, validate the structure against [`config_schema`], then
//! deserialize each block into typed settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::schema::{validate, ObjectSchema, Schema};
use crate::compositor::layout::Grid;
use crate::session::StreamEndpoint;
use crate::slot::Resolution;

/// Configuration loading failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    /// The document does not have the expected shape
    #[error("config structure error at {path}: {reason}")]
    Structure { path: String, reason: String },

    /// A value has the wrong type
    #[error("invalid value in {section}: {source}")]
    Invalid {
        section: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Schema of the configuration document
pub fn config_schema() -> Schema {
    let network = ObjectSchema::strict().scalars(&["login", "password", "ip_address", "port", "source"]);
    let stream = ObjectSchema::strict().required("network", network);
    let recorder = ObjectSchema::strict().scalars(&["record_video", "video_path"]);
    let grid = ObjectSchema::strict().scalars(&["col", "row"]);
    let window = ObjectSchema::strict()
        .scalars(&["width", "height"])
        .required("grid", grid);
    let display = ObjectSchema::strict()
        .scalars(&["display_streams"])
        .required("window", window);

    ObjectSchema::lenient()
        .required("rtsp_streams", Schema::collection(stream))
        .optional(
            "video_recorder",
            recorder,
            "no video_recorder block found; the recorder is not created",
        )
        .optional(
            "display",
            display,
            "no display block found; streams are not displayed",
        )
        .into()
}

/// `video_recorder` block
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecorderSettings {
    pub record_video: bool,
    pub video_path: PathBuf,
}

/// `display` block
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DisplaySettings {
    pub display_streams: bool,
    pub window: WindowSettings,
}

/// `display.window` block
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    pub grid: GridSettings,
}

/// `display.window.grid` block
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GridSettings {
    pub col: u32,
    pub row: u32,
}

impl WindowSettings {
    pub fn size(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn grid(&self) -> Grid {
        Grid::new(self.grid.col, self.grid.row)
    }
}

#[derive(Debug, Deserialize)]
struct StreamEntry {
    network: NetworkSettings,
}

#[derive(Debug, Deserialize)]
struct NetworkSettings {
    #[serde(deserialize_with = "string_or_number")]
    login: String,
    #[serde(deserialize_with = "string_or_number")]
    password: String,
    #[serde(deserialize_with = "string_or_number")]
    ip_address: String,
    #[serde(deserialize_with = "string_or_number")]
    port: String,
    #[serde(deserialize_with = "string_or_number")]
    source: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, found {}",
            other
        ))),
    }
}

/// Loaded application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// One endpoint per stream, in document order
    pub streams: Vec<StreamEndpoint>,
    pub recorder: Option<RecorderSettings>,
    pub display: Option<DisplaySettings>,
    /// Non-fatal findings (unknown keys, missing optional blocks)
    pub warnings: Vec<String>,
}

impl AppConfig {
    /// Read and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        tracing::info!(path = %path.display(), "Verifying configuration");
        let config = Self::from_json_str(&text)?;
        tracing::info!(
            path = %path.display(),
            streams = config.streams.len(),
            "Configuration verified"
        );
        Ok(config)
    }

    /// Parse and validate a configuration document
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        Self::from_value(value)
    }

    /// Validate an already parsed document
    pub fn from_value(mut value: Value) -> Result<Self, ConfigError> {
        let warnings = validate(&value, &config_schema())?;
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }

        let streams = match value.get_mut("rtsp_streams").map(Value::take) {
            Some(Value::Object(map)) => map
                .into_iter()
                .map(|(key, entry)| stream_endpoint(&format!("rtsp_streams.{}", key), entry))
                .collect::<Result<Vec<_>, _>>()?,
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(i, entry)| stream_endpoint(&format!("rtsp_streams[{}]", i), entry))
                .collect::<Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };

        let recorder = section(&mut value, "video_recorder")?;
        let display = section(&mut value, "display")?;

        Ok(Self {
            streams,
            recorder,
            display,
            warnings,
        })
    }

    /// Output path when recording is enabled
    pub fn recording_path(&self) -> Option<&Path> {
        self.recorder
            .as_ref()
            .filter(|r| r.record_video)
            .map(|r| r.video_path.as_path())
    }

    /// Window settings when displaying is enabled
    pub fn display_window(&self) -> Option<&WindowSettings> {
        self.display
            .as_ref()
            .filter(|d| d.display_streams)
            .map(|d| &d.window)
    }
}

fn stream_endpoint(section: &str, entry: Value) -> Result<StreamEndpoint, ConfigError> {
    let entry: StreamEntry = serde_json::from_value(entry).map_err(|e| ConfigError::Invalid {
        section: section.to_string(),
        source: e,
    })?;
    let network = entry.network;
    Ok(StreamEndpoint::new(
        network.login,
        network.password,
        network.ip_address,
        network.port,
        network.source,
    ))
}

fn section<T>(value: &mut Value, key: &str) -> Result<Option<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    match value.get_mut(key).map(Value::take) {
        Some(block) => serde_json::from_value(block)
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                section: key.to_string(),
                source: e,
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const FULL: &str = r#"{
        "rtsp_streams": {
            "cam1": { "network": { "login": "admin", "password": "secret", "ip_address": "10.0.0.5", "port": 554, "source": "cam1" } },
            "cam2": { "network": { "login": "admin", "password": "secret", "ip_address": "10.0.0.6", "port": "8554", "source": "live/main" } }
        },
        "video_recorder": { "record_video": true, "video_path": "out.mp4" },
        "display": { "display_streams": true, "window": { "width": 1920, "height": 1080, "grid": { "col": 2, "row": 1 } } }
    }"#;

    #[test]
    fn test_full_config() {
        let config = AppConfig::from_json_str(FULL).unwrap();

        assert_eq!(config.streams.len(), 2);
        assert_eq!(config.streams[0].to_string(), "10.0.0.5:554/cam1");
        assert_eq!(config.streams[1].port(), "8554");
        assert_eq!(config.streams[1].source(), "live/main");

        assert_eq!(config.recording_path(), Some(Path::new("out.mp4")));
        let window = config.display_window().unwrap();
        assert_eq!(window.size(), Resolution::new(1920, 1080));
        assert_eq!(window.grid(), Grid::new(2, 1));
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn test_streams_only() {
        let config = AppConfig::from_json_str(
            r#"{"rtsp_streams": [
                {"network": {"login": "a", "password": "b", "ip_address": "h1", "port": 554, "source": "s"}},
                {"network": {"login": "a", "password": "b", "ip_address": "h2", "port": 554, "source": "s"}}
            ]}"#,
        )
        .unwrap();

        assert_eq!(config.streams.len(), 2);
        assert_eq!(config.streams[1].host(), "h2");
        assert!(config.recorder.is_none());
        assert!(config.recording_path().is_none());
        assert!(config.display_window().is_none());
        assert_eq!(config.warnings.len(), 2);
    }

    #[test]
    fn test_unknown_top_level_key_is_a_warning() {
        let mut value: Value = serde_json::from_str(FULL).unwrap();
        value["telemetry"] = serde_json::json!({"enabled": true});

        let config = AppConfig::from_value(value).unwrap();
        assert_eq!(config.streams.len(), 2);
        assert_eq!(config.warnings.len(), 1);
        assert!(config.warnings[0].contains("telemetry"));
    }

    #[test]
    fn test_extra_network_key_is_an_error() {
        let mut value: Value = serde_json::from_str(FULL).unwrap();
        value["rtsp_streams"]["cam2"]["network"]["codec"] = "h264".into();

        match AppConfig::from_value(value) {
            Err(ConfigError::Structure { path, reason }) => {
                assert_eq!(path, "rtsp_streams.cam2.network");
                assert_eq!(reason, "unknown key \"codec\"");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_missing_window_grid_is_an_error() {
        let mut value: Value = serde_json::from_str(FULL).unwrap();
        value["display"]["window"]
            .as_object_mut()
            .unwrap()
            .remove("grid");

        match AppConfig::from_value(value) {
            Err(ConfigError::Structure { path, reason }) => {
                assert_eq!(path, "display.window");
                assert_eq!(reason, "missing key \"grid\"");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_missing_streams_is_an_error() {
        let result = AppConfig::from_json_str(r#"{"display": {}}"#);
        assert!(matches!(result, Err(ConfigError::Structure { .. })));
    }

    #[test]
    fn test_wrong_value_type_is_invalid() {
        let mut value: Value = serde_json::from_str(FULL).unwrap();
        value["display"]["window"]["width"] = "wide".into();

        match AppConfig::from_value(value) {
            Err(ConfigError::Invalid { section, .. }) => assert_eq!(section, "display"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            AppConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.streams.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppConfig::load(dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
