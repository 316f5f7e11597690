//! Configuration file support
//!
//! ```json
//! {
//!   "rtsp_streams": {
//!     "cam1": { "network": { "login": "u", "password": "p", "ip_address": "10.0.0.5", "port": 554, "source": "cam1" } }
//!   },
//!   "video_recorder": { "record_video": true, "video_path": "out.mp4" },
//!   "display": { "display_streams": true, "window": { "width": 1280, "height": 720, "grid": { "col": 2, "row": 2 } } }
//! }
//! ```
//!
//! `rtsp_streams` is required. The other blocks are optional; when present
//! they must contain exactly the listed keys.

pub mod loader;
pub mod schema;

pub use loader::{
    config_schema, AppConfig, ConfigError, DisplaySettings, GridSettings, RecorderSettings,
    WindowSettings,
};
pub use schema::{validate, ObjectSchema, Schema, UnknownKeys};
