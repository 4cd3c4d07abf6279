//! Scene configuration and the sensor lookup table.
//!
//! Nothing here touches process-wide state: the configuration directory is
//! passed explicitly to every scene. [`SceneConfig::from_env`] only *reads*
//! `SATSCENE_CONFIG_DIR` as a fallback for callers that want it.

use std::path::{Path, PathBuf};

use ini::Ini;
use tracing::debug;

use crate::error::{SceneError, SceneResult};

/// Environment variable consulted by [`SceneConfig::from_env`].
pub const CONFIG_DIR_ENV: &str = "SATSCENE_CONFIG_DIR";

/// Default name of the sensor → reader configuration lookup file.
pub const DEFAULT_LOOKUP_FILENAME: &str = "satscene.cfg";

/// Section of the lookup file that maps sensors to reader configs.
pub const READERS_SECTION: &str = "readers";

/// Configuration for a scene.
#[derive(Debug, Clone)]
pub struct SceneConfig {
    /// Directory holding the lookup file and reader configuration files.
    pub config_dir: PathBuf,

    /// Filename of the lookup file inside `config_dir`.
    pub lookup_filename: String,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("."),
            lookup_filename: DEFAULT_LOOKUP_FILENAME.to_string(),
        }
    }
}

impl SceneConfig {
    /// Create a configuration rooted at `config_dir`.
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            ..Default::default()
        }
    }

    /// Configuration from `SATSCENE_CONFIG_DIR`, or the current directory
    /// when the variable is unset.
    pub fn from_env() -> Self {
        match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => Self::new(dir),
            None => Self::default(),
        }
    }

    /// Set the lookup filename.
    pub fn with_lookup_filename(mut self, filename: impl Into<String>) -> Self {
        self.lookup_filename = filename.into();
        self
    }

    /// Full path of the lookup file.
    pub fn lookup_path(&self) -> PathBuf {
        self.config_dir.join(&self.lookup_filename)
    }
}

/// Which stages [`Scene::load`](crate::Scene::load) runs after reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Evaluate composites after reading.
    pub compute: bool,

    /// Evict layers not on the wishlist after computing.
    pub unload: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            compute: true,
            unload: true,
        }
    }
}

impl LoadOptions {
    pub fn with_compute(mut self, compute: bool) -> Self {
        self.compute = compute;
        self
    }

    pub fn with_unload(mut self, unload: bool) -> Self {
        self.unload = unload;
        self
    }
}

/// Sensor name → reader configuration file mapping.
///
/// ```text
/// [readers]
/// viirs = viirs_sdr.cfg
/// avhrr = /etc/satscene/hrpt.cfg
/// ```
#[derive(Debug, Clone)]
pub struct SensorLookup {
    path: PathBuf,
    config_dir: PathBuf,
    entries: Vec<(String, String)>,
}

impl SensorLookup {
    /// Load the lookup file named by `config`.
    pub fn load(config: &SceneConfig) -> SceneResult<Self> {
        let path = config.lookup_path();
        let ini = Ini::load_from_file(&path).map_err(|source| SceneError::ConfigRead {
            path: path.clone(),
            source,
        })?;

        let entries = ini
            .section(Some(READERS_SECTION))
            .map(|props| {
                props
                    .iter()
                    .map(|(sensor, file)| (sensor.to_lowercase(), file.trim().to_string()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            path,
            config_dir: config.config_dir.clone(),
            entries,
        })
    }

    /// Path of the lookup file itself.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sensors with an entry, in file order.
    pub fn sensors(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(sensor, _)| sensor.as_str())
    }

    /// Resolve the reader configuration file for `sensor`.
    ///
    /// Sensor names compare case-insensitively. A configured path that does
    /// not exist as given is taken relative to the configuration directory.
    pub fn config_file(&self, sensor: &str) -> SceneResult<PathBuf> {
        let wanted = sensor.to_lowercase();
        let file = self
            .entries
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, file)| PathBuf::from(file))
            .ok_or_else(|| SceneError::UnknownSensor {
                sensor: sensor.to_string(),
                lookup: self.path.clone(),
            })?;

        let resolved = if file.exists() {
            file
        } else {
            self.config_dir.join(file)
        };
        debug!(sensor, config = %resolved.display(), "Resolved reader configuration");
        Ok(resolved)
    }
}
