//! Scene construction and reader binding.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::binding::{discover_files, find_readers, ReaderBinding};
use crate::config::{SceneConfig, SensorLookup};
use crate::error::SceneResult;
use crate::info::{keys, Info, InfoValue};
use crate::reader::ReaderRegistry;

use super::Scene;

/// Builder for [`Scene`].
///
/// Readers are bound in `build`:
///
/// - with a sensor, its reader configuration is found through the lookup
///   file; explicit filenames are matched against it, otherwise files are
///   discovered from the configuration's patterns and the scene's times
/// - with filenames only, every reader configuration in the config
///   directory is tried in turn
/// - with neither, the scene starts empty
#[derive(Debug)]
pub struct SceneBuilder {
    config: SceneConfig,
    info: Info,
    filenames: Option<Vec<PathBuf>>,
    readers: Arc<ReaderRegistry>,
}

impl SceneBuilder {
    pub(super) fn new(config: SceneConfig) -> Self {
        Self {
            config,
            info: Info::new(),
            filenames: None,
            readers: Arc::new(ReaderRegistry::new()),
        }
    }

    /// Replace the scene metadata.
    pub fn info(mut self, info: Info) -> Self {
        self.info = info;
        self
    }

    /// Set one metadata entry.
    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<InfoValue>) -> Self {
        self.info.insert(key, value);
        self
    }

    pub fn platform(self, platform: impl Into<String>) -> Self {
        self.with_info(keys::PLATFORM, platform.into())
    }

    pub fn sensor(self, sensor: impl Into<String>) -> Self {
        self.with_info(keys::SENSOR, sensor.into())
    }

    pub fn start_time(self, start: NaiveDateTime) -> Self {
        self.with_info(keys::START_TIME, start)
    }

    pub fn end_time(self, end: NaiveDateTime) -> Self {
        self.with_info(keys::END_TIME, end)
    }

    /// Explicit files to bind.
    pub fn filenames<I, P>(mut self, filenames: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.filenames = Some(filenames.into_iter().map(Into::into).collect());
        self
    }

    /// Reader factories used when the scene is read.
    pub fn readers(mut self, readers: Arc<ReaderRegistry>) -> Self {
        self.readers = readers;
        self
    }

    /// Bind readers and create the scene.
    ///
    /// # Errors
    ///
    /// - `UnknownSensor` if the sensor has no lookup entry
    /// - `ConfigRead` / `MalformedConfig` for unreadable reader configurations
    /// - `MissingMetadata` if files must be discovered without a start time
    /// - `UnresolvedFiles` if explicit files (without a sensor) are left
    ///   unclaimed by every reader configuration
    pub fn build(self) -> SceneResult<Scene> {
        let SceneBuilder {
            config,
            info,
            filenames,
            readers,
        } = self;

        let bindings = match (info.text(keys::SENSOR), filenames) {
            (Some(sensor), filenames) => {
                vec![bind_sensor(&config, &info, sensor, filenames)?]
            }
            (None, Some(filenames)) => find_readers(&config, filenames)?,
            (None, None) => {
                debug!("No sensor or files given, creating empty scene");
                Vec::new()
            }
        };

        let mut scene = Scene::empty(config, info, readers);
        scene.bind(bindings);
        Ok(scene)
    }
}

fn bind_sensor(
    config: &SceneConfig,
    info: &Info,
    sensor: &str,
    filenames: Option<Vec<PathBuf>>,
) -> SceneResult<ReaderBinding> {
    let lookup = SensorLookup::load(config)?;
    let config_file = lookup.config_file(sensor)?;
    let mut binding = ReaderBinding::from_config_file(&config_file)?;

    match filenames {
        Some(mut pool) => {
            binding.assign_matching_files(&mut pool);
            if !pool.is_empty() {
                warn!(
                    sensor,
                    format = %binding.format(),
                    unmatched = pool.len(),
                    "Ignoring files that do not match the sensor's reader"
                );
            }
        }
        None => {
            let files = discover_files(&binding, info)?;
            debug!(sensor, found = files.len(), "Discovered sensor files");
            binding.set_filenames(files);
        }
    }
    Ok(binding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SceneError;
    use crate::scene::SceneState;
    use std::fs;
    use tempfile::TempDir;

    const VIIRS_CONFIG: &str = "\
[reader:viirs]
format = viirs_sdr.ViirsSdrReader
file_patterns = SV{band}_{platform}_d{start_time:%Y%m%d_t%H%M%S}{tenth:1d}_e{end_time:%H%M%S}{end_tenth:1d}_b{orbit:05d}_c{creation}_cspp_dev.h5
";

    fn config_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("viirs.cfg"), VIIRS_CONFIG).unwrap();
        fs::write(dir.path().join("satscene.cfg"), "[readers]\nviirs = viirs.cfg\n").unwrap();
        dir
    }

    fn sdr(band: &str) -> String {
        format!("SV{band}_npp_d20150311_t1125112_e1126354_b17451_c20150311113206961730_cspp_dev.h5")
    }

    #[test]
    fn test_build_with_files_only() {
        let dir = config_dir();
        let scene = Scene::builder(SceneConfig::new(dir.path()))
            .filenames([sdr("M05"), sdr("I04")])
            .build()
            .unwrap();

        assert_eq!(scene.state(), SceneState::FilesBound);
        let binding = scene.binding("viirs_sdr.ViirsSdrReader").unwrap();
        assert_eq!(binding.filenames().len(), 2);
    }

    #[test]
    fn test_build_with_unclaimed_files_fails() {
        let dir = config_dir();
        let err = Scene::builder(SceneConfig::new(dir.path()))
            .filenames([sdr("M05"), "notes.txt".to_string()])
            .build()
            .unwrap_err();
        assert!(matches!(err, SceneError::UnresolvedFiles { files } if files == vec![PathBuf::from("notes.txt")]));
    }

    #[test]
    fn test_build_with_sensor_and_files_ignores_strays() {
        let dir = config_dir();
        let scene = Scene::builder(SceneConfig::new(dir.path()))
            .sensor("VIIRS")
            .filenames([sdr("M05"), "notes.txt".to_string()])
            .build()
            .unwrap();

        let binding = scene.binding("viirs_sdr.ViirsSdrReader").unwrap();
        assert_eq!(binding.filenames(), &[PathBuf::from(sdr("M05"))]);
    }

    #[test]
    fn test_build_with_unknown_sensor() {
        let dir = config_dir();
        let err = Scene::builder(SceneConfig::new(dir.path()))
            .sensor("modis")
            .build()
            .unwrap_err();
        assert!(matches!(err, SceneError::UnknownSensor { sensor, .. } if sensor == "modis"));
    }

    #[test]
    fn test_build_with_sensor_requires_start_time_for_discovery() {
        let dir = config_dir();
        let err = Scene::builder(SceneConfig::new(dir.path()))
            .sensor("viirs")
            .build()
            .unwrap_err();
        assert!(matches!(err, SceneError::MissingMetadata("start_time")));
    }

    #[test]
    fn test_build_without_sources_is_empty() {
        let scene = Scene::builder(SceneConfig::default()).build().unwrap();
        assert_eq!(scene.state(), SceneState::Empty);
        assert_eq!(scene.bindings().count(), 0);
    }
}
