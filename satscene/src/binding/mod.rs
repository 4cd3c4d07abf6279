//! Reader selection: which reader configuration applies to which files.
//!
//! A reader configuration file is INI text with exactly one `reader:<id>`
//! section:
//!
//! ```text
//! [reader:viirs_sdr]
//! description = VIIRS SDR reader
//! format = viirs_sdr.ViirsSdrReader
//! file_patterns = SV{band}_{platform}_d{start_time:%Y%m%d_t%H%M%S}{tenth:1d}_e{end_time:%H%M%S}{end_tenth:1d}_b{orbit:05d}_c{creation}_cspp_dev.h5
//!
//! [geolocation]
//! file_patterns = GMTCO_{platform}_*.h5,GITCO_{platform}_*.h5
//! ```
//!
//! Sections without the `reader:` prefix are legacy sections and only
//! contribute their `file_patterns`.
//!
//! Files are bound to readers in one of two ways:
//! - a declared sensor names its configuration through the lookup file, then
//!   files are either assigned from an explicit list or discovered on disk
//!   ([`discover_files`]);
//! - without a sensor, every configuration in the directory is scanned and
//!   each file goes to the first one whose patterns match ([`find_readers`]).

mod discovery;
mod matching;

pub use discovery::discover_files;
pub use matching::find_readers;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use ini::Ini;
use tracing::debug;

use crate::error::{SceneError, SceneResult};
use crate::pattern::PatternTemplate;

/// Prefix identifying the reader section of a configuration file.
pub const READER_SECTION_PREFIX: &str = "reader:";

const FORMAT_KEY: &str = "format";
const FILE_PATTERNS_KEY: &str = "file_patterns";

/// A reader configuration and the files assigned to it for one scene.
#[derive(Debug, Clone)]
pub struct ReaderBinding {
    reader_id: String,
    format: String,
    file_patterns: Vec<PatternTemplate>,
    config_path: PathBuf,
    options: IndexMap<String, String>,
    filenames: Vec<PathBuf>,
}

impl ReaderBinding {
    /// Build a binding directly from a format and pattern templates.
    pub fn new(
        format: impl Into<String>,
        config_path: impl Into<PathBuf>,
        patterns: &[&str],
    ) -> SceneResult<Self> {
        let format = format.into();
        Ok(Self {
            reader_id: format.clone(),
            format,
            file_patterns: compile_patterns(patterns.iter().copied())?,
            config_path: config_path.into(),
            options: IndexMap::new(),
            filenames: Vec::new(),
        })
    }

    /// Parse a reader configuration file.
    ///
    /// # Errors
    ///
    /// - `ConfigRead` if the file is missing or not valid INI
    /// - `MalformedConfig` if there is no reader section, more than one, or
    ///   the reader section lacks `format`
    /// - `InvalidPattern` if a file pattern does not compile
    pub fn from_config_file(path: &Path) -> SceneResult<Self> {
        let ini = Ini::load_from_file(path).map_err(|source| SceneError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let mut reader: Option<(String, String, IndexMap<String, String>)> = None;
        let mut patterns: Vec<String> = Vec::new();

        for (section, props) in ini.iter() {
            let Some(section) = section else {
                continue;
            };
            let section_patterns = props.get(FILE_PATTERNS_KEY).map(split_patterns);

            if let Some(reader_id) = section.strip_prefix(READER_SECTION_PREFIX) {
                if reader.is_some() {
                    return Err(SceneError::malformed(path, "more than one reader section"));
                }
                let format = props.get(FORMAT_KEY).ok_or_else(|| {
                    SceneError::malformed(
                        path,
                        format!("missing reader format in section [{}]", section),
                    )
                })?;
                let options = props
                    .iter()
                    .filter(|(key, _)| *key != FORMAT_KEY && *key != FILE_PATTERNS_KEY)
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect();
                reader = Some((reader_id.to_string(), format.trim().to_string(), options));
            }
            patterns.extend(section_patterns.unwrap_or_default());
        }

        let (reader_id, format, options) =
            reader.ok_or_else(|| SceneError::malformed(path, "missing reader format"))?;

        let binding = Self {
            reader_id,
            format,
            file_patterns: compile_patterns(patterns.iter().map(String::as_str))?,
            config_path: path.to_path_buf(),
            options,
            filenames: Vec::new(),
        };
        debug!(
            config = %path.display(),
            format = %binding.format,
            patterns = binding.file_patterns.len(),
            "Read reader configuration"
        );
        Ok(binding)
    }

    /// Identifier after `reader:` in the section name.
    pub fn reader_id(&self) -> &str {
        &self.reader_id
    }

    /// Dotted reader format identifier, the key into the reader registry.
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn file_patterns(&self) -> &[PatternTemplate] {
        &self.file_patterns
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Additional keys of the reader section (e.g. `description`).
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn filenames(&self) -> &[PathBuf] {
        &self.filenames
    }

    /// Move every file in `pool` that matches one of this binding's patterns
    /// into the binding. Patterns are tried in order.
    ///
    /// Returns the number of files assigned.
    pub fn assign_matching_files(&mut self, pool: &mut Vec<PathBuf>) -> usize {
        let before = self.filenames.len();
        let filenames = &mut self.filenames;

        for pattern in &self.file_patterns {
            pool.retain(|file| {
                if pattern.matches(file) {
                    filenames.push(file.clone());
                    false
                } else {
                    true
                }
            });
        }

        let assigned = self.filenames.len() - before;
        if assigned > 0 {
            debug!(format = %self.format, assigned, "Assigned files to reader");
        }
        assigned
    }

    pub(crate) fn set_filenames(&mut self, filenames: Vec<PathBuf>) {
        self.filenames = filenames;
    }

    /// Fold another binding of the same format into this one.
    pub(crate) fn absorb(&mut self, other: ReaderBinding) {
        for file in other.filenames {
            if !self.filenames.contains(&file) {
                self.filenames.push(file);
            }
        }
    }
}

fn split_patterns(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn compile_patterns<'a>(
    patterns: impl Iterator<Item = &'a str>,
) -> SceneResult<Vec<PatternTemplate>> {
    patterns
        .map(|p| {
            PatternTemplate::new(p).map_err(|source| SceneError::InvalidPattern {
                pattern: p.to_string(),
                source,
            })
        })
        .collect()
}
