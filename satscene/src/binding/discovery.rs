//! On-disk file discovery with time-window filtering.

use std::path::PathBuf;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use super::ReaderBinding;
use crate::error::{SceneError, SceneResult};
use crate::info::{keys, Info};
use crate::pattern::time_only_date;

/// End time assumed for files whose names carry no end time.
fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1950, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Discover the files for `binding` on disk.
///
/// Each pattern is expanded into a glob using the scene metadata (minus the
/// time fields), and every candidate is parsed back through the same pattern
/// to recover its time window:
///
/// - with an `end_time` in `info`, a file is kept when its start or its end
///   falls within `[start_time, end_time]`;
/// - with only a `start_time`, a file is kept when its own window contains
///   that instant, or when its start equals it exactly, in which case the
///   remaining candidates of that pattern are skipped.
///
/// # Errors
///
/// `MissingMetadata` when `info` has no `start_time`.
pub fn discover_files(binding: &ReaderBinding, info: &Info) -> SceneResult<Vec<PathBuf>> {
    let start = info
        .time(keys::START_TIME)
        .ok_or(SceneError::MissingMetadata(keys::START_TIME))?;
    let end = info.time(keys::END_TIME);
    let fixed = info.without(&[keys::START_TIME, keys::END_TIME, keys::CREATION_TIME]);

    let mut found: Vec<PathBuf> = Vec::new();

    for pattern in binding.file_patterns() {
        let expr = pattern.globify(&fixed);
        let candidates = glob::glob(&expr).map_err(|source| SceneError::InvalidGlob {
            pattern: expr.clone(),
            source,
        })?;

        for entry in candidates {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable candidate");
                    continue;
                }
            };

            let metadata = match pattern.parse(&path.to_string_lossy()) {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!(file = %path.display(), error = %e, "Candidate does not parse");
                    continue;
                }
            };
            let Some(file_start) = metadata.time(keys::START_TIME) else {
                debug!(file = %path.display(), "Candidate has no start time");
                continue;
            };
            let file_end = metadata
                .time(keys::END_TIME)
                .map(|e| anchor_end_time(file_start, e));

            let (keep, exact) = match end {
                Some(end) => {
                    let file_end = file_end.unwrap_or_else(epoch);
                    let within = |t: NaiveDateTime| start <= t && t <= end;
                    (within(file_start) || within(file_end), false)
                }
                None => {
                    let contains = file_end.is_some_and(|fe| file_start <= start && start <= fe);
                    let exact = !contains && file_start == start;
                    (contains || exact, exact)
                }
            };

            if keep && !found.contains(&path) {
                found.push(path);
            }
            if exact {
                break;
            }
        }
    }

    debug!(format = %binding.format(), files = found.len(), "Discovered files");
    Ok(found)
}

/// Place a time-only end time on the start's date, rolling over midnight.
fn anchor_end_time(start: NaiveDateTime, end: NaiveDateTime) -> NaiveDateTime {
    if Some(end.date()) != time_only_date() {
        return end;
    }
    let anchored = start.date().and_time(end.time());
    if anchored < start {
        anchored + Duration::days(1)
    } else {
        anchored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dt(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2015, 3, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn binding(temp: &TempDir, pattern: &str) -> ReaderBinding {
        let full = format!("{}/{}", temp.path().display(), pattern);
        ReaderBinding::new("test.Reader", "test.cfg", &[full.as_str()]).unwrap()
    }

    fn touch(temp: &TempDir, name: &str) {
        std::fs::write(temp.path().join(name), b"").unwrap();
    }

    fn names(paths: Vec<PathBuf>) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    const WINDOWED: &str = "pass_{platform}_{start_time:%Y%m%d_%H%M}_{end_time:%Y%m%d_%H%M}.dat";

    #[test]
    fn test_interval_keeps_overlapping_files() {
        let temp = TempDir::new().unwrap();
        touch(&temp, "pass_npp_20150311_1000_20150311_1010.dat");
        touch(&temp, "pass_npp_20150311_1055_20150311_1105.dat");
        touch(&temp, "pass_npp_20150311_1150_20150311_1205.dat");
        touch(&temp, "pass_npp_20150311_1300_20150311_1310.dat");

        let info = Info::new()
            .with(keys::START_TIME, dt(11, 11, 0))
            .with(keys::END_TIME, dt(11, 12, 0));
        let files = discover_files(&binding(&temp, WINDOWED), &info).unwrap();

        assert_eq!(
            names(files),
            vec![
                "pass_npp_20150311_1055_20150311_1105.dat",
                "pass_npp_20150311_1150_20150311_1205.dat",
            ]
        );
    }

    #[test]
    fn test_known_fields_narrow_the_glob() {
        let temp = TempDir::new().unwrap();
        touch(&temp, "pass_npp_20150311_1100_20150311_1110.dat");
        touch(&temp, "pass_noaa19_20150311_1100_20150311_1110.dat");

        let info = Info::new()
            .with(keys::PLATFORM, "noaa19")
            .with(keys::START_TIME, dt(11, 10, 0))
            .with(keys::END_TIME, dt(11, 12, 0));
        let files = discover_files(&binding(&temp, WINDOWED), &info).unwrap();

        assert_eq!(names(files), vec!["pass_noaa19_20150311_1100_20150311_1110.dat"]);
    }

    #[test]
    fn test_instant_inside_file_window() {
        let temp = TempDir::new().unwrap();
        touch(&temp, "pass_npp_20150311_1100_20150311_1110.dat");
        touch(&temp, "pass_npp_20150311_1110_20150311_1120.dat");

        let info = Info::new().with(keys::START_TIME, dt(11, 11, 5));
        let files = discover_files(&binding(&temp, WINDOWED), &info).unwrap();

        assert_eq!(names(files), vec!["pass_npp_20150311_1100_20150311_1110.dat"]);
    }

    #[test]
    fn test_exact_start_stops_the_scan() {
        let temp = TempDir::new().unwrap();
        touch(&temp, "granule_npp_20150311_1100.dat");
        touch(&temp, "granule_viirs_20150311_1100.dat");

        let info = Info::new().with(keys::START_TIME, dt(11, 11, 0));
        let files = discover_files(
            &binding(&temp, "granule_{platform}_{start_time:%Y%m%d_%H%M}.dat"),
            &info,
        )
        .unwrap();

        assert_eq!(names(files), vec!["granule_npp_20150311_1100.dat"]);
    }

    #[test]
    fn test_time_only_end_is_anchored_to_start_date() {
        let temp = TempDir::new().unwrap();
        touch(&temp, "sdr_npp_d20150311_t2355_e0005.h5");

        let info = Info::new().with(keys::START_TIME, dt(12, 0, 2));
        let files = discover_files(
            &binding(&temp, "sdr_{platform}_d{start_time:%Y%m%d_t%H%M}_e{end_time:%H%M}.h5"),
            &info,
        )
        .unwrap();

        assert_eq!(names(files), vec!["sdr_npp_d20150311_t2355_e0005.h5"]);
    }

    #[test]
    fn test_missing_start_time() {
        let temp = TempDir::new().unwrap();
        let err = discover_files(&binding(&temp, WINDOWED), &Info::new()).unwrap_err();
        assert!(matches!(err, SceneError::MissingMetadata("start_time")));
    }
}
