//! `satscene discover`: find a sensor's files for a time window.

use chrono::NaiveDateTime;
use clap::Args;
use satscene::{Scene, SceneConfig};
use tracing::info;

use super::{parse_time, print_binding};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Sensor name as listed in satscene.cfg
    #[arg(long)]
    sensor: String,

    /// Start of the time window (e.g. 2015-03-11T11:25:11)
    #[arg(long, value_parser = parse_time)]
    start: NaiveDateTime,

    /// End of the time window
    #[arg(long, value_parser = parse_time)]
    end: Option<NaiveDateTime>,

    /// Platform name used to narrow the file patterns
    #[arg(long)]
    platform: Option<String>,
}

pub fn run(config: &SceneConfig, args: DiscoverArgs) -> Result<(), CliError> {
    if let Some(end) = args.end {
        if end < args.start {
            return Err(CliError::Usage(format!(
                "end time {} is before start time {}",
                end, args.start
            )));
        }
    }

    let mut builder = Scene::builder(config.clone())
        .sensor(args.sensor)
        .start_time(args.start);
    if let Some(end) = args.end {
        builder = builder.end_time(end);
    }
    if let Some(platform) = args.platform {
        builder = builder.platform(platform);
    }
    let scene = builder.build()?;

    let found: usize = scene.bindings().map(|b| b.filenames().len()).sum();
    info!(found, "Discovery finished");
    for binding in scene.bindings() {
        print_binding(binding);
    }
    Ok(())
}
