//! `satscene bind`: match files against reader configurations.

use std::path::PathBuf;

use clap::Args;
use satscene::{Scene, SceneConfig};

use super::print_binding;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct BindArgs {
    /// Files to bind
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Only consider this sensor's reader configuration
    #[arg(long)]
    sensor: Option<String>,
}

pub fn run(config: &SceneConfig, args: BindArgs) -> Result<(), CliError> {
    let mut builder = Scene::builder(config.clone()).filenames(args.files);
    if let Some(sensor) = args.sensor {
        builder = builder.sensor(sensor);
    }
    let scene = builder.build()?;

    for binding in scene.bindings() {
        print_binding(binding);
    }
    Ok(())
}
