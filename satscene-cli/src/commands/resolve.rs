//! `satscene resolve`: expand product names into raw bands.

use clap::Args;
use satscene::product::{resolve_raw_names, viirs};
use satscene::ProductRegistry;

use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Product or band names
    #[arg(required = true)]
    names: Vec<String>,
}

/// Registry of the built-in products.
fn builtin_products() -> Result<ProductRegistry, CliError> {
    let mut registry = ProductRegistry::new();
    registry.register("fog", viirs::fog())?;
    registry.register("true_color", viirs::true_color())?;
    Ok(registry)
}

pub fn run(args: ResolveArgs) -> Result<(), CliError> {
    let registry = builtin_products()?;
    for name in resolve_raw_names(&registry, &args.names)? {
        println!("{}", name);
    }
    Ok(())
}
