use anyhow::{Context, Result};

use super::{open_layer, parse_bounds};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::RasterArgs) -> Result<()> {
    let extent = parse_bounds(&args.bounds)?;
    let out_path = args.output.clone().unwrap_or("./tile.png".into());

    let layer = open_layer(cli, &args.source)?;
    let image = layer.read_image(&extent).with_context(|| format!("No imagery for {extent}"))?;

    eprintln!("[image] {}x{} for {extent} -> {}", image.width(), image.height(), out_path.display());
    image.save(&out_path)?;

    Ok(())
}
