use anyhow::{Context, Result};

use super::{open_layer, parse_bounds};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::RasterArgs) -> Result<()> {
    let extent = parse_bounds(&args.bounds)?;

    let layer = open_layer(cli, &args.source)?;
    let field = layer.read_elevation(&extent).with_context(|| format!("No elevation for {extent}"))?;

    let (cols, rows) = field.size();
    match field.range() {
        Some((lo, hi)) => println!("{cols}x{rows} heights for {extent}: min {lo:.2} m, max {hi:.2} m"),
        None => println!("{cols}x{rows} heights for {extent}: empty"),
    }

    if let Some(out_path) = &args.output {
        eprintln!("[elevation] writing {}", out_path.display());
        field.save(out_path)?;
    }

    Ok(())
}
