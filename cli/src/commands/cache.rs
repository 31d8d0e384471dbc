use anyhow::{Context, Result};
use cdbtiles::{cache_inventory, layer_usage};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::CacheArgs) -> Result<()> {
    let entries = cache_inventory(&args.dir)
        .with_context(|| format!("Failed to scan cache {}", args.dir.display()))?;

    if args.list {
        for e in &entries {
            println!("{:>12} {}", e.bytes, e.path.display());
        }
    }
    for usage in layer_usage(&entries) {
        println!("{:<20} {:>8} files {:>14} bytes", usage.layer, usage.files, usage.bytes);
    }

    Ok(())
}
