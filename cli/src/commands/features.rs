use std::sync::Arc;

use anyhow::{Context, Result};
use cdbtiles::{FeatureConfig, FeatureSource, SessionContext};

use super::parse_bounds;

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::FeatureArgs) -> Result<()> {
    let extent = parse_bounds(&args.bounds)?;

    let mut config = FeatureConfig::new(&args.root, args.min_level, args.max_level);
    config.geotypical = args.geotypical;
    config.inflated = args.inflated;
    config.verbose = cli.verbose > 0;

    let source = FeatureSource::new(config, Arc::new(SessionContext::new()))?;
    let cursor = source.read_features(&extent).with_context(|| format!("No features for {extent}"))?;

    let mut count = 0;
    for feature in cursor.filter(|f| !f.ignore) {
        let (x, y) = feature.geometry.point.x_y();
        let model = feature.model.as_ref().map_or("-", |m| m.name.as_str());
        println!("{:>8} {x:>12.6} {y:>11.6} {model}", feature.fid);
        count += 1;
    }
    eprintln!("[features] {count} features in {extent}");

    let replacements = source.session().replacements().len();
    if replacements > 0 {
        eprintln!("[features] {replacements} replacement batches queued");
    }

    Ok(())
}
