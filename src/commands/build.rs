use std::sync::Arc;

use crate::{BuildArgs, build::Builder, config::SiteConfig};

pub async fn run(args: &BuildArgs) -> Result<(), anyhow::Error> {
    let config = SiteConfig::load_from_arg(args.config_file.as_deref())?;

    // Builds are synchronous file I/O; keep them off the async workers
    let result = tokio::task::spawn_blocking(move || Builder::new(Arc::new(config)).build())
        .await??;

    println!(
        "Built site to {} ({} documents, {} drafts skipped, {} assets)",
        result.output_dir.display(),
        result.documents,
        result.drafts,
        result.assets
    );

    Ok(())
}
