use anyhow::{bail, Context};
use clap::Args;

use partscout_core::{run_pipeline, RankMode};
use partscout_providers::{
    build_providers, collect_candidates, fetch_image_base64, SearchRequest,
};

#[derive(Debug, Args)]
pub(crate) struct SearchArgs {
    /// Text query to search for.
    query: Option<String>,

    /// Image URL to search by instead of (or alongside) a text query.
    #[arg(long)]
    image_url: Option<String>,

    /// Country code (e.g. AUS, USA, GBR); omit for a worldwide search.
    #[arg(long)]
    country: Option<String>,

    /// Ranking mode: cheapest, expensive, or best.
    #[arg(long, default_value = "cheapest")]
    mode: String,
}

pub(crate) async fn run(args: SearchArgs) -> anyhow::Result<()> {
    if args.query.is_none() && args.image_url.is_none() {
        bail!("provide a text query or --image-url");
    }

    let mode: RankMode = args.mode.parse()?;

    let config = partscout_core::load_app_config()?;
    let providers = build_providers(&config)?;
    if providers.is_empty() {
        bail!("no providers configured; set SERPAPI_KEY and/or EBAY_CLIENT_ID/EBAY_CLIENT_SECRET");
    }

    let country = args
        .country
        .filter(|c| !c.is_empty() && c != "WORLD");

    let image_base64 = match (&args.query, &args.image_url) {
        (None, Some(url)) => match fetch_image_base64(url, config.provider_timeout_secs).await {
            Ok(encoded) => Some(encoded),
            Err(e) => {
                tracing::warn!(error = %e, "image fetch for visual search failed");
                None
            }
        },
        _ => None,
    };

    let request = SearchRequest {
        query: args.query,
        image_url: args.image_url,
        image_base64,
        country,
    };

    let batches = collect_candidates(&providers, &request).await;
    let results = run_pipeline(batches, mode);

    tracing::info!(count = results.len(), mode = %mode, "search complete");
    let rendered =
        serde_json::to_string_pretty(&results).context("serializing results to JSON")?;
    println!("{rendered}");

    Ok(())
}
