//! The `macula classify` command — one-shot offline classification.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use macula_core::{Config, StageClassifier, StagePipeline};

/// Arguments for the `classify` command.
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Path to the image file to classify
    pub image: PathBuf,

    /// Pretty-print the JSON result
    #[arg(long)]
    pub pretty: bool,
}

/// Execute the classify command.
///
/// Unlike the server, a missing model is fatal here — there is nothing
/// useful to do without one.
pub async fn execute(args: ClassifyArgs, config: Config) -> anyhow::Result<()> {
    let classifier = Arc::new(StageClassifier::load(&config)?);
    let pipeline = StagePipeline::new(&config, Some(classifier));

    let bytes = tokio::fs::read(&args.image).await?;
    let name = args
        .image
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();

    let prediction = pipeline.classify_upload(bytes, &name).await?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&prediction)?
    } else {
        serde_json::to_string(&prediction)?
    };
    println!("{json}");

    Ok(())
}
