use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use glean::config::Config;
use glean::ocr::{parse_image_list, ImageInput, OcrPipeline};
use glean::storage::{shared_object_store, ManifestCatalog, StorageResolver};

#[derive(Parser)]
#[command(name = "glean")]
#[command(about = "Extract OCR text from document images")]
struct Args {
    /// Character budget for the output; 0 disables truncation
    #[arg(long, global = true)]
    max_chars: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// OCR image files and/or a JSON array of encoded images
    Images {
        /// JSON file holding an array of images (base64, data URL, byte array or {"content": ...})
        #[arg(long)]
        inputs: Option<PathBuf>,

        /// Image files read as raw bytes
        paths: Vec<PathBuf>,
    },
    /// Resolve documents through a catalog, fetch them from the object store and OCR them
    Documents {
        /// JSON manifest mapping document ids to {name, bucket, key}
        #[arg(long)]
        catalog: PathBuf,

        #[arg(required = true)]
        doc_ids: Vec<String>,
    },
}

fn read_inputs(inputs: Option<&PathBuf>, paths: &[PathBuf]) -> anyhow::Result<Vec<ImageInput>> {
    let mut images = Vec::new();

    if let Some(path) = inputs {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let decoded = parse_image_list(&json)
            .with_context(|| format!("Invalid image list in {}", path.display()))?;
        images.extend(decoded);
    }

    for path in paths {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        images.push(ImageInput::RawBytes(bytes));
    }

    Ok(images)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "glean=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();
    let max_chars = args.max_chars.unwrap_or(config.ocr.max_chars);
    let pipeline = OcrPipeline::from_config(&config.ocr);

    let text = match args.command {
        Command::Images { inputs, paths } => {
            let images = read_inputs(inputs.as_ref(), &paths)?;
            tracing::info!("Loaded {} image inputs", images.len());
            pipeline.extract_text(&images, max_chars).await
        }
        Command::Documents { catalog, doc_ids } => {
            let catalog = Arc::new(
                ManifestCatalog::load(&catalog)
                    .with_context(|| format!("Failed to load catalog {}", catalog.display()))?,
            );
            tracing::info!("Catalog loaded with {} documents", catalog.len());

            let store = shared_object_store(&config.storage)?;
            let resolver = StorageResolver::new(catalog.clone(), catalog, store);
            glean::extract_document_text(&resolver, &pipeline, &doc_ids, max_chars).await
        }
    };

    println!("{text}");
    Ok(())
}
