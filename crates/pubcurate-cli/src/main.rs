//! pubcurate: Publication curation dataset builder.
//! Entry point for the `pubcurate` binary.

mod config;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pubcurate_common::sandbox::SandboxClient;
use pubcurate_ingestion::manifest;
use pubcurate_ingestion::pipeline::Pipeline;
use pubcurate_ingestion::record::RecordBuilder;
use pubcurate_ingestion::sources::bioc::BioCClient;
use pubcurate_ingestion::sources::idconv::IdConverterClient;
use pubcurate_ingestion::tokens::Cl100kCounter;
use pubcurate_ingestion::writer::DatasetWriter;
use pubcurate_llm::batch::BatchClient;

#[derive(Parser, Debug)]
#[command(name = "pubcurate", version, about = "Build and submit publication curation batches")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a data-model CSV into the publication JSON Schema.
    Schema {
        input: PathBuf,
        output: PathBuf,
    },
    /// Resolve, fetch and package every Open Access manifest row.
    Dataset {
        #[arg(long)]
        manifest: Option<PathBuf>,
        #[arg(long)]
        schema: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Upload the dataset and create a batch job.
    Batch {
        #[arg(long)]
        dataset: Option<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pubcurate=debug,info")),
        )
        .init();

    let cli = Cli::parse();
    let config = config::Config::load(&cli.config)?;
    info!("pubcurate {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Schema { input, output } => {
            pubcurate_schema::generate_schema_file(&input, &output)
                .with_context(|| format!("schema generation from {}", input.display()))?;
            info!("Schema generation complete.");
        }
        Command::Dataset { manifest, schema, output, log } => {
            let paths = &config.paths;
            run_dataset(
                &config,
                manifest.unwrap_or_else(|| paths.manifest.clone()),
                schema.unwrap_or_else(|| paths.schema.clone()),
                output.unwrap_or_else(|| paths.dataset.clone()),
                log.unwrap_or_else(|| paths.audit_log.clone()),
            )
            .await?;
        }
        Command::Batch { dataset, out_dir } => {
            let dataset = dataset.unwrap_or_else(|| config.paths.dataset.clone());
            let out_dir = out_dir.unwrap_or_else(|| config.paths.batch_dir.clone());
            // Credential only; everything else comes from the config file.
            let _ = dotenvy::dotenv();

            let mut http = SandboxClient::new()?;
            http.allow_url(&config.openai.base_url)?;
            let client = BatchClient::from_env(http)?.with_base_url(&config.openai.base_url);
            let job = client.submit(&dataset, &out_dir).await?;
            info!(
                batch_id = %job.id,
                status = ?job.status,
                descriptor = %job.descriptor_path.display(),
                "Batch submitted"
            );
            println!("{}", serde_json::to_string_pretty(&job.descriptor)?);
        }
    }

    Ok(())
}

async fn run_dataset(
    config: &config::Config,
    manifest_path: PathBuf,
    schema_path: PathBuf,
    dataset_path: PathBuf,
    log_path: PathBuf,
) -> anyhow::Result<()> {
    let rows = manifest::load_open_access(&manifest_path)
        .with_context(|| format!("reading manifest {}", manifest_path.display()))?;

    let schema_text = std::fs::read_to_string(&schema_path)
        .with_context(|| format!("reading schema {}", schema_path.display()))?;
    let schema: serde_json::Value = serde_json::from_str(&schema_text)?;
    let builder = RecordBuilder::new(&schema, config.openai.model.clone())?;

    let mut http = SandboxClient::new()?;
    http.allow_url(&config.ncbi.idconv_url)?;
    http.allow_url(&config.ncbi.bioc_url)?;

    let resolver = IdConverterClient::new(http.clone())
        .with_url(config.ncbi.idconv_url.clone())
        .with_contact(config.ncbi.tool.clone(), config.ncbi.email.clone());
    let fetcher = BioCClient::new(http, config.paths.xml_dir.clone())
        .with_base_url(config.ncbi.bioc_url.clone());
    let counter = Cl100kCounter::new()?;

    let pipeline = Pipeline::new(Box::new(resolver), Box::new(fetcher), Box::new(counter), builder);

    let mut writer = DatasetWriter::create(&dataset_path, &log_path)?;
    let summary = pipeline.run(&rows, &mut writer).await?;
    writer.finish()?;

    info!(
        dataset = %dataset_path.display(),
        log = %log_path.display(),
        "{} of {} publications added to dataset",
        summary.included,
        summary.rows
    );
    Ok(())
}
