//! Convert DOIs and save them to the local collection.
//!
//! ```text
//! cargo run --example convert_dois -- 10.1038/nature12373 \
//!     https://www.nature.com/articles/nature12373
//! ```
//!
//! Without arguments a few well-known DOIs are converted. The records land in
//! the configured data directory, in the default project.

use doi_cite::config::get_config;
use doi_cite::storage::{CollectionStore, JsonFileStore};
use doi_cite::utils::{init_logging, ProgressEvent};
use doi_cite::{ConversionWorker, Converter};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_config()?;
    init_logging(&config.logging);

    let mut inputs: Vec<String> = std::env::args().skip(1).collect();
    if inputs.is_empty() {
        inputs = vec![
            "10.1038/nature12373".to_string(),
            "https://doi.org/10.1126/science.1058040".to_string(),
            "not a doi".to_string(),
        ];
    }

    let converter = Arc::new(Converter::from_config(&config)?);
    let mut worker = ConversionWorker::spawn(converter, inputs);

    // Print progress while the batch runs
    if let Some(mut progress) = worker.take_progress() {
        tokio::spawn(async move {
            while let Some(event) = progress.recv().await {
                match event {
                    ProgressEvent::Started { total } => println!("Converting {} inputs", total),
                    ProgressEvent::Converted { index, id } => println!("  [{}] {}", index + 1, id),
                    ProgressEvent::Failed {
                        index,
                        input,
                        message,
                    } => eprintln!("  [{}] {}: {}", index + 1, input, message),
                    ProgressEvent::Finished { succeeded, failed } => {
                        println!("Done: {} converted, {} failed", succeeded, failed)
                    }
                }
            }
        });
    }

    let report = worker.join().await?;

    let style = config.citations.preferred_style();
    let mut store = JsonFileStore::open(&config.storage)?;
    let project_id = store.projects().first().map(|p| p.id.clone());

    for record in report.records.iter().filter(|r| !r.is_error()) {
        println!("\n{}", record.title);
        if let Some(year) = record.year() {
            println!("   Year: {}", year);
        }
        if let Some(journal) = record.journal() {
            println!("   Journal: {}", journal);
        }
        println!(
            "   {}: {}",
            style,
            record.citation(style).unwrap_or_default()
        );

        match &project_id {
            Some(id) => store.add_paper_to_project(id, record.clone())?,
            None => Some(store.add_paper(record.clone())?),
        };
    }

    println!("\nCollection saved to {}", store.path().display());
    Ok(())
}
