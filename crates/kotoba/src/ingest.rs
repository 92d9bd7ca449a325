// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kotoba ingest` command implementation.
//!
//! One-shot ingestion of a URL, raw text, or a local PDF file into the
//! knowledge base.

use clap::Subcommand;
use tracing::info;

use kotoba_config::KotobaConfig;
use kotoba_core::KotobaError;
use kotoba_knowledge::IngestOutcome;

use crate::wiring;

/// Source of the document to ingest.
#[derive(Subcommand, Debug)]
pub enum IngestSource {
    /// Fetch a web page and add its text to the knowledge base.
    Url {
        /// Web page to fetch.
        url: String,
    },
    /// Add raw text to the knowledge base.
    Text {
        /// The text to ingest verbatim.
        text: String,
    },
    /// Add a local PDF file to the knowledge base.
    Pdf {
        /// Path to the PDF file.
        path: String,
    },
}

/// Runs the `kotoba ingest` command.
pub async fn run_ingest(config: KotobaConfig, source: IngestSource) -> Result<(), KotobaError> {
    let db = wiring::open_database(&config).await?;
    let knowledge = wiring::build_knowledge(&config, &db).await?;

    let outcome = match source {
        IngestSource::Url { url } => {
            info!(url = url.as_str(), "ingesting URL");
            knowledge.ingest.ingest_url(&url).await?
        }
        IngestSource::Text { text } => knowledge.ingest.ingest_text(&text).await?,
        IngestSource::Pdf { path } => {
            let bytes = std::fs::read(&path).map_err(|e| KotobaError::Fetch {
                message: format!("failed to read {path}: {e}"),
                source: Some(Box::new(e)),
            })?;
            let filename = std::path::Path::new(&path)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload.pdf");
            knowledge.ingest.ingest_pdf(&bytes, filename).await?
        }
    };

    match outcome {
        IngestOutcome::Written { chunks_written } => {
            println!("added {chunks_written} chunks to the knowledge base");
        }
        IngestOutcome::NoContent => {
            println!("the document contained no extractable text");
        }
    }

    db.close().await?;
    Ok(())
}
