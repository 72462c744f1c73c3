mod native;
mod pdf;

use std::path::Path;
use std::time::Duration;

use ingest_domain::{Element, ProcessingStrategy};

use crate::error::ExtractError;

/// Paths to the external tools the partitioner shells out to, plus the OCR
/// wall-clock ceiling. Mirrors `PipelineConfig`'s extraction-stage fields
/// without pulling `ingest-config` into this crate's dependency graph.
#[derive(Debug, Clone)]
pub struct PartitionerConfig {
    pub pdftotext_binary: String,
    pub tesseract_binary: String,
    pub pandoc_binary: String,
    pub ocr_timeout: Duration,
    pub min_chars_per_page: usize,
}

impl Default for PartitionerConfig {
    fn default() -> Self {
        Self {
            pdftotext_binary: "pdftotext".to_string(),
            tesseract_binary: "tesseract".to_string(),
            pandoc_binary: "pandoc".to_string(),
            ocr_timeout: Duration::from_secs(300),
            min_chars_per_page: 200,
        }
    }
}

pub struct PartitionOutcome {
    pub elements: Vec<Element>,
    pub strategy: ProcessingStrategy,
    pub page_count: Option<u32>,
}

/// Format-specific formats that have a single-pass, non-OCR partitioner.
const NATIVE_EXTENSIONS: &[&str] = &[".docx", ".doc", ".pptx", ".ppt", ".xlsx", ".txt", ".rtf", ".epub"];

pub fn is_native_format(extension: &str) -> bool {
    NATIVE_EXTENSIONS.contains(&extension)
}

/// Dispatch to the right partitioner for `extension`. `language_list` is
/// only consulted on the OCR path.
pub async fn partition_document(
    path: &Path,
    extension: &str,
    language_list: &[String],
    config: &PartitionerConfig,
) -> Result<PartitionOutcome, ExtractError> {
    if extension == ".pdf" {
        pdf::partition_pdf(path, language_list, config).await
    } else if is_native_format(extension) {
        native::partition_native(path, extension, config).await
    } else {
        // Unrecognized extensions still get a best-effort plain-text pass;
        // sync-stage extension filtering is what actually bounds this set.
        native::partition_native(path, extension, config).await
    }
}
