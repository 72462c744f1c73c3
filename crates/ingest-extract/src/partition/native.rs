//! Single-pass partitioning for formats that carry their own text layer:
//! word processor, presentation, spreadsheet, rich text, and e-book
//! documents, plus plain text. No OCR fallback applies here.

use std::path::Path;

use ingest_domain::{Element, ProcessingStrategy};
use tokio::fs;

use crate::error::ExtractError;
use crate::exec::run_with_timeout;

use super::{PartitionOutcome, PartitionerConfig};

fn text_to_elements(text: &str) -> Vec<Element> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|paragraph| Element {
            element_type: "NarrativeText".to_string(),
            text: paragraph.to_string(),
            page_number: None,
        })
        .collect()
}

pub async fn partition_native(
    path: &Path,
    extension: &str,
    config: &PartitionerConfig,
) -> Result<PartitionOutcome, ExtractError> {
    let text = if extension == ".txt" {
        fs::read_to_string(path).await?
    } else {
        let path_str = path.to_string_lossy().to_string();
        let out = run_with_timeout(
            &config.pandoc_binary,
            &[&path_str, "-t", "plain"],
            None,
            config.ocr_timeout,
        )
        .await?;
        if !out.success {
            return Err(ExtractError::PartitionerFailed {
                binary: config.pandoc_binary.clone(),
                message: "non-zero exit".to_string(),
            });
        }
        String::from_utf8_lossy(&out.stdout).to_string()
    };

    Ok(PartitionOutcome {
        elements: text_to_elements(&text),
        strategy: ProcessingStrategy::Native,
        page_count: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_plain_text_directly_without_shelling_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "Paragraph one.\n\nParagraph two.").unwrap();
        let outcome = partition_native(&path, ".txt", &PartitionerConfig::default()).await.unwrap();
        assert_eq!(outcome.elements.len(), 2);
        assert_eq!(outcome.strategy, ProcessingStrategy::Native);
    }
}
