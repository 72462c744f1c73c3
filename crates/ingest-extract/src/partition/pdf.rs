//! Smart PDF partitioning: a cheap layout pass first, OCR only when the
//! cheap pass comes back text-sparse (scanned pages, image-only content).

use std::path::Path;

use ingest_domain::{Element, ProcessingStrategy};

use crate::error::ExtractError;
use crate::exec::run_with_timeout;

use super::{PartitionOutcome, PartitionerConfig};

const PAGE_BREAK: char = '\u{0c}'; // form feed, pdftotext's page separator

async fn fast_pass(path: &Path, config: &PartitionerConfig) -> Result<(Vec<Element>, u32), ExtractError> {
    let path_str = path.to_string_lossy().to_string();
    let out = run_with_timeout(
        &config.pdftotext_binary,
        &["-layout", &path_str, "-"],
        None,
        config.ocr_timeout,
    )
    .await?;

    if !out.success {
        return Err(ExtractError::PartitionerFailed {
            binary: config.pdftotext_binary.clone(),
            message: "non-zero exit".to_string(),
        });
    }

    let text = String::from_utf8_lossy(&out.stdout);
    let pages: Vec<&str> = text.split(PAGE_BREAK).collect();
    let page_count = pages.len().max(1) as u32;

    let elements = text_to_elements(&text);
    Ok((elements, page_count))
}

async fn ocr_pass(path: &Path, languages: &[String], config: &PartitionerConfig) -> Result<Vec<Element>, ExtractError> {
    let path_str = path.to_string_lossy().to_string();
    let lang_arg = languages.join("+");
    let out = run_with_timeout(
        &config.tesseract_binary,
        &[&path_str, "stdout", "-l", &lang_arg],
        None,
        config.ocr_timeout,
    )
    .await?;

    if !out.success {
        return Err(ExtractError::PartitionerFailed {
            binary: config.tesseract_binary.clone(),
            message: "non-zero exit".to_string(),
        });
    }

    let text = String::from_utf8_lossy(&out.stdout);
    Ok(text_to_elements(&text))
}

fn text_to_elements(text: &str) -> Vec<Element> {
    text.split(PAGE_BREAK)
        .enumerate()
        .flat_map(|(page_idx, page)| {
            page.split("\n\n")
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(move |paragraph| Element {
                    element_type: "NarrativeText".to_string(),
                    text: paragraph.to_string(),
                    page_number: Some(page_idx as u32 + 1),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub async fn partition_pdf(
    path: &Path,
    languages: &[String],
    config: &PartitionerConfig,
) -> Result<PartitionOutcome, ExtractError> {
    let (fast_elements, pages) = fast_pass(path, config).await?;
    let total_chars: usize = fast_elements.iter().map(|e| e.text.len()).sum();
    let chars_per_page = total_chars / pages.max(1) as usize;

    if chars_per_page >= config.min_chars_per_page {
        return Ok(PartitionOutcome {
            elements: fast_elements,
            strategy: ProcessingStrategy::Fast,
            page_count: Some(pages),
        });
    }

    match ocr_pass(path, languages, config).await {
        Ok(elements) => Ok(PartitionOutcome { elements, strategy: ProcessingStrategy::Ocr, page_count: Some(pages) }),
        Err(ExtractError::Timeout(_)) => {
            tracing::warn!("OCR timed out after {:?}, falling back to fast extraction", config.ocr_timeout);
            Ok(PartitionOutcome { elements: fast_elements, strategy: ProcessingStrategy::FastFallback, page_count: Some(pages) })
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_to_elements_splits_paragraphs_and_tracks_pages() {
        let text = "Para one.\n\nPara two.\u{0c}Page two para.";
        let elements = text_to_elements(text);
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0].page_number, Some(1));
        assert_eq!(elements[2].page_number, Some(2));
    }
}
