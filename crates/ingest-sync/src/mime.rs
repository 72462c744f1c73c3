/// Best-effort content type by normalized extension, matching the set of
/// formats the pipeline actually ingests. Unknown extensions fall back to
/// a generic octet stream rather than failing the upload.
pub fn content_type_for_extension(extension: &str) -> &'static str {
    match extension {
        ".pdf" => "application/pdf",
        ".docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ".xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ".txt" => "text/plain",
        ".rtf" => "application/rtf",
        ".epub" => "application/epub+zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extension_maps_to_specific_type() {
        assert_eq!(content_type_for_extension(".pdf"), "application/pdf");
    }

    #[test]
    fn unknown_extension_falls_back_to_octet_stream() {
        assert_eq!(content_type_for_extension(".weird"), "application/octet-stream");
    }
}
