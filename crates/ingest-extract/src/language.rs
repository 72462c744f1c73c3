//! Language hint derivation for OCR, matching the filename-hint convention
//! the ingest service has always used: an explicit 3-letter code bracketed
//! by `_`, `-`, or `.` wins; otherwise fall back to the bilingual default.

const LANG_CODES: &[(&str, &str)] = &[
    ("hun", "hun"),
    ("magyar", "hun"),
    ("eng", "eng"),
    ("english", "eng"),
    ("ces", "ces"),
    ("czech", "ces"),
    ("slk", "slk"),
    ("slovak", "slk"),
    ("pol", "pol"),
    ("polish", "pol"),
    ("deu", "deu"),
    ("german", "deu"),
    ("fra", "fra"),
    ("french", "fra"),
    ("spa", "spa"),
    ("spanish", "spa"),
    ("ita", "ita"),
    ("italian", "ita"),
    ("ron", "ron"),
    ("romanian", "ron"),
];

const DEFAULT_HINT: &str = "hun+eng";

/// Derive a Tesseract-style language hint (e.g. `"hun"`, `"hun+eng"`) from a
/// display name. Looks for a known code bracketed by `_`, `-`, or `.`
/// (`report_pol_2025.pdf` -> `pol`); falls back to the bilingual default.
pub fn language_hint(display_name: &str) -> String {
    let lower = display_name.to_ascii_lowercase();
    let separators = ['_', '-', '.'];

    for (token, code) in LANG_CODES {
        let mut search_from = 0;
        while let Some(rel) = lower[search_from..].find(token) {
            let start = search_from + rel;
            let end = start + token.len();
            let before_ok = start == 0 || separators.contains(&lower.as_bytes()[start - 1].into());
            let after_ok = lower.as_bytes().get(end).map(|&b| separators.contains(&(b as char))).unwrap_or(false);
            if before_ok && after_ok {
                return code.to_string();
            }
            search_from = start + 1;
        }
    }

    DEFAULT_HINT.to_string()
}

/// Translate a `+`-joined hint into the individual codes an OCR engine's
/// `--lang` / `languages=[...]` convention expects.
pub fn language_list(hint: &str) -> Vec<String> {
    hint.split('+').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_code_wins() {
        assert_eq!(language_hint("report_pol_2025.pdf"), "pol");
    }

    #[test]
    fn explicit_code_at_extension_boundary() {
        assert_eq!(language_hint("document_hun.pdf"), "hun");
    }

    #[test]
    fn no_hint_falls_back_to_default() {
        assert_eq!(language_hint("quarterly_report.pdf"), "hun+eng");
    }

    #[test]
    fn language_list_splits_on_plus() {
        assert_eq!(language_list("hun+eng"), vec!["hun", "eng"]);
        assert_eq!(language_list("eng"), vec!["eng"]);
    }

    #[test]
    fn substring_without_separators_does_not_match() {
        // "engine.pdf" contains "eng" but not bracketed by separators there
        assert_eq!(language_hint("engine_report.pdf"), "hun+eng");
    }
}
