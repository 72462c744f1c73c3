use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// S3-compatible user metadata values must be ASCII. Non-ASCII origin names
/// (drive item titles are frequently not) are percent-encoded on write and
/// decoded on read.
const METADATA_ENCODE_SET: &AsciiSet = &CONTROLS.add(b'%');

pub fn encode_metadata_value(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        utf8_percent_encode(value, METADATA_ENCODE_SET).to_string()
    }
}

pub fn decode_metadata_value(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_values_pass_through() {
        assert_eq!(encode_metadata_value("report.pdf"), "report.pdf");
    }

    #[test]
    fn non_ascii_round_trips() {
        let original = "Jelentés – Q3.pdf";
        let encoded = encode_metadata_value(original);
        assert!(encoded.is_ascii());
        assert_eq!(decode_metadata_value(&encoded), original);
    }
}
