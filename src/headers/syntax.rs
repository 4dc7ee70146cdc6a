//! Header name and value legality checks (RFC 7230 §3.2).
use crate::{Error, Result};

/// Validates a header field name.
///
/// ```text
/// field-name     = token
/// token          = 1*tchar
/// tchar          = "!" / "#" / "$" / "%" / "&" / "'" / "*"
///                / "+" / "-" / "." / "^" / "_" / "`" / "|" / "~"
///                / DIGIT / ALPHA
/// ```
pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_header("header name must not be empty"));
    }

    match name.bytes().position(|byte| !is_token_character(byte)) {
        None => Ok(()),
        Some(at) => Err(Error::invalid_header(format!(
            "header name {name:?} contains an illegal character at offset {at}"
        ))),
    }
}

/// Validates a header field value.
///
/// Allowed are HTAB, SP, visible ASCII and obs-text up to 0xFE. A CR is only
/// accepted as the start of an obs-fold, i.e. CRLF followed by SP or HTAB.
pub(crate) fn validate_value(name: &str, value: &str) -> Result<()> {
    let bytes = value.as_bytes();
    let mut at = 0;
    while at < bytes.len() {
        match bytes[at] {
            b'\r' if bytes.get(at + 1) == Some(&b'\n')
                && matches!(bytes.get(at + 2), Some(b' ' | b'\t')) =>
            {
                at += 3;
                continue;
            }
            byte if is_field_value_character(byte) => {}
            byte => {
                return Err(Error::invalid_header(format!(
                    "value of header {name:?} contains illegal byte 0x{byte:02X} at offset {at}"
                )))
            }
        }
        at += 1;
    }
    Ok(())
}

#[inline]
pub(crate) fn is_token_character(byte: u8) -> bool {
    matches!(
        byte,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.'
            | b'^' | b'_' | b'`' | b'|' | b'~'
            | b'0'..=b'9'
            | b'A'..=b'Z'
            | b'a'..=b'z'
    )
}

#[inline]
fn is_field_value_character(byte: u8) -> bool {
    matches!(byte, b'\t' | b' ' | 0x21..=0x7E | 0x80..=0xFE)
}

/// Strips leading and trailing SP / HTAB.
pub(crate) fn trim_value(value: &str) -> &str {
    value.trim_matches(|c| c == ' ' || c == '\t')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Content-Type")]
    #[case("x-custom_header.v2")]
    #[case("!#$%&'*+-.^_`|~")]
    fn accepts_tokens(#[case] name: &str) {
        assert!(validate_name(name).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("bad header")]
    #[case("colon:")]
    #[case("tab\tname")]
    #[case("quote\"")]
    #[case("brace{")]
    #[case("caf\u{e9}")]
    fn rejects_non_tokens(#[case] name: &str) {
        assert!(matches!(validate_name(name), Err(Error::InvalidHeader(_))));
    }

    #[rstest]
    #[case("plain value")]
    #[case("tab\tseparated")]
    #[case("folded\r\n continuation")]
    #[case("folded\r\n\tcontinuation")]
    #[case("latin \u{e9}")]
    #[case("")]
    fn accepts_values(#[case] value: &str) {
        assert!(validate_value("X", value).is_ok());
    }

    #[rstest]
    #[case("bad\r\nvalue")]
    #[case("bare\nlf")]
    #[case("bare\rcr")]
    #[case("trailing\r\n")]
    #[case("nul\0byte")]
    #[case("del\x7f")]
    #[case("bell\x07")]
    fn rejects_values(#[case] value: &str) {
        assert!(matches!(
            validate_value("X", value),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn trims_spaces_and_tabs_only() {
        assert_eq!(trim_value(" \t value \t"), "value");
        assert_eq!(trim_value("\r\n value"), "\r\n value");
    }
}
