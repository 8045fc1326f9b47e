use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::percent_decode_str;
use snafu::{OptionExt, ResultExt};

use crate::fetch::fetcher::{FetchError, InvalidBase64Snafu, MalformedDataUrlSnafu};

/// Decodes an RFC 2397 `data:` URL into its payload bytes.
pub fn decode(url: &str) -> Result<Vec<u8>, FetchError> {
    let rest = url
        .get(..5)
        .filter(|scheme| scheme.eq_ignore_ascii_case("data:"))
        .map(|_| &url[5..])
        .context(MalformedDataUrlSnafu { url })?;
    let (header, payload) = rest.split_once(',').context(MalformedDataUrlSnafu { url })?;

    let bytes: Vec<u8> = percent_decode_str(payload).collect();
    let is_base64 = header
        .rsplit(';')
        .next()
        .is_some_and(|param| param.eq_ignore_ascii_case("base64"));
    if !is_base64 {
        return Ok(bytes);
    }

    let compact: Vec<u8> = bytes
        .into_iter()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD.decode(compact).context(InvalidBase64Snafu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("data:,", b"".as_slice())]
    #[case("data:,hello", b"hello".as_slice())]
    #[case("data:,hello%20world%0A", b"hello world\n".as_slice())]
    #[case("data:text/plain;charset=utf-8,caf%C3%A9", "café".as_bytes())]
    #[case("data:;base64,aGVsbG8=", b"hello".as_slice())]
    #[case("DATA:text/plain;BASE64,aGVs%0AbG8=", b"hello".as_slice())]
    fn decodes_payloads(#[case] url: &str, #[case] expected: &[u8]) {
        assert_eq!(decode(url).unwrap(), expected);
    }

    #[test]
    fn missing_comma_is_malformed() {
        assert!(matches!(
            decode("data:text/plain"),
            Err(FetchError::MalformedDataUrl { .. })
        ));
    }

    #[test]
    fn invalid_base64_is_reported() {
        assert!(matches!(
            decode("data:;base64,!!!"),
            Err(FetchError::InvalidBase64 { .. })
        ));
    }
}
