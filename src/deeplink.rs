use crate::widget::{WidgetError, validate_phone_number};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use url::Url;

pub const WA_ME_BASE: &str = "https://wa.me";

/// Everything outside the RFC 3986 unreserved set is escaped, per UTF-8 byte.
pub const MESSAGE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub fn encode_message(message: &str) -> String {
    utf8_percent_encode(message, MESSAGE_ENCODE_SET).to_string()
}

/// Build `https://wa.me/<phone>?text=<message>`.
///
/// The phone number must already be a bare digit string. The `text` parameter
/// is always present, empty when there is no message.
pub fn deep_link(phone_number: &str, message: &str) -> Result<Url, WidgetError> {
    validate_phone_number(phone_number)?;
    let mut url = Url::parse(&format!("{WA_ME_BASE}/{phone_number}"))
        .map_err(|e| WidgetError::InvalidConfiguration(format!("deep link: {e}")))?;
    url.set_query(Some(&format!("text={}", encode_message(message))));
    Ok(url)
}

/// Read the pre-filled message back out of a deep link.
#[allow(dead_code)]
pub fn decode_text(url: &Url) -> Option<String> {
    let query = url.query()?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "text")
        .and_then(|(_, value)| percent_decode_str(value).decode_utf8().ok())
        .map(|text| text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_portuguese_greeting_per_utf8_byte() {
        let url = deep_link("5511999998888", "Olá! Gostaria de mais informações.").unwrap();
        assert_eq!(
            url.as_str(),
            "https://wa.me/5511999998888?text=Ol%C3%A1%21%20Gostaria%20de%20mais%20informa%C3%A7%C3%B5es."
        );
    }

    #[test]
    fn escapes_reserved_characters() {
        assert_eq!(encode_message("a+b&c=d?e#f/g"), "a%2Bb%26c%3Dd%3Fe%23f%2Fg");
        assert_eq!(encode_message("100% ok"), "100%25%20ok");
        assert_eq!(encode_message("keep-._~"), "keep-._~");
    }

    #[test]
    fn message_survives_decode() {
        let samples = [
            "hello",
            "Olá! Vim através do seu site e gostaria de mais informações sobre seus produtos/serviços.",
            "emoji 👋 and tabs\tand\nnewlines",
            "a=b&text=c",
            "+ plus + signs +",
        ];
        for message in samples {
            let url = deep_link("5531984466426", message).unwrap();
            assert_eq!(decode_text(&url).as_deref(), Some(message), "{url}");
        }
    }

    #[test]
    fn link_shape_matches_wa_me() {
        let url = deep_link("441234567890", "hi there").unwrap();
        let link = url.as_str();
        let rest = link.strip_prefix("https://wa.me/").expect("wa.me prefix");
        let (digits, text) = rest.split_once("?text=").expect("text query");
        assert!(!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()));
        assert!(!text.is_empty());
    }

    #[test]
    fn encoding_is_deterministic() {
        let first = deep_link("5511999998888", "Olá, tudo bem?").unwrap();
        let second = deep_link("5511999998888", "Olá, tudo bem?").unwrap();
        assert_eq!(first.as_str().as_bytes(), second.as_str().as_bytes());
    }

    #[test]
    fn empty_message_keeps_empty_text_param() {
        let url = deep_link("5511999998888", "").unwrap();
        assert_eq!(url.as_str(), "https://wa.me/5511999998888?text=");
        assert_eq!(decode_text(&url).as_deref(), Some(""));
    }

    #[test]
    fn rejects_invalid_phone() {
        assert!(deep_link("", "hi").is_err());
        assert!(deep_link("+55 11 99999-8888", "hi").is_err());
    }
}
