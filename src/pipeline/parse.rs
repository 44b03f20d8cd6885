//! Payload parsing: decoded QR text → [`IdentityRecord`].
//!
//! The classic e-Aadhaar QR carries an attribute list such as
//!
//! ```text
//! <PrintLetterBarcodeData uid="123456789012" name="Ramesh" gender="M" dob="01-01-1990" .../>
//! ```
//!
//! Some issuers base64-encode the free-text fields (name, address parts), so
//! those go through [`decode_value`]; numeric and coded fields are taken
//! verbatim.

use crate::error::ParseError;
use crate::record::IdentityRecord;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

/// Payload keys, in record order.
const FIELD_KEYS: [&str; 15] = [
    "name", "uid", "dob", "gender", "co", "dist", "house", "loc", "pc", "po", "state", "street",
    "vtc", "email", "mobile",
];

// `\b` keeps `dist` from matching inside `subdist`.
static FIELD_PATTERNS: Lazy<HashMap<&'static str, Regex>> = Lazy::new(|| {
    FIELD_KEYS
        .iter()
        .map(|&key| {
            let re = Regex::new(&format!(r#"(?i)\b{key}="([^"]*)""#)).unwrap();
            (key, re)
        })
        .collect()
});

static RE_ANY_ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[A-Za-z_][A-Za-z0-9_]*="[^"]*""#).unwrap());

// Accepts padded and unpadded input alike.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Parse decoded QR text into an [`IdentityRecord`].
///
/// Missing fields are simply `None`. Only text that is not an attribute
/// payload at all is rejected.
pub fn parse_payload(payload: &str) -> Result<IdentityRecord, ParseError> {
    validate_payload(payload)?;
    debug!("QR data found, length: {}", payload.len());

    let verbatim = |key| non_empty(extract_field(key, payload).to_string());
    let decoded = |key| non_empty(decode_value(extract_field(key, payload)));

    Ok(IdentityRecord {
        name: decoded("name"),
        aadhaar_number: verbatim("uid"),
        date_of_birth: verbatim("dob"),
        gender: verbatim("gender"),
        care_of: decoded("co"),
        district: decoded("dist"),
        house: decoded("house"),
        location: decoded("loc"),
        pincode: verbatim("pc"),
        post_office: decoded("po"),
        state: decoded("state"),
        street: decoded("street"),
        vtc: decoded("vtc"),
        email: verbatim("email"),
        mobile: verbatim("mobile"),
        raw_data: payload.to_string(),
    })
}

fn validate_payload(payload: &str) -> Result<(), ParseError> {
    if payload.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    if let Some((offset, c)) = payload
        .char_indices()
        .find(|&(_, c)| c.is_control() && !matches!(c, '\t' | '\n' | '\r'))
    {
        return Err(ParseError::ControlCharacter {
            code: c as u32,
            offset,
        });
    }
    if !RE_ANY_ATTRIBUTE.is_match(payload) {
        return Err(ParseError::NoAttributes {
            len: payload.chars().count(),
        });
    }
    Ok(())
}

/// Case-insensitive `key="…"` lookup; empty when the key is absent.
fn extract_field<'a>(key: &str, payload: &'a str) -> &'a str {
    FIELD_PATTERNS
        .get(key)
        .and_then(|re| re.captures(payload))
        .and_then(|caps| caps.get(1))
        .map_or("", |m| m.as_str())
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Best-effort base64 decode of a free-text field.
///
/// Returns the decoded text when it is valid UTF-8 made only of visible
/// characters (`U+0020..=U+007E` or `U+00A0` and above); otherwise returns
/// `value` unchanged.
///
/// This is a heuristic: a plain value that happens to be valid base64 of
/// printable text (e.g. `"YWJj"`) is decoded.
pub fn decode_value(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }

    let Ok(bytes) = LENIENT_BASE64.decode(value) else {
        return value.to_string();
    };

    match String::from_utf8(bytes) {
        Ok(text) if !text.is_empty() && text.chars().all(is_visible) => text,
        _ => value.to_string(),
    }
}

fn is_visible(c: char) -> bool {
    (' '..='~').contains(&c) || c >= '\u{00A0}'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_concrete_scenario() {
        let payload = r#"name="UmFtZXNo"&uid="123456789012"&dob="01-01-1990"&gender="M""#;
        let record = parse_payload(payload).unwrap();
        assert_eq!(record.name.as_deref(), Some("Ramesh"));
        assert_eq!(record.aadhaar_number.as_deref(), Some("123456789012"));
        assert_eq!(record.date_of_birth.as_deref(), Some("01-01-1990"));
        assert_eq!(record.gender.as_deref(), Some("M"));
        assert_eq!(record.raw_data, payload);
        assert!(record.care_of.is_none());
        assert!(record.email.is_none());
    }

    #[test]
    fn parses_xml_style_payload_case_insensitively() {
        let payload = r#"<?xml version="1.0" encoding="UTF-8"?>
<PrintLetterBarcodeData UID="999988887777" Name="Sita Devi" gender="F" yob="1985" co="W/O: Ram" house="14B" street="MG Road" loc="Camp" vtc="Pune" po="Pune GPO" dist="Pune" subdist="Haveli" state="Maharashtra" pc="411001" dob="12/03/1985"/>"#;
        let record = parse_payload(payload).unwrap();
        assert_eq!(record.aadhaar_number.as_deref(), Some("999988887777"));
        assert_eq!(record.name.as_deref(), Some("Sita Devi"));
        assert_eq!(record.care_of.as_deref(), Some("W/O: Ram"));
        assert_eq!(record.district.as_deref(), Some("Pune"));
        assert_eq!(record.pincode.as_deref(), Some("411001"));
        assert_eq!(
            record.format_address(),
            "14B, MG Road, Camp, Pune, Pune GPO, Pune, Maharashtra, 411001"
        );
    }

    #[test]
    fn dist_does_not_match_subdist() {
        let record = parse_payload(r#"subdist="Haveli" uid="1""#).unwrap();
        assert!(record.district.is_none());
    }

    #[test]
    fn empty_attributes_are_omitted() {
        let record = parse_payload(r#"uid="123" email="" mobile="""#).unwrap();
        assert_eq!(record.aadhaar_number.as_deref(), Some("123"));
        assert!(record.email.is_none());
        assert!(record.mobile.is_none());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn unknown_attributes_only_is_not_an_error() {
        let record = parse_payload(r#"foo="bar""#).unwrap();
        assert_eq!(record, IdentityRecord {
            raw_data: r#"foo="bar""#.into(),
            ..Default::default()
        });
    }

    #[test]
    fn rejects_text_without_attributes() {
        let secure_qr = "2374971804270526477833002468783965837992554564899874087591661303561346432389832047870524302186901344489362368642972767716416349990805756094923115719687656090691368051627957878187788907419297818953295185555346288";
        assert!(matches!(
            parse_payload(secure_qr),
            Err(ParseError::NoAttributes { .. })
        ));
        assert_eq!(parse_payload("   "), Err(ParseError::Empty));
    }

    #[test]
    fn rejects_control_characters() {
        let err = parse_payload("uid=\"1\"\u{0}").unwrap_err();
        assert_eq!(err, ParseError::ControlCharacter { code: 0, offset: 7 });
        // Line breaks are ordinary whitespace.
        assert!(parse_payload("uid=\"1\"\r\n").is_ok());
    }

    #[test]
    fn numeric_fields_are_not_decoded() {
        // "MTIz" is base64 for "123" but uid is verbatim.
        let record = parse_payload(r#"uid="MTIz" name="MTIz""#).unwrap();
        assert_eq!(record.aadhaar_number.as_deref(), Some("MTIz"));
        assert_eq!(record.name.as_deref(), Some("123"));
    }

    #[test]
    fn decode_value_accepts_unpadded_base64() {
        assert_eq!(decode_value("UmFtZXNo"), "Ramesh");
        assert_eq!(decode_value("U2l0YQ"), "Sita");
        assert_eq!(decode_value("U2l0YQ=="), "Sita");
        // Devanagari survives the visible-character check.
        assert_eq!(decode_value("4KSw4KS+4KSu"), "राम");
    }

    #[test]
    fn decode_value_passes_through_non_base64() {
        for raw in ["Ramesh", "MG Road", "S/O: Ram", "Pune", "411001", "Delhi"] {
            assert_eq!(decode_value(raw), raw, "{raw} should pass through");
        }
        assert_eq!(decode_value(""), "");
    }

    #[test]
    fn decode_value_is_idempotent_on_pass_through() {
        for raw in ["MG Road", "Pune", "W/O: Ram", "14B"] {
            let once = decode_value(raw);
            assert_eq!(decode_value(&once), raw);
        }
    }

    #[test]
    fn decode_value_rejects_binary_output() {
        // Valid base64, but decodes to control bytes.
        assert_eq!(decode_value("AAECAw=="), "AAECAw==");
    }

    // The printable check is a heuristic; these document where it misfires.
    #[test]
    fn decode_value_fuzzy_boundary() {
        // A literal that is also valid base64 of printable text gets decoded.
        assert_eq!(decode_value("YWJj"), "abc");
        // Decoding is applied once per parse; a doubly-encoded value is
        // decoded one level only.
        assert_eq!(decode_value("VW1GdFpYTm8="), "UmFtZXNo");
    }
}
