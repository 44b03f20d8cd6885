//! The structured output of an extraction.

use serde::{Deserialize, Serialize};

/// Identity fields decoded from an Aadhaar QR payload.
///
/// Fields that were absent or empty in the payload are `None` and are
/// omitted when serialised. `raw_data` always holds the decoded QR text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aadhaar_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub care_of: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub house: Option<String>,
    /// Locality (`loc` in the payload).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pincode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_office: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    /// Village / town / city.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vtc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,

    /// Decoded QR text, kept for diagnostics. Empty after
    /// [`IdentityRecord::without_raw_data`].
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_data: String,
}

impl IdentityRecord {
    /// Single-line postal address for display.
    ///
    /// Joins house, street, location, vtc, post office, district, state and
    /// pincode with `", "`, skipping blank parts.
    pub fn format_address(&self) -> String {
        [
            &self.house,
            &self.street,
            &self.location,
            &self.vtc,
            &self.post_office,
            &self.district,
            &self.state,
            &self.pincode,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }

    /// True when any address component is present.
    pub fn has_address(&self) -> bool {
        !self.format_address().is_empty()
    }

    /// Copy with the raw payload removed, for display or export.
    pub fn without_raw_data(&self) -> Self {
        Self {
            raw_data: String::new(),
            ..self.clone()
        }
    }
}
