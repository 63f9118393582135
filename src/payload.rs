//! Payload templates.
//!
//! Maps a semantic content type (URL, Wi-Fi, email, contact card, SMS,
//! calendar event) plus its field values to the text that gets encoded into
//! the QR matrix. Building a payload never fails: missing fields render as
//! empty strings, and an empty URL falls back to [`FALLBACK_URL`].

use serde::{Deserialize, Serialize};

/// URL used when the URL field is left empty.
pub const FALLBACK_URL: &str = "https://example.com";

/// Security mode used when a Wi-Fi payload doesn't name one.
pub const DEFAULT_WIFI_SECURITY: &str = "WPA";

/// Content type of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    #[default]
    Url,
    Wifi,
    Email,
    Vcard,
    Sms,
    Event,
}

impl PayloadKind {
    /// Short label used on the command line and in history files.
    pub fn label(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Wifi => "wifi",
            Self::Email => "email",
            Self::Vcard => "vcard",
            Self::Sms => "sms",
            Self::Event => "event",
        }
    }

    /// Get all payload kinds.
    pub fn all() -> &'static [Self] {
        &[
            Self::Url,
            Self::Wifi,
            Self::Email,
            Self::Vcard,
            Self::Sms,
            Self::Event,
        ]
    }
}

impl std::str::FromStr for PayloadKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "url" | "link" => Ok(Self::Url),
            "wifi" | "wi-fi" => Ok(Self::Wifi),
            "email" | "mail" => Ok(Self::Email),
            "vcard" | "contact" => Ok(Self::Vcard),
            "sms" | "text" => Ok(Self::Sms),
            "event" | "vevent" | "calendar" => Ok(Self::Event),
            _ => Err(format!("Unknown payload type: {}", s)),
        }
    }
}

impl std::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Field values collected for a payload.
///
/// Only the fields relevant to the chosen [`PayloadKind`] are read; the rest
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadFields {
    // url
    pub url: Option<String>,

    // wifi
    pub ssid: Option<String>,
    pub password: Option<String>,
    pub security: Option<String>,
    #[serde(default)]
    pub hidden: bool,

    // email
    pub to: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,

    // vcard
    pub name: Option<String>,
    pub organization: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,

    // sms (phone shared with vcard)
    pub message: Option<String>,

    // event
    pub title: Option<String>,
    pub location: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub description: Option<String>,
}

impl PayloadFields {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn wifi(
        ssid: impl Into<String>,
        password: impl Into<String>,
        security: impl Into<String>,
    ) -> Self {
        Self {
            ssid: Some(ssid.into()),
            password: Some(password.into()),
            security: Some(security.into()),
            ..Default::default()
        }
    }
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

/// Build the payload text for `kind` from `fields`.
pub fn build_payload(kind: PayloadKind, fields: &PayloadFields) -> String {
    match kind {
        PayloadKind::Url => {
            let url = field(&fields.url).trim();
            if url.is_empty() {
                FALLBACK_URL.to_string()
            } else {
                url.to_string()
            }
        }
        PayloadKind::Wifi => {
            let security = match field(&fields.security).trim() {
                "" => DEFAULT_WIFI_SECURITY,
                s => s,
            };
            format!(
                "WIFI:T:{};S:{};P:{};H:{};;",
                security,
                field(&fields.ssid),
                field(&fields.password),
                fields.hidden
            )
        }
        PayloadKind::Email => format!(
            "mailto:{}?subject={}&body={}",
            field(&fields.to),
            urlencoding::encode(field(&fields.subject)),
            urlencoding::encode(field(&fields.body))
        ),
        PayloadKind::Vcard => format!(
            "BEGIN:VCARD\nVERSION:3.0\nFN:{}\nORG:{}\nTEL:{}\nEMAIL:{}\nURL:{}\nEND:VCARD",
            field(&fields.name),
            field(&fields.organization),
            field(&fields.phone),
            field(&fields.email),
            field(&fields.website)
        ),
        PayloadKind::Sms => format!(
            "sms:{}?body={}",
            field(&fields.phone),
            urlencoding::encode(field(&fields.message))
        ),
        PayloadKind::Event => format!(
            "BEGIN:VEVENT\nSUMMARY:{}\nLOCATION:{}\nDTSTART:{}\nDTEND:{}\nDESCRIPTION:{}\nEND:VEVENT",
            field(&fields.title),
            field(&fields.location),
            calendar_stamp(field(&fields.start)),
            calendar_stamp(field(&fields.end)),
            field(&fields.description)
        ),
    }
}

/// Compact `YYYY-MM-DDTHH:MM[:SS]` into the iCalendar `YYYYMMDDTHHMMSS` form.
///
/// Anything that doesn't look like a local datetime is passed through as-is.
pub fn calendar_stamp(input: &str) -> String {
    let trimmed = input.trim();
    let compact: String = trimmed.chars().filter(|c| *c != '-' && *c != ':').collect();
    let bytes = compact.as_bytes();
    let shaped = bytes.len() >= 13
        && bytes[8] == b'T'
        && bytes[..8].iter().all(u8::is_ascii_digit)
        && bytes[9..].iter().all(u8::is_ascii_digit);
    if !shaped {
        return trimmed.to_string();
    }
    match compact.len() {
        13 => format!("{compact}00"),
        15 => compact,
        _ => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wifi_template_matches_literal() {
        let fields = PayloadFields::wifi("Home", "secret", "WPA");
        assert_eq!(
            build_payload(PayloadKind::Wifi, &fields),
            "WIFI:T:WPA;S:Home;P:secret;H:false;;"
        );
    }

    #[test]
    fn test_wifi_hidden_and_default_security() {
        let fields = PayloadFields {
            ssid: Some("Attic".into()),
            hidden: true,
            ..Default::default()
        };
        assert_eq!(
            build_payload(PayloadKind::Wifi, &fields),
            "WIFI:T:WPA;S:Attic;P:;H:true;;"
        );
    }

    #[test]
    fn test_url_passthrough_and_fallback() {
        let fields = PayloadFields::url("https://rust-lang.org");
        assert_eq!(
            build_payload(PayloadKind::Url, &fields),
            "https://rust-lang.org"
        );
        assert_eq!(
            build_payload(PayloadKind::Url, &PayloadFields::default()),
            FALLBACK_URL
        );
        assert_eq!(
            build_payload(PayloadKind::Url, &PayloadFields::url("   ")),
            FALLBACK_URL
        );
    }

    #[test]
    fn test_email_encodes_subject_and_body() {
        let fields = PayloadFields {
            to: Some("ada@example.com".into()),
            subject: Some("Hello there".into()),
            body: Some("a&b".into()),
            ..Default::default()
        };
        assert_eq!(
            build_payload(PayloadKind::Email, &fields),
            "mailto:ada@example.com?subject=Hello%20there&body=a%26b"
        );
    }

    #[test]
    fn test_vcard_block() {
        let fields = PayloadFields {
            name: Some("Ada Lovelace".into()),
            organization: Some("Analytical Engines".into()),
            phone: Some("+44 20 0000".into()),
            email: Some("ada@example.com".into()),
            website: Some("https://ada.example".into()),
            ..Default::default()
        };
        assert_eq!(
            build_payload(PayloadKind::Vcard, &fields),
            "BEGIN:VCARD\nVERSION:3.0\nFN:Ada Lovelace\nORG:Analytical Engines\nTEL:+44 20 0000\nEMAIL:ada@example.com\nURL:https://ada.example\nEND:VCARD"
        );
    }

    #[test]
    fn test_vcard_missing_fields_are_empty() {
        let out = build_payload(PayloadKind::Vcard, &PayloadFields::default());
        assert_eq!(
            out,
            "BEGIN:VCARD\nVERSION:3.0\nFN:\nORG:\nTEL:\nEMAIL:\nURL:\nEND:VCARD"
        );
    }

    #[test]
    fn test_sms_uri() {
        let fields = PayloadFields {
            phone: Some("+15550100".into()),
            message: Some("on my way".into()),
            ..Default::default()
        };
        assert_eq!(
            build_payload(PayloadKind::Sms, &fields),
            "sms:+15550100?body=on%20my%20way"
        );
    }

    #[test]
    fn test_event_block_compacts_times() {
        let fields = PayloadFields {
            title: Some("Launch".into()),
            location: Some("Room 4".into()),
            start: Some("2024-05-01T10:00".into()),
            end: Some("2024-05-01T11:30:15".into()),
            description: Some("Bring snacks".into()),
            ..Default::default()
        };
        assert_eq!(
            build_payload(PayloadKind::Event, &fields),
            "BEGIN:VEVENT\nSUMMARY:Launch\nLOCATION:Room 4\nDTSTART:20240501T100000\nDTEND:20240501T113015\nDESCRIPTION:Bring snacks\nEND:VEVENT"
        );
    }

    #[test]
    fn test_calendar_stamp_passthrough() {
        assert_eq!(calendar_stamp(""), "");
        assert_eq!(calendar_stamp("tomorrow"), "tomorrow");
        assert_eq!(calendar_stamp("20240501T100000"), "20240501T100000");
    }

    #[test]
    fn test_kind_from_str_aliases() {
        assert_eq!("WiFi".parse::<PayloadKind>().unwrap(), PayloadKind::Wifi);
        assert_eq!("contact".parse::<PayloadKind>().unwrap(), PayloadKind::Vcard);
        assert_eq!("calendar".parse::<PayloadKind>().unwrap(), PayloadKind::Event);
        assert!("fax".parse::<PayloadKind>().is_err());
    }

    #[test]
    fn test_kind_roundtrips_through_label() {
        for kind in PayloadKind::all() {
            assert_eq!(kind.label().parse::<PayloadKind>().unwrap(), *kind);
        }
    }
}
