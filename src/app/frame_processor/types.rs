// SPDX-License-Identifier: GPL-3.0-only

//! Core types for decode results
//!
//! These types represent what the decoders found and how the result panel
//! offers to act on it.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Barcode symbology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeFormat {
    QrCode,
    Aztec,
    DataMatrix,
    /// Stacked linear symbology
    Pdf417,
    Ean8,
    Ean13,
    UpcA,
    UpcE,
    Code39,
    Code93,
    Code128,
    Codabar,
    /// Interleaved 2 of 5
    Itf,
}

impl BarcodeFormat {
    /// Every supported format
    pub const ALL: [BarcodeFormat; 13] = [
        BarcodeFormat::QrCode,
        BarcodeFormat::Aztec,
        BarcodeFormat::DataMatrix,
        BarcodeFormat::Pdf417,
        BarcodeFormat::Ean8,
        BarcodeFormat::Ean13,
        BarcodeFormat::UpcA,
        BarcodeFormat::UpcE,
        BarcodeFormat::Code39,
        BarcodeFormat::Code93,
        BarcodeFormat::Code128,
        BarcodeFormat::Codabar,
        BarcodeFormat::Itf,
    ];

    /// Formats tried on picked images unless configured otherwise
    pub const STILL_IMAGE_DEFAULT: [BarcodeFormat; 5] = [
        BarcodeFormat::Codabar,
        BarcodeFormat::Ean8,
        BarcodeFormat::Ean13,
        BarcodeFormat::Pdf417,
        BarcodeFormat::QrCode,
    ];

    /// Get display name for the format
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::QrCode => "QR Code",
            Self::Aztec => "Aztec",
            Self::DataMatrix => "Data Matrix",
            Self::Pdf417 => "PDF417",
            Self::Ean8 => "EAN-8",
            Self::Ean13 => "EAN-13",
            Self::UpcA => "UPC-A",
            Self::UpcE => "UPC-E",
            Self::Code39 => "Code 39",
            Self::Code93 => "Code 93",
            Self::Code128 => "Code 128",
            Self::Codabar => "Codabar",
            Self::Itf => "ITF",
        }
    }

    /// Short machine name, as used in the config file and on the command line
    pub fn id(&self) -> &'static str {
        match self {
            Self::QrCode => "qr_code",
            Self::Aztec => "aztec",
            Self::DataMatrix => "data_matrix",
            Self::Pdf417 => "pdf417",
            Self::Ean8 => "ean8",
            Self::Ean13 => "ean13",
            Self::UpcA => "upc_a",
            Self::UpcE => "upc_e",
            Self::Code39 => "code39",
            Self::Code93 => "code93",
            Self::Code128 => "code128",
            Self::Codabar => "codabar",
            Self::Itf => "itf",
        }
    }
}

impl std::fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for BarcodeFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        let wanted = match wanted.as_str() {
            "qr" => "qrcode",
            other => other,
        };

        Self::ALL
            .into_iter()
            .find(|format| format.id().replace('_', "") == wanted)
            .ok_or_else(|| format!("unknown barcode format '{}'", s))
    }
}

/// A single decoded symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBarcode {
    pub format: BarcodeFormat,
    /// Raw payload text
    pub text: String,
}

impl DecodedBarcode {
    pub fn new(format: BarcodeFormat, text: impl Into<String>) -> Self {
        Self {
            format,
            text: text.into(),
        }
    }

    /// Parsed action based on content type
    pub fn action(&self) -> ContentAction {
        ContentAction::parse(&self.text)
    }
}

/// WiFi security type parsed from QR code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WifiSecurity {
    /// No security (open network)
    None,
    /// WEP security (legacy, insecure)
    Wep,
    /// WPA/WPA2 Personal
    Wpa,
    /// WPA2 Enterprise
    Wpa2Enterprise,
    /// WPA3
    Wpa3,
}

impl WifiSecurity {
    /// Parse security type from WiFi QR code string
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "WEP" => Self::Wep,
            "WPA" | "WPA2" => Self::Wpa,
            "WPA2-EAP" | "WPA3-EAP" => Self::Wpa2Enterprise,
            "WPA3" | "SAE" => Self::Wpa3,
            "NOPASS" | "" => Self::None,
            _ => Self::Wpa,
        }
    }

    /// Get display name for the security type
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::None => "Open",
            Self::Wep => "WEP",
            Self::Wpa => "WPA/WPA2",
            Self::Wpa2Enterprise => "Enterprise",
            Self::Wpa3 => "WPA3",
        }
    }
}

/// What a decoded payload is, and what can be done with it
///
/// Barcodes can contain various types of data. Product codes are always
/// plain text; QR and other 2D codes often carry URIs or structured records.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentAction {
    /// URL that can be opened in a browser
    Url(String),

    /// WiFi network credentials
    Wifi {
        /// Network name (SSID)
        ssid: String,
        /// Network password (None for open networks)
        password: Option<String>,
        /// Security type
        security: WifiSecurity,
        /// Hidden network flag
        hidden: bool,
    },

    /// Plain text that can be copied to clipboard
    Text(String),

    /// Phone number (tel: URI)
    Phone(String),

    /// Email address (mailto: URI)
    Email {
        address: String,
        subject: Option<String>,
        body: Option<String>,
    },

    /// SMS message (sms: or smsto: URI)
    Sms {
        number: String,
        message: Option<String>,
    },

    /// Geographic location (geo: URI)
    Location {
        latitude: f64,
        longitude: f64,
        label: Option<String>,
    },

    /// vCard contact information
    Contact(String),

    /// Calendar event (VCALENDAR)
    Event(String),
}

impl ContentAction {
    /// Classify decoded content
    ///
    /// Falls back to `Text` for unrecognized formats.
    pub fn parse(content: &str) -> Self {
        let trimmed = content.trim();

        // WIFI:S:<ssid>;T:<security>;P:<password>;;
        if trimmed.starts_with("WIFI:") {
            return Self::parse_wifi(trimmed);
        }

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Self::Url(trimmed.to_string());
        }

        if let Some(number) = trimmed.strip_prefix("tel:") {
            return Self::Phone(number.to_string());
        }

        if let Some(rest) = trimmed.strip_prefix("mailto:") {
            return Self::parse_mailto(rest);
        }

        if let Some(rest) = trimmed
            .strip_prefix("sms:")
            .or_else(|| trimmed.strip_prefix("smsto:"))
        {
            return Self::parse_sms(rest);
        }

        if let Some(rest) = trimmed.strip_prefix("geo:")
            && let Some(loc) = Self::parse_geo(rest)
        {
            return loc;
        }

        if trimmed.starts_with("BEGIN:VCARD") {
            return Self::Contact(trimmed.to_string());
        }

        if trimmed.starts_with("BEGIN:VCALENDAR") || trimmed.starts_with("BEGIN:VEVENT") {
            return Self::Event(trimmed.to_string());
        }

        // Bare domain names
        if trimmed.contains('.')
            && !trimmed.contains(' ')
            && trimmed.len() < 256
            && (trimmed.starts_with("www.")
                || trimmed.ends_with(".com")
                || trimmed.ends_with(".org")
                || trimmed.ends_with(".net")
                || trimmed.ends_with(".io"))
        {
            return Self::Url(format!("https://{}", trimmed));
        }

        Self::Text(trimmed.to_string())
    }

    fn parse_wifi(content: &str) -> Self {
        let mut ssid = String::new();
        let mut password = None;
        let mut security = WifiSecurity::None;
        let mut hidden = false;

        let content = content.strip_prefix("WIFI:").unwrap_or(content);
        let content = content.trim_end_matches(';');

        // T:WPA;S:network;P:password;H:true
        for part in content.split(';') {
            if let Some((key, value)) = part.split_once(':') {
                let value = value
                    .replace("\\;", ";")
                    .replace("\\:", ":")
                    .replace("\\\\", "\\")
                    .replace("\\,", ",");

                match key {
                    "S" => ssid = value,
                    "P" => password = Some(value),
                    "T" => security = WifiSecurity::parse(&value),
                    "H" => hidden = value.eq_ignore_ascii_case("true"),
                    _ => {}
                }
            }
        }

        Self::Wifi {
            ssid,
            password,
            security,
            hidden,
        }
    }

    fn parse_mailto(content: &str) -> Self {
        let (address, params) = content.split_once('?').unwrap_or((content, ""));

        let mut subject = None;
        let mut body = None;

        for (key, value) in query_pairs(params) {
            match key.to_lowercase().as_str() {
                "subject" => subject = Some(value),
                "body" => body = Some(value),
                _ => {}
            }
        }

        Self::Email {
            address: address.to_string(),
            subject,
            body,
        }
    }

    fn parse_sms(content: &str) -> Self {
        let (number, params) = content.split_once('?').unwrap_or((content, ""));
        let message = query_pairs(params)
            .find(|(key, _)| key.eq_ignore_ascii_case("body"))
            .map(|(_, value)| value);

        Self::Sms {
            number: number.to_string(),
            message,
        }
    }

    fn parse_geo(content: &str) -> Option<Self> {
        let (coords, params) = content.split_once('?').unwrap_or((content, ""));

        let mut parts = coords.split(',');
        let latitude = parts.next()?.parse::<f64>().ok()?;
        let longitude = parts.next()?.parse::<f64>().ok()?;

        let label = query_pairs(params)
            .find(|(key, _)| *key == "q" || *key == "label")
            .map(|(_, value)| value);

        Some(Self::Location {
            latitude,
            longitude,
            label,
        })
    }

    /// Short description of the content kind, shown above the payload
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Url(_) => "Link",
            Self::Wifi { .. } => "WiFi network",
            Self::Text(_) => "Text",
            Self::Phone(_) => "Phone number",
            Self::Email { .. } => "Email",
            Self::Sms { .. } => "SMS",
            Self::Location { .. } => "Location",
            Self::Contact(_) => "Contact",
            Self::Event(_) => "Event",
        }
    }

    /// Labelled fields shown under the raw payload
    pub fn details(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Wifi {
                ssid,
                password,
                security,
                hidden,
            } => {
                let mut rows = vec![
                    ("Network", ssid.clone()),
                    ("Security", security.display_name().to_string()),
                ];
                rows.extend(password.clone().map(|p| ("Password", p)));
                if *hidden {
                    rows.push(("Hidden", "yes".to_string()));
                }
                rows
            }
            Self::Email {
                address,
                subject,
                body,
            } => {
                let mut rows = vec![("To", address.clone())];
                rows.extend(subject.clone().map(|s| ("Subject", s)));
                rows.extend(body.clone().map(|b| ("Body", b)));
                rows
            }
            Self::Sms { number, message } => {
                let mut rows = vec![("To", number.clone())];
                rows.extend(message.clone().map(|m| ("Message", m)));
                rows
            }
            Self::Location {
                latitude,
                longitude,
                label,
            } => {
                let mut rows = vec![("Coordinates", format!("{}, {}", latitude, longitude))];
                rows.extend(label.clone().map(|l| ("Label", l)));
                rows
            }
            Self::Url(_) | Self::Text(_) | Self::Phone(_) | Self::Contact(_) | Self::Event(_) => {
                Vec::new()
            }
        }
    }

    /// URI handed to the desktop opener, if the content has one
    pub fn open_target(&self) -> Option<String> {
        match self {
            Self::Url(url) => Some(url.clone()),
            Self::Phone(number) => Some(format!("tel:{}", number)),
            Self::Email { address, .. } => Some(format!("mailto:{}", address)),
            Self::Sms { number, .. } => Some(format!("sms:{}", number)),
            Self::Location {
                latitude,
                longitude,
                ..
            } => Some(format!("geo:{},{}", latitude, longitude)),
            Self::Wifi { .. } | Self::Text(_) | Self::Contact(_) | Self::Event(_) => None,
        }
    }
}

fn query_pairs(params: &str) -> impl Iterator<Item = (&str, String)> {
    params
        .split('&')
        .filter_map(|param| param.split_once('='))
        .map(|(key, value)| (key, urlencoding_decode(value)))
}

/// Simple URL decoding for query parameters
fn urlencoding_decode(s: &str) -> String {
    let mut bytes = Vec::with_capacity(s.len());
    let mut iter = s.bytes();

    while let Some(b) = iter.next() {
        match b {
            b'%' => {
                let hex: Vec<u8> = iter.by_ref().take(2).collect();
                match std::str::from_utf8(&hex)
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                {
                    Some(byte) => bytes.push(byte),
                    None => {
                        bytes.push(b'%');
                        bytes.extend_from_slice(&hex);
                    }
                }
            }
            b'+' => bytes.push(b' '),
            other => bytes.push(other),
        }
    }

    String::from_utf8_lossy(&bytes).into_owned()
}
