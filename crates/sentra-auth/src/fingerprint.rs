//! Device fingerprint generation.
//!
//! Derives a stable and a volatile identity fingerprint from connection
//! metadata. Pure functions with no failure modes: unparseable input
//! degrades to `Unknown` categorization, never an error.
//!
//! The stable hash covers only coarse, slowly-changing attributes (browser
//! family, OS family, device type, primary language) so it survives benign
//! client updates and is independent of header ordering. The volatile hash
//! covers the raw metadata and moves whenever any of it does.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Raw connection metadata a fingerprint is derived from.
#[derive(Debug, Clone, Default)]
pub struct RequestMetadata {
    /// The User-Agent header value, if present.
    pub user_agent: Option<String>,

    /// Client IP address, as resolved by the transport layer.
    pub ip: Option<String>,

    /// The Accept-Language header value, if present.
    pub accept_language: Option<String>,
}

impl RequestMetadata {
    /// Creates metadata from the three raw header values.
    #[must_use]
    pub fn new(
        user_agent: Option<impl Into<String>>,
        ip: Option<impl Into<String>>,
        accept_language: Option<impl Into<String>>,
    ) -> Self {
        Self {
            user_agent: user_agent.map(Into::into),
            ip: ip.map(Into::into),
            accept_language: accept_language.map(Into::into),
        }
    }
}

/// Derived device fingerprint, embedded in session and history rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceFingerprint {
    /// Hash over the raw metadata; changes with any attribute.
    pub volatile_hash: String,

    /// Hash over coarse attributes only; stable across minor updates.
    pub stable_hash: String,

    /// Detected browser family.
    pub browser: String,

    /// Detected operating system family.
    pub os: String,

    /// Detected device type.
    pub device_type: DeviceType,
}

/// Coarse device classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
    Unknown,
}

impl DeviceType {
    /// Returns the device type as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl DeviceFingerprint {
    /// Generate a human-readable device name like "Chrome on macOS".
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} on {}", self.browser, self.os)
    }
}

/// Derives a fingerprint from raw connection metadata.
#[must_use]
pub fn generate(metadata: &RequestMetadata) -> DeviceFingerprint {
    let ua = metadata.user_agent.as_deref().unwrap_or("");
    let browser = detect_browser(ua);
    let os = detect_os(ua);
    let device_type = detect_device_type(ua);
    let primary_language = primary_language(metadata.accept_language.as_deref());

    let volatile_hash = hash_parts(&[
        ua,
        metadata.ip.as_deref().unwrap_or(""),
        metadata.accept_language.as_deref().unwrap_or(""),
    ]);

    // Coarse attributes only, in fixed order, so identical
    // browser/OS/device/language combinations always collide.
    let stable_hash = hash_parts(&[&browser, &os, device_type.as_str(), &primary_language]);

    DeviceFingerprint {
        volatile_hash,
        stable_hash,
        browser,
        os,
        device_type,
    }
}

/// Extracts the primary language tag from an Accept-Language value.
///
/// `"en-US,en;q=0.9,fr;q=0.8"` yields `"en"`. Missing or empty input
/// yields `"unknown"`.
#[must_use]
pub fn primary_language(accept_language: Option<&str>) -> String {
    accept_language
        .and_then(|value| value.split(',').next())
        .map(|tag| tag.split(';').next().unwrap_or(tag))
        .map(|tag| tag.split('-').next().unwrap_or(tag).trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn hash_parts(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// Detect browser family from a User-Agent string.
fn detect_browser(ua: &str) -> String {
    let ua_lower = ua.to_lowercase();

    // Order matters: Chrome contains Safari, Edge contains Chrome.
    if ua_lower.contains("edg/") || ua_lower.contains("edge/") {
        "Edge".to_string()
    } else if ua_lower.contains("opr/") || ua_lower.contains("opera") {
        "Opera".to_string()
    } else if ua_lower.contains("chrome/") {
        "Chrome".to_string()
    } else if ua_lower.contains("safari/") && !ua_lower.contains("chrome") {
        "Safari".to_string()
    } else if ua_lower.contains("firefox/") {
        "Firefox".to_string()
    } else if ua_lower.contains("msie") || ua_lower.contains("trident/") {
        "Internet Explorer".to_string()
    } else {
        "Unknown Browser".to_string()
    }
}

/// Detect operating system family from a User-Agent string.
fn detect_os(ua: &str) -> String {
    let ua_lower = ua.to_lowercase();

    if ua_lower.contains("windows") {
        "Windows".to_string()
    } else if ua_lower.contains("iphone") {
        "iOS".to_string()
    } else if ua_lower.contains("ipad") {
        "iPadOS".to_string()
    } else if ua_lower.contains("mac os x") || ua_lower.contains("macintosh") {
        "macOS".to_string()
    } else if ua_lower.contains("android") {
        "Android".to_string()
    } else if ua_lower.contains("cros") {
        "Chrome OS".to_string()
    } else if ua_lower.contains("linux") {
        "Linux".to_string()
    } else {
        "Unknown OS".to_string()
    }
}

/// Detect device type from a User-Agent string.
fn detect_device_type(ua: &str) -> DeviceType {
    let ua_lower = ua.to_lowercase();

    if ua_lower.contains("mobile") || ua_lower.contains("iphone") || ua_lower.contains("android") {
        if ua_lower.contains("tablet") || ua_lower.contains("ipad") {
            DeviceType::Tablet
        } else {
            DeviceType::Mobile
        }
    } else if ua_lower.contains("ipad") || ua_lower.contains("tablet") {
        DeviceType::Tablet
    } else if ua_lower.contains("windows")
        || ua_lower.contains("macintosh")
        || ua_lower.contains("linux")
        || ua_lower.contains("cros")
    {
        DeviceType::Desktop
    } else {
        DeviceType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const CHROME_MAC_NEWER: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";
    const FIREFOX_WIN: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/121.0";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1";

    fn metadata(ua: &str, ip: &str, lang: &str) -> RequestMetadata {
        RequestMetadata::new(Some(ua), Some(ip), Some(lang))
    }

    #[test]
    fn test_detect_browser_families() {
        assert_eq!(detect_browser(CHROME_MAC), "Chrome");
        assert_eq!(detect_browser(FIREFOX_WIN), "Firefox");
        assert_eq!(detect_browser(SAFARI_IPHONE), "Safari");
        assert_eq!(
            detect_browser("Mozilla/5.0 (Windows NT 10.0) AppleWebKit/537.36 Chrome/120.0 Safari/537.36 Edg/120.0"),
            "Edge"
        );
        assert_eq!(detect_browser("curl/8.4.0"), "Unknown Browser");
    }

    #[test]
    fn test_detect_os_families() {
        assert_eq!(detect_os(CHROME_MAC), "macOS");
        assert_eq!(detect_os(FIREFOX_WIN), "Windows");
        assert_eq!(detect_os(SAFARI_IPHONE), "iOS");
        assert_eq!(detect_os("Mozilla/5.0 (Linux; Android 13; Pixel 7)"), "Android");
        assert_eq!(detect_os(""), "Unknown OS");
    }

    #[test]
    fn test_detect_device_type() {
        assert_eq!(detect_device_type(CHROME_MAC), DeviceType::Desktop);
        assert_eq!(detect_device_type(SAFARI_IPHONE), DeviceType::Mobile);
        assert_eq!(
            detect_device_type("Mozilla/5.0 (iPad; CPU OS 17_2 like Mac OS X)"),
            DeviceType::Tablet
        );
        assert_eq!(detect_device_type("something else"), DeviceType::Unknown);
    }

    #[test]
    fn test_primary_language() {
        assert_eq!(primary_language(Some("en-US,en;q=0.9,fr;q=0.8")), "en");
        assert_eq!(primary_language(Some("de-DE")), "de");
        assert_eq!(primary_language(Some("fr;q=0.7")), "fr");
        assert_eq!(primary_language(None), "unknown");
        assert_eq!(primary_language(Some("")), "unknown");
    }

    #[test]
    fn test_stable_hash_survives_minor_version_bump() {
        let a = generate(&metadata(CHROME_MAC, "203.0.113.7", "en-US,en;q=0.9"));
        let b = generate(&metadata(CHROME_MAC_NEWER, "203.0.113.7", "en-US"));

        assert_eq!(a.stable_hash, b.stable_hash);
        assert_ne!(a.volatile_hash, b.volatile_hash);
    }

    #[test]
    fn test_stable_hash_differs_across_device_families() {
        let mac = generate(&metadata(CHROME_MAC, "203.0.113.7", "en-US"));
        let win = generate(&metadata(FIREFOX_WIN, "203.0.113.7", "en-US"));

        assert_ne!(mac.stable_hash, win.stable_hash);
    }

    #[test]
    fn test_unparseable_input_degrades_to_unknown() {
        let fp = generate(&RequestMetadata::default());

        assert_eq!(fp.browser, "Unknown Browser");
        assert_eq!(fp.os, "Unknown OS");
        assert_eq!(fp.device_type, DeviceType::Unknown);
        // Hashes are still well-formed.
        assert_eq!(fp.stable_hash.len(), 64);
        assert_eq!(fp.volatile_hash.len(), 64);
    }

    #[test]
    fn test_display_name() {
        let fp = generate(&metadata(CHROME_MAC, "203.0.113.7", "en-US"));
        assert_eq!(fp.display_name(), "Chrome on macOS");
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let a = generate(&metadata(SAFARI_IPHONE, "198.51.100.4", "en-US"));
        let b = generate(&metadata(SAFARI_IPHONE, "198.51.100.4", "en-US"));
        assert_eq!(a, b);
    }
}
