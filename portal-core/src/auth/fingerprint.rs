//! Device fingerprint ("HWID") derivation.
//!
//! The fingerprint is computed from signals reported by the client and is
//! trivially spoofable. It deters casual account sharing; it is not a
//! security boundary. Two machines with identical browser, OS and screen
//! configuration can produce the same value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("fingerprint must not be empty")]
pub struct EmptyFingerprint;

/// Opaque device identifier bound to at most one account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Fingerprint {
    type Err = EmptyFingerprint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_string())
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = EmptyFingerprint;

    /// Kept byte-for-byte as presented. Only blank input is refused.
    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().is_empty() {
            return Err(EmptyFingerprint);
        }
        Ok(Self(value))
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-side signals that feed the fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintSignals {
    /// Data URL produced by rendering a fixed test pattern on a canvas.
    pub canvas_data: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub color_depth: u32,
    pub timezone: String,
    pub language: String,
    pub platform: String,
    pub gpu_vendor: String,
    pub gpu_renderer: String,
    pub audio_inputs: u32,
    pub audio_outputs: u32,
    pub video_inputs: u32,
    /// Minutes between UTC and local time, as reported by the client.
    pub timezone_offset_minutes: i32,
}

impl FingerprintSignals {
    /// Concatenation of every signal, in a fixed order.
    pub fn canonical(&self) -> String {
        [
            self.canvas_data.clone(),
            format!("{}x{}x{}", self.screen_width, self.screen_height, self.color_depth),
            self.timezone.clone(),
            self.language.clone(),
            self.platform.clone(),
            self.gpu_vendor.clone(),
            self.gpu_renderer.clone(),
            format!("{}:{}:{}", self.audio_inputs, self.audio_outputs, self.video_inputs),
            self.timezone_offset_minutes.to_string(),
        ]
        .join("|")
    }

    pub fn derive(&self) -> Fingerprint {
        Fingerprint(format!("{:x}", rolling_hash(&self.canonical()).unsigned_abs()))
    }
}

/// 32-bit rolling hash over UTF-16 code units: `h = h * 31 + unit`, wrapping.
pub fn rolling_hash(input: &str) -> i32 {
    input.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}
