//! Plate text grammars.
//!
//! A string is plate text iff, after normalization, it matches one of five
//! letter/digit layouts. Each layout allows one optional space between its
//! two groups.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// The recognized plate layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlateFormat {
    /// `LLL DDD`, e.g. `ABC 123`.
    ThreeLettersThreeDigits,
    /// `LL DDDD`, e.g. `AB 1234`.
    TwoLettersFourDigits,
    /// `DDD LLL`, e.g. `123 ABC`.
    ThreeDigitsThreeLetters,
    /// `LDD LLL`, e.g. `A12 BCD`.
    LetterTwoDigitsThreeLetters,
    /// `LLLL DD`, e.g. `ABCD 12`.
    FourLettersTwoDigits,
}

impl PlateFormat {
    pub const ALL: [PlateFormat; 5] = [
        PlateFormat::ThreeLettersThreeDigits,
        PlateFormat::TwoLettersFourDigits,
        PlateFormat::ThreeDigitsThreeLetters,
        PlateFormat::LetterTwoDigitsThreeLetters,
        PlateFormat::FourLettersTwoDigits,
    ];

    fn pattern(self) -> &'static str {
        match self {
            Self::ThreeLettersThreeDigits => r"^[A-Z]{3} ?[0-9]{3}$",
            Self::TwoLettersFourDigits => r"^[A-Z]{2} ?[0-9]{4}$",
            Self::ThreeDigitsThreeLetters => r"^[0-9]{3} ?[A-Z]{3}$",
            Self::LetterTwoDigitsThreeLetters => r"^[A-Z][0-9]{2} ?[A-Z]{3}$",
            Self::FourLettersTwoDigits => r"^[A-Z]{4} ?[0-9]{2}$",
        }
    }

    /// Layout template, `L` for a letter and `D` for a digit.
    pub fn template(self) -> &'static str {
        match self {
            Self::ThreeLettersThreeDigits => "LLL DDD",
            Self::TwoLettersFourDigits => "LL DDDD",
            Self::ThreeDigitsThreeLetters => "DDD LLL",
            Self::LetterTwoDigitsThreeLetters => "LDD LLL",
            Self::FourLettersTwoDigits => "LLLL DD",
        }
    }
}

impl fmt::Display for PlateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.template())
    }
}

static GRAMMARS: LazyLock<Vec<(PlateFormat, Regex)>> = LazyLock::new(|| {
    PlateFormat::ALL
        .iter()
        .map(|&format| {
            let regex = Regex::new(format.pattern()).expect("plate grammar patterns are static");
            (format, regex)
        })
        .collect()
});

/// ASCII-uppercase, trim, and collapse whitespace runs to a single space.
pub fn normalize_plate_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

/// Clean raw OCR output before validation.
///
/// Drops every character other than ASCII letters, digits and whitespace,
/// then normalizes. `"abc-123."` becomes `"ABC123"`.
pub fn clean_plate_text(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();
    normalize_plate_text(&kept)
}

/// First grammar the normalized text satisfies, if any.
pub fn match_plate_format(text: &str) -> Option<PlateFormat> {
    let normalized = normalize_plate_text(text);
    if normalized.is_empty() {
        return None;
    }
    GRAMMARS
        .iter()
        .find(|(_, regex)| regex.is_match(&normalized))
        .map(|(format, _)| *format)
}

/// Whether `text` is valid plate text under any of the five grammars.
pub fn is_valid_plate_format(text: &str) -> bool {
    match_plate_format(text).is_some()
}
