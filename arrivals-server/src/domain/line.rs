//! Metro line codes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unrecognised line code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid line code: {0}")]
pub struct InvalidLineCode(String);

/// A rail line, identified by the agency's two-letter code.
///
/// Routes that don't correspond to any known line map to
/// [`LineCode::Unknown`] (code "XX") instead of failing, so a new or
/// renamed route never breaks index building.
///
/// # Examples
///
/// ```
/// use arrivals_server::domain::LineCode;
///
/// assert_eq!(LineCode::parse("BL").unwrap(), LineCode::Blue);
/// assert_eq!(LineCode::from_route_name("silver"), Some(LineCode::Silver));
/// assert_eq!(LineCode::Unknown.as_str(), "XX");
///
/// assert!(LineCode::parse("bl").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LineCode {
    #[serde(rename = "RD")]
    Red,
    #[serde(rename = "OR")]
    Orange,
    #[serde(rename = "YL")]
    Yellow,
    #[serde(rename = "GR")]
    Green,
    #[serde(rename = "BL")]
    Blue,
    #[serde(rename = "SV")]
    Silver,
    #[serde(rename = "XX", other)]
    Unknown,
}

impl LineCode {
    /// Every known line, excluding the unknown sentinel.
    pub const KNOWN: [LineCode; 6] = [
        LineCode::Red,
        LineCode::Orange,
        LineCode::Yellow,
        LineCode::Green,
        LineCode::Blue,
        LineCode::Silver,
    ];

    /// Parse a two-letter line code ("RD", "BL", ...).
    ///
    /// "XX" parses to [`LineCode::Unknown`]; anything else is rejected.
    pub fn parse(s: &str) -> Result<Self, InvalidLineCode> {
        if s == LineCode::Unknown.as_str() {
            return Ok(LineCode::Unknown);
        }
        Self::KNOWN
            .into_iter()
            .find(|line| line.as_str() == s)
            .ok_or_else(|| InvalidLineCode(s.to_string()))
    }

    /// Match a route identifier or display name ("BLUE", "Red") to a line.
    ///
    /// Matching ignores case and surrounding whitespace.
    pub fn from_route_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        Self::KNOWN.into_iter().find(|line| line.route_name() == upper)
    }

    /// Returns the two-letter code.
    pub fn as_str(&self) -> &'static str {
        match self {
            LineCode::Red => "RD",
            LineCode::Orange => "OR",
            LineCode::Yellow => "YL",
            LineCode::Green => "GR",
            LineCode::Blue => "BL",
            LineCode::Silver => "SV",
            LineCode::Unknown => "XX",
        }
    }

    /// The upper-case route name the agency uses in its schedule feed.
    fn route_name(&self) -> &'static str {
        match self {
            LineCode::Red => "RED",
            LineCode::Orange => "ORANGE",
            LineCode::Yellow => "YELLOW",
            LineCode::Green => "GREEN",
            LineCode::Blue => "BLUE",
            LineCode::Silver => "SILVER",
            LineCode::Unknown => "",
        }
    }

    /// Human-readable line name.
    pub fn name(&self) -> &'static str {
        match self {
            LineCode::Red => "Red",
            LineCode::Orange => "Orange",
            LineCode::Yellow => "Yellow",
            LineCode::Green => "Green",
            LineCode::Blue => "Blue",
            LineCode::Silver => "Silver",
            LineCode::Unknown => "Unknown",
        }
    }
}

impl fmt::Debug for LineCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LineCode({})", self.as_str())
    }
}

impl fmt::Display for LineCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_codes() {
        for line in LineCode::KNOWN {
            assert_eq!(LineCode::parse(line.as_str()).unwrap(), line);
        }
        assert_eq!(LineCode::parse("XX").unwrap(), LineCode::Unknown);
    }

    #[test]
    fn reject_unknown_codes() {
        assert!(LineCode::parse("").is_err());
        assert!(LineCode::parse("PK").is_err());
        assert!(LineCode::parse("rd").is_err());
    }

    #[test]
    fn route_names_match_case_insensitively() {
        assert_eq!(LineCode::from_route_name("RED"), Some(LineCode::Red));
        assert_eq!(LineCode::from_route_name(" orange "), Some(LineCode::Orange));
        assert_eq!(LineCode::from_route_name("Green"), Some(LineCode::Green));
        assert_eq!(LineCode::from_route_name("PURPLE"), None);
        assert_eq!(LineCode::from_route_name(""), None);
    }

    #[test]
    fn serde_uses_codes() {
        let json = serde_json::to_string(&LineCode::Blue).unwrap();
        assert_eq!(json, "\"BL\"");

        let line: LineCode = serde_json::from_str("\"SV\"").unwrap();
        assert_eq!(line, LineCode::Silver);

        // Live feeds use placeholders like "--" for non-revenue trains
        let line: LineCode = serde_json::from_str("\"--\"").unwrap();
        assert_eq!(line, LineCode::Unknown);
    }

    #[test]
    fn display_and_debug() {
        assert_eq!(LineCode::Yellow.to_string(), "YL");
        assert_eq!(format!("{:?}", LineCode::Yellow), "LineCode(YL)");
        assert_eq!(LineCode::Yellow.name(), "Yellow");
    }
}
