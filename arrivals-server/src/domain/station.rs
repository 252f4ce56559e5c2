//! Station identifiers.

use std::fmt;

/// A rider-facing station, as one or more agency station codes.
///
/// Transfer complexes such as Metro Center have one code per platform
/// level ("A01" and "C01"); upstream station grouping joins them with
/// commas. Codes keep their given order.
///
/// # Examples
///
/// ```
/// use arrivals_server::domain::StationId;
///
/// let metro_center = StationId::parse("A01, C01").unwrap();
/// assert_eq!(metro_center.codes(), ["A01", "C01"]);
/// assert_eq!(metro_center.as_str(), "A01,C01");
///
/// assert!(StationId::parse(" , ").is_none());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct StationId {
    codes: Vec<String>,
    joined: String,
}

impl StationId {
    /// Parse a comma-separated list of station codes.
    ///
    /// Blank entries are dropped, as are repeated codes. Returns `None` when
    /// no codes remain.
    pub fn parse(s: &str) -> Option<Self> {
        let mut codes: Vec<String> = Vec::new();
        for code in s.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            if !codes.iter().any(|c| c == code) {
                codes.push(code.to_string());
            }
        }

        if codes.is_empty() {
            return None;
        }

        let joined = codes.join(",");
        Some(Self { codes, joined })
    }

    /// The individual station codes.
    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    /// The canonical comma-joined form.
    pub fn as_str(&self) -> &str {
        &self.joined
    }

    /// Whether this station aggregates more than one code.
    pub fn is_compound(&self) -> bool {
        self.codes.len() > 1
    }
}

impl fmt::Debug for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationId({})", self.joined)
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined)
    }
}
