//! Destination text normalization.
//!
//! The schedule feed and the live feed name terminals differently: the
//! schedule says "FRANCONIA-SPRINGFIELD" where the live feed says
//! "Franconia". These functions reduce both to comparable forms and are the
//! place to update when the agency changes its naming.

/// Qualifiers stripped from schedule headsigns, matched case-insensitively.
/// Only the first occurrence of each is removed.
const HEADSIGN_QUALIFIERS: &[&str] = &["-SPRINGFIELD", "-GMU", "FAIRFAX-", "DOWNTOWN "];

/// Words removed when building a comparison key.
const KEY_QUALIFIERS: &[&str] = &["SPRINGFIELD", "FAIRFAX", "GMU", "DOWNTOWN", "NEW"];

/// Display name used when a headsign normalizes to nothing.
const UNKNOWN_DESTINATION: &str = "Unknown";

/// Normalize a schedule headsign to the style the live feed uses.
///
/// Strips terminal disambiguators, keeps the part before any remaining
/// hyphen, and title-cases the result.
///
/// # Examples
///
/// ```
/// use arrivals_server::domain::normalize_headsign;
///
/// assert_eq!(normalize_headsign("FRANCONIA-SPRINGFIELD"), "Franconia");
/// assert_eq!(normalize_headsign("VIENNA/FAIRFAX-GMU"), "Vienna/fairfax");
/// assert_eq!(normalize_headsign("DOWNTOWN LARGO"), "Largo");
/// assert_eq!(normalize_headsign("NEW CARROLLTON"), "New Carrollton");
/// assert_eq!(normalize_headsign(""), "Unknown");
/// ```
pub fn normalize_headsign(headsign: &str) -> String {
    let mut text = headsign.to_string();
    for qualifier in HEADSIGN_QUALIFIERS {
        text = remove_first_ignore_case(&text, qualifier);
    }

    let first = text.split('-').next().unwrap_or_default().trim();
    if first.is_empty() {
        return UNKNOWN_DESTINATION.to_string();
    }

    title_case(first)
}

/// Reduce a destination to a single upper-case token for matching.
///
/// Case and punctuation are ignored and qualifier words removed, so
/// "Franconia-Springfield" and "Franconia" share the key "FRANCONIA".
///
/// ```
/// use arrivals_server::domain::destination_key;
///
/// assert_eq!(destination_key("Franconia-Springfield"), "FRANCONIA");
/// assert_eq!(destination_key("franconia"), "FRANCONIA");
/// assert_eq!(destination_key("Vienna/Fairfax-GMU"), "VIENNA");
/// assert_eq!(destination_key(""), "");
/// ```
pub fn destination_key(destination: &str) -> String {
    let mut upper: String = destination
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                ' '
            }
        })
        .collect();

    for qualifier in KEY_QUALIFIERS {
        upper = upper.replace(qualifier, "");
    }

    upper
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Remove the first case-insensitive occurrence of an ASCII pattern.
fn remove_first_ignore_case(text: &str, pattern: &str) -> String {
    // ASCII upper-casing keeps byte offsets aligned with the input
    let upper = text.to_ascii_uppercase();
    match upper.find(pattern) {
        Some(start) => {
            let end = start + pattern.len();
            format!("{}{}", &text[..start], &text[end..])
        }
        None => text.to_string(),
    }
}

/// Upper-case the first letter of each word and lower-case the rest.
fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
