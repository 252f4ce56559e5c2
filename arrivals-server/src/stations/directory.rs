//! Grouped station lookup.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{LineCode, StationId};

use super::client::{StationDto, StationSource};
use super::error::StationError;

/// A rider-facing station: every code listed under one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationGroup {
    pub name: String,
    /// Codes joined in listing order, e.g. "A01,C01"
    pub station: StationId,
    /// Lines serving any of the codes, without repeats
    pub lines: Vec<LineCode>,
}

/// Group station codes by name, sorted by name.
///
/// Codes keep the order the API lists them in. Unrecognized line codes are
/// dropped, and so are entries without a usable code.
pub fn group_by_name(stations: Vec<StationDto>) -> Vec<StationGroup> {
    let mut groups: Vec<(String, Vec<String>, Vec<LineCode>)> = Vec::new();

    for dto in stations {
        let code = dto.code.trim();
        if code.is_empty() {
            continue;
        }

        let lines: Vec<LineCode> = dto
            .line_codes()
            .filter_map(|line| match LineCode::parse(line) {
                Ok(line) => Some(line),
                Err(e) => {
                    debug!(station = code, error = %e, "Skipping line code");
                    None
                }
            })
            .collect();

        let index = match groups.iter().position(|(name, ..)| *name == dto.name) {
            Some(index) => index,
            None => {
                groups.push((dto.name.clone(), Vec::new(), Vec::new()));
                groups.len() - 1
            }
        };
        let (_, codes, merged) = &mut groups[index];
        codes.push(code.to_string());
        for line in lines {
            if !merged.contains(&line) {
                merged.push(line);
            }
        }
    }

    let mut grouped: Vec<StationGroup> = groups
        .into_iter()
        .filter_map(|(name, codes, lines)| {
            StationId::parse(&codes.join(",")).map(|station| StationGroup {
                name,
                station,
                lines,
            })
        })
        .collect();
    grouped.sort_by(|a, b| a.name.cmp(&b.name));
    grouped
}

/// Thread-safe grouped station list with background refresh.
#[derive(Clone, Default)]
pub struct StationDirectory {
    inner: Arc<RwLock<Vec<StationGroup>>>,
}

impl StationDirectory {
    /// Fetch and group the station list.
    pub async fn fetch(source: &impl StationSource) -> Result<Self, StationError> {
        let directory = Self::empty();
        directory.refresh(source).await?;
        Ok(directory)
    }

    /// A directory with no stations, for when the list can't be fetched.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every grouped station, sorted by name.
    pub async fn all(&self) -> Vec<StationGroup> {
        self.inner.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Refetch the station list.
    ///
    /// On success, replaces the current list. On failure, the existing
    /// list is kept and the error returned.
    pub async fn refresh(&self, source: &impl StationSource) -> Result<usize, StationError> {
        let groups = group_by_name(source.fetch_all().await?);
        let count = groups.len();

        *self.inner.write().await = groups;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn dto(code: &str, name: &str, lines: [Option<&str>; 4]) -> StationDto {
        let [l1, l2, l3, l4] = lines.map(|l| l.map(str::to_string));
        StationDto {
            code: code.to_string(),
            name: name.to_string(),
            line_code1: l1,
            line_code2: l2,
            line_code3: l3,
            line_code4: l4,
        }
    }

    fn network() -> Vec<StationDto> {
        vec![
            dto("A01", "Metro Center", [Some("RD"), None, None, None]),
            dto("C05", "Rosslyn", [Some("BL"), Some("OR"), Some("SV"), None]),
            dto("C01", "Metro Center", [Some("BL"), Some("OR"), Some("SV"), None]),
            dto("B01", "Gallery Pl-Chinatown", [Some("RD"), Some(""), None, None]),
            dto("F01", "Gallery Pl-Chinatown", [Some("GR"), Some("YL"), None, None]),
        ]
    }

    #[derive(Default)]
    struct TestStations {
        fail: AtomicBool,
    }

    impl StationSource for TestStations {
        async fn fetch_all(&self) -> Result<Vec<StationDto>, StationError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(StationError::Api {
                    status: 503,
                    message: "Service Unavailable".into(),
                });
            }
            Ok(network())
        }
    }

    #[test]
    fn transfer_stations_share_one_entry() {
        let groups = group_by_name(network());

        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["Gallery Pl-Chinatown", "Metro Center", "Rosslyn"]);

        let metro_center = &groups[1];
        assert_eq!(metro_center.station.as_str(), "A01,C01");
        assert_eq!(
            metro_center.lines,
            [LineCode::Red, LineCode::Blue, LineCode::Orange, LineCode::Silver]
        );

        let gallery_place = &groups[0];
        assert_eq!(gallery_place.station.as_str(), "B01,F01");
        assert_eq!(
            gallery_place.lines,
            [LineCode::Red, LineCode::Green, LineCode::Yellow]
        );

        assert!(!groups[2].station.is_compound());
    }

    #[test]
    fn repeated_lines_and_bad_entries_are_dropped() {
        let groups = group_by_name(vec![
            dto("K01", "Court House", [Some("OR"), Some("SV"), None, None]),
            dto("K01", "Court House", [Some("SV"), Some("OR"), Some("ZZ"), None]),
            dto(" ", "Nowhere", [Some("RD"), None, None, None]),
        ]);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].station.as_str(), "K01");
        assert_eq!(groups[0].lines, [LineCode::Orange, LineCode::Silver]);
    }

    #[tokio::test]
    async fn refresh_failure_keeps_previous_list() {
        let source = TestStations::default();
        let directory = StationDirectory::fetch(&source).await.unwrap();
        assert_eq!(directory.len().await, 3);

        source.fail.store(true, Ordering::SeqCst);
        assert!(directory.refresh(&source).await.is_err());

        assert_eq!(directory.len().await, 3);
        let all = directory.all().await;
        assert_eq!(all[1].name, "Metro Center");
        assert_eq!(all[1].station.as_str(), "A01,C01");
    }

    #[tokio::test]
    async fn clones_see_refreshed_list() {
        let source = TestStations::default();
        let directory = StationDirectory::empty();
        let shared = directory.clone();
        assert!(shared.is_empty().await);

        assert_eq!(directory.refresh(&source).await.unwrap(), 3);
        assert_eq!(shared.all().await.len(), 3);
    }
}
