//! Service calendar resolution.
//!
//! Decides whether a service runs on a calendar date. Exceptions always win
//! over the weekly pattern, and a service with no weekly entry only runs on
//! dates it is explicitly added for.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::index::{ServiceExceptions, WeeklyService};

/// Read-only view over a bundle's calendar tables.
#[derive(Debug, Clone, Copy)]
pub struct ServiceCalendar<'a> {
    weekly: &'a BTreeMap<String, WeeklyService>,
    exceptions: &'a BTreeMap<String, ServiceExceptions>,
}

impl<'a> ServiceCalendar<'a> {
    pub fn new(
        weekly: &'a BTreeMap<String, WeeklyService>,
        exceptions: &'a BTreeMap<String, ServiceExceptions>,
    ) -> Self {
        Self { weekly, exceptions }
    }

    /// Whether `service_id` runs on `date`.
    pub fn runs_on(&self, service_id: &str, date: NaiveDate) -> bool {
        if let Some(exceptions) = self.exceptions.get(service_id) {
            if exceptions.removed.contains(&date) {
                return false;
            }
            if exceptions.added.contains(&date) {
                return true;
            }
        }

        let Some(weekly) = self.weekly.get(service_id) else {
            return false;
        };

        if date < weekly.start || date > weekly.end {
            return false;
        }

        weekly.days[date.weekday().num_days_from_monday() as usize]
    }

    /// Services running on `date`, in identifier order.
    pub fn active_services(&self, date: NaiveDate) -> Vec<&'a str> {
        let mut ids: Vec<&'a str> = self
            .weekly
            .keys()
            .chain(self.exceptions.keys())
            .map(String::as_str)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.retain(|id| self.runs_on(id, date));
        ids
    }
}
