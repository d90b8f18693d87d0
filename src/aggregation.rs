//! Rolling 7-day activity windows
//!
//! Buckets raw activities into the current week (`date >= now - 7d`) and the
//! week before it (`now - 14d <= date < now - 7d`). Everything downstream in
//! the load detector works from these two windows.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::models::Activity;

/// Activities strictly above this intensity count as intense sessions
pub const INTENSE_SESSION_THRESHOLD: u8 = 7;

/// Summary of one 7-day window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityWindow {
    /// Number of activities in the window
    pub activity_count: usize,

    /// Mean of `heartRateAvg`, 0 when the window is empty
    pub mean_heart_rate: f64,

    /// Summed duration in minutes
    pub total_minutes: f64,

    /// Activities with intensity above the intense-session threshold
    pub intense_activities: Vec<Activity>,

    /// Calendar dates with at least one activity
    pub active_dates: BTreeSet<NaiveDate>,
}

impl ActivityWindow {
    pub fn is_empty(&self) -> bool {
        self.activity_count == 0
    }

    pub fn intense_sessions(&self) -> usize {
        self.intense_activities.len()
    }

    fn push(&mut self, activity: &Activity, at: DateTime<Utc>, intense_threshold: u8) {
        // Running mean keeps the window a single pass
        let n = self.activity_count as f64;
        self.mean_heart_rate = (self.mean_heart_rate * n + activity.heart_rate_avg) / (n + 1.0);
        self.activity_count += 1;
        self.total_minutes += activity.duration_minutes();
        self.active_dates.insert(at.date_naive());

        if activity.intensity > f64::from(intense_threshold) {
            self.intense_activities.push(activity.clone());
        }
    }
}

/// Current and prior week side by side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyWindows {
    /// Reference instant the windows were cut from
    pub now: DateTime<Utc>,

    pub last_7_days: ActivityWindow,

    pub previous_7_days: ActivityWindow,

    /// Activities dropped for an unparseable date or an intensity outside 0-10
    pub skipped: usize,

    /// Intensity an activity must exceed to count as intense
    pub intense_threshold: u8,
}

impl WeeklyWindows {
    /// True when neither window has a single activity
    pub fn is_empty(&self) -> bool {
        self.last_7_days.is_empty() && self.previous_7_days.is_empty()
    }

    /// Rest days among the 7 calendar days ending on `now`'s date
    pub fn rest_days(&self) -> u32 {
        let today = self.now.date_naive();
        let first = today - Duration::days(6);
        let active = self
            .last_7_days
            .active_dates
            .range(first..=today)
            .count() as u32;
        7u32.saturating_sub(active)
    }
}

/// Splits an activity feed into rolling weekly windows
#[derive(Debug, Clone)]
pub struct ActivityAggregator {
    intense_threshold: u8,
}

impl Default for ActivityAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityAggregator {
    pub fn new() -> Self {
        ActivityAggregator {
            intense_threshold: INTENSE_SESSION_THRESHOLD,
        }
    }

    /// Aggregator with a custom intense-session cutoff
    pub fn with_intense_threshold(intense_threshold: u8) -> Self {
        ActivityAggregator { intense_threshold }
    }

    /// Bucket `activities` relative to `now`.
    ///
    /// Activities whose date cannot be parsed, or whose intensity falls
    /// outside 0-10, are skipped one by one and
    /// counted in [`WeeklyWindows::skipped`]; they never abort the whole
    /// aggregation.
    pub fn aggregate(&self, activities: &[Activity], now: DateTime<Utc>) -> WeeklyWindows {
        let seven_days_ago = now - Duration::days(7);
        let fourteen_days_ago = now - Duration::days(14);

        let mut windows = WeeklyWindows {
            now,
            last_7_days: ActivityWindow::default(),
            previous_7_days: ActivityWindow::default(),
            skipped: 0,
            intense_threshold: self.intense_threshold,
        };

        for activity in activities {
            let at = match activity.timestamp().and_then(|at| activity.validate().map(|()| at)) {
                Ok(at) => at,
                Err(e) => {
                    warn!(
                        date = %activity.date,
                        intensity = activity.intensity,
                        error = %e,
                        "Skipping malformed activity"
                    );
                    windows.skipped += 1;
                    continue;
                }
            };

            if at >= seven_days_ago {
                windows.last_7_days.push(activity, at, self.intense_threshold);
            } else if at >= fourteen_days_ago {
                windows.previous_7_days.push(activity, at, self.intense_threshold);
            }
        }

        debug!(
            current = windows.last_7_days.activity_count,
            previous = windows.previous_7_days.activity_count,
            skipped = windows.skipped,
            "Aggregated weekly windows"
        );

        windows
    }
}
