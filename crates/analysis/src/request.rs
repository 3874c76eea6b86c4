//! Validated analysis requests.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use uhimon_core::BoundingBox;

use crate::error::{AnalysisError, Result};

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(AnalysisError::InvalidInput(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse two `YYYY-MM-DD` dates.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// RFC 3339 interval covering both days entirely, as used by STAC search.
    /// The end carries microseconds so sub-second timestamps late on the
    /// last day still match.
    pub fn stac_interval(&self) -> String {
        format!("{}T00:00:00Z/{}T23:59:59.999999Z", self.start, self.end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| AnalysisError::InvalidInput(format!("date '{s}': {e}")))
}

/// One analysis: where, when and how cloudy at most.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalysisRequest {
    bbox: BoundingBox,
    dates: DateRange,
    max_cloud_cover: f64,
}

impl AnalysisRequest {
    /// Default cloud-cover ceiling, in percent.
    pub const DEFAULT_MAX_CLOUD_COVER: f64 = 15.0;

    pub fn new(bbox: BoundingBox, dates: DateRange, max_cloud_cover: f64) -> Result<Self> {
        if !(0.0..=100.0).contains(&max_cloud_cover) {
            return Err(AnalysisError::InvalidInput(format!(
                "cloud-cover ceiling {max_cloud_cover} is outside 0..=100"
            )));
        }
        Ok(Self {
            bbox,
            dates,
            max_cloud_cover,
        })
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn dates(&self) -> &DateRange {
        &self.dates
    }

    pub fn max_cloud_cover(&self) -> f64 {
        self.max_cloud_cover
    }
}
