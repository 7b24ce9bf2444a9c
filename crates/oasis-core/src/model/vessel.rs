use serde::{Deserialize, Serialize};

use crate::error::{OasisError, OasisResult};

/// Inclusive day range during which a parcel may load, or a requirement may be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRange {
    pub start: u32,
    pub end: u32,
}

impl DayRange {
    pub fn new(start: u32, end: u32) -> OasisResult<Self> {
        if start > end {
            return Err(OasisError::Validation(format!(
                "day range start {start} must be <= end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, day: u32) -> bool {
        day >= self.start && day <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

/// A volume of a specific crude grade loaded at a specific origin during a
/// specific loading-day range, carried on a vessel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedstockParcel {
    pub grade: String,
    pub volume: f64,
    pub ldr: DayRange,
    pub origin: String,
    pub vessel_id: Option<String>,
}

impl FeedstockParcel {
    pub fn new(
        grade: impl Into<String>,
        volume: f64,
        ldr: DayRange,
        origin: impl Into<String>,
    ) -> OasisResult<Self> {
        if volume <= 0.0 {
            return Err(OasisError::Validation(format!(
                "parcel volume must be positive, got {volume}"
            )));
        }
        Ok(Self {
            grade: grade.into(),
            volume,
            ldr,
            origin: origin.into(),
            vessel_id: None,
        })
    }
}

/// A demand for a volume of a crude grade that must be delivered from `origin`
/// by `required_arrival_by`, loaded somewhere within `allowed_ldr`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedstockRequirement {
    pub grade: String,
    pub volume: f64,
    pub origin: String,
    pub allowed_ldr: DayRange,
    pub required_arrival_by: u32,
}

impl FeedstockRequirement {
    pub fn new(
        grade: impl Into<String>,
        volume: f64,
        origin: impl Into<String>,
        allowed_ldr: DayRange,
        required_arrival_by: u32,
    ) -> OasisResult<Self> {
        if volume <= 0.0 {
            return Err(OasisError::Validation(format!(
                "requirement volume must be positive, got {volume}"
            )));
        }
        Ok(Self {
            grade: grade.into(),
            volume,
            origin: origin.into(),
            allowed_ldr,
            required_arrival_by,
        })
    }
}

/// A single-origin/single-destination shipping lane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub time_travel: u32,
    pub cost: f64,
}

impl Route {
    pub fn new(time_travel: u32, cost: f64) -> Self {
        Self { time_travel, cost }
    }
}

/// A leg of a vessel's traversal of the vessel-optimizer's time-space network.
///
/// Modeled as a tagged sum rather than optional fields on one struct, per the
/// original/destination shapes the vessel optimizer actually produces: `travel`
/// moves between origins, `wait` holds position at one origin across days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RouteSegment {
    Travel {
        from: String,
        to: String,
        day_start: u32,
        day_end: u32,
    },
    Wait {
        at: String,
        day_start: u32,
        day_end: u32,
    },
}

impl RouteSegment {
    pub fn day_end(&self) -> u32 {
        match self {
            RouteSegment::Travel { day_end, .. } => *day_end,
            RouteSegment::Wait { day_end, .. } => *day_end,
        }
    }
}

/// A vessel carrying feedstock parcels to the refinery, produced by the vessel
/// optimizer and consumed by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vessel {
    pub vessel_id: String,
    pub arrival_day: u32,
    pub original_arrival_day: u32,
    pub capacity: f64,
    pub cost: f64,
    pub cargo: Vec<FeedstockParcel>,
    pub days_held: u32,
    pub route: Vec<RouteSegment>,
}

impl Vessel {
    pub fn new(vessel_id: impl Into<String>, arrival_day: u32, capacity: f64, cost: f64) -> Self {
        Self {
            vessel_id: vessel_id.into(),
            arrival_day,
            original_arrival_day: arrival_day,
            capacity,
            cost,
            cargo: Vec::new(),
            days_held: 0,
            route: Vec::new(),
        }
    }

    pub fn cargo_volume(&self) -> f64 {
        self.cargo.iter().map(|p| p.volume).sum()
    }

    pub fn distinct_grades(&self) -> usize {
        let mut grades: Vec<&str> = self.cargo.iter().map(|p| p.grade.as_str()).collect();
        grades.sort_unstable();
        grades.dedup();
        grades.len()
    }

    pub fn validate_cargo_bounds(&self) -> OasisResult<()> {
        if self.cargo_volume() > self.capacity + 1e-9 {
            return Err(OasisError::Validation(format!(
                "vessel '{}' cargo volume {} exceeds capacity {}",
                self.vessel_id,
                self.cargo_volume(),
                self.capacity
            )));
        }
        if self.distinct_grades() > 3 {
            return Err(OasisError::Validation(format!(
                "vessel '{}' carries {} distinct grades, max 3",
                self.vessel_id,
                self.distinct_grades()
            )));
        }
        Ok(())
    }

    /// Defer this vessel's arrival by one day, recording that it was held.
    pub fn defer_arrival(&mut self) {
        self.days_held += 1;
        self.arrival_day += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_range_rejects_inverted_bounds() {
        assert!(DayRange::new(5, 3).is_err());
        assert!(DayRange::new(3, 5).is_ok());
    }

    #[test]
    fn cargo_bounds_catch_overcapacity() {
        let mut v = Vessel::new("V1", 1, 50.0, 1000.0);
        v.cargo
            .push(FeedstockParcel::new("A", 60.0, DayRange::new(1, 1).unwrap(), "Origin").unwrap());
        assert!(v.validate_cargo_bounds().is_err());
    }

    #[test]
    fn defer_arrival_increments_both_fields() {
        let mut v = Vessel::new("V1", 1, 50.0, 1000.0);
        v.defer_arrival();
        assert_eq!(v.days_held, 1);
        assert_eq!(v.arrival_day, 2);
        assert_eq!(v.original_arrival_day, 1);
    }
}
