//! Domain entities shared by every decision engine (§3).

mod crude;
mod plan;
mod recipe;
mod tank;
mod vessel;

pub use crude::Crude;
pub use plan::{BlendAllocation, DailyPlan, HourlyOperation, HOURLY_CONSISTENCY_TOLERANCE};
pub use recipe::BlendingRecipe;
pub use tank::Tank;
pub use vessel::{DayRange, FeedstockParcel, FeedstockRequirement, Route, RouteSegment, Vessel};
