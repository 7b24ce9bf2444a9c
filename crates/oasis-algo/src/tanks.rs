//! Tank manager (§4.2): enforces capacity invariants and tracks grade-addressed
//! volumes across an ordered collection of tanks.

use oasis_core::model::{FeedstockParcel, Tank};

/// Owns an ordered collection of tanks and exposes the withdraw/add/store
/// primitives the scheduler and LP refiner rely on. Tank order is insertion
/// order and is load-bearing: withdraw/add/store_crude all scan tanks in the
/// order they were registered.
#[derive(Debug, Clone, Default)]
pub struct TankManager {
    tanks: Vec<Tank>,
}

impl TankManager {
    pub fn new(tanks: Vec<Tank>) -> Self {
        Self { tanks }
    }

    pub fn tanks(&self) -> &[Tank] {
        &self.tanks
    }

    pub fn into_tanks(self) -> Vec<Tank> {
        self.tanks
    }

    fn tank_mut(&mut self, name: &str) -> Option<&mut Tank> {
        self.tanks.iter_mut().find(|t| t.name == name)
    }

    /// Subtract `volume` of `grade` from `tank`, scanning its content entries in
    /// insertion order and pruning entries that drop to <= 0. Fails (and mutates
    /// nothing) if the tank doesn't hold enough of the grade.
    pub fn withdraw(&mut self, tank_name: &str, grade: &str, volume: f64) -> bool {
        let Some(tank) = self.tank_mut(tank_name) else {
            return false;
        };
        let available: f64 = tank.content.iter().filter(|(g, _)| g == grade).map(|(_, v)| v).sum();
        if available < volume - 1e-9 {
            return false;
        }
        let mut remaining = volume;
        for (g, v) in tank.content.iter_mut() {
            if g != grade || remaining <= 0.0 {
                continue;
            }
            let take = remaining.min(*v);
            *v -= take;
            remaining -= take;
        }
        tank.content.retain(|(_, v)| *v > 0.0);
        true
    }

    /// Merge `parcel` into an existing entry of the same grade, or append a new
    /// one. Fails if the tank doesn't have enough headroom.
    pub fn add(&mut self, tank_name: &str, parcel: &FeedstockParcel) -> bool {
        let Some(tank) = self.tank_mut(tank_name) else {
            return false;
        };
        if tank.total_volume() + parcel.volume > tank.capacity + 1e-9 {
            return false;
        }
        if let Some(entry) = tank.content.iter_mut().find(|(g, _)| *g == parcel.grade) {
            entry.1 += parcel.volume;
        } else {
            tank.content.push((parcel.grade.clone(), parcel.volume));
        }
        true
    }

    /// Distribute `volume` of `grade` across tanks in two passes: first topping
    /// up tanks that already hold the grade, then spreading any remainder to
    /// tanks with spare headroom. Returns the amount actually placed, in
    /// `[0, volume]`; never fails.
    pub fn store_crude(&mut self, grade: &str, volume: f64) -> f64 {
        let mut remaining = volume;

        for tank in self.tanks.iter_mut() {
            if remaining <= 0.0 {
                break;
            }
            if !tank.content.iter().any(|(g, _)| g == grade) {
                continue;
            }
            let headroom = tank.headroom();
            let take = remaining.min(headroom);
            if take > 0.0 {
                if let Some(entry) = tank.content.iter_mut().find(|(g, _)| g == grade) {
                    entry.1 += take;
                }
                remaining -= take;
            }
        }

        for tank in self.tanks.iter_mut() {
            if remaining <= 0.0 {
                break;
            }
            let headroom = tank.headroom();
            let take = remaining.min(headroom);
            if take > 0.0 {
                if let Some(entry) = tank.content.iter_mut().find(|(g, _)| g == grade) {
                    entry.1 += take;
                } else {
                    tank.content.push((grade.to_string(), take));
                }
                remaining -= take;
            }
        }

        volume - remaining
    }

    /// Sum of `grade` across all tanks.
    pub fn get_available_volume(&self, grade: &str) -> f64 {
        self.tanks.iter().map(|t| t.volume_of(grade)).sum()
    }

    /// Withdraw `volume` of `grade`, consuming fully from each tank in
    /// insertion order before moving to the next (§4.3 step 3). Fails (and
    /// mutates nothing) if total available inventory is insufficient.
    pub fn withdraw_across_tanks(&mut self, grade: &str, volume: f64) -> bool {
        if self.get_available_volume(grade) < volume - 1e-9 {
            return false;
        }
        let mut remaining = volume;
        for tank in self.tanks.iter_mut() {
            if remaining <= 0.0 {
                break;
            }
            let take = remaining.min(tank.volume_of(grade));
            if take <= 0.0 {
                continue;
            }
            if let Some(entry) = tank.content.iter_mut().find(|(g, _)| g == grade) {
                entry.1 -= take;
            }
            tank.content.retain(|(_, v)| *v > 0.0);
            remaining -= take;
        }
        true
    }

    /// The first tank (in insertion order) with enough headroom to take the
    /// entire parcel whole, per the scheduler's whole-parcel unload policy (§4.3).
    pub fn first_tank_with_headroom(&self, volume: f64) -> Option<&str> {
        self.tanks
            .iter()
            .find(|t| t.headroom() >= volume - 1e-9)
            .map(|t| t.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oasis_core::model::DayRange;

    fn manager() -> TankManager {
        TankManager::new(vec![
            Tank::with_content("T1", 100.0, vec![("A".into(), 50.0)]).unwrap(),
            Tank::with_content("T2", 100.0, vec![]).unwrap(),
        ])
    }

    #[test]
    fn withdraw_fails_when_insufficient() {
        let mut mgr = manager();
        assert!(!mgr.withdraw("T1", "A", 60.0));
        assert_eq!(mgr.get_available_volume("A"), 50.0);
    }

    #[test]
    fn withdraw_prunes_zeroed_entries() {
        let mut mgr = manager();
        assert!(mgr.withdraw("T1", "A", 50.0));
        assert!(mgr.tanks()[0].content.is_empty());
    }

    #[test]
    fn add_merges_same_grade_entry() {
        let mut mgr = manager();
        let parcel = FeedstockParcel::new("A", 10.0, DayRange::new(1, 1).unwrap(), "Origin").unwrap();
        assert!(mgr.add("T1", &parcel));
        assert_eq!(mgr.get_available_volume("A"), 60.0);
        assert_eq!(mgr.tanks()[0].content.len(), 1);
    }

    #[test]
    fn add_rejects_overcapacity() {
        let mut mgr = manager();
        let parcel = FeedstockParcel::new("A", 60.0, DayRange::new(1, 1).unwrap(), "Origin").unwrap();
        assert!(!mgr.add("T1", &parcel));
    }

    #[test]
    fn store_crude_tops_up_existing_before_spreading() {
        let mut mgr = manager();
        let stored = mgr.store_crude("A", 30.0);
        assert_eq!(stored, 30.0);
        assert_eq!(mgr.tanks()[0].volume_of("A"), 80.0);
        assert_eq!(mgr.tanks()[1].volume_of("A"), 0.0);
    }

    #[test]
    fn store_crude_spreads_remainder_to_any_tank() {
        let mut mgr = manager();
        // T1 has 50/100 headroom left; request more than that so the remainder spills to T2.
        let stored = mgr.store_crude("A", 80.0);
        assert_eq!(stored, 80.0);
        assert_eq!(mgr.tanks()[0].volume_of("A"), 100.0);
        assert_eq!(mgr.tanks()[1].volume_of("A"), 30.0);
    }

    #[test]
    fn store_crude_never_exceeds_total_headroom() {
        let mut mgr = manager();
        let stored = mgr.store_crude("A", 1000.0);
        assert_eq!(stored, 150.0); // 50 headroom on T1 + 100 on T2
    }
}
