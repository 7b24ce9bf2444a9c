use serde::{Deserialize, Serialize};

use crate::error::{OasisError, OasisResult};

/// A physical storage tank holding one or more crude grades.
///
/// `content` is an ordered sequence of `(grade, volume)` entries rather than a map:
/// insertion order determines which tank entry the greedy scheduler's withdraw/add
/// logic touches first, and tests depend on that order being preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tank {
    pub name: String,
    pub capacity: f64,
    pub content: Vec<(String, f64)>,
}

impl Tank {
    pub fn new(name: impl Into<String>, capacity: f64) -> OasisResult<Self> {
        if capacity <= 0.0 {
            return Err(OasisError::Validation(format!(
                "tank capacity must be positive, got {capacity}"
            )));
        }
        Ok(Self {
            name: name.into(),
            capacity,
            content: Vec::new(),
        })
    }

    pub fn with_content(
        name: impl Into<String>,
        capacity: f64,
        content: Vec<(String, f64)>,
    ) -> OasisResult<Self> {
        let mut tank = Self::new(name, capacity)?;
        for (grade, volume) in content {
            if volume > 0.0 {
                tank.content.push((grade, volume));
            }
        }
        if tank.total_volume() > tank.capacity {
            return Err(OasisError::Validation(format!(
                "tank '{}' initial content {} exceeds capacity {}",
                tank.name,
                tank.total_volume(),
                tank.capacity
            )));
        }
        Ok(tank)
    }

    pub fn total_volume(&self) -> f64 {
        self.content.iter().map(|(_, v)| v).sum()
    }

    pub fn headroom(&self) -> f64 {
        (self.capacity - self.total_volume()).max(0.0)
    }

    pub fn volume_of(&self, grade: &str) -> f64 {
        self.content
            .iter()
            .find(|(g, _)| g == grade)
            .map(|(_, v)| *v)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_nonpositive_capacity() {
        assert!(Tank::new("T1", 0.0).is_err());
    }

    #[test]
    fn rejects_overfull_initial_content() {
        assert!(Tank::with_content("T1", 100.0, vec![("A".into(), 150.0)]).is_err());
    }

    #[test]
    fn headroom_reflects_content() {
        let tank = Tank::with_content("T1", 100.0, vec![("A".into(), 40.0)]).unwrap();
        assert_eq!(tank.headroom(), 60.0);
        assert_eq!(tank.volume_of("A"), 40.0);
        assert_eq!(tank.volume_of("B"), 0.0);
    }
}
