// Animal stats (health, stamina, ...)

use serde::{Deserialize, Serialize};

use crate::core::StatId;

/// How `Stats::modify` applies a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatOption {
    Add,
    Reduce,
    /// Reduce by a percentage of the stat's maximum
    ReduceByPercent,
    SetValue,
}

/// A single bounded stat
#[derive(Debug, Clone, PartialEq)]
pub struct Stat {
    pub id: StatId,
    pub value: f32,
    pub max: f32,
}

impl Stat {
    pub fn new(id: StatId, max: f32) -> Self {
        let max = max.max(0.0);
        Self { id, value: max, max }
    }
}

/// Stats owned by one animal
#[derive(Debug, Clone, Default)]
pub struct Stats {
    stats: Vec<Stat>,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Health and stamina at full value
    pub fn standard(health: f32, stamina: f32) -> Self {
        let mut stats = Self::new();
        stats.insert(Stat::new(StatId::HEALTH, health));
        stats.insert(Stat::new(StatId::STAMINA, stamina));
        stats
    }

    /// Add or replace a stat
    pub fn insert(&mut self, stat: Stat) {
        match self.stats.iter_mut().find(|s| s.id == stat.id) {
            Some(existing) => *existing = stat,
            None => self.stats.push(stat),
        }
    }

    pub fn get(&self, id: StatId) -> Option<&Stat> {
        self.stats.iter().find(|s| s.id == id)
    }

    pub fn value(&self, id: StatId) -> Option<f32> {
        self.get(id).map(|s| s.value)
    }

    /// Modify a stat, clamping to [0, max]. Returns the new value, or None
    /// if the animal has no such stat.
    pub fn modify(&mut self, id: StatId, amount: f32, option: StatOption) -> Option<f32> {
        let stat = self.stats.iter_mut().find(|s| s.id == id)?;

        let value = match option {
            StatOption::Add => stat.value + amount,
            StatOption::Reduce => stat.value - amount,
            StatOption::ReduceByPercent => stat.value - stat.max * amount / 100.0,
            StatOption::SetValue => amount,
        };
        stat.value = value.clamp(0.0, stat.max);

        Some(stat.value)
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_standard_stats_start_full() {
        let stats = Stats::standard(100.0, 50.0);
        assert_eq!(stats.value(StatId::HEALTH), Some(100.0));
        assert_eq!(stats.value(StatId::STAMINA), Some(50.0));
        assert_eq!(stats.len(), 2);
    }

    #[test]
    fn test_reduce_by_percent_uses_max() {
        let mut stats = Stats::standard(200.0, 0.0);
        let value = stats
            .modify(StatId::HEALTH, 25.0, StatOption::ReduceByPercent)
            .unwrap();
        assert_relative_eq!(value, 150.0);
    }

    #[test]
    fn test_values_are_clamped() {
        let mut stats = Stats::standard(100.0, 100.0);
        assert_eq!(stats.modify(StatId::HEALTH, 500.0, StatOption::Reduce), Some(0.0));
        assert_eq!(stats.modify(StatId::HEALTH, 500.0, StatOption::Add), Some(100.0));
        assert_eq!(stats.modify(StatId::HEALTH, 40.0, StatOption::SetValue), Some(40.0));
    }

    #[test]
    fn test_unknown_stat() {
        let mut stats = Stats::new();
        assert_eq!(stats.modify(StatId::HEALTH, 1.0, StatOption::Add), None);
    }
}
