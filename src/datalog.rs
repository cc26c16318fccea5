//! Bounded time-series sampling for external observers (spec §1: "Time
//! series data collection is described only as an observer interface").
//! Grounded in PyTierra's `datalog.py`.

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy)]
pub struct DataPoint {
    pub time: u64,
    pub value: f64,
}

/// Ring buffer of `(time, value)` samples, bounded to `capacity` entries.
pub struct TimeSeriesLog {
    capacity: usize,
    points: VecDeque<DataPoint>,
}

impl TimeSeriesLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            points: VecDeque::new(),
        }
    }

    pub fn record(&mut self, time: u64, value: f64) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(DataPoint { time, value });
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn last(&self) -> Option<DataPoint> {
        self.points.back().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

/// Samples the handful of series PyTierra's GUI/CLI reporting relies on:
/// population size, mean creature size, genotype count, soup fullness.
pub struct DataCollector {
    pub population_size: TimeSeriesLog,
    pub mean_creature_size: TimeSeriesLog,
    pub num_genotypes: TimeSeriesLog,
    pub soup_fullness: TimeSeriesLog,
}

impl DataCollector {
    pub fn new(capacity: usize) -> Self {
        Self {
            population_size: TimeSeriesLog::new(capacity),
            mean_creature_size: TimeSeriesLog::new(capacity),
            num_genotypes: TimeSeriesLog::new(capacity),
            soup_fullness: TimeSeriesLog::new(capacity),
        }
    }

    pub fn sample(
        &mut self,
        time: u64,
        population: usize,
        mean_size: f64,
        num_genotypes: usize,
        fullness: f64,
    ) {
        self.population_size.record(time, population as f64);
        self.mean_creature_size.record(time, mean_size);
        self.num_genotypes.record(time, num_genotypes as f64);
        self.soup_fullness.record(time, fullness);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_drops_oldest_when_full() {
        let mut log = TimeSeriesLog::new(3);
        for i in 0..5 {
            log.record(i, i as f64);
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.values(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn collector_samples_all_series_together() {
        let mut collector = DataCollector::new(10);
        collector.sample(0, 5, 80.0, 2, 0.5);
        assert_eq!(collector.population_size.last().unwrap().value, 5.0);
        assert_eq!(collector.num_genotypes.last().unwrap().value, 2.0);
    }
}
