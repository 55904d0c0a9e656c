use std::{time::{Instant, Duration}, collections::HashMap, fmt::Display, borrow::Cow};

/// Tracks per-stage timing across many batches
#[derive(Default)]
pub struct TimeProfileStatistics {
    /// Stage durations, by name
    values: HashMap<String, Vec<Duration>>,
    /// Stage names, in first-seen order
    keys: Vec<String>,
    /// Number of profiles added
    count: usize,
}

impl TimeProfileStatistics {
    pub fn add(&mut self, tp: &TimeProfile) {
        self.count += 1;
        let mut last_time = tp.start();
        for stamp in tp.stamps.iter() {
            let name = stamp.name();

            let duration = stamp.timestamp.saturating_duration_since(last_time);
            last_time = stamp.timestamp;

            match self.values.entry(name.into()) {
                std::collections::hash_map::Entry::Occupied(mut e) => e.get_mut().push(duration),
                std::collections::hash_map::Entry::Vacant(e) => {
                    e.insert(Vec::new()).push(duration);
                    self.keys.push(name.into());
                },
            }
        }
    }

    /// Number of profiles recorded
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Mean duration of a stage
    pub fn mean(&self, name: &str) -> Option<Duration> {
        let entry = self.values.get(name)?;
        if entry.is_empty() {
            return None;
        }
        let total: Duration = entry.iter().sum();
        Some(total / (entry.len() as u32))
    }
}

impl Display for TimeProfileStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let max_name = self.keys
            .iter()
            .map(|stamp| stamp.len())
            .max()
            .unwrap_or(0)
            .max(4);

        writeln!(f, " # {:width$} {:>15} {:>15} {:>15} {:>15}", "Name", "Average", "Min", "Max", "Std.dev", width=max_name)?;

        for (i, key) in self.keys.iter().enumerate() {
            let Some(entry) = self.values.get(key) else { continue };
            let mut max = Duration::ZERO;
            let mut min = Duration::MAX;
            let mut sum = 0.;
            let mut sum_sq = 0.;
            for d in entry.iter().copied() {
                let d_s = d.as_secs_f64();
                sum += d_s;
                sum_sq += d_s * d_s;
                max = max.max(d);
                min = min.min(d);
            }
            let len = entry.len().max(1) as f64;
            let avg = sum / len;
            let stddev = (sum_sq / len - avg * avg).max(0.).sqrt();

            writeln!(f, "{:2} {:width$} {:12.6} ms {:12.6} ms {:12.6} ms {:12.6} ms", i, key, avg * 1e3, min.as_secs_f64() * 1e3, max.as_secs_f64() * 1e3, stddev * 1e3, width=max_name)?;
        }

        Ok(())
    }
}

/// Named timestamps for the stages of handling one batch
#[derive(Clone, Debug)]
pub struct TimeProfile {
    /// Start timestamp
    now: Instant,
    /// Named timestamps
    stamps: Vec<TimeProfileEntry>,
}

impl Default for TimeProfile {
    fn default() -> Self {
        Self {
            now: Instant::now(),
            stamps: Default::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct TimeProfileEntry {
    /// Entry name
    name: Cow<'static, str>,
    /// Entry timestamp
    timestamp: Instant,
}

impl TimeProfileEntry {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }
}

impl TimeProfile {
    /// Get start time
    pub(crate) fn start(&self) -> Instant {
        self.now
    }

    /// Clear all records
    pub fn clear(&mut self) {
        self.stamps.clear();
        self.now = Instant::now();
    }

    /// Record a timestamp right now
    #[inline]
    pub fn stamp(&mut self, name: impl Into<Cow<'static, str>>) {
        self.stamps.push(TimeProfileEntry {
            name: name.into(),
            timestamp: Instant::now(),
        });
    }

    /// Names of recorded stages, in order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.stamps.iter().map(TimeProfileEntry::name)
    }

    /// Get duration from start to last recorded timestamp
    pub fn total_duration(&self) -> Duration {
        match self.stamps.last() {
            Some(last) => last.timestamp.saturating_duration_since(self.now),
            None => Duration::ZERO,
        }
    }
}

impl Display for TimeProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stamps = &self.stamps;

        let max_name_length = stamps.iter()
            .map(|stamp| stamp.name.len())
            .max()
            .unwrap_or(0)
            .max(1);

        let total_time = self.total_duration().as_secs_f64().max(f64::MIN_POSITIVE);

        let mut last_time = self.now;
        for (i, stamp) in stamps.iter().enumerate() {
            let cumtime = stamp.timestamp.saturating_duration_since(self.now);
            let parttime = stamp.timestamp.saturating_duration_since(last_time);

            writeln!(f, "{:2} {:width$} {:12.6} ms {:12.6} ms {:3.0}%",
                i,
                stamp.name,
                parttime.as_secs_f64() * 1000.,
                cumtime.as_secs_f64() * 1000.,
                100. * parttime.as_secs_f64() / total_time,
                width=max_name_length
            )?;

            last_time = stamp.timestamp;
        }
        Ok(())
    }
}
