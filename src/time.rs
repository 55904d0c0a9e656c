use std::{fmt::Display, time::{Duration, SystemTime, UNIX_EPOCH}};

use serde::{Deserialize, Serialize};

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Message timestamp (`builtin_interfaces/Time` layout)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp {
	#[serde(default)]
	pub sec: i32,
	#[serde(default)]
	pub nanosec: u32,
}

impl Timestamp {
	pub const ZERO: Self = Self { sec: 0, nanosec: 0 };

	pub const fn new(sec: i32, nanosec: u32) -> Self {
		Self { sec, nanosec }
	}

	/// Build from nanoseconds since the epoch (saturating at the `i32` seconds range)
	pub fn from_nanos(nanos: i64) -> Self {
		let sec = nanos.div_euclid(NANOS_PER_SEC);
		let nanosec = nanos.rem_euclid(NANOS_PER_SEC) as u32;
		let sec = sec.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
		Self { sec, nanosec }
	}

	pub const fn as_nanos(&self) -> i64 {
		(self.sec as i64) * NANOS_PER_SEC + (self.nanosec as i64)
	}

	pub fn as_secs_f64(&self) -> f64 {
		self.as_nanos() as f64 * 1e-9
	}

	/// Wall-clock time
	pub fn now() -> Self {
		let since_epoch = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.unwrap_or(Duration::ZERO);
		Self::from_nanos(i64::try_from(since_epoch.as_nanos()).unwrap_or(i64::MAX))
	}

	/// Signed difference `self - rhs`, in nanoseconds
	pub const fn nanos_since(&self, rhs: &Timestamp) -> i64 {
		self.as_nanos() - rhs.as_nanos()
	}

	pub fn saturating_sub(&self, duration: Duration) -> Self {
		let nanos = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
		Self::from_nanos(self.as_nanos().saturating_sub(nanos))
	}
}

impl Display for Timestamp {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}.{:09}", self.sec, self.nanosec)
	}
}

/// Message header: when, and in which frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Header {
	#[serde(default)]
	pub stamp: Timestamp,
	#[serde(default)]
	pub frame_id: String,
}

impl Header {
	pub fn new(stamp: Timestamp, frame_id: impl Into<String>) -> Self {
		Self { stamp, frame_id: frame_id.into() }
	}
}
