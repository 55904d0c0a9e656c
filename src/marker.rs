use serde::{Deserialize, Serialize};

use crate::{time::{Header, Timestamp}, util::Pose};

/// A single fiducial marker, as reported by the upstream pose estimator.
///
/// The pose is expressed in `source_frame` when that is set, otherwise in the
/// frame named by the enclosing [MarkerBatch] header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerObservation {
	/// Decoded marker identity
	pub id: i64,
	/// Estimated pose in the marker's frame
	#[serde(default)]
	pub pose: Pose,
	/// Frame the pose is expressed in; empty means the batch header's frame
	#[serde(default)]
	pub source_frame: String,
	#[serde(default)]
	pub stamp: Timestamp,
}

impl MarkerObservation {
	pub fn new(id: i64, pose: Pose) -> Self {
		Self {
			id,
			pose,
			source_frame: String::new(),
			stamp: Timestamp::ZERO,
		}
	}
}

/// One upstream observation cycle
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarkerBatch {
	#[serde(default)]
	pub header: Header,
	#[serde(default)]
	pub markers: Vec<MarkerObservation>,
}

impl MarkerBatch {
	pub fn new(header: Header, markers: Vec<MarkerObservation>) -> Self {
		Self { header, markers }
	}

	pub fn len(&self) -> usize {
		self.markers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.markers.is_empty()
	}
}
