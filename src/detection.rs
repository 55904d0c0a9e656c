use serde::{Deserialize, Serialize};

use crate::{time::{Header, Timestamp}, util::{Pose, Vec3}};

/// Confidence attached to every marker-derived detection
pub const CLASS_CONFIDENCE: f32 = 0.99;

/// Metadata key for the wall-clock receipt time (nanoseconds)
pub const KEY_TIME_RECEIVED: &str = "time_det_rcvd";
/// Metadata key for the number of raw batches folded into this one
pub const KEY_NUM_RECEIVED: &str = "num_dets_rcvd";

/// Each output batch comes from exactly one raw batch
const RAW_BATCHES_PER_OUTPUT: usize = 1;

/// Oriented 3D box
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox3D {
	pub center: Pose,
	pub size: Vec3,
}

impl BoundingBox3D {
	/// Zero-extent box at `center`. Markers carry no extent information.
	pub const fn degenerate(center: Pose) -> Self {
		Self { center, size: Vec3::zero() }
	}
}

/// String key/value pair (`diagnostic_msgs/KeyValue` layout)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyValue {
	pub key: String,
	pub value: String,
}

impl KeyValue {
	pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
		Self { key: key.into(), value: value.into() }
	}
}

/// A labelled object pose in the common frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
	pub pose: Pose,
	pub bbox: BoundingBox3D,
	pub class_string: String,
	pub class_confidence: f32,
	/// Per-detection metadata (unused by this node, always empty)
	#[serde(default)]
	pub metadata: Vec<KeyValue>,
	/// No image crop is attached to marker detections
	#[serde(default)]
	pub image_available: bool,
}

impl Detection {
	/// Build the detection for a marker whose pose is already in the common frame.
	pub fn from_marker_pose(pose: Pose, label: &str) -> Self {
		Self {
			pose,
			bbox: BoundingBox3D::degenerate(pose),
			class_string: label.to_owned(),
			class_confidence: CLASS_CONFIDENCE,
			metadata: Vec::new(),
			image_available: false,
		}
	}
}

/// Detections from one upstream observation cycle
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionBatch {
	pub header: Header,
	pub metadata: Vec<KeyValue>,
	pub detections: Vec<Detection>,
}

impl DetectionBatch {
	/// Empty batch in `frame_id`, stamped at `stamp`
	pub fn empty(frame_id: impl Into<String>, stamp: Timestamp) -> Self {
		Self {
			header: Header::new(stamp, frame_id),
			metadata: Vec::new(),
			detections: Vec::new(),
		}
	}

	pub fn len(&self) -> usize {
		self.detections.len()
	}

	pub fn is_empty(&self) -> bool {
		self.detections.is_empty()
	}

	/// First metadata value for `key`
	pub fn metadata_value(&self, key: &str) -> Option<&str> {
		self.metadata
			.iter()
			.find(|kv| kv.key == key)
			.map(|kv| kv.value.as_str())
	}

	/// Receipt time recorded by the annotator, if present and well-formed
	pub fn received_at(&self) -> Option<Timestamp> {
		self.metadata_value(KEY_TIME_RECEIVED)?
			.parse::<i64>()
			.ok()
			.map(Timestamp::from_nanos)
	}
}

/// Stamp `batch` with receipt-time and raw-batch-count metadata.
///
/// Appends exactly two entries, in order: [KEY_TIME_RECEIVED] then
/// [KEY_NUM_RECEIVED]. The count is the number of raw batches that went into
/// this output, which for this node is always one.
pub fn annotate(mut batch: DetectionBatch, received_at: Timestamp) -> DetectionBatch {
	batch.metadata.push(KeyValue::new(KEY_TIME_RECEIVED, received_at.as_nanos().to_string()));
	batch.metadata.push(KeyValue::new(KEY_NUM_RECEIVED, RAW_BATCHES_PER_OUTPUT.to_string()));
	batch
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn marker_detection_is_degenerate() {
		let pose = Pose::from_position(Vec3::of(1., 2., 3.));
		let det = Detection::from_marker_pose(pose, "cup");
		assert_eq!(det.bbox.center, pose);
		assert_eq!(det.bbox.size, Vec3::zero());
		assert_eq!(det.class_confidence, CLASS_CONFIDENCE);
		assert_eq!(det.class_string, "cup");
		assert!(!det.image_available);
	}

	#[test]
	fn annotate_appends_two_entries_in_order() {
		let batch = DetectionBatch::empty("world", Timestamp::new(3, 0));
		let batch = annotate(batch, Timestamp::new(5, 42));
		assert_eq!(batch.metadata.len(), 2);
		assert_eq!(batch.metadata[0], KeyValue::new(KEY_TIME_RECEIVED, "5000000042"));
		assert_eq!(batch.metadata[1], KeyValue::new(KEY_NUM_RECEIVED, "1"));
		assert_eq!(batch.received_at(), Some(Timestamp::new(5, 42)));
	}

	#[test]
	fn annotate_ignores_detection_count() {
		let mut batch = DetectionBatch::empty("world", Timestamp::ZERO);
		for _ in 0..3 {
			batch.detections.push(Detection::from_marker_pose(Pose::identity(), "x"));
		}
		let batch = annotate(batch, Timestamp::ZERO);
		assert_eq!(batch.metadata_value(KEY_NUM_RECEIVED), Some("1"));
	}
}
