mod builder;
mod config;
mod error;

pub use builder::PipelineBuilder;
pub use config::{PipelineConfig, StaticTransformConfig};
pub use error::{ConfigError, ConfigLoadError, PipelineBuildError};

use tracing::{debug, warn};

use crate::{
	dbg::TimeProfile,
	detection::{annotate, Detection, DetectionBatch},
	marker::{MarkerBatch, MarkerObservation},
	registry::TagRegistry,
	time::Timestamp,
	transform::FrameTransformer,
};

/// Turns raw marker batches into labelled detections in a common frame.
///
/// Holds no per-batch state: every call to [process](Self::process) starts
/// from an empty output batch.
#[derive(Debug)]
pub struct DetectionPipeline<T> {
	registry: TagRegistry,
	transformer: T,
	common_frame: String,
	max_detections: usize,
}

/// What happened to the markers of one batch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
	/// Markers whose identity is not whitelisted
	pub unregistered: usize,
	/// Whitelisted markers whose pose could not be transformed
	pub untransformable: usize,
	/// Whitelisted markers dropped because the batch was full
	pub over_capacity: usize,
	/// Detections emitted
	pub emitted: usize,
}

impl<T: FrameTransformer> DetectionPipeline<T> {
	pub fn new(registry: TagRegistry, transformer: T, common_frame: impl Into<String>, max_detections: usize) -> Self {
		Self {
			registry,
			transformer,
			common_frame: common_frame.into(),
			max_detections,
		}
	}

	pub fn registry(&self) -> &TagRegistry {
		&self.registry
	}

	pub fn transformer(&self) -> &T {
		&self.transformer
	}

	pub fn common_frame(&self) -> &str {
		&self.common_frame
	}

	pub fn max_detections(&self) -> usize {
		self.max_detections
	}

	/// Filter, transform and label `batch`, then annotate it with `received_at`.
	///
	/// Never fails: markers that can't be used are skipped.
	pub fn process(&self, batch: &MarkerBatch, received_at: Timestamp) -> DetectionBatch {
		let mut tp = TimeProfile::default();
		self.process_profiled(batch, received_at, &mut tp)
	}

	/// [process](Self::process), recording stage timing into `tp`
	pub fn process_profiled(&self, batch: &MarkerBatch, received_at: Timestamp, tp: &mut TimeProfile) -> DetectionBatch {
		let (detections, summary) = self.assemble(batch);
		tp.stamp("assemble");

		let detections = annotate(detections, received_at);
		tp.stamp("annotate");

		debug!(
			stamp = %batch.header.stamp,
			markers = batch.markers.len(),
			emitted = summary.emitted,
			unregistered = summary.unregistered,
			untransformable = summary.untransformable,
			over_capacity = summary.over_capacity,
			"processed marker batch"
		);
		detections
	}

	/// Build the (un-annotated) output batch for `batch`
	pub fn assemble(&self, batch: &MarkerBatch) -> (DetectionBatch, BatchSummary) {
		let mut out = DetectionBatch::empty(self.common_frame.as_str(), batch.header.stamp);
		out.detections.reserve(self.max_detections.min(batch.markers.len()));
		let mut summary = BatchSummary::default();

		for marker in batch.markers.iter() {
			let label = match self.registry.lookup(marker.id) {
				Some(label) => label,
				None => {
					summary.unregistered += 1;
					continue;
				}
			};

			// Full: don't bother waiting on the transformer
			if out.detections.len() >= self.max_detections {
				summary.over_capacity += 1;
				continue;
			}

			match self.detect(marker, label, batch) {
				Some(detection) => out.detections.push(detection),
				None => summary.untransformable += 1,
			}
		}

		summary.emitted = out.detections.len();
		(out, summary)
	}

	/// Express one whitelisted marker as a detection in the common frame
	fn detect(&self, marker: &MarkerObservation, label: &str, batch: &MarkerBatch) -> Option<Detection> {
		let source_frame = source_frame(marker, batch);
		match self.transformer.transform(&marker.pose, batch.header.stamp, source_frame, &self.common_frame) {
			Ok(pose) => Some(Detection::from_marker_pose(pose, label)),
			Err(e) => {
				warn!(id = marker.id, source_frame, target_frame = %self.common_frame, "Skipping marker: {e}");
				None
			}
		}
	}
}

/// Frame a marker's pose is expressed in: its own, else the batch's
fn source_frame<'a>(marker: &'a MarkerObservation, batch: &'a MarkerBatch) -> &'a str {
	if marker.source_frame.is_empty() {
		&batch.header.frame_id
	} else {
		&marker.source_frame
	}
}
