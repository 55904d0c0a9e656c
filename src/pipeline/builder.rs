use crate::{transform::{FrameTransformer, TransformBuffer}, PipelineBuildError};
use super::{DetectionPipeline, PipelineConfig};

#[derive(Clone, Default)]
pub struct PipelineBuilder {
	/// Configuration parameters
	pub config: PipelineConfig,
}

impl From<PipelineConfig> for PipelineBuilder {
	fn from(config: PipelineConfig) -> Self {
		Self::new(config)
	}
}

impl PipelineBuilder {
	pub fn new(config: PipelineConfig) -> Self {
		Self { config }
	}

	/// Set the frame detections are expressed in
	pub fn with_common_frame(mut self, frame: impl Into<String>) -> Self {
		self.config.common_frame = frame.into();
		self
	}

	/// Whitelist a marker identity
	pub fn add_tag(&mut self, id: i64, label: impl Into<String>) {
		self.config.tag_identities.push(id);
		self.config.tag_labels.push(label.into());
	}

	/// Whitelist a marker identity (reduce copying)
	pub fn with_tag(mut self, id: i64, label: impl Into<String>) -> Self {
		self.add_tag(id, label);
		self
	}

	pub fn with_max_detections(mut self, max_detections: usize) -> Self {
		self.config.max_detections = max_detections;
		self
	}

	/// Clear the marker whitelist
	pub fn clear_tags(&mut self) {
		self.config.tag_identities.clear();
		self.config.tag_labels.clear();
	}

	/// Build a pipeline that transforms poses with `transformer`
	pub fn build<T: FrameTransformer>(self, transformer: T) -> Result<DetectionPipeline<T>, PipelineBuildError> {
		self.config.validate()?;
		let registry = self.config.registry()?;
		if registry.is_empty() {
			tracing::warn!("No marker identities configured; every batch will be empty");
		}
		if self.config.max_detections == 0 {
			tracing::warn!("max_detections is 0; every batch will be empty");
		}
		Ok(DetectionPipeline::new(registry, transformer, self.config.common_frame, self.config.max_detections))
	}

	/// Build a pipeline backed by a [TransformBuffer] seeded from `static_transforms`
	pub fn build_with_buffer(self) -> Result<DetectionPipeline<TransformBuffer>, PipelineBuildError> {
		let buffer = self.config.transform_buffer()?;
		self.build(buffer)
	}
}
