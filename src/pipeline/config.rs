use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{registry::TagRegistry, transform::{FrameGraph, InsertTransformError, TransformBuffer}, util::{Quat, RigidTransform, Vec3}};

use super::{ConfigError, ConfigLoadError};

/// A fixed transform from `child` into `parent`, e.g. a camera mount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticTransformConfig {
	pub parent: String,
	pub child: String,
	#[serde(default)]
	pub translation: Vec3,
	#[serde(default)]
	pub rotation: Quat,
}

impl StaticTransformConfig {
	pub fn transform(&self) -> RigidTransform {
		RigidTransform::new(self.translation, self.rotation)
	}
}

/// Configuration for [DetectionPipeline](crate::DetectionPipeline) and the node around it.
///
/// Field aliases accept the parameter names used by existing launch files
/// (`tracker_frame`, `ar_tag_ids`, `labels`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
	/// Frame all output detections are expressed in
	#[serde(alias = "tracker_frame")]
	pub common_frame: String,

	/// Marker identities to keep. Index-aligned with `tag_labels`.
	#[serde(alias = "ar_tag_ids")]
	pub tag_identities: Vec<i64>,

	/// Label for each entry of `tag_identities`
	#[serde(alias = "labels")]
	pub tag_labels: Vec<String>,

	/// Hard cap on detections per output batch
	pub max_detections: usize,

	/// How long a single transform lookup may wait for the frame graph
	pub transform_timeout_ms: u64,

	/// How much transform history to keep, in seconds
	pub transform_cache_secs: u64,

	pub input_topic: String,
	pub output_topic: String,

	/// Keep-last depth of the inbound and outbound queues
	pub queue_depth: usize,

	/// Transforms to seed the frame graph with
	pub static_transforms: Vec<StaticTransformConfig>,
}

impl Default for PipelineConfig {
	fn default() -> Self {
		Self {
			common_frame: String::new(),
			tag_identities: Vec::new(),
			tag_labels: Vec::new(),
			max_detections: Self::DEFAULT_MAX_DETECTIONS,
			transform_timeout_ms: 100,
			transform_cache_secs: 10,
			input_topic: "ar_pose_detections".into(),
			output_topic: "converted_detections".into(),
			queue_depth: 10,
			static_transforms: Vec::new(),
		}
	}
}

impl PipelineConfig {
	pub const DEFAULT_MAX_DETECTIONS: usize = 250;

	/// Parse from YAML.
	///
	/// Accepts either the bare parameter mapping, or a ROS-style parameter
	/// file (`<node name>: { ros__parameters: { ... } }`).
	pub fn from_yaml_str(text: &str) -> Result<Self, ConfigLoadError> {
		let value: serde_yaml::Value = serde_yaml::from_str(text)?;
		let params = match Self::ros_parameters(&value) {
			Some(params) => params,
			None => value,
		};
		let config: Self = serde_yaml::from_value(params)?;
		config.validate()?;
		Ok(config)
	}

	/// Read and parse a YAML parameter file
	pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
		let path = path.as_ref();
		tracing::debug!("loading config from {}", path.display());
		let text = std::fs::read_to_string(path)
			.map_err(|source| ConfigLoadError::Read { path: path.to_owned(), source })?;
		Self::from_yaml_str(&text)
	}

	fn ros_parameters(value: &serde_yaml::Value) -> Option<serde_yaml::Value> {
		if let Some(params) = value.get("ros__parameters") {
			return Some(params.clone());
		}
		value.as_mapping()?
			.values()
			.find_map(|node| node.get("ros__parameters"))
			.cloned()
	}

	/// Check everything that can be checked without building anything
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.common_frame.is_empty() {
			return Err(ConfigError::EmptyCommonFrame);
		}
		if self.queue_depth == 0 {
			return Err(ConfigError::ZeroQueueDepth);
		}
		self.registry().map(|_| ())
	}

	/// Build the marker whitelist
	pub fn registry(&self) -> Result<TagRegistry, ConfigError> {
		TagRegistry::new(self.tag_identities.iter().copied(), self.tag_labels.iter().cloned())
	}

	pub fn transform_timeout(&self) -> Duration {
		Duration::from_millis(self.transform_timeout_ms)
	}

	/// A transform buffer seeded with `static_transforms`
	pub fn transform_buffer(&self) -> Result<TransformBuffer, InsertTransformError> {
		let mut graph = FrameGraph::new(Duration::from_secs(self.transform_cache_secs));
		for st in self.static_transforms.iter() {
			graph.set_static(&st.parent, &st.child, st.transform())?;
		}
		Ok(TransformBuffer::with_graph(graph, self.transform_timeout()))
	}
}

#[cfg(test)]
mod test {
	use super::PipelineConfig;
	use crate::{pipeline::{ConfigError, ConfigLoadError}, time::Timestamp};

	#[test]
	fn defaults() {
		let config = PipelineConfig::default();
		assert_eq!(config.max_detections, 250);
		assert_eq!(config.queue_depth, 10);
		assert_eq!(config.validate(), Err(ConfigError::EmptyCommonFrame));
	}

	#[test]
	fn plain_yaml() {
		let config = PipelineConfig::from_yaml_str("
common_frame: world
tag_identities: [5, 9]
tag_labels: [cup, plate]
max_detections: 4
").unwrap();
		assert_eq!(config.common_frame, "world");
		assert_eq!(config.max_detections, 4);
		assert_eq!(config.registry().unwrap().lookup(9), Some("plate"));
	}

	#[test]
	fn ros_parameter_file_with_aliases() {
		let config = PipelineConfig::from_yaml_str("
ar_preproc_node:
  ros__parameters:
    tracker_frame: map
    ar_tag_ids: [1, 2]
    labels: [box, can]
").unwrap();
		assert_eq!(config.common_frame, "map");
		assert_eq!(config.tag_identities, vec![1, 2]);
		assert_eq!(config.max_detections, PipelineConfig::DEFAULT_MAX_DETECTIONS);
	}

	#[test]
	fn mismatch_is_rejected() {
		let err = PipelineConfig::from_yaml_str("
common_frame: world
tag_identities: [5, 9, 11]
tag_labels: [cup, plate]
").unwrap_err();
		assert!(matches!(err, ConfigLoadError::Invalid(ConfigError::LengthMismatch { ids: 3, labels: 2 })));
	}

	#[test]
	fn static_transforms_seed_buffer() {
		let config = PipelineConfig::from_yaml_str("
common_frame: world
static_transforms:
  - parent: world
    child: camera
    translation: {x: 1.0, y: 0.0, z: 2.0}
").unwrap();
		let buffer = config.transform_buffer().unwrap();
		let tf = buffer.lookup("world", "camera", Timestamp::ZERO).unwrap();
		assert_eq!(tf.translation.z(), 2.0);
	}

	#[test]
	fn missing_file() {
		let err = PipelineConfig::from_yaml_file("/nonexistent/params.yaml").unwrap_err();
		assert!(matches!(err, ConfigLoadError::Read { .. }));
	}
}
