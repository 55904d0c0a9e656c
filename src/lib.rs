//! Converts fiducial marker detections into labelled 3D object detections
//! in a common frame, ready for a downstream tracker.
//!
//! ```
//! use marker_preproc::{PipelineBuilder, IdentityTransformer, MarkerBatch, MarkerObservation, Header, Timestamp, Pose};
//!
//! let pipeline = PipelineBuilder::default()
//!     .with_common_frame("world")
//!     .with_tag(5, "cup")
//!     .build(IdentityTransformer)
//!     .unwrap();
//!
//! let raw = MarkerBatch::new(
//!     Header::new(Timestamp::new(10, 0), "camera"),
//!     vec![MarkerObservation::new(5, Pose::identity()), MarkerObservation::new(7, Pose::identity())],
//! );
//! let out = pipeline.process(&raw, Timestamp::now());
//! assert_eq!(out.detections.len(), 1);
//! assert_eq!(out.detections[0].class_string, "cup");
//! ```

pub mod util;
mod time;
mod marker;
mod detection;
mod registry;
pub mod transform;
mod pipeline;
pub mod transport;
mod node;
mod dbg;

pub use util::{Pose, Quat, RigidTransform, Vec3};
pub use time::{Header, Timestamp};
pub use marker::{MarkerBatch, MarkerObservation};
pub use detection::{
	annotate,
	BoundingBox3D,
	Detection,
	DetectionBatch,
	KeyValue,
	CLASS_CONFIDENCE,
	KEY_NUM_RECEIVED,
	KEY_TIME_RECEIVED,
};
pub use registry::TagRegistry;
pub use transform::{FrameTransformer, IdentityTransformer, TransformBuffer, TransformUnavailable};
pub use pipeline::{
	BatchSummary,
	ConfigError,
	ConfigLoadError,
	DetectionPipeline,
	PipelineBuildError,
	PipelineBuilder,
	PipelineConfig,
	StaticTransformConfig,
};
pub use transport::{Publisher, Subscriber, Topic, TransportError};
pub use node::{NodeStats, PreprocNode, SpinOutcome};
pub use dbg::{TimeProfile, TimeProfileStatistics};
