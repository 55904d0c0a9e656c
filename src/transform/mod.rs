//! Frame transforms
//!
//! The pipeline only needs [FrameTransformer]: "express this stamped pose in
//! that frame, or tell me you can't". [TransformBuffer] is an in-process
//! implementation backed by a tree of (possibly time-varying) rigid transforms.
mod buffer;

use std::{sync::Arc, time::Duration};

use thiserror::Error;

use crate::{time::Timestamp, util::Pose};

pub use buffer::{TransformBuffer, FrameGraph, InsertTransformError};

/// Why a pose could not be expressed in the requested frame.
///
/// Callers in the detection path treat every variant the same way.
#[derive(Clone, Debug, PartialEq, Error)]
#[non_exhaustive]
pub enum TransformUnavailable {
	#[error("Frame '{0}' does not exist")]
	UnknownFrame(String),
	#[error("No connection between frames '{source_frame}' and '{target_frame}'")]
	NoPath {
		source_frame: String,
		target_frame: String,
	},
	#[error("Requested time {requested} is outside the buffered range [{earliest}, {latest}] for frame '{frame}'")]
	Extrapolation {
		frame: String,
		requested: Timestamp,
		earliest: Timestamp,
		latest: Timestamp,
	},
	#[error("Timed out after {waited:?} waiting for transform '{source_frame}' -> '{target_frame}'")]
	Timeout {
		source_frame: String,
		target_frame: String,
		waited: Duration,
	},
}

impl TransformUnavailable {
	/// Could this lookup succeed later, once more transforms arrive?
	pub fn is_transient(&self) -> bool {
		match self {
			Self::UnknownFrame(_) | Self::NoPath { .. } => true,
			Self::Extrapolation { requested, latest, .. } => requested > latest,
			Self::Timeout { .. } => false,
		}
	}
}

/// Re-expresses stamped poses in another frame.
pub trait FrameTransformer {
	/// Express `pose` (given in `source_frame` at `stamp`) in `target_frame`.
	///
	/// Implementations may block, but must give up within their own timeout.
	fn transform(&self, pose: &Pose, stamp: Timestamp, source_frame: &str, target_frame: &str) -> Result<Pose, TransformUnavailable>;
}

impl<T: FrameTransformer + ?Sized> FrameTransformer for &T {
	fn transform(&self, pose: &Pose, stamp: Timestamp, source_frame: &str, target_frame: &str) -> Result<Pose, TransformUnavailable> {
		(**self).transform(pose, stamp, source_frame, target_frame)
	}
}

impl<T: FrameTransformer + ?Sized> FrameTransformer for Arc<T> {
	fn transform(&self, pose: &Pose, stamp: Timestamp, source_frame: &str, target_frame: &str) -> Result<Pose, TransformUnavailable> {
		(**self).transform(pose, stamp, source_frame, target_frame)
	}
}

/// Treats every frame as the same frame
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityTransformer;

impl FrameTransformer for IdentityTransformer {
	fn transform(&self, pose: &Pose, _stamp: Timestamp, _source_frame: &str, _target_frame: &str) -> Result<Pose, TransformUnavailable> {
		Ok(*pose)
	}
}
