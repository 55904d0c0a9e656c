use std::{io, path::PathBuf};

use thiserror::Error;

use crate::transform::InsertTransformError;

/// Problem with the static configuration.
///
/// Any of these is fatal at startup: the node must not handle messages.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Tag identity and label lists differ in length (identities: {ids}, labels: {labels})")]
    LengthMismatch {
        ids: usize,
        labels: usize,
    },
    #[error("Tag identity {0} is listed more than once")]
    DuplicateId(i64),
    #[error("No common frame was configured")]
    EmptyCommonFrame,
    #[error("Queue depth must be at least 1")]
    ZeroQueueDepth,
}

/// Error reading a configuration file
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigLoadError {
    #[error("Unable to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid YAML")]
    Parse(#[from] serde_yaml::Error),
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Error generated when attempting to [build](crate::PipelineBuilder::build) a [DetectionPipeline](crate::DetectionPipeline)
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineBuildError {
    #[error("Invalid configuration")]
    Config(#[from] ConfigError),
    #[error("Invalid static transform")]
    StaticTransform(#[from] InsertTransformError),
}

impl PartialEq for PipelineBuildError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Config(l0), Self::Config(r0)) => l0 == r0,
            (Self::StaticTransform(l0), Self::StaticTransform(r0)) => l0 == r0,
            _ => false,
        }
    }
}
