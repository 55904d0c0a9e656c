use tracing::{info, warn};

use crate::{
	dbg::{TimeProfile, TimeProfileStatistics},
	detection::DetectionBatch,
	marker::MarkerBatch,
	pipeline::DetectionPipeline,
	time::Timestamp,
	transform::FrameTransformer,
	transport::{Publisher, Subscriber},
};

/// Result of one [PreprocNode::spin_once]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpinOutcome {
	/// A batch was processed and handed to the publisher
	Handled,
	/// An inbound message could not be received (bad message), nothing published
	Skipped,
	/// Nothing waiting
	Idle,
	/// The inbound side is closed
	Closed,
}

/// Counters over the node's lifetime
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeStats {
	/// Raw batches processed
	pub received: usize,
	/// Output batches accepted by the publisher
	pub published: usize,
	/// Detections across all published batches
	pub detections: usize,
	pub publish_failures: usize,
	pub receive_errors: usize,
}

/// Subscriber -> [DetectionPipeline] -> publisher, one batch at a time.
pub struct PreprocNode<T, S, P> {
	pipeline: DetectionPipeline<T>,
	subscriber: S,
	publisher: P,
	clock: fn() -> Timestamp,
	stats: NodeStats,
	profile: Option<TimeProfileStatistics>,
}

impl<T, S, P> PreprocNode<T, S, P>
where
	T: FrameTransformer,
	S: Subscriber<MarkerBatch>,
	P: Publisher<DetectionBatch>,
{
	pub fn new(pipeline: DetectionPipeline<T>, subscriber: S, publisher: P) -> Self {
		info!(
			common_frame = pipeline.common_frame(),
			tags = pipeline.registry().len(),
			max_detections = pipeline.max_detections(),
			"marker preprocessing node ready"
		);
		Self {
			pipeline,
			subscriber,
			publisher,
			clock: Timestamp::now,
			stats: NodeStats::default(),
			profile: None,
		}
	}

	/// Use `clock` for receipt times instead of the wall clock
	pub fn with_clock(mut self, clock: fn() -> Timestamp) -> Self {
		self.clock = clock;
		self
	}

	/// Collect per-stage timing for every batch
	pub fn with_profiling(mut self) -> Self {
		self.profile = Some(TimeProfileStatistics::default());
		self
	}

	pub fn pipeline(&self) -> &DetectionPipeline<T> {
		&self.pipeline
	}

	pub fn stats(&self) -> NodeStats {
		self.stats
	}

	pub fn profile(&self) -> Option<&TimeProfileStatistics> {
		self.profile.as_ref()
	}

	pub fn into_parts(self) -> (DetectionPipeline<T>, S, P) {
		(self.pipeline, self.subscriber, self.publisher)
	}

	/// Process one raw batch and publish the result
	pub fn handle(&mut self, batch: MarkerBatch) {
		let received_at = (self.clock)();
		let mut tp = TimeProfile::default();

		let out = self.pipeline.process_profiled(&batch, received_at, &mut tp);
		self.stats.received += 1;
		let n_detections = out.detections.len();

		match self.publisher.publish(out) {
			Ok(()) => {
				self.stats.published += 1;
				self.stats.detections += n_detections;
			},
			Err(e) => {
				self.stats.publish_failures += 1;
				warn!("Unable to publish detections: {e}");
			},
		}
		tp.stamp("publish");

		if let Some(profile) = self.profile.as_mut() {
			profile.add(&tp);
		}
	}

	/// Handle at most one waiting batch
	pub fn spin_once(&mut self) -> SpinOutcome {
		match self.subscriber.try_recv() {
			Ok(Some(batch)) => {
				self.handle(batch);
				SpinOutcome::Handled
			},
			Ok(None) => SpinOutcome::Idle,
			Err(e) if e.is_closed() => SpinOutcome::Closed,
			Err(e) => {
				self.stats.receive_errors += 1;
				warn!("Dropping inbound message: {e}");
				SpinOutcome::Skipped
			},
		}
	}

	/// Handle batches until none are waiting (or the input closes)
	pub fn spin_until_idle(&mut self) -> SpinOutcome {
		loop {
			match self.spin_once() {
				SpinOutcome::Handled | SpinOutcome::Skipped => continue,
				outcome => return outcome,
			}
		}
	}
}

#[cfg(test)]
mod test {
	use super::{PreprocNode, SpinOutcome};
	use crate::{
		detection::{DetectionBatch, KEY_TIME_RECEIVED},
		marker::{MarkerBatch, MarkerObservation},
		pipeline::{DetectionPipeline, PipelineBuilder},
		time::{Header, Timestamp},
		transform::IdentityTransformer,
		transport::{Publisher, Subscriber, Topic, TransportError},
		util::Pose,
	};

	fn fixed_clock() -> Timestamp {
		Timestamp::new(42, 0)
	}

	fn pipeline() -> DetectionPipeline<IdentityTransformer> {
		PipelineBuilder::default()
			.with_common_frame("world")
			.with_tag(5, "cup")
			.build(IdentityTransformer)
			.unwrap()
	}

	fn raw(ids: &[i64]) -> MarkerBatch {
		let markers = ids.iter().map(|id| MarkerObservation::new(*id, Pose::identity())).collect();
		MarkerBatch::new(Header::new(Timestamp::new(1, 0), "camera"), markers)
	}

	/// Publisher that always fails
	struct Broken;

	impl Publisher<DetectionBatch> for Broken {
		fn publish(&mut self, _message: DetectionBatch) -> Result<(), TransportError> {
			Err(TransportError::Closed("broken".into()))
		}
	}

	#[test]
	fn one_output_per_input() {
		let mut input = Topic::new("in", 10);
		let mut node = PreprocNode::new(pipeline(), input.clone(), Topic::new("out", 10))
			.with_clock(fixed_clock)
			.with_profiling();

		input.publish(raw(&[5, 7])).unwrap();
		input.publish(raw(&[])).unwrap();
		assert_eq!(node.spin_until_idle(), SpinOutcome::Idle);

		let stats = node.stats();
		assert_eq!(stats.received, 2);
		assert_eq!(stats.published, 2);
		assert_eq!(stats.detections, 1);
		assert_eq!(node.profile().map(|p| p.len()), Some(2));

		let (pipeline, _, mut output) = node.into_parts();
		assert_eq!(pipeline.common_frame(), "world");
		let first = output.try_recv().unwrap().unwrap();
		assert_eq!(first.detections.len(), 1);
		assert_eq!(first.metadata_value(KEY_TIME_RECEIVED), Some("42000000000"));
		let second = output.try_recv().unwrap().unwrap();
		assert!(second.detections.is_empty());
		assert_eq!(output.try_recv().unwrap(), None);
	}

	#[test]
	fn closed_input_stops_spin() {
		let input = Topic::<MarkerBatch>::new("in", 10);
		input.close();
		let mut node = PreprocNode::new(pipeline(), input, Topic::new("out", 10));
		assert_eq!(node.spin_until_idle(), SpinOutcome::Closed);
	}

	#[test]
	fn publish_failure_is_counted_not_fatal() {
		let mut input = Topic::new("in", 10);
		let mut node = PreprocNode::new(pipeline(), input.clone(), Broken);
		input.publish(raw(&[5])).unwrap();
		assert_eq!(node.spin_once(), SpinOutcome::Handled);
		assert_eq!(node.stats().publish_failures, 1);
		assert_eq!(node.stats().published, 0);
	}
}
