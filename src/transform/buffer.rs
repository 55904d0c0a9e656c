use std::{collections::VecDeque, time::{Duration, Instant}};

use hashbrown::HashMap;
use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use crate::{time::Timestamp, util::{Pose, RigidTransform}};

use super::{FrameTransformer, TransformUnavailable};

/// Longest parent chain we will walk before assuming the graph is corrupt
const MAX_GRAPH_DEPTH: usize = 1000;

/// Error when adding a transform to a [FrameGraph]
#[derive(Clone, Debug, PartialEq, Error)]
#[non_exhaustive]
pub enum InsertTransformError {
	#[error("Frame id must not be empty")]
	EmptyFrameId,
	#[error("Frame '{0}' cannot be its own parent")]
	SelfParent(String),
	#[error("Making '{parent}' the parent of '{child}' would create a loop")]
	Cycle {
		parent: String,
		child: String,
	},
	#[error("Transform for '{child}' at {stamp} is older than the cache window")]
	TooOld {
		child: String,
		stamp: Timestamp,
	},
}

/// Transform history for one edge
#[derive(Clone, Debug)]
enum EdgeHistory {
	/// Valid at every time
	Static(RigidTransform),
	/// Time-ordered samples (oldest first)
	Dynamic(VecDeque<(Timestamp, RigidTransform)>),
}

/// The edge from a frame to its parent
#[derive(Clone, Debug)]
struct ParentEdge {
	parent: String,
	history: EdgeHistory,
}

impl ParentEdge {
	/// Transform (child -> parent) at `stamp`. [Timestamp::ZERO] means "latest".
	fn at(&self, child: &str, stamp: Timestamp) -> Result<RigidTransform, TransformUnavailable> {
		let samples = match &self.history {
			EdgeHistory::Static(tf) => return Ok(*tf),
			EdgeHistory::Dynamic(samples) => samples,
		};

		let (earliest, latest) = match (samples.front(), samples.back()) {
			(Some(first), Some(last)) => (first, last),
			_ => return Err(TransformUnavailable::UnknownFrame(child.to_owned())),
		};

		if stamp == Timestamp::ZERO {
			return Ok(latest.1);
		}

		if stamp < earliest.0 || stamp > latest.0 {
			return Err(TransformUnavailable::Extrapolation {
				frame: child.to_owned(),
				requested: stamp,
				earliest: earliest.0,
				latest: latest.0,
			});
		}

		// First sample at or after `stamp`
		let idx = samples.partition_point(|(ts, _)| *ts < stamp);
		let (t1, tf1) = samples[idx];
		if t1 == stamp || idx == 0 {
			return Ok(tf1);
		}
		let (t0, tf0) = samples[idx - 1];
		let ratio = stamp.nanos_since(&t0) as f64 / t1.nanos_since(&t0) as f64;
		Ok(tf0.interpolate(&tf1, ratio))
	}
}

/// A forest of coordinate frames, each with at most one parent.
#[derive(Clone, Debug)]
pub struct FrameGraph {
	/// child frame -> edge to its parent
	edges: HashMap<String, ParentEdge>,
	/// How much history to keep for dynamic edges
	cache_duration: Duration,
}

impl Default for FrameGraph {
	fn default() -> Self {
		Self::new(Self::DEFAULT_CACHE_DURATION)
	}
}

impl FrameGraph {
	pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(10);

	pub fn new(cache_duration: Duration) -> Self {
		Self {
			edges: HashMap::new(),
			cache_duration,
		}
	}

	/// Is `frame` mentioned anywhere in the graph?
	pub fn has_frame(&self, frame: &str) -> bool {
		self.edges.contains_key(frame) || self.edges.values().any(|edge| edge.parent == frame)
	}

	fn check_edge(&self, parent: &str, child: &str) -> Result<(), InsertTransformError> {
		if parent.is_empty() || child.is_empty() {
			return Err(InsertTransformError::EmptyFrameId);
		}
		if parent == child {
			return Err(InsertTransformError::SelfParent(child.to_owned()));
		}
		// `child` may not already be an ancestor of `parent`
		let mut cursor = parent;
		for _ in 0..MAX_GRAPH_DEPTH {
			match self.edges.get(cursor) {
				Some(edge) if edge.parent == child => {
					return Err(InsertTransformError::Cycle { parent: parent.to_owned(), child: child.to_owned() });
				},
				Some(edge) => cursor = edge.parent.as_str(),
				None => return Ok(()),
			}
		}
		Err(InsertTransformError::Cycle { parent: parent.to_owned(), child: child.to_owned() })
	}

	/// Set a time-invariant transform mapping `child` coordinates into `parent`.
	///
	/// Replaces any previous edge from `child`.
	pub fn set_static(&mut self, parent: &str, child: &str, transform: RigidTransform) -> Result<(), InsertTransformError> {
		self.check_edge(parent, child)?;
		self.edges.insert(child.to_owned(), ParentEdge {
			parent: parent.to_owned(),
			history: EdgeHistory::Static(transform),
		});
		Ok(())
	}

	/// Record a sample of the transform mapping `child` coordinates into `parent` at `stamp`.
	pub fn set_dynamic(&mut self, parent: &str, child: &str, stamp: Timestamp, transform: RigidTransform) -> Result<(), InsertTransformError> {
		self.check_edge(parent, child)?;

		let cache_duration = self.cache_duration;
		let edge = self.edges
			.entry(child.to_owned())
			.or_insert_with(|| ParentEdge {
				parent: parent.to_owned(),
				history: EdgeHistory::Dynamic(VecDeque::new()),
			});

		// Re-parenting or static -> dynamic drops the old history
		if edge.parent != parent || matches!(edge.history, EdgeHistory::Static(_)) {
			edge.parent = parent.to_owned();
			edge.history = EdgeHistory::Dynamic(VecDeque::new());
		}

		let EdgeHistory::Dynamic(samples) = &mut edge.history else {
			unreachable!("edge history was just made dynamic");
		};

		if let Some((newest, _)) = samples.back() {
			if *newest > stamp && newest.saturating_sub(cache_duration) > stamp {
				return Err(InsertTransformError::TooOld { child: child.to_owned(), stamp });
			}
		}

		let idx = samples.partition_point(|(ts, _)| *ts < stamp);
		match samples.get_mut(idx) {
			Some(slot) if slot.0 == stamp => slot.1 = transform,
			_ => samples.insert(idx, (stamp, transform)),
		}

		// Prune history outside the cache window
		if let Some((newest, _)) = samples.back() {
			let horizon = newest.saturating_sub(cache_duration);
			while samples.len() > 1 && samples.front().map_or(false, |(ts, _)| *ts < horizon) {
				samples.pop_front();
			}
		}
		Ok(())
	}

	/// Frames from `frame` up to its root, starting with `frame` itself.
	///
	/// Only follows parent names: no edge is evaluated.
	fn ancestors<'a>(&'a self, frame: &'a str) -> Result<Vec<&'a str>, TransformUnavailable> {
		let mut chain = vec![frame];
		let mut cursor = frame;
		for _ in 0..MAX_GRAPH_DEPTH {
			match self.edges.get(cursor) {
				Some(edge) => {
					cursor = edge.parent.as_str();
					chain.push(cursor);
				},
				None => return Ok(chain),
			}
		}
		Err(TransformUnavailable::NoPath { source_frame: frame.to_owned(), target_frame: cursor.to_owned() })
	}

	/// Transform mapping `frame` coordinates into `ancestor` at `stamp`.
	///
	/// Evaluates only the edges strictly below `ancestor`.
	fn to_ancestor(&self, frame: &str, ancestor: &str, stamp: Timestamp) -> Result<RigidTransform, TransformUnavailable> {
		let mut acc = RigidTransform::identity();
		let mut cursor = frame;
		while cursor != ancestor {
			let edge = self.edges.get(cursor)
				.ok_or_else(|| TransformUnavailable::NoPath { source_frame: frame.to_owned(), target_frame: ancestor.to_owned() })?;
			acc = edge.at(cursor, stamp)?.compose(&acc);
			cursor = edge.parent.as_str();
		}
		Ok(acc)
	}

	/// Transform mapping `source_frame` coordinates into `target_frame` at `stamp`
	pub fn lookup(&self, target_frame: &str, source_frame: &str, stamp: Timestamp) -> Result<RigidTransform, TransformUnavailable> {
		if target_frame == source_frame {
			return Ok(RigidTransform::identity());
		}
		for frame in [source_frame, target_frame] {
			if !self.has_frame(frame) {
				return Err(TransformUnavailable::UnknownFrame(frame.to_owned()));
			}
		}

		let source_chain = self.ancestors(source_frame)?;
		let target_chain = self.ancestors(target_frame)?;
		let common = target_chain
			.iter()
			.copied()
			.find(|name| source_chain.contains(name))
			.ok_or_else(|| TransformUnavailable::NoPath {
				source_frame: source_frame.to_owned(),
				target_frame: target_frame.to_owned(),
			})?;

		let source_to_common = self.to_ancestor(source_frame, common, stamp)?;
		let target_to_common = self.to_ancestor(target_frame, common, stamp)?;
		Ok(target_to_common.inverse().compose(&source_to_common))
	}
}

/// Thread-safe [FrameGraph] whose lookups can wait for data to arrive.
///
/// Writers (whatever feeds transforms in) and the detection path may live on
/// different threads; a lookup that is not yet satisfiable blocks up to the
/// configured timeout, waking whenever a new transform is inserted.
#[derive(Debug)]
pub struct TransformBuffer {
	graph: Mutex<FrameGraph>,
	updated: Condvar,
	timeout: Duration,
}

impl Default for TransformBuffer {
	fn default() -> Self {
		Self::new(Self::DEFAULT_TIMEOUT)
	}
}

impl TransformBuffer {
	pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

	pub fn new(timeout: Duration) -> Self {
		Self::with_graph(FrameGraph::default(), timeout)
	}

	pub fn with_graph(graph: FrameGraph, timeout: Duration) -> Self {
		Self {
			graph: Mutex::new(graph),
			updated: Condvar::new(),
			timeout,
		}
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	pub fn set_static_transform(&self, parent: &str, child: &str, transform: RigidTransform) -> Result<(), InsertTransformError> {
		self.graph.lock().set_static(parent, child, transform)?;
		self.updated.notify_all();
		Ok(())
	}

	pub fn set_transform(&self, parent: &str, child: &str, stamp: Timestamp, transform: RigidTransform) -> Result<(), InsertTransformError> {
		self.graph.lock().set_dynamic(parent, child, stamp, transform)?;
		self.updated.notify_all();
		Ok(())
	}

	pub fn can_transform(&self, target_frame: &str, source_frame: &str, stamp: Timestamp) -> bool {
		self.graph.lock().lookup(target_frame, source_frame, stamp).is_ok()
	}

	/// Look up without waiting
	pub fn lookup(&self, target_frame: &str, source_frame: &str, stamp: Timestamp) -> Result<RigidTransform, TransformUnavailable> {
		self.graph.lock().lookup(target_frame, source_frame, stamp)
	}

	/// Look up, waiting up to `timeout` for the transform to become available
	pub fn lookup_with_timeout(&self, target_frame: &str, source_frame: &str, stamp: Timestamp, timeout: Duration) -> Result<RigidTransform, TransformUnavailable> {
		let start = Instant::now();
		let deadline = start + timeout;
		let mut graph = self.graph.lock();
		loop {
			let err = match graph.lookup(target_frame, source_frame, stamp) {
				Ok(tf) => return Ok(tf),
				Err(e) => e,
			};
			if !err.is_transient() || timeout.is_zero() {
				return Err(err);
			}
			if self.updated.wait_until(&mut graph, deadline).timed_out() {
				// One last try: an update may have raced the deadline
				return graph.lookup(target_frame, source_frame, stamp)
					.map_err(|_| TransformUnavailable::Timeout {
						source_frame: source_frame.to_owned(),
						target_frame: target_frame.to_owned(),
						waited: start.elapsed(),
					});
			}
		}
	}
}

impl FrameTransformer for TransformBuffer {
	fn transform(&self, pose: &Pose, stamp: Timestamp, source_frame: &str, target_frame: &str) -> Result<Pose, TransformUnavailable> {
		let tf = self.lookup_with_timeout(target_frame, source_frame, stamp, self.timeout)?;
		Ok(tf.apply_pose(pose))
	}
}

#[cfg(test)]
mod test {
	use std::{sync::Arc, thread, time::Duration};

	use super::{FrameGraph, InsertTransformError, TransformBuffer};
	use crate::{time::Timestamp, transform::{FrameTransformer, TransformUnavailable}, util::{Pose, Quat, RigidTransform, Vec3}};

	fn shift(x: f64, y: f64, z: f64) -> RigidTransform {
		RigidTransform::from_translation(Vec3::of(x, y, z))
	}

	fn close(a: &Vec3, b: &Vec3) -> bool {
		(a - b).mag() < 1e-9
	}

	#[test]
	fn static_chain_through_common_ancestor() {
		let mut g = FrameGraph::default();
		g.set_static("world", "base", shift(1., 0., 0.)).unwrap();
		g.set_static("base", "camera", shift(0., 2., 0.)).unwrap();
		g.set_static("world", "table", shift(0., 0., 3.)).unwrap();

		let tf = g.lookup("world", "camera", Timestamp::ZERO).unwrap();
		assert!(close(&tf.apply_point(&Vec3::zero()), &Vec3::of(1., 2., 0.)));

		let tf = g.lookup("table", "camera", Timestamp::new(5, 0)).unwrap();
		assert!(close(&tf.apply_point(&Vec3::zero()), &Vec3::of(1., 2., -3.)));

		let tf = g.lookup("camera", "world", Timestamp::ZERO).unwrap();
		assert!(close(&tf.apply_point(&Vec3::zero()), &Vec3::of(-1., -2., 0.)));
	}

	#[test]
	fn rotated_parent() {
		let mut g = FrameGraph::default();
		let turn = RigidTransform::new(Vec3::zero(), Quat::from_axis_angle(Vec3::of(0., 0., 1.), std::f64::consts::FRAC_PI_2));
		g.set_static("world", "camera", turn).unwrap();
		let tf = g.lookup("world", "camera", Timestamp::ZERO).unwrap();
		assert!(close(&tf.apply_point(&Vec3::of(1., 0., 0.)), &Vec3::of(0., 1., 0.)));
	}

	#[test]
	fn unknown_and_disconnected() {
		let mut g = FrameGraph::default();
		g.set_static("a", "b", shift(1., 0., 0.)).unwrap();
		g.set_static("c", "d", shift(1., 0., 0.)).unwrap();
		assert_eq!(g.lookup("a", "nowhere", Timestamp::ZERO), Err(TransformUnavailable::UnknownFrame("nowhere".into())));
		assert!(matches!(g.lookup("a", "d", Timestamp::ZERO), Err(TransformUnavailable::NoPath { .. })));
	}

	#[test]
	fn same_frame_is_identity() {
		let g = FrameGraph::default();
		assert_eq!(g.lookup("x", "x", Timestamp::ZERO), Ok(RigidTransform::identity()));
	}

	#[test]
	fn rejects_cycles() {
		let mut g = FrameGraph::default();
		g.set_static("a", "b", shift(1., 0., 0.)).unwrap();
		g.set_static("b", "c", shift(1., 0., 0.)).unwrap();
		assert!(matches!(g.set_static("c", "a", shift(1., 0., 0.)), Err(InsertTransformError::Cycle { .. })));
		assert_eq!(g.set_static("a", "a", shift(1., 0., 0.)), Err(InsertTransformError::SelfParent("a".into())));
		assert_eq!(g.set_static("", "a", shift(1., 0., 0.)), Err(InsertTransformError::EmptyFrameId));
	}

	#[test]
	fn dynamic_interpolates_between_samples() {
		let mut g = FrameGraph::default();
		g.set_dynamic("world", "robot", Timestamp::new(10, 0), shift(0., 0., 0.)).unwrap();
		g.set_dynamic("world", "robot", Timestamp::new(12, 0), shift(4., 0., 0.)).unwrap();

		let tf = g.lookup("world", "robot", Timestamp::new(11, 0)).unwrap();
		assert!(close(&tf.translation, &Vec3::of(2., 0., 0.)));

		let tf = g.lookup("world", "robot", Timestamp::new(12, 0)).unwrap();
		assert!(close(&tf.translation, &Vec3::of(4., 0., 0.)));

		// zero stamp means "latest"
		let tf = g.lookup("world", "robot", Timestamp::ZERO).unwrap();
		assert!(close(&tf.translation, &Vec3::of(4., 0., 0.)));
	}

	#[test]
	fn dynamic_refuses_extrapolation() {
		let mut g = FrameGraph::default();
		g.set_dynamic("world", "robot", Timestamp::new(10, 0), shift(0., 0., 0.)).unwrap();
		g.set_dynamic("world", "robot", Timestamp::new(12, 0), shift(4., 0., 0.)).unwrap();

		let future = g.lookup("world", "robot", Timestamp::new(13, 0)).unwrap_err();
		assert!(future.is_transient());
		let past = g.lookup("world", "robot", Timestamp::new(9, 0)).unwrap_err();
		assert!(!past.is_transient());
	}

	#[test]
	fn dynamic_prunes_old_samples() {
		let mut g = FrameGraph::new(Duration::from_secs(1));
		g.set_dynamic("world", "robot", Timestamp::new(1, 0), shift(0., 0., 0.)).unwrap();
		g.set_dynamic("world", "robot", Timestamp::new(5, 0), shift(1., 0., 0.)).unwrap();
		assert!(g.lookup("world", "robot", Timestamp::new(2, 0)).is_err());
		assert_eq!(
			g.set_dynamic("world", "robot", Timestamp::new(2, 0), shift(1., 0., 0.)),
			Err(InsertTransformError::TooOld { child: "robot".into(), stamp: Timestamp::new(2, 0) }),
		);
	}

	#[test]
	fn failing_edge_above_common_ancestor_is_ignored() {
		let mut g = FrameGraph::default();
		g.set_dynamic("world", "base", Timestamp::new(10, 0), RigidTransform::identity()).unwrap();
		g.set_static("base", "camera", shift(1., 0., 0.)).unwrap();
		g.set_static("base", "arm", shift(0., 1., 0.)).unwrap();

		// world -> base has no sample at 20s, but neither path goes through it
		let tf = g.lookup("base", "camera", Timestamp::new(20, 0)).unwrap();
		assert!(close(&tf.translation, &Vec3::of(1., 0., 0.)));
		let tf = g.lookup("arm", "camera", Timestamp::new(20, 0)).unwrap();
		assert!(close(&tf.translation, &Vec3::of(1., -1., 0.)));

		assert!(matches!(
			g.lookup("world", "camera", Timestamp::new(20, 0)),
			Err(TransformUnavailable::Extrapolation { .. }),
		));
	}

	#[test]
	fn buffer_does_not_wait_on_unrelated_edges() {
		let buffer = TransformBuffer::new(Duration::from_secs(5));
		buffer.set_transform("world", "base", Timestamp::new(10, 0), RigidTransform::identity()).unwrap();
		buffer.set_static_transform("base", "camera", shift(1., 0., 0.)).unwrap();

		let start = std::time::Instant::now();
		let pose = buffer.transform(&Pose::identity(), Timestamp::new(20, 0), "camera", "base").unwrap();
		assert!(close(&pose.position, &Vec3::of(1., 0., 0.)));
		assert!(start.elapsed() < Duration::from_secs(1));
	}

	#[test]
	fn buffer_times_out() {
		let buffer = TransformBuffer::new(Duration::from_millis(20));
		let err = buffer.transform(&Pose::identity(), Timestamp::ZERO, "camera", "world").unwrap_err();
		assert!(matches!(err, TransformUnavailable::Timeout { .. }));
	}

	#[test]
	fn buffer_wakes_on_update() {
		let buffer = Arc::new(TransformBuffer::new(Duration::from_secs(5)));
		let writer = {
			let buffer = buffer.clone();
			thread::spawn(move || {
				thread::sleep(Duration::from_millis(20));
				buffer.set_static_transform("world", "camera", shift(1., 1., 1.)).unwrap();
			})
		};
		let pose = buffer.transform(&Pose::identity(), Timestamp::ZERO, "camera", "world").unwrap();
		writer.join().unwrap();
		assert!(close(&pose.position, &Vec3::of(1., 1., 1.)));
	}

	#[test]
	fn buffer_wakes_on_newer_dynamic_sample() {
		let buffer = Arc::new(TransformBuffer::new(Duration::from_secs(5)));
		buffer.set_transform("world", "robot", Timestamp::new(10, 0), shift(0., 0., 0.)).unwrap();
		assert!(!buffer.can_transform("world", "robot", Timestamp::new(11, 0)));

		let writer = {
			let buffer = buffer.clone();
			thread::spawn(move || {
				thread::sleep(Duration::from_millis(20));
				buffer.set_transform("world", "robot", Timestamp::new(12, 0), shift(4., 0., 0.)).unwrap();
			})
		};
		let pose = buffer.transform(&Pose::identity(), Timestamp::new(11, 0), "robot", "world").unwrap();
		writer.join().unwrap();
		assert!(close(&pose.position, &Vec3::of(2., 0., 0.)));
		assert!(buffer.can_transform("world", "robot", Timestamp::new(11, 0)));
	}
}
