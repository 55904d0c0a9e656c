pub mod math;

pub use self::math::{Pose, Quat, RigidTransform, Vec3};
