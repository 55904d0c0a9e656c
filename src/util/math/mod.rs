mod vec3;
mod mat33;
mod quat;
mod pose;

pub use vec3::Vec3;
pub use mat33::Mat33;
pub use quat::Quat;
pub use pose::{Pose, RigidTransform};
