pub mod map;
pub mod resource;

pub use map::{
    lifecycle::{LifecycleError, MapLifecycle, Phase},
    marker::{MarkerSpec, PointDescriptor, to_markers},
};
pub use resource::gate::ResourceGate;
