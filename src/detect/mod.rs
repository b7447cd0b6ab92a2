mod adapter;
mod backend;
mod backends;
mod registry;
mod result;

pub use adapter::{DetectionAdapter, LabelFilter};
pub use backend::{DetectionCapability, DetectorBackend};
pub use backends::stub::{STUB_CONFIDENCE, STUB_LABEL};
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::{tract::COCO_CLASSES, TractBackend};
pub use registry::{BackendRegistry, SharedBackend};
pub use result::{BBox, Detection, FrameResult};
