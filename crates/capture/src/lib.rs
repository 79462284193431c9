#[cfg(feature = "camera")]
pub mod camera;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod feed;
pub mod frame;
pub mod pacing;
pub mod source;

#[cfg(feature = "camera")]
pub use camera::CameraSource;
pub use config::{CaptureConfig, SourceKind};
pub use decoder::{FrameDecoder, YuyvDecoder};
pub use encoder::{EncodeError, EncodedPayload, ImageFormat, encode, encode_as};
pub use feed::{CaptureFeed, LatestFrame};
pub use frame::{Frame, PixelFormat};
pub use source::{FrameSource, SyntheticSource, open_source};
