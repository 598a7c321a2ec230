//! PillCascade post-processes YOLOv8-style detector output for a two-stage
//! plate/pill cascade.
//!
//! Stage 1 finds plates and pills on the full image; the union of occupied
//! plates becomes the crop stage 2 looks at. Both stages share the same
//! building blocks: RGB preprocessing into a fixed-size tensor, decoding of
//! the channel-major output and per-class non-maximum suppression. Inference
//! itself sits behind the [`Model`] trait.
//!
//! Optional features: `rayon` for parallel batches, `simd` for vectorized
//! normalization, `image-io` for loading files, `tracing` for spans and
//! `serde` for config (de)serialization.

pub mod config;
pub mod crop;
pub mod decode;
pub mod geometry;
pub mod image;
pub mod model;
pub mod nms;
pub mod pipeline;
pub mod preprocess;
pub mod tensor;
mod trace;
pub mod util;

pub use config::{CascadeConfig, CenterRule, CropClamp, DetectorConfig, ReducedScaling, RemapRule};
pub use crop::{derive_crop_region, CropWindow};
pub use decode::{DecodeTarget, OutputDecoder};
pub use geometry::{BoundingBox, Detection, Label};
pub use image::{OwnedRgbImage, RgbView};
pub use model::{Detector, Model};
pub use nms::{suppress, NonMaxSuppressor};
pub use pipeline::{run_cascade, CascadeOutput, CascadePipeline, DisplayBoxes};
pub use preprocess::Preprocessor;
pub use tensor::{InputTensor, NumericEncoding, OutputTensor, TensorData};
pub use util::{CascadeError, CascadeResult};
