//! Classification pipeline components.
//!
//! The stages, in request order:
//! - **decode**: decode uploaded bytes into a validated RGB image
//! - **preprocess**: resize, enhance and standardize into the model tensor
//!   - **clahe** / **color**: the CLAHE enhancement step and its Lab
//!     color-space support
//! - **processor**: orchestrates decode → preprocess → classify → format

pub mod clahe;
pub mod color;
pub mod decode;
pub mod preprocess;
pub mod processor;

// Re-exports for convenient access
pub use decode::{DecodedImage, ImageDecoder};
pub use processor::StagePipeline;
