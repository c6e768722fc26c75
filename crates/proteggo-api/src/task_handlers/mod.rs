//! Task handlers
//!
//! Background work delivered by the task queue. Both the HTTP task endpoint and the
//! in-process queue call into the same handler.

mod image_processing;

pub use image_processing::{ImageProcessingResult, ImageProcessingTaskHandler, PipelineOutcome};
