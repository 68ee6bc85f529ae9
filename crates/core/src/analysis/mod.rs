//! Analysis orchestration.
//!
//! One analysis downloads an uploaded image into a scratch file, runs the
//! classifier on it, and records the verdict:
//!
//! 1. load and authorize the image
//! 2. take the per-image lock (a concurrent attempt gets a conflict)
//! 3. stream the image into a fresh scratch file
//! 4. classify, persist, and compare-and-swap the image's classification
//! 5. remove the scratch file, whatever happened above

mod error;
mod fetch;
mod lock;
mod scratch;
mod service;

pub use error::AnalysisError;
pub use fetch::{FetchError, HttpImageFetcher, ImageFetcher};
pub use lock::{AnalysisGuard, AnalysisLocks};
pub use scratch::ScratchFile;
pub use service::AnalysisService;
