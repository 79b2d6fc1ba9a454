// SPDX-License-Identifier: MPL-2.0

//! Will It Fit - decides whether a product fits through a door or into a space
//!
//! The user taps a few points on real surfaces; each tap is sampled over a
//! short window into a stable 3D point, pairs of points become dimensions,
//! and the dimensions are compared against a product with a safety margin.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`sensing`]: Spatial sensing contract, hit classification and point sampling
//! - [`measurement`]: Measurement protocol state machine and result model
//! - [`verdict`]: Fit decision against a product
//! - [`catalog`]: Product catalog
//! - [`session`]: One measurement run, tap to verdict
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let source = Arc::new(MyTracker::new());
//! let mut session = MeasurementSession::new(source, &Config::default());
//! session.start(MeasurementMode::Door);
//! session.set_product(Some(product));
//!
//! let snapshot = session.tap(ScreenPoint::new(540.0, 1800.0)).await?;
//! println!("{}", snapshot.instruction);
//! ```

pub mod catalog;
pub mod config;
pub mod constants;
pub mod errors;
pub mod measurement;
pub mod sensing;
pub mod session;
pub mod verdict;

// Re-export commonly used types
pub use catalog::Product;
pub use config::Config;
pub use errors::{AppError, AppResult, SamplingError, SessionError};
pub use measurement::{FlowController, MeasurementMode, ProtocolStep, StabilizedPoint};
pub use sensing::{PointSampler, ScreenPoint, SensingSource};
pub use session::{MeasurementSession, SamplingState, SessionSnapshot};
pub use verdict::Verdict;
