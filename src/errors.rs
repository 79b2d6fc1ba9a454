// SPDX-License-Identifier: MPL-2.0

//! Error types for the measurement pipeline
//!
//! Sensing failures are recoverable: every [`SamplingError`] renders as a
//! user-facing reason and the same step can simply be tapped again.

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Product catalog errors
    Catalog(CatalogError),
    /// Configuration errors
    Config(String),
    /// Generic error with message
    Other(String),
}

/// Surface a sampling step was aimed at, used in failure messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Floor,
    Wall,
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceKind::Floor => write!(f, "floor"),
            SurfaceKind::Wall => write!(f, "wall"),
        }
    }
}

/// Point sampling failures
#[derive(Debug, Clone, PartialEq)]
pub enum SamplingError {
    /// Strict mode upfront check found no plane under the anchor
    NoPlaneDetected { surface: SurfaceKind },
    /// Too many consecutive ticks without good tracking
    TrackingLost,
    /// Strict mode window closed with too few plane hits
    PlaneNotReliable { surface: SurfaceKind },
    /// Lenient mode window closed with too few samples
    NotEnoughSamples { collected: usize, required: usize },
    /// Samples scattered further than the stability ceiling
    PositionUnstable { spread_cm: f64 },
}

/// Measurement session errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A sampling run is already in flight
    AlreadySampling,
    /// The protocol has no remaining steps
    RunComplete,
    /// Tracking is not good enough to start a tap
    TrackingNotReady,
    /// The sampling stream ended without a result
    SamplingAborted,
}

/// Product catalog errors
#[derive(Debug, Clone)]
pub enum CatalogError {
    /// Catalog file could not be read
    Io(String),
    /// Catalog file is not valid JSON
    Parse(String),
    /// No product with the requested id
    UnknownProduct(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Catalog(e) => write!(f, "Catalog error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for SamplingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingError::NoPlaneDetected { surface } => write!(
                f,
                "No {surface} plane detected. Scan the {surface} slowly, then tap again."
            ),
            SamplingError::TrackingLost => {
                write!(f, "Tracking lost. Hold phone steadier and ensure good lighting.")
            }
            SamplingError::PlaneNotReliable { surface } => write!(
                f,
                "Could not detect {surface} plane reliably. Scan the {surface} more slowly."
            ),
            SamplingError::NotEnoughSamples {
                collected,
                required,
            } => write!(
                f,
                "Not enough samples ({}/{}). Try better lighting.",
                collected, required
            ),
            SamplingError::PositionUnstable { spread_cm } => {
                write!(f, "Position unstable (+/- {:.1}cm). Hold steadier.", spread_cm)
            }
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::AlreadySampling => write!(f, "Sampling already in progress"),
            SessionError::RunComplete => write!(f, "Measurement is already complete"),
            SessionError::TrackingNotReady => write!(f, "Tracking is not ready"),
            SessionError::SamplingAborted => write!(f, "Sampling ended without a result"),
        }
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Io(msg) => write!(f, "Failed to read catalog: {}", msg),
            CatalogError::Parse(msg) => write!(f, "Failed to parse catalog: {}", msg),
            CatalogError::UnknownProduct(id) => write!(f, "Unknown product: {}", id),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for SamplingError {}
impl std::error::Error for SessionError {}
impl std::error::Error for CatalogError {}

// Conversions from sub-errors to AppError
impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        AppError::Catalog(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_specific_messages() {
        let floor = SamplingError::NoPlaneDetected {
            surface: SurfaceKind::Floor,
        };
        assert_eq!(
            floor.to_string(),
            "No floor plane detected. Scan the floor slowly, then tap again."
        );

        let wall = SamplingError::PlaneNotReliable {
            surface: SurfaceKind::Wall,
        };
        assert_eq!(
            wall.to_string(),
            "Could not detect wall plane reliably. Scan the wall more slowly."
        );
    }

    #[test]
    fn test_unstable_message_rounds_spread() {
        let err = SamplingError::PositionUnstable { spread_cm: 2.345 };
        assert_eq!(err.to_string(), "Position unstable (+/- 2.3cm). Hold steadier.");
    }

    #[test]
    fn test_app_error_wraps_catalog() {
        let err: AppError = CatalogError::UnknownProduct("sofa-9".to_string()).into();
        assert_eq!(err.to_string(), "Catalog error: Unknown product: sofa-9");

        let err: AppError = "Scenario has no taps".into();
        assert_eq!(err.to_string(), "Scenario has no taps");
    }
}
