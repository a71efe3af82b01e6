pub mod domain;
pub mod telemetry;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockAssetDirectory;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockLiveNotifier;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockMovementStore;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockReaderDirectory;
