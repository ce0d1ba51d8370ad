//! Mocks and fixtures shared by Autoflow tests.

pub mod fixtures;
pub mod mock_executor;
pub mod recorders;

pub use fixtures::temp_config;
pub use mock_executor::{MockActionExecutor, RecordedCall};
pub use recorders::{ProgressRecorder, RecordingSink};
