pub mod types;
pub mod config;
pub mod error;
pub mod detect;

pub use types::*;
pub use config::Config;
pub use detect::{Detection, FaceDetector};
pub use error::FaceGraphError;
