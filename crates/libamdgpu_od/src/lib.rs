pub mod error;
pub use error::{OdError, Result};

pub mod od;
pub mod stat;
pub mod signal;

mod app;
pub use app::*;

mod device_path;
pub use device_path::*;

mod kernel_version;
pub use kernel_version::KernelVersion;

mod ppfeaturemask;
pub use ppfeaturemask::*;
