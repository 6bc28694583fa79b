pub mod config;
pub mod error;
pub mod file;
pub mod utils;
pub mod storage;

// Driver modules (point to project root drivers via path attribute) / 驱动模块
#[path = "../drivers/mod.rs"]
pub mod drivers;

pub use config::ConfigRepository;
pub use drivers::DriverType;
pub use error::{FilesystemError, Result};
pub use file::{NamingRule, UploadedFile};
pub use storage::{Driver, Filesystem, FilesystemManager, Visibility, WriteOptions};
