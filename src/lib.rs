pub mod config;
pub mod contents;
pub mod error;
pub mod model;
pub mod notebook;
pub mod paths;
pub mod policy;
pub mod service;
pub mod shell;
pub mod storage;
pub mod utils;

pub use config::StoreConfig;
pub use contents::ContentStore;
pub use error::{ContentsError, ErrorKind, FsError};
pub use model::{ContentModel, ContentType, Format, SaveModel};
pub use paths::PathMapper;
pub use service::ContentService;
pub use storage::{FilesystemAdapter, LocalFs, MemoryFs};
