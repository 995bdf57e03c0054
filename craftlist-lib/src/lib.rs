//! Persistence and planning core for craftlist.
//!
//! Lists are user-owned collections of game items to craft or gather. They are
//! reached through the [`ListRepository`] contract and stored by one of the
//! concrete stores in [`repository`].

use thiserror::Error;

pub mod config;
pub mod fs;
pub mod optimizer;
pub mod repository;
pub mod service;

pub use repository::{
    GraphListStore, InvalidId, List, ListId, ListRepository, ListRow, ListStore, Lists,
    MemoryListStore, StoreError, UserId,
};
pub use service::ListService;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    InvalidId(#[from] InvalidId),
    #[error("Failed to read or write a file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration version {found} is newer than supported version {supported}")]
    UnsupportedConfig { found: u16, supported: u16 },
    #[error("No home directory could be found")]
    NoHome,
}
