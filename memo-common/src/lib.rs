pub mod error;
pub mod logging;
pub mod models;
pub mod storage;

// 重新导出常用类型，方便直接使用
pub use error::{MemoError, Result};
pub use models::{
    FilterFactor, FilterState, Memo, MemoFilter, MemoState, Notification, NotificationLevel,
    SortOption, SortOrder,
};
pub use storage::{KeyValueStorage, MemoryStorage};

#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorage;
