//! 快照与基线：持久化格式、带文件锁的读写和比较
pub mod model;
pub mod storage;
pub mod verify;

pub use model::{BaselineFile, FORMAT_VERSION, RecordContainer, SnapshotFile, SnapshotRecord, content_hash};
pub use storage::{BASELINE_DIR, SNAPSHOT_DIR, SNAPSHOT_DIR_ENV, SnapshotStorage};
pub use verify::{
    BaselineOutcome, BaselineStore, CheckStatus, SnapshotCheck, SnapshotOutcome, SnapshotStore,
    UpdateMode, UpdatePolicy, verify_baseline, verify_snapshot,
};
