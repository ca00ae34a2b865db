use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use crate::Result;
use crate::error::CurlcheckError;
use crate::snapshot::model::{FORMAT_VERSION, RecordContainer};

/// 默认快照目录
pub const SNAPSHOT_DIR: &str = "__snapshots__";
/// 默认基线目录
pub const BASELINE_DIR: &str = ".curlcheck/baselines";
/// 覆盖快照目录的环境变量
pub const SNAPSHOT_DIR_ENV: &str = "CURLCHECK_SNAPSHOT_DIR";

const SNAPSHOT_EXTENSION: &str = "snap.json";

/// 单个容器文件的读写
///
/// 读取持有共享锁，写入和读改写持有排他锁，多个进程同时跑也不会写坏文件。
#[derive(Debug, Clone)]
pub struct SnapshotStorage {
    file_path: PathBuf,
}

impl SnapshotStorage {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    /// `<dir>/<suite>.snap.json`
    pub fn for_suite(dir: impl AsRef<Path>, suite: &str) -> Self {
        Self::new(
            dir.as_ref()
                .join(format!("{}.{}", sanitize(suite), SNAPSHOT_EXTENSION)),
        )
    }

    /// `<dir>/<label>.json`
    pub fn for_baseline(dir: impl AsRef<Path>, label: &str) -> Self {
        Self::new(dir.as_ref().join(format!("{}.json", sanitize(label))))
    }

    /// 环境变量优先，其次是配置值，最后是默认目录
    pub fn snapshot_dir(configured: Option<&Path>) -> PathBuf {
        match std::env::var(SNAPSHOT_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => configured
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(SNAPSHOT_DIR)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn exists(&self) -> bool {
        self.file_path.exists()
    }

    /// 读取容器；文件不存在时返回空容器
    pub fn load<C: RecordContainer>(&self) -> Result<C> {
        if !self.file_path.exists() {
            return Ok(C::default());
        }

        let mut file = File::open(&self.file_path).map_err(CurlcheckError::IoError)?;
        file.lock_shared().map_err(CurlcheckError::IoError)?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(CurlcheckError::IoError)?;
        // Unlock on drop
        drop(file);

        self.parse(&content)
    }

    /// 整体写入
    pub fn save<C: RecordContainer>(&self, container: &C) -> Result<()> {
        self.update(|current: &mut C| {
            *current = container.clone();
            Ok(())
        })
    }

    /// 在排他锁内完成读取、修改、写回
    pub fn update<C, F, R>(&self, f: F) -> Result<R>
    where
        C: RecordContainer,
        F: FnOnce(&mut C) -> Result<R>,
    {
        self.ensure_dir()?;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.file_path)
            .map_err(CurlcheckError::IoError)?;
        file.lock_exclusive().map_err(CurlcheckError::IoError)?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(CurlcheckError::IoError)?;
        let mut container: C = self.parse(&content)?;

        let result = f(&mut container)?;

        let json = serde_json::to_string_pretty(&container)?;
        file.set_len(0).map_err(CurlcheckError::IoError)?;
        file.seek(SeekFrom::Start(0))
            .map_err(CurlcheckError::IoError)?;
        file.write_all(json.as_bytes())
            .map_err(CurlcheckError::IoError)?;
        file.write_all(b"\n").map_err(CurlcheckError::IoError)?;
        file.flush().map_err(CurlcheckError::IoError)?;

        debug!(
            path = %self.file_path.display(),
            records = container.records().len(),
            "snapshot file written"
        );
        Ok(result)
    }

    fn parse<C: RecordContainer>(&self, content: &str) -> Result<C> {
        if content.trim().is_empty() {
            return Ok(C::default());
        }
        let container: C = serde_json::from_str(content).map_err(|e| {
            CurlcheckError::ParseError(format!(
                "Failed to read snapshot file {}: {}",
                self.file_path.display(),
                e
            ))
        })?;
        if container.version() > FORMAT_VERSION {
            return Err(CurlcheckError::ConfigError(format!(
                "{} was written by a newer version (format {}, supported {})",
                self.file_path.display(),
                container.version(),
                FORMAT_VERSION
            )));
        }
        Ok(container)
    }

    fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.file_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(CurlcheckError::IoError)?;
        }
        Ok(())
    }
}

/// 文件名里只保留字母、数字、`-`、`_`、`.`
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::model::{BaselineFile, SnapshotFile, SnapshotRecord};
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(hash: &str) -> SnapshotRecord {
        SnapshotRecord {
            status: Some(200),
            headers: None,
            body: Some(serde_json::json!({"ok": true})),
            timing: None,
            content_hash: hash.to_string(),
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SnapshotStorage::new(temp_dir.path().join("none.snap.json"));
        let file: SnapshotFile = storage.load().unwrap();
        assert!(file.snapshots.is_empty());
        assert_eq!(file.version, 1);
    }

    #[test]
    fn test_update_creates_dirs_and_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SnapshotStorage::for_suite(temp_dir.path().join("nested/dir"), "users api");
        assert!(storage.path().ends_with("users_api.snap.json"));

        storage
            .update(|file: &mut SnapshotFile| {
                file.snapshots.insert("a".to_string(), record("h1"));
                Ok(())
            })
            .unwrap();
        storage
            .update(|file: &mut SnapshotFile| {
                file.snapshots.insert("b".to_string(), record("h2"));
                Ok(())
            })
            .unwrap();

        let file: SnapshotFile = storage.load().unwrap();
        assert_eq!(file.snapshots.len(), 2);
        assert_eq!(file.snapshots["b"].content_hash, "h2");

        let text = fs::read_to_string(storage.path()).unwrap();
        assert!(text.contains("\n  \"snapshots\""));
    }

    #[test]
    fn test_save_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SnapshotStorage::for_baseline(temp_dir.path(), "prod");

        let mut baseline = BaselineFile::new("prod");
        baseline.baselines.insert("x".to_string(), record("h"));
        storage.save(&baseline).unwrap();

        let loaded: BaselineFile = storage.load().unwrap();
        assert_eq!(loaded.label, "prod");
        assert_eq!(loaded.baselines.len(), 1);

        storage.save(&BaselineFile::new("prod")).unwrap();
        let loaded: BaselineFile = storage.load().unwrap();
        assert!(loaded.baselines.is_empty());
    }

    #[test]
    fn test_rejects_newer_version_and_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("s.snap.json");
        let storage = SnapshotStorage::new(&path);

        fs::write(&path, r#"{"version": 2, "snapshots": {}}"#).unwrap();
        assert!(matches!(
            storage.load::<SnapshotFile>(),
            Err(CurlcheckError::ConfigError(_))
        ));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            storage.load::<SnapshotFile>(),
            Err(CurlcheckError::ParseError(_))
        ));
    }

    #[test]
    fn test_update_error_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SnapshotStorage::new(temp_dir.path().join("s.snap.json"));
        storage
            .update(|file: &mut SnapshotFile| {
                file.snapshots.insert("a".to_string(), record("h1"));
                Ok(())
            })
            .unwrap();

        let result: Result<()> = storage.update(|file: &mut SnapshotFile| {
            file.snapshots.clear();
            Err(CurlcheckError::Other("abort".to_string()))
        });
        assert!(result.is_err());

        let file: SnapshotFile = storage.load().unwrap();
        assert_eq!(file.snapshots.len(), 1);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("api/users v2"), "api_users_v2");
        assert_eq!(sanitize("  "), "default");
        assert_eq!(sanitize("a-b_c.d"), "a-b_c.d");
    }
}
