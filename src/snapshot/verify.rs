use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::Result;
use crate::capture::CapturedResponse;
use crate::compare::{
    BASELINE_DEFAULT_FACETS, ComparisonRules, DiffEntry, Facet, FacetView, SNAPSHOT_DEFAULT_FACETS,
    compare_views,
};
use crate::snapshot::model::{BaselineFile, RecordContainer, SnapshotFile, SnapshotRecord};
use crate::snapshot::storage::SnapshotStorage;

/// 快照比较结果；`is_new` 时差异列表为空
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotOutcome {
    pub is_new: bool,
    pub diffs: Vec<DiffEntry>,
}

impl SnapshotOutcome {
    pub fn matches(&self) -> bool {
        self.diffs.is_empty()
    }
}

/// 基线比较结果；`is_new_baseline` 时差异列表为空
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineOutcome {
    pub is_new_baseline: bool,
    pub diffs: Vec<DiffEntry>,
}

/// 与已有快照比较
///
/// 没有已有记录时只报告 `is_new`，不创建记录。
pub fn verify_snapshot(
    existing: Option<&SnapshotRecord>,
    captured: &CapturedResponse,
    rules: &ComparisonRules,
) -> SnapshotOutcome {
    match existing {
        None => SnapshotOutcome {
            is_new: true,
            diffs: Vec::new(),
        },
        Some(record) => SnapshotOutcome {
            is_new: false,
            diffs: diff_record(record, captured, rules, &SNAPSHOT_DEFAULT_FACETS),
        },
    }
}

/// 与带标签的基线比较，默认包含 headers
pub fn verify_baseline(
    existing: Option<&SnapshotRecord>,
    captured: &CapturedResponse,
    rules: &ComparisonRules,
) -> BaselineOutcome {
    match existing {
        None => BaselineOutcome {
            is_new_baseline: true,
            diffs: Vec::new(),
        },
        Some(record) => BaselineOutcome {
            is_new_baseline: false,
            diffs: diff_record(record, captured, rules, &BASELINE_DEFAULT_FACETS),
        },
    }
}

fn diff_record(
    record: &SnapshotRecord,
    captured: &CapturedResponse,
    rules: &ComparisonRules,
    default_facets: &[Facet],
) -> Vec<DiffEntry> {
    let facets = rules.facets(default_facets);
    compare_views(
        &record.view(),
        &FacetView::from_response(captured),
        &facets,
        &rules.compile(),
    )
}

/// 快照更新策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// 只写入新快照
    #[default]
    None,
    /// 覆盖所有快照
    All,
    /// 只覆盖不匹配的快照
    Failing,
}

impl std::str::FromStr for UpdateMode {
    type Err = crate::CurlcheckError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(UpdateMode::None),
            "all" => Ok(UpdateMode::All),
            "failing" => Ok(UpdateMode::Failing),
            _ => Err(crate::CurlcheckError::ParseError(format!(
                "Invalid update mode: {}",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdatePolicy {
    pub mode: UpdateMode,
    /// CI 模式下缺失的快照视为失败，不会自动写入
    pub ci: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Created,
    Updated,
    Failed,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckStatus::Passed => "passed",
            CheckStatus::Created => "created",
            CheckStatus::Updated => "updated",
            CheckStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotCheck {
    pub status: CheckStatus,
    pub outcome: SnapshotOutcome,
}

impl SnapshotCheck {
    pub fn passed(&self) -> bool {
        self.status != CheckStatus::Failed
    }
}

/// 基于文件的快照存储：一个测试套件一个文件
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    storage: SnapshotStorage,
}

impl SnapshotStore {
    pub fn new(storage: SnapshotStorage) -> Self {
        Self { storage }
    }

    pub fn for_suite(dir: impl Into<PathBuf>, suite: &str) -> Self {
        Self::new(SnapshotStorage::for_suite(dir.into(), suite))
    }

    pub fn storage(&self) -> &SnapshotStorage {
        &self.storage
    }

    /// 比较并按策略写入
    ///
    /// - 没有记录：写入新记录（CI 模式下判为失败，不写入）
    /// - 有记录且一致：通过；`All` 模式下刷新记录
    /// - 有记录且不一致：`All`/`Failing` 模式下覆盖，否则失败
    ///
    /// 只读结果（通过、失败）不会创建或改写文件。
    pub fn check(
        &self,
        name: &str,
        captured: &CapturedResponse,
        rules: &ComparisonRules,
        policy: UpdatePolicy,
    ) -> Result<SnapshotCheck> {
        let file: SnapshotFile = self.storage.load()?;
        let outcome = verify_snapshot(file.get(name), captured, rules);
        let status = decide(&outcome, policy);

        if !writes(status) {
            if outcome.is_new {
                warn!(snapshot = name, "snapshot missing in CI mode");
            }
            debug!(snapshot = name, %status, "snapshot check");
            return Ok(SnapshotCheck { status, outcome });
        }

        let facets = rules.facets(&SNAPSHOT_DEFAULT_FACETS);
        // 加锁后重新比较，文件可能已被其他进程改过
        self.storage.update(|file: &mut SnapshotFile| {
            let outcome = verify_snapshot(file.get(name), captured, rules);
            let status = decide(&outcome, policy);
            if writes(status) {
                file.insert(name, SnapshotRecord::capture(captured, &facets));
                info!(snapshot = name, %status, diffs = outcome.diffs.len(), "snapshot written");
            }
            debug!(snapshot = name, %status, "snapshot check");
            Ok(SnapshotCheck { status, outcome })
        })
    }
}

fn decide(outcome: &SnapshotOutcome, policy: UpdatePolicy) -> CheckStatus {
    if outcome.is_new {
        return if policy.ci {
            CheckStatus::Failed
        } else {
            CheckStatus::Created
        };
    }

    let overwrite = match policy.mode {
        UpdateMode::All => true,
        UpdateMode::Failing => !outcome.matches(),
        UpdateMode::None => false,
    };
    if overwrite {
        CheckStatus::Updated
    } else if outcome.matches() {
        CheckStatus::Passed
    } else {
        CheckStatus::Failed
    }
}

fn writes(status: CheckStatus) -> bool {
    matches!(status, CheckStatus::Created | CheckStatus::Updated)
}

/// 基于文件的基线存储：一个标签（环境）一个文件
#[derive(Debug, Clone)]
pub struct BaselineStore {
    dir: PathBuf,
}

impl BaselineStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn storage(&self, label: &str) -> SnapshotStorage {
        SnapshotStorage::for_baseline(&self.dir, label)
    }

    pub fn load(&self, label: &str) -> Result<BaselineFile> {
        let mut file: BaselineFile = self.storage(label).load()?;
        if file.label.is_empty() {
            file.label = label.to_string();
        }
        Ok(file)
    }

    /// 显式保存（覆盖同名记录）
    pub fn save(
        &self,
        label: &str,
        name: &str,
        captured: &CapturedResponse,
        rules: &ComparisonRules,
    ) -> Result<()> {
        let facets = rules.facets(&BASELINE_DEFAULT_FACETS);
        self.storage(label).update(|file: &mut BaselineFile| {
            stamp(file, label);
            file.insert(name, SnapshotRecord::capture(captured, &facets));
            Ok(())
        })
    }

    /// 与基线比较；基线不存在时写入当前结果作为新基线
    ///
    /// 已有基线时只读取，不改写文件。
    pub fn check(
        &self,
        label: &str,
        name: &str,
        captured: &CapturedResponse,
        rules: &ComparisonRules,
    ) -> Result<BaselineOutcome> {
        let file = self.load(label)?;
        let outcome = verify_baseline(file.get(name), captured, rules);
        if !outcome.is_new_baseline {
            return Ok(outcome);
        }

        let facets = rules.facets(&BASELINE_DEFAULT_FACETS);
        self.storage(label).update(|file: &mut BaselineFile| {
            let outcome = verify_baseline(file.get(name), captured, rules);
            if outcome.is_new_baseline {
                stamp(file, label);
                file.insert(name, SnapshotRecord::capture(captured, &facets));
                info!(label, snapshot = name, "baseline created");
            }
            Ok(outcome)
        })
    }
}

fn stamp(file: &mut BaselineFile, label: &str) {
    file.label = label.to_string();
    file.captured_at = chrono::Utc::now();
}
