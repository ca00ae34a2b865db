use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::capture::{CapturedResponse, Timings};
use crate::compare::facets::normalize_headers;
use crate::compare::{Facet, FacetView, body_value};

/// 持久化格式版本
pub const FORMAT_VERSION: u32 = 1;

/// 一条快照 / 基线记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<Timings>,
    /// body 原文的 SHA-256（十六进制）
    pub content_hash: String,
    pub captured_at: DateTime<Utc>,
}

impl SnapshotRecord {
    /// 只记录 `facets` 中列出的部分；耗时总是记录，但不参与比较
    pub fn capture(response: &CapturedResponse, facets: &[Facet]) -> Self {
        Self {
            status: facets
                .contains(&Facet::Status)
                .then(|| response.status())
                .flatten(),
            headers: facets
                .contains(&Facet::Headers)
                .then(|| normalize_headers(&response.headers)),
            body: facets
                .contains(&Facet::Body)
                .then(|| body_value(&response.body)),
            timing: Some(response.timings()),
            content_hash: content_hash(&response.body),
            captured_at: Utc::now(),
        }
    }

    pub fn view(&self) -> FacetView {
        FacetView {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

pub fn content_hash(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    hex::encode(hasher.finalize())
}

/// 可以持久化到单个文件的记录容器
pub trait RecordContainer: Serialize + DeserializeOwned + Default + Clone {
    fn version(&self) -> u32;
    fn records(&self) -> &BTreeMap<String, SnapshotRecord>;
    fn records_mut(&mut self) -> &mut BTreeMap<String, SnapshotRecord>;

    fn get(&self, name: &str) -> Option<&SnapshotRecord> {
        self.records().get(name)
    }

    fn insert(&mut self, name: impl Into<String>, record: SnapshotRecord) -> Option<SnapshotRecord> {
        self.records_mut().insert(name.into(), record)
    }
}

/// 快照文件：`{ "version": 1, "snapshots": { name: record } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub version: u32,
    #[serde(default)]
    pub snapshots: BTreeMap<String, SnapshotRecord>,
}

impl Default for SnapshotFile {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            snapshots: BTreeMap::new(),
        }
    }
}

impl RecordContainer for SnapshotFile {
    fn version(&self) -> u32 {
        self.version
    }

    fn records(&self) -> &BTreeMap<String, SnapshotRecord> {
        &self.snapshots
    }

    fn records_mut(&mut self) -> &mut BTreeMap<String, SnapshotRecord> {
        &mut self.snapshots
    }
}

/// 基线文件：带标签（环境名等）和整体捕获时间
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineFile {
    pub version: u32,
    #[serde(default)]
    pub label: String,
    pub captured_at: DateTime<Utc>,
    #[serde(default)]
    pub baselines: BTreeMap<String, SnapshotRecord>,
}

impl BaselineFile {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }
}

impl Default for BaselineFile {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            label: String::new(),
            captured_at: Utc::now(),
            baselines: BTreeMap::new(),
        }
    }
}

impl RecordContainer for BaselineFile {
    fn version(&self) -> u32 {
        self.version
    }

    fn records(&self) -> &BTreeMap<String, SnapshotRecord> {
        &self.baselines
    }

    fn records_mut(&mut self) -> &mut BTreeMap<String, SnapshotRecord> {
        &mut self.baselines
    }
}
