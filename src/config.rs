use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Result;
use crate::compare::ComparisonRules;
use crate::error::CurlcheckError;
use crate::invocation::Sentinels;
use crate::snapshot::{BASELINE_DIR, SnapshotStorage};

/// 一组全局比较规则，外加存放目录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(flatten)]
    pub rules: ComparisonRules,
}

/// `curlcheck.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub sentinels: Sentinels,
    #[serde(default)]
    pub snapshot: RuleSection,
    #[serde(default)]
    pub diff: RuleSection,
}

impl EngineConfig {
    /// 快照目录：`CURLCHECK_SNAPSHOT_DIR` > `[snapshot].dir` > `__snapshots__`
    pub fn snapshot_dir(&self) -> PathBuf {
        SnapshotStorage::snapshot_dir(self.snapshot.dir.as_deref())
    }

    pub fn baseline_dir(&self) -> PathBuf {
        self.diff
            .dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(BASELINE_DIR))
    }

    /// 快照比较的有效规则（请求级逐字段覆盖）
    pub fn snapshot_rules(&self, request: Option<&ComparisonRules>) -> ComparisonRules {
        self.snapshot.rules.overridden_by(request)
    }

    /// 基线对比的有效规则
    pub fn diff_rules(&self, request: Option<&ComparisonRules>) -> ComparisonRules {
        self.diff.rules.overridden_by(request)
    }
}

/// 配置文件加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 配置文件名
    const CONFIG_FILE: &'static str = "curlcheck.toml";

    /// 从指定路径加载配置文件
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<EngineConfig> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CurlcheckError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config = toml::from_str(&content)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// 加载配置
    ///
    /// 显式指定的路径必须能读取；否则依次查找当前目录（含父目录）和
    /// `~/.config/curlcheck/`，都没有时使用默认配置。
    pub fn load(explicit: Option<&Path>) -> Result<EngineConfig> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }
        match Self::find() {
            Some(path) => Self::load_from_path(path),
            None => Ok(EngineConfig::default()),
        }
    }

    /// 查找配置文件
    /// 查找顺序：
    /// 1. 当前目录
    /// 2. 父目录递归查找
    /// 3. 用户配置目录 ~/.config/curlcheck/
    pub fn find() -> Option<PathBuf> {
        let current = std::env::current_dir().ok();
        if let Some(path) = current.as_deref().and_then(Self::find_upwards) {
            return Some(path);
        }

        let home = dirs::home_dir()?;
        let config_path = home
            .join(".config")
            .join("curlcheck")
            .join(Self::CONFIG_FILE);
        config_path.exists().then_some(config_path)
    }

    /// 从 `start` 开始逐级向上查找
    pub fn find_upwards(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            let config_path = current.join(Self::CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            // 尝试父目录
            if !current.pop() {
                break;
            }
        }

        None
    }

    /// 解析 CLI 参数 "key=value"
    pub fn parse_cli_var(s: &str) -> Option<(String, String)> {
        s.split_once('=')
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
    }
}
