use serde::{Deserialize, Serialize};

/// 默认起始哨兵
pub const DEFAULT_START_SENTINEL: &str = "__CURLCHECK_METRICS_START__";
/// 默认结束哨兵
pub const DEFAULT_END_SENTINEL: &str = "__CURLCHECK_METRICS_END__";
/// curl 会把它替换成一个 JSON 指标对象
pub const WRITE_OUT_PLACEHOLDER: &str = "%{json}";

/// 哨兵对
///
/// Invocation builder 把它写进 `-w` 参数，Demultiplexer 用同一个值去搜索，
/// 两边必须共用这一个类型，字符串才能逐字一致。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sentinels {
    pub start: String,
    pub end: String,
}

impl Default for Sentinels {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_SENTINEL.to_string(),
            end: DEFAULT_END_SENTINEL.to_string(),
        }
    }
}

impl Sentinels {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// 单请求模式的 marker
    pub fn single(&self) -> Marker {
        Marker {
            index: None,
            start: self.start.clone(),
            end: self.end.clone(),
        }
    }

    /// 批量模式下第 `index` 个请求的 marker
    pub fn indexed(&self, index: usize) -> Marker {
        Marker {
            index: Some(index),
            start: with_index(&self.start, index),
            end: with_index(&self.end, index),
        }
    }
}

/// `__X_START__` -> `__X_START_2__`；没有结尾 `__` 的哨兵追加 `_2__`
///
/// 结尾的 `__` 保证 `_1__` 不会是 `_12__` 的前缀。
fn with_index(sentinel: &str, index: usize) -> String {
    let stem = sentinel.strip_suffix("__").unwrap_or(sentinel);
    format!("{}_{}__", stem, index)
}

/// 单个请求的起止标记
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Marker {
    pub index: Option<usize>,
    pub start: String,
    pub end: String,
}

impl Marker {
    /// `-w` 参数的完整内容：起始哨兵 + 指标占位符 + 结束哨兵
    pub fn write_out(&self) -> String {
        format!("{}{}{}", self.start, WRITE_OUT_PLACEHOLDER, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_marker_uses_sentinels_verbatim() {
        let marker = Sentinels::default().single();
        assert_eq!(marker.index, None);
        assert_eq!(
            marker.write_out(),
            "__CURLCHECK_METRICS_START__%{json}__CURLCHECK_METRICS_END__"
        );
    }

    #[test]
    fn test_indexed_marker_embeds_index() {
        let marker = Sentinels::default().indexed(2);
        assert_eq!(marker.start, "__CURLCHECK_METRICS_START_2__");
        assert_eq!(marker.end, "__CURLCHECK_METRICS_END_2__");
    }

    #[test]
    fn test_indexed_marker_without_trailing_underscores() {
        let marker = Sentinels::new("<<BEGIN", "END>>").indexed(7);
        assert_eq!(marker.start, "<<BEGIN_7__");
        assert_eq!(marker.end, "END>>_7__");
    }

    #[test]
    fn test_indexed_markers_do_not_collide() {
        let sentinels = Sentinels::default();
        let markers: Vec<Marker> = (0..12).map(|i| sentinels.indexed(i)).collect();
        for (i, a) in markers.iter().enumerate() {
            for (j, b) in markers.iter().enumerate() {
                if i != j {
                    assert_ne!(a.start, b.start);
                    assert_ne!(a.end, b.end);
                }
            }
        }
    }
}
