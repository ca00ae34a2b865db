use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// `store` 指令写入的变量
///
/// 保持插入顺序；同名 key 再次写入时覆盖旧值，位置不变。
/// 由编排器持有并按文档顺序修改，引擎只读取。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreContext {
    keys: Vec<String>,
    values: HashMap<String, String>,
}

impl StoreContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入变量，返回被覆盖的旧值
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let previous = self.values.insert(key.clone(), value.into());
        if previous.is_none() {
            self.keys.push(key);
        }
        previous
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// 缺失的 key 视为空串
    pub fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.keys
            .iter()
            .filter_map(|k| self.values.get(k).map(|v| (k.as_str(), v.as_str())))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StoreContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ctx = StoreContext::new();
        ctx.extend(iter);
        ctx
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for StoreContext {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl Serialize for StoreContext {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
