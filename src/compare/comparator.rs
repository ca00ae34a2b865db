use std::collections::BTreeSet;

use serde_json::Value;
use tracing::trace;

use crate::compare::path::{Segment, format_path};
use crate::compare::types::{CompiledRules, DiffEntry, DiffKind, MatchRule};

/// 结构化比较两棵 JSON 树
///
/// 深度优先、从左到右遍历：对象按 key 的自然顺序，数组按下标，
/// 同样的输入总是得到同样顺序的差异列表。
pub fn compare(baseline: &Value, current: &Value, rules: &CompiledRules) -> Vec<DiffEntry> {
    let mut walker = Walker {
        rules,
        path: Vec::new(),
        diffs: Vec::new(),
    };
    walker.visit(Some(baseline), Some(current));
    trace!(diffs = walker.diffs.len(), "comparison finished");
    walker.diffs
}

struct Walker<'a> {
    rules: &'a CompiledRules,
    path: Vec<Segment>,
    diffs: Vec<DiffEntry>,
}

impl Walker<'_> {
    fn visit(&mut self, baseline: Option<&Value>, current: Option<&Value>) {
        if self.rules.is_excluded(&self.path) {
            return;
        }

        match self.rules.match_rule(&self.path) {
            Some(MatchRule::Any) => {
                // 视为相等，但两侧是同类容器时仍然检查子节点
                if let (Some(b), Some(c)) = (baseline, current)
                    && same_container(b, c)
                {
                    self.visit_children(b, c);
                }
                return;
            }
            Some(MatchRule::Pattern(re)) => {
                if let (Some(b), Some(c)) = (baseline, current) {
                    let matched = re.as_ref().is_some_and(|re| re.is_match(&string_form(c)));
                    if !matched {
                        self.push(Some(b), Some(c), DiffKind::Changed);
                    }
                    return;
                }
            }
            None => {}
        }

        match (baseline, current) {
            (None, None) => {}
            (None, Some(c)) => self.push(None, Some(c), DiffKind::Added),
            (Some(b), None) => self.push(Some(b), None, DiffKind::Removed),
            (Some(b), Some(c)) => {
                if kind_of(b) != kind_of(c) {
                    self.push(Some(b), Some(c), DiffKind::TypeMismatch);
                } else if same_container(b, c) {
                    self.visit_children(b, c);
                } else if !scalar_eq(b, c) {
                    self.push(Some(b), Some(c), DiffKind::Changed);
                }
            }
        }
    }

    fn visit_children(&mut self, baseline: &Value, current: &Value) {
        match (baseline, current) {
            (Value::Object(b), Value::Object(c)) => {
                let keys: BTreeSet<&String> = b.keys().chain(c.keys()).collect();
                for key in keys {
                    self.path.push(Segment::Key(key.clone()));
                    self.visit(b.get(key), c.get(key));
                    self.path.pop();
                }
            }
            (Value::Array(b), Value::Array(c)) => {
                for index in 0..b.len().max(c.len()) {
                    self.path.push(Segment::Index(index));
                    self.visit(b.get(index), c.get(index));
                    self.path.pop();
                }
            }
            _ => {}
        }
    }

    fn push(&mut self, baseline: Option<&Value>, current: Option<&Value>, kind: DiffKind) {
        self.diffs.push(DiffEntry {
            path: format_path(&self.path),
            baseline: baseline.cloned(),
            current: current.cloned(),
            kind,
        });
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Kind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

fn kind_of(value: &Value) -> Kind {
    match value {
        Value::Null => Kind::Null,
        Value::Bool(_) => Kind::Bool,
        Value::Number(_) => Kind::Number,
        Value::String(_) => Kind::String,
        Value::Array(_) => Kind::Array,
        Value::Object(_) => Kind::Object,
    }
}

fn same_container(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_))
    )
}

/// 数字按数值比较（`1` 与 `1.0` 相等），其余按值比较
fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// 正则匹配使用的字符串形式：字符串取原文，其他值取 JSON 文本
fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
