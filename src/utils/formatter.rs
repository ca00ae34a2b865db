use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, Table};
use serde_json::Value;

use crate::capture::CapturedResponse;
use crate::compare::{DiffEntry, DiffKind};

/// compact 只显示状态、耗时和短 body；verbose 额外显示响应头和完整 body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Compact,
    Verbose,
}

/// 捕获结果的终端展示
pub struct ResponseFormatter {
    format: ResponseFormat,
    color: bool,
}

impl ResponseFormatter {
    pub fn new(format: ResponseFormat) -> Self {
        Self {
            format,
            color: true,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn format(&self, response: &CapturedResponse) -> String {
        let mut output = vec![self.status_line(response)];

        let timing = format!("Time: {:.0}ms", response.timings().total_ms);
        output.push(self.paint(timing, |s| s.cyan()));

        let verbose = self.format == ResponseFormat::Verbose;
        if verbose && !response.headers.is_empty() {
            output.push(String::new());
            output.push(self.paint("Headers:".to_string(), |s| s.blue().bold()));
            for (key, value) in &response.headers {
                output.push(format!("   {}: {}", key, value));
            }
        }

        if !response.body.is_empty() {
            let body = &response.body;
            if verbose {
                output.push(String::new());
                output.push(self.paint("Body:".to_string(), |s| s.blue().bold()));
                output.push(pretty_json(body).unwrap_or_else(|| body.to_string()));
            } else if body.len() < 200 {
                output.push(pretty_json(body).unwrap_or_else(|| body.to_string()));
            } else {
                output.push(format!("Body: {} bytes", body.len()));
            }
        }

        output.join("\n")
    }

    fn status_line(&self, response: &CapturedResponse) -> String {
        let line = match response.status() {
            Some(status) => format!("HTTP {}", status),
            None => "HTTP (no status)".to_string(),
        };
        let success = response.is_success();
        let client_error = matches!(response.status(), Some(400..=499));
        self.paint(line, |s| {
            let s = if success {
                s.green()
            } else if client_error {
                s.yellow()
            } else {
                s.red()
            };
            s.bold()
        })
    }

    fn paint(&self, text: String, style: impl FnOnce(&str) -> ColoredString) -> String {
        if self.color {
            style(&text).to_string()
        } else {
            text
        }
    }
}

/// 尝试将 body 格式化为漂亮的 JSON，不是 JSON 时返回 None
fn pretty_json(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    serde_json::to_string_pretty(&value).ok()
}

/// 差异列表渲染成表格
pub struct DiffFormatter {
    color: bool,
}

impl DiffFormatter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn table(&self, diffs: &[DiffEntry]) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_header(vec!["Path", "Kind", "Baseline", "Current"]);

        for diff in diffs {
            let kind = Cell::new(diff.kind.as_str());
            let kind = if self.color {
                kind.fg(kind_color(diff.kind))
            } else {
                kind
            };
            let path = if diff.path.is_empty() {
                "(root)"
            } else {
                diff.path.as_str()
            };

            table.add_row(vec![
                Cell::new(path).add_attribute(Attribute::Bold),
                kind,
                Cell::new(render_side(diff.baseline.as_ref())),
                Cell::new(render_side(diff.current.as_ref())),
            ]);
        }

        table
    }

    /// 没有差异时输出一行提示，否则输出表格和汇总
    pub fn format(&self, diffs: &[DiffEntry]) -> String {
        if diffs.is_empty() {
            let line = "No differences".to_string();
            return if self.color {
                line.green().to_string()
            } else {
                line
            };
        }

        let summary = format!("{} difference(s)", diffs.len());
        let summary = if self.color {
            summary.red().bold().to_string()
        } else {
            summary
        };
        format!("{}\n{}", self.table(diffs), summary)
    }
}

fn kind_color(kind: DiffKind) -> Color {
    match kind {
        DiffKind::Added => Color::Green,
        DiffKind::Removed => Color::Red,
        DiffKind::Changed => Color::Yellow,
        DiffKind::TypeMismatch => Color::Magenta,
    }
}

fn render_side(value: Option<&Value>) -> String {
    match value {
        None => "-".to_string(),
        Some(Value::String(s)) => format!("{:?}", s),
        Some(other) => other.to_string(),
    }
}
