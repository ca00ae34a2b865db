use crate::invocation::builder::InvocationPlan;

/// 把调用计划渲染成一行可直接粘贴到 shell 的命令
///
/// 只用于显示，执行时应直接使用 `plan.args`。
pub fn format_shell_line(plan: &InvocationPlan) -> String {
    std::iter::once(plan.program.as_str())
        .chain(plan.args.iter().map(String::as_str))
        .map(quote)
        .collect::<Vec<_>>()
        .join(" ")
}

/// 含空白、单引号或双引号的 token 用单引号包起来，内部的 `'` 写成 `'\''`
pub fn quote(token: &str) -> String {
    if token.is_empty() {
        return "''".to_string();
    }
    let needs_quotes = token
        .chars()
        .any(|c| c.is_whitespace() || c == '\'' || c == '"');
    if !needs_quotes {
        return token.to_string();
    }
    format!("'{}'", token.replace('\'', r"'\''"))
}
