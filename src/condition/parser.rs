use crate::condition::types::{ConditionError, ConditionExpression, ConditionOp};

/// 解析简写条件
///
/// 支持的格式：
/// - `store.status == 200`
/// - `store.count >= 10`
/// - `store.name contains "alice"`
/// - `store.token exists` / `store.token not-exists`
///
/// 从左到右找第一个运算符；同一位置上长的运算符先试。
/// 单词运算符（`contains` 等）前后必须是空白或结尾。
pub fn parse_condition(input: &str) -> Result<ConditionExpression, ConditionError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ConditionError::InvalidSyntax("condition is empty".to_string()));
    }

    let (pos, op) = find_operator(input).ok_or_else(|| {
        ConditionError::InvalidSyntax(format!("No valid operator found in condition: {}", input))
    })?;

    let left = input[..pos].trim();
    let right = input[pos + op.as_str().len()..].trim();

    if left.is_empty() {
        return Err(ConditionError::InvalidSyntax(format!(
            "Left side of condition is empty: {}",
            input
        )));
    }

    let right = if op.is_unary() {
        if !right.is_empty() {
            return Err(ConditionError::InvalidSyntax(format!(
                "'{}' takes no right operand: {}",
                op, input
            )));
        }
        None
    } else {
        if right.is_empty() {
            return Err(ConditionError::InvalidSyntax(format!(
                "Right side of condition is empty: {}",
                input
            )));
        }
        Some(unquote(right).to_string())
    };

    Ok(ConditionExpression::new(left, op, right))
}

fn find_operator(input: &str) -> Option<(usize, ConditionOp)> {
    for (pos, _) in input.char_indices() {
        let rest = &input[pos..];
        for op in ConditionOp::SCAN_ORDER {
            let token = op.as_str();
            if !rest.starts_with(token) {
                continue;
            }
            if op.is_word() && !is_delimited(input, pos, token.len()) {
                continue;
            }
            return Some((pos, op));
        }
    }
    None
}

fn is_delimited(input: &str, pos: usize, len: usize) -> bool {
    let before = input[..pos].chars().next_back();
    let after = input[pos + len..].chars().next();
    before.is_some_and(char::is_whitespace) && after.is_none_or(char::is_whitespace)
}

/// 去掉成对的引号
fn unquote(s: &str) -> &str {
    let quoted = s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')));
    if quoted { &s[1..s.len() - 1] } else { s }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_comparison() {
        let expr = parse_condition("store.status == 200").unwrap();
        assert_eq!(expr.left, "store.status");
        assert_eq!(expr.operator, ConditionOp::Equal);
        assert_eq!(expr.right.as_deref(), Some("200"));
        assert!(!expr.case_sensitive);
    }

    #[test]
    fn test_longest_match_first() {
        let expr = parse_condition("store.count >= 10").unwrap();
        assert_eq!(expr.operator, ConditionOp::GreaterOrEqual);
        assert_eq!(expr.right.as_deref(), Some("10"));

        let expr = parse_condition("store.count<=3").unwrap();
        assert_eq!(expr.operator, ConditionOp::LessOrEqual);
        assert_eq!(expr.left, "store.count");

        let expr = parse_condition("store.a != b").unwrap();
        assert_eq!(expr.operator, ConditionOp::NotEqual);
    }

    #[test]
    fn test_unary_operators() {
        let expr = parse_condition("store.x exists").unwrap();
        assert_eq!(expr.operator, ConditionOp::Exists);
        assert_eq!(expr.right, None);

        let expr = parse_condition("store.x not-exists").unwrap();
        assert_eq!(expr.operator, ConditionOp::NotExists);
        assert_eq!(expr.left, "store.x");
    }

    #[test]
    fn test_word_operator_needs_whitespace() {
        // 左侧路径里的 "exists" 不是运算符
        let expr = parse_condition("store.exists_flag == yes").unwrap();
        assert_eq!(expr.left, "store.exists_flag");
        assert_eq!(expr.operator, ConditionOp::Equal);

        let expr = parse_condition("store.message contains not-exists").unwrap();
        assert_eq!(expr.operator, ConditionOp::Contains);
        assert_eq!(expr.right.as_deref(), Some("not-exists"));
    }

    #[test]
    fn test_quoted_right_operand() {
        let expr = parse_condition(r#"store.name == "Alice Smith""#).unwrap();
        assert_eq!(expr.right.as_deref(), Some("Alice Smith"));

        let expr = parse_condition("store.name contains 'li'").unwrap();
        assert_eq!(expr.right.as_deref(), Some("li"));
    }

    #[test]
    fn test_regex_right_operand_keeps_operators() {
        let expr = parse_condition(r"store.id matches ^[a-z]+=\d{2,}$").unwrap();
        assert_eq!(expr.operator, ConditionOp::Matches);
        assert_eq!(expr.right.as_deref(), Some(r"^[a-z]+=\d{2,}$"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_condition(""), Err(ConditionError::InvalidSyntax(_))));
        assert!(matches!(parse_condition("store.x"), Err(ConditionError::InvalidSyntax(_))));
        assert!(matches!(parse_condition("== 3"), Err(ConditionError::InvalidSyntax(_))));
        assert!(matches!(parse_condition("store.x =="), Err(ConditionError::InvalidSyntax(_))));
        assert!(matches!(
            parse_condition("store.x exists 1"),
            Err(ConditionError::InvalidSyntax(_))
        ));
    }
}
