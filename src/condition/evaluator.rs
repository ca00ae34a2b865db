use regex::RegexBuilder;
use tracing::trace;

use crate::condition::types::{ConditionExpression, ConditionOp, WhenCondition};
use crate::store::StoreContext;

/// 引用 store 变量的前缀
pub const STORE_PREFIX: &str = "store.";

/// 对 `when` 条件求值
///
/// 没有副作用也不会失败。`all` 在第一个 false 处停止，`any` 在第一个 true 处停止。
pub fn evaluate(condition: &WhenCondition, context: &StoreContext) -> bool {
    evaluate_with(condition, |expr| evaluate_expression(expr, context))
}

/// 同 [`evaluate`]，单个表达式的求值交给调用方
pub fn evaluate_with<F>(condition: &WhenCondition, mut eval: F) -> bool
where
    F: FnMut(&ConditionExpression) -> bool,
{
    match condition {
        WhenCondition::Always => true,
        WhenCondition::Single(expr) => eval(expr),
        WhenCondition::All(list) => list.iter().all(&mut eval),
        WhenCondition::Any(list) => list.iter().any(&mut eval),
    }
}

/// 对单个表达式求值
pub fn evaluate_expression(expr: &ConditionExpression, context: &StoreContext) -> bool {
    let left = resolve_left(&expr.left, context);
    let right = expr
        .right
        .as_deref()
        .map(|r| resolve_right(r, context))
        .unwrap_or("");
    let cs = expr.case_sensitive;

    let result = match expr.operator {
        ConditionOp::Equal => equals(left, right, cs),
        ConditionOp::NotEqual => !equals(left, right, cs),
        ConditionOp::Greater => numeric(left, right, |a, b| a > b),
        ConditionOp::Less => numeric(left, right, |a, b| a < b),
        ConditionOp::GreaterOrEqual => numeric(left, right, |a, b| a >= b),
        ConditionOp::LessOrEqual => numeric(left, right, |a, b| a <= b),
        ConditionOp::Contains => {
            if cs {
                left.contains(right)
            } else {
                left.to_lowercase().contains(&right.to_lowercase())
            }
        }
        ConditionOp::Matches => match RegexBuilder::new(right).case_insensitive(!cs).build() {
            Ok(re) => re.is_match(left),
            Err(e) => {
                trace!(pattern = right, error = %e, "invalid regex, condition is false");
                false
            }
        },
        ConditionOp::Exists => !left.is_empty(),
        ConditionOp::NotExists => left.is_empty(),
    };

    trace!(condition = %expr, left, right, result, "evaluated condition");
    result
}

/// 左侧总是变量路径，`store.` 前缀可省略
fn resolve_left<'a>(path: &str, context: &'a StoreContext) -> &'a str {
    let key = path.trim();
    let key = key.strip_prefix(STORE_PREFIX).unwrap_or(key);
    context.get_or_empty(key)
}

/// 右侧以 `store.` 开头时是变量引用，否则是字面量
fn resolve_right<'a>(value: &'a str, context: &'a StoreContext) -> &'a str {
    match value.trim().strip_prefix(STORE_PREFIX) {
        Some(key) => context.get_or_empty(key),
        None => value,
    }
}

fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn equals(left: &str, right: &str, case_sensitive: bool) -> bool {
    if let (Some(a), Some(b)) = (parse_number(left), parse_number(right)) {
        return a == b;
    }
    if case_sensitive {
        left == right
    } else {
        left.to_lowercase() == right.to_lowercase()
    }
}

fn numeric(left: &str, right: &str, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (parse_number(left), parse_number(right)) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::parser::parse_condition;

    fn ctx(pairs: &[(&str, &str)]) -> StoreContext {
        pairs.iter().copied().collect()
    }

    fn eval(input: &str, context: &StoreContext) -> bool {
        evaluate(&WhenCondition::parse(input).unwrap(), context)
    }

    #[test]
    fn test_shorthand_numeric_scenario() {
        assert!(eval("store.count >= 10", &ctx(&[("count", "12")])));
        assert!(!eval("store.count >= 10", &ctx(&[("count", "7")])));
        assert!(!eval("store.count >= 10", &ctx(&[])));
    }

    #[test]
    fn test_all_short_circuits_on_first_false() {
        let condition = WhenCondition::All(vec![
            ConditionExpression::new("store.x", ConditionOp::Exists, None),
            ConditionExpression::new("store.y", ConditionOp::Equal, Some("z".to_string())),
        ]);
        let context = ctx(&[("x", "")]);

        let mut evaluated = Vec::new();
        let result = evaluate_with(&condition, |expr| {
            evaluated.push(expr.left.clone());
            evaluate_expression(expr, &context)
        });

        assert!(!result);
        assert_eq!(evaluated, vec!["store.x"]);
    }

    #[test]
    fn test_all_skips_malformed_regex_after_false() {
        let condition = WhenCondition::All(vec![
            ConditionExpression::new("store.flag", ConditionOp::Equal, Some("on".to_string())),
            ConditionExpression::new("store.id", ConditionOp::Matches, Some("([".to_string())),
        ]);
        let mut calls = 0;
        let result = evaluate_with(&condition, |expr| {
            calls += 1;
            evaluate_expression(expr, &ctx(&[("flag", "off")]))
        });
        assert!(!result);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_any_short_circuits_on_first_true() {
        let condition = WhenCondition::Any(vec![
            parse_condition("store.a == 1").unwrap(),
            parse_condition("store.b == 2").unwrap(),
        ]);
        let mut calls = 0;
        let result = evaluate_with(&condition, |expr| {
            calls += 1;
            evaluate_expression(expr, &ctx(&[("a", "1")]))
        });
        assert!(result);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_empty_groups() {
        let context = ctx(&[]);
        assert!(evaluate(&WhenCondition::Always, &context));
        assert!(evaluate(&WhenCondition::All(vec![]), &context));
        assert!(!evaluate(&WhenCondition::Any(vec![]), &context));
    }

    #[test]
    fn test_equality_numeric_and_string() {
        let context = ctx(&[("code", "200.0"), ("name", "Alice")]);
        assert!(eval("store.code == 200", &context));
        assert!(eval("store.name == alice", &context));
        assert!(!eval("store.name != ALICE", &context));

        let strict = ConditionExpression::new("store.name", ConditionOp::Equal, Some("alice".into()))
            .case_sensitive(true);
        assert!(!evaluate_expression(&strict, &context));
    }

    #[test]
    fn test_ordering_requires_numbers() {
        let context = ctx(&[("v", "abc")]);
        assert!(!eval("store.v > 1", &context));
        assert!(!eval("store.v < 1", &context));
        assert!(!eval("store.v <= 1", &context));
    }

    #[test]
    fn test_contains_and_matches() {
        let context = ctx(&[("msg", "Hello World"), ("id", "ABC-123")]);
        assert!(eval("store.msg contains world", &context));
        assert!(eval(r"store.id matches ^abc-\d+$", &context));
        assert!(!eval("store.id matches ([", &context));

        let strict = ConditionExpression::new("store.msg", ConditionOp::Contains, Some("world".into()))
            .case_sensitive(true);
        assert!(!evaluate_expression(&strict, &context));
    }

    #[test]
    fn test_exists_and_not_exists() {
        let context = ctx(&[("token", "t"), ("blank", "")]);
        assert!(eval("store.token exists", &context));
        assert!(!eval("store.blank exists", &context));
        assert!(eval("store.missing not-exists", &context));
        assert!(eval("token exists", &context));
    }

    #[test]
    fn test_right_operand_reference() {
        let context = ctx(&[("expected", "42"), ("actual", "42")]);
        assert!(eval("store.actual == store.expected", &context));
        assert!(!eval("store.actual == store.other", &context));
    }
}
