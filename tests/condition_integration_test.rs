use curlcheck::condition::{
    ConditionExpression, ConditionOp, WhenCondition, evaluate, evaluate_with, parse_condition,
};
use curlcheck::store::StoreContext;
use pretty_assertions::assert_eq;

fn context(pairs: &[(&str, &str)]) -> StoreContext {
    pairs.iter().copied().collect()
}

#[test]
fn test_shorthand_numeric_comparison() {
    let when = WhenCondition::parse("store.count >= 10").unwrap();

    assert!(evaluate(&when, &context(&[("count", "12")])));
    assert!(!evaluate(&when, &context(&[("count", "7")])));
    assert!(!evaluate(&when, &StoreContext::new()));
}

#[test]
fn test_all_short_circuits_on_empty_value() {
    let when: WhenCondition = serde_json::from_str(
        r#"{"all": [
            {"left": "store.x", "operator": "exists"},
            {"left": "store.y", "operator": "==", "right": "z"}
        ]}"#,
    )
    .unwrap();

    let mut evaluated = Vec::new();
    let ctx = context(&[("x", "")]);
    let result = evaluate_with(&when, |expr| {
        evaluated.push(expr.left.clone());
        curlcheck::condition::evaluate_expression(expr, &ctx)
    });

    assert!(!result);
    assert_eq!(evaluated, vec!["store.x".to_string()]);
}

#[test]
fn test_malformed_regex_after_false_is_not_evaluated() {
    let when = WhenCondition::All(vec![
        parse_condition("store.flag == on").unwrap(),
        parse_condition("store.name matches ([unclosed").unwrap(),
    ]);
    assert!(!evaluate(&when, &context(&[("flag", "off"), ("name", "x")])));
}

#[test]
fn test_when_forms_from_request_json() {
    let any: WhenCondition =
        serde_json::from_str(r#"{"any": ["store.env == prod", "store.force exists"]}"#).unwrap();
    assert!(evaluate(&any, &context(&[("env", "PROD")])));
    assert!(evaluate(&any, &context(&[("env", "dev"), ("force", "1")])));
    assert!(!evaluate(&any, &context(&[("env", "dev")])));

    let empty: WhenCondition = serde_json::from_str("{}").unwrap();
    assert_eq!(empty, WhenCondition::Always);
    assert!(evaluate(&empty, &StoreContext::new()));

    let single: WhenCondition = serde_json::from_str(
        r#"{"left": "store.name", "operator": "==", "right": "Alice", "caseSensitive": true}"#,
    )
    .unwrap();
    assert!(evaluate(&single, &context(&[("name", "Alice")])));
    assert!(!evaluate(&single, &context(&[("name", "alice")])));
}

#[test]
fn test_right_operand_store_reference() {
    let when = WhenCondition::parse("store.current == store.expected").unwrap();
    assert!(evaluate(
        &when,
        &context(&[("current", "v2"), ("expected", "V2")])
    ));
    assert!(!evaluate(
        &when,
        &context(&[("current", "v2"), ("expected", "v3")])
    ));
}

#[test]
fn test_later_store_write_overwrites() {
    let mut ctx = StoreContext::new();
    ctx.insert("status", "500");
    ctx.insert("token", "t");
    ctx.insert("status", "200");

    let when = WhenCondition::parse("store.status == 200").unwrap();
    assert!(evaluate(&when, &ctx));
    assert_eq!(
        ctx.iter().map(|(k, _)| k).collect::<Vec<_>>(),
        vec!["status", "token"]
    );
}

#[test]
fn test_shorthand_parse_shapes() {
    assert_eq!(
        parse_condition("store.x not-exists").unwrap(),
        ConditionExpression::new("store.x", ConditionOp::NotExists, None)
    );
    assert_eq!(
        parse_condition("store.msg contains \"not found\"").unwrap(),
        ConditionExpression::new("store.msg", ConditionOp::Contains, Some("not found".to_string()))
    );
    assert!(parse_condition("store.x").is_err());
}
