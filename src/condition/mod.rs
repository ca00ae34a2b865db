//! `when` 条件：简写解析和基于 store 变量的求值

pub mod evaluator;
pub mod parser;
pub mod types;

pub use evaluator::{evaluate, evaluate_expression, evaluate_with};
pub use parser::parse_condition;
pub use types::{ConditionError, ConditionExpression, ConditionOp, WhenCondition};
