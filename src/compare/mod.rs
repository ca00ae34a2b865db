//! Structural comparator：快照测试和基线对比共用的 JSON 树比较

pub mod comparator;
pub mod facets;
pub mod path;
pub mod types;

pub use comparator::compare;
pub use facets::{FacetView, body_value, compare_views};
pub use path::{PathPattern, Segment, format_path, lookup, parse_path};
pub use types::{
    BASELINE_DEFAULT_FACETS, ComparisonRules, CompiledRules, DiffEntry, DiffKind, Facet,
    MatchRule, SNAPSHOT_DEFAULT_FACETS,
};
