//! store 变量：上下文、`store` 指令和 `{{store.x}}` 插值

pub mod capture;
pub mod context;
pub mod resolver;

pub use capture::{StoreDirective, StoreSource, apply_store};
pub use context::StoreContext;
pub use resolver::{interpolate, interpolate_request, interpolate_value};
