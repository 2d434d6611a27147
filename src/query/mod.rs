// Submodules for separation of concerns
mod eval;
mod exec;
mod parse;
mod types;

// Public API re-exports
pub use eval::{compare_bson, compare_docs, eval_filter, get_path, values_equal};
pub use exec::{Evaluation, evaluate};
pub use parse::{parse_filter, parse_sort};
pub use types::{CmpOp, Filter, Order, SortSpec};
