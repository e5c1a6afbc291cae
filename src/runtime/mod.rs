pub mod executor;
pub mod runtime_error;
pub mod store;

pub use executor::{Executor, ExecutorConfig};
pub use store::VariableStore;
