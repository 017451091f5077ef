pub mod a2a;
pub mod bootstrap;
pub mod context;
pub mod executor;
pub mod plan;
pub mod prompt_hash;
pub mod target;

pub use bootstrap::ensure_bootstrap_agent;
pub use context::{build_context, read_inherited_routing_state, InheritedRoutingState};
pub use executor::{start_and_execute, start_and_execute_with_parent, Executor};
pub use plan::{ChildRunSpec, Plan, PlanValidation};
pub use prompt_hash::prompt_hash;
pub use target::resolve_execution_target;
