pub mod resolution;
pub mod spec;

pub use resolution::{resolve_agent, AgentResolution, ResolverContext};
pub use spec::AgentSpec;
