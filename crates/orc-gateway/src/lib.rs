pub mod rpc;
pub mod server;
pub mod state;

pub use rpc::{route_rpc, RpcResult};
pub use server::{build_router, serve};
pub use state::AppState;
