pub mod api;
pub mod error;
pub mod mcp_api;
pub mod model;
pub mod session;
pub mod storage;
