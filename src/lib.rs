pub mod context;
pub mod core;
pub mod history;
pub mod llm;
pub mod server;
pub mod state;
