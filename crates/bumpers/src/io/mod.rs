//! JSON input/output for the hook protocol

mod processor;
mod response;

pub use processor::StdinProcessor;
pub use response::HookResponse;
