//! Per-event hook handlers

mod post_tool_use;
mod pre_tool_use;
mod session_start;
mod user_prompt_submit;

pub use post_tool_use::PostToolUseHandler;
pub use pre_tool_use::PreToolUseHandler;
pub use session_start::SessionStartHandler;
pub use user_prompt_submit::UserPromptSubmitHandler;
