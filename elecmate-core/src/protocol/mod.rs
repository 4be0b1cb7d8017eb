mod chunk;
mod sse;
mod types;

pub use chunk::StreamChunk;
pub use sse::SseDecoder;
pub use types::{
    AgentReply, Citation, Message, Role, RouterResponse, ToolInvocation, CONSULTATION_MODE,
    DEFAULT_AGENT, KNOWN_AGENTS,
};
