//! Core protocol for Elec-Mate agent consultations.
//! Wire types, incremental SSE decoding, and the caller-facing callback
//! surface shared by every consultation client.

pub mod accumulator;
pub mod callbacks;
pub mod error;
pub mod protocol;

// Re-export commonly used types
pub use accumulator::{Accumulator, ConsultationSummary};
pub use callbacks::{NoopCallbacks, StreamCallbacks};
pub use error::{Error, Result};
pub use protocol::{
    AgentReply, Citation, Message, Role, RouterResponse, SseDecoder, StreamChunk, ToolInvocation,
    CONSULTATION_MODE, DEFAULT_AGENT, KNOWN_AGENTS,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
