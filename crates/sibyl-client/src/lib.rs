//! Client-side turn controller for a retrieval-augmented answering service.
//!
//! Conducts one question/answer exchange at a time in one of three transport
//! modes (one-shot, incrementally streamed, or multi-pass agentic), assembles
//! the service's output into an annotated answer, and decides how the result
//! should be displayed.

pub mod assembler;
pub mod error;
pub mod frame;
pub mod policy;
pub mod session;
pub mod transport;
pub mod types;

pub use assembler::{FrameOutcome, ResponseAssembler};
pub use error::TurnError;
pub use frame::{Frame, FrameParser, EVENT_PREFIX};
pub use policy::{decide, DisplayPolicy};
pub use session::{SessionController, TurnHandle, TurnRequest};
pub use transport::{ChunkStream, Transport};
pub use types::{ChatRequest, ChatResponse, HealthStatus};
