//! Chat responder over the live CRM aggregation.
//!
//! Answers natural-language questions with canned, data-filled replies. The
//! responder never fetches anything itself: callers build an
//! [`AssistantContext`](compass_core::context::AssistantContext) from the
//! registry and hand it over.
//!
//! # Flow
//!
//! 1. **Guardrail** (`guardrails`) - any unhealthy platform short-circuits to a
//!    degraded notice.
//! 2. **Intent** (`intent`) - the first keyword rule that matches picks the
//!    topic; nothing matching falls through to a generic reply.
//! 3. **Render** (`render`) - the topic's renderer fills text from the context.
//!
//! # Key Types
//!
//! - `AgentRuntime` - entry point (see `runtime` module)
//! - `ChatIntent` - the rule-table topics
//! - `GuardrailPolicy` - health gate configuration

pub mod guardrails;
pub mod intent;
pub mod render;
pub mod runtime;

pub use guardrails::{GuardrailDecision, GuardrailPolicy};
pub use intent::ChatIntent;
pub use runtime::{AgentRuntime, ChatReply};
