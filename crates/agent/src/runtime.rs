use compass_core::context::AssistantContext;
use serde::Serialize;
use tracing::{debug, info};

use crate::guardrails::{GuardrailDecision, GuardrailPolicy};
use crate::intent::{detect, ChatIntent, Utterance};
use crate::render::render;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatReply {
    pub response: String,
    /// `None` when the guardrail answered instead of a rule.
    pub intent: Option<ChatIntent>,
    pub degraded: bool,
}

#[derive(Default)]
pub struct AgentRuntime {
    guardrails: GuardrailPolicy,
}

impl AgentRuntime {
    pub fn new(guardrails: GuardrailPolicy) -> Self {
        Self { guardrails }
    }

    pub fn respond(&self, message: &str, context: &AssistantContext) -> ChatReply {
        if let GuardrailDecision::Degrade { reason_code, user_message, fallback_path } =
            self.guardrails.evaluate(context)
        {
            info!(
                event_name = "agent.chat.degraded",
                reason_code,
                fallback_path,
                "chat answered with degraded notice"
            );
            return ChatReply { response: user_message, intent: None, degraded: true };
        }

        let utterance = Utterance::new(message);
        let intent = detect(&utterance);
        debug!(event_name = "agent.chat.intent", intent = intent.as_str(), "chat intent detected");

        ChatReply {
            response: render(intent, &utterance, message, context),
            intent: Some(intent),
            degraded: false,
        }
    }
}
