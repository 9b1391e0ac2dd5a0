use compass_core::context::AssistantContext;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Degrade { reason_code: &'static str, user_message: String, fallback_path: &'static str },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    /// Answer with a degraded notice while any platform reports unhealthy.
    pub require_healthy_platforms: bool,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self { require_healthy_platforms: true }
    }
}

impl GuardrailPolicy {
    pub fn evaluate(&self, context: &AssistantContext) -> GuardrailDecision {
        if !self.require_healthy_platforms || context.all_platforms_healthy() {
            return GuardrailDecision::Allow;
        }

        GuardrailDecision::Degrade {
            reason_code: "platform_unhealthy",
            user_message: "I notice there are some connectivity issues with the CRM platforms. \
                           Let me help you with what data I can access, but some information \
                           might be limited."
                .to_string(),
            fallback_path: "partial_context",
        }
    }
}
