//! Baseline LLM call configuration shared by every worker's agent loop.

/// Static defaults for a provider call, overridden per-worker by
/// `sage-agent-loop`'s own config (system prompt, tool set, max turns).
pub struct LlmConfig {
    /// Default model identifier.
    pub default_model: String,

    /// Default maximum output tokens per provider call.
    pub default_max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_model: String::new(),
            default_max_tokens: 4096,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = LlmConfig::default();
        assert!(config.default_model.is_empty());
        assert_eq!(config.default_max_tokens, 4096);
    }

    #[test]
    fn custom_config_values() {
        let config = LlmConfig {
            default_model: "claude-sonnet".into(),
            default_max_tokens: 2048,
        };
        assert_eq!(config.default_model, "claude-sonnet");
        assert_eq!(config.default_max_tokens, 2048);
    }
}
