//! Basic usage of the Anthropic provider.
//!
//! Set ANTHROPIC_API_KEY in your environment and run:
//!   cargo run --example basic -p sage-llm-anthropic

use sage_llm::provider::Provider;
use sage_llm::types::{ContentPart, ProviderMessage, ProviderRequest, Role};
use sage_llm_anthropic::AnthropicProvider;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let api_key = std::env::var("ANTHROPIC_API_KEY")
        .expect("ANTHROPIC_API_KEY environment variable must be set");

    let provider = AnthropicProvider::new(api_key);

    let request = ProviderRequest {
        model: None,
        messages: vec![ProviderMessage {
            role: Role::User,
            content: vec![ContentPart::Text {
                text: "Say hello in one sentence.".into(),
            }],
        }],
        tools: vec![],
        max_tokens: Some(256),
        temperature: None,
        system: None,
        extra: serde_json::Value::Null,
    };

    let response = provider.complete(request).await?;
    for part in &response.content {
        if let ContentPart::Text { text } = part {
            println!("{text}");
        }
    }

    Ok(())
}
