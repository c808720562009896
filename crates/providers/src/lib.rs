pub mod anthropic;
pub mod factory;
pub mod openai;

use async_trait::async_trait;
use skillcell_core::types::CompletionRequest;
use skillcell_core::Result;

/// 文本补全服务的统一接口。
///
/// The evolution pipeline treats completion as an opaque external capability:
/// a prompt (plus optional system instruction, history, and sampling
/// controls) goes in, generated text comes out. Providers own transport,
/// authentication, and model-specific request shapes.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

pub use anthropic::AnthropicProvider;
pub use factory::{create_provider, infer_provider_from_model};
pub use openai::OpenAiProvider;
