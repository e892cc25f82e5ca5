use crate::config::Config;
use crate::error::ToolError;
use crate::models::Credentials;
use crate::tts::{TextToSpeechParameters, TextToSpeechTool};
use log::{info, warn};
use thiserror::Error;

// =============================================================================
// Provider Bootstrap & Credential Validation
// - 固定パラメータで1回だけ実際に合成APIを呼び、結果を5種類の検証エラーに分類
// =============================================================================

/// 資格情報検証の結果分類（ユーザー向けメッセージを持つ）
#[derive(Debug, Error)]
pub enum CredentialValidationError {
    #[error("API key is required")]
    MissingKey,

    #[error("Invalid API key - unauthorized access")]
    Unauthorized,

    #[error("API key does not have required permissions")]
    Forbidden,

    #[error("API request timeout - please check your connection")]
    Timeout,

    #[error("Credential validation failed: {0}")]
    Other(String),
}

pub struct SpeechkitProvider<'a> {
    config: &'a Config,
}

impl<'a> SpeechkitProvider<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// テスト合成を1回実行して資格情報を検証する
    pub fn validate_credentials(
        &self,
        credentials: &Credentials,
    ) -> Result<(), CredentialValidationError> {
        if credentials.is_empty() {
            return Err(CredentialValidationError::MissingKey);
        }

        let tool = TextToSpeechTool::new(self.config, credentials);
        let test_parameters = TextToSpeechParameters {
            text: "test".to_string(),
            ..Default::default()
        };

        match tool.invoke(&test_parameters) {
            Ok(messages) if messages.is_empty() => Err(CredentialValidationError::Other(
                "No response from Yandex SpeechKit API".to_string(),
            )),
            Ok(_) => {
                info!("Credential validation succeeded");
                Ok(())
            }
            Err(ToolError::Provider { status: 401, .. }) => {
                warn!("Credential validation failed: unauthorized");
                Err(CredentialValidationError::Unauthorized)
            }
            Err(ToolError::Provider { status: 403, .. }) => {
                warn!("Credential validation failed: forbidden");
                Err(CredentialValidationError::Forbidden)
            }
            Err(ToolError::Timeout) => Err(CredentialValidationError::Timeout),
            Err(err) => {
                warn!("Credential validation failed: {}", err);
                Err(CredentialValidationError::Other(err.to_string()))
            }
        }
    }
}
