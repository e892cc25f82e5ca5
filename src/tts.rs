use crate::config::Config;
use crate::error::{map_request_error, provider_error_message, ToolError};
use crate::models::{
    allowed_emotions, voice_description, Credentials, SynthesisParameters, ToolMessage, EMOTIONS,
    NEUTRAL_ONLY,
};
use log::{error, info};
use serde_json::json;
use std::time::Duration;

// =============================================================================
// Text-to-Speech Tool
// - パラメータ検証（複数の違反は "; " で連結して一括報告）
// - 成功時は構造化メタデータとバイナリブロブの2メッセージを返す
// =============================================================================

pub const MAX_TEXT_LENGTH: usize = 5000;
pub const MIN_SPEED: f64 = 0.1;
pub const MAX_SPEED: f64 = 3.0;

/// 呼び出し側から渡される生の合成パラメータ
#[derive(Debug, Clone)]
pub struct TextToSpeechParameters {
    pub text: String,
    pub voice: String,
    pub emotion: String,
    pub speed: f64,
    pub format: String,
}

impl Default for TextToSpeechParameters {
    fn default() -> Self {
        Self {
            text: String::new(),
            voice: "marina".to_string(),
            emotion: "neutral".to_string(),
            speed: 1.0,
            format: "mp3".to_string(),
        }
    }
}

/// パラメータを検証して正規化する
///
/// 範囲・形状の違反をまとめて集めてから報告し、その後に音声と感情の
/// 組み合わせを検査する。フォーマットの `opus` はAPI表記 `oggopus` に揃える。
pub fn validate_parameters(raw: &TextToSpeechParameters) -> Result<SynthesisParameters, ToolError> {
    let mut errors = Vec::new();

    let text = raw.text.trim();
    if text.is_empty() {
        errors.push("Text content is required".to_string());
    } else if text.chars().count() > MAX_TEXT_LENGTH {
        errors.push(format!(
            "Text is too long (maximum {} characters)",
            MAX_TEXT_LENGTH
        ));
    }

    if voice_description(&raw.voice).is_none() {
        errors.push(format!("Invalid voice: {}", raw.voice));
    }

    if !EMOTIONS.contains(&raw.emotion.as_str()) {
        errors.push(format!("Invalid emotion: {}", raw.emotion));
    }

    if !(MIN_SPEED..=MAX_SPEED).contains(&raw.speed) || !raw.speed.is_finite() {
        errors.push(format!(
            "Speed must be between {} and {}",
            MIN_SPEED, MAX_SPEED
        ));
    }

    // API v1 は Opus 出力を 'oggopus' と表記する
    let format = if raw.format == "opus" {
        "oggopus"
    } else {
        raw.format.as_str()
    };
    if format != "mp3" && format != "oggopus" {
        errors.push(format!("Invalid format: {}", raw.format));
    }

    if !errors.is_empty() {
        return Err(ToolError::Parameter(errors.join("; ")));
    }

    // 音声ごとの感情サポートを検証（音声名はここまでで有効と確定している）
    let allowed = allowed_emotions(&raw.voice).unwrap_or(NEUTRAL_ONLY);
    if !allowed.contains(&raw.emotion.as_str()) {
        return Err(ToolError::Parameter(format!(
            "Emotion '{}' is not supported by voice '{}'. Allowed: {}",
            raw.emotion,
            raw.voice,
            allowed.join(", ")
        )));
    }

    Ok(SynthesisParameters {
        text: text.to_string(),
        voice: raw.voice.clone(),
        emotion: raw.emotion.clone(),
        speed: raw.speed,
        format: format.to_string(),
    })
}

pub struct TextToSpeechTool<'a> {
    config: &'a Config,
    credentials: &'a Credentials,
}

impl<'a> TextToSpeechTool<'a> {
    pub fn new(config: &'a Config, credentials: &'a Credentials) -> Self {
        Self {
            config,
            credentials,
        }
    }

    /// テキストを合成し、メタデータと音声ブロブの2メッセージを返す
    pub fn invoke(&self, raw: &TextToSpeechParameters) -> Result<Vec<ToolMessage>, ToolError> {
        if self.credentials.is_empty() {
            return Err(ToolError::MissingCredential);
        }

        let params = validate_parameters(raw)?;

        info!(
            "TTS synthesis - text: '{}...', voice: {}, emotion: {}, speed: {}, format: {}",
            params.text.chars().take(50).collect::<String>(),
            params.voice,
            params.emotion,
            params.speed_string(),
            params.format
        );

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.config.api.timeout_seconds))
            .build()
            .map_err(|e| ToolError::Network(e.to_string()))?;

        // SSMLルートタグで始まるテキストは ssml パラメータとして送る
        let text_key = if params.text.trim_start().starts_with("<speak") {
            "ssml"
        } else {
            "text"
        };

        let mut form: Vec<(&str, String)> = vec![
            (text_key, params.text.clone()),
            ("voice", params.voice.clone()),
            ("speed", params.speed_string()),
            ("format", params.format.clone()),
            ("lang", "ru-RU".to_string()),
        ];
        // neutral のときは emotion を送らない
        if params.emotion != "neutral" {
            form.push(("emotion", params.emotion.clone()));
        }

        let response = client
            .post(&self.config.api.tts_url)
            .header(
                "Authorization",
                format!("Api-Key {}", self.credentials.api_key),
            )
            .form(&form)
            .send()
            .map_err(map_request_error)?;

        let status = response.status();
        info!("API response status: {}", status);

        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let mut message = provider_error_message(&body);
            // デバッグ用にパラメータ文脈を付与
            message.push_str(&format!(
                " | voice={}, emotion={}, speed={}, format={}",
                params.voice,
                params.emotion,
                params.speed_string(),
                params.format
            ));
            error!("API error: {} - {}", status.as_u16(), message);
            return Err(ToolError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let audio_content = response
            .bytes()
            .map_err(|e| ToolError::Network(e.to_string()))?
            .to_vec();

        if audio_content.is_empty() {
            return Err(ToolError::Provider {
                status: status.as_u16(),
                message: "Empty response from TTS service".to_string(),
            });
        }

        info!(
            "TTS synthesis successful, audio size: {} bytes",
            audio_content.len()
        );

        let metadata = json!({
            "voice": params.voice,
            "emotion": params.emotion,
            "speed": params.speed_string(),
            "format": params.caller_format(),
            "text_length": params.text.chars().count(),
        });

        let filename = format!("speech.{}", params.file_extension());

        Ok(vec![
            ToolMessage::Json(metadata),
            ToolMessage::Blob {
                data: audio_content,
                mime_type: params.mime_type().to_string(),
                filename,
            },
        ])
    }
}
