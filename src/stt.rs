use crate::acquire::{acquire, AudioReference, FileLookup};
use crate::audio;
use crate::config::Config;
use crate::error::{map_request_error, provider_error_message, ToolError};
use crate::models::{Credentials, PcmBuffer, RecognitionResult, ToolMessage};
use crate::transcode;
use log::{error, info};
use serde::Deserialize;
use std::time::Duration;

// =============================================================================
// Speech-to-Text Tool
// - 取得 → 正規化（直接パース、失敗時はトランスコードして再パース）→ 認識API
// - 1回の呼び出しにつき1回の同期ラウンドトリップ。内部リトライなし
// =============================================================================

pub struct SpeechToTextParameters {
    pub audio: AudioReference,
    pub language: String,
    pub topic: String,
}

impl SpeechToTextParameters {
    pub fn new(audio: AudioReference) -> Self {
        Self {
            audio,
            language: "ru-RU".to_string(),
            topic: "general".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecognitionResponse {
    #[serde(default)]
    result: String,
}

pub struct SpeechToTextTool<'a> {
    config: &'a Config,
    credentials: &'a Credentials,
}

impl<'a> SpeechToTextTool<'a> {
    pub fn new(config: &'a Config, credentials: &'a Credentials) -> Self {
        Self {
            config,
            credentials,
        }
    }

    /// 音声参照を解決し、正規化済みPCMを認識APIへ送って結果メッセージを返す
    pub fn invoke(
        &self,
        parameters: SpeechToTextParameters,
        lookup: Option<&dyn FileLookup>,
    ) -> Result<Vec<ToolMessage>, ToolError> {
        if self.credentials.is_empty() {
            return Err(ToolError::MissingCredential);
        }

        let audio_bytes = acquire(parameters.audio, lookup)?;
        if audio_bytes.is_empty() {
            return Err(ToolError::Acquisition(
                "acquired audio is empty".to_string(),
            ));
        }
        if audio_bytes.len() > self.config.max_file_size_bytes() {
            return Err(ToolError::Parameter(format!(
                "Audio file is too large: {}MB > {}MB",
                audio_bytes.len() / (1024 * 1024),
                self.config.limits.max_file_size_mb
            )));
        }

        info!("Processing audio file, size: {} bytes", audio_bytes.len());

        let pcm = normalize_audio(&audio_bytes, self.config.audio.target_sample_rate)?;
        let result = self.recognize(pcm, &parameters.language, &parameters.topic)?;

        Ok(vec![result.into_message()])
    }

    /// 認識エンドポイントへのPOSTとレスポンスの解釈
    fn recognize(
        &self,
        pcm: PcmBuffer,
        language: &str,
        topic: &str,
    ) -> Result<RecognitionResult, ToolError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.config.api.timeout_seconds))
            .build()
            .map_err(|e| ToolError::Network(e.to_string()))?;

        let sample_rate = pcm.sample_rate.to_string();
        info!(
            "Making API request: lang={}, topic={}, sampleRateHertz={}",
            language, topic, sample_rate
        );

        let response = client
            .post(&self.config.api.stt_url)
            .header(
                "Authorization",
                format!("Api-Key {}", self.credentials.api_key),
            )
            .query(&[
                ("lang", language),
                ("format", "lpcm"),
                ("topic", topic),
                ("sampleRateHertz", sample_rate.as_str()),
            ])
            .body(pcm.bytes)
            .send()
            .map_err(map_request_error)?;

        let status = response.status();
        info!("API response status: {}", status);

        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let message = provider_error_message(&body);
            error!("API error: {} - {}", status.as_u16(), message);
            return Err(ToolError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let payload: RecognitionResponse = response
            .json()
            .map_err(|e| ToolError::Network(format!("invalid response body: {}", e)))?;

        if payload.result.is_empty() {
            info!("Recognition finished without detecting speech");
            Ok(RecognitionResult::NoSpeech)
        } else {
            info!(
                "Recognition successful: {}...",
                payload.result.chars().take(100).collect::<String>()
            );
            Ok(RecognitionResult::Text(payload.result))
        }
    }
}

/// 2段階の正規化
///
/// まずWAVとして直接パースを試み、既に適合している入力にトランスコード費用を
/// かけない。失敗した場合のみトランスコードしてから再パースする。2回目の
/// パース結果が正で、その失敗は致命的（そのまま伝播）。
pub fn normalize_audio(bytes: &[u8], target_sample_rate: u32) -> Result<PcmBuffer, ToolError> {
    match audio::parse_wav(bytes) {
        Ok(pcm) => {
            info!("Audio processed as WAV directly");
            Ok(pcm)
        }
        Err(parse_err) => {
            info!(
                "Direct WAV parse failed ({}), converting audio to WAV format",
                parse_err
            );
            let wav = transcode::to_wav(bytes, target_sample_rate)?;
            let pcm = audio::parse_wav(&wav)?;
            info!("Audio converted and processed successfully");
            Ok(pcm)
        }
    }
}
