use crate::error::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// =============================================================================
// Tool Result Messages
// - ホストランタイムへ返す結果の3形態（テキスト、構造化JSON、バイナリブロブ）
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ToolMessage {
    Text(String),
    Json(Value),
    Blob {
        data: Vec<u8>,
        mime_type: String,
        filename: String,
    },
}

// =============================================================================
// Credentials
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub api_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// ホストから渡される資格情報マッピングを解釈する
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, ToolError> {
        let api_key = map
            .get("api_key")
            .map(|key| key.trim())
            .filter(|key| !key.is_empty())
            .ok_or(ToolError::MissingCredential)?;

        Ok(Self {
            api_key: api_key.to_string(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.trim().is_empty()
    }
}

// =============================================================================
// PCM Buffer
// =============================================================================

/// モノラル 16-bit リトルエンディアン PCM とそのサンプリングレート
///
/// レートはWAVコンテナから取り出した値をそのまま保持する（強制リサンプルはしない）。
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub bytes: Vec<u8>,
    pub sample_rate: u32,
}

impl PcmBuffer {
    /// 16-bit フレーム数（バイト長は常に2の倍数）
    pub fn frame_count(&self) -> usize {
        self.bytes.len() / 2
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

// =============================================================================
// Recognition Result
// =============================================================================

pub const NO_SPEECH_MESSAGE: &str = "No speech detected in the audio file";

/// 認識APIの結果: 認識テキスト、または無音検出（エラーではない）
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionResult {
    Text(String),
    NoSpeech,
}

impl RecognitionResult {
    pub fn into_message(self) -> ToolMessage {
        match self {
            RecognitionResult::Text(text) => ToolMessage::Text(text),
            RecognitionResult::NoSpeech => ToolMessage::Text(NO_SPEECH_MESSAGE.to_string()),
        }
    }
}

// =============================================================================
// Synthesis Parameters
// - 検証済みの合成パラメータ。format は API 表記（mp3 / oggopus）に正規化済み
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisParameters {
    pub text: String,
    pub voice: String,
    pub emotion: String,
    pub speed: f64,
    pub format: String,
}

impl SynthesisParameters {
    /// 呼び出し側向けのフォーマット表記（oggopus は opus として返す）
    pub fn caller_format(&self) -> &str {
        if self.format == "oggopus" {
            "opus"
        } else {
            &self.format
        }
    }

    pub fn file_extension(&self) -> &str {
        if self.format == "oggopus" {
            "ogg"
        } else {
            &self.format
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self.format.as_str() {
            "mp3" => "audio/mpeg",
            "oggopus" => "audio/ogg",
            _ => "application/octet-stream",
        }
    }

    /// 速度の文字列表記（API は "1.0" のような小数点付き表記を期待する）
    pub fn speed_string(&self) -> String {
        // Display では 1.0 が "1" になるため Debug 表記を使う
        format!("{:?}", self.speed)
    }
}

// =============================================================================
// Voice Catalog
// - SpeechKit v1 の音声と感情の対応表
// =============================================================================

pub const EMOTIONS: &[&str] = &["neutral", "good", "evil", "friendly", "whisper"];

pub const NEUTRAL_ONLY: &[&str] = &["neutral"];

pub fn voice_description(voice: &str) -> Option<&'static str> {
    match voice {
        "marina" => Some("Марина - женский голос (по умолчанию)"),
        "alena" => Some("Алёна - женский голос"),
        "filipp" => Some("Филипп - мужской голос"),
        "jane" => Some("Джейн - женский голос"),
        "omazh" => Some("Омаж - мужской голос"),
        "ermil" => Some("Ермил - мужской голос"),
        "zahar" => Some("Захар - мужской голос"),
        "madi_ru" => Some("Мади - мужской голос (рус.)"),
        _ => None,
    }
}

/// 音声ごとに許可される感情（アルファベット順で保持）
pub fn allowed_emotions(voice: &str) -> Option<&'static [&'static str]> {
    match voice {
        "marina" => Some(&["friendly", "neutral", "whisper"]),
        "alena" => Some(&["good", "neutral"]),
        "filipp" => Some(NEUTRAL_ONLY),
        "jane" => Some(&["evil", "good", "neutral"]),
        "omazh" => Some(&["evil", "neutral"]),
        "ermil" => Some(&["good", "neutral"]),
        "zahar" => Some(&["good", "neutral"]),
        "madi_ru" => Some(NEUTRAL_ONLY),
        _ => None,
    }
}
