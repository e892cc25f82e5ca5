use serde_json::Value;
use thiserror::Error;

/// ツール全体のエラー分類
///
/// 取得・変換・検証・通信の各段階で発生するエラーを一つの型にまとめ、
/// ツール境界でそのまま最終結果として呼び出し側へ返す。内部でのリトライは行わない。
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("API key is required")]
    MissingCredential,

    #[error("Parameter error: {0}")]
    Parameter(String),

    #[error("Failed to read audio file - {0}")]
    Acquisition(String),

    #[error("Failed to process WAV file: {0}")]
    Format(String),

    #[error("Failed to convert audio: {0}")]
    Conversion(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout. Please try again with shorter text.")]
    Timeout,

    #[error("API error: {status} - {message}")]
    Provider { status: u16, message: String },
}

/// reqwestのエラーをタイムアウトとその他の通信エラーに振り分ける
pub(crate) fn map_request_error(err: reqwest::Error) -> ToolError {
    if err.is_timeout() {
        ToolError::Timeout
    } else {
        ToolError::Network(err.to_string())
    }
}

// =============================================================================
// Provider Error Body Parsing
// - SpeechKit のエラーボディは複数の形を取る（ネストした error オブジェクト、
//   フラットな message/error_code、details 配列）。抽出ルールを順に適用し、
//   どれにも当てはまらなければ生ボディを切り詰めて使う。
// =============================================================================

const RAW_BODY_LIMIT: usize = 200;

struct ExtractedError {
    code: Option<String>,
    message: String,
}

impl ExtractedError {
    fn format(&self) -> String {
        match &self.code {
            Some(code) => format!("[{}] {}", code, self.message),
            None => self.message.clone(),
        }
    }
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match value.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// ルール1: ネストした `{"error": {"message": ..., "code": ...}}`
fn rule_nested_error(value: &Value) -> Option<ExtractedError> {
    let nested = value.get("error")?;
    if !nested.is_object() {
        return None;
    }
    let message = string_field(nested, &["message", "error_message"])?;
    Some(ExtractedError {
        code: string_field(nested, &["code", "error_code"]),
        message,
    })
}

/// ルール2: フラットな `{"message": ..., "error_code": ...}`
fn rule_flat(value: &Value) -> Option<ExtractedError> {
    let message = string_field(value, &["message", "error_message"])?;
    Some(ExtractedError {
        code: string_field(value, &["error_code", "code"]),
        message,
    })
}

/// ルール3: `details` フィールドの文字列化
fn rule_details(value: &Value) -> Option<ExtractedError> {
    let details = value.get("details")?;
    if !(details.is_array() || details.is_object()) {
        return None;
    }
    Some(ExtractedError {
        code: None,
        message: truncate(&details.to_string()),
    })
}

const EXTRACTION_RULES: &[fn(&Value) -> Option<ExtractedError>] =
    &[rule_nested_error, rule_flat, rule_details];

fn truncate(text: &str) -> String {
    text.chars().take(RAW_BODY_LIMIT).collect()
}

/// エラーボディからユーザー向けメッセージを抽出する
///
/// JSONとして解釈できない場合、どのルールにも一致しない場合は
/// 生ボディの先頭200文字を返す。
pub fn provider_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for rule in EXTRACTION_RULES {
            if let Some(extracted) = rule(&value) {
                return extracted.format();
            }
        }
    }
    truncate(body)
}
