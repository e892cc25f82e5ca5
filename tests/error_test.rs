use speechkit_tools::error::{provider_error_message, ToolError};

#[cfg(test)]
mod error_tests {
    use super::*;

    /// ルール1: ネストした error オブジェクト
    #[test]
    fn test_nested_error_message() {
        let body = r#"{"error": {"message": "Quota exceeded"}}"#;
        assert_eq!(provider_error_message(body), "Quota exceeded");
    }

    /// ネストした error のコードは [code] 前置きになる
    #[test]
    fn test_nested_error_with_code() {
        let body = r#"{"error": {"code": "QUOTA", "message": "Quota exceeded"}}"#;
        assert_eq!(provider_error_message(body), "[QUOTA] Quota exceeded");

        // 数値コードも文字列化される
        let body = r#"{"error": {"code": 429, "message": "Too many requests"}}"#;
        assert_eq!(provider_error_message(body), "[429] Too many requests");
    }

    /// ルール2: フラットな message / error_code
    #[test]
    fn test_flat_message() {
        let body = r#"{"message": "Invalid API key"}"#;
        assert_eq!(provider_error_message(body), "Invalid API key");

        let body = r#"{"error_code": "UNAUTHENTICATED", "message": "Invalid API key"}"#;
        assert_eq!(
            provider_error_message(body),
            "[UNAUTHENTICATED] Invalid API key"
        );
    }

    /// ルール3: details フィールドの文字列化
    #[test]
    fn test_details_field() {
        let body = r#"{"details": [{"reason": "rate limited"}]}"#;
        assert_eq!(
            provider_error_message(body),
            r#"[{"reason":"rate limited"}]"#
        );
    }

    /// ルールは上から順に適用される（ネストが最優先）
    #[test]
    fn test_rule_precedence() {
        let body = r#"{
            "error": {"message": "nested wins"},
            "message": "flat loses",
            "details": ["ignored"]
        }"#;
        assert_eq!(provider_error_message(body), "nested wins");
    }

    /// JSONでないボディは先頭200文字をそのまま返す
    #[test]
    fn test_non_json_body() {
        assert_eq!(
            provider_error_message("<html>502 Bad Gateway</html>"),
            "<html>502 Bad Gateway</html>"
        );
        assert_eq!(provider_error_message(""), "");
    }

    /// どのルールにも一致しないJSONも生ボディ扱い
    #[test]
    fn test_unrecognized_json_shape() {
        let body = r#"{"status": "failed"}"#;
        assert_eq!(provider_error_message(body), body);
    }

    /// 生ボディは200文字で切り詰める
    #[test]
    fn test_raw_body_truncation() {
        let long_body = "x".repeat(500);
        let message = provider_error_message(&long_body);
        assert_eq!(message.chars().count(), 200);
        assert!(long_body.starts_with(&message));
    }

    /// 主要エラーの表示文字列
    #[test]
    fn test_error_display() {
        assert_eq!(
            ToolError::MissingCredential.to_string(),
            "API key is required"
        );
        assert_eq!(
            ToolError::Acquisition("no source".to_string()).to_string(),
            "Failed to read audio file - no source"
        );
        assert_eq!(
            ToolError::Format("bad header".to_string()).to_string(),
            "Failed to process WAV file: bad header"
        );
        assert_eq!(
            ToolError::Timeout.to_string(),
            "Request timeout. Please try again with shorter text."
        );
        assert_eq!(
            ToolError::Provider {
                status: 503,
                message: "busy".to_string()
            }
            .to_string(),
            "API error: 503 - busy"
        );
    }
}
