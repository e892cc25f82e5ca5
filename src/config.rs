use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub audio: AudioConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub stt_url: String,
    pub tts_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub target_sample_rate: u32,
    pub channels: u16,
    pub supported_formats: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_file_size_mb: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                stt_url: "https://stt.api.cloud.yandex.net/speech/v1/stt:recognize".to_string(),
                tts_url: "https://tts.api.cloud.yandex.net/speech/v1/tts:synthesize".to_string(),
                timeout_seconds: 30,
            },
            audio: AudioConfig {
                target_sample_rate: 16000,
                channels: 1,
                supported_formats: vec![
                    "mp3".to_string(),
                    "wav".to_string(),
                    "flac".to_string(),
                    "ogg".to_string(),
                    "opus".to_string(),
                    "m4a".to_string(),
                    "webm".to_string(),
                    "aac".to_string(),
                    "wma".to_string(),
                ],
            },
            limits: LimitsConfig {
                max_file_size_mb: 50,
            },
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn load_or_create_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            match Self::load_from_file(&path) {
                Ok(config) => Ok(config),
                Err(e) => {
                    eprintln!("設定ファイルの読み込みに失敗しました: {}. デフォルト設定を使用します。", e);
                    let config = Self::default();
                    config.save_to_file(&path)?;
                    Ok(config)
                }
            }
        } else {
            let config = Self::default();
            config.save_to_file(&path)?;
            println!("デフォルト設定ファイルを作成しました: {}", path.as_ref().display());
            Ok(config)
        }
    }

    pub fn validate(&self) -> Result<()> {
        // エンドポイントの検証
        for (name, url) in [("stt_url", &self.api.stt_url), ("tts_url", &self.api.tts_url)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(anyhow::anyhow!("無効なエンドポイントURL ({}): {}", name, url));
            }
        }

        if self.api.timeout_seconds == 0 {
            return Err(anyhow::anyhow!("タイムアウト秒数は1以上である必要があります"));
        }

        if self.audio.target_sample_rate == 0 {
            return Err(anyhow::anyhow!("サンプリングレートは1以上である必要があります"));
        }

        if self.audio.channels != 1 {
            return Err(anyhow::anyhow!(
                "認識APIへ送るPCMはモノラル固定です (channels = {})",
                self.audio.channels
            ));
        }

        if self.limits.max_file_size_mb == 0 {
            return Err(anyhow::anyhow!("最大ファイルサイズは1MB以上である必要があります"));
        }

        Ok(())
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.limits.max_file_size_mb * 1024 * 1024
    }
}
