// Yandex SpeechKit ツールライブラリ
// テストから各モジュールにアクセスできるようにするため

pub mod acquire;
pub mod audio;
pub mod config;
pub mod error;
pub mod models;
pub mod provider;
pub mod stt;
pub mod transcode;
pub mod tts;
