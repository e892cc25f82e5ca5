use speechkit_tools::acquire::AudioReference;
use speechkit_tools::config::Config;
use speechkit_tools::models::{Credentials, ToolMessage};
use speechkit_tools::provider::SpeechkitProvider;
use speechkit_tools::stt::{SpeechToTextParameters, SpeechToTextTool};
use speechkit_tools::tts::{TextToSpeechParameters, TextToSpeechTool};
use std::fs;

fn main() -> anyhow::Result<()> {
    // ログの初期化
    env_logger::init();

    // 設定ファイルの読み込みと検証
    let config = Config::load_or_create_default("config.toml")?;
    config.validate()?;

    let api_key = std::env::var("SPEECHKIT_API_KEY").unwrap_or_default();
    let credentials = Credentials::new(api_key);

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("recognize") => {
            let path = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("音声ファイルのパスを指定してください"))?;

            let tool = SpeechToTextTool::new(&config, &credentials);
            let parameters = SpeechToTextParameters::new(AudioReference::FilePath(path.clone()));
            let messages = tool.invoke(parameters, None)?;
            print_messages(&messages)?;
        }
        Some("synthesize") => {
            let text = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("合成するテキストを指定してください"))?;

            let tool = TextToSpeechTool::new(&config, &credentials);
            let parameters = TextToSpeechParameters {
                text: text.clone(),
                ..Default::default()
            };
            let messages = tool.invoke(&parameters)?;
            print_messages(&messages)?;
        }
        Some("validate") => {
            let provider = SpeechkitProvider::new(&config);
            provider
                .validate_credentials(&credentials)
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            println!("資格情報は有効です");
        }
        _ => {
            println!("Yandex SpeechKit ツール");
            println!();
            println!("使用例:");
            println!("  SPEECHKIT_API_KEY=... speechkit-tools recognize audio.wav");
            println!("  SPEECHKIT_API_KEY=... speechkit-tools synthesize \"привет\"");
            println!("  SPEECHKIT_API_KEY=... speechkit-tools validate");
        }
    }

    Ok(())
}

fn print_messages(messages: &[ToolMessage]) -> anyhow::Result<()> {
    for message in messages {
        match message {
            ToolMessage::Text(text) => println!("{}", text),
            ToolMessage::Json(value) => println!("{}", serde_json::to_string_pretty(value)?),
            ToolMessage::Blob {
                data,
                mime_type,
                filename,
            } => {
                fs::write(filename, data)?;
                println!("{} を書き出しました ({}, {} bytes)", filename, mime_type, data.len());
            }
        }
    }
    Ok(())
}
