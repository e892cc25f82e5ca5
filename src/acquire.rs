use crate::error::ToolError;
use log::{info, warn};
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::time::Duration;

// =============================================================================
// Audio Acquisition
// - 多様な参照形態（生バイト、ストリーム、パス、リモート参照、管理ファイル）から
//   音声バイト列を取り出す
// - 戦略は定義順に一度ずつ試し、最初に成功したものを採用する
// - 戦略内部の失敗はログに残して次へ進み、全滅した場合のみエラー
// =============================================================================

const FETCH_TIMEOUT_SECS: u64 = 30;

/// ホストランタイムが提供するファイルID解決機能
pub trait FileLookup {
    fn fetch(&self, file_id: &str) -> anyhow::Result<LookupResult>;
}

/// download() や ID 解決が返す値
pub enum LookupResult {
    Bytes(Vec<u8>),
    File(ManagedFile),
}

type DownloadFn = Box<dyn FnOnce() -> anyhow::Result<LookupResult> + Send>;

/// ホストのファイルオブジェクト
///
/// 各フィールドは任意で、存在する能力だけが解決戦略の対象になる。
#[derive(Default)]
pub struct ManagedFile {
    pub download: Option<DownloadFn>,
    pub blob: Option<Vec<u8>>,
    pub reader: Option<Box<dyn Read + Send>>,
    pub content: Option<Vec<u8>>,
    pub data: Option<Vec<u8>>,
    pub remote_url: Option<String>,
    pub file_id: Option<String>,
}

impl ManagedFile {
    /// メタデータマッピングを縮退した ManagedFile として解釈する
    ///
    /// ID は `related_id` / `id`、URL は `remote_url` / `url` の順で読む。
    pub fn from_metadata(map: &HashMap<String, String>) -> Self {
        let file_id = map
            .get("related_id")
            .or_else(|| map.get("id"))
            .filter(|value| !value.is_empty())
            .cloned();
        let remote_url = map
            .get("remote_url")
            .or_else(|| map.get("url"))
            .filter(|value| !value.is_empty())
            .cloned();

        Self {
            file_id,
            remote_url,
            ..Default::default()
        }
    }
}

/// 入力音声への多態的な参照
pub enum AudioReference {
    RawBytes(Vec<u8>),
    Stream(Box<dyn Read + Send>),
    FilePath(String),
    RemoteMetadata(HashMap<String, String>),
    ManagedFile(ManagedFile),
}

/// 参照から音声バイト列を取得する
///
/// 参照ごとに成功する戦略はちょうど一つで、バイト列が得られた時点で参照は破棄される。
pub fn acquire(
    reference: AudioReference,
    lookup: Option<&dyn FileLookup>,
) -> Result<Vec<u8>, ToolError> {
    match reference {
        AudioReference::RawBytes(bytes) => {
            info!("Processing raw bytes data ({} bytes)", bytes.len());
            Ok(bytes)
        }
        AudioReference::Stream(mut reader) => {
            // ストリームは一回しか読めない
            let mut buffer = Vec::new();
            reader
                .read_to_end(&mut buffer)
                .map_err(|e| ToolError::Acquisition(format!("could not drain stream: {}", e)))?;
            info!("Read stream content, size: {} bytes", buffer.len());
            Ok(buffer)
        }
        AudioReference::FilePath(path) => {
            info!("Processing file path: {}", path);
            fs::read(&path)
                .map_err(|e| ToolError::Acquisition(format!("could not open {}: {}", path, e)))
        }
        AudioReference::RemoteMetadata(map) => {
            info!("Processing file metadata mapping: {:?}", map);
            resolve_managed(ManagedFile::from_metadata(&map), lookup)
        }
        AudioReference::ManagedFile(file) => resolve_managed(file, lookup),
    }
}

/// ManagedFile の能力を定義順に試す
fn resolve_managed(
    mut file: ManagedFile,
    lookup: Option<&dyn FileLookup>,
) -> Result<Vec<u8>, ToolError> {
    // 1. download 能力
    if let Some(download) = file.download.take() {
        match download() {
            Ok(LookupResult::Bytes(bytes)) => return Ok(bytes),
            Ok(LookupResult::File(object)) => {
                if let Some(content) = object.content {
                    return Ok(content);
                }
                warn!("download() returned an object without a content attribute");
            }
            Err(err) => warn!("download() failed: {}", err),
        }
    }

    // 2. キャッシュ済みブロブ
    if let Some(blob) = file.blob.take() {
        return Ok(blob);
    }

    // 3. 汎用の read（一回読み切り）
    if let Some(mut reader) = file.reader.take() {
        let mut buffer = Vec::new();
        match reader.read_to_end(&mut buffer) {
            Ok(_) => return Ok(buffer),
            Err(err) => warn!("read() failed: {}", err),
        }
    }

    // 4. 生の content / data 属性
    if let Some(content) = file.content.take() {
        return Ok(content);
    }
    if let Some(data) = file.data.take() {
        return Ok(data);
    }

    // 5. 絶対URLからの取得（失敗しても次の戦略へ）
    if let Some(url) = file.remote_url.as_deref() {
        if is_absolute_http_url(url) {
            info!("Fetching file via absolute URL: {}", url);
            match fetch_url(url) {
                Ok(bytes) => return Ok(bytes),
                Err(err) => warn!("Failed to fetch via absolute URL: {}", err),
            }
        }
    }

    // 6. ファイルIDをホスト側の解決機能へ委譲
    if let (Some(file_id), Some(lookup)) = (file.file_id.as_deref(), lookup) {
        match lookup.fetch(file_id) {
            Ok(LookupResult::Bytes(bytes)) => return Ok(bytes),
            Ok(LookupResult::File(object)) => match unwrap_fetched(object) {
                Some(bytes) => return Ok(bytes),
                None => warn!("file lookup returned an object without usable content"),
            },
            Err(err) => warn!("Failed to fetch via file id: {}", err),
        }
    }

    Err(ToolError::Acquisition(
        "no download/blob/read/content/data available, no absolute URL, \
         and file lookup by id is not supported in this runtime"
            .to_string(),
    ))
}

/// ID解決が返したオブジェクトから blob / content / download の順でバイト列を取り出す
fn unwrap_fetched(mut object: ManagedFile) -> Option<Vec<u8>> {
    if let Some(blob) = object.blob.take() {
        return Some(blob);
    }
    if let Some(content) = object.content.take() {
        return Some(content);
    }
    if let Some(download) = object.download.take() {
        match download() {
            Ok(LookupResult::Bytes(bytes)) => return Some(bytes),
            Ok(LookupResult::File(inner)) => return inner.content,
            Err(err) => warn!("nested download() failed: {}", err),
        }
    }
    None
}

fn is_absolute_http_url(url: &str) -> bool {
    let lowered = url.to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}

fn fetch_url(url: &str) -> Result<Vec<u8>, ToolError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .build()
        .map_err(|e| ToolError::Network(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .map_err(|e| ToolError::Network(e.to_string()))?;

    let bytes = response
        .bytes()
        .map_err(|e| ToolError::Network(e.to_string()))?;

    Ok(bytes.to_vec())
}
