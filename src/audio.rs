use crate::error::ToolError;
use crate::models::PcmBuffer;
use log::{debug, info};

// =============================================================================
// WAV Parsing & PCM Extraction
// - 16-bit PCM のみ対応（それ以外のビット幅は即エラー）
// - ステレオは 0.5/0.5 の等重みでモノラルへダウンミックス
// - 3チャンネル以上は未対応として明示的にエラー
// =============================================================================

const WAVE_FORMAT_PCM: u16 = 1;

#[derive(Debug)]
struct FmtChunk {
    audio_format: u16,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

/// WAVコンテナを解析してモノラル16-bit PCMとサンプリングレートを取り出す
///
/// 静かな録音への対策として、取り出した信号にRMSベースのゲイン正規化をかける。
pub fn parse_wav(bytes: &[u8]) -> Result<PcmBuffer, ToolError> {
    let (fmt, data) = split_wav_chunks(bytes)?;

    if fmt.audio_format != WAVE_FORMAT_PCM {
        return Err(ToolError::Format(format!(
            "unsupported WAV encoding: {}",
            fmt.audio_format
        )));
    }

    if fmt.bits_per_sample != 16 {
        return Err(ToolError::Format(format!(
            "Unsupported WAV sample width: {} bits. Only 16-bit PCM supported",
            fmt.bits_per_sample
        )));
    }

    let samples = decode_samples(data)?;
    let mut mono = downmix_to_mono(samples, fmt.channels)?;
    normalize_loudness(&mut mono);

    Ok(PcmBuffer {
        bytes: encode_samples(&mono),
        sample_rate: fmt.sample_rate,
    })
}

/// RIFF/WAVE のチャンク列を歩いて fmt と data を取り出す
fn split_wav_chunks(bytes: &[u8]) -> Result<(FmtChunk, &[u8]), ToolError> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(ToolError::Format("not a RIFF/WAVE container".to_string()));
    }

    let mut fmt: Option<FmtChunk> = None;
    let mut data: Option<&[u8]> = None;
    let mut pos = 12usize;

    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let size = u32::from_le_bytes([bytes[pos + 4], bytes[pos + 5], bytes[pos + 6], bytes[pos + 7]])
            as usize;
        let body_start = pos + 8;
        let body_end = body_start
            .checked_add(size)
            .filter(|end| *end <= bytes.len())
            .ok_or_else(|| {
                ToolError::Format(format!(
                    "truncated '{}' chunk",
                    String::from_utf8_lossy(id).trim_end()
                ))
            })?;

        match id {
            b"fmt " => {
                if size < 16 {
                    return Err(ToolError::Format("fmt chunk is too short".to_string()));
                }
                let body = &bytes[body_start..body_end];
                fmt = Some(FmtChunk {
                    audio_format: u16::from_le_bytes([body[0], body[1]]),
                    channels: u16::from_le_bytes([body[2], body[3]]),
                    sample_rate: u32::from_le_bytes([body[4], body[5], body[6], body[7]]),
                    bits_per_sample: u16::from_le_bytes([body[14], body[15]]),
                });
            }
            b"data" => {
                data = Some(&bytes[body_start..body_end]);
            }
            _ => {}
        }

        // チャンクは2バイト境界にパディングされる
        pos = body_end + (size & 1);
    }

    let fmt = fmt.ok_or_else(|| ToolError::Format("missing fmt chunk".to_string()))?;
    let data = data.ok_or_else(|| ToolError::Format("missing data chunk".to_string()))?;
    Ok((fmt, data))
}

fn decode_samples(data: &[u8]) -> Result<Vec<i16>, ToolError> {
    if data.len() % 2 != 0 {
        return Err(ToolError::Format(
            "sample data is not aligned to 16-bit frames".to_string(),
        ));
    }

    Ok(data
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

fn encode_samples(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

fn downmix_to_mono(samples: Vec<i16>, channels: u16) -> Result<Vec<i16>, ToolError> {
    match channels {
        1 => Ok(samples),
        2 => {
            if samples.len() % 2 != 0 {
                return Err(ToolError::Format(
                    "stereo sample data is not aligned to frames".to_string(),
                ));
            }
            Ok(samples
                .chunks_exact(2)
                .map(|frame| ((frame[0] as i32 + frame[1] as i32) / 2) as i16)
                .collect())
        }
        other => Err(ToolError::Format(format!(
            "unsupported channel count: {} (mix down to mono or stereo first)",
            other
        ))),
    }
}

// =============================================================================
// Loudness Normalization
// - 静かな録音は認識精度を大きく下げるため、RMSに応じた固定ゲインをかける
// - ゲイン適用は16-bit範囲で飽和させる（ラップはさせない）
// =============================================================================

pub fn rms(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt()
}

/// RMSゲイン則: rms < 300 → ×4.0、rms < 1000 → ×2.0、それ以外は変更なし
///
/// 無音（RMS 0）や空の信号にはゲインをかけずそのまま通す。
pub fn normalize_loudness(samples: &mut [i16]) {
    let rms_value = rms(samples);
    if rms_value == 0.0 {
        debug!("Skipping gain normalization for silent/empty signal");
        return;
    }

    let gain = if rms_value < 300.0 {
        4.0
    } else if rms_value < 1000.0 {
        2.0
    } else {
        1.0
    };

    if gain != 1.0 {
        for sample in samples.iter_mut() {
            let amplified = (*sample as f64) * gain;
            *sample = amplified.clamp(i16::MIN as f64, i16::MAX as f64) as i16;
        }
        info!("Applied gain x{}, previous RMS={:.0}", gain, rms_value);
    }
}

// =============================================================================
// WAV Encoding
// =============================================================================

/// モノラル16-bit PCMを44バイトヘッダーのWAVコンテナに詰める
pub fn write_wav_mono16(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    let data_size = samples.len() * 2;
    let file_size = 36 + data_size;

    let mut wav = Vec::with_capacity(44 + data_size);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(file_size as u32).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // モノラル
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&(sample_rate * 2).to_le_bytes()); // byte rate
    wav.extend_from_slice(&2u16.to_le_bytes()); // block align
    wav.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&(data_size as u32).to_le_bytes());
    for sample in samples {
        wav.extend_from_slice(&sample.to_le_bytes());
    }
    wav
}

// =============================================================================
// Container Sniffing
// =============================================================================

/// 先頭バイトから音声コンテナの種類を推測する（デコーダへのヒント用）
pub fn sniff_container(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 12 {
        return None;
    }

    if &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
        Some("wav")
    } else if &bytes[0..3] == b"ID3" || bytes[0..2] == [0xFF, 0xFB] {
        Some("mp3")
    } else if &bytes[4..8] == b"ftyp" {
        Some("m4a")
    } else if &bytes[0..4] == b"fLaC" {
        Some("flac")
    } else if &bytes[0..4] == b"OggS" {
        Some("ogg")
    } else if bytes[0..4] == [0x1A, 0x45, 0xDF, 0xA3] {
        Some("webm")
    } else {
        None
    }
}
