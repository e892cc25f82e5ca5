use crate::audio;
use crate::error::ToolError;
use log::{debug, info};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::io::Cursor;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

// =============================================================================
// Transcoding Adapter
// - 任意のコンテナ/コーデックをデコードし、モノラル・指定レート・16-bit の
//   WAVコンテナへ詰め直す
// - デコード機能が入力を扱えない場合は部分変換を試みず即エラー
// =============================================================================

/// 任意フォーマットの音声バイト列を正規化済みWAVへ変換する
pub fn to_wav(bytes: &[u8], target_sample_rate: u32) -> Result<Vec<u8>, ToolError> {
    let (samples, source_rate) = decode_to_mono_f32(bytes)?;

    let resampled = if source_rate != target_sample_rate {
        debug!(
            "Resampling from {} Hz to {} Hz",
            source_rate, target_sample_rate
        );
        resample(samples, source_rate as f64, target_sample_rate as f64)?
    } else {
        samples
    };

    let pcm: Vec<i16> = resampled
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)
        .collect();

    info!(
        "Transcoded {} bytes to {} PCM frames at {} Hz",
        bytes.len(),
        pcm.len(),
        target_sample_rate
    );

    Ok(audio::write_wav_mono16(&pcm, target_sample_rate))
}

/// symphoniaでデコードし、チャンネル平均でモノラルf32に落とす
fn decode_to_mono_f32(bytes: &[u8]) -> Result<(Vec<f32>, u32), ToolError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = audio::sniff_container(bytes) {
        hint.with_extension(extension);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .map_err(|e| ToolError::Conversion(format!("unrecognized audio format: {}", e)))?;
    let mut format = probed.format;

    let (track_id, codec_params) = {
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| ToolError::Conversion("no audio track found".to_string()))?;

        (track.id, track.codec_params.clone())
    };

    let dec_opts: DecoderOptions = Default::default();
    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &dec_opts)
        .map_err(|e| ToolError::Conversion(format!("no decoder available: {}", e)))?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::ResetRequired) => break,
            Err(symphonia::core::errors::Error::IoError(ref err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => {
                return Err(ToolError::Conversion(format!("packet read error: {}", err)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(audio_buf) => {
                extract_samples_from_buffer(&audio_buf, &mut samples)?;
            }
            Err(symphonia::core::errors::Error::IoError(ref err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(ToolError::Conversion(format!("decode error: {}", err))),
        }
    }

    if samples.is_empty() {
        return Err(ToolError::Conversion("decoded audio is empty".to_string()));
    }

    let source_rate = decoder
        .codec_params()
        .sample_rate
        .or(codec_params.sample_rate)
        .ok_or_else(|| ToolError::Conversion("source sample rate unavailable".to_string()))?;

    Ok((samples, source_rate))
}

fn extract_samples_from_buffer(
    audio_buf: &AudioBufferRef,
    samples: &mut Vec<f32>,
) -> Result<(), ToolError> {
    match audio_buf {
        AudioBufferRef::F32(buf) => {
            let ch = buf.spec().channels.count();
            let frames = buf.frames();
            for i in 0..frames {
                let mut sum = 0.0f32;
                for c in 0..ch {
                    sum += buf.chan(c)[i];
                }
                samples.push(sum / ch as f32);
            }
        }
        AudioBufferRef::S32(buf) => {
            let ch = buf.spec().channels.count();
            let frames = buf.frames();
            for i in 0..frames {
                let mut sum = 0.0f32;
                for c in 0..ch {
                    sum += buf.chan(c)[i] as f32 / i32::MAX as f32;
                }
                samples.push(sum / ch as f32);
            }
        }
        AudioBufferRef::S16(buf) => {
            let ch = buf.spec().channels.count();
            let frames = buf.frames();
            for i in 0..frames {
                let mut sum = 0.0f32;
                for c in 0..ch {
                    sum += buf.chan(c)[i] as f32 / i16::MAX as f32;
                }
                samples.push(sum / ch as f32);
            }
        }
        _ => {
            return Err(ToolError::Conversion(
                "unsupported decoded sample format".to_string(),
            ))
        }
    }
    Ok(())
}

fn resample(samples: Vec<f32>, input_rate: f64, output_rate: f64) -> Result<Vec<f32>, ToolError> {
    if (input_rate - output_rate).abs() < 1.0 {
        return Ok(samples);
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        output_rate / input_rate,
        2.0,
        params,
        samples.len(),
        1, // モノラル
    )
    .map_err(|e| ToolError::Conversion(format!("resampler init failed: {}", e)))?;

    let input_channels = vec![samples];
    let output_channels = resampler
        .process(&input_channels, None)
        .map_err(|e| ToolError::Conversion(format!("resampling failed: {}", e)))?;

    Ok(output_channels[0].clone())
}
