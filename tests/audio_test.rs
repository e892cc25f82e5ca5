use speechkit_tools::audio::*;
use speechkit_tools::error::ToolError;

#[cfg(test)]
mod audio_tests {
    use super::*;

    /// テスト用のWAVバイト列を生成（44バイトヘッダー + インターリーブ済みサンプル）
    fn create_wav(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let data_size = samples.len() * 2;
        let file_size = 36 + data_size;
        let block_align = channels * 2;

        let mut wav = Vec::new();
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(file_size as u32).to_le_bytes());
        wav.extend_from_slice(b"WAVE");
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
        wav.extend_from_slice(&channels.to_le_bytes());
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        wav.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        wav.extend_from_slice(&block_align.to_le_bytes());
        wav.extend_from_slice(&16u16.to_le_bytes());
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&(data_size as u32).to_le_bytes());
        for sample in samples {
            wav.extend_from_slice(&sample.to_le_bytes());
        }
        wav
    }

    /// サンプル幅を指定できるWAVヘッダー（非16-bitの拒否テスト用）
    fn create_wav_with_width(sample_rate: u32, bits_per_sample: u16, data: &[u8]) -> Vec<u8> {
        let file_size = 36 + data.len();
        let block_align = bits_per_sample / 8;

        let mut wav = Vec::new();
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(file_size as u32).to_le_bytes());
        wav.extend_from_slice(b"WAVE");
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        wav.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        wav.extend_from_slice(&block_align.to_le_bytes());
        wav.extend_from_slice(&bits_per_sample.to_le_bytes());
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&(data.len() as u32).to_le_bytes());
        wav.extend_from_slice(data);
        wav
    }

    fn to_i16_samples(bytes: &[u8]) -> Vec<i16> {
        bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }

    /// モノラル入力: PCM長は 2 × フレーム数、レートはそのまま通す
    #[test]
    fn test_parse_wav_mono() {
        let samples: Vec<i16> = (0..1000).map(|i| ((i % 100) * 300) as i16).collect();
        let wav = create_wav(44100, 1, &samples);

        let pcm = parse_wav(&wav).unwrap();

        assert_eq!(pcm.bytes.len(), 2 * samples.len());
        assert_eq!(pcm.frame_count(), samples.len());
        assert_eq!(pcm.sample_rate, 44100);
    }

    /// ステレオ入力: 0.5/0.5 の等重みダウンミックス
    #[test]
    fn test_parse_wav_stereo_downmix() {
        // (L, R) = (1000, 2000) → 1500
        let mut samples = Vec::new();
        for _ in 0..500 {
            samples.push(10000i16);
            samples.push(20000i16);
        }
        let wav = create_wav(22050, 2, &samples);

        let pcm = parse_wav(&wav).unwrap();

        assert_eq!(pcm.frame_count(), 500);
        assert_eq!(pcm.bytes.len(), 2 * 500);
        let mixed = to_i16_samples(&pcm.bytes);
        assert!(mixed.iter().all(|&s| s == 15000));
        assert_eq!(pcm.sample_rate, 22050);
    }

    /// 3チャンネル以上は明示的にエラー
    #[test]
    fn test_parse_wav_rejects_multichannel() {
        let samples = vec![0i16; 300];
        let wav = create_wav(16000, 3, &samples);

        let result = parse_wav(&wav);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("unsupported channel count: 3"));
    }

    /// 非16-bit幅は部分結果を返さず即エラー
    #[test]
    fn test_parse_wav_rejects_non_16bit() {
        let wav = create_wav_with_width(16000, 8, &[0x80; 100]);

        let result = parse_wav(&wav);
        match result {
            Err(ToolError::Format(message)) => {
                assert!(message.contains("8 bits"));
                assert!(message.contains("Only 16-bit PCM supported"));
            }
            other => panic!("予期しない結果: {:?}", other),
        }
    }

    /// WAVとして解釈できない入力はエラー
    #[test]
    fn test_parse_wav_rejects_garbage() {
        assert!(parse_wav(b"This is not an audio file").is_err());
        assert!(parse_wav(b"").is_err());

        // RIFFだがWAVEではない
        let mut bytes = b"RIFF\x24\x00\x00\x00AVI LIST".to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        assert!(parse_wav(&bytes).is_err());
    }

    /// ゲイン則: RMS 250 → ×4.0
    #[test]
    fn test_gain_quiet_signal() {
        let samples = vec![250i16; 1000];
        let wav = create_wav(16000, 1, &samples);

        let pcm = parse_wav(&wav).unwrap();
        let gained = to_i16_samples(&pcm.bytes);

        assert!(gained.iter().all(|&s| s == 1000));
    }

    /// ゲイン則: RMS 700 → ×2.0
    #[test]
    fn test_gain_medium_signal() {
        let samples = vec![700i16; 1000];
        let wav = create_wav(16000, 1, &samples);

        let pcm = parse_wav(&wav).unwrap();
        let gained = to_i16_samples(&pcm.bytes);

        assert!(gained.iter().all(|&s| s == 1400));
    }

    /// ゲイン則: RMS 1500 → 変更なし
    #[test]
    fn test_gain_loud_signal_unchanged() {
        let samples = vec![1500i16; 1000];
        let wav = create_wav(16000, 1, &samples);

        let pcm = parse_wav(&wav).unwrap();
        let gained = to_i16_samples(&pcm.bytes);

        assert!(gained.iter().all(|&s| s == 1500));
    }

    /// ゲイン適用は16-bit範囲で飽和し、ラップしない
    #[test]
    fn test_gain_saturates_at_i16_range() {
        // ほぼ無音 + 強いスパイク: RMS ≈ 948 で ×2.0 が適用される
        let mut samples = vec![0i16; 998];
        samples.push(30000);
        samples.push(-30000);
        let wav = create_wav(16000, 1, &samples);

        let pcm = parse_wav(&wav).unwrap();
        let gained = to_i16_samples(&pcm.bytes);

        assert_eq!(*gained.iter().max().unwrap(), 32767);
        assert_eq!(*gained.iter().min().unwrap(), -32768);
        assert!(gained.iter().all(|&s| (-32768..=32767).contains(&(s as i32))));
    }

    /// 無音信号はゲインをかけずに通す
    #[test]
    fn test_gain_skipped_for_silence() {
        let samples = vec![0i16; 100];
        let wav = create_wav(16000, 1, &samples);

        let pcm = parse_wav(&wav).unwrap();
        let gained = to_i16_samples(&pcm.bytes);

        assert!(gained.iter().all(|&s| s == 0));
    }

    /// rms の基本性質
    #[test]
    fn test_rms() {
        assert_eq!(rms(&[]), 0.0);
        assert_eq!(rms(&[300; 50]), 300.0);
        assert_eq!(rms(&[-300; 50]), 300.0);
        assert!((rms(&[3, 4, 0, 0]) - 2.5).abs() < 1e-9);
    }

    /// normalize_loudness はスライス単体でも使える
    #[test]
    fn test_normalize_loudness_in_place() {
        let mut quiet = vec![100i16; 200];
        normalize_loudness(&mut quiet);
        assert!(quiet.iter().all(|&s| s == 400));

        let mut empty: Vec<i16> = Vec::new();
        normalize_loudness(&mut empty);
        assert!(empty.is_empty());
    }

    /// write_wav_mono16 で書いたものは parse_wav で読み戻せる
    #[test]
    fn test_wav_roundtrip() {
        // ゲインがかからないようRMSが1000以上の信号を使う
        let samples: Vec<i16> = (0..500).map(|i| if i % 2 == 0 { 4000 } else { -4000 }).collect();

        let wav = write_wav_mono16(&samples, 16000);
        let pcm = parse_wav(&wav).unwrap();

        assert_eq!(pcm.sample_rate, 16000);
        assert_eq!(pcm.frame_count(), samples.len());

        let decoded = to_i16_samples(&pcm.bytes);
        assert_eq!(decoded, samples);
    }

    /// 先頭バイトによるコンテナ判定
    #[test]
    fn test_sniff_container() {
        let wav = create_wav(16000, 1, &[0i16; 10]);
        assert_eq!(sniff_container(&wav), Some("wav"));

        assert_eq!(sniff_container(b"ID3\x03\x00\x00\x00\x00\x00\x00\x00\x00"), Some("mp3"));
        assert_eq!(sniff_container(b"fLaC\x00\x00\x00\x22\x00\x00\x00\x00"), Some("flac"));
        assert_eq!(sniff_container(b"OggS\x00\x02\x00\x00\x00\x00\x00\x00"), Some("ogg"));
        assert_eq!(sniff_container(b"\x00\x00\x00\x20ftypM4A \x00\x00"), Some("m4a"));
        assert_eq!(sniff_container(b"\x1A\x45\xDF\xA3\x00\x00\x00\x00\x00\x00\x00\x00"), Some("webm"));
        assert_eq!(sniff_container(b"not audio data!!"), None);
        assert_eq!(sniff_container(b"short"), None);
    }
}
