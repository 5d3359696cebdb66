//! 音频播放
//!
//! DevicePlayer 通过 cpal 把 16-bit 单声道 PCM 送到输出设备。流在专用线程上创建并持有
//! （cpal::Stream 不能跨 await），异步侧只等待线程的结束信号或 CancellationToken。
//! PacedPlayer 不接设备，只按 PCM 时长推进，用于离线模式与测试。

use std::fmt::Display;
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::services::{AudioPlayer, GenerationError, PlaybackOutcome};

/// 16-bit 单声道
const BYTES_PER_SAMPLE: usize = 2;

/// 最后一个回调交出的样本仍在设备缓冲里，停流前留出的时间
const DRAIN_TAIL: Duration = Duration::from_millis(250);

fn playback_error(context: &str, err: impl Display) -> GenerationError {
    GenerationError::Playback(format!("{}: {}", context, err))
}

/// 小端 16-bit PCM 解码为 [-1.0, 1.0) 的浮点样本
pub fn decode_pcm16(audio: &[u8]) -> Result<Vec<f32>, GenerationError> {
    if audio.len() < BYTES_PER_SAMPLE {
        return Err(GenerationError::Playback("no audio samples".to_string()));
    }
    Ok(audio
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
        .collect())
}

/// 按设备采样率读取源 PCM，相邻样本间线性插值
#[derive(Debug, Clone)]
pub struct PcmSource {
    samples: Vec<f32>,
    position: f64,
    step: f64,
}

impl PcmSource {
    pub fn new(samples: Vec<f32>, source_rate: u32, device_rate: u32) -> Self {
        Self {
            samples,
            position: 0.0,
            step: source_rate.max(1) as f64 / device_rate.max(1) as f64,
        }
    }

    pub fn next_sample(&mut self) -> Option<f32> {
        let index = self.position as usize;
        let current = *self.samples.get(index)?;
        let next = self.samples.get(index + 1).copied().unwrap_or(current);
        let frac = (self.position - index as f64) as f32;
        self.position += self.step;
        Some(current + (next - current) * frac)
    }

    pub fn is_finished(&self) -> bool {
        self.position as usize >= self.samples.len()
    }
}

/// 输出线程收到的信号
#[derive(Debug)]
enum OutputSignal {
    Stop,
    Drained,
    Failed(String),
}

/// play 的 future 结束（取消或被丢弃）时通知输出线程停流
struct StopOnDrop(std_mpsc::Sender<OutputSignal>);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        let _ = self.0.send(OutputSignal::Stop);
    }
}

/// 声卡输出；`device_name` 为 None 或找不到时使用默认设备
#[derive(Debug, Clone)]
pub struct DevicePlayer {
    sample_rate: u32,
    device_name: Option<String>,
}

impl DevicePlayer {
    pub fn new(sample_rate: u32, device_name: Option<String>) -> Self {
        Self {
            sample_rate,
            device_name,
        }
    }
}

#[async_trait]
impl AudioPlayer for DevicePlayer {
    async fn play(
        &self,
        audio: &[u8],
        cancel: CancellationToken,
    ) -> Result<PlaybackOutcome, GenerationError> {
        let samples = decode_pcm16(audio)?;
        let (signal_tx, signal_rx) = std_mpsc::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let source_rate = self.sample_rate;
        let device_name = self.device_name.clone();
        let stream_tx = signal_tx.clone();

        thread::Builder::new()
            .name("zenflow-audio".to_string())
            .spawn(move || {
                let result =
                    run_output(device_name.as_deref(), samples, source_rate, stream_tx, signal_rx);
                let _ = done_tx.send(result);
            })
            .map_err(|e| playback_error("Failed to spawn audio thread", e))?;
        let _stop = StopOnDrop(signal_tx);

        tokio::select! {
            _ = cancel.cancelled() => Ok(PlaybackOutcome::Stopped),
            result = done_rx => match result {
                Ok(Ok(())) => Ok(PlaybackOutcome::Completed),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(GenerationError::Playback(
                    "audio thread exited unexpectedly".to_string(),
                )),
            },
        }
    }
}

/// 输出线程主体：打开设备、建流、等待播完 / 停止 / 流错误，最后暂停并释放流
fn run_output(
    device_name: Option<&str>,
    samples: Vec<f32>,
    source_rate: u32,
    signals: std_mpsc::Sender<OutputSignal>,
    signal_rx: std_mpsc::Receiver<OutputSignal>,
) -> Result<(), GenerationError> {
    let device = open_device(device_name)?;
    let (config, sample_format) = output_config(&device, source_rate)?;
    tracing::debug!(
        "Audio config: sample_rate={}, channels={}, format={:?}",
        config.sample_rate.0,
        config.channels,
        sample_format
    );
    let source = PcmSource::new(samples, source_rate, config.sample_rate.0);

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, source, signals)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, source, signals)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, source, signals)?,
        other => {
            return Err(GenerationError::Playback(format!(
                "Unsupported sample format: {:?}",
                other
            )))
        }
    };
    stream
        .play()
        .map_err(|e| playback_error("Failed to start stream", e))?;
    tracing::info!("Audio stream started");

    let result = match signal_rx.recv() {
        Ok(OutputSignal::Drained) => {
            thread::sleep(DRAIN_TAIL);
            Ok(())
        }
        Ok(OutputSignal::Stop) | Err(_) => Ok(()),
        Ok(OutputSignal::Failed(msg)) => Err(GenerationError::Playback(msg)),
    };

    if let Err(e) = stream.pause() {
        tracing::warn!("Failed to pause stream: {}", e);
    }
    drop(stream);
    tracing::info!("Audio stream stopped");
    result
}

fn open_device(name: Option<&str>) -> Result<Device, GenerationError> {
    let host = cpal::default_host();
    if let Some(name) = name {
        let mut devices = host
            .output_devices()
            .map_err(|e| playback_error("Failed to enumerate devices", e))?;
        if let Some(device) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
            tracing::info!("Using audio device: {}", name);
            return Ok(device);
        }
        tracing::warn!("Audio device '{}' not found, falling back to default device", name);
    }
    host.default_output_device()
        .ok_or_else(|| GenerationError::Playback("No default output device found".to_string()))
}

/// 优先选支持源采样率、声道最少的配置，避免重采样；否则用设备默认配置
fn output_config(
    device: &Device,
    source_rate: u32,
) -> Result<(StreamConfig, SampleFormat), GenerationError> {
    let supported = device
        .supported_output_configs()
        .map_err(|e| playback_error("Failed to get device configs", e))?;
    let preferred = supported
        .filter(|c| {
            c.min_sample_rate().0 <= source_rate
                && c.max_sample_rate().0 >= source_rate
                && matches!(
                    c.sample_format(),
                    SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16
                )
        })
        .min_by_key(|c| c.channels());
    if let Some(c) = preferred {
        let format = c.sample_format();
        return Ok((c.with_sample_rate(cpal::SampleRate(source_rate)).config(), format));
    }

    let default = device
        .default_output_config()
        .map_err(|e| playback_error("Failed to get default config", e))?;
    Ok((default.config(), default.sample_format()))
}

/// 单声道源复制到每个输出声道；源读完后输出静音并发出一次 Drained
fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mut source: PcmSource,
    signals: std_mpsc::Sender<OutputSignal>,
) -> Result<Stream, GenerationError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;
    let error_tx = signals.clone();
    let mut drained = false;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let value = source.next_sample().unwrap_or(0.0).clamp(-1.0, 1.0);
                    let sample = T::from_sample(value);
                    for out in frame.iter_mut() {
                        *out = sample;
                    }
                }
                if !drained && source.is_finished() {
                    drained = true;
                    let _ = signals.send(OutputSignal::Drained);
                }
            },
            move |err| {
                tracing::error!("Audio stream error: {}", err);
                let _ = error_tx.send(OutputSignal::Failed(err.to_string()));
            },
            None,
        )
        .map_err(|e| playback_error("Failed to build stream", e))
}

/// 无设备的播放：按 PCM 时长推进，可被 CancellationToken 立即打断
#[derive(Debug, Clone)]
pub struct PacedPlayer {
    sample_rate: u32,
}

impl PacedPlayer {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// PCM 缓冲的播放时长
    pub fn duration_of(&self, audio: &[u8]) -> Duration {
        let samples = (audio.len() / BYTES_PER_SAMPLE) as u64;
        Duration::from_millis(samples * 1000 / self.sample_rate.max(1) as u64)
    }
}

#[async_trait]
impl AudioPlayer for PacedPlayer {
    async fn play(
        &self,
        audio: &[u8],
        cancel: CancellationToken,
    ) -> Result<PlaybackOutcome, GenerationError> {
        decode_pcm16(audio)?;
        let duration = self.duration_of(audio);
        tracing::debug!("Paced playback started ({}ms)", duration.as_millis());
        tokio::select! {
            _ = cancel.cancelled() => Ok(PlaybackOutcome::Stopped),
            _ = tokio::time::sleep(duration) => Ok(PlaybackOutcome::Completed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_decode_pcm16_little_endian() {
        let decoded = decode_pcm16(&pcm(&[0, 16_384, -32_768])).unwrap();
        assert_eq!(decoded, vec![0.0, 0.5, -1.0]);
        // 末尾的半个样本丢弃
        assert_eq!(decode_pcm16(&[0, 0, 7]).unwrap().len(), 1);
        assert!(decode_pcm16(&[1]).is_err());
    }

    #[test]
    fn test_source_same_rate_passes_samples_through() {
        let mut source = PcmSource::new(vec![0.1, -0.2, 0.3], 24_000, 24_000);
        assert_eq!(source.next_sample(), Some(0.1));
        assert_eq!(source.next_sample(), Some(-0.2));
        assert!(!source.is_finished());
        assert_eq!(source.next_sample(), Some(0.3));
        assert!(source.is_finished());
        assert_eq!(source.next_sample(), None);
    }

    #[test]
    fn test_source_upsamples_with_interpolation() {
        let mut source = PcmSource::new(vec![0.0, 1.0], 24_000, 48_000);
        let out: Vec<f32> = std::iter::from_fn(|| source.next_sample()).collect();
        assert_eq!(out, vec![0.0, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn test_source_downsamples_by_skipping() {
        let mut source = PcmSource::new(vec![0.0, 0.25, 0.5, 0.75], 48_000, 24_000);
        let out: Vec<f32> = std::iter::from_fn(|| source.next_sample()).collect();
        assert_eq!(out, vec![0.0, 0.5]);
    }

    #[tokio::test]
    async fn test_device_player_rejects_empty_audio_before_opening_device() {
        let player = DevicePlayer::new(24_000, None);
        let err = player.play(&[], CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Playback(_)));
    }

    #[test]
    fn test_duration_of_pcm() {
        let player = PacedPlayer::new(24_000);
        assert_eq!(player.duration_of(&vec![0u8; 48_000]), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_paced_play_completes() {
        let player = PacedPlayer::new(1_000);
        let outcome = player.play(&[0u8; 20], CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::Completed);
    }

    #[tokio::test]
    async fn test_paced_play_stops_on_cancel() {
        let player = PacedPlayer::new(1);
        let token = CancellationToken::new();
        token.cancel();
        // 10 分钟的音频，取消后立即返回
        let outcome = player.play(&vec![0u8; 1_200], token).await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::Stopped);
    }

    #[tokio::test]
    async fn test_paced_play_rejects_empty_audio() {
        let player = PacedPlayer::new(24_000);
        assert!(player.play(&[], CancellationToken::new()).await.is_err());
    }
}
