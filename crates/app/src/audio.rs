//! Default-input microphone via cpal, delivered as a single WAV file.

use std::io::Cursor;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use tracing::{debug, info, warn};

use quest_core::model::Encoding;
use services::{CaptureBackend, CaptureError, CaptureStream};

/// Records the host's default input device.
///
/// cpal hands back raw PCM, so the only encoding offered is WAV. The file is
/// assembled when the recording finishes.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalCaptureBackend;

#[async_trait]
impl CaptureBackend for CpalCaptureBackend {
    fn name(&self) -> &str {
        "cpal"
    }

    fn supports(&self, encoding: Encoding) -> bool {
        encoding == Encoding::Wav
    }

    async fn open(&self, encoding: Encoding) -> Result<Box<dyn CaptureStream>, CaptureError> {
        if encoding != Encoding::Wav {
            return Err(CaptureError::Unsupported(encoding));
        }
        let stream = tokio::task::spawn_blocking(CpalStream::start)
            .await
            .map_err(|err| CaptureError::Device(err.to_string()))??;
        Ok(Box::new(stream))
    }
}

/// A running input stream.
///
/// `cpal::Stream` is not `Send` on every host, so it lives on its own thread
/// and is dropped there when `stop` fires or its sender goes away.
struct CpalStream {
    samples: Arc<Mutex<Vec<f32>>>,
    sample_rate: u32,
    stop: Option<mpsc::Sender<()>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl CpalStream {
    fn start() -> Result<Self, CaptureError> {
        let samples = Arc::new(Mutex::new(Vec::new()));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, CaptureError>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let buffer = Arc::clone(&samples);

        let worker = thread::Builder::new()
            .name("quest-mic".into())
            .spawn(move || {
                let stream = match open_default_input(buffer) {
                    Ok((stream, rate)) => {
                        let _ = ready_tx.send(Ok(rate));
                        stream
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                let _ = stop_rx.recv();
                drop(stream);
                debug!("input stream closed");
            })
            .map_err(|err| CaptureError::Device(err.to_string()))?;

        let sample_rate = ready_rx
            .recv()
            .map_err(|_| CaptureError::Device("capture thread exited".into()))??;

        Ok(Self {
            samples,
            sample_rate,
            stop: Some(stop_tx),
            worker: Some(worker),
        })
    }

    fn drain(&self) -> Vec<f32> {
        match self.samples.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

#[async_trait]
impl CaptureStream for CpalStream {
    fn take_fragments(&mut self) -> Vec<Vec<u8>> {
        // A WAV header needs the final length, so nothing is emitted early.
        Vec::new()
    }

    async fn finish(&mut self) -> Result<Vec<Vec<u8>>, CaptureError> {
        self.release();
        let samples = self.drain();
        let wav = encode_wav(&samples, self.sample_rate)
            .map_err(|err| CaptureError::Device(err.to_string()))?;
        debug!(samples = samples.len(), bytes = wav.len(), "wav assembled");
        Ok(vec![wav])
    }

    fn release(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("capture thread panicked");
            }
        }
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        self.release();
    }
}

fn open_default_input(
    buffer: Arc<Mutex<Vec<f32>>>,
) -> Result<(cpal::Stream, u32), CaptureError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;
    let device_name = device.name().unwrap_or_else(|_| "<unknown>".into());
    let supported = device
        .default_input_config()
        .map_err(|err| classify(&err.to_string()))?;
    let channels = supported.channels();
    let sample_rate = supported.sample_rate().0;
    let config: cpal::StreamConfig = supported.config();

    let stream = match supported.sample_format() {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, channels, buffer),
        SampleFormat::I16 => build_stream::<i16>(&device, &config, channels, buffer),
        SampleFormat::U16 => build_stream::<u16>(&device, &config, channels, buffer),
        other => {
            return Err(CaptureError::Device(format!(
                "unsupported sample format {other}"
            )));
        }
    }
    .map_err(|err| match err {
        cpal::BuildStreamError::DeviceNotAvailable => CaptureError::NoDevice,
        other => classify(&other.to_string()),
    })?;
    stream.play().map_err(|err| classify(&err.to_string()))?;

    info!(device = %device_name, sample_rate, channels, "microphone open");
    Ok((stream, sample_rate))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: u16,
    buffer: Arc<Mutex<Vec<f32>>>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let converted: Vec<f32> = data.iter().map(|s| s.to_sample::<f32>()).collect();
            let mono = downmix_to_mono(&converted, channels);
            if let Ok(mut samples) = buffer.lock() {
                samples.extend_from_slice(&mono);
            }
        },
        |err| warn!(%err, "input stream error"),
        None,
    )
}

/// Average interleaved frames down to one channel.
fn downmix_to_mono(data: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    let width = usize::from(channels);
    data.chunks_exact(width)
        .map(|frame| frame.iter().sum::<f32>() / f32::from(channels))
        .collect()
}

/// Hosts report refused microphone access as a backend string.
fn classify(message: &str) -> CaptureError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized")
    {
        CaptureError::PermissionDenied
    } else {
        CaptureError::Device(message.to_string())
    }
}

/// 16-bit mono PCM.
fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            let pcm = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(pcm)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_has_header_and_pcm_body() {
        let samples = vec![0.0_f32; 100];
        let wav = encode_wav(&samples, 16_000).unwrap();
        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(wav.len(), 44 + 200);

        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, 16_000);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.len(), 100);
    }

    #[test]
    fn loud_samples_are_clamped() {
        let wav = encode_wav(&[2.0, -2.0, 0.5], 8_000).unwrap();
        let mut reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        let pcm: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(pcm, vec![32767, -32768, 16383]);
    }

    #[test]
    fn stereo_is_averaged() {
        assert_eq!(downmix_to_mono(&[1.0, 0.0, 0.5, 0.5], 2), vec![0.5, 0.5]);
        assert_eq!(downmix_to_mono(&[0.25, 0.75], 1), vec![0.25, 0.75]);
    }

    #[test]
    fn refused_access_maps_to_permission_denied() {
        assert!(matches!(
            classify("The user denied microphone access"),
            CaptureError::PermissionDenied
        ));
        assert!(matches!(
            classify("A backend-specific error has occurred: timeout"),
            CaptureError::Device(_)
        ));
    }

    #[test]
    fn only_wav_is_offered() {
        let backend = CpalCaptureBackend;
        assert!(backend.supports(Encoding::Wav));
        assert!(!backend.supports(Encoding::Webm));
    }
}
