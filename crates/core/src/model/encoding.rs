use serde::{Deserialize, Serialize};
use std::fmt;

/// Recording encoding negotiated once per capture.
///
/// The same value travels from the capture backend through validation to the
/// upload, where it names the file part and its content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    /// Opus frames in a WebM container.
    WebmOpus,
    /// WebM container, codec left to the recorder.
    Webm,
    /// MP4/AAC container.
    Mp4,
    /// 16-bit PCM in a RIFF/WAVE container.
    Wav,
}

/// Capture preference order, most compact first.
pub const DEFAULT_ENCODING_PRIORITY: [Encoding; 4] = [
    Encoding::WebmOpus,
    Encoding::Webm,
    Encoding::Mp4,
    Encoding::Wav,
];

impl Encoding {
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Encoding::WebmOpus => "audio/webm;codecs=opus",
            Encoding::Webm => "audio/webm",
            Encoding::Mp4 => "audio/mp4",
            Encoding::Wav => "audio/wav",
        }
    }

    /// Content type sent with the upload. Codec parameters are dropped.
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Encoding::WebmOpus | Encoding::Webm => "audio/webm",
            Encoding::Mp4 => "audio/mp4",
            Encoding::Wav => "audio/wav",
        }
    }

    #[must_use]
    pub fn container_extension(self) -> &'static str {
        match self {
            Encoding::WebmOpus | Encoding::Webm => "webm",
            Encoding::Mp4 => "mp4",
            Encoding::Wav => "wav",
        }
    }

    /// File name of the multipart upload part, e.g. `audio.webm`.
    #[must_use]
    pub fn upload_file_name(self) -> String {
        format!("audio.{}", self.container_extension())
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_follows_container() {
        assert_eq!(Encoding::WebmOpus.upload_file_name(), "audio.webm");
        assert_eq!(Encoding::Webm.upload_file_name(), "audio.webm");
        assert_eq!(Encoding::Mp4.upload_file_name(), "audio.mp4");
        assert_eq!(Encoding::Wav.upload_file_name(), "audio.wav");
    }

    #[test]
    fn content_type_drops_codec_parameter() {
        assert_eq!(Encoding::WebmOpus.content_type(), "audio/webm");
        assert_eq!(Encoding::WebmOpus.mime_type(), "audio/webm;codecs=opus");
    }

    #[test]
    fn default_priority_prefers_opus() {
        assert_eq!(DEFAULT_ENCODING_PRIORITY[0], Encoding::WebmOpus);
        assert_eq!(DEFAULT_ENCODING_PRIORITY[3], Encoding::Wav);
    }
}
