//! Voice recording intake.
//!
//! Browsers post the recording either as a bare base64 string or as a data
//! URL (`data:audio/webm;base64,...`). This module decodes both and can
//! convert the result to WAV with ffmpeg.

use crate::{AppError, Result};
use base64::{engine::general_purpose, Engine as _};
use std::path::Path;
use tokio::process::Command;

/// Content type assumed when the payload does not carry one.
pub const DEFAULT_CONTENT_TYPE: &str = "audio/webm";

/// A decoded recording ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAudio {
    pub data: Vec<u8>,
    pub content_type: String,
}

impl DecodedAudio {
    pub fn extension(&self) -> &'static str {
        extension_for_content_type(&self.content_type)
    }
}

/// Decode a base64 or data-URL audio payload.
pub fn decode_audio_payload(payload: &str) -> Result<DecodedAudio> {
    let payload = payload.trim();

    let (content_type, encoded) = match payload.strip_prefix("data:") {
        Some(rest) => {
            let (header, body) = rest
                .split_once(',')
                .ok_or_else(|| AppError::Validation("invalid base64 audio".to_string()))?;
            (normalize_content_type(header), body)
        }
        None => (DEFAULT_CONTENT_TYPE, payload),
    };

    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let data = general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|_| AppError::Validation("invalid base64 audio".to_string()))?;

    if data.is_empty() {
        return Err(AppError::Validation("invalid base64 audio".to_string()));
    }

    Ok(DecodedAudio {
        data,
        content_type: content_type.to_string(),
    })
}

/// Map a client-supplied MIME type onto one of the audio types we store.
/// Anything unrecognized becomes `audio/webm`.
pub fn normalize_content_type(content_type: &str) -> &'static str {
    match extension_for_content_type(content_type) {
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// File extension used when storing audio of the given MIME type.
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    let base = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match base.as_str() {
        "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => "wav",
        "audio/ogg" | "audio/opus" => "ogg",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" | "audio/aac" => "m4a",
        "audio/flac" | "audio/x-flac" => "flac",
        _ => "webm",
    }
}

pub fn is_wav(content_type: &str) -> bool {
    extension_for_content_type(content_type) == "wav"
}

/// Convert a recording to 16-bit PCM WAV using ffmpeg.
///
/// Recordings that are already WAV are returned unchanged.
pub async fn convert_to_wav(audio: DecodedAudio) -> Result<DecodedAudio> {
    if is_wav(&audio.content_type) {
        return Ok(audio);
    }

    let temp_dir = std::env::temp_dir();
    let unique_id = uuid::Uuid::new_v4().to_string();

    let input_path = temp_dir.join(format!("audio_input_{}.{}", unique_id, audio.extension()));
    let output_path = temp_dir.join(format!("audio_output_{}.wav", unique_id));

    tokio::fs::write(&input_path, &audio.data)
        .await
        .map_err(|e| AppError::Audio(format!("Failed to write temp input file: {}", e)))?;

    let output = Command::new("ffmpeg")
        .arg("-i")
        .arg(&input_path)
        .args(["-vn", "-acodec", "pcm_s16le", "-y"])
        .arg(&output_path)
        .output()
        .await;

    let _ = tokio::fs::remove_file(&input_path).await;

    let output = output.map_err(|e| {
        AppError::Audio(format!("Failed to run ffmpeg (is it installed?): {}", e))
    })?;

    if !output.status.success() {
        let _ = tokio::fs::remove_file(&output_path).await;

        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!("ffmpeg conversion failed: {}", stderr);
        return Err(AppError::Audio(format!(
            "Audio conversion failed: {}",
            stderr.lines().last().unwrap_or("Unknown error")
        )));
    }

    let wav = read_and_remove(&output_path).await?;

    tracing::debug!(
        "Converted {} ({} bytes) to WAV ({} bytes)",
        audio.content_type,
        audio.data.len(),
        wav.len()
    );

    Ok(DecodedAudio {
        data: wav,
        content_type: "audio/wav".to_string(),
    })
}

async fn read_and_remove(path: &Path) -> Result<Vec<u8>> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::Audio(format!("Failed to read converted audio: {}", e)));
    let _ = tokio::fs::remove_file(path).await;
    data
}
