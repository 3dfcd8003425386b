use super::error::ToolError;
use crate::config::{ImageConfig, SpeechConfig};
use crate::provider::OpenAiClient;
use crate::shared::fs_atomic::atomic_write_file;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// Result of an image request: the remote URL, plus the local copy when
/// downloads are enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub url: String,
    pub saved_to: Option<PathBuf>,
}

impl GeneratedImage {
    /// Local path when saved, otherwise the URL.
    pub fn reference(&self) -> String {
        match &self.saved_to {
            Some(path) => path.display().to_string(),
            None => self.url.clone(),
        }
    }
}

/// OpenAI-backed image and speech generation writing into a bot's uploads dir.
#[derive(Debug, Clone)]
pub struct MediaTools {
    client: OpenAiClient,
    images: ImageConfig,
    speech: SpeechConfig,
    uploads_dir: PathBuf,
}

impl MediaTools {
    pub fn new(
        client: OpenAiClient,
        images: ImageConfig,
        speech: SpeechConfig,
        uploads_dir: &Path,
    ) -> Self {
        Self {
            client,
            images,
            speech,
            uploads_dir: uploads_dir.to_path_buf(),
        }
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, ToolError> {
        let url = self
            .client
            .generate_image(prompt, &self.images.model, &self.images.size)?;
        if !self.images.download {
            return Ok(GeneratedImage { url, saved_to: None });
        }

        let bytes = self.client.download(&url)?;
        let path = self.uploads_dir.join(image_file_name(Local::now()));
        atomic_write_file(&path, &bytes).map_err(|source| ToolError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(GeneratedImage {
            url,
            saved_to: Some(path),
        })
    }

    /// Renders `text` to mp3 and returns the saved file.
    pub fn text_to_speech(&self, text: &str) -> Result<PathBuf, ToolError> {
        let bytes = self
            .client
            .synthesize_speech(text, &self.speech.model, &self.speech.voice)?;
        let path = self.uploads_dir.join(speech_file_name(&random_token()?));
        atomic_write_file(&path, &bytes).map_err(|source| ToolError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

pub fn image_file_name(at: DateTime<Local>) -> String {
    format!("generated_image_{}.png", at.format("%Y%m%d%H%M%S"))
}

pub fn speech_file_name(token: &str) -> String {
    format!("{token}.mp3")
}

/// 128 random bits as lowercase hex.
pub fn random_token() -> Result<String, ToolError> {
    let mut bytes = [0_u8; 16];
    getrandom::getrandom(&mut bytes).map_err(|err| ToolError::Random(err.to_string()))?;
    Ok(bytes.iter().map(|byte| format!("{byte:02x}")).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn file_names_follow_upload_conventions() {
        let at = Local
            .with_ymd_and_hms(2024, 7, 1, 9, 5, 3)
            .single()
            .expect("local time");
        assert_eq!(image_file_name(at), "generated_image_20240701090503.png");
        assert_eq!(speech_file_name("abc"), "abc.mp3");
    }

    #[test]
    fn random_tokens_are_hex_and_distinct() {
        let a = random_token().expect("token");
        let b = random_token().expect("token");
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
