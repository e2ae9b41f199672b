use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{OcrError, TextExtractor};

/// Runs a local `tesseract` binary, piping the image through stdin and reading text from stdout.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
    language: Option<String>,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into(), language: None }
    }

    /// Tesseract language code(s), e.g. `eng` or `eng+hin`.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("stdin").arg("stdout");
        if let Some(lang) = &self.language {
            cmd.arg("-l").arg(lang);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl TextExtractor for TesseractCli {
    async fn extract_text(&self, image: &[u8]) -> Result<String, OcrError> {
        let mut child = self.command().spawn()?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| OcrError::Process("tesseract stdin unavailable".to_string()))?;
        stdin.write_all(image).await?;
        drop(stdin);

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let snippet: String = stderr.trim().chars().take(200).collect();
            return Err(OcrError::Process(format!("tesseract exited with {}: {snippet}", output.status)));
        }
        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(chars = text.len(), "tesseract extraction complete");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_expected_arguments() {
        let cli = TesseractCli::new("/usr/bin/tesseract").with_language("eng");
        let cmd = cli.command();
        let args: Vec<_> = cmd.as_std().get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["stdin", "stdout", "-l", "eng"]);
        assert_eq!(cmd.as_std().get_program(), "/usr/bin/tesseract");
    }

    #[tokio::test]
    async fn missing_binary_is_an_io_error() {
        let cli = TesseractCli::new("/nonexistent/tesseract-binary");
        assert!(matches!(cli.extract_text(b"\x89PNG").await, Err(OcrError::Io(_))));
    }
}
