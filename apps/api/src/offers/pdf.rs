use std::path::Path;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, error};

use crate::errors::AppError;

const PRINT_TIMEOUT: Duration = Duration::from_secs(60);

/// Prints HTML to PDF with a headless Chromium.
#[derive(Debug, Clone)]
pub struct PdfPrinter {
    chrome_bin: String,
}

fn print_args(input: &Path, output: &Path) -> Vec<String> {
    vec![
        "--headless".to_string(),
        "--disable-gpu".to_string(),
        "--no-sandbox".to_string(),
        "--no-pdf-header-footer".to_string(),
        format!("--print-to-pdf={}", output.display()),
        format!("file://{}", input.display()),
    ]
}

impl PdfPrinter {
    pub fn new(chrome_bin: String) -> Self {
        Self { chrome_bin }
    }

    pub async fn print(&self, html: &str) -> Result<Vec<u8>, AppError> {
        let dir = tempfile::tempdir()
            .map_err(|e| AppError::Render(format!("Failed to create temp dir: {e}")))?;
        let input = dir.path().join("document.html");
        let output = dir.path().join("document.pdf");

        tokio::fs::write(&input, html)
            .await
            .map_err(|e| AppError::Render(format!("Failed to write HTML: {e}")))?;

        debug!("Printing PDF with {}", self.chrome_bin);
        let run = Command::new(&self.chrome_bin)
            .args(print_args(&input, &output))
            .kill_on_drop(true)
            .output();

        let result = tokio::time::timeout(PRINT_TIMEOUT, run)
            .await
            .map_err(|_| AppError::Render("Browser timed out printing PDF".to_string()))?
            .map_err(|e| AppError::Render(format!("Failed to launch {}: {e}", self.chrome_bin)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            error!("Browser exited with {}: {}", result.status, stderr.trim());
            return Err(AppError::Render(format!(
                "Browser exited with {}",
                result.status
            )));
        }

        tokio::fs::read(&output)
            .await
            .map_err(|e| AppError::Render(format!("Browser produced no PDF: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_args_point_at_temp_files() {
        let args = print_args(Path::new("/tmp/x/in.html"), Path::new("/tmp/x/out.pdf"));
        assert!(args.contains(&"--headless".to_string()));
        assert!(args.contains(&"--print-to-pdf=/tmp/x/out.pdf".to_string()));
        assert_eq!(args.last().unwrap(), "file:///tmp/x/in.html");
    }

    #[tokio::test]
    async fn test_missing_browser_is_render_error() {
        let printer = PdfPrinter::new("/nonexistent/chromium-binary".into());
        let err = printer.print("<html></html>").await.unwrap_err();
        assert!(matches!(err, AppError::Render(_)));
    }
}
