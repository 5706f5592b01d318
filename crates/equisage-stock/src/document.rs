//! Markdown report documents

use crate::error::{Result, StockError};
use async_trait::async_trait;
use chrono::Utc;
use equisage_core::{ConversationState, DocumentRenderer};
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes each report to `<dir>/<SYMBOL>_<timestamp>.md`
///
/// Files are transient: the delivery layer removes them once sent.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    output_dir: PathBuf,
}

impl MarkdownRenderer {
    /// Render into `output_dir`, created on first use
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Output directory
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn file_name(ticker: &str) -> String {
        let symbol: String = ticker
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("{symbol}_{}.md", Utc::now().format("%Y%m%d_%H%M%S%3f"))
    }

    async fn write(&self, state: &ConversationState, report: &str) -> Result<Option<PathBuf>> {
        let Some(ticker) = state.ticker.as_deref().filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let title = state.subject().unwrap_or(ticker);

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(Self::file_name(ticker));
        let mut document = format!(
            "# EquiSage Report: {title} ({ticker})\n\n_Generated {}_\n\n",
            Utc::now().format("%Y-%m-%d %H:%M UTC")
        );
        document.push_str(report.trim());
        document.push('\n');

        tokio::fs::write(&path, document).await?;
        info!(path = %path.display(), "Report document written");
        Ok(Some(path))
    }
}

#[async_trait]
impl DocumentRenderer for MarkdownRenderer {
    async fn render(
        &self,
        state: &ConversationState,
        report: &str,
    ) -> equisage_core::Result<Option<PathBuf>> {
        if report.trim().is_empty() {
            return Err(StockError::Other("cannot render an empty report".to_string()).into());
        }
        Ok(self.write(state, report).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ConversationState {
        let mut state = ConversationState::from_message(3_i64, "analyze itc");
        state.ticker = Some("ITC.NS".to_string());
        state.company_name = Some("ITC Ltd".to_string());
        state
    }

    #[tokio::test]
    async fn test_writes_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = MarkdownRenderer::new(dir.path().join("reports"));

        let path = renderer.render(&state(), "Verdict: hold.").await.unwrap().unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("ITC_NS_"));
        assert!(name.ends_with(".md"));

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.starts_with("# EquiSage Report: ITC Ltd (ITC.NS)"));
        assert!(contents.contains("Verdict: hold."));
    }

    #[tokio::test]
    async fn test_no_ticker_no_document() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = MarkdownRenderer::new(dir.path());
        let state = ConversationState::from_message(3_i64, "hello");

        assert!(renderer.render(&state, "text").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_report_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = MarkdownRenderer::new(dir.path());
        assert!(renderer.render(&state(), "  ").await.is_err());
    }
}
