use crate::errors::AppResult;
use crate::types::content_detection::{infer_content_type, ContentFormat};
use crate::types::trimming::trim_payload;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

/// Infer the content type of a file
#[derive(Args)]
pub struct InferCommand {
    /// File to classify
    #[arg(long)]
    pub file: PathBuf,

    /// Declared MIME type, used only when the bytes are inconclusive
    #[arg(long)]
    pub declared_type: Option<String>,

    /// Write the payload after leading/trailing cleanup to this path
    #[arg(long)]
    pub write_trimmed: Option<PathBuf>,
}

#[derive(Serialize)]
struct InferResult {
    format: ContentFormat,
    mime_type: &'static str,
    extension: &'static str,
    size: usize,
    trimmed_size: usize,
}

impl InferCommand {
    pub fn run(&self) -> AppResult<()> {
        let data = std::fs::read(&self.file)?;
        let file_name = self.file.file_name().and_then(|n| n.to_str());
        let format = infer_content_type(&data, self.declared_type.as_deref(), file_name);
        let trimmed = trim_payload(&data, format);

        if let Some(path) = &self.write_trimmed {
            std::fs::write(path, trimmed)?;
        }

        let result = InferResult {
            format,
            mime_type: format.mime_type(),
            extension: format.extension(),
            size: data.len(),
            trimmed_size: trimmed.len(),
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
        Ok(())
    }
}
