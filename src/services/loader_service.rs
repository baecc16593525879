use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;

use crate::error::{Error, Result};

const MIME_TEXT: &str = "text/plain";
const MIME_PDF: &str = "application/pdf";
const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Clone)]
pub enum DocumentSource {
    Text(String),
    Path(PathBuf),
    Upload {
        file_name: Option<String>,
        mime_type: Option<String>,
        data: Bytes,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    PlainText,
    Pdf,
    WordProcessor,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "txt" => Ok(Self::PlainText),
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::WordProcessor),
            other => Err(Error::UnsupportedFormat(format!(
                "Unsupported file extension: .{}",
                other
            ))),
        }
    }

    /// `None` for types that say nothing about the content (missing or octet-stream).
    pub fn from_mime(mime: &str) -> Option<Result<Self>> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            "" | "application/octet-stream" => None,
            MIME_TEXT => Some(Ok(Self::PlainText)),
            MIME_PDF => Some(Ok(Self::Pdf)),
            MIME_DOCX => Some(Ok(Self::WordProcessor)),
            other => Some(Err(Error::UnsupportedFormat(format!(
                "Unsupported MIME type: {}",
                other
            )))),
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::PlainText => "txt",
            Self::Pdf => "pdf",
            Self::WordProcessor => "docx",
        }
    }
}

fn extension_of(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("")
}

#[derive(Clone)]
pub struct DocumentLoader {
    scratch_dir: PathBuf,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl DocumentLoader {
    pub fn new(scratch_dir: PathBuf) -> Self {
        Self { scratch_dir }
    }

    pub async fn load_text(&self, source: DocumentSource) -> Result<String> {
        match source {
            DocumentSource::Text(text) => Ok(text),
            DocumentSource::Path(path) => {
                let format = DocumentFormat::from_extension(extension_of(&path))?;
                self.load_path(&path, format).await
            }
            DocumentSource::Upload {
                file_name,
                mime_type,
                data,
            } => {
                let format = match mime_type.as_deref().and_then(DocumentFormat::from_mime) {
                    Some(format) => format?,
                    None => {
                        let name = file_name.as_deref().unwrap_or("");
                        DocumentFormat::from_extension(extension_of(Path::new(name)))?
                    }
                };
                self.load_bytes(data, format).await
            }
        }
    }

    async fn load_path(&self, path: &Path, format: DocumentFormat) -> Result<String> {
        match format {
            DocumentFormat::PlainText => {
                let data = fs::read(path).await?;
                Ok(String::from_utf8_lossy(&data).to_string())
            }
            DocumentFormat::Pdf => pdf_to_text(path).await,
            DocumentFormat::WordProcessor => self.docx_to_text(path).await,
        }
    }

    async fn load_bytes(&self, data: Bytes, format: DocumentFormat) -> Result<String> {
        if format == DocumentFormat::PlainText {
            return Ok(String::from_utf8_lossy(&data).to_string());
        }
        if format == DocumentFormat::Pdf && !data.starts_with(b"%PDF") {
            return Err(Error::BadRequest("Invalid PDF file content".into()));
        }

        let staged = self
            .scratch_dir
            .join(format!("upload_{}.{}", uuid::Uuid::new_v4(), format.extension()));
        fs::write(&staged, &data).await?;
        let result = self.load_path(&staged, format).await;
        let _ = fs::remove_file(&staged).await;
        result
    }

    async fn docx_to_text(&self, path: &Path) -> Result<String> {
        let out_dir = self
            .scratch_dir
            .join(format!("docx_totext_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&out_dir).await?;

        let output = Command::new("libreoffice")
            .arg("--headless")
            .arg("--norestore")
            .arg("--convert-to")
            .arg("txt:Text")
            .arg("--outdir")
            .arg(&out_dir)
            .arg(path)
            .output()
            .await;

        let result = match output {
            Ok(out) if out.status.success() => read_converted_text(&out_dir).await,
            Ok(out) => Err(Error::UnsupportedFormat(format!(
                "LibreOffice text conversion failed: {}",
                String::from_utf8_lossy(&out.stderr)
            ))),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::MissingDependency(
                "Word-processor support requires `libreoffice` on PATH".into(),
            )),
            Err(e) => Err(e.into()),
        };

        let _ = fs::remove_dir_all(&out_dir).await;
        result.map(|text| join_paragraphs(&text))
    }
}

async fn pdf_to_text(path: &Path) -> Result<String> {
    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg(path)
        .arg("-")
        .output()
        .await;

    match output {
        Ok(out) if out.status.success() => {
            let raw = String::from_utf8_lossy(&out.stdout);
            // pdftotext separates pages with form feeds
            let pages: Vec<&str> = raw
                .split('\u{c}')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect();
            Ok(pages.join("\n\n"))
        }
        Ok(out) => {
            tracing::error!("pdftotext failed: {}", String::from_utf8_lossy(&out.stderr));
            Err(Error::UnsupportedFormat("PDF text extraction failed".into()))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::MissingDependency(
            "PDF support requires `pdftotext` (poppler-utils) on PATH".into(),
        )),
        Err(e) => Err(e.into()),
    }
}

async fn read_converted_text(dir: &Path) -> Result<String> {
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let p = entry.path();
        if p.extension().and_then(|e| e.to_str()) == Some("txt") {
            let data = fs::read(&p).await?;
            return Ok(String::from_utf8_lossy(&data).to_string());
        }
    }
    Err(Error::UnsupportedFormat("LibreOffice produced no text output".into()))
}

fn join_paragraphs(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
