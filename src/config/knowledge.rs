use log::info;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{ Path, PathBuf };
use std::sync::Arc;

#[derive(Debug)]
pub enum KnowledgeError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for KnowledgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnowledgeError::IoError { path, source } =>
                write!(f, "Failed to read knowledge base '{}': {}", path.display(), source),
        }
    }
}

impl Error for KnowledgeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            KnowledgeError::IoError { source, .. } => Some(source),
        }
    }
}

/// Static reference text handed to the model with every request.
/// Loaded once at startup and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeBase {
    text: String,
}

impl KnowledgeBase {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Arc<Self>, KnowledgeError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| KnowledgeError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded knowledge base from {} ({} bytes)", path.display(), text.len());
        Ok(Arc::new(Self { text }))
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
