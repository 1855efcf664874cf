use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::info;

/// Named text documents produced by the agents, keyed by filename
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Create or replace the artifact
    async fn write(&self, filename: &str, contents: &str) -> io::Result<()>;

    /// Read an artifact, `None` if it has never been written
    async fn read(&self, filename: &str) -> io::Result<Option<String>>;

    /// Names of all stored artifacts, sorted
    async fn list(&self) -> io::Result<Vec<String>>;
}

/// Stores each artifact as a file inside a single directory
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    root: PathBuf,
}

impl FileArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    // Artifact names are a single plain file name, never a path
    fn resolve_path(&self, filename: &str) -> io::Result<PathBuf> {
        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Ok(self.root.join(name)),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid artifact name '{}'", filename),
            )),
        }
    }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn write(&self, filename: &str, contents: &str) -> io::Result<()> {
        let path = self.resolve_path(filename)?;
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&path, contents).await?;
        info!(path = %path.display(), bytes = contents.len(), "wrote artifact");
        Ok(())
    }

    async fn read(&self, filename: &str) -> io::Result<Option<String>> {
        let path = self.resolve_path(filename)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list(&self) -> io::Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}
