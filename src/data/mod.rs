//! Bulk data channel: file bytes staged through the local cache directory
//! and shipped with xrdcopy.
//!
//! Reads land in `cache_directory/eosread-<uuid>` and are handed back as a
//! [`CacheFile`]; the backing file is unlinked when the handle is released.
//! Writes stage the incoming stream into an `eoswrite-` temp file that is
//! deleted on every exit path.

pub mod http;

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt as _, AsyncWriteExt as _, ReadBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ClientError;
use crate::identity::UnixIdentity;
use crate::options::ClientOptions;
use crate::process::CommandRunner;

/// A readable handle over a staged download. Owns the backing cache file
/// and unlinks it on drop.
#[derive(Debug)]
pub struct CacheFile {
    file: tokio::fs::File,
    path: PathBuf,
}

impl CacheFile {
    async fn open(path: PathBuf) -> Result<Self, ClientError> {
        match tokio::fs::File::open(&path).await {
            Ok(file) => Ok(Self { file, path }),
            Err(err) => {
                remove_quietly(&path);
                Err(err.into())
            }
        }
    }

    /// Location of the backing file inside the cache directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drain the remaining content into memory. Convenience for small files
    /// and tests; large transfers should stream through `AsyncRead`.
    pub async fn read_to_end(mut self) -> Result<Vec<u8>, ClientError> {
        let mut buf = Vec::new();
        self.file.read_to_end(&mut buf).await?;
        Ok(buf)
    }
}

impl AsyncRead for CacheFile {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.file).poll_read(cx, buf)
    }
}

impl Drop for CacheFile {
    fn drop(&mut self) {
        remove_quietly(&self.path);
    }
}

fn remove_quietly(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %err, "could not remove cache file");
        }
    }
}

/// Moves file bytes to and from the MGM via the xrdcopy binary.
#[derive(Debug, Clone)]
pub struct XrdcopyTransport {
    opts: Arc<ClientOptions>,
    runner: CommandRunner,
}

impl XrdcopyTransport {
    pub fn new(opts: Arc<ClientOptions>, runner: CommandRunner) -> Self {
        Self { opts, runner }
    }

    fn xrd_url(&self, path: &str) -> String {
        format!("{}//{}", self.opts.mgm_url, path)
    }

    /// Download `path` into the cache directory and return a handle over it.
    pub async fn read(
        &self,
        identity: UnixIdentity,
        path: &str,
    ) -> Result<CacheFile, ClientError> {
        let local = self
            .opts
            .cache_directory
            .join(format!("eosread-{}", Uuid::new_v4()));
        let src = self.xrd_url(path);
        let opaque = format!("-OSeos.ruid={}&eos.rgid={}", identity.uid, identity.gid);

        debug!(path, local = %local.display(), "staging download");
        let result = self
            .runner
            .xrdcopy(&[
                "--nopbar",
                "--silent",
                "-f",
                &src,
                &local.to_string_lossy(),
                &opaque,
            ])
            .await;
        if let Err(err) = result {
            remove_quietly(&local);
            return Err(err);
        }
        CacheFile::open(local).await
    }

    /// Stage `stream` into a temp file, then push it to `path` on the MGM.
    pub async fn write<R>(
        &self,
        identity: UnixIdentity,
        path: &str,
        mut stream: R,
    ) -> Result<(), ClientError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let staged = tempfile::Builder::new()
            .prefix("eoswrite-")
            .tempfile_in(&self.opts.cache_directory)?;
        // keep the TempPath so the staging file is deleted on every exit path
        let (file, staged_path) = staged.into_parts();

        let mut file = tokio::fs::File::from_std(file);
        tokio::io::copy(&mut stream, &mut file).await?;
        file.flush().await?;
        drop(file);

        let dst = self.xrd_url(path);
        let opaque = format!("-ODeos.ruid={}&eos.rgid={}", identity.uid, identity.gid);
        debug!(path, staged = %staged_path.display(), "pushing upload");
        self.runner
            .xrdcopy(&[
                "--nopbar",
                "--silent",
                "-f",
                &staged_path.to_string_lossy(),
                &dst,
                &opaque,
            ])
            .await
    }
}
