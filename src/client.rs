//! The namespace client facade.
//!
//! Owns the shared gRPC channel, the HTTP transport and the child-process
//! runner; construction pings the MGM and fails if it is unreachable.
//! Safe for concurrent use: all operations take `&self` and the transports
//! are internally shared.

use std::sync::Arc;

use tokio::io::AsyncRead;
use tonic::transport::Endpoint;
use tracing::{debug, info};

use crate::acl::AclEntry;
use crate::data::http::XrdHttpClient;
use crate::data::{CacheFile, XrdcopyTransport};
use crate::error::ClientError;
use crate::identity::{IdentityResolver, UnixIdentity};
use crate::meta::{Attribute, MetaTransport};
use crate::options::{ClientOptions, HttpOptions};
use crate::parse::{DeletedEntry, FileInfo, parse_recycle_list};
use crate::process::CommandRunner;
use crate::proto::PingRequest;
use crate::proto::eos_client::EosClient;

/// Directory prefix under which the backend keeps file versions.
const VERSION_PREFIX: &str = ".sys.v#.";

/// Client for an MGM: metadata over gRPC, bulk data over xrdcopy or
/// XrdHTTP, trashbin and versions through the eos binary.
#[derive(Debug, Clone)]
pub struct Client {
    opts: Arc<ClientOptions>,
    resolver: IdentityResolver,
    grpc: EosClient<tonic::transport::Channel>,
    meta: MetaTransport,
    data: XrdcopyTransport,
    http: XrdHttpClient,
    runner: CommandRunner,
}

impl Client {
    /// Create a client and verify the MGM answers a ping. Construction is
    /// the only readiness check; there is no background reconnect.
    pub async fn new(
        mut options: ClientOptions,
        http_options: HttpOptions,
    ) -> Result<Self, ClientError> {
        options.apply_defaults();
        if options.grpc_uri.is_empty() {
            return Err(ClientError::InvalidInput("grpc_uri must be set".to_string()));
        }
        let opts = Arc::new(options);

        let endpoint = Endpoint::from_shared(opts.grpc_uri.clone()).map_err(|e| {
            ClientError::InvalidInput(format!("invalid grpc_uri '{}': {e}", opts.grpc_uri))
        })?;
        let grpc = EosClient::new(endpoint.connect_lazy());

        let resolver = IdentityResolver::new(&opts);
        let runner = CommandRunner::new(opts.clone());
        let client = Self {
            meta: MetaTransport::new(opts.clone(), resolver.clone(), grpc.clone()),
            data: XrdcopyTransport::new(opts.clone(), runner.clone()),
            http: XrdHttpClient::new(http_options)?,
            grpc,
            resolver,
            runner,
            opts,
        };

        client.ping().await?;
        info!(grpc_uri = %client.opts.grpc_uri, mgm = %client.opts.mgm_url, "connected to MGM");
        Ok(client)
    }

    /// Ping the MGM gRPC service with the configured authkey.
    pub async fn ping(&self) -> Result<(), ClientError> {
        let mut grpc = self.grpc.clone();
        let reply = grpc
            .ping(PingRequest {
                authkey: self.opts.authkey.clone(),
                message: b"namespace client ping".to_vec(),
            })
            .await?;
        debug!(reply = reply.into_inner().message.len(), "ping ok");
        Ok(())
    }

    /// The XrdHTTP data channel.
    pub fn http(&self) -> &XrdHttpClient {
        &self.http
    }

    /// Resolve a request username, honoring the single-user override.
    pub fn resolve(&self, username: &str) -> Result<UnixIdentity, ClientError> {
        self.resolver.resolve(username)
    }

    // --- metadata -------------------------------------------------------

    pub async fn stat_by_path(&self, username: &str, path: &str) -> Result<FileInfo, ClientError> {
        self.meta.stat_by_path(username, path).await
    }

    pub async fn stat_by_inode(&self, username: &str, inode: u64) -> Result<FileInfo, ClientError> {
        self.meta.stat_by_inode(username, inode).await
    }

    pub async fn list(&self, username: &str, path: &str) -> Result<Vec<FileInfo>, ClientError> {
        self.meta.list(username, path).await
    }

    pub async fn mkdir(&self, username: &str, path: &str) -> Result<(), ClientError> {
        self.meta.mkdir(username, path).await
    }

    pub async fn touch(&self, username: &str, path: &str) -> Result<(), ClientError> {
        self.meta.touch(username, path).await
    }

    pub async fn remove(&self, username: &str, path: &str) -> Result<(), ClientError> {
        self.meta.remove(username, path).await
    }

    pub async fn rename(
        &self,
        username: &str,
        old_path: &str,
        new_path: &str,
    ) -> Result<(), ClientError> {
        self.meta.rename(username, old_path, new_path).await
    }

    pub async fn chown(
        &self,
        username: &str,
        chown_user: &str,
        path: &str,
    ) -> Result<(), ClientError> {
        self.meta.chown(username, chown_user, path).await
    }

    pub async fn chmod(&self, username: &str, mode: &str, path: &str) -> Result<(), ClientError> {
        self.meta.chmod(username, mode, path).await
    }

    pub async fn set_xattr(
        &self,
        username: &str,
        attr: &Attribute,
        recursive: bool,
        path: &str,
    ) -> Result<(), ClientError> {
        self.meta.set_xattr(username, attr, recursive, path).await
    }

    pub async fn unset_xattr(
        &self,
        username: &str,
        attr: &Attribute,
        path: &str,
    ) -> Result<(), ClientError> {
        self.meta.unset_xattr(username, attr, path).await
    }

    pub async fn acl_list(&self, username: &str, path: &str) -> Result<Vec<AclEntry>, ClientError> {
        self.meta.acl_list(username, path).await
    }

    pub async fn acl_modify(
        &self,
        username: &str,
        path: &str,
        entry: &AclEntry,
    ) -> Result<(), ClientError> {
        self.meta.acl_modify(username, path, entry).await
    }

    pub async fn acl_delete(
        &self,
        username: &str,
        path: &str,
        entry_type: &str,
        qualifier: &str,
    ) -> Result<(), ClientError> {
        self.meta.acl_delete(username, path, entry_type, qualifier).await
    }

    pub async fn acl_get(
        &self,
        username: &str,
        path: &str,
        entry_type: &str,
        qualifier: &str,
    ) -> Result<AclEntry, ClientError> {
        self.meta.acl_get(username, path, entry_type, qualifier).await
    }

    /// Quota is not served by the gRPC interface; the gateway decides what
    /// to surface instead.
    pub async fn get_quota(&self, _username: &str, path: &str) -> Result<(u64, u64), ClientError> {
        Err(ClientError::Unimplemented(format!("quota for {path}")))
    }

    // --- bulk data ------------------------------------------------------

    /// Download `path` through the cache directory. The returned handle
    /// unlinks its backing file when dropped.
    pub async fn read(&self, username: &str, path: &str) -> Result<CacheFile, ClientError> {
        let identity = self.resolver.resolve(username)?;
        self.data.read(identity, path).await
    }

    /// Stage `stream` locally and push it to `path` on the MGM.
    pub async fn write<R>(&self, username: &str, path: &str, stream: R) -> Result<(), ClientError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let identity = self.resolver.resolve(username)?;
        self.data.write(identity, path, stream).await
    }

    // --- trashbin -------------------------------------------------------

    /// List the caller's deleted entries.
    pub async fn list_deleted(&self, username: &str) -> Result<Vec<DeletedEntry>, ClientError> {
        let identity = self.resolver.resolve(username)?;
        let stdout = self.runner.eos(identity, &["recycle", "ls", "-m"]).await?;
        parse_recycle_list(&stdout)
    }

    /// Restore a deleted entry by its restore key.
    pub async fn restore_deleted_entry(
        &self,
        username: &str,
        key: &str,
    ) -> Result<(), ClientError> {
        let identity = self.resolver.resolve(username)?;
        self.runner
            .eos(identity, &["recycle", "restore", key])
            .await
            .map(|_| ())
    }

    /// Purge all entries from the caller's recycle bin.
    pub async fn purge_deleted_entries(&self, username: &str) -> Result<(), ClientError> {
        let identity = self.resolver.resolve(username)?;
        self.runner
            .eos(identity, &["recycle", "purge"])
            .await
            .map(|_| ())
    }

    // --- versions -------------------------------------------------------

    /// List the versions kept for `path`. A missing version folder yields
    /// an empty list.
    pub async fn list_versions(
        &self,
        username: &str,
        path: &str,
    ) -> Result<Vec<FileInfo>, ClientError> {
        let folder = version_folder(path);
        match self.meta.list(username, &folder).await {
            Ok(infos) => Ok(infos),
            Err(_) => Ok(Vec::new()),
        }
    }

    /// Read one version of `path`.
    pub async fn read_version(
        &self,
        username: &str,
        path: &str,
        version: &str,
    ) -> Result<CacheFile, ClientError> {
        let version_file = format!("{}/{}", version_folder(path), version);
        self.read(username, &version_file).await
    }

    /// Roll `path` back to a previous version.
    pub async fn rollback_to_version(
        &self,
        username: &str,
        path: &str,
        version: &str,
    ) -> Result<(), ClientError> {
        let identity = self.resolver.resolve(username)?;
        self.runner
            .eos(identity, &["file", "versions", path, version])
            .await
            .map(|_| ())
    }
}

/// Version folder of `path`: `dirname(path)/.sys.v#.basename(path)`.
fn version_folder(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => format!("{}/{}{}", &path[..idx], VERSION_PREFIX, &path[idx + 1..]),
        None => format!("{VERSION_PREFIX}{path}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_folder() {
        assert_eq!(
            version_folder("/eos/user/j/jdoe/app.ico"),
            "/eos/user/j/jdoe/.sys.v#.app.ico"
        );
        assert_eq!(version_folder("/app.ico"), "/.sys.v#.app.ico");
        assert_eq!(version_folder("app.ico"), ".sys.v#.app.ico");
    }
}
