//! Metadata transport: typed RPCs against the MGM gRPC service.
//!
//! Every call resolves the request identity, packs (uid, gid, authkey) into
//! the envelope, issues the RPC on the shared channel and maps the response
//! envelope onto the error taxonomy.

use std::fmt;
use std::sync::Arc;

use tonic::transport::Channel;
use tracing::{info, warn};

use crate::acl::{self, AclEntry, Acls};
use crate::error::ClientError;
use crate::identity::{IdentityResolver, UnixIdentity};
use crate::options::ClientOptions;
use crate::parse::{FileInfo, strip_trailing_slash};
use crate::proto::eos_client::EosClient;
use crate::proto::{
    AclCommand, AclRequest, AclType, ChmodRequest, ChownRequest, FindRequest, MdId, MdRequest,
    MdResponse, MdType, MkdirRequest, NsRequest, NsResponse, RmdirRequest, RoleId,
    SetXAttrRequest, TouchRequest, UnlinkRequest, ns_request,
};

/// Permission mode sent with recursive mkdir; the MGM applies its own mask.
const DIR_MODE: i64 = 0o750;

/// Extended attribute namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    Sys,
    User,
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrType::Sys => write!(f, "sys"),
            AttrType::User => write!(f, "user"),
        }
    }
}

/// An extended attribute on a namespace entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub attr_type: AttrType,
    pub key: String,
    pub val: String,
}

impl Attribute {
    pub fn new(attr_type: AttrType, key: &str, val: &str) -> Self {
        Self {
            attr_type,
            key: key.to_string(),
            val: val.to_string(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.key.is_empty()
    }

    /// Namespaced key, e.g. `sys.acl`.
    pub fn full_key(&self) -> String {
        format!("{}.{}", self.attr_type, self.key)
    }

    pub fn serialize(&self) -> String {
        format!("{}.{}={}", self.attr_type, self.key, self.val)
    }
}

/// Typed metadata operations over the shared gRPC channel.
#[derive(Debug, Clone)]
pub struct MetaTransport {
    opts: Arc<ClientOptions>,
    resolver: IdentityResolver,
    grpc: EosClient<Channel>,
}

impl MetaTransport {
    pub(crate) fn new(
        opts: Arc<ClientOptions>,
        resolver: IdentityResolver,
        grpc: EosClient<Channel>,
    ) -> Self {
        Self {
            opts,
            resolver,
            grpc,
        }
    }

    fn role(identity: UnixIdentity) -> RoleId {
        RoleId {
            uid: identity.uid,
            gid: identity.gid,
            ..Default::default()
        }
    }

    fn path_id(path: &str) -> MdId {
        MdId {
            path: path.as_bytes().to_vec(),
            ino: 0,
        }
    }

    fn ns_request(&self, identity: UnixIdentity, command: ns_request::Command) -> NsRequest {
        NsRequest {
            role: Some(Self::role(identity)),
            authkey: self.opts.authkey.clone(),
            command: Some(command),
        }
    }

    /// Issue an Exec call and map the response envelope.
    async fn exec(
        &self,
        op: &str,
        username: &str,
        path: &str,
        rq: NsRequest,
    ) -> Result<NsResponse, ClientError> {
        let mut grpc = self.grpc.clone();
        let resp = grpc.exec(rq).await?.into_inner();
        if let Some(err) = &resp.error {
            info!(op, username, path, errcode = err.code, errmsg = %err.msg, "grpc response");
            if err.code != 0 {
                return Err(map_backend_errno(err.code, &err.msg));
            }
        }
        Ok(resp)
    }

    /// Stat the entry at `path`.
    pub async fn stat_by_path(
        &self,
        username: &str,
        path: &str,
    ) -> Result<FileInfo, ClientError> {
        let identity = self.resolver.resolve(username)?;
        let rq = MdRequest {
            r#type: MdType::Stat as i32,
            id: Some(Self::path_id(path)),
            authkey: self.opts.authkey.clone(),
            role: Some(Self::role(identity)),
        };
        let mut grpc = self.grpc.clone();
        let mut stream = grpc.md(rq).await?.into_inner();
        match stream.message().await? {
            Some(resp) => md_response_to_file_info(&resp, &self.opts.mgm_url),
            None => Err(ClientError::NotFound(format!("{username}:{path}"))),
        }
    }

    /// Stat the entry with the given inode.
    pub async fn stat_by_inode(
        &self,
        username: &str,
        inode: u64,
    ) -> Result<FileInfo, ClientError> {
        let identity = self.resolver.resolve(username)?;
        let rq = MdRequest {
            r#type: MdType::Stat as i32,
            id: Some(MdId {
                path: Vec::new(),
                ino: inode,
            }),
            authkey: self.opts.authkey.clone(),
            role: Some(Self::role(identity)),
        };
        let mut grpc = self.grpc.clone();
        let mut stream = grpc.md(rq).await?.into_inner();
        match stream.message().await? {
            Some(resp) => md_response_to_file_info(&resp, &self.opts.mgm_url),
            None => Err(ClientError::NotFound(format!("{username}:inode {inode}"))),
        }
    }

    /// List the children of `path`. The stream is consumed to its end; the
    /// entry for `path` itself is filtered out. Records arrive in backend
    /// order.
    pub async fn list(&self, username: &str, path: &str) -> Result<Vec<FileInfo>, ClientError> {
        let identity = self.resolver.resolve(username)?;
        let rq = FindRequest {
            r#type: MdType::Listing as i32,
            id: Some(Self::path_id(path)),
            role: Some(Self::role(identity)),
            authkey: self.opts.authkey.clone(),
            maxdepth: 1,
        };
        let mut grpc = self.grpc.clone();
        let mut stream = grpc.find(rq).await?.into_inner();
        let mut entries = Vec::new();
        while let Some(resp) = stream.message().await? {
            let fi = md_response_to_file_info(&resp, &self.opts.mgm_url)?;
            if is_parent_entry(path, &fi) {
                continue;
            }
            entries.push(fi);
        }
        Ok(entries)
    }

    /// Create the directory at `path`, with parents.
    pub async fn mkdir(&self, username: &str, path: &str) -> Result<(), ClientError> {
        let identity = self.resolver.resolve(username)?;
        let rq = self.ns_request(
            identity,
            ns_request::Command::Mkdir(MkdirRequest {
                id: Some(Self::path_id(path)),
                mode: DIR_MODE,
                recursive: true,
            }),
        );
        self.exec("mkdir", username, path, rq).await.map(|_| ())
    }

    /// Create a zero-size, zero-replica file. No-op if it exists.
    pub async fn touch(&self, username: &str, path: &str) -> Result<(), ClientError> {
        let identity = self.resolver.resolve(username)?;
        let rq = self.ns_request(
            identity,
            ns_request::Command::Touch(TouchRequest {
                id: Some(Self::path_id(path)),
            }),
        );
        self.exec("touch", username, path, rq).await.map(|_| ())
    }

    /// Remove the entry at `path`, dispatching on its type.
    pub async fn remove(&self, username: &str, path: &str) -> Result<(), ClientError> {
        let info = self.stat_by_path(username, path).await?;
        if info.is_dir {
            self.rmdir(username, path).await
        } else {
            self.unlink(username, path).await
        }
    }

    async fn unlink(&self, username: &str, path: &str) -> Result<(), ClientError> {
        let identity = self.resolver.resolve(username)?;
        let rq = self.ns_request(
            identity,
            ns_request::Command::Unlink(UnlinkRequest {
                id: Some(Self::path_id(path)),
                norecycle: false,
            }),
        );
        self.exec("unlink", username, path, rq).await.map(|_| ())
    }

    async fn rmdir(&self, username: &str, path: &str) -> Result<(), ClientError> {
        let identity = self.resolver.resolve(username)?;
        let rq = self.ns_request(
            identity,
            ns_request::Command::Rmdir(RmdirRequest {
                id: Some(Self::path_id(path)),
            }),
        );
        self.exec("rmdir", username, path, rq).await.map(|_| ())
    }

    /// Not provided by the backend service; the gateway decides policy.
    pub async fn rename(
        &self,
        _username: &str,
        _old_path: &str,
        new_path: &str,
    ) -> Result<(), ClientError> {
        Err(ClientError::Unimplemented(format!("rename to {new_path}")))
    }

    /// Change the owner of `path` to `chown_user`.
    pub async fn chown(
        &self,
        username: &str,
        chown_user: &str,
        path: &str,
    ) -> Result<(), ClientError> {
        let identity = self.resolver.resolve(username)?;
        let owner = self.resolver.resolve(chown_user)?;
        let rq = self.ns_request(
            identity,
            ns_request::Command::Chown(ChownRequest {
                id: Some(Self::path_id(path)),
                owner: Some(RoleId {
                    uid: owner.uid,
                    ..Default::default()
                }),
            }),
        );
        self.exec("chown", username, path, rq).await.map(|_| ())
    }

    /// Change the mode of `path`. `mode` is a base-10 unsigned literal.
    pub async fn chmod(
        &self,
        username: &str,
        mode: &str,
        path: &str,
    ) -> Result<(), ClientError> {
        let identity = self.resolver.resolve(username)?;
        let mode: u64 = mode
            .parse()
            .map_err(|_| ClientError::InvalidInput(format!("invalid mode '{mode}'")))?;
        let rq = self.ns_request(
            identity,
            ns_request::Command::Chmod(ChmodRequest {
                id: Some(Self::path_id(path)),
                mode: mode as i64,
            }),
        );
        self.exec("chmod", username, path, rq).await.map(|_| ())
    }

    /// Set an extended attribute on `path`.
    pub async fn set_xattr(
        &self,
        username: &str,
        attr: &Attribute,
        recursive: bool,
        path: &str,
    ) -> Result<(), ClientError> {
        if !attr.is_valid() {
            return Err(ClientError::InvalidInput(format!(
                "invalid attribute '{}'",
                attr.serialize()
            )));
        }
        let identity = self.resolver.resolve(username)?;
        let mut xattrs = std::collections::HashMap::new();
        xattrs.insert(attr.full_key(), attr.val.clone().into_bytes());
        let rq = self.ns_request(
            identity,
            ns_request::Command::Xattr(SetXAttrRequest {
                id: Some(Self::path_id(path)),
                xattrs,
                recursive,
                keystodelete: Vec::new(),
            }),
        );
        self.exec("set_xattr", username, path, rq).await.map(|_| ())
    }

    /// Remove an extended attribute from `path`.
    pub async fn unset_xattr(
        &self,
        username: &str,
        attr: &Attribute,
        path: &str,
    ) -> Result<(), ClientError> {
        if !attr.is_valid() {
            return Err(ClientError::InvalidInput(format!(
                "invalid attribute '{}'",
                attr.serialize()
            )));
        }
        let identity = self.resolver.resolve(username)?;
        let rq = self.ns_request(
            identity,
            ns_request::Command::Xattr(SetXAttrRequest {
                id: Some(Self::path_id(path)),
                xattrs: std::collections::HashMap::new(),
                recursive: false,
                keystodelete: vec![attr.full_key()],
            }),
        );
        self.exec("unset_xattr", username, path, rq)
            .await
            .map(|_| ())
    }

    /// Raw system ACL of `path`, as stored (numeric qualifiers on Citrine).
    async fn acls_for_path(&self, username: &str, path: &str) -> Result<Acls, ClientError> {
        let identity = self.resolver.resolve(username)?;
        let rq = self.ns_request(
            identity,
            ns_request::Command::Acl(AclRequest {
                id: Some(Self::path_id(path)),
                cmd: AclCommand::List as i32,
                r#type: AclType::SysAcl as i32,
                recursive: true,
                rule: String::new(),
            }),
        );
        let resp = self.exec("acl_list", username, path, rq).await?;
        let acl = resp.acl.ok_or_else(|| {
            ClientError::InvalidResponse(format!("acl response without rule for '{path}'"))
        })?;
        Acls::parse(&acl.rule)
    }

    /// List the ACLs of `path` with user qualifiers mapped back to
    /// usernames. Entries whose uid no longer resolves are skipped.
    pub async fn acl_list(
        &self,
        username: &str,
        path: &str,
    ) -> Result<Vec<AclEntry>, ClientError> {
        let acls = self.acls_for_path(username, path).await?;
        let mut entries = Vec::new();
        for mut entry in acls.into_entries() {
            if entry.entry_type == acl::TYPE_USER {
                let resolved = entry
                    .qualifier
                    .parse::<u64>()
                    .map_err(|e| ClientError::InvalidInput(e.to_string()))
                    .and_then(|uid| self.resolver.username_for_uid(uid));
                match resolved {
                    Ok(name) => entry.qualifier = name,
                    Err(err) => {
                        warn!(path, qualifier = %entry.qualifier, error = %err, "cannot map acl qualifier to name");
                        continue;
                    }
                }
            }
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Add or update an ACL entry via read-modify-write. User qualifiers
    /// are resolved to uid before the rule is written.
    pub async fn acl_modify(
        &self,
        username: &str,
        path: &str,
        entry: &AclEntry,
    ) -> Result<(), ClientError> {
        let mut acls = self.acls_for_path(username, path).await?;
        let qualifier = self.storage_qualifier(entry)?;
        acls.set(&entry.entry_type, &qualifier, &entry.permissions)?;
        self.write_acls(username, path, &acls).await
    }

    /// Remove an ACL entry via read-modify-write.
    pub async fn acl_delete(
        &self,
        username: &str,
        path: &str,
        entry_type: &str,
        qualifier: &str,
    ) -> Result<(), ClientError> {
        let mut acls = self.acls_for_path(username, path).await?;
        let qualifier = if entry_type == acl::TYPE_USER {
            self.resolver.uid_for_username(qualifier)?.to_string()
        } else {
            qualifier.to_string()
        };
        acls.delete(entry_type, &qualifier);
        self.write_acls(username, path, &acls).await
    }

    /// Fetch a single ACL entry by (type, qualifier).
    pub async fn acl_get(
        &self,
        username: &str,
        path: &str,
        entry_type: &str,
        qualifier: &str,
    ) -> Result<AclEntry, ClientError> {
        let entries = self.acl_list(username, path).await?;
        entries
            .into_iter()
            .find(|e| e.entry_type == entry_type && e.qualifier == qualifier)
            .ok_or_else(|| ClientError::NotFound(format!("{entry_type}:{qualifier}")))
    }

    fn storage_qualifier(&self, entry: &AclEntry) -> Result<String, ClientError> {
        if entry.entry_type == acl::TYPE_USER {
            Ok(self.resolver.uid_for_username(&entry.qualifier)?.to_string())
        } else {
            Ok(entry.qualifier.clone())
        }
    }

    async fn write_acls(
        &self,
        username: &str,
        path: &str,
        acls: &Acls,
    ) -> Result<(), ClientError> {
        let identity = self.resolver.resolve(username)?;
        let rq = self.ns_request(
            identity,
            ns_request::Command::Acl(AclRequest {
                id: Some(Self::path_id(path)),
                cmd: AclCommand::Modify as i32,
                r#type: AclType::SysAcl as i32,
                recursive: true,
                rule: acls.serialize(),
            }),
        );
        self.exec("acl_modify", username, path, rq).await.map(|_| ())
    }
}

/// The backend returns the listed directory itself as one of the find
/// records; compare after trailing-slash normalization.
fn is_parent_entry(dir_path: &str, fi: &FileInfo) -> bool {
    fi.path == strip_trailing_slash(dir_path)
}

/// Map a non-zero backend errno onto the error taxonomy.
fn map_backend_errno(code: i64, msg: &str) -> ClientError {
    let desc = format!("backend errno {code}: {msg}");
    match code {
        2 => ClientError::NotFound(desc),
        1 | 13 => ClientError::PermissionDenied(desc),
        22 => ClientError::InvalidInput(desc),
        38 => ClientError::Unimplemented(desc),
        110 => ClientError::Timeout(desc),
        _ => ClientError::Internal(desc),
    }
}

/// Convert one metadata record into a `FileInfo`. The presence of the
/// container record decides `is_dir`.
pub(crate) fn md_response_to_file_info(
    resp: &MdResponse,
    instance: &str,
) -> Result<FileInfo, ClientError> {
    fn attr_map(
        xattrs: &std::collections::HashMap<String, Vec<u8>>,
    ) -> std::collections::HashMap<String, String> {
        xattrs
            .iter()
            .map(|(k, v)| (k.clone(), String::from_utf8_lossy(v).into_owned()))
            .collect()
    }

    fn record_path(path: &[u8], name: &[u8]) -> String {
        let raw = if path.is_empty() { name } else { path };
        strip_trailing_slash(&String::from_utf8_lossy(raw)).to_string()
    }

    if let Some(fmd) = &resp.fmd {
        let attrs = attr_map(&fmd.xattrs);
        let mtime = fmd.mtime.clone().unwrap_or_default();
        let etag = if fmd.etag.is_empty() {
            attrs.get("etag").cloned().unwrap_or_default()
        } else {
            fmd.etag.clone()
        };
        Ok(FileInfo {
            is_dir: false,
            inode: fmd.id,
            file_id: fmd.id,
            uid: fmd.uid,
            gid: fmd.gid,
            size: fmd.size,
            tree_size: 0,
            tree_count: 0,
            mtime_sec: mtime.sec,
            mtime_nanos: mtime.n_sec as u32,
            path: record_path(&fmd.path, &fmd.name),
            etag,
            instance: instance.to_string(),
            sys_acl: attrs.get("sys.acl").cloned().unwrap_or_default(),
            attrs,
        })
    } else if let Some(cmd) = &resp.cmd {
        let attrs = attr_map(&cmd.xattrs);
        let mtime = cmd.mtime.clone().unwrap_or_default();
        let etag = if cmd.etag.is_empty() {
            attrs.get("etag").cloned().unwrap_or_default()
        } else {
            cmd.etag.clone()
        };
        Ok(FileInfo {
            is_dir: true,
            inode: cmd.id,
            file_id: cmd.id,
            uid: cmd.uid,
            gid: cmd.gid,
            size: 0,
            tree_size: cmd.tree_size,
            tree_count: cmd.files + cmd.containers,
            mtime_sec: mtime.sec,
            mtime_nanos: mtime.n_sec as u32,
            path: record_path(&cmd.path, &cmd.name),
            etag,
            instance: instance.to_string(),
            sys_acl: attrs.get("sys.acl").cloned().unwrap_or_default(),
            attrs,
        })
    } else {
        Err(ClientError::InvalidResponse(
            "metadata response without file or container record".to_string(),
        ))
    }
}
