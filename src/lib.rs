//! Namespace client for EOS management nodes (MGM).
//!
//! Translates high-level storage operations into two coordinated transports:
//! a gRPC metadata channel (stat, find, mkdir, unlink, chown, chmod, xattrs,
//! ACLs, touch) and a bulk data channel that ships file bytes either through
//! the xrdcopy binary staged in a local cache directory or over XrdHTTP with
//! explicit redirect handling. Every backend request impersonates the
//! calling user as a (uid, gid) pair resolved from the host passwd database.

pub mod acl;
mod client;
mod data;
mod error;
mod identity;
mod meta;
mod options;
pub mod parse;
pub mod proto;

mod process;

pub use crate::acl::{AclEntry, Acls};
pub use crate::client::Client;
pub use crate::data::http::XrdHttpClient;
pub use crate::data::{CacheFile, XrdcopyTransport};
pub use crate::error::ClientError;
pub use crate::identity::{IdentityResolver, UnixIdentity};
pub use crate::meta::{AttrType, Attribute, MetaTransport};
pub use crate::options::{ClientOptions, HttpOptions};
pub use crate::parse::{DeletedEntry, FileInfo};
pub use crate::process::CommandRunner;
