//! Request identity resolution against the host passwd database.
//!
//! Every backend operation impersonates the calling user as a (uid, gid)
//! pair. Resolution happens per request and is never cached.

use crate::error::ClientError;
use crate::options::ClientOptions;

/// A resolved unix identity injected into backend requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnixIdentity {
    pub uid: u64,
    pub gid: u64,
}

/// Maps request usernames to (uid, gid), honoring the single-user override.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    force_single_user_mode: bool,
    single_username: String,
}

impl IdentityResolver {
    pub fn new(opt: &ClientOptions) -> Self {
        Self {
            force_single_user_mode: opt.force_single_user_mode,
            single_username: opt.single_username.clone(),
        }
    }

    /// Resolve `username` to its (uid, gid). With `force_single_user_mode`
    /// the configured single username is looked up instead, whatever the
    /// input.
    pub fn resolve(&self, username: &str) -> Result<UnixIdentity, ClientError> {
        let name = if self.force_single_user_mode {
            self.single_username.as_str()
        } else {
            username
        };
        let user = users::get_user_by_name(name)
            .ok_or_else(|| ClientError::NotFound(format!("no passwd entry for user '{name}'")))?;
        Ok(UnixIdentity {
            uid: u64::from(user.uid()),
            gid: u64::from(user.primary_group_id()),
        })
    }

    /// Resolve a username to its uid. ACL qualifiers are stored numerically
    /// on Citrine backends, so callers translate before writing rules.
    pub fn uid_for_username(&self, username: &str) -> Result<u64, ClientError> {
        let user = users::get_user_by_name(username).ok_or_else(|| {
            ClientError::NotFound(format!("no passwd entry for user '{username}'"))
        })?;
        Ok(u64::from(user.uid()))
    }

    /// Reverse lookup, used when presenting numeric ACL qualifiers.
    pub fn username_for_uid(&self, uid: u64) -> Result<String, ClientError> {
        let uid = u32::try_from(uid)
            .map_err(|_| ClientError::InvalidInput(format!("uid {uid} out of range")))?;
        let user = users::get_user_by_uid(uid)
            .ok_or_else(|| ClientError::NotFound(format!("no passwd entry for uid {uid}")))?;
        Ok(user.name().to_string_lossy().into_owned())
    }
}
