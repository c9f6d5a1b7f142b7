use nix::unistd::{self, Gid, Uid, User};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum PrivilegeError {
    #[error("failed to look up user {username}: {source}")]
    Lookup {
        username: String,
        #[source]
        source: nix::Error,
    },
    #[error("failed to look up user {0}: no such user")]
    UnknownUser(String),
    #[error("failed to setgid {gid}: {source}")]
    SetGid {
        gid: Gid,
        #[source]
        source: nix::Error,
    },
    #[error("failed to setuid {uid}: {source}")]
    SetUid {
        uid: Uid,
        #[source]
        source: nix::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Account {
    pub uid: Uid,
    pub gid: Gid,
}

/// Process identity operations of the operating system.
pub trait Identity {
    fn effective_uid(&self) -> Uid;
    fn effective_gid(&self) -> Gid;
    fn lookup_user(&self, username: &str) -> nix::Result<Option<Account>>;
    fn set_gid(&self, gid: Gid) -> nix::Result<()>;
    fn set_uid(&self, uid: Uid) -> nix::Result<()>;
}

pub struct SystemIdentity;

impl Identity for SystemIdentity {
    fn effective_uid(&self) -> Uid {
        unistd::geteuid()
    }

    fn effective_gid(&self) -> Gid {
        unistd::getegid()
    }

    fn lookup_user(&self, username: &str) -> nix::Result<Option<Account>> {
        Ok(User::from_name(username)?.map(|user| Account {
            uid: user.uid,
            gid: user.gid,
        }))
    }

    fn set_gid(&self, gid: Gid) -> nix::Result<()> {
        unistd::setgid(gid)
    }

    fn set_uid(&self, uid: Uid) -> nix::Result<()> {
        unistd::setuid(uid)
    }
}

/// Permanently switches to `username` when running as root. Returns whether a switch happened.
pub fn drop_if_privileged<I: Identity>(
    identity: &I,
    username: &str,
) -> Result<bool, PrivilegeError> {
    if !identity.effective_uid().is_root() {
        return Ok(false);
    }

    let account = identity
        .lookup_user(username)
        .map_err(|source| PrivilegeError::Lookup {
            username: username.to_string(),
            source,
        })?
        .ok_or_else(|| PrivilegeError::UnknownUser(username.to_string()))?;
    debug!(
        "Dropping privileges to user {} (UID {}, GID {})",
        username, account.uid, account.gid
    );

    // group first, a non-root user may no longer change it
    identity
        .set_gid(account.gid)
        .map_err(|source| PrivilegeError::SetGid {
            gid: account.gid,
            source,
        })?;
    identity
        .set_uid(account.uid)
        .map_err(|source| PrivilegeError::SetUid {
            uid: account.uid,
            source,
        })?;

    Ok(true)
}
