//! Certificate bundle paths.
//!
//! The files themselves are owned by certbot; this type only names them.

use std::path::{Path, PathBuf};

/// Default certbot configuration root.
pub const LETSENCRYPT_ROOT: &str = "/etc/letsencrypt";

/// TLS certificate bundle for one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateBundle {
    pub domain: String,
    pub fullchain: PathBuf,
    pub private_key: PathBuf,
}

impl CertificateBundle {
    /// Bundle paths under `<root>/live/<domain>/`.
    pub fn new(letsencrypt_root: &Path, domain: &str) -> Self {
        let live = live_dir(letsencrypt_root, domain);
        Self {
            domain: domain.to_string(),
            fullchain: live.join("fullchain.pem"),
            private_key: live.join("privkey.pem"),
        }
    }

    /// A bundle is usable once certbot has produced both files.
    pub fn exists(&self) -> bool {
        self.fullchain.is_file() && self.private_key.is_file()
    }

    /// The `live/<domain>` directory holding both files.
    pub fn live_dir(&self) -> &Path {
        self.fullchain.parent().unwrap_or(&self.fullchain)
    }
}

/// `<root>/live/<domain>`.
pub fn live_dir(letsencrypt_root: &Path, domain: &str) -> PathBuf {
    letsencrypt_root.join("live").join(domain)
}
