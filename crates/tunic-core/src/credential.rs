//! Relay user credential.

use rand::RngExt;
use uuid::Uuid;

/// Length of the generated password, in hex characters.
pub const PASSWORD_LEN: usize = 16;

/// A relay user: UUID-shaped username plus a hex password.
///
/// Generated once per install and persisted inside the server runtime config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    /// Generate a fresh credential.
    pub fn generate() -> Self {
        const HEX: &[u8] = b"0123456789abcdef";
        let mut rng = rand::rng();
        let password = (0..PASSWORD_LEN)
            .map(|_| HEX[rng.random_range(0..HEX.len())] as char)
            .collect();
        Self {
            username: Uuid::new_v4().to_string(),
            password,
        }
    }

    /// Whether both halves have the shape a generated credential has.
    pub fn is_well_formed(&self) -> bool {
        Uuid::parse_str(&self.username).is_ok()
            && self.password.len() == PASSWORD_LEN
            && self.password.bytes().all(|b| b.is_ascii_hexdigit())
    }
}
