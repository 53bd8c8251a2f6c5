use sha1::{Digest, Sha1};

/// Lower-case hex SHA-1 digest of `input`.
///
/// Only used for third-party request signatures that mandate SHA-1; never for
/// credentials.
pub fn sha1_hex(input: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}
