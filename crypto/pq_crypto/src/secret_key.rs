use crate::{Error, SECRET_KEY_BYTES_LEN};

/// Secret key material handed to a [`crate::Signer`].
///
/// Never serialized and never printed.
#[derive(Clone, PartialEq)]
pub struct SecretKey {
    bytes: [u8; SECRET_KEY_BYTES_LEN],
}

impl SecretKey {
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != SECRET_KEY_BYTES_LEN {
            return Err(Error::InvalidSecretKey);
        }
        let mut key = [0; SECRET_KEY_BYTES_LEN];
        key.copy_from_slice(bytes);
        Ok(Self { bytes: key })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretKey(<redacted>)")
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.bytes.iter_mut().for_each(|b| *b = 0);
    }
}
