//! Cursor secret and key derivation.
//!
//! A [`CursorSecret`] is derived once from a secret string and then shared
//! across any number of pagination calls. It holds two independent keys
//! derived from the SHA-256 digest of the secret:
//!
//! - an HMAC-SHA-256 key, used only to sign (it derives cursor nonces)
//! - an AES-256-GCM key, used only to encrypt and decrypt cursors
//!
//! The raw key material never leaves this module.

use std::fmt;
use std::sync::Arc;

use aes_gcm::aead::Aead;
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, KeyInit};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::Error;

/// Minimum number of characters in a secret source.
pub const MIN_SECRET_LENGTH: usize = 30;

/// Length of the HMAC-derived nonce, in bytes.
pub(crate) const NONCE_LEN: usize = 16;

/// Number of random bytes in a generated secret.
const GENERATED_SECRET_BYTES: usize = 30;

/// AES-256-GCM with a 128-bit nonce.
type CursorCipher = AesGcm<Aes256, U16>;

type HmacSha256 = Hmac<Sha256>;

struct Keys {
   signing: HmacSha256,
   cipher: CursorCipher,
}

/// Keys used to seal and open cursors.
///
/// Cheap to clone; clones share the same keys.
#[derive(Clone)]
pub struct CursorSecret {
   keys: Arc<Keys>,
}

impl CursorSecret {
   /// Derive the signing and cipher keys from a secret string.
   ///
   /// The secret must be at least [`MIN_SECRET_LENGTH`] characters. Use
   /// [`generate_secret`] (or the `generate-secret` binary) to create one.
   pub fn new(source: &str) -> Result<Self, Error> {
      let len = source.chars().count();
      if len < MIN_SECRET_LENGTH {
         return Err(Error::SecretTooShort {
            len,
            min: MIN_SECRET_LENGTH,
         });
      }

      let digest = Sha256::digest(source.as_bytes());

      let signing = <HmacSha256 as Mac>::new_from_slice(&digest)
         .map_err(|e| Error::Unexpected(format!("failed to derive signing key: {e}")))?;
      let cipher = CursorCipher::new(&digest);

      Ok(Self {
         keys: Arc::new(Keys { signing, cipher }),
      })
   }

   /// Deterministic nonce for `message`: the leading bytes of its HMAC.
   pub(crate) fn nonce_for(&self, message: &[u8]) -> [u8; NONCE_LEN] {
      let mut mac = self.keys.signing.clone();
      mac.update(message);
      let tag = mac.finalize().into_bytes();

      let mut nonce = [0u8; NONCE_LEN];
      nonce.copy_from_slice(&tag[..NONCE_LEN]);
      nonce
   }

   /// Encrypt `plaintext`, returning ciphertext with the GCM tag appended.
   pub(crate) fn seal(&self, nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
      self
         .keys
         .cipher
         .encrypt(GenericArray::from_slice(nonce), plaintext)
         .map_err(|e| Error::Unexpected(format!("cursor encryption failed: {e}")))
   }

   /// Decrypt and authenticate `ciphertext`; `None` when the nonce has the
   /// wrong length or the tag does not verify.
   pub(crate) fn open(&self, nonce: &[u8], ciphertext: &[u8]) -> Option<Vec<u8>> {
      if nonce.len() != NONCE_LEN {
         return None;
      }

      self
         .keys
         .cipher
         .decrypt(GenericArray::from_slice(nonce), ciphertext)
         .ok()
   }
}

impl fmt::Debug for CursorSecret {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str("CursorSecret(<redacted>)")
   }
}

/// Generate a random secret suitable for [`CursorSecret::new`].
///
/// 30 random bytes, URL-safe base64 without padding (40 characters).
pub fn generate_secret() -> String {
   let mut bytes = [0u8; GENERATED_SECRET_BYTES];
   rand::rng().fill_bytes(&mut bytes);
   URL_SAFE_NO_PAD.encode(bytes)
}
