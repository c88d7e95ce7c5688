// Copyright 2025 Dustin McAfee
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Apple Remote Desktop authentication (security type 30).
//!
//! Used by macOS Screen Sharing. The server sends Diffie-Hellman parameters:
//!
//! ```text
//! generator (u16) | key length (u16) | prime (key length) | server public key (key length)
//! ```
//!
//! The client derives a shared secret, uses `MD5(secret)` as an AES-128 key,
//! encrypts a 128-byte username/password block with AES-128-ECB and replies
//! with the ciphertext followed by its own public key, left-padded to the key
//! length.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;
use md5::{Digest, Md5};
use num_bigint::BigUint;
use rand::RngCore;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::Credentials;
use crate::error::{Result, VncError};

/// Size of the encrypted credential block.
pub const CREDENTIAL_BLOCK_LENGTH: usize = 128;

/// Size of each of the username and password fields.
const FIELD_LENGTH: usize = 64;

/// Longest key length accepted from the server (8192-bit DH).
pub const MAX_KEY_LENGTH: usize = 1024;

/// Diffie-Hellman state for one handshake.
///
/// Secret material is zeroed on drop.
struct DhHandshake {
    generator: BigUint,
    prime: BigUint,
    private_key: Vec<u8>,
}

impl DhHandshake {
    fn new(generator: u16, prime: &[u8]) -> Result<Self> {
        let prime = BigUint::from_bytes_be(prime);
        if prime <= BigUint::from(2u32) {
            return Err(VncError::Authentication(
                "ARD server sent an invalid Diffie-Hellman prime".to_string(),
            ));
        }

        let mut private_key = vec![0u8; prime.to_bytes_be().len()];
        rand::thread_rng().fill_bytes(&mut private_key);

        Ok(Self {
            generator: BigUint::from(generator),
            prime,
            private_key,
        })
    }

    fn public_key(&self) -> BigUint {
        let exponent = BigUint::from_bytes_be(&self.private_key);
        self.generator.modpow(&exponent, &self.prime)
    }

    /// Shared secret, left-padded to `key_length` bytes.
    fn shared_secret(&self, server_public_key: &[u8], key_length: usize) -> Vec<u8> {
        let exponent = BigUint::from_bytes_be(&self.private_key);
        let peer = BigUint::from_bytes_be(server_public_key);
        left_pad(&peer.modpow(&exponent, &self.prime).to_bytes_be(), key_length)
    }
}

impl Drop for DhHandshake {
    fn drop(&mut self) {
        self.private_key.fill(0);
    }
}

/// Left-pads `bytes` with zeros to exactly `len` bytes, keeping the trailing
/// `len` bytes when the input is longer.
#[must_use]
pub fn left_pad(bytes: &[u8], len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    if bytes.len() <= len {
        out[len - bytes.len()..].copy_from_slice(bytes);
    } else {
        out.copy_from_slice(&bytes[bytes.len() - len..]);
    }
    out
}

/// Builds the 128-byte credential block.
///
/// Username and password each occupy a 64-byte null-padded field and are
/// truncated to 63 bytes so the field always ends in a null.
#[must_use]
pub fn credential_block(username: &str, password: &str) -> [u8; CREDENTIAL_BLOCK_LENGTH] {
    let mut block = [0u8; CREDENTIAL_BLOCK_LENGTH];
    for (field, value) in block.chunks_exact_mut(FIELD_LENGTH).zip([username, password]) {
        let bytes = value.as_bytes();
        let n = bytes.len().min(FIELD_LENGTH - 1);
        field[..n].copy_from_slice(&bytes[..n]);
    }
    block
}

/// Encrypts `block` in place with AES-128-ECB keyed by `MD5(shared_secret)`.
fn encrypt_credentials(block: &mut [u8; CREDENTIAL_BLOCK_LENGTH], shared_secret: &[u8]) {
    let key = Md5::digest(shared_secret);
    let cipher = Aes128::new(&key);
    for chunk in block.chunks_exact_mut(16) {
        cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
    }
}

/// Runs the ARD authentication exchange. The caller reads `SecurityResult`.
///
/// # Errors
///
/// Fails with [`VncError::Authentication`] when username or password is
/// missing or the server's parameters are invalid.
pub async fn authenticate<S>(stream: &mut S, credentials: &Credentials) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (Some(username), Some(password)) = (
        credentials.username.as_deref().filter(|u| !u.is_empty()),
        credentials.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(VncError::Authentication(
            "Apple Remote Desktop authentication requires both username and password. \
             On macOS, use the system account credentials of the target Mac."
                .to_string(),
        ));
    };

    let generator = stream.read_u16().await?;
    let key_length = usize::from(stream.read_u16().await?);
    log::debug!("ARD DH parameters: generator={generator}, key length={key_length}");

    if key_length == 0 || key_length > MAX_KEY_LENGTH {
        return Err(VncError::Authentication(format!(
            "ARD server sent invalid key length {key_length}"
        )));
    }

    let mut prime = vec![0u8; key_length];
    stream.read_exact(&mut prime).await?;
    let mut server_public_key = vec![0u8; key_length];
    stream.read_exact(&mut server_public_key).await?;

    let response = {
        let dh = DhHandshake::new(generator, &prime)?;
        let mut shared_secret = dh.shared_secret(&server_public_key, key_length);

        let mut block = credential_block(username, password);
        encrypt_credentials(&mut block, &shared_secret);
        shared_secret.fill(0);

        let mut response = Vec::with_capacity(CREDENTIAL_BLOCK_LENGTH + key_length);
        response.extend_from_slice(&block);
        response.extend_from_slice(&left_pad(&dh.public_key().to_bytes_be(), key_length));
        response
    };

    stream.write_all(&response).await?;
    stream.flush().await?;
    log::debug!("ARD response sent ({} bytes)", response.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes::cipher::BlockDecrypt;
    use tokio::io::duplex;

    /// RFC 2409 Oakley group 2, 1024-bit MODP prime.
    const GROUP2_PRIME: &str = "\
        FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1\
        29024E088A67CC74020BBEA63B139B22514A08798E3404DD\
        EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245\
        E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
        EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE65381\
        FFFFFFFFFFFFFFFF";

    fn credentials(username: &str, password: &str) -> Credentials {
        Credentials {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            domain: None,
        }
    }

    #[test]
    fn test_credential_block_layout() {
        let block = credential_block("testuser", "testpass");
        assert_eq!(&block[..8], b"testuser");
        assert!(block[8..64].iter().all(|&b| b == 0));
        assert_eq!(&block[64..72], b"testpass");
        assert!(block[72..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_credential_block_truncates_to_63_bytes() {
        let long = "x".repeat(200);
        let block = credential_block(&long, &long);
        assert_eq!(block.len(), 128);
        assert!(block[..63].iter().all(|&b| b == b'x'));
        assert_eq!(block[63], 0);
        assert!(block[64..127].iter().all(|&b| b == b'x'));
        assert_eq!(block[127], 0);
    }

    #[test]
    fn test_left_pad() {
        assert_eq!(left_pad(&[1, 2], 4), vec![0, 0, 1, 2]);
        assert_eq!(left_pad(&[1, 2, 3, 4, 5], 4), vec![2, 3, 4, 5]);
        assert_eq!(left_pad(&[], 2), vec![0, 0]);
    }

    #[tokio::test]
    async fn test_missing_username_fails_fast() {
        let (mut client, _server) = duplex(64);
        let creds = Credentials {
            password: Some("pass".to_string()),
            ..Credentials::default()
        };
        let err = authenticate(&mut client, &creds).await.unwrap_err();
        assert!(err.to_string().contains("username and password"));
    }

    #[tokio::test]
    async fn test_missing_password_fails_fast() {
        let (mut client, _server) = duplex(64);
        let creds = Credentials {
            username: Some("user".to_string()),
            ..Credentials::default()
        };
        let err = authenticate(&mut client, &creds).await.unwrap_err();
        assert!(err.to_string().contains("username and password"));
    }

    #[tokio::test]
    async fn test_rejects_invalid_key_length() {
        let mut mock = tokio_test::io::Builder::new().read(&[0, 2, 0, 0]).build();
        let err = authenticate(&mut mock, &credentials("u", "p"))
            .await
            .unwrap_err();
        assert!(matches!(err, VncError::Authentication(_)));

        let mut mock = tokio_test::io::Builder::new().read(&[0, 2, 0x04, 0x01]).build();
        let err = authenticate(&mut mock, &credentials("u", "p"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("1025"));
    }

    #[tokio::test]
    async fn test_handshake_round_trip() {
        let key_length = 128usize;
        let prime = BigUint::parse_bytes(GROUP2_PRIME.as_bytes(), 16).unwrap();
        let generator = BigUint::from(2u32);
        let server_private = BigUint::from_bytes_be(&[0x5a; 32]);
        let server_public = generator.modpow(&server_private, &prime);

        let mut message = Vec::new();
        message.extend_from_slice(&2u16.to_be_bytes());
        message.extend_from_slice(&u16::try_from(key_length).unwrap().to_be_bytes());
        message.extend_from_slice(&left_pad(&prime.to_bytes_be(), key_length));
        message.extend_from_slice(&left_pad(&server_public.to_bytes_be(), key_length));

        let (mut client, mut server) = duplex(4096);
        let client_task = tokio::spawn(async move {
            authenticate(&mut client, &credentials("testuser", "testpass")).await
        });

        server.write_all(&message).await.unwrap();
        let mut response = vec![0u8; CREDENTIAL_BLOCK_LENGTH + key_length];
        server.read_exact(&mut response).await.unwrap();
        client_task.await.unwrap().unwrap();

        // Ciphertext first, then the client's public key
        let (ciphertext, client_public) = response.split_at(CREDENTIAL_BLOCK_LENGTH);
        let shared = BigUint::from_bytes_be(client_public).modpow(&server_private, &prime);
        let key = Md5::digest(left_pad(&shared.to_bytes_be(), key_length));
        let cipher = Aes128::new(&key);

        let mut plain = ciphertext.to_vec();
        for chunk in plain.chunks_exact_mut(16) {
            cipher.decrypt_block(GenericArray::from_mut_slice(chunk));
        }
        assert_eq!(&plain[..], &credential_block("testuser", "testpass")[..]);
    }
}
