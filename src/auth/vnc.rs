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

//! VNC Authentication (security type 2).
//!
//! The server sends a random 16-byte challenge. The client DES-encrypts it
//! with the password as key and sends the 16-byte result back. VNC reverses
//! the bit order of every key byte before use, and the password is truncated
//! or zero-padded to exactly 8 bytes.

use des::cipher::generic_array::GenericArray;
use des::cipher::{BlockEncrypt, KeyInit};
use des::Des;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::Credentials;
use crate::error::{Result, VncError};

/// Length of the challenge and of the response.
pub const CHALLENGE_LENGTH: usize = 16;

/// Encrypts a VNC authentication challenge with `password`.
///
/// # Errors
///
/// Returns [`VncError::Authentication`] if the DES key cannot be built.
pub fn encrypt_challenge(
    challenge: &[u8; CHALLENGE_LENGTH],
    password: &str,
) -> Result<[u8; CHALLENGE_LENGTH]> {
    let mut key = [0u8; 8];
    for (slot, byte) in key.iter_mut().zip(password.as_bytes()) {
        *slot = byte.reverse_bits();
    }

    let cipher = Des::new_from_slice(&key)
        .map_err(|e| VncError::Authentication(format!("invalid DES key: {e}")))?;
    key.fill(0);

    let mut response = *challenge;
    for block in response.chunks_exact_mut(8) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
    Ok(response)
}

/// Runs the VNC authentication exchange.
///
/// # Errors
///
/// Fails with [`VncError::Authentication`] when no password was supplied, or
/// with an I/O error if the stream breaks.
pub async fn authenticate<S>(stream: &mut S, credentials: &Credentials) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let password = credentials.password.as_deref().ok_or_else(|| {
        VncError::Authentication(
            "VNC server requires authentication but no password was provided".to_string(),
        )
    })?;

    let mut challenge = [0u8; CHALLENGE_LENGTH];
    stream.read_exact(&mut challenge).await?;
    log::debug!("Received VNC auth challenge");

    let response = encrypt_challenge(&challenge, password)?;
    stream.write_all(&response).await?;
    stream.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHALLENGE: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];

    #[test]
    fn test_reference_vectors() {
        assert_eq!(
            encrypt_challenge(&CHALLENGE, "password").unwrap(),
            [
                0xb8, 0x66, 0x92, 0x41, 0x25, 0xc8, 0xee, 0xbb, 0x9d, 0xeb, 0xc1, 0xdb, 0x61,
                0xc5, 0x38, 0xe2
            ]
        );
        assert_eq!(
            encrypt_challenge(&CHALLENGE, "abc").unwrap(),
            [
                0x9c, 0x22, 0xb4, 0xf2, 0x08, 0x8c, 0x34, 0x65, 0xa1, 0x56, 0x2c, 0x4b, 0x9d,
                0x6e, 0xdb, 0x04
            ]
        );
    }

    #[test]
    fn test_password_truncated_to_eight_bytes() {
        assert_eq!(
            encrypt_challenge(&CHALLENGE, "password").unwrap(),
            encrypt_challenge(&CHALLENGE, "password-that-is-longer").unwrap()
        );
    }

    #[tokio::test]
    async fn test_exchange_writes_response() {
        let expected = encrypt_challenge(&CHALLENGE, "abc").unwrap();
        let mut mock = tokio_test::io::Builder::new()
            .read(&CHALLENGE)
            .write(&expected)
            .build();
        let credentials = Credentials {
            password: Some("abc".to_string()),
            ..Credentials::default()
        };
        authenticate(&mut mock, &credentials).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_password() {
        let mut mock = tokio_test::io::Builder::new().build();
        let err = authenticate(&mut mock, &Credentials::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VncError::Authentication(_)));
    }
}
