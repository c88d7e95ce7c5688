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

//! NTLM authentication (security type 4).
//!
//! The NTLMSSP messages themselves come from the `sspi` crate's NTLM
//! client. This module only carries them over the RFB stream, each token in
//! a frame prefixed with a big-endian u32 length:
//!
//! 1. client → `NEGOTIATE_MESSAGE`
//! 2. server → `CHALLENGE_MESSAGE`
//! 3. client → `AUTHENTICATE_MESSAGE`
//!
//! The caller reads `SecurityResult` afterwards.

use sspi::{
    AuthIdentity, AuthIdentityBuffers, BufferType, ClientRequestFlags, CredentialUse,
    DataRepresentation, Ntlm, SecurityBuffer, SecurityStatus, Sspi, SspiImpl, Username,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::Credentials;
use crate::error::{Result, VncError};

/// Largest frame accepted from the server.
const MAX_FRAME_LENGTH: usize = 64 * 1024;

fn sspi_error(err: &sspi::Error) -> VncError {
    VncError::Authentication(format!("NTLM: {err}"))
}

/// Client half of an NTLM exchange.
struct NtlmClient {
    ntlm: Ntlm,
    credentials: Option<AuthIdentityBuffers>,
}

impl NtlmClient {
    fn new(username: &str, password: &str, domain: &str) -> Result<Self> {
        let identity = AuthIdentity {
            username: Username::new(username, Some(domain))
                .map_err(|e| VncError::Authentication(format!("NTLM: invalid username: {e}")))?,
            password: password.to_string().into(),
        };

        let mut ntlm = Ntlm::new();
        let acquired = ntlm
            .acquire_credentials_handle()
            .with_credential_use(CredentialUse::Outbound)
            .with_auth_data(&identity)
            .execute(&mut ntlm)
            .map_err(|e| sspi_error(&e))?;

        Ok(Self {
            ntlm,
            credentials: acquired.credentials_handle,
        })
    }

    /// Feeds `input` (empty on the first step) and returns the next token.
    fn step(&mut self, input: Vec<u8>) -> Result<(SecurityStatus, Vec<u8>)> {
        let mut input = vec![SecurityBuffer::new(input, BufferType::Token)];
        let mut output = vec![SecurityBuffer::new(Vec::new(), BufferType::Token)];

        let mut builder = self
            .ntlm
            .initialize_security_context()
            .with_credentials_handle(&mut self.credentials)
            .with_context_requirements(
                ClientRequestFlags::CONFIDENTIALITY | ClientRequestFlags::ALLOCATE_MEMORY,
            )
            .with_target_data_representation(DataRepresentation::Native)
            .with_input(&mut input)
            .with_output(&mut output);

        let result = self
            .ntlm
            .initialize_security_context_impl(&mut builder)
            .and_then(|mut generator| generator.resolve_to_result())
            .map_err(|e| sspi_error(&e))?;

        let token = output
            .pop()
            .map(|buffer| buffer.buffer)
            .unwrap_or_default();
        Ok((result.status, token))
    }
}

async fn write_frame<S: AsyncWrite + Unpin>(stream: &mut S, payload: &[u8]) -> Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| VncError::Protocol("NTLM frame too large".to_string()))?;
    stream.write_u32(len).await?;
    stream.write_all(payload).await?;
    stream.flush().await?;
    Ok(())
}

async fn read_frame<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Vec<u8>> {
    let len = stream.read_u32().await? as usize;
    if len > MAX_FRAME_LENGTH {
        return Err(VncError::Protocol(format!("NTLM frame of {len} bytes exceeds limit")));
    }
    let mut frame = vec![0u8; len];
    stream.read_exact(&mut frame).await?;
    Ok(frame)
}

/// Runs the NTLM exchange.
///
/// # Errors
///
/// Fails with [`VncError::Authentication`] when username or password is
/// missing or the server's challenge is rejected by the NTLM client.
pub async fn authenticate<S>(stream: &mut S, credentials: &Credentials) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (Some(username), Some(password)) =
        (credentials.username.as_deref(), credentials.password.as_deref())
    else {
        return Err(VncError::Authentication(
            "NTLM authentication requires both username and password".to_string(),
        ));
    };

    let mut client = NtlmClient::new(username, password, credentials.domain_or_default())?;

    let (status, negotiate) = client.step(Vec::new())?;
    if status != SecurityStatus::ContinueNeeded {
        return Err(VncError::Authentication(format!(
            "NTLM: unexpected status {status:?} after negotiate"
        )));
    }
    write_frame(stream, &negotiate).await?;

    let challenge = read_frame(stream).await?;
    log::debug!("NTLM challenge received ({} bytes)", challenge.len());

    let (status, authenticate) = client.step(challenge)?;
    log::debug!("NTLM authenticate message ready ({status:?})");
    write_frame(stream, &authenticate).await
}
