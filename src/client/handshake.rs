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

//! The RFB handshake from the client's side.
//!
//! Runs over any byte stream: version negotiation, security negotiation,
//! `ClientInit`/`ServerInit`, then the initial `SetPixelFormat`,
//! `SetEncodings` and full `FramebufferUpdateRequest`.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

use super::ConnectionState;
use crate::auth::SecurityType;
use crate::config::{ConnectionOptions, Credentials};
use crate::error::{Result, VncError};
use crate::protocol::{
    read_string, ClientMessage, PixelFormat, ProtocolVersion, SecurityFlow, ServerInit,
    ENCODING_DESKTOP_SIZE, SECURITY_RESULT_OK, VERSION_LENGTH,
};

/// What the handshake established.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub version: ProtocolVersion,
    pub security: SecurityType,
    pub server_init: ServerInit,
    pub pixel_format: PixelFormat,
}

/// Reads the server's version string and echoes it back.
///
/// Nothing is written when the version is not supported.
pub(crate) async fn negotiate_version<S>(stream: &mut S) -> Result<ProtocolVersion>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut announced = [0u8; VERSION_LENGTH];
    stream.read_exact(&mut announced).await?;

    let version = ProtocolVersion::from_bytes(&announced).ok_or_else(|| {
        VncError::VersionMismatch(String::from_utf8_lossy(&announced).into_owned())
    })?;

    stream.write_all(version.as_bytes()).await?;
    stream.flush().await?;
    log::info!("Negotiated {version}");
    Ok(version)
}

/// Selects and runs a security type, then reads `SecurityResult` where the
/// version requires it.
pub(crate) async fn negotiate_security<S>(
    stream: &mut S,
    version: ProtocolVersion,
    credentials: &Credentials,
) -> Result<SecurityType>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let flow = version.security_flow();

    let security = if flow == SecurityFlow::ServerChosen {
        let id = stream.read_u32().await?;
        if id == 0 {
            let reason = read_string(stream).await?;
            return Err(VncError::Connection(format!("VNC security error: {reason}")));
        }
        SecurityType::select(&[id], credentials)?
    } else {
        let count = stream.read_u8().await?;
        if count == 0 {
            let reason = read_string(stream).await?;
            return Err(VncError::Connection(format!("VNC security error: {reason}")));
        }
        let mut offered = vec![0u8; usize::from(count)];
        stream.read_exact(&mut offered).await?;
        log::debug!("Available security types: {offered:?}");

        let offered: Vec<u32> = offered.into_iter().map(u32::from).collect();
        let security = SecurityType::select(&offered, credentials)?;
        stream.write_u8(security.id()).await?;
        stream.flush().await?;
        security
    };

    log::info!("Using {security} authentication");
    security.authenticate(stream, credentials).await?;

    // 3.3 and 3.7 send no SecurityResult after None
    let expects_result =
        security != SecurityType::None || flow == SecurityFlow::ClientChosenWithReason;
    if expects_result {
        let result = stream.read_u32().await?;
        if result != SECURITY_RESULT_OK {
            let reason = if flow == SecurityFlow::ClientChosenWithReason {
                read_string(stream).await?
            } else {
                "security handshake rejected".to_string()
            };
            return Err(VncError::Authentication(reason));
        }
    }

    log::debug!("Authentication successful");
    Ok(security)
}

/// Exchanges `ClientInit`/`ServerInit` and sends the initial requests.
pub(crate) async fn initialise<S>(
    stream: &mut S,
    options: &ConnectionOptions,
) -> Result<(ServerInit, PixelFormat)>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_u8(u8::from(options.shared)).await?;
    stream.flush().await?;

    let server_init = ServerInit::read_from(stream).await?;
    log::info!(
        "Server init: {}x{}, name: {:?}",
        server_init.framebuffer_width,
        server_init.framebuffer_height,
        server_init.name
    );
    log::debug!("Server pixel format: {:?}", server_init.pixel_format);

    let pixel_format = PixelFormat::rgb888();
    let mut encodings = options.encodings.clone();
    if !encodings.contains(&ENCODING_DESKTOP_SIZE) {
        encodings.push(ENCODING_DESKTOP_SIZE);
    }

    let mut buf = BytesMut::new();
    ClientMessage::SetPixelFormat(pixel_format.clone()).write_to(&mut buf);
    ClientMessage::SetEncodings(encodings).write_to(&mut buf);
    ClientMessage::FramebufferUpdateRequest {
        incremental: false,
        x: 0,
        y: 0,
        width: server_init.framebuffer_width,
        height: server_init.framebuffer_height,
    }
    .write_to(&mut buf);
    stream.write_all(&buf).await?;
    stream.flush().await?;

    Ok((server_init, pixel_format))
}

/// Runs the full handshake, publishing state transitions as it goes.
pub(crate) async fn handshake<S>(
    stream: &mut S,
    options: &ConnectionOptions,
    state: &watch::Sender<ConnectionState>,
) -> Result<Session>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    state.send_replace(ConnectionState::NegotiatingVersion);
    let version = negotiate_version(stream).await?;

    state.send_replace(ConnectionState::Authenticating);
    let security = negotiate_security(stream, version, &options.credentials).await?;

    let (server_init, pixel_format) = initialise(stream, options).await?;
    Ok(Session {
        version,
        security,
        server_init,
        pixel_format,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::vnc::encrypt_challenge;
    use tokio_test::io::Builder;

    fn reason(text: &str) -> Vec<u8> {
        let mut bytes = u32::try_from(text.len()).unwrap().to_be_bytes().to_vec();
        bytes.extend_from_slice(text.as_bytes());
        bytes
    }

    #[tokio::test]
    async fn test_version_echoed_verbatim() {
        for version in ProtocolVersion::SUPPORTED {
            let mut mock = Builder::new()
                .read(version.as_bytes())
                .write(version.as_bytes())
                .build();
            assert_eq!(negotiate_version(&mut mock).await.unwrap(), version);
        }
    }

    #[tokio::test]
    async fn test_version_mismatch_sends_nothing() {
        let mut mock = Builder::new().read(b"RFB 004.000\n").build();
        match negotiate_version(&mut mock).await {
            Err(VncError::VersionMismatch(announced)) => assert_eq!(announced, "RFB 004.000\n"),
            other => panic!("expected VersionMismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_none_security_v38_reads_result() {
        let mut mock = Builder::new()
            .read(&[1, 1])
            .write(&[1])
            .read(&[0, 0, 0, 0])
            .build();
        let security =
            negotiate_security(&mut mock, ProtocolVersion::V3_8, &Credentials::default())
                .await
                .unwrap();
        assert_eq!(security, SecurityType::None);
    }

    #[tokio::test]
    async fn test_none_security_v37_skips_result() {
        let mut mock = Builder::new().read(&[2, 2, 1]).write(&[1]).build();
        let security =
            negotiate_security(&mut mock, ProtocolVersion::V3_7, &Credentials::default())
                .await
                .unwrap();
        assert_eq!(security, SecurityType::None);
    }

    #[tokio::test]
    async fn test_legacy_server_chosen_none() {
        let mut mock = Builder::new().read(&[0, 0, 0, 1]).build();
        let security =
            negotiate_security(&mut mock, ProtocolVersion::V3_3, &Credentials::default())
                .await
                .unwrap();
        assert_eq!(security, SecurityType::None);
    }

    #[tokio::test]
    async fn test_legacy_server_refusal() {
        let mut mock = Builder::new()
            .read(&[0, 0, 0, 0])
            .read(&reason("too many connections"))
            .build();
        let err = negotiate_security(&mut mock, ProtocolVersion::V3_6, &Credentials::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("too many connections"));
    }

    #[tokio::test]
    async fn test_vnc_auth_failure_reason() {
        let challenge = [7u8; 16];
        let response = encrypt_challenge(&challenge, "wrong").unwrap();
        let mut mock = Builder::new()
            .read(&[1, 2])
            .write(&[2])
            .read(&challenge)
            .write(&response)
            .read(&[0, 0, 0, 1])
            .read(&reason("bad password"))
            .build();
        let credentials = Credentials {
            password: Some("wrong".to_string()),
            ..Credentials::default()
        };
        match negotiate_security(&mut mock, ProtocolVersion::V3_8, &credentials).await {
            Err(VncError::Authentication(text)) => assert_eq!(text, "bad password"),
            other => panic!("expected Authentication, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_security_list() {
        let mut mock = Builder::new().read(&[0]).read(&reason("nope")).build();
        let err = negotiate_security(&mut mock, ProtocolVersion::V3_8, &Credentials::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VncError::Connection(_)));
    }

    #[tokio::test]
    async fn test_initialise_messages() {
        let init = ServerInit {
            framebuffer_width: 640,
            framebuffer_height: 480,
            pixel_format: PixelFormat::rgb565(),
            name: "desk".to_string(),
        };
        let mut init_bytes = BytesMut::new();
        init.write_to(&mut init_bytes);

        let mut expected = BytesMut::new();
        ClientMessage::SetPixelFormat(PixelFormat::rgb888()).write_to(&mut expected);
        ClientMessage::SetEncodings(vec![16, 5, 1, 0, ENCODING_DESKTOP_SIZE]).write_to(&mut expected);
        ClientMessage::FramebufferUpdateRequest {
            incremental: false,
            x: 0,
            y: 0,
            width: 640,
            height: 480,
        }
        .write_to(&mut expected);

        let mut mock = Builder::new()
            .write(&[1])
            .read(&init_bytes)
            .write(&expected)
            .build();
        let options = ConnectionOptions::new("host");
        let (server_init, format) = initialise(&mut mock, &options).await.unwrap();
        assert_eq!(server_init.name, "desk");
        assert_eq!(format, PixelFormat::rgb888());
    }
}
