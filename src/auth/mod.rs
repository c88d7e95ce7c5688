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

//! Security type selection and the per-type authentication handlers.
//!
//! | Type | Name                  | Credentials needed   |
//! |------|-----------------------|----------------------|
//! | 1    | None                  | -                    |
//! | 2    | VNC Authentication    | password             |
//! | 4    | NTLM                  | username, password   |
//! | 30   | Apple Remote Desktop  | username, password   |
//!
//! Handlers only run the type-specific exchange; reading `SecurityResult`
//! is left to the caller because its framing depends on the protocol version.

pub mod ard;
pub mod ntlm;
pub mod vnc;

use std::fmt;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::Credentials;
use crate::error::{Result, VncError};
use crate::protocol::{
    SECURITY_TYPE_ARD, SECURITY_TYPE_NONE, SECURITY_TYPE_NTLM, SECURITY_TYPE_VNC_AUTH,
};

/// A security type this client can complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityType {
    /// No authentication.
    None,
    /// DES challenge/response.
    VncPassword,
    /// NTLMv2.
    Ntlm,
    /// Diffie-Hellman + AES-128, macOS Screen Sharing.
    Ard,
}

impl SecurityType {
    /// Preference order when credentials allow more than one type.
    const PREFERENCE: [SecurityType; 4] = [
        SecurityType::Ard,
        SecurityType::Ntlm,
        SecurityType::VncPassword,
        SecurityType::None,
    ];

    /// Maps a wire id to a supported type.
    #[must_use]
    pub fn from_id(id: u32) -> Option<Self> {
        match u8::try_from(id).ok()? {
            SECURITY_TYPE_NONE => Some(SecurityType::None),
            SECURITY_TYPE_VNC_AUTH => Some(SecurityType::VncPassword),
            SECURITY_TYPE_NTLM => Some(SecurityType::Ntlm),
            SECURITY_TYPE_ARD => Some(SecurityType::Ard),
            _ => None,
        }
    }

    /// The wire id.
    #[must_use]
    pub fn id(self) -> u8 {
        match self {
            SecurityType::None => SECURITY_TYPE_NONE,
            SecurityType::VncPassword => SECURITY_TYPE_VNC_AUTH,
            SecurityType::Ntlm => SECURITY_TYPE_NTLM,
            SecurityType::Ard => SECURITY_TYPE_ARD,
        }
    }

    /// Whether `credentials` carry what this type needs.
    #[must_use]
    pub fn is_satisfied_by(self, credentials: &Credentials) -> bool {
        match self {
            SecurityType::None => true,
            SecurityType::VncPassword => credentials.password.is_some(),
            SecurityType::Ntlm | SecurityType::Ard => {
                credentials.username.is_some() && credentials.password.is_some()
            }
        }
    }

    /// Picks the type to use from the server's offer.
    ///
    /// Without credentials `None` wins whenever offered. With credentials the
    /// strongest satisfiable type wins, in the order ARD, NTLM, VNC, None.
    ///
    /// # Errors
    ///
    /// [`VncError::Authentication`] when the server only offers types that need
    /// credentials which were not supplied, [`VncError::UnsupportedSecurityType`]
    /// when nothing offered is known.
    pub fn select(offered: &[u32], credentials: &Credentials) -> Result<Self> {
        let known: Vec<SecurityType> = offered.iter().filter_map(|&id| Self::from_id(id)).collect();

        if credentials.is_empty() && known.contains(&SecurityType::None) {
            return Ok(SecurityType::None);
        }

        if let Some(choice) = Self::PREFERENCE
            .into_iter()
            .find(|t| known.contains(t) && t.is_satisfied_by(credentials))
        {
            return Ok(choice);
        }

        match Self::PREFERENCE.into_iter().find(|t| known.contains(t)) {
            Some(SecurityType::VncPassword) => Err(VncError::Authentication(
                "VNC server requires authentication but no password was provided".to_string(),
            )),
            Some(required) => Err(VncError::Authentication(format!(
                "VNC server requires {required} authentication, which needs both username and password"
            ))),
            None => Err(VncError::UnsupportedSecurityType(offered.to_vec())),
        }
    }

    /// Runs this type's exchange over `stream`.
    ///
    /// # Errors
    ///
    /// Propagates handler failures.
    pub async fn authenticate<S>(self, stream: &mut S, credentials: &Credentials) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match self {
            SecurityType::None => Ok(()),
            SecurityType::VncPassword => vnc::authenticate(stream, credentials).await,
            SecurityType::Ntlm => ntlm::authenticate(stream, credentials).await,
            SecurityType::Ard => ard::authenticate(stream, credentials).await,
        }
    }
}

impl fmt::Display for SecurityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SecurityType::None => "None",
            SecurityType::VncPassword => "VNC",
            SecurityType::Ntlm => "NTLM",
            SecurityType::Ard => "Apple Remote Desktop",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(username: Option<&str>, password: Option<&str>) -> Credentials {
        Credentials {
            username: username.map(str::to_string),
            password: password.map(str::to_string),
            domain: None,
        }
    }

    #[test]
    fn test_none_preferred_without_credentials() {
        let choice = SecurityType::select(&[2, 1, 30], &Credentials::default()).unwrap();
        assert_eq!(choice, SecurityType::None);
    }

    #[test]
    fn test_strongest_satisfiable_type_wins() {
        let full = creds(Some("admin"), Some("secret"));
        assert_eq!(SecurityType::select(&[1, 2, 30], &full).unwrap(), SecurityType::Ard);
        assert_eq!(SecurityType::select(&[1, 2, 4], &full).unwrap(), SecurityType::Ntlm);

        let password_only = creds(None, Some("secret"));
        assert_eq!(
            SecurityType::select(&[1, 2, 30], &password_only).unwrap(),
            SecurityType::VncPassword
        );
        assert_eq!(
            SecurityType::select(&[1, 30], &password_only).unwrap(),
            SecurityType::None
        );
    }

    #[test]
    fn test_missing_credentials_are_reported() {
        let err = SecurityType::select(&[2], &Credentials::default()).unwrap_err();
        assert!(err.to_string().contains("no password was provided"));

        let err = SecurityType::select(&[30], &creds(None, Some("pw"))).unwrap_err();
        assert!(err.to_string().contains("Apple Remote Desktop"));
    }

    #[test]
    fn test_unsupported_types() {
        match SecurityType::select(&[16, 19], &Credentials::default()) {
            Err(VncError::UnsupportedSecurityType(types)) => assert_eq!(types, vec![16, 19]),
            other => panic!("expected UnsupportedSecurityType, got {other:?}"),
        }
    }

    #[test]
    fn test_id_round_trip() {
        for t in SecurityType::PREFERENCE {
            assert_eq!(SecurityType::from_id(u32::from(t.id())), Some(t));
        }
        assert_eq!(SecurityType::from_id(0x1_0001), None);
    }
}
