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

//! Connection and device configuration.

use std::fmt;
use std::time::Duration;

use crate::error::{Result, VncError};
use crate::protocol::{ENCODING_COPYRECT, ENCODING_HEXTILE, ENCODING_RAW, ENCODING_ZRLE};
use crate::DEFAULT_PORT;

/// Default time allowed for the whole connect sequence.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Default time to wait for a framebuffer update after a request.
pub const DEFAULT_SCREENSHOT_TIMEOUT: Duration = Duration::from_millis(5_000);

/// NTLM domain used when none is configured.
pub const DEFAULT_NTLM_DOMAIN: &str = "WORKGROUP";

/// Encodings advertised when none are configured, most preferred first.
pub const DEFAULT_ENCODINGS: [i32; 4] =
    [ENCODING_ZRLE, ENCODING_HEXTILE, ENCODING_COPYRECT, ENCODING_RAW];

/// Credentials handed to a security handler.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Account name (ARD, NTLM).
    pub username: Option<String>,
    /// Password (VNC, ARD, NTLM).
    pub password: Option<String>,
    /// NTLM domain.
    pub domain: Option<String>,
}

impl Credentials {
    /// Whether any secret was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none()
    }

    /// The NTLM domain, falling back to `WORKGROUP`.
    #[must_use]
    pub fn domain_or_default(&self) -> &str {
        self.domain.as_deref().unwrap_or(DEFAULT_NTLM_DOMAIN)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("domain", &self.domain)
            .finish()
    }
}

/// Parameters for one connection attempt.
///
/// # Example
///
/// ```
/// use rustvncclient::ConnectionOptions;
/// use std::time::Duration;
///
/// let options = ConnectionOptions::new("192.168.1.20")
///     .with_port(5901)
///     .with_credentials("admin", "hunter2")
///     .with_connect_timeout(Duration::from_secs(3));
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Server host name or address.
    pub host: String,
    /// Server TCP port.
    pub port: u16,
    /// Secrets for the security handshake.
    pub credentials: Credentials,
    /// Time allowed from TCP connect to the first framebuffer update.
    pub connect_timeout: Duration,
    /// Maximum screenshot requests per second; 0 disables throttling.
    pub fps: u32,
    /// Time allowed for a screenshot request to be answered.
    pub screenshot_timeout: Duration,
    /// `ClientInit` shared flag: leave other viewers connected.
    pub shared: bool,
    /// Encodings to advertise, most preferred first.
    pub encodings: Vec<i32>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            credentials: Credentials::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            fps: 0,
            screenshot_timeout: DEFAULT_SCREENSHOT_TIMEOUT,
            shared: true,
            encodings: DEFAULT_ENCODINGS.to_vec(),
        }
    }
}

impl ConnectionOptions {
    /// Options for `host` with every other field at its default.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the password used by VNC authentication.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.credentials.password = Some(password.into());
        self
    }

    /// Sets username and password, enabling ARD and NTLM authentication.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials.username = Some(username.into());
        self.credentials.password = Some(password.into());
        self
    }

    /// Sets the NTLM domain.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.credentials.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    #[must_use]
    pub fn with_screenshot_timeout(mut self, timeout: Duration) -> Self {
        self.screenshot_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_encodings(mut self, encodings: Vec<i32>) -> Self {
        self.encodings = encodings;
        self
    }

    #[must_use]
    pub fn with_shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }

    /// `host:port` as passed to the TCP connector.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Minimum spacing between screenshot requests, if throttled.
    #[must_use]
    pub fn frame_interval(&self) -> Option<Duration> {
        (self.fps > 0).then(|| Duration::from_secs(1) / self.fps)
    }

    /// Checks the options before a connection attempt.
    ///
    /// # Errors
    ///
    /// Returns [`VncError::Connection`] for an empty host or encoding list.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(VncError::Connection("host must not be empty".to_string()));
        }
        if self.encodings.is_empty() {
            return Err(VncError::Connection(
                "at least one encoding must be advertised".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ConnectionOptions::new("10.0.0.5");
        assert_eq!(options.port, 5900);
        assert_eq!(options.connect_timeout, Duration::from_millis(10_000));
        assert_eq!(options.screenshot_timeout, Duration::from_millis(5_000));
        assert!(options.shared);
        assert_eq!(options.encodings, vec![16, 5, 1, 0]);
        assert_eq!(options.frame_interval(), None);
        assert_eq!(options.credentials.domain_or_default(), "WORKGROUP");
        assert_eq!(options.address(), "10.0.0.5:5900");
    }

    #[test]
    fn test_validate() {
        assert!(ConnectionOptions::new(" ").validate().is_err());
        assert!(ConnectionOptions::new("host")
            .with_encodings(Vec::new())
            .validate()
            .is_err());
        assert!(ConnectionOptions::new("host").validate().is_ok());
    }

    #[test]
    fn test_frame_interval() {
        let options = ConnectionOptions::new("host").with_fps(4);
        assert_eq!(options.frame_interval(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let options = ConnectionOptions::new("host").with_credentials("alice", "s3cret");
        let rendered = format!("{:?}", options.credentials);
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("s3cret"));
    }
}
