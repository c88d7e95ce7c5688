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

//! # rustvncclient
//!
//! A pure Rust VNC (RFB) client for driving automated input against a
//! remote screen.
//!
//! The client negotiates any of the RFB 3.3, 3.6, 3.7, 3.8 and 3.889
//! protocol versions, authenticates, keeps a local copy of the remote
//! framebuffer, and sends pointer and keyboard events. On top of that,
//! [`RemoteDevice`] maps high-level automation actions (tap, type, scroll,
//! drag) onto timed protocol events.
//!
//! ## Features
//!
//! - **Security types**: None, VNC password (DES), NTLMv2 and Apple Remote
//!   Desktop (Diffie-Hellman + AES-128)
//! - **Encodings**: Raw, CopyRect, Hextile, ZRLE and the DesktopSize
//!   pseudo-encoding
//! - **Screenshots**: RGBA snapshots, PNG and base64 data URIs (`png`
//!   feature, on by default)
//! - **Async I/O**: Built on Tokio; a background task keeps the framebuffer
//!   current
//!
//! ## Quick Start
//!
//! ```no_run
//! use rustvncclient::{ConnectionOptions, Transport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ConnectionOptions::new("192.168.1.20").with_password("secret");
//!     let transport = Transport::new(options);
//!     transport.connect().await?;
//!
//!     let image = transport.screenshot().await?;
//!     println!("{}x{}", image.width, image.height);
//!
//!     transport.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │      Automation layer (external)        │
//! └──────────────────┬──────────────────────┘
//!                    │ action_space / call_action
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │           RemoteDevice                  │
//! │                                         │
//! │  • Tap, Input, Scroll, KeyboardPress... │
//! │  • Custom actions                       │
//! └──────────────────┬──────────────────────┘
//!                    │ pointer / key events, screenshots
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │           Transport                     │
//! │                                         │
//! │  • Handshake and security handlers      │
//! │  • Reader task and decoders             │
//! │  • Framebuffer                          │
//! └──────────────────┬──────────────────────┘
//!                    │ TCP
//!                    ▼
//!               VNC server
//! ```

#![warn(clippy::all)]

pub mod auth;
pub mod client;
pub mod config;
pub mod device;
pub mod encoding;
pub mod error;
pub mod events;
pub mod framebuffer;
pub mod keysym;
pub mod protocol;
pub mod translate;

#[cfg(test)]
mod testing;

// Re-exports
pub use auth::SecurityType;
pub use client::{probe, ConnectionState, ProbeResult, Transport};
pub use config::{ConnectionOptions, Credentials};
pub use device::{CustomAction, DeviceAction, DeviceOptions, LocatedElement, RemoteDevice};
pub use error::{Result, VncError};
pub use events::ClientEvent;
pub use framebuffer::{Framebuffer, RgbaImage};
pub use protocol::{PixelFormat, ProtocolVersion};

/// Default VNC port.
pub const DEFAULT_PORT: u16 = 5900;
