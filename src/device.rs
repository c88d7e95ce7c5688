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

//! Remote device: automation actions on top of a [`Transport`].
//!
//! A [`RemoteDevice`] exposes a fixed vocabulary of actions (tap, double
//! click, right click, hover, text input, scroll, key combination, drag and
//! drop, clear input) and turns each into timed pointer and key events.
//! Callers may register extra [`CustomAction`]s; they are listed after the
//! built-in actions and can never replace them.
//!
//! Actions address the screen through a [`LocatedElement`], whose `center`
//! is a point in framebuffer pixels.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::Transport;
use crate::config::ConnectionOptions;
use crate::error::{Result, VncError};
use crate::framebuffer::RgbaImage;
use crate::keysym::{self, XK_BACKSPACE, XK_CONTROL_L};
use crate::protocol::button;

const CLICK_HOLD: Duration = Duration::from_millis(50);
const DOUBLE_CLICK_INTERVAL: Duration = Duration::from_millis(80);
const INPUT_FOCUS_DELAY: Duration = Duration::from_millis(300);
const INPUT_CLEAR_DELAY: Duration = Duration::from_millis(150);
const SCROLL_STEP_DELAY: Duration = Duration::from_millis(100);
const SCROLL_COMPLETE_DELAY: Duration = Duration::from_millis(500);
const SCROLL_EDGE_REPEAT: usize = 10;
const HOVER_SETTLE: Duration = Duration::from_millis(300);
const SMOOTH_MOVE_STEPS: i32 = 8;
const SMOOTH_MOVE_DELAY: Duration = Duration::from_millis(8);
const KEY_PRESS_DELAY: Duration = Duration::from_millis(30);
const SHORT_PAUSE: Duration = Duration::from_millis(50);
const DRAG_STEP_DELAY: Duration = Duration::from_millis(100);

const DEFAULT_SCROLL_DISTANCE: f64 = 500.0;
const SCROLL_TICK_DISTANCE: f64 = 100.0;

/// Keysym of the `a` key, for select-all.
const KEY_A: u32 = 0x61;

/// A located UI element; only its center point is used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocatedElement {
    /// `[x, y]` in framebuffer pixels.
    pub center: [f64; 2],
}

impl LocatedElement {
    #[must_use]
    pub fn at(x: f64, y: f64) -> Self {
        Self { center: [x, y] }
    }

    /// Center rounded to whole pixels.
    #[allow(clippy::cast_possible_truncation)] // `as` saturates; the transport clamps
    fn point(&self) -> (i32, i32) {
        (self.center[0].round() as i32, self.center[1].round() as i32)
    }
}

/// Parameters of actions that only need a target element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocateParam {
    pub locate: Option<LocatedElement>,
}

/// How [`DeviceAction::Input`] treats existing field content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Clear the field, then type.
    #[default]
    Replace,
    /// Clear the field only.
    Clear,
    /// Type after the existing content.
    Append,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputParam {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub mode: InputMode,
    pub locate: Option<LocatedElement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScrollType {
    ScrollToTop,
    ScrollToBottom,
    ScrollToLeft,
    ScrollToRight,
    /// Scroll by a distance in one direction.
    SingleAction,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    fn button(self) -> u8 {
        match self {
            ScrollDirection::Up => button::SCROLL_UP,
            ScrollDirection::Down => button::SCROLL_DOWN,
            ScrollDirection::Left => button::SCROLL_LEFT,
            ScrollDirection::Right => button::SCROLL_RIGHT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollParam {
    pub scroll_type: Option<ScrollType>,
    pub direction: Option<ScrollDirection>,
    /// Distance in pixels; one wheel tick per 100.
    pub distance: Option<f64>,
    pub locate: Option<LocatedElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyboardPressParam {
    /// Key combination such as `"ctrl+shift+t"` or `"Enter"`.
    pub key_name: String,
    pub locate: Option<LocatedElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DragAndDropParam {
    pub from: Option<LocatedElement>,
    pub to: Option<LocatedElement>,
}

/// The built-in actions.
///
/// Serialized as `{"name": ..., "param": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "param")]
pub enum DeviceAction {
    Tap(LocateParam),
    DoubleClick(LocateParam),
    RightClick(LocateParam),
    MouseMove(LocateParam),
    Input(InputParam),
    Scroll(ScrollParam),
    KeyboardPress(KeyboardPressParam),
    DragAndDrop(DragAndDropParam),
    ClearInput(LocateParam),
}

/// Name, description and adapter alias of each built-in action.
const BUILTIN_ACTIONS: [(&str, &str, Option<&str>); 9] = [
    ("Tap", "Tap the element", Some("aiTap")),
    ("DoubleClick", "Double click the element", Some("aiDoubleClick")),
    ("RightClick", "Right click the element", Some("aiRightClick")),
    ("MouseMove", "Move the mouse to the element", Some("aiHover")),
    ("Input", "Input text into the input field", Some("aiInput")),
    ("Scroll", "Scroll the page or an element", Some("aiScroll")),
    ("KeyboardPress", "Press a key or key combination", Some("aiKeyboardPress")),
    ("DragAndDrop", "Drag an element and drop it on another", None),
    ("ClearInput", "Clear the content of an input field", None),
];

impl DeviceAction {
    /// Builds an action from its name and JSON parameters.
    ///
    /// Returns `Ok(None)` if `name` is not a built-in action.
    ///
    /// # Errors
    ///
    /// Returns [`VncError::InvalidAction`] if the parameters do not match
    /// the action, including unknown scroll types.
    pub fn from_call(name: &str, params: Value) -> Result<Option<Self>> {
        if !BUILTIN_ACTIONS.iter().any(|(builtin, _, _)| *builtin == name) {
            return Ok(None);
        }
        let params = if params.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            params
        };
        serde_json::from_value(serde_json::json!({ "name": name, "param": params }))
            .map(Some)
            .map_err(|e| VncError::InvalidAction(format!("{name}: {e}")))
    }

    /// The action's name in the action space.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            DeviceAction::Tap(_) => "Tap",
            DeviceAction::DoubleClick(_) => "DoubleClick",
            DeviceAction::RightClick(_) => "RightClick",
            DeviceAction::MouseMove(_) => "MouseMove",
            DeviceAction::Input(_) => "Input",
            DeviceAction::Scroll(_) => "Scroll",
            DeviceAction::KeyboardPress(_) => "KeyboardPress",
            DeviceAction::DragAndDrop(_) => "DragAndDrop",
            DeviceAction::ClearInput(_) => "ClearInput",
        }
    }
}

/// Entry of [`RemoteDevice::action_space`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDescriptor {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface_alias: Option<String>,
}

type ActionFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;
type ActionHandler = Arc<dyn Fn(Arc<Transport>, Value) -> ActionFuture + Send + Sync>;

/// A caller-defined action appended to the action space.
#[derive(Clone)]
pub struct CustomAction {
    name: String,
    description: String,
    handler: ActionHandler,
}

impl CustomAction {
    /// Wraps an async handler receiving the live transport and the JSON
    /// parameters of the call.
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<Transport>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            handler: Arc::new(move |transport, params| Box::pin(handler(transport, params))),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomAction")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Options for a [`RemoteDevice`].
#[derive(Debug, Clone, Default)]
pub struct DeviceOptions {
    pub connection: ConnectionOptions,
    pub custom_actions: Vec<CustomAction>,
}

impl DeviceOptions {
    #[must_use]
    pub fn new(connection: ConnectionOptions) -> Self {
        Self {
            connection,
            custom_actions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_custom_action(mut self, action: CustomAction) -> Self {
        self.custom_actions.push(action);
        self
    }
}

/// Screen size as reported to the automation layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenSize {
    pub width: u16,
    pub height: u16,
    /// Device pixel ratio; always 1 for VNC.
    pub dpr: f64,
}

/// A remote desktop driven through one VNC connection.
pub struct RemoteDevice {
    options: ConnectionOptions,
    custom_actions: Vec<CustomAction>,
    transport: Arc<Transport>,
    description: Option<String>,
    destroyed: bool,
}

impl RemoteDevice {
    /// Creates a device. Nothing connects until [`RemoteDevice::connect`].
    ///
    /// Custom actions whose names collide with a built-in or earlier custom
    /// action are skipped with a warning.
    #[must_use]
    pub fn new(options: DeviceOptions) -> Self {
        let mut seen: HashSet<String> = BUILTIN_ACTIONS
            .iter()
            .map(|(name, _, _)| (*name).to_string())
            .collect();
        let mut custom_actions = Vec::new();
        for action in options.custom_actions {
            if seen.insert(action.name.clone()) {
                custom_actions.push(action);
            } else {
                log::warn!(
                    "Skipping custom action {:?}: name already in the action space",
                    action.name
                );
            }
        }

        Self {
            transport: Arc::new(Transport::new(options.connection.clone())),
            options: options.connection,
            custom_actions,
            description: None,
            destroyed: false,
        }
    }

    /// Connects to the server and records the device description.
    ///
    /// # Errors
    ///
    /// Propagates connection errors from [`Transport::connect`].
    pub async fn connect(&mut self) -> Result<()> {
        log::info!(
            "Connecting device to {}:{}",
            self.options.host,
            self.options.port
        );
        self.transport.connect().await?;
        self.destroyed = false;

        let (width, height) = self.transport.screen_size();
        let name = self.transport.server_name().unwrap_or_default();
        let description = format!(
            "Type: VNC Remote Desktop\nServer: {}:{}\nName: {}\nScreen Size: {}x{}",
            self.options.host, self.options.port, name, width, height
        );
        log::debug!("VNC device connected:\n{description}");
        self.description = Some(description);
        Ok(())
    }

    /// Points the device at a different server.
    ///
    /// The old connection is closed before the new one is opened.
    ///
    /// # Errors
    ///
    /// Propagates connection errors for the new server.
    pub async fn retarget(&mut self, host: impl Into<String>, port: u16) -> Result<()> {
        self.transport.disconnect().await;
        self.options.host = host.into();
        self.options.port = port;
        self.transport = Arc::new(Transport::new(self.options.clone()));
        self.description = None;
        self.connect().await
    }

    /// Closes the connection. Safe to call repeatedly.
    pub async fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.transport.disconnect().await;
        log::debug!("VNC device destroyed");
    }

    #[must_use]
    pub fn describe(&self) -> &str {
        self.description.as_deref().unwrap_or("VNC Remote Device")
    }

    #[must_use]
    pub fn size(&self) -> ScreenSize {
        let (width, height) = self.transport.screen_size();
        ScreenSize {
            width,
            height,
            dpr: 1.0,
        }
    }

    /// Current screen contents.
    ///
    /// # Errors
    ///
    /// See [`Transport::screenshot`].
    pub async fn screenshot(&self) -> Result<RgbaImage> {
        self.transport.screenshot().await
    }

    /// Current screen contents as a `data:image/png;base64,` URI.
    ///
    /// # Errors
    ///
    /// See [`Transport::screenshot`]; also fails if PNG encoding fails.
    #[cfg(feature = "png")]
    pub async fn screenshot_base64(&self) -> Result<String> {
        log::debug!("Taking VNC screenshot");
        self.screenshot().await?.to_data_uri()
    }

    #[must_use]
    pub fn url(&self) -> String {
        format!("vnc://{}:{}", self.options.host, self.options.port)
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    /// Built-in actions followed by custom actions.
    #[must_use]
    pub fn action_space(&self) -> Vec<ActionDescriptor> {
        BUILTIN_ACTIONS
            .iter()
            .map(|(name, description, alias)| ActionDescriptor {
                name: (*name).to_string(),
                description: (*description).to_string(),
                interface_alias: alias.map(str::to_string),
            })
            .chain(self.custom_actions.iter().map(|action| ActionDescriptor {
                name: action.name.clone(),
                description: action.description.clone(),
                interface_alias: None,
            }))
            .collect()
    }

    /// Runs an action by name with JSON parameters.
    ///
    /// # Errors
    ///
    /// Returns [`VncError::InvalidAction`] for unknown names or bad
    /// parameters, and any error from the action itself.
    pub async fn call_action(&self, name: &str, params: Value) -> Result<()> {
        if let Some(action) = DeviceAction::from_call(name, params.clone())? {
            return self.perform(&action).await;
        }
        match self.custom_actions.iter().find(|a| a.name == name) {
            Some(custom) => (custom.handler)(Arc::clone(&self.transport), params).await,
            None => Err(VncError::InvalidAction(format!("Unknown action: {name}"))),
        }
    }

    /// Runs a built-in action.
    ///
    /// # Errors
    ///
    /// Returns [`VncError::InvalidAction`] when a required element is
    /// missing (before any input is sent) and transport errors otherwise.
    pub async fn perform(&self, action: &DeviceAction) -> Result<()> {
        log::debug!("Performing {}", action.name());
        match action {
            DeviceAction::Tap(param) => {
                let (x, y) = required(param.locate, "Element not found, cannot tap")?;
                self.move_to(x, y).await?;
                self.click(x, y, button::LEFT).await
            }
            DeviceAction::DoubleClick(param) => {
                let (x, y) = required(param.locate, "Element not found, cannot double click")?;
                self.click(x, y, button::LEFT).await?;
                tokio::time::sleep(DOUBLE_CLICK_INTERVAL).await;
                self.click(x, y, button::LEFT).await
            }
            DeviceAction::RightClick(param) => {
                let (x, y) = required(param.locate, "Element not found, cannot right click")?;
                self.move_to(x, y).await?;
                self.click(x, y, button::RIGHT).await
            }
            DeviceAction::MouseMove(param) => {
                let (x, y) = required(param.locate, "Element not found, cannot move mouse")?;
                self.smooth_move(x, y).await?;
                tokio::time::sleep(HOVER_SETTLE).await;
                Ok(())
            }
            DeviceAction::Input(param) => self.input(param).await,
            DeviceAction::Scroll(param) => self.scroll(param).await,
            DeviceAction::KeyboardPress(param) => self.keyboard_press(param).await,
            DeviceAction::DragAndDrop(param) => {
                let (from_x, from_y) =
                    required(param.from, "missing \"from\" param for drag and drop")?;
                let (to_x, to_y) = required(param.to, "missing \"to\" param for drag and drop")?;
                let transport = &self.transport;
                transport.send_pointer_event(from_x, from_y, 0).await?;
                tokio::time::sleep(SHORT_PAUSE).await;
                transport
                    .send_pointer_event(from_x, from_y, button::LEFT)
                    .await?;
                tokio::time::sleep(DRAG_STEP_DELAY).await;
                transport.send_pointer_event(to_x, to_y, button::LEFT).await?;
                tokio::time::sleep(DRAG_STEP_DELAY).await;
                transport.send_pointer_event(to_x, to_y, 0).await
            }
            DeviceAction::ClearInput(param) => {
                let (x, y) = required(param.locate, "Element not found, cannot clear input")?;
                self.click(x, y, button::LEFT).await?;
                tokio::time::sleep(DRAG_STEP_DELAY).await;
                self.select_all_and_delete().await?;
                tokio::time::sleep(SHORT_PAUSE).await;
                Ok(())
            }
        }
    }

    async fn input(&self, param: &InputParam) -> Result<()> {
        if let Some(element) = param.locate {
            let (x, y) = element.point();
            self.click(x, y, button::LEFT).await?;
            tokio::time::sleep(INPUT_FOCUS_DELAY).await;
            if param.mode != InputMode::Append {
                self.select_all_and_delete().await?;
                tokio::time::sleep(INPUT_CLEAR_DELAY).await;
            }
        }
        if param.mode == InputMode::Clear {
            return Ok(());
        }
        self.type_text(&param.value).await
    }

    async fn scroll(&self, param: &ScrollParam) -> Result<()> {
        let (x, y) = match param.locate {
            Some(element) => element.point(),
            None => self.screen_center(),
        };
        self.transport.send_pointer_event(x, y, 0).await?;

        let edge = match param.scroll_type {
            Some(ScrollType::ScrollToTop) => Some(button::SCROLL_UP),
            Some(ScrollType::ScrollToBottom) => Some(button::SCROLL_DOWN),
            Some(ScrollType::ScrollToLeft) => Some(button::SCROLL_LEFT),
            Some(ScrollType::ScrollToRight) => Some(button::SCROLL_RIGHT),
            Some(ScrollType::SingleAction) | None => None,
        };

        if let Some(wheel) = edge {
            for _ in 0..SCROLL_EDGE_REPEAT {
                self.transport.send_pointer_event(x, y, wheel).await?;
                tokio::time::sleep(SCROLL_STEP_DELAY).await;
                self.transport.send_pointer_event(x, y, 0).await?;
            }
            return Ok(());
        }

        let wheel = param.direction.unwrap_or_default().button();
        for _ in 0..scroll_ticks(param.distance) {
            self.transport.send_pointer_event(x, y, wheel).await?;
            tokio::time::sleep(SHORT_PAUSE).await;
            self.transport.send_pointer_event(x, y, 0).await?;
            tokio::time::sleep(SHORT_PAUSE).await;
        }
        tokio::time::sleep(SCROLL_COMPLETE_DELAY).await;
        Ok(())
    }

    async fn keyboard_press(&self, param: &KeyboardPressParam) -> Result<()> {
        // Resolve every key before sending anything
        let (modifiers, key) = parse_key_combo(&param.key_name)?;
        log::debug!("KeyboardPress: key={key:#x}, modifiers={modifiers:x?}");

        if let Some(element) = param.locate {
            let (x, y) = element.point();
            self.click(x, y, button::LEFT).await?;
            tokio::time::sleep(SHORT_PAUSE).await;
        }

        for &modifier in &modifiers {
            self.transport.send_key_event(modifier, true).await?;
        }
        self.transport.send_key_event(key, true).await?;
        tokio::time::sleep(KEY_PRESS_DELAY).await;
        self.transport.send_key_event(key, false).await?;
        for &modifier in modifiers.iter().rev() {
            self.transport.send_key_event(modifier, false).await?;
        }
        Ok(())
    }

    async fn move_to(&self, x: i32, y: i32) -> Result<()> {
        self.transport.send_pointer_event(x, y, 0).await?;
        tokio::time::sleep(SMOOTH_MOVE_DELAY).await;
        Ok(())
    }

    /// Press, hold and release `button` at a point.
    async fn click(&self, x: i32, y: i32, button: u8) -> Result<()> {
        self.transport.send_pointer_event(x, y, button).await?;
        tokio::time::sleep(CLICK_HOLD).await;
        self.transport.send_pointer_event(x, y, 0).await
    }

    /// Moves from the screen center in even steps; the cursor position is
    /// not tracked.
    async fn smooth_move(&self, x: i32, y: i32) -> Result<()> {
        let (start_x, start_y) = self.screen_center();
        for step in 1..=SMOOTH_MOVE_STEPS {
            let step_x = interpolate(start_x, x, step);
            let step_y = interpolate(start_y, y, step);
            self.transport.send_pointer_event(step_x, step_y, 0).await?;
            tokio::time::sleep(SMOOTH_MOVE_DELAY).await;
        }
        Ok(())
    }

    async fn select_all_and_delete(&self) -> Result<()> {
        let transport = &self.transport;
        transport.send_key_event(XK_CONTROL_L, true).await?;
        transport.send_key_event(KEY_A, true).await?;
        transport.send_key_event(KEY_A, false).await?;
        transport.send_key_event(XK_CONTROL_L, false).await?;
        tokio::time::sleep(SHORT_PAUSE).await;
        transport.send_key_event(XK_BACKSPACE, true).await?;
        transport.send_key_event(XK_BACKSPACE, false).await
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        for c in text.chars() {
            let Some(keysym) = keysym::char_to_keysym(c) else {
                log::debug!("Skipping control character {c:?} with no keysym");
                continue;
            };
            self.transport.send_key_event(keysym, true).await?;
            self.transport.send_key_event(keysym, false).await?;
            tokio::time::sleep(KEY_PRESS_DELAY).await;
        }
        Ok(())
    }

    fn screen_center(&self) -> (i32, i32) {
        let (width, height) = self.transport.screen_size();
        (i32::from(width.div_ceil(2)), i32::from(height.div_ceil(2)))
    }
}

/// Point `step` of `SMOOTH_MOVE_STEPS` between `from` and `to`, rounded to
/// the nearest pixel.
#[allow(clippy::cast_possible_truncation)] // between two i32 endpoints
fn interpolate(from: i32, to: i32, step: i32) -> i32 {
    let fraction = f64::from(step) / f64::from(SMOOTH_MOVE_STEPS);
    (f64::from(from) + f64::from(to - from) * fraction).round() as i32
}

fn required(element: Option<LocatedElement>, message: &str) -> Result<(i32, i32)> {
    element
        .map(|e| e.point())
        .ok_or_else(|| VncError::InvalidAction(message.to_string()))
}

/// Wheel ticks for a scroll distance: one per 100 pixels, rounded up.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scroll_ticks(distance: Option<f64>) -> u32 {
    let distance = distance
        .filter(|d| *d > 0.0)
        .unwrap_or(DEFAULT_SCROLL_DISTANCE);
    (distance / SCROLL_TICK_DISTANCE).ceil() as u32
}

/// Splits `"mod+mod+key"` into modifier keysyms and the main keysym.
///
/// A trailing `"++"` names the plus key itself.
fn parse_key_combo(combo: &str) -> Result<(Vec<u32>, u32)> {
    let (modifiers, key) = if combo == "+" {
        ("", "+")
    } else if let Some(rest) = combo.strip_suffix("++") {
        (rest, "+")
    } else {
        match combo.rsplit_once('+') {
            Some((modifiers, key)) => (modifiers, key),
            None => ("", combo),
        }
    };

    let modifiers = modifiers
        .split('+')
        .filter(|m| !m.is_empty())
        .map(keysym::modifier_to_keysym)
        .collect::<Result<Vec<_>>>()?;
    Ok((modifiers, keysym::key_to_keysym(key)?))
}
