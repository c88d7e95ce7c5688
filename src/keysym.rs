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

//! X11 keysym lookup for `KeyEvent` messages.
//!
//! VNC transmits keys as X Window System keysyms. Named keys are looked up
//! case-insensitively; a single character falls back to its Latin-1 code
//! point or the Unicode keysym range (`0x0100_0000 + codepoint`). Control
//! characters other than newline, tab, backspace and escape have no keysym.

use crate::error::{Result, VncError};

// TTY function keys
pub const XK_BACKSPACE: u32 = 0xff08;
pub const XK_TAB: u32 = 0xff09;
pub const XK_RETURN: u32 = 0xff0d;
pub const XK_PAUSE: u32 = 0xff13;
pub const XK_SCROLL_LOCK: u32 = 0xff14;
pub const XK_ESCAPE: u32 = 0xff1b;
pub const XK_DELETE: u32 = 0xffff;

// Cursor control
pub const XK_HOME: u32 = 0xff50;
pub const XK_LEFT: u32 = 0xff51;
pub const XK_UP: u32 = 0xff52;
pub const XK_RIGHT: u32 = 0xff53;
pub const XK_DOWN: u32 = 0xff54;
pub const XK_PAGE_UP: u32 = 0xff55;
pub const XK_PAGE_DOWN: u32 = 0xff56;
pub const XK_END: u32 = 0xff57;

// Misc functions
pub const XK_PRINT: u32 = 0xff61;
pub const XK_INSERT: u32 = 0xff63;
pub const XK_MENU: u32 = 0xff67;
pub const XK_NUM_LOCK: u32 = 0xff7f;

// Keypad
pub const XK_KP_ENTER: u32 = 0xff8d;
pub const XK_KP_MULTIPLY: u32 = 0xffaa;
pub const XK_KP_ADD: u32 = 0xffab;
pub const XK_KP_SEPARATOR: u32 = 0xffac;
pub const XK_KP_SUBTRACT: u32 = 0xffad;
pub const XK_KP_DECIMAL: u32 = 0xffae;
pub const XK_KP_DIVIDE: u32 = 0xffaf;
pub const XK_KP_0: u32 = 0xffb0;
pub const XK_KP_EQUAL: u32 = 0xffbd;

// Function keys, F1..F24 are contiguous
pub const XK_F1: u32 = 0xffbe;

// Modifiers
pub const XK_SHIFT_L: u32 = 0xffe1;
pub const XK_SHIFT_R: u32 = 0xffe2;
pub const XK_CONTROL_L: u32 = 0xffe3;
pub const XK_CONTROL_R: u32 = 0xffe4;
pub const XK_CAPS_LOCK: u32 = 0xffe5;
pub const XK_META_L: u32 = 0xffe7;
pub const XK_META_R: u32 = 0xffe8;
pub const XK_ALT_L: u32 = 0xffe9;
pub const XK_ALT_R: u32 = 0xffea;
pub const XK_SUPER_L: u32 = 0xffeb;
pub const XK_SUPER_R: u32 = 0xffec;

// XF86 media keys
pub const XF86_AUDIO_LOWER_VOLUME: u32 = 0x1008_ff11;
pub const XF86_AUDIO_MUTE: u32 = 0x1008_ff12;
pub const XF86_AUDIO_RAISE_VOLUME: u32 = 0x1008_ff13;
pub const XF86_AUDIO_PLAY: u32 = 0x1008_ff14;
pub const XF86_AUDIO_STOP: u32 = 0x1008_ff15;
pub const XF86_AUDIO_PREV: u32 = 0x1008_ff16;
pub const XF86_AUDIO_NEXT: u32 = 0x1008_ff17;

/// Offset of the Unicode keysym range.
const UNICODE_OFFSET: u32 = 0x0100_0000;

fn named_key(name: &str) -> Option<u32> {
    let keysym = match name {
        "enter" | "return" => XK_RETURN,
        "tab" => XK_TAB,
        "backspace" => XK_BACKSPACE,
        "delete" | "del" => XK_DELETE,
        "escape" | "esc" => XK_ESCAPE,
        "space" | "spacebar" => 0x0020,
        "insert" | "ins" => XK_INSERT,
        "pause" | "break" => XK_PAUSE,
        "printscreen" | "print" | "prtsc" => XK_PRINT,
        "menu" | "contextmenu" | "apps" => XK_MENU,
        "capslock" => XK_CAPS_LOCK,
        "numlock" => XK_NUM_LOCK,
        "scrolllock" => XK_SCROLL_LOCK,

        "home" => XK_HOME,
        "end" => XK_END,
        "pageup" | "pgup" => XK_PAGE_UP,
        "pagedown" | "pgdn" => XK_PAGE_DOWN,
        "left" | "arrowleft" => XK_LEFT,
        "up" | "arrowup" => XK_UP,
        "right" | "arrowright" => XK_RIGHT,
        "down" | "arrowdown" => XK_DOWN,

        "shift" | "shiftleft" => XK_SHIFT_L,
        "shiftright" => XK_SHIFT_R,
        "ctrl" | "control" | "controlleft" => XK_CONTROL_L,
        "controlright" => XK_CONTROL_R,
        "alt" | "option" | "altleft" => XK_ALT_L,
        "altright" => XK_ALT_R,
        "meta" | "metaleft" => XK_META_L,
        "metaright" => XK_META_R,
        "cmd" | "command" | "super" | "win" | "windows" => XK_SUPER_L,

        "numpad0" | "kp0" | "kp_0" => XK_KP_0,
        "numpad1" | "kp1" | "kp_1" => XK_KP_0 + 1,
        "numpad2" | "kp2" | "kp_2" => XK_KP_0 + 2,
        "numpad3" | "kp3" | "kp_3" => XK_KP_0 + 3,
        "numpad4" | "kp4" | "kp_4" => XK_KP_0 + 4,
        "numpad5" | "kp5" | "kp_5" => XK_KP_0 + 5,
        "numpad6" | "kp6" | "kp_6" => XK_KP_0 + 6,
        "numpad7" | "kp7" | "kp_7" => XK_KP_0 + 7,
        "numpad8" | "kp8" | "kp_8" => XK_KP_0 + 8,
        "numpad9" | "kp9" | "kp_9" => XK_KP_0 + 9,
        "numpadenter" | "kp_enter" => XK_KP_ENTER,
        "numpadmultiply" | "kp_multiply" => XK_KP_MULTIPLY,
        "numpadadd" | "kp_add" => XK_KP_ADD,
        "numpadseparator" | "kp_separator" => XK_KP_SEPARATOR,
        "numpadsubtract" | "kp_subtract" => XK_KP_SUBTRACT,
        "numpaddecimal" | "kp_decimal" => XK_KP_DECIMAL,
        "numpaddivide" | "kp_divide" => XK_KP_DIVIDE,
        "numpadequal" | "kp_equal" => XK_KP_EQUAL,

        "audiovolumemute" | "volumemute" | "mute" => XF86_AUDIO_MUTE,
        "audiovolumedown" | "volumedown" => XF86_AUDIO_LOWER_VOLUME,
        "audiovolumeup" | "volumeup" => XF86_AUDIO_RAISE_VOLUME,
        "mediaplaypause" | "mediaplay" | "play" => XF86_AUDIO_PLAY,
        "mediastop" => XF86_AUDIO_STOP,
        "mediatrackprevious" | "mediaprev" => XF86_AUDIO_PREV,
        "mediatracknext" | "medianext" => XF86_AUDIO_NEXT,

        _ => return function_key(name),
    };
    Some(keysym)
}

/// `f1`..`f24`.
fn function_key(name: &str) -> Option<u32> {
    let n: u32 = name.strip_prefix('f')?.parse().ok()?;
    (1..=24).contains(&n).then(|| XK_F1 + n - 1)
}

/// Maps a key name or single character to its keysym.
///
/// # Errors
///
/// Returns [`VncError::UnknownKey`] for multi-character names that are not
/// in the table.
pub fn key_to_keysym(name: &str) -> Result<u32> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.clone().next()) {
        // Single characters keep their case: 'A' and 'a' are distinct keysyms
        return char_to_keysym(c)
            .ok_or_else(|| VncError::UnknownKey(name.escape_default().to_string()));
    }

    named_key(&name.to_ascii_lowercase()).ok_or_else(|| VncError::UnknownKey(name.to_string()))
}

/// Maps a single character to its keysym.
///
/// Returns `None` for control characters without a key of their own (C0
/// codes other than `\n`, `\r`, `\t`, backspace and escape, DEL, and C1).
#[must_use]
pub fn char_to_keysym(c: char) -> Option<u32> {
    let cp = u32::from(c);
    match c {
        '\n' | '\r' => Some(XK_RETURN),
        '\t' => Some(XK_TAB),
        '\u{8}' => Some(XK_BACKSPACE),
        '\u{1b}' => Some(XK_ESCAPE),
        _ if c.is_control() => None,
        _ if (0x20..=0x7e).contains(&cp) => Some(cp),
        _ => Some(UNICODE_OFFSET + cp),
    }
}

/// Maps a modifier name to its keysym.
///
/// # Errors
///
/// Returns [`VncError::UnknownModifier`] for names outside the modifier table.
pub fn modifier_to_keysym(name: &str) -> Result<u32> {
    match name.to_ascii_lowercase().as_str() {
        "shift" => Ok(XK_SHIFT_L),
        "control" | "ctrl" => Ok(XK_CONTROL_L),
        "alt" | "option" => Ok(XK_ALT_L),
        "meta" => Ok(XK_META_L),
        "command" | "cmd" | "super" | "win" => Ok(XK_SUPER_L),
        _ => Err(VncError::UnknownModifier(name.to_string())),
    }
}
