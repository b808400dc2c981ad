//! Keyboard state block and template.
//!
//! One bit per [`Key`], bit index = key index. Native keyboard producers write
//! the same 16-byte layout.

use crate::classify::ControlKind;
use crate::device::DeviceCategory;
use crate::error::{LayoutError, Result};
use crate::format::FourCC;
use crate::mapping::{InputData, InputPipeline};
use crate::state::{bit_block_size_in_bytes, BitPackedBlock, InputStateTypeInfo, STATE_ALIGNMENT};
use crate::template::{InputTemplate, TemplateBuilder};
use crate::usage::common;
use bitvec::prelude::*;

macro_rules! keys {
    ($($key:ident),* $(,)?) => {
        /// Physical key, named by its position on a US layout.
        ///
        /// Values are stable bit indices into [`KeyboardState`].
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum Key {
            $($key,)*
        }

        impl Key {
            /// Every key in index order, `None` included.
            pub const ALL: &'static [Key] = &[$(Key::$key,)*];

            pub const fn name(self) -> &'static str {
                match self {
                    $(Key::$key => stringify!($key),)*
                }
            }
        }
    };
}

keys! {
    None,
    // Printable.
    Space, Enter, Tab, Backquote, Quote, Semicolon, Comma, Period, Slash, Backslash,
    LeftBracket, RightBracket, Minus, Equals,
    A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    Digit1, Digit2, Digit3, Digit4, Digit5, Digit6, Digit7, Digit8, Digit9, Digit0,
    // Non-printable.
    LeftShift, RightShift, LeftAlt, RightAlt, LeftCtrl, RightCtrl, LeftMeta, RightMeta,
    ContextMenu, Escape, LeftArrow, RightArrow, UpArrow, DownArrow, Backspace,
    PageDown, PageUp, Home, End, Insert, Delete, CapsLock, NumLock, PrintScreen,
    ScrollLock, Pause,
    // Numpad, 18-key layout.
    NumpadEnter, NumpadDivide, NumpadMultiply, NumpadPlus, NumpadMinus, NumpadPeriod,
    NumpadEquals, Numpad0, Numpad1, Numpad2, Numpad3, Numpad4, Numpad5, Numpad6,
    Numpad7, Numpad8, Numpad9,
    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,
    // Extra keys with no fixed position.
    OEM1, OEM2, OEM3, OEM4, OEM5,
}

impl Key {
    /// Number of key slots, `None` included.
    pub const COUNT: u32 = Key::ALL.len() as u32;

    pub const ALT_GR: Key = Key::RightAlt;
    pub const LEFT_WINDOWS: Key = Key::LeftMeta;
    pub const RIGHT_WINDOWS: Key = Key::RightMeta;
    pub const LEFT_APPLE: Key = Key::LeftMeta;
    pub const RIGHT_APPLE: Key = Key::RightMeta;
    pub const LEFT_COMMAND: Key = Key::LeftMeta;
    pub const RIGHT_COMMAND: Key = Key::RightMeta;

    #[inline]
    pub const fn index(self) -> u32 {
        self as u32
    }

    pub fn from_index(index: u32) -> Option<Key> {
        Key::ALL.get(index as usize).copied()
    }

    /// Control name in the keyboard template. Digits are named by their glyph.
    pub fn control_name(self) -> &'static str {
        match self {
            Key::Digit1 => "1",
            Key::Digit2 => "2",
            Key::Digit3 => "3",
            Key::Digit4 => "4",
            Key::Digit5 => "5",
            Key::Digit6 => "6",
            Key::Digit7 => "7",
            Key::Digit8 => "8",
            Key::Digit9 => "9",
            Key::Digit0 => "0",
            key => key.name(),
        }
    }

    pub fn usages(self) -> &'static [&'static str] {
        match self {
            Key::Escape => &[common::BACK, common::CANCEL],
            Key::Enter => &[common::ACCEPT],
            Key::LeftShift
            | Key::RightShift
            | Key::LeftAlt
            | Key::RightAlt
            | Key::LeftCtrl
            | Key::RightCtrl
            | Key::LeftMeta
            | Key::RightMeta
            | Key::ContextMenu => &[common::MODIFIER],
            _ => &[],
        }
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Key::RightAlt => &["AltGr"],
            Key::LeftMeta => &["LeftWindows", "LeftApple", "LeftCommand"],
            Key::RightMeta => &["RightWindows", "RightApple", "RightCommand"],
            _ => &[],
        }
    }
}

const STATE_SIZE: usize = bit_block_size_in_bytes(Key::COUNT, STATE_ALIGNMENT) as usize;

/// Raw keyboard state as exchanged with native code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct KeyboardState {
    pub keys: [u8; STATE_SIZE],
}

impl KeyboardState {
    pub const FORMAT: FourCC = FourCC::KEYS;
    pub const SIZE_IN_BYTES: u32 = STATE_SIZE as u32;
    pub const SIZE_IN_BITS: u32 = Self::SIZE_IN_BYTES * 8;

    /// State with exactly `pressed` held down.
    pub fn with_pressed(pressed: &[Key]) -> Self {
        let mut state = Self::default();
        for key in pressed {
            state.set(*key, true);
        }
        state
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.keys.view_bits::<Lsb0>()[key.index() as usize]
    }

    pub fn set(&mut self, key: Key, pressed: bool) {
        self.keys.view_bits_mut::<Lsb0>().set(key.index() as usize, pressed);
    }

    pub fn pressed(&self) -> impl Iterator<Item = Key> + '_ {
        self.keys
            .view_bits::<Lsb0>()
            .iter_ones()
            .filter_map(|i| Key::from_index(i as u32))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.keys
    }

    /// Wrap raw bytes. Bits past the last key must be clear.
    pub fn from_bytes(bytes: [u8; STATE_SIZE]) -> Result<Self> {
        BitPackedBlock::from_bytes(Self::FORMAT, Key::COUNT, &bytes)?;
        Ok(Self { keys: bytes })
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let keys = <[u8; STATE_SIZE]>::try_from(bytes).map_err(|_| LayoutError::BlockTooSmall {
            needed: STATE_SIZE,
            actual: bytes.len(),
        })?;
        Self::from_bytes(keys)
    }

    pub fn to_block(&self) -> Result<BitPackedBlock> {
        BitPackedBlock::from_bytes(Self::FORMAT, Key::COUNT, &self.keys)
    }
}

impl InputStateTypeInfo for KeyboardState {
    fn format(&self) -> FourCC {
        Self::FORMAT
    }
}

impl InputData for KeyboardState {
    const FORMAT: FourCC = FourCC::KEYS;
    const SIZE_IN_BYTES: u32 = KeyboardState::SIZE_IN_BYTES;

    fn pipeline() -> InputPipeline {
        InputPipeline::identity(FourCC::KEYS, KeyboardState::SIZE_IN_BYTES)
    }
}

/// The `Keyboard` template: `AnyKey` over the whole block, then one control per key.
pub fn template() -> Result<InputTemplate> {
    let mut builder = TemplateBuilder::new("Keyboard")
        .with_category(DeviceCategory::Keyboard)
        .with_format(KeyboardState::FORMAT)
        .with_size_in_bits(u64::from(KeyboardState::SIZE_IN_BITS))
        .with_pipeline(<KeyboardState as InputData>::pipeline());

    builder
        .add_control("AnyKey")
        .with_kind(ControlKind::AnyKey)
        .with_format(KeyboardState::FORMAT)
        .with_size_in_bits(KeyboardState::SIZE_IN_BITS);

    for key in Key::ALL.iter().skip(1) {
        builder
            .add_control(key.control_name())
            .with_kind(ControlKind::Key)
            .with_offset(key.index())
            .with_format(FourCC::BIT)
            .with_usages(key.usages().iter().copied())
            .with_aliases(key.aliases().iter().copied());
    }

    builder.build(STATE_ALIGNMENT)
}
