//! HID usage pages, generic-desktop usages, and semantic usage tags.
//!
//! Values follow the HID Usage Tables (HUT 1.12). Only the pages the classifier
//! and the base-template selection look at are spelled out.

macro_rules! usage_table {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $value:expr),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum $name {
            $($variant = $value),+
        }

        impl $name {
            /// Look up a usage by its numeric id.
            pub fn from_id(id: i32) -> Option<Self> {
                match id {
                    $(x if x == $value => Some($name::$variant),)+
                    _ => None,
                }
            }

            #[inline]
            pub const fn id(self) -> i32 {
                self as u16 as i32
            }

            /// Symbolic name, as used for synthesized control names.
            pub const fn name(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant),)+
                }
            }
        }
    };
}

usage_table! {
    /// Top-level usage pages.
    UsagePage {
        GenericDesktop = 0x01,
        Simulation = 0x02,
        VRControls = 0x03,
        SportControls = 0x04,
        GameControls = 0x05,
        GenericDeviceControls = 0x06,
        Keyboard = 0x07,
        LEDs = 0x08,
        Button = 0x09,
        Ordinal = 0x0A,
        Telephony = 0x0B,
        Consumer = 0x0C,
        Digitizer = 0x0D,
        PID = 0x0F,
        Unicode = 0x10,
        AlphanumericDisplay = 0x14,
        MedicalInstruments = 0x40,
    }
}

usage_table! {
    /// Usages on the generic-desktop page.
    GenericDesktop {
        Pointer = 0x01,
        Mouse = 0x02,
        Joystick = 0x04,
        Gamepad = 0x05,
        Keyboard = 0x06,
        Keypad = 0x07,
        MultiAxisController = 0x08,
        TabletPCControls = 0x09,
        X = 0x30,
        Y = 0x31,
        Z = 0x32,
        Rx = 0x33,
        Ry = 0x34,
        Rz = 0x35,
        Slider = 0x36,
        Dial = 0x37,
        Wheel = 0x38,
        HatSwitch = 0x39,
        CountedBuffer = 0x3A,
        ByteCount = 0x3B,
        MotionWakeup = 0x3C,
        Start = 0x3D,
        Select = 0x3E,
        Vx = 0x40,
        Vy = 0x41,
        Vz = 0x42,
        Vbrx = 0x43,
        Vbry = 0x44,
        Vbrz = 0x45,
        Vno = 0x46,
        FeatureNotification = 0x47,
        ResolutionMultiplier = 0x48,
        SystemControl = 0x80,
        SystemPowerDown = 0x81,
        SystemSleep = 0x82,
        SystemWakeUp = 0x83,
        SystemContextMenu = 0x84,
        SystemMainMenu = 0x85,
        SystemAppMenu = 0x86,
        SystemMenuHelp = 0x87,
        SystemMenuExit = 0x88,
        SystemMenuSelect = 0x89,
        SystemMenuRight = 0x8A,
        SystemMenuLeft = 0x8B,
        SystemMenuUp = 0x8C,
        SystemMenuDown = 0x8D,
        SystemColdRestart = 0x8E,
        SystemWarmRestart = 0x8F,
        DpadUp = 0x90,
        DpadDown = 0x91,
        DpadRight = 0x92,
        DpadLeft = 0x93,
        SystemDock = 0xA0,
        SystemUndock = 0xA1,
        SystemSetup = 0xA2,
        SystemBreak = 0xA3,
        SystemDebuggerBreak = 0xA4,
        ApplicationBreak = 0xA5,
        ApplicationDebuggerBreak = 0xA6,
        SystemSpeakerMute = 0xA7,
        SystemHibernate = 0xA8,
        SystemDisplayInvert = 0xB0,
        SystemDisplayInternal = 0xB1,
        SystemDisplayExternal = 0xB2,
        SystemDisplayBoth = 0xB3,
        SystemDisplayDual = 0xB4,
        SystemDisplayToggleIntExt = 0xB5,
        SystemDisplaySwapPrimarySecondary = 0xB6,
        SystemDisplayLCDAutoScale = 0xB7,
    }
}

impl GenericDesktop {
    /// `X`, `Y`, `Z`, `Rx`, `Ry`, `Rz`.
    pub const fn is_axis(self) -> bool {
        matches!(
            self,
            GenericDesktop::X
                | GenericDesktop::Y
                | GenericDesktop::Z
                | GenericDesktop::Rx
                | GenericDesktop::Ry
                | GenericDesktop::Rz
        )
    }
}

/// Symbolic name of a generic-desktop usage; unknown ids fall back to their decimal value.
pub fn generic_desktop_name(usage_id: i32) -> String {
    match GenericDesktop::from_id(usage_id) {
        Some(usage) => usage.name().to_string(),
        None => usage_id.to_string(),
    }
}

/// Semantic usage tags attached to controls.
pub mod common {
    pub const PRIMARY_TRIGGER: &str = "PrimaryTrigger";
    pub const PRIMARY_ACTION: &str = "PrimaryAction";
    pub const BACK: &str = "Back";
    pub const CANCEL: &str = "Cancel";
    pub const ACCEPT: &str = "Accept";
    pub const MODIFIER: &str = "Modifier";
}
