//! Build a virtual joystick, bind it, and read its layout.

use inputforge::backends::virtual_input::VirtualHid;
use inputforge::config::CompilerConfig;
use inputforge::usage::GenericDesktop;
use inputforge::{DeviceCategory, DeviceManager, TemplateRegistry};

fn main() -> inputforge::Result<()> {
    let registry = TemplateRegistry::with_builtins(CompilerConfig::default());
    let mut manager = DeviceManager::new(&registry);

    let stick = VirtualHid::joystick("Virtual Stick")
        .with_manufacturer("inputforge")
        .axis(GenericDesktop::X, 16)
        .axis(GenericDesktop::Y, 16)
        .buttons(1..=8)
        .describe()?;
    let id = manager.add_device(stick, None)?;
    manager.update_state(id, &[0x00, 0x80, 0xFF, 0x7F, 0b0000_0101, 0, 0, 0])?;

    if let Some(device) = manager.current(DeviceCategory::Joystick) {
        println!("{device}");
        for control in &device.template().controls {
            println!("  {} @ bit {}", control.name, control.bit_offset);
        }
        println!("  state: {:02x?}", device.state());
    }
    Ok(())
}
