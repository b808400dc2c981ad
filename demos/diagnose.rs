//! Print every HID device with the template the gate would build for it.
//!
//! `cargo run --example diagnose --features hid`

use inputforge::backends::hid::describe_devices;
use inputforge::config::CompilerConfig;
use inputforge::{try_discover, TemplateRegistry};

fn main() -> inputforge::Result<()> {
    let api = hidapi::HidApi::new()?;
    let registry = TemplateRegistry::with_builtins(CompilerConfig::default());

    for description in describe_devices(&api) {
        match try_discover(&registry, &description, None) {
            Ok(name) => {
                let template = registry.resolve(&name)?;
                println!(
                    "{description}: {name} ({} controls, {} bytes)",
                    template.controls.len(),
                    template.size_in_bytes
                );
                for control in &template.controls {
                    println!(
                        "    {:<16} {:<8} bit {:>4} +{:<3} {} report {}",
                        control.name,
                        control.kind,
                        control.bit_offset,
                        control.size_in_bits,
                        control.format,
                        control.report_id
                    );
                }
            }
            Err(reason) => println!("{description}: declined ({reason})"),
        }
    }
    Ok(())
}
