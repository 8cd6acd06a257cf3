//! 串口列表命令

use anyhow::{Context, Result};
use serialport::{SerialPortInfo, SerialPortType};

/// 单行描述
fn describe(port: &SerialPortInfo) -> String {
    match &port.port_type {
        SerialPortType::UsbPort(usb) => {
            let mut line = format!("{}  USB {:04x}:{:04x}", port.port_name, usb.vid, usb.pid);
            if let Some(product) = &usb.product {
                line.push_str(&format!("  {product}"));
            }
            if let Some(serial) = &usb.serial_number {
                line.push_str(&format!("  (serial {serial})"));
            }
            line
        },
        SerialPortType::BluetoothPort => format!("{}  Bluetooth", port.port_name),
        SerialPortType::PciPort => format!("{}  PCI", port.port_name),
        SerialPortType::Unknown => port.port_name.clone(),
    }
}

/// 列出可用串口
pub fn execute() -> Result<()> {
    let ports = serialport::available_ports().context("Failed to enumerate serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }

    println!("Available serial ports:");
    for port in &ports {
        println!("  {}", describe(port));
    }
    Ok(())
}
