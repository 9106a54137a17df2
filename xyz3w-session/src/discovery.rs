//! Serial port enumerator (spec component G): ranks likely XYZ da Vinci
//! ports ahead of unrelated serial devices, but never hides a port the
//! operator might still want to pick by hand.

use serialport::SerialPortType;

use crate::error::SessionError;

const XYZ_VID: u16 = 0x28E7;
const XYZ_PIDS: [u16; 3] = [0x0301, 0x0100, 0x0200];
const DESCRIPTION_KEYWORDS: [&str; 3] = ["xyz", "davinci", "da vinci"];

/// One discovered serial port, with a human-facing description already
/// resolved.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PortCandidate {
    pub device: String,
    pub description: String,
}

/// List candidate ports in the match-priority order from spec §4.G. If no
/// port matches any rule, every available port is returned unfiltered so
/// the operator can still pick one by hand.
pub fn scan_ports() -> Result<Vec<PortCandidate>, SessionError> {
    let ports = serialport::available_ports().map_err(|e| SessionError::Discovery(e.to_string()))?;

    let mut matched = Vec::new();
    for port in &ports {
        let SerialPortType::UsbPort(usb) = &port.port_type else {
            continue;
        };
        let desc = usb.product.clone().unwrap_or_default();

        if usb.vid == XYZ_VID && XYZ_PIDS.contains(&usb.pid) {
            matched.push(PortCandidate {
                device: port.port_name.clone(),
                description: format!("XYZ Printer ({desc})"),
            });
        } else if DESCRIPTION_KEYWORDS.iter().any(|kw| desc.to_ascii_lowercase().contains(kw)) {
            matched.push(PortCandidate { device: port.port_name.clone(), description: desc });
        } else if usb.vid == XYZ_VID {
            matched.push(PortCandidate {
                device: port.port_name.clone(),
                description: format!("XYZ Device ({desc})"),
            });
        }
    }

    if matched.is_empty() {
        tracing::debug!("no XYZ-matching ports found, falling back to unfiltered port list");
        matched = ports
            .into_iter()
            .map(|p| {
                let description = match &p.port_type {
                    SerialPortType::UsbPort(usb) => usb.product.clone().unwrap_or_else(|| p.port_name.clone()),
                    _ => p.port_name.clone(),
                };
                PortCandidate { device: p.port_name, description }
            })
            .collect();
    }

    Ok(matched)
}
