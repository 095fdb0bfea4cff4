//! Product name, serial number and firmware version.
use crate::error::ProtocolError;
use crate::frame::Response;
use crate::profile::SerialFormat;

/// Identity strings read from the device when a session is opened.
///
/// Each field is `None` if the model has no command for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Product name (SEN5x) or product type (SPS30).
    pub product_name: Option<String>,
    /// Serial number.
    pub serial_number: Option<String>,
    /// Firmware version as `major.minor`.
    pub firmware_version: Option<String>,
}

impl std::fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unknown = "?";
        write!(
            f,
            "{} (serial {}, firmware {})",
            self.product_name.as_deref().unwrap_or(unknown),
            self.serial_number.as_deref().unwrap_or(unknown),
            self.firmware_version.as_deref().unwrap_or(unknown),
        )
    }
}

/// Parse a NUL-padded ASCII string response.
///
/// All-zero words are skipped and trailing NULs removed.
pub(crate) fn parse_string(response: &Response) -> Result<String, ProtocolError> {
    let words = response.verified()?;
    let bytes: Vec<u8> = words
        .iter()
        .filter(|w| w.data != [0x00, 0x00])
        .flat_map(|w| w.data)
        .collect();
    Ok(String::from_utf8_lossy(&bytes)
        .trim_end_matches('\0')
        .to_owned())
}

/// Parse a serial number response in the model's format.
pub(crate) fn parse_serial(
    response: &Response,
    format: SerialFormat,
) -> Result<String, ProtocolError> {
    match format {
        SerialFormat::Ascii => parse_string(response),
        SerialFormat::Integer => {
            let bytes = response.verified_leading_bytes(2)?;
            let serial = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            Ok(serial.to_string())
        }
    }
}

/// Parse the one-word firmware version response.
pub(crate) fn parse_firmware(response: &Response) -> Result<String, ProtocolError> {
    let bytes = response.verified_leading_bytes(1)?;
    Ok(format!("{}.{}", bytes[0], bytes[1]))
}
