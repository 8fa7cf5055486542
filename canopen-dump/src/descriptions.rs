//! Human-readable texts for emergency error codes and SDO abort codes

/// Resolves an emergency error code to text
///
/// `device_type` is the low 16 bits of object 0x1000 (the device profile
/// number), 0 when the node's device type has not been seen yet.
pub trait ErrorDescriptions {
    fn describe(&self, code: u16, device_type: u16) -> String;
}

/// CiA 301 generic codes refined by the CiA 401 and CiA 402 profiles
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDescriptions;

pub const PROFILE_GENERIC_IO: u16 = 401;
pub const PROFILE_DRIVES: u16 = 402;

impl ErrorDescriptions for StandardDescriptions {
    fn describe(&self, code: u16, device_type: u16) -> String {
        let profile_text = match device_type {
            PROFILE_GENERIC_IO => generic_io_error(code),
            PROFILE_DRIVES => drive_error(code),
            _ => None,
        };

        profile_text.unwrap_or_else(|| generic_error(code)).to_string()
    }
}

fn drive_error(code: u16) -> Option<&'static str> {
    let text = match code {
        0x2214 => "Over-current during startup",
        0x2310 => "Continuous over current",
        0x2320 => "Short circuit at outputs",
        0x3210 => "DC link over-voltage",
        0x3220 => "DC link under-voltage",
        0x4210 => "Excess temperature device",
        0x4310 => "Excess temperature drive",
        0x5441 => "Drive disabled by enable input",
        0x7121 => "Motor blocked",
        0x7305 => "Incremental sensor 1 fault",
        0x8611 => "Following error",
        0x8612 => "Reference limit",
        _ => return None,
    };
    Some(text)
}

fn generic_io_error(code: u16) -> Option<&'static str> {
    let text = match code {
        0x2310 => "Output current too high",
        0x2320 => "Output short circuit",
        0x3110 => "Mains over-voltage",
        0x3120 => "Mains under-voltage",
        0x5010 => "Component fault",
        0x8220 => "PDO length exceeded",
        0xFF10 => "Input signal wire break",
        _ => return None,
    };
    Some(text)
}

fn generic_error(code: u16) -> &'static str {
    match code {
        0x0000 => "Error reset or no error",
        0x8110 => "CAN overrun",
        0x8120 => "CAN in error passive mode",
        0x8130 => "Life guard error or heartbeat error",
        0x8140 => "Recovered from bus off",
        0x8150 => "CAN-ID collision",
        0x8210 => "PDO not processed due to length error",
        0x8220 => "PDO length exceeded",
        0x8230 => "DAM MPDO not processed, destination object not available",
        0x8240 => "Unexpected SYNC data length",
        0x8250 => "RPDO timeout",
        _ => generic_error_class(code),
    }
}

fn generic_error_class(code: u16) -> &'static str {
    match code >> 8 {
        0x21 => "Current, device input side",
        0x22 => "Current inside the device",
        0x23 => "Current, device output side",
        0x31 => "Mains voltage",
        0x32 => "Voltage inside the device",
        0x33 => "Output voltage",
        0x41 => "Ambient temperature",
        0x42 => "Device temperature",
        0x61 => "Internal software",
        0x62 => "User software",
        0x63 => "Data set",
        0x81 => "Communication",
        0x82 => "Protocol error",
        0xFF => "Device specific",
        _ => match code >> 12 {
            0x1 => "Generic error",
            0x2 => "Current",
            0x3 => "Voltage",
            0x4 => "Temperature",
            0x5 => "Device hardware",
            0x6 => "Device software",
            0x7 => "Additional modules",
            0x8 => "Monitoring",
            0x9 => "External error",
            0xF => "Additional functions",
            _ => "Unknown error",
        },
    }
}

/// Text of a CiA 301 SDO abort code
pub fn abort_reason(code: u32) -> &'static str {
    match code {
        0x0503_0000 => "Toggle bit not alternated",
        0x0504_0000 => "SDO protocol timed out",
        0x0504_0001 => "Client/server command specifier not valid or unknown",
        0x0504_0002 => "Invalid block size",
        0x0504_0003 => "Invalid sequence number",
        0x0504_0004 => "CRC error",
        0x0504_0005 => "Out of memory",
        0x0601_0000 => "Unsupported access to an object",
        0x0601_0001 => "Attempt to read a write only object",
        0x0601_0002 => "Attempt to write a read only object",
        0x0602_0000 => "Object does not exist in the object dictionary",
        0x0604_0041 => "Object cannot be mapped to the PDO",
        0x0604_0042 => "The number and length of the objects to be mapped would exceed PDO length",
        0x0604_0043 => "General parameter incompatibility reason",
        0x0604_0047 => "General internal incompatibility in the device",
        0x0606_0000 => "Access failed due to a hardware error",
        0x0607_0010 => "Data type does not match, length of service parameter does not match",
        0x0607_0012 => "Data type does not match, length of service parameter too high",
        0x0607_0013 => "Data type does not match, length of service parameter too low",
        0x0609_0011 => "Sub-index does not exist",
        0x0609_0030 => "Invalid value for parameter",
        0x0609_0031 => "Value of parameter written too high",
        0x0609_0032 => "Value of parameter written too low",
        0x0609_0036 => "Maximum value is less than minimum value",
        0x060A_0023 => "Resource not available: SDO connection",
        0x0800_0000 => "General error",
        0x0800_0020 => "Data cannot be transferred or stored to the application",
        0x0800_0021 => {
            "Data cannot be transferred or stored to the application because of local control"
        }
        0x0800_0022 => {
            "Data cannot be transferred or stored to the application because of the present device state"
        }
        0x0800_0023 => "Object dictionary dynamic generation fails or no object dictionary is present",
        0x0800_0024 => "No data available",
        _ => "Unknown abort code",
    }
}
