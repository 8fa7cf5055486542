//! Frame classification
//!
//! Maps an arbitration id onto the CANopen predefined connection set. The
//! function code lives in id bits 10..7, the node id in bits 6..0.

use crate::types::{CanFrame, DumpError, PdoDirection, Result};

const FUNCTION_CODE_SHIFT: u32 = 7;
const NODE_ID_MASK: u32 = 0x7F;

/// CANopen communication object a frame belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Nmt,
    Sync,
    Timestamp,
    Emcy,
    /// Process data object with its direction and number (1..=4)
    Pdo(PdoDirection, u8),
    /// SDO server to client (response)
    Tsdo,
    /// SDO client to server (request)
    Rsdo,
    Heartbeat,
}

/// Classification result: object type plus addressed node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanopenMessage {
    pub object: ObjectType,
    /// 0 for broadcast, 1..=127 otherwise
    pub node_id: u8,
}

/// Classify a frame by its arbitration id
///
/// Extended, error and out-of-set frames are reported as
/// [`DumpError::Unclassifiable`]; callers are expected to skip them.
pub fn classify(frame: &CanFrame) -> Result<CanopenMessage> {
    if frame.is_extended || frame.is_error_frame {
        return Err(DumpError::Unclassifiable(frame.can_id));
    }

    let function_code = frame.can_id >> FUNCTION_CODE_SHIFT;
    let node_id = (frame.can_id & NODE_ID_MASK) as u8;

    let object = match (function_code, node_id) {
        // Target node of an NMT command is carried in the payload
        (0x0, 0) => {
            return Ok(CanopenMessage {
                object: ObjectType::Nmt,
                node_id: frame.payload()[1],
            })
        }
        (0x1, 0) => ObjectType::Sync,
        (0x2, 0) => ObjectType::Timestamp,
        (_, 0) => return Err(DumpError::Unclassifiable(frame.can_id)),
        (0x1, _) => ObjectType::Emcy,
        (0x3, _) => ObjectType::Pdo(PdoDirection::Transmit, 1),
        (0x4, _) => ObjectType::Pdo(PdoDirection::Receive, 1),
        (0x5, _) => ObjectType::Pdo(PdoDirection::Transmit, 2),
        (0x6, _) => ObjectType::Pdo(PdoDirection::Receive, 2),
        (0x7, _) => ObjectType::Pdo(PdoDirection::Transmit, 3),
        (0x8, _) => ObjectType::Pdo(PdoDirection::Receive, 3),
        (0x9, _) => ObjectType::Pdo(PdoDirection::Transmit, 4),
        (0xA, _) => ObjectType::Pdo(PdoDirection::Receive, 4),
        (0xB, _) => ObjectType::Tsdo,
        (0xC, _) => ObjectType::Rsdo,
        (0xE, _) => ObjectType::Heartbeat,
        _ => return Err(DumpError::Unclassifiable(frame.can_id)),
    };

    Ok(CanopenMessage { object, node_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object_of(can_id: u32) -> Option<(ObjectType, u8)> {
        classify(&CanFrame::new(can_id, &[0; 8]))
            .ok()
            .map(|msg| (msg.object, msg.node_id))
    }

    #[test]
    fn test_broadcast_objects() {
        assert_eq!(object_of(0x080), Some((ObjectType::Sync, 0)));
        assert_eq!(object_of(0x100), Some((ObjectType::Timestamp, 0)));
    }

    #[test]
    fn test_nmt_target_from_payload() {
        let frame = CanFrame::new(0x000, &[0x01, 0x05]);
        let msg = classify(&frame).unwrap();
        assert_eq!(msg.object, ObjectType::Nmt);
        assert_eq!(msg.node_id, 5);

        let all = classify(&CanFrame::new(0x000, &[0x81, 0x00])).unwrap();
        assert_eq!(all.node_id, 0);
    }

    #[test]
    fn test_node_addressed_objects() {
        assert_eq!(object_of(0x081), Some((ObjectType::Emcy, 1)));
        assert_eq!(object_of(0x1FF), Some((ObjectType::Pdo(PdoDirection::Transmit, 1), 127)));
        assert_eq!(object_of(0x20A), Some((ObjectType::Pdo(PdoDirection::Receive, 1), 10)));
        assert_eq!(object_of(0x285), Some((ObjectType::Pdo(PdoDirection::Transmit, 2), 5)));
        assert_eq!(object_of(0x305), Some((ObjectType::Pdo(PdoDirection::Receive, 2), 5)));
        assert_eq!(object_of(0x385), Some((ObjectType::Pdo(PdoDirection::Transmit, 3), 5)));
        assert_eq!(object_of(0x405), Some((ObjectType::Pdo(PdoDirection::Receive, 3), 5)));
        assert_eq!(object_of(0x485), Some((ObjectType::Pdo(PdoDirection::Transmit, 4), 5)));
        assert_eq!(object_of(0x505), Some((ObjectType::Pdo(PdoDirection::Receive, 4), 5)));
        assert_eq!(object_of(0x585), Some((ObjectType::Tsdo, 5)));
        assert_eq!(object_of(0x605), Some((ObjectType::Rsdo, 5)));
        assert_eq!(object_of(0x77F), Some((ObjectType::Heartbeat, 127)));
    }

    #[test]
    fn test_unclassifiable_ids() {
        for can_id in [0x001, 0x07F, 0x101, 0x180, 0x580, 0x680, 0x6FF, 0x700, 0x7E5] {
            assert!(
                matches!(
                    classify(&CanFrame::new(can_id, &[])),
                    Err(DumpError::Unclassifiable(id)) if id == can_id
                ),
                "0x{:X} should not classify",
                can_id
            );
        }
    }

    #[test]
    fn test_extended_and_error_frames_are_rejected() {
        let extended = CanFrame::from_id_word(crate::types::CAN_EFF_FLAG | 0x181, 0, &[]);
        assert!(classify(&extended).is_err());

        let error = CanFrame::from_id_word(crate::types::CAN_ERR_FLAG | 0x004, 8, &[0; 8]);
        assert!(classify(&error).is_err());
    }
}
