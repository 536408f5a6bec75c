//! Modbus TCP frame codec.
//!
//! Builds request frames (MBAP header + PDU) and parses response frames.
//! All multi-byte integers on the wire are big-endian.

use crate::modbus::protocol::{
    DecodedFrame, ExceptionCode, ResponseFrame, FC_READ_WRITE_MULTIPLE_REGISTERS,
    FC_WRITE_MULTIPLE_COILS, FC_WRITE_SINGLE_COIL, FC_WRITE_SINGLE_REGISTER, MAX_ENTITIES,
    MAX_STANDARD_FUNCTION, MIN_RESPONSE_LEN, PROTOCOL_ID,
};
use crate::utils::error::ModbusError;

/// Builds a request frame for the given transaction id.
///
/// The transaction id must already have been advanced by the caller; the
/// codec itself is stateless. The MBAP length field is computed from the
/// assembled body, never hardcoded.
///
/// Layout: `[txn hi, txn lo, 0x00, 0x00, len hi, len lo, unit, function,
/// start hi, start lo, (quantity hi, quantity lo)?, (byte count)?, payload…]`
pub fn encode_request(
    transaction_id: u16,
    unit: u8,
    function: u8,
    start_address: u16,
    quantity: u16,
    payload: Option<&[u8]>,
) -> Result<Vec<u8>, ModbusError> {
    // Only standard function codes are bounded; some devices use vendor
    // codes like 0x43 with larger counts.
    if quantity > MAX_ENTITIES && function <= MAX_STANDARD_FUNCTION {
        return Err(ModbusError::TooManyEntities {
            quantity,
            max: MAX_ENTITIES,
        });
    }

    let mut body: Vec<u8> = Vec::with_capacity(8 + payload.map_or(0, <[u8]>::len));
    body.push(unit);
    body.push(function);
    body.extend_from_slice(&start_address.to_be_bytes());

    // Single-value writes carry the value in the payload slot, no count field.
    if function != FC_WRITE_SINGLE_COIL && function != FC_WRITE_SINGLE_REGISTER {
        body.extend_from_slice(&quantity.to_be_bytes());
    }

    if let Some(data) = payload {
        if function == FC_WRITE_MULTIPLE_COILS || function == FC_READ_WRITE_MULTIPLE_REGISTERS {
            body.push(data.len() as u8);
            body.extend_from_slice(data);
        } else {
            // Single-value write semantics: exactly two payload bytes go out,
            // zero-padded if the caller supplied fewer.
            let mut value = [0u8; 2];
            for (slot, byte) in value.iter_mut().zip(data.iter()) {
                *slot = *byte;
            }
            body.extend_from_slice(&value);
        }
    }

    let mut frame = Vec::with_capacity(6 + body.len());
    frame.extend_from_slice(&transaction_id.to_be_bytes());
    frame.extend_from_slice(&PROTOCOL_ID.to_be_bytes());
    frame.extend_from_slice(&(body.len() as u16).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Parses a response buffer into a frame, exception, or a verdict that more
/// bytes are needed.
///
/// The payload window is sized from the declared byte count at offset 8 and
/// a declared count that exceeds the bytes actually present is malformed
/// rather than silently clipped.
pub fn decode_response(buf: &[u8]) -> DecodedFrame {
    if buf.len() < MIN_RESPONSE_LEN {
        return DecodedFrame::Incomplete;
    }

    let transaction_id = u16::from_be_bytes([buf[0], buf[1]]);
    let unit = buf[6];
    let function = buf[7];

    if function & 0x80 == 0x80 {
        return DecodedFrame::Exception {
            transaction_id,
            unit,
            function: function & 0x7F,
            code: ExceptionCode::from(buf[8]),
        };
    }

    let declared = buf[8] as usize;
    let available = buf.len() - MIN_RESPONSE_LEN;
    if declared > available {
        return DecodedFrame::Malformed {
            declared,
            available,
        };
    }

    DecodedFrame::Data(ResponseFrame {
        transaction_id,
        unit,
        function,
        payload: buf[MIN_RESPONSE_LEN..MIN_RESPONSE_LEN + declared].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::protocol::{
        FC_READ_HOLDING_REGISTERS, FC_WRITE_MULTIPLE_COILS, FC_WRITE_SINGLE_COIL,
        FC_WRITE_SINGLE_REGISTER,
    };

    // Test-side view of an encoded request frame.
    fn parse_request(frame: &[u8]) -> (u16, u8, u8, u16, u16) {
        let txn = u16::from_be_bytes([frame[0], frame[1]]);
        let unit = frame[6];
        let function = frame[7];
        let start = u16::from_be_bytes([frame[8], frame[9]]);
        let quantity = u16::from_be_bytes([frame[10], frame[11]]);
        (txn, unit, function, start, quantity)
    }

    #[test]
    fn test_encode_read_holding_registers() {
        let frame = encode_request(0x0001, 1, FC_READ_HOLDING_REGISTERS, 0x0000, 2, None).unwrap();
        assert_eq!(frame, vec![0x00, 0x01, 0, 0, 0, 6, 1, 3, 0, 0, 0, 2]);
    }

    #[test]
    fn test_encode_length_field_is_computed() {
        let frame = encode_request(7, 9, FC_READ_HOLDING_REGISTERS, 0x0010, 4, None).unwrap();
        let length = u16::from_be_bytes([frame[4], frame[5]]) as usize;
        assert_eq!(length, frame.len() - 6);
    }

    #[test]
    fn test_encode_single_writes_omit_quantity() {
        let coil =
            encode_request(1, 1, FC_WRITE_SINGLE_COIL, 0x0002, 1, Some(&[0xFF, 0x00])).unwrap();
        // unit, fc, start(2), value(2) = 6 body bytes, no count field
        assert_eq!(coil.len(), 12);
        assert_eq!(&coil[6..], &[1, 0x05, 0x00, 0x02, 0xFF, 0x00]);

        let reg =
            encode_request(1, 1, FC_WRITE_SINGLE_REGISTER, 0x0064, 1, Some(&[0x12, 0x34])).unwrap();
        assert_eq!(&reg[6..], &[1, 0x06, 0x00, 0x64, 0x12, 0x34]);
    }

    #[test]
    fn test_encode_single_write_truncates_payload_to_two_bytes() {
        let frame = encode_request(
            1,
            1,
            FC_WRITE_SINGLE_REGISTER,
            0,
            1,
            Some(&[0xAA, 0xBB, 0xCC, 0xDD]),
        )
        .unwrap();
        assert_eq!(&frame[10..], &[0xAA, 0xBB]);
    }

    #[test]
    fn test_encode_multi_write_prepends_byte_count() {
        let values = [0x01, 0x02, 0x03, 0x04];
        let frame =
            encode_request(1, 2, FC_WRITE_MULTIPLE_COILS, 0x0000, 32, Some(&values)).unwrap();
        // unit, fc, start(2), quantity(2), byte count, payload(4)
        assert_eq!(frame[12], 4);
        assert_eq!(&frame[13..], &values);
        let length = u16::from_be_bytes([frame[4], frame[5]]) as usize;
        assert_eq!(length, frame.len() - 6);
    }

    #[test]
    fn test_encode_rejects_oversized_standard_request() {
        let err = encode_request(1, 1, FC_READ_HOLDING_REGISTERS, 0, 129, None).unwrap_err();
        assert!(matches!(
            err,
            ModbusError::TooManyEntities { quantity: 129, .. }
        ));
    }

    #[test]
    fn test_encode_allows_oversized_vendor_request() {
        // Vendor codes above 0x10 skip the entity bound.
        let frame = encode_request(1, 1, 0x43, 0, 500, None).unwrap();
        assert_eq!(u16::from_be_bytes([frame[10], frame[11]]), 500);
    }

    #[test]
    fn test_decode_short_buffer_is_incomplete() {
        assert_eq!(decode_response(&[]), DecodedFrame::Incomplete);
        assert_eq!(
            decode_response(&[0, 1, 0, 0, 0, 3, 1, 3]),
            DecodedFrame::Incomplete
        );
    }

    #[test]
    fn test_decode_exception_frame() {
        let frame = [0x00, 0x01, 0, 0, 0, 3, 1, 0x83, 0x03];
        match decode_response(&frame) {
            DecodedFrame::Exception {
                unit,
                function,
                code,
                ..
            } => {
                assert_eq!(unit, 1);
                assert_eq!(function, 0x03);
                assert_eq!(code, ExceptionCode::IllegalDataValue);
            }
            other => panic!("expected exception, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_unmapped_exception_code() {
        let frame = [0x00, 0x01, 0, 0, 0, 3, 1, 0x83, 0x0B];
        match decode_response(&frame) {
            DecodedFrame::Exception { code, .. } => assert_eq!(code, ExceptionCode::Other(0x0B)),
            other => panic!("expected exception, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_data_frame_sized_from_declared_count() {
        let frame = [0x00, 0x2A, 0, 0, 0, 7, 1, 3, 4, 0xDE, 0xAD, 0xBE, 0xEF];
        match decode_response(&frame) {
            DecodedFrame::Data(parsed) => {
                assert_eq!(parsed.transaction_id, 0x002A);
                assert_eq!(parsed.unit, 1);
                assert_eq!(parsed.function, 3);
                assert_eq!(parsed.payload, vec![0xDE, 0xAD, 0xBE, 0xEF]);
            }
            other => panic!("expected data, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_declared_count_beyond_buffer_is_malformed() {
        let frame = [0x00, 0x01, 0, 0, 0, 7, 1, 3, 4, 0xDE, 0xAD];
        assert_eq!(
            decode_response(&frame),
            DecodedFrame::Malformed {
                declared: 4,
                available: 2
            }
        );
    }

    #[test]
    fn test_request_round_trip() {
        for (unit, function, start, quantity) in [
            (1u8, 0x03u8, 0x0000u16, 2u16),
            (247, 0x04, 0xFFFF, 128),
            (9, 0x01, 0x1234, 17),
        ] {
            let frame = encode_request(0x0101, unit, function, start, quantity, None).unwrap();
            let (_, u, f, s, q) = parse_request(&frame);
            assert_eq!((u, f, s, q), (unit, function, start, quantity));
        }
    }
}
