#![no_main]

use hdrkit_wire::synchsafe::{decode_synchsafe, encode_synchsafe};
use libfuzzer_sys::fuzz_target;

// Fuzz target: synchsafe integer encode->decode roundtrip.
//
// Values below 2^28 must roundtrip; larger values must be rejected.
// Arbitrary 4-byte inputs decode only when no byte has its top bit set.
fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let value = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    match encode_synchsafe(value) {
        Ok(bytes) => assert_eq!(decode_synchsafe(&bytes).unwrap(), value),
        Err(_) => assert!(value >= 1 << 28),
    }
    let decoded = decode_synchsafe(&data[..4]);
    assert_eq!(decoded.is_ok(), data[..4].iter().all(|b| b & 0x80 == 0));
});
