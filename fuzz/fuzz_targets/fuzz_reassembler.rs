//! Fuzz target: `Reassembler::feed`
//!
//! Decodes the input as a sequence of 7-byte fragment headers
//! `[offset_u16, total_u16, len_u16, flags]` each followed by `len` payload
//! bytes (clamped to what remains) and feeds them to a small reassembler.
//!
//! Invariants checked:
//! - No panics under any fragment sequence
//! - A completed message never exceeds the channel capacity
//! - `message()` is present exactly when the last feed completed
//!
//! cargo fuzz run fuzz_reassembler

#![no_main]

use libfuzzer_sys::fuzz_target;
use navlink::protocol::{Channel, Fragment, Progress, Reassembler};

const CAPACITY: usize = 1024;

fuzz_target!(|data: &[u8]| {
    let mut r = Reassembler::new(Channel::Binary, CAPACITY);
    let mut rest = data;

    while rest.len() >= 7 {
        let word = |i: usize| usize::from(u16::from_le_bytes([rest[i], rest[i + 1]]));
        let offset = word(0);
        let total = word(2);
        let len = word(4).min(rest.len() - 7);
        let flags = rest[6];
        let payload = &rest[7..7 + len];
        rest = &rest[7 + len..];

        let frag = Fragment {
            channel: Channel::Binary,
            offset,
            total,
            is_final: flags & 1 != 0,
            data: payload,
        };
        match r.feed(&frag) {
            Ok(Progress::Complete(n)) => {
                assert!(n <= CAPACITY, "completed {n} bytes over capacity");
                assert_eq!(r.message().map(<[u8]>::len), Some(n));
            }
            _ => assert!(r.message().is_none(), "stale message after non-completing feed"),
        }

        if flags & 0x80 != 0 {
            r.release();
        }
    }
});
