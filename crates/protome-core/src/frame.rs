//! gRPC length-prefixed message framing.
//!
//! ```text
//! +------+----------------------+-----------------+
//! | 0x00 | length (u32, BE)     | payload ...     |
//! +------+----------------------+-----------------+
//!   flag   4 bytes                length bytes
//! ```

use bytes::{BufMut, Bytes, BytesMut};

/// Compression flag + big-endian length.
pub const FRAME_HEADER_LEN: usize = 5;

/// Compression flag value for an uncompressed message.
pub const UNCOMPRESSED: u8 = 0;

pub fn frame(payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame_into(&mut buf, payload);
    buf.freeze()
}

/// Append one frame to `buf`.
///
/// `payload` must be shorter than 4 GiB, the largest length the prefix can
/// carry. gRPC message limits sit far below that.
pub fn frame_into(buf: &mut BytesMut, payload: &[u8]) {
    let len = length_prefix(payload.len());
    buf.reserve(FRAME_HEADER_LEN + payload.len());
    buf.put_u8(UNCOMPRESSED);
    buf.put_u32(len);
    buf.put_slice(payload);
}

fn length_prefix(len: usize) -> u32 {
    debug_assert!(
        u32::try_from(len).is_ok(),
        "gRPC frame payload of {len} bytes exceeds the u32 length prefix"
    );
    u32::try_from(len).unwrap_or(u32::MAX)
}
