//! Primitive wire decoders: varints, path encodings and fixed-width fields.
//!
//! Stateless. Every reader fails with [`WireError::MalformedPacket`] on short
//! input instead of panicking.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::error::WireError;
use crate::types::{PublicKey, Signature, KEY_SIZE, SIGNATURE_SIZE, U64_SIZE};

const CONTINUATION: u8 = 0x80;
const DIGIT_MASK: u8 = 0x7f;

/// Longest varint accepted, in bytes. Wide enough for any length or counter
/// a peer has reason to send.
pub const MAX_VARINT_LEN: usize = 64;

/// Longest path encoding accepted, in bytes.
///
/// Path digits are weighted by their absolute offset, so the decoded form
/// grows with the square of the input length.
pub const MAX_PATH_LEN: usize = 256;

// ── Varints ──────────────────────────────────────────────────────────

/// Decode a base-128 little-endian varint of any width up to
/// [`MAX_VARINT_LEN`] bytes.
///
/// Returns `(value, bytes_consumed)`. A buffer that ends before a terminating
/// byte is [`WireError::MalformedVarInt`]; a varint that runs past the limit
/// is [`WireError::MalformedPacket`].
pub fn decode_varint(bytes: &[u8]) -> Result<(BigUint, usize), WireError> {
    let terminator = bytes
        .iter()
        .take(MAX_VARINT_LEN)
        .position(|&b| b & CONTINUATION == 0);
    match terminator {
        Some(end) => Ok((from_digits(&bytes[..=end]), end + 1)),
        None if bytes.len() > MAX_VARINT_LEN => Err(WireError::malformed(format!(
            "varint longer than {MAX_VARINT_LEN} bytes"
        ))),
        None => Err(WireError::MalformedVarInt),
    }
}

/// Value of a run of base-128 digits, least significant first.
fn from_digits(bytes: &[u8]) -> BigUint {
    if bytes.is_empty() {
        return BigUint::zero();
    }
    let digits: Vec<u8> = bytes.iter().map(|b| b & DIGIT_MASK).collect();
    // Every digit is below 128, so this cannot fail.
    BigUint::from_radix_le(&digits, 128).unwrap_or_default()
}

/// Encode a varint of any width. Inverse of [`decode_varint`].
pub fn encode_varint(value: &BigUint) -> Vec<u8> {
    let mut out = Vec::new();
    let mut rest = value.clone();
    loop {
        let digit = (rest.iter_u64_digits().next().unwrap_or(0) as u8) & DIGIT_MASK;
        rest = rest >> 7usize;
        if rest.is_zero() {
            out.push(digit);
            return out;
        }
        out.push(digit | CONTINUATION);
    }
}

/// Encode a `u64` varint without going through `BigUint`.
pub fn encode_varint_u64(mut value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(10);
    while value >= u64::from(CONTINUATION) {
        out.push((value as u8) | CONTINUATION);
        value >>= 7;
    }
    out.push(value as u8);
    out
}

// ── Paths ────────────────────────────────────────────────────────────

/// Decode a tree path the way deployed peers encode it.
///
/// Each digit is weighted by `128^offset` where `offset` is the byte's
/// position in the whole buffer, not in the current element. A byte with
/// bit 7 clear closes the current element and opens the next one, so the
/// result always ends with the element that was being accumulated. The first
/// raw zero byte stops the entire decode.
///
/// Input longer than [`MAX_PATH_LEN`] is rejected before any decoding.
pub fn decode_path(bytes: &[u8]) -> Result<Vec<BigUint>, WireError> {
    if bytes.len() > MAX_PATH_LEN {
        return Err(WireError::malformed(format!(
            "path: {} bytes exceeds limit of {MAX_PATH_LEN}",
            bytes.len()
        )));
    }

    let end = path_terminator(bytes).unwrap_or(bytes.len());
    let mut path = Vec::new();
    let mut start = 0;
    for (offset, &byte) in bytes[..end].iter().enumerate() {
        if byte & CONTINUATION == 0 {
            path.push(from_digits(&bytes[start..=offset]) << (7 * start));
            start = offset + 1;
        }
    }
    path.push(from_digits(&bytes[start..end]) << (7 * start));
    Ok(path)
}

/// Position of the zero byte that terminates a path encoding, if any.
pub fn path_terminator(bytes: &[u8]) -> Option<usize> {
    bytes.iter().position(|&b| b == 0)
}

// ── Fixed-width fields ───────────────────────────────────────────────

/// Read a 32-byte public key at `offset`.
pub fn read_key(buf: &[u8], offset: usize) -> Result<PublicKey, WireError> {
    Ok(PublicKey(read_array(buf, offset, "public key")?))
}

/// Read a 64-byte signature at `offset`.
pub fn read_signature(buf: &[u8], offset: usize) -> Result<Signature, WireError> {
    Ok(Signature(read_array(buf, offset, "signature")?))
}

/// Read a big-endian `u64` at `offset`.
pub fn read_u64(buf: &[u8], offset: usize) -> Result<u64, WireError> {
    Ok(u64::from_be_bytes(read_array(buf, offset, "u64")?))
}

fn read_array<const N: usize>(
    buf: &[u8],
    offset: usize,
    what: &str,
) -> Result<[u8; N], WireError> {
    offset
        .checked_add(N)
        .and_then(|end| buf.get(offset..end))
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| {
            WireError::malformed(format!(
                "{what}: need {N} bytes at offset {offset}, buffer has {}",
                buf.len()
            ))
        })
}

/// Sequential cursor over a packet body.
///
/// `context` names the structure being decoded and prefixes error reasons.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    context: &'static str,
}

impl<'a> Reader<'a> {
    /// Start at the beginning of `buf`.
    pub fn new(buf: &'a [u8], context: &'static str) -> Self {
        Self {
            buf,
            pos: 0,
            context,
        }
    }

    /// Read a 32-byte key and advance past it.
    pub fn key(&mut self) -> Result<PublicKey, WireError> {
        let key = read_key(self.buf, self.pos).map_err(|e| self.annotate(e))?;
        self.pos += KEY_SIZE;
        Ok(key)
    }

    /// Read a 64-byte signature and advance past it.
    pub fn signature(&mut self) -> Result<Signature, WireError> {
        let sig = read_signature(self.buf, self.pos).map_err(|e| self.annotate(e))?;
        self.pos += SIGNATURE_SIZE;
        Ok(sig)
    }

    /// Read a big-endian `u64` and advance past it.
    pub fn u64(&mut self) -> Result<u64, WireError> {
        let value = read_u64(self.buf, self.pos).map_err(|e| self.annotate(e))?;
        self.pos += U64_SIZE;
        Ok(value)
    }

    /// Consume and return everything left.
    pub fn rest(&mut self) -> &'a [u8] {
        let rest = &self.buf[self.pos..];
        self.pos = self.buf.len();
        rest
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn annotate(&self, err: WireError) -> WireError {
        match err {
            WireError::MalformedPacket { reason } => {
                WireError::malformed(format!("{}: {reason}", self.context))
            }
            other => other,
        }
    }
}
