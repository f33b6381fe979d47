//! VBA run-length compression algorithm
//!
//! Every module's source text, and the dir stream, is stored inside a CompressedContainer. This is
//! a signature byte followed by a run of chunks, each of which decompresses to at most 4096 bytes.
//!
//! Specification is section 2.4.1 of MS-OVBA
use crate::error;

const CONTAINER_SIGNATURE: u8 = 0x01;
const CHUNK_SIGNATURE: u8 = 0b011;
const CHUNK_SIZE: usize = 4096;

/// Decompress a CompressedContainer back into the raw bytes it holds
///
/// # Reference
/// MS-OVBA section 2.4.1.3.1
///
/// # Error
/// Will generate an error if:
/// - the container is empty or does not start with 0x01
/// - a chunk header does not carry the 0b011 signature
/// - the data stops part way through a chunk header or copy token
/// - a copy token refers back past the start of the chunk it sits in
pub fn decompress<D: AsRef<[u8]>>(compressed: D) -> Result<Vec<u8>, error::Decompression> {
    let compressed = compressed.as_ref();
    match compressed.first() {
        None => return Err(error::Decompression::Empty),
        Some(&CONTAINER_SIGNATURE) => (),
        Some(&b) => return Err(error::Decompression::Signature(b)),
    }

    let mut out = Vec::with_capacity(compressed.len() * 2);
    let mut pos = 1;
    while pos < compressed.len() {
        let Some(header) = read_u16(compressed, pos) else {
            return Err(error::Decompression::Truncated { position: pos });
        };
        let size = usize::from(header & 0x0fff) + 3;
        #[allow(clippy::cast_possible_truncation)]
        let signature = ((header >> 12) & 0b111) as u8;
        if signature != CHUNK_SIGNATURE {
            return Err(error::Decompression::ChunkSignature {
                position: pos,
                signature,
            });
        }
        let is_compressed = header & 0x8000 == 0x8000;

        // Some writers get the final chunk size wrong so clamp to what is actually there
        let chunk_end = compressed.len().min(pos + size);
        pos += 2;

        if is_compressed {
            decompress_chunk(compressed, pos, chunk_end, &mut out)?;
        } else {
            out.extend_from_slice(&compressed[pos..chunk_end]);
        }
        pos = chunk_end;
    }

    Ok(out)
}

fn decompress_chunk(
    compressed: &[u8],
    mut pos: usize,
    end: usize,
    out: &mut Vec<u8>,
) -> Result<(), error::Decompression> {
    let chunk_start = out.len();
    while pos < end {
        let flags = compressed[pos];
        pos += 1;
        for bit in 0..8 {
            if pos >= end {
                break;
            }
            if flags & (1 << bit) == 0 {
                out.push(compressed[pos]);
                pos += 1;
                continue;
            }

            let token = match read_u16(compressed, pos) {
                Some(t) if pos + 2 <= end => t,
                _ => return Err(error::Decompression::Truncated { position: pos }),
            };
            let (offset, length) = unpack_copy_token(token, out.len() - chunk_start);
            if offset > out.len() - chunk_start {
                return Err(error::Decompression::CopyBeforeStart {
                    position: pos,
                    offset,
                });
            }
            // Copy one byte at a time as the source can run into the bytes being written
            let source = out.len() - offset;
            for i in 0..length {
                out.push(out[source + i]);
            }
            pos += 2;
        }
    }
    Ok(())
}

/// Compress raw bytes into a CompressedContainer
///
/// Uses a greedy longest match within each chunk, preferring the nearest candidate when two are
/// equally long. If a chunk does not compress below 4096 bytes it is written raw, in which case it
/// is padded out to a full 4096 bytes.
///
/// # Reference
/// MS-OVBA section 2.4.1.3.6
pub fn compress<D: AsRef<[u8]>>(data: D) -> Vec<u8> {
    let data = data.as_ref();
    let mut out = Vec::with_capacity(data.len() + 1);
    out.push(CONTAINER_SIGNATURE);

    for chunk_start in (0..data.len()).step_by(CHUNK_SIZE) {
        let chunk_end = data.len().min(chunk_start + CHUNK_SIZE);
        let tokens = compress_chunk(data, chunk_start, chunk_end);
        if tokens.len() > CHUNK_SIZE {
            out.extend_from_slice(&chunk_header(CHUNK_SIZE, false).to_le_bytes());
            out.extend_from_slice(&data[chunk_start..chunk_end]);
            out.resize(out.len() + CHUNK_SIZE - (chunk_end - chunk_start), 0);
        } else {
            out.extend_from_slice(&chunk_header(tokens.len(), true).to_le_bytes());
            out.extend_from_slice(&tokens);
        }
    }

    out
}

fn compress_chunk(data: &[u8], start: usize, end: usize) -> Vec<u8> {
    let mut tokens = Vec::with_capacity(end - start);
    let mut current = start;
    while current < end {
        let flag_index = tokens.len();
        tokens.push(0);
        for bit in 0..8 {
            if current >= end {
                break;
            }
            match longest_match(data, start, current, end) {
                Some((offset, length)) => {
                    let token = pack_copy_token(offset, length, current - start);
                    tokens.extend_from_slice(&token.to_le_bytes());
                    tokens[flag_index] |= 1 << bit;
                    current += length;
                }
                None => {
                    tokens.push(data[current]);
                    current += 1;
                }
            }
        }
    }
    tokens
}

fn longest_match(data: &[u8], start: usize, current: usize, end: usize) -> Option<(usize, usize)> {
    if current == start {
        return None;
    }
    let max_length = max_copy_length(current - start);
    let mut best: Option<(usize, usize)> = None;
    for candidate in (start..current).rev() {
        let length = (0..max_length)
            .take_while(|&i| current + i < end && data[candidate + i] == data[current + i])
            .count();
        if length >= 3 && best.map_or(true, |(_, l)| length > l) {
            best = Some((current - candidate, length));
        }
    }
    best
}

/// Number of bits given over to the offset in a copy token, which grows as the chunk fills up
fn offset_bit_count(decompressed_in_chunk: usize) -> u32 {
    let mut bits = 4;
    while (1 << bits) < decompressed_in_chunk {
        bits += 1;
    }
    bits
}

/// The longest run a single copy token can describe at this point in the chunk
fn max_copy_length(decompressed_in_chunk: usize) -> usize {
    usize::from(0xffff_u16 >> offset_bit_count(decompressed_in_chunk)) + 3
}

fn unpack_copy_token(token: u16, decompressed_in_chunk: usize) -> (usize, usize) {
    let bits = offset_bit_count(decompressed_in_chunk);
    let length_mask = 0xffff_u16 >> bits;
    let length = usize::from(token & length_mask) + 3;
    let offset = usize::from(token >> (16 - bits)) + 1;
    (offset, length)
}

// Offsets and lengths are bounded by the chunk size so always fit the token
#[allow(clippy::cast_possible_truncation)]
fn pack_copy_token(offset: usize, length: usize, decompressed_in_chunk: usize) -> u16 {
    let bits = offset_bit_count(decompressed_in_chunk);
    (((offset - 1) as u16) << (16 - bits)) | ((length - 3) as u16)
}

#[allow(clippy::cast_possible_truncation)]
const fn chunk_header(chunk_size: usize, is_compressed: bool) -> u16 {
    let size = ((chunk_size + 2 - 3) & 0x0fff) as u16;
    let flag = if is_compressed { 0x8000 } else { 0 };
    flag | ((CHUNK_SIGNATURE as u16) << 12) | size
}

fn read_u16(data: &[u8], pos: usize) -> Option<u16> {
    let bytes = data.get(pos..pos + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}
