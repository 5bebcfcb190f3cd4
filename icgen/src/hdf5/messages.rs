//! Encoding and decoding of the HDF5 metadata structures: superblock, object
//! headers and header messages.

use std::collections::BTreeSet;

use crate::Error;

use super::{Datatype, SIGNATURE, UNDEFINED_ADDRESS};
use super::checksum::lookup3;

pub const NIL: u8 = 0x00;
pub const DATASPACE: u8 = 0x01;
pub const LINK_INFO: u8 = 0x02;
pub const DATATYPE: u8 = 0x03;
pub const FILL_VALUE: u8 = 0x05;
pub const LINK: u8 = 0x06;
pub const DATA_LAYOUT: u8 = 0x08;
pub const GROUP_INFO: u8 = 0x0A;
pub const ATTRIBUTE: u8 = 0x0C;
pub const CONTINUATION: u8 = 0x10;
pub const SYMBOL_TABLE: u8 = 0x11;
pub const ATTRIBUTE_INFO: u8 = 0x15;

/// Message flag marking constant messages
pub const CONSTANT: u8 = 0x01;
/// Message flag marking messages stored elsewhere in the file
pub const SHARED: u8 = 0x02;

/// Size of the version 2 superblock
pub const SUPERBLOCK_SIZE: usize = 48;

/// A header message, ready to be written to an object header
#[derive(Debug, Clone)]
pub struct Message {
    pub kind: u8,
    pub flags: u8,
    pub data: Vec<u8>,
}

impl Message {
    pub fn new(kind: u8, data: Vec<u8>) -> Message {
        Message { kind: kind, flags: 0, data: data }
    }

    pub fn constant(kind: u8, data: Vec<u8>) -> Message {
        Message { kind: kind, flags: CONSTANT, data: data }
    }
}

/// A header message read from a file
#[derive(Debug, Clone, Copy)]
pub struct RawMessage<'a> {
    pub kind: u8,
    pub flags: u8,
    pub data: &'a [u8],
}

/******************************************************************************/

pub fn encode_superblock(end_of_file: u64, root: u64) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(SUPERBLOCK_SIZE);
    buffer.extend_from_slice(&SIGNATURE);
    // version, size of offsets, size of lengths, flags
    buffer.extend_from_slice(&[2, 8, 8, 0]);
    // base address
    buffer.extend_from_slice(&0_u64.to_le_bytes());
    // superblock extension address
    buffer.extend_from_slice(&UNDEFINED_ADDRESS.to_le_bytes());
    buffer.extend_from_slice(&end_of_file.to_le_bytes());
    buffer.extend_from_slice(&root.to_le_bytes());

    let checksum = lookup3(&buffer);
    buffer.extend_from_slice(&checksum.to_le_bytes());

    debug_assert_eq!(buffer.len(), SUPERBLOCK_SIZE);
    return buffer;
}

/// Encode a version 2 object header containing the given messages.
/// `n_attributes` is used to set the attribute storage phase change values.
pub fn encode_object_header(messages: &[Message], n_attributes: usize) -> Vec<u8> {
    let mut chunk = Vec::new();
    for message in messages {
        chunk.push(message.kind);
        chunk.extend_from_slice(&(message.data.len() as u16).to_le_bytes());
        chunk.push(message.flags);
        chunk.extend_from_slice(&message.data);
    }

    let max_compact = n_attributes.clamp(8, u16::MAX as usize) as u16;
    let min_dense = 6_u16;

    let mut buffer = Vec::with_capacity(chunk.len() + 20);
    buffer.extend_from_slice(b"OHDR");
    buffer.push(2);
    // chunk size stored on 4 bytes, attribute phase change values stored
    buffer.push(0x02 | 0x10);
    buffer.extend_from_slice(&max_compact.to_le_bytes());
    buffer.extend_from_slice(&min_dense.to_le_bytes());
    buffer.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
    buffer.extend_from_slice(&chunk);

    let checksum = lookup3(&buffer);
    buffer.extend_from_slice(&checksum.to_le_bytes());

    return buffer;
}

pub fn encode_dataspace(shape: &[usize]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(4 + 8 * shape.len());
    let kind = if shape.is_empty() { 0 } else { 1 };
    buffer.extend_from_slice(&[2, shape.len() as u8, 0, kind]);
    for &dimension in shape {
        buffer.extend_from_slice(&(dimension as u64).to_le_bytes());
    }
    return buffer;
}

pub fn encode_datatype(datatype: Datatype) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(20);
    match datatype {
        Datatype::Integer { size, signed } => {
            let bits = if signed { 0x08 } else { 0x00 };
            buffer.extend_from_slice(&[0x10, bits, 0, 0]);
            buffer.extend_from_slice(&(size as u32).to_le_bytes());
            // bit offset and precision
            buffer.extend_from_slice(&0_u16.to_le_bytes());
            buffer.extend_from_slice(&(8 * size as u16).to_le_bytes());
        }
        Datatype::Float { size } => {
            let (exponent_location, exponent_size, mantissa_size, bias) = if size == 4 {
                (23_u8, 8_u8, 23_u8, 127_u32)
            } else {
                (52, 11, 52, 1023)
            };
            let sign_location = (8 * size - 1) as u8;

            // implied mantissa normalization, sign bit location
            buffer.extend_from_slice(&[0x11, 0x20, sign_location, 0]);
            buffer.extend_from_slice(&(size as u32).to_le_bytes());
            buffer.extend_from_slice(&0_u16.to_le_bytes());
            buffer.extend_from_slice(&(8 * size as u16).to_le_bytes());
            buffer.extend_from_slice(&[exponent_location, exponent_size, 0, mantissa_size]);
            buffer.extend_from_slice(&bias.to_le_bytes());
        }
    }
    return buffer;
}

pub fn encode_fill_value() -> Vec<u8> {
    // late space allocation, write fill value if set, no fill value defined
    vec![3, 0x02 | 0x08]
}

pub fn encode_contiguous_layout(address: u64, size: u64) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(18);
    buffer.extend_from_slice(&[3, 1]);
    buffer.extend_from_slice(&address.to_le_bytes());
    buffer.extend_from_slice(&size.to_le_bytes());
    return buffer;
}

pub fn encode_link_info() -> Vec<u8> {
    let mut buffer = Vec::with_capacity(18);
    buffer.extend_from_slice(&[0, 0]);
    // no fractal heap and no name index, all links are stored in the header
    buffer.extend_from_slice(&UNDEFINED_ADDRESS.to_le_bytes());
    buffer.extend_from_slice(&UNDEFINED_ADDRESS.to_le_bytes());
    return buffer;
}

pub fn encode_group_info() -> Vec<u8> {
    vec![0, 0]
}

pub fn encode_link(name: &str, address: u64) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(name.len() + 12);
    buffer.push(1);
    if name.len() <= u8::MAX as usize {
        buffer.push(0x00);
        buffer.push(name.len() as u8);
    } else {
        buffer.push(0x01);
        buffer.extend_from_slice(&(name.len() as u16).to_le_bytes());
    }
    buffer.extend_from_slice(name.as_bytes());
    buffer.extend_from_slice(&address.to_le_bytes());
    return buffer;
}

pub fn encode_attribute(name: &str, datatype: Datatype, shape: &[usize], data: &[u8]) -> Vec<u8> {
    let datatype = encode_datatype(datatype);
    let dataspace = encode_dataspace(shape);

    let mut buffer = Vec::new();
    buffer.extend_from_slice(&[3, 0]);
    buffer.extend_from_slice(&(name.len() as u16 + 1).to_le_bytes());
    buffer.extend_from_slice(&(datatype.len() as u16).to_le_bytes());
    buffer.extend_from_slice(&(dataspace.len() as u16).to_le_bytes());
    // ASCII name
    buffer.push(0);
    buffer.extend_from_slice(name.as_bytes());
    buffer.push(0);
    buffer.extend_from_slice(&datatype);
    buffer.extend_from_slice(&dataspace);
    buffer.extend_from_slice(data);
    return buffer;
}

/******************************************************************************/

pub fn hdf5_error(message: impl Into<String>) -> Error {
    Error::Hdf5(message.into())
}

/// Sequential reader over a slice of bytes, returning errors instead of
/// panicking when reading past the end.
pub struct Cursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Cursor<'a> {
        Cursor { data: data, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], Error> {
        if count > self.remaining() {
            return Err(hdf5_error(format!(
                "unexpected end of data: tried to read {} bytes with {} remaining",
                count, self.remaining()
            )));
        }

        let bytes = &self.data[self.position..self.position + count];
        self.position += count;
        return Ok(bytes);
    }

    pub fn skip(&mut self, count: usize) -> Result<(), Error> {
        self.read_bytes(count)?;
        return Ok(());
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, Error> {
        self.read_sized(2).map(|value| value as u16)
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        self.read_sized(4).map(|value| value as u32)
    }

    pub fn read_u64(&mut self) -> Result<u64, Error> {
        self.read_sized(8)
    }

    /// Read a little-endian unsigned integer stored on `size` bytes
    pub fn read_sized(&mut self, size: usize) -> Result<u64, Error> {
        if size > 8 {
            return Err(hdf5_error(format!("invalid integer size {}", size)));
        }

        let mut buffer = [0_u8; 8];
        buffer[..size].copy_from_slice(self.read_bytes(size)?);
        return Ok(u64::from_le_bytes(buffer));
    }
}

pub fn to_usize(value: u64) -> Result<usize, Error> {
    usize::try_from(value).map_err(|_| hdf5_error(format!("value {} is too large for this platform", value)))
}

pub fn checked_range(file: &[u8], start: u64, length: u64) -> Result<&[u8], Error> {
    let start = to_usize(start)?;
    let end = start.checked_add(to_usize(length)?);
    match end {
        Some(end) if end <= file.len() => Ok(&file[start..end]),
        _ => Err(hdf5_error(format!(
            "trying to read {} bytes at address {}, past the end of the file", length, start
        ))),
    }
}

fn verify_checksum(data: &[u8], expected: u32, what: &str) -> Result<(), Error> {
    let actual = lookup3(data);
    if actual != expected {
        return Err(hdf5_error(format!(
            "invalid checksum for {}: expected {:#010x}, got {:#010x}", what, expected, actual
        )));
    }
    return Ok(());
}

/// Location of the root group in a file, and base address for all other
/// addresses
#[derive(Debug, Clone, Copy)]
pub struct Superblock {
    pub base: u64,
    pub root: u64,
}

pub fn decode_superblock(file: &[u8]) -> Result<Superblock, Error> {
    // the superblock can be located after a user block with a size which is
    // a power of two
    let mut offset = 0;
    while offset + SIGNATURE.len() <= file.len() {
        if file[offset..offset + SIGNATURE.len()] == SIGNATURE {
            return decode_superblock_at(file, offset);
        }
        offset = if offset == 0 { 512 } else { 2 * offset };
    }

    return Err(hdf5_error("could not find the HDF5 signature, this is not an HDF5 file"));
}

fn decode_superblock_at(file: &[u8], offset: usize) -> Result<Superblock, Error> {
    let mut cursor = Cursor::new(&file[offset..]);
    cursor.skip(SIGNATURE.len())?;

    let version = cursor.read_u8()?;
    match version {
        0 | 1 => return decode_superblock_v0(cursor, version),
        2 | 3 => {}
        _ => return Err(hdf5_error(format!(
            "superblock version {} is not supported, only versions 0 to 3 can be read", version
        ))),
    }

    check_sizes(cursor.read_u8()?, cursor.read_u8()?)?;

    let _flags = cursor.read_u8()?;
    let base = cursor.read_u64()?;
    let _extension = cursor.read_u64()?;
    let _end_of_file = cursor.read_u64()?;
    let root = cursor.read_u64()?;

    let checked = &file[offset..offset + cursor.position()];
    let checksum = cursor.read_u32()?;
    verify_checksum(checked, checksum, "superblock")?;

    return Ok(Superblock { base: base, root: root });
}

/// Decode the rest of a version 0 or 1 superblock, which does not have a
/// checksum and stores the root group as a symbol table entry.
fn decode_superblock_v0(mut cursor: Cursor<'_>, version: u8) -> Result<Superblock, Error> {
    // free-space, root group symbol table entry, reserved and shared header
    // message format versions
    cursor.skip(4)?;
    check_sizes(cursor.read_u8()?, cursor.read_u8()?)?;
    cursor.skip(1)?;

    // group leaf and internal node K, file consistency flags
    cursor.skip(8)?;
    if version == 1 {
        // indexed storage internal node K, reserved
        cursor.skip(4)?;
    }

    let base = cursor.read_u64()?;
    let _free_space = cursor.read_u64()?;
    let _end_of_file = cursor.read_u64()?;
    let _driver_information = cursor.read_u64()?;

    let _name_offset = cursor.read_u64()?;
    let root = cursor.read_u64()?;

    return Ok(Superblock { base: base, root: root });
}

fn check_sizes(size_of_offsets: u8, size_of_lengths: u8) -> Result<(), Error> {
    if size_of_offsets != 8 || size_of_lengths != 8 {
        return Err(hdf5_error(format!(
            "only 8-bytes offsets and lengths are supported, got {} and {}",
            size_of_offsets, size_of_lengths
        )));
    }
    return Ok(());
}

/// Read all the messages in the object header at the given absolute
/// `address`, following continuation blocks.
pub fn decode_object_header(file: &[u8], base: u64, address: u64) -> Result<Vec<RawMessage<'_>>, Error> {
    let start = to_usize(address)?;
    if start >= file.len() {
        return Err(hdf5_error(format!("object header address {} is past the end of the file", address)));
    }

    if file[start..].starts_with(b"OHDR") {
        return decode_object_header_v2(file, base, start);
    } else if file[start] == 1 {
        return decode_object_header_v1(file, base, start);
    }

    return Err(hdf5_error(format!("invalid object header signature at address {}", address)));
}

/// Version of an object header, defining how the messages are stored
#[derive(Debug, Clone, Copy)]
enum HeaderVersion {
    /// 8 bytes message headers, continuation blocks without signature
    V1,
    /// 4 or 6 bytes message headers, continuation blocks with signature and
    /// checksum
    V2 { creation_order: bool },
}

fn decode_object_header_v1(file: &[u8], base: u64, start: usize) -> Result<Vec<RawMessage<'_>>, Error> {
    let mut cursor = Cursor::new(&file[start..]);
    let _version = cursor.read_u8()?;
    cursor.skip(1)?;
    let _n_messages = cursor.read_u16()?;
    let _reference_count = cursor.read_u32()?;
    let header_size = cursor.read_u32()?;
    // messages are aligned on 8 bytes
    cursor.skip(4)?;

    let chunk_start = (start + cursor.position()) as u64;
    let chunk = checked_range(file, chunk_start, u64::from(header_size))?;

    return collect_messages(file, base, (chunk_start, chunk), HeaderVersion::V1);
}

fn decode_object_header_v2(file: &[u8], base: u64, start: usize) -> Result<Vec<RawMessage<'_>>, Error> {
    let mut cursor = Cursor::new(&file[start..]);
    cursor.skip(4)?;

    let version = cursor.read_u8()?;
    if version != 2 {
        return Err(hdf5_error(format!("unsupported object header version {}", version)));
    }

    let flags = cursor.read_u8()?;
    if flags & 0x20 != 0 {
        // access, modification, change and birth times
        cursor.skip(16)?;
    }
    if flags & 0x10 != 0 {
        // attribute phase change values
        cursor.skip(4)?;
    }

    let chunk_size = cursor.read_sized(1 << (flags & 0x03))?;
    let chunk_start = start + cursor.position();
    let chunk = checked_range(file, chunk_start as u64, chunk_size)?;
    let chunk_end = chunk_start + chunk.len();

    let checksum = Cursor::new(checked_range(file, chunk_end as u64, 4)?).read_u32()?;
    verify_checksum(&file[start..chunk_end], checksum, "object header")?;

    let version = HeaderVersion::V2 { creation_order: flags & 0x04 != 0 };
    return collect_messages(file, base, (chunk_start as u64, chunk), version);
}

/// Collect the messages in the `first` chunk of an object header (given with
/// its address) and in all the continuation blocks it refers to.
fn collect_messages<'a>(
    file: &'a [u8],
    base: u64,
    first: (u64, &'a [u8]),
    version: HeaderVersion,
) -> Result<Vec<RawMessage<'a>>, Error> {
    let mut visited = BTreeSet::new();
    visited.insert(first.0);

    let mut messages = Vec::new();
    let mut pending = vec![first.1];
    while let Some(chunk) = pending.pop() {
        let decoded = match version {
            HeaderVersion::V1 => decode_messages_v1(chunk)?,
            HeaderVersion::V2 { creation_order } => decode_messages(chunk, creation_order)?,
        };

        for message in decoded {
            if message.kind == CONTINUATION {
                let mut continuation = Cursor::new(message.data);
                let block_address = continuation.read_u64()?.saturating_add(base);
                let block_length = continuation.read_u64()?;

                if !visited.insert(block_address) {
                    return Err(hdf5_error(format!(
                        "object header continuation block at address {} is referenced multiple times",
                        block_address
                    )));
                }

                let block = match version {
                    HeaderVersion::V1 => checked_range(file, block_address, block_length)?,
                    HeaderVersion::V2 { .. } => decode_continuation_block(file, block_address, block_length)?,
                };
                pending.push(block);
            } else {
                messages.push(message);
            }
        }
    }

    return Ok(messages);
}

fn decode_continuation_block(file: &[u8], address: u64, length: u64) -> Result<&[u8], Error> {
    if length < 8 {
        return Err(hdf5_error("object header continuation block is too small"));
    }

    let block = checked_range(file, address, length)?;
    if &block[..4] != b"OCHK" {
        return Err(hdf5_error(format!("invalid continuation block signature at address {}", address)));
    }

    let checked = &block[..block.len() - 4];
    let checksum = Cursor::new(&block[block.len() - 4..]).read_u32()?;
    verify_checksum(checked, checksum, "object header continuation block")?;

    return Ok(&checked[4..]);
}

fn decode_messages(chunk: &[u8], creation_order: bool) -> Result<Vec<RawMessage<'_>>, Error> {
    let header_size = if creation_order { 6 } else { 4 };

    let mut messages = Vec::new();
    let mut cursor = Cursor::new(chunk);
    // a gap smaller than a message header can remain at the end of the chunk
    while cursor.remaining() >= header_size {
        let kind = cursor.read_u8()?;
        let size = cursor.read_u16()? as usize;
        let flags = cursor.read_u8()?;
        if creation_order {
            cursor.skip(2)?;
        }

        let data = cursor.read_bytes(size)?;
        if kind != NIL {
            messages.push(RawMessage { kind: kind, flags: flags, data: data });
        }
    }

    return Ok(messages);
}

fn decode_messages_v1(chunk: &[u8]) -> Result<Vec<RawMessage<'_>>, Error> {
    let mut messages = Vec::new();
    let mut cursor = Cursor::new(chunk);
    while cursor.remaining() >= 8 {
        let kind = cursor.read_u16()?;
        let size = cursor.read_u16()? as usize;
        let flags = cursor.read_u8()?;
        cursor.skip(3)?;

        let data = cursor.read_bytes(size)?;
        // all the message types we understand fit in a byte
        match u8::try_from(kind) {
            Ok(NIL) | Err(_) => {}
            Ok(kind) => messages.push(RawMessage { kind: kind, flags: flags, data: data }),
        }
    }

    return Ok(messages);
}

/// Decode a dataspace message, returning the shape. Scalar dataspaces have an
/// empty shape, and null dataspaces are treated as containing no elements.
pub fn decode_dataspace(data: &[u8]) -> Result<Vec<usize>, Error> {
    let mut cursor = Cursor::new(data);
    let version = cursor.read_u8()?;
    let rank = cursor.read_u8()? as usize;
    let _flags = cursor.read_u8()?;

    match version {
        1 => cursor.skip(5)?,
        2 => {
            let kind = cursor.read_u8()?;
            if kind == 2 {
                return Ok(vec![0]);
            }
        }
        _ => return Err(hdf5_error(format!("unsupported dataspace version {}", version))),
    }

    let mut shape = Vec::with_capacity(rank);
    for _ in 0..rank {
        shape.push(to_usize(cursor.read_u64()?)?);
    }

    return Ok(shape);
}

pub fn decode_datatype(data: &[u8]) -> Result<Datatype, Error> {
    let mut cursor = Cursor::new(data);
    let class = cursor.read_u8()? & 0x0f;
    let bits = cursor.read_bytes(3)?;
    let size = cursor.read_u32()? as usize;

    match class {
        0 => {
            if bits[0] & 0x01 != 0 {
                return Err(hdf5_error("big-endian integers are not supported"));
            }
            if !matches!(size, 1 | 2 | 4 | 8) {
                return Err(hdf5_error(format!("unsupported integer size {}", size)));
            }
            return Ok(Datatype::Integer { size: size, signed: bits[0] & 0x08 != 0 });
        }
        1 => {
            if bits[0] & 0x41 != 0 {
                return Err(hdf5_error("only little-endian floating point numbers are supported"));
            }
            if !matches!(size, 4 | 8) {
                return Err(hdf5_error(format!("unsupported floating point size {}", size)));
            }
            return Ok(Datatype::Float { size: size });
        }
        _ => return Err(hdf5_error(format!("unsupported datatype class {}", class))),
    }
}

/// Storage of the data for a dataset
#[derive(Debug, Clone, Copy)]
pub enum Layout<'a> {
    Compact(&'a [u8]),
    Contiguous { address: u64, size: u64 },
}

pub fn decode_layout(data: &[u8]) -> Result<Layout<'_>, Error> {
    let mut cursor = Cursor::new(data);
    let version = cursor.read_u8()?;
    if version != 3 && version != 4 {
        return Err(hdf5_error(format!("unsupported data layout version {}", version)));
    }

    match cursor.read_u8()? {
        0 => {
            let size = cursor.read_u16()? as usize;
            return Ok(Layout::Compact(cursor.read_bytes(size)?));
        }
        1 => {
            let address = cursor.read_u64()?;
            let size = cursor.read_u64()?;
            return Ok(Layout::Contiguous { address: address, size: size });
        }
        2 => return Err(hdf5_error("chunked datasets are not supported")),
        class => return Err(hdf5_error(format!("unsupported data layout class {}", class))),
    }
}

/// Decode a link message, returning the name and address of hard links, and
/// `None` for soft and external links.
pub fn decode_link(data: &[u8]) -> Result<Option<(String, u64)>, Error> {
    let mut cursor = Cursor::new(data);
    let version = cursor.read_u8()?;
    if version != 1 {
        return Err(hdf5_error(format!("unsupported link message version {}", version)));
    }

    let flags = cursor.read_u8()?;
    let link_type = if flags & 0x08 != 0 { cursor.read_u8()? } else { 0 };
    if flags & 0x04 != 0 {
        // creation order
        cursor.skip(8)?;
    }
    if flags & 0x10 != 0 {
        // character set
        cursor.skip(1)?;
    }

    let name_length = to_usize(cursor.read_sized(1 << (flags & 0x03))?)?;
    let name = String::from_utf8_lossy(cursor.read_bytes(name_length)?).into_owned();

    if link_type != 0 {
        return Ok(None);
    }

    return Ok(Some((name, cursor.read_u64()?)));
}

/// Check that the links of a group are stored in the object header
pub fn check_link_info(data: &[u8]) -> Result<(), Error> {
    check_compact_storage(data, "links")
}

/// Check that the attributes of an object are stored in the object header
pub fn check_attribute_info(data: &[u8]) -> Result<(), Error> {
    check_compact_storage(data, "attributes")
}

fn check_compact_storage(data: &[u8], what: &str) -> Result<(), Error> {
    let mut cursor = Cursor::new(data);
    let _version = cursor.read_u8()?;
    let flags = cursor.read_u8()?;
    if flags & 0x01 != 0 {
        // maximum creation index
        cursor.skip(2)?;
    }

    let heap = cursor.read_u64()?;
    if heap != UNDEFINED_ADDRESS {
        return Err(hdf5_error(format!("dense storage for {} is not supported", what)));
    }

    return Ok(());
}

/// An attribute, as stored in the file
#[derive(Debug, Clone)]
pub struct RawAttribute<'a> {
    pub name: String,
    pub datatype: Datatype,
    pub shape: Vec<usize>,
    pub data: &'a [u8],
}

pub fn decode_attribute(data: &[u8]) -> Result<RawAttribute<'_>, Error> {
    let mut cursor = Cursor::new(data);
    let version = cursor.read_u8()?;
    let flags = cursor.read_u8()?;
    if flags & 0x03 != 0 {
        return Err(hdf5_error("shared datatypes and dataspaces are not supported"));
    }

    let name_size = cursor.read_u16()? as usize;
    let datatype_size = cursor.read_u16()? as usize;
    let dataspace_size = cursor.read_u16()? as usize;

    let padded = |size: usize| {
        if version == 1 { (size + 7) / 8 * 8 } else { size }
    };

    match version {
        1 | 2 => {}
        3 => cursor.skip(1)?,
        _ => return Err(hdf5_error(format!("unsupported attribute message version {}", version))),
    }

    let name = cursor.read_bytes(padded(name_size))?;
    let name = &name[..name_size];
    let name = match name.iter().position(|&c| c == 0) {
        Some(end) => &name[..end],
        None => name,
    };
    let name = String::from_utf8_lossy(name).into_owned();

    let datatype = decode_datatype(cursor.read_bytes(padded(datatype_size))?)?;
    let shape = decode_dataspace(cursor.read_bytes(padded(dataspace_size))?)?;

    let size = super::data_size(datatype, &shape)?;
    let data = cursor.read_bytes(size)?;

    return Ok(RawAttribute {
        name: name,
        datatype: datatype,
        shape: shape,
        data: data,
    });
}
