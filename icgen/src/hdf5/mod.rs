//! A minimal HDF5 implementation, able to write and read back the files used
//! to store snapshots.
//!
//! Only a small subset of the file format is supported. Files are written
//! with a version 2 superblock, version 2 object headers, groups with compact
//! link storage and compact attributes. This is enough to create files
//! readable by the standard HDF5 library and tools (`h5dump`, `h5py`, ...).
//!
//! When reading, both the default format of the HDF5 library (version 0 or 1
//! superblock, version 1 object headers, groups stored with a symbol table)
//! and the newer format (used with `libver="latest"`) are supported. Datasets
//! must use contiguous or compact storage of little-endian integers or IEEE
//! floating point numbers.

use ndarray::{ArrayD, IxDyn};

use crate::Error;

mod checksum;
pub use self::checksum::lookup3;

mod messages;
mod symbol_table;

mod writer;
pub use self::writer::{FileBuilder, GroupBuilder};

mod reader;
pub use self::reader::{File, Group, Dataset, Attribute};

/// Value used to mark undefined addresses in the file
const UNDEFINED_ADDRESS: u64 = u64::MAX;

/// Signature at the start of all HDF5 files
const SIGNATURE: [u8; 8] = [0x89, b'H', b'D', b'F', b'\r', b'\n', 0x1a, b'\n'];

/// Data types that can be stored in datasets and attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datatype {
    /// Little-endian integer with the given size in bytes
    Integer {
        /// size of a single value, in bytes
        size: usize,
        /// is this a signed integer?
        signed: bool,
    },
    /// Little-endian IEEE 754 floating point number with the given size in
    /// bytes (4 or 8)
    Float {
        /// size of a single value, in bytes
        size: usize,
    },
}

impl Datatype {
    /// Size in bytes of a single element of this type
    pub fn size(&self) -> usize {
        match *self {
            Datatype::Integer { size, .. } | Datatype::Float { size } => size,
        }
    }
}

impl std::fmt::Display for Datatype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Datatype::Integer { size, signed: true } => write!(f, "int{}", 8 * size),
            Datatype::Integer { size, signed: false } => write!(f, "uint{}", 8 * size),
            Datatype::Float { size } => write!(f, "float{}", 8 * size),
        }
    }
}

/// A single value read from a file, before conversion to the requested type
#[derive(Debug, Clone, Copy)]
enum Element {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

/// Rust types which can be written to and read from HDF5 files.
///
/// When reading, values stored with a different type are converted to `Self`
/// if this is possible without overflow. Floating point values can not be read
/// as integers.
pub trait H5Type: Copy + num_traits::NumCast + num_traits::Zero + 'static {
    /// The HDF5 datatype corresponding to this type
    const DATATYPE: Datatype;

    /// Append the little-endian representation of `self` to `buffer`
    fn write_le(self, buffer: &mut Vec<u8>);
}

macro_rules! impl_h5_type {
    ($type: ty, $datatype: expr) => {
        impl H5Type for $type {
            const DATATYPE: Datatype = $datatype;

            fn write_le(self, buffer: &mut Vec<u8>) {
                buffer.extend_from_slice(&self.to_le_bytes());
            }
        }
    };
}

impl_h5_type!(i32, Datatype::Integer { size: 4, signed: true });
impl_h5_type!(i64, Datatype::Integer { size: 8, signed: true });
impl_h5_type!(u32, Datatype::Integer { size: 4, signed: false });
impl_h5_type!(u64, Datatype::Integer { size: 8, signed: false });
impl_h5_type!(f32, Datatype::Float { size: 4 });
impl_h5_type!(f64, Datatype::Float { size: 8 });

/// Decode a single element of the given `datatype` from `bytes`
fn decode_element(datatype: Datatype, bytes: &[u8]) -> Element {
    let mut buffer = [0_u8; 8];
    buffer[..bytes.len()].copy_from_slice(bytes);

    match datatype {
        Datatype::Integer { size, signed: true } => {
            // sign extension for integers smaller than 8 bytes
            let shift = 64 - 8 * size as u32;
            let value = i64::from_le_bytes(buffer);
            Element::Signed((value << shift) >> shift)
        }
        Datatype::Integer { signed: false, .. } => Element::Unsigned(u64::from_le_bytes(buffer)),
        Datatype::Float { size: 4 } => {
            let mut single = [0_u8; 4];
            single.copy_from_slice(&buffer[..4]);
            Element::Float(f32::from_le_bytes(single) as f64)
        }
        Datatype::Float { .. } => Element::Float(f64::from_le_bytes(buffer)),
    }
}

/// Get the number of elements in an array with the given `shape`
fn element_count(shape: &[usize]) -> Result<usize, Error> {
    return shape.iter()
        .try_fold(1_usize, |count, &dimension| count.checked_mul(dimension))
        .ok_or_else(|| Error::Hdf5(format!("shape {:?} contains too many elements", shape)));
}

/// Get the number of bytes needed to store an array of `datatype` with the
/// given `shape`
fn data_size(datatype: Datatype, shape: &[usize]) -> Result<usize, Error> {
    return element_count(shape)?
        .checked_mul(datatype.size())
        .ok_or_else(|| Error::Hdf5(format!("shape {:?} is too large for {} data", shape, datatype)));
}

/// Create an array of zeros with the given `shape`. Failing to allocate the
/// memory is reported as an error.
fn zeros<T: H5Type>(shape: &[usize]) -> Result<ArrayD<T>, Error> {
    let count = element_count(shape)?;

    let mut values = Vec::new();
    values.try_reserve_exact(count).map_err(|e| Error::Hdf5(format!(
        "failed to allocate memory for {} values: {}", count, e
    )))?;
    values.resize(count, T::zero());

    return ArrayD::from_shape_vec(IxDyn(shape), values).map_err(|e| Error::Hdf5(format!(
        "invalid data shape: {}", e
    )));
}

/// Check that data stored as `datatype` can be read into `T`
fn check_conversion<T: H5Type>(datatype: Datatype) -> Result<(), Error> {
    if matches!(datatype, Datatype::Float { .. }) && matches!(T::DATATYPE, Datatype::Integer { .. }) {
        return Err(Error::Hdf5(format!(
            "can not read data stored as {} into {}", datatype, T::DATATYPE
        )));
    }
    return Ok(());
}

/// Convert raw `data` with the given `datatype` and `shape` to an array of `T`
fn convert_data<T: H5Type>(datatype: Datatype, shape: &[usize], data: &[u8]) -> Result<ArrayD<T>, Error> {
    check_conversion::<T>(datatype)?;

    let count = element_count(shape)?;
    let expected = data_size(datatype, shape)?;
    if data.len() < expected {
        return Err(Error::Hdf5(format!(
            "expected {} bytes of data for shape {:?}, got {}", expected, shape, data.len()
        )));
    }

    let size = datatype.size();
    let mut values = Vec::with_capacity(count);
    for bytes in data[..expected].chunks_exact(size) {
        let converted = match decode_element(datatype, bytes) {
            Element::Signed(value) => <T as num_traits::NumCast>::from(value),
            Element::Unsigned(value) => <T as num_traits::NumCast>::from(value),
            Element::Float(value) => <T as num_traits::NumCast>::from(value),
        };

        match converted {
            Some(value) => values.push(value),
            None => {
                return Err(Error::Hdf5(format!(
                    "value stored as {} does not fit in {}", datatype, T::DATATYPE
                )));
            }
        }
    }

    return ArrayD::from_shape_vec(IxDyn(shape), values).map_err(|e| Error::Hdf5(format!(
        "invalid data shape: {}", e
    )));
}
