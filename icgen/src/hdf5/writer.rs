use std::path::Path;

use ndarray::{ArrayView, Dimension};

use crate::Error;

use super::{Datatype, H5Type, UNDEFINED_ADDRESS};
use super::messages::{self, Message, SUPERBLOCK_SIZE};

/// Raw data for an attribute or a dataset, in C order
#[derive(Debug, Clone)]
struct RawData {
    datatype: Datatype,
    shape: Vec<usize>,
    bytes: Vec<u8>,
}

impl RawData {
    fn new<T: H5Type, D: Dimension>(values: ArrayView<'_, T, D>) -> RawData {
        let mut bytes = Vec::with_capacity(values.len() * T::DATATYPE.size());
        // iteration is always done in logical (C) order
        for &value in values.iter() {
            value.write_le(&mut bytes);
        }

        RawData {
            datatype: T::DATATYPE,
            shape: values.shape().to_vec(),
            bytes: bytes,
        }
    }
}

/// A group under construction, containing other groups, datasets and
/// attributes
#[derive(Debug, Clone, Default)]
pub struct GroupBuilder {
    attributes: Vec<(String, RawData)>,
    groups: Vec<(String, GroupBuilder)>,
    datasets: Vec<(String, RawData)>,
}

impl GroupBuilder {
    fn check_link_name(&self, name: &str) -> Result<(), Error> {
        if name.is_empty() || name == "." || name.contains('/') {
            return Err(Error::Hdf5(format!("invalid name '{}' for a group member", name)));
        }

        if name.len() > u16::MAX as usize {
            return Err(Error::Hdf5(format!("group member names can not be longer than {} bytes", u16::MAX)));
        }

        let exists = self.groups.iter().any(|(n, _)| n == name)
            || self.datasets.iter().any(|(n, _)| n == name);
        if exists {
            return Err(Error::Hdf5(format!("this group already contains a member named '{}'", name)));
        }

        return Ok(());
    }

    /// Create a new sub-group with the given `name` in this group, and get a
    /// reference to it
    pub fn create_group(&mut self, name: &str) -> Result<&mut GroupBuilder, Error> {
        self.check_link_name(name)?;

        let index = self.groups.len();
        self.groups.push((name.into(), GroupBuilder::default()));
        return Ok(&mut self.groups[index].1);
    }

    /// Add a dataset with the given `name` and `values` to this group
    pub fn add_dataset<T: H5Type, D: Dimension>(&mut self, name: &str, values: ArrayView<'_, T, D>) -> Result<(), Error> {
        self.check_link_name(name)?;
        self.datasets.push((name.into(), RawData::new(values)));
        return Ok(());
    }

    /// Add an array attribute with the given `name` and `values` to this
    /// group
    pub fn add_attribute<T: H5Type, D: Dimension>(&mut self, name: &str, values: ArrayView<'_, T, D>) -> Result<(), Error> {
        self.push_attribute(name, RawData::new(values))
    }

    /// Add a scalar attribute with the given `name` and `value` to this group
    pub fn add_scalar_attribute<T: H5Type>(&mut self, name: &str, value: T) -> Result<(), Error> {
        let mut bytes = Vec::with_capacity(T::DATATYPE.size());
        value.write_le(&mut bytes);
        let data = RawData {
            datatype: T::DATATYPE,
            shape: Vec::new(),
            bytes: bytes,
        };
        self.push_attribute(name, data)
    }

    fn push_attribute(&mut self, name: &str, data: RawData) -> Result<(), Error> {
        if name.is_empty() {
            return Err(Error::Hdf5("attribute names can not be empty".into()));
        }

        // the stored size includes a null terminator
        if name.len() >= u16::MAX as usize {
            return Err(Error::Hdf5(format!("attribute names must be shorter than {} bytes", u16::MAX)));
        }

        if self.attributes.iter().any(|(n, _)| n == name) {
            return Err(Error::Hdf5(format!("there is already an attribute named '{}'", name)));
        }

        self.attributes.push((name.into(), data));
        return Ok(());
    }
}

/// Builder for HDF5 files. All the groups, datasets and attributes are
/// accumulated in memory, and the file is written in a single step by
/// [`FileBuilder::write`].
#[derive(Debug, Clone, Default)]
pub struct FileBuilder {
    root: GroupBuilder,
}

/// Groups and datasets in the order they are stored in the file. For each
/// group, the members are given as pairs of name and index in this list.
enum Object<'a> {
    Group(&'a GroupBuilder, Vec<(&'a str, usize)>),
    Dataset(&'a RawData),
}

fn flatten<'a>(group: &'a GroupBuilder, objects: &mut Vec<Object<'a>>) -> usize {
    let index = objects.len();
    objects.push(Object::Group(group, Vec::new()));

    let mut members = Vec::new();
    for (name, child) in &group.groups {
        members.push((name.as_str(), flatten(child, objects)));
    }

    for (name, dataset) in &group.datasets {
        members.push((name.as_str(), objects.len()));
        objects.push(Object::Dataset(dataset));
    }

    objects[index] = Object::Group(group, members);
    return index;
}

fn checked_message(kind: u8, data: Vec<u8>, what: impl FnOnce() -> String) -> Result<Message, Error> {
    if data.len() > u16::MAX as usize {
        return Err(Error::Hdf5(format!("{} is too large to be stored in an object header", what())));
    }
    return Ok(Message::new(kind, data));
}

/// Encode the object header for `object`, using the given addresses for
/// the other objects in the file and for the raw data of datasets.
fn encode_object(object: &Object<'_>, addresses: &[u64], data_address: u64) -> Result<Vec<u8>, Error> {
    match object {
        Object::Group(group, members) => {
            let mut header = vec![
                Message::new(messages::LINK_INFO, messages::encode_link_info()),
                Message::new(messages::GROUP_INFO, messages::encode_group_info()),
            ];

            for &(name, index) in members {
                let data = messages::encode_link(name, addresses[index]);
                header.push(checked_message(messages::LINK, data, || format!("link '{}'", name))?);
            }

            for (name, attribute) in &group.attributes {
                let data = messages::encode_attribute(name, attribute.datatype, &attribute.shape, &attribute.bytes);
                header.push(checked_message(messages::ATTRIBUTE, data, || format!("attribute '{}'", name))?);
            }

            return Ok(messages::encode_object_header(&header, group.attributes.len()));
        }
        Object::Dataset(dataset) => {
            let data_address = if dataset.bytes.is_empty() { UNDEFINED_ADDRESS } else { data_address };

            let header = vec![
                Message::new(messages::DATASPACE, messages::encode_dataspace(&dataset.shape)),
                Message::constant(messages::DATATYPE, messages::encode_datatype(dataset.datatype)),
                Message::constant(messages::FILL_VALUE, messages::encode_fill_value()),
                Message::new(
                    messages::DATA_LAYOUT,
                    messages::encode_contiguous_layout(data_address, dataset.bytes.len() as u64)
                ),
            ];

            return Ok(messages::encode_object_header(&header, 0));
        }
    }
}

impl FileBuilder {
    /// Create a new empty file builder
    pub fn new() -> FileBuilder {
        FileBuilder::default()
    }

    /// Get the root group of the file
    pub fn root(&mut self) -> &mut GroupBuilder {
        &mut self.root
    }

    /// Get the full content of the file
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut objects = Vec::new();
        flatten(&self.root, &mut objects);

        // object headers have the same size whatever the addresses, so we
        // can first compute their size with placeholder addresses
        let placeholders = vec![0; objects.len()];
        let mut addresses = Vec::with_capacity(objects.len());
        let mut next_address = SUPERBLOCK_SIZE as u64;
        for object in &objects {
            addresses.push(next_address);
            next_address += encode_object(object, &placeholders, 0)?.len() as u64;
        }

        // raw data for the datasets is stored after all the object headers
        let mut data_addresses = Vec::with_capacity(objects.len());
        for object in &objects {
            data_addresses.push(next_address);
            if let Object::Dataset(dataset) = object {
                next_address += dataset.bytes.len() as u64;
            }
        }

        let end_of_file = next_address;
        let mut buffer = Vec::with_capacity(end_of_file as usize);
        buffer.extend(messages::encode_superblock(end_of_file, addresses[0]));

        for (index, object) in objects.iter().enumerate() {
            debug_assert_eq!(buffer.len() as u64, addresses[index]);
            buffer.extend(encode_object(object, &addresses, data_addresses[index])?);
        }

        for object in &objects {
            if let Object::Dataset(dataset) = object {
                buffer.extend_from_slice(&dataset.bytes);
            }
        }

        debug_assert_eq!(buffer.len() as u64, end_of_file);
        return Ok(buffer);
    }

    /// Write the file at the given `path`, overwriting any existing file
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        return Ok(());
    }
}
