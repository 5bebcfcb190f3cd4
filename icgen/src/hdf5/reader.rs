use std::path::Path;

use indexmap::IndexMap;
use ndarray::ArrayD;

use crate::Error;

use super::{check_conversion, convert_data, data_size, zeros, Datatype, H5Type, UNDEFINED_ADDRESS};
use super::messages::{self, Layout, RawMessage};
use super::symbol_table;

/// An HDF5 file, fully loaded in memory
#[derive(Debug, Clone)]
pub struct File {
    data: Vec<u8>,
    base: u64,
    root: u64,
}

/// Attribute attached to a group or a dataset
#[derive(Debug, Clone)]
pub struct Attribute {
    datatype: Datatype,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl Attribute {
    /// Type of the values stored in this attribute
    pub fn datatype(&self) -> Datatype {
        self.datatype
    }

    /// Shape of this attribute, which is empty for scalar attributes
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Read the values of this attribute, converting them to `T`
    pub fn read<T: H5Type>(&self) -> Result<ArrayD<T>, Error> {
        convert_data(self.datatype, &self.shape, &self.data)
    }

    /// Read the value of this attribute, which should contain a single
    /// element
    pub fn read_scalar<T: H5Type>(&self) -> Result<T, Error> {
        let values = self.read::<T>()?;
        if values.len() != 1 {
            return Err(Error::Hdf5(format!(
                "expected a single value, got an attribute with shape {:?}", self.shape
            )));
        }

        match values.iter().next() {
            Some(&value) => Ok(value),
            None => Err(Error::Hdf5("attribute is empty".into())),
        }
    }
}

/// A group in an HDF5 file, containing other groups and datasets
#[derive(Debug, Clone)]
pub struct Group<'a> {
    file: &'a File,
    links: IndexMap<String, u64>,
    attributes: IndexMap<String, Attribute>,
}

/// A dataset in an HDF5 file
#[derive(Debug, Clone)]
pub struct Dataset<'a> {
    datatype: Datatype,
    shape: Vec<usize>,
    data: &'a [u8],
    attributes: IndexMap<String, Attribute>,
}

impl File {
    /// Read the file at the given `path`
    pub fn open(path: impl AsRef<Path>) -> Result<File, Error> {
        let data = std::fs::read(path)?;
        return File::from_bytes(data);
    }

    /// Load a file from its content
    pub fn from_bytes(data: Vec<u8>) -> Result<File, Error> {
        let superblock = messages::decode_superblock(&data)?;
        return Ok(File {
            data: data,
            base: superblock.base,
            root: superblock.root,
        });
    }

    /// Get the root group of this file
    pub fn root(&self) -> Result<Group<'_>, Error> {
        self.group_at(self.root)
    }

    /// Get the group at the given `path`, with components separated by `/`
    pub fn group(&self, path: &str) -> Result<Group<'_>, Error> {
        let mut group = self.root()?;
        for name in path.split('/').filter(|name| !name.is_empty()) {
            group = group.group(name)?;
        }
        return Ok(group);
    }

    /// Get the dataset at the given `path`, with components separated by `/`
    pub fn dataset(&self, path: &str) -> Result<Dataset<'_>, Error> {
        let path = path.trim_matches('/');
        match path.rsplit_once('/') {
            Some((parent, name)) => self.group(parent)?.dataset(name),
            None => self.root()?.dataset(path),
        }
    }

    fn object_header(&self, address: u64) -> Result<Vec<RawMessage<'_>>, Error> {
        messages::decode_object_header(&self.data, self.base, address.saturating_add(self.base))
    }

    fn group_at(&self, address: u64) -> Result<Group<'_>, Error> {
        let header = self.object_header(address)?;

        let mut is_group = false;
        let mut links = IndexMap::new();
        for message in &header {
            match message.kind {
                messages::LINK_INFO => {
                    messages::check_link_info(message.data)?;
                    is_group = true;
                }
                messages::LINK => {
                    if let Some((name, address)) = messages::decode_link(message.data)? {
                        links.insert(name, address);
                    }
                }
                messages::SYMBOL_TABLE => {
                    let (btree, heap) = symbol_table::decode_symbol_table_message(message.data)?;
                    let members = symbol_table::read_symbol_table(&self.data, self.base, btree, heap)?;
                    links.extend(members);
                    is_group = true;
                }
                _ => {}
            }
        }

        if !is_group {
            return Err(Error::Hdf5(format!("the object at address {} is not a group", address)));
        }

        return Ok(Group {
            file: self,
            links: links,
            attributes: read_attributes(&header)?,
        });
    }

    fn dataset_at(&self, address: u64) -> Result<Dataset<'_>, Error> {
        let header = self.object_header(address)?;

        let mut shape = None;
        let mut datatype = None;
        let mut layout = None;
        for message in &header {
            let shared = message.flags & messages::SHARED != 0;
            if shared && (message.kind == messages::DATASPACE || message.kind == messages::DATATYPE) {
                return Err(Error::Hdf5(format!(
                    "the dataset at address {} uses a shared datatype or dataspace, which is not supported", address
                )));
            }

            match message.kind {
                messages::DATASPACE => shape = Some(messages::decode_dataspace(message.data)?),
                messages::DATATYPE => datatype = Some(messages::decode_datatype(message.data)?),
                messages::DATA_LAYOUT => layout = Some(messages::decode_layout(message.data)?),
                _ => {}
            }
        }

        let (shape, datatype, layout) = match (shape, datatype, layout) {
            (Some(shape), Some(datatype), Some(layout)) => (shape, datatype, layout),
            _ => return Err(Error::Hdf5(format!("the object at address {} is not a dataset", address))),
        };

        let expected = data_size(datatype, &shape)?;
        let data: &[u8] = match layout {
            Layout::Compact(data) => data,
            Layout::Contiguous { address, size } => {
                if address == UNDEFINED_ADDRESS {
                    // storage was never allocated
                    &[]
                } else {
                    let start = usize::try_from(address.saturating_add(self.base)).unwrap_or(usize::MAX);
                    let size = usize::try_from(size).unwrap_or(usize::MAX);
                    match start.checked_add(size) {
                        Some(end) if end <= self.data.len() => &self.data[start..end],
                        _ => return Err(Error::Hdf5(format!(
                            "dataset data at address {} is past the end of the file", address
                        ))),
                    }
                }
            }
        };

        // unallocated storage is read as zeros
        if !data.is_empty() && data.len() != expected {
            return Err(Error::Hdf5(format!(
                "expected {} bytes of data for a dataset with shape {:?} and type {}, got {}",
                expected, shape, datatype, data.len()
            )));
        }

        return Ok(Dataset {
            datatype: datatype,
            shape: shape,
            data: data,
            attributes: read_attributes(&header)?,
        });
    }
}

fn read_attributes(header: &[RawMessage<'_>]) -> Result<IndexMap<String, Attribute>, Error> {
    let mut attributes = IndexMap::new();
    for message in header {
        match message.kind {
            messages::ATTRIBUTE_INFO => messages::check_attribute_info(message.data)?,
            messages::ATTRIBUTE => {
                let attribute = messages::decode_attribute(message.data)?;
                attributes.insert(attribute.name, Attribute {
                    datatype: attribute.datatype,
                    shape: attribute.shape,
                    data: attribute.data.to_vec(),
                });
            }
            _ => {}
        }
    }
    return Ok(attributes);
}

impl<'a> Group<'a> {
    /// Get the names of all the members (groups and datasets) of this group
    pub fn member_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.links.keys().map(|name| name.as_str())
    }

    /// Get the sub-group with the given `name`
    pub fn group(&self, name: &str) -> Result<Group<'a>, Error> {
        let address = self.member_address(name)?;
        self.file.group_at(address)
    }

    /// Get the dataset with the given `name`
    pub fn dataset(&self, name: &str) -> Result<Dataset<'a>, Error> {
        let address = self.member_address(name)?;
        self.file.dataset_at(address)
    }

    /// Check if this group contains a member with the given `name`
    pub fn contains(&self, name: &str) -> bool {
        self.links.contains_key(name)
    }

    /// Get all the attributes of this group, in the order they are stored in
    /// the file
    pub fn attributes(&self) -> &IndexMap<String, Attribute> {
        &self.attributes
    }

    /// Get the attribute with the given `name`
    pub fn attribute(&self, name: &str) -> Result<&Attribute, Error> {
        self.attributes.get(name).ok_or_else(|| Error::Hdf5(format!(
            "missing attribute '{}'", name
        )))
    }

    fn member_address(&self, name: &str) -> Result<u64, Error> {
        self.links.get(name).copied().ok_or_else(|| Error::Hdf5(format!(
            "missing group member '{}'", name
        )))
    }
}

impl<'a> Dataset<'a> {
    /// Type of the values stored in this dataset
    pub fn datatype(&self) -> Datatype {
        self.datatype
    }

    /// Shape of this dataset
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get all the attributes of this dataset
    pub fn attributes(&self) -> &IndexMap<String, Attribute> {
        &self.attributes
    }

    /// Read the values in this dataset, converting them to `T`. Datasets
    /// without allocated storage are filled with zeros.
    pub fn read<T: H5Type>(&self) -> Result<ArrayD<T>, Error> {
        if self.data.is_empty() {
            check_conversion::<T>(self.datatype)?;
            return zeros(&self.shape);
        }
        convert_data(self.datatype, &self.shape, self.data)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{arr0, array, Ix2};

    use super::super::FileBuilder;
    use super::super::messages::{Message, SUPERBLOCK_SIZE};
    use super::*;

    const DEFAULT_FORMAT_SNAPSHOT: &[u8] = include_bytes!("../../tests/data/generated/snapshot-v0.hdf5");

    /// Create a file containing a single object header with the given
    /// messages, directly after the superblock
    fn single_object(messages: &[Message]) -> (File, u64) {
        let header = messages::encode_object_header(messages, 0);
        let address = SUPERBLOCK_SIZE as u64;
        let mut bytes = messages::encode_superblock(address + header.len() as u64, address);
        bytes.extend(header);
        return (File::from_bytes(bytes).unwrap(), address);
    }

    fn dataset_messages(shape: &[usize], layout: Vec<u8>) -> Vec<Message> {
        vec![
            Message::new(messages::DATASPACE, messages::encode_dataspace(shape)),
            Message::constant(messages::DATATYPE, messages::encode_datatype(Datatype::Float { size: 8 })),
            Message::new(messages::DATA_LAYOUT, layout),
        ]
    }

    fn sample_file() -> File {
        let mut builder = FileBuilder::new();
        let root = builder.root();
        root.add_scalar_attribute("version", 3_i32).unwrap();

        let header = root.create_group("Header").unwrap();
        header.add_attribute("Counts", array![0_i32, 12, 0].view()).unwrap();
        header.add_scalar_attribute("BoxSize", 2.5_f64).unwrap();

        let particles = root.create_group("Particles").unwrap();
        particles.add_dataset("ids", array![4_i64, 5, 6].view()).unwrap();
        particles.add_dataset("positions", array![[0.5, 1.0], [1.5, 2.0], [2.5, 3.0]].view()).unwrap();
        particles.create_group("Nested").unwrap()
            .add_dataset("empty", ndarray::Array2::<f32>::zeros((0, 3)).view()).unwrap();

        return File::from_bytes(builder.to_bytes().unwrap()).unwrap();
    }

    #[test]
    fn groups() {
        let file = sample_file();
        let root = file.root().unwrap();
        assert_eq!(root.member_names().collect::<Vec<_>>(), ["Header", "Particles"]);
        assert_eq!(root.attribute("version").unwrap().read_scalar::<i64>().unwrap(), 3);

        let particles = file.group("/Particles").unwrap();
        assert!(particles.contains("ids"));
        assert!(!particles.contains("velocities"));
        assert_eq!(particles.member_names().collect::<Vec<_>>(), ["Nested", "ids", "positions"]);

        let error = file.group("Header/Missing").unwrap_err();
        assert_eq!(error.to_string(), "HDF5 error: missing group member 'Missing'");

        let error = file.group("Particles/ids").unwrap_err();
        assert!(error.to_string().ends_with("is not a group"));

        let error = file.dataset("Header").unwrap_err();
        assert!(error.to_string().ends_with("is not a dataset"));
    }

    #[test]
    fn attributes() {
        let file = sample_file();
        let header = file.group("Header").unwrap();

        let names = header.attributes().keys().map(|name| name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["Counts", "BoxSize"]);

        let counts = header.attribute("Counts").unwrap();
        assert_eq!(counts.shape(), [3]);
        assert_eq!(counts.datatype(), Datatype::Integer { size: 4, signed: true });
        assert_eq!(counts.read::<i64>().unwrap(), array![0, 12, 0].into_dyn());

        let error = counts.read_scalar::<i64>().unwrap_err();
        assert_eq!(error.to_string(), "HDF5 error: expected a single value, got an attribute with shape [3]");

        let box_size = header.attribute("BoxSize").unwrap();
        assert!(box_size.shape().is_empty());
        assert_eq!(box_size.read::<f64>().unwrap(), arr0(2.5).into_dyn());
        assert_eq!(box_size.read_scalar::<f64>().unwrap(), 2.5);

        let error = header.attribute("Time").unwrap_err();
        assert_eq!(error.to_string(), "HDF5 error: missing attribute 'Time'");
    }

    #[test]
    fn datasets() {
        let file = sample_file();

        let ids = file.dataset("Particles/ids").unwrap();
        assert_eq!(ids.shape(), [3]);
        assert_eq!(ids.read::<i64>().unwrap(), array![4, 5, 6].into_dyn());

        let positions = file.dataset("Particles/positions").unwrap();
        assert_eq!(positions.datatype(), Datatype::Float { size: 8 });
        let positions = positions.read::<f64>().unwrap().into_dimensionality::<Ix2>().unwrap();
        assert_eq!(positions, array![[0.5, 1.0], [1.5, 2.0], [2.5, 3.0]]);

        let empty = file.dataset("/Particles/Nested/empty").unwrap();
        assert_eq!(empty.shape(), [0, 3]);
        assert_eq!(empty.read::<f64>().unwrap().shape(), [0, 3]);
    }

    #[test]
    fn corrupted() {
        let mut builder = FileBuilder::new();
        builder.root().add_dataset("values", array![1.0, 2.0, 3.0].view()).unwrap();
        let mut bytes = builder.to_bytes().unwrap();

        // truncated data
        bytes.truncate(bytes.len() - 8);
        let file = File::from_bytes(bytes).unwrap();
        let error = file.dataset("values").unwrap_err();
        assert!(error.to_string().ends_with("is past the end of the file"));
    }

    #[test]
    fn unallocated() {
        let layout = messages::encode_contiguous_layout(UNDEFINED_ADDRESS, 0);
        let (file, address) = single_object(&dataset_messages(&[2, 3], layout));
        let dataset = file.dataset_at(address).unwrap();
        assert_eq!(dataset.read::<f64>().unwrap(), ndarray::Array2::<f64>::zeros((2, 3)).into_dyn());

        let error = dataset.read::<i64>().unwrap_err();
        assert_eq!(error.to_string(), "HDF5 error: can not read data stored as float64 into int64");
    }

    #[test]
    fn huge_shapes() {
        // the number of elements overflows
        let layout = messages::encode_contiguous_layout(UNDEFINED_ADDRESS, 0);
        let (file, address) = single_object(&dataset_messages(&[1 << 40, 1 << 40], layout));
        let error = file.dataset_at(address).unwrap_err();
        assert_eq!(
            error.to_string(),
            "HDF5 error: shape [1099511627776, 1099511627776] contains too many elements"
        );

        // the number of bytes overflows
        let layout = messages::encode_contiguous_layout(UNDEFINED_ADDRESS, 0);
        let (file, address) = single_object(&dataset_messages(&[1 << 30, 1 << 30, 1 << 2], layout));
        let error = file.dataset_at(address).unwrap_err();
        assert_eq!(
            error.to_string(),
            "HDF5 error: shape [1073741824, 1073741824, 4] is too large for float64 data"
        );

        // the size fits, but the zeros can not be allocated
        let layout = messages::encode_contiguous_layout(UNDEFINED_ADDRESS, 0);
        let (file, address) = single_object(&dataset_messages(&[1 << 28, 1 << 28, 1 << 2], layout));
        let dataset = file.dataset_at(address).unwrap();
        let error = dataset.read::<f64>().unwrap_err();
        assert!(error.to_string().starts_with("HDF5 error: failed to allocate memory for"));

        // the declared data is larger than the file
        let layout = messages::encode_contiguous_layout(0, 1 << 40);
        let (file, address) = single_object(&dataset_messages(&[1 << 37], layout));
        let error = file.dataset_at(address).unwrap_err();
        assert_eq!(error.to_string(), "HDF5 error: dataset data at address 0 is past the end of the file");
    }

    #[test]
    fn shared_datatype() {
        let mut header = dataset_messages(&[2], messages::encode_contiguous_layout(UNDEFINED_ADDRESS, 0));
        header[1].flags |= messages::SHARED;
        let (file, address) = single_object(&header);

        let error = file.dataset_at(address).unwrap_err();
        assert_eq!(
            error.to_string(),
            "HDF5 error: the dataset at address 48 uses a shared datatype or dataspace, which is not supported"
        );
    }

    #[test]
    fn default_library_format() {
        let file = File::from_bytes(DEFAULT_FORMAT_SNAPSHOT.to_vec()).unwrap();

        let root = file.root().unwrap();
        assert_eq!(root.member_names().collect::<Vec<_>>(), ["Header", "PartType1"]);
        assert!(root.attributes().is_empty());

        let particles = file.group("PartType1").unwrap();
        assert_eq!(
            particles.member_names().collect::<Vec<_>>(),
            ["Coordinates", "Masses", "ParticleIDs", "Velocities"]
        );

        let header = file.group("Header").unwrap();
        assert_eq!(header.attributes().len(), 18);
        assert!(header.member_names().next().is_none());

        let mass_table = header.attribute("MassTable").unwrap();
        assert_eq!(mass_table.datatype(), Datatype::Integer { size: 4, signed: true });
        assert_eq!(mass_table.read::<f64>().unwrap(), ndarray::Array1::<f64>::zeros(6).into_dyn());

        let files = header.attribute("NumFilesPerSnapshot").unwrap();
        assert_eq!(files.datatype(), Datatype::Integer { size: 8, signed: true });
        assert!(files.shape().is_empty());
        assert_eq!(files.read_scalar::<i64>().unwrap(), 1);

        let coordinates = file.dataset("PartType1/Coordinates").unwrap();
        assert_eq!(coordinates.shape(), [4, 3]);
        let coordinates = coordinates.read::<f64>().unwrap().into_dimensionality::<Ix2>().unwrap();
        assert_eq!(coordinates.row(2).to_vec(), [1.75, 0.125, 0.375]);

        // the datatype messages are identical to the ones created when writing
        let datatypes = [
            ("Coordinates", Datatype::Float { size: 8 }),
            ("ParticleIDs", Datatype::Integer { size: 8, signed: true }),
        ];
        for (name, datatype) in datatypes {
            let address = particles.member_address(name).unwrap();
            let header = file.object_header(address).unwrap();
            let message = header.iter().find(|message| message.kind == messages::DATATYPE).unwrap();
            assert_eq!(message.flags, messages::CONSTANT);

            let encoded = messages::encode_datatype(datatype);
            assert_eq!(&message.data[..encoded.len()], &encoded[..]);
            assert!(message.data[encoded.len()..].iter().all(|&byte| byte == 0));
        }
    }
}
