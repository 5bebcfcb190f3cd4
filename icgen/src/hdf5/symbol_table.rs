//! Groups stored with a symbol table, as written by default by libhdf5 and
//! h5py: the members are indexed by a version 1 B-tree whose leaves point to
//! symbol table nodes, and the member names are stored in a local heap.

use std::collections::BTreeSet;

use crate::Error;

use super::messages::{Cursor, checked_range, hdf5_error, to_usize};

/// Size of the B-tree node header: signature, node type, level, entries
/// used, left and right siblings
const BTREE_HEADER_SIZE: u64 = 24;
/// Size of a symbol table entry with 8-bytes offsets
const SYMBOL_TABLE_ENTRY_SIZE: u64 = 40;

/// Decode a symbol table message, returning the addresses of the B-tree and
/// of the local heap.
pub fn decode_symbol_table_message(data: &[u8]) -> Result<(u64, u64), Error> {
    let mut cursor = Cursor::new(data);
    let btree = cursor.read_u64()?;
    let heap = cursor.read_u64()?;
    return Ok((btree, heap));
}

/// Read the members of a group stored with a symbol table, returning the
/// name and object header address of each member. All addresses are
/// relative to `base`.
pub fn read_symbol_table(file: &[u8], base: u64, btree: u64, heap: u64) -> Result<Vec<(String, u64)>, Error> {
    let names = decode_local_heap(file, base, heap)?;

    let mut members = Vec::new();
    let mut visited = BTreeSet::new();
    // B-tree nodes still to visit, with their expected level
    let mut pending = vec![(btree, None)];
    while let Some((address, expected_level)) = pending.pop() {
        if !visited.insert(address) {
            return Err(hdf5_error(format!("group B-tree node at address {} is referenced multiple times", address)));
        }

        let node = decode_btree_node(file, base, address)?;
        if let Some(expected) = expected_level {
            if node.level != expected {
                return Err(hdf5_error(format!(
                    "invalid level for group B-tree node at address {}: expected {}, got {}",
                    address, expected, node.level
                )));
            }
        }

        if node.level == 0 {
            for &child in &node.children {
                for (name_offset, object) in decode_symbol_node(file, base, child)? {
                    members.push((heap_string(names, name_offset)?, object));
                }
            }
        } else {
            // visit the children in order
            for &child in node.children.iter().rev() {
                pending.push((child, Some(node.level - 1)));
            }
        }
    }

    return Ok(members);
}

/// Get the data segment of the local heap at `address`
fn decode_local_heap(file: &[u8], base: u64, address: u64) -> Result<&[u8], Error> {
    let header = checked_range(file, address.saturating_add(base), 32)?;
    let mut cursor = Cursor::new(header);
    if cursor.read_bytes(4)? != b"HEAP" {
        return Err(hdf5_error(format!("invalid local heap signature at address {}", address)));
    }

    let version = cursor.read_u8()?;
    if version != 0 {
        return Err(hdf5_error(format!("unsupported local heap version {}", version)));
    }
    cursor.skip(3)?;

    let size = cursor.read_u64()?;
    let _free_list = cursor.read_u64()?;
    let data = cursor.read_u64()?;

    return checked_range(file, data.saturating_add(base), size);
}

/// Get the null-terminated string at `offset` in a local heap data segment
fn heap_string(heap: &[u8], offset: u64) -> Result<String, Error> {
    let start = to_usize(offset)?;
    if start >= heap.len() {
        return Err(hdf5_error(format!(
            "name offset {} is outside of the local heap ({} bytes)", offset, heap.len()
        )));
    }

    let name = &heap[start..];
    let name = match name.iter().position(|&c| c == 0) {
        Some(end) => &name[..end],
        None => return Err(hdf5_error(format!("unterminated name at offset {} in local heap", offset))),
    };

    return Ok(String::from_utf8_lossy(name).into_owned());
}

#[derive(Debug)]
struct BTreeNode {
    level: u8,
    children: Vec<u64>,
}

fn decode_btree_node(file: &[u8], base: u64, address: u64) -> Result<BTreeNode, Error> {
    let start = address.saturating_add(base);
    let mut cursor = Cursor::new(checked_range(file, start, BTREE_HEADER_SIZE)?);
    if cursor.read_bytes(4)? != b"TREE" {
        return Err(hdf5_error(format!("invalid B-tree node signature at address {}", address)));
    }

    let node_type = cursor.read_u8()?;
    if node_type != 0 {
        return Err(hdf5_error(format!("expected a group B-tree node at address {}, got type {}", address, node_type)));
    }

    let level = cursor.read_u8()?;
    let entries = u64::from(cursor.read_u16()?);
    let _left = cursor.read_u64()?;
    let _right = cursor.read_u64()?;

    // keys and children are interleaved, with one more key than children
    let size = (2 * entries + 1) * 8;
    let mut cursor = Cursor::new(checked_range(file, start + BTREE_HEADER_SIZE, size)?);
    let mut children = Vec::with_capacity(entries as usize);
    for _ in 0..entries {
        let _key = cursor.read_u64()?;
        children.push(cursor.read_u64()?);
    }

    return Ok(BTreeNode {
        level: level,
        children: children,
    });
}

/// Decode the symbol table node at `address`, returning the name offset in
/// the local heap and the object header address of all entries
fn decode_symbol_node(file: &[u8], base: u64, address: u64) -> Result<Vec<(u64, u64)>, Error> {
    let start = address.saturating_add(base);
    let mut cursor = Cursor::new(checked_range(file, start, 8)?);
    if cursor.read_bytes(4)? != b"SNOD" {
        return Err(hdf5_error(format!("invalid symbol table node signature at address {}", address)));
    }

    let version = cursor.read_u8()?;
    if version != 1 {
        return Err(hdf5_error(format!("unsupported symbol table node version {}", version)));
    }
    cursor.skip(1)?;
    let n_symbols = u64::from(cursor.read_u16()?);

    let mut cursor = Cursor::new(checked_range(file, start + 8, n_symbols * SYMBOL_TABLE_ENTRY_SIZE)?);
    let mut entries = Vec::with_capacity(n_symbols as usize);
    for _ in 0..n_symbols {
        let name_offset = cursor.read_u64()?;
        let object = cursor.read_u64()?;
        // cache type, reserved and scratch-pad space
        cursor.skip(24)?;
        entries.push((name_offset, object));
    }

    return Ok(entries);
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNDEFINED: u64 = u64::MAX;

    fn local_heap(address: u64, names: &[&str]) -> (Vec<u8>, Vec<u64>) {
        let mut data = vec![0_u8; 8];
        let mut offsets = Vec::new();
        for name in names {
            offsets.push(data.len() as u64);
            data.extend_from_slice(name.as_bytes());
            data.push(0);
            data.resize((data.len() + 7) / 8 * 8, 0);
        }

        let mut heap = b"HEAP".to_vec();
        heap.extend_from_slice(&[0, 0, 0, 0]);
        heap.extend_from_slice(&(data.len() as u64).to_le_bytes());
        heap.extend_from_slice(&1_u64.to_le_bytes());
        heap.extend_from_slice(&(address + 32).to_le_bytes());
        heap.extend_from_slice(&data);
        return (heap, offsets);
    }

    fn btree_node(level: u8, children: &[u64]) -> Vec<u8> {
        let mut node = b"TREE".to_vec();
        node.extend_from_slice(&[0, level]);
        node.extend_from_slice(&(children.len() as u16).to_le_bytes());
        node.extend_from_slice(&UNDEFINED.to_le_bytes());
        node.extend_from_slice(&UNDEFINED.to_le_bytes());
        for &child in children {
            node.extend_from_slice(&0_u64.to_le_bytes());
            node.extend_from_slice(&child.to_le_bytes());
        }
        node.extend_from_slice(&0_u64.to_le_bytes());
        return node;
    }

    fn symbol_node(entries: &[(u64, u64)]) -> Vec<u8> {
        let mut node = b"SNOD".to_vec();
        node.extend_from_slice(&[1, 0]);
        node.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for &(name, object) in entries {
            node.extend_from_slice(&name.to_le_bytes());
            node.extend_from_slice(&object.to_le_bytes());
            node.extend_from_slice(&[0; 24]);
        }
        return node;
    }

    #[test]
    fn members() {
        // heap at 0, one internal node at 100 with two leaves at 200 and 300,
        // each pointing to a symbol table node at 400 and 500
        let mut file = vec![0_u8; 600];
        let (heap, offsets) = local_heap(0, &["Coordinates", "Masses", "Velocities"]);
        file[..heap.len()].copy_from_slice(&heap);

        let mut write = |address: usize, bytes: Vec<u8>| file[address..address + bytes.len()].copy_from_slice(&bytes);
        write(100, btree_node(1, &[200, 300]));
        write(200, btree_node(0, &[400]));
        write(300, btree_node(0, &[500]));
        write(400, symbol_node(&[(offsets[0], 1000), (offsets[1], 2000)]));
        write(500, symbol_node(&[(offsets[2], 3000)]));

        let members = read_symbol_table(&file, 0, 100, 0).unwrap();
        assert_eq!(members, vec![
            ("Coordinates".to_string(), 1000),
            ("Masses".to_string(), 2000),
            ("Velocities".to_string(), 3000),
        ]);

        // an empty group
        let mut empty = heap.clone();
        empty.extend(btree_node(0, &[]));
        assert!(read_symbol_table(&empty, 0, heap.len() as u64, 0).unwrap().is_empty());

        // with a base address
        let mut shifted = vec![0_u8; 64];
        shifted.extend_from_slice(&file);
        let members = read_symbol_table(&shifted, 64, 100, 0).unwrap();
        assert_eq!(members.len(), 3);
    }

    #[test]
    fn loops() {
        let mut file = vec![0_u8; 300];
        let (heap, _) = local_heap(0, &["Header"]);
        file[..heap.len()].copy_from_slice(&heap);

        // both children of the root are the same node
        let node = btree_node(1, &[200, 200]);
        file[100..100 + node.len()].copy_from_slice(&node);
        let node = btree_node(0, &[]);
        file[200..200 + node.len()].copy_from_slice(&node);

        let error = read_symbol_table(&file, 0, 100, 0).unwrap_err();
        assert_eq!(
            error.to_string(),
            "HDF5 error: group B-tree node at address 200 is referenced multiple times"
        );

        // a node pointing to itself
        let node = btree_node(1, &[100]);
        file[100..100 + node.len()].copy_from_slice(&node);
        let error = read_symbol_table(&file, 0, 100, 0).unwrap_err();
        assert_eq!(
            error.to_string(),
            "HDF5 error: group B-tree node at address 100 is referenced multiple times"
        );
    }

    #[test]
    fn corrupted() {
        let mut file = vec![0_u8; 300];
        let (heap, _) = local_heap(0, &["Header"]);
        file[..heap.len()].copy_from_slice(&heap);

        // level 1 node with a level 1 child
        let node = btree_node(1, &[200]);
        file[100..100 + node.len()].copy_from_slice(&node);
        let node = btree_node(1, &[]);
        file[200..200 + node.len()].copy_from_slice(&node);
        let error = read_symbol_table(&file, 0, 100, 0).unwrap_err();
        assert_eq!(
            error.to_string(),
            "HDF5 error: invalid level for group B-tree node at address 200: expected 0, got 1"
        );

        // name offset outside of the heap
        let node = btree_node(0, &[200]);
        file[100..100 + node.len()].copy_from_slice(&node);
        let node = symbol_node(&[(4096, 1000)]);
        file[200..200 + node.len()].copy_from_slice(&node);
        let error = read_symbol_table(&file, 0, 100, 0).unwrap_err();
        assert_eq!(
            error.to_string(),
            "HDF5 error: name offset 4096 is outside of the local heap (16 bytes)"
        );

        // B-tree entries past the end of the file
        let mut node = btree_node(0, &[]);
        node[6..8].copy_from_slice(&u16::MAX.to_le_bytes());
        file[100..100 + node.len()].copy_from_slice(&node);
        assert!(read_symbol_table(&file, 0, 100, 0).is_err());

        let error = read_symbol_table(&file, 0, 100, 200).unwrap_err();
        assert_eq!(error.to_string(), "HDF5 error: invalid local heap signature at address 200");
    }
}
