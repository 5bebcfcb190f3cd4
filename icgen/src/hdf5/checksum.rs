/// Jenkins' lookup3 hash (`hashlittle` with an initial value of 0), used for
/// all the checksums in HDF5 metadata.
pub fn lookup3(data: &[u8]) -> u32 {
    let initial = 0xdead_beef_u32.wrapping_add(data.len() as u32);
    let mut a = initial;
    let mut b = initial;
    let mut c = initial;

    let mut key = data;
    while key.len() > 12 {
        a = a.wrapping_add(read_u32(&key[0..4]));
        b = b.wrapping_add(read_u32(&key[4..8]));
        c = c.wrapping_add(read_u32(&key[8..12]));
        mix(&mut a, &mut b, &mut c);
        key = &key[12..];
    }

    if key.is_empty() {
        return c;
    }

    // the last block is zero-padded
    let mut tail = [0_u8; 12];
    tail[..key.len()].copy_from_slice(key);
    a = a.wrapping_add(read_u32(&tail[0..4]));
    b = b.wrapping_add(read_u32(&tail[4..8]));
    c = c.wrapping_add(read_u32(&tail[8..12]));
    finalize(&mut a, &mut b, &mut c);

    return c;
}

#[inline]
fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[inline]
fn mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *a = a.wrapping_sub(*c); *a ^= c.rotate_left(4); *c = c.wrapping_add(*b);
    *b = b.wrapping_sub(*a); *b ^= a.rotate_left(6); *a = a.wrapping_add(*c);
    *c = c.wrapping_sub(*b); *c ^= b.rotate_left(8); *b = b.wrapping_add(*a);
    *a = a.wrapping_sub(*c); *a ^= c.rotate_left(16); *c = c.wrapping_add(*b);
    *b = b.wrapping_sub(*a); *b ^= a.rotate_left(19); *a = a.wrapping_add(*c);
    *c = c.wrapping_sub(*b); *c ^= b.rotate_left(4); *b = b.wrapping_add(*a);
}

#[inline]
fn finalize(a: &mut u32, b: &mut u32, c: &mut u32) {
    *c ^= *b; *c = c.wrapping_sub(b.rotate_left(14));
    *a ^= *c; *a = a.wrapping_sub(c.rotate_left(11));
    *b ^= *a; *b = b.wrapping_sub(a.rotate_left(25));
    *c ^= *b; *c = c.wrapping_sub(b.rotate_left(16));
    *a ^= *c; *a = a.wrapping_sub(c.rotate_left(4));
    *b ^= *a; *b = b.wrapping_sub(a.rotate_left(14));
    *c ^= *b; *c = c.wrapping_sub(b.rotate_left(24));
}
