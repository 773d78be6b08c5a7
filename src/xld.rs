use std::io;

use crate::common::*;

pub const SIGNATURE: &[u8; 6] = b"XLD0I\0";

/// Sub-block table of an XLD archive: the magic, a u16 count, then one
/// u32 length per sub-block, then the payloads back to back.
pub struct Xld {
    pub entries: Vec<Entry>,
}

#[derive(Copy, Clone, Debug)]
pub struct Entry {
    pub offset: u32,
    pub length: u32,
}

pub fn read(mut file: impl io::Read) -> Result<Xld> {
    if &read_buf(&mut file, [0u8; 6])? != SIGNATURE {
        return Err(Error::Signature("XLD0I"));
    }

    let num_entries = read_u16(&mut file)?;

    let mut lengths = Vec::with_capacity(num_entries as usize);
    for _ in 0..num_entries {
        lengths.push(read_u32(&mut file)?);
    }

    let mut offset = 6 + 2 + 4 * num_entries as u32;
    let mut entries = Vec::with_capacity(lengths.len());
    for length in lengths {
        entries.push(Entry { offset, length });
        offset += length;
    }

    Ok(Xld { entries })
}

pub struct Subfile {
    pub index: u16,
    pub data: Vec<u8>,
}

/// Reads every sub-block payload in order, in one forward pass.
pub fn subfiles(mut file: impl io::Read) -> Result<Vec<Subfile>> {
    let catalog = read(&mut file)?;
    let mut subfiles = Vec::with_capacity(catalog.entries.len());
    for (index, entry) in catalog.entries.iter().enumerate() {
        subfiles.push(Subfile {
            index: index as u16,
            data: read_vec(&mut file, entry.length as usize)?,
        });
    }
    Ok(subfiles)
}

/// Positions `file` at the start of sub-block `index`, returning its
/// byte length.
pub fn seek_to_index(mut file: impl io::Read + io::Seek, index: usize) -> Result<usize> {
    let catalog = read(&mut file)?;
    let entry = catalog.entries.get(index).ok_or_else(|| {
        Error::NotFound(format!(
            "sub-block {} of an archive with {}",
            index,
            catalog.entries.len()
        ))
    })?;
    file.seek(io::SeekFrom::Start(entry.offset as u64))?;
    Ok(entry.length as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    pub fn build(blocks: &[&[u8]]) -> Vec<u8> {
        let mut bytes = SIGNATURE.to_vec();
        bytes.extend_from_slice(&(blocks.len() as u16).to_le_bytes());
        for block in blocks {
            bytes.extend_from_slice(&(block.len() as u32).to_le_bytes());
        }
        for block in blocks {
            bytes.extend_from_slice(block);
        }
        bytes
    }

    #[test]
    fn catalog_offsets() {
        let bytes = build(&[&[1, 2, 3], &[], &[4, 5]]);
        let xld = read(&bytes[..]).unwrap();
        assert_eq!(xld.entries.len(), 3);
        // header is 6 + 2 + 3 * 4 bytes
        assert_eq!(xld.entries[0].offset, 20);
        assert_eq!(xld.entries[0].length, 3);
        assert_eq!(xld.entries[1].offset, 23);
        assert_eq!(xld.entries[1].length, 0);
        assert_eq!(xld.entries[2].offset, 23);
        assert_eq!(xld.entries[2].length, 2);
    }

    #[test]
    fn bad_signature() {
        match read(&b"XLD0J\0\0\0"[..]) {
            Err(Error::Signature("XLD0I")) => {}
            _ => panic!("expected signature error"),
        }
    }

    #[test]
    fn subfiles_in_order() {
        let bytes = build(&[&[1, 2, 3], &[4, 5]]);
        let subs = subfiles(&bytes[..]).unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].index, 0);
        assert_eq!(subs[0].data, vec![1, 2, 3]);
        assert_eq!(subs[1].index, 1);
        assert_eq!(subs[1].data, vec![4, 5]);
    }

    #[test]
    fn seek_to_second_block() {
        let bytes = build(&[&[1, 2, 3], &[4, 5]]);
        let mut cursor = Cursor::new(&bytes);
        let length = seek_to_index(&mut cursor, 1).unwrap();
        assert_eq!(length, 2);
        let data = read_vec(&mut cursor, length).unwrap();
        assert_eq!(data, vec![4, 5]);
    }

    #[test]
    fn seek_past_end() {
        let bytes = build(&[&[1, 2, 3]]);
        match seek_to_index(Cursor::new(&bytes), 1) {
            Err(Error::NotFound(_)) => {}
            _ => panic!("expected NotFound"),
        }
    }
}
