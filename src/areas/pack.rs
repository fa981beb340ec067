//! Packed object storage
//!
//! `git gc` and clones move objects out of loose files into
//! `.git/objects/pack/pack-<sha>.pack`. The `pack-<sha>.idx` next to each
//! pack maps object ids to offsets in it.
//!
//! ## Index (version 2)
//!
//! ```text
//! \377tOc <version: u32>
//! <fanout: 256 x u32>       running count of ids by first byte
//! <ids: N x 20 bytes>       sorted
//! <crc32: N x u32>
//! <offsets: N x u32>        high bit set: position in the 64-bit table
//! <large offsets: M x u64>
//! <pack sha> <index sha>
//! ```
//!
//! ## Pack entries
//!
//! Each entry starts with a variable length header holding its type and
//! inflated size, followed by a zlib stream. Delta entries name a base
//! object, either by its offset in the pack (`OFS_DELTA`) or by its id
//! (`REF_DELTA`), and hold copy and insert instructions that rebuild the
//! object from that base.

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::{ObjectHeader, ObjectType};
use anyhow::Context;
use byteorder::{ByteOrder, NetworkEndian, ReadBytesExt};
use bytes::Bytes;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const PACK_SIGNATURE: &[u8; 4] = b"PACK";
const PACK_VERSIONS: [u32; 2] = [2, 3];
const PACK_HEADER_SIZE: usize = 12;
const PACK_EXTENSION: &str = "pack";

const INDEX_SIGNATURE: &[u8; 4] = b"\xfftOc";
const INDEX_VERSION: u32 = 2;
const INDEX_EXTENSION: &str = "idx";
const INDEX_HEADER_SIZE: usize = 8;
const FANOUT_SIZE: usize = 256 * 4;
const RAW_OID_SIZE: usize = 20;
const INDEX_TRAILER_SIZE: usize = 2 * RAW_OID_SIZE;
const LARGE_OFFSET_FLAG: u32 = 0x8000_0000;

const OBJ_COMMIT: u8 = 1;
const OBJ_TREE: u8 = 2;
const OBJ_BLOB: u8 = 3;
const OBJ_TAG: u8 = 4;
const OBJ_OFS_DELTA: u8 = 6;
const OBJ_REF_DELTA: u8 = 7;

/// Delta chains longer than this mark the pack as corrupt
const MAX_DELTA_DEPTH: usize = 4096;

/// Rebuilt objects kept per pack, since delta chains share their bases
const MAX_CACHED_OBJECTS: usize = 1024;

/// Upper bound on the buffer reserved ahead of applying a delta
const MAX_DELTA_PREALLOCATION: usize = 1 << 24;

/// Version 2 pack index held in memory
#[derive(Debug)]
struct PackIndex {
    data: Bytes,
    count: usize,
}

impl PackIndex {
    fn parse(data: Bytes) -> anyhow::Result<Self> {
        if data.len() < INDEX_HEADER_SIZE + FANOUT_SIZE {
            anyhow::bail!("pack index is truncated");
        }
        if &data[..4] != INDEX_SIGNATURE {
            anyhow::bail!("unsupported pack index format");
        }
        let version = NetworkEndian::read_u32(&data[4..8]);
        if version != INDEX_VERSION {
            anyhow::bail!("unsupported pack index version {version}");
        }

        let mut index = PackIndex { data, count: 0 };
        index.count = index.fanout(255);

        if index.data.len() < index.large_offsets_start() + INDEX_TRAILER_SIZE {
            anyhow::bail!("pack index is truncated");
        }
        if (1..256).any(|byte| index.fanout(byte - 1) > index.fanout(byte)) {
            anyhow::bail!("pack index fanout is not sorted");
        }

        Ok(index)
    }

    fn fanout(&self, first_byte: usize) -> usize {
        let start = INDEX_HEADER_SIZE + first_byte * 4;
        NetworkEndian::read_u32(&self.data[start..start + 4]) as usize
    }

    fn ids_start(&self) -> usize {
        INDEX_HEADER_SIZE + FANOUT_SIZE
    }

    fn offsets_start(&self) -> usize {
        // ids, then one crc32 per object
        self.ids_start() + self.count * (RAW_OID_SIZE + 4)
    }

    fn large_offsets_start(&self) -> usize {
        self.offsets_start() + self.count * 4
    }

    fn id_at(&self, position: usize) -> &[u8] {
        let start = self.ids_start() + position * RAW_OID_SIZE;
        &self.data[start..start + RAW_OID_SIZE]
    }

    /// Binary search within the fanout bucket of the first byte
    fn position_of(&self, raw_id: &[u8; RAW_OID_SIZE]) -> Option<usize> {
        let first_byte = raw_id[0] as usize;
        let mut low = match first_byte {
            0 => 0,
            _ => self.fanout(first_byte - 1),
        };
        let mut high = self.fanout(first_byte);

        while low < high {
            let middle = low + (high - low) / 2;
            match self.id_at(middle).cmp(raw_id.as_slice()) {
                Ordering::Less => low = middle + 1,
                Ordering::Greater => high = middle,
                Ordering::Equal => return Some(middle),
            }
        }

        None
    }

    fn offset_at(&self, position: usize) -> anyhow::Result<u64> {
        let start = self.offsets_start() + position * 4;
        let offset = NetworkEndian::read_u32(&self.data[start..start + 4]);
        if offset & LARGE_OFFSET_FLAG == 0 {
            return Ok(u64::from(offset));
        }

        let start = self.large_offsets_start() + (offset & !LARGE_OFFSET_FLAG) as usize * 8;
        let large_offset = self
            .data
            .get(start..start + 8)
            .context("pack index large offset is out of range")?;

        Ok(NetworkEndian::read_u64(large_offset))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum EntryKind {
    Base(ObjectType),
    /// Delta against the entry at an earlier offset of the same pack
    OfsDelta(u64),
    RefDelta(ObjectId),
}

#[derive(Debug)]
struct EntryHeader {
    kind: EntryKind,
    /// Inflated size of the entry data, the delta itself for delta entries
    size: u64,
}

/// One `.pack` file together with its index
#[derive(Debug)]
pub struct Pack {
    path: PathBuf,
    index: PackIndex,
    cache: RefCell<HashMap<u64, (ObjectType, Bytes)>>,
}

impl Pack {
    /// Open every pack of `pack_dir`, in file name order
    pub fn discover(pack_dir: &Path) -> anyhow::Result<Vec<Pack>> {
        if !pack_dir.is_dir() {
            return Ok(Vec::new());
        }

        WalkDir::new(pack_dir)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().is_some_and(|ext| ext == INDEX_EXTENSION))
            .map(|index_path| Pack::open(&index_path))
            .collect()
    }

    pub fn open(index_path: &Path) -> anyhow::Result<Self> {
        let index_data = std::fs::read(index_path).context(format!(
            "Unable to read pack index {}",
            index_path.display()
        ))?;
        let index = PackIndex::parse(index_data.into())
            .context(format!("Invalid pack index {}", index_path.display()))?;

        let pack = Pack {
            path: index_path.with_extension(PACK_EXTENSION),
            index,
            cache: RefCell::default(),
        };
        pack.check_header()?;
        tracing::debug!(pack = %pack.path.display(), objects = pack.index.count, "pack opened");

        Ok(pack)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, object_id: &ObjectId) -> bool {
        self.index.position_of(&object_id.to_raw_bytes()).is_some()
    }

    /// Offset of the entry holding `object_id`, `None` when it is not packed here
    pub fn find(&self, object_id: &ObjectId) -> anyhow::Result<Option<u64>> {
        match self.index.position_of(&object_id.to_raw_bytes()) {
            Some(position) => self.index.offset_at(position).map(Some),
            None => Ok(None),
        }
    }

    /// Type and size of the entry at `offset`
    ///
    /// Only the first bytes of a delta are inflated, they hold the size of
    /// the rebuilt object. The type comes from the end of the chain.
    pub fn read_object_header(&self, offset: u64) -> anyhow::Result<ObjectHeader> {
        let mut file = self.open_file()?;
        let mut size = None;
        let mut current = offset;

        for _ in 0..=MAX_DELTA_DEPTH {
            let mut reader = Self::seek_entry(&mut file, current)?;
            let header = read_entry_header(&mut reader, current)?;

            let base = match header.kind {
                EntryKind::Base(object_type) => {
                    return Ok(ObjectHeader {
                        object_type,
                        size: size.unwrap_or(header.size),
                    });
                }
                EntryKind::OfsDelta(base) => base,
                EntryKind::RefDelta(base_id) => self.base_offset(&base_id)?,
            };

            if size.is_none() {
                let mut delta = flate2::bufread::ZlibDecoder::new(&mut reader);
                read_size(&mut delta)?;
                size = Some(read_size(&mut delta)?);
            }
            current = base;
        }

        anyhow::bail!(
            "delta chain at offset {offset} in {} is too deep",
            self.path.display()
        )
    }

    /// Inflate the entry at `offset`, applying its delta chain
    pub fn read_object(&self, offset: u64) -> anyhow::Result<(ObjectType, Bytes)> {
        let mut file = self.open_file()?;
        let mut deltas = Vec::new();
        let mut current = offset;

        let (object_type, mut content) = loop {
            if let Some(cached) = self.cache.borrow().get(&current) {
                break cached.clone();
            }
            if deltas.len() > MAX_DELTA_DEPTH {
                anyhow::bail!(
                    "delta chain at offset {offset} in {} is too deep",
                    self.path.display()
                );
            }

            let mut reader = Self::seek_entry(&mut file, current)?;
            let header = read_entry_header(&mut reader, current)?;
            let data = inflate(&mut reader, header.size).context(format!(
                "Unable to inflate entry at offset {current} in {}",
                self.path.display()
            ))?;

            match header.kind {
                EntryKind::Base(object_type) => break (object_type, data),
                EntryKind::OfsDelta(base) => {
                    deltas.push((current, data));
                    current = base;
                }
                EntryKind::RefDelta(base_id) => {
                    deltas.push((current, data));
                    current = self.base_offset(&base_id)?;
                }
            }
        };

        if !deltas.is_empty() {
            self.remember(current, object_type, content.clone());
        }
        while let Some((delta_offset, delta)) = deltas.pop() {
            content = apply_delta(&content, &delta).context(format!(
                "Invalid delta at offset {delta_offset} in {}",
                self.path.display()
            ))?;
            self.remember(delta_offset, object_type, content.clone());
        }

        Ok((object_type, content))
    }

    fn check_header(&self) -> anyhow::Result<()> {
        let mut header = [0u8; PACK_HEADER_SIZE];
        self.open_file()?
            .read_exact(&mut header)
            .context(format!("Invalid pack file {}", self.path.display()))?;

        if &header[..4] != PACK_SIGNATURE {
            anyhow::bail!("{} is not a pack file", self.path.display());
        }
        let version = NetworkEndian::read_u32(&header[4..8]);
        if !PACK_VERSIONS.contains(&version) {
            anyhow::bail!(
                "unsupported pack version {version} in {}",
                self.path.display()
            );
        }
        let count = NetworkEndian::read_u32(&header[8..12]) as usize;
        if count != self.index.count {
            anyhow::bail!(
                "pack {} holds {count} objects but its index lists {}",
                self.path.display(),
                self.index.count
            );
        }

        Ok(())
    }

    fn base_offset(&self, base_id: &ObjectId) -> anyhow::Result<u64> {
        self.find(base_id)?.context(format!(
            "delta base {base_id} is missing from {}",
            self.path.display()
        ))
    }

    fn remember(&self, offset: u64, object_type: ObjectType, content: Bytes) {
        let mut cache = self.cache.borrow_mut();
        if cache.len() >= MAX_CACHED_OBJECTS {
            cache.clear();
        }
        cache.insert(offset, (object_type, content));
    }

    fn open_file(&self) -> anyhow::Result<File> {
        File::open(&self.path).context(format!(
            "Unable to read pack file {}",
            self.path.display()
        ))
    }

    fn seek_entry(file: &mut File, offset: u64) -> anyhow::Result<BufReader<&mut File>> {
        file.seek(SeekFrom::Start(offset))?;
        Ok(BufReader::new(file))
    }
}

fn read_entry_header(reader: &mut impl Read, offset: u64) -> anyhow::Result<EntryHeader> {
    let mut byte = reader.read_u8()?;
    let type_code = (byte >> 4) & 0b111;
    let mut size = u64::from(byte & 0x0f);
    let mut shift = 4;

    while byte & 0x80 != 0 {
        if shift >= u64::BITS {
            anyhow::bail!("entry size at offset {offset} is too large");
        }
        byte = reader.read_u8()?;
        size |= u64::from(byte & 0x7f) << shift;
        shift += 7;
    }

    let kind = match type_code {
        OBJ_COMMIT => EntryKind::Base(ObjectType::Commit),
        OBJ_TREE => EntryKind::Base(ObjectType::Tree),
        OBJ_BLOB => EntryKind::Base(ObjectType::Blob),
        OBJ_TAG => EntryKind::Base(ObjectType::Tag),
        OBJ_OFS_DELTA => {
            let distance = read_base_distance(reader)?;
            let base = offset
                .checked_sub(distance)
                .filter(|_| distance > 0)
                .context(format!("delta at offset {offset} points outside the pack"))?;
            EntryKind::OfsDelta(base)
        }
        OBJ_REF_DELTA => EntryKind::RefDelta(ObjectId::read_h40_from(reader)?),
        other => anyhow::bail!("unknown entry type {other} at offset {offset}"),
    };

    Ok(EntryHeader { kind, size })
}

/// Backwards distance to an `OFS_DELTA` base
///
/// Big-endian groups of 7 bits, where every continuation also adds one so
/// that each length encodes a distinct range.
fn read_base_distance(reader: &mut impl Read) -> anyhow::Result<u64> {
    let mut byte = reader.read_u8()?;
    let mut distance = u64::from(byte & 0x7f);

    while byte & 0x80 != 0 {
        byte = reader.read_u8()?;
        distance = distance
            .checked_add(1)
            .and_then(|distance| distance.checked_mul(0x80))
            .context("delta base distance overflows")?
            | u64::from(byte & 0x7f);
    }

    Ok(distance)
}

/// Little-endian groups of 7 bits, as used for delta sizes
fn read_size(reader: &mut impl Read) -> anyhow::Result<u64> {
    let mut size = 0u64;
    let mut shift = 0;

    loop {
        if shift >= u64::BITS {
            anyhow::bail!("delta size is too large");
        }
        let byte = reader.read_u8()?;
        size |= u64::from(byte & 0x7f) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            return Ok(size);
        }
    }
}

fn inflate(reader: impl BufRead, size: u64) -> anyhow::Result<Bytes> {
    let mut content = Vec::new();
    flate2::bufread::ZlibDecoder::new(reader)
        .take(size.saturating_add(1))
        .read_to_end(&mut content)?;

    if content.len() as u64 != size {
        anyhow::bail!("expected {size} bytes, inflated {}", content.len());
    }

    Ok(content.into())
}

/// Rebuild an object from its delta base
///
/// The delta starts with the base and result sizes, followed by
/// instructions. A set high bit copies a range of the base, its low bits
/// saying which offset and size bytes follow. Otherwise the instruction is
/// the count of literal bytes to insert.
fn apply_delta(base: &[u8], delta: &[u8]) -> anyhow::Result<Bytes> {
    let mut reader = Cursor::new(delta);

    let base_size = read_size(&mut reader)?;
    if base_size != base.len() as u64 {
        anyhow::bail!(
            "delta expects a base of {base_size} bytes, found {}",
            base.len()
        );
    }
    let target_size = usize::try_from(read_size(&mut reader)?)?;
    let mut target = Vec::with_capacity(target_size.min(MAX_DELTA_PREALLOCATION));

    while (reader.position() as usize) < delta.len() {
        let instruction = reader.read_u8()?;

        if instruction & 0x80 != 0 {
            let mut copy_offset = 0usize;
            for byte_index in 0..4 {
                if instruction & (1 << byte_index) != 0 {
                    copy_offset |= usize::from(reader.read_u8()?) << (8 * byte_index);
                }
            }
            let mut copy_size = 0usize;
            for byte_index in 0..3 {
                if instruction & (0x10 << byte_index) != 0 {
                    copy_size |= usize::from(reader.read_u8()?) << (8 * byte_index);
                }
            }
            if copy_size == 0 {
                copy_size = 0x10000;
            }

            let chunk = copy_offset
                .checked_add(copy_size)
                .and_then(|end| base.get(copy_offset..end))
                .context("delta copies past the end of its base")?;
            target.extend_from_slice(chunk);
        } else if instruction != 0 {
            let start = reader.position() as usize;
            let end = start + usize::from(instruction);
            let literal = delta
                .get(start..end)
                .context("delta insert runs past its end")?;
            target.extend_from_slice(literal);
            reader.set_position(end as u64);
        } else {
            anyhow::bail!("reserved delta instruction 0");
        }
    }

    if target.len() != target_size {
        anyhow::bail!(
            "delta rebuilt {} bytes instead of {target_size}",
            target.len()
        );
    }

    Ok(target.into())
}
