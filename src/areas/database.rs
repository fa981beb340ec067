use crate::areas::pack::Pack;
use crate::artifacts::diff::snapshot::{CommitSnapshot, FileEntry};
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::{ObjectHeader, ObjectType};
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::Tree;
use anyhow::Context;
use bytes::{BufMut, Bytes, BytesMut};
use sha1::{Digest, Sha1};
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

/// Annotated tags pointing at tags are followed at most this many times
const MAX_TAG_DEPTH: usize = 16;

const PACK_DIR: &str = "pack";

/// Read-only view of the object store under `.git/objects`
///
/// Loose objects are looked up first, then every pack.
#[derive(Debug)]
pub struct Database {
    path: Box<Path>,
    packs: Vec<Pack>,
}

impl Database {
    pub fn open(path: Box<Path>) -> anyhow::Result<Self> {
        let packs = Pack::discover(&path.join(PACK_DIR))?;

        Ok(Database { path, packs })
    }

    pub fn contains(&self, object_id: &ObjectId) -> bool {
        self.path.join(object_id.to_path()).is_file()
            || self.packs.iter().any(|pack| pack.contains(object_id))
    }

    /// Inflate an object, checking that its content hashes to `object_id`
    pub fn load(&self, object_id: &ObjectId) -> anyhow::Result<Bytes> {
        let object_path = self.path.join(object_id.to_path());
        let object_content = match self.find_packed(object_id, &object_path)? {
            Some((pack, offset)) => {
                let (object_type, content) = pack.read_object(offset).context(format!(
                    "Unable to read object {object_id} from {}",
                    pack.path().display()
                ))?;
                Self::with_header(object_type, &content)
            }
            None => self.read_object(object_path)?,
        };

        let digest = format!("{:x}", Sha1::digest(&object_content));
        if digest != object_id.as_ref() {
            anyhow::bail!("object {object_id} is corrupt: content hashes to {digest}");
        }

        Ok(object_content)
    }

    /// Decode only the `<type> <size>\0` prefix of an object
    pub fn read_object_header(&self, object_id: &ObjectId) -> anyhow::Result<ObjectHeader> {
        let object_path = self.path.join(object_id.to_path());
        if let Some((pack, offset)) = self.find_packed(object_id, &object_path)? {
            return pack
                .read_object_header(offset)
                .context(format!("Invalid header in object {object_id}"));
        }

        let object_file = std::fs::File::open(&object_path).context(format!(
            "Unable to read object file {}",
            object_path.display()
        ))?;
        let mut object_reader = BufReader::new(flate2::read::ZlibDecoder::new(object_file));

        ObjectType::parse_object_header(&mut object_reader)
            .context(format!("Invalid header in object {object_id}"))
    }

    pub fn parse_object_as_tree(&self, object_id: &ObjectId) -> anyhow::Result<Option<Tree>> {
        let (object_type, object_reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Tree => Ok(Some(
                Tree::deserialize(object_reader).context(format!("Invalid tree {object_id}"))?,
            )),
            _ => Ok(None),
        }
    }

    pub fn parse_object_as_commit(&self, object_id: &ObjectId) -> anyhow::Result<Option<Commit>> {
        let (object_type, object_reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Commit => Ok(Some(
                Commit::deserialize(object_reader)
                    .context(format!("Invalid commit {object_id}"))?,
            )),
            _ => Ok(None),
        }
    }

    pub fn parse_object_as_tag(&self, object_id: &ObjectId) -> anyhow::Result<Option<Tag>> {
        let (object_type, object_reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Tag => Ok(Some(
                Tag::deserialize(object_reader).context(format!("Invalid tag {object_id}"))?,
            )),
            _ => Ok(None),
        }
    }

    /// Follow annotated tags down to a commit
    ///
    /// Returns `None` when the chain ends at a tree or a blob.
    pub fn peel_to_commit(&self, object_id: &ObjectId) -> anyhow::Result<Option<ObjectId>> {
        let mut current = object_id.clone();

        for _ in 0..MAX_TAG_DEPTH {
            match self.read_object_header(&current)?.object_type {
                ObjectType::Commit => return Ok(Some(current)),
                ObjectType::Tag => {
                    let tag = self
                        .parse_object_as_tag(&current)?
                        .context(format!("Object {current} is not a tag"))?;
                    current = tag.target().clone();
                }
                ObjectType::Tree | ObjectType::Blob => return Ok(None),
            }
        }

        anyhow::bail!("tag chain starting at {object_id} is too deep")
    }

    /// Flatten a root tree into every blob it reaches
    ///
    /// Paths are joined with `/`. Submodule entries are skipped, their commits
    /// live in another repository, and so are entries with unknown modes.
    pub fn load_snapshot(&self, tree_oid: &ObjectId) -> anyhow::Result<CommitSnapshot> {
        let mut snapshot = CommitSnapshot::default();
        self.collect_tree(tree_oid, "", &mut snapshot)?;

        Ok(snapshot)
    }

    fn collect_tree(
        &self,
        tree_oid: &ObjectId,
        prefix: &str,
        snapshot: &mut CommitSnapshot,
    ) -> anyhow::Result<()> {
        let tree = self
            .parse_object_as_tree(tree_oid)?
            .context(format!("Object {tree_oid} is not a tree"))?;

        for (name, entry) in tree.into_entries() {
            let path = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };

            if entry.is_tree() {
                self.collect_tree(&entry.oid, &path, snapshot)?;
            } else if entry.mode.is_blob() {
                let size = self.read_object_header(&entry.oid)?.size;
                snapshot.insert(path, FileEntry::new(entry.mode, entry.oid, size));
            }
        }

        Ok(())
    }

    fn parse_object_as_bytes(
        &self,
        object_id: &ObjectId,
    ) -> anyhow::Result<(ObjectType, impl BufRead)> {
        let object_content = self.load(object_id)?;
        let mut object_reader = Cursor::new(object_content);

        let header = ObjectType::parse_object_header(&mut object_reader)
            .context(format!("Invalid header in object {object_id}"))?;

        Ok((header.object_type, object_reader))
    }

    /// Pack and offset of an object that has no loose copy
    fn find_packed(
        &self,
        object_id: &ObjectId,
        object_path: &Path,
    ) -> anyhow::Result<Option<(&Pack, u64)>> {
        if object_path.is_file() {
            return Ok(None);
        }

        for pack in &self.packs {
            if let Some(offset) = pack.find(object_id)? {
                return Ok(Some((pack, offset)));
            }
        }

        Ok(None)
    }

    /// Prefix packed content with the `<type> <size>\0` header of loose objects
    fn with_header(object_type: ObjectType, content: &[u8]) -> Bytes {
        let header = format!("{} {}\0", object_type.as_str(), content.len());
        let mut object = BytesMut::with_capacity(header.len() + content.len());
        object.put_slice(header.as_bytes());
        object.put_slice(content);

        object.freeze()
    }

    fn read_object(&self, object_path: PathBuf) -> anyhow::Result<Bytes> {
        let object_content = std::fs::read(&object_path).context(format!(
            "Unable to read object file {}",
            object_path.display()
        ))?;

        Self::decompress(object_content.into())
    }

    fn decompress(data: Bytes) -> anyhow::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(&*data);
        let mut decompressed_content = Vec::new();
        decoder
            .read_to_end(&mut decompressed_content)
            .context("Unable to decompress object content")?;

        Ok(decompressed_content.into())
    }
}
