//! Annotated tag object
//!
//! Only the target is needed to peel a tag down to the commit it names:
//!
//! ```text
//! object <target-sha>
//! type <target-type>
//! tag <name>
//! tagger <name> <email> <timestamp> <timezone>
//!
//! <message>
//! ```

use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    target: ObjectId,
}

impl Tag {
    pub fn target(&self) -> &ObjectId {
        &self.target
    }
}

impl Unpackable for Tag {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let mut target = None;

        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                break;
            }

            if let Some(oid) = line.strip_prefix("object ") {
                target = Some(ObjectId::try_parse(oid.to_string())?);
            }
        }

        Ok(Tag {
            target: target.context("Invalid tag object: missing object line")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn tag_target_is_parsed() {
        let raw = "object 1111111111111111111111111111111111111111\ntype commit\ntag v1\n\
                   tagger A <a@b.c> 0 +0000\n\nrelease\n";

        let tag = Tag::deserialize(Cursor::new(raw)).unwrap();

        assert_eq!(tag.target().as_ref(), "1".repeat(40));
    }

    #[test]
    fn tag_without_target_is_rejected() {
        assert!(Tag::deserialize(Cursor::new("type commit\n\nmsg\n")).is_err());
    }
}
