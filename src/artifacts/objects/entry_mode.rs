/// Mode of a tree entry, as stored in git tree objects
#[derive(Debug, Clone, Copy, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub enum EntryMode {
    Regular,
    /// Group-writable blob written by very old git versions
    GroupWritable,
    Executable,
    Symlink,
    Directory,
    /// Submodule commit recorded in a tree
    Gitlink,
    /// Any other mode, kept verbatim
    Unknown(u32),
}

impl EntryMode {
    pub fn as_u32(&self) -> u32 {
        match self {
            EntryMode::Regular => 0o100644,
            EntryMode::GroupWritable => 0o100664,
            EntryMode::Executable => 0o100755,
            EntryMode::Symlink => 0o120000,
            EntryMode::Directory => 0o40000,
            EntryMode::Gitlink => 0o160000,
            EntryMode::Unknown(mode) => *mode,
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, EntryMode::Directory)
    }

    /// Entries backed by a blob in this repository's object database
    pub fn is_blob(&self) -> bool {
        matches!(
            self,
            EntryMode::Regular
                | EntryMode::GroupWritable
                | EntryMode::Executable
                | EntryMode::Symlink
        )
    }

    /// Parse the octal mode of a tree entry
    ///
    /// Only text that is not octal fails. Unrecognized modes come back as
    /// [`EntryMode::Unknown`].
    pub fn from_octal_str(value: &str) -> anyhow::Result<Self> {
        let mode = u32::from_str_radix(value, 8)
            .map_err(|_| anyhow::anyhow!("Invalid entry mode {value}"))?;
        Ok(Self::from(mode))
    }
}

impl From<u32> for EntryMode {
    fn from(mode: u32) -> Self {
        match mode {
            0o100644 => EntryMode::Regular,
            0o100664 => EntryMode::GroupWritable,
            0o100755 => EntryMode::Executable,
            0o120000 => EntryMode::Symlink,
            0o40000 => EntryMode::Directory,
            0o160000 => EntryMode::Gitlink,
            other => EntryMode::Unknown(other),
        }
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:o}", self.as_u32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("100644", EntryMode::Regular)]
    #[case("100664", EntryMode::GroupWritable)]
    #[case("100600", EntryMode::Unknown(0o100600))]
    #[case("100755", EntryMode::Executable)]
    #[case("120000", EntryMode::Symlink)]
    #[case("40000", EntryMode::Directory)]
    #[case("160000", EntryMode::Gitlink)]
    fn octal_modes_are_parsed(#[case] raw: &str, #[case] expected: EntryMode) {
        assert_eq!(EntryMode::from_octal_str(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("100999")]
    #[case("rwx")]
    fn non_octal_modes_are_rejected(#[case] raw: &str) {
        assert!(EntryMode::from_octal_str(raw).is_err());
    }

    #[test]
    fn group_writable_mode_is_kept_apart_from_regular() {
        let mode = EntryMode::from_octal_str("100664").unwrap();

        assert_ne!(mode, EntryMode::Regular);
        assert_eq!(mode.to_string(), "100664");
        assert!(mode.is_blob());
    }

    #[test]
    fn unknown_modes_render_verbatim_and_are_not_blobs() {
        let mode = EntryMode::from_octal_str("777").unwrap();

        assert_eq!(mode.to_string(), "777");
        assert!(!mode.is_blob());
        assert!(!mode.is_tree());
    }

    #[test]
    fn modes_render_as_unpadded_octal() {
        assert_eq!(EntryMode::Regular.to_string(), "100644");
        assert_eq!(EntryMode::Executable.to_string(), "100755");
        assert_eq!(EntryMode::Directory.to_string(), "40000");
    }

    #[test]
    fn only_blob_modes_are_blobs() {
        assert!(EntryMode::Symlink.is_blob());
        assert!(!EntryMode::Gitlink.is_blob());
        assert!(!EntryMode::Directory.is_blob());
    }
}
