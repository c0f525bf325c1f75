use crate::class_file::Serialize;
use byteorder::WriteBytesExt;

/// Class file format version
///
/// Serialized as minor then major. Stack map frames are required from `JAVA7` on, and this
/// codec does not synthesize them, so emitting bodies with branches for newer versions needs
/// a frame-computing collaborator.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Version {
    Java5,
    Java6,
    Java7,
    Java8,
    Java11,
}

impl Version {
    pub fn major(self) -> u16 {
        match self {
            Version::Java5 => 49,
            Version::Java6 => 50,
            Version::Java7 => 51,
            Version::Java8 => 52,
            Version::Java11 => 55,
        }
    }

    pub fn minor(self) -> u16 {
        0
    }

    pub fn from_major(major: u16) -> Option<Version> {
        match major {
            49 => Some(Version::Java5),
            50 => Some(Version::Java6),
            51 => Some(Version::Java7),
            52 => Some(Version::Java8),
            55 => Some(Version::Java11),
            _ => None,
        }
    }
}

impl Serialize for Version {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.minor().serialize(writer)?;
        self.major().serialize(writer)
    }
}
