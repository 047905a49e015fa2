use std::fmt::{self, Debug, Display, Write};

use byteorder::{ByteOrder, LittleEndian};
use serde::{Serialize, Serializer};

/// A 16-byte identifier as stored on the wire: the first three field groups
/// are little-endian and must be byte-reversed for display, the trailing
/// 8 bytes are shown verbatim.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid {
    data1: u32,
    data2: u16,
    data3: u16,
    data4: [u8; 8],
}

impl Guid {
    /// The all-zero sentinel, used in tab pointer lists as a terminator
    /// meaning "no tab".
    pub fn nil() -> Guid {
        Guid {
            data1: 0,
            data2: 0,
            data3: 0,
            data4: [0; 8],
        }
    }

    pub fn is_nil(&self) -> bool {
        self.data1 == 0 && self.data2 == 0 && self.data3 == 0 && self.data4 == [0; 8]
    }

    /// Decodes a GUID from its 16-byte wire representation.
    ///
    /// Recovery-store inputs are frequently truncated, so anything that is
    /// not exactly 16 bytes yields the nil sentinel rather than an error.
    pub fn from_slice(data: &[u8]) -> Guid {
        if data.len() != 16 {
            return Guid::nil();
        }

        let mut data4 = [0; 8];
        data4.copy_from_slice(&data[8..16]);

        Guid {
            data1: LittleEndian::read_u32(&data[0..4]),
            data2: LittleEndian::read_u16(&data[4..6]),
            data3: LittleEndian::read_u16(&data[6..8]),
            data4,
        }
    }

    /// Parses the canonical dashed 36-character form, as it appears in tab
    /// data file names. Malformed input yields the nil sentinel.
    pub fn from_dashed(s: &str) -> Guid {
        let b = s.as_bytes();
        if b.len() != 36 || b[8] != b'-' || b[13] != b'-' || b[18] != b'-' || b[23] != b'-' {
            return Guid::nil();
        }

        let field = |range: std::ops::Range<usize>| -> Option<u64> {
            std::str::from_utf8(&b[range])
                .ok()
                .and_then(|hex| u64::from_str_radix(hex, 16).ok())
        };

        let parsed = (|| {
            let data1 = field(0..8)? as u32;
            let data2 = field(9..13)? as u16;
            let data3 = field(14..18)? as u16;
            let mut data4 = [0; 8];
            data4[0] = field(19..21)? as u8;
            data4[1] = field(21..23)? as u8;
            for (i, byte) in data4[2..].iter_mut().enumerate() {
                *byte = field(24 + 2 * i..26 + 2 * i)? as u8;
            }
            Some(Guid {
                data1,
                data2,
                data3,
                data4,
            })
        })();

        parsed.unwrap_or_else(Guid::nil)
    }

    pub fn to_string(&self) -> String {
        // Using `format!` will extend the string multiple times,
        // but we know ahead of time how much space we need.
        let mut s = String::with_capacity(36);

        write!(
            &mut s,
            "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            self.data1,
            self.data2,
            self.data3,
            self.data4[0],
            self.data4[1],
            self.data4[2],
            self.data4[3],
            self.data4[4],
            self.data4[5],
            self.data4[6],
            self.data4[7]
        )
        .expect("writing to a preallocated buffer cannot fail");

        s
    }
}

impl Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_string())
    }
}

impl Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_string())
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
