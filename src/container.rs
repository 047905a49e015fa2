//! The container-reader boundary: OLE compound document access (via `cfb`)
//! and decoding of the property stream IE writes into recovery containers.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};
use log::{trace, warn};

use crate::err::{AcrError, Result};

/// OLE compound document signature.
const OLE_MAGIC: [u8; 8] = [0xd0, 0xcf, 0x11, 0xe0, 0xa1, 0xb1, 0x1a, 0xe1];

/// Name of the property stream present in both recovery stores and tab data
/// files. The leading `\x05` marks it as a property set stream.
pub const RECOVERY_PROPERTY_STREAM: &str = "\u{5}KjjaqfajN2c0uzgv1l4qy5nfWe";

/// Cheap signature check, usable on arbitrary files before any decode
/// attempt.
pub fn is_supported_container(path: impl AsRef<Path>) -> bool {
    let mut magic = [0u8; 8];
    match File::open(path.as_ref()).and_then(|mut f| f.read_exact(&mut magic)) {
        Ok(()) => magic == OLE_MAGIC,
        Err(_) => false,
    }
}

/// An opened recovery container.
pub struct Container {
    path: PathBuf,
    inner: cfb::CompoundFile<File>,
}

impl Container {
    pub fn open(path: impl AsRef<Path>) -> Result<Container> {
        let path = path.as_ref();

        if !is_supported_container(path) {
            return Err(AcrError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }

        // Evidence files are opened read-only; `cfb::open` would ask for
        // write access.
        let inner = File::open(path)
            .and_then(cfb::CompoundFile::open)
            .map_err(|source| AcrError::FailedToOpen {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Container {
            path: path.to_path_buf(),
            inner,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Leaf names of the root-level streams, in directory order.
    pub fn stream_names(&self) -> Vec<String> {
        self.inner
            .read_root_storage()
            .filter(|entry| entry.is_stream())
            .map(|entry| entry.name().to_owned())
            .collect()
    }

    pub fn read_stream(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut data = Vec::new();

        self.inner
            .open_stream(format!("/{name}"))
            .and_then(|mut stream| stream.read_to_end(&mut data))
            .map_err(|source| AcrError::StreamRead {
                name: name.to_owned(),
                source,
            })?;

        trace!("read {} bytes from stream `{name}`", data.len());
        Ok(data)
    }

    /// Decodes the recovery property stream. An absent stream degrades to an
    /// empty set; missing properties are a data-quality signal here, not a
    /// failure.
    pub fn property_set(&mut self) -> Result<PropertySet> {
        if !self.inner.is_stream(format!("/{RECOVERY_PROPERTY_STREAM}")) {
            warn!(
                "`{}` carries no recovery property stream",
                self.path.display()
            );
            return Ok(PropertySet::default());
        }

        let data = self.read_stream(RECOVERY_PROPERTY_STREAM)?;
        PropertySet::from_bytes(&data)
    }
}

/// A single typed property value.
///
/// Only the variant types observed in recovery containers are decoded;
/// anything else keeps its property id visible through `Unsupported` so
/// presence tests still work.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    I2(i16),
    I4(i32),
    U2(u16),
    U4(u32),
    Bool(bool),
    FileTime(u64),
    Str(String),
    Unsupported { vt: u32 },
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

const VT_I2: u32 = 2;
const VT_I4: u32 = 3;
const VT_BOOL: u32 = 11;
const VT_UI2: u32 = 18;
const VT_UI4: u32 = 19;
const VT_LPSTR: u32 = 30;
const VT_LPWSTR: u32 = 31;
const VT_FILETIME: u32 = 64;

/// An ordered mapping from property id to value, decoded from a serialized
/// property set stream ([MS-OLEPS] layout: header, format id table, one
/// section of (id, offset) pairs and typed values).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySet {
    properties: BTreeMap<u32, PropertyValue>,
}

impl PropertySet {
    pub fn from_bytes(data: &[u8]) -> Result<PropertySet> {
        let malformed = |message: &str| AcrError::MalformedPropertySet {
            message: message.to_owned(),
        };

        let mut cursor = io::Cursor::new(data);

        let byte_order = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| malformed("truncated header"))?;
        if byte_order != 0xfffe {
            return Err(malformed("bad byte-order mark"));
        }

        // Version, system identifier and CLSID carry nothing we report.
        cursor.set_position(24);
        let set_count = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| malformed("truncated header"))?;
        if set_count == 0 {
            return Ok(PropertySet::default());
        }

        // First format id (16 bytes, skipped) and its section offset.
        cursor.set_position(44);
        let section_start = u64::from(
            cursor
                .read_u32::<LittleEndian>()
                .map_err(|_| malformed("truncated format id table"))?,
        );

        cursor.set_position(section_start);
        let _section_size = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| malformed("truncated section header"))?;
        let property_count = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| malformed("truncated section header"))?;

        let mut offsets = Vec::with_capacity(property_count as usize);
        for _ in 0..property_count {
            let id = cursor
                .read_u32::<LittleEndian>()
                .map_err(|_| malformed("truncated property table"))?;
            let offset = cursor
                .read_u32::<LittleEndian>()
                .map_err(|_| malformed("truncated property table"))?;
            offsets.push((id, offset));
        }

        let mut properties = BTreeMap::new();
        for (id, offset) in offsets {
            cursor.set_position(section_start + u64::from(offset));
            let value = read_value(&mut cursor)
                .map_err(|_| malformed(&format!("truncated value for property {id}")))?;
            trace!("property {id}: {value:?}");
            properties.insert(id, value);
        }

        Ok(PropertySet { properties })
    }

    /// Existence test, preserved from the observed on-disk semantics: some
    /// flags are signalled by the property id being present at all,
    /// regardless of its value.
    pub fn contains(&self, id: u32) -> bool {
        self.properties.contains_key(&id)
    }

    pub fn get(&self, id: u32) -> Option<&PropertyValue> {
        self.properties.get(&id)
    }

    /// String value of a property; `None` when absent or differently typed.
    pub fn string(&self, id: u32) -> Option<&str> {
        self.get(id).and_then(PropertyValue::as_str)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

fn read_value(cursor: &mut io::Cursor<&[u8]>) -> io::Result<PropertyValue> {
    let vt = cursor.read_u32::<LittleEndian>()?;

    let value = match vt {
        VT_I2 => PropertyValue::I2(cursor.read_i16::<LittleEndian>()?),
        VT_I4 => PropertyValue::I4(cursor.read_i32::<LittleEndian>()?),
        VT_BOOL => PropertyValue::Bool(cursor.read_u16::<LittleEndian>()? != 0),
        VT_UI2 => PropertyValue::U2(cursor.read_u16::<LittleEndian>()?),
        VT_UI4 => PropertyValue::U4(cursor.read_u32::<LittleEndian>()?),
        VT_FILETIME => PropertyValue::FileTime(cursor.read_u64::<LittleEndian>()?),
        VT_LPSTR => {
            let len = cursor.read_u32::<LittleEndian>()? as usize;
            let mut raw = vec![0u8; len];
            cursor.read_exact(&mut raw)?;
            let text: String = raw
                .iter()
                .take_while(|&&b| b != 0)
                .map(|&b| b as char)
                .collect();
            PropertyValue::Str(text)
        }
        VT_LPWSTR => {
            let len = cursor.read_u32::<LittleEndian>()? as usize;
            let mut units = Vec::with_capacity(len);
            for _ in 0..len {
                units.push(cursor.read_u16::<LittleEndian>()?);
            }
            let text: String = char::decode_utf16(units.into_iter().take_while(|&u| u != 0))
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect();
            PropertyValue::Str(text)
        }
        other => PropertyValue::Unsupported { vt: other },
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use pretty_assertions::assert_eq;

    enum Prop<'a> {
        Wide(&'a str),
        Ansi(&'a str),
        I4(i32),
        Unknown(u32),
    }

    fn build_property_stream(props: &[(u32, Prop)]) -> Vec<u8> {
        let mut header = Vec::new();
        header.write_u16::<LittleEndian>(0xfffe).unwrap(); // byte order
        header.write_u16::<LittleEndian>(0).unwrap(); // version
        header.write_u32::<LittleEndian>(0x0002_0006).unwrap(); // system id
        header.extend([0u8; 16]); // clsid
        header.write_u32::<LittleEndian>(1).unwrap(); // one property set
        header.extend([0u8; 16]); // format id
        header.write_u32::<LittleEndian>(48).unwrap(); // section offset

        let table_len = 8 + 8 * props.len();
        let mut values = Vec::new();
        let mut table = Vec::new();
        for (id, prop) in props {
            table.push((*id, (table_len + values.len()) as u32));
            match prop {
                Prop::Wide(s) => {
                    values.write_u32::<LittleEndian>(VT_LPWSTR).unwrap();
                    values.write_u32::<LittleEndian>(s.len() as u32 + 1).unwrap();
                    for unit in s.encode_utf16() {
                        values.write_u16::<LittleEndian>(unit).unwrap();
                    }
                    values.write_u16::<LittleEndian>(0).unwrap();
                }
                Prop::Ansi(s) => {
                    values.write_u32::<LittleEndian>(VT_LPSTR).unwrap();
                    values.write_u32::<LittleEndian>(s.len() as u32 + 1).unwrap();
                    values.extend(s.bytes());
                    values.push(0);
                }
                Prop::I4(v) => {
                    values.write_u32::<LittleEndian>(VT_I4).unwrap();
                    values.write_i32::<LittleEndian>(*v).unwrap();
                }
                Prop::Unknown(vt) => {
                    values.write_u32::<LittleEndian>(*vt).unwrap();
                }
            }
            while values.len() % 4 != 0 {
                values.push(0);
            }
        }

        let mut section = Vec::new();
        section
            .write_u32::<LittleEndian>((table_len + values.len()) as u32)
            .unwrap();
        section.write_u32::<LittleEndian>(props.len() as u32).unwrap();
        for (id, offset) in table {
            section.write_u32::<LittleEndian>(id).unwrap();
            section.write_u32::<LittleEndian>(offset).unwrap();
        }
        section.extend(values);

        header.extend(section);
        header
    }

    #[test]
    fn it_decodes_typed_values_by_property_id() {
        let stream = build_property_stream(&[
            (3, Prop::Wide("2")),
            (5, Prop::I4(1)),
            (7, Prop::Ansi("hello")),
        ]);
        let set = PropertySet::from_bytes(&stream).unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(set.string(3), Some("2"));
        assert_eq!(set.get(5), Some(&PropertyValue::I4(1)));
        assert_eq!(set.string(7), Some("hello"));
    }

    #[test]
    fn wide_strings_are_trimmed_at_the_terminator() {
        let stream = build_property_stream(&[(3, Prop::Wide("89f48080"))]);
        let set = PropertySet::from_bytes(&stream).unwrap();

        assert_eq!(set.string(3), Some("89f48080"));
    }

    #[test]
    fn unknown_value_types_keep_their_id_present() {
        let stream = build_property_stream(&[(5, Prop::Unknown(0x1055))]);
        let set = PropertySet::from_bytes(&stream).unwrap();

        assert!(set.contains(5));
        assert_eq!(set.get(5), Some(&PropertyValue::Unsupported { vt: 0x1055 }));
        assert_eq!(set.string(5), None);
    }

    #[test]
    fn absent_ids_resolve_to_none_not_an_error() {
        let set = PropertySet::from_bytes(&build_property_stream(&[])).unwrap();

        assert!(set.is_empty());
        assert_eq!(set.string(7), None);
        assert!(!set.contains(5));
    }

    #[test]
    fn a_bad_byte_order_mark_is_malformed() {
        let err = PropertySet::from_bytes(&[0xff, 0xff, 0, 0]).unwrap_err();
        assert!(err.to_string().contains("byte-order"));
    }

    #[test]
    fn a_truncated_stream_is_malformed() {
        let mut stream = build_property_stream(&[(3, Prop::Wide("2"))]);
        stream.truncate(52);

        assert!(PropertySet::from_bytes(&stream).is_err());
    }
}
