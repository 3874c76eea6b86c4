//! TIFF IFD (Image File Directory) parsing over byte slices.
//!
//! COG headers arrive as HTTP Range responses, so everything here works on
//! `&[u8]` rather than `Read + Seek`. Only classic TIFF is handled; Landsat
//! Collection 2 COGs are well below the 4 GiB BigTIFF threshold.

use std::collections::HashMap;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{CloudError, Result};

/// Well-known TIFF and GeoTIFF tag IDs.
pub mod tags {
    pub const IMAGE_WIDTH: u16 = 256;
    pub const IMAGE_LENGTH: u16 = 257;
    pub const BITS_PER_SAMPLE: u16 = 258;
    pub const COMPRESSION: u16 = 259;
    pub const SAMPLES_PER_PIXEL: u16 = 277;
    pub const PLANAR_CONFIG: u16 = 284;
    pub const PREDICTOR: u16 = 317;
    pub const TILE_WIDTH: u16 = 322;
    pub const TILE_LENGTH: u16 = 323;
    pub const TILE_OFFSETS: u16 = 324;
    pub const TILE_BYTE_COUNTS: u16 = 325;
    pub const SAMPLE_FORMAT: u16 = 339;
    pub const MODEL_PIXEL_SCALE: u16 = 33550;
    pub const MODEL_TIEPOINT: u16 = 33922;
    pub const MODEL_TRANSFORMATION: u16 = 34264;
    pub const GEO_KEY_DIRECTORY: u16 = 34735;
    pub const GDAL_NODATA: u16 = 42113;
}

/// Byte order of the TIFF file, also used for decoding tile samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub fn u16(self, b: &[u8]) -> u16 {
        match self {
            Endian::Little => LittleEndian::read_u16(b),
            Endian::Big => BigEndian::read_u16(b),
        }
    }

    pub fn u32(self, b: &[u8]) -> u32 {
        match self {
            Endian::Little => LittleEndian::read_u32(b),
            Endian::Big => BigEndian::read_u32(b),
        }
    }

    pub fn u64(self, b: &[u8]) -> u64 {
        match self {
            Endian::Little => LittleEndian::read_u64(b),
            Endian::Big => BigEndian::read_u64(b),
        }
    }

    pub fn f32(self, b: &[u8]) -> f32 {
        match self {
            Endian::Little => LittleEndian::read_f32(b),
            Endian::Big => BigEndian::read_f32(b),
        }
    }

    pub fn f64(self, b: &[u8]) -> f64 {
        match self {
            Endian::Little => LittleEndian::read_f64(b),
            Endian::Big => BigEndian::read_f64(b),
        }
    }

    pub fn write_u16(self, b: &mut [u8], v: u16) {
        match self {
            Endian::Little => LittleEndian::write_u16(b, v),
            Endian::Big => BigEndian::write_u16(b, v),
        }
    }

    pub fn write_u32(self, b: &mut [u8], v: u32) {
        match self {
            Endian::Little => LittleEndian::write_u32(b, v),
            Endian::Big => BigEndian::write_u32(b, v),
        }
    }
}

/// Size in bytes of one value of a TIFF field type.
fn field_size(field_type: u16) -> usize {
    match field_type {
        1 | 2 | 6 | 7 => 1,   // BYTE, ASCII, SBYTE, UNDEFINED
        3 | 8 => 2,           // SHORT, SSHORT
        4 | 9 | 11 => 4,      // LONG, SLONG, FLOAT
        5 | 10 | 12 | 16 => 8, // RATIONAL, SRATIONAL, DOUBLE, LONG8
        _ => 1,
    }
}

/// One 12-byte directory entry. The last four bytes are kept verbatim:
/// they hold either the value itself or the file offset of the value.
#[derive(Debug, Clone, PartialEq)]
pub struct TagEntry {
    pub tag: u16,
    pub field_type: u16,
    pub count: u32,
    pub value_field: [u8; 4],
}

impl TagEntry {
    /// Total size of the tag's value in bytes.
    pub fn byte_len(&self) -> u64 {
        field_size(self.field_type) as u64 * self.count as u64
    }

    /// Whether the value is stored inside the entry itself.
    pub fn is_inline(&self) -> bool {
        self.byte_len() <= 4
    }

    /// File offset of an out-of-line value.
    pub fn value_offset(&self, endian: Endian) -> u64 {
        endian.u32(&self.value_field) as u64
    }
}

/// Parsed TIFF header.
#[derive(Debug, Clone, Copy)]
pub struct TiffHeader {
    pub endian: Endian,
    pub first_ifd_offset: u64,
}

/// One directory and the offset of the next one (0 terminates the chain).
#[derive(Debug, Clone)]
pub struct Ifd {
    pub entries: Vec<TagEntry>,
    pub next_ifd_offset: u64,
}

impl Ifd {
    pub fn entry(&self, tag: u16) -> Option<&TagEntry> {
        self.entries.iter().find(|e| e.tag == tag)
    }
}

/// Parse the 8-byte TIFF header.
pub fn parse_header(data: &[u8]) -> Result<TiffHeader> {
    if data.len() < 8 {
        return Err(invalid("header too short"));
    }

    let endian = match (data[0], data[1]) {
        (b'I', b'I') => Endian::Little,
        (b'M', b'M') => Endian::Big,
        _ => return Err(invalid("invalid byte order marker")),
    };

    match endian.u16(&data[2..4]) {
        42 => {}
        43 => return Err(invalid("BigTIFF is not supported")),
        magic => return Err(invalid(&format!("expected magic 42, got {magic}"))),
    }

    Ok(TiffHeader {
        endian,
        first_ifd_offset: endian.u32(&data[4..8]) as u64,
    })
}

/// Parse one IFD; `data` must start at the IFD offset.
pub fn parse_ifd(endian: Endian, data: &[u8]) -> Result<Ifd> {
    if data.len() < 2 {
        return Err(invalid("IFD too short"));
    }

    let entry_count = endian.u16(&data[0..2]) as usize;
    let needed = ifd_byte_len(entry_count);
    if data.len() < needed {
        return Err(invalid(&format!(
            "IFD needs {needed} bytes but only {} available",
            data.len()
        )));
    }

    let entries = data[2..2 + entry_count * 12]
        .chunks_exact(12)
        .map(|raw| TagEntry {
            tag: endian.u16(&raw[0..2]),
            field_type: endian.u16(&raw[2..4]),
            count: endian.u32(&raw[4..8]),
            value_field: [raw[8], raw[9], raw[10], raw[11]],
        })
        .collect();

    let next = &data[needed - 4..needed];
    Ok(Ifd {
        entries,
        next_ifd_offset: endian.u32(next) as u64,
    })
}

/// Bytes occupied by an IFD with `entry_count` entries.
pub fn ifd_byte_len(entry_count: usize) -> usize {
    2 + entry_count * 12 + 4
}

/// Tag values with their bytes resolved, inline or fetched.
#[derive(Debug, Clone)]
pub struct ResolvedTags {
    endian: Endian,
    values: HashMap<u16, (TagEntry, Vec<u8>)>,
}

impl ResolvedTags {
    pub fn new(endian: Endian) -> Self {
        Self {
            endian,
            values: HashMap::new(),
        }
    }

    /// Record a tag whose value bytes are known.
    pub fn insert(&mut self, entry: TagEntry, bytes: Vec<u8>) {
        self.values.insert(entry.tag, (entry, bytes));
    }

    /// Record an inline tag, taking its bytes from the entry.
    pub fn insert_inline(&mut self, entry: &TagEntry) {
        let len = entry.byte_len() as usize;
        let bytes = entry.value_field[..len.min(4)].to_vec();
        self.insert(entry.clone(), bytes);
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn contains(&self, tag: u16) -> bool {
        self.values.contains_key(&tag)
    }

    /// Unsigned integer values (BYTE, SHORT, LONG, LONG8).
    pub fn uints(&self, tag: u16) -> Vec<u64> {
        let Some((entry, bytes)) = self.values.get(&tag) else {
            return Vec::new();
        };
        let size = field_size(entry.field_type);
        bytes
            .chunks_exact(size)
            .take(entry.count as usize)
            .filter_map(|b| match entry.field_type {
                1 => Some(b[0] as u64),
                3 => Some(self.endian.u16(b) as u64),
                4 => Some(self.endian.u32(b) as u64),
                16 => Some(self.endian.u64(b)),
                _ => None,
            })
            .collect()
    }

    /// First unsigned integer value of a tag.
    pub fn uint(&self, tag: u16) -> Option<u64> {
        self.uints(tag).first().copied()
    }

    /// Floating point values (FLOAT, DOUBLE).
    pub fn floats(&self, tag: u16) -> Vec<f64> {
        let Some((entry, bytes)) = self.values.get(&tag) else {
            return Vec::new();
        };
        let size = field_size(entry.field_type);
        bytes
            .chunks_exact(size)
            .take(entry.count as usize)
            .filter_map(|b| match entry.field_type {
                11 => Some(self.endian.f32(b) as f64),
                12 => Some(self.endian.f64(b)),
                _ => None,
            })
            .collect()
    }

    /// NUL-terminated ASCII value.
    pub fn ascii(&self, tag: u16) -> Option<String> {
        let (_, bytes) = self.values.get(&tag)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}

/// Raster layout of one IFD, as needed for tile reads.
#[derive(Debug, Clone)]
pub struct IfdInfo {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tile_offsets: Vec<u64>,
    pub tile_byte_counts: Vec<u64>,
    pub bits_per_sample: u16,
    pub sample_format: u16,
    pub compression: u16,
    pub predictor: u16,
}

impl IfdInfo {
    /// Tags required to build an [`IfdInfo`].
    pub const LAYOUT_TAGS: [u16; 12] = [
        tags::IMAGE_WIDTH,
        tags::IMAGE_LENGTH,
        tags::BITS_PER_SAMPLE,
        tags::COMPRESSION,
        tags::SAMPLES_PER_PIXEL,
        tags::PLANAR_CONFIG,
        tags::PREDICTOR,
        tags::TILE_WIDTH,
        tags::TILE_LENGTH,
        tags::TILE_OFFSETS,
        tags::TILE_BYTE_COUNTS,
        tags::SAMPLE_FORMAT,
    ];

    /// Validate and extract the layout of a tiled, single-band image.
    pub fn from_tags(t: &ResolvedTags) -> Result<Self> {
        let width = t.uint(tags::IMAGE_WIDTH).ok_or_else(|| invalid("missing ImageWidth"))? as u32;
        let height = t.uint(tags::IMAGE_LENGTH).ok_or_else(|| invalid("missing ImageLength"))? as u32;

        if !t.contains(tags::TILE_OFFSETS) {
            return Err(invalid("not a tiled TIFF (no TileOffsets)"));
        }
        let tile_width = t.uint(tags::TILE_WIDTH).ok_or_else(|| invalid("missing TileWidth"))? as u32;
        let tile_height = t.uint(tags::TILE_LENGTH).ok_or_else(|| invalid("missing TileLength"))? as u32;
        if tile_width == 0 || tile_height == 0 {
            return Err(invalid("zero tile size"));
        }

        let samples = t.uint(tags::SAMPLES_PER_PIXEL).unwrap_or(1);
        if samples != 1 {
            return Err(invalid(&format!("{samples} samples per pixel, expected 1")));
        }
        let planar = t.uint(tags::PLANAR_CONFIG).unwrap_or(1) as u16;
        if planar != 1 {
            return Err(CloudError::UnsupportedPlanarConfig(planar));
        }

        let tile_offsets = t.uints(tags::TILE_OFFSETS);
        let tile_byte_counts = t.uints(tags::TILE_BYTE_COUNTS);
        if tile_offsets.len() != tile_byte_counts.len() {
            return Err(invalid("TileOffsets and TileByteCounts differ in length"));
        }

        Ok(Self {
            width,
            height,
            tile_width,
            tile_height,
            tile_offsets,
            tile_byte_counts,
            bits_per_sample: t.uint(tags::BITS_PER_SAMPLE).unwrap_or(8) as u16,
            sample_format: t.uint(tags::SAMPLE_FORMAT).unwrap_or(1) as u16,
            compression: t.uint(tags::COMPRESSION).unwrap_or(1) as u16,
            predictor: t.uint(tags::PREDICTOR).unwrap_or(1) as u16,
        })
    }

    pub fn bytes_per_sample(&self) -> usize {
        (self.bits_per_sample as usize + 7) / 8
    }
}

fn invalid(reason: &str) -> CloudError {
    CloudError::InvalidTiff {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Little-endian 12-byte entry with an inline value.
    pub(crate) fn le_entry(tag: u16, field_type: u16, count: u32, value: u32) -> TagEntry {
        TagEntry {
            tag,
            field_type,
            count,
            value_field: value.to_le_bytes(),
        }
    }

    #[test]
    fn test_parse_header_both_orders() {
        let header = parse_header(&[b'I', b'I', 42, 0, 8, 0, 0, 0]).unwrap();
        assert_eq!(header.endian, Endian::Little);
        assert_eq!(header.first_ifd_offset, 8);

        let header = parse_header(&[b'M', b'M', 0, 42, 0, 0, 0, 8]).unwrap();
        assert_eq!(header.endian, Endian::Big);
        assert_eq!(header.first_ifd_offset, 8);
    }

    #[test]
    fn test_parse_header_rejects_bigtiff() {
        let err = parse_header(&[b'I', b'I', 43, 0, 8, 0, 0, 0]).unwrap_err();
        assert!(err.to_string().contains("BigTIFF"));
    }

    #[test]
    fn test_parse_ifd_one_entry() {
        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&256u16.to_le_bytes());
        data.extend_from_slice(&3u16.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&512u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());

        let ifd = parse_ifd(Endian::Little, &data).unwrap();
        assert_eq!(ifd.entries.len(), 1);
        assert_eq!(ifd.next_ifd_offset, 0);

        let entry = ifd.entry(tags::IMAGE_WIDTH).unwrap();
        assert!(entry.is_inline());
        let mut t = ResolvedTags::new(Endian::Little);
        t.insert_inline(entry);
        assert_eq!(t.uint(tags::IMAGE_WIDTH), Some(512));
    }

    #[test]
    fn test_big_endian_inline_short() {
        // SHORT 7 stored big-endian in the first two bytes of the value field
        let entry = TagEntry {
            tag: tags::PREDICTOR,
            field_type: 3,
            count: 1,
            value_field: [0, 2, 0, 0],
        };
        let mut t = ResolvedTags::new(Endian::Big);
        t.insert_inline(&entry);
        assert_eq!(t.uint(tags::PREDICTOR), Some(2));
    }

    #[test]
    fn test_parse_ifd_truncated() {
        let data = [3u8, 0, 0, 0];
        assert!(parse_ifd(Endian::Little, &data).is_err());
    }

    #[test]
    fn test_external_doubles_and_ascii() {
        let mut t = ResolvedTags::new(Endian::Little);
        let scale = TagEntry {
            tag: tags::MODEL_PIXEL_SCALE,
            field_type: 12,
            count: 3,
            value_field: 100u32.to_le_bytes(),
        };
        assert!(!scale.is_inline());
        assert_eq!(scale.value_offset(Endian::Little), 100);
        let bytes: Vec<u8> = [30.0f64, 30.0, 0.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        t.insert(scale, bytes);
        assert_eq!(t.floats(tags::MODEL_PIXEL_SCALE), vec![30.0, 30.0, 0.0]);

        let nodata = TagEntry {
            tag: tags::GDAL_NODATA,
            field_type: 2,
            count: 2,
            value_field: [b'0', 0, 0, 0],
        };
        t.insert_inline(&nodata);
        assert_eq!(t.ascii(tags::GDAL_NODATA).as_deref(), Some("0"));
    }

    #[test]
    fn test_ifd_info_requires_tiles() {
        let mut t = ResolvedTags::new(Endian::Little);
        t.insert_inline(&le_entry(tags::IMAGE_WIDTH, 3, 1, 10));
        t.insert_inline(&le_entry(tags::IMAGE_LENGTH, 3, 1, 10));
        assert!(IfdInfo::from_tags(&t).is_err());

        t.insert_inline(&le_entry(tags::TILE_WIDTH, 3, 1, 16));
        t.insert_inline(&le_entry(tags::TILE_LENGTH, 3, 1, 16));
        t.insert_inline(&le_entry(tags::TILE_OFFSETS, 4, 1, 4096));
        t.insert_inline(&le_entry(tags::TILE_BYTE_COUNTS, 4, 1, 512));
        t.insert_inline(&le_entry(tags::BITS_PER_SAMPLE, 3, 1, 16));
        t.insert_inline(&le_entry(tags::PREDICTOR, 3, 1, 2));

        let info = IfdInfo::from_tags(&t).unwrap();
        assert_eq!((info.width, info.tile_width), (10, 16));
        assert_eq!(info.tile_offsets, vec![4096]);
        assert_eq!(info.bytes_per_sample(), 2);
        assert_eq!(info.predictor, 2);
        assert_eq!(info.compression, 1);
    }
}
