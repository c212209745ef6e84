//! Byte layout of the accessibility text marker payload.
//!
//! The accessibility service packs a text position into an opaque marker
//! object whose payload is the WebCore `TextMarkerData` struct. The layout is
//! owned by the OS vendor; the offsets below are the C layout of that struct on
//! 64-bit targets:
//!
//! | field                   | offset | size |
//! |-------------------------|--------|------|
//! | `ax_id`                 | 0      | 4    |
//! | (padding)               | 4      | 4    |
//! | `node`                  | 8      | 8    |
//! | `offset`                | 16     | 4    |
//! | `character_start_index` | 20     | 4    |
//! | `character_offset`      | 24     | 4    |
//! | `ignored`               | 28     | 1    |
//! | (padding)               | 29     | 3    |
//! | `affinity`              | 32     | 4    |
//! | (padding)               | 36     | 4    |
//!
//! Values are stored in native byte order. Padding is written as zero and
//! ignored when reading.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// Size in bytes of one marker payload.
pub const RECORD_SIZE: usize = 40;

/// Field offsets inside the marker payload.
pub mod layout {
    use super::RECORD_SIZE;

    pub const AX_ID: usize = 0;
    pub const NODE: usize = 8;
    pub const OFFSET: usize = 16;
    pub const CHARACTER_START_INDEX: usize = 20;
    pub const CHARACTER_OFFSET: usize = 24;
    pub const IGNORED: usize = 28;
    pub const AFFINITY: usize = 32;

    /// Describes one field of the payload for tooling output.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FieldLayout {
        pub name: &'static str,
        pub offset: usize,
        pub size: usize,
    }

    const FIELDS: [FieldLayout; 7] = [
        FieldLayout { name: "ax_id", offset: AX_ID, size: 4 },
        FieldLayout { name: "node", offset: NODE, size: 8 },
        FieldLayout { name: "offset", offset: OFFSET, size: 4 },
        FieldLayout { name: "character_start_index", offset: CHARACTER_START_INDEX, size: 4 },
        FieldLayout { name: "character_offset", offset: CHARACTER_OFFSET, size: 4 },
        FieldLayout { name: "ignored", offset: IGNORED, size: 1 },
        FieldLayout { name: "affinity", offset: AFFINITY, size: 4 },
    ];

    /// Fields in declaration order.
    pub fn fields() -> &'static [FieldLayout] {
        &FIELDS
    }

    /// Number of padding bytes in the payload.
    pub fn padding() -> usize {
        RECORD_SIZE - FIELDS.iter().map(|field| field.size).sum::<usize>()
    }
}

/// Identifier of an accessibility object in the process-wide ID table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AxId(pub u32);

impl Display for AxId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to the framework-internal node. Never dereferenced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeHandle(pub u64);

impl NodeHandle {
    pub const NULL: NodeHandle = NodeHandle(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl Display for NodeHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Which side of an ambiguous caret position a marker binds to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum Affinity {
    Upstream = 0,
    #[default]
    Downstream = 1,
}

impl Affinity {
    pub fn as_str(self) -> &'static str {
        match self {
            Affinity::Upstream => "upstream",
            Affinity::Downstream => "downstream",
        }
    }
}

impl TryFrom<u32> for Affinity {
    type Error = RecordError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Affinity::Upstream),
            1 => Ok(Affinity::Downstream),
            other => Err(RecordError::InvalidAffinity(other)),
        }
    }
}

impl std::str::FromStr for Affinity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "upstream" | "0" => Ok(Affinity::Upstream),
            "downstream" | "1" => Ok(Affinity::Downstream),
            other => Err(format!("unknown affinity '{other}' (expected upstream or downstream)")),
        }
    }
}

impl Display for Affinity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded marker payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextMarkerRecord {
    pub ax_id: AxId,
    pub node: NodeHandle,
    /// Character offset within `node`.
    pub offset: i32,
    pub character_start_index: i32,
    pub character_offset: i32,
    pub ignored: bool,
    pub affinity: Affinity,
}

impl TextMarkerRecord {
    pub fn new(ax_id: AxId, node: NodeHandle, offset: i32) -> Self {
        Self { ax_id, node, offset, ..Self::default() }
    }

    pub fn with_character_start_index(mut self, index: i32) -> Self {
        self.character_start_index = index;
        self
    }

    pub fn with_character_offset(mut self, offset: i32) -> Self {
        self.character_offset = offset;
        self
    }

    pub fn with_ignored(mut self, ignored: bool) -> Self {
        self.ignored = ignored;
        self
    }

    pub fn with_affinity(mut self, affinity: Affinity) -> Self {
        self.affinity = affinity;
        self
    }

    /// Packs the record into the payload layout. Padding bytes are zero.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        put(&mut out, layout::AX_ID, &self.ax_id.0.to_ne_bytes());
        put(&mut out, layout::NODE, &self.node.0.to_ne_bytes());
        put(&mut out, layout::OFFSET, &self.offset.to_ne_bytes());
        put(&mut out, layout::CHARACTER_START_INDEX, &self.character_start_index.to_ne_bytes());
        put(&mut out, layout::CHARACTER_OFFSET, &self.character_offset.to_ne_bytes());
        out[layout::IGNORED] = u8::from(self.ignored);
        put(&mut out, layout::AFFINITY, &(self.affinity as u32).to_ne_bytes());
        out
    }

    /// Parses a payload. The slice must be exactly [`RECORD_SIZE`] bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        let bytes: &[u8; RECORD_SIZE] = bytes
            .try_into()
            .map_err(|_| RecordError::Length { expected: RECORD_SIZE, actual: bytes.len() })?;

        let ignored = match bytes[layout::IGNORED] {
            0 => false,
            1 => true,
            value => return Err(RecordError::InvalidBool { field: "ignored", value }),
        };
        let affinity = Affinity::try_from(u32::from_ne_bytes(take(bytes, layout::AFFINITY)))?;

        Ok(Self {
            ax_id: AxId(u32::from_ne_bytes(take(bytes, layout::AX_ID))),
            node: NodeHandle(u64::from_ne_bytes(take(bytes, layout::NODE))),
            offset: i32::from_ne_bytes(take(bytes, layout::OFFSET)),
            character_start_index: i32::from_ne_bytes(take(bytes, layout::CHARACTER_START_INDEX)),
            character_offset: i32::from_ne_bytes(take(bytes, layout::CHARACTER_OFFSET)),
            ignored,
            affinity,
        })
    }
}

impl Display for TextMarkerRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "axid={} node={} offset={} start={} char_offset={} ignored={} affinity={}",
            self.ax_id,
            self.node,
            self.offset,
            self.character_start_index,
            self.character_offset,
            self.ignored,
            self.affinity
        )
    }
}

fn put(out: &mut [u8; RECORD_SIZE], at: usize, value: &[u8]) {
    out[at..at + value.len()].copy_from_slice(value);
}

fn take<const N: usize>(bytes: &[u8; RECORD_SIZE], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[at..at + N]);
    out
}
