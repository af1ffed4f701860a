//! Dictionaries
//!
//! A dictionary primes the match window of both engines with content that
//! recurs across small inputs, and may carry entropy tables that compressed
//! blocks can reference instead of describing their own.
//!
//! Serialized form:
//!
//! ```text
//! magic:u32le id:u32le flags:u8 [literals ll ml of descriptions] content
//! ```
//!
//! Bit 0 of `flags` marks the presence of the four table descriptions.
//! Data that does not start with the magic is taken as raw content.

mod trainer;

pub use trainer::{train_dictionary, train_dictionary_for_level};

use crate::bitio::ByteCursor;
use crate::checksum::hash64;
use crate::common::DICT_MAGIC;
use crate::entropy::codes::VALUE_CODE_COUNT;
use crate::entropy::{Code, TableDescription};
use crate::{CodecError, Result};
use std::fmt;

const FLAG_TABLES: u8 = 0x01;

/// Entropy tables shared through a dictionary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntropyTables {
    /// Literal byte code
    pub literals: Code,
    /// Literal-length code
    pub literal_lengths: Code,
    /// Match-length code
    pub match_lengths: Code,
    /// Offset code
    pub offsets: Code,
}

impl EntropyTables {
    fn write(&self, out: &mut Vec<u8>) {
        self.literals.write_description(out);
        self.literal_lengths.write_description(out);
        self.match_lengths.write_description(out);
        self.offsets.write_description(out);
    }

    fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let mut inline = |alphabet: usize| -> Result<Code> {
            match Code::read_description(cursor, alphabet)? {
                TableDescription::Inline(code) => Ok(code),
                TableDescription::Dictionary => Err(CodecError::corrupt(
                    "dictionary table refers to another dictionary",
                )),
            }
        };
        Ok(Self {
            literals: inline(256)?,
            literal_lengths: inline(VALUE_CODE_COUNT)?,
            match_lengths: inline(VALUE_CODE_COUNT)?,
            offsets: inline(VALUE_CODE_COUNT)?,
        })
    }
}

/// Immutable dictionary, shared between sessions as `Arc<Dictionary>`
#[derive(Clone, PartialEq, Eq)]
pub struct Dictionary {
    id: u32,
    content: Vec<u8>,
    tables: Option<EntropyTables>,
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dictionary")
            .field("id", &format_args!("{:#010x}", self.id))
            .field("content_len", &self.content.len())
            .field("has_tables", &self.tables.is_some())
            .finish()
    }
}

/// Dictionary id of `content`; never zero
pub fn dictionary_id(content: &[u8]) -> u32 {
    (hash64(content) as u32 & 0x7FFF_FFFF) | 0x8000
}

impl Dictionary {
    /// Dictionary made of raw content only
    pub fn from_content(content: Vec<u8>) -> Result<Self> {
        Self::with_tables(content, None)
    }

    pub(crate) fn with_tables(content: Vec<u8>, tables: Option<EntropyTables>) -> Result<Self> {
        if content.is_empty() {
            return Err(CodecError::config("dictionary content is empty"));
        }
        Ok(Self {
            id: dictionary_id(&content),
            content,
            tables,
        })
    }

    /// Dictionary id written into frames
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Content primed into the window
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Entropy tables, if the dictionary was trained with them
    pub fn tables(&self) -> Option<&EntropyTables> {
        self.tables.as_ref()
    }

    /// Serialize the dictionary
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.content.len() + 64);
        out.extend_from_slice(&DICT_MAGIC.to_le_bytes());
        out.extend_from_slice(&self.id.to_le_bytes());
        match &self.tables {
            Some(tables) => {
                out.push(FLAG_TABLES);
                tables.write(&mut out);
            }
            None => out.push(0),
        }
        out.extend_from_slice(&self.content);
        out
    }

    /// Load a serialized dictionary, or raw content without the magic
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 4 || data[..4] != DICT_MAGIC.to_le_bytes() {
            log::debug!("dictionary without magic, using {} raw bytes", data.len());
            return Self::from_content(data.to_vec());
        }

        let mut cursor = ByteCursor::new(&data[4..]);
        let id = cursor.read_u32_le()?;
        let flags = cursor.read_u8()?;
        if flags & !FLAG_TABLES != 0 {
            return Err(CodecError::corrupt(format!(
                "reserved dictionary flags set: {flags:#04x}"
            )));
        }
        let tables = if flags & FLAG_TABLES != 0 {
            Some(EntropyTables::read(&mut cursor)?)
        } else {
            None
        };
        let content = cursor.read_slice(cursor.remaining())?.to_vec();
        let dictionary = Self::with_tables(content, tables)?;
        if dictionary.id != id {
            return Err(CodecError::DictionaryMismatch {
                expected: id,
                actual: dictionary.id,
            });
        }
        Ok(dictionary)
    }
}
