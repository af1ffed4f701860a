//! Compression and decompression parameters
//!
//! Every tunable is a variant of [`CompressParameter`] or
//! [`DecompressParameter`] carrying its own inclusive bounds. A
//! [`CompressionParams`] starts from a level preset; explicit overrides win
//! per field no matter the order in which they were set. Everything is
//! validated when a session is constructed, never mid-stream.

use crate::common::BLOCK_SIZE_MAX;
use crate::{CodecError, Result};
use std::collections::BTreeMap;

/// Lowest compression level
pub const MIN_LEVEL: i32 = 1;

/// Highest compression level
pub const MAX_LEVEL: i32 = 22;

/// Level used when none (or 0) is given
pub const DEFAULT_LEVEL: i32 = 3;

/// Smallest window log
pub const WINDOW_LOG_MIN: u32 = 10;

/// Largest window log a compressor may use
pub const WINDOW_LOG_MAX: u32 = 27;

/// Default decompressor window limit
pub const WINDOW_LOG_MAX_DEFAULT: u32 = 27;

/// Inclusive (min, max) bounds of the compression level
pub fn compress_level_bounds() -> (i32, i32) {
    (MIN_LEVEL, MAX_LEVEL)
}

/// Match finding strategies, from fastest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strategy {
    /// Single hash table, one probe per position
    Fast = 1,
    /// Short and long hash tables
    DFast = 2,
    /// Hash chain, first best match taken
    Greedy = 3,
    /// Hash chain with one step of lazy evaluation
    Lazy = 4,
    /// Hash chain with two steps of lazy evaluation
    Lazy2 = 5,
    /// Deeper chain search with two lazy steps
    BtLazy2 = 6,
    /// Price-based optimal parse
    BtOpt = 7,
    /// Optimal parse with deeper search
    BtUltra = 8,
    /// Optimal parse seeded by a statistics pass
    BtUltra2 = 9,
}

impl Strategy {
    /// All strategies in order
    pub const ALL: [Strategy; 9] = [
        Strategy::Fast,
        Strategy::DFast,
        Strategy::Greedy,
        Strategy::Lazy,
        Strategy::Lazy2,
        Strategy::BtLazy2,
        Strategy::BtOpt,
        Strategy::BtUltra,
        Strategy::BtUltra2,
    ];

    /// Create a Strategy from its numeric id
    pub fn from_i32(value: i32) -> Result<Self> {
        Strategy::ALL
            .iter()
            .copied()
            .find(|s| *s as i32 == value)
            .ok_or(CodecError::ParameterOutOfBounds {
                parameter: "strategy",
                value: value as i64,
                min: 1,
                max: 9,
            })
    }

    /// Number of lazy evaluation steps
    pub(crate) fn lazy_depth(self) -> usize {
        match self {
            Strategy::Lazy => 1,
            Strategy::Lazy2 | Strategy::BtLazy2 => 2,
            _ => 0,
        }
    }

    /// True for the strategies that need a chain table
    pub(crate) fn uses_chain(self) -> bool {
        self >= Strategy::Greedy
    }

    /// True for the optimal-parse strategies
    pub(crate) fn is_optimal(self) -> bool {
        self >= Strategy::BtOpt
    }
}

/// Compression parameter identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CompressParameter {
    /// Level preset, 0 selects the default
    CompressionLevel,
    /// Log2 of the window size
    WindowLog,
    /// Log2 of the hash table size
    HashLog,
    /// Log2 of the chain table size
    ChainLog,
    /// Log2 of the number of chain searches
    SearchLog,
    /// Minimum match length
    MinMatch,
    /// Strategy dependent: skip acceleration for `Fast`, "good enough" length otherwise
    TargetLength,
    /// Match finding strategy id
    Strategy,
    /// Long distance matcher on/off
    EnableLongDistanceMatching,
    /// Log2 of the long distance hash table size
    LdmHashLog,
    /// Minimum long distance match length
    LdmMinMatch,
    /// Log2 of the long distance bucket size
    LdmBucketSizeLog,
    /// Log2 of the long distance insertion rate
    LdmHashRateLog,
    /// Write the content size into the frame header when known
    ContentSizeFlag,
    /// Append a content checksum to each frame
    ChecksumFlag,
    /// Write the dictionary id into the frame header
    DictIdFlag,
}

impl CompressParameter {
    /// Inclusive lower and upper bounds
    pub fn bounds(self) -> (i32, i32) {
        match self {
            CompressParameter::CompressionLevel => (0, MAX_LEVEL),
            CompressParameter::WindowLog => (WINDOW_LOG_MIN as i32, WINDOW_LOG_MAX as i32),
            CompressParameter::HashLog => (6, 26),
            CompressParameter::ChainLog => (6, 27),
            CompressParameter::SearchLog => (1, 20),
            CompressParameter::MinMatch => (3, 7),
            CompressParameter::TargetLength => (0, BLOCK_SIZE_MAX as i32),
            CompressParameter::Strategy => (1, 9),
            CompressParameter::LdmHashLog => (6, 26),
            CompressParameter::LdmMinMatch => (4, 4096),
            CompressParameter::LdmBucketSizeLog => (1, 8),
            CompressParameter::LdmHashRateLog => (0, 25),
            CompressParameter::EnableLongDistanceMatching
            | CompressParameter::ContentSizeFlag
            | CompressParameter::ChecksumFlag
            | CompressParameter::DictIdFlag => (0, 1),
        }
    }

    /// Parameter name used in error messages
    pub fn name(self) -> &'static str {
        match self {
            CompressParameter::CompressionLevel => "compression_level",
            CompressParameter::WindowLog => "window_log",
            CompressParameter::HashLog => "hash_log",
            CompressParameter::ChainLog => "chain_log",
            CompressParameter::SearchLog => "search_log",
            CompressParameter::MinMatch => "min_match",
            CompressParameter::TargetLength => "target_length",
            CompressParameter::Strategy => "strategy",
            CompressParameter::EnableLongDistanceMatching => "enable_long_distance_matching",
            CompressParameter::LdmHashLog => "ldm_hash_log",
            CompressParameter::LdmMinMatch => "ldm_min_match",
            CompressParameter::LdmBucketSizeLog => "ldm_bucket_size_log",
            CompressParameter::LdmHashRateLog => "ldm_hash_rate_log",
            CompressParameter::ContentSizeFlag => "content_size_flag",
            CompressParameter::ChecksumFlag => "checksum_flag",
            CompressParameter::DictIdFlag => "dict_id_flag",
        }
    }

    fn check(self, value: i64) -> Result<i32> {
        let (min, max) = self.bounds();
        if value < min as i64 || value > max as i64 {
            return Err(CodecError::ParameterOutOfBounds {
                parameter: self.name(),
                value,
                min,
                max,
            });
        }
        Ok(value as i32)
    }
}

/// Decompression parameter identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DecompressParameter {
    /// Largest window log a frame may declare
    WindowLogMax,
}

impl DecompressParameter {
    /// Inclusive lower and upper bounds
    pub fn bounds(self) -> (i32, i32) {
        match self {
            DecompressParameter::WindowLogMax => (WINDOW_LOG_MIN as i32, 31),
        }
    }
}

/// What a compressor call should do with buffered input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndDirective {
    /// Buffer input; emit whole blocks only
    Continue,
    /// Emit everything buffered without closing the frame
    Flush,
    /// Emit everything and close the frame
    End,
}

/// Level preset row
#[derive(Debug, Clone, Copy)]
struct LevelPreset {
    window_log: u32,
    hash_log: u32,
    chain_log: u32,
    search_log: u32,
    min_match: u32,
    target_length: u32,
    strategy: Strategy,
    block_log: u32,
}

const fn preset(
    window_log: u32,
    hash_log: u32,
    chain_log: u32,
    search_log: u32,
    min_match: u32,
    target_length: u32,
    strategy: Strategy,
    block_log: u32,
) -> LevelPreset {
    LevelPreset {
        window_log,
        hash_log,
        chain_log,
        search_log,
        min_match,
        target_length,
        strategy,
        block_log,
    }
}

/// Presets for levels 1..=22
const LEVEL_PRESETS: [LevelPreset; 22] = [
    preset(19, 14, 12, 1, 6, 1, Strategy::Fast, 16),
    preset(19, 15, 13, 1, 6, 0, Strategy::Fast, 16),
    preset(20, 16, 15, 1, 5, 0, Strategy::DFast, 17),
    preset(20, 17, 16, 1, 5, 0, Strategy::DFast, 17),
    preset(21, 17, 17, 3, 5, 2, Strategy::Greedy, 17),
    preset(21, 17, 17, 3, 5, 4, Strategy::Lazy, 17),
    preset(21, 18, 18, 4, 5, 8, Strategy::Lazy, 17),
    preset(21, 18, 18, 4, 5, 16, Strategy::Lazy2, 17),
    preset(22, 18, 19, 4, 5, 16, Strategy::Lazy2, 17),
    preset(22, 19, 19, 5, 5, 16, Strategy::Lazy2, 17),
    preset(22, 19, 19, 6, 5, 16, Strategy::Lazy2, 17),
    preset(22, 19, 20, 6, 5, 32, Strategy::Lazy2, 17),
    preset(22, 19, 20, 4, 5, 32, Strategy::BtLazy2, 17),
    preset(22, 20, 20, 5, 5, 32, Strategy::BtLazy2, 17),
    preset(22, 20, 20, 6, 5, 32, Strategy::BtLazy2, 17),
    preset(22, 20, 20, 5, 5, 48, Strategy::BtOpt, 17),
    preset(23, 20, 20, 5, 4, 64, Strategy::BtOpt, 17),
    preset(23, 20, 20, 6, 3, 64, Strategy::BtUltra, 17),
    preset(23, 20, 20, 7, 3, 256, Strategy::BtUltra2, 17),
    preset(24, 20, 20, 7, 3, 256, Strategy::BtUltra2, 17),
    preset(25, 20, 20, 7, 3, 512, Strategy::BtUltra2, 17),
    preset(26, 20, 20, 8, 3, 999, Strategy::BtUltra2, 17),
];

/// User-facing compression configuration: a level plus per-field overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionParams {
    level: i32,
    overrides: BTreeMap<CompressParameter, i32>,
}

impl Default for CompressionParams {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            overrides: BTreeMap::new(),
        }
    }
}

impl CompressionParams {
    /// Parameters of a level preset (0 selects the default level)
    pub fn from_level(level: i32) -> Result<Self> {
        let mut params = Self::default();
        params.set(CompressParameter::CompressionLevel, level)?;
        Ok(params)
    }

    /// Set one parameter, checking its bounds immediately
    pub fn set(&mut self, param: CompressParameter, value: i32) -> Result<&mut Self> {
        let value = param.check(value as i64)?;
        match param {
            CompressParameter::CompressionLevel => {
                self.level = if value == 0 { DEFAULT_LEVEL } else { value };
            }
            other => {
                self.overrides.insert(other, value);
            }
        }
        Ok(self)
    }

    /// Builder form of [`set`](Self::set)
    pub fn with(mut self, param: CompressParameter, value: i32) -> Result<Self> {
        self.set(param, value)?;
        Ok(self)
    }

    /// Builder shortcut for the strategy
    pub fn with_strategy(self, strategy: Strategy) -> Result<Self> {
        self.with(CompressParameter::Strategy, strategy as i32)
    }

    /// Builder shortcut for the checksum flag
    pub fn with_checksum(self, enabled: bool) -> Result<Self> {
        self.with(CompressParameter::ChecksumFlag, enabled as i32)
    }

    /// Builder shortcut for the window log
    pub fn with_window_log(self, window_log: u32) -> Result<Self> {
        self.with(CompressParameter::WindowLog, window_log as i32)
    }

    /// Level preset in use
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Explicit override for `param`, if any
    pub fn get(&self, param: CompressParameter) -> Option<i32> {
        if param == CompressParameter::CompressionLevel {
            return Some(self.level);
        }
        self.overrides.get(&param).copied()
    }

    /// Apply overrides on top of the level preset and validate the result
    pub(crate) fn resolve(&self) -> Result<ResolvedParams> {
        let level = CompressParameter::CompressionLevel.check(self.level as i64)?;
        let level = if level == 0 { DEFAULT_LEVEL } else { level };
        let row = LEVEL_PRESETS[(level - 1) as usize];

        for (&param, &value) in &self.overrides {
            param.check(value as i64)?;
        }
        let pick = |param: CompressParameter, default: u32| -> u32 {
            self.overrides
                .get(&param)
                .map_or(default, |&v| v as u32)
        };
        let flag = |param: CompressParameter, default: bool| -> bool {
            self.overrides.get(&param).map_or(default, |&v| v != 0)
        };

        let window_log = pick(CompressParameter::WindowLog, row.window_log);
        let mut hash_log = pick(CompressParameter::HashLog, row.hash_log);
        let mut chain_log = pick(CompressParameter::ChainLog, row.chain_log);

        for (param, value) in [
            (CompressParameter::HashLog, &mut hash_log),
            (CompressParameter::ChainLog, &mut chain_log),
        ] {
            if *value > window_log + 1 {
                if self.overrides.contains_key(&param) {
                    return Err(CodecError::config(format!(
                        "{} = {} conflicts with window_log = {} (at most window_log + 1)",
                        param.name(),
                        value,
                        window_log
                    )));
                }
                *value = window_log + 1;
            }
        }

        let strategy = match self.overrides.get(&CompressParameter::Strategy) {
            Some(&id) => Strategy::from_i32(id)?,
            None => row.strategy,
        };

        let ldm_hash_log = pick(
            CompressParameter::LdmHashLog,
            window_log.saturating_sub(7).max(6),
        );
        let ldm_hash_rate_log = pick(
            CompressParameter::LdmHashRateLog,
            window_log.saturating_sub(ldm_hash_log),
        );

        Ok(ResolvedParams {
            level,
            window_log,
            hash_log,
            chain_log,
            search_log: pick(CompressParameter::SearchLog, row.search_log),
            min_match: pick(CompressParameter::MinMatch, row.min_match),
            target_length: pick(CompressParameter::TargetLength, row.target_length),
            strategy,
            block_log: row.block_log.min(window_log),
            ldm: flag(CompressParameter::EnableLongDistanceMatching, false),
            ldm_hash_log,
            ldm_min_match: pick(CompressParameter::LdmMinMatch, 64),
            ldm_bucket_size_log: pick(CompressParameter::LdmBucketSizeLog, 3),
            ldm_hash_rate_log,
            content_size_flag: flag(CompressParameter::ContentSizeFlag, true),
            checksum_flag: flag(CompressParameter::ChecksumFlag, true),
            dict_id_flag: flag(CompressParameter::DictIdFlag, true),
        })
    }
}

/// Fully resolved compression parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedParams {
    pub level: i32,
    pub window_log: u32,
    pub hash_log: u32,
    pub chain_log: u32,
    pub search_log: u32,
    pub min_match: u32,
    pub target_length: u32,
    pub strategy: Strategy,
    pub block_log: u32,
    pub ldm: bool,
    pub ldm_hash_log: u32,
    pub ldm_min_match: u32,
    pub ldm_bucket_size_log: u32,
    pub ldm_hash_rate_log: u32,
    pub content_size_flag: bool,
    pub checksum_flag: bool,
    pub dict_id_flag: bool,
}

impl ResolvedParams {
    /// Shrink the tables to what a source of `src_len` bytes (plus a
    /// dictionary of `dict_len` bytes) can use
    pub fn adjust_for_source(&mut self, src_len: u64, dict_len: usize) {
        let total = src_len.saturating_add(dict_len as u64).max(1);
        let needed = (64 - (total - 1).leading_zeros()).max(WINDOW_LOG_MIN);
        if needed < self.window_log {
            self.window_log = needed;
            self.hash_log = self.hash_log.min(needed + 1);
            self.chain_log = self.chain_log.min(needed + 1);
            self.block_log = self.block_log.min(needed);
            if self.ldm_hash_log > needed {
                self.ldm_hash_log = needed.max(6);
            }
        }
    }

    /// Window size in bytes
    pub fn window_size(&self) -> usize {
        1usize << self.window_log
    }

    /// Target block size in bytes
    pub fn block_size(&self) -> usize {
        (1usize << self.block_log).min(BLOCK_SIZE_MAX)
    }
}

/// Decompression configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecompressionParams {
    window_log_max: u32,
    single_frame: bool,
}

impl Default for DecompressionParams {
    fn default() -> Self {
        Self {
            window_log_max: WINDOW_LOG_MAX_DEFAULT,
            single_frame: false,
        }
    }
}

impl DecompressionParams {
    /// Set one parameter, checking its bounds
    pub fn set(&mut self, param: DecompressParameter, value: i32) -> Result<&mut Self> {
        let (min, max) = param.bounds();
        if value < min || value > max {
            return Err(CodecError::ParameterOutOfBounds {
                parameter: "window_log_max",
                value: value as i64,
                min,
                max,
            });
        }
        match param {
            DecompressParameter::WindowLogMax => self.window_log_max = value as u32,
        }
        Ok(self)
    }

    /// Builder shortcut for the window limit
    pub fn with_window_log_max(mut self, value: u32) -> Result<Self> {
        self.set(DecompressParameter::WindowLogMax, value as i32)?;
        Ok(self)
    }

    /// Stop after the first frame instead of reading concatenated frames
    pub fn single_frame(mut self, enabled: bool) -> Self {
        self.single_frame = enabled;
        self
    }

    /// Largest accepted window log
    pub fn window_log_max(&self) -> u32 {
        self.window_log_max
    }

    /// True in single-frame mode
    pub fn is_single_frame(&self) -> bool {
        self.single_frame
    }
}
