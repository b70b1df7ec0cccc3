use std::fmt;

/// Width of a full memory address in bits.
pub const ADDRESS_BITS: u32 = u64::BITS;

/// Cache geometry as given on the command line.
///
/// - `set_index_bits` (`s`): the cache has `2^s` sets
/// - `associativity` (`E`): lines per set
/// - `block_offset_bits` (`b`): blocks are `2^b` bytes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub set_index_bits: u32,
    pub associativity: usize,
    pub block_offset_bits: u32,
}

impl CacheConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.associativity == 0 {
            return Err(ConfigError::ZeroAssociativity);
        }
        // either bit width at the full address width would leave no room
        // for a representable set count or block size
        let width = u64::from(self.set_index_bits) + u64::from(self.block_offset_bits);
        if width > u64::from(ADDRESS_BITS)
            || self.set_index_bits >= ADDRESS_BITS
            || self.block_offset_bits >= ADDRESS_BITS
        {
            return Err(ConfigError::AddressWidthExceeded {
                set_index_bits: self.set_index_bits,
                block_offset_bits: self.block_offset_bits,
            });
        }
        // the set vector must be constructible on the host: 2^s set
        // headers, byte size within the allocator limit
        let constructible = 1usize
            .checked_shl(self.set_index_bits)
            .and_then(|sets| sets.checked_mul(std::mem::size_of::<CacheSet>()))
            .is_some_and(|bytes| bytes <= isize::MAX as usize);
        if !constructible {
            return Err(ConfigError::SetCountOverflow {
                set_index_bits: self.set_index_bits,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroAssociativity,
    AddressWidthExceeded {
        set_index_bits: u32,
        block_offset_bits: u32,
    },
    SetCountOverflow {
        set_index_bits: u32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroAssociativity => {
                f.write_str("associativity (-E) must be at least 1")
            }
            ConfigError::AddressWidthExceeded {
                set_index_bits,
                block_offset_bits,
            } => f.write_fmt(format_args!(
                "{set_index_bits} set bits + {block_offset_bits} block bits exceed the {ADDRESS_BITS}-bit address width"
            )),
            ConfigError::SetCountOverflow { set_index_bits } => f.write_fmt(format_args!(
                "2^{set_index_bits} sets cannot be allocated on this platform"
            )),
        }
    }
}

impl std::error::Error for ConfigError {}

/// The two access operations a trace record can request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AccessKind {
    Load,
    Store,
}

/// What happened on a single access.
///
/// `hit` and `miss` are mutually exclusive and exactly one is set.
/// `eviction` implies `miss`, `dirty_eviction` implies `eviction`.
/// `dirty_increase` can accompany either a hit (store to a clean line)
/// or a miss (store installing a line).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct AccessOutcome {
    pub hit: bool,
    pub miss: bool,
    pub eviction: bool,
    pub dirty_increase: bool,
    pub dirty_eviction: bool,
}

/// Bookkeeping for one occupied cache slot. An empty slot is `None` in its
/// set, so tag/dirty/recency only exist while the line is valid.
#[derive(Debug, Copy, Clone)]
struct CacheLine {
    tag: u64,
    dirty: bool,
    last_used: u64,
}

#[derive(Debug, Clone)]
struct CacheSet {
    lines: Vec<Option<CacheLine>>,
}

impl CacheSet {
    fn new(associativity: usize) -> Self {
        Self {
            lines: vec![None; associativity],
        }
    }

    fn access(&mut self, tag: u64, kind: AccessKind, sequence: u64) -> AccessOutcome {
        let mut outcome = AccessOutcome::default();

        // linear search for a valid line with a matching tag
        if let Some(line) = self
            .lines
            .iter_mut()
            .flatten()
            .find(|line| line.tag == tag)
        {
            line.last_used = sequence;
            outcome.hit = true;
            // a store re-dirtying an already dirty line does not count again
            if kind == AccessKind::Store && !line.dirty {
                line.dirty = true;
                outcome.dirty_increase = true;
            }
            return outcome;
        }

        outcome.miss = true;

        // a free slot always wins over an eviction candidate
        let slot = match self.lines.iter().position(Option::is_none) {
            Some(free) => free,
            None => {
                let mut victim = 0;
                let mut oldest = u64::MAX;
                for (i, line) in self.lines.iter().enumerate() {
                    if let Some(line) = line {
                        // strict '<' keeps the first line on equal recency
                        if line.last_used < oldest {
                            oldest = line.last_used;
                            victim = i;
                        }
                    }
                }

                outcome.eviction = true;
                if self.lines[victim].is_some_and(|line| line.dirty) {
                    outcome.dirty_eviction = true;
                }
                victim
            }
        };

        let dirty = kind == AccessKind::Store;
        if dirty {
            outcome.dirty_increase = true;
        }
        self.lines[slot] = Some(CacheLine {
            tag,
            dirty,
            last_used: sequence,
        });

        outcome
    }
}

/// A set-associative write-back cache that tracks tags, dirty bits and
/// recency but no data bytes.
#[derive(Debug)]
pub struct Cache {
    set_index_bits: u32,
    block_offset_bits: u32,
    associativity: usize,
    set_index_mask: u64,
    sets: Vec<CacheSet>,
}

impl Cache {
    pub fn new(config: CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let set_index_mask = if config.set_index_bits == 0 {
            0
        } else {
            u64::MAX >> (ADDRESS_BITS - config.set_index_bits)
        };
        let set_count = 1usize << config.set_index_bits;

        Ok(Self {
            set_index_bits: config.set_index_bits,
            block_offset_bits: config.block_offset_bits,
            associativity: config.associativity,
            set_index_mask,
            sets: (0..set_count)
                .map(|_| CacheSet::new(config.associativity))
                .collect(),
        })
    }

    /// Block size in bytes.
    pub fn block_size(&self) -> u64 {
        1 << self.block_offset_bits
    }

    pub fn format_info(&self) -> String {
        [
            "Cache:".to_string(),
            format!(
                "\tTotal Size: {}B",
                self.block_size() * self.sets.len() as u64 * self.associativity as u64
            ),
            format!("\tSets: {}", self.sets.len()),
            format!("\tWays: {}", self.associativity),
            format!("\tBlock-Size: {}B", self.block_size()),
            format!(
                "\t| {} tag bits | {} set bits | {} offset bits |",
                ADDRESS_BITS - (self.set_index_bits + self.block_offset_bits),
                self.set_index_bits,
                self.block_offset_bits
            ),
        ]
        .join("\n")
    }

    /// Splits an address into (tag, set index). With zero set bits the mask
    /// is 0 and every address lands in set 0; shifts by the full address
    /// width are routed through `checked_shr` so the split stays total.
    fn decode(&self, address: u64) -> (u64, usize) {
        let set_index = address
            .checked_shr(self.block_offset_bits)
            .map_or(0, |block| block & self.set_index_mask);
        let tag = address
            .checked_shr(self.set_index_bits + self.block_offset_bits)
            .unwrap_or(0);
        (tag, set_index as usize)
    }

    /// Runs one access against the cache. `sequence` is the logical clock
    /// used for LRU recency: one strictly increasing number per trace
    /// record, starting at 0.
    pub fn access(&mut self, address: u64, kind: AccessKind, sequence: u64) -> AccessOutcome {
        let (tag, set_index) = self.decode(address);
        self.sets[set_index].access(tag, kind, sequence)
    }
}
