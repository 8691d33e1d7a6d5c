#![allow(non_camel_case_types)]

pub use SpecId::*;

/// Specification IDs and their activation block or timestamp.
///
/// Information was obtained from the [Ethereum Execution Specifications](https://github.com/ethereum/execution-specs)
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, enumn::N)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpecId {
    FRONTIER = 0,         // Frontier               0
    FRONTIER_THAWING = 1, // Frontier Thawing       200000
    HOMESTEAD = 2,        // Homestead              1150000
    DAO_FORK = 3,         // DAO Fork               1920000
    TANGERINE = 4,        // Tangerine Whistle      2463000
    SPURIOUS_DRAGON = 5,  // Spurious Dragon        2675000
    BYZANTIUM = 6,        // Byzantium              4370000
    CONSTANTINOPLE = 7,   // Constantinople         7280000 is overwritten with PETERSBURG
    PETERSBURG = 8,       // Petersburg             7280000
    ISTANBUL = 9,         // Istanbul	            9069000
    MUIR_GLACIER = 10,    // Muir Glacier           9200000
    BERLIN = 11,          // Berlin	                12244000
    LONDON = 12,          // London	                12965000
    ARROW_GLACIER = 13,   // Arrow Glacier          13773000
    GRAY_GLACIER = 14,    // Gray Glacier           15050000
    MERGE = 15,           // Paris/Merge            15537394 (TTD: 58750000000000000000000)
    SHANGHAI = 16,        // Shanghai               17034870 (Timestamp: 1681338455)
    CANCUN = 17,          // Cancun                 19426587 (Timestamp: 1710338135)
    #[default]
    LATEST = u8::MAX,
}

impl SpecId {
    /// Revision that introduces the EOF container format.
    pub const EOF_INTRODUCED: SpecId = SpecId::CANCUN;

    /// Returns the `SpecId` for the given `u8`.
    #[inline]
    pub fn try_from_u8(spec_id: u8) -> Option<Self> {
        Self::n(spec_id)
    }

    /// Returns `true` if the given specification ID is enabled in this spec.
    #[inline]
    pub const fn is_enabled_in(self, other: Self) -> bool {
        Self::enabled(self, other)
    }

    /// Returns `true` if the given specification ID is enabled in this spec.
    #[inline]
    pub const fn enabled(our: SpecId, other: SpecId) -> bool {
        our as u8 >= other as u8
    }
}

/// String identifiers for hardforks.
pub mod id {
    pub const FRONTIER: &str = "Frontier";
    pub const FRONTIER_THAWING: &str = "Frontier Thawing";
    pub const HOMESTEAD: &str = "Homestead";
    pub const DAO_FORK: &str = "DAO Fork";
    pub const TANGERINE: &str = "Tangerine";
    pub const SPURIOUS_DRAGON: &str = "Spurious";
    pub const BYZANTIUM: &str = "Byzantium";
    pub const CONSTANTINOPLE: &str = "Constantinople";
    pub const PETERSBURG: &str = "Petersburg";
    pub const ISTANBUL: &str = "Istanbul";
    pub const MUIR_GLACIER: &str = "MuirGlacier";
    pub const BERLIN: &str = "Berlin";
    pub const LONDON: &str = "London";
    pub const ARROW_GLACIER: &str = "Arrow Glacier";
    pub const GRAY_GLACIER: &str = "Gray Glacier";
    pub const MERGE: &str = "Merge";
    pub const SHANGHAI: &str = "Shanghai";
    pub const CANCUN: &str = "Cancun";
    pub const LATEST: &str = "Latest";
}

impl From<&str> for SpecId {
    fn from(name: &str) -> Self {
        match name {
            id::FRONTIER => Self::FRONTIER,
            id::FRONTIER_THAWING => Self::FRONTIER_THAWING,
            id::HOMESTEAD => Self::HOMESTEAD,
            id::DAO_FORK => Self::DAO_FORK,
            id::TANGERINE => Self::TANGERINE,
            id::SPURIOUS_DRAGON => Self::SPURIOUS_DRAGON,
            id::BYZANTIUM => Self::BYZANTIUM,
            id::CONSTANTINOPLE => Self::CONSTANTINOPLE,
            id::PETERSBURG => Self::PETERSBURG,
            id::ISTANBUL => Self::ISTANBUL,
            id::MUIR_GLACIER => Self::MUIR_GLACIER,
            id::BERLIN => Self::BERLIN,
            id::LONDON => Self::LONDON,
            id::ARROW_GLACIER => Self::ARROW_GLACIER,
            id::GRAY_GLACIER => Self::GRAY_GLACIER,
            id::MERGE => Self::MERGE,
            id::SHANGHAI => Self::SHANGHAI,
            id::CANCUN => Self::CANCUN,
            id::LATEST => Self::LATEST,
            _ => Self::LATEST,
        }
    }
}

impl From<SpecId> for &'static str {
    fn from(spec_id: SpecId) -> Self {
        match spec_id {
            SpecId::FRONTIER => id::FRONTIER,
            SpecId::FRONTIER_THAWING => id::FRONTIER_THAWING,
            SpecId::HOMESTEAD => id::HOMESTEAD,
            SpecId::DAO_FORK => id::DAO_FORK,
            SpecId::TANGERINE => id::TANGERINE,
            SpecId::SPURIOUS_DRAGON => id::SPURIOUS_DRAGON,
            SpecId::BYZANTIUM => id::BYZANTIUM,
            SpecId::CONSTANTINOPLE => id::CONSTANTINOPLE,
            SpecId::PETERSBURG => id::PETERSBURG,
            SpecId::ISTANBUL => id::ISTANBUL,
            SpecId::MUIR_GLACIER => id::MUIR_GLACIER,
            SpecId::BERLIN => id::BERLIN,
            SpecId::LONDON => id::LONDON,
            SpecId::ARROW_GLACIER => id::ARROW_GLACIER,
            SpecId::GRAY_GLACIER => id::GRAY_GLACIER,
            SpecId::MERGE => id::MERGE,
            SpecId::SHANGHAI => id::SHANGHAI,
            SpecId::CANCUN => id::CANCUN,
            SpecId::LATEST => id::LATEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering() {
        assert!(SpecId::CANCUN.is_enabled_in(SpecId::SHANGHAI));
        assert!(SpecId::CANCUN.is_enabled_in(SpecId::CANCUN));
        assert!(!SpecId::SHANGHAI.is_enabled_in(SpecId::CANCUN));
        assert!(SpecId::LATEST.is_enabled_in(SpecId::EOF_INTRODUCED));
        assert!(!SpecId::FRONTIER.is_enabled_in(SpecId::HOMESTEAD));
    }

    #[test]
    fn try_from_u8() {
        assert_eq!(SpecId::try_from_u8(0), Some(SpecId::FRONTIER));
        assert_eq!(SpecId::try_from_u8(17), Some(SpecId::CANCUN));
        assert_eq!(SpecId::try_from_u8(u8::MAX), Some(SpecId::LATEST));
        assert_eq!(SpecId::try_from_u8(42), None);
    }

    #[test]
    fn name_roundtrip() {
        for spec in [FRONTIER, HOMESTEAD, MERGE, SHANGHAI, CANCUN, LATEST] {
            let name: &'static str = spec.into();
            assert_eq!(SpecId::from(name), spec);
        }
        // Unknown names fall back to the latest revision.
        assert_eq!(SpecId::from("NotAFork"), SpecId::LATEST);
    }
}
