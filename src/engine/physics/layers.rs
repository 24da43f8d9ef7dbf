use serde::{Deserialize, Serialize};

/// Bit mask of collision layers used to filter physics queries
///
/// Bit values follow the usual engine convention: layer 0 is the default
/// layer, layer 4 is water.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    /// Default layer
    pub const DEFAULT: LayerMask = LayerMask(1);

    /// Water layer, the usual target for surface avoidance
    pub const WATER: LayerMask = LayerMask(1 << 4);

    /// Walkable ground
    pub const GROUND: LayerMask = LayerMask::DEFAULT;

    /// Mask with only the given layer index set
    pub const fn layer(index: u32) -> Self {
        LayerMask(1 << index)
    }

    /// True if any of `layer_bits` is inside the mask
    pub const fn contains(self, layer_bits: u32) -> bool {
        self.0 & layer_bits != 0
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn union(self, other: LayerMask) -> Self {
        LayerMask(self.0 | other.0)
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_bits() {
        assert_eq!(LayerMask::layer(0), LayerMask::DEFAULT);
        assert_eq!(LayerMask::layer(4), LayerMask::WATER);
        assert_eq!(LayerMask::DEFAULT.bits(), 1);
        assert_eq!(LayerMask::WATER.bits(), 16);
    }

    #[test]
    fn test_contains() {
        let mask = LayerMask::GROUND.union(LayerMask::WATER);
        assert!(mask.contains(LayerMask::WATER.bits()));
        assert!(mask.contains(LayerMask::DEFAULT.bits()));
        assert!(!mask.contains(LayerMask::layer(3).bits()));
        assert!(!LayerMask::NONE.contains(LayerMask::DEFAULT.bits()));
    }
}
