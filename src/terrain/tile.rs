use serde::{Deserialize, Serialize};

// Ordinals are part of the worker wire format; do not reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum TileType {
    DeepOcean = 0,
    Ocean = 1,
    ShallowWater = 2,
    Beach = 3,
    #[default]
    Grass = 4,
    Forest = 5,
    Dirt = 6,
    Mountain = 7,
    SnowMountain = 8,
    Road = 9,
    Building = 10,
    Ruin = 11,
}

impl TileType {
    pub const COUNT: usize = 12;

    pub const ALL: [TileType; TileType::COUNT] = [
        TileType::DeepOcean,
        TileType::Ocean,
        TileType::ShallowWater,
        TileType::Beach,
        TileType::Grass,
        TileType::Forest,
        TileType::Dirt,
        TileType::Mountain,
        TileType::SnowMountain,
        TileType::Road,
        TileType::Building,
        TileType::Ruin,
    ];

    pub fn from_u8(value: u8) -> Option<TileType> {
        TileType::ALL.get(value as usize).copied()
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    // Tiles the infrastructure overlay may replace
    pub fn accepts_infrastructure(self) -> bool {
        matches!(self, TileType::Grass | TileType::Forest | TileType::Dirt)
    }
}
