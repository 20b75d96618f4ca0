// Terrain synthesis: noise fields -> tile type per tile.
//
// Thresholds are evaluated top to bottom and the first match wins. Reordering
// them changes the biome map, so keep the order exactly as listed.

use crate::terrain::chunk::BiomeData;
use crate::terrain::noise::{NoiseLayer, NoiseManager, NoiseParameters};
use crate::terrain::tile::TileType;
use crate::threading::task_runner::{JobPayload, JobResult};

// --- height cut points ---
pub const DEEP_OCEAN_MAX: f64 = 0.06;
pub const OCEAN_MAX: f64 = 0.09;
pub const SHALLOW_WATER_MAX: f64 = 0.12;
pub const BEACH_MAX: f64 = 0.16;
pub const LOWLAND_MAX: f64 = 0.65;
pub const HIGHLAND_MAX: f64 = 0.82;

// --- lowland biome split ---
pub const FOREST_MIN_MOISTURE: f64 = 0.55;
pub const DIRT_MAX_MOISTURE: f64 = 0.25;

// --- highland ridge gates ---
pub const MOUNTAIN_MIN_RIDGE: f64 = 0.7;
pub const ROCKY_MIN_RIDGE: f64 = 0.5;

// --- peaks ---
pub const SNOW_MAX_TEMPERATURE: f64 = 0.4;

// --- infrastructure overlay ---
pub const INFRA_MIN_HEIGHT: f64 = 0.3;
pub const INFRA_MAX_HEIGHT: f64 = 0.6;
pub const INFRA_MIN_MOISTURE: f64 = 0.3;
pub const INFRA_MAX_MOISTURE: f64 = 0.7;
pub const ROAD_MIN_FEATURE: f64 = 0.65;
pub const ROAD_MAX_FEATURE: f64 = 0.67;
pub const SETTLEMENT_MIN_FEATURE: f64 = 0.75;
pub const BUILDING_MIN_TEMPERATURE: f64 = 0.5;

/// One tile's worth of sampled fields plus its final type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSample {
    pub tile: TileType,
    pub height: f64,
    pub moisture: f64,
    pub temperature: f64,
}

/// Base terrain type, before roads and settlements.
pub fn classify_tile(height: f64, moisture: f64, temperature: f64, ridge: f64) -> TileType {
    if height < DEEP_OCEAN_MAX {
        TileType::DeepOcean
    } else if height < OCEAN_MAX {
        TileType::Ocean
    } else if height < SHALLOW_WATER_MAX {
        TileType::ShallowWater
    } else if height < BEACH_MAX {
        TileType::Beach
    } else if height < LOWLAND_MAX {
        if moisture > FOREST_MIN_MOISTURE {
            TileType::Forest
        } else if moisture < DIRT_MAX_MOISTURE {
            TileType::Dirt
        } else {
            TileType::Grass
        }
    } else if height < HIGHLAND_MAX {
        if ridge > MOUNTAIN_MIN_RIDGE {
            TileType::Mountain
        } else if ridge > ROCKY_MIN_RIDGE {
            TileType::Dirt
        } else {
            TileType::Grass
        }
    } else if temperature < SNOW_MAX_TEMPERATURE {
        TileType::SnowMountain
    } else {
        TileType::Mountain
    }
}

/// Roads and settlements, only inside the mid-height / mid-moisture band and
/// never on water, beach or mountain.
pub fn apply_infrastructure(
    base: TileType,
    height: f64,
    moisture: f64,
    temperature: f64,
    feature: f64,
) -> TileType {
    let in_band = (INFRA_MIN_HEIGHT..INFRA_MAX_HEIGHT).contains(&height)
        && (INFRA_MIN_MOISTURE..=INFRA_MAX_MOISTURE).contains(&moisture);
    if !in_band || !base.accepts_infrastructure() {
        return base;
    }

    if (ROAD_MIN_FEATURE..ROAD_MAX_FEATURE).contains(&feature) {
        TileType::Road
    } else if feature > SETTLEMENT_MIN_FEATURE {
        if temperature > BUILDING_MIN_TEMPERATURE {
            TileType::Building
        } else {
            TileType::Ruin
        }
    } else {
        base
    }
}

/// Samples every layer at a world tile coordinate and classifies it.
pub fn sample_tile(noise: &NoiseManager, params: &NoiseParameters, world_x: f64, world_y: f64) -> TileSample {
    let height = noise.sample(NoiseLayer::Height, world_x, world_y) * params.height_weight;
    let moisture = noise.sample(NoiseLayer::Moisture, world_x, world_y) * params.moisture_weight;
    let temperature = noise.sample(NoiseLayer::Temperature, world_x, world_y) * params.temperature_weight;
    let ridge = noise.sample(NoiseLayer::Ridge, world_x, world_y);
    let feature = noise.sample(NoiseLayer::Feature, world_x, world_y);

    let base = classify_tile(height, moisture, temperature, ridge);
    let tile = apply_infrastructure(base, height, moisture, temperature, feature);

    TileSample { tile, height, moisture, temperature }
}

/// Full-chunk synthesis. Pure in its payload: the worker pool and the
/// synchronous fallback both call this and get identical output.
pub fn synthesize_chunk(payload: &JobPayload) -> JobResult {
    let size = payload.chunk_size;
    let len = (size as usize) * (size as usize);
    let noise = NoiseManager::new(payload.numeric_seed, &payload.noise);

    let mut tiles = Vec::with_capacity(len);
    let mut biome = BiomeData::with_capacity(len);

    let origin_x = i64::from(payload.cx) * i64::from(size);
    let origin_y = i64::from(payload.cy) * i64::from(size);

    for ty in 0..size {
        for tx in 0..size {
            let world_x = (origin_x + i64::from(tx)) as f64;
            let world_y = (origin_y + i64::from(ty)) as f64;
            let sample = sample_tile(&noise, &payload.noise, world_x, world_y);

            tiles.push(sample.tile.as_u8());
            biome.height.push(sample.height as f32);
            biome.moisture.push(sample.moisture as f32);
            biome.temperature.push(sample.temperature as f32);
        }
    }

    JobResult { tiles, biome }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(cx: i32, cy: i32) -> JobPayload {
        JobPayload {
            cx,
            cy,
            chunk_size: 16,
            tile_size: 32,
            numeric_seed: 424242,
            noise: NoiseParameters { scale: 0.015, ..Default::default() },
        }
    }

    #[test]
    fn height_thresholds_fire_in_order() {
        let (m, t, r) = (0.4, 0.6, 0.2);
        assert_eq!(classify_tile(0.0, m, t, r), TileType::DeepOcean);
        assert_eq!(classify_tile(DEEP_OCEAN_MAX, m, t, r), TileType::Ocean);
        assert_eq!(classify_tile(OCEAN_MAX, m, t, r), TileType::ShallowWater);
        assert_eq!(classify_tile(SHALLOW_WATER_MAX, m, t, r), TileType::Beach);
        assert_eq!(classify_tile(BEACH_MAX, m, t, r), TileType::Grass);
        assert_eq!(classify_tile(LOWLAND_MAX, m, t, r), TileType::Grass);
        assert_eq!(classify_tile(HIGHLAND_MAX, m, t, r), TileType::Mountain);
        assert_eq!(classify_tile(HIGHLAND_MAX, m, 0.1, r), TileType::SnowMountain);
    }

    #[test]
    fn classification_only_changes_at_thresholds() {
        let cut_points = [
            DEEP_OCEAN_MAX,
            OCEAN_MAX,
            SHALLOW_WATER_MAX,
            BEACH_MAX,
            LOWLAND_MAX,
            HIGHLAND_MAX,
        ];
        for &(m, t, r) in &[(0.1, 0.1, 0.1), (0.6, 0.9, 0.8), (0.4, 0.3, 0.6), (0.9, 0.5, 0.95)] {
            let steps = 10_000;
            let mut previous = classify_tile(0.0, m, t, r);
            for i in 1..=steps {
                let h = i as f64 / steps as f64;
                let current = classify_tile(h, m, t, r);
                if current != previous {
                    assert!(
                        cut_points.iter().any(|c| (h - c).abs() <= 1.0 / steps as f64),
                        "type changed from {previous:?} to {current:?} at h={h} away from a threshold"
                    );
                }
                previous = current;
            }
        }
    }

    #[test]
    fn lowland_biomes_follow_moisture() {
        assert_eq!(classify_tile(0.4, 0.8, 0.5, 0.0), TileType::Forest);
        assert_eq!(classify_tile(0.4, 0.1, 0.5, 0.0), TileType::Dirt);
        assert_eq!(classify_tile(0.4, 0.4, 0.5, 0.0), TileType::Grass);
    }

    #[test]
    fn highlands_are_ridge_gated() {
        assert_eq!(classify_tile(0.7, 0.4, 0.5, 0.9), TileType::Mountain);
        assert_eq!(classify_tile(0.7, 0.4, 0.5, 0.6), TileType::Dirt);
        assert_eq!(classify_tile(0.7, 0.4, 0.5, 0.3), TileType::Grass);
    }

    #[test]
    fn infrastructure_bands() {
        assert_eq!(apply_infrastructure(TileType::Grass, 0.4, 0.5, 0.5, 0.66), TileType::Road);
        assert_eq!(apply_infrastructure(TileType::Grass, 0.4, 0.5, 0.8, 0.8), TileType::Building);
        assert_eq!(apply_infrastructure(TileType::Forest, 0.4, 0.5, 0.2, 0.8), TileType::Ruin);
        assert_eq!(apply_infrastructure(TileType::Grass, 0.4, 0.5, 0.5, 0.7), TileType::Grass);
        // outside the height band nothing changes
        assert_eq!(apply_infrastructure(TileType::Grass, 0.62, 0.5, 0.5, 0.66), TileType::Grass);
        // outside the moisture band nothing changes
        assert_eq!(apply_infrastructure(TileType::Grass, 0.4, 0.9, 0.5, 0.66), TileType::Grass);
    }

    #[test]
    fn infrastructure_never_replaces_water_beach_or_mountain() {
        for base in [TileType::Ocean, TileType::Beach, TileType::Mountain, TileType::SnowMountain] {
            for feature in [0.66, 0.8, 0.99] {
                assert_eq!(apply_infrastructure(base, 0.4, 0.5, 0.9, feature), base);
            }
        }
    }

    #[test]
    fn synthesis_is_bit_identical() {
        let a = synthesize_chunk(&payload(2, -3));
        let b = synthesize_chunk(&payload(2, -3));
        assert_eq!(a.tiles, b.tiles);
        let bits = |v: &[f32]| v.iter().map(|f| f.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a.biome.height), bits(&b.biome.height));
        assert_eq!(bits(&a.biome.moisture), bits(&b.biome.moisture));
        assert_eq!(bits(&a.biome.temperature), bits(&b.biome.temperature));
    }

    #[test]
    fn synthesis_output_is_well_formed() {
        let result = synthesize_chunk(&payload(0, 0));
        assert_eq!(result.tiles.len(), 256);
        assert!(result.biome.is_consistent(256));
        assert!(result.tiles.iter().all(|t| TileType::from_u8(*t).is_some()));
        assert!(result.validate(16).is_ok());
    }

    #[test]
    fn neighbouring_chunks_share_a_continuous_field() {
        // the last column of chunk 0 and first column of chunk 1 are adjacent world tiles
        let p = payload(0, 0);
        let noise = NoiseManager::new(p.numeric_seed, &p.noise);
        let left = synthesize_chunk(&p);
        let right = synthesize_chunk(&payload(1, 0));
        let expected = sample_tile(&noise, &p.noise, 16.0, 0.0);
        assert_eq!(right.biome.height[0], expected.height as f32);
        assert_eq!(left.biome.height[15], sample_tile(&noise, &p.noise, 15.0, 0.0).height as f32);
    }
}
