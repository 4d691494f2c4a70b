//! Coin, obstacle and decoration placement on freshly placed segments.

use runner_common::{NodeId, Transform};
use tracing::trace;

use crate::rng::TrackRng;
use crate::scene::SceneGraph;
use crate::segment::{ItemCategory, SegmentDefinition};

/// Coin value tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoinVariant {
    /// Rare, high value
    Gold,
    /// Uncommon, mid value
    Silver,
    /// Common
    Bronze,
}

impl CoinVariant {
    /// Score value of the coin.
    #[must_use]
    pub const fn value(self) -> u32 {
        match self {
            Self::Gold => 10,
            Self::Silver => 5,
            Self::Bronze => 1,
        }
    }
}

/// Prefab names for spawned items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemPrefabs {
    /// Gold coin prefab
    pub gold_coin: String,
    /// Silver coin prefab
    pub silver_coin: String,
    /// Bronze coin prefab
    pub bronze_coin: String,
    /// Obstacle prefab
    pub obstacle: String,
}

impl Default for ItemPrefabs {
    fn default() -> Self {
        Self {
            gold_coin: "Objects/CoinGold.xml".to_string(),
            silver_coin: "Objects/CoinSilver.xml".to_string(),
            bronze_coin: "Objects/CoinBronze.xml".to_string(),
            obstacle: "Objects/Obstacle.xml".to_string(),
        }
    }
}

impl ItemPrefabs {
    /// Prefab for a coin variant.
    #[must_use]
    pub fn coin(&self, variant: CoinVariant) -> &str {
        match variant {
            CoinVariant::Gold => &self.gold_coin,
            CoinVariant::Silver => &self.silver_coin,
            CoinVariant::Bronze => &self.bronze_coin,
        }
    }
}

/// Item placement tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemConfig {
    /// Chance of a gold coin, in percent
    pub rare_coin_percent: u8,
    /// Chance of a silver coin, in percent
    pub mid_coin_percent: u8,
    /// Height of obstacles above their slot surface
    pub obstacle_lift: f32,
    /// Prefab names
    pub prefabs: ItemPrefabs,
}

impl Default for ItemConfig {
    fn default() -> Self {
        Self {
            rare_coin_percent: 5,
            mid_coin_percent: 15,
            obstacle_lift: 0.5,
            prefabs: ItemPrefabs::default(),
        }
    }
}

/// Nodes spawned on one segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpawnedItems {
    /// Coin, if the segment had a coin slot
    pub coin: Option<(CoinVariant, NodeId)>,
    /// Obstacle, if the segment had an obstacle slot
    pub obstacle: Option<NodeId>,
    /// Index of the enabled decoration group
    pub group: Option<usize>,
    /// Decoration nodes of the enabled group
    pub decorations: Vec<NodeId>,
}

/// Picks and spawns items for placed segments.
#[derive(Debug, Clone, Default)]
pub struct ItemPlacer {
    config: ItemConfig,
}

impl ItemPlacer {
    /// Creates a placer.
    #[must_use]
    pub const fn new(config: ItemConfig) -> Self {
        Self { config }
    }

    /// Placement tuning.
    #[must_use]
    pub const fn config(&self) -> &ItemConfig {
        &self.config
    }

    /// Weighted coin tier draw.
    pub fn draw_coin_variant(&self, rng: &mut TrackRng) -> CoinVariant {
        let roll = rng.range_inclusive(1, 100);
        let rare = i32::from(self.config.rare_coin_percent);
        let mid = rare + i32::from(self.config.mid_coin_percent);
        if roll <= rare {
            CoinVariant::Gold
        } else if roll <= mid {
            CoinVariant::Silver
        } else {
            CoinVariant::Bronze
        }
    }

    /// Populates a segment placed at `root` under the scene node `parent`.
    ///
    /// Draw order is fixed (coin slot, coin tier, obstacle slot, decoration
    /// group) so a seeded generator reproduces the same level.
    pub fn populate(
        &self,
        scene: &mut impl SceneGraph,
        rng: &mut TrackRng,
        definition: &SegmentDefinition,
        parent: NodeId,
        root: &Transform,
    ) -> SpawnedItems {
        let mut spawned = SpawnedItems::default();

        let coin_slots: Vec<_> = definition
            .slots()
            .iter()
            .filter(|s| s.tag.accepts(ItemCategory::Coin))
            .collect();
        let obstacle_slots: Vec<_> = definition
            .slots()
            .iter()
            .filter(|s| s.tag.accepts(ItemCategory::Obstacle))
            .collect();

        if !coin_slots.is_empty() {
            let slot = coin_slots[rng.index(coin_slots.len())];
            let variant = self.draw_coin_variant(rng);
            let world = root.compose(&slot.local);
            let node = scene.spawn_item(parent, self.config.prefabs.coin(variant), &world);
            trace!("Coin {variant:?} on {}", definition.name());
            spawned.coin = Some((variant, node));
        }

        if !obstacle_slots.is_empty() {
            let slot = obstacle_slots[rng.index(obstacle_slots.len())];
            let mut world = root.compose(&slot.local);
            world.position += world.up() * self.config.obstacle_lift;
            spawned.obstacle = Some(scene.spawn_item(parent, &self.config.prefabs.obstacle, &world));
        }

        let groups = definition.groups();
        if !groups.is_empty() {
            let chosen = rng.index(groups.len());
            for item in &groups[chosen].items {
                let node = scene.spawn_item(parent, &item.prefab, &root.compose(&item.local));
                if item.animated {
                    scene.play_animation(node);
                }
                spawned.decorations.push(node);
            }
            spawned.group = Some(chosen);
        }

        spawned
    }
}
