//! Segment definitions: sockets, rails, item slots and decoration groups.
//!
//! A definition is built once when the catalog is loaded. Building
//! validates the exit/socket invariant and rebases all local data so the
//! `In` socket sits at the local origin; a placed segment's root transform
//! is therefore exactly the anchor its `In` socket was placed at.

use std::fmt;
use std::str::FromStr;

use ahash::AHashMap;
use glam::{Quat, Vec3};
use runner_common::{CatalogError, SegmentId, Transform};
use serde::{Deserialize, Serialize};

// ============================================================================
// Socket roles and rails
// ============================================================================

/// Role of an anchor socket on a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SocketRole {
    /// Entry socket, anchored to the previous segment's exit.
    In,
    /// Single exit (straight continuation or corner).
    Out,
    /// Left branch of a fork.
    OutL,
    /// Right branch of a fork.
    OutR,
}

impl SocketRole {
    /// All roles, entry first.
    pub const ALL: [Self; 4] = [Self::In, Self::Out, Self::OutL, Self::OutR];

    /// Suffix used in asset rail names (`CenterOutL`, ...).
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::In => "In",
            Self::Out => "Out",
            Self::OutL => "OutL",
            Self::OutR => "OutR",
        }
    }

    /// Whether this is one of the fork branch sockets.
    #[must_use]
    pub const fn is_branch(self) -> bool {
        matches!(self, Self::OutL | Self::OutR)
    }
}

impl fmt::Display for SocketRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// One of the three parallel rails a character can follow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RailSide {
    /// Middle lane.
    #[default]
    Center,
    /// Left lane.
    Left,
    /// Right lane.
    Right,
}

impl RailSide {
    /// All sides in emission order.
    pub const ALL: [Self; 3] = [Self::Center, Self::Left, Self::Right];

    /// Index into fixed-size per-rail arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Center => 0,
            Self::Left => 1,
            Self::Right => 2,
        }
    }

    /// Prefix used in asset rail names.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Center => "Center",
            Self::Left => "Left",
            Self::Right => "Right",
        }
    }
}

/// Typed key of a rail list: side × socket suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RailKey {
    /// Lane
    pub side: RailSide,
    /// Traversal part the rail belongs to
    pub socket: SocketRole,
}

impl RailKey {
    /// Creates a rail key.
    #[must_use]
    pub const fn new(side: RailSide, socket: SocketRole) -> Self {
        Self { side, socket }
    }
}

impl fmt::Display for RailKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.side.prefix(), self.socket.suffix())
    }
}

impl FromStr for RailKey {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for side in RailSide::ALL {
            let Some(rest) = s.strip_prefix(side.prefix()) else {
                continue;
            };
            // Longest suffixes first so "OutL" is not read as "Out".
            for socket in [SocketRole::OutL, SocketRole::OutR, SocketRole::Out, SocketRole::In] {
                if rest == socket.suffix() {
                    return Ok(Self::new(side, socket));
                }
            }
        }
        Err(CatalogError::InvalidData(format!("unknown rail name '{s}'")))
    }
}

// ============================================================================
// Items, decorations and colliders
// ============================================================================

/// Item categories a slot can accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotTag {
    /// Coins only.
    Coin,
    /// Obstacles only.
    Obstacle,
    /// Either.
    Any,
}

/// Item category requested by the item placer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemCategory {
    /// Collectible coin.
    Coin,
    /// Obstacle.
    Obstacle,
}

impl SlotTag {
    /// Whether a slot with this tag accepts the category.
    #[must_use]
    pub const fn accepts(self, category: ItemCategory) -> bool {
        matches!(
            (self, category),
            (Self::Any, _) | (Self::Coin, ItemCategory::Coin) | (Self::Obstacle, ItemCategory::Obstacle)
        )
    }
}

/// A spot on a segment where an item may be spawned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemSlot {
    /// Accepted categories
    pub tag: SlotTag,
    /// Local transform (surface point, up = slot normal)
    pub local: Transform,
}

/// A decoration prop inside a group.
#[derive(Debug, Clone, PartialEq)]
pub struct DecorationItem {
    /// Prefab name
    pub prefab: String,
    /// Local transform
    pub local: Transform,
    /// Whether the prop plays a looping animation when enabled
    pub animated: bool,
}

/// A set of decoration props; exactly one group is enabled per placement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecorationGroup {
    /// Props
    pub items: Vec<DecorationItem>,
}

/// Oriented box collider in segment-local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalBox {
    /// Box center
    pub center: Vec3,
    /// Half extents along the box axes
    pub half_extents: Vec3,
    /// Box orientation
    pub rotation: Quat,
}

impl LocalBox {
    /// Creates an axis-aligned local box from min/max corners.
    #[must_use]
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self {
            center: (min + max) * 0.5,
            half_extents: (max - min).abs() * 0.5,
            rotation: Quat::IDENTITY,
        }
    }

    /// Returns the eight corners transformed by `frame`.
    #[must_use]
    pub fn corners(&self, frame: &Transform) -> [Vec3; 8] {
        let h = self.half_extents;
        let mut out = [Vec3::ZERO; 8];
        for (i, corner) in out.iter_mut().enumerate() {
            let sign = Vec3::new(
                if i & 1 == 0 { -1.0 } else { 1.0 },
                if i & 2 == 0 { -1.0 } else { 1.0 },
                if i & 4 == 0 { -1.0 } else { 1.0 },
            );
            let local = self.center + self.rotation * (h * sign);
            *corner = frame.transform_point(local);
        }
        out
    }

    /// Axis-aligned bounds of this box under `frame`, as `(min, max)`.
    #[must_use]
    pub fn world_bounds(&self, frame: &Transform) -> (Vec3, Vec3) {
        let corners = self.corners(frame);
        let mut min = corners[0];
        let mut max = corners[0];
        for c in &corners[1..] {
            min = min.min(*c);
            max = max.max(*c);
        }
        (min, max)
    }

    fn rebased(&self, frame: &Transform) -> Self {
        Self {
            center: frame.transform_point(self.center),
            half_extents: self.half_extents,
            rotation: (frame.rotation * self.rotation).normalize(),
        }
    }
}

// ============================================================================
// Segment definition
// ============================================================================

/// A reusable track prefab with sockets, rails and item slots.
#[derive(Debug, Clone)]
pub struct SegmentDefinition {
    id: SegmentId,
    name: String,
    prefab: String,
    exits: u32,
    sockets: AHashMap<SocketRole, Transform>,
    rails: AHashMap<RailKey, Vec<Vec3>>,
    slots: Vec<ItemSlot>,
    groups: Vec<DecorationGroup>,
    colliders: Vec<LocalBox>,
}

impl SegmentDefinition {
    /// Starts building a definition.
    #[must_use]
    pub fn builder(id: SegmentId, name: impl Into<String>) -> SegmentBuilder {
        SegmentBuilder {
            id,
            name: name.into(),
            prefab: String::new(),
            exits: 0,
            sockets: AHashMap::new(),
            rails: AHashMap::new(),
            slots: Vec::new(),
            groups: Vec::new(),
            colliders: Vec::new(),
        }
    }

    /// Catalog identifier.
    #[must_use]
    pub const fn id(&self) -> SegmentId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Prefab instantiated by the host scene graph.
    #[must_use]
    pub fn prefab(&self) -> &str {
        &self.prefab
    }

    /// Declared exit count.
    #[must_use]
    pub const fn exits(&self) -> u32 {
        self.exits
    }

    /// Whether the segment requires a turn decision.
    #[must_use]
    pub const fn is_fork(&self) -> bool {
        self.exits >= 2
    }

    /// Local transform of a socket, `In` is always the identity.
    #[must_use]
    pub fn socket(&self, role: SocketRole) -> Option<&Transform> {
        self.sockets.get(&role)
    }

    /// Sockets validated by the clearance probe, in probe order.
    #[must_use]
    pub fn probe_sockets(&self) -> &'static [SocketRole] {
        match self.exits {
            0 => &[],
            1 => &[SocketRole::Out],
            _ => &[SocketRole::OutR, SocketRole::OutL],
        }
    }

    /// Exit used as the next anchor right after placement. Forks use the
    /// right branch until the turn decision picks the real one.
    #[must_use]
    pub const fn primary_exit(&self) -> SocketRole {
        if self.is_fork() {
            SocketRole::OutR
        } else {
            SocketRole::Out
        }
    }

    /// Local rail points.
    #[must_use]
    pub fn rail(&self, side: RailSide, socket: SocketRole) -> &[Vec3] {
        self.rails
            .get(&RailKey::new(side, socket))
            .map_or(&[][..], Vec::as_slice)
    }

    /// Item slots.
    #[must_use]
    pub fn slots(&self) -> &[ItemSlot] {
        &self.slots
    }

    /// Decoration groups.
    #[must_use]
    pub fn groups(&self) -> &[DecorationGroup] {
        &self.groups
    }

    /// Floor colliders.
    #[must_use]
    pub fn colliders(&self) -> &[LocalBox] {
        &self.colliders
    }

    /// Rail suffixes a segment with this exit count must provide.
    fn required_rail_sockets(exits: u32) -> &'static [SocketRole] {
        match exits {
            0 => &[SocketRole::In],
            1 => &[SocketRole::In, SocketRole::Out],
            _ => &[SocketRole::In, SocketRole::OutL, SocketRole::OutR],
        }
    }
}

/// Builder for [`SegmentDefinition`]; `build` validates and rebases.
#[derive(Debug, Clone)]
pub struct SegmentBuilder {
    id: SegmentId,
    name: String,
    prefab: String,
    exits: u32,
    sockets: AHashMap<SocketRole, Transform>,
    rails: AHashMap<RailKey, Vec<Vec3>>,
    slots: Vec<ItemSlot>,
    groups: Vec<DecorationGroup>,
    colliders: Vec<LocalBox>,
}

impl SegmentBuilder {
    /// Sets the prefab name.
    pub fn prefab(mut self, prefab: impl Into<String>) -> Self {
        self.prefab = prefab.into();
        self
    }

    /// Sets the declared exit count.
    pub fn exits(mut self, exits: u32) -> Self {
        self.exits = exits;
        self
    }

    /// Adds a socket.
    pub fn socket(mut self, role: SocketRole, local: Transform) -> Self {
        self.sockets.insert(role, local);
        self
    }

    /// Adds a rail point list.
    pub fn rail(mut self, side: RailSide, socket: SocketRole, points: Vec<Vec3>) -> Self {
        self.rails.insert(RailKey::new(side, socket), points);
        self
    }

    /// Adds an item slot.
    pub fn slot(mut self, tag: SlotTag, local: Transform) -> Self {
        self.slots.push(ItemSlot { tag, local });
        self
    }

    /// Adds a decoration group.
    pub fn group(mut self, group: DecorationGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Adds a floor collider.
    pub fn collider(mut self, collider: LocalBox) -> Self {
        self.colliders.push(collider);
        self
    }

    /// Validates the definition and rebases it onto its `In` socket.
    pub fn build(self) -> Result<SegmentDefinition, CatalogError> {
        let missing_socket = |socket: SocketRole| CatalogError::MissingSocket {
            segment: self.name.clone(),
            socket: socket.to_string(),
        };

        let entry = *self
            .sockets
            .get(&SocketRole::In)
            .ok_or_else(|| missing_socket(SocketRole::In))?;

        let branches = [SocketRole::OutL, SocketRole::OutR]
            .iter()
            .filter(|role| self.sockets.contains_key(role))
            .count() as u32;
        let found = if branches > 0 {
            branches
        } else {
            u32::from(self.exits >= 1 && self.sockets.contains_key(&SocketRole::Out))
        };
        if found != self.exits {
            return Err(CatalogError::ExitCountMismatch {
                segment: self.name.clone(),
                declared: self.exits,
                found,
            });
        }
        // Straight segments chain through `Out` without counting it as a branch.
        if self.exits <= 1 && !self.sockets.contains_key(&SocketRole::Out) {
            return Err(missing_socket(SocketRole::Out));
        }

        for socket in SegmentDefinition::required_rail_sockets(self.exits) {
            for side in RailSide::ALL {
                let key = RailKey::new(side, *socket);
                if self.rails.get(&key).map_or(true, Vec::is_empty) {
                    return Err(CatalogError::MissingRail {
                        segment: self.name.clone(),
                        rail: key.to_string(),
                    });
                }
            }
        }

        let to_entry = entry.inverse();
        let sockets = self
            .sockets
            .into_iter()
            .map(|(role, local)| {
                let rebased = if role == SocketRole::In {
                    Transform::IDENTITY
                } else {
                    to_entry.compose(&local)
                };
                (role, rebased)
            })
            .collect();
        let rails = self
            .rails
            .into_iter()
            .map(|(key, points)| {
                let points = points.into_iter().map(|p| to_entry.transform_point(p)).collect();
                (key, points)
            })
            .collect();
        let slots = self
            .slots
            .into_iter()
            .map(|slot| ItemSlot {
                tag: slot.tag,
                local: to_entry.compose(&slot.local),
            })
            .collect();
        let groups = self
            .groups
            .into_iter()
            .map(|group| DecorationGroup {
                items: group
                    .items
                    .into_iter()
                    .map(|item| DecorationItem {
                        local: to_entry.compose(&item.local),
                        ..item
                    })
                    .collect(),
            })
            .collect();
        let colliders = self.colliders.iter().map(|c| c.rebased(&to_entry)).collect();

        Ok(SegmentDefinition {
            id: self.id,
            name: self.name,
            prefab: self.prefab,
            exits: self.exits,
            sockets,
            rails,
            slots,
            groups,
            colliders,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight(entry: Transform) -> SegmentBuilder {
        let rail = vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 10.0)];
        SegmentDefinition::builder(SegmentId::new(1), "Straight")
            .socket(SocketRole::In, entry)
            .socket(SocketRole::Out, Transform::from_position(Vec3::new(0.0, 0.0, 10.0)))
            .rail(RailSide::Center, SocketRole::In, rail.clone())
            .rail(RailSide::Left, SocketRole::In, rail.clone())
            .rail(RailSide::Right, SocketRole::In, rail)
    }

    #[test]
    fn test_rail_key_parse() {
        let key: RailKey = "CenterOutL".parse().expect("parse");
        assert_eq!(key, RailKey::new(RailSide::Center, SocketRole::OutL));
        let key: RailKey = "RightOut".parse().expect("parse");
        assert_eq!(key, RailKey::new(RailSide::Right, SocketRole::Out));
        assert!("MiddleIn".parse::<RailKey>().is_err());
        assert!("CenterOutX".parse::<RailKey>().is_err());
        assert_eq!(key.to_string(), "RightOut");
    }

    #[test]
    fn test_slot_tag_accepts() {
        assert!(SlotTag::Coin.accepts(ItemCategory::Coin));
        assert!(!SlotTag::Coin.accepts(ItemCategory::Obstacle));
        assert!(SlotTag::Any.accepts(ItemCategory::Obstacle));
    }

    #[test]
    fn test_build_straight() {
        let def = straight(Transform::IDENTITY).build().expect("valid");
        assert_eq!(def.exits(), 0);
        assert!(!def.is_fork());
        assert!(def.probe_sockets().is_empty());
        assert_eq!(def.primary_exit(), SocketRole::Out);
        assert_eq!(def.rail(RailSide::Left, SocketRole::In).len(), 2);
        assert!(def.rail(RailSide::Left, SocketRole::Out).is_empty());
    }

    #[test]
    fn test_build_rebases_onto_entry() {
        let entry = Transform::from_position(Vec3::new(0.0, 0.0, -2.0));
        let def = straight(entry).build().expect("valid");

        assert_eq!(def.socket(SocketRole::In), Some(&Transform::IDENTITY));
        let out = def.socket(SocketRole::Out).expect("out");
        assert!(out.position.abs_diff_eq(Vec3::new(0.0, 0.0, 12.0), 1e-5));
        let first = def.rail(RailSide::Center, SocketRole::In)[0];
        assert!(first.abs_diff_eq(Vec3::new(0.0, 0.0, 2.0), 1e-5));
    }

    #[test]
    fn test_missing_in_socket() {
        let result = SegmentDefinition::builder(SegmentId::new(2), "Broken").build();
        assert!(matches!(result, Err(CatalogError::MissingSocket { .. })));
    }

    #[test]
    fn test_exit_count_mismatch() {
        let result = straight(Transform::IDENTITY)
            .exits(2)
            .socket(SocketRole::OutL, Transform::IDENTITY)
            .build();
        assert!(matches!(
            result,
            Err(CatalogError::ExitCountMismatch {
                declared: 2,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_missing_rail_reported_by_name() {
        let result = straight(Transform::IDENTITY).exits(1).build();
        match result {
            Err(CatalogError::MissingRail { rail, .. }) => assert_eq!(rail, "CenterOut"),
            other => panic!("expected missing rail, got {other:?}"),
        }
    }

    #[test]
    fn test_local_box_bounds_under_rotation() {
        let collider = LocalBox::from_min_max(Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, 0.0, 10.0));
        let frame = Transform::from_yaw_degrees(Vec3::ZERO, 90.0);
        let (min, max) = collider.world_bounds(&frame);
        assert!(min.abs_diff_eq(Vec3::new(0.0, -1.0, -1.0), 1e-4));
        assert!(max.abs_diff_eq(Vec3::new(10.0, 0.0, 1.0), 1e-4));
    }
}
