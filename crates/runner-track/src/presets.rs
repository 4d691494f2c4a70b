//! Built-in segment geometry.
//!
//! Used when no catalog file is available, and by tests and benchmarks.
//! All presets share one layout: sockets and rails at `y = 0`, three lanes
//! spaced [`LANE_OFFSET`] apart along each socket's left axis, and a
//! thick floor slab around the track body on the floor layer.

use glam::Vec3;
use runner_common::{CatalogError, SegmentId, Transform, LOCAL_LEFT};

use crate::catalog::SegmentCatalog;
use crate::segment::{
    DecorationGroup, DecorationItem, LocalBox, RailSide, SegmentBuilder, SegmentDefinition,
    SlotTag, SocketRole,
};

/// Distance between adjacent lanes.
pub const LANE_OFFSET: f32 = 1.5;

/// Spacing of rail points.
pub const RAIL_SPACING: f32 = 2.5;

/// Half width of the floor slab.
const HALF_WIDTH: f32 = 3.0;

/// Half thickness of the floor slab.
const HALF_THICKNESS: f32 = 0.5;

/// Lateral offset of a lane along a socket's left axis.
const fn lane_shift(side: RailSide) -> f32 {
    match side {
        RailSide::Center => 0.0,
        RailSide::Left => LANE_OFFSET,
        RailSide::Right => -LANE_OFFSET,
    }
}

/// Evenly spaced points from `from` to `to` inclusive.
fn line(from: Vec3, to: Vec3) -> Vec<Vec3> {
    let steps = ((to - from).length() / RAIL_SPACING).round().max(1.0) as usize;
    (0..=steps)
        .map(|i| from.lerp(to, i as f32 / steps as f32))
        .collect()
}

/// Adds the three lanes of one rail part, running from `start` to `end`
/// (both socket frames; lanes are offset along each frame's left axis).
fn lanes(mut builder: SegmentBuilder, socket: SocketRole, start: &Transform, end: &Transform) -> SegmentBuilder {
    for side in RailSide::ALL {
        let shift = LOCAL_LEFT * lane_shift(side);
        let from = start.transform_point(shift);
        let to = end.transform_point(shift);
        builder = builder.rail(side, socket, line(from, to));
    }
    builder
}

fn slab(min_x: f32, max_x: f32, min_z: f32, max_z: f32) -> LocalBox {
    LocalBox::from_min_max(
        Vec3::new(min_x, -HALF_THICKNESS, min_z),
        Vec3::new(max_x, HALF_THICKNESS, max_z),
    )
}

fn street_lamps(length: f32) -> DecorationGroup {
    let lamp = |x: f32| DecorationItem {
        prefab: "Objects/Lamp.xml".to_string(),
        local: Transform::from_position(Vec3::new(x, 0.0, length * 0.5)),
        animated: false,
    };
    DecorationGroup {
        items: vec![lamp(-HALF_WIDTH), lamp(HALF_WIDTH)],
    }
}

fn windmill(length: f32) -> DecorationGroup {
    DecorationGroup {
        items: vec![DecorationItem {
            prefab: "Objects/Windmill.xml".to_string(),
            local: Transform::from_position(Vec3::new(-HALF_WIDTH - 2.0, 0.0, length * 0.25)),
            animated: true,
        }],
    }
}

/// A straight segment (0 exits) of the given length.
pub fn straight_segment(id: u32, name: &str, length: f32) -> Result<SegmentDefinition, CatalogError> {
    let entry = Transform::IDENTITY;
    let exit = Transform::from_position(Vec3::new(0.0, 0.0, length));

    let builder = SegmentDefinition::builder(SegmentId::new(id), name)
        .prefab(format!("Objects/{name}.xml"))
        .exits(0)
        .socket(SocketRole::In, entry)
        .socket(SocketRole::Out, exit)
        .slot(SlotTag::Coin, Transform::from_position(Vec3::new(0.0, 0.0, length * 0.5)))
        .slot(
            SlotTag::Coin,
            Transform::from_position(Vec3::new(-LANE_OFFSET, 0.0, length * 0.5)),
        )
        .slot(
            SlotTag::Obstacle,
            Transform::from_position(Vec3::new(LANE_OFFSET, 0.0, length * 0.75)),
        )
        .group(street_lamps(length))
        .group(windmill(length))
        .collider(slab(-HALF_WIDTH, HALF_WIDTH, 0.0, length));

    lanes(builder, SocketRole::In, &entry, &exit).build()
}

/// A single-exit corner turning right (`yaw = 90`) or left (`yaw = -90`).
pub fn corner_segment(id: u32, name: &str, length: f32, right: bool) -> Result<SegmentDefinition, CatalogError> {
    let (sign, yaw) = if right { (1.0, 90.0) } else { (-1.0, -90.0) };
    let half = length * 0.5;
    let entry = Transform::IDENTITY;
    let corner_in = Transform::from_position(Vec3::new(0.0, 0.0, half));
    let corner_out = Transform::from_yaw_degrees(Vec3::new(0.0, 0.0, half), yaw);
    let exit = Transform::from_yaw_degrees(Vec3::new(sign * half, 0.0, half), yaw);

    let (min_x, max_x) = if right {
        (-HALF_WIDTH, half)
    } else {
        (-half, HALF_WIDTH)
    };
    let builder = SegmentDefinition::builder(SegmentId::new(id), name)
        .prefab(format!("Objects/{name}.xml"))
        .exits(1)
        .socket(SocketRole::In, entry)
        .socket(SocketRole::Out, exit)
        .slot(SlotTag::Any, Transform::from_position(Vec3::new(0.0, 0.0, half * 0.5)))
        .collider(slab(-HALF_WIDTH, HALF_WIDTH, 0.0, half - HALF_WIDTH))
        .collider(slab(min_x, max_x, half - HALF_WIDTH, half + HALF_WIDTH));

    let builder = lanes(builder, SocketRole::In, &entry, &corner_in);
    lanes(builder, SocketRole::Out, &corner_out, &exit).build()
}

/// A T-junction fork with left and right branches.
pub fn fork_segment(id: u32, name: &str, length: f32) -> Result<SegmentDefinition, CatalogError> {
    let half = length * 0.5;
    let entry = Transform::IDENTITY;
    let junction = Transform::from_position(Vec3::new(0.0, 0.0, half));
    let turn_left = Transform::from_yaw_degrees(Vec3::new(0.0, 0.0, half), -90.0);
    let turn_right = Transform::from_yaw_degrees(Vec3::new(0.0, 0.0, half), 90.0);
    let exit_left = Transform::from_yaw_degrees(Vec3::new(-half, 0.0, half), -90.0);
    let exit_right = Transform::from_yaw_degrees(Vec3::new(half, 0.0, half), 90.0);

    let builder = SegmentDefinition::builder(SegmentId::new(id), name)
        .prefab(format!("Objects/{name}.xml"))
        .exits(2)
        .socket(SocketRole::In, entry)
        .socket(SocketRole::OutL, exit_left)
        .socket(SocketRole::OutR, exit_right)
        .slot(SlotTag::Coin, Transform::from_position(Vec3::new(0.0, 0.0, half * 0.5)))
        .collider(slab(-HALF_WIDTH, HALF_WIDTH, 0.0, half - HALF_WIDTH))
        .collider(slab(-half, half, half - HALF_WIDTH, half + HALF_WIDTH));

    let builder = lanes(builder, SocketRole::In, &entry, &junction);
    let builder = lanes(builder, SocketRole::OutL, &turn_left, &exit_left);
    lanes(builder, SocketRole::OutR, &turn_right, &exit_right).build()
}

/// The built-in catalog: start platform, straight, both corners and a fork.
pub fn default_catalog() -> Result<SegmentCatalog, CatalogError> {
    SegmentCatalog::from_definitions([
        straight_segment(0, "Block1", 20.0)?,
        straight_segment(1, "Block5", 20.0)?,
        corner_segment(2, "Block2", 20.0, false)?,
        corner_segment(3, "Block3", 20.0, true)?,
        fork_segment(4, "Block6", 20.0)?,
    ])
}
