//! Entity placement and lifecycle.
//!
//! The manager owns every live entity plus the persistent player reference.
//! Insertion validates the descriptor and the tile-alignment invariant,
//! binds the movement mode, and records occupancy by tile coordinate
//! (never by tile reference, so layer rebuilds can't dangle). Identifiers
//! are monotonic for the life of the manager and never reused.

use std::collections::BTreeMap;

use log::{error, info, warn};

use crate::entity::descriptor::{EntityDescriptor, MovementMode};
use crate::ports::{ResourceLoader, ScriptHook, ScriptPort};
use crate::world::{Tile, Tilemap};

/// A tile-grid cell an entity occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCoord {
    pub tx: u32,
    pub ty: u32,
}

/// Occupancy bookkeeping per movement mode. Tile mode sits on exactly one
/// cell; pixel mode can straddle up to a 2x2 footprint mid-move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Occupancy {
    Tile(TileCoord),
    Pixel([Option<TileCoord>; 4]),
}

/// A live entity.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Descriptor file this entity was inserted from.
    pub filename: String,
    /// Unique id, monotonic per manager.
    pub eid: u64,
    pub mode: MovementMode,
    /// Pixel position.
    pub x: i32,
    pub y: i32,
    pub layer: usize,
    /// Pixel size, defaulted from the map's tile size.
    pub width: u32,
    pub height: u32,
    pub occupancy: Occupancy,
    pub(crate) on_kill: Option<ScriptHook>,
}

impl Entity {
    /// Horizontal center, used by the frame compositor's player tracking.
    pub fn center_x(&self) -> i32 {
        self.x + self.width as i32 / 2
    }

    pub fn center_y(&self) -> i32 {
        self.y + self.height as i32 / 2
    }
}

/// The second participant of a collision, as handed to the callback.
pub enum Collider<'a> {
    Entity(&'a Entity),
    Tile(&'a Tile),
}

/// The second participant of a collision, as named by the caller.
#[derive(Debug, Clone, Copy)]
pub enum Contact {
    Entity(u64),
    Tile { layer: usize, tx: i32, ty: i32 },
}

type CollisionCallback = Box<dyn FnMut(&Entity, Collider<'_>)>;

/// Manages the current area's entities and the persistent player reference.
pub struct EntityManager {
    resources: Box<dyn ResourceLoader>,
    scripts: Box<dyn ScriptPort>,
    /// Live entities by eid. Ordered storage keeps iteration stable.
    entities: BTreeMap<u64, Entity>,
    /// The player entity, if one has been bound.
    player: Option<u64>,
    collider: Option<CollisionCallback>,
    next_eid: u64,
}

impl EntityManager {
    pub fn new(resources: Box<dyn ResourceLoader>, scripts: Box<dyn ScriptPort>) -> Self {
        Self {
            resources,
            scripts,
            entities: BTreeMap::new(),
            player: None,
            collider: None,
            next_eid: 0,
        }
    }

    /// Insert an entity from a descriptor at a tile-aligned pixel position.
    ///
    /// Fails (logs, returns None) if no tile grid is loaded, the descriptor
    /// can't be loaded or validated, the position is not tile-aligned, or
    /// no tile exists at the target cell. On success the new entity's id is
    /// returned, the area is marked changed, and the descriptor's on-insert
    /// hook (if any) has been invoked.
    pub fn insert(&mut self, filename: &str, layer: usize, x: i32, y: i32, map: &mut Tilemap) -> Option<u64> {
        if map.layers.is_empty() {
            error!("entity: insert: no area loaded");
            return None;
        }

        let Some(document) = self.resources.load_json(filename) else {
            error!("entity: insert: could not get resource {}", filename);
            return None;
        };
        let descriptor = match EntityDescriptor::from_document(&document) {
            Ok(d) => d,
            Err(e) => {
                error!("entity: insert: {} failed validation: {}", filename, e);
                return None;
            }
        };

        if !map.tile_aligned(x, y) {
            error!("entity: insert: {} must start on a tile, got {},{}", filename, x, y);
            return None;
        }
        let tx = x / map.tile_width as i32;
        let ty = y / map.tile_height as i32;
        let Some(target) = map.layers.get(layer) else {
            error!("entity: insert: no layer {} to insert {} into", layer, filename);
            return None;
        };
        if target.tile(tx, ty).is_none() {
            error!("entity: insert: no tile at {},{} for {}", tx, ty, filename);
            return None;
        }

        let eid = self.next_eid;
        self.next_eid += 1;

        let coord = TileCoord { tx: tx as u32, ty: ty as u32 };
        let occupancy = match descriptor.init.mode {
            MovementMode::Tile => Occupancy::Tile(coord),
            MovementMode::Pixel => Occupancy::Pixel([Some(coord), None, None, None]),
        };

        self.entities.insert(
            eid,
            Entity {
                filename: filename.to_string(),
                eid,
                mode: descriptor.init.mode,
                x,
                y,
                layer,
                width: descriptor.init.width.unwrap_or(map.tile_width),
                height: descriptor.init.height.unwrap_or(map.tile_height),
                occupancy,
                on_kill: descriptor.on_kill_hook(),
            },
        );
        map.changed = true;

        info!("entity: inserted {} on layer {} at {},{}", filename, layer, x, y);

        if let Some(hook) = descriptor.on_insert_hook() {
            self.scripts.call(&hook.module, &hook.function, eid);
        }

        Some(eid)
    }

    /// Retrieve an entity by id.
    pub fn entity(&self, eid: u64) -> Option<&Entity> {
        self.entities.get(&eid)
    }

    pub fn entity_mut(&mut self, eid: u64) -> Option<&mut Entity> {
        self.entities.get_mut(&eid)
    }

    pub fn contains(&self, eid: u64) -> bool {
        self.entities.contains_key(&eid)
    }

    /// Retrieve the first entity at an exact pixel position.
    pub fn entity_at(&self, x: i32, y: i32) -> Option<&Entity> {
        self.entities.values().find(|e| e.x == x && e.y == y)
    }

    /// All entities on a layer, in ascending eid order so iteration stays
    /// stable across snapshots.
    pub fn layer(&self, layer: usize) -> Vec<&Entity> {
        self.entities.values().filter(|e| e.layer == layer).collect()
    }

    /// Bind the persistent player reference to a live entity.
    pub fn set_player(&mut self, eid: u64) -> bool {
        if !self.entities.contains_key(&eid) {
            warn!("entity: set_player: no entity {}", eid);
            return false;
        }
        self.player = Some(eid);
        true
    }

    pub fn player(&self) -> Option<&Entity> {
        self.player.and_then(|eid| self.entities.get(&eid))
    }

    /// Kill an entity by id, invoking its on-kill hook first.
    pub fn kill(&mut self, eid: u64, map: &mut Tilemap) -> bool {
        if !self.entities.contains_key(&eid) {
            warn!("entity: kill: attempt to kill nonexistent entity {}", eid);
            return false;
        }
        self.kill_live(eid);
        map.changed = true;
        true
    }

    /// Kill every entity inserted from `filename`. Fails (logs, returns
    /// false) if none match; otherwise all matches are torn down exactly
    /// like `kill` and others are untouched.
    pub fn killall(&mut self, filename: &str, map: &mut Tilemap) -> bool {
        let to_kill: Vec<u64> = self
            .entities
            .values()
            .filter(|e| e.filename == filename)
            .map(|e| e.eid)
            .collect();

        if to_kill.is_empty() {
            warn!("entity: killall: no entities inserted from {}", filename);
            return false;
        }

        for eid in to_kill {
            self.kill_live(eid);
        }
        map.changed = true;
        true
    }

    fn kill_live(&mut self, eid: u64) {
        if let Some(hook) = self.entities.get(&eid).and_then(|e| e.on_kill.clone()) {
            self.scripts.call(&hook.module, &hook.function, eid);
        }
        self.entities.remove(&eid);
        if self.player == Some(eid) {
            self.player = None;
        }
    }

    /// Register the collision callback. One callback; later registrations
    /// replace earlier ones.
    pub fn register_collision_callback(
        &mut self,
        callback: impl FnMut(&Entity, Collider<'_>) + 'static,
    ) {
        self.collider = Some(Box::new(callback));
    }

    /// Notify the collision callback, if set, that entity `a` collided
    /// with entity or tile `b`. Always reports success; missing
    /// participants are logged and skipped.
    pub fn collision(&mut self, a: u64, b: Contact, map: &Tilemap) -> bool {
        let Some(mut callback) = self.collider.take() else {
            return true;
        };

        let notified = (|| {
            let first = self.entities.get(&a)?;
            match b {
                Contact::Entity(eid) => callback(first, Collider::Entity(self.entities.get(&eid)?)),
                Contact::Tile { layer, tx, ty } => {
                    callback(first, Collider::Tile(map.layers.get(layer)?.tile(tx, ty)?));
                }
            }
            Some(())
        })();
        if notified.is_none() {
            warn!("entity: collision: participant not found");
        }

        self.collider = Some(callback);
        true
    }

    /// Drop every entity without running hooks. Manager teardown path.
    pub fn terminate(&mut self) {
        self.entities.clear();
        self.player = None;
    }

    pub fn count(&self) -> usize {
        self.entities.len()
    }
}
