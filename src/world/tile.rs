//! The tile: one cell of a layer's grid.
//!
//! Geometry (source/destination rectangles) is derived once from the tile's
//! sequence index and its tileset; gameplay semantics (walkability, exits,
//! spawn triggers) are merged in afterwards by the overlay pass and kept
//! both as the raw string property bag and as typed rules.

use std::collections::HashMap;

use crate::rect::Rect;
use crate::world::tileset::Tileset;

/// The exit trigger family. `Default` fires on step, the directional kinds
/// fire when the tile is left in that direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitKind {
    Default,
    Up,
    Down,
    Left,
    Right,
}

impl ExitKind {
    pub const ALL: [ExitKind; 5] = [
        ExitKind::Default,
        ExitKind::Up,
        ExitKind::Down,
        ExitKind::Left,
        ExitKind::Right,
    ];

    /// The property key map authors write for this exit kind.
    pub fn property_key(self) -> &'static str {
        match self {
            ExitKind::Default => "exit",
            ExitKind::Up => "exit:up",
            ExitKind::Down => "exit:down",
            ExitKind::Left => "exit:left",
            ExitKind::Right => "exit:right",
        }
    }
}

/// A resolved exit destination: area file, layer, and tile coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exit {
    pub area: String,
    pub layer: i32,
    pub x: i32,
    pub y: i32,
}

/// One destination coordinate field of an exit property: either a literal,
/// or a wide-exit base (`"5+"`) that fans out across the object region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCoord {
    At(i32),
    Fan(i32),
}

/// An exit property value as written, before wide-exit expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitSpec {
    pub area: String,
    pub layer: i32,
    pub x: ExitCoord,
    pub y: ExitCoord,
}

#[derive(Debug)]
pub enum ExitParseError {
    /// Not exactly four comma-separated fields.
    FieldCount(usize),
    /// A numeric field did not parse.
    Number(String),
    /// Both x and y were marked wide; wide exits are direction-exclusive.
    TwoWideAxes,
}

impl std::fmt::Display for ExitParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitParseError::FieldCount(n) => {
                write!(f, "expected 4 fields (area,layer,x,y), got {}", n)
            }
            ExitParseError::Number(s) => write!(f, "invalid number \"{}\"", s),
            ExitParseError::TwoWideAxes => {
                write!(f, "cannot have multi-directional wide exits")
            }
        }
    }
}

impl std::error::Error for ExitParseError {}

impl ExitSpec {
    /// Parse an `area,layer,x,y` exit property. The x or y field (not both)
    /// may carry a trailing `+` marking a wide exit.
    pub fn parse(raw: &str) -> Result<Self, ExitParseError> {
        let fields: Vec<&str> = raw.split(',').map(str::trim).collect();
        if fields.len() != 4 {
            return Err(ExitParseError::FieldCount(fields.len()));
        }
        let layer = fields[1]
            .parse::<i32>()
            .map_err(|_| ExitParseError::Number(fields[1].to_string()))?;
        let x = Self::parse_coord(fields[2])?;
        let y = Self::parse_coord(fields[3])?;
        if matches!((x, y), (ExitCoord::Fan(_), ExitCoord::Fan(_))) {
            return Err(ExitParseError::TwoWideAxes);
        }
        Ok(Self {
            area: fields[0].to_string(),
            layer,
            x,
            y,
        })
    }

    fn parse_coord(field: &str) -> Result<ExitCoord, ExitParseError> {
        let (digits, wide) = match field.strip_suffix('+') {
            Some(rest) => (rest, true),
            None => (field, false),
        };
        let value = digits
            .parse::<i32>()
            .map_err(|_| ExitParseError::Number(field.to_string()))?;
        Ok(if wide {
            ExitCoord::Fan(value)
        } else {
            ExitCoord::At(value)
        })
    }
}

/// An entity auto-spawn trigger parsed from a `template,layer,x,y` property.
/// The overlay pass collects these; the caller forwards them to the entity
/// manager exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub template: String,
    pub layer: usize,
    pub x: i32,
    pub y: i32,
}

impl SpawnRequest {
    pub fn parse(raw: &str) -> Option<Self> {
        let fields: Vec<&str> = raw.split(',').map(str::trim).collect();
        if fields.len() != 4 {
            return None;
        }
        Some(Self {
            template: fields[0].to_string(),
            layer: fields[1].parse().ok()?,
            x: fields[2].parse().ok()?,
            y: fields[3].parse().ok()?,
        })
    }
}

/// A gameplay rule derived for one tile during the overlay-merge pass.
/// This is the typed face of the string property bag: queries match on
/// these instead of re-parsing property values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileRule {
    /// Whether the tile can be walked on.
    Walkability(bool),
    /// Stepping off this tile (in the kind's direction) changes area.
    Exit(ExitKind, Exit),
    /// Processing this tile requested an entity insertion.
    EntitySpawn(SpawnRequest),
    /// A custom trigger in canonical `event -> handler` form.
    Custom(String, String),
}

/// Interpret a property value as a flag. Empty, `"0"` and `"false"` are
/// false; anything else present is true.
pub(crate) fn parse_flag(value: &str) -> bool {
    !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("false"))
}

/// One cell of a layer.
///
/// Tiles live in their layer's arena and are addressed by sequence index or
/// grid coordinates everywhere else; nothing holds a tile reference across
/// a layer rebuild.
#[derive(Debug, Clone)]
pub struct Tile {
    /// Position in the layer's linear arena.
    pub seq: usize,
    /// Index of the owning tileset in the map's tileset list. None = empty.
    pub tileset: Option<usize>,
    /// Global graphic id. None = empty tile.
    pub gid: Option<u32>,
    /// Graphic id relative to the owning tileset.
    pub local_gid: Option<u32>,
    /// Tile-space x coordinate, `seq % layer_width`.
    pub tx: u32,
    /// Tile-space y coordinate, `seq / layer_width`.
    pub ty: u32,
    /// Graphic region within the tileset image.
    pub src_rect: Option<Rect>,
    /// Placement region within the layer's pixel grid.
    pub dst_rect: Option<Rect>,
    /// Merged string properties (tileset defaults, then overlay regions).
    pub properties: HashMap<String, String>,
    /// Tri-state walkability: None until some region sets `nowalk`.
    pub nowalk: Option<bool>,
    /// Exit triggers by kind.
    pub exits: HashMap<ExitKind, Exit>,
    /// Typed rules built during the overlay-merge pass.
    pub rules: Vec<TileRule>,
}

impl Tile {
    /// Build a tile bound to a tileset graphic.
    pub fn new(
        seq: usize,
        layer_width: u32,
        tileset_index: usize,
        tileset: &Tileset,
        gid: u32,
    ) -> Self {
        let tx = (seq as u32) % layer_width;
        let ty = (seq as u32) / layer_width;
        let local = tileset.local_gid(gid);
        let gx = (local % tileset.columns) as i32;
        let gy = (local / tileset.columns) as i32;
        let tw = tileset.tile_width as i32;
        let th = tileset.tile_height as i32;
        let spacing = tileset.spacing as i32;

        Self {
            seq,
            tileset: Some(tileset_index),
            gid: Some(gid),
            local_gid: Some(local),
            tx,
            ty,
            src_rect: Some(Rect::new(
                gx * (tw + spacing),
                gy * (th + spacing),
                tw,
                th,
            )),
            dst_rect: Some(Rect::new(tx as i32 * tw, ty as i32 * th, tw, th)),
            properties: tileset
                .default_properties(local)
                .cloned()
                .unwrap_or_default(),
            nowalk: None,
            exits: HashMap::new(),
            rules: Vec::new(),
        }
    }

    /// Build an empty tile: no graphic, no geometry, no properties.
    pub fn empty(seq: usize, layer_width: u32) -> Self {
        Self {
            seq,
            tileset: None,
            gid: None,
            local_gid: None,
            tx: (seq as u32) % layer_width,
            ty: (seq as u32) / layer_width,
            src_rect: None,
            dst_rect: None,
            properties: HashMap::new(),
            nowalk: None,
            exits: HashMap::new(),
            rules: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.gid.is_none()
    }

    /// Whether the tile can be stepped on. Unset walkability counts as
    /// walkable.
    pub fn walkable(&self) -> bool {
        !self.nowalk.unwrap_or(false)
    }

    pub fn exit(&self, kind: ExitKind) -> Option<&Exit> {
        self.exits.get(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tileset() -> Tileset {
        Tileset {
            name: "terrain".into(),
            first_gid: 1,
            last_gid: 65,
            columns: 8,
            tile_width: 16,
            tile_height: 16,
            spacing: 0,
            tile_properties: HashMap::new(),
        }
    }

    #[test]
    fn test_geometry_from_seq() {
        // Layer 10 wide, seq 23 -> tile (3, 2); gid 10 -> local 9 -> sheet (1, 1)
        let ts = tileset();
        let tile = Tile::new(23, 10, 0, &ts, 10);
        assert_eq!((tile.tx, tile.ty), (3, 2));
        assert_eq!(tile.local_gid, Some(9));
        assert_eq!(tile.src_rect, Some(Rect::new(16, 16, 16, 16)));
        assert_eq!(tile.dst_rect, Some(Rect::new(48, 32, 16, 16)));
    }

    #[test]
    fn test_spacing_offsets_source_rect() {
        let mut ts = tileset();
        ts.spacing = 2;
        let tile = Tile::new(0, 10, 0, &ts, 10);
        assert_eq!(tile.src_rect, Some(Rect::new(18, 18, 16, 16)));
    }

    #[test]
    fn test_empty_tile_has_no_geometry() {
        let tile = Tile::empty(7, 5);
        assert!(tile.is_empty());
        assert_eq!((tile.tx, tile.ty), (2, 1));
        assert!(tile.src_rect.is_none());
        assert!(tile.dst_rect.is_none());
        assert!(tile.properties.is_empty());
        assert!(tile.walkable());
    }

    #[test]
    fn test_exit_spec_parse() {
        let spec = ExitSpec::parse("town,0,5,5").unwrap();
        assert_eq!(spec.x, ExitCoord::At(5));
        assert_eq!(spec.y, ExitCoord::At(5));

        let wide = ExitSpec::parse("town,0,12+,5").unwrap();
        assert_eq!(wide.x, ExitCoord::Fan(12));
        assert_eq!(wide.y, ExitCoord::At(5));
    }

    #[test]
    fn test_exit_spec_rejects_malformed() {
        assert!(matches!(
            ExitSpec::parse("town,0,5"),
            Err(ExitParseError::FieldCount(3))
        ));
        assert!(matches!(
            ExitSpec::parse("town,zero,5,5"),
            Err(ExitParseError::Number(_))
        ));
        assert!(matches!(
            ExitSpec::parse("town,0,5+,5+"),
            Err(ExitParseError::TwoWideAxes)
        ));
    }

    #[test]
    fn test_spawn_request_parse() {
        let req = SpawnRequest::parse("npc/guard.json,1,32,48").unwrap();
        assert_eq!(req.template, "npc/guard.json");
        assert_eq!((req.layer, req.x, req.y), (1, 32, 48));
        assert!(SpawnRequest::parse("npc.json,1,32").is_none());
        assert!(SpawnRequest::parse("npc.json,one,32,48").is_none());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("true"));
        assert!(!parse_flag(""));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("false"));
    }
}
