//! World configuration file
//!
//! A level editor exports the trigger boxes, waypoints and waypoint links of
//! a level as one flat little-endian file:
//!
//! ```text
//! u32 trigger_box_count; count × { u32 name_len; u8[name_len] name; f32[3] centre; f32[3] size }
//! u32 way_point_count;   count × { u32 id; f32[3] centre; f32 radius }
//! u32 link_count;        count × { u32 from; u32 to }
//! ```

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use thiserror::Error;

use crate::ai::waypoint::{WayPoint, WayPointLink};
use crate::foundation::binary::{is_truncation, BinaryReader, BinaryWriter};
use crate::foundation::math::Vec3;
use crate::world::entity::Size;

/// Longest trigger box name accepted
pub const MAX_NAME_LEN: u32 = 256;

/// Errors raised while reading a world configuration file
#[derive(Error, Debug)]
pub enum WorldConfigError {
    /// Underlying IO failure
    #[error("IO error: {0}")]
    Io(io::Error),

    /// File ended in the middle of a record
    #[error("World configuration file is truncated")]
    Truncated,

    /// Trigger box name is not UTF-8 or is too long
    #[error("Invalid trigger box name: {0}")]
    InvalidName(String),
}

impl From<io::Error> for WorldConfigError {
    fn from(error: io::Error) -> Self {
        if is_truncation(&error) {
            Self::Truncated
        } else {
            Self::Io(error)
        }
    }
}

/// One trigger box placed in the level
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerBoxConfig {
    /// Name, also used as the box's entity type
    pub name: String,
    /// Box centre
    pub centre: Vec3,
    /// Full extents
    pub size: Size,
}

/// Contents of a world configuration file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldConfiguration {
    /// Trigger boxes in file order
    pub trigger_boxes: Vec<TriggerBoxConfig>,
    /// Waypoints with their ids
    pub way_points: Vec<(u32, WayPoint)>,
    /// Directed waypoint links
    pub links: Vec<WayPointLink>,
}

impl WorldConfiguration {
    /// Load a world configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WorldConfigError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load a world configuration file, or an empty one if it cannot be read
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => {
                log::info!(
                    "Loaded world configuration {} ({} trigger boxes, {} waypoints, {} links)",
                    path.display(),
                    config.trigger_boxes.len(),
                    config.way_points.len(),
                    config.links.len()
                );
                config
            }
            Err(e) => {
                log::warn!("Using empty world configuration, could not load {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse a world configuration stream
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, WorldConfigError> {
        let mut reader = BinaryReader::new(reader);
        let mut config = Self::default();

        for _ in 0..reader.read_u32()? {
            let name_len = reader.read_u32()?;
            if name_len > MAX_NAME_LEN {
                return Err(WorldConfigError::InvalidName(format!("name of {name_len} bytes")));
            }
            let bytes = reader.read_bytes(name_len as usize)?;
            let name = String::from_utf8(bytes).map_err(|e| WorldConfigError::InvalidName(e.to_string()))?;
            let centre = reader.read_vec3()?;
            let extents = reader.read_vec3()?;
            config.trigger_boxes.push(TriggerBoxConfig {
                name,
                centre,
                size: Size::new(extents.x, extents.y, extents.z),
            });
        }

        for _ in 0..reader.read_u32()? {
            let id = reader.read_u32()?;
            let centre = reader.read_vec3()?;
            let radius = reader.read_f32()?;
            config.way_points.push((id, WayPoint::new(centre, radius)));
        }

        for _ in 0..reader.read_u32()? {
            let from = reader.read_u32()?;
            let to = reader.read_u32()?;
            config.links.push(WayPointLink::new(from, to));
        }

        log::debug!("World configuration parsed: {} bytes", reader.offset());
        Ok(config)
    }

    /// Write the configuration in file form
    pub fn write_to<W: Write>(&self, writer: W) -> io::Result<()> {
        let mut writer = BinaryWriter::new(writer);

        writer.write_u32(count(self.trigger_boxes.len())?)?;
        for trigger_box in &self.trigger_boxes {
            let name = trigger_box.name.as_bytes();
            writer.write_u32(count(name.len())?)?;
            writer.write_bytes(name)?;
            writer.write_vec3(&trigger_box.centre)?;
            let size = &trigger_box.size;
            writer.write_vec3(&Vec3::new(size.width, size.height, size.depth))?;
        }

        writer.write_u32(count(self.way_points.len())?)?;
        for (id, way_point) in &self.way_points {
            writer.write_u32(*id)?;
            writer.write_vec3(&way_point.centre)?;
            writer.write_f32(way_point.radius)?;
        }

        writer.write_u32(count(self.links.len())?)?;
        for link in &self.links {
            writer.write_u32(link.from)?;
            writer.write_u32(link.to)?;
        }
        Ok(())
    }

    /// Write the configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), WorldConfigError> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

fn count(len: usize) -> io::Result<u32> {
    u32::try_from(len).map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many records"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn arena() -> WorldConfiguration {
        WorldConfiguration {
            trigger_boxes: vec![TriggerBoxConfig {
                name: "FlagZone".to_string(),
                centre: Vec3::new(4.0, 1.0, 0.0),
                size: Size::new(2.0, 2.0, 2.0),
            }],
            way_points: vec![
                (0, WayPoint::new(Vec3::new(0.0, 0.0, 0.0), 0.5)),
                (1, WayPoint::new(Vec3::new(5.0, 0.0, 0.0), 0.5)),
            ],
            links: vec![WayPointLink::new(0, 1), WayPointLink::new(1, 0)],
        }
    }

    #[test]
    fn test_file_layout() {
        let mut bytes = Vec::new();
        arena().write_to(&mut bytes).unwrap();

        assert_eq!(&bytes[0..4], &1u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &8u32.to_le_bytes());
        assert_eq!(&bytes[8..16], b"FlagZone");
        // 4 + (4 + 8 + 24) + 4 + 2 * 20 + 4 + 2 * 8
        assert_eq!(bytes.len(), 104);
    }

    #[test]
    fn test_parses_what_the_editor_writes() {
        let mut bytes = Vec::new();
        arena().write_to(&mut bytes).unwrap();

        let parsed = WorldConfiguration::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(parsed.trigger_boxes[0].name, "FlagZone");
        assert_eq!(parsed.way_points[1].1.centre, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(parsed.links, vec![WayPointLink::new(0, 1), WayPointLink::new(1, 0)]);
    }

    #[test]
    fn test_empty_sections() {
        let bytes = [0u8; 12];
        let parsed = WorldConfiguration::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(parsed, WorldConfiguration::default());
    }

    #[test]
    fn test_truncated_file_is_rejected() {
        let mut bytes = Vec::new();
        arena().write_to(&mut bytes).unwrap();
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            WorldConfiguration::from_reader(Cursor::new(bytes)),
            Err(WorldConfigError::Truncated)
        ));
    }

    #[test]
    fn test_bad_names_are_rejected() {
        let mut bytes = 1u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&[0xff, 0xfe]);
        assert!(matches!(
            WorldConfiguration::from_reader(Cursor::new(bytes)),
            Err(WorldConfigError::InvalidName(_))
        ));

        let mut bytes = 1u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            WorldConfiguration::from_reader(Cursor::new(bytes)),
            Err(WorldConfigError::InvalidName(_))
        ));
    }

    #[test]
    fn test_missing_file_degrades_to_empty() {
        let config = WorldConfiguration::load_or_empty("no/such/world.cfg");
        assert_eq!(config, WorldConfiguration::default());
    }
}
