//! Octree of level triangles
//!
//! The octree is built offline, stored in a binary file and loaded once.
//! Every node keeps a run `[start, start + count)` into one triangle array
//! owned by the tree, so geometry is never duplicated across levels. After
//! load the tree is immutable and only answers "which triangles could this
//! segment touch" queries; the exact segment/triangle test happens in the
//! collision engine.
//!
//! # File format
//!
//! Little-endian. A header `b"OCTR"` + `u32` version, then the root node:
//!
//! ```text
//! f32 half_size; f32[3] max_corner; u32 triangle_count; u8 has_children;
//! triangle_count x { f32[9] vertices; u32 tag }
//! if has_children: 8 x { f32 marker; 0.0 = no child,
//!                        otherwise marker is the child's half_size
//!                        and the rest of the child record follows }
//! ```

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use thiserror::Error;

use crate::foundation::binary::{is_truncation, BinaryReader, BinaryWriter};
use crate::foundation::math::Vec3;
use crate::physics::collision::primitives::{Segment, TaggedTriangle, Triangle, AABB};

/// File magic
pub const OCTREE_MAGIC: [u8; 4] = *b"OCTR";

/// Current file version
pub const OCTREE_VERSION: u32 = 1;

/// Deepest nesting accepted from a file
pub const MAX_LOAD_DEPTH: u32 = 32;

/// Octree loading errors
#[derive(Error, Debug)]
pub enum OctreeError {
    /// Underlying IO failure
    #[error("IO error: {0}")]
    Io(io::Error),

    /// File does not start with the octree magic
    #[error("Not an octree file (magic {0:?})")]
    BadMagic([u8; 4]),

    /// File version is not understood
    #[error("Unsupported octree version {0}")]
    UnsupportedVersion(u32),

    /// File ended in the middle of a record
    #[error("Octree file truncated")]
    Truncated,

    /// Node size is not a finite non-zero number
    #[error("Invalid node half size {0}")]
    InvalidHalfSize(f32),

    /// Node nesting exceeds [`MAX_LOAD_DEPTH`]
    #[error("Octree nesting deeper than {MAX_LOAD_DEPTH}")]
    TooDeep,
}

impl From<io::Error> for OctreeError {
    fn from(error: io::Error) -> Self {
        if is_truncation(&error) {
            Self::Truncated
        } else {
            Self::Io(error)
        }
    }
}

/// Single node in the octree hierarchy
#[derive(Debug, Clone)]
pub struct OctreeNode {
    /// World-space bounds of this node
    pub bounds: AABB,

    /// Half the edge length of the node cube
    pub half_size: f32,

    /// First triangle of this node in the shared array
    start: usize,

    /// Number of triangles owned by this node
    count: usize,

    /// Child octants, absent children are `None`
    children: [Option<Box<OctreeNode>>; 8],

    /// Depth in the tree (0 = root)
    pub depth: u32,
}

impl OctreeNode {
    fn new(max_corner: Vec3, half_size: f32, depth: u32) -> Self {
        Self {
            bounds: AABB::from_max_corner(max_corner, half_size),
            half_size,
            start: 0,
            count: 0,
            children: Default::default(),
            depth,
        }
    }

    /// Range of this node's triangles in the shared array
    pub fn triangle_range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.count
    }

    /// Check if this node is a leaf (has no children)
    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    /// Present child nodes
    pub fn children(&self) -> impl Iterator<Item = &OctreeNode> {
        self.children.iter().filter_map(|child| child.as_deref())
    }

    /// Append triangles of every node whose box the segment overlaps
    fn collect_segment(&self, segment: &Segment, triangles: &[TaggedTriangle], results: &mut Vec<TaggedTriangle>) {
        if !self.bounds.overlaps_segment(segment) {
            return;
        }

        if let Some(owned) = triangles.get(self.triangle_range()) {
            results.extend_from_slice(owned);
        }

        for child in self.children() {
            child.collect_segment(segment, triangles, results);
        }
    }

    /// Get all nodes in pre-order (for visualization)
    fn collect_nodes<'a>(&'a self, nodes: &mut Vec<&'a OctreeNode>) {
        nodes.push(self);
        for child in self.children() {
            child.collect_nodes(nodes);
        }
    }

    fn read<R: Read>(
        reader: &mut BinaryReader<R>,
        half_size: f32,
        depth: u32,
        triangles: &mut Vec<TaggedTriangle>,
    ) -> Result<Self, OctreeError> {
        if depth > MAX_LOAD_DEPTH {
            return Err(OctreeError::TooDeep);
        }
        if !half_size.is_finite() || half_size == 0.0 {
            return Err(OctreeError::InvalidHalfSize(half_size));
        }

        let max_corner = reader.read_vec3()?;
        let count = reader.read_u32()? as usize;
        let has_children = reader.read_u8()? != 0;

        let mut node = Self::new(max_corner, half_size, depth);
        node.start = triangles.len();
        node.count = count;
        for _ in 0..count {
            let triangle = Triangle::new(reader.read_vec3()?, reader.read_vec3()?, reader.read_vec3()?);
            let tag = reader.read_u32()?;
            triangles.push(TaggedTriangle::new(triangle, tag));
        }

        if has_children {
            for slot in &mut node.children {
                let marker = reader.read_f32()?;
                if marker != 0.0 {
                    *slot = Some(Box::new(Self::read(reader, marker, depth + 1, triangles)?));
                }
            }
        }

        Ok(node)
    }

    fn write<W: Write>(&self, writer: &mut BinaryWriter<W>, triangles: &[TaggedTriangle]) -> io::Result<()> {
        writer.write_f32(self.half_size)?;
        writer.write_vec3(&self.bounds.max)?;
        let owned = triangles.get(self.triangle_range()).unwrap_or(&[]);
        writer.write_u32(u32::try_from(owned.len()).unwrap_or(u32::MAX))?;
        writer.write_u8(u8::from(!self.is_leaf()))?;

        for tagged in owned {
            writer.write_vec3(&tagged.triangle.v0)?;
            writer.write_vec3(&tagged.triangle.v1)?;
            writer.write_vec3(&tagged.triangle.v2)?;
            writer.write_u32(tagged.tag)?;
        }

        if !self.is_leaf() {
            for child in &self.children {
                match child {
                    Some(child) => child.write(writer, triangles)?,
                    None => writer.write_f32(0.0)?,
                }
            }
        }
        Ok(())
    }
}

/// Node under construction, before triangles are flattened
struct BuildNode {
    bounds: AABB,
    triangles: Vec<TaggedTriangle>,
    children: [Option<Box<BuildNode>>; 8],
}

impl BuildNode {
    fn new(bounds: AABB) -> Self {
        Self {
            bounds,
            triangles: Vec::new(),
            children: Default::default(),
        }
    }

    /// Bounds of octant `index` (bit 0 = +x, bit 1 = +y, bit 2 = +z)
    fn octant_bounds(&self, index: usize) -> AABB {
        let center = self.bounds.center();
        let quarter = self.bounds.extents() * 0.5;
        let sign = |bit: usize| if index & bit != 0 { 1.0 } else { -1.0 };
        let child_center = Vec3::new(
            center.x + quarter.x * sign(1),
            center.y + quarter.y * sign(2),
            center.z + quarter.z * sign(4),
        );
        AABB::from_center_extents(child_center, quarter)
    }

    /// Push a triangle into the deepest octant that fully contains it
    fn insert(&mut self, tagged: TaggedTriangle, depth: u32, max_depth: u32) {
        if depth < max_depth {
            let bounds = tagged.triangle.bounds();
            for index in 0..8 {
                let octant = self.octant_bounds(index);
                if octant.contains_point(bounds.min) && octant.contains_point(bounds.max) {
                    let child = self.children[index].get_or_insert_with(|| Box::new(BuildNode::new(octant)));
                    child.insert(tagged, depth + 1, max_depth);
                    return;
                }
            }
        }
        self.triangles.push(tagged);
    }

    fn flatten(self, depth: u32, triangles: &mut Vec<TaggedTriangle>) -> OctreeNode {
        let half_size = self.bounds.extents().x;
        let mut node = OctreeNode::new(self.bounds.max, half_size, depth);
        node.start = triangles.len();
        node.count = self.triangles.len();
        triangles.extend(self.triangles);

        for (slot, child) in node.children.iter_mut().zip(self.children) {
            *slot = child.map(|child| Box::new(child.flatten(depth + 1, triangles)));
        }
        node
    }
}

/// Immutable octree of tagged triangles
#[derive(Debug, Clone, Default)]
pub struct Octree {
    /// Root node, `None` when nothing was loaded
    root: Option<OctreeNode>,

    /// Triangles of every node, in pre-order
    triangles: Vec<TaggedTriangle>,
}

impl Octree {
    /// An empty tree; every query returns nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a tree over `triangles` inside a cube
    ///
    /// Each triangle is stored in the deepest octant that fully contains it,
    /// down to `max_depth` levels below the root.
    pub fn build(center: Vec3, half_size: f32, triangles: Vec<TaggedTriangle>, max_depth: u32) -> Self {
        let bounds = AABB::from_center_extents(center, Vec3::new(half_size, half_size, half_size));
        let mut root = BuildNode::new(bounds);
        for tagged in triangles {
            root.insert(tagged, 0, max_depth);
        }

        let mut flat = Vec::new();
        let root = root.flatten(0, &mut flat);
        Self {
            root: Some(root),
            triangles: flat,
        }
    }

    /// Load an octree file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, OctreeError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load an octree file, or an empty tree if it is missing or corrupt
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(tree) => {
                log::info!(
                    "Loaded octree {} ({} triangles)",
                    path.display(),
                    tree.triangle_count()
                );
                tree
            }
            Err(e) => {
                log::warn!("Octree {} unavailable, using no geometry: {}", path.display(), e);
                Self::empty()
            }
        }
    }

    /// Parse an octree from a byte stream
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, OctreeError> {
        let mut reader = BinaryReader::new(reader);

        let magic = reader.read_magic::<4>()?;
        if magic != OCTREE_MAGIC {
            return Err(OctreeError::BadMagic(magic));
        }
        let version = reader.read_u32()?;
        if version != OCTREE_VERSION {
            return Err(OctreeError::UnsupportedVersion(version));
        }

        let mut triangles = Vec::new();
        let root_half_size = reader.read_f32()?;
        let root = OctreeNode::read(&mut reader, root_half_size, 0, &mut triangles)?;
        log::debug!("Octree parsed: {} bytes, {} triangles", reader.offset(), triangles.len());

        Ok(Self {
            root: Some(root),
            triangles,
        })
    }

    /// Serialize the tree in the file format
    pub fn write_to<W: Write>(&self, writer: W) -> io::Result<()> {
        let mut writer = BinaryWriter::new(writer);
        writer.write_bytes(&OCTREE_MAGIC)?;
        writer.write_u32(OCTREE_VERSION)?;
        if let Some(root) = &self.root {
            root.write(&mut writer, &self.triangles)?;
        }
        Ok(())
    }

    /// Write the tree to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), OctreeError> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Append candidate triangles for the segment `start -> end`
    ///
    /// Nodes the segment does not overlap are pruned with their subtrees.
    pub fn triangles_in_segment(&self, start: Vec3, end: Vec3, results: &mut Vec<TaggedTriangle>) {
        if let Some(root) = &self.root {
            root.collect_segment(&Segment::new(start, end), &self.triangles, results);
        }
    }

    /// Root node, if anything was loaded
    pub fn root(&self) -> Option<&OctreeNode> {
        self.root.as_ref()
    }

    /// Triangles owned by `node`
    pub fn node_triangles(&self, node: &OctreeNode) -> &[TaggedTriangle] {
        self.triangles.get(node.triangle_range()).unwrap_or(&[])
    }

    /// All nodes in pre-order
    pub fn nodes(&self) -> Vec<&OctreeNode> {
        let mut nodes = Vec::new();
        if let Some(root) = &self.root {
            root.collect_nodes(&mut nodes);
        }
        nodes
    }

    /// Total triangle count
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Whether the tree holds no geometry
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Small triangle centred on `c`
    fn tri_at(c: Vec3, tag: u32) -> TaggedTriangle {
        TaggedTriangle::new(
            Triangle::new(
                c + Vec3::new(-0.2, 0.0, -0.2),
                c + Vec3::new(0.2, 0.0, -0.2),
                c + Vec3::new(0.0, 0.0, 0.2),
            ),
            tag,
        )
    }

    /// Root cube [-2, 2]^3 with eight one-level children, each owning one triangle
    fn eight_leaf_tree() -> Octree {
        let mut triangles = Vec::new();
        for index in 0..8u32 {
            let sign = |bit: u32| if index & bit != 0 { 1.0 } else { -1.0 };
            triangles.push(tri_at(Vec3::new(sign(1), sign(2), sign(4)), index));
        }
        Octree::build(Vec3::zeros(), 2.0, triangles, 1)
    }

    #[test]
    fn test_build_places_triangles_in_leaves() {
        let tree = eight_leaf_tree();
        let root = tree.root().unwrap();
        assert_eq!(root.triangle_range().len(), 0);
        assert_eq!(root.children().count(), 8);
        for child in root.children() {
            assert!(child.is_leaf());
            assert_eq!(tree.node_triangles(child).len(), 1);
        }
        assert_eq!(tree.nodes().len(), 9);
    }

    #[test]
    fn test_segment_outside_root_returns_nothing() {
        let tree = eight_leaf_tree();
        let mut out = Vec::new();
        tree.triangles_in_segment(Vec3::new(10.0, 10.0, 10.0), Vec3::new(12.0, 11.0, 10.0), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_segment_inside_one_leaf_returns_exactly_its_triangles() {
        let tree = eight_leaf_tree();
        let mut out = Vec::new();
        tree.triangles_in_segment(Vec3::new(-1.9, -1.9, -1.9), Vec3::new(-0.1, -0.1, -0.1), &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].tag, 0);
    }

    #[test]
    fn test_segment_across_octants_collects_each() {
        let tree = eight_leaf_tree();
        let mut out = Vec::new();
        tree.triangles_in_segment(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.5, -1.0, -1.0), &mut out);
        let mut tags: Vec<u32> = out.iter().map(|t| t.tag).collect();
        tags.sort_unstable();
        assert_eq!(tags, vec![0, 1]);
    }

    #[test]
    fn test_file_round_trip_preserves_shape() {
        let tree = eight_leaf_tree();
        let mut bytes = Vec::new();
        tree.write_to(&mut bytes).unwrap();

        let loaded = Octree::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(loaded.triangle_count(), 8);
        assert_eq!(loaded.nodes().len(), 9);

        let mut out = Vec::new();
        loaded.triangles_in_segment(Vec3::new(1.9, 1.9, 1.9), Vec3::new(0.1, 0.1, 0.1), &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].tag, 7);
    }

    #[test]
    fn test_absent_children_are_skipped() {
        let mut writer = BinaryWriter::new(Vec::new());
        writer.write_bytes(&OCTREE_MAGIC).unwrap();
        writer.write_u32(OCTREE_VERSION).unwrap();
        // root: half 2, max (2,2,2), no triangles, has children
        writer.write_f32(2.0).unwrap();
        writer.write_vec3(&Vec3::new(2.0, 2.0, 2.0)).unwrap();
        writer.write_u32(0).unwrap();
        writer.write_u8(1).unwrap();
        for slot in 0..8 {
            if slot == 7 {
                writer.write_f32(1.0).unwrap();
                writer.write_vec3(&Vec3::new(2.0, 2.0, 2.0)).unwrap();
                writer.write_u32(1).unwrap();
                writer.write_u8(0).unwrap();
                let tagged = tri_at(Vec3::new(1.0, 1.0, 1.0), 99);
                writer.write_vec3(&tagged.triangle.v0).unwrap();
                writer.write_vec3(&tagged.triangle.v1).unwrap();
                writer.write_vec3(&tagged.triangle.v2).unwrap();
                writer.write_u32(tagged.tag).unwrap();
            } else {
                writer.write_f32(0.0).unwrap();
            }
        }

        let tree = Octree::from_reader(Cursor::new(writer.into_inner())).unwrap();
        let root = tree.root().unwrap();
        assert_eq!(root.children().count(), 1);
        assert_eq!(tree.triangle_count(), 1);
        let child = root.children().next().unwrap();
        assert_eq!(child.bounds.min, Vec3::zeros());
    }

    #[test]
    fn test_bad_files_are_rejected() {
        let err = Octree::from_reader(Cursor::new(b"NOPE\x01\0\0\0".to_vec())).unwrap_err();
        assert!(matches!(err, OctreeError::BadMagic(_)));

        let mut bytes = OCTREE_MAGIC.to_vec();
        bytes.extend_from_slice(&7u32.to_le_bytes());
        let err = Octree::from_reader(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, OctreeError::UnsupportedVersion(7)));

        let mut bytes = Vec::new();
        eight_leaf_tree().write_to(&mut bytes).unwrap();
        bytes.truncate(bytes.len() - 10);
        let err = Octree::from_reader(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, OctreeError::Truncated));
    }

    #[test]
    fn test_missing_file_degrades_to_empty_tree() {
        let tree = Octree::load_or_empty("no/such/level.oct");
        assert!(tree.is_empty());
        let mut out = Vec::new();
        tree.triangles_in_segment(Vec3::zeros(), Vec3::new(0.0, -1.0, 0.0), &mut out);
        assert!(out.is_empty());
    }
}
