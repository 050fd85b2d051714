//! Backend resource table
//!
//! Vertex buffers, index buffers and textures live here, keyed by
//! generated IDs. Meshes and the pipeline only hold the IDs.

use slotmap::{new_key_type, SlotMap};

use crate::error::{EngineError, Result};
use crate::rasterizer::Texture;

new_key_type! {
    pub struct BufferId;
    pub struct TextureId;
}

/// One vertex attribute inside an interleaved record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub slot: u32,
    pub components: usize,
    pub offset_bytes: usize,
}

/// Interleaved float vertex layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride_bytes: usize,
    pub attributes: &'static [VertexAttribute],
}

pub const SLOT_POSITION: u32 = 0;
pub const SLOT_NORMAL: u32 = 1;
pub const SLOT_UV: u32 = 2;

impl VertexLayout {
    /// Position (3), normal (3), UV (2)
    pub const POSITION_NORMAL_UV: VertexLayout = VertexLayout {
        stride_bytes: 32,
        attributes: &[
            VertexAttribute { slot: SLOT_POSITION, components: 3, offset_bytes: 0 },
            VertexAttribute { slot: SLOT_NORMAL, components: 3, offset_bytes: 12 },
            VertexAttribute { slot: SLOT_UV, components: 2, offset_bytes: 24 },
        ],
    };

    pub const POSITION: VertexLayout = VertexLayout {
        stride_bytes: 12,
        attributes: &[VertexAttribute { slot: SLOT_POSITION, components: 3, offset_bytes: 0 }],
    };

    /// Position (3), UV (2) with UV bound to the UV slot
    pub const POSITION_UV: VertexLayout = VertexLayout {
        stride_bytes: 20,
        attributes: &[
            VertexAttribute { slot: SLOT_POSITION, components: 3, offset_bytes: 0 },
            VertexAttribute { slot: SLOT_UV, components: 2, offset_bytes: 12 },
        ],
    };

    pub fn floats_per_vertex(&self) -> usize {
        self.stride_bytes / std::mem::size_of::<f32>()
    }

    pub fn attribute(&self, slot: u32) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.slot == slot)
    }

    /// Read up to 3 floats of `slot` from record `index` (missing components are 0)
    pub fn fetch(&self, data: &[f32], index: usize, slot: u32) -> Option<[f32; 3]> {
        let attr = self.attribute(slot)?;
        let start = index * self.floats_per_vertex() + attr.offset_bytes / std::mem::size_of::<f32>();
        let src = data.get(start..start + attr.components)?;
        let mut out = [0.0; 3];
        out[..src.len().min(3)].copy_from_slice(&src[..src.len().min(3)]);
        Some(out)
    }
}

#[derive(Debug, Clone)]
pub struct VertexBuffer {
    pub data: Vec<f32>,
    pub layout: VertexLayout,
}

impl VertexBuffer {
    pub fn record_count(&self) -> usize {
        self.data.len() / self.layout.floats_per_vertex()
    }
}

#[derive(Debug, Clone)]
enum Buffer {
    Vertex(VertexBuffer),
    Index(Vec<u32>),
}

/// Arena of backend resources
#[derive(Default)]
pub struct ResourceTable {
    buffers: SlotMap<BufferId, Buffer>,
    textures: SlotMap<TextureId, Texture>,
    /// Maximum number of live buffers + textures, `None` for unbounded
    capacity: Option<usize>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table that refuses allocations once `limit` resources are live
    pub fn with_capacity_limit(limit: usize) -> Self {
        Self { capacity: Some(limit), ..Self::default() }
    }

    pub fn live_resources(&self) -> usize {
        self.buffers.len() + self.textures.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    fn check_capacity(&self, what: &str) -> Result<()> {
        match self.capacity {
            Some(limit) if self.live_resources() >= limit => Err(EngineError::ResourceAllocation(format!(
                "{}: resource table full ({} live)",
                what, limit
            ))),
            _ => Ok(()),
        }
    }

    fn copy_into<T: Copy>(what: &str, src: &[T]) -> Result<Vec<T>> {
        let mut dst = Vec::new();
        dst.try_reserve_exact(src.len())
            .map_err(|e| EngineError::ResourceAllocation(format!("{}: {}", what, e)))?;
        dst.extend_from_slice(src);
        Ok(dst)
    }

    pub fn create_vertex_buffer(&mut self, layout: VertexLayout, data: &[f32]) -> Result<BufferId> {
        self.check_capacity("vertex buffer")?;
        let data = Self::copy_into("vertex buffer", data)?;
        let id = self.buffers.insert(Buffer::Vertex(VertexBuffer { data, layout }));
        log::debug!("created vertex buffer {:?} ({} bytes stride)", id, layout.stride_bytes);
        Ok(id)
    }

    pub fn create_index_buffer(&mut self, indices: &[u32]) -> Result<BufferId> {
        self.check_capacity("index buffer")?;
        let data = Self::copy_into("index buffer", indices)?;
        let id = self.buffers.insert(Buffer::Index(data));
        log::debug!("created index buffer {:?} ({} indices)", id, indices.len());
        Ok(id)
    }

    pub fn register_texture(&mut self, texture: Texture) -> Result<TextureId> {
        self.check_capacity("texture")?;
        log::debug!("registered texture {} ({}x{})", texture.name, texture.width, texture.height);
        Ok(self.textures.insert(texture))
    }

    pub fn vertex_buffer(&self, id: BufferId) -> Option<&VertexBuffer> {
        match self.buffers.get(id)? {
            Buffer::Vertex(vb) => Some(vb),
            Buffer::Index(_) => None,
        }
    }

    pub fn index_buffer(&self, id: BufferId) -> Option<&[u32]> {
        match self.buffers.get(id)? {
            Buffer::Index(ib) => Some(ib),
            Buffer::Vertex(_) => None,
        }
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id)
    }

    /// Returns false if the buffer was already released
    pub fn release_buffer(&mut self, id: BufferId) -> bool {
        self.buffers.remove(id).is_some()
    }

    pub fn release_texture(&mut self, id: TextureId) -> bool {
        self.textures.remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_limit_refuses_allocation() {
        let mut table = ResourceTable::with_capacity_limit(1);
        assert!(table.create_index_buffer(&[0, 1, 2]).is_ok());
        let err = table.create_vertex_buffer(VertexLayout::POSITION, &[0.0; 9]);
        assert!(matches!(err, Err(EngineError::ResourceAllocation(_))));
        assert_eq!(table.live_resources(), 1);
    }

    #[test]
    fn test_release_invalidates_id() {
        let mut table = ResourceTable::new();
        let id = table.create_vertex_buffer(VertexLayout::POSITION, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(table.vertex_buffer(id).map(|vb| vb.record_count()), Some(1));
        assert!(table.release_buffer(id));
        assert!(table.vertex_buffer(id).is_none());
        assert!(!table.release_buffer(id));
    }

    #[test]
    fn test_fetch_reads_interleaved_attribute() {
        let layout = VertexLayout::POSITION_NORMAL_UV;
        let data = [
            0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.25, 0.75,
            1.0, 2.0, 3.0, 0.0, 1.0, 0.0, 0.5, 0.5,
        ];
        assert_eq!(layout.fetch(&data, 1, SLOT_POSITION), Some([1.0, 2.0, 3.0]));
        assert_eq!(layout.fetch(&data, 0, SLOT_UV), Some([0.25, 0.75, 0.0]));
        assert_eq!(layout.fetch(&data, 2, SLOT_POSITION), None);
        assert_eq!(VertexLayout::POSITION.fetch(&data, 0, SLOT_UV), None);
    }
}
