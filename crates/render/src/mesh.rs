use crate::context::{SharedContext, release};
use lumen_common::{MeshId, Vertex, VertexLayout};
use std::fmt;

/// Uploaded vertex and index buffers in the position + uv layout. Owns its
/// handle; not `Clone`.
pub struct Mesh {
    id: MeshId,
    index_count: u32,
    context: SharedContext,
}

impl Mesh {
    pub fn new(context: &SharedContext, vertices: &[Vertex], indices: &[u32]) -> Self {
        let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(indices);
        let index_count = (index_bytes.len() / std::mem::size_of::<u32>()) as u32;

        let id = context
            .borrow_mut()
            .create_mesh(&VertexLayout::POSITION_UV, vertex_bytes, index_bytes);
        tracing::debug!(
            "created {id}: {} vertices, {index_count} indices",
            vertices.len()
        );
        Self {
            id,
            index_count,
            context: context.clone(),
        }
    }

    /// Make this mesh's buffers current.
    pub fn bind(&self) {
        self.context.borrow_mut().bind_mesh(self.id);
    }

    /// Draw all indices of whichever mesh is bound.
    pub fn draw_indexed(&self) {
        self.context.borrow_mut().draw_indexed(self.index_count);
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

impl fmt::Debug for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mesh")
            .field("id", &self.id)
            .field("index_count", &self.index_count)
            .finish()
    }
}

impl Drop for Mesh {
    fn drop(&mut self) {
        let id = self.id;
        release(&self.context, &id, |ctx| ctx.delete_mesh(id));
    }
}
