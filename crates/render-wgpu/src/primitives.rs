use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

fn face(normal: [f32; 3], corners: [[f32; 3]; 4]) -> [Vertex; 4] {
    let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];
    std::array::from_fn(|i| Vertex {
        position: corners[i],
        normal,
        uv: uvs[i],
    })
}

/// Unit cube centered on the origin, four vertices per face.
pub fn cube_mesh() -> (Vec<Vertex>, Vec<u32>) {
    let p = 0.5_f32;
    #[rustfmt::skip]
    let faces = [
        face([0.0, 0.0, 1.0],  [[-p, -p,  p], [ p, -p,  p], [ p,  p,  p], [-p,  p,  p]]),
        face([0.0, 0.0, -1.0], [[ p, -p, -p], [-p, -p, -p], [-p,  p, -p], [ p,  p, -p]]),
        face([1.0, 0.0, 0.0],  [[ p, -p,  p], [ p, -p, -p], [ p,  p, -p], [ p,  p,  p]]),
        face([-1.0, 0.0, 0.0], [[-p, -p, -p], [-p, -p,  p], [-p,  p,  p], [-p,  p, -p]]),
        face([0.0, 1.0, 0.0],  [[-p,  p,  p], [ p,  p,  p], [ p,  p, -p], [-p,  p, -p]]),
        face([0.0, -1.0, 0.0], [[-p, -p, -p], [ p, -p, -p], [ p, -p,  p], [-p, -p,  p]]),
    ];
    let vertices: Vec<Vertex> = faces.iter().flatten().copied().collect();
    let indices = (0..6u32)
        .flat_map(|f| {
            let b = f * 4;
            [b, b + 1, b + 2, b + 2, b + 3, b]
        })
        .collect();
    (vertices, indices)
}

/// Unit quad in the XY plane facing +Z.
pub fn quad_mesh() -> (Vec<Vertex>, Vec<u32>) {
    let p = 0.5_f32;
    let vertices = face(
        [0.0, 0.0, 1.0],
        [[-p, -p, 0.0], [p, -p, 0.0], [p, p, 0.0], [-p, p, 0.0]],
    )
    .to_vec();
    (vertices, vec![0, 1, 2, 2, 3, 0])
}
