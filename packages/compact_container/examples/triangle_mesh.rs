//! A minimal triangle mesh built on compact containers:
//!
//! * One container per element kind, cross-referencing each other by index.
//! * Collapsing an edge, erasing the elements it destroys.
//! * Dumping the mesh in canonical (ascending index) order.
//!
//! Container growth events are logged at debug level.

use std::num::NonZero;

use compact_container::{CompactContainer, DoublingGrowth, Index};
use tracing::{Level, info};

type VertexIndex = Index<u32>;

#[derive(Clone, Debug)]
struct Vertex {
    position: [f32; 2],
}

#[derive(Clone, Debug)]
struct Face {
    corners: [VertexIndex; 3],
}

#[derive(Debug)]
struct Mesh {
    vertices: CompactContainer<Vertex, u32>,
    faces: CompactContainer<Face, u32>,
}

impl Mesh {
    fn new() -> Self {
        let small_blocks = DoublingGrowth::new(NonZero::new(4).unwrap());

        Self {
            vertices: CompactContainer::builder()
                .growth_policy(small_blocks)
                .build(),
            faces: CompactContainer::builder()
                .growth_policy(small_blocks)
                .build(),
        }
    }

    /// A regular grid of `size` x `size` quads, each split into two triangles.
    fn grid(size: u16) -> Self {
        let mut mesh = Self::new();
        let row = usize::from(size) + 1;

        let mut grid = Vec::with_capacity(row * row);
        for y in 0..=size {
            for x in 0..=size {
                grid.push(mesh.vertices.insert(Vertex {
                    position: [f32::from(x), f32::from(y)],
                }));
            }
        }

        for y in 0..usize::from(size) {
            for x in 0..usize::from(size) {
                let a = grid[y * row + x];
                let b = grid[y * row + x + 1];
                let c = grid[(y + 1) * row + x];
                let d = grid[(y + 1) * row + x + 1];

                _ = mesh.faces.insert(Face { corners: [a, b, d] });
                _ = mesh.faces.insert(Face { corners: [a, d, c] });
            }
        }

        mesh
    }

    /// Merges `from` into `into`, dropping the faces that become degenerate.
    fn collapse_edge(&mut self, from: VertexIndex, into: VertexIndex) {
        let from_position = self.vertices[from].position;
        let into_vertex = &mut self.vertices[into];
        into_vertex.position = [
            (into_vertex.position[0] + from_position[0]) / 2.0,
            (into_vertex.position[1] + from_position[1]) / 2.0,
        ];

        self.vertices.erase(from);

        self.faces.retain(|_, face| {
            for corner in &mut face.corners {
                if *corner == from {
                    *corner = into;
                }
            }

            let [a, b, c] = face.corners;
            a != b && b != c && a != c
        });
    }

    fn dump(&self) {
        for (index, vertex) in &self.vertices {
            println!("v {index} {:?}", vertex.position);
        }

        for (index, face) in &self.faces {
            let [a, b, c] = face.corners;
            println!("f {index} {a} {b} {c}");
        }
    }
}

fn main() {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    let mut mesh = Mesh::grid(3);
    info!(
        vertices = mesh.vertices.len(),
        faces = mesh.faces.len(),
        "built grid mesh"
    );

    let from = Index::new(5);
    let into = Index::new(6);
    mesh.collapse_edge(from, into);
    info!(
        vertices = mesh.vertices.len(),
        faces = mesh.faces.len(),
        "collapsed edge {from} -> {into}"
    );

    // The freed vertex slot is reused by the next vertex.
    let apex = mesh.vertices.insert(Vertex {
        position: [1.5, 1.5],
    });
    assert_eq!(apex, from);

    mesh.dump();
}
