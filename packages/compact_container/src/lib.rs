#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A compact pool of fixed-size records addressed by stable integer indices.
//!
//! This crate provides [`CompactContainer`], the element store for mesh and triangulation data
//! structures that hold millions of small records (vertices, cells, halfedges) with frequent
//! creation and deletion. Elements refer to each other by [`Index`] instead of by pointer, so
//! the storage can grow and relocate freely without invalidating any cross-reference.
//!
//! # Key Features
//!
//! - **O(1) insert and erase**: vacant slots form an intrusive free list threaded through the
//!   slot array itself, so no side table is needed
//! - **Stable indices**: an index keeps referring to the same element across capacity growth
//! - **Lightweight handles**: [`Index`] is a plain integer of configurable width (`u16`, `u32`,
//!   `u64` or `usize`), with [`Index::BOTTOM`] as the null handle
//! - **Predictable order**: iteration visits elements in ascending index order, which equals
//!   insertion order for a container filled without erasures
//! - **LIFO reuse**: the most recently erased index is the first to be handed out again
//! - **Pluggable growth**: capacity grows in blocks sized by a [`GrowthPolicy`]
//! - **Bidirectional cursors**: a [`Cursor`] walks occupied slots in both directions and can be
//!   rebuilt from a stored index
//!
//! # Examples
//!
//! ## Basic usage
//!
//! ```rust
//! use compact_container::CompactContainer;
//!
//! let mut vertices = CompactContainer::<[f64; 3]>::new();
//!
//! let a = vertices.insert([0.0, 0.0, 0.0]);
//! let b = vertices.insert([1.0, 0.0, 0.0]);
//!
//! assert_eq!(vertices[b], [1.0, 0.0, 0.0]);
//! assert_eq!(vertices.len(), 2);
//!
//! vertices.erase(a);
//! assert!(!vertices.is_used(a));
//! ```
//!
//! ## Cross-references between containers
//!
//! ```rust
//! use compact_container::{CompactContainer, Index};
//!
//! struct Face {
//!     vertices: [Index<u32>; 3],
//! }
//!
//! let mut vertices = CompactContainer::<[f32; 2], u32>::new();
//! let mut faces = CompactContainer::<Face, u32>::new();
//!
//! let a = vertices.insert([0.0, 0.0]);
//! let b = vertices.insert([1.0, 0.0]);
//! let c = vertices.insert([0.0, 1.0]);
//!
//! let face = faces.insert(Face {
//!     vertices: [a, b, c],
//! });
//!
//! // Growing the vertex container does not disturb the stored indices.
//! for n in 0..1000 {
//!     _ = vertices.insert([n as f32, 0.0]);
//! }
//!
//! let corner = faces[face].vertices[2];
//! assert_eq!(vertices[corner], [0.0, 1.0]);
//! ```
//!
//! ## Custom growth policy
//!
//! ```rust
//! use std::num::NonZero;
//!
//! use compact_container::{CompactContainer, ConstantGrowth};
//!
//! let mut container = CompactContainer::<u64>::builder()
//!     .growth_policy(ConstantGrowth::new(NonZero::new(256).unwrap()))
//!     .build();
//!
//! _ = container.insert(1);
//! assert_eq!(container.capacity(), 256);
//! ```

mod builder;
mod container;
mod cursor;
mod error;
mod growth_policy;
mod index;
mod iter;
mod slot;

pub use builder::*;
pub use container::*;
pub use cursor::*;
pub use error::*;
pub use growth_policy::*;
pub use index::*;
pub use iter::*;
pub(crate) use slot::*;
