//! # Property Graph Model
//!
//! The handles and values that cross every boundary: store ↔ views ↔ user.
//!
//! Design rule: handles carry identity and payload only. Adjacency, degrees
//! and membership live in the arenas of [`crate::storage`] and [`crate::view`].

pub mod edge;
pub mod id;
pub mod interval;
pub mod node;
pub mod property_map;
pub mod value;

pub use edge::{Direction, Edge, Phase};
pub use id::ElementId;
pub use interval::Interval;
pub use node::Node;
pub use property_map::PropertyMap;
pub use value::Value;
