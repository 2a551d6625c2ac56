//! Scene data
//!
//! The set of objects the frame loop reads every iteration. Objects are
//! owned by a [`SceneStore`] and addressed by [`ObjectId`]; render systems
//! only ever see the store through a shared reference.

mod object;
mod store;

pub use object::{PointLight, SceneObject};
pub use store::{ObjectId, SceneStore};
