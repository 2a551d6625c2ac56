//! Keyed object storage

use slotmap::SlotMap;

use super::object::{PointLight, SceneObject};
use crate::assets::SharedModel;
use crate::foundation::math::Transform;

slotmap::new_key_type! {
    /// Stable identifier assigned when an object enters the store
    pub struct ObjectId;
}

/// Owner of every scene object
///
/// Iteration follows slot order, so two passes over an unchanged store
/// visit objects in the same sequence. Light records and draw calls rely
/// on that.
#[derive(Debug, Default)]
pub struct SceneStore {
    objects: SlotMap<ObjectId, SceneObject>,
}

impl SceneStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object and return its id
    pub fn insert(&mut self, object: SceneObject) -> ObjectId {
        let id = self.objects.insert(object);
        log::trace!("Inserted scene object {id:?}");
        id
    }

    /// Remove an object, returning it if it was present
    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        self.objects.remove(id)
    }

    /// Borrow an object
    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    /// Mutably borrow an object
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id)
    }

    /// Whether `id` refers to a live object
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// Number of objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All objects in store order
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter()
    }

    /// Objects with a mesh, in store order
    pub fn drawables(&self) -> impl Iterator<Item = (ObjectId, &Transform, &SharedModel)> {
        self.objects
            .iter()
            .filter_map(|(id, object)| object.model.as_ref().map(|model| (id, &object.transform, model)))
    }

    /// Objects with a light, in store order
    pub fn point_lights(&self) -> impl Iterator<Item = (ObjectId, &Transform, &PointLight)> {
        self.objects
            .iter()
            .filter_map(|(id, object)| object.point_light.as_ref().map(|light| (id, &object.transform, light)))
    }

    /// Number of objects carrying a light
    pub fn point_light_count(&self) -> usize {
        self.point_lights().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Model;
    use crate::foundation::math::Vec3;
    use crate::render::device::{BufferHandle, MeshBuffers};
    use std::sync::Arc;

    fn model() -> SharedModel {
        Arc::new(Model::new(
            "cube",
            MeshBuffers {
                vertex_buffer: BufferHandle(1),
                index_buffer: None,
                vertex_count: 36,
                index_count: 0,
            },
        ))
    }

    #[test]
    fn test_insert_get_remove() {
        let mut store = SceneStore::new();
        let id = store.insert(SceneObject::default());
        assert!(store.contains(id));
        assert_eq!(store.len(), 1);

        store.get_mut(id).unwrap().transform.translation = Vec3::new(1.0, 0.0, 0.0);
        assert_eq!(store.get(id).unwrap().transform.translation.x, 1.0);

        assert!(store.remove(id).is_some());
        assert!(!store.contains(id));
        assert!(store.is_empty());
        assert!(store.remove(id).is_none());
    }

    #[test]
    fn test_ids_are_not_reused_after_removal() {
        let mut store = SceneStore::new();
        let first = store.insert(SceneObject::default());
        store.remove(first);
        let second = store.insert(SceneObject::default());
        assert_ne!(first, second);
        assert!(store.get(first).is_none());
    }

    #[test]
    fn test_drawables_and_lights_are_filtered_in_order() {
        let mut store = SceneStore::new();
        let shared = model();
        let a = store.insert(SceneObject::with_model(shared.clone(), Transform::default()));
        let l1 = store.insert(SceneObject::point_light(Vec3::new(1.0, 0.0, 0.0), PointLight::default()));
        let b = store.insert(SceneObject::with_model(shared.clone(), Transform::default()));
        let l2 = store.insert(SceneObject::point_light(Vec3::new(2.0, 0.0, 0.0), PointLight::default()));
        store.insert(SceneObject::default());

        let drawn: Vec<_> = store.drawables().map(|(id, _, _)| id).collect();
        assert_eq!(drawn, vec![a, b]);

        let lights: Vec<_> = store.point_lights().map(|(id, _, _)| id).collect();
        assert_eq!(lights, vec![l1, l2]);
        assert_eq!(store.point_light_count(), 2);

        // Both objects share one mesh
        assert_eq!(Arc::strong_count(&shared), 3);
    }

    #[test]
    fn test_object_can_be_both_drawable_and_light() {
        let mut object = SceneObject::with_model(model(), Transform::default());
        object.point_light = Some(PointLight::default());
        assert!(object.is_drawable());
        assert!(object.is_light());
    }
}
