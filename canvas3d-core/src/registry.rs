/// Ordered, position-addressed collection of scene objects
use crate::error::SceneError;
use crate::object::SceneObject;
use crate::resource::LoadTicket;

#[derive(Debug, Default)]
pub struct SceneRegistry {
    objects: Vec<SceneObject>,
    selected: Option<usize>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Append an object, select it and return its position
    pub fn add(&mut self, object: SceneObject) -> usize {
        self.objects.push(object);
        let index = self.objects.len() - 1;
        self.selected = Some(index);
        index
    }

    /// Remove the object at `index`; every later object moves down one position
    pub fn remove_at(&mut self, index: usize) -> Result<SceneObject, SceneError> {
        self.check(index)?;
        let removed = self.objects.remove(index);

        self.selected = match self.selected {
            Some(_) if self.objects.is_empty() => None,
            Some(selected) if selected > index => Some(selected - 1),
            Some(selected) if selected == index => Some(index.min(self.objects.len() - 1)),
            other => other,
        };
        Ok(removed)
    }

    pub fn get(&self, index: usize) -> Result<&SceneObject, SceneError> {
        self.check(index)?;
        Ok(&self.objects[index])
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut SceneObject, SceneError> {
        self.check(index)?;
        Ok(&mut self.objects[index])
    }

    pub fn select(&mut self, index: usize) -> Result<(), SceneError> {
        self.check(index)?;
        self.selected = Some(index);
        Ok(())
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Move the selection to the next object, wrapping around
    pub fn select_next(&mut self) -> Option<usize> {
        if self.objects.is_empty() {
            return None;
        }
        let next = self.selected.map_or(0, |s| (s + 1) % self.objects.len());
        self.selected = Some(next);
        self.selected
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SceneObject> {
        self.objects.iter_mut()
    }

    pub fn find_by_ticket_mut(&mut self, ticket: LoadTicket) -> Option<&mut SceneObject> {
        self.objects
            .iter_mut()
            .find(|object| object.texture_ticket() == Some(ticket))
    }

    /// Selector labels in registry order
    pub fn labels(&self) -> Vec<String> {
        self.objects
            .iter()
            .enumerate()
            .map(|(index, object)| object.label(index))
            .collect()
    }

    fn check(&self, index: usize) -> Result<(), SceneError> {
        if index < self.objects.len() {
            Ok(())
        } else {
            Err(SceneError::IndexOutOfRange {
                index,
                len: self.objects.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Shape;
    use crate::primitives::PrimitiveKind;
    use crate::transform::{ObjectTransform, RotationState};
    use nalgebra::Vector3;

    fn object(kind: PrimitiveKind, x: f32) -> SceneObject {
        SceneObject::new(
            Shape::primitive(kind, kind.default_face_colors()).unwrap(),
            ObjectTransform::new(0.1, Vector3::new(x, 0.0, 0.0), RotationState::zero()).unwrap(),
        )
    }

    fn registry_of(n: usize) -> SceneRegistry {
        let mut registry = SceneRegistry::new();
        for i in 0..n {
            assert_eq!(registry.add(object(PrimitiveKind::Cube, i as f32)), i);
        }
        registry
    }

    #[test]
    fn test_add_selects_new_object() {
        let mut registry = SceneRegistry::new();
        assert_eq!(registry.selected(), None);
        registry.add(object(PrimitiveKind::Cube, 0.0));
        let index = registry.add(object(PrimitiveKind::Pyramid, 1.0));
        assert_eq!(index, 1);
        assert_eq!(registry.selected(), Some(1));
    }

    #[test]
    fn test_remove_compacts_positions() {
        for removed in 0..5 {
            let mut registry = registry_of(5);
            let gone = registry.remove_at(removed).unwrap();
            assert_eq!(gone.transform.translation.x, removed as f32);
            assert_eq!(registry.len(), 4);

            for (index, object) in registry.iter().enumerate() {
                let original = if index < removed { index } else { index + 1 };
                assert_eq!(object.transform.translation.x, original as f32);
            }
        }
    }

    #[test]
    fn test_out_of_range_is_an_error() {
        let mut registry = registry_of(2);
        assert!(matches!(
            registry.get(2),
            Err(SceneError::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert!(registry.remove_at(7).is_err());
        assert!(registry.select(2).is_err());
        assert_eq!(registry.len(), 2);

        let mut empty = SceneRegistry::new();
        assert!(empty.remove_at(0).is_err());
    }

    #[test]
    fn test_selection_follows_compaction() {
        let mut registry = registry_of(4);
        registry.select(2).unwrap();
        registry.remove_at(0).unwrap();
        assert_eq!(registry.selected(), Some(1));

        // Removing the selected last entry selects the new last entry
        registry.select(2).unwrap();
        registry.remove_at(2).unwrap();
        assert_eq!(registry.selected(), Some(1));

        registry.remove_at(1).unwrap();
        registry.remove_at(0).unwrap();
        assert_eq!(registry.selected(), None);
    }

    #[test]
    fn test_select_next_wraps() {
        let mut registry = registry_of(3);
        assert_eq!(registry.select_next(), Some(0));
        assert_eq!(registry.select_next(), Some(1));
        assert_eq!(SceneRegistry::new().select_next(), None);
    }

    #[test]
    fn test_labels() {
        let mut registry = registry_of(1);
        registry.add(object(PrimitiveKind::Pyramid, 0.0));
        assert_eq!(registry.labels(), vec!["cube #0", "pyramid #1"]);
    }
}
