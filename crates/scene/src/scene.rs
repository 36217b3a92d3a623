use glam::Vec3;
use lumen_common::EntityId;
use thiserror::Error;

use crate::entity::{Entity, EntityKind, Instance};
use crate::light::{LightMut, LightRef};

/// Upper bound on lights a scene holds; shader light arrays are sized to it.
pub const MAX_LIGHTS: usize = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("light limit reached ({max}); light not added")]
    LightLimit { max: usize },
}

/// Flat entity list plus the frame-wide clear color and ambient term.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub background_color: Vec3,
    pub ambient_light: Vec3,
    entities: Vec<Entity>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            background_color: Vec3::new(0.1, 0.1, 0.12),
            ambient_light: Vec3::splat(0.1),
            entities: Vec::new(),
        }
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity. Lights beyond [`MAX_LIGHTS`] are dropped with a warning.
    pub fn add_entity(&mut self, entity: Entity) -> Result<EntityId, SceneError> {
        if entity.is_light() && self.light_count() >= MAX_LIGHTS {
            tracing::warn!(
                name = %entity.name,
                max = MAX_LIGHTS,
                "light limit reached, light ignored"
            );
            return Err(SceneError::LightLimit { max: MAX_LIGHTS });
        }
        let id = entity.id;
        tracing::debug!(id = %id.short(), name = %entity.name, "entity added");
        self.entities.push(entity);
        Ok(id)
    }

    /// Remove an entity. Any shadow map it owns travels with it; the caller
    /// releases the depth target.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        let index = self.entities.iter().position(|e| e.id == id)?;
        Some(self.entities.remove(index))
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn instances(&self) -> impl Iterator<Item = (&Entity, &Instance)> {
        self.entities.iter().filter_map(|e| match &e.kind {
            EntityKind::Instance(instance) => Some((e, instance)),
            EntityKind::Light(_) => None,
        })
    }

    pub fn lights(&self) -> impl Iterator<Item = LightRef<'_>> {
        self.entities.iter().filter_map(|e| match &e.kind {
            EntityKind::Light(light) => Some(LightRef {
                id: e.id,
                model: &e.model,
                light,
            }),
            EntityKind::Instance(_) => None,
        })
    }

    pub fn lights_mut(&mut self) -> impl Iterator<Item = LightMut<'_>> {
        self.entities.iter_mut().filter_map(|e| {
            let Entity { id, model, kind, .. } = e;
            match kind {
                EntityKind::Light(light) => Some(LightMut {
                    id: *id,
                    model: &*model,
                    light,
                }),
                EntityKind::Instance(_) => None,
            }
        })
    }

    pub fn light_count(&self) -> usize {
        self.entities.iter().filter(|e| e.is_light()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::LightEntity;
    use crate::node::{Node, Prefab};
    use std::sync::{Arc, Mutex};

    #[test]
    fn sixth_light_is_rejected() {
        let mut scene = Scene::new();
        for i in 0..MAX_LIGHTS {
            scene
                .add_entity(Entity::light(format!("l{i}"), LightEntity::point()))
                .unwrap();
        }
        let err = scene
            .add_entity(Entity::light("extra", LightEntity::point()))
            .unwrap_err();
        assert_eq!(err, SceneError::LightLimit { max: MAX_LIGHTS });
        assert_eq!(scene.light_count(), MAX_LIGHTS);
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedBuffer {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn sixth_light_logs_limit_warning() {
        let buffer = SharedBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(buffer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut scene = Scene::new();
            for i in 0..MAX_LIGHTS {
                scene
                    .add_entity(Entity::light(format!("l{i}"), LightEntity::point()))
                    .unwrap();
            }
            assert!(buffer.0.lock().unwrap().is_empty());
            scene
                .add_entity(Entity::light("extra", LightEntity::point()))
                .unwrap_err();
        });

        let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
        assert!(logs.contains("WARN"));
        assert!(logs.contains("light limit reached"));
        assert!(logs.contains("extra"));
    }

    #[test]
    fn instances_are_not_capped() {
        let mut scene = Scene::new();
        let prefab = Arc::new(Prefab::new("p", Node::new("root")));
        for i in 0..(MAX_LIGHTS * 3) {
            scene
                .add_entity(Entity::instance(format!("i{i}"), prefab.clone()))
                .unwrap();
        }
        assert_eq!(scene.instances().count(), MAX_LIGHTS * 3);
        assert_eq!(scene.lights().count(), 0);
    }

    #[test]
    fn despawn_removes_entity() {
        let mut scene = Scene::new();
        let id = scene
            .add_entity(Entity::light("l", LightEntity::spot(30.0)))
            .unwrap();
        assert!(scene.get(id).is_some());
        let removed = scene.despawn(id).unwrap();
        assert_eq!(removed.name, "l");
        assert!(scene.is_empty());
        assert!(scene.despawn(id).is_none());
    }

    #[test]
    fn lights_mut_exposes_transform() {
        let mut scene = Scene::new();
        scene
            .add_entity(Entity::light("l", LightEntity::point()).at(Vec3::new(1.0, 2.0, 3.0)))
            .unwrap();
        let mut lights = scene.lights_mut();
        let light = lights.next().unwrap();
        assert_eq!(light.position(), Vec3::new(1.0, 2.0, 3.0));
        light.light.intensity = 4.0;
        drop(lights);
        assert_eq!(scene.lights().next().unwrap().light.intensity, 4.0);
    }
}
