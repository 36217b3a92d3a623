use std::sync::Arc;

use glam::{Mat4, Vec3};
use lumen_common::EntityId;

use crate::light::{LightEntity, forward_of, position_of};
use crate::node::Prefab;

/// A placed copy of a prefab. An instance without a prefab draws nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Instance {
    pub prefab: Option<Arc<Prefab>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Instance(Instance),
    Light(LightEntity),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    /// Entity-to-world transform.
    pub model: Mat4,
    pub visible: bool,
    pub kind: EntityKind,
}

impl Entity {
    pub fn new(name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            model: Mat4::IDENTITY,
            visible: true,
            kind,
        }
    }

    pub fn instance(name: impl Into<String>, prefab: Arc<Prefab>) -> Self {
        Self::new(
            name,
            EntityKind::Instance(Instance {
                prefab: Some(prefab),
            }),
        )
    }

    pub fn light(name: impl Into<String>, light: LightEntity) -> Self {
        Self::new(name, EntityKind::Light(light))
    }

    pub fn with_model(mut self, model: Mat4) -> Self {
        self.model = model;
        self
    }

    pub fn at(self, position: Vec3) -> Self {
        self.with_model(Mat4::from_translation(position))
    }

    pub fn position(&self) -> Vec3 {
        position_of(&self.model)
    }

    pub fn forward(&self) -> Vec3 {
        forward_of(&self.model)
    }

    /// Rotate in place so that [`Entity::forward`] points at `target`.
    /// Scale is discarded.
    pub fn look_at(&mut self, target: Vec3) {
        let eye = self.position();
        let dir = target - eye;
        if dir.length_squared() <= f32::EPSILON {
            return;
        }
        let up = if dir.normalize().cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        self.model = Mat4::look_at_rh(eye, target, up).inverse();
    }

    pub fn pointing_at(mut self, target: Vec3) -> Self {
        self.look_at(target);
        self
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match &self.kind {
            EntityKind::Instance(instance) => Some(instance),
            EntityKind::Light(_) => None,
        }
    }

    pub fn as_light(&self) -> Option<&LightEntity> {
        match &self.kind {
            EntityKind::Light(light) => Some(light),
            EntityKind::Instance(_) => None,
        }
    }

    pub fn as_light_mut(&mut self) -> Option<&mut LightEntity> {
        match &mut self.kind {
            EntityKind::Light(light) => Some(light),
            EntityKind::Instance(_) => None,
        }
    }

    pub fn is_light(&self) -> bool {
        matches!(self.kind, EntityKind::Light(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    #[test]
    fn look_at_points_forward_at_target() {
        let mut e = Entity::light("sun", LightEntity::directional()).at(Vec3::new(0.0, 0.0, 10.0));
        e.look_at(Vec3::new(10.0, 0.0, 10.0));
        assert!((e.forward() - Vec3::X).length() < 1e-5);
        assert!((e.position() - Vec3::new(0.0, 0.0, 10.0)).length() < 1e-5);
    }

    #[test]
    fn look_at_straight_down_uses_fallback_up() {
        let e = Entity::light("sun", LightEntity::directional())
            .at(Vec3::new(0.0, 100.0, 0.0))
            .pointing_at(Vec3::ZERO);
        assert!((e.forward() - Vec3::NEG_Y).length() < 1e-5);
        assert!(e.model.is_finite());
    }

    #[test]
    fn kind_accessors() {
        let prefab = Arc::new(Prefab::new("p", Node::new("root")));
        let inst = Entity::instance("i", prefab);
        assert!(inst.as_instance().is_some());
        assert!(inst.as_light().is_none());
        assert!(!inst.is_light());
    }
}
