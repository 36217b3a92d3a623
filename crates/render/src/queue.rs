//! Render-call collection and ordering.
//!
//! One queue holds every class of geometry. [`draw_order`] is the single
//! comparator: class rank first (`NoAlpha < Mask < Blend`), then distance,
//! ascending for opaque and masked records, descending for blended ones.

use std::cmp::Ordering;

use glam::Mat4;
use lumen_assets::{AlphaMode, AssetProvider, MaterialHandle, MeshHandle};
use lumen_common::EntityId;
use lumen_scene::Node;

/// One draw of a mesh with a material at a world transform. Lives for a
/// single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderCall {
    pub model: Mat4,
    pub entity: EntityId,
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
    pub alpha_mode: AlphaMode,
    pub distance: f32,
}

/// Total order used by [`RenderQueue::sort`].
pub fn draw_order(a: &RenderCall, b: &RenderCall) -> Ordering {
    a.alpha_mode
        .rank()
        .cmp(&b.alpha_mode.rank())
        .then_with(|| match a.alpha_mode {
            AlphaMode::Blend => b.distance.total_cmp(&a.distance),
            AlphaMode::NoAlpha | AlphaMode::Mask => a.distance.total_cmp(&b.distance),
        })
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderQueue {
    calls: Vec<RenderCall>,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn push(&mut self, call: RenderCall) {
        self.calls.push(call);
    }

    /// Record a drawable node. Returns `false` (and records nothing) when the
    /// node has no drawable parts or its material does not resolve.
    pub fn collect<A>(
        &mut self,
        assets: &A,
        entity: EntityId,
        model: Mat4,
        node: &Node,
        distance: f32,
    ) -> bool
    where
        A: AssetProvider + ?Sized,
    {
        let Some((mesh, material)) = node.drawable_parts() else {
            return false;
        };
        let Some(resolved) = assets.material(material) else {
            tracing::trace!(node = %node.name, "material not resolved, node skipped");
            return false;
        };
        self.calls.push(RenderCall {
            model,
            entity,
            mesh,
            material,
            alpha_mode: resolved.alpha_mode,
            distance,
        });
        true
    }

    /// Concatenate a separately collected queue. Order is restored by the
    /// next [`RenderQueue::sort`].
    pub fn append(&mut self, other: &mut RenderQueue) {
        self.calls.append(&mut other.calls);
    }

    pub fn sort(&mut self) {
        self.calls.sort_by(draw_order);
    }

    pub fn calls(&self) -> &[RenderCall] {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Records that cast shadows: the `NoAlpha` class.
    pub fn opaque(&self) -> impl Iterator<Item = &RenderCall> {
        self.calls
            .iter()
            .filter(|c| c.alpha_mode == AlphaMode::NoAlpha)
    }

    pub fn count(&self, alpha_mode: AlphaMode) -> usize {
        self.calls
            .iter()
            .filter(|c| c.alpha_mode == alpha_mode)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_assets::{AssetStore, Material};

    fn call(alpha_mode: AlphaMode, distance: f32, mesh: u64) -> RenderCall {
        RenderCall {
            model: Mat4::IDENTITY,
            entity: EntityId::default(),
            mesh: MeshHandle(mesh),
            material: MaterialHandle(0),
            alpha_mode,
            distance,
        }
    }

    fn sorted(calls: Vec<RenderCall>) -> Vec<u64> {
        let mut queue = RenderQueue::new();
        for c in calls {
            queue.push(c);
        }
        queue.sort();
        queue.calls().iter().map(|c| c.mesh.0).collect()
    }

    #[test]
    fn opaque_before_blended_regardless_of_distance() {
        let order = sorted(vec![
            call(AlphaMode::Blend, 5.0, 1),
            call(AlphaMode::NoAlpha, 10.0, 2),
        ]);
        assert_eq!(order, vec![2, 1]);
    }

    #[test]
    fn blended_far_to_near() {
        let order = sorted(vec![
            call(AlphaMode::Blend, 3.0, 1),
            call(AlphaMode::Blend, 7.0, 2),
            call(AlphaMode::Blend, 5.0, 3),
        ]);
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn opaque_and_masked_near_to_far() {
        let order = sorted(vec![
            call(AlphaMode::Mask, 1.0, 1),
            call(AlphaMode::NoAlpha, 9.0, 2),
            call(AlphaMode::NoAlpha, 2.0, 3),
            call(AlphaMode::Mask, 0.5, 4),
        ]);
        assert_eq!(order, vec![3, 2, 4, 1]);
    }

    #[test]
    fn equal_keys_keep_collection_order() {
        let order = sorted(vec![
            call(AlphaMode::Blend, 4.0, 1),
            call(AlphaMode::Blend, 4.0, 2),
            call(AlphaMode::Blend, 4.0, 3),
        ]);
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn comparator_is_antisymmetric() {
        let samples = [
            call(AlphaMode::NoAlpha, 1.0, 0),
            call(AlphaMode::Mask, 1.0, 0),
            call(AlphaMode::Blend, 1.0, 0),
            call(AlphaMode::Blend, 2.0, 0),
            call(AlphaMode::NoAlpha, 2.0, 0),
        ];
        for a in &samples {
            assert_eq!(draw_order(a, a), Ordering::Equal);
            for b in &samples {
                assert_eq!(draw_order(a, b), draw_order(b, a).reverse());
            }
        }
    }

    #[test]
    fn collect_resolves_alpha_mode_from_material() {
        let mut assets = AssetStore::new();
        let quad = assets.register_unit_quad();
        let glass = assets.register_material(Material::named("glass").with_alpha(AlphaMode::Blend));
        let node = Node::drawable("pane", quad, glass);

        let mut queue = RenderQueue::new();
        assert!(queue.collect(&assets, EntityId::new(), Mat4::IDENTITY, &node, 2.0));
        assert!(!queue.collect(&assets, EntityId::new(), Mat4::IDENTITY, &Node::new("empty"), 1.0));
        let missing = Node::drawable("missing", quad, MaterialHandle(99));
        assert!(!queue.collect(&assets, EntityId::new(), Mat4::IDENTITY, &missing, 1.0));

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.count(AlphaMode::Blend), 1);
        assert_eq!(queue.opaque().count(), 0);
    }

    #[test]
    fn append_moves_calls_and_clear_empties() {
        let mut a = RenderQueue::new();
        let mut b = RenderQueue::new();
        a.push(call(AlphaMode::Blend, 1.0, 1));
        b.push(call(AlphaMode::NoAlpha, 1.0, 2));
        a.append(&mut b);
        assert!(b.is_empty());
        a.sort();
        assert_eq!(a.calls()[0].mesh, MeshHandle(2));
        a.clear();
        assert!(a.is_empty());
    }
}
