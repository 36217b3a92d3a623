//! Scene Walker: visibility, culling and placement of prefab node trees.
//!
//! # Invariants
//! - A hidden node hides its whole subtree.
//! - Every child is resolved from the entity placement and its own cached
//!   hierarchy-global matrix; transforms never accumulate down the recursion.
//! - Emitted distances are `|eye - world bounds center|`.

use glam::Mat4;
use lumen_assets::AssetProvider;
use lumen_common::{Camera, EntityId};
use lumen_scene::{Node, Scene};
use serde::Serialize;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TraversalStats {
    pub entities: usize,
    pub nodes_visited: usize,
    pub hidden_subtrees: usize,
    pub culled: usize,
    pub emitted: usize,
    /// Drawable nodes whose mesh the asset provider could not resolve.
    pub unresolved_meshes: usize,
}

/// Walk `node` and its subtree under `placement`, calling `emit` with the
/// world transform and camera distance of every visible drawable node that
/// survives frustum culling.
pub fn traverse<A, F>(
    placement: &Mat4,
    node: &Node,
    camera: &Camera,
    assets: &A,
    stats: &mut TraversalStats,
    emit: &mut F,
) where
    A: AssetProvider + ?Sized,
    F: FnMut(Mat4, &Node, f32),
{
    if !node.visible {
        stats.hidden_subtrees += 1;
        return;
    }
    stats.nodes_visited += 1;

    let node_world = *placement * node.global_matrix();

    if let Some((mesh, _)) = node.drawable_parts() {
        match assets.mesh(mesh) {
            Some(mesh) => {
                let world_bounds = mesh.bounds.transformed(&node_world);
                if camera.test_box_in_frustum(world_bounds.center, world_bounds.half_size) {
                    let distance = camera.eye().distance(world_bounds.center);
                    stats.emitted += 1;
                    emit(node_world, node, distance);
                } else {
                    stats.culled += 1;
                }
            }
            None => {
                stats.unresolved_meshes += 1;
                tracing::trace!(node = %node.name, "mesh not resolved, node skipped");
            }
        }
    }

    for child in &node.children {
        traverse(placement, child, camera, assets, stats, emit);
    }
}

/// Walk every visible instance entity of `scene`.
pub fn traverse_scene<A, F>(
    scene: &Scene,
    camera: &Camera,
    assets: &A,
    stats: &mut TraversalStats,
    mut emit: F,
) where
    A: AssetProvider + ?Sized,
    F: FnMut(EntityId, Mat4, &Node, f32),
{
    let _span = tracing::debug_span!("traverse_scene").entered();
    for (entity, instance) in scene.instances() {
        if !entity.visible {
            continue;
        }
        let Some(prefab) = &instance.prefab else {
            tracing::trace!(entity = %entity.name, "instance without prefab");
            continue;
        };
        stats.entities += 1;
        let id = entity.id;
        traverse(
            &entity.model,
            prefab.root(),
            camera,
            assets,
            stats,
            &mut |model, node, distance| emit(id, model, node, distance),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use lumen_assets::{AssetStore, Material, MaterialHandle, MeshHandle};
    use lumen_scene::{Entity, Prefab};
    use std::sync::Arc;

    fn camera() -> Camera {
        let mut camera = Camera::perspective(60.0, 1.0, 0.1, 100.0);
        camera.look_at(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        camera
    }

    fn setup() -> (AssetStore, MeshHandle, MaterialHandle) {
        let mut assets = AssetStore::new();
        let cube = assets.register_unit_cube();
        let material = assets.register_material(Material::named("grey"));
        (assets, cube, material)
    }

    fn collect(
        placement: Mat4,
        root: &Node,
        assets: &AssetStore,
    ) -> (Vec<(Mat4, f32)>, TraversalStats) {
        let mut out = Vec::new();
        let mut stats = TraversalStats::default();
        traverse(&placement, root, &camera(), assets, &mut stats, &mut |m, _, d| {
            out.push((m, d))
        });
        (out, stats)
    }

    #[test]
    fn hidden_parent_hides_visible_child() {
        let (assets, cube, material) = setup();
        let root = Node::new("root").with_child(
            Node::drawable("parent", cube, material)
                .hidden()
                .with_child(Node::drawable("child", cube, material)),
        );
        let prefab = Prefab::new("p", root);
        let placement = Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0));
        let (out, stats) = collect(placement, prefab.root(), &assets);
        assert!(out.is_empty());
        assert_eq!(stats.hidden_subtrees, 1);
    }

    #[test]
    fn distance_is_eye_to_bounds_center() {
        let (assets, cube, material) = setup();
        let prefab = Prefab::new("p", Node::drawable("cube", cube, material));
        let (out, _) = collect(
            Mat4::from_translation(Vec3::new(0.0, 0.6, -0.8)),
            prefab.root(),
            &assets,
        );
        assert_eq!(out.len(), 1);
        assert!((out[0].1 - 1.0).abs() < 1e-5);
    }

    #[test]
    fn placement_applies_once_to_nested_children() {
        let (assets, cube, material) = setup();
        let prefab = Prefab::new(
            "p",
            Node::new("root")
                .with_model(Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)))
                .with_child(
                    Node::drawable("leaf", cube, material)
                        .with_model(Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0))),
                ),
        );
        let placement = Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0));
        let (out, _) = collect(placement, prefab.root(), &assets);
        assert_eq!(out.len(), 1);
        let origin = out[0].0.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(1.0, 1.0, -10.0)).length() < 1e-5);
    }

    #[test]
    fn object_outside_frustum_is_culled() {
        let (assets, cube, material) = setup();
        let prefab = Prefab::new("p", Node::drawable("cube", cube, material));
        let (out, stats) = collect(
            Mat4::from_translation(Vec3::new(0.0, 0.0, 50.0)),
            prefab.root(),
            &assets,
        );
        assert!(out.is_empty());
        assert_eq!(stats.culled, 1);
    }

    #[test]
    fn unresolved_mesh_is_counted_and_skipped() {
        let (assets, _, material) = setup();
        let prefab = Prefab::new("p", Node::drawable("ghost", MeshHandle(42), material));
        let (out, stats) = collect(Mat4::IDENTITY, prefab.root(), &assets);
        assert!(out.is_empty());
        assert_eq!(stats.unresolved_meshes, 1);
    }

    #[test]
    fn scene_walk_skips_hidden_entities_and_empty_instances() {
        let (assets, cube, material) = setup();
        let prefab = Arc::new(Prefab::new("p", Node::drawable("cube", cube, material)));
        let mut scene = Scene::new();
        scene
            .add_entity(Entity::instance("shown", prefab.clone()).at(Vec3::new(0.0, 0.0, -5.0)))
            .unwrap();
        let mut hidden = Entity::instance("hidden", prefab).at(Vec3::new(0.0, 0.0, -6.0));
        hidden.visible = false;
        scene.add_entity(hidden).unwrap();
        scene
            .add_entity(Entity::new("empty", lumen_scene::EntityKind::Instance(Default::default())))
            .unwrap();

        let mut ids = Vec::new();
        let mut stats = TraversalStats::default();
        traverse_scene(&scene, &camera(), &assets, &mut stats, |id, _, _, _| ids.push(id));
        assert_eq!(ids.len(), 1);
        assert_eq!(stats.entities, 1);
        assert_eq!(scene.get(ids[0]).map(|e| e.name.as_str()), Some("shown"));
    }
}
