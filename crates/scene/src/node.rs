use glam::Mat4;
use lumen_assets::{MaterialHandle, MeshHandle};

/// A position in a prefab's node hierarchy.
///
/// `model` is relative to the parent node. The hierarchy-global matrix
/// (`parent.global * model`) is cached per node by [`Prefab`], so a node
/// can be placed in the world without walking its ancestors again.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub model: Mat4,
    pub mesh: Option<MeshHandle>,
    pub material: Option<MaterialHandle>,
    pub visible: bool,
    pub children: Vec<Node>,
    global: Mat4,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: Mat4::IDENTITY,
            mesh: None,
            material: None,
            visible: true,
            children: Vec::new(),
            global: Mat4::IDENTITY,
        }
    }

    /// A node drawing `mesh` with `material`.
    pub fn drawable(name: impl Into<String>, mesh: MeshHandle, material: MaterialHandle) -> Self {
        Self {
            mesh: Some(mesh),
            material: Some(material),
            ..Self::new(name)
        }
    }

    pub fn with_model(mut self, model: Mat4) -> Self {
        self.model = model;
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// The node contributes a draw only if it carries both a mesh and a material.
    pub fn drawable_parts(&self) -> Option<(MeshHandle, MaterialHandle)> {
        Some((self.mesh?, self.material?))
    }

    /// Hierarchy-global matrix (prefab root space), as of the last refresh.
    pub fn global_matrix(&self) -> Mat4 {
        self.global
    }

    /// Total node count of this subtree.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_len).sum::<usize>()
    }

    fn refresh_globals(&mut self, parent: Mat4) {
        self.global = parent * self.model;
        let global = self.global;
        for child in &mut self.children {
            child.refresh_globals(global);
        }
    }
}

/// A reusable node tree. Always owns a root node.
#[derive(Debug, Clone, PartialEq)]
pub struct Prefab {
    pub name: String,
    root: Node,
}

impl Prefab {
    pub fn new(name: impl Into<String>, root: Node) -> Self {
        let mut prefab = Self {
            name: name.into(),
            root,
        };
        prefab.root.refresh_globals(Mat4::IDENTITY);
        prefab
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Mutate the node tree; cached global matrices are refreshed afterwards.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut Node) -> R) -> R {
        let result = f(&mut self.root);
        self.root.refresh_globals(Mat4::IDENTITY);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn translated(x: f32) -> Mat4 {
        Mat4::from_translation(Vec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn globals_accumulate_down_the_tree() {
        let prefab = Prefab::new(
            "chain",
            Node::new("a")
                .with_model(translated(1.0))
                .with_child(Node::new("b").with_model(translated(2.0)).with_child(
                    Node::new("c").with_model(translated(4.0)),
                )),
        );
        let c = &prefab.root().children[0].children[0];
        let p = c.global_matrix().transform_point3(Vec3::ZERO);
        assert_eq!(p, Vec3::new(7.0, 0.0, 0.0));
    }

    #[test]
    fn edit_refreshes_globals() {
        let mut prefab = Prefab::new("p", Node::new("root").with_child(Node::new("leaf")));
        prefab.edit(|root| root.model = translated(3.0));
        let leaf = &prefab.root().children[0];
        assert_eq!(
            leaf.global_matrix().transform_point3(Vec3::ZERO),
            Vec3::new(3.0, 0.0, 0.0)
        );
    }

    #[test]
    fn drawable_parts_require_mesh_and_material() {
        let mut node = Node::new("n");
        assert!(node.drawable_parts().is_none());
        node.mesh = Some(MeshHandle(1));
        assert!(node.drawable_parts().is_none());
        node.material = Some(MaterialHandle(2));
        assert_eq!(
            node.drawable_parts(),
            Some((MeshHandle(1), MaterialHandle(2)))
        );
    }

    #[test]
    fn subtree_len_counts_all_nodes() {
        let root = Node::new("r")
            .with_child(Node::new("a").with_child(Node::new("a1")))
            .with_child(Node::new("b"));
        assert_eq!(root.subtree_len(), 4);
    }
}
