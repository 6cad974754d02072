//! Scene graph and hierarchical scene organization.
//!
//! Provides the [`SceneNode`] trait with container and mesh nodes, a flat
//! [`SceneGraph`] of top-level nodes with stable keys, and traversal helpers.
//!
//! Every node carries one or more instances. Each instance is a pair of local
//! and world transform; world transforms are recomputed from the parents'
//! world transforms each frame. A mesh node with several instances draws its
//! geometry once per instance, which is how the clouds share one sphere.

use std::sync::atomic::{AtomicU32, Ordering};

use log::warn;

use crate::{
    data_structures::{instance::Instance, material::Material, model::GeometryHandle},
    render::Instanced,
};

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(1);

/// Unique id per node, used by the renderer to cache GPU buffers per node.
pub fn next_node_id() -> u32 {
    NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)
}

pub trait SceneNode {
    fn id(&self) -> u32;

    fn name(&self) -> &str;

    fn get_local_transform(&self, idx: usize) -> Option<Instance>;

    fn set_local_transform(&mut self, idx: usize, instance: Instance);

    fn set_local_transform_all(&mut self, mutation: &mut dyn FnMut(&mut Instance));

    fn get_world_transforms(&self) -> Vec<Instance>;

    /**
     * Instance `i` of this node is placed relative to `parents_world_transform[i]`.
     * Instances without a matching parent transform keep their previous world transform.
     */
    fn update_world_transforms(&mut self, parents_world_transform: &[Instance]);

    fn update_world_transform_all(&mut self) {
        let parents = vec![Instance::default(); self.instance_count()];
        self.update_world_transforms(&parents);
    }

    fn instance_count(&self) -> usize;

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>>;

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>>;

    fn add_child(&mut self, child: Box<dyn SceneNode>);

    fn as_mesh(&self) -> Option<&MeshNode> {
        None
    }

    fn as_mesh_mut(&mut self) -> Option<&mut MeshNode> {
        None
    }

    fn get_render(&self) -> Vec<Instanced<'_>>;
}

fn update_instances(
    name: &str,
    instances: &mut [(Instance, Instance)],
    parents_world_transform: &[Instance],
) -> Vec<Instance> {
    if parents_world_transform.len() < instances.len() {
        warn!(
            "node {} has {} instances but only {} parent transforms were passed.",
            name,
            instances.len(),
            parents_world_transform.len()
        );
    }
    instances
        .iter_mut()
        .zip(parents_world_transform.iter())
        .for_each(|((local, world), parent)| *world = parent * local);
    instances.iter().map(|(_, world)| world.clone()).collect()
}

/// Groups children under a shared transform without drawing anything itself.
pub struct ContainerNode {
    id: u32,
    name: String,
    pub children: Vec<Box<dyn SceneNode>>,
    pub instances: Vec<(Instance, Instance)>,
}

impl ContainerNode {
    pub fn new(name: &str, amount: usize) -> Self {
        let instances = (0..amount)
            .map(|_| (Instance::default(), Instance::default()))
            .collect();
        Self {
            id: next_node_id(),
            name: name.to_string(),
            children: vec![],
            instances,
        }
    }
}

impl SceneNode for ContainerNode {
    fn id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn get_local_transform(&self, idx: usize) -> Option<Instance> {
        self.instances.get(idx).map(|(local, _)| local).cloned()
    }

    fn set_local_transform(&mut self, idx: usize, instance: Instance) {
        if let Some((local, _)) = self.instances.get_mut(idx) {
            *local = instance;
        }
    }

    fn set_local_transform_all(&mut self, mutation: &mut dyn FnMut(&mut Instance)) {
        self.instances
            .iter_mut()
            .for_each(|(local, _)| mutation(local));
    }

    fn get_world_transforms(&self) -> Vec<Instance> {
        self.instances
            .iter()
            .map(|(_, world)| world)
            .cloned()
            .collect()
    }

    fn update_world_transforms(&mut self, parents_world_transform: &[Instance]) {
        let world_transforms =
            update_instances(&self.name, &mut self.instances, parents_world_transform);
        for child in self.children.iter_mut() {
            child.update_world_transforms(&world_transforms);
        }
    }

    fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .collect()
    }
}

/// A drawable node: one geometry with one material, drawn once per instance.
pub struct MeshNode {
    id: u32,
    name: String,
    pub geometry: GeometryHandle,
    pub material: Material,
    children: Vec<Box<dyn SceneNode>>,
    instances: Vec<(Instance, Instance)>,
}

impl MeshNode {
    pub fn new(name: &str, geometry: GeometryHandle, material: Material) -> Self {
        Self::with_instances(name, geometry, material, vec![Instance::default()])
    }

    pub fn with_instances(
        name: &str,
        geometry: GeometryHandle,
        material: Material,
        instances: Vec<Instance>,
    ) -> Self {
        let instances = instances
            .into_iter()
            .map(|instance| (instance.clone(), instance))
            .collect();
        Self {
            id: next_node_id(),
            name: name.to_string(),
            geometry,
            material,
            children: vec![],
            instances,
        }
    }

    pub fn local_transforms(&self) -> impl Iterator<Item = &Instance> {
        self.instances.iter().map(|(local, _)| local)
    }
}

impl SceneNode for MeshNode {
    fn id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn get_local_transform(&self, idx: usize) -> Option<Instance> {
        self.instances.get(idx).map(|(local, _)| local).cloned()
    }

    fn set_local_transform(&mut self, idx: usize, instance: Instance) {
        if let Some((local, _)) = self.instances.get_mut(idx) {
            *local = instance;
        }
    }

    fn set_local_transform_all(&mut self, mutation: &mut dyn FnMut(&mut Instance)) {
        self.instances
            .iter_mut()
            .for_each(|(local, _)| mutation(local));
    }

    fn get_world_transforms(&self) -> Vec<Instance> {
        self.instances
            .iter()
            .map(|(_, world)| world)
            .cloned()
            .collect()
    }

    fn update_world_transforms(&mut self, parents_world_transform: &[Instance]) {
        let world_transforms =
            update_instances(&self.name, &mut self.instances, parents_world_transform);
        for child in self.children.iter_mut() {
            child.update_world_transforms(&world_transforms);
        }
    }

    fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn as_mesh(&self) -> Option<&MeshNode> {
        Some(self)
    }

    fn as_mesh_mut(&mut self) -> Option<&mut MeshNode> {
        Some(self)
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .chain([Instanced {
                id: self.id,
                geometry: self.geometry,
                material: &self.material,
                instances: self.get_world_transforms(),
            }])
            .collect()
    }
}

/// Visits `node` and all of its descendants, parents before children.
pub fn traverse(node: &dyn SceneNode, visit: &mut dyn FnMut(&dyn SceneNode)) {
    visit(node);
    for child in node.get_children() {
        traverse(child.as_ref(), visit);
    }
}

/// Mutable pre-order traversal.
pub fn traverse_mut(node: &mut dyn SceneNode, visit: &mut dyn FnMut(&mut dyn SceneNode)) {
    visit(&mut *node);
    for child in node.get_children_mut() {
        traverse_mut(child.as_mut(), visit);
    }
}

/// Replaces the material of every mesh below (and including) `root` with a
/// toon material that keeps the original colour map. Returns the number of
/// meshes touched.
pub fn apply_toon_shading(root: &mut dyn SceneNode) -> usize {
    let mut replaced = 0;
    traverse_mut(root, &mut |node| {
        if let Some(mesh) = node.as_mesh_mut() {
            mesh.material = mesh.material.to_toon();
            replaced += 1;
        }
    });
    replaced
}

/// Key of a top-level node in a [`SceneGraph`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeKey(usize);

/// The scene root. Top-level nodes are inserted and never removed, so their
/// keys stay valid for the lifetime of the graph.
#[derive(Default)]
pub struct SceneGraph {
    nodes: Vec<Box<dyn SceneNode>>,
}

impl SceneGraph {
    pub fn insert(&mut self, node: Box<dyn SceneNode>) -> NodeKey {
        self.nodes.push(node);
        NodeKey(self.nodes.len() - 1)
    }

    pub fn get(&self, key: NodeKey) -> Option<&Box<dyn SceneNode>> {
        self.nodes.get(key.0)
    }

    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut Box<dyn SceneNode>> {
        self.nodes.get_mut(key.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Box<dyn SceneNode>> {
        self.nodes.iter()
    }

    pub fn update_world_transforms(&mut self) {
        self.nodes
            .iter_mut()
            .for_each(|node| node.update_world_transform_all());
    }

    pub fn get_render(&self) -> Vec<Instanced<'_>> {
        self.nodes
            .iter()
            .flat_map(|node| node.get_render())
            .collect()
    }
}
