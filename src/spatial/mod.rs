pub mod collision_tree;
pub mod quadtree;
