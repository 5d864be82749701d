// Terrain navigation and pack flocking for a 3D world.
// Rendering, input and asset loading belong to the host; this crate takes
// positions in and hands updated positions and headings back.

pub mod engine;
