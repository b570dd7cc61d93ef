pub mod world;

pub use world::Ecosystem;
