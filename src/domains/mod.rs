//! Puzzle-specific simulators plugged into the [`Validator`](crate::Validator).

pub mod blocks;
pub mod coffee;
pub mod dependency_hell;
pub mod statues;

pub use blocks::BlocksWorld;
pub use coffee::CoffeeDelivery;
pub use dependency_hell::DependencyHell;
pub use statues::Statues;
