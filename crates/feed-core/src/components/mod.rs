//! ECS Components
//!
//! Per-agent state, the content store and the social network adapter.

pub mod history;
pub mod network;
pub mod person;
pub mod store;

pub use history::{Epoch, History};
pub use network::{NodeId, PetSocialGraph, SocialGraph, SocialNetwork};
pub use person::{Person, PersonError, PersonTraits};
pub use store::{ContentStore, PostIdAllocator, StoreError};
