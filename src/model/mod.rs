pub use cellfield_core::{FieldError, VolumeLogic};
pub mod agents {
    pub use cellfield_core::agent_container::*;
    pub use cellfield_core::agents::*;
}
pub mod bulk {
    pub use cellfield_core::bulk::*;
}
pub mod config {
    pub use cellfield_core::config::*;
}
pub mod diffusion {
    pub use cellfield_core::diffusion::*;
}
pub mod lifecycle {
    pub use cellfield_core::lifecycle::*;
}
pub mod mechanics {
    pub use cellfield_core::mechanics::*;
}
pub mod mesh {
    pub use cellfield_core::mesh::*;
}
pub mod metrics {
    pub use cellfield_core::metrics::*;
}
pub mod microenvironment {
    pub use cellfield_core::microenvironment::*;
}
pub mod phenotype {
    pub use cellfield_core::phenotype::*;
}
pub mod secretion {
    pub use cellfield_core::secretion::*;
}
pub mod snapshot {
    pub use cellfield_core::snapshot::*;
}
pub mod vector {
    pub use cellfield_core::vector::*;
}
pub mod world;
