// mat-domain library entry point
pub mod error;
pub mod property;
pub mod settings;
pub mod structure;
pub mod symmetry;
pub use error::DomainError;
pub use property::PropertySet;
pub use settings::{JobType, QcSettings};
pub use structure::Structure;
pub use symmetry::SymmetryDescriptor;
