//! Artifacts tipados neutrales usados por los tasks del pipeline.
//!
//! Estos tipos no introducen semántica en el core; sólo definen la forma del
//! `payload` JSON que se serializa a `mat_core::Artifact` con
//! `ArtifactKind::GenericJson` y un `schema_version` estable. El hash lo
//! calcula el engine a partir del payload canónico.

use mat_core::typed_artifact;
use mat_domain::{PropertySet, Structure, SymmetryDescriptor};

// Descripción cruda de estructura tal como llega del usuario o de otra
// herramienta (xyz, cif, ...). `format` discrimina el parser a usar.
typed_artifact!(RawStructureArtifact {
    format: String,
    content: String,
});

// Estructura normalizada por el conversor externo.
typed_artifact!(StructureArtifact { structure: Structure });

// Input deck renderizado, listo para entregar al motor QC.
typed_artifact!(QcInputArtifact {
    deck: String,
    job_type: String,
});

// Salida cruda del motor QC (texto completo del programa externo).
typed_artifact!(QcOutputArtifact { content: String });

// Propiedades estructuradas extraídas por el parser.
typed_artifact!(PropertiesArtifact { properties: PropertySet });

// Descriptor de simetría del analizador externo.
typed_artifact!(SymmetryArtifact { descriptor: SymmetryDescriptor });

// Resumen final de un pipeline: propiedades + simetría de una estructura.
typed_artifact!(ReportArtifact {
    formula: String,
    properties: PropertySet,
    symmetry: SymmetryDescriptor,
});
