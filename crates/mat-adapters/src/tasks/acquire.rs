//! Source del pipeline: publica la descripción cruda de estructura que el
//! caller quiere procesar (equivalente a un input task de valor fijo).

use mat_core::typed_task;

use crate::artifacts::RawStructureArtifact;

typed_task! {
    source SupplyStructureTask {
        id: "supply_structure",
        output: RawStructureArtifact,
        params: (),
        fields { format: String, content: String }
        , run(_self, _p) {
            Ok(RawStructureArtifact {
                format: _self.format.clone(),
                content: _self.content.clone(),
                schema_version: 1,
            })
        }
    }
}
