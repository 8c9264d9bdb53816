//! DAG inmutable de tasks conectados por data dependencies.
//!
//! Invariantes:
//! - Acíclico: `add_edge` rechaza con `Cycle` cualquier edge que cerraría un
//!   ciclo (chequeo incremental por alcanzabilidad) y deja el grafo intacto.
//! - Cada slot de entrada tiene a lo sumo un edge entrante.
//! - Los tipos de slot origen/destino deben coincidir.
//! - `topological_order` es determinista: desempata por orden de inserción.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::json;

use super::ExternalInputs;
use crate::errors::ValidationError;
use crate::hashing::hash_value;
use crate::task::{SlotSpec, TaskDefinition};

/// Un edge une el slot de salida de un task con el slot de entrada de otro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub src: String,
    pub src_slot: String,
    pub dst: String,
    pub dst_slot: String,
}

/// Grafo de dependencias: conjunto de tasks + edges. Los tasks son inmutables
/// una vez agregados (el grafo es dueño de `Arc<dyn TaskDefinition>` para que
/// los backends puedan ejecutarlos desde workers).
#[derive(Default)]
pub struct TaskGraph {
    tasks: IndexMap<String, Arc<dyn TaskDefinition>>,
    edges: Vec<Edge>,
    /// (dst, dst_slot) -> (src, src_slot). Un slot destino se ata una vez.
    incoming: HashMap<(String, String), (String, String)>,
    /// src -> dsts (adyacencia directa, puede repetir destino).
    outgoing: HashMap<String, Vec<String>>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un task. Falla si la identidad ya existe.
    pub fn add_task(&mut self, task: Arc<dyn TaskDefinition>) -> Result<(), ValidationError> {
        let id = task.id().to_string();
        if self.tasks.contains_key(&id) {
            return Err(ValidationError::DuplicateTask { task_id: id });
        }
        self.tasks.insert(id, task);
        Ok(())
    }

    /// Ata `src.src_slot -> dst.dst_slot` validando existencia, tipos,
    /// unicidad del slot destino y aciclicidad. En caso de error el grafo
    /// queda exactamente como estaba.
    pub fn add_edge(
        &mut self,
        src: &str,
        src_slot: &str,
        dst: &str,
        dst_slot: &str,
    ) -> Result<(), ValidationError> {
        let src_task = self
            .tasks
            .get(src)
            .ok_or_else(|| ValidationError::UnknownTask { task_id: src.to_string() })?;
        let dst_task = self
            .tasks
            .get(dst)
            .ok_or_else(|| ValidationError::UnknownTask { task_id: dst.to_string() })?;

        let out_spec = find_slot(&src_task.output_slots(), src_slot)
            .ok_or_else(|| ValidationError::UnknownSlot { task_id: src.to_string(), slot: src_slot.to_string() })?;
        let in_spec = find_slot(&dst_task.input_slots(), dst_slot)
            .ok_or_else(|| ValidationError::UnknownSlot { task_id: dst.to_string(), slot: dst_slot.to_string() })?;

        if out_spec.ty != in_spec.ty {
            return Err(ValidationError::SlotType {
                dst: dst.to_string(),
                slot: dst_slot.to_string(),
                expected: in_spec.ty,
                found: out_spec.ty,
            });
        }

        let key = (dst.to_string(), dst_slot.to_string());
        if self.incoming.contains_key(&key) {
            return Err(ValidationError::SlotAlreadyBound { task_id: dst.to_string(), slot: dst_slot.to_string() });
        }

        // Chequeo incremental: src -> dst cierra un ciclo sii dst ya alcanza
        // a src por edges existentes (incluye el self-edge src == dst).
        if src == dst || self.reaches(dst, src) {
            return Err(ValidationError::Cycle { src: src.to_string(), dst: dst.to_string() });
        }

        self.incoming.insert(key, (src.to_string(), src_slot.to_string()));
        self.outgoing.entry(src.to_string()).or_default().push(dst.to_string());
        self.edges.push(Edge {
            src: src.to_string(),
            src_slot: src_slot.to_string(),
            dst: dst.to_string(),
            dst_slot: dst_slot.to_string(),
        });
        Ok(())
    }

    /// DFS sobre edges salientes: ¿existe camino `from` ->* `to`?
    fn reaches(&self, from: &str, to: &str) -> bool {
        let mut stack = vec![from];
        let mut visited: Vec<&str> = Vec::new();
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            if visited.contains(&node) {
                continue;
            }
            visited.push(node);
            if let Some(dsts) = self.outgoing.get(node) {
                stack.extend(dsts.iter().map(|s| s.as_str()));
            }
        }
        false
    }

    /// Verifica que todo slot de entrada esté atado por un edge o cubierto
    /// por un input externo, y que los inputs externos apunten a slots reales.
    pub fn validate(&self, externals: &ExternalInputs) -> Result<(), ValidationError> {
        for ((task_id, slot), _) in externals.iter() {
            let task = self
                .tasks
                .get(task_id)
                .ok_or_else(|| ValidationError::UnknownTask { task_id: task_id.clone() })?;
            if find_slot(&task.input_slots(), slot).is_none() {
                return Err(ValidationError::UnknownSlot { task_id: task_id.clone(), slot: slot.clone() });
            }
        }
        for (id, task) in &self.tasks {
            for slot in task.input_slots() {
                let bound = self.incoming.contains_key(&(id.clone(), slot.name.clone()));
                if !bound && !externals.contains(id, &slot.name) {
                    return Err(ValidationError::UnboundInput { task_id: id.clone(), slot: slot.name });
                }
            }
        }
        Ok(())
    }

    /// Orden topológico lazy y determinista (Kahn, desempate por orden de
    /// inserción entre tasks sin predecesores pendientes).
    pub fn topological_order(&self) -> TopoIter<'_> {
        let mut indegree: Vec<usize> = vec![0; self.tasks.len()];
        for edge in &self.edges {
            if let Some(idx) = self.tasks.get_index_of(&edge.dst) {
                indegree[idx] += 1;
            }
        }
        TopoIter { graph: self, indegree, emitted: vec![false; self.tasks.len()] }
    }

    /// Productor atado a un slot de entrada, si existe.
    pub fn binding(&self, dst: &str, dst_slot: &str) -> Option<&(String, String)> {
        self.incoming.get(&(dst.to_string(), dst_slot.to_string()))
    }

    /// Predecesores directos (sin duplicados, orden de inserción de edges).
    pub fn predecessors(&self, task_id: &str) -> Vec<&str> {
        let mut preds: Vec<&str> = Vec::new();
        for edge in &self.edges {
            if edge.dst == task_id && !preds.contains(&edge.src.as_str()) {
                preds.push(&edge.src);
            }
        }
        preds
    }

    /// Dependientes transitivos de `task_id` (sin incluirlo).
    pub fn dependents_transitive(&self, task_id: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut stack: Vec<&str> = vec![task_id];
        while let Some(node) = stack.pop() {
            if let Some(dsts) = self.outgoing.get(node) {
                for dst in dsts {
                    if !out.contains(dst) {
                        out.push(dst.clone());
                        stack.push(dst);
                    }
                }
            }
        }
        out
    }

    /// Tasks sin edges salientes: sus outputs son el resultado del pipeline.
    pub fn sinks(&self) -> Vec<&str> {
        self.tasks
            .keys()
            .filter(|id| self.outgoing.get(id.as_str()).map(|v| v.is_empty()).unwrap_or(true))
            .map(|s| s.as_str())
            .collect()
    }

    pub fn get(&self, task_id: &str) -> Option<&Arc<dyn TaskDefinition>> {
        self.tasks.get(task_id)
    }

    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|s| s.as_str())
    }

    pub fn tasks(&self) -> impl Iterator<Item = (&str, &Arc<dyn TaskDefinition>)> {
        self.tasks.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Hash estructural del grafo: ids en orden, definition hashes y edges.
    /// Identifica la definición completa del pipeline en el run-log.
    pub fn graph_hash(&self) -> String {
        let ids: Vec<&str> = self.tasks.keys().map(|s| s.as_str()).collect();
        let defs: Vec<String> = self.tasks.values().map(|t| t.definition_hash()).collect();
        let edges: Vec<serde_json::Value> = self
            .edges
            .iter()
            .map(|e| json!([e.src, e.src_slot, e.dst, e.dst_slot]))
            .collect();
        hash_value(&json!({ "tasks": ids, "definitions": defs, "edges": edges }))
    }
}

fn find_slot(slots: &[SlotSpec], name: &str) -> Option<SlotSpec> {
    slots.iter().find(|s| s.name == name).cloned()
}

/// Iterador lazy del orden topológico.
pub struct TopoIter<'g> {
    graph: &'g TaskGraph,
    indegree: Vec<usize>,
    emitted: Vec<bool>,
}

impl<'g> Iterator for TopoIter<'g> {
    type Item = &'g Arc<dyn TaskDefinition>;

    fn next(&mut self) -> Option<Self::Item> {
        // Primer task (por inserción) sin predecesores pendientes
        let next = (0..self.graph.tasks.len())
            .find(|&i| !self.emitted[i] && self.indegree[i] == 0)?;
        self.emitted[next] = true;
        let (id, task) = self.graph.tasks.get_index(next)?;
        for edge in &self.graph.edges {
            if edge.src == *id {
                if let Some(dst_idx) = self.graph.tasks.get_index_of(&edge.dst) {
                    self.indegree[dst_idx] -= 1;
                }
            }
        }
        Some(task)
    }
}
