use serde::Serialize;
use serde_json::Value;

/// Estructura que agrupa los insumos para calcular el fingerprint de una
/// invocación de task. NO es el fingerprint final (string hash) sino el
/// modelo previo a canonicalizar.
///
/// A diferencia de un hash de salida, este se calcula ANTES de ejecutar:
/// identidad del task + hashes de los inputs resueltos + params efectivos.
/// Eso lo convierte en la clave de cache: cualquier cambio upstream cambia
/// los hashes de entrada y por composición el fingerprint de todo el cono
/// dependiente.
#[derive(Serialize)]
pub struct TaskFingerprintInput<'a> {
    pub engine_version: &'a str,
    pub task_id: &'a str,
    /// Hash de la definición del task (id, kind, slots, params base).
    pub definition_hash: &'a str,
    /// Hashes de los artifacts de entrada, en orden de declaración de slots.
    pub input_hashes: &'a [String],
    pub params: &'a Value,
}
