//! Utilidades para fusionar parámetros JSON de forma determinista.
//!
//! Merge "shallow": las claves de `b` reemplazan a las de `a` cuando ambos
//! son objetos; en cualquier otro caso `b` tiene precedencia.

use serde_json::Value;

pub fn merge_json(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Object(ma), Value::Object(mb)) => {
            let mut out = ma.clone();
            for (k, v) in mb.iter() {
                out.insert(k.clone(), v.clone());
            }
            Value::Object(out)
        }
        // Non-objects: override
        (_, other) => other.clone(),
    }
}
