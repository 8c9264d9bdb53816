//! Macros utilitarias para reducir boilerplate al definir Artifacts y Tasks
//! tipados.
//!
//! Exportadas en la raíz del crate para poder usarlas como:
//!   use mat_core::{typed_artifact, typed_task};

/// Declara un Artifact tipado con derives y ArtifactSpec.
///
/// Formas soportadas:
/// - typed_artifact!(Name { field1: Ty1, field2: Ty2 }); // KIND = GenericJson
///   por defecto
/// - typed_artifact!(Name { field1: Ty1 } kind: $kind_expr );
#[macro_export]
macro_rules! typed_artifact {
    // Con KIND explícito
    ($name:ident { $($fname:ident : $fty:ty),+ $(,)? } kind: $kind:expr) => {
        #[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
        pub struct $name { $(pub $fname: $fty,)+ pub schema_version: u32 }
        impl $crate::model::ArtifactSpec for $name {
            const KIND: $crate::model::ArtifactKind = $kind;
            const SCHEMA_NAME: &'static str = stringify!($name);
        }
    };
    // KIND por defecto GenericJson
    ($name:ident { $($fname:ident : $fty:ty),+ $(,)? }) => {
        $crate::typed_artifact!($name { $($fname : $fty),+ } kind: $crate::model::ArtifactKind::GenericJson);
    };
}

/// Declara un `TypedTask` con poco boilerplate.
///
/// El cuerpo de `run` evalúa a `Result<Output, TaskExecutionError>`: los
/// tasks que envuelven colaboradores externos pueden propagar fallos con `?`.
#[macro_export]
macro_rules! typed_task {
    // ---------------- Source con fields y ctor custom ----------------
    (
        source $name:ident {
            id: $id:expr,
            output: $out:ty,
            params: $params:ty,
            fields { $($fname:ident : $fty:ty),+ $(,)? }
            , ctor (($($ctor_args:tt)*) $ctor:block)
            , run($self_ident:ident, $p_ident:ident) $body:block
        }
    ) => {
        #[derive(Clone, Debug)]
        pub struct $name { $(pub $fname: $fty),+ }
        impl $name { pub fn new($($ctor_args)*) -> Self { $ctor } }
        impl $crate::task::TypedTask for $name {
            type Params = $params;
            type Input = $out;   // ignorado (Source)
            type Output = $out;
            fn id(&self) -> &'static str { $id }
            fn kind(&self) -> $crate::task::TaskKind { $crate::task::TaskKind::Source }
            fn params_default(&self) -> Self::Params { <Self::Params as Default>::default() }
            // Los fields de un source son el valor que publica: entran al
            // definition hash (requieren Serialize).
            fn seed(&self) -> serde_json::Value {
                let mut map = serde_json::Map::new();
                $(
                    map.insert(
                        stringify!($fname).to_string(),
                        serde_json::to_value(&self.$fname).unwrap_or(serde_json::Value::Null),
                    );
                )+
                serde_json::Value::Object(map)
            }
            fn run_typed(&self, _input: Option<Self::Input>, $p_ident: Self::Params) -> $crate::task::TaskRunResultTyped<Self::Output> {
                let $self_ident = self;
                let out: Result<Self::Output, $crate::errors::TaskExecutionError> = { $body };
                out.into()
            }
        }
    };

    // ---------------- Source con fields sin ctor custom ----------------
    (
        source $name:ident {
            id: $id:expr,
            output: $out:ty,
            params: $params:ty,
            fields { $($fname:ident : $fty:ty),+ $(,)? }
            , run($self_ident:ident, $p_ident:ident) $body:block
        }
    ) => {
        $crate::typed_task! {
            source $name {
                id: $id,
                output: $out,
                params: $params,
                fields { $($fname : $fty),+ }
                , ctor (($($fname : $fty),+) { Self { $($fname),+ } })
                , run($self_ident, $p_ident) $body
            }
        }
    };

    // ---------------- Source unit (sin fields) ----------------
    (
        source $name:ident {
            id: $id:expr,
            output: $out:ty,
            params: $params:ty,
            run($self_ident:ident, $p_ident:ident) $body:block
        }
    ) => {
        #[derive(Clone, Debug)]
        pub struct $name;
        impl $name { pub fn new() -> Self { Self } }
        impl Default for $name { fn default() -> Self { Self::new() } }
        impl $crate::task::TypedTask for $name {
            type Params = $params;
            type Input = $out;   // ignorado (Source)
            type Output = $out;
            fn id(&self) -> &'static str { $id }
            fn kind(&self) -> $crate::task::TaskKind { $crate::task::TaskKind::Source }
            fn params_default(&self) -> Self::Params { <Self::Params as Default>::default() }
            fn run_typed(&self, _input: Option<Self::Input>, $p_ident: Self::Params) -> $crate::task::TaskRunResultTyped<Self::Output> {
                let $self_ident = self;
                let out: Result<Self::Output, $crate::errors::TaskExecutionError> = { $body };
                out.into()
            }
        }
    };

    // ---------------- Task Transform/Sink con fields y ctor custom ----------------
    (
        task $name:ident {
            id: $id:expr,
            kind: $kind:expr,
            input: $inp:ty,
            output: $out:ty,
            params: $params:ty,
            fields { $($fname:ident : $fty:ty),+ $(,)? }
            , ctor (($($ctor_args:tt)*) $ctor:block)
            , run($self_ident:ident, $inp_ident:ident, $p_ident:ident) $body:block
        }
    ) => {
        #[derive(Clone, Debug)]
        pub struct $name { $(pub $fname: $fty),+ }
        impl $name { pub fn new($($ctor_args)*) -> Self { $ctor } }
        impl $crate::task::TypedTask for $name {
            type Params = $params;
            type Input = $inp;
            type Output = $out;
            fn id(&self) -> &'static str { $id }
            fn kind(&self) -> $crate::task::TaskKind { $kind }
            fn params_default(&self) -> Self::Params { <Self::Params as Default>::default() }
            fn run_typed(&self, input: Option<Self::Input>, $p_ident: Self::Params) -> $crate::task::TaskRunResultTyped<Self::Output> {
                let $self_ident = self;
                let $inp_ident: Self::Input = match input {
                    Some(v) => v,
                    None => {
                        return $crate::task::TaskRunResultTyped::Failure {
                            error: $crate::errors::TaskExecutionError::Decode {
                                message: format!("task {} requires an input", $id),
                            },
                        }
                    }
                };
                let out: Result<Self::Output, $crate::errors::TaskExecutionError> = { $body };
                out.into()
            }
        }
    };

    // ---------------- Task Transform/Sink con fields sin ctor custom ----------------
    (
        task $name:ident {
            id: $id:expr,
            kind: $kind:expr,
            input: $inp:ty,
            output: $out:ty,
            params: $params:ty,
            fields { $($fname:ident : $fty:ty),+ $(,)? }
            , run($self_ident:ident, $inp_ident:ident, $p_ident:ident) $body:block
        }
    ) => {
        $crate::typed_task! {
            task $name {
                id: $id,
                kind: $kind,
                input: $inp,
                output: $out,
                params: $params,
                fields { $($fname : $fty),+ }
                , ctor (($($fname : $fty),+) { Self { $($fname),+ } })
                , run($self_ident, $inp_ident, $p_ident) $body
            }
        }
    };

    // ---------------- Task Transform/Sink unit (sin fields) ----------------
    (
        task $name:ident {
            id: $id:expr,
            kind: $kind:expr,
            input: $inp:ty,
            output: $out:ty,
            params: $params:ty,
            run($self_ident:ident, $inp_ident:ident, $p_ident:ident) $body:block
        }
    ) => {
        #[derive(Clone, Debug)]
        pub struct $name;
        impl $name { pub fn new() -> Self { Self } }
        impl Default for $name { fn default() -> Self { Self::new() } }
        impl $crate::task::TypedTask for $name {
            type Params = $params;
            type Input = $inp;
            type Output = $out;
            fn id(&self) -> &'static str { $id }
            fn kind(&self) -> $crate::task::TaskKind { $kind }
            fn params_default(&self) -> Self::Params { <Self::Params as Default>::default() }
            fn run_typed(&self, input: Option<Self::Input>, $p_ident: Self::Params) -> $crate::task::TaskRunResultTyped<Self::Output> {
                let $self_ident = self;
                let $inp_ident: Self::Input = match input {
                    Some(v) => v,
                    None => {
                        return $crate::task::TaskRunResultTyped::Failure {
                            error: $crate::errors::TaskExecutionError::Decode {
                                message: format!("task {} requires an input", $id),
                            },
                        }
                    }
                };
                let out: Result<Self::Output, $crate::errors::TaskExecutionError> = { $body };
                out.into()
            }
        }
    };
}
