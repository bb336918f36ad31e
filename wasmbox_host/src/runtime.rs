use crate::call;
use crate::config::Config;
use crate::loader::{self, Buffer, Encoding};
use std::path::Path;
use wasmtime::{
    Engine, Instance, Linker, Module, Store, StoreLimits, StoreLimitsBuilder, Val, WasmParams,
    WasmResults,
};

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("load error: {0}")]
    Load(#[from] loader::Error),

    #[error("text module support is disabled")]
    TextDisabled,

    #[error("engine setup failed: {0}")]
    Engine(wasmtime::Error),

    #[error("module compilation failed: {0}")]
    Compile(wasmtime::Error),

    #[error("instantiation failed: {0}")]
    Instantiate(wasmtime::Error),

    #[error("invocation error: {0}")]
    Invoke(#[from] call::Error),
}

/// Per-store host state. Nothing lives here except the limiter.
#[derive(Debug)]
struct HostState {
    limits: StoreLimits,
}

/// An instantiated module, ready for invocations. Owns the engine and store
/// for the lifetime of the process; dropping it drops the guest.
#[derive(Debug)]
pub struct Runtime {
    store: Store<HostState>,
    instance: Instance,
}

impl Runtime {
    pub fn new<C, P>(cfg: C, path: P) -> Result<Self>
    where
        C: Into<Config>,
        P: AsRef<Path>,
    {
        let buffer = Buffer::new(path)?;
        Self::from_buffer(cfg, &buffer)
    }

    /// Compile and link a loaded module against an empty import set.
    pub fn from_buffer<C: Into<Config>>(cfg: C, buffer: &Buffer) -> Result<Self> {
        let cfg = cfg.into();
        if buffer.encoding() == Encoding::Text && !cfg.text {
            return Err(Error::TextDisabled);
        }

        let engine = Engine::new(&cfg.engine_config()).map_err(Error::Engine)?;
        let module = Module::new(&engine, buffer.as_ref()).map_err(Error::Compile)?;

        let limits = StoreLimitsBuilder::new().memory_size(cfg.max_memory).build();
        let mut store = Store::new(&engine, HostState { limits });
        store.limiter(|state| &mut state.limits);
        if let Some(fuel) = cfg.fuel {
            store.set_fuel(fuel).map_err(Error::Engine)?;
        }

        // An empty linker satisfies exactly the modules with no imports;
        // anything else fails here as unsatisfied.
        let linker: Linker<HostState> = Linker::new(&engine);
        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(Error::Instantiate)?;

        log::debug!(
            "instantiated module: {} byte(s), {} export(s)",
            buffer.len(),
            module.exports().len()
        );

        Ok(Self { store, instance })
    }

    /// Signature of a named function export. Callers that parse arguments
    /// from the outside (the runner CLI) resolve types through this.
    pub fn signature(&mut self, name: &str) -> Result<wasmtime::FuncType> {
        let func = call::lookup(&mut self.store, &self.instance, name)?;
        Ok(func.ty(&self.store))
    }

    /// Invoke a named export with dynamically typed arguments.
    pub fn invoke(&mut self, name: &str, args: &[Val]) -> Result<Vec<Val>> {
        let func = call::lookup(&mut self.store, &self.instance, name)?;
        let ty = func.ty(&self.store);
        call::check_args(name, &ty, args).map_err(Error::Invoke)?;

        let mut results = vec![Val::I32(0); ty.results().len()];
        log::debug!("invoke {name} with {} argument(s)", args.len());
        func.call(&mut self.store, args, &mut results)
            .map_err(|e| Error::Invoke(call::classify(name, e)))?;

        Ok(results)
    }

    /// Statically typed invocation for signatures known at compile time.
    pub fn call<P, R>(&mut self, name: &str, params: P) -> Result<R>
    where
        P: WasmParams,
        R: WasmResults,
    {
        let func = call::lookup(&mut self.store, &self.instance, name)?;
        let typed = func.typed::<P, R>(&self.store).map_err(|error| {
            Error::Invoke(call::Error::IncompatibleSignature {
                name: name.to_string(),
                error,
            })
        })?;

        log::debug!("invoke {name} (typed)");
        typed
            .call(&mut self.store, params)
            .map_err(|e| Error::Invoke(call::classify(name, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use wasmtime::Trap;

    const POINT: &str = r#"
        (module
          (memory (export "memory") 1)
          (global $next (mut i32) (i32.const 8))
          (func (export "create_point") (param $x i32) (param $y i32) (result i32)
            (local $p i32)
            (local.set $p (global.get $next))
            (i32.store (local.get $p) (local.get $x))
            (i32.store (i32.add (local.get $p) (i32.const 4)) (local.get $y))
            (global.set $next (i32.add (local.get $p) (i32.const 8)))
            (local.get $p))
          (func (export "length") (param $p i32) (result i32)
            (local $x i32)
            (local $y i32)
            (local.set $x (i32.load (local.get $p)))
            (local.set $y (i32.load (i32.add (local.get $p) (i32.const 4))))
            (i32.trunc_f64_s
              (f64.sqrt
                (f64.convert_i32_s
                  (i32.add
                    (i32.mul (local.get $x) (local.get $x))
                    (i32.mul (local.get $y) (local.get $y))))))))
    "#;

    fn runtime(wat: &str) -> Runtime {
        let buffer = Buffer::from_bytes(wat.as_bytes().to_vec()).unwrap();
        Runtime::from_buffer(Config::default(), &buffer).unwrap()
    }

    #[test]
    fn point_sequence() {
        let mut rt = runtime(POINT);
        let point = rt.call::<(i32, i32), i32>("create_point", (40, 2)).unwrap();
        let length = rt.call::<i32, i32>("length", point).unwrap();
        assert_eq!(40, length);
    }

    #[test]
    fn point_sequence_dynamic() {
        let mut rt = runtime(POINT);
        let results = rt
            .invoke("create_point", &[Val::I32(40), Val::I32(2)])
            .unwrap();
        let Val::I32(point) = results[0] else {
            panic!("expected an i32 handle, got {:?}", results[0]);
        };
        let results = rt.invoke("length", &[Val::I32(point)]).unwrap();
        assert!(matches!(results[0], Val::I32(40)));
    }

    #[test]
    fn missing_export() {
        let mut rt = runtime(r#"(module (func (export "create_point")))"#);
        let err = rt.invoke("length", &[Val::I32(0)]).unwrap_err();
        assert!(matches!(
            err,
            Error::Invoke(call::Error::MissingExport(name)) if name == "length"
        ));
    }

    #[test]
    fn export_is_not_a_function() {
        let mut rt = runtime(r#"(module (memory (export "length") 1))"#);
        let err = rt.invoke("length", &[]).unwrap_err();
        assert!(matches!(
            err,
            Error::Invoke(call::Error::NotAFunction(_))
        ));
    }

    #[test]
    fn trap_is_classified() {
        let mut rt = runtime(r#"(module (func (export "boom") unreachable))"#);
        let err = rt.invoke("boom", &[]).unwrap_err();
        assert!(matches!(
            err,
            Error::Invoke(call::Error::Trap {
                trap: Trap::UnreachableCodeReached,
                ..
            })
        ));
    }

    #[test]
    fn fuel_bounds_execution() {
        let buffer =
            Buffer::from_bytes(r#"(module (func (export "spin") (loop $l (br $l))))"#.as_bytes().to_vec())
                .unwrap();
        let cfg = ConfigBuilder::new().fuel(10_000);
        let mut rt = Runtime::from_buffer(cfg.build(), &buffer).unwrap();
        let err = rt.invoke("spin", &[]).unwrap_err();
        assert!(matches!(
            err,
            Error::Invoke(call::Error::Trap {
                trap: Trap::OutOfFuel,
                ..
            })
        ));
    }

    #[test]
    fn malformed_binary_fails_compilation() {
        let mut bytes = b"\0asm\x01\0\0\0".to_vec();
        bytes.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        let buffer = Buffer::from_bytes(bytes).unwrap();
        let err = Runtime::from_buffer(Config::default(), &buffer).unwrap_err();
        assert!(matches!(err, Error::Compile(_)));
    }

    #[test]
    fn unsatisfied_import_fails_instantiation() {
        let buffer = Buffer::from_bytes(
            r#"(module (import "env" "missing" (func)))"#.as_bytes().to_vec(),
        )
        .unwrap();
        let err = Runtime::from_buffer(Config::default(), &buffer).unwrap_err();
        assert!(matches!(err, Error::Instantiate(_)));
    }

    #[test]
    fn text_can_be_disabled() {
        let buffer = Buffer::from_bytes(b"(module)".to_vec()).unwrap();
        let err = Runtime::from_buffer(ConfigBuilder::new().text(false).build(), &buffer)
            .unwrap_err();
        assert!(matches!(err, Error::TextDisabled));
    }

    #[test]
    fn typed_signature_mismatch() {
        let mut rt = runtime(POINT);
        let err = rt.call::<(i64, i64), i64>("create_point", (40, 2)).unwrap_err();
        assert!(matches!(
            err,
            Error::Invoke(call::Error::IncompatibleSignature { .. })
        ));
    }
}
