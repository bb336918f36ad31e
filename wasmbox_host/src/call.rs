use wasmtime::{AsContextMut, Extern, Func, FuncType, Instance, Trap, Val, ValType};

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no export named {0}")]
    MissingExport(String),

    #[error("export is not a function: {0}")]
    NotAFunction(String),

    #[error("export {name} takes {expect} argument(s) but got {got}")]
    ArityMismatch {
        name: String,
        expect: usize,
        got: usize,
    },

    #[error("argument {index} of {name} must be {expect:?} but got {got:?}")]
    TypeMismatch {
        name: String,
        index: usize,
        expect: ValType,
        got: Val,
    },

    #[error("export {name} has incompatible signature: {error}")]
    IncompatibleSignature {
        name: String,
        error: wasmtime::Error,
    },

    #[error("call to {name} trapped: {trap}")]
    Trap { name: String, trap: Trap },

    #[error("call to {name} failed: {error}")]
    Call {
        name: String,
        error: wasmtime::Error,
    },
}

/// Resolve a named export to a callable function.
pub(crate) fn lookup(
    mut store: impl AsContextMut,
    instance: &Instance,
    name: &str,
) -> Result<Func> {
    let Some(ext) = instance.get_export(&mut store, name) else {
        return Err(Error::MissingExport(name.to_string()));
    };

    match ext {
        Extern::Func(func) => Ok(func),
        _ => Err(Error::NotAFunction(name.to_string())),
    }
}

/// Arity and type check before handing the arguments to the engine. Only
/// numeric parameters are supported; reference-typed parameters never match.
pub(crate) fn check_args(name: &str, ty: &FuncType, args: &[Val]) -> Result<()> {
    if ty.params().len() != args.len() {
        return Err(Error::ArityMismatch {
            name: name.to_string(),
            expect: ty.params().len(),
            got: args.len(),
        });
    }

    for (index, (param, arg)) in ty.params().zip(args.iter()).enumerate() {
        if !compatible(&param, arg) {
            return Err(Error::TypeMismatch {
                name: name.to_string(),
                index,
                expect: param,
                got: arg.clone(),
            });
        }
    }

    Ok(())
}

/// Split a failed call into trap vs. everything else the engine reports.
pub(crate) fn classify(name: &str, error: wasmtime::Error) -> Error {
    match error.downcast_ref::<Trap>() {
        Some(trap) => Error::Trap {
            name: name.to_string(),
            trap: *trap,
        },
        None => Error::Call {
            name: name.to_string(),
            error,
        },
    }
}

fn compatible(ty: &ValType, val: &Val) -> bool {
    matches!(
        (ty, val),
        (ValType::I32, Val::I32(_))
            | (ValType::I64, Val::I64(_))
            | (ValType::F32, Val::F32(_))
            | (ValType::F64, Val::F64(_))
            | (ValType::V128, Val::V128(_))
    )
}
