use anyhow::anyhow;
use clap::Parser;
use std::path::PathBuf;
use wasmbox_host::{Buffer, ConfigBuilder, Runtime};
use wasmtime::{FuncType, Val, ValType};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Module to run (.wasm or .wat)
    #[arg(env = "MODULE")]
    file: PathBuf,

    /// Name of the export to invoke
    #[arg(short, long, env = "INVOKE")]
    invoke: String,

    /// Arguments for the export, parsed against its signature
    args: Vec<String>,

    /// Instruction budget; runs unbounded when absent
    #[arg(long, env = "FUEL")]
    fuel: Option<u64>,

    /// Cap on guest linear memory in bytes
    #[arg(long, env = "MAX_MEMORY")]
    max_memory: Option<usize>,
}

fn validate(args: &Args) -> anyhow::Result<()> {
    if !args.file.is_file() {
        return Err(anyhow!(
            "Provided path is not a file: {}",
            args.file.display()
        ));
    }

    Ok(())
}

/// Parse raw CLI words into values matching the export's parameter list.
fn parse_args(name: &str, ty: &FuncType, raw: &[String]) -> anyhow::Result<Vec<Val>> {
    if ty.params().len() != raw.len() {
        return Err(anyhow!(
            "{} takes {} argument(s) but {} were provided",
            name,
            ty.params().len(),
            raw.len()
        ));
    }

    ty.params()
        .zip(raw.iter())
        .enumerate()
        .map(|(idx, (param, word))| parse_val(&param, word).map_err(|e| anyhow!("argument {idx}: {e}")))
        .collect()
}

fn parse_val(ty: &ValType, word: &str) -> anyhow::Result<Val> {
    let val = match ty {
        ValType::I32 => Val::I32(word.parse()?),
        ValType::I64 => Val::I64(word.parse()?),
        ValType::F32 => Val::F32(word.parse::<f32>()?.to_bits()),
        ValType::F64 => Val::F64(word.parse::<f64>()?.to_bits()),
        other => return Err(anyhow!("unsupported parameter type: {other:?}")),
    };

    Ok(val)
}

fn display(val: &Val) -> String {
    match val {
        Val::I32(v) => v.to_string(),
        Val::I64(v) => v.to_string(),
        Val::F32(bits) => f32::from_bits(*bits).to_string(),
        Val::F64(bits) => f64::from_bits(*bits).to_string(),
        other => format!("{other:?}"),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    validate(&args)?;

    let mut cfg = ConfigBuilder::new();
    if let Some(fuel) = args.fuel {
        cfg = cfg.fuel(fuel);
    }
    if let Some(max_memory) = args.max_memory {
        cfg = cfg.max_memory(max_memory);
    }

    let buffer = Buffer::new(&args.file)?;
    let mut runtime = Runtime::from_buffer(cfg.build(), &buffer)?;

    let ty = runtime.signature(&args.invoke)?;
    let vals = parse_args(&args.invoke, &ty, &args.args)?;

    log::info!("invoking {} from {}", args.invoke, args.file.display());
    for val in runtime.invoke(&args.invoke, &vals)? {
        println!("{}", display(&val));
    }

    Ok(())
}
