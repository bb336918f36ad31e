use std::env::args;
use wasmbox_host::{Config, Runtime};

const DEFAULT_MODULE: &str = "demos/point-host/point.wat";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let path = args().nth(1).unwrap_or_else(|| DEFAULT_MODULE.to_string());
    log::info!("running point module: {path}");

    let mut runtime = Runtime::new(Config::default(), &path)?;
    let point = runtime.call::<(i32, i32), i32>("create_point", (40, 2))?;
    let length = runtime.call::<i32, i32>("length", point)?;
    println!("Length = {length}");

    Ok(())
}
