use clap::Parser;
use tabled::Table;
use tabled::builder::Builder;
use tabled::settings::{Panel, Style};
use wasmbox_host::Buffer;
use wasmtime::{Engine, ExternType, FuncType, Module};

#[derive(Debug)]
struct ModuleInfo {
    /// Export surface: name, kind, type. Sorted by name.
    exports: Vec<(String, &'static str, String)>,
    /// Import surface: module, name, type. Everything listed here must be
    /// satisfied by the host before the module can be instantiated.
    imports: Vec<(String, String, String)>,
}

impl ModuleInfo {
    fn new(module: &Module) -> Self {
        let mut exports: Vec<_> = module
            .exports()
            .map(|e| (e.name().to_string(), kind(&e.ty()), type_repr(&e.ty())))
            .collect();
        exports.sort();

        let imports = module
            .imports()
            .map(|i| (i.module().to_string(), i.name().to_string(), type_repr(&i.ty())))
            .collect();

        Self { exports, imports }
    }

    fn table_exports(&self) -> Table {
        let mut builder = Builder::default();
        builder.push_record(["Name", "Kind", "Type"]);

        if self.exports.is_empty() {
            log::warn!("module has no exports");
        }

        for (name, kind, ty) in self.exports.iter() {
            builder.push_record([name.as_str(), kind, ty.as_str()]);
        }

        let mut table = builder.build();
        table.with(Style::modern());
        table.with(Panel::header("Exports"));
        table
    }

    fn table_imports(&self) -> Table {
        let mut builder = Builder::default();
        builder.push_record(["Module", "Name", "Type"]);

        for (module, name, ty) in self.imports.iter() {
            builder.push_record([module.as_str(), name.as_str(), ty.as_str()]);
        }

        let mut table = builder.build();
        table.with(Style::modern());
        table.with(Panel::header("Imports"));
        table
    }
}

fn kind(ty: &ExternType) -> &'static str {
    match ty {
        ExternType::Func(_) => "func",
        ExternType::Global(_) => "global",
        ExternType::Table(_) => "table",
        ExternType::Memory(_) => "memory",
        ExternType::Tag(_) => "tag",
    }
}

fn type_repr(ty: &ExternType) -> String {
    match ty {
        ExternType::Func(f) => func_repr(f),
        ExternType::Global(g) => format!("{:?}", g.content()),
        ExternType::Table(t) => format!("{:?}", t.element()),
        ExternType::Memory(m) => format!("{} page(s) min", m.minimum()),
        ExternType::Tag(_) => String::new(),
    }
}

fn func_repr(ty: &FuncType) -> String {
    let params = ty
        .params()
        .map(|p| format!("{p:?}"))
        .collect::<Vec<_>>()
        .join(", ");
    let results = ty
        .results()
        .map(|r| format!("{r:?}"))
        .collect::<Vec<_>>()
        .join(", ");

    if results.is_empty() {
        format!("({params})")
    } else {
        format!("({params}) -> {results}")
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "FILE")]
    file: String,

    /// Also list the import surface
    #[arg(short, long, env = "IMPORTS")]
    imports: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Compiled, never instantiated: inspection must not run guest code.
    let buffer = Buffer::new(&args.file)?;
    let engine = Engine::default();
    let module = Module::new(&engine, buffer.as_ref())?;

    let info = ModuleInfo::new(&module);
    println!("{}", info.table_exports());
    if args.imports {
        println!("\n{}", info.table_imports());
    }

    Ok(())
}
