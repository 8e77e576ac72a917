use clap::Parser;
use fastreflect_rs::{
    native::{NativeTypeSystem, TypeTable},
    CacheConfig, FieldDescriptor, MethodDescriptor, ReflectError, ResolutionError, TypeCache,
    TypeDescriptor,
};
use serde::Serialize;
use std::{process::ExitCode, sync::Arc};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum DumpError {
    #[error(transparent)]
    Reflect(#[from] ReflectError),
    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Dump the cached descriptor of a built-in type"
)]
struct Args {
    /// The registered name of the type to dump (e.g. String)
    type_name: Option<String>,
    /// List every registered type instead
    #[arg(long)]
    list: bool,
    /// Include members inherited from ancestors
    #[arg(long)]
    flattened: bool,
    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
    /// Print cache statistics afterwards (also enabled by FASTREFLECT_METRICS)
    #[arg(long)]
    stats: bool,
}

#[derive(Serialize)]
struct FieldSummary {
    name: String,
    declared_on: String,
    kind: String,
    field_type: String,
    can_read: bool,
    can_write: bool,
    accelerated: bool,
}

impl FieldSummary {
    fn new(field: &FieldDescriptor) -> Self {
        Self {
            name: field.name().to_string(),
            declared_on: field.declaring_type().to_string(),
            kind: format!("{:?}", field.kind()),
            field_type: field.field_type().to_string(),
            can_read: field.can_read(),
            can_write: field.can_write(),
            accelerated: field.is_accelerated_read() || field.is_accelerated_write(),
        }
    }
}

#[derive(Serialize)]
struct MethodSummary {
    name: String,
    declared_on: String,
    parameters: Vec<String>,
    return_type: Option<String>,
    is_virtual: bool,
    accelerated: bool,
}

impl MethodSummary {
    fn new(method: &MethodDescriptor) -> Self {
        Self {
            name: method.name().to_string(),
            declared_on: method.declaring_type().to_string(),
            parameters: method.parameter_types().iter().map(|p| p.to_string()).collect(),
            return_type: method.return_type().map(|r| r.to_string()),
            is_virtual: method.is_virtual(),
            accelerated: method.is_accelerated(),
        }
    }
}

#[derive(Serialize)]
struct TypeSummary {
    name: String,
    kind: String,
    parent: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<FieldSummary>,
    methods: Vec<MethodSummary>,
}

impl TypeSummary {
    fn new(ty: &TypeDescriptor, flattened: bool) -> Self {
        let levels: Vec<&TypeDescriptor> = if flattened {
            ty.ancestors().collect()
        } else {
            vec![ty]
        };
        Self {
            name: ty.name().to_string(),
            kind: format!("{:?}", ty.kind()),
            parent: ty.parent().map(|p| p.name().to_string()),
            interfaces: ty.interfaces().map(|i| i.name().to_string()).collect(),
            fields: levels
                .iter()
                .flat_map(|l| l.fields())
                .map(|f| FieldSummary::new(f))
                .collect(),
            methods: levels
                .iter()
                .flat_map(|l| l.methods())
                .map(|m| MethodSummary::new(m))
                .collect(),
        }
    }

    fn print(&self) {
        println!("{} ({})", self.name, self.kind);
        if let Some(parent) = &self.parent {
            println!("  extends {}", parent);
        }
        for interface in &self.interfaces {
            println!("  implements {}", interface);
        }

        println!("\nFields:");
        for field in &self.fields {
            let access = match (field.can_read, field.can_write) {
                (true, true) => "rw",
                (true, false) => "r",
                (false, true) => "w",
                (false, false) => "-",
            };
            println!(
                "  - {}: {} [{} {}] on {}{}",
                field.name,
                field.field_type,
                field.kind,
                access,
                field.declared_on,
                if field.accelerated { " (accelerated)" } else { "" }
            );
        }

        println!("\nMethods:");
        for method in &self.methods {
            println!(
                "  - {}({}){} on {}{}{}",
                method.name,
                method.parameters.join(", "),
                method
                    .return_type
                    .as_ref()
                    .map(|r| format!(" -> {}", r))
                    .unwrap_or_default(),
                method.declared_on,
                if method.is_virtual { " virtual" } else { "" },
                if method.accelerated { " (accelerated)" } else { "" }
            );
        }
    }
}

fn run(args: &Args) -> Result<(), DumpError> {
    let table = Arc::new(TypeTable::builtin().map_err(ReflectError::from)?);

    if args.list || args.type_name.is_none() {
        let names = table.names();
        if args.json {
            println!("{}", serde_json::to_string_pretty(&names)?);
        } else {
            println!("Available types:");
            for name in names {
                println!("  {}", name);
            }
        }
        return Ok(());
    }

    let name = args.type_name.as_deref().unwrap_or_default();
    let handle = table
        .find(name)
        .ok_or_else(|| ReflectError::from(ResolutionError::UnknownType(name.to_string())))?;
    tracing::debug!(ty = name, definition = ?table.definition(handle), "dumping type");

    let config = CacheConfig::from_env();
    let cache = TypeCache::with_config(
        table.clone(),
        Default::default(),
        config.with_metrics(config.collect_metrics || args.stats),
    );
    let ty = cache.resolve(handle).map_err(ReflectError::from)?;
    let summary = TypeSummary::new(&ty, args.flattened);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        summary.print();
    }

    if let Some(stats) = cache.stats() {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("\n{}", stats);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("FASTREFLECT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
