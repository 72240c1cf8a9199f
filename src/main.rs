//! txscope - propagation demo
//!
//! Runs the item service scenarios against the in-memory provider and
//! prints what each propagation policy did.

use std::path::PathBuf;
use std::process::ExitCode;

use txscope::config::TransactionalConfig;
use txscope::intercept::TransactionAttributes;
use txscope::items::{ItemResult, ItemService, ITEMS};
use txscope::provider::MemoryProvider;
use txscope::transaction::{ContextId, Propagation};

const SCENARIOS: &[(&str, &str)] = &[
    ("required", "REQUIRED starts a transaction when none exists"),
    ("requires-new", "REQUIRES_NEW always starts a new transaction"),
    ("never", "NEVER fails inside an existing transaction"),
    ("never-without", "NEVER runs without a transaction"),
    ("mandatory", "MANDATORY fails without an existing transaction"),
    ("supports", "SUPPORTS runs without a transaction when none exists"),
    ("not-supported", "NOT_SUPPORTED runs without a transaction"),
    ("rollback", "a failing operation rolls its transaction back"),
    ("audit", "a REQUIRES_NEW audit survives the outer rollback"),
    ("read-only-write", "a write declared read-only is rejected up front"),
];

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    // Parse simple command line args.
    let mut verbose = false;
    let mut config_path: Option<PathBuf> = None;
    let mut selected: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-c" | "--config" => {
                i += 1;
                if i < args.len() {
                    config_path = Some(PathBuf::from(&args[i]));
                }
            }
            "-s" | "--scenario" => {
                i += 1;
                if i < args.len() {
                    selected.push(args[i].clone());
                }
            }
            "-l" | "--list" => {
                for (name, description) in SCENARIOS {
                    println!("{:<16}{}", name, description);
                }
                return ExitCode::SUCCESS;
            }
            "-v" | "--verbose" => {
                verbose = true;
            }
            "-h" | "--help" => {
                print_help();
                return ExitCode::SUCCESS;
            }
            "--version" => {
                println!("txscope v{}", env!("CARGO_PKG_VERSION"));
                return ExitCode::SUCCESS;
            }
            arg => {
                eprintln!("Unknown option: {}", arg);
                return ExitCode::FAILURE;
            }
        }
        i += 1;
    }

    init_tracing(verbose);

    let config = match config_path {
        Some(path) => match TransactionalConfig::from_path(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => ItemService::declarations(),
    };

    if selected.is_empty() {
        selected = SCENARIOS.iter().map(|(name, _)| name.to_string()).collect();
    }

    let mut failed = false;
    for name in &selected {
        if !SCENARIOS.iter().any(|(known, _)| *known == name.as_str()) {
            eprintln!("Unknown scenario: {}", name);
            failed = true;
            continue;
        }
        run_scenario(name, config.clone());
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

fn print_help() {
    println!("txscope - declarative transaction propagation demo");
    println!();
    println!("Usage: txscope [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -s, --scenario NAME    Run only this scenario (repeatable)");
    println!("  -l, --list             List scenarios");
    println!("  -c, --config PATH      Load operation declarations from a JSON file");
    println!("  -v, --verbose          Enable debug logging");
    println!("  -h, --help             Show this help message");
    println!("  --version              Show version");
    println!();
    println!("Examples:");
    println!("  txscope                         Run every scenario");
    println!("  txscope -s requires-new         Run a single scenario");
    println!("  RUST_LOG=txscope=debug txscope  Show slot transitions");
}

fn run_scenario(name: &str, config: TransactionalConfig) {
    let provider = MemoryProvider::new();
    let service = ItemService::from_config(provider.clone(), config);
    let ctx = ContextId::current();

    println!("== {}", name);
    let outcome = match name {
        "required" => service.add_item_with_required(ctx, "Ice cream"),
        "requires-new" => service
            .add_item_with_required(ctx, "Snack")
            .and_then(|_| service.add_item_with_requires_new(ctx, "Coffee")),
        "never" => never_inside_transaction(&service, ctx),
        "never-without" => service.add_item_with_never(ctx, "Water"),
        "mandatory" => service.add_item_with_mandatory(ctx, "Banana"),
        "supports" => service.add_item_with_supports(ctx, "Soda"),
        "not-supported" => service.add_item_with_not_supported(ctx, "Coke"),
        "rollback" => service.add_item_then_fail(ctx, "Durian"),
        "audit" => service.add_rejected_item_with_audit(ctx, "Durian"),
        "read-only-write" => service
            .interceptor()
            .invoke(ctx, "update", &TransactionAttributes::read_only(), |_| {
                Ok::<_, txscope::items::ItemError>(())
            }),
        _ => return,
    };

    match outcome {
        Ok(()) => println!("   outcome: ok"),
        Err(e) => println!("   outcome: {}", e),
    }
    println!("   committed {}: {:?}", ITEMS, provider.rows(ITEMS));
    let stats = provider.stats();
    println!(
        "   connections: {} acquired, {} committed, {} rolled back, {} still open",
        stats.acquired,
        stats.commits,
        stats.rollbacks,
        provider.open_connections()
    );
}

fn never_inside_transaction(service: &ItemService, ctx: ContextId) -> ItemResult<()> {
    let coordinator = service.coordinator();
    coordinator.start(ctx, Propagation::Required)?;
    let result = service.add_item_with_never(ctx, "Apple");
    coordinator.commit_transaction(ctx, false)?;
    result
}
