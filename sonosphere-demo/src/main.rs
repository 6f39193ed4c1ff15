mod cli;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args: Vec<String> = std::env::args().collect();
    let value_of = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };
    let source = match (value_of("--config"), value_of("--sounds")) {
        (Some(configuration), Some(sounds)) => cli::CatalogueInput::Files {
            configuration,
            sounds,
        },
        _ => cli::CatalogueInput::Builtin,
    };

    if args.iter().any(|a| a == "--threaded") {
        cli::run_threaded(&source)
    } else {
        cli::run_scripted(&source)
    }
}
