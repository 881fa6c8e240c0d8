use anyhow::{Context, Result, anyhow};
use loopcat::catalog::Catalog;
use loopcat::config::{Config, default_catalog_path};
use loopcat::ui::PlayerUI;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!("Loopcat - browse and audition looper patches in the terminal");
    println!();
    println!("USAGE:");
    println!("    loopcat [OPTIONS] [PATCH]");
    println!();
    println!("ARGS:");
    println!("    PATCH           Catalog number to play immediately (skips the picker)");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help      Print this help message");
    println!("    --catalog PATH  Catalog file to load (default: config or data dir)");
    println!("    --debug         Write debug logging to loopcat-debug.log");
    println!();
    println!("PICKER CONTROLS:");
    println!("    Type      Filter patches");
    println!("    Up/Down   Select patch");
    println!("    Enter     Play selected patch");
    println!("    Esc       Clear filter / quit");
    println!();
    println!("PLAYER CONTROLS:");
    println!("    Space     All start / all stop");
    println!("    1-3       Toggle track");
    println!("    Left/Right  Previous/next patch");
    println!("    T         Theme picker");
    println!("    Esc       Back to picker");
    println!("    Q         Quit");
}

struct Args {
    debug: bool,
    catalog: Option<PathBuf>,
    patch: Option<u32>,
}

fn parse_args() -> Result<Option<Args>> {
    let mut args = Args {
        debug: false,
        catalog: None,
        patch: None,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--debug" => args.debug = true,
            "--catalog" => {
                let path = iter.next().ok_or_else(|| anyhow!("--catalog needs a path"))?;
                args.catalog = Some(PathBuf::from(path));
            }
            other => {
                let number = other
                    .parse::<u32>()
                    .map_err(|_| anyhow!("unexpected argument '{}'", other))?;
                args.patch = Some(number);
            }
        }
    }
    Ok(Some(args))
}

fn init_logging() -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("loopcat-debug.log")
        .context("cannot open loopcat-debug.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("loopcat=debug")),
        )
        .with_writer(std::sync::Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let Some(args) = parse_args()? else {
        print_help();
        return Ok(());
    };

    // The TUI owns the terminal, so logging goes to a file and only when
    // asked for.
    if args.debug {
        init_logging()?;
    }

    let config = Config::load();

    let catalog_path = args
        .catalog
        .clone()
        .or_else(|| config.catalog.clone())
        .or_else(default_catalog_path)
        .ok_or_else(|| anyhow!("no catalog location available; pass --catalog PATH"))?;

    let catalog = Catalog::load(&catalog_path).with_context(|| {
        format!(
            "no usable catalog at {} (import your loops first, or pass --catalog PATH)",
            catalog_path.display()
        )
    })?;

    let initial_patch = match args.patch {
        Some(number) => {
            let patch = catalog
                .by_catalog_number(number)
                .ok_or_else(|| anyhow!("patch #{} not found in catalog", number))?;
            catalog.position_of(&patch.id)
        }
        None => None,
    };

    tracing::debug!(
        catalog = %catalog_path.display(),
        patches = catalog.len(),
        "starting player"
    );

    let mut ui = PlayerUI::new(catalog, config, initial_patch)?;
    ui.run()
}
