use clap::Parser;
use step_context::cli::commands::{cmd_demo, cmd_render};
use step_context::cli::config::{Cli, Commands, load_config};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref());

    let all_passed = match cli.command {
        Commands::Demo {
            async_steps,
            panics,
            failures,
            format,
        } => cmd_demo(
            async_steps,
            panics,
            failures,
            format.as_deref(),
            &config,
            cli.verbose,
        )?,
        Commands::Render { input, format } => cmd_render(&input, format.as_deref(), &config)?,
    };

    if !all_passed {
        std::process::exit(1);
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise `-v` raises the default level.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| level.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
