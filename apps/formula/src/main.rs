//! formula - build and install native programs from YAML formulas
//!
//! The CLI loads configuration, parses the formula and hands it to the
//! builder crate, rendering pipeline events as they arrive.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands};
use crate::display::{CommandOutput, FileDigest, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use formula_builder::{
    fetch_only, parse_formula_file, probe_dependencies, BuildSettings, Formula, InstallPlan,
    Pipeline,
};
use formula_config::Config;
use formula_errors::PipelineError;
use formula_events::{EventReceiver, EventSender};
use formula_hash::Digest;
use formula_net::{NetClient, NetConfig};
use formula_types::ColorChoice;
use std::process;
use std::time::Duration;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
            print_tool_output(&e);
        }
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting formula v{}", env!("CARGO_PKG_VERSION"));

    // Precedence: defaults < file < environment < CLI flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.global, &cli.command);
    config.validate()?;

    let colors_enabled = match config.general.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
    };
    let renderer = OutputRenderer::new(cli.global.json, colors_enabled);
    let mut event_handler = EventHandler::new(colors_enabled, cli.global.json, cli.global.debug);

    let (event_sender, event_receiver) = formula_events::channel();
    let output = execute_command_with_events(
        cli.command,
        config,
        event_sender,
        event_receiver,
        &mut event_handler,
    )
    .await?;

    renderer.render_result(&output)?;
    info!("Command completed successfully");
    Ok(())
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    config: Config,
    event_sender: EventSender,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<CommandOutput, CliError> {
    let mut command_future = Box::pin(execute_command(command, config, event_sender));

    loop {
        select! {
            result = &mut command_future => {
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                if let Some(event) = event {
                    event_handler.handle_event(event);
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    config: Config,
    tx: EventSender,
) -> Result<CommandOutput, CliError> {
    let formula = match command.formula_path() {
        Some(path) => Some(parse_formula_file(path).await?),
        None => None,
    };

    match (command, formula) {
        (Commands::Install { .. }, Some(formula)) => {
            let settings = BuildSettings::resolve(&config, &formula);
            let client = net_client(&config)?;
            let outcome = Pipeline::new(client, settings, tx)
                .with_command("install")
                .run(&formula)
                .await?;
            Ok(CommandOutput::Installed(outcome))
        }

        (Commands::Fetch { output, .. }, Some(formula)) => {
            let client = net_client(&config)?;
            let fetched = fetch_only(&client, &formula, &output, &tx).await?;
            Ok(CommandOutput::Fetched(fetched))
        }

        (Commands::Check { .. }, Some(formula)) => Ok(CommandOutput::Plan(Box::new(
            check_plan(&config, &formula),
        ))),

        (Commands::Deps { .. }, Some(formula)) => Ok(CommandOutput::Dependencies(
            probe_dependencies(&formula.dependencies),
        )),

        (Commands::Digest { files, algorithm }, _) => {
            let mut digests = Vec::with_capacity(files.len());
            for path in files {
                let digest = Digest::hash_file(algorithm, &path).await?;
                digests.push(FileDigest {
                    path,
                    algorithm: algorithm.to_string(),
                    digest: digest.to_hex(),
                });
            }
            Ok(CommandOutput::Digests(digests))
        }

        (_, None) => Err(CliError::InvalidArguments(
            "a formula file is required".to_string(),
        )),
    }
}

/// Plan for `check`: no scratch directory is created
fn check_plan(config: &Config, formula: &Formula) -> InstallPlan {
    let settings = BuildSettings::resolve(config, formula);
    let scratch = settings
        .build_root
        .join(format!("formula-{}-XXXXXX", formula.name));
    InstallPlan::new(formula, &settings, &scratch)
}

fn net_client(config: &Config) -> Result<NetClient, CliError> {
    let net_config = NetConfig {
        timeout: Duration::from_secs(config.network.timeout),
        connect_timeout: Duration::from_secs(config.network.connect_timeout),
        ..NetConfig::default()
    };
    Ok(NetClient::new(&net_config)?)
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &cli::GlobalArgs, command: &Commands) {
    if let Some(color) = global.color {
        config.general.color = color;
    }

    if let Commands::Install {
        prefix,
        jobs,
        compiler,
        compiler_version,
        keep_scratch,
        ..
    } = command
    {
        if let Some(prefix) = prefix {
            config.paths.prefix.clone_from(prefix);
        }
        if let Some(jobs) = jobs {
            config.build.jobs = *jobs;
        }
        if let Some(compiler) = compiler {
            config.toolchain.compiler_id = *compiler;
        }
        if let Some(version) = compiler_version {
            config.toolchain.compiler_version = Some(version.clone());
        }
        if let Some(keep) = keep_scratch {
            config.build.keep_scratch = *keep;
        }
    }
}

/// Print the failing tool's output tail below the error summary
fn print_tool_output(err: &CliError) {
    if let CliError::Ops(formula_errors::Error::Pipeline(p)) = err {
        if let Some(output) = p.tool_output() {
            let tool = match p {
                PipelineError::Configure { .. } => "configure",
                _ => "build",
            };
            eprintln!("\nLast lines of {tool} output:");
            for line in output.lines() {
                eprintln!("  {line}");
            }
        }
    }
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    let default_filter = if debug_enabled_flag {
        "debug"
    } else {
        "warn,formula=info,formula_builder=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    if json_mode {
        // stdout carries JSON events; logs go to stderr
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    }
}
