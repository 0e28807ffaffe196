mod body;
mod cli;
mod client;
mod config;
mod dispatch;
mod endpoints;
mod filter;
mod output;

use crate::body::ProcessStdin;
use crate::cli::{Cli, Commands, CompletionShell};
use crate::client::ApiClient;
use crate::config::{ClientConfig, Config, ConfigError, REGION_ENV, Region, mask_token};
use crate::output::OutputOptions;
use anyhow::{Context, Result, anyhow};
use clap::FromArgMatches;
use serde_json::json;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::{env, fs};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "CIO_LOG";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let matches = cli::command().get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(err) => err.exit(),
    };
    init_tracing(cli.verbose);

    let output = cli.output_options()?;
    let cwd = env::current_dir().context("reading current directory")?;

    match &cli.command {
        Some(Commands::Version) => {
            println!("cio {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Completion { shell }) => {
            print_completion(*shell, &mut io::stdout().lock())?
        }
        Some(Commands::Configure { token, scope }) => {
            let mut existing = config::load_scope((*scope).into(), &cwd)?;
            existing.token = Some(token.clone());
            if let Some(region) = cli.region.clone() {
                existing.region = Some(region);
            }
            let path = config::save((*scope).into(), &existing, &cwd)?;
            println!("Saved API token to {}", path.display());
        }
        Some(Commands::ConfigShow) => config_show(&cli, &cwd)?,
        Some(Commands::Status) => status(&cli, &cwd, &output)?,
        None => {
            let (endpoint, matches) =
                cli::selected_endpoint(&matches).ok_or_else(|| anyhow!("unknown command"))?;
            debug!(command = endpoint.name, "selected endpoint");
            let request = cli::request(endpoint, matches);
            let stdout = io::stdout();
            let mut out = stdout.lock();
            dispatch::run(
                endpoint,
                &request,
                &mut ProcessStdin,
                || connect(&cli, &cwd),
                &output,
                &mut out,
            )?;
        }
    }

    Ok(())
}

/// `CIO_LOG` wins; otherwise `-v` and `-vv` raise our own level. Silent by default.
fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "off",
        1 => "cio=debug",
        _ => "cio=trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn region_selector(cli: &Cli, file: &Config) -> String {
    config::resolve_region(cli.region.as_deref(), env::var(REGION_ENV).ok(), file)
}

fn connect(cli: &Cli, cwd: &Path) -> Result<ApiClient> {
    let file = config::load(cwd)?;
    let region = region_selector(cli, &file);
    let resolved = ClientConfig::from_env(Region::from_selector(&region), &file)?;
    debug!(region = %region, base_url = %resolved.base_url, "resolved client configuration");
    Ok(ApiClient::new(&resolved)?)
}

fn status(cli: &Cli, cwd: &Path, output: &OutputOptions) -> Result<()> {
    let file = config::load(cwd)?;
    let region = region_selector(cli, &file);
    let resolved = match ClientConfig::from_env(Region::from_selector(&region), &file) {
        Ok(resolved) => resolved,
        Err(err) => {
            eprintln!("CUSTOMERIO_API_TOKEN is not set.");
            eprintln!();
            eprintln!("Set it with:");
            eprintln!("  export CUSTOMERIO_API_TOKEN=\"your-app-api-key\"");
            eprintln!();
            eprintln!("Or store it with:");
            eprintln!("  cio configure --token <your-app-api-key>");
            return Err(err.into());
        }
    };

    let client = ApiClient::new(&resolved)?;
    if let Err(err) = client.get("/v1/info/ip_addresses", &[]) {
        debug!(error = %err, "status check failed");
        eprintln!("Authentication failed.");
        eprintln!();
        eprintln!("Your CUSTOMERIO_API_TOKEN may be invalid or expired.");
        eprintln!("Get a new key from: https://fly.customer.io/settings/api_credentials");
        return Err(anyhow!("authentication failed"));
    }

    let masked = mask_token(&resolved.token);
    if cli.json {
        let summary = json!({
            "authenticated": true,
            "region": region,
            "token": masked,
        });
        let payload = serde_json::to_vec(&summary).context("serializing status")?;
        let stdout = io::stdout();
        output.render(&mut stdout.lock(), &payload)?;
        return Ok(());
    }

    println!("Authenticated ({masked})");
    println!("Region: {region}");
    Ok(())
}

fn config_show(cli: &Cli, cwd: &Path) -> Result<()> {
    let file = config::load(cwd)?;
    let region = region_selector(cli, &file);
    let selected = Region::from_selector(&region);
    let token = match ClientConfig::from_env(selected, &file) {
        Ok(resolved) => mask_token(&resolved.token),
        Err(ConfigError::MissingToken) => "(not set)".to_string(),
        Err(err) => return Err(err.into()),
    };
    println!("base_url: {}", config::effective_base_url(selected));
    println!("region: {region}");
    println!("token: {token}");

    let user = config::config_path(config::Scope::User, cwd)?;
    let local = config::config_path(config::Scope::Local, cwd)?;
    for path in [user, local] {
        let state = if fs::metadata(&path).is_ok() {
            "present"
        } else {
            "absent"
        };
        println!("config: {} ({state})", path.display());
    }
    Ok(())
}

fn print_completion<W: Write>(shell: CompletionShell, out: &mut W) -> io::Result<()> {
    use clap_complete::{generate, shells};
    let mut cmd = cli::command();
    let bin = cmd.get_name().to_string();
    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, bin, out),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, bin, out),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, bin, out),
        CompletionShell::PowerShell => generate(shells::PowerShell, &mut cmd, bin, out),
    }
    out.flush()
}
