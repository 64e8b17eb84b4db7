// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! DKP Version Switcher (dkpswitch) - Main Application
//!
//! Entry point for the dkpswitch CLI, which switches the active Konvoy/DKP
//! binary between releases published on GitHub.
//!
//! The application supports:
//! - Switching to a specific GA version
//! - Listing GA or all releases and picking one interactively
//! - Restoring the version previously used in the current directory
//! - Showing the currently active version

use std::error::Error;
use std::fs;
use std::io::IsTerminal;
use std::process::exit;

use chrono::DateTime;
use clap::{CommandFactory, Parser};

mod cli;

use cli::{Cli, StandaloneAction};
use dkpswitch::catalog::API_BASE_ENV_VAR;
use dkpswitch::credentials::read_token;
use dkpswitch::marker::read_marker;
use dkpswitch::version::sorted_names;
use dkpswitch::{
    GithubClient, InstallLayout, Installer, Platform, ProductLine, Release, find_release,
};

/// Main application entry point
///
/// Parses command line arguments and dispatches to the matching command.
/// Any error is printed to stderr and terminates the process with status 1.
fn main() {
    let cli = Cli::parse();

    if cli.completion.is_some() {
        print_bash_completion();
        return;
    }

    let verbose = cli.verbose;

    // Note: conflicts_with_all ensures mutual exclusivity at parse time
    let result = match (cli.standalone_action(), cli.target_version) {
        (Some(StandaloneAction::List), _) => cmd_list(!cli.all, verbose),
        (Some(StandaloneAction::Init), _) => cmd_init(verbose),
        (Some(StandaloneAction::Current), _) => cmd_current(verbose),
        (Some(StandaloneAction::BuildInfo), _) => {
            cmd_build_info();
            Ok(())
        }
        (None, Some(version)) => cmd_switch(&version, verbose),
        (None, None) => Cli::command().print_help().map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("{e}");
        exit(1);
    }
}

// =============================================================================
// Command Implementation Functions
// =============================================================================

/// Switch to the GA release matching `version`
///
/// The lookup happens before anything is written, so an unknown version
/// leaves the cache, the link and the marker untouched.
fn cmd_switch(version: &str, verbose: bool) -> Result<(), Box<dyn Error>> {
    let client = connect(verbose)?;
    let releases = client.list_product_releases(true)?;

    let release = find_release(&releases, version)
        .ok_or_else(|| format!("Could not find a valid GA release for {version}"))?;

    if verbose && release.name() != version {
        eprintln!("Resolved {version} to {}", release.name());
    }

    install(&client, release, verbose)
}

/// List releases and, on a terminal, install the one the user picks
fn cmd_list(ga_only: bool, verbose: bool) -> Result<(), Box<dyn Error>> {
    let client = connect(verbose)?;
    let releases = client.list_product_releases(ga_only)?;

    if !(std::io::stdin().is_terminal() && std::io::stdout().is_terminal()) {
        print_releases(&releases, verbose);
        return Ok(());
    }

    println!("Available DKP Versions:");
    select_and_install(&client, &releases, verbose)
}

/// Re-install the version recorded in the current directory
fn cmd_init(verbose: bool) -> Result<(), Box<dyn Error>> {
    let cwd = std::env::current_dir()?;
    let recorded = read_marker(&cwd)?;

    let client = connect(verbose)?;
    let releases = client.list_product_releases(true)?;

    match recorded {
        Some(version) => {
            if verbose {
                eprintln!("Found previously used version {version}");
            }
            let release = find_release(&releases, &version)
                .ok_or_else(|| format!("Could not find a valid GA release for {version}"))?;
            install(&client, release, verbose)
        }
        None => {
            println!("No previous DKP use detected, please select desired version: ");
            select_and_install(&client, &releases, verbose)
        }
    }
}

/// Show the recorded version and where each product link resolves
fn cmd_current(verbose: bool) -> Result<(), Box<dyn Error>> {
    let layout = InstallLayout::from_env()?;

    match read_marker(&layout.marker_dir)? {
        Some(version) => println!("{version}"),
        None => println!("No DKP version recorded in this directory"),
    }

    for product in ProductLine::ALL {
        let link = layout.link_path(product);
        match fs::read_link(&link) {
            Ok(target) => println!("{product}: {} -> {}", link.display(), target.display()),
            Err(_) if verbose => eprintln!("{product}: no link at {}", link.display()),
            Err(_) => {}
        }

        // A binary earlier in PATH shadows the published link
        if let Ok(found) = which::which(product.link_name())
            && found != link
        {
            eprintln!(
                "Warning: {} in ${{PATH}} resolves to {} instead of {}",
                product.link_name(),
                found.display(),
                link.display()
            );
        }
    }
    Ok(())
}

/// Print tool version, build time and host platform
fn cmd_build_info() {
    let platform = Platform::detect();
    let build_time = env!("DKPSWITCH_BUILD_TIME")
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map_or_else(|| "unknown".to_string(), |t| t.to_rfc3339());

    println!("Version:\t{}", env!("CARGO_PKG_VERSION"));
    println!("Built:\t\t{build_time}");
    println!("OS:\t\t{}", platform.os);
    println!("Arch:\t\t{}", platform.arch);
}

// =============================================================================
// Helpers
// =============================================================================

/// Read the access token and verify it against the API
fn connect(verbose: bool) -> Result<GithubClient, Box<dyn Error>> {
    let token = read_token()?;
    let client = match std::env::var(API_BASE_ENV_VAR) {
        Ok(base) if !base.is_empty() => GithubClient::with_base_url(&base, token, verbose),
        _ => GithubClient::new(token, verbose),
    };

    let user = client.authenticate()?;
    if let Some(expiration) = &user.token_expiration {
        eprintln!("Token Expiration: {expiration}");
    }
    println!("Welcome {}!", user.login);
    Ok(client)
}

fn install(client: &GithubClient, release: &Release, verbose: bool) -> Result<(), Box<dyn Error>> {
    let layout = InstallLayout::from_env()?;
    let installer = Installer::new(layout, client, verbose);
    let report = installer.install(release, &Platform::detect())?;

    if verbose {
        eprintln!(
            "{} {} -> {} (downloaded: {}, extracted: {})",
            report.product,
            report.link_path.display(),
            report.binary_path.display(),
            report.downloaded,
            report.extracted
        );
    }
    Ok(())
}

fn select_and_install(
    client: &GithubClient,
    releases: &[Release],
    verbose: bool,
) -> Result<(), Box<dyn Error>> {
    let names = sorted_names(releases);
    if names.is_empty() {
        return Err("No DKP releases found".into());
    }

    let choice = dialoguer::Select::new()
        .with_prompt("Select DKP Version")
        .items(&names)
        .default(0)
        .interact()
        .map_err(|e| format!("Selection aborted: {e}"))?;

    let release = releases
        .iter()
        .find(|r| r.name() == names[choice])
        .ok_or_else(|| format!("Release {} disappeared from the catalog", names[choice]))?;
    install(client, release, verbose)
}

fn print_releases(releases: &[Release], verbose: bool) {
    for name in sorted_names(releases) {
        let published = releases
            .iter()
            .find(|r| r.name() == name)
            .and_then(|r| r.published_at);
        match published {
            Some(date) if verbose => println!("{name} ({})", date.format("%Y-%m-%d")),
            _ => println!("{name}"),
        }
    }
}

/// Print bash completion script
fn print_bash_completion() {
    print!(
        r#"# bash completion for dkpswitch

_dkpswitch_completions() {{
    local cur prev
    COMPREPLY=()
    cur="${{COMP_WORDS[COMP_CWORD]}}"
    prev="${{COMP_WORDS[COMP_CWORD-1]}}"

    if [[ "${{cur}}" == -* ]]; then
        local options=(
            "-a              (Include pre-release versions when listing)"
            "--all           (Include pre-release versions when listing)"
            "-c              (Show the active version)"
            "--current       (Show the active version)"
            "--completion    (Generate shell completion script)"
            "-h              (Print help)"
            "--help          (Print help)"
            "--init          (Switch to the version used in this directory)"
            "-l              (List and select available versions)"
            "--list          (List and select available versions)"
            "-v              (Make the operation more talkative)"
            "--verbose       (Make the operation more talkative)"
            "--version       (Print version and build information)"
        )

        local IFS=$'\n'
        local opt name padded
        local width=$((COLUMNS - 1))
        for opt in "${{options[@]}}"; do
            name="${{opt%%  *}}"
            if [[ "$name" == "${{cur}}"* ]]; then
                printf -v padded "%-${{width}}s" "$opt"
                COMPREPLY+=("$padded")
            fi
        done

        if ((${{#COMPREPLY[@]}} == 1)); then
            COMPREPLY[0]="${{COMPREPLY[0]%%  *}}"
        fi
    fi
}}

complete -o nosort -F _dkpswitch_completions dkpswitch
"#
    );
}
