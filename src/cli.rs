// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
// CLI argument definitions for dkpswitch
//
// Separated from main.rs so that build.rs can include this file
// to generate the man page via clap_mangen.

use clap::Parser;

/// Actions that don't take a version argument
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum StandaloneAction {
    List,
    Init,
    Current,
    BuildInfo,
}

/// CLI argument parser - bools required for clap flag parsing
#[derive(Parser)]
#[command(
    name = "dkpswitch",
    version,
    about = "Switch between DKP (Konvoy) release versions",
    disable_version_flag = true
)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// GA version to switch to (e.g. v2.1.1 or 2.1)
    #[arg(value_name = "VERSION", conflicts_with_all = ["list", "init", "current", "build_info"])]
    pub target_version: Option<String>,

    /// List available versions and select one to install
    #[arg(short = 'l', long = "list", conflicts_with_all = ["init", "current", "build_info"])]
    pub list: bool,

    /// Include pre-release versions when listing
    #[arg(short = 'a', long = "all", requires = "list")]
    pub all: bool,

    /// Switch to the version previously used in this directory
    #[arg(long = "init", conflicts_with_all = ["current", "build_info"])]
    pub init: bool,

    /// Show the version recorded in this directory and the active binaries
    #[arg(short = 'c', long = "current", conflicts_with = "build_info")]
    pub current: bool,

    /// Print version and build information
    #[arg(long = "version")]
    pub build_info: bool,

    /// Make the operation more talkative
    #[arg(short, long)]
    pub verbose: bool,

    /// Generate shell completion script (only bash is supported currently)
    #[arg(long = "completion", value_name = "SHELL", value_parser = parse_completion_shell)]
    pub completion: Option<String>,
}

impl Cli {
    #[must_use]
    pub fn standalone_action(&self) -> Option<StandaloneAction> {
        match (self.list, self.init, self.current, self.build_info) {
            (true, _, _, _) => Some(StandaloneAction::List),
            (_, true, _, _) => Some(StandaloneAction::Init),
            (_, _, true, _) => Some(StandaloneAction::Current),
            (_, _, _, true) => Some(StandaloneAction::BuildInfo),
            _ => None,
        }
    }
}

fn parse_completion_shell(s: &str) -> Result<String, String> {
    match s.to_lowercase().as_str() {
        "bash" => Ok(s.to_lowercase()),
        _ => Err(format!("unsupported shell: {s} (only 'bash' is supported)")),
    }
}
