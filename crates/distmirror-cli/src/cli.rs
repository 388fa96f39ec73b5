use std::path::PathBuf;

use clap::{value_parser, ArgAction, Args, Parser, Subcommand, ValueEnum};
use distmirror_core::DEFAULT_ORIGIN;
use distmirror_domain::ImportKey;

pub const DISTMIRROR_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nGlobal options:\n{options}\n";

pub const DISTMIRROR_BEFORE_HELP: &str = concat!(
    "distmirror ",
    env!("CARGO_PKG_VERSION"),
    " – Mirror dist-git package sources\n\n",
    "\x1b[1;36mCommands\x1b[0m\n",
    "  resolve          Fetch upstream and list import candidates, oldest first.\n",
    "  sync             Check out a candidate and verify its lookaside sources.\n",
);

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    propagate_version = false,
    disable_help_subcommand = true,
    before_help = DISTMIRROR_BEFORE_HELP,
    help_template = DISTMIRROR_HELP_TEMPLATE
)]
pub struct DistmirrorCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging (-vv reaches trace)",
        global = true
    )]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: CommandCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandCli {
    #[command(
        about = "Fetch upstream into the working tree and list import candidates.",
        override_usage = "distmirror resolve --upstream URL --prefix PREFIX --major N [--workdir DIR]"
    )]
    Resolve(RunArgs),
    #[command(
        about = "Check out an import candidate and reconcile its lookaside sources.",
        override_usage = "distmirror sync --upstream URL --prefix PREFIX --major N [--all | --reference REF]"
    )]
    Sync(SyncArgs),
}

impl CommandCli {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Resolve(_) => "resolve",
            Self::Sync(_) => "sync",
        }
    }

    pub fn run_args(&self) -> &RunArgs {
        match self {
            Self::Resolve(args) => args,
            Self::Sync(args) => &args.run,
        }
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[arg(
        long,
        env = "DISTMIRROR_UPSTREAM",
        value_name = "URL",
        help = "Upstream dist-git repository (URL or local path)"
    )]
    pub upstream: String,
    #[arg(
        long,
        env = "DISTMIRROR_PREFIX",
        value_name = "PREFIX",
        help = "Import branch prefix (e.g. c)"
    )]
    pub prefix: String,
    #[arg(
        long = "major",
        env = "DISTMIRROR_VERSION",
        value_name = "N",
        value_parser = value_parser!(u32),
        help = "Major version appended to the prefix (e.g. 8)"
    )]
    pub version: u32,
    #[arg(
        long,
        env = "DISTMIRROR_WORKDIR",
        value_name = "DIR",
        value_parser = value_parser!(PathBuf),
        default_value = ".",
        help = "Working tree to mirror into"
    )]
    pub workdir: PathBuf,
    #[arg(
        long,
        env = "DISTMIRROR_GROUP_BY",
        value_enum,
        default_value_t = GroupBy::Branch,
        help = "Keep the newest import per branch or per package version"
    )]
    pub group_by: GroupBy,
    #[arg(
        long,
        env = "DISTMIRROR_ORIGIN",
        value_name = "URL",
        default_value = DEFAULT_ORIGIN,
        help = "Lookaside origin base URL"
    )]
    pub origin: String,
    #[arg(
        long,
        env = "DISTMIRROR_BLOB_STORE",
        value_name = "DIR",
        value_parser = value_parser!(PathBuf),
        help = "Content-addressed blob store consulted before the origin"
    )]
    pub blob_store: Option<PathBuf>,
    #[arg(
        long,
        env = "DISTMIRROR_NO_STORAGE_DOWNLOAD",
        help = "Never read from the blob store; fetch everything from the origin"
    )]
    pub no_storage_download: bool,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub run: RunArgs,
    #[arg(
        long,
        value_name = "REF",
        conflicts_with = "all",
        help = "Reconcile this candidate instead of the newest"
    )]
    pub reference: Option<String>,
    #[arg(long, help = "Reconcile every candidate, oldest first")]
    pub all: bool,
    #[arg(
        long,
        env = "DISTMIRROR_EXPORT_STORE",
        value_name = "DIR",
        value_parser = value_parser!(PathBuf),
        help = "Copy verified sources into this blob store before cleanup"
    )]
    pub export_store: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupBy {
    Branch,
    Package,
}

impl From<GroupBy> for ImportKey {
    fn from(value: GroupBy) -> Self {
        match value {
            GroupBy::Branch => ImportKey::Branch,
            GroupBy::Package => ImportKey::Package,
        }
    }
}
