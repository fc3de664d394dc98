use std::path::PathBuf;

use clap::{Parser, Subcommand};
use passmgr_cli::Color;

use crate::{
    host::OpenArgs, key_management::UnlockArgs, platform::ConfigCommand, render::Output,
    vault::GetArgs,
};

pub const SESSION_ENV: &str = "BW_SESSION";
pub const SETTINGS_ENV: &str = "PASSMGR_SETTINGS";

#[derive(Parser, Clone)]
#[command(name = "passmgr", version, about = "Bitwarden vault blocks for markdown documents", long_about = None, disable_version_flag = true)]
pub struct Cli {
    // Optional as a workaround for https://github.com/clap-rs/clap/issues/3572
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short = 'o', long, global = true, value_enum, default_value_t = Output::JSON)]
    pub output: Output,

    #[arg(short = 'c', long, global = true, value_enum, default_value_t = Color::Auto)]
    pub color: Color,

    #[arg(
        long,
        global = true,
        env = SESSION_ENV,
        hide_env_values = true,
        help = "The Bitwarden session key. Can be obtained with `bw unlock --raw` or `passmgr unlock`."
    )]
    pub session: Option<String>,

    #[arg(
        long,
        global = true,
        env = SETTINGS_ENV,
        help = "Path to the settings file. Defaults to the user config directory."
    )]
    pub settings: Option<PathBuf>,

    #[arg(
        short = 'q',
        long,
        global = true,
        help = "Don't return anything to stdout."
    )]
    pub quiet: bool,

    #[arg(short = 'v', long, action = clap::builder::ArgAction::Version)]
    pub version: (),
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    #[command(
        long_about = "Retrieve one property of a vault entry and copy it to the clipboard.",
        after_help = r#"Examples:
    passmgr get password example.com --session "$BW_SESSION"
    passmgr get totp "My Bank" --stdout
"#
    )]
    Get(GetArgs),

    #[command(long_about = "Unlock the vault with the master password and return a session key.")]
    Unlock(UnlockArgs),

    #[command(
        long_about = "List the passwordmanager blocks of a markdown document.",
        after_help = r#"Example return value:
  [
    {
      "index": 1,
      "source": "example.com",
      "line": 3
    }
  ]
"#
    )]
    Blocks { file: PathBuf },

    #[command(long_about = "Open a markdown document and copy credentials from its vault blocks.")]
    Open(OpenArgs),

    #[command(long_about = "Configure passmgr settings.")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    #[command(long_about = "Generate shell completions.")]
    Completion {
        #[arg(long, help = "The shell to generate completions for.")]
        shell: Option<clap_complete::Shell>,
    },
}
