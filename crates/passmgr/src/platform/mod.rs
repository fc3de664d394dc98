use std::path::{Path, PathBuf};

use clap::Subcommand;
use color_eyre::eyre::{Result, WrapErr};
use passmgr_core::{settings::default_settings_path, Broker, SessionToken, Settings, UnlockMethod};
use zeroize::Zeroizing;

use crate::render::{CommandOutput, CommandResult};

/// What every command needs from the global flags.
pub(crate) struct Context {
    settings_path: Option<PathBuf>,
    session: Option<Zeroizing<String>>,
}

impl Context {
    pub fn new(settings_path: Option<PathBuf>, session: Option<String>) -> Self {
        Self {
            settings_path,
            session: session.map(Zeroizing::new),
        }
    }

    pub fn settings_path(&self) -> Result<PathBuf> {
        match &self.settings_path {
            Some(path) => Ok(path.clone()),
            None => Ok(default_settings_path()?),
        }
    }

    pub fn load_settings(&self) -> Result<Settings> {
        let path = self.settings_path()?;
        Settings::load(&path).wrap_err_with(|| format!("Failed to load {}", path.display()))
    }

    /// A broker for the configured provider, unlocked with `--session` when given.
    pub async fn broker(&self, settings: &Settings) -> Result<Broker> {
        let broker = Broker::new(settings);
        if let Some(session) = &self.session {
            let token = SessionToken::from(session.as_str());
            broker.unlock(UnlockMethod::SessionKey(token)).await?;
        }
        Ok(broker)
    }
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommand {
    #[command(long_about = "Show the current settings.")]
    Show,

    #[command(
        long_about = "Change a setting.",
        after_help = r#"Keys:
    passwordManager       Bitwarden
    bitwardenBinary       path to the bw executable
    bitwardenExecTimeout  milliseconds, 5000 to 25000 in steps of 1000
    clipboardCommand      program receiving secrets on stdin, empty to detect
"#
    )]
    Set { key: String, value: String },

    #[command(long_about = "Print the path of the settings file.")]
    Path,
}

impl ConfigCommand {
    pub fn run(self, context: &Context) -> CommandResult {
        match self {
            ConfigCommand::Show => Ok(CommandOutput::Object(Box::new(context.load_settings()?))),
            ConfigCommand::Set { key, value } => {
                let path = context.settings_path()?;
                let mut settings = context.load_settings()?;
                settings.set(&key, &value)?;
                save(&settings, &path)?;
                Ok(CommandOutput::Object(Box::new(settings)))
            }
            ConfigCommand::Path => Ok(context.settings_path()?.display().to_string().into()),
        }
    }
}

fn save(settings: &Settings, path: &Path) -> Result<()> {
    settings
        .save(path)
        .wrap_err_with(|| format!("Failed to save {}", path.display()))?;
    tracing::info!(path = %path.display(), "Settings saved");
    Ok(())
}
