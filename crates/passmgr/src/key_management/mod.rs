use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::{bail, Result, WrapErr};
use passmgr_cli::password_prompt_when_none;
use passmgr_core::{Broker, UnlockMethod};
use zeroize::Zeroizing;

use crate::{command::SESSION_ENV, platform::Context, render::CommandResult};

#[derive(Args, Clone)]
pub struct UnlockArgs {
    #[arg(long, help = "Environment variable storing your password.")]
    pub passwordenv: Option<String>,

    #[arg(
        long,
        help = "Path to a file containing your password as its first line."
    )]
    pub passwordfile: Option<PathBuf>,

    #[arg(long, help = "Only return the session key.")]
    pub raw: bool,
}

impl UnlockArgs {
    pub async fn run(self, context: &Context) -> CommandResult {
        let password = self.password()?;
        let settings = context.load_settings()?;

        let broker = Broker::new(&settings);
        broker
            .unlock(UnlockMethod::MasterPassword(password))
            .await
            .wrap_err("Failed to unlock")?;
        let token = broker.session().current_token();

        if self.raw {
            return Ok(token.as_str().into());
        }

        Ok(format!(
            r#"Your vault is now unlocked!

To use the session key in later commands, set the `{SESSION_ENV}` environment variable. ex:
$ export {SESSION_ENV}="{token}"

You can also pass the session key to any command with the `--session` option. ex:
$ passmgr get password example.com --session {token}"#,
            token = token.as_str(),
        )
        .into())
    }

    fn password(&self) -> Result<Zeroizing<String>> {
        let given = match (&self.passwordenv, &self.passwordfile) {
            (Some(_), Some(_)) => bail!("--passwordenv and --passwordfile are mutually exclusive"),
            (Some(var), None) => Some(
                std::env::var(var)
                    .wrap_err_with(|| format!("Environment variable {var} is not set"))?,
            ),
            (None, Some(file)) => {
                let contents = Zeroizing::new(
                    std::fs::read_to_string(file)
                        .wrap_err_with(|| format!("Failed to read {}", file.display()))?,
                );
                Some(contents.lines().next().unwrap_or_default().to_owned())
            }
            (None, None) => None,
        };

        Ok(Zeroizing::new(password_prompt_when_none(
            "Master password",
            given,
        )?))
    }
}
