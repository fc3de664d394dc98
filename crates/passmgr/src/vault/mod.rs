use std::path::Path;

use clap::Args;
use color_eyre::eyre::{eyre, WrapErr};
use passmgr_cli::text_prompt_when_none;
use passmgr_core::{
    clipboard::{CommandClipboard, SecretSink, StdoutSink},
    parse_blocks, Property,
};

use crate::{
    platform::Context,
    render::{CommandOutput, CommandResult},
};

#[derive(Args, Clone)]
pub struct GetArgs {
    #[arg(help = "One of username, password or totp.")]
    pub property: Property,

    #[arg(help = "Vault entry id or search term, passed to bw as is. Prompted for when omitted.")]
    pub source: Option<String>,

    #[arg(long, help = "Print the value to stdout instead of copying it.")]
    pub stdout: bool,
}

impl GetArgs {
    pub async fn run(self, context: &Context) -> CommandResult {
        let source = text_prompt_when_none("Vault entry", self.source)
            .wrap_err("Failed to read the vault entry")?;
        let settings = context.load_settings()?;
        let broker = context.broker(&settings).await?;

        let secret = broker
            .retrieve(self.property, &source)
            .await
            .map_err(|e| eyre!("Failed to copy: {e}"))?;

        if self.stdout {
            StdoutSink.deliver(&secret).await?;
            return Ok(().into());
        }

        CommandClipboard::from_settings(&settings)?
            .deliver(&secret)
            .await
            .map_err(|e| eyre!("Failed to copy: {e}"))?;
        Ok("Copied".into())
    }
}

pub fn list_blocks(file: &Path) -> CommandResult {
    let document = std::fs::read_to_string(file)
        .wrap_err_with(|| format!("Failed to read {}", file.display()))?;
    Ok(CommandOutput::Object(Box::new(parse_blocks(&document))))
}
