//! Interactive host for one markdown document.
//!
//! The host owns the broker for the life of the process. Every vault block of the document gets
//! its three retrieval triggers; `copy` runs on its own task so the prompt keeps accepting input
//! while the password manager works. Notices are printed as the copies finish.

use std::{path::PathBuf, sync::Arc};

use clap::Args;
use color_eyre::eyre::{Result, WrapErr};
use passmgr_cli::password_prompt_when_none;
use passmgr_core::{
    clipboard::{CommandClipboard, DeliveryError, SecretSink, StdoutSink},
    parse_blocks, BlockTriggers, Broker, Property, RetrieveError, SessionStatus, UnlockMethod,
    VaultBlock,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    task::JoinSet,
};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::{platform::Context, render::CommandResult};

mod command;
use command::{HostCommand, HELP};

#[derive(Args, Clone)]
pub struct OpenArgs {
    #[arg(help = "Markdown document with passwordmanager blocks.")]
    pub file: PathBuf,

    #[arg(long, help = "Print retrieved values to stdout instead of copying them.")]
    pub stdout: bool,
}

impl OpenArgs {
    pub async fn run(self, context: &Context) -> CommandResult {
        let document = std::fs::read_to_string(&self.file)
            .wrap_err_with(|| format!("Failed to read {}", self.file.display()))?;
        let settings = context.load_settings()?;
        let broker = context.broker(&settings).await?;

        let sink: Option<Arc<dyn SecretSink>> = if self.stdout {
            Some(Arc::new(StdoutSink))
        } else {
            match CommandClipboard::from_settings(&settings) {
                Ok(clipboard) => Some(Arc::new(clipboard)),
                Err(e) => {
                    warn!(%e, "Copying is unavailable");
                    None
                }
            }
        };

        let mut host = Host::new(broker, parse_blocks(&document), sink);
        host.echoes_secrets = self.stdout;
        host.run(tokio::io::stdin()).await?;
        Ok(().into())
    }
}

struct Host {
    broker: Arc<Broker>,
    blocks: Vec<(VaultBlock, BlockTriggers)>,
    sink: Option<Arc<dyn SecretSink>>,
    /// Secrets are written to the same stream as the notices.
    echoes_secrets: bool,
    copies: JoinSet<()>,
}

impl Host {
    fn new(broker: Broker, blocks: Vec<VaultBlock>, sink: Option<Arc<dyn SecretSink>>) -> Self {
        let blocks = blocks
            .into_iter()
            .map(|block| {
                let triggers = BlockTriggers::new(&format!("block {}", block.index));
                (block, triggers)
            })
            .collect();

        Self {
            broker: Arc::new(broker),
            blocks,
            sink,
            echoes_secrets: false,
            copies: JoinSet::new(),
        }
    }

    /// Read commands from `input` until `quit` or end of input, then wait for running copies.
    async fn run<R: AsyncRead + Unpin>(&mut self, input: R) -> Result<()> {
        self.print_status();
        println!("Type `help` for a list of commands.");

        let mut lines = BufReader::new(input).lines();
        while let Some(line) = lines.next_line().await? {
            match HostCommand::parse(&line) {
                Ok(HostCommand::Quit) => break,
                Ok(command) => self.handle(command).await,
                Err(message) => println!("{message}"),
            }
        }

        while let Some(result) = self.copies.join_next().await {
            if let Err(e) = result {
                warn!(%e, "Copy task failed");
            }
        }
        Ok(())
    }

    async fn handle(&mut self, command: HostCommand) {
        match command {
            HostCommand::Empty | HostCommand::Quit => {}
            HostCommand::Help => println!("{HELP}"),
            HostCommand::Status => self.print_status(),
            HostCommand::Unlock => match prompt_secret("Master password").await {
                Ok(password) => self.unlock(UnlockMethod::MasterPassword(password)).await,
                Err(e) => println!("Failed to unlock: {e}"),
            },
            HostCommand::UnlockWithKey(Some(key)) => {
                self.unlock(UnlockMethod::SessionKey(key.into())).await
            }
            HostCommand::UnlockWithKey(None) => match prompt_secret("Session key").await {
                Ok(key) => {
                    self.unlock(UnlockMethod::SessionKey(key.as_str().into()))
                        .await
                }
                Err(e) => println!("Failed to unlock: {e}"),
            },
            HostCommand::Lock => {
                self.broker.lock().await;
                println!("Locked");
            }
            HostCommand::Copy { block, property } => self.copy(block, property),
        }
    }

    async fn unlock(&self, method: UnlockMethod) {
        match self.broker.unlock(method).await {
            Ok(SessionStatus::Unlocked) => println!("Unlocked"),
            Ok(SessionStatus::Locked) => println!("Session key is empty, still locked"),
            Err(e) => println!("Failed to unlock: {e}"),
        }
    }

    fn copy(&mut self, block: usize, property: Property) {
        let Some((vault_block, triggers)) = block
            .checked_sub(1)
            .and_then(|index| self.blocks.get(index))
        else {
            println!("No block {block}, type `status` to list the blocks");
            return;
        };
        let Some(sink) = self.sink.clone() else {
            println!("Failed to copy: {}", DeliveryError::NoClipboard);
            return;
        };

        let trigger = Arc::clone(triggers.get(property));
        let source = vault_block.source.clone();
        let broker = Arc::clone(&self.broker);
        let echoes_secrets = self.echoes_secrets;
        debug!(trigger = trigger.label(), "Copy requested");

        self.copies.spawn(async move {
            let notice = match broker.retrieve_guarded(&trigger, property, &source).await {
                Ok(secret) => match sink.deliver(&secret).await {
                    Ok(()) if echoes_secrets && !secret.expose().ends_with('\n') => {
                        "\nCopied".to_owned()
                    }
                    Ok(()) => "Copied".to_owned(),
                    Err(e) => format!("Failed to copy: {e}"),
                },
                Err(RetrieveError::Busy(label)) => format!("{label} is still being copied"),
                Err(RetrieveError::Fetch(e)) => format!("Failed to copy: {e}"),
            };
            println!("{notice}");
        });
    }

    fn print_status(&self) {
        println!(
            "{}: {}",
            self.broker.provider().kind(),
            self.broker.status()
        );
        if self.blocks.is_empty() {
            println!("No passwordmanager blocks in this document");
        }
        for (block, _) in &self.blocks {
            println!("  [{}] {} (line {})", block.index, block.label(), block.line);
        }
    }
}

/// Masked prompt on the terminal, off the runtime thread.
async fn prompt_secret(prompt: &'static str) -> Result<Zeroizing<String>> {
    let value =
        tokio::task::spawn_blocking(move || password_prompt_when_none(prompt, None)).await??;
    Ok(Zeroizing::new(value))
}
