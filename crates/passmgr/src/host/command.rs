//! Commands accepted at the interactive prompt.

use passmgr_core::Property;

pub(crate) const HELP: &str = "\
Commands:
  status                    Show the session status and the document's vault blocks
  unlock                    Unlock with the master password
  unlock --key [KEY]        Unlock with a session key from `bw unlock --raw`
  lock                      Forget the session key
  copy <block> <property>   Copy username, password or totp of a block to the clipboard
  help                      Show this message
  quit                      Wait for running copies and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HostCommand {
    Status,
    Unlock,
    UnlockWithKey(Option<String>),
    Lock,
    Copy { block: usize, property: Property },
    Help,
    Quit,
    Empty,
}

impl HostCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(HostCommand::Empty);
        };
        let rest: Vec<&str> = words.collect();

        let command = match (name, rest.as_slice()) {
            ("status", []) => HostCommand::Status,
            ("unlock", []) => HostCommand::Unlock,
            ("unlock", ["--key"]) => HostCommand::UnlockWithKey(None),
            ("unlock", ["--key", key]) => HostCommand::UnlockWithKey(Some((*key).to_owned())),
            ("lock", []) => HostCommand::Lock,
            ("copy", [block, property]) => HostCommand::Copy {
                block: block
                    .parse()
                    .map_err(|_| format!("`{block}` is not a block number"))?,
                property: property.parse().map_err(|e| format!("{e}"))?,
            },
            ("help" | "?", []) => HostCommand::Help,
            ("quit" | "exit", []) => HostCommand::Quit,
            ("status" | "unlock" | "lock" | "copy" | "help" | "quit" | "exit", _) => {
                return Err(format!("Wrong arguments for `{name}`, type `help`"));
            }
            _ => return Err(format!("Unknown command `{name}`, type `help`")),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(HostCommand::parse("  ").unwrap(), HostCommand::Empty);
        assert_eq!(HostCommand::parse("status").unwrap(), HostCommand::Status);
        assert_eq!(HostCommand::parse("unlock").unwrap(), HostCommand::Unlock);
        assert_eq!(
            HostCommand::parse("unlock --key abc").unwrap(),
            HostCommand::UnlockWithKey(Some("abc".to_owned()))
        );
        assert_eq!(
            HostCommand::parse("unlock --key").unwrap(),
            HostCommand::UnlockWithKey(None)
        );
        assert_eq!(HostCommand::parse("lock").unwrap(), HostCommand::Lock);
        assert_eq!(HostCommand::parse("exit").unwrap(), HostCommand::Quit);
    }

    #[test]
    fn parses_copy() {
        assert_eq!(
            HostCommand::parse("copy 2 TOTP").unwrap(),
            HostCommand::Copy {
                block: 2,
                property: Property::Totp
            }
        );
        assert!(HostCommand::parse("copy two password")
            .unwrap_err()
            .contains("not a block number"));
        assert!(HostCommand::parse("copy 1 pin")
            .unwrap_err()
            .contains("Unknown property"));
    }

    #[test]
    fn rejects_unknown_and_malformed() {
        assert!(HostCommand::parse("sync")
            .unwrap_err()
            .starts_with("Unknown command"));
        assert!(HostCommand::parse("lock now")
            .unwrap_err()
            .starts_with("Wrong arguments"));
        assert!(HostCommand::parse("copy 1")
            .unwrap_err()
            .starts_with("Wrong arguments"));
    }
}
