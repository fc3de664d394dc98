//! `passwordmanager` code blocks in markdown documents.
//!
//! A document declares a vault entry with a fenced block:
//!
//! ````markdown
//! ```passwordmanager
//! example.com
//! ```
//! ````
//!
//! The block body is the source handed to the password manager.

use serde::Serialize;

/// Info string that marks a vault block.
pub const BLOCK_LANGUAGE: &str = "passwordmanager";

/// A vault entry declared by a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultBlock {
    /// 1-based position among the document's vault blocks.
    pub index: usize,
    /// Trimmed block body.
    pub source: String,
    /// 1-based line of the opening fence.
    pub line: usize,
}

impl VaultBlock {
    /// Text shown above the block's triggers.
    pub fn label(&self) -> String {
        format!("🔒 {}", self.source)
    }
}

struct Fence {
    marker: char,
    len: usize,
}

/// Opening or closing fence on `line`, if any. Up to three spaces of indentation are allowed.
fn fence(line: &str) -> Option<(Fence, &str)> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = line.trim_start_matches(' ');
    let marker = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = rest.chars().take_while(|c| *c == marker).count();
    if len < 3 {
        return None;
    }
    let info = rest.trim_start_matches(marker);
    Some((Fence { marker, len }, info))
}

/// Find all vault blocks in `markdown`. Blocks with an empty body are skipped; an unclosed block
/// runs to the end of the document.
pub fn parse_blocks(markdown: &str) -> Vec<VaultBlock> {
    let mut blocks = Vec::new();
    let mut lines = markdown.lines().enumerate();

    while let Some((number, line)) = lines.next() {
        let Some((open, info)) = fence(line) else {
            continue;
        };

        let is_vault = info.split_whitespace().next() == Some(BLOCK_LANGUAGE);
        let mut body = Vec::new();
        for (_, line) in lines.by_ref() {
            if let Some((close, rest)) = fence(line) {
                if close.marker == open.marker && close.len >= open.len && rest.trim().is_empty() {
                    break;
                }
            }
            body.push(line);
        }

        if !is_vault {
            continue;
        }

        let source = body.join("\n").trim().to_owned();
        if source.is_empty() {
            continue;
        }
        blocks.push(VaultBlock {
            index: blocks.len() + 1,
            source,
            line: number + 1,
        });
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_vault_blocks_only() {
        let doc = "\
# Accounts

```passwordmanager
example.com
```

```rust
fn main() {}
```

~~~passwordmanager
My Bank
~~~
";
        let blocks = parse_blocks(doc);
        assert_eq!(
            blocks,
            vec![
                VaultBlock {
                    index: 1,
                    source: "example.com".to_owned(),
                    line: 3,
                },
                VaultBlock {
                    index: 2,
                    source: "My Bank".to_owned(),
                    line: 11,
                },
            ]
        );
        assert_eq!(blocks[0].label(), "🔒 example.com");
    }

    #[test]
    fn vault_syntax_inside_other_blocks_is_ignored() {
        let doc = "\
````markdown
```passwordmanager
inner.example
```
````
";
        assert!(parse_blocks(doc).is_empty());
    }

    #[test]
    fn closing_fence_must_match_marker_and_length() {
        let doc = "\
````passwordmanager
example.com
```
~~~~
````
";
        let blocks = parse_blocks(doc);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].source, "example.com\n```\n~~~~");
    }

    #[test]
    fn empty_and_unclosed_blocks() {
        let doc = "\
```passwordmanager
```
```passwordmanager extra words
  last.example
";
        let blocks = parse_blocks(doc);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].index, 1);
        assert_eq!(blocks[0].source, "last.example");
        assert_eq!(blocks[0].line, 3);
    }

    #[test]
    fn deeply_indented_fence_is_not_a_fence() {
        assert!(parse_blocks("    ```passwordmanager\n    example.com\n    ```\n").is_empty());
    }
}
