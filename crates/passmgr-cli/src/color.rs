use clap::ValueEnum;

/// Controls whether terminal output is colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Color {
    /// Never color output.
    No,
    /// Always color output.
    Yes,
    /// Color output when stdout is a terminal that supports it.
    Auto,
}

impl Color {
    /// Resolve the setting against the current stdout.
    pub fn is_enabled(self) -> bool {
        match self {
            Color::No => false,
            Color::Yes => true,
            Color::Auto => supports_color::on(supports_color::Stream::Stdout).is_some(),
        }
    }
}

/// Install the color-eyre report handler, with or without ANSI colors.
pub fn install_color_eyre(color: Color) -> color_eyre::Result<()> {
    if color.is_enabled() {
        color_eyre::install()
    } else {
        // Use an empty theme to disable error coloring
        color_eyre::config::HookBuilder::new()
            .theme(color_eyre::config::Theme::new())
            .install()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_choices_ignore_terminal() {
        assert!(Color::Yes.is_enabled());
        assert!(!Color::No.is_enabled());
    }
}
