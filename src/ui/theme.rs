use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Styles for the demo binary's report output
#[derive(Debug, Clone, Default)]
pub struct Theme {
    /// Section titles and banners
    pub header: Style,
    pub success: Style,
    /// Failure messages raised by scripts
    pub error: Style,
    pub warn: Style,
    /// Labels and "not found" markers
    pub dim: Style,
    /// Absent scopes
    pub muted: Style,
    /// Variable and scope identifiers
    pub ident: Style,
}

impl Theme {
    /// Colored when stdout is a terminal and `NO_COLOR` is unset
    pub fn detect() -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        Self::new(!no_color && console::Term::stdout().is_term())
    }

    pub fn new(colored: bool) -> Self {
        if !colored {
            return Self::default();
        }
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            warn: Style::new().yellow().bold(),
            dim: Style::new().white().dimmed(),
            muted: Style::new().bright_black(),
            ident: Style::new().blue().bold(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
