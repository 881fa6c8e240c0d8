use ratatui::style::Color;

pub const DEFAULT_THEME: &str = "loopcat-dark";

/// Color palette applied across the TUI. Named after the terminal themes the
/// palettes approximate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub name: &'static str,
    pub accent: Color,
    pub playing: Color,
    pub stopped: Color,
    pub dim: Color,
    pub highlight_fg: Color,
}

pub const THEMES: &[Theme] = &[
    Theme {
        name: "loopcat-dark",
        accent: Color::Cyan,
        playing: Color::Green,
        stopped: Color::Red,
        dim: Color::DarkGray,
        highlight_fg: Color::Black,
    },
    Theme {
        name: "nord",
        accent: Color::Rgb(136, 192, 208),
        playing: Color::Rgb(163, 190, 140),
        stopped: Color::Rgb(191, 97, 106),
        dim: Color::Rgb(76, 86, 106),
        highlight_fg: Color::Rgb(46, 52, 64),
    },
    Theme {
        name: "gruvbox",
        accent: Color::Rgb(250, 189, 47),
        playing: Color::Rgb(184, 187, 38),
        stopped: Color::Rgb(251, 73, 52),
        dim: Color::Rgb(124, 111, 100),
        highlight_fg: Color::Rgb(40, 40, 40),
    },
    Theme {
        name: "dracula",
        accent: Color::Rgb(189, 147, 249),
        playing: Color::Rgb(80, 250, 123),
        stopped: Color::Rgb(255, 85, 85),
        dim: Color::Rgb(98, 114, 164),
        highlight_fg: Color::Rgb(40, 42, 54),
    },
    Theme {
        name: "tokyo-night",
        accent: Color::Rgb(122, 162, 247),
        playing: Color::Rgb(158, 206, 106),
        stopped: Color::Rgb(247, 118, 142),
        dim: Color::Rgb(86, 95, 137),
        highlight_fg: Color::Rgb(26, 27, 38),
    },
    Theme {
        name: "monokai",
        accent: Color::Rgb(166, 226, 46),
        playing: Color::Rgb(166, 226, 46),
        stopped: Color::Rgb(249, 38, 114),
        dim: Color::Rgb(117, 113, 94),
        highlight_fg: Color::Rgb(39, 40, 34),
    },
    Theme {
        name: "catppuccin-mocha",
        accent: Color::Rgb(203, 166, 247),
        playing: Color::Rgb(166, 227, 161),
        stopped: Color::Rgb(243, 139, 168),
        dim: Color::Rgb(108, 112, 134),
        highlight_fg: Color::Rgb(30, 30, 46),
    },
    Theme {
        name: "solarized-dark",
        accent: Color::Rgb(38, 139, 210),
        playing: Color::Rgb(133, 153, 0),
        stopped: Color::Rgb(220, 50, 47),
        dim: Color::Rgb(88, 110, 117),
        highlight_fg: Color::Rgb(0, 43, 54),
    },
];

/// Look up a theme by name, falling back to the default palette.
pub fn by_name(name: &str) -> &'static Theme {
    THEMES
        .iter()
        .find(|t| t.name == name)
        .unwrap_or(&THEMES[0])
}

/// Filterable theme list backing the theme-picker overlay. Same filtering
/// discipline as the patch picker: case-insensitive substring, wrapping
/// selection, empty result ignores commit.
pub struct ThemePicker {
    filter: String,
    filtered: Vec<usize>,
    selected: usize,
}

impl ThemePicker {
    pub fn new(current: &str) -> Self {
        let filtered: Vec<usize> = (0..THEMES.len()).collect();
        let selected = THEMES.iter().position(|t| t.name == current).unwrap_or(0);
        Self {
            filter: String::new(),
            filtered,
            selected,
        }
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn set_filter(&mut self, text: &str) {
        self.filter = text.to_string();
        let needle = text.to_lowercase();
        self.filtered = THEMES
            .iter()
            .enumerate()
            .filter(|(_, t)| needle.is_empty() || t.name.contains(&needle))
            .map(|(i, _)| i)
            .collect();
        self.selected = 0;
    }

    pub fn push_char(&mut self, c: char) {
        let mut text = self.filter.clone();
        text.push(c);
        self.set_filter(&text);
    }

    pub fn pop_char(&mut self) {
        let mut text = self.filter.clone();
        text.pop();
        self.set_filter(&text);
    }

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.filtered.len();
        if len == 0 {
            return;
        }
        let len = len as isize;
        self.selected = (((self.selected as isize + delta) % len + len) % len) as usize;
    }

    pub fn commit(&self) -> Option<&'static str> {
        self.filtered.get(self.selected).map(|&i| THEMES[i].name)
    }

    pub fn matches(&self) -> impl Iterator<Item = &'static Theme> {
        self.filtered.iter().map(|&i| &THEMES[i])
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_names_are_unique() {
        for (i, a) in THEMES.iter().enumerate() {
            for b in &THEMES[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn unknown_name_falls_back_to_default() {
        assert_eq!(by_name("does-not-exist").name, DEFAULT_THEME);
        assert_eq!(by_name("gruvbox").name, "gruvbox");
    }

    #[test]
    fn picker_starts_on_current_theme() {
        let picker = ThemePicker::new("dracula");
        assert_eq!(picker.commit(), Some("dracula"));
    }

    #[test]
    fn picker_filters_and_wraps() {
        let mut picker = ThemePicker::new(DEFAULT_THEME);
        picker.set_filter("rose");
        assert_eq!(picker.commit(), None);
        picker.set_filter("catppuccin");
        assert_eq!(picker.commit(), Some("catppuccin-mocha"));
        picker.set_filter("");
        picker.move_selection(-1);
        assert_eq!(picker.commit(), Some(THEMES[THEMES.len() - 1].name));
    }
}
