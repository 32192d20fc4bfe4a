use std::fmt;
use std::str::FromStr;

pub const STORAGE_KEY: &str = "theme";
pub const THEME_ATTRIBUTE: &str = "data-theme";
pub const TOGGLE_ID: &str = "theme-toggle";
pub const ICON_CLASS: &str = "theme-icon";
pub const SUN_ICON_CLASS: &str = "theme-icon fa7-solid--sun";
pub const MOON_ICON_CLASS: &str = "theme-icon f7--moon";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn from_dark(dark: bool) -> Self {
        if dark {
            Theme::Dark
        } else {
            Theme::Light
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq)]
pub struct UnknownTheme(pub String);

impl fmt::Display for UnknownTheme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown theme {:?}", self.0)
    }
}

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(UnknownTheme(s.to_owned())),
        }
    }
}

/// Stored value first, then the system signal, then light.
pub fn resolve_initial(persisted: Option<&str>, prefers_dark: bool) -> Theme {
    match persisted.map(str::parse::<Theme>) {
        Some(Ok(theme)) => theme,
        Some(Err(e)) => {
            tracing::warn!("{e} in storage, falling back to system preference");
            Theme::from_dark(prefers_dark)
        }
        None => Theme::from_dark(prefers_dark),
    }
}

pub fn icon_class(theme: &str) -> &'static str {
    if theme == "light" {
        SUN_ICON_CLASS
    } else {
        MOON_ICON_CLASS
    }
}

/// The pieces of the environment the theme manager reads and writes.
pub trait ThemeHost {
    fn stored(&self) -> Option<String>;
    fn store(&mut self, theme: &str);
    fn prefers_dark(&self) -> bool;
    /// Current value of the theme attribute on the document.
    fn applied(&self) -> Option<String>;
    fn apply(&mut self, theme: &str);
    fn set_icon_class(&mut self, class: &str);
}

pub struct ThemeManager<H> {
    host: H,
    // set once the user has picked a theme; system changes are ignored after that
    explicit: bool,
}

impl<H: ThemeHost> ThemeManager<H> {
    pub fn initialize(host: H) -> Self {
        let stored = host.stored();
        let theme = resolve_initial(stored.as_deref(), host.prefers_dark());
        tracing::info!("initial theme: {theme} (stored: {stored:?})");

        let mut manager = ThemeManager {
            host,
            explicit: stored.is_some(),
        };
        manager.apply_theme(theme);
        manager.update_icon(theme.as_str());
        manager
    }

    pub fn apply_theme(&mut self, theme: Theme) {
        self.host.apply(theme.as_str());
        self.host.store(theme.as_str());
    }

    pub fn toggle_theme(&mut self) -> Theme {
        let current = self.host.applied();
        let next = match current.as_deref().map(str::parse::<Theme>) {
            Some(Ok(theme)) => theme.toggled(),
            _ => Theme::Light,
        };
        tracing::info!("toggle theme: {current:?} -> {next}");

        self.explicit = true;
        self.apply_theme(next);
        self.update_icon(next.as_str());
        next
    }

    pub fn update_icon(&mut self, theme: &str) {
        self.host.set_icon_class(icon_class(theme));
    }

    /// Mirrors a system color-scheme change unless the user already chose.
    ///
    /// A value found in storage at startup counts as a choice, and startup
    /// always stores the resolved theme, so after a reload this is a no-op
    /// even if the user never toggled.
    pub fn system_changed(&mut self, prefers_dark: bool) -> Option<Theme> {
        if self.explicit {
            tracing::debug!("system preference changed, keeping explicit choice");
            return None;
        }
        let theme = Theme::from_dark(prefers_dark);
        tracing::info!("following system preference: {theme}");
        self.apply_theme(theme);
        self.update_icon(theme.as_str());
        Some(theme)
    }

    #[cfg(test)]
    pub fn host(&self) -> &H {
        &self.host
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
struct FakeHost {
    storage: Option<String>,
    dark: bool,
    attribute: Option<String>,
    icon: Option<String>,
    writes: usize,
}

#[cfg(test)]
impl ThemeHost for FakeHost {
    fn stored(&self) -> Option<String> {
        self.storage.clone()
    }

    fn store(&mut self, theme: &str) {
        self.writes += 1;
        self.storage = Some(theme.to_owned());
    }

    fn prefers_dark(&self) -> bool {
        self.dark
    }

    fn applied(&self) -> Option<String> {
        self.attribute.clone()
    }

    fn apply(&mut self, theme: &str) {
        self.attribute = Some(theme.to_owned());
    }

    fn set_icon_class(&mut self, class: &str) {
        self.icon = Some(class.to_owned());
    }
}

#[test]
fn test_resolve_initial() {
    let _ = tracing_subscriber::fmt::try_init();

    assert_eq!(resolve_initial(Some("light"), true), Theme::Light);
    assert_eq!(resolve_initial(Some("dark"), false), Theme::Dark);
    assert_eq!(resolve_initial(None, true), Theme::Dark);
    assert_eq!(resolve_initial(None, false), Theme::Light);
    assert_eq!(resolve_initial(Some("sepia"), true), Theme::Dark);
    assert_eq!(resolve_initial(Some(""), false), Theme::Light);
}

#[test]
fn test_icon_class() {
    assert_eq!(icon_class("light"), "theme-icon fa7-solid--sun");
    assert_eq!(icon_class("dark"), "theme-icon f7--moon");
    assert_eq!(icon_class(""), "theme-icon f7--moon");
    assert_eq!(icon_class("Light"), "theme-icon f7--moon");
}

#[test]
fn test_theme_parse() {
    assert_eq!("dark".parse::<Theme>(), Ok(Theme::Dark));
    assert_eq!("light".parse::<Theme>(), Ok(Theme::Light));
    assert_eq!(
        "DARK".parse::<Theme>(),
        Err(UnknownTheme("DARK".to_owned()))
    );
    assert_eq!(Theme::Dark.to_string(), "dark");
}

#[test]
fn test_initialize_follows_system_without_storage() {
    use pretty_assertions::assert_eq;

    let host = FakeHost {
        dark: true,
        ..Default::default()
    };
    let manager = ThemeManager::initialize(host);
    assert_eq!(manager.host().attribute.as_deref(), Some("dark"));
    assert_eq!(manager.host().icon.as_deref(), Some("theme-icon f7--moon"));
    assert_eq!(manager.host().storage.as_deref(), Some("dark"));
}

#[test]
fn test_initialize_prefers_storage() {
    use pretty_assertions::assert_eq;

    let host = FakeHost {
        storage: Some("light".to_owned()),
        dark: true,
        ..Default::default()
    };
    let manager = ThemeManager::initialize(host);
    assert_eq!(manager.host().attribute.as_deref(), Some("light"));
    assert_eq!(
        manager.host().icon.as_deref(),
        Some("theme-icon fa7-solid--sun")
    );
}

#[test]
fn test_toggle_parity() {
    for start in [false, true] {
        let host = FakeHost {
            dark: start,
            ..Default::default()
        };
        let mut manager = ThemeManager::initialize(host);
        let initial = Theme::from_dark(start);
        for n in 1..=7 {
            let applied = manager.toggle_theme();
            let expected = if n % 2 == 0 { initial } else { initial.toggled() };
            assert_eq!(applied, expected);
            assert_eq!(manager.host().attribute.as_deref(), Some(expected.as_str()));
            assert_eq!(manager.host().storage.as_deref(), Some(expected.as_str()));
        }
    }
}

#[test]
fn test_toggle_without_attribute() {
    let mut manager = ThemeManager {
        host: FakeHost::default(),
        explicit: false,
    };
    assert_eq!(manager.toggle_theme(), Theme::Light);
    assert_eq!(
        manager.host().icon.as_deref(),
        Some("theme-icon fa7-solid--sun")
    );
}

#[test]
fn test_system_change_before_toggle() {
    let mut manager = ThemeManager::initialize(FakeHost::default());
    assert_eq!(manager.system_changed(true), Some(Theme::Dark));
    assert_eq!(manager.host().attribute.as_deref(), Some("dark"));
    assert_eq!(manager.host().icon.as_deref(), Some("theme-icon f7--moon"));
    assert_eq!(manager.system_changed(false), Some(Theme::Light));
    assert_eq!(manager.host().attribute.as_deref(), Some("light"));
}

#[test]
fn test_system_change_after_toggle() {
    let mut manager = ThemeManager::initialize(FakeHost::default());
    assert_eq!(manager.toggle_theme(), Theme::Dark);
    let writes = manager.host().writes;

    assert_eq!(manager.system_changed(false), None);
    assert_eq!(manager.system_changed(true), None);
    assert_eq!(manager.system_changed(false), None);
    assert_eq!(manager.host().attribute.as_deref(), Some("dark"));
    assert_eq!(manager.host().writes, writes);
}

#[test]
fn test_system_change_with_stored_choice() {
    let host = FakeHost {
        storage: Some("dark".to_owned()),
        ..Default::default()
    };
    let mut manager = ThemeManager::initialize(host);
    assert_eq!(manager.system_changed(false), None);
    assert_eq!(manager.host().attribute.as_deref(), Some("dark"));
}

#[test]
fn test_system_change_after_reload() {
    let first = ThemeManager::initialize(FakeHost::default());
    let stored = first.host().storage.clone();
    assert_eq!(stored.as_deref(), Some("light"));

    let host = FakeHost {
        storage: stored,
        ..Default::default()
    };
    let mut reloaded = ThemeManager::initialize(host);
    assert_eq!(reloaded.system_changed(true), None);
    assert_eq!(reloaded.host().attribute.as_deref(), Some("light"));
}
