use clap::ValueEnum;
use serde::Deserialize;

/// Browser used for the interactive login.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    System,
    Chrome,
    Edge,
    Firefox,
    /// print the URL for the operator instead of launching anything
    #[serde(alias = "headless")]
    #[value(alias = "headless")]
    None,
}

/// What `Browser::open` hands to the platform opener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTarget<'a> {
    pub url: &'a str,
    /// `None` means the system default handler.
    pub app: Option<&'static str>,
}

impl Browser {
    pub fn is_headless(&self) -> bool {
        matches!(self, Browser::None)
    }

    /// Application name the platform opener expects for a named browser
    /// on the given OS (`std::env::consts::OS`).
    pub fn app_name(&self, os: &str) -> Option<&'static str> {
        match (os, self) {
            (_, Browser::System | Browser::None) => None,
            ("macos", Browser::Chrome) => Some("Google Chrome"),
            ("macos", Browser::Edge) => Some("Microsoft Edge"),
            ("macos", Browser::Firefox) => Some("Firefox"),
            ("windows", Browser::Chrome) => Some("chrome"),
            ("windows", Browser::Edge) => Some("msedge"),
            ("windows", Browser::Firefox) => Some("firefox"),
            (_, Browser::Chrome) => Some("google-chrome"),
            (_, Browser::Edge) => Some("microsoft-edge"),
            (_, Browser::Firefox) => Some("firefox"),
        }
    }

    pub fn launch_target<'a>(&self, url: &'a str, os: &str) -> Option<LaunchTarget<'a>> {
        if self.is_headless() {
            return None;
        }
        Some(LaunchTarget {
            url,
            app: self.app_name(os),
        })
    }

    /// Opens `url` and waits for the platform launcher to hand it off.
    pub fn open(&self, url: &str) -> std::io::Result<()> {
        let Some(target) = self.launch_target(url, std::env::consts::OS) else {
            return Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "headless browser"));
        };
        match target.app {
            Some(app) => open::with(target.url, app),
            None => open::that(target.url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::flow::authorization_url;
    use crate::config::types::AuthorizationConfig;

    const URL: &str = "https://uaa.x/oauth/authorize?client_id=c";

    #[test]
    fn system_browser_uses_default_handler() {
        for os in ["linux", "macos", "windows"] {
            let target = Browser::System.launch_target(URL, os).unwrap();
            assert_eq!(target, LaunchTarget { url: URL, app: None });
        }
    }

    #[test]
    fn named_browser_per_platform() {
        assert_eq!(Browser::Chrome.app_name("macos"), Some("Google Chrome"));
        assert_eq!(Browser::Edge.app_name("windows"), Some("msedge"));
        assert_eq!(Browser::Firefox.app_name("linux"), Some("firefox"));
        assert_eq!(Browser::Chrome.app_name("linux"), Some("google-chrome"));
    }

    #[test]
    fn whole_authorization_url_reaches_the_opener() {
        let auth = AuthorizationConfig::new("https://uaa.x", "c", "s");
        let url = authorization_url(&auth, "http://localhost:3001/callback").unwrap();

        for os in ["linux", "macos", "windows"] {
            for browser in [Browser::System, Browser::Chrome, Browser::Edge, Browser::Firefox] {
                let target = browser.launch_target(&url, os).unwrap();
                assert_eq!(target.url, url);
                assert!(target.url.contains("&redirect_uri="));
                assert!(target.url.ends_with("&response_type=code"));
            }
        }
    }

    #[test]
    fn headless_has_no_target() {
        assert!(Browser::None.launch_target(URL, "linux").is_none());
        assert!(Browser::None.is_headless());
        assert!(Browser::None.open(URL).is_err());
    }

    #[test]
    fn headless_alias_deserializes() {
        let browser: Browser = serde_yaml::from_str("headless").unwrap();
        assert_eq!(browser, Browser::None);
    }
}
