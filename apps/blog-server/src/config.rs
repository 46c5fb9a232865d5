//! Application configuration loaded from environment variables.

use std::env;

use blog_core::BlogSettings;
use blog_infra::MailConfig;
use blog_infra::database::DatabaseConfig;

/// Staff account created at start-up when missing.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl AdminConfig {
    /// `ADMIN_EMAIL` and `ADMIN_PASSWORD` must both be set.
    fn from_env() -> Option<Self> {
        let email = env::var("ADMIN_EMAIL").ok().filter(|v| !v.is_empty())?;
        let password = env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty())?;
        Some(Self {
            username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            email,
            password,
        })
    }
}

/// Where absolute links in outgoing mail point.
///
/// `url` (`SITE_URL`) wins when set. Otherwise the request's `Host` header
/// is used, but only if it names one of `allowed_hosts` (`ALLOWED_HOSTS`,
/// comma separated). Forwarding headers are never consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub url: Option<String>,
    pub allowed_hosts: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: None,
            allowed_hosts: vec![
                "localhost".to_string(),
                "127.0.0.1".to_string(),
                "[::1]".to_string(),
            ],
        }
    }
}

impl SiteConfig {
    fn from_env() -> Self {
        let url = env::var("SITE_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty());
        let allowed_hosts = match env::var("ALLOWED_HOSTS") {
            Ok(list) => list
                .split(',')
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
            Err(_) => Self::default().allowed_hosts,
        };
        Self { url, allowed_hosts }
    }

    /// Scheme and authority for absolute links, or `None` when the
    /// request host is not trusted.
    pub fn root(&self, host_header: Option<&str>, secure: bool) -> Option<String> {
        if let Some(url) = &self.url {
            return Some(url.clone());
        }

        let host = host_header?.trim();
        if !self.host_allowed(host) {
            return None;
        }
        let scheme = if secure { "https" } else { "http" };
        Some(format!("{scheme}://{}", host.to_ascii_lowercase()))
    }

    /// Match the host part of `authority` against the allow list. `*`
    /// allows anything well-formed; a leading `.` also matches subdomains.
    pub fn host_allowed(&self, authority: &str) -> bool {
        let Some(domain) = host_part(authority) else {
            return false;
        };
        let domain = domain.to_ascii_lowercase();

        self.allowed_hosts.iter().any(|pattern| {
            if pattern == "*" {
                return true;
            }
            match pattern.strip_prefix('.') {
                Some(base) => domain == base || domain.ends_with(pattern.as_str()),
                None => domain == *pattern,
            }
        })
    }
}

/// Host part of a `host[:port]` authority, if it is well formed.
fn host_part(authority: &str) -> Option<&str> {
    let (host, port) = if authority.starts_with('[') {
        let end = authority.find(']')?;
        let inner = &authority[1..end];
        let literal_ok = !inner.is_empty()
            && inner
                .chars()
                .all(|c| c.is_ascii_hexdigit() || matches!(c, ':' | '.'));
        if !literal_ok {
            return None;
        }
        (&authority[..=end], &authority[end + 1..])
    } else {
        let (host, port) = match authority.find(':') {
            Some(idx) => (&authority[..idx], &authority[idx..]),
            None => (authority, ""),
        };
        let name_ok = !host.is_empty()
            && host
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'));
        if !name_ok {
            return None;
        }
        (host, port)
    };

    let port_ok = port.is_empty()
        || port
            .strip_prefix(':')
            .is_some_and(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));

    port_ok.then_some(host)
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    pub mail: MailConfig,
    pub blog: BlogSettings,
    pub site: SiteConfig,
    pub admin: Option<AdminConfig>,
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database = env::var("DATABASE_URL").ok().map(|url| DatabaseConfig {
            url,
            max_connections: parsed("DB_MAX_CONNECTIONS", 100),
            min_connections: parsed("DB_MIN_CONNECTIONS", 10),
        });

        let mail = MailConfig::from_env();
        let defaults = BlogSettings::default();
        let blog = BlogSettings {
            posts_per_page: parsed("POSTS_PER_PAGE", defaults.posts_per_page).max(1),
            mail_from: mail.from.clone(),
            ..defaults
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parsed("PORT", 8080),
            database,
            mail,
            blog,
            site: SiteConfig::from_env(),
            admin: AdminConfig::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(hosts: &[&str]) -> SiteConfig {
        SiteConfig {
            url: None,
            allowed_hosts: hosts.iter().map(|h| h.to_string()).collect(),
        }
    }

    #[test]
    fn configured_site_url_wins_over_the_host_header() {
        let config = SiteConfig {
            url: Some("https://blog.example".to_string()),
            ..SiteConfig::default()
        };

        assert_eq!(
            config.root(Some("evil.example"), false).as_deref(),
            Some("https://blog.example")
        );
    }

    #[test]
    fn host_header_must_be_allowed() {
        let config = site(&["blog.example", ".example.org"]);

        assert_eq!(
            config.root(Some("blog.example:8080"), false).as_deref(),
            Some("http://blog.example:8080")
        );
        assert_eq!(
            config.root(Some("news.example.org"), true).as_deref(),
            Some("https://news.example.org")
        );
        assert!(config.root(Some("evil.example"), false).is_none());
        assert!(config.root(None, false).is_none());
    }

    #[test]
    fn malformed_hosts_are_rejected() {
        let config = site(&["*"]);

        assert!(config.host_allowed("blog.example"));
        assert!(config.host_allowed("[::1]:8080"));
        assert!(!config.host_allowed("evil.example/path"));
        assert!(!config.host_allowed("user@evil.example"));
        assert!(!config.host_allowed("blog.example:80x"));
        assert!(!config.host_allowed(""));
    }

    #[test]
    fn default_allows_only_loopback() {
        let config = SiteConfig::default();

        assert!(config.host_allowed("localhost:8080"));
        assert!(config.host_allowed("[::1]"));
        assert!(!config.host_allowed("blog.example"));
    }
}
