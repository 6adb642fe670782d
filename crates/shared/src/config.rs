use std::env;

/// Secrets and endpoints read from the environment.
///
/// Every value is optional here; each collector or publisher decides what it
/// requires and reports the missing names when it is constructed.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub github_token: Option<String>,
    pub notion_token: Option<String>,
    pub notion_medium_db_id: Option<String>,
    pub notion_alert_db_id: Option<String>,
    pub wordpress_url: Option<String>,
    pub wordpress_user: Option<String>,
    pub wordpress_app_password: Option<String>,
    pub x_api_key: Option<String>,
    pub x_api_secret: Option<String>,
    pub x_access_token: Option<String>,
    pub x_access_token_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            github_token: get("GITHUB_TOKEN"),
            notion_token: get("NOTION_TOKEN"),
            notion_medium_db_id: get("NOTION_MEDIUM_DB_ID"),
            notion_alert_db_id: get("NOTION_NEWS_DB_ID"),
            wordpress_url: get("WORDPRESS_URL"),
            wordpress_user: get("WORDPRESS_USER"),
            wordpress_app_password: get("WORDPRESS_APP_PASSWORD"),
            x_api_key: get("X_API_KEY"),
            x_api_secret: get("X_API_SECRET"),
            x_access_token: get("X_ACCESS_TOKEN"),
            x_access_token_secret: get("X_ACCESS_TOKEN_SECRET"),
        }
    }

    fn try_load_dotenv() {
        // Try locations in order of preference:

        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/content-pipeline/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("content-pipeline").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }

        // If none found, that's okay - environment variables might be set system-wide
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_from_lookup_reads_known_keys() {
        let vars: HashMap<&str, &str> = [
            ("GITHUB_TOKEN", "ghp_x"),
            ("NOTION_NEWS_DB_ID", "alerts"),
            ("WORDPRESS_URL", "https://blog.example.com"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.github_token.as_deref(), Some("ghp_x"));
        assert_eq!(config.notion_alert_db_id.as_deref(), Some("alerts"));
        assert_eq!(
            config.wordpress_url.as_deref(),
            Some("https://blog.example.com")
        );
        assert!(config.x_api_key.is_none());
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = Config::from_lookup(|k| (k == "NOTION_TOKEN").then(|| "  ".to_string()));
        assert!(config.notion_token.is_none());
    }
}
