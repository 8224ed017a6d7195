use serde::{Deserialize, Serialize};

/// Process configuration, built once at startup: optional YAML file first,
/// then environment variables layered on top. Immutable after that.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port the HTTP boundary binds first.
    pub listen_port: u16,
    /// Port tried once if the primary port is already in use.
    pub fallback_port: u16,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    pub smtp_secure: bool,
    /// Destination for every forwarded inquiry.
    pub to_email: String,
    /// Sender override; when unset the sender becomes noreply@<request host>.
    pub from_email: Option<String>,
    pub sendmail_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_port: 3000,
            fallback_port: 3001,
            smtp_host: None,
            smtp_port: None,
            smtp_user: None,
            smtp_pass: None,
            smtp_secure: false,
            to_email: "eminencehrconsult@gmail.com".to_string(),
            from_email: None,
            sendmail_path: "/usr/sbin/sendmail".to_string(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Layer process environment variables over this configuration.
    pub fn overlay_env(self) -> Self {
        self.overlay(std::env::vars())
    }

    fn overlay(mut self, vars: impl Iterator<Item = (String, String)>) -> Self {
        for (key, value) in vars {
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                "SMTP_HOST" => self.smtp_host = Some(value),
                "SMTP_USER" => self.smtp_user = Some(value),
                "SMTP_PASS" => self.smtp_pass = Some(value),
                "SMTP_PORT" => {
                    if let Ok(port) = value.parse() {
                        self.smtp_port = Some(port);
                    } else {
                        log::warn!("ignoring unparseable SMTP_PORT: {value}");
                    }
                }
                "SMTP_SECURE" => self.smtp_secure = value == "true",
                "TO_EMAIL" => self.to_email = value,
                "FROM_EMAIL" => self.from_email = Some(value),
                "SENDMAIL_PATH" => self.sendmail_path = value,
                "PORT" => {
                    if let Ok(port) = value.parse() {
                        self.listen_port = port;
                    } else {
                        log::warn!("ignoring unparseable PORT: {value}");
                    }
                }
                _ => {}
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Iterator<Item = (String, String)> + 'a {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.listen_port, 3000);
        assert_eq!(config.fallback_port, 3001);
        assert_eq!(config.to_email, "eminencehrconsult@gmail.com");
        assert_eq!(config.sendmail_path, "/usr/sbin/sendmail");
        assert!(config.smtp_host.is_none());
        assert!(!config.smtp_secure);
    }

    #[test]
    fn test_env_overlay_takes_precedence() {
        let config = Config::default().overlay(vars(&[
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_USER", "mailer"),
            ("SMTP_PASS", "hunter2"),
            ("SMTP_PORT", "465"),
            ("SMTP_SECURE", "true"),
            ("TO_EMAIL", "inbox@example.com"),
            ("PORT", "8080"),
            ("UNRELATED", "ignored"),
        ]));
        assert_eq!(config.smtp_host.as_deref(), Some("smtp.example.com"));
        assert_eq!(config.smtp_port, Some(465));
        assert!(config.smtp_secure);
        assert_eq!(config.to_email, "inbox@example.com");
        assert_eq!(config.listen_port, 8080);
    }

    #[test]
    fn test_empty_and_unparseable_values_are_ignored() {
        let config = Config::default().overlay(vars(&[
            ("SMTP_HOST", ""),
            ("SMTP_PORT", "not-a-port"),
            ("SMTP_SECURE", "yes"),
        ]));
        assert!(config.smtp_host.is_none());
        assert!(config.smtp_port.is_none());
        // Anything other than the literal "true" leaves the flag off.
        assert!(!config.smtp_secure);
    }

    #[test]
    fn test_yaml_file_shape() {
        let yaml =
            "listen_port: 4000\nsmtp_host: smtp.example.com\nto_email: inbox@example.com\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.listen_port, 4000);
        assert_eq!(config.fallback_port, 3001);
        assert_eq!(config.smtp_host.as_deref(), Some("smtp.example.com"));
        assert_eq!(config.to_email, "inbox@example.com");
    }
}
