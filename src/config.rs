use clap::Parser;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

static DEFAULT_REGISTRY_URL: &str = "https://registry.hub.docker.com";
static DEFAULT_AUTH_URL: &str = "https://auth.docker.io/token";
static DEFAULT_REGISTRY_SERVICE: &str = "registry.docker.io";

#[derive(Debug, Parser)]
#[command(name = "dockerchk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Space separated list of images to check (empty checks every running container)
    #[arg(short, long, env = "DOCKERCHK_IMAGES", default_value = "")]
    pub images: String,

    /// Drop from root privileges to this user
    #[arg(long, env = "DOCKERCHK_NOBODY_USERNAME", default_value = "nobody")]
    pub nobody_username: String,

    /// Print verbose output
    #[arg(short, long, env = "DOCKERCHK_VERBOSE")]
    pub verbose: bool,

    /// Print debug output
    #[arg(long, env = "DOCKERCHK_DEBUG")]
    pub debug: bool,

    /// Log level used when neither --verbose nor --debug is given
    #[arg(long, env = "DOCKERCHK_LOG_LEVEL", default_value = "warn")]
    pub log_level: LevelFilter,

    /// Always exit with 0, even if updates are available
    #[arg(long, env = "DOCKERCHK_NO_EXIT_CODE")]
    pub no_exit_code: bool,

    /// Base URL of the registry serving image manifests
    #[arg(long, env = "DOCKERCHK_REGISTRY_URL", default_value = DEFAULT_REGISTRY_URL)]
    pub registry_url: String,

    /// Token endpoint handing out pull tokens for the registry
    #[arg(long, env = "DOCKERCHK_AUTH_URL", default_value = DEFAULT_AUTH_URL)]
    pub auth_url: String,

    /// Service name sent to the token endpoint
    #[arg(long, env = "DOCKERCHK_REGISTRY_SERVICE", default_value = DEFAULT_REGISTRY_SERVICE)]
    pub registry_service: String,

    /// Additional PEM encoded root certificates trusted by the registry client
    #[arg(
        long = "ca-certificate",
        env = "DOCKERCHK_CA_CERTIFICATES",
        value_delimiter = ','
    )]
    pub ca_certificates: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub images: ImageFilter,
    pub nobody_username: String,
    pub log_level: LevelFilter,
    pub signal_updates_via_exit_code: bool,
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub registry_url: String,
    pub auth_url: String,
    pub service: String,
    pub ca_certificate_paths: Vec<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            service: DEFAULT_REGISTRY_SERVICE.to_string(),
            ca_certificate_paths: Vec::new(),
        }
    }
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        let log_level = if cli.debug {
            LevelFilter::DEBUG
        } else if cli.verbose {
            LevelFilter::INFO
        } else {
            cli.log_level
        };

        Self {
            images: ImageFilter::from_config_str(&cli.images),
            nobody_username: cli.nobody_username,
            log_level,
            signal_updates_via_exit_code: !cli.no_exit_code,
            registry: RegistryConfig {
                registry_url: cli.registry_url.trim_end_matches('/').to_string(),
                auth_url: cli.auth_url,
                service: cli.registry_service,
                ca_certificate_paths: cli.ca_certificates,
            },
        }
    }
}

/// Allow-list of image strings, as configured. A single empty entry matches every image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFilter(Vec<String>);

impl ImageFilter {
    pub fn from_config_str(images: &str) -> Self {
        ImageFilter(images.split(' ').map(str::to_string).collect())
    }

    pub fn matches_all(&self) -> bool {
        self.0.len() == 1 && self.0[0].is_empty()
    }

    pub fn matches(&self, image: &str) -> bool {
        self.matches_all()
            || self
                .0
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_matches_every_image() {
        let filter = ImageFilter::from_config_str("");
        assert!(filter.matches_all());
        assert!(filter.matches("nginx"));
        assert!(filter.matches("grafana/grafana:11.0.0"));
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let filter = ImageFilter::from_config_str("nginx:latest");
        assert!(filter.matches("Nginx:Latest"));
        assert!(!filter.matches("nginx"));
    }

    #[test]
    fn test_filter_splits_on_spaces() {
        let filter = ImageFilter::from_config_str("nginx redis:7");
        assert!(filter.matches("nginx"));
        assert!(filter.matches("redis:7"));
        assert!(!filter.matches("redis"));
        assert!(!filter.matches_all());
    }

    #[test]
    fn test_double_space_is_not_a_wildcard() {
        let filter = ImageFilter::from_config_str("nginx  redis");
        assert!(!filter.matches_all());
        assert!(!filter.matches("postgres"));
    }

    #[test]
    fn test_cli_defaults() {
        let config = Config::from(Cli::parse_from(["dockerchk"]));
        assert!(config.images.matches_all());
        assert_eq!(config.nobody_username, "nobody");
        assert_eq!(config.log_level, LevelFilter::WARN);
        assert!(config.signal_updates_via_exit_code);
        assert_eq!(config.registry.registry_url, DEFAULT_REGISTRY_URL);
        assert_eq!(config.registry.auth_url, DEFAULT_AUTH_URL);
        assert_eq!(config.registry.service, DEFAULT_REGISTRY_SERVICE);
        assert!(config.registry.ca_certificate_paths.is_empty());
    }

    #[test]
    fn test_cli_flags() {
        let config = Config::from(Cli::parse_from([
            "dockerchk",
            "-i",
            "nginx redis",
            "--nobody-username",
            "daemon",
            "-v",
            "--no-exit-code",
            "--registry-url",
            "http://localhost:5000/",
            "--ca-certificate",
            "/etc/ssl/a.pem,/etc/ssl/b.pem",
        ]));
        assert!(config.images.matches("redis"));
        assert_eq!(config.nobody_username, "daemon");
        assert_eq!(config.log_level, LevelFilter::INFO);
        assert!(!config.signal_updates_via_exit_code);
        assert_eq!(config.registry.registry_url, "http://localhost:5000");
        assert_eq!(
            config.registry.ca_certificate_paths,
            vec![PathBuf::from("/etc/ssl/a.pem"), PathBuf::from("/etc/ssl/b.pem")]
        );
    }

    #[test]
    fn test_debug_wins_over_verbose() {
        let config = Config::from(Cli::parse_from(["dockerchk", "-v", "--debug"]));
        assert_eq!(config.log_level, LevelFilter::DEBUG);
    }

    #[test]
    fn test_log_level_baseline() {
        let config = Config::from(Cli::parse_from(["dockerchk", "--log-level", "info"]));
        assert_eq!(config.log_level, LevelFilter::INFO);
    }
}
