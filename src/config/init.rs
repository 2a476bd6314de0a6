// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates shipyard.yml template files.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::AppName;

use super::CONFIG_FILENAME;

const DEFAULT_APPLICATION: &str = "my-app";
const DEFAULT_REPOSITORY: &str = "git@github.com:example/my-app.git";

pub fn init_config(
    dir: &Path,
    application: Option<&str>,
    repository: Option<&str>,
    force: bool,
) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let application = AppName::new(application.unwrap_or(DEFAULT_APPLICATION))
        .map_err(|e| Error::InvalidConfig(e.to_string()))?;
    let repository = repository.unwrap_or(DEFAULT_REPOSITORY);

    std::fs::write(&config_path, template_yaml(&application, repository))?;
    tracing::info!("wrote {}", config_path.display());

    Ok(())
}

/// Starter configuration with the optional settings commented out.
pub fn template_yaml(application: &AppName, repository: &str) -> String {
    format!(
        r#"application: {application}
deploy_to: /var/www/{application}
repository: "{repository}"
# scm: git            # or "copy" to deploy a directory present on each host
# revision: HEAD

servers:
  - host: server.example.com
    port: 22
    user: deploy
    roles: [app]
    # SSH host key verification (default: true, Trust-On-First-Use)
    # Set to false to require a pre-populated ~/.ssh/known_hosts
    # trust_first_connection: true

keep_releases: 5
umask: "02"
# owner: deploy
# group: www-data

# shared_paths:
#   log: log
#   uploads: public/uploads
# mkdirs:
#   - tmp/cache

# restart: "sudo systemctl restart {application}"
# command_timeout: 5m
# lock_timeout: 1h

# destinations:
#   staging:
#     deploy_to: /var/www/{application}-staging
#     servers:
#       - deploy@staging.example.com
"#,
        application = application,
        repository = repository.replace('"', "\\\""),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn template_parses() {
        let app = AppName::new("shop").unwrap();
        let config = Config::from_yaml(&template_yaml(&app, "git@example.com:shop.git")).unwrap();

        assert_eq!(config.application.as_str(), "shop");
        assert_eq!(config.deploy_to, "/var/www/shop");
        assert_eq!(config.repository, "git@example.com:shop.git");
        assert_eq!(config.umask, "02");
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        init_config(dir.path(), None, None, false).unwrap();

        let err = init_config(dir.path(), None, None, false).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
        assert!(init_config(dir.path(), Some("other"), None, true).is_ok());
    }

    #[test]
    fn rejects_invalid_application_name() {
        let dir = tempfile::tempdir().unwrap();
        let err = init_config(dir.path(), Some("Bad Name"), None, false).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
