//! Runtime environment selection.

use std::env::VarError;
use std::fmt;
use std::io::Error;
use std::str::FromStr;

/// Environment variable selecting the runtime environment.
///
/// Unset means [`Environment::Dev`].
const APP_ENVIRONMENT_ENV_NAME: &str = "APP_ENVIRONMENT";

/// Runtime environment of the daemon.
///
/// The environment picks the `configuration/{environment}.*` file layered over the base
/// configuration, and the log output: pretty terminal logs in [`Environment::Dev`], rolling
/// JSON files in [`Environment::Prod`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Local runs. Used when `APP_ENVIRONMENT` is unset.
    Dev,
    /// Deployed daemon.
    Prod,
}

impl Environment {
    /// Every environment, in the order they are listed in error messages.
    const ALL: [Environment; 2] = [Environment::Dev, Environment::Prod];

    /// Reads the environment from `APP_ENVIRONMENT`.
    ///
    /// Fails when the variable names an unknown environment or is not valid unicode.
    pub fn load() -> Result<Environment, Error> {
        Self::from_variable(std::env::var(APP_ENVIRONMENT_ENV_NAME))
    }

    fn from_variable(value: Result<String, VarError>) -> Result<Environment, Error> {
        match value {
            Ok(name) => name.parse(),
            Err(VarError::NotPresent) => Ok(Environment::Dev),
            Err(err @ VarError::NotUnicode(_)) => Err(Error::other(format!(
                "`{APP_ENVIRONMENT_ENV_NAME}` cannot be read: {err}"
            ))),
        }
    }

    /// Returns the lowercase name used in `APP_ENVIRONMENT` and configuration file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;

    /// Parses an environment name, ignoring ASCII case.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|environment| environment.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                let supported: Vec<&str> = Self::ALL.iter().map(Environment::as_str).collect();
                Error::other(format!(
                    "`{name}` is not a supported environment, expected one of: {}",
                    supported.join(", ")
                ))
            })
    }
}
