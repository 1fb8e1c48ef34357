/*!
What `iris list` can enumerate.

  resources  root resources with their members
  endpoints  every callable endpoint with its signature
  aliases    argument aliases per endpoint
  globals    endpoints exempt from user scoping
*/

use std::fmt;

#[derive(clap::ValueEnum, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Subject {
    #[value(alias = "resource")]
    Resources,
    #[value(alias = "endpoint")]
    Endpoints,
    #[value(alias = "alias")]
    Aliases,
    #[value(alias = "global")]
    Globals,
}

impl Subject {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Resources => "resources",
            Subject::Endpoints => "endpoints",
            Subject::Aliases => "aliases",
            Subject::Globals => "globals",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Subject;
    use clap::ValueEnum;

    #[test]
    fn parse_with_singular_aliases() {
        assert_eq!(Subject::from_str("endpoints", true).unwrap(), Subject::Endpoints);
        assert_eq!(Subject::from_str("RESOURCE", true).unwrap(), Subject::Resources);
        assert_eq!(Subject::from_str("alias", false).unwrap(), Subject::Aliases);
        assert!(Subject::from_str("tools", true).is_err());
    }

    #[test]
    fn display_output() {
        assert_eq!(Subject::Globals.to_string(), "globals");
    }
}
