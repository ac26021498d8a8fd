use clap::Parser;
use revisions_core::User;

#[derive(Parser, Debug)]
#[command(
    name = "revisions-engine",
    about = "Annotation store with correction tracking over JSON-RPC 2.0 / NDJSON stdio"
)]
pub struct CliArgs {
    /// Id of the user that authors corrections made through this engine
    #[arg(long, default_value = "anonymous", env = "REVISIONS_USER_ID")]
    pub user_id: String,

    /// Display name of that user
    #[arg(long, env = "REVISIONS_USER_NAME")]
    pub user_name: Option<String>,

    /// Server name in the initialize response
    #[arg(long, default_value = "revisions-engine")]
    pub server_name: String,

    /// Server version
    #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
    pub server_version: String,

    /// Log level (trace, debug, info, warn, error), used when RUST_LOG is unset
    #[arg(long, default_value = "info", env = "REVISIONS_LOG_LEVEL")]
    pub log_level: String,
}

impl CliArgs {
    pub fn user(&self) -> User {
        User {
            id: self.user_id.clone(),
            name: self.user_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = CliArgs::parse_from(["revisions-engine"]);
        assert_eq!(args.server_name, "revisions-engine");
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn user_from_flags() {
        let args = CliArgs::parse_from([
            "revisions-engine",
            "--user-id",
            "u-42",
            "--user-name",
            "Ada",
        ]);
        let user = args.user();
        assert_eq!(user.id, "u-42");
        assert_eq!(user.name.as_deref(), Some("Ada"));
    }
}
