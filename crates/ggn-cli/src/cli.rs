use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use ggn_store::PathTransform;

#[derive(Parser)]
#[command(
    name = "ggn",
    about = "GG Network node: content-addressed blob store and peer transport",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a node until interrupted
    Serve(ServeArgs),
    /// Store a blob from a file or stdin
    Put(PutArgs),
    /// Write a blob to stdout
    Get(KeyArgs),
    /// Check whether a blob exists
    Has(KeyArgs),
    /// Delete a blob (and every blob in its top-level shard)
    Delete(KeyArgs),
    /// Show where a key is stored
    Path(KeyArgs),
    /// Dial a node and send each message as one frame
    Send(SendArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Listen address, overrides the config file
    #[arg(short, long)]
    pub listen: Option<String>,
    /// Storage root, overrides the config file
    #[arg(short, long)]
    pub root: Option<PathBuf>,
}

#[derive(Args)]
pub struct StoreArgs {
    #[arg(long, default_value = ggn_store::DEFAULT_ROOT)]
    pub root: PathBuf,
    /// `cas` or `identity`
    #[arg(long, default_value = "cas")]
    pub transform: PathTransform,
}

#[derive(Args)]
pub struct KeyArgs {
    pub key: String,
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args)]
pub struct PutArgs {
    pub key: String,
    /// Read from this file instead of stdin
    pub file: Option<PathBuf>,
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args)]
pub struct SendArgs {
    pub addr: SocketAddr,
    #[arg(required = true)]
    pub messages: Vec<String>,
    /// Run the version handshake before sending
    #[arg(long)]
    pub hello: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_put_with_defaults() {
        let cli = Cli::try_parse_from(["ggn", "put", "photo", "cat.jpg"]).unwrap();
        match cli.command {
            Command::Put(args) => {
                assert_eq!(args.key, "photo");
                assert_eq!(args.file, Some(PathBuf::from("cat.jpg")));
                assert_eq!(args.store.root, PathBuf::from("ggnetwork"));
                assert_eq!(args.store.transform, PathTransform::ContentAddressed);
            }
            _ => panic!("expected put"),
        }
    }

    #[test]
    fn parse_identity_transform() {
        let cli = Cli::try_parse_from(["ggn", "has", "k", "--transform", "identity"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Has(KeyArgs { store: StoreArgs { transform: PathTransform::Identity, .. }, .. })
        ));
        assert!(Cli::try_parse_from(["ggn", "has", "k", "--transform", "md5"]).is_err());
    }

    #[test]
    fn send_needs_messages() {
        assert!(Cli::try_parse_from(["ggn", "send", "127.0.0.1:30090"]).is_err());
        let cli = Cli::try_parse_from(["ggn", "send", "127.0.0.1:30090", "a", "b", "--hello"]).unwrap();
        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.messages, vec!["a", "b"]);
                assert!(args.hello);
            }
            _ => panic!("expected send"),
        }
    }
}
