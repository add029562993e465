use std::fs::File;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use ggn_node::{FileServer, FileServerConfig, HandshakeKind, LogMessages};
use ggn_store::{BlobStore, DiskStore, StoreConfig};
use tracing::{debug, info};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Put(args) => cmd_put(args),
        Command::Get(args) => cmd_get(args),
        Command::Has(args) => cmd_has(args),
        Command::Delete(args) => cmd_delete(args),
        Command::Path(args) => cmd_path(args),
        Command::Send(args) => cmd_send(args),
    }
}

fn open_store(args: StoreArgs) -> DiskStore {
    DiskStore::new(StoreConfig { root: args.root, transform: args.transform })
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start async runtime")
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => FileServerConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => FileServerConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    if let Some(root) = args.root {
        config.storage_root = root;
    }

    runtime()?.block_on(async move {
        let server = Arc::new(FileServer::new(config));
        let addr = server.start().await?;
        println!(
            "{} GG Network node on {} (root: {})",
            "✓".green().bold(),
            addr.to_string().bold(),
            server.store().root().display()
        );

        let stopper = Arc::clone(&server);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
                stopper.shutdown();
            }
        });

        server.run(Arc::new(LogMessages)).await?;
        println!("{} Stopped.", "✓".green());
        Ok(())
    })
}

fn cmd_put(args: PutArgs) -> anyhow::Result<()> {
    let store = open_store(args.store);
    let written = match &args.file {
        Some(path) => {
            let mut file =
                File::open(path).with_context(|| format!("opening {}", path.display()))?;
            store.write(&args.key, &mut file)?
        }
        None => store.write(&args.key, &mut io::stdin().lock())?,
    };
    debug!(key = %args.key, bytes = written, root = %store.root().display(), "put blob");
    println!("{} Stored {} ({} bytes)", "✓".green().bold(), args.key.yellow(), written);
    Ok(())
}

fn cmd_get(args: KeyArgs) -> anyhow::Result<()> {
    let store = open_store(args.store);
    let mut blob = store.read(&args.key)?;
    let mut out = io::stdout().lock();
    io::copy(&mut blob, &mut out)?;
    out.flush()?;
    Ok(())
}

fn cmd_has(args: KeyArgs) -> anyhow::Result<()> {
    let store = open_store(args.store);
    if store.has(&args.key)? {
        println!("{} {} present", "✓".green().bold(), args.key.yellow());
    } else {
        println!("{} {} missing", "✗".red().bold(), args.key.yellow());
    }
    Ok(())
}

fn cmd_delete(args: KeyArgs) -> anyhow::Result<()> {
    let store = open_store(args.store);
    let shard = store.path_key(&args.key)?.first_path_name().to_string();
    store.delete(&args.key)?;
    println!("{} Deleted {} (shard {})", "✓".green().bold(), args.key.yellow(), shard.cyan());
    Ok(())
}

fn cmd_path(args: KeyArgs) -> anyhow::Result<()> {
    let store = open_store(args.store);
    let path_key = store.path_key(&args.key)?;
    println!("Key:       {}", args.key.yellow());
    println!("Transform: {}", store.transform());
    println!("Directory: {}", path_key.path_name.cyan());
    println!("File:      {}", path_key.file_name.cyan());
    println!("Location:  {}", path_key.full_path(store.root()).display());
    Ok(())
}

fn cmd_send(args: SendArgs) -> anyhow::Result<()> {
    let config = FileServerConfig {
        listen_addr: "127.0.0.1:0".into(),
        handshake: if args.hello { HandshakeKind::Hello } else { HandshakeKind::Nop },
        ..FileServerConfig::default()
    };

    runtime()?.block_on(async move {
        let node = FileServer::new(config);
        let mut peer = node
            .dial(args.addr)
            .await
            .with_context(|| format!("connecting to {}", args.addr))?;
        for message in &args.messages {
            peer.send(message.as_bytes()).await?;
            debug!(peer = %args.addr, bytes = message.len(), "sent frame");
        }
        peer.close().await?;
        println!(
            "{} Sent {} message(s) to {}",
            "✓".green().bold(),
            args.messages.len(),
            args.addr.to_string().bold()
        );
        Ok(())
    })
}
