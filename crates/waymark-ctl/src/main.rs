//! waymark-ctl — command-line interface for the Waymark daemon.

mod cmd;

use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_PORT: u16 = 3000;

fn print_usage() {
    println!("Usage: waymark-ctl [--port <port>] [--out <file>] <command>");
    println!();
    println!("Commands:");
    println!("  status                         Show daemon status");
    println!("  token <id>                     Locate a token and print its metadata");
    println!("  erc721 <collection> <number>   Print ERC721 metadata for a collection item");
    println!("  ext [<standard>] <uri>         Metadata for an extending-metadata URI");
    println!("                                 (standard: erc721, erc721/full, erc1155,");
    println!("                                  erc1155/full, yours, full)");
    println!("  ipfs <path>                    Fetch content-addressed content");
    println!();
    println!("Options:");
    println!("  --port <port>   API port (default: {})", DEFAULT_PORT);
    println!("  --out <file>    Write fetched content to a file");
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut port = DEFAULT_PORT;
    let mut out: Option<PathBuf> = None;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                i += 1;
                port = args
                    .get(i)
                    .context("--port requires a value")?
                    .parse()
                    .context("--port must be a number")?;
            }
            "--out" => {
                i += 1;
                out = Some(args.get(i).context("--out requires a value")?.into());
            }
            other => remaining.push(other),
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["status"] | [] => cmd::status::cmd_status(port).await,
        ["token", id] => cmd::token::cmd_token(port, id).await,
        ["erc721", collection, number] => {
            let number = number.parse().context("token number must be an integer")?;
            cmd::token::cmd_erc721(port, collection, number).await
        }
        ["ext", uri] => cmd::token::cmd_ext(port, None, uri).await,
        ["ext", standard, uri] => cmd::token::cmd_ext(port, Some(*standard), uri).await,
        ["ipfs", path] => cmd::content::cmd_ipfs(port, path, out.as_deref()).await,
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
