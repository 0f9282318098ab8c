mod ops;

use clap::{Parser, Subcommand};

use ops::{GenerateKeys, Run, Version};

#[derive(Parser, Debug)]
#[command(name = "veil", version, about = "Privacy node sealing ledger payloads for recipient nodes")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a node until interrupted
    Run(Run),
    /// Write a fresh key pair to <STEM>.key and <STEM>.pub
    GenerateKeys(GenerateKeys),
    /// Print build information
    Version(Version),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let output = match args.command {
        Command::Run(op) => op.execute().await?,
        Command::GenerateKeys(op) => op.execute()?,
        Command::Version(op) => op.execute()?,
    };

    println!("{}", output);
    Ok(())
}
