//! Interactive chat client.
//!
//! Every line typed on stdin is sent as a chat message; everything the
//! relay sends is printed to stdout.
//!
//!   chatrelay-client --nick alice --host 127.0.0.1 --port 8005

use anyhow::{Context, Result};
use chatrelay::ChatClient;
use chatrelay_cli::init_logging;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "chatrelay-client", about = "Chat through a chatrelay server")]
struct Cli {
    /// Relay host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Relay port
    #[arg(short, long, default_value_t = 8005)]
    port: u16,

    /// Nickname (truncated to 20 characters)
    #[arg(short, long)]
    nick: String,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log: String,
}

impl Cli {
    fn relay_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log)?;

    let addr = cli.relay_addr();
    let mut client = ChatClient::connect(&addr, &cli.nick)
        .await
        .with_context(|| format!("failed to connect to {addr}"))?;
    println!("connected to {addr} as {}", client.nick());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line.context("failed to read stdin")? {
                Some(text) if text.trim().is_empty() => {}
                Some(text) => client.send_message(&text).await?,
                None => break,
            },
            event = client.next_event() => match event? {
                Some(event) => println!("{event}"),
                None => {
                    println!("relay closed the connection");
                    break;
                }
            },
        }
    }
    Ok(())
}
