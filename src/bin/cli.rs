//! authstore CLI Client
//!
//! Command-line interface for interacting with an authstore server.

use std::process::ExitCode;
use std::time::Duration;

use authstore::network::Client;
use authstore::validator;
use clap::{Parser, Subcommand};

/// authstore CLI
#[derive(Parser, Debug)]
#[command(name = "authstore-cli")]
#[command(about = "CLI for the authstore user store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:9080")]
    server: String,

    /// Request timeout in milliseconds
    #[arg(short, long, default_value = "1000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get the name stored for an identifier
    Get {
        /// The identifier (UUID)
        id: String,
    },

    /// Store a name under an identifier
    Set {
        /// The identifier (UUID)
        id: String,

        /// The display name
        name: String,
    },

    /// Delete an identifier
    Del {
        /// The identifier (UUID)
        id: String,
    },

    /// Create a new identifier for a name and print it
    Register {
        /// The display name
        name: String,
    },

    /// Ping the server
    Ping,

    /// Print server statistics as JSON
    Monitor,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let timeout = Some(Duration::from_millis(args.timeout_ms));

    let mut client = match Client::connect(&args.server, timeout) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: cannot connect to {}: {}", args.server, e);
            return ExitCode::FAILURE;
        }
    };

    let result = match args.command {
        Commands::Get { id } => client.get(&id).map(|name| match name {
            Some(name) => println!("{}", name),
            None => println!("(not found)"),
        }),
        Commands::Set { id, name } => client.set(&id, &name).map(|()| println!("OK")),
        Commands::Del { id } => client.delete(&id).map(|()| println!("OK")),
        Commands::Register { name } => {
            if !validator::is_valid_name(&name) {
                eprintln!("error: invalid name {:?}", name);
                return ExitCode::FAILURE;
            }
            let id = validator::generate_identifier();
            client.set(&id, &name).map(|()| println!("{}", id))
        }
        Commands::Ping => client.ping().map(|()| println!("PONG")),
        Commands::Monitor => client.monitor().map(|report| {
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("error: {}", e),
            }
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
