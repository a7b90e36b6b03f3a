//! sharedvars CLI Client
//!
//! Command-line interface for interacting with a sharedvars server.

use clap::{Args, Parser, Subcommand, ValueEnum};
use sharedvars::network::Client;
use sharedvars::protocol::{Request, Response};
use sharedvars::{Value, VarFlags};

/// sharedvars CLI
#[derive(Parser, Debug)]
#[command(name = "sharedvars-cli")]
#[command(about = "CLI for the sharedvars server")]
struct Cli {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:2812")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a variable
    Get { group: String, name: String },

    /// Set a variable
    Set {
        group: String,
        name: String,
        value: String,

        /// Value type
        #[arg(short = 't', long = "type", value_enum, default_value = "string")]
        kind: Kind,

        #[command(flatten)]
        flags: Flags,

        /// Print the value as it was before this write
        #[arg(long)]
        previous: bool,
    },

    /// Increment an integer variable
    Inc {
        group: String,
        name: String,
        #[command(flatten)]
        flags: Flags,
    },

    /// Decrement an integer variable
    Dec {
        group: String,
        name: String,
        #[command(flatten)]
        flags: Flags,
    },

    /// Delete a variable, or a whole group when no name is given
    Del { group: String, name: Option<String> },

    /// List groups, or the variables of one group
    List {
        group: Option<String>,

        /// Include up to this many bytes of each value
        #[arg(long)]
        values: Option<u16>,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Kind {
    Logical,
    Numeric,
    String,
}

#[derive(Args, Debug)]
struct Flags {
    /// Create the variable if it does not exist
    #[arg(short, long)]
    create: bool,

    /// Tie the variable to this connection
    #[arg(long)]
    owned: bool,

    /// Deny reads by other connections (Owned only)
    #[arg(long)]
    deny_read: bool,

    /// Deny writes by other connections (Owned only)
    #[arg(long)]
    deny_write: bool,
}

impl From<&Flags> for VarFlags {
    fn from(flags: &Flags) -> Self {
        VarFlags {
            create_if_missing: flags.create,
            owned: flags.owned,
            deny_read: flags.deny_read,
            deny_write: flags.deny_write,
        }
    }
}

fn parse_value(kind: Kind, text: &str) -> sharedvars::Result<Value> {
    Ok(match kind {
        Kind::Logical => Value::Logical(matches!(text, "1" | "true" | "yes" | "on")),
        Kind::Numeric => Value::parse_numeric(text.as_bytes())?,
        Kind::String => Value::String(text.as_bytes().to_vec()),
    })
}

fn build_request(command: Commands) -> sharedvars::Result<Request> {
    Ok(match command {
        Commands::Get { group, name } => Request::Get { group, name },
        Commands::Set {
            group,
            name,
            value,
            kind,
            flags,
            previous,
        } => Request::Set {
            group,
            name,
            value: parse_value(kind, &value)?,
            flags: VarFlags::from(&flags),
            return_previous: previous,
        },
        Commands::Inc { group, name, flags } => Request::Increment {
            group,
            name,
            flags: VarFlags::from(&flags),
            return_previous: false,
        },
        Commands::Dec { group, name, flags } => Request::Decrement {
            group,
            name,
            flags: VarFlags::from(&flags),
            return_previous: false,
        },
        Commands::Del { group, name } => Request::Delete { group, name },
        Commands::List { group, values } => Request::List {
            group,
            max_value_len: values,
        },
    })
}

fn print_response(response: Response) {
    match response {
        Response::Status(status) => {
            println!("{}", String::from_utf8_lossy(status.code()));
        }
        Response::Value(value) => {
            println!("{:?}: {}", value.var_type(), String::from_utf8_lossy(&value.text()));
        }
        Response::NoPrevious => println!("(created)"),
        Response::Groups(names) | Response::Names(names) => {
            for name in names {
                println!("{}", name);
            }
        }
        Response::Values(entries) => {
            for entry in entries {
                println!(
                    "{} [{:?}] {}",
                    entry.name,
                    entry.var_type,
                    String::from_utf8_lossy(&entry.preview)
                );
            }
        }
    }
}

fn main() {
    let args = Cli::parse();

    let result = build_request(args.command).and_then(|request| {
        let mut client = Client::connect(&args.server)?;
        client.request(&request)
    });

    match result {
        Ok(response) => print_response(response),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}
