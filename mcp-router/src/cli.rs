//! Command-line surface: one subcommand per transport (`stdio`, `http`,
//! `sse`, `api`), plus `add` for registering an instance without starting
//! a server.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "mcp-router", version, about = "A Model Context Protocol router/proxy")]
pub struct Cli {
    /// Directory holding config.json and the per-provider mcp_settings.json files.
    #[arg(short = 'c', long = "config", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Log verbosity (error, warn, info, debug, trace).
    #[arg(short = 'l', long = "log-level", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the upstream MCP server façade over stdio.
    Stdio,
    /// Run the upstream MCP server façade over streamable HTTP.
    Http {
        #[arg(long, default_value = "127.0.0.1:8765")]
        bind: String,
    },
    /// Run the upstream MCP server façade over SSE.
    Sse {
        #[arg(long, default_value = "127.0.0.1:8766")]
        bind: String,
    },
    /// Run the HTTP admin API alongside whichever façade is running.
    Api {
        #[arg(long, default_value = "127.0.0.1:8767")]
        bind: String,
    },
    /// Write a normalised settings file under data/<provider>/ without
    /// starting any server loop. `instance` and `provider` must be equal
    /// ASCII strings; `display` may be arbitrary Unicode and becomes the
    /// stored `name`.
    Add {
        instance: String,
        provider: String,
        display: Option<String>,
    },
}
