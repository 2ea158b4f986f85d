use anyhow::{Context, Result};
use clap::Subcommand;

use super::build_tools;
use crate::cli::output::get_formatter;
use crate::client::ToolClient;
use crate::models::{Config, OutputFormat};
use crate::tools::{AGENT_INSTRUCTIONS, ToolCall, tool_definitions};

#[derive(Debug, Subcommand)]
pub enum ToolCommand {
    #[command(about = "List the tools exposed to agents")]
    List,
    #[command(about = "Print the curator instructions for the agent runtime")]
    Instructions,
    #[command(about = "Invoke a tool with JSON arguments")]
    Call {
        #[arg(help = "Tool name, e.g. search_songs")]
        name: String,
        #[arg(long, short = 'a', default_value = "{}", help = "JSON arguments object")]
        args: String,
        #[arg(long, help = "Run in-process even if a tool server is running")]
        local: bool,
    },
}

pub async fn handle_tool(cmd: ToolCommand, format: OutputFormat, _verbose: bool) -> Result<()> {
    let formatter = get_formatter(format);

    match cmd {
        ToolCommand::List => {
            print!("{}", formatter.format_tools(&tool_definitions()));
        }
        ToolCommand::Instructions => {
            println!("{}", AGENT_INSTRUCTIONS);
        }
        ToolCommand::Call { name, args, local } => {
            let arguments: serde_json::Value =
                serde_json::from_str(&args).context("--args must be a JSON object")?;
            let call = ToolCall::new(name, arguments);
            let config = Config::load()?;

            let client = ToolClient::from_config(&config);
            let response = if !local && client.is_running() {
                tracing::debug!(socket = %client.socket_path().display(), "calling tool server");
                client.call(call).await?
            } else {
                build_tools(&config)?.dispatch(call).await
            };
            print!("{}", formatter.format_tool_response(&response));
        }
    }

    Ok(())
}
