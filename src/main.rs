use clap::{Parser, Subcommand};
use serde_json::json;
use std::error::Error;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use webdriver_agent::agent::{AgentClient, AgentOptions, ReportSettings, ReportType};
use webdriver_agent::config::{self, Config};

/// Secrets this short are never partially shown
const MASK_MIN_LEN: usize = 8;

/// WebDriver Agent SDK - inspect configuration and Agent sessions
#[derive(Parser, Debug)]
#[command(
    name = "wd-agent",
    about = "Check the Agent connection used to report WebDriver test runs",
    after_help = "ENVIRONMENT VARIABLES:\n\
        TP_DEV_TOKEN                 Developer token sent to the Agent\n\
        TP_AGENT_URL                 Agent base URL\n\
        TP_KEEP_DRIVER_SESSION       Skip the real quit on teardown\n\
        TP_MAX_REPORTS_BATCH_SIZE    Max report items per batch request\n\
        TP_AGENT_CONNECT_TIMEOUT     HTTP connect timeout (seconds)\n\
        TP_AGENT_SESSION_TIMEOUT     Session start timeout (seconds)\n\
        TP_REPORTS_DRAIN_TIMEOUT     Report drain timeout on stop (seconds)"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the effective configuration
    Config,

    /// Start an Agent session, print it and stop it again
    Session {
        /// Browser to request (chrome, firefox, edge, safari)
        #[arg(short, long, default_value = "chrome")]
        browser: String,

        /// Project name for the report
        #[arg(short, long, default_value = "wd-agent")]
        project: String,

        /// Job name for the report
        #[arg(short, long, default_value = "Connection check")]
        job: String,

        /// Report type: local, cloud, cloud-and-local
        #[arg(long, default_value = "cloud-and-local")]
        report_type: ReportType,

        /// Agent base URL
        #[arg(long, env = "TP_AGENT_URL")]
        agent_url: Option<String>,

        /// Developer token
        #[arg(long, env = "TP_DEV_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Output the session as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Some(Commands::Config) => {
            print_config(config::get());
        }

        Some(Commands::Session {
            browser,
            project,
            job,
            report_type,
            agent_url,
            token,
            json,
        }) => {
            let mut options = AgentOptions::from_config(config::get());
            if let Some(url) = agent_url {
                options.url = url;
            }
            if token.is_some() {
                options.token = token;
            }

            let report = ReportSettings::new(project, job).report_type(report_type);
            let client = AgentClient::start_session(&options, json!({ "browserName": browser }), &report)?;
            let session = client.session();

            if json {
                println!("{}", serde_json::to_string_pretty(session)?);
            } else {
                println!("Agent session started at {}", client.agent_url());
                println!("  Session:  {}", session.session_id);
                println!("  Server:   {}", session.server_address);
                println!(
                    "  Agent:    {}",
                    session.agent_version.as_deref().unwrap_or("unknown")
                );
                println!("  Dialect:  {}", session.dialect.as_deref().unwrap_or("unknown"));
                println!("  Delivery: {:?}", client.delivery_mode());
                println!("  Report:   {} / {}", session.project_name, session.job_name);
            }

            let undelivered = client.stop();
            if undelivered > 0 {
                eprintln!("Warning: {} report(s) were not delivered", undelivered);
            }
        }

        None => {
            println!("wd-agent - Agent connection check for WebDriver test reporting");
            println!();
            println!("Usage: wd-agent <COMMAND>");
            println!();
            println!("Commands:");
            println!("  config   Print the effective configuration");
            println!("  session  Start an Agent session, print it and stop it");
            println!();
            println!("Run with --help for more information.");
        }
    }

    Ok(())
}

fn print_config(config: &Config) {
    let token = match &config.agent.token {
        Some(token) => mask(token),
        None => "(not set)".to_string(),
    };

    println!("Agent");
    println!("  URL:              {}", config.agent.url);
    println!("  Token:            {}", token);
    println!("  Connect timeout:  {:?}", config.agent.connect_timeout());
    println!("  Session timeout:  {:?}", config.agent.session_timeout());
    println!("Reports");
    println!("  Batch size:       {}", config.reports.batch_size);
    println!(
        "  Request timeout:  {:?}",
        Duration::from_secs(config.reports.request_timeout)
    );
    println!("  Drain timeout:    {:?}", config.reports.drain_timeout());
    println!("Driver");
    println!("  Keep session:     {}", config.driver.keep_session);
}

/// Show only the last four characters of a long secret, nothing of a short one
fn mask(secret: &str) -> String {
    let len = secret.chars().count();
    if len <= MASK_MIN_LEN {
        return "****".to_string();
    }
    let visible: String = secret.chars().skip(len - 4).collect();
    format!("****{visible}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_short_secret_entirely() {
        assert_eq!(mask(""), "****");
        assert_eq!(mask("abcd"), "****");
        assert_eq!(mask("abcdefgh"), "****");
    }

    #[test]
    fn test_mask_keeps_tail_of_long_secret() {
        assert_eq!(mask("tp-dev-token-1234"), "****1234");
    }
}
