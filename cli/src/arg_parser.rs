use clap::Parser;
use std::path::PathBuf;

/// Deploy a static index.html to AWS Amplify through a temporary S3 bucket
#[derive(Debug, Parser)]
#[clap(name = "amplify-deploy", version)]
pub struct ArgParser {
    /// Name of the Amplify app to create
    pub app_name: String,

    /// Path of the HTML file to deploy
    #[clap(long)]
    pub index: Option<PathBuf>,

    /// AWS region for the bucket and the app
    #[clap(long)]
    pub region: Option<String>,

    /// Branch to create and deploy to
    #[clap(long)]
    pub branch: Option<String>,

    /// Give up watching the deployment after this many seconds
    #[clap(long)]
    pub timeout_secs: Option<u64>,

    /// Seconds between deployment status checks
    #[clap(long)]
    pub poll_interval_secs: Option<u64>,

    /// Consecutive failed status checks tolerated before giving up
    #[clap(long)]
    pub max_query_failures: Option<u32>,

    /// Do not open the app in a browser afterwards
    #[clap(long)]
    pub no_open: bool,

    /// Settings file (TOML)
    #[clap(short = 'c', long, env = "AMPLIFY_DEPLOY_CONFIG")]
    pub config: Option<PathBuf>,
}
