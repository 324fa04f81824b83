mod arg_parser;
mod aws;
mod browser;
mod bundle;
mod capabilities;
mod error;
mod pipeline;
mod settings;

use arg_parser::ArgParser;
use browser::CommandBrowser;
use capabilities::BrowserLauncher;
use pipeline::{Collaborators, DeployNames, DeployRequest};
use settings::Settings;

use chrono::Utc;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use watchlib::{CancellationToken, Watcher};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = ArgParser::parse();
    let mut settings = Settings::load(args.config.as_deref())?;
    settings.apply_args(&args);
    let watcher = Watcher::new(settings.watch_config()?);

    // one shared SDK config, one client per service, owned here
    let sdk_config = aws::load_config(&settings.region).await;
    let staging = aws::S3Staging::new(aws_sdk_s3::Client::new(&sdk_config), &settings.region);
    let amplify = aws::AmplifyDeployer::new(aws_sdk_amplify::Client::new(&sdk_config));
    let browser = CommandBrowser::system();

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, stopping deployment watch");
                cancel.cancel();
            }
        });
    }

    let request = DeployRequest {
        names: DeployNames::at(Utc::now(), &args.app_name),
        index_path: settings.index_path.clone(),
        branch: settings.branch.clone(),
    };
    let collaborators = Collaborators {
        buckets: &staging,
        stager: &staging,
        trigger: &amplify,
        status: &amplify,
        browser: if settings.open_browser {
            Some(&browser as &dyn BrowserLauncher)
        } else {
            None
        },
    };

    match pipeline::deploy(&request, &collaborators, &watcher, &cancel).await {
        Ok(report) => {
            info!("your app is now deployed via AWS Amplify");
            println!("App URL: {}", report.app_url);
            println!("Deployment completed successfully. App ID: {}", report.app_id);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "deployment failed");
            std::process::exit(1);
        }
    }
}
