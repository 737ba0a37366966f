use std::time::Duration;

use miette::IntoDiagnostic;
use tower::ServiceBuilder;
use tower_lsp_server::{LspService, Server};
use tracing_subscriber::EnvFilter;

use schema_lsp::utils::CatchPanic;
use schema_lsp::Backend;

mod cli;

fn main() -> miette::Result<()> {
	let args = std::env::args().skip(1).collect::<Vec<_>>();
	let args = args.iter().map(String::as_str).collect::<Vec<_>>();
	let args = cli::parse_args(&args);

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,schema_lsp=info"));
	let subscriber = tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_env_filter(filter)
		.with_ansi(false);
	match args.log_format {
		cli::LogFormat::Compact => subscriber.compact().init(),
		cli::LogFormat::Json => subscriber.json().init(),
	}

	let mut runtime = tokio::runtime::Builder::new_multi_thread();
	if let Some(threads) = args.threads {
		runtime.worker_threads(threads);
	}
	let runtime = runtime.enable_all().build().into_diagnostic()?;
	runtime.block_on(async move {
		if cli::run(args).await {
			return;
		}
		serve().await;
	});
	Ok(())
}

async fn serve() {
	let (service, socket) = LspService::build(Backend::new).finish();
	let service = ServiceBuilder::new()
		.layer(tower::timeout::TimeoutLayer::new(Duration::from_secs(30)))
		.layer_fn(CatchPanic)
		.service(service);

	tracing::info!("{} v{} git:{}", schema_lsp::NAME, schema_lsp::VERSION, schema_lsp::GITVER);
	Server::new(tokio::io::stdin(), tokio::io::stdout(), socket)
		.serve(service)
		.await;
}
