use std::time::Duration;

use async_lsp::MainLoop;
use tower::ServiceBuilder;
use tower_lsp_server::{LspService, Server};

use schema_lsp::utils::CatchPanic;
use schema_lsp::Backend;

/// Spawns a server wired to an in-memory client and returns the client's handle.
pub fn setup_lsp_server() -> async_lsp::ServerSocket {
	let (service, socket) = LspService::build(Backend::new).finish();

	let service = ServiceBuilder::new()
		.layer(tower::timeout::TimeoutLayer::new(Duration::from_secs(30)))
		.layer_fn(CatchPanic)
		.service(service);

	let (server_read, server_write) = tokio::io::simplex(64);
	let (client_read, client_write) = tokio::io::simplex(64);

	let (client_read, server_write) = (
		tokio_util::compat::TokioAsyncReadCompatExt::compat(client_read),
		tokio_util::compat::TokioAsyncWriteCompatExt::compat_write(server_write),
	);

	let (ml, client) = MainLoop::new_client(|socket| socket);

	tokio::spawn(Server::new(server_read, client_write, socket).serve(service));
	tokio::spawn(ml.run_buffered(client_read, server_write));

	client
}
