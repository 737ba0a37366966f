//! Adapted from tower_http::catch_panic

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures::future::CatchUnwind;
use futures::{Future, FutureExt};
use tower::Service;
use tower_lsp_server::jsonrpc::{Error, Id, Request, Response};
use tracing::error;

/// Turns a panicking handler into an internal error response for its request.
pub struct CatchPanic<S>(pub S);

impl<S> Service<Request> for CatchPanic<S>
where
	S: Service<Request, Response = Option<Response>>,
{
	type Response = S::Response;
	type Error = S::Error;
	type Future = CatchPanicFuture<S::Future>;

	#[inline]
	fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		self.0.poll_ready(cx)
	}

	fn call(&mut self, req: Request) -> Self::Future {
		let id = req.id().cloned();
		match std::panic::catch_unwind(AssertUnwindSafe(|| self.0.call(req))) {
			Ok(future) => CatchPanicFuture {
				id,
				kind: Kind::Future {
					future: AssertUnwindSafe(future).catch_unwind(),
				},
			},
			Err(panic_err) => CatchPanicFuture {
				id,
				kind: Kind::Panicked {
					panic_err: Some(panic_err),
				},
			},
		}
	}
}

pin_project_lite::pin_project! {
	pub struct CatchPanicFuture<F> {
		id: Option<Id>,
		#[pin]
		kind: Kind<F>,
	}
}

pin_project_lite::pin_project! {
	#[project = KindProj]
	enum Kind<F> {
		Panicked {
			panic_err: Option<Box<dyn Any + Send + 'static>>,
		},
		Future {
			#[pin]
			future: CatchUnwind<AssertUnwindSafe<F>>,
		},
	}
}

impl<F, E> Future for CatchPanicFuture<F>
where
	F: Future<Output = Result<Option<Response>, E>>,
{
	type Output = Result<Option<Response>, E>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let this = self.project();
		match this.kind.project() {
			KindProj::Panicked { panic_err } => Poll::Ready(Ok(panic_response(this.id.take(), panic_err.take()))),
			KindProj::Future { future } => match ready!(future.poll(cx)) {
				Ok(response) => Poll::Ready(response),
				Err(panic_err) => Poll::Ready(Ok(panic_response(this.id.take(), Some(panic_err)))),
			},
		}
	}
}

fn panic_response(id: Option<Id>, panic_err: Option<Box<dyn Any + Send + 'static>>) -> Option<Response> {
	let message = match &panic_err {
		Some(err) => {
			if let Some(message) = err.downcast_ref::<&str>() {
				message.to_string()
			} else if let Some(message) = err.downcast_ref::<String>() {
				message.clone()
			} else {
				"unknown panic".to_string()
			}
		}
		None => "unknown panic".to_string(),
	};
	error!("handler panicked: {message}");
	let mut err = Error::internal_error();
	err.message = format!("handler panicked: {message}").into();
	Some(Response::from_error(id?, err))
}
