//! chordkv-node service: JSON-RPC over http in front of the `Swarm`.
#![warn(missing_docs)]
mod http_error;

use std::net::SocketAddr;
use std::net::TcpListener;
use std::sync::Arc;

use axum::extract::State;
use axum::http;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use chordkv_core::inspect::NodeStats;
use jsonrpc_core::MetaIoHandler;
use tower_http::cors::CorsLayer;

use self::http_error::HttpError;
use crate::error::Error;
use crate::error::Result;
use crate::processor::Processor;

/// JSON-RPC state
#[derive(Clone)]
pub struct JsonRpcState<M>
where M: jsonrpc_core::Middleware<Arc<Processor>>
{
    processor: Arc<Processor>,
    io_handler: MetaIoHandler<Arc<Processor>, M>,
}

/// Status state
#[derive(Clone)]
pub struct StatusState {
    processor: Arc<Processor>,
}

struct NodeRpcMiddleware;

/// Routes of the node: JSON-RPC on `POST /`, liveness on `GET /status`.
pub fn router(processor: Arc<Processor>) -> Router {
    let jsonrpc_state = Arc::new(JsonRpcState {
        processor: processor.clone(),
        io_handler: MetaIoHandler::with_middleware(NodeRpcMiddleware),
    });
    let status_state = Arc::new(StatusState { processor });

    Router::new()
        .route("/", post(jsonrpc_io_handler).with_state(jsonrpc_state))
        .route("/status", get(status_handler).with_state(status_state))
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(node_info_header))
}

/// Bind the http listener of a node on `addr`.
pub fn bind_http_api(addr: &str) -> Result<TcpListener> {
    let binding_addr: SocketAddr = addr
        .parse()
        .map_err(|_| Error::InvalidBindAddr(addr.to_string()))?;
    TcpListener::bind(binding_addr).map_err(|e| Error::HttpServerError(e.to_string()))
}

/// Serve on a bound listener until the processor shuts down.
pub async fn serve(listener: TcpListener, processor: Arc<Processor>) -> Result<()> {
    let local_addr = listener
        .local_addr()
        .map_err(|e| Error::HttpServerError(e.to_string()))?;
    let token = processor.token();
    let axum_make_service = router(processor).into_make_service();

    tracing::info!("JSON-RPC endpoint: http://{}", local_addr);
    axum::Server::from_tcp(listener)
        .map_err(|e| Error::HttpServerError(e.to_string()))?
        .serve(axum_make_service)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
        .map_err(|e| Error::HttpServerError(e.to_string()))?;
    tracing::info!("JSON-RPC endpoint {} closed", local_addr);
    Ok(())
}

async fn jsonrpc_io_handler<M>(
    State(state): State<Arc<JsonRpcState<M>>>,
    body: String,
) -> std::result::Result<JsonResponse, HttpError>
where
    M: jsonrpc_core::Middleware<Arc<Processor>>,
{
    let r = state
        .io_handler
        .handle_request(&body, state.processor.clone())
        .await
        .ok_or(HttpError::BadRequest)?;
    Ok(JsonResponse(r))
}

async fn node_info_header<B>(
    req: http::Request<B>,
    next: axum::middleware::Next<B>,
) -> axum::response::Response {
    let mut res = next.run(req).await;
    let headers = res.headers_mut();

    if let Ok(version) = http::HeaderValue::from_str(crate::util::build_version().as_str()) {
        headers.insert("X-NODE-VERSION", version);
    }
    res
}

async fn status_handler(
    State(state): State<Arc<StatusState>>,
) -> std::result::Result<axum::Json<NodeStats>, HttpError> {
    let stats = state
        .processor
        .stats()
        .await
        .map_err(|_| HttpError::Internal)?;
    Ok(axum::Json(stats))
}

/// JSON response struct
#[derive(Debug, Clone)]
pub struct JsonResponse(String);

impl IntoResponse for JsonResponse {
    fn into_response(self) -> axum::response::Response {
        ([("content-type", "application/json")], self.0).into_response()
    }
}

mod jsonrpc_middleware_impl {
    use std::future::Future;

    use jsonrpc_core::futures_util::future::Either;
    use jsonrpc_core::middleware::NoopCallFuture;
    use jsonrpc_core::middleware::NoopFuture;
    use jsonrpc_core::*;

    use super::*;

    impl Middleware<Arc<Processor>> for NodeRpcMiddleware {
        type Future = NoopFuture;
        type CallFuture = NoopCallFuture;

        fn on_call<F, X>(
            &self,
            call: Call,
            meta: Arc<Processor>,
            next: F,
        ) -> Either<Self::CallFuture, X>
        where
            F: Fn(Call, Arc<Processor>) -> X + Send + Sync,
            X: Future<Output = Option<Output>> + Send + 'static,
        {
            match call {
                Call::MethodCall(req) => {
                    let MethodCall {
                        jsonrpc,
                        method,
                        params,
                        id,
                    } = req;
                    let fut = async move {
                        let res = meta.handle_rpc(&method, params).await.map_err(|e| {
                            tracing::debug!("{} failed: {}", method, e);
                            jsonrpc_core::Error::from(e)
                        });
                        Some(Output::from(res, id, jsonrpc))
                    };
                    Either::Left(Box::pin(fut))
                }
                _ => Either::Left(Box::pin(next(call, meta))),
            }
        }
    }
}
