//! framewise-server: the gRPC frontend of the frame tracking service

pub mod proto;
pub mod service;
pub mod telemetry;
pub mod workers;

pub use service::TrackServer;
pub use workers::WorkerPool;

use std::future::Future;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tracing::info;

/// Serve `server` on an already bound listener until `shutdown` resolves.
pub async fn serve(
    server: TrackServer,
    listener: TcpListener,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    info!("gRPC server listening on {}", listener.local_addr()?);
    tonic::transport::Server::builder()
        .add_service(server.into_service())
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
        .await?;
    info!("gRPC server stopped");
    Ok(())
}
