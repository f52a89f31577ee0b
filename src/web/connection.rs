//! Per-connection request handling.
//!
//! parse → resolve → respond → close. The connection halves are owned by
//! the task and dropped on every exit path, which closes the socket.

use super::request::{Request, RequestError};
use super::response::{ResponseEmitter, Status};
use super::routes::{AppState, DeviceAction, Handler, Route};
use super::templates::render_dashboard;
use super::WebError;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::broadcast;

/// Why an event stream stopped waiting
enum Wake {
    Tick,
    PeerClosed,
    Shutdown,
}

/// Serve one accepted connection to completion
pub async fn handle_connection<S>(stream: S, state: AppState, shutdown: broadcast::Receiver<()>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);

    let parsed = match tokio::time::timeout(state.request_timeout, Request::parse(&mut reader)).await
    {
        Ok(parsed) => parsed,
        Err(_) => Err(RequestError::TimedOut(state.request_timeout.as_millis() as u64)),
    };

    let request = match parsed {
        Ok(request) => request,
        Err(e) => {
            // Malformed or abandoned requests get no response
            tracing::debug!("Dropping connection: {}", e);
            return;
        }
    };

    let route = state.router.resolve(&request.method, &request.path);
    tracing::debug!("{} {} -> {}", request.method, request.path, route.path);

    let emitter = ResponseEmitter::new(write_half);
    match respond(&state, route, reader, emitter, shutdown).await {
        Ok(()) => {}
        Err(WebError::PeerDisconnected(e)) => {
            tracing::debug!("Client went away during {}: {}", request.path, e);
        }
        Err(e) => tracing::warn!("{} {} failed: {}", request.method, request.path, e),
    }
}

async fn respond<R, W>(
    state: &AppState,
    route: &Route,
    reader: R,
    mut emitter: ResponseEmitter<W>,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), WebError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let outcome = match &route.handler {
        Handler::HtmlPage { asset } => html_page(state, asset, &mut emitter).await,
        Handler::StaticAsset {
            content_type,
            asset,
        } => match state.assets.read(asset).await {
            Ok(body) => emitter.emit_asset(content_type, &body).await,
            Err(e) => Err(e.into()),
        },
        Handler::JsonAction(action) => match action(&state.device) {
            Ok(body) => emitter.emit_json(&body).await,
            Err(e) => Err(e.into()),
        },
        Handler::NotFound => emitter.emit_error(Status::NotFound, "Nothing here").await,
        Handler::EventStream {
            event,
            interval,
            sample,
        } => {
            return stream_events(state, event, *interval, *sample, reader, emitter, shutdown)
                .await;
        }
    };

    match outcome {
        // Nothing has been written yet when these fail
        Err(e @ (WebError::Device(_) | WebError::Asset(_))) => {
            tracing::warn!("{} failed: {}", route.path, e);
            emitter
                .emit_error(Status::InternalServerError, &e.to_string())
                .await?;
        }
        other => other?,
    }

    let _ = emitter.into_inner().shutdown().await;
    Ok(())
}

/// Dashboard with the current LED state and light level filled in
async fn html_page<W>(
    state: &AppState,
    asset: &str,
    emitter: &mut ResponseEmitter<W>,
) -> Result<(), WebError>
where
    W: AsyncWrite + Unpin,
{
    let template = state.assets.read_text(asset).await?;

    let light = match state.device.read_light_percent() {
        Ok(percent) => Some(percent),
        Err(e) => {
            tracing::warn!("Rendering dashboard without light reading: {}", e);
            None
        }
    };
    let page = render_dashboard(&template, state.device.read_led(), light);

    emitter.emit_html(&page).await
}

/// Push one event per interval until the peer leaves or the server stops
async fn stream_events<R, W>(
    state: &AppState,
    event: &str,
    interval: Duration,
    sample: DeviceAction,
    mut reader: R,
    mut emitter: ResponseEmitter<W>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), WebError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    // A sensor that is down from the start gets a status, not an empty stream
    let mut data = match sample(&state.device) {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!("Event stream ({}) not opened: {}", event, e);
            emitter
                .emit_error(Status::InternalServerError, &e.to_string())
                .await?;
            let _ = emitter.into_inner().shutdown().await;
            return Ok(());
        }
    };

    let mut stream = emitter.emit_event_stream().await?;
    tracing::info!("Event stream opened ({})", event);

    let mut reading = true;
    let result = loop {
        if let Err(e) = stream.send(event, &data).await {
            break Err(e);
        }

        match idle(&mut reader, &mut reading, interval, &mut shutdown).await {
            Wake::Tick => {}
            Wake::PeerClosed => break Ok(()),
            Wake::Shutdown => break Ok(()),
        }

        data = match sample(&state.device) {
            Ok(data) => data,
            Err(e) => break Err(WebError::Device(e)),
        };
    };

    stream.close().await;
    tracing::info!(
        "Event stream closed ({}) after {} events",
        event,
        stream.next_id()
    );
    result
}

/// Sleep for `interval`, waking early on a read error or on shutdown
///
/// Bytes the client sends meanwhile are discarded. EOF only clears
/// `reading`: a client may half-close after its request, so a gone peer is
/// noticed by the next failed write.
async fn idle<R>(
    reader: &mut R,
    reading: &mut bool,
    interval: Duration,
    shutdown: &mut broadcast::Receiver<()>,
) -> Wake
where
    R: AsyncRead + Unpin,
{
    let tick = tokio::time::sleep(interval);
    tokio::pin!(tick);
    let mut scratch = [0u8; 64];

    loop {
        tokio::select! {
            _ = &mut tick => return Wake::Tick,
            read = reader.read(&mut scratch), if *reading => match read {
                Ok(0) => *reading = false,
                Ok(_) => {}
                Err(_) => return Wake::PeerClosed,
            },
            _ = shutdown.recv() => return Wake::Shutdown,
        }
    }
}
