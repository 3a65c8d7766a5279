use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::distributed::{SLAVE_START_PATH, SLAVE_STOP_PATH, SlaveAck, StartMessage};
use crate::run::{RunSpecMessage, StopOutcome};

use super::ServerContext;
use super::control::{
    ControlError, SlaveAddressRequest, SlaveChangeResponse, SlavesResponse, StopResponse,
};
use super::http::{HttpRequest, read_http_request, write_error_response, write_json_response};

pub(super) const JOIN_PATH: &str = "/join";

pub(super) async fn handle_control_connection(mut socket: TcpStream, context: &ServerContext) {
    let request = match read_http_request(&mut socket).await {
        Ok(request) => request,
        Err(err) => {
            if write_error_response(&mut socket, err.status, &err.message)
                .await
                .is_err()
            {
                // Socket closed while writing error response.
            }
            return;
        }
    };
    debug!("{} {}", request.method, request.path);

    match route(&request, context).await {
        Ok(response) => {
            if write_json_response(&mut socket, 200, &response)
                .await
                .is_err()
            {
                // Socket closed while writing response.
            }
        }
        Err(err) => {
            if write_error_response(&mut socket, err.status, &err.message)
                .await
                .is_err()
            {
                // Socket closed while writing error response.
            }
        }
    }
}

async fn route(request: &HttpRequest, context: &ServerContext) -> Result<Value, ControlError> {
    let method = request.method.as_str();
    let path = request.path.as_str();
    match (path, method) {
        ("/state", "GET") => to_value(&context.coordinator.snapshot()),
        ("/start", "POST") => start(request, context).await,
        ("/stop", "POST") => stop(context).await,
        ("/slaves", "GET") => list_slaves(context),
        ("/slaves", "POST") => register_slave(request, context),
        ("/slaves", "DELETE") => deregister_slave(request, context),
        (SLAVE_START_PATH, "POST") => slave_start(request, context).await,
        (SLAVE_STOP_PATH, "POST") => slave_stop(context).await,
        (JOIN_PATH, "GET") => Err(ControlError::new(400, "WebSocket upgrade required")),
        ("/state" | "/start" | "/stop" | "/slaves" | JOIN_PATH, _)
        | (SLAVE_START_PATH | SLAVE_STOP_PATH, _) => {
            Err(ControlError::method_not_allowed(method, path))
        }
        _ => Err(ControlError::not_found()),
    }
}

async fn start(request: &HttpRequest, context: &ServerContext) -> Result<Value, ControlError> {
    let message: RunSpecMessage = parse_body(request)?;
    let spec = message.into_spec()?;
    let outcome = context.coordinator.start(spec).await?;
    to_value(&outcome)
}

async fn stop(context: &ServerContext) -> Result<Value, ControlError> {
    let outcome = context.coordinator.stop().await;
    to_value(&StopResponse::from(outcome))
}

fn list_slaves(context: &ServerContext) -> Result<Value, ControlError> {
    let slaves = context
        .coordinator
        .registry()
        .nodes()
        .into_iter()
        .map(|node| node.address)
        .collect();
    to_value(&SlavesResponse { slaves })
}

fn register_slave(request: &HttpRequest, context: &ServerContext) -> Result<Value, ControlError> {
    let body: SlaveAddressRequest = parse_body(request)?;
    let registry = context.coordinator.registry();
    let changed = registry.register(&body.address)?;
    if changed {
        info!("Registered slave {}", body.address.trim());
    }
    to_value(&SlaveChangeResponse {
        address: body.address,
        changed,
        slaves: registry.len(),
    })
}

fn deregister_slave(request: &HttpRequest, context: &ServerContext) -> Result<Value, ControlError> {
    let body: SlaveAddressRequest = parse_body(request)?;
    let registry = context.coordinator.registry();
    let changed = registry.deregister(&body.address);
    if changed {
        info!("Deregistered slave {}", body.address.trim());
    }
    to_value(&SlaveChangeResponse {
        address: body.address,
        changed,
        slaves: registry.len(),
    })
}

async fn slave_start(
    request: &HttpRequest,
    context: &ServerContext,
) -> Result<Value, ControlError> {
    let message: StartMessage = parse_body(request)?;
    let spec = message.spec.into_spec()?;
    let outcome = context.coordinator.start_local(spec).await?;
    info!(
        "Started local run {} for master run {} ({} users)",
        outcome.run_id, message.run_id, outcome.users
    );
    to_value(&SlaveAck::new("started", Some(message.run_id)))
}

async fn slave_stop(context: &ServerContext) -> Result<Value, ControlError> {
    let outcome = context.coordinator.stop().await;
    let ack = match outcome {
        StopOutcome::NotRunning => SlaveAck::new("idle", None),
        StopOutcome::Stopped { run_id, .. } => SlaveAck::new("stopped", Some(run_id)),
    };
    to_value(&ack)
}

fn parse_body<T>(request: &HttpRequest) -> Result<T, ControlError>
where
    T: DeserializeOwned,
{
    if request.body.is_empty() {
        return Err(ControlError::new(400, "Missing request body"));
    }
    serde_json::from_slice(&request.body).map_err(|err| ControlError::invalid_json(&err))
}

fn to_value<T>(value: &T) -> Result<Value, ControlError>
where
    T: Serialize + ?Sized,
{
    serde_json::to_value(value)
        .map_err(|err| ControlError::new(500, format!("Failed to encode response: {}", err)))
}
