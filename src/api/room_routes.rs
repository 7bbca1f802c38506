use std::convert::Infallible;
use std::sync::Arc;

use serde::Deserialize;
use warp::http::StatusCode;
use warp::Filter;

use crate::controller::RoomsController;
use crate::error::RoomError;
use crate::provider::CreateRoomOptions;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub title: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRoomRequest {
    pub room_id: String,
    pub name: String,
}

/// All room routes. Literal paths are tried before the `/room/:id`
/// catch-all.
pub fn room_routes(
    controller: Arc<RoomsController>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    create_room(controller.clone())
        .or(delete_room(controller.clone()))
        .or(rename_room(controller.clone()))
        .or(list_rooms(controller.clone()))
        .or(user_rooms(controller.clone()))
        .or(room_title(controller.clone()))
        .or(room_titles_by_user(controller.clone()))
        .or(room_status(controller.clone()))
        .or(get_room(controller))
}

/// Liveness endpoint for the provisioning service itself
pub fn service_health() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("provisioner" / "health").and(warp::get()).map(|| {
        warp::reply::json(&serde_json::json!({
            "status": "healthy",
            "service": "Room Provisioner",
            "version": env!("CARGO_PKG_VERSION"),
        }))
    })
}

fn create_room(
    controller: Arc<RoomsController>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("room" / "create")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_controller(controller))
        .and_then(handle_create)
}

async fn handle_create(
    request: CreateRoomRequest,
    controller: Arc<RoomsController>,
) -> Result<impl warp::Reply, Infallible> {
    let options = CreateRoomOptions {
        title: request.title,
        owner_id: request.user_id,
    };
    Ok(match controller.create_room(options).await {
        Ok(room) => warp::reply::with_status(
            warp::reply::json(&serde_json::json!({ "roomId": room.id.clone(), "room": room })),
            StatusCode::CREATED,
        ),
        Err(e) => error_reply(&e),
    })
}

fn delete_room(
    controller: Arc<RoomsController>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("room" / "delete" / String)
        .and(warp::delete())
        .and(with_controller(controller))
        .and_then(handle_delete)
}

async fn handle_delete(
    room_id: String,
    controller: Arc<RoomsController>,
) -> Result<impl warp::Reply, Infallible> {
    Ok(match controller.delete_room(&room_id).await {
        Ok(()) => warp::reply::with_status(
            warp::reply::json(&serde_json::json!({ "deleted": true })),
            StatusCode::OK,
        ),
        Err(e) => error_reply(&e),
    })
}

fn rename_room(
    controller: Arc<RoomsController>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("room" / "rename")
        .and(warp::put())
        .and(warp::body::json())
        .and(with_controller(controller))
        .and_then(handle_rename)
}

async fn handle_rename(
    request: RenameRoomRequest,
    controller: Arc<RoomsController>,
) -> Result<impl warp::Reply, Infallible> {
    Ok(match controller.rename_room(&request.room_id, &request.name).await {
        Ok(true) => warp::reply::with_status(
            warp::reply::json(&serde_json::json!({ "renamed": true })),
            StatusCode::OK,
        ),
        Ok(false) => error_reply(&RoomError::RoomNotFound(request.room_id)),
        Err(e) => error_reply(&e),
    })
}

fn list_rooms(
    controller: Arc<RoomsController>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("room" / "list")
        .and(warp::get())
        .and(with_controller(controller))
        .and_then(|controller: Arc<RoomsController>| async move {
            Ok::<_, Infallible>(match controller.list_rooms().await {
                Ok(rooms) => {
                    warp::reply::with_status(warp::reply::json(&rooms), StatusCode::OK)
                }
                Err(e) => error_reply(&e),
            })
        })
}

fn user_rooms(
    controller: Arc<RoomsController>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("room" / "getUserRooms" / String)
        .and(warp::get())
        .and(with_controller(controller))
        .and_then(|user_id: String, controller: Arc<RoomsController>| async move {
            Ok::<_, Infallible>(match controller.get_rooms_by_owner(&user_id).await {
                Ok(rooms) => {
                    warp::reply::with_status(warp::reply::json(&rooms), StatusCode::OK)
                }
                Err(e) => error_reply(&e),
            })
        })
}

fn room_title(
    controller: Arc<RoomsController>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("room" / "getRoomTitle" / String)
        .and(warp::get())
        .and(with_controller(controller))
        .and_then(|room_id: String, controller: Arc<RoomsController>| async move {
            Ok::<_, Infallible>(match controller.get_room_info(&room_id).await {
                Ok(Some(room)) => warp::reply::with_status(
                    warp::reply::json(&serde_json::json!({ "roomId": room.id, "title": room.name })),
                    StatusCode::OK,
                ),
                Ok(None) => error_reply(&RoomError::RoomNotFound(room_id)),
                Err(e) => error_reply(&e),
            })
        })
}

fn room_titles_by_user(
    controller: Arc<RoomsController>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("room" / "getRoomTitleByUserId" / String)
        .and(warp::get())
        .and(with_controller(controller))
        .and_then(|user_id: String, controller: Arc<RoomsController>| async move {
            Ok::<_, Infallible>(match controller.get_rooms_by_owner(&user_id).await {
                Ok(rooms) => {
                    let titles: Vec<_> = rooms
                        .iter()
                        .map(|r| serde_json::json!({ "roomId": r.id, "title": r.name }))
                        .collect();
                    warp::reply::with_status(warp::reply::json(&titles), StatusCode::OK)
                }
                Err(e) => error_reply(&e),
            })
        })
}

fn room_status(
    controller: Arc<RoomsController>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("room" / "status" / String)
        .and(warp::get())
        .and(with_controller(controller))
        .and_then(|room_id: String, controller: Arc<RoomsController>| async move {
            Ok::<_, Infallible>(match controller.get_room_status(&room_id).await {
                Ok(Some(room)) => {
                    warp::reply::with_status(warp::reply::json(&room), StatusCode::OK)
                }
                Ok(None) => error_reply(&RoomError::RoomNotFound(room_id)),
                Err(e) => error_reply(&e),
            })
        })
}

fn get_room(
    controller: Arc<RoomsController>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("room" / String)
        .and(warp::get())
        .and(with_controller(controller))
        .and_then(|room_id: String, controller: Arc<RoomsController>| async move {
            Ok::<_, Infallible>(match controller.get_room_info(&room_id).await {
                Ok(Some(room)) => {
                    warp::reply::with_status(warp::reply::json(&room), StatusCode::OK)
                }
                Ok(None) => error_reply(&RoomError::RoomNotFound(room_id)),
                Err(e) => error_reply(&e),
            })
        })
}

fn with_controller(
    controller: Arc<RoomsController>,
) -> impl Filter<Extract = (Arc<RoomsController>,), Error = Infallible> + Clone {
    warp::any().map(move || controller.clone())
}

/// Only the conflict/validation class surfaces with a specific status;
/// everything internal collapses to a gateway or server error.
fn error_reply(err: &RoomError) -> warp::reply::WithStatus<warp::reply::Json> {
    let status = match err {
        RoomError::RoomAlreadyExists(_) | RoomError::TitleAlreadyExists(_) => StatusCode::CONFLICT,
        RoomError::RoomNotFound(_) => StatusCode::NOT_FOUND,
        RoomError::IdSpaceExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
        RoomError::BackendUnavailable(_) => StatusCode::BAD_GATEWAY,
        RoomError::ProviderUnimplemented(_) => StatusCode::NOT_IMPLEMENTED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warp::reply::with_status(
        warp::reply::json(&serde_json::json!({ "error": err.to_string() })),
        status,
    )
}
